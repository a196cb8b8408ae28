mod api;
mod audio;
mod clip;
mod config;
mod error;
mod playback;
mod prompt;
mod storyboard;
mod video;

use anyhow::Context;
use api::RelayClient;
use clap::{Parser, Subcommand};
use clip::{ClipField, GeneratedClip};
use config::Config;
use error::Result;
use playback::{HeadlessMedia, PlaybackMode, PlaybackSession, Player};
use prompt::FieldLayout;
use std::path::PathBuf;
use std::time::Duration;
use storyboard::{MediaKind, SessionStore, StoryboardState};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use video::{FfmpegMuxer, Muxer};

#[derive(Parser, Debug)]
#[command(name = "auto-storyboard")]
#[command(about = "Storyboard creation with generative AI clips and synced narration preview", long_about = None)]
struct Args {
    /// Working directory holding the session and generated audio
    #[arg(short = 'w', long, global = true, default_value = "./output")]
    work_dir: PathBuf,

    /// Base URL of the generation relay
    #[arg(long, global = true, env = config::RELAY_URL_VAR, default_value = api::DEFAULT_RELAY_URL)]
    relay_url: String,

    /// API key forwarded to the relay
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Nominal clip length in seconds
    #[arg(long, global = true, default_value_t = 8, value_parser = clap::value_parser!(u64).range(1..=600))]
    clip_seconds: u64,

    /// Fields per storyboard entry when parsing unlabeled model output
    #[arg(long, global = true, value_enum, default_value_t = FieldLayout::VideoVoice)]
    layout: FieldLayout,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask the relay for clip prompts from a story idea
    Prompts {
        /// Story idea
        #[arg(short, long)]
        text: Option<String>,

        /// Read the idea from a file
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Build the storyboard from raw model output without calling the relay
    Parse {
        file: PathBuf,
    },
    /// Show the storyboard and generation status
    List,
    /// Edit several fields of a clip at once
    Edit {
        clip: String,
        #[arg(long)]
        video_prompt: Option<String>,
        #[arg(long)]
        voice_script: Option<String>,
        #[arg(long)]
        audio_prompt: Option<String>,
    },
    /// Set one field of a clip
    Set {
        clip: String,
        #[arg(value_enum)]
        field: ClipField,
        value: String,
    },
    /// Remove a clip and its media
    Delete {
        clip: String,
    },
    /// Generate video, voice and music (one clip, or every pending clip)
    Generate {
        #[arg(long)]
        clip: Option<String>,

        /// Voice to request from the TTS relay
        #[arg(long, env = "STORYBOARD_VOICE")]
        voice: Option<String>,
    },
    /// Regenerate one asset of a clip, keeping the others
    Regenerate {
        clip: String,

        /// Asset to regenerate
        #[arg(long, value_enum)]
        only: MediaKind,

        #[arg(long, env = "STORYBOARD_VOICE")]
        voice: Option<String>,
    },
    /// Write the prompts to a storyboard file
    Export {
        #[arg(short, long, default_value = "storyboard.json")]
        output: PathBuf,
    },
    /// Replace the storyboard with one read from a file
    Import {
        file: PathBuf,
    },
    /// Preview the generated clips back to back
    Play {
        #[arg(long, value_enum, default_value_t = PlaybackMode::Linear)]
        mode: PlaybackMode,
    },
    /// Render the generated clips into one movie with ffmpeg
    Render {
        #[arg(short, long, default_value = "movie.mp4")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .init();

    dotenvy::from_filename(".env.local").ok();
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut config = Config::new(args.work_dir.clone());
    config.relay_url = args.relay_url.clone();
    config.api_key = config::resolve_api_key(args.api_key.clone());
    config.clip_duration = Duration::from_secs(args.clip_seconds);
    config.layout = args.layout;

    tokio::fs::create_dir_all(&config.work_dir)
        .await
        .context("Failed to create work directory")?;

    if let Err(e) = run(args.command, config).await {
        error!("{}", e);
        std::process::exit(1);
    }
    Ok(())
}

async fn release(store: &SessionStore, removed: impl IntoIterator<Item = GeneratedClip>) {
    for clip in removed {
        store.release_assets(&clip).await;
    }
}

fn report_warnings(state: &mut StoryboardState) {
    for warning in state.take_warnings() {
        eprintln!("warning: {}", warning);
    }
}

fn print_storyboard(state: &StoryboardState) {
    if state.prompts().is_empty() {
        println!("Storyboard is empty. Run `prompts` or `parse` first.");
        return;
    }
    for (idx, prompt) in state.prompts().iter().enumerate() {
        let status = match state.generated_clip(&prompt.id) {
            _ if state.is_generating(&prompt.id) => "generating",
            Some(clip) if clip.is_complete() => "ready",
            Some(_) => "partial",
            None => "not generated",
        };
        println!("{}. {} [{}]", idx + 1, prompt.id, status);
        println!("   {}: {}", ClipField::VideoPrompt, prompt.video_prompt);
        if let Some(audio) = &prompt.audio_prompt {
            println!("   {}: {}", ClipField::AudioPrompt, audio);
        }
        println!("   {}: {}", ClipField::VoiceScript, prompt.voice_script);
    }
}

async fn run(command: Command, mut config: Config) -> Result<()> {
    let store = SessionStore::new(config.work_dir.clone());
    let mut state = store.load().await?;

    match command {
        Command::Prompts { text, file } => {
            // 1. Read the story idea
            let input = if let Some(text) = text {
                text
            } else if let Some(path) = file {
                tokio::fs::read_to_string(&path).await?
            } else {
                return Err(error::StoryboardError::Validation(
                    "Either --text or --file must be provided".to_string(),
                ));
            };

            // 2. Ask the relay for clip prompts
            config.require_api_key()?;
            let client = RelayClient::new(&config.relay_url, config.api_key.clone())?;
            info!("Step 1/2: Requesting clip prompts...");
            let prompts = client.generate_prompts(&input, config.layout).await?;

            // 3. Replace the storyboard; old media goes with it
            info!("Step 2/2: Saving {} clips", prompts.len());
            let removed = state.replace_prompts(prompts);
            release(&store, removed).await;
            store.save(&state).await?;
            print_storyboard(&state);
        }
        Command::Parse { file } => {
            let text = tokio::fs::read_to_string(&file).await?;
            let prompts = prompt::extract_clip_prompts(&text, config.layout)?;
            let removed = state.replace_prompts(prompts);
            release(&store, removed).await;
            store.save(&state).await?;
            print_storyboard(&state);
        }
        Command::List => print_storyboard(&state),
        Command::Edit { clip, video_prompt, voice_script, audio_prompt } => {
            state.begin_edit(&clip)?;
            let changes: Vec<_> = [
                (ClipField::VideoPrompt, video_prompt),
                (ClipField::VoiceScript, voice_script),
                (ClipField::AudioPrompt, audio_prompt),
            ]
            .into_iter()
            .filter_map(|(field, value)| value.map(|v| (field, v)))
            .collect();

            if changes.is_empty() {
                state.cancel_edit();
                info!("Nothing to change for {}", clip);
                return Ok(());
            }
            for (field, value) in changes {
                state.update_edit(field, value)?;
            }
            let removed = state.save_edit()?;
            release(&store, removed).await;
            store.save(&state).await?;
            info!("Updated {}", clip);
        }
        Command::Set { clip, field, value } => {
            let removed = state.edit_field(&clip, field, value)?;
            release(&store, removed).await;
            store.save(&state).await?;
            info!("Updated {} of {}", field, clip);
        }
        Command::Delete { clip } => {
            let removed = state.delete_clip(&clip)?;
            release(&store, removed).await;
            store.save(&state).await?;
            info!("Deleted {}", clip);
        }
        Command::Generate { clip, voice } => {
            // 1. Relay client and per-request settings
            config.require_api_key()?;
            config.voice_name = voice;
            let client = RelayClient::new(&config.relay_url, config.api_key.clone())?;
            let settings = config.generation_settings();

            // 2. Generate; a batch saves after every clip
            match clip {
                Some(id) => {
                    let outcome = storyboard::generate_clip(&mut state, &client, &settings, &id).await?;
                    store.save(&state).await?;
                    info!("Generated {} ({} failed assets)", id, outcome.failures);
                }
                None => {
                    let outcomes = storyboard::generate_all(&mut state, &client, &settings, &store).await?;
                    let failed = outcomes.iter().filter(|(_, o)| o.failures > 0).count();
                    info!("Generated {} clips, {} with failures", outcomes.len(), failed);
                }
            }
            report_warnings(&mut state);
        }
        Command::Regenerate { clip, only, voice } => {
            config.require_api_key()?;
            config.voice_name = voice;
            let client = RelayClient::new(&config.relay_url, config.api_key.clone())?;
            let settings = config.generation_settings();

            if storyboard::generate_asset(&mut state, &client, &settings, &clip, only).await? {
                info!("New {} for {}", only, clip);
            }
            store.save(&state).await?;
            report_warnings(&mut state);
        }
        Command::Export { output } => {
            store.export_storyboard(&state, &output).await?;
        }
        Command::Import { file } => {
            let prompts = store.import_storyboard(&file).await?;
            let removed = state.replace_prompts(prompts);
            release(&store, removed).await;
            store.save(&state).await?;
            print_storyboard(&state);
        }
        Command::Play { mode } => {
            let clips = state.playable_clips();
            let mut session = PlaybackSession::new(clips, mode);
            let mut player = Player::new(HeadlessMedia::new(), HeadlessMedia::new(), config.clip_duration);

            let shutdown = async {
                if tokio::signal::ctrl_c().await.is_err() {
                    std::future::pending::<()>().await;
                }
            };
            let report = player.run(&mut session, shutdown).await?;
            info!("Showed {} clips", report.shown.len());
            for warning in report.warnings {
                warn!("{}", warning);
            }
        }
        Command::Render { output } => {
            // 1. Fetch remote media into the clip caches
            let client = RelayClient::new(&config.relay_url, config.api_key.clone())?;
            let clips = state.playable_clips();
            info!("Step 1/2: Collecting media for {} clips...", clips.len());
            let inputs = video::collect_inputs(&client, &clips, &config.work_dir).await?;

            // 2. Mux segments and concatenate
            info!("Step 2/2: Rendering {}...", output.display());
            let muxer = FfmpegMuxer::new(config.work_dir.clone(), config.clip_duration);
            muxer.mux(&inputs, &output).await?;
        }
    }

    Ok(())
}
