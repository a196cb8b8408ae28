use super::{GenerationMarker, MediaKind, SessionStore, StoryboardState};
use crate::api::{music_config_for, AudioAsset, MusicConfig, RelayClient, VideoConfig, VoiceConfig};
use crate::clip::ClipPrompt;
use crate::error::{Result, StoryboardError};
use std::path::{Path, PathBuf};
use tracing::info;

/// Source of generated media for one clip. Implemented by the relay client;
/// tests substitute canned results.
#[allow(async_fn_in_trait)]
pub trait MediaGenerator {
    async fn video(&self, video_prompt: &str, config: &VideoConfig) -> Result<String>;

    async fn voice(&self, voice_script: &str, config: &VoiceConfig) -> Result<AudioAsset>;

    async fn music(&self, audio_prompt: &str, config: &MusicConfig) -> Result<AudioAsset>;
}

impl MediaGenerator for RelayClient {
    async fn video(&self, video_prompt: &str, config: &VideoConfig) -> Result<String> {
        self.generate_video(video_prompt, config).await
    }

    async fn voice(&self, voice_script: &str, config: &VoiceConfig) -> Result<AudioAsset> {
        self.generate_voice(voice_script, config).await
    }

    async fn music(&self, audio_prompt: &str, config: &MusicConfig) -> Result<AudioAsset> {
        self.generate_music(audio_prompt, config).await
    }
}

#[derive(Debug, Clone, Default)]
pub struct GenerationSettings {
    pub video: VideoConfig,
    pub voice: VoiceConfig,
    /// Base music parameters; each audio prompt refines them.
    pub music: MusicConfig,
    /// Where inline audio payloads are written.
    pub work_dir: PathBuf,
}

/// What one clip's fan-out produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClipOutcome {
    pub video: bool,
    pub voice: bool,
    pub music: bool,
    pub failures: usize,
}

/// Inline audio is written next to the session file; URLs are kept as-is.
async fn persist_audio(work_dir: &Path, stem: &str, asset: AudioAsset) -> Result<String> {
    match asset {
        AudioAsset::Url(url) => Ok(url),
        AudioAsset::Wav(bytes) => {
            let path = work_dir.join(format!("{}.wav", stem));
            tokio::fs::write(&path, bytes).await?;
            Ok(path.to_string_lossy().into_owned())
        }
    }
}

async fn voice_track<G: MediaGenerator>(generator: &G, settings: &GenerationSettings, prompt: &ClipPrompt) -> Result<String> {
    let asset = generator.voice(&prompt.voice_script, &settings.voice).await?;
    persist_audio(&settings.work_dir, &format!("voice_{}", prompt.id), asset).await
}

/// `None` when the clip has no audio prompt.
async fn music_track<G: MediaGenerator>(
    generator: &G,
    settings: &GenerationSettings,
    prompt: &ClipPrompt,
) -> Option<Result<String>> {
    let audio_prompt = prompt.audio_prompt.as_deref()?;
    let config = music_config_for(audio_prompt, &settings.music);
    let result = async {
        let asset = generator.music(audio_prompt, &config).await?;
        persist_audio(&settings.work_dir, &format!("music_{}", prompt.id), asset).await
    }
    .await;
    Some(result)
}

/// Applies one asset's result, or records its failure as a warning.
fn apply_result(state: &mut StoryboardState, id: &str, kind: MediaKind, result: Result<String>) -> bool {
    match result {
        Ok(url) => match kind {
            MediaKind::Video => state.apply_video(id, url),
            MediaKind::Voice => state.apply_voice(id, url),
            MediaKind::Music => state.apply_audio(id, url),
        },
        Err(e) => {
            state.warn(format!("{}: {} generation failed: {}", id, kind, e));
            false
        }
    }
}

/// Fans out the clip's requests concurrently and applies whatever succeeded.
/// The caller owns the `Clip` marker.
async fn run_clip<G: MediaGenerator>(
    state: &mut StoryboardState,
    generator: &G,
    settings: &GenerationSettings,
    prompt: ClipPrompt,
) -> ClipOutcome {
    info!("Generating media for {}", prompt.id);
    let (video, voice, music) = tokio::join!(
        generator.video(&prompt.video_prompt, &settings.video),
        voice_track(generator, settings, &prompt),
        music_track(generator, settings, &prompt),
    );

    let id = prompt.id.as_str();
    let failures = [video.is_err(), voice.is_err(), matches!(music, Some(Err(_)))]
        .into_iter()
        .filter(|failed| *failed)
        .count();
    let outcome = ClipOutcome {
        video: apply_result(state, id, MediaKind::Video, video),
        voice: apply_result(state, id, MediaKind::Voice, voice),
        music: music.is_some_and(|result| apply_result(state, id, MediaKind::Music, result)),
        failures,
    };

    state.finish_generating(&GenerationMarker::Clip(prompt.id.clone()));
    outcome
}

fn find_prompt(state: &StoryboardState, clip_id: &str) -> Result<ClipPrompt> {
    state
        .prompt(clip_id)
        .cloned()
        .ok_or_else(|| StoryboardError::Validation(format!("unknown clip id: {}", clip_id)))
}

pub async fn generate_clip<G: MediaGenerator>(
    state: &mut StoryboardState,
    generator: &G,
    settings: &GenerationSettings,
    clip_id: &str,
) -> Result<ClipOutcome> {
    let prompt = find_prompt(state, clip_id)?;
    state.mark_generating(GenerationMarker::Clip(prompt.id.clone()));
    Ok(run_clip(state, generator, settings, prompt).await)
}

/// Generates every pending clip in storyboard order. A failing clip is
/// recorded as a warning and never stops the batch. The session is saved
/// after each clip, so an interrupted batch resumes with the clips that are
/// still pending.
pub async fn generate_all<G: MediaGenerator>(
    state: &mut StoryboardState,
    generator: &G,
    settings: &GenerationSettings,
    store: &SessionStore,
) -> Result<Vec<(String, ClipOutcome)>> {
    let pending: Vec<ClipPrompt> = state.pending_prompts().into_iter().cloned().collect();
    if pending.is_empty() {
        info!("Nothing to generate");
        return Ok(Vec::new());
    }

    for prompt in &pending {
        state.mark_generating(GenerationMarker::Clip(prompt.id.clone()));
    }

    let total = pending.len();
    let mut outcomes = Vec::with_capacity(total);
    for (idx, prompt) in pending.into_iter().enumerate() {
        let id = prompt.id.clone();
        let outcome = run_clip(state, generator, settings, prompt).await;
        store.save(state).await?;
        info!("Generated clip {} ({}/{})", id, idx + 1, total);
        outcomes.push((id, outcome));
    }
    Ok(outcomes)
}

/// Regenerates one asset of a clip, leaving its other media in place.
/// Returns whether a new asset was applied; a failed request is a warning.
pub async fn generate_asset<G: MediaGenerator>(
    state: &mut StoryboardState,
    generator: &G,
    settings: &GenerationSettings,
    clip_id: &str,
    kind: MediaKind,
) -> Result<bool> {
    let prompt = find_prompt(state, clip_id)?;
    let no_audio_prompt = || StoryboardError::Validation(format!("{} has no audio prompt", prompt.id));
    if kind == MediaKind::Music && prompt.audio_prompt.is_none() {
        return Err(no_audio_prompt());
    }

    let marker = GenerationMarker::for_asset(kind, prompt.id.clone());
    state.mark_generating(marker.clone());
    let result = match kind {
        MediaKind::Video => generator.video(&prompt.video_prompt, &settings.video).await,
        MediaKind::Voice => voice_track(generator, settings, &prompt).await,
        MediaKind::Music => music_track(generator, settings, &prompt)
            .await
            .unwrap_or_else(|| Err(no_audio_prompt())),
    };
    let applied = apply_result(state, &prompt.id, kind, result);
    state.finish_generating(&marker);
    Ok(applied)
}
