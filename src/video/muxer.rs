use crate::error::{Result, StoryboardError};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::info;

/// Local media for one clip of the movie.
#[derive(Debug, Clone, PartialEq)]
pub struct MuxInput {
    pub video: PathBuf,
    pub voice: Option<PathBuf>,
    pub music: Option<PathBuf>,
}

/// Combines clips into one file. Output is best effort; sequencing and
/// preview never depend on it.
#[allow(async_fn_in_trait)]
pub trait Muxer {
    async fn mux(&self, clips: &[MuxInput], output_path: &Path) -> Result<()>;
}

pub struct FfmpegMuxer {
    work_dir: PathBuf,
    clip_duration: Duration,
}

impl FfmpegMuxer {
    pub fn new(work_dir: PathBuf, clip_duration: Duration) -> Self {
        Self { work_dir, clip_duration }
    }

    /// Arguments for one normalized segment: H.264 video clamped to the
    /// nominal duration, and a stereo AAC track that is the voice, the music,
    /// both mixed, or silence. Every segment has the same stream layout so the
    /// concat demuxer can copy them.
    fn segment_args(&self, input: &MuxInput, output_path: &Path) -> Vec<String> {
        let mut args: Vec<String> = vec!["-y".into(), "-i".into(), input.video.display().to_string()];

        let audio: Vec<&PathBuf> = input.voice.iter().chain(input.music.iter()).collect();
        for path in &audio {
            args.extend(["-i".into(), path.display().to_string()]);
        }

        match audio.len() {
            0 => {
                args.extend(
                    ["-f", "lavfi", "-i", "anullsrc=r=44100:cl=stereo", "-map", "0:v:0", "-map", "1:a:0"]
                        .map(String::from),
                );
            }
            1 => {
                args.extend(["-map", "0:v:0", "-map", "1:a:0"].map(String::from));
            }
            _ => {
                args.extend(
                    [
                        "-filter_complex",
                        "[1:a][2:a]amix=inputs=2:duration=longest[a]",
                        "-map",
                        "0:v:0",
                        "-map",
                        "[a]",
                    ]
                    .map(String::from),
                );
            }
        }

        args.extend(
            [
                "-t".to_string(),
                format!("{}", self.clip_duration.as_secs_f64()),
                "-c:v".into(),
                "libx264".into(),
                "-pix_fmt".into(),
                "yuv420p".into(),
                "-r".into(),
                "30".into(),
                "-c:a".into(),
                "aac".into(),
                "-ar".into(),
                "44100".into(),
                "-ac".into(),
                "2".into(),
                output_path.display().to_string(),
            ],
        );
        args
    }

    async fn run_ffmpeg(args: &[String], step: &str) -> Result<()> {
        let output = Command::new("ffmpeg")
            .args(args)
            .output()
            .await
            .map_err(|e| StoryboardError::Export(format!("Failed to run FFmpeg: {}", e)))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(StoryboardError::Export(format!("FFmpeg {} failed: {}", step, error)));
        }
        Ok(())
    }

    async fn create_segment(&self, input: &MuxInput, output_path: &Path) -> Result<()> {
        info!("Creating segment from {}", input.video.display());
        Self::run_ffmpeg(&self.segment_args(input, output_path), "segment").await?;
        info!("Created segment: {}", output_path.display());
        Ok(())
    }

    async fn concat_segments(&self, concat_file: &Path, output_path: &Path) -> Result<()> {
        info!("Concatenating segments...");
        let args: Vec<String> = vec![
            "-y".into(),
            "-f".into(),
            "concat".into(),
            "-safe".into(),
            "0".into(),
            "-i".into(),
            concat_file.display().to_string(),
            "-c".into(),
            "copy".into(),
            output_path.display().to_string(),
        ];
        Self::run_ffmpeg(&args, "concat").await
    }
}

/// Entry for ffmpeg's concat list; single quotes are escaped the way the
/// demuxer expects.
fn concat_line(path: &Path) -> String {
    format!("file '{}'\n", path.display().to_string().replace('\'', "'\\''"))
}

impl Muxer for FfmpegMuxer {
    async fn mux(&self, clips: &[MuxInput], output_path: &Path) -> Result<()> {
        if clips.is_empty() {
            return Err(StoryboardError::Validation("No clips to render.".to_string()));
        }
        info!("Rendering {} clips to {}", clips.len(), output_path.display());

        let mut concat_content = String::new();
        let mut segment_paths = Vec::new();

        for (idx, clip) in clips.iter().enumerate() {
            let segment_path = self.work_dir.join(format!("segment_{}.mp4", idx));
            self.create_segment(clip, &segment_path).await?;

            let abs_segment_path = segment_path.canonicalize().map_err(|e| {
                StoryboardError::Export(format!("Failed to get absolute path: {}", e))
            })?;
            concat_content.push_str(&concat_line(&abs_segment_path));
            segment_paths.push(segment_path);
        }

        let concat_file = self.work_dir.join("concat.txt");
        tokio::fs::write(&concat_file, concat_content).await?;

        let result = self.concat_segments(&concat_file, output_path).await;

        tokio::fs::remove_file(&concat_file).await.ok();
        for segment in segment_paths {
            tokio::fs::remove_file(&segment).await.ok();
        }

        result?;
        info!("Movie written to {}", output_path.display());
        Ok(())
    }
}
