use crate::api::{MusicConfig, VideoConfig, VoiceConfig, DEFAULT_RELAY_URL};
use crate::error::{Result, StoryboardError};
use crate::playback::DEFAULT_CLIP_DURATION;
use crate::prompt::FieldLayout;
use crate::storyboard::GenerationSettings;
use std::path::PathBuf;
use std::time::Duration;

pub const RELAY_URL_VAR: &str = "STORYBOARD_RELAY_URL";
pub const API_KEY_VAR: &str = "STORYBOARD_API_KEY";
/// Accepted for compatibility with relays configured for Gemini.
pub const FALLBACK_API_KEY_VAR: &str = "GEMINI_API_KEY";

/// Resolved settings for one invocation.
#[derive(Debug, Clone)]
pub struct Config {
    pub relay_url: String,
    pub api_key: Option<String>,
    pub work_dir: PathBuf,
    pub clip_duration: Duration,
    pub layout: FieldLayout,
    pub voice_name: Option<String>,
}

impl Config {
    pub fn new(work_dir: PathBuf) -> Self {
        Self {
            relay_url: DEFAULT_RELAY_URL.to_string(),
            api_key: None,
            work_dir,
            clip_duration: DEFAULT_CLIP_DURATION,
            layout: FieldLayout::default(),
            voice_name: None,
        }
    }

    /// Generation is blocked outright when no key is configured.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty()).ok_or_else(|| {
            StoryboardError::Config(format!(
                "API key not configured. Set {} (or pass --api-key) to generate media",
                API_KEY_VAR
            ))
        })
    }

    /// Per-request configs. Clip length follows the nominal duration so
    /// generated video and music match the sequencer's timing.
    pub fn generation_settings(&self) -> GenerationSettings {
        let seconds = self.clip_duration.as_secs_f64();
        let mut voice = VoiceConfig::default();
        if let Some(name) = &self.voice_name {
            voice.voice_name = name.clone();
        }

        GenerationSettings {
            video: VideoConfig {
                duration_seconds: seconds.round() as u32,
                ..VideoConfig::default()
            },
            voice,
            music: MusicConfig {
                duration: seconds,
                ..MusicConfig::default()
            },
            work_dir: self.work_dir.clone(),
        }
    }
}

/// Command-line value first, then the environment.
pub fn resolve_api_key(cli: Option<String>) -> Option<String> {
    if let Some(key) = cli {
        Some(key)
    } else if let Ok(key) = std::env::var(API_KEY_VAR) {
        Some(key)
    } else {
        std::env::var(FALLBACK_API_KEY_VAR).ok()
    }
}
