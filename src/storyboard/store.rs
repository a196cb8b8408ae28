use super::StoryboardState;
use crate::clip::{media_cache_dir, ClipPrompt, GeneratedClip};
use crate::error::{Result, StoryboardError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const SESSION_FILE: &str = "session.json";

/// One entry of an exported `storyboard.json`. Ids are session-local and are
/// not exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryboardEntry {
    pub video_prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_prompt: Option<String>,
    pub voice_script: String,
}

/// Persists the session in the working directory between invocations.
#[derive(Debug, Clone)]
pub struct SessionStore {
    work_dir: PathBuf,
}

impl SessionStore {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self { work_dir: work_dir.into() }
    }

    fn session_path(&self) -> PathBuf {
        self.work_dir.join(SESSION_FILE)
    }

    /// A missing session file is an empty storyboard.
    pub async fn load(&self) -> Result<StoryboardState> {
        let path = self.session_path();
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No session at {}, starting fresh", path.display());
                return Ok(StoryboardState::new());
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&text).map_err(|e| {
            StoryboardError::Validation(format!(
                "failed to load storyboard from {} ({}); generate a new one",
                path.display(),
                e
            ))
        })
    }

    pub async fn save(&self, state: &StoryboardState) -> Result<()> {
        tokio::fs::create_dir_all(&self.work_dir).await?;
        let json = serde_json::to_string_pretty(state)?;
        tokio::fs::write(self.session_path(), json).await?;
        debug!("Session saved ({} clips)", state.prompts().len());
        Ok(())
    }

    pub async fn export_storyboard(&self, state: &StoryboardState, output_path: &Path) -> Result<()> {
        if state.prompts().is_empty() {
            return Err(StoryboardError::Validation("No storyboard to save.".to_string()));
        }

        let entries: Vec<StoryboardEntry> = state
            .prompts()
            .iter()
            .map(|p| StoryboardEntry {
                video_prompt: p.video_prompt.clone(),
                audio_prompt: p.audio_prompt.clone(),
                voice_script: p.voice_script.clone(),
            })
            .collect();

        tokio::fs::write(output_path, serde_json::to_string_pretty(&entries)?).await?;
        info!("Storyboard exported to {}", output_path.display());
        Ok(())
    }

    /// Reads an exported storyboard; every entry gets a fresh id.
    pub async fn import_storyboard(&self, input_path: &Path) -> Result<Vec<ClipPrompt>> {
        let text = tokio::fs::read_to_string(input_path).await?;
        let entries: Vec<StoryboardEntry> = serde_json::from_str(&text)?;
        if entries.is_empty() {
            return Err(StoryboardError::EmptyResult(format!(
                "{} contains no clips",
                input_path.display()
            )));
        }

        Ok(entries
            .into_iter()
            .map(|e| ClipPrompt::new(e.video_prompt, e.voice_script, e.audio_prompt))
            .collect())
    }

    /// Deletes the local files a dropped clip owned, including downloaded
    /// copies of its remote media. Files outside the working directory are
    /// never touched.
    pub async fn release_assets(&self, clip: &GeneratedClip) {
        for path in clip.local_assets() {
            if !path.starts_with(&self.work_dir) {
                debug!("Not releasing {} (outside working directory)", path.display());
                continue;
            }
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!("Released {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to release {}: {}", path.display(), e),
            }
        }

        let cache = media_cache_dir(&self.work_dir, clip.id());
        match tokio::fs::remove_dir_all(&cache).await {
            Ok(()) => debug!("Released {}", cache.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to release {}: {}", cache.display(), e),
        }
    }
}
