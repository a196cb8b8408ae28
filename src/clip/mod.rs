use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// One unit of the storyboard: what to render and what to narrate over it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipPrompt {
    pub id: String,
    pub video_prompt: String,
    pub voice_script: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_prompt: Option<String>,
}

impl ClipPrompt {
    pub fn new(video_prompt: String, voice_script: String, audio_prompt: Option<String>) -> Self {
        Self {
            id: new_clip_id(),
            video_prompt,
            voice_script,
            audio_prompt: audio_prompt.filter(|p| !p.trim().is_empty()),
        }
    }

    pub fn set_field(&mut self, field: ClipField, value: String) {
        match field {
            ClipField::VideoPrompt => self.video_prompt = value,
            ClipField::VoiceScript => self.voice_script = value,
            ClipField::AudioPrompt => {
                self.audio_prompt = if value.trim().is_empty() { None } else { Some(value) }
            }
        }
    }
}

/// Editable text fields of a [`ClipPrompt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum ClipField {
    VideoPrompt,
    VoiceScript,
    AudioPrompt,
}

impl fmt::Display for ClipField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ClipField::VideoPrompt => "Video Prompt",
            ClipField::VoiceScript => "Voice Script",
            ClipField::AudioPrompt => "Audio Prompt",
        };
        f.write_str(label)
    }
}

/// A clip prompt plus whatever media the relay has produced for it so far.
///
/// Each locator is either a remote URL or a file inside the working directory.
/// The record owns its local files; [`GeneratedClip::local_assets`] lists them
/// so they can be released when the clip is invalidated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedClip {
    #[serde(flatten)]
    pub prompt: ClipPrompt,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

impl GeneratedClip {
    pub fn from_prompt(prompt: ClipPrompt) -> Self {
        Self {
            prompt,
            video_url: None,
            voice_url: None,
            audio_url: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.prompt.id
    }

    /// Only the video is required; voice and music tracks are additive.
    pub fn is_complete(&self) -> bool {
        self.video_url.as_deref().is_some_and(|url| !url.trim().is_empty())
    }

    pub fn local_assets(&self) -> Vec<PathBuf> {
        [&self.video_url, &self.voice_url, &self.audio_url]
            .into_iter()
            .flatten()
            .filter(|locator| !is_remote(locator))
            .map(PathBuf::from)
            .collect()
    }
}

pub fn new_clip_id() -> String {
    format!("clip-{}", Uuid::new_v4().simple())
}

/// Downloaded copies of a clip's remote media live here, one directory per
/// clip id, so they are released together with the clip.
pub fn media_cache_dir(work_dir: &Path, id: &str) -> PathBuf {
    work_dir.join("cache").join(id)
}

pub fn is_remote(locator: &str) -> bool {
    locator.starts_with("http://") || locator.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt() -> ClipPrompt {
        ClipPrompt::new("A lighthouse at dusk".into(), "The light never sleeps.".into(), None)
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(prompt().id, prompt().id);
    }

    #[test]
    fn completeness_requires_video() {
        let mut clip = GeneratedClip::from_prompt(prompt());
        clip.voice_url = Some("voice.wav".into());
        assert!(!clip.is_complete());

        clip.video_url = Some(String::new());
        assert!(!clip.is_complete());

        clip.video_url = Some("https://cdn.example/v.mp4".into());
        assert!(clip.is_complete());
    }

    #[test]
    fn local_assets_skip_remote_urls() {
        let mut clip = GeneratedClip::from_prompt(prompt());
        clip.video_url = Some("https://cdn.example/v.mp4".into());
        clip.voice_url = Some("/tmp/work/voice_a.wav".into());
        assert_eq!(clip.local_assets(), vec![PathBuf::from("/tmp/work/voice_a.wav")]);
    }

    #[test]
    fn serializes_flat_camel_case() {
        let mut clip = GeneratedClip::from_prompt(prompt());
        clip.video_url = Some("v.mp4".into());
        let value = serde_json::to_value(&clip).unwrap();
        assert_eq!(value["videoPrompt"], "A lighthouse at dusk");
        assert_eq!(value["videoUrl"], "v.mp4");
        assert!(value.get("voiceUrl").is_none());
        assert!(value.get("audioPrompt").is_none());
    }

    #[test]
    fn blank_audio_prompt_clears_field() {
        let mut p = prompt();
        p.set_field(ClipField::AudioPrompt, "soft piano".into());
        assert_eq!(p.audio_prompt.as_deref(), Some("soft piano"));
        p.set_field(ClipField::AudioPrompt, "   ".into());
        assert_eq!(p.audio_prompt, None);
    }
}
