//! Turns raw model text into [`ClipPrompt`] records.
//!
//! Model output is only loosely structured, so parsing is a chain of
//! strategies tried in order. The first one that yields any record wins.

mod strategies;

use crate::clip::ClipPrompt;
use crate::error::{Result, StoryboardError};
use tracing::{debug, info};

/// Which fields one storyboard entry carries, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum FieldLayout {
    /// Video prompt, voice script.
    #[default]
    VideoVoice,
    /// Video prompt, audio prompt, voice script.
    VideoAudioVoice,
}

impl FieldLayout {
    pub fn field_count(self) -> usize {
        match self {
            FieldLayout::VideoVoice => 2,
            FieldLayout::VideoAudioVoice => 3,
        }
    }
}

/// Fields of one parsed entry, before an id is assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptFields {
    pub video_prompt: String,
    pub voice_script: String,
    pub audio_prompt: Option<String>,
}

impl From<PromptFields> for ClipPrompt {
    fn from(fields: PromptFields) -> Self {
        ClipPrompt::new(fields.video_prompt, fields.voice_script, fields.audio_prompt)
    }
}

pub type Strategy = fn(&str, FieldLayout) -> Vec<PromptFields>;

pub const STRATEGIES: &[(&str, Strategy)] = &[
    ("labeled-lines", strategies::labeled_lines as Strategy),
    ("structured-list", strategies::structured_list as Strategy),
    ("blank-line-groups", strategies::blank_line_groups as Strategy),
];

pub fn extract_clip_prompts(text: &str, layout: FieldLayout) -> Result<Vec<ClipPrompt>> {
    for (name, strategy) in STRATEGIES {
        let fields = strategy(text, layout);
        if fields.is_empty() {
            debug!("Strategy {} found no clips", name);
            continue;
        }

        info!("Extracted {} clips using {}", fields.len(), name);
        return Ok(fields.into_iter().map(ClipPrompt::from).collect());
    }

    Err(StoryboardError::EmptyResult(
        "no clip prompts could be extracted from the model output".to_string(),
    ))
}
