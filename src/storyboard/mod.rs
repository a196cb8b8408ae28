//! Session state for one storyboard: prompts, generated clips, in-flight
//! markers and the edit cache, owned by a single controller and handed to
//! everything else by reference.

mod generation;
mod store;

pub use generation::{generate_all, generate_asset, generate_clip, GenerationSettings};
pub use store::SessionStore;

use crate::clip::{ClipField, ClipPrompt, GeneratedClip};
use crate::error::{Result, StoryboardError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, warn};

/// One generated asset of a clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum MediaKind {
    Video,
    Voice,
    Music,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MediaKind::Video => "video",
            MediaKind::Voice => "voice",
            MediaKind::Music => "music",
        })
    }
}

/// In-flight generation for a clip id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GenerationMarker {
    /// Full fan-out: video, voice and music.
    Clip(String),
    Video(String),
    Voice(String),
    /// Music-only regeneration.
    Audio(String),
}

impl GenerationMarker {
    pub fn for_asset(kind: MediaKind, id: String) -> Self {
        match kind {
            MediaKind::Video => GenerationMarker::Video(id),
            MediaKind::Voice => GenerationMarker::Voice(id),
            MediaKind::Music => GenerationMarker::Audio(id),
        }
    }

    pub fn clip_id(&self) -> &str {
        match self {
            GenerationMarker::Clip(id)
            | GenerationMarker::Video(id)
            | GenerationMarker::Voice(id)
            | GenerationMarker::Audio(id) => id,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryboardState {
    #[serde(rename = "clipPrompts")]
    prompts: Vec<ClipPrompt>,
    #[serde(rename = "generatedClips")]
    generated: Vec<GeneratedClip>,

    // Runtime only
    #[serde(skip)]
    generating: HashSet<GenerationMarker>,
    /// Working copy of the clip being edited. Committed by `save_edit`.
    #[serde(skip)]
    editing: Option<ClipPrompt>,
    #[serde(skip)]
    warnings: Vec<String>,
}

impl StoryboardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prompts(&self) -> &[ClipPrompt] {
        &self.prompts
    }

    pub fn generated(&self) -> &[GeneratedClip] {
        &self.generated
    }

    pub fn prompt(&self, id: &str) -> Option<&ClipPrompt> {
        self.prompts.iter().find(|p| p.id == id)
    }

    pub fn generated_clip(&self, id: &str) -> Option<&GeneratedClip> {
        self.generated.iter().find(|c| c.id() == id)
    }

    fn require_prompt(&self, id: &str) -> Result<&ClipPrompt> {
        self.prompt(id)
            .ok_or_else(|| StoryboardError::Validation(format!("unknown clip id: {}", id)))
    }

    /// Starts a new storyboard. Returns the generated clips that were dropped.
    pub fn replace_prompts(&mut self, prompts: Vec<ClipPrompt>) -> Vec<GeneratedClip> {
        self.prompts = prompts;
        self.generating.clear();
        self.editing = None;
        std::mem::take(&mut self.generated)
    }

    fn invalidate(&mut self, id: &str) -> Option<GeneratedClip> {
        let index = self.generated.iter().position(|c| c.id() == id)?;
        debug!("Invalidating generated media for {}", id);
        Some(self.generated.remove(index))
    }

    pub fn begin_edit(&mut self, id: &str) -> Result<()> {
        let prompt = self.require_prompt(id)?.clone();
        self.editing = Some(prompt);
        Ok(())
    }

    pub fn update_edit(&mut self, field: ClipField, value: String) -> Result<()> {
        let draft = self
            .editing
            .as_mut()
            .ok_or_else(|| StoryboardError::Validation("no clip is being edited".to_string()))?;
        draft.set_field(field, value);
        Ok(())
    }

    /// Commits the edit cache. Media generated from the old text is removed
    /// and returned so its files can be released.
    pub fn save_edit(&mut self) -> Result<Option<GeneratedClip>> {
        let draft = self
            .editing
            .take()
            .ok_or_else(|| StoryboardError::Validation("no clip is being edited".to_string()))?;
        let Some(prompt) = self.prompts.iter_mut().find(|p| p.id == draft.id) else {
            return Err(StoryboardError::Validation(format!("unknown clip id: {}", draft.id)));
        };
        *prompt = draft;
        let id = prompt.id.clone();
        Ok(self.invalidate(&id))
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    #[cfg(test)]
    pub fn editing(&self) -> Option<&ClipPrompt> {
        self.editing.as_ref()
    }

    /// Direct edit of one field, committed immediately.
    pub fn edit_field(&mut self, id: &str, field: ClipField, value: String) -> Result<Option<GeneratedClip>> {
        let prompt = self
            .prompts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StoryboardError::Validation(format!("unknown clip id: {}", id)))?;
        prompt.set_field(field, value);
        Ok(self.invalidate(id))
    }

    /// Removes every trace of a clip id at once: prompt, generated media,
    /// in-flight markers and a pending edit.
    pub fn delete_clip(&mut self, id: &str) -> Result<Option<GeneratedClip>> {
        let index = self
            .prompts
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| StoryboardError::Validation(format!("unknown clip id: {}", id)))?;
        self.prompts.remove(index);
        self.generating.retain(|m| m.clip_id() != id);
        if self.editing.as_ref().is_some_and(|p| p.id == id) {
            self.editing = None;
        }
        Ok(self.invalidate(id))
    }

    pub fn mark_generating(&mut self, marker: GenerationMarker) {
        self.generating.insert(marker);
    }

    pub fn finish_generating(&mut self, marker: &GenerationMarker) {
        self.generating.remove(marker);
    }

    pub fn is_generating(&self, id: &str) -> bool {
        self.generating.iter().any(|m| m.clip_id() == id)
    }

    #[cfg(test)]
    pub fn generating(&self) -> impl Iterator<Item = &GenerationMarker> {
        self.generating.iter()
    }

    /// Prompts with neither generated media nor a generation in flight.
    pub fn pending_prompts(&self) -> Vec<&ClipPrompt> {
        self.prompts
            .iter()
            .filter(|p| self.generated_clip(&p.id).is_none() && !self.is_generating(&p.id))
            .collect()
    }

    /// Complete clips in storyboard order.
    pub fn playable_clips(&self) -> Vec<&GeneratedClip> {
        self.prompts
            .iter()
            .filter_map(|p| self.generated_clip(&p.id))
            .filter(|c| c.is_complete())
            .collect()
    }

    /// Record for `id`, created from its prompt on first result. `None` when the
    /// clip was deleted while its generation was in flight.
    fn record_mut(&mut self, id: &str) -> Option<&mut GeneratedClip> {
        if let Some(index) = self.generated.iter().position(|c| c.id() == id) {
            return self.generated.get_mut(index);
        }
        let Some(prompt) = self.prompt(id).cloned() else {
            warn!("Dropping result for deleted clip {}", id);
            return None;
        };
        self.generated.push(GeneratedClip::from_prompt(prompt));
        self.generated.last_mut()
    }

    pub fn apply_video(&mut self, id: &str, url: String) -> bool {
        self.record_mut(id).map(|c| c.video_url = Some(url)).is_some()
    }

    pub fn apply_voice(&mut self, id: &str, url: String) -> bool {
        self.record_mut(id).map(|c| c.voice_url = Some(url)).is_some()
    }

    pub fn apply_audio(&mut self, id: &str, url: String) -> bool {
        self.record_mut(id).map(|c| c.audio_url = Some(url)).is_some()
    }

    pub fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }

    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with(n: usize) -> StoryboardState {
        let mut state = StoryboardState::new();
        state.replace_prompts(
            (0..n)
                .map(|i| ClipPrompt::new(format!("shot {i}"), format!("line {i}"), None))
                .collect(),
        );
        state
    }

    fn id(state: &StoryboardState, i: usize) -> String {
        state.prompts()[i].id.clone()
    }

    #[test]
    fn editing_a_field_invalidates_generated_media() {
        let mut state = state_with(2);
        let first = id(&state, 0);
        state.apply_video(&first, "https://cdn.example/a.mp4".into());
        assert!(state.generated_clip(&first).is_some());

        let removed = state.edit_field(&first, ClipField::VideoPrompt, "new shot".into()).unwrap();
        assert_eq!(removed.unwrap().video_url.as_deref(), Some("https://cdn.example/a.mp4"));
        assert!(state.generated_clip(&first).is_none());
        assert_eq!(state.prompt(&first).unwrap().video_prompt, "new shot");
    }

    #[test]
    fn edit_cache_flow() {
        let mut state = state_with(1);
        let clip = id(&state, 0);
        state.apply_video(&clip, "v.mp4".into());

        state.begin_edit(&clip).unwrap();
        state.update_edit(ClipField::VoiceScript, "rewritten".into()).unwrap();
        assert_eq!(state.prompt(&clip).unwrap().voice_script, "line 0");

        state.cancel_edit();
        assert!(state.save_edit().is_err());
        assert!(state.generated_clip(&clip).is_some());

        state.begin_edit(&clip).unwrap();
        state.update_edit(ClipField::VoiceScript, "rewritten".into()).unwrap();
        assert!(state.save_edit().unwrap().is_some());
        assert_eq!(state.prompt(&clip).unwrap().voice_script, "rewritten");
        assert!(state.generated_clip(&clip).is_none());
        assert!(state.editing().is_none());
    }

    #[test]
    fn delete_leaves_no_orphans() {
        let mut state = state_with(3);
        let doomed = id(&state, 1);
        state.apply_video(&doomed, "v.mp4".into());
        state.mark_generating(GenerationMarker::Clip(doomed.clone()));
        state.mark_generating(GenerationMarker::Voice(doomed.clone()));
        state.mark_generating(GenerationMarker::for_asset(MediaKind::Music, doomed.clone()));
        state.begin_edit(&doomed).unwrap();

        let removed = state.delete_clip(&doomed).unwrap();
        assert!(removed.is_some());
        assert!(state.prompt(&doomed).is_none());
        assert!(state.generated_clip(&doomed).is_none());
        assert!(!state.is_generating(&doomed));
        assert_eq!(state.generating().count(), 0);
        assert!(state.editing().is_none());
        assert_eq!(state.prompts().len(), 2);

        assert!(!state.apply_voice(&doomed, "late.wav".into()));
        assert!(state.generated_clip(&doomed).is_none());
    }

    #[test]
    fn delete_unknown_id_is_rejected() {
        let mut state = state_with(1);
        assert!(matches!(state.delete_clip("clip-missing"), Err(StoryboardError::Validation(_))));
    }

    #[test]
    fn partial_results_are_kept_but_not_playable() {
        let mut state = state_with(2);
        let (a, b) = (id(&state, 0), id(&state, 1));
        state.apply_voice(&a, "voice_a.wav".into());
        state.apply_video(&b, "b.mp4".into());
        state.apply_video(&a, "a.mp4".into());

        let playable: Vec<&str> = state.playable_clips().iter().map(|c| c.id()).collect();
        assert_eq!(playable, vec![a.as_str(), b.as_str()]);
        assert_eq!(state.generated_clip(&a).unwrap().voice_url.as_deref(), Some("voice_a.wav"));
    }

    #[test]
    fn pending_skips_generated_and_in_flight() {
        let mut state = state_with(3);
        let (a, b, c) = (id(&state, 0), id(&state, 1), id(&state, 2));
        state.apply_video(&a, "a.mp4".into());
        state.mark_generating(GenerationMarker::Clip(b.clone()));

        let pending: Vec<&str> = state.pending_prompts().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(pending, vec![c.as_str()]);

        state.finish_generating(&GenerationMarker::Clip(b.clone()));
        assert_eq!(state.pending_prompts().len(), 2);
    }

    #[test]
    fn serialized_state_skips_runtime_fields() {
        let mut state = state_with(1);
        let clip = id(&state, 0);
        state.mark_generating(GenerationMarker::Clip(clip.clone()));
        state.warn("something".into());

        let json = serde_json::to_value(&state).unwrap();
        assert!(json.get("clipPrompts").is_some());
        assert!(json.get("generatedClips").is_some());
        assert!(json.get("generating").is_none());
        assert!(json.get("warnings").is_none());
    }
}
