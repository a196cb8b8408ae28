use super::media::{MediaElement, MediaError};
use crate::clip::GeneratedClip;
use tracing::{debug, warn};

/// Keeps a clip's narration track aligned with its video.
///
/// The two elements load independently. The video is the clock; the voice
/// track follows it on play and seek, and stops with it on pause. Voice sync is
/// best effort: a missing track is skipped and a failed one only sets
/// [`Synchronizer::audio_error`].
pub struct Synchronizer<P, S> {
    primary: P,
    secondary: S,
    attached: Option<String>,
    ready: bool,
    audio_error: Option<MediaError>,
}

impl<P: MediaElement, S: MediaElement> Synchronizer<P, S> {
    pub fn new(primary: P, secondary: S) -> Self {
        Self {
            primary,
            secondary,
            attached: None,
            ready: false,
            audio_error: None,
        }
    }

    /// Binds the clip's voice track to the secondary element. Re-attaching the
    /// same clip reloads the track and nothing else.
    pub fn attach(&mut self, clip: &GeneratedClip) {
        if self.attached.as_deref() == Some(clip.id()) {
            debug!("Reloading voice track for {}", clip.id());
        }
        self.attached = Some(clip.id().to_string());
        self.ready = false;
        self.audio_error = None;

        let Some(voice_url) = clip.voice_url.as_deref() else {
            self.secondary.clear();
            return;
        };

        match self.secondary.load(voice_url) {
            Ok(()) => self.ready = true,
            Err(e) => {
                warn!("Voice track for {} unavailable: {}", clip.id(), e);
                self.audio_error = Some(e);
            }
        }
    }

    pub fn on_primary_play(&mut self) {
        if !self.ready {
            return;
        }
        self.secondary.set_current_time(self.primary.current_time());
        if let Err(e) = self.secondary.play() {
            warn!("Voice playback rejected, continuing without narration: {}", e);
            self.audio_error = Some(e);
        }
    }

    pub fn on_primary_pause(&mut self) {
        if self.secondary.source().is_some() {
            self.secondary.pause();
        }
    }

    pub fn on_primary_seek(&mut self) {
        if self.ready {
            self.secondary.set_current_time(self.primary.current_time());
        }
    }

    /// Starts the primary and fires [`Self::on_primary_play`].
    pub fn play(&mut self) -> Result<(), MediaError> {
        self.primary.play()?;
        self.on_primary_play();
        Ok(())
    }

    pub fn pause(&mut self) {
        self.primary.pause();
        self.on_primary_pause();
    }

    pub fn seek(&mut self, seconds: f64) {
        self.primary.set_current_time(seconds);
        self.on_primary_seek();
    }

    #[cfg(test)]
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn audio_error(&self) -> Option<&MediaError> {
        self.audio_error.as_ref()
    }

    #[cfg(test)]
    pub fn attached(&self) -> Option<&str> {
        self.attached.as_deref()
    }

    #[cfg(test)]
    pub fn primary(&self) -> &P {
        &self.primary
    }

    pub fn primary_mut(&mut self) -> &mut P {
        &mut self.primary
    }

    #[cfg(test)]
    pub fn secondary(&self) -> &S {
        &self.secondary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::ClipPrompt;
    use crate::playback::testing::FakeMedia;

    fn clip(voice: Option<&str>) -> GeneratedClip {
        let mut clip = GeneratedClip::from_prompt(ClipPrompt::new("shot".into(), "line".into(), None));
        clip.video_url = Some("video.mp4".into());
        clip.voice_url = voice.map(str::to_string);
        clip
    }

    fn sync() -> Synchronizer<FakeMedia, FakeMedia> {
        let mut primary = FakeMedia::default();
        primary.load("video.mp4").unwrap();
        Synchronizer::new(primary, FakeMedia::default())
    }

    #[test]
    fn attach_without_voice_leaves_secondary_unset() {
        let mut sync = sync();
        sync.attach(&clip(None));
        assert!(!sync.is_ready());
        assert_eq!(sync.secondary().source(), None);
        assert!(sync.audio_error().is_none());

        sync.play().unwrap();
        sync.seek(4.0);
        sync.pause();
        assert!(sync.secondary().is_paused());
        assert_eq!(sync.secondary().plays, 0);
    }

    #[test]
    fn play_aligns_secondary_clock() {
        let mut sync = sync();
        sync.attach(&clip(Some("voice.wav")));
        assert!(sync.is_ready());

        sync.primary_mut().set_current_time(2.75);
        sync.play().unwrap();

        let drift = (sync.secondary().current_time() - sync.primary().current_time()).abs();
        assert!(drift < 1e-6);
        assert!(!sync.secondary().is_paused());
    }

    #[test]
    fn rejected_voice_play_is_non_fatal() {
        let mut sync = sync();
        sync.attach(&clip(Some("voice.wav")));
        sync.secondary.reject_play = true;

        sync.play().unwrap();
        assert!(!sync.primary().is_paused());
        assert!(matches!(sync.audio_error(), Some(MediaError::PlayRejected(_))));
    }

    #[test]
    fn failed_voice_load_is_reported_not_raised() {
        let mut sync = sync();
        sync.secondary.fail_load = true;
        sync.attach(&clip(Some("voice.wav")));
        assert!(!sync.is_ready());
        assert!(matches!(sync.audio_error(), Some(MediaError::Load(_))));

        sync.play().unwrap();
        assert_eq!(sync.secondary().plays, 0);
    }

    #[test]
    fn pause_does_not_reseek_and_seek_keeps_pause_state() {
        let mut sync = sync();
        sync.attach(&clip(Some("voice.wav")));
        sync.play().unwrap();

        sync.secondary.set_current_time(1.0);
        sync.pause();
        assert!(sync.secondary().is_paused());
        assert_eq!(sync.secondary().current_time(), 1.0);

        sync.seek(6.5);
        assert_eq!(sync.secondary().current_time(), 6.5);
        assert!(sync.secondary().is_paused());
    }

    #[test]
    fn reattaching_same_clip_only_reloads() {
        let mut sync = sync();
        let clip = clip(Some("voice.wav"));
        sync.attach(&clip);
        sync.attach(&clip);
        assert_eq!(sync.secondary().loads, 2);
        assert_eq!(sync.attached(), Some(clip.id()));
        assert!(sync.is_ready());
    }
}
