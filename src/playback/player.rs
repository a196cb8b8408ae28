use super::media::MediaElement;
use super::sequencer::PlaybackSession;
use super::synchronizer::Synchronizer;
use crate::error::Result;
use std::future::Future;
use std::time::Duration;
use tokio::time::{self, Instant};
use tracing::{info, warn};

/// Nominal length of every clip. Sequencing uses this instead of the decoded
/// media length so a short or overlong generation never stalls the session.
pub const DEFAULT_CLIP_DURATION: Duration = Duration::from_secs(8);

#[derive(Debug, Default, PartialEq)]
pub struct PlaybackReport {
    /// Clip ids in the order they were shown.
    pub shown: Vec<String>,
    /// Transient, user-visible problems (voice tracks that would not play, ...).
    pub warnings: Vec<String>,
}

/// Drives a [`PlaybackSession`] on a fixed per-clip timer and keeps the
/// synchronizer pointed at the current clip.
pub struct Player<P, S> {
    sync: Synchronizer<P, S>,
    clip_duration: Duration,
}

impl<P: MediaElement, S: MediaElement> Player<P, S> {
    pub fn new(primary: P, secondary: S, clip_duration: Duration) -> Self {
        Self {
            sync: Synchronizer::new(primary, secondary),
            clip_duration,
        }
    }

    /// Plays until a linear pass ends or `shutdown` resolves. The timer lives
    /// only as long as this call.
    pub async fn run<F>(&mut self, session: &mut PlaybackSession<'_>, shutdown: F) -> Result<PlaybackReport>
    where
        F: Future<Output = ()>,
    {
        session.start()?;
        info!(
            "Playing {} clips ({:?}, {:?} each)",
            session.len(),
            session.mode(),
            self.clip_duration
        );

        let mut report = PlaybackReport::default();
        self.present(session, &mut report);

        let mut timer = time::interval_at(Instant::now() + self.clip_duration, self.clip_duration);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    if session.advance().is_none() {
                        info!("Reached the end of the storyboard");
                        break;
                    }
                    self.present(session, &mut report);
                }
                _ = &mut shutdown => {
                    info!("Playback stopped");
                    session.stop();
                    break;
                }
            }
        }

        self.sync.pause();
        Ok(report)
    }

    fn present(&mut self, session: &PlaybackSession<'_>, report: &mut PlaybackReport) {
        let Some(clip) = session.current() else {
            return;
        };
        info!(
            "Clip {} of {}: {}",
            session.current_index() + 1,
            session.len(),
            clip.prompt.voice_script
        );
        report.shown.push(clip.id().to_string());

        self.sync.pause();
        let video = clip.video_url.as_deref().unwrap_or_default();
        if let Err(e) = self.sync.primary_mut().load(video) {
            warn!("Video for {} unavailable: {}", clip.id(), e);
            report.warnings.push(format!("{}: video {}", clip.id(), e));
        }

        // Every clip starts from the top, including a loop's second pass.
        self.sync.attach(clip);
        self.sync.seek(0.0);
        if let Err(e) = self.sync.play() {
            warn!("Video for {} did not start: {}", clip.id(), e);
            report.warnings.push(format!("{}: video {}", clip.id(), e));
        }
        if let Some(e) = self.sync.audio_error() {
            report.warnings.push(format!("{}: voice {}", clip.id(), e));
        }
    }

    #[cfg(test)]
    pub fn synchronizer(&self) -> &Synchronizer<P, S> {
        &self.sync
    }
}
