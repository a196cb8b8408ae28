use crate::clip::is_remote;
use std::path::Path;
use std::time::Instant;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MediaError {
    #[error("failed to load {0}")]
    Load(String),

    #[error("playback rejected: {0}")]
    PlayRejected(String),

    #[error("no source attached")]
    NoSource,
}

/// A playable media element with its own clock (a `<video>` or `<audio>` in a
/// browser, a headless clock in the CLI preview).
pub trait MediaElement {
    fn load(&mut self, src: &str) -> Result<(), MediaError>;

    fn clear(&mut self);

    fn source(&self) -> Option<&str>;

    fn play(&mut self) -> Result<(), MediaError>;

    fn pause(&mut self);

    fn is_paused(&self) -> bool;

    /// Seconds from the start of the resource.
    fn current_time(&self) -> f64;

    fn set_current_time(&mut self, seconds: f64);
}

/// Clock-only media element. Accepts http(s) URLs as-is and local files that
/// exist; "playing" advances a monotonic clock.
#[derive(Debug, Default)]
pub struct HeadlessMedia {
    src: Option<String>,
    offset: f64,
    started: Option<Instant>,
}

impl HeadlessMedia {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MediaElement for HeadlessMedia {
    fn load(&mut self, src: &str) -> Result<(), MediaError> {
        self.src = None;
        self.offset = 0.0;
        self.started = None;

        if !is_remote(src) && !Path::new(src).exists() {
            return Err(MediaError::Load(src.to_string()));
        }
        self.src = Some(src.to_string());
        Ok(())
    }

    fn clear(&mut self) {
        self.src = None;
        self.offset = 0.0;
        self.started = None;
    }

    fn source(&self) -> Option<&str> {
        self.src.as_deref()
    }

    fn play(&mut self) -> Result<(), MediaError> {
        if self.src.is_none() {
            return Err(MediaError::NoSource);
        }
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(started) = self.started.take() {
            self.offset += started.elapsed().as_secs_f64();
        }
    }

    fn is_paused(&self) -> bool {
        self.started.is_none()
    }

    fn current_time(&self) -> f64 {
        self.offset + self.started.map_or(0.0, |s| s.elapsed().as_secs_f64())
    }

    fn set_current_time(&mut self, seconds: f64) {
        self.offset = seconds.max(0.0);
        if self.started.is_some() {
            self.started = Some(Instant::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_local_file_fails_to_load() {
        let mut media = HeadlessMedia::new();
        assert!(matches!(media.load("/definitely/not/here.wav"), Err(MediaError::Load(_))));
        assert_eq!(media.source(), None);
        assert_eq!(media.play(), Err(MediaError::NoSource));
    }

    #[test]
    fn remote_url_loads_and_seeks() {
        let mut media = HeadlessMedia::new();
        media.load("https://cdn.example/clip.mp4").unwrap();
        assert!(media.is_paused());

        media.set_current_time(3.5);
        assert!((media.current_time() - 3.5).abs() < 1e-9);

        media.play().unwrap();
        assert!(!media.is_paused());
        assert!(media.current_time() >= 3.5);

        media.pause();
        let paused_at = media.current_time();
        assert!((media.current_time() - paused_at).abs() < 1e-9);
    }

    #[test]
    fn existing_local_file_loads() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut media = HeadlessMedia::new();
        media.load(file.path().to_str().unwrap()).unwrap();
        assert!(media.source().is_some());
    }
}
