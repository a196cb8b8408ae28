use crate::clip::GeneratedClip;
use crate::error::{Result, StoryboardError};

/// What happens when the last clip's nominal duration runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum PlaybackMode {
    /// Single pass, then stop (editor preview).
    #[default]
    Linear,
    /// Wrap back to the first clip (full-session player).
    Loop,
}

/// Ordered, read-only view over generated clips plus the current-clip pointer.
///
/// `current_index` is always valid while playing and is 0 whenever stopped,
/// so replay restarts from the top.
#[derive(Debug)]
pub struct PlaybackSession<'a> {
    sequence: Vec<&'a GeneratedClip>,
    mode: PlaybackMode,
    current_index: usize,
    playing: bool,
}

impl<'a> PlaybackSession<'a> {
    pub fn new(sequence: Vec<&'a GeneratedClip>, mode: PlaybackMode) -> Self {
        Self {
            sequence,
            mode,
            current_index: 0,
            playing: false,
        }
    }

    pub fn start(&mut self) -> Result<()> {
        if self.sequence.is_empty() {
            return Err(StoryboardError::Validation(
                "No clips available for playback.".to_string(),
            ));
        }
        self.playing = true;
        self.current_index = 0;
        Ok(())
    }

    pub fn stop(&mut self) {
        self.playing = false;
        self.current_index = 0;
    }

    /// One timer tick. Returns the index now showing, or `None` once a linear
    /// pass has run off the end (the session is then stopped).
    pub fn advance(&mut self) -> Option<usize> {
        if !self.playing {
            return None;
        }

        let next = self.current_index + 1;
        if next < self.sequence.len() {
            self.current_index = next;
            return Some(next);
        }

        match self.mode {
            PlaybackMode::Linear => {
                self.stop();
                None
            }
            PlaybackMode::Loop => {
                self.current_index = 0;
                Some(0)
            }
        }
    }

    #[cfg(test)]
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current(&self) -> Option<&'a GeneratedClip> {
        if self.playing {
            self.sequence.get(self.current_index).copied()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::ClipPrompt;

    fn clips(n: usize) -> Vec<GeneratedClip> {
        (0..n)
            .map(|i| {
                let mut clip = GeneratedClip::from_prompt(ClipPrompt::new(
                    format!("shot {i}"),
                    format!("line {i}"),
                    None,
                ));
                clip.video_url = Some(format!("https://cdn.example/{i}.mp4"));
                clip
            })
            .collect()
    }

    #[test]
    fn linear_pass_visits_each_index_once_then_stops() {
        for n in 1..=5 {
            let clips = clips(n);
            let mut session = PlaybackSession::new(clips.iter().collect(), PlaybackMode::Linear);
            session.start().unwrap();

            let mut seen = vec![session.current_index()];
            for tick in 1..=n {
                match session.advance() {
                    Some(index) => {
                        assert!(tick < n, "still playing after {tick} ticks");
                        seen.push(index);
                    }
                    None => assert_eq!(tick, n, "stopped early at tick {tick}"),
                }
            }

            assert_eq!(seen, (0..n).collect::<Vec<_>>());
            assert!(!session.is_playing());
            assert_eq!(session.current_index(), 0);
        }
    }

    #[test]
    fn loop_mode_wraps_and_keeps_playing() {
        let clips = clips(3);
        let mut session = PlaybackSession::new(clips.iter().collect(), PlaybackMode::Loop);
        session.start().unwrap();
        for _ in 0..3 {
            assert!(session.advance().is_some());
        }
        assert_eq!(session.current_index(), 0);
        assert!(session.is_playing());
        assert_eq!(session.current().map(|c| c.id()), Some(clips[0].id()));
    }

    #[test]
    fn explicit_stop_resets_index() {
        let clips = clips(4);
        let mut session = PlaybackSession::new(clips.iter().collect(), PlaybackMode::Loop);
        session.start().unwrap();
        session.advance();
        session.advance();
        assert_eq!(session.current_index(), 2);

        session.stop();
        assert_eq!(session.current_index(), 0);
        assert!(session.current().is_none());
        assert_eq!(session.advance(), None);
    }

    #[test]
    fn empty_sequence_cannot_start() {
        let mut session = PlaybackSession::new(Vec::new(), PlaybackMode::Linear);
        assert!(matches!(session.start(), Err(StoryboardError::Validation(_))));
        assert!(!session.is_playing());
    }
}
