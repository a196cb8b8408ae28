mod media;
mod player;
mod sequencer;
mod synchronizer;

pub use media::HeadlessMedia;
pub use player::{Player, DEFAULT_CLIP_DURATION};
pub use sequencer::{PlaybackMode, PlaybackSession};
