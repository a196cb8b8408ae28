mod music;
mod relay;

pub use music::music_config_for;
pub use relay::{AudioAsset, MusicConfig, RelayClient, VideoConfig, VoiceConfig, DEFAULT_RELAY_URL};
