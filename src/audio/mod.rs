mod wav;

pub use wav::{synthesize_placeholder, wrap_pcm_in_wav, WavSpec};
