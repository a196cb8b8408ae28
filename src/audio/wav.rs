// WAV (RIFF) writers for relay audio: TTS PCM payloads and the local
// placeholder music used when the music relay is unavailable.
use crate::api::MusicConfig;
use crate::error::{Result, StoryboardError};
use std::f64::consts::PI;

/// Longest placeholder track the synthesizer will render.
pub const MAX_PLACEHOLDER_SECONDS: f64 = 600.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSpec {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl WavSpec {
    /// Format of the TTS relay's raw PCM: 24 kHz mono s16le.
    pub const TTS: WavSpec = WavSpec { sample_rate: 24_000, channels: 1, bits_per_sample: 16 };
    pub const MUSIC: WavSpec = WavSpec { sample_rate: 44_100, channels: 2, bits_per_sample: 16 };

    fn block_align(&self) -> u16 {
        self.channels * (self.bits_per_sample / 8)
    }
}

/// Layout:
///   RIFF  <file_size - 8>  WAVE
///   fmt   16  <format=1 PCM>  <channels>  <rate>  <byte_rate>  <block_align>  <bits>
///   [LIST INFO ICMT <comment>]
///   data  <data_size>  <samples…>
fn write_wav(spec: WavSpec, pcm: &[u8], comment: Option<&str>) -> Result<Vec<u8>> {
    let info = comment.map(info_chunk).unwrap_or_default();
    let too_large = || StoryboardError::Generation(format!("{} bytes of audio do not fit in a WAV file", pcm.len()));
    let data_size = u32::try_from(pcm.len()).map_err(|_| too_large())?;
    let riff_size = u32::try_from(4 + (8 + 16) + info.len() + 8)
        .ok()
        .and_then(|header| header.checked_add(data_size))
        .ok_or_else(too_large)?;
    let byte_rate = spec.sample_rate * spec.block_align() as u32;

    let mut out = Vec::with_capacity(pcm.len() + info.len() + 44);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&riff_size.to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&spec.channels.to_le_bytes());
    out.extend_from_slice(&spec.sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&spec.block_align().to_le_bytes());
    out.extend_from_slice(&spec.bits_per_sample.to_le_bytes());

    out.extend_from_slice(&info);

    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_size.to_le_bytes());
    out.extend_from_slice(pcm);
    Ok(out)
}

/// `LIST` chunk holding a single `INFO/ICMT` comment, NUL-terminated and
/// padded to an even length.
fn info_chunk(comment: &str) -> Vec<u8> {
    let mut text = comment.as_bytes().to_vec();
    text.push(0);
    if text.len() % 2 == 1 {
        text.push(0);
    }

    let mut chunk = Vec::with_capacity(text.len() + 20);
    chunk.extend_from_slice(b"LIST");
    chunk.extend_from_slice(&(4 + 8 + text.len() as u32).to_le_bytes());
    chunk.extend_from_slice(b"INFO");
    chunk.extend_from_slice(b"ICMT");
    chunk.extend_from_slice(&(text.len() as u32).to_le_bytes());
    chunk.extend_from_slice(&text);
    chunk
}

pub fn wrap_pcm_in_wav(pcm: &[u8], spec: WavSpec) -> Result<Vec<u8>> {
    write_wav(spec, pcm, None)
}

fn partials(style: &str) -> &'static [(f64, f64)] {
    match style {
        "cinematic" => &[(220.0, 0.3), (440.0, 0.2), (110.0, 0.1)],
        "upbeat" => &[(330.0, 0.4), (660.0, 0.3)],
        _ => &[(180.0, 0.2), (360.0, 0.15)],
    }
}

fn beats_per_minute(tempo: &str) -> f64 {
    match tempo {
        "slow" => 60.0,
        "fast" => 140.0,
        _ => 100.0,
    }
}

/// Stand-in music: a few sine partials chosen by style, pulsed at the tempo,
/// with 250 ms fades. The requested parameters are kept in the file's INFO
/// comment so downstream tools can tell what was asked for. Durations are
/// clamped to `0..=MAX_PLACEHOLDER_SECONDS`.
pub fn synthesize_placeholder(config: &MusicConfig) -> Result<Vec<u8>> {
    let spec = WavSpec::MUSIC;
    let duration = if config.duration.is_finite() {
        config.duration.clamp(0.0, MAX_PLACEHOLDER_SECONDS)
    } else {
        0.0
    };
    let rate = spec.sample_rate as f64;
    let frames = (duration * rate).round() as usize;
    let partials = partials(&config.style);
    let beat_hz = beats_per_minute(&config.tempo) / 60.0;

    let mut pcm = Vec::with_capacity(frames * spec.block_align() as usize);
    for i in 0..frames {
        let t = i as f64 / rate;
        let mut amplitude: f64 = partials
            .iter()
            .map(|(freq, gain)| (2.0 * PI * freq * t).sin() * gain)
            .sum();

        // Gentle pulse on each beat: 0.75..1.0
        amplitude *= 0.875 + 0.125 * (2.0 * PI * beat_hz * t).cos();

        let envelope = (t * 4.0).min(1.0) * ((duration - t) * 4.0).min(1.0);
        let sample = (amplitude * envelope).clamp(-1.0, 1.0);
        let value = (sample * i16::MAX as f64) as i16;

        for _ in 0..spec.channels {
            pcm.extend_from_slice(&value.to_le_bytes());
        }
    }

    let comment = format!(
        "placeholder; duration={}; style={}; tempo={}; mood={}",
        duration, config.style, config.tempo, config.mood
    );
    write_wav(spec, &pcm, Some(&comment))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u32_at(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    #[test]
    fn pcm_wrap_has_canonical_header() {
        let pcm = vec![0u8; 480];
        let wav = wrap_pcm_in_wav(&pcm, WavSpec::TTS).unwrap();
        assert_eq!(wav.len(), 44 + 480);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(u32_at(&wav, 4), 36 + 480);
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(u32_at(&wav, 24), 24_000);
        assert_eq!(u32_at(&wav, 28), 48_000);
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(u32_at(&wav, 40), 480);
    }

    #[test]
    fn placeholder_keeps_duration_and_parameters() {
        let config = MusicConfig {
            duration: 2.0,
            style: "upbeat".into(),
            tempo: "fast".into(),
            mood: "bright".into(),
            ..MusicConfig::default()
        };
        let wav = synthesize_placeholder(&config).unwrap();
        assert_eq!(u32_at(&wav, 4) as usize, wav.len() - 8);

        let data_at = wav.windows(4).position(|w| w == b"data").unwrap();
        let data_size = u32_at(&wav, data_at + 4) as usize;
        assert_eq!(data_size, 2 * 44_100 * 4);

        let text = String::from_utf8_lossy(&wav[..data_at]);
        assert!(text.contains("duration=2; style=upbeat; tempo=fast; mood=bright"));
    }

    #[test]
    fn placeholder_fades_in_from_silence() {
        let config = MusicConfig::default();
        let wav = synthesize_placeholder(&config).unwrap();
        let data_at = wav.windows(4).position(|w| w == b"data").unwrap() + 8;
        let first = i16::from_le_bytes([wav[data_at], wav[data_at + 1]]);
        assert_eq!(first, 0);
    }

    #[test]
    fn oversized_placeholder_is_clamped() {
        let config = MusicConfig {
            duration: 90_000.0,
            ..MusicConfig::default()
        };
        let wav = synthesize_placeholder(&config).unwrap();
        let data_at = wav.windows(4).position(|w| w == b"data").unwrap();
        let data_size = u32_at(&wav, data_at + 4) as usize;
        assert_eq!(data_size, 600 * 44_100 * 4);
        assert_eq!(u32_at(&wav, 4) as usize, wav.len() - 8);

        let text = String::from_utf8_lossy(&wav[..data_at]);
        assert!(text.contains("duration=600;"));
    }

    #[test]
    fn non_finite_duration_renders_silence() {
        let config = MusicConfig {
            duration: f64::NAN,
            ..MusicConfig::default()
        };
        let wav = synthesize_placeholder(&config).unwrap();
        let data_at = wav.windows(4).position(|w| w == b"data").unwrap();
        assert_eq!(u32_at(&wav, data_at + 4), 0);
    }
}
