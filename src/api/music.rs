use super::MusicConfig;
use regex::Regex;
use std::sync::OnceLock;

const MOODS: &[(&[&str], &str)] = &[
    (&["happy", "joy", "upbeat"], "happy"),
    (&["sad", "melancholy", "dark"], "sad"),
    (&["energetic", "action", "intense"], "energetic"),
    (&["dramatic", "epic", "tension"], "dramatic"),
    (&["calm", "gentle", "peaceful", "ambient", "relax"], "calm"),
];

const TEMPOS: &[(&[&str], &str)] = &[
    (&["fast", "quick", "rapid"], "fast"),
    (&["slow", "gentle", "peaceful"], "slow"),
    (&["medium", "moderate"], "medium"),
];

const STYLES: &[(&[&str], &str)] = &[
    (&["orchestral", "symphony", "score"], "orchestral"),
    (&["electronic", "synth", "edm", "techno", "trance", "house"], "electronic"),
    (&["ambient", "atmospheric"], "ambient"),
    (&["rock", "guitar"], "rock"),
    (&["jazz"], "jazz"),
    (&["pop"], "pop"),
    (&["folk"], "folk"),
    (&["hip hop", "trap", "rap"], "hip hop"),
    (&["cinematic"], "cinematic"),
];

const INSTRUMENTS: &[&str] = &[
    "accordion", "alto saxophone", "bagpipes", "balalaika", "banjo", "bass", "bongos", "bouzouki",
    "cello", "charango", "clarinet", "clavichord", "conga", "didgeridoo", "djembe", "drum machine",
    "drums", "dulcimer", "fiddle", "flamenco guitar", "flute", "glockenspiel", "guitar", "hang drum",
    "harmonica", "harp", "harpsichord", "kalimba", "koto", "mandolin", "marimba", "mbira", "moog",
    "ocarina", "piano", "pipa", "rhodes piano", "saxophone", "shamisen", "sitar", "steel drum", "synth",
    "tabla", "trumpet", "tuba", "vibraphone", "viola ensemble", "violin", "woodwinds",
];

fn seconds() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)\s*(?:seconds|s)\b").expect("valid regex"))
}

fn first_match(text: &str, table: &[(&[&str], &str)]) -> Option<String> {
    table
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| text.contains(k)))
        .map(|(_, value)| value.to_string())
}

/// Request parameters for one audio prompt. Keywords in the prompt pick the
/// mood, tempo, style and instruments, and "<n> seconds" / "<n>s" overrides
/// the duration; anything not mentioned keeps `base`.
pub fn music_config_for(audio_prompt: &str, base: &MusicConfig) -> MusicConfig {
    let text = audio_prompt.to_lowercase();
    let mut config = base.clone();

    if let Some(mood) = first_match(&text, MOODS) {
        config.mood = mood;
    }
    if let Some(tempo) = first_match(&text, TEMPOS) {
        config.tempo = tempo;
    }
    if let Some(style) = first_match(&text, STYLES) {
        config.style = style;
    }
    if let Some(duration) = seconds()
        .captures(&text)
        .and_then(|c| c[1].parse::<u32>().ok())
        .filter(|d| *d > 0)
    {
        config.duration = f64::from(duration);
    }

    let instruments: Vec<String> = INSTRUMENTS
        .iter()
        .filter(|name| text.contains(*name))
        .map(|name| name.to_string())
        .collect();
    if !instruments.is_empty() {
        config.instruments = instruments;
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_pick_mood_tempo_and_style() {
        let config = music_config_for("Fast, intense synth pulse", &MusicConfig::default());
        assert_eq!(config.mood, "energetic");
        assert_eq!(config.tempo, "fast");
        assert_eq!(config.style, "electronic");
        assert_eq!(config.instruments, vec!["synth".to_string()]);
    }

    #[test]
    fn earlier_rules_win() {
        // "gentle" is both a calm mood and a slow tempo; "dark" beats "calm".
        let config = music_config_for("dark but gentle piano", &MusicConfig::default());
        assert_eq!(config.mood, "sad");
        assert_eq!(config.tempo, "slow");
        assert_eq!(config.instruments, vec!["piano".to_string()]);
    }

    #[test]
    fn unmentioned_parameters_keep_the_base() {
        let base = MusicConfig { duration: 8.0, ..MusicConfig::default() };
        let config = music_config_for("seagulls over the water", &base);
        assert_eq!(config, base);
    }

    #[test]
    fn explicit_duration_overrides_base() {
        let base = MusicConfig { duration: 8.0, ..MusicConfig::default() };
        assert_eq!(music_config_for("12 seconds of jazz", &base).duration, 12.0);
        assert_eq!(music_config_for("a 20s orchestral sting", &base).duration, 20.0);
        assert_eq!(music_config_for("0 seconds of silence", &base).duration, 8.0);
    }
}
