use super::{FieldLayout, PromptFields};
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

fn video_label() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Only a label that opens a line (after an optional list marker) starts a block.
    RE.get_or_init(|| {
        Regex::new(r"(?im)^[ \t]*(?:[-*>#]+|\d+[.)])?[ \t]*video\s+prompt\s*:").expect("valid regex")
    })
}

fn labeled_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?is)video\s+prompt\s*:\s*(.+?)\s*(?:audio\s+prompt\s*:\s*(.*?)\s*)?voice\s+script\s*:\s*(.+?)\s*$",
        )
        .expect("valid regex")
    })
}

fn leading_label() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(?:video\s+prompt|audio\s+prompt|voice\s+script)\s*:").expect("valid regex")
    })
}

fn blank_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\s*\n").expect("valid regex"))
}

fn emphasis() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[*_~`]+").expect("valid regex"))
}

/// Removes markdown emphasis and unescapes `\n` / `\"` left over from
/// double-encoded model output.
pub fn strip_markdown(text: &str) -> String {
    emphasis()
        .replace_all(text, "")
        .replace("\\n", "\n")
        .replace("\\\"", "\"")
}

/// Removes a surrounding ```json fence, if any.
fn strip_code_fence(text: &str) -> &str {
    text.trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// A trailing line holding only a list marker ("2.", "-", "##") belongs to the
/// next block, not to the voice script that precedes it.
fn drop_dangling_marker(text: &str) -> &str {
    let trimmed = text.trim_end();
    match trimmed.rsplit_once('\n') {
        Some((head, last)) if is_list_marker(last) => head.trim_end(),
        _ => trimmed,
    }
}

fn is_list_marker(line: &str) -> bool {
    let line = line.trim();
    !line.is_empty() && line.chars().all(|c| c.is_ascii_digit() || ".)-#>".contains(c))
}

fn non_blank(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Labeled lines: `Video Prompt: ...` followed by `Voice Script: ...`, with an
/// optional `Audio Prompt: ...` between them. Each block runs up to the next
/// `Video Prompt:` label and may span several lines.
pub fn labeled_lines(text: &str, _layout: FieldLayout) -> Vec<PromptFields> {
    let text = strip_markdown(text);
    let starts: Vec<usize> = video_label().find_iter(&text).map(|m| m.start()).collect();

    let mut records = Vec::new();
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(text.len());
        let Some(caps) = labeled_block().captures(&text[start..end]) else {
            continue;
        };

        let video = caps.get(1).and_then(|m| non_blank(m.as_str()));
        let voice = caps.get(3).and_then(|m| non_blank(drop_dangling_marker(m.as_str())));
        if let (Some(video_prompt), Some(voice_script)) = (video, voice) {
            records.push(PromptFields {
                video_prompt,
                voice_script,
                audio_prompt: caps.get(2).and_then(|m| non_blank(m.as_str())),
            });
        }
    }
    records
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRecord {
    #[serde(alias = "video_prompt")]
    video_prompt: String,
    #[serde(alias = "voice_script")]
    voice_script: String,
    #[serde(default, alias = "audio_prompt")]
    audio_prompt: Option<String>,
}

/// Structured list: the whole response is a JSON array of records.
pub fn structured_list(text: &str, _layout: FieldLayout) -> Vec<PromptFields> {
    let Ok(raw) = serde_json::from_str::<Vec<RawRecord>>(strip_code_fence(text)) else {
        return Vec::new();
    };

    raw.into_iter()
        .filter_map(|r| {
            Some(PromptFields {
                video_prompt: non_blank(&r.video_prompt)?,
                voice_script: non_blank(&r.voice_script)?,
                audio_prompt: r.audio_prompt.as_deref().and_then(non_blank),
            })
        })
        .collect()
}

/// Blank-line chunks grouped by the layout's field count. Incomplete trailing
/// groups and groups with an empty field are dropped.
pub fn blank_line_groups(text: &str, layout: FieldLayout) -> Vec<PromptFields> {
    let text = strip_markdown(text);
    let chunks: Vec<String> = blank_line()
        .split(&text)
        .map(|chunk| leading_label().replace(chunk, "").trim().to_string())
        .filter(|chunk| !chunk.is_empty())
        .collect();

    chunks
        .chunks_exact(layout.field_count())
        .filter_map(|group| match layout {
            FieldLayout::VideoVoice => Some(PromptFields {
                video_prompt: non_blank(&group[0])?,
                voice_script: non_blank(&group[1])?,
                audio_prompt: None,
            }),
            FieldLayout::VideoAudioVoice => Some(PromptFields {
                video_prompt: non_blank(&group[0])?,
                audio_prompt: Some(non_blank(&group[1])?),
                voice_script: non_blank(&group[2])?,
            }),
        })
        .collect()
}
