use crate::audio::{synthesize_placeholder, wrap_pcm_in_wav, WavSpec};
use crate::clip::ClipPrompt;
use crate::error::{Result, StoryboardError};
use crate::prompt::{extract_clip_prompts, FieldLayout};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_RELAY_URL: &str = "http://localhost:8000/api";

/// Video generation is polled upstream and can take minutes.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoConfig {
    pub aspect_ratio: String,
    pub duration_seconds: u32,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            aspect_ratio: "16:9".to_string(),
            duration_seconds: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub voice_name: String,
    pub language: String,
    pub speed: f32,
    pub pitch: f32,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            voice_name: "Kore".to_string(),
            language: "en-US".to_string(),
            speed: 1.0,
            pitch: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicConfig {
    /// Seconds.
    pub duration: f64,
    pub style: String,
    pub tempo: String,
    pub mood: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instruments: Vec<String>,
}

impl Default for MusicConfig {
    fn default() -> Self {
        Self {
            duration: 30.0,
            style: "cinematic".to_string(),
            tempo: "medium".to_string(),
            mood: "calm".to_string(),
            instruments: Vec::new(),
        }
    }
}

/// Audio returned by the relay: inline WAV bytes or a URL to fetch later.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioAsset {
    Wav(Vec<u8>),
    Url(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptRecord {
    video_prompt: String,
    voice_script: String,
    #[serde(default)]
    audio_prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoResponse {
    video_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AudioResponse {
    voice_url: Option<String>,
    audio_url: Option<String>,
    audio_data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Client for the generation relay's `generate-*` endpoints.
#[derive(Debug, Clone)]
pub struct RelayClient {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl RelayClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    fn post(&self, endpoint: &str) -> RequestBuilder {
        let request = self.client.post(format!("{}/{}", self.base_url, endpoint));
        match &self.api_key {
            Some(key) => request.header("Authorization", format!("Bearer {}", key)),
            None => request,
        }
    }

    /// Maps relay status codes onto the error taxonomy: 4xx is bad input, 5xx
    /// is an upstream generation failure.
    async fn check(endpoint: &str, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.error)
            .unwrap_or(body);
        let message = format!("{} returned {}: {}", endpoint, status, message);

        if status.is_client_error() {
            Err(StoryboardError::Validation(message))
        } else {
            Err(StoryboardError::Generation(message))
        }
    }

    /// Turns a story idea into clip prompts.
    pub async fn generate_prompts(&self, user_input: &str, layout: FieldLayout) -> Result<Vec<ClipPrompt>> {
        let user_input = user_input.trim();
        if user_input.is_empty() {
            return Err(StoryboardError::Validation("userInput is required".to_string()));
        }

        info!("Requesting storyboard prompts ({} characters of input)", user_input.len());
        let response = self
            .post("generate-prompts")
            .json(&json!({ "userInput": user_input }))
            .send()
            .await?;
        let body = Self::check("generate-prompts", response).await?.text().await?;

        let prompts = match serde_json::from_str::<Vec<PromptRecord>>(&body) {
            Ok(records) => records
                .into_iter()
                .filter(|r| !r.video_prompt.trim().is_empty() && !r.voice_script.trim().is_empty())
                .map(|r| {
                    ClipPrompt::new(
                        r.video_prompt.trim().to_string(),
                        r.voice_script.trim().to_string(),
                        r.audio_prompt,
                    )
                })
                .collect(),
            Err(e) => {
                debug!("Relay returned unstructured prompts ({}), parsing text", e);
                extract_clip_prompts(&body, layout)?
            }
        };

        if prompts.is_empty() {
            return Err(StoryboardError::EmptyResult("relay returned no prompts".to_string()));
        }
        info!("Received {} clip prompts", prompts.len());
        Ok(prompts)
    }

    /// Long-running: the relay polls the upstream job before answering.
    pub async fn generate_video(&self, video_prompt: &str, config: &VideoConfig) -> Result<String> {
        if video_prompt.trim().is_empty() {
            return Err(StoryboardError::Validation("videoPrompt is required".to_string()));
        }

        info!("Generating video for prompt: {}", video_prompt);
        let response = self
            .post("generate-video")
            .json(&json!({ "videoPrompt": video_prompt, "config": config }))
            .send()
            .await?;
        let video: VideoResponse = Self::check("generate-video", response).await?.json().await?;

        video
            .video_url
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| StoryboardError::EmptyResult("no video was generated".to_string()))
    }

    pub async fn generate_voice(&self, voice_script: &str, config: &VoiceConfig) -> Result<AudioAsset> {
        if voice_script.trim().is_empty() {
            return Err(StoryboardError::Validation("voiceScript is required".to_string()));
        }

        info!("Generating voice for script: {}", voice_script);
        let response = self
            .post("generate-voice")
            .json(&json!({ "voiceScript": voice_script, "config": config }))
            .send()
            .await?;
        let response = Self::check("generate-voice", response).await?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("audio/wav") || content_type.starts_with("audio/x-wav") {
            let bytes = response.bytes().await?;
            return non_empty_wav(bytes.to_vec(), "voice");
        }
        if content_type.starts_with("audio/l16") || content_type.starts_with("audio/pcm") {
            let pcm = response.bytes().await?;
            if pcm.is_empty() {
                return Err(StoryboardError::EmptyResult("no audio data returned for voice".to_string()));
            }
            return Ok(AudioAsset::Wav(wrap_pcm_in_wav(&pcm, WavSpec::TTS)?));
        }

        let audio: AudioResponse = response.json().await?;
        audio_from_json(audio, "voice")
    }

    /// Falls back to a locally synthesized placeholder when the relay is
    /// unreachable or its upstream fails.
    pub async fn generate_music(&self, audio_prompt: &str, config: &MusicConfig) -> Result<AudioAsset> {
        if audio_prompt.trim().is_empty() {
            return Err(StoryboardError::Validation("audioPrompt is required".to_string()));
        }

        info!("Generating music for prompt: {}", audio_prompt);
        match self.request_music(audio_prompt, config).await {
            Ok(asset) => Ok(asset),
            Err(StoryboardError::Validation(message)) => Err(StoryboardError::Validation(message)),
            Err(e) => {
                warn!("Music relay unavailable, using synthetic placeholder: {}", e);
                synthesize_placeholder(config).map(AudioAsset::Wav)
            }
        }
    }

    async fn request_music(&self, audio_prompt: &str, config: &MusicConfig) -> Result<AudioAsset> {
        let response = self
            .post("generate-music")
            .json(&json!({ "audioPrompt": audio_prompt, "config": config }))
            .send()
            .await?;
        let audio: AudioResponse = Self::check("generate-music", response).await?.json().await?;
        audio_from_json(audio, "music")
    }

    /// Fetches a generated asset into the working directory.
    pub async fn download(&self, url: &str, output_path: &Path) -> Result<()> {
        info!("Downloading {}", url);
        let response = self.client.get(url).send().await?;
        let data = Self::check("download", response).await?.bytes().await?;
        tokio::fs::write(output_path, data).await?;
        debug!("Saved to {}", output_path.display());
        Ok(())
    }
}

fn non_empty_wav(bytes: Vec<u8>, kind: &str) -> Result<AudioAsset> {
    if bytes.is_empty() {
        return Err(StoryboardError::EmptyResult(format!("no audio data returned for {}", kind)));
    }
    Ok(AudioAsset::Wav(bytes))
}

fn audio_from_json(audio: AudioResponse, kind: &str) -> Result<AudioAsset> {
    if let Some(url) = audio.voice_url.or(audio.audio_url).filter(|u| !u.trim().is_empty()) {
        return Ok(AudioAsset::Url(url));
    }
    match audio.audio_data {
        Some(data) => {
            let bytes = BASE64.decode(data.trim()).map_err(|e| {
                StoryboardError::Generation(format!("invalid {} audio payload: {}", kind, e))
            })?;
            non_empty_wav(bytes, kind)
        }
        None => Err(StoryboardError::EmptyResult(format!("no audio data returned for {}", kind))),
    }
}
