//! Gemini `generateContent` REST driver.
//!
//! Sends one user turn to `/v1beta/models/{model}:generateContent`. Text
//! generation returns the text of the first candidate; speech asks the TTS
//! model for an audio modality and returns the inline PCM wrapped as WAV.

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

use super::wav::{self, PcmFormat};
use super::{GeminiSettings, SpeechSynthesizer, TextGenerator};

/// Errors raised by [`GeminiClient`].
#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    /// Transport failure or undecodable body.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("Gemini API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The API answered but produced no text.
    #[error("Gemini returned no text{}", blocked_suffix(.reason))]
    EmptyResponse { reason: Option<String> },

    /// The TTS model answered without inline audio.
    #[error("Gemini returned no audio{}", blocked_suffix(.reason))]
    NoAudio { reason: Option<String> },

    /// Inline audio was not valid base64.
    #[error("Invalid audio payload: {0}")]
    InvalidAudio(#[from] base64::DecodeError),
}

fn blocked_suffix(reason: &Option<String>) -> String {
    reason
        .as_deref()
        .map(|r| format!(" (blocked: {r})"))
        .unwrap_or_default()
}

/// Instruction prepended to text sent to the TTS model.
const SPEECH_PROMPT_PREFIX: &str = "Say cheerfully: ";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig<'a>>,
}

impl<'a> GenerateContentRequest<'a> {
    fn user_turn(text: &'a str) -> Self {
        Self {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text }],
            }],
            generation_config: None,
        }
    }
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_modalities: [&'static str; 1],
    speech_config: SpeechConfig<'a>,
}

impl<'a> GenerationConfig<'a> {
    fn audio(voice_name: &'a str) -> Self {
        Self {
            response_modalities: ["AUDIO"],
            speech_config: SpeechConfig {
                voice_config: VoiceConfig {
                    prebuilt_voice_config: PrebuiltVoiceConfig { voice_name },
                },
            },
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig<'a> {
    voice_config: VoiceConfig<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig<'a> {
    prebuilt_voice_config: PrebuiltVoiceConfig<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig<'a> {
    voice_name: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: Option<String>,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate.
    fn into_text(self) -> Result<String, GeminiError> {
        let block_reason = self.prompt_feedback.and_then(|f| f.block_reason);
        let Some(candidate) = self.candidates.into_iter().next() else {
            return Err(GeminiError::EmptyResponse {
                reason: block_reason,
            });
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(GeminiError::EmptyResponse {
                reason: block_reason.or(candidate.finish_reason),
            });
        }
        Ok(text)
    }

    /// Decoded PCM of the first inline audio part, with its sample format.
    fn into_audio(self) -> Result<(Vec<u8>, PcmFormat), GeminiError> {
        let block_reason = self.prompt_feedback.and_then(|f| f.block_reason);
        let Some(candidate) = self.candidates.into_iter().next() else {
            return Err(GeminiError::NoAudio {
                reason: block_reason,
            });
        };

        let inline = candidate
            .content
            .and_then(|c| c.parts.into_iter().find_map(|p| p.inline_data));
        let Some(inline) = inline else {
            return Err(GeminiError::NoAudio {
                reason: block_reason.or(candidate.finish_reason),
            });
        };

        let pcm = STANDARD.decode(inline.data.as_bytes())?;
        let format = inline
            .mime_type
            .as_deref()
            .map(PcmFormat::from_mime)
            .unwrap_or_default();
        Ok((pcm, format))
    }
}

/// Client for the Gemini REST API.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    settings: GeminiSettings,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("settings", &self.settings)
            .finish()
    }
}

impl GeminiClient {
    /// Create a client with the configured request timeout.
    pub fn new(settings: GeminiSettings) -> Result<Self, GeminiError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;
        Ok(Self { http, settings })
    }

    /// Full `generateContent` URL for the configured text model.
    #[must_use]
    pub fn endpoint(&self) -> String {
        self.endpoint_for(&self.settings.model)
    }

    /// Full `generateContent` URL for the configured speech model.
    #[must_use]
    pub fn speech_endpoint(&self) -> String {
        self.endpoint_for(&self.settings.tts_model)
    }

    fn endpoint_for(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{model}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
        )
    }

    async fn generate_content(
        &self,
        url: String,
        body: &GenerateContentRequest<'_>,
    ) -> Result<GenerateContentResponse, GeminiError> {
        let resp = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.settings.api_key)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let raw = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&raw)
                .map(|b| b.error.message)
                .unwrap_or_else(|_| {
                    if raw.trim().is_empty() {
                        status.canonical_reason().unwrap_or("Unknown error").to_string()
                    } else {
                        raw
                    }
                });
            return Err(GeminiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.json::<GenerateContentResponse>().await?)
    }

    /// Generate text for a single user prompt.
    pub async fn generate_text(&self, prompt: &str) -> Result<String, GeminiError> {
        let body = GenerateContentRequest::user_turn(prompt);
        self.generate_content(self.endpoint(), &body)
            .await?
            .into_text()
    }

    /// Speak `text` with `voice`, returning a WAV file.
    pub async fn speak(&self, text: &str, voice: &str) -> Result<Vec<u8>, GeminiError> {
        let prompt = format!("{SPEECH_PROMPT_PREFIX}{text}");
        let mut body = GenerateContentRequest::user_turn(&prompt);
        body.generation_config = Some(GenerationConfig::audio(voice));

        let (pcm, format) = self
            .generate_content(self.speech_endpoint(), &body)
            .await?
            .into_audio()?;
        Ok(wav::from_pcm(&pcm, format))
    }
}

#[async_trait::async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        tracing::debug!(
            model = %self.settings.model,
            prompt_length = prompt.len(),
            "Sending generateContent request"
        );

        let text = self.generate_text(prompt).await?;

        tracing::debug!(
            model = %self.settings.model,
            response_length = text.len(),
            "generateContent completed"
        );
        Ok(text)
    }

    fn model(&self) -> &str {
        &self.settings.model
    }
}

#[async_trait::async_trait]
impl SpeechSynthesizer for GeminiClient {
    async fn synthesize(&self, text: &str, voice: &str) -> anyhow::Result<Vec<u8>> {
        tracing::debug!(
            model = %self.settings.tts_model,
            voice,
            text_length = text.len(),
            "Sending speech request"
        );

        let audio = self.speak(text, voice).await?;

        tracing::debug!(
            model = %self.settings.tts_model,
            audio_bytes = audio.len(),
            "Speech completed"
        );
        Ok(audio)
    }
}
