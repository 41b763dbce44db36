//! Wire types shared by the server and the chat widget.
//!
//! Both endpoints answer with the same envelope: a `status` discriminator plus
//! either a payload field or an `error` string.

use serde::{Deserialize, Deserializer, Serialize};

/// Voice used for speech when the request names none.
pub const DEFAULT_VOICE: &str = "Kore";

/// Audio container reported alongside base64 speech.
pub const AUDIO_FORMAT: &str = "wav";

/// Treat an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Outcome discriminator carried by every response envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Request body for `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// User message content.
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Response body for `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub status: ResponseStatus,
    /// Generated answer, present on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    /// Server-side failure description, present on error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChatResponse {
    /// Successful answer.
    pub fn success(response: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Success,
            response: Some(response.into()),
            error: None,
        }
    }

    /// Server-reported failure.
    pub fn error(error: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            response: None,
            error: Some(error.into()),
        }
    }

    /// Collapse the envelope into the answer text or the server's error text.
    ///
    /// A success without a `response` field yields an empty answer; an error
    /// without an `error` field yields `"Unknown error"`.
    pub fn into_result(self) -> Result<String, String> {
        match self.status {
            ResponseStatus::Success => Ok(self.response.unwrap_or_default()),
            ResponseStatus::Error => Err(self.error.unwrap_or_else(|| "Unknown error".to_string())),
        }
    }
}

/// Request body for `POST /api/generate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    #[serde(default, deserialize_with = "null_as_default")]
    pub prompt: String,
}

/// Successful response body for `POST /api/generate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub status: ResponseStatus,
    pub generated_text: String,
}

impl GenerateResponse {
    pub fn success(generated_text: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Success,
            generated_text: generated_text.into(),
        }
    }
}

/// Request body for `POST /api/chat-with-speech`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatWithSpeechRequest {
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    /// Also speak the answer.
    #[serde(default, deserialize_with = "null_as_default")]
    pub generate_audio: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
}

impl ChatWithSpeechRequest {
    /// Requested voice, [`DEFAULT_VOICE`] when unset or blank.
    pub fn voice(&self) -> &str {
        voice_or_default(self.voice.as_deref())
    }
}

/// Response body for `POST /api/chat-with-speech`.
///
/// `audio` carries base64 WAV when speech was requested and succeeded;
/// `audio_error` explains a failed synthesis while the text answer stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatWithSpeechResponse {
    pub status: ResponseStatus,
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_error: Option<String>,
}

impl ChatWithSpeechResponse {
    /// Text-only answer.
    pub fn text(response: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Success,
            response: response.into(),
            audio: None,
            audio_format: None,
            audio_error: None,
        }
    }

    #[must_use]
    pub fn with_audio(mut self, audio_base64: String) -> Self {
        self.audio = Some(audio_base64);
        self.audio_format = Some(AUDIO_FORMAT.to_string());
        self
    }

    #[must_use]
    pub fn with_audio_error(mut self, error: impl Into<String>) -> Self {
        self.audio_error = Some(error.into());
        self
    }
}

/// Request body for `POST /api/generate-speech`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechRequest {
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
}

impl SpeechRequest {
    pub fn voice(&self) -> &str {
        voice_or_default(self.voice.as_deref())
    }
}

fn voice_or_default(voice: Option<&str>) -> &str {
    voice.map(str::trim).filter(|v| !v.is_empty()).unwrap_or(DEFAULT_VOICE)
}

/// A selectable speech voice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    pub name: String,
    pub description: String,
}

/// Response body for `GET /api/voices`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoicesResponse {
    pub voices: Vec<Voice>,
    pub status: ResponseStatus,
}

impl VoicesResponse {
    /// The voices offered by the speech backend.
    pub fn available() -> Self {
        let voices = [
            (DEFAULT_VOICE, "Default cheerful voice"),
            ("Charon", "Alternative voice option"),
        ]
        .into_iter()
        .map(|(name, description)| Voice {
            name: name.to_string(),
            description: description.to_string(),
        })
        .collect();

        Self {
            voices,
            status: ResponseStatus::Success,
        }
    }
}
