//! Text generation backends.
//!
//! The server only talks to the [`TextGenerator`] and [`SpeechSynthesizer`]
//! traits, so handlers can be exercised with scripted backends and the real
//! [`GeminiClient`] can be swapped for another provider without touching the
//! routes.
//!
//! # Example
//!
//! ```rust,ignore
//! use gemini_chat::llm::{GeminiClient, GeminiSettings, TextGenerator};
//!
//! let client = GeminiClient::new(settings)?;
//! let answer = client.generate("Hello! Can you introduce yourself?").await?;
//! ```

pub mod gemini;
pub mod wav;

pub use gemini::{GeminiClient, GeminiError};

use std::time::Duration;

/// Gemini connection and model settings.
#[derive(Clone)]
pub struct GeminiSettings {
    /// Base URL without trailing slash (e.g., `https://generativelanguage.googleapis.com`).
    pub base_url: String,
    /// API key sent as `x-goog-api-key`.
    pub api_key: String,
    /// Model identifier (e.g., `gemini-2.0-flash`).
    pub model: String,
    /// Speech model identifier (e.g., `gemini-2.5-flash-preview-tts`).
    pub tts_model: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl std::fmt::Debug for GeminiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("tts_model", &self.tts_model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Single-shot prompt completion.
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a complete answer for `prompt`.
    async fn generate(&self, prompt: &str) -> anyhow::Result<String>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}

/// Text-to-speech.
#[async_trait::async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Speak `text` with the named voice, returning a WAV file.
    async fn synthesize(&self, text: &str, voice: &str) -> anyhow::Result<Vec<u8>>;
}
