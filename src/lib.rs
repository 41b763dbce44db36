//! Minimal chat widget backed by Gemini.
//!
//! A single-page chat box: the user types a message, the widget shows it with
//! a "Thinking..." placeholder, posts it to the chat server and swaps the
//! placeholder for the model's answer.
//!
//! # Architecture
//!
//! - **Widget**: render state, key handling and the send flow, independent of
//!   any particular front-end
//! - **Server**: Axum API answering `/api/chat` through a text generator, plus
//!   optional spoken answers
//! - **LLM**: Gemini REST client behind the [`llm::TextGenerator`] and
//!   [`llm::SpeechSynthesizer`] traits
//! - **Terminal**: line-based front-end driving the widget from stdin
//!
//! # Modules
//!
//! - [`widget`]: chat UI controller, view state and HTTP transport
//! - [`protocol`]: JSON envelopes shared by server and widget
//! - [`server`]: HTTP API
//! - [`llm`]: text generation backends
//! - [`config`]: layered configuration and CLI

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]

pub mod config;
pub mod llm;
pub mod protocol;
pub mod server;
pub mod terminal;
pub mod widget;

use crate::config::AppConfig;
use crate::llm::{SpeechSynthesizer, TextGenerator};
use std::sync::Arc;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Backend answering chat messages.
    pub generator: Arc<dyn TextGenerator>,
    /// Backend speaking answers aloud.
    pub speech: Arc<dyn SpeechSynthesizer>,
    /// Global Configuration
    pub config: Arc<AppConfig>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("model", &self.generator.model())
            .field("config", &self.config)
            .finish()
    }
}
