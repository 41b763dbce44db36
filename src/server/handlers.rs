use axum::{
    Json,
    extract::State,
    extract::rejection::JsonRejection,
    http::header,
    response::{IntoResponse, Response},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use tracing::{info, warn};

use super::error::ApiError;
use crate::AppState;
use crate::protocol::{
    ChatRequest, ChatResponse, ChatWithSpeechRequest, ChatWithSpeechResponse, GenerateRequest,
    GenerateResponse, SpeechRequest, VoicesResponse,
};

/// POST /api/chat - Answer a single chat message.
pub async fn api_chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(req) = payload?;
    if req.message.trim().is_empty() {
        return Err(ApiError::MissingField("Message"));
    }

    info!(
        name: "chat.request",
        model = %state.generator.model(),
        message_length = req.message.len(),
        "Received chat request"
    );

    let response = state
        .generator
        .generate(&req.message)
        .await
        .map_err(ApiError::Generation)?;

    Ok(Json(ChatResponse::success(response)))
}

/// POST /api/generate - Raw prompt completion.
pub async fn api_generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let Json(req) = payload?;
    if req.prompt.trim().is_empty() {
        return Err(ApiError::MissingField("Prompt"));
    }

    info!(
        name: "generate.request",
        model = %state.generator.model(),
        prompt_length = req.prompt.len(),
        "Received generate request"
    );

    let text = state
        .generator
        .generate(&req.prompt)
        .await
        .map_err(ApiError::Generation)?;

    Ok(Json(GenerateResponse::success(text)))
}

/// GET /api/voices - Voices accepted by the speech endpoints.
pub async fn api_voices() -> Json<VoicesResponse> {
    Json(VoicesResponse::available())
}

/// POST /api/generate-speech - Speak the given text, answering with a WAV file.
pub async fn api_generate_speech(
    State(state): State<AppState>,
    payload: Result<Json<SpeechRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = payload?;
    if req.text.trim().is_empty() {
        return Err(ApiError::MissingField("Text"));
    }

    info!(
        name: "speech.request",
        voice = req.voice(),
        text_length = req.text.len(),
        "Received speech request"
    );

    let wav = state
        .speech
        .synthesize(&req.text, req.voice())
        .await
        .map_err(ApiError::Generation)?;

    Ok((
        [
            (header::CONTENT_TYPE, "audio/wav"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"speech.wav\""),
        ],
        wav,
    )
        .into_response())
}

/// POST /api/chat-with-speech - Chat answer, optionally spoken.
///
/// A failed synthesis keeps the text answer and reports `audio_error`.
pub async fn api_chat_with_speech(
    State(state): State<AppState>,
    payload: Result<Json<ChatWithSpeechRequest>, JsonRejection>,
) -> Result<Json<ChatWithSpeechResponse>, ApiError> {
    let Json(req) = payload?;
    if req.message.trim().is_empty() {
        return Err(ApiError::MissingField("Message"));
    }

    info!(
        name: "chat.request",
        model = %state.generator.model(),
        message_length = req.message.len(),
        generate_audio = req.generate_audio,
        "Received chat request"
    );

    let text = state
        .generator
        .generate(&req.message)
        .await
        .map_err(ApiError::Generation)?;

    if !req.generate_audio {
        return Ok(Json(ChatWithSpeechResponse::text(text)));
    }

    let response = match state.speech.synthesize(&text, req.voice()).await {
        Ok(wav) => ChatWithSpeechResponse::text(text).with_audio(STANDARD.encode(wav)),
        Err(e) => {
            warn!(error = %e, voice = req.voice(), "Audio generation failed");
            ChatWithSpeechResponse::text(text).with_audio_error(format!("{e:#}"))
        }
    };
    Ok(Json(response))
}
