use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::protocol::ChatResponse;

/// Errors returned by the API handlers.
///
/// Every variant renders as the `{"status":"error","error":…}` envelope.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A required field was missing or blank.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// Body could not be read as the request type.
    #[error("{0}")]
    InvalidBody(#[from] JsonRejection),

    /// The text generator failed.
    #[error("{0:#}")]
    Generation(anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingField(_) | Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
            Self::Generation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Rejected request");
        }
        (status, Json(ChatResponse::error(self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_message() {
        let err = ApiError::MissingField("Message");
        assert_eq!(err.to_string(), "Message is required");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_generation_error_includes_cause() {
        let err = ApiError::Generation(anyhow::anyhow!("quota exceeded").context("Gemini request failed"));
        assert_eq!(err.to_string(), "Gemini request failed: quota exceeded");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
