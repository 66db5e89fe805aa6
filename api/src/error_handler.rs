use ai_llm_service::AiLlmError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use contextor::ContextorError;
use rag_store::RagError;
use thiserror::Error;

use crate::core::http::response_envelope::{ErrorEnvelope, FieldHint};

/// Public application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // --- Boot / config ---
    #[error("invalid {var}: {reason}")]
    InvalidEnv { var: &'static str, reason: String },

    #[error(transparent)]
    Llm(#[from] AiLlmError),

    #[error(transparent)]
    Rag(#[from] RagError),

    #[error(transparent)]
    Contextor(#[from] ContextorError),

    // --- IO / network / server ---
    #[error("failed to bind listener")]
    Bind(#[source] std::io::Error),

    #[error("server error")]
    Server(#[source] std::io::Error),

    // --- Request ---
    #[error("bad request: {message}")]
    BadRequest {
        message: String,
        path: Option<&'static str>,
    },
}

impl AppError {
    pub fn bad_request(path: &'static str, message: impl Into<String>) -> Self {
        AppError::BadRequest {
            message: message.into(),
            path: Some(path),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            // startup-only
            AppError::InvalidEnv { .. }
            | AppError::Llm(_)
            | AppError::Rag(_)
            | AppError::Contextor(_)
            | AppError::Bind(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AppError::InvalidEnv { .. } => "CONFIG_ERROR",
            AppError::Llm(_) | AppError::Rag(_) | AppError::Contextor(_) => "CONFIG_ERROR",
            AppError::Bind(_) => "BIND_ERROR",
            AppError::Server(_) => "SERVER_ERROR",
            AppError::BadRequest { .. } => "BAD_REQUEST",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let details = match &self {
            AppError::BadRequest { path: Some(p), .. } => vec![FieldHint {
                path: Some((*p).to_string()),
                hint: None,
            }],
            _ => Vec::new(),
        };
        ErrorEnvelope::new(self.error_code(), self.to_string(), details)
            .into_response_with_status(status)
    }
}

/// Handy result alias used across handlers.
pub type AppResult<T> = Result<T, AppError>;
