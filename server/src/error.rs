//! Unified error handling for the server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use frcstats_engine::{Error as EngineError, MatchKey};
use serde::Serialize;

use crate::session::SessionError;

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Error response body.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    /// Business keys the error is about
    #[serde(skip_serializing_if = "Vec::is_empty")]
    keys: Vec<MatchKey>,
}

fn engine_status(err: &EngineError) -> StatusCode {
    match err {
        EngineError::SchemaMismatch { .. }
        | EngineError::InvalidSnapshot(_)
        | EngineError::DuplicateKey(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::UnresolvedMerge { .. } => StatusCode::CONFLICT,
        EngineError::ContradictoryResolution { .. }
        | EngineError::KeyMismatch { .. }
        | EngineError::NotMergeable(_) => StatusCode::BAD_REQUEST,
        EngineError::UnknownGame(_) => StatusCode::NOT_FOUND,
        EngineError::StoreIo { .. } | EngineError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, details, keys) = match self {
            AppError::Engine(e) => {
                let status = engine_status(&e);
                match e {
                    EngineError::UnresolvedMerge { keys } => (
                        status,
                        "Merge has unresolved items".to_string(),
                        None,
                        keys,
                    ),
                    EngineError::StoreIo {
                        batch,
                        keys,
                        partially_applied,
                        message,
                    } => {
                        tracing::error!(%batch, partially_applied, "Store batch failed: {}", message);
                        let error = if partially_applied {
                            "Write partially applied"
                        } else {
                            "Write not applied"
                        };
                        (
                            status,
                            error.to_string(),
                            Some(format!("{} batch failed: {}", batch, message)),
                            keys,
                        )
                    }
                    EngineError::Store(e) => {
                        tracing::error!("Store error: {:?}", e);
                        (status, "Storage error".to_string(), None, Vec::new())
                    }
                    other => {
                        tracing::warn!("Engine error: {:?}", other);
                        (status, other.to_string(), None, Vec::new())
                    }
                }
            }
            AppError::Session(e) => {
                let status = match e {
                    SessionError::NotFound(_) => StatusCode::NOT_FOUND,
                    SessionError::EventBusy { .. } => StatusCode::CONFLICT,
                };
                (status, e.to_string(), None, Vec::new())
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None, Vec::new()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None, Vec::new()),
        };

        let body = Json(ErrorResponse {
            error: error_message,
            details,
            keys,
        });

        (status, body).into_response()
    }
}

/// Result type alias for handlers.
pub type Result<T> = std::result::Result<T, AppError>;
