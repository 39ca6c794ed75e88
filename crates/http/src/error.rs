//! JSON error envelope shared by every Lectern route.
//!
//! Handlers return `Result<_, AppError>`; the error renders as
//! `{ "error": { code, message, details, trace_id, timestamp } }`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use lectern_db::StoreError;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum AppError {
    /// Input failed domain validation; `details` names the offending fields.
    #[error("validation failed: {message}")]
    Validation { details: Vec<Value>, message: String },

    #[error("not found: {message}")]
    NotFound { message: String },

    /// Well-formed, but not allowed in the resource's current state.
    #[error("conflict: {message}")]
    Conflict { details: Vec<Value>, message: String },

    /// The book metadata API failed. `code` says how; retrying may help.
    #[error("upstream failure: {message}")]
    Upstream { code: String, message: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(details: Vec<Value>, message: impl Into<String>) -> Self {
        Self::Validation {
            details,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn conflict(details: Vec<Value>, message: impl Into<String>) -> Self {
        Self::Conflict {
            details,
            message: message.into(),
        }
    }

    pub fn upstream(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upstream {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &str {
        match self {
            AppError::Validation { .. } => "validation_error",
            AppError::NotFound { .. } => "not_found",
            AppError::Conflict { .. } => "conflict",
            AppError::Upstream { code, .. } => code.as_str(),
            AppError::Internal(_) => "internal_error",
        }
    }

    fn into_parts(self) -> (String, Vec<Value>) {
        match self {
            AppError::Validation { details, message } | AppError::Conflict { details, message } => {
                (message, details)
            }
            AppError::NotFound { message }
            | AppError::Upstream { message, .. } => (message, Vec::new()),
            AppError::Internal(err) if cfg!(debug_assertions) => (format!("{err:#}"), Vec::new()),
            AppError::Internal(_) => ("An internal server error occurred".to_string(), Vec::new()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::BookNotFound(_) | StoreError::LogNotFound(_) => {
                AppError::not_found(err.to_string())
            }
            other => AppError::Internal(anyhow::Error::new(other)),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    details: Vec<Value>,
    trace_id: Uuid,
    timestamp: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code().to_string();
        let trace_id = Uuid::new_v4();

        if status.is_server_error() {
            tracing::error!(%trace_id, %code, status = status.as_u16(), error = %self, "request failed");
        } else {
            tracing::debug!(%trace_id, %code, status = status.as_u16(), "request rejected");
        }

        let (message, details) = self.into_parts();
        let envelope = ErrorEnvelope {
            error: ErrorBody {
                code,
                message,
                details,
                trace_id,
                timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            },
        };

        (status, Json(envelope)).into_response()
    }
}
