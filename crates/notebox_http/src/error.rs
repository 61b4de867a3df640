//! HTTP error mapping.
//!
//! Clients only ever see a status line and a generic body; details go to the
//! log.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use log::error;
use notebox_core::NoteServiceError;
use thiserror::Error;

/// Note service handler errors.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("note service failed: {0}")]
    Service(#[from] NoteServiceError),

    #[error("blocking store task failed: {0}")]
    Task(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!(
            "event=request_failed module=http status=error error={}",
            self
        );
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
    }
}

/// Reverse proxy errors.
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("upstream unreachable: {0}")]
    UpstreamUnreachable(String),

    #[error("upstream timed out: {0}")]
    UpstreamTimeout(String),

    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("invalid upstream: {0}")]
    InvalidUpstream(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::UpstreamUnreachable(_) => StatusCode::BAD_GATEWAY,
            Self::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::InvalidUpstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            Self::UpstreamTimeout(value.to_string())
        } else if value.is_builder() {
            Self::InvalidUpstream(value.to_string())
        } else {
            Self::UpstreamUnreachable(value.to_string())
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        error!(
            "event=proxy_failed module=proxy status=error http_status={} error={}",
            status.as_u16(),
            self
        );
        let reason = status.canonical_reason().unwrap_or("Bad Gateway");
        (status, reason).into_response()
    }
}
