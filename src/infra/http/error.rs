use std::error::Error as StdError;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use newsdesk_api_types::ErrorBody;
use serde_json::Value;

use crate::application::{comments::CommentError, error::ErrorReport, repos::UpstreamError};

pub const MISCONFIGURED: &str = "Service misconfigured";

/// JSON error response carrying an [`ErrorReport`] for the logging middleware.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    detail: Option<Value>,
    report: ErrorReport,
}

impl ApiError {
    pub fn new(source: &'static str, status: StatusCode, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            status,
            report: ErrorReport::from_message(source, status, message.clone()),
            message,
            detail: None,
        }
    }

    fn with_source(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
        error: &dyn StdError,
    ) -> Self {
        Self {
            status,
            message: message.into(),
            detail: None,
            report: ErrorReport::from_error(source, status, error),
        }
    }

    pub fn bad_request(source: &'static str, message: impl Into<String>) -> Self {
        Self::new(source, StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(source: &'static str, message: impl Into<String>) -> Self {
        Self::new(source, StatusCode::NOT_FOUND, message)
    }

    pub fn unauthorized(source: &'static str, message: impl Into<String>) -> Self {
        Self::new(source, StatusCode::UNAUTHORIZED, message)
    }

    /// Map an adapter failure: upstream statuses are forwarded with the
    /// upstream body as `detail`.
    pub fn upstream(source: &'static str, message: &str, err: &UpstreamError) -> Self {
        let status = upstream_status(err);
        let message = match err {
            UpstreamError::Misconfigured => MISCONFIGURED,
            _ => message,
        };
        let detail = match err {
            UpstreamError::Status { body, .. } => body.clone(),
            _ => None,
        };
        Self {
            detail,
            ..Self::with_source(source, status, message, err)
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

fn upstream_status(err: &UpstreamError) -> StatusCode {
    match err {
        UpstreamError::Status { status, .. } => {
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
        }
        UpstreamError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        UpstreamError::Transport(_) | UpstreamError::Decode(_) => StatusCode::BAD_GATEWAY,
        UpstreamError::Misconfigured => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<(&'static str, CommentError)> for ApiError {
    fn from((source, err): (&'static str, CommentError)) -> Self {
        let message = err.public_message();
        match &err {
            CommentError::Misconfigured => {
                Self::with_source(source, StatusCode::INTERNAL_SERVER_ERROR, message, &err)
            }
            CommentError::Validation(_) => Self::bad_request(source, message),
            CommentError::MissingVersion { .. } => {
                Self::with_source(source, StatusCode::BAD_GATEWAY, message, &err)
            }
            CommentError::Fetch(upstream)
            | CommentError::Create(upstream)
            | CommentError::Publish {
                source: upstream, ..
            } => Self {
                report: ErrorReport::from_error(source, upstream_status(upstream), &err),
                ..Self::upstream(source, &message, upstream)
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
            detail: self.detail,
        };
        let mut response = (self.status, Json(body)).into_response();
        self.report.attach(&mut response);
        response
    }
}
