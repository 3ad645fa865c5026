//! Response envelope and error mapping
//!
//! Every endpoint answers `{"success": bool, "data": …, "error": {…}}`.
//! Domain errors map onto stable wire codes and HTTP statuses here, and
//! nowhere else.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use docpress_domain::{Error, ErrorKind};
use serde::Serialize;

/// Success/failure envelope
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    /// Whether the operation succeeded
    pub success: bool,
    /// Payload on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error detail on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

/// Wire error detail
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Stable error code
    pub code: &'static str,
    /// Human-readable message
    pub message: String,
    /// Present and true when the job was cancelled by request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled: Option<bool>,
    /// Retry hint in seconds, for rate limits
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

/// Wrap a payload in a success envelope
pub fn ok<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope {
        success: true,
        data: Some(data),
        error: None,
    })
}

/// A domain error ready to serialize as a response
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error = self.0;
        let status = match error.kind() {
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::WorkspaceError => StatusCode::BAD_GATEWAY,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            code: error.kind().code(),
            message: error.to_string(),
            cancelled: matches!(error, Error::Cancelled { .. }).then_some(true),
            retry_after_secs: match &error {
                Error::RateLimited { retry_after_secs } => *retry_after_secs,
                _ => None,
            },
        };
        let envelope: Envelope<serde_json::Value> = Envelope {
            success: false,
            data: None,
            error: Some(body),
        };
        (status, Json(envelope)).into_response()
    }
}

/// Handler result alias
pub type ApiResult<T> = std::result::Result<Json<Envelope<T>>, ApiError>;
