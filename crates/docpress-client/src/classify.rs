//! Response classification
//!
//! Maps raw HTTP outcomes onto the domain error taxonomy. Nothing above the
//! client ever sees a raw status code or reqwest error.

use docpress_domain::Error;
use reqwest::StatusCode;

/// Classify a transport-level failure
#[must_use]
pub fn transport_error(error: &reqwest::Error) -> Error {
    if error.is_timeout() {
        Error::transient("request timed out")
    } else if error.is_connect() {
        Error::transient(format!("connection failed: {error}"))
    } else if error.is_request() || error.is_body() || error.is_decode() {
        Error::transient(format!("request aborted: {error}"))
    } else {
        Error::workspace(format!("transport failure: {error}"))
    }
}

/// Classify a non-success HTTP response
///
/// `retry_after` is the parsed `retry-after` header, when present.
#[must_use]
pub fn status_error(status: StatusCode, body: &str, retry_after: Option<u64>) -> Error {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Error::RateLimited {
            retry_after_secs: retry_after,
        };
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Error::unauthorized(short_message(body, "workspace rejected the token"));
    }
    if status == StatusCode::NOT_FOUND || body.contains("object_not_found") {
        return Error::not_found(short_message(body, "workspace object"));
    }
    if status == StatusCode::CONFLICT && body.contains("conflict_error") {
        return Error::conflict(short_message(body, "transaction conflict"));
    }
    if status == StatusCode::BAD_REQUEST {
        return Error::validation(short_message(body, "payload rejected"));
    }
    if status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_EARLY
        || status.is_server_error()
    {
        return Error::transient(format!("workspace returned {status}"));
    }
    Error::workspace(format!(
        "workspace returned {status}: {}",
        short_message(body, "")
    ))
}

/// First line of a body, bounded, for error messages
fn short_message(body: &str, fallback: &str) -> String {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .and_then(serde_json::Value::as_str)
                .map(ToOwned::to_owned)
        })
        .unwrap_or_else(|| body.lines().next().unwrap_or_default().to_owned());
    let message = message.trim();
    if message.is_empty() {
        fallback.to_owned()
    } else {
        message.chars().take(300).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_mapping() {
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, "", Some(3)),
            Error::RateLimited {
                retry_after_secs: Some(3)
            }
        ));
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, "", None),
            Error::Unauthorized { .. }
        ));
        assert!(matches!(
            status_error(StatusCode::NOT_FOUND, "", None),
            Error::NotFound { .. }
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_GATEWAY, "", None),
            Error::Transient { .. }
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_REQUEST, r#"{"message":"bad block"}"#, None),
            Error::Validation { .. }
        ));
    }

    #[test]
    fn body_markers_override_status() {
        let gone = status_error(
            StatusCode::BAD_REQUEST,
            r#"{"code":"object_not_found","message":"gone"}"#,
            None,
        );
        assert!(matches!(gone, Error::NotFound { .. }));

        let conflict = status_error(
            StatusCode::CONFLICT,
            r#"{"code":"conflict_error","message":"try again"}"#,
            None,
        );
        assert!(matches!(conflict, Error::Conflict { .. }));
    }

    #[test]
    fn conflict_without_marker_is_transient() {
        // 409 without the conflict marker is not known-retryable as a
        // conflict; it is not a server error either, so it is permanent.
        let other = status_error(StatusCode::CONFLICT, "busy", None);
        assert!(matches!(other, Error::Workspace { .. }));
    }

    #[test]
    fn message_extraction() {
        let err = status_error(
            StatusCode::BAD_REQUEST,
            r#"{"message":"body.children[0] should be an object"}"#,
            None,
        );
        assert!(err.to_string().contains("children[0]"));
    }
}
