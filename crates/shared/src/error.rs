use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    Forbidden,
    NotFound,
    Validation,
    RateLimited,
    Internal,
}

impl ErrorCode {
    pub fn from_http_status(status: u16) -> Self {
        match status {
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            400 | 409 | 422 => Self::Validation,
            429 => Self::RateLimited,
            _ => Self::Internal,
        }
    }
}

/// Error body sent by the board service: `{ "msg": "..." }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerMessage {
    #[serde(default)]
    pub msg: String,
}

#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{code:?}: {message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Builds an error from an HTTP status and the raw response body, using
    /// the server's `msg` when the body carries one.
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<ServerMessage>(body)
            .ok()
            .map(|m| m.msg)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("request failed with status {status}"));
        Self::new(ErrorCode::from_http_status(status), message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uses_server_msg_when_present() {
        let err = ApiError::from_response(409, r#"{"msg":"user already invited"}"#);
        assert_eq!(err.code, ErrorCode::Validation);
        assert_eq!(err.message, "user already invited");
    }

    #[test]
    fn falls_back_to_status_text_for_opaque_bodies() {
        let err = ApiError::from_response(502, "<html>bad gateway</html>");
        assert_eq!(err.code, ErrorCode::Internal);
        assert_eq!(err.message, "request failed with status 502");
        assert_eq!(err.to_string(), "Internal: request failed with status 502");
    }
}
