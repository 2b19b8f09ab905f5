//! Error types for the Graph / Management Activity API integration.
//!
//! All public API surfaces in this crate return `GraphResult<T>`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Convenience alias.
pub type GraphResult<T> = Result<T, GraphError>;

/// Error codes for token, resource-API and audit-API operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GraphErrorCode {
    /// Client-credentials exchange failed.
    AuthFailed,
    /// HTTP 401 that survived the re-authentication retry.
    Unauthorized,
    /// HTTP 403 that survived the re-authentication retry.
    Forbidden,
    /// Resource (site, drive, item, blob) not found (HTTP 404).
    NotFound,
    /// Rate-limited (HTTP 429).
    RateLimited,
    /// Bad request, invalid parameter, or an oversized batch.
    InvalidRequest,
    /// HTTP 5xx from the backend.
    ServerError,
    /// Network / connectivity error.
    NetworkError,
    /// (De)serialization error.
    SerializationError,
    /// Catch-all internal error.
    InternalError,
}

impl fmt::Display for GraphErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Structured error returned by every public function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphError {
    pub code: GraphErrorCode,
    pub message: String,
    pub status: Option<u16>,
    pub graph_error_code: Option<String>,
    pub request_id: Option<String>,
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)?;
        if let Some(ref gc) = self.graph_error_code {
            write!(f, " (graph: {})", gc)?;
        }
        Ok(())
    }
}

impl std::error::Error for GraphError {}

impl GraphError {
    /// Create from a code + message.
    pub fn new(code: GraphErrorCode, msg: impl Into<String>) -> Self {
        Self {
            code,
            message: msg.into(),
            status: None,
            graph_error_code: None,
            request_id: None,
        }
    }

    /// Shortcut: auth failure.
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::new(GraphErrorCode::AuthFailed, msg)
    }

    /// Shortcut: network error.
    pub fn network(msg: impl Into<String>) -> Self {
        Self::new(GraphErrorCode::NetworkError, msg)
    }

    /// Shortcut: internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(GraphErrorCode::InternalError, msg)
    }

    /// Shortcut: invalid request.
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::new(GraphErrorCode::InvalidRequest, msg)
    }

    /// Whether this error came from a 401/403 response.
    pub fn is_authorization_failure(&self) -> bool {
        matches!(
            self.code,
            GraphErrorCode::Unauthorized | GraphErrorCode::Forbidden
        )
    }

    /// Build an error from a Graph API error response body.
    pub fn from_graph_response(status: u16, body: &str) -> Self {
        let code = match status {
            401 => GraphErrorCode::Unauthorized,
            403 => GraphErrorCode::Forbidden,
            404 => GraphErrorCode::NotFound,
            429 => GraphErrorCode::RateLimited,
            _ if status >= 500 => GraphErrorCode::ServerError,
            _ => GraphErrorCode::InvalidRequest,
        };

        let (graph_code, inner_msg, request_id) = Self::parse_graph_error_body(body);

        let message = inner_msg.unwrap_or_else(|| format!("Graph API error (HTTP {})", status));

        Self {
            code,
            message,
            status: Some(status),
            graph_error_code: graph_code,
            request_id,
        }
    }

    /// Build an `AuthFailed` error from a token endpoint response.
    ///
    /// The identity platform reports `{ "error": "invalid_client",
    /// "error_description": "..." }` rather than the Graph error envelope.
    pub fn from_token_response(status: u16, body: &str) -> Self {
        let v: serde_json::Value = serde_json::from_str(body).unwrap_or_default();
        let error = v["error"].as_str().map(String::from);
        let description = v["error_description"]
            .as_str()
            .map(String::from)
            .unwrap_or_else(|| format!("Token request failed (HTTP {})", status));

        Self {
            code: GraphErrorCode::AuthFailed,
            message: description,
            status: Some(status),
            graph_error_code: error,
            request_id: v["trace_id"].as_str().map(String::from),
        }
    }

    /// Try to extract Graph error JSON: `{ "error": { "code": "...", "message": "...", "innerError": { "request-id": "..." } } }`.
    fn parse_graph_error_body(body: &str) -> (Option<String>, Option<String>, Option<String>) {
        let Ok(v) = serde_json::from_str::<serde_json::Value>(body) else {
            return (None, None, None);
        };
        let err = &v["error"];
        let code = err["code"].as_str().map(String::from);
        let msg = err["message"].as_str().map(String::from);
        let req_id = err["innerError"]["request-id"].as_str().map(String::from);
        (code, msg, req_id)
    }
}

impl From<reqwest::Error> for GraphError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::network(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            Self::network(format!("Connection failed: {}", err))
        } else {
            Self::internal(format!("HTTP error: {}", err))
        }
    }
}

impl From<serde_json::Error> for GraphError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(
            GraphErrorCode::SerializationError,
            format!("JSON error: {}", err),
        )
    }
}

impl From<url::ParseError> for GraphError {
    fn from(err: url::ParseError) -> Self {
        Self::new(
            GraphErrorCode::InvalidRequest,
            format!("URL parse error: {}", err),
        )
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════
