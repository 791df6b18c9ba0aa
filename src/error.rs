//! Error types for the protocol layer.

use crate::http::response::StatusCode;

/// Errors that terminate a connection.
///
/// None of these are retried. The protocol writes a minimal status response,
/// asks the server core to close the connection and drops all per-connection
/// state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The request head grew past `HTTP_HEAD_MAX_SIZE` without completing.
    #[error("request head exceeds {limit} bytes")]
    HeadTooLarge { limit: usize },

    /// The request line, a header line or a framing header is invalid.
    #[error("malformed request: {0}")]
    MalformedRequest(&'static str),

    /// The declared or decoded body is larger than `maximum_body_size`.
    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },
}

impl ProtocolError {
    /// Status used for the response written just before closing.
    pub fn status(&self) -> StatusCode {
        match self {
            ProtocolError::HeadTooLarge { .. } => StatusCode::RequestHeaderFieldsTooLarge,
            ProtocolError::MalformedRequest(_) => StatusCode::BadRequest,
            ProtocolError::BodyTooLarge { .. } => StatusCode::PayloadTooLarge,
        }
    }
}

/// Static fallback could not serve the request.
///
/// Missing files, unreadable files and paths escaping the public folder all
/// produce this same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("not found")]
pub struct NotFound;

/// Invalid configuration detected while building settings.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("either an on_request callback or a public folder is required")]
    NoHandler,

    #[error("maximum_body_size must be at least 1 Mb")]
    ZeroBodySize,

    #[error("public folder {path} is not a directory")]
    NotADirectory { path: String },

    #[error("public folder {path}: {source}")]
    PublicFolder {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
