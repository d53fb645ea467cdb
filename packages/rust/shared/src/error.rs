//! Error types for larkdoc.
//!
//! Library crates use [`LarkDocError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all larkdoc operations.
#[derive(Debug, thiserror::Error)]
pub enum LarkDocError {
    /// The input matched neither the `/docx/<token>` nor the `/wiki/<token>` shape.
    #[error("无效的飞书文档URL格式")]
    InvalidUrlFormat,

    /// A lookup response lacked the field path we depend on.
    #[error("upstream lookup failed: {message}")]
    UpstreamLookupFailed { message: String },

    /// The platform answered with a business error (`code`/`msg`) instead of data.
    #[error("{operation}: {detail}")]
    UpstreamRejected { operation: String, detail: String },

    /// The document exists but its raw content is empty.
    #[error("文档内容为空, document {document_id}")]
    EmptyDocument { document_id: String },

    /// The chat-completion endpoint answered with a non-success status.
    #[error("API请求失败: {status} {status_text}")]
    ModelApi { status: u16, status_text: String },

    /// Network/HTTP error while talking to an upstream API.
    #[error("network error: {0}")]
    Network(String),

    /// Response body could not be decoded.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// The tool-serving transport failed to start or stopped abnormally.
    #[error("transport error: {0}")]
    Transport(String),

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LarkDocError>;

impl LarkDocError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a lookup error from any displayable message.
    pub fn lookup(msg: impl Into<String>) -> Self {
        Self::UpstreamLookupFailed {
            message: msg.into(),
        }
    }

    /// Create an upstream business error for the named operation.
    pub fn rejected(operation: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::UpstreamRejected {
            operation: operation.into(),
            detail: detail.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
