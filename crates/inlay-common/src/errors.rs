use std::path::PathBuf;

use crate::id::HandleId;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Failures reported by a native webview capability.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WebViewError {
    #[error("webview creation failed: {0}")]
    Creation(String),

    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("script error: {0}")]
    Script(String),

    #[error("cookie store error: {0}")]
    Cookie(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("webview {0} is closed")]
    Closed(HandleId),

    #[error("operation queue full for webview {0}")]
    QueueFull(HandleId),

    #[error("not supported: {0}")]
    NotSupported(String),
}

/// Mismatches between the pinned host layout and what the host handed us.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("command buffer layout {found} does not match pinned layout {expected}")]
    LayoutMismatch { expected: u32, found: u32 },

    #[error("no view attached to window")]
    NoView,
}

#[derive(Debug, thiserror::Error)]
pub enum InlayError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    WebView(#[from] WebViewError),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("runtime error: {0}")]
    Runtime(String),

    #[error("{0}")]
    Other(String),
}
