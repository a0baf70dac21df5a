//! Settings applied to every native webview the plugin creates.

use serde::{Deserialize, Serialize};

/// Per-webview creation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebViewSettings {
    /// Whether the webview background should be transparent.
    pub transparent: bool,
    /// Whether to enable dev tools (on in debug builds).
    pub devtools: bool,
    /// Custom user agent string.
    pub user_agent: Option<String>,
    /// Whether to enable clipboard access.
    pub clipboard: bool,
    /// Whether to enable autoplay for media.
    pub autoplay: bool,
    /// Scripts installed at load start of every page, before any
    /// `InstallJavascriptOp` recorded by the application.
    pub initialization_scripts: Vec<String>,
}

impl Default for WebViewSettings {
    fn default() -> Self {
        Self {
            transparent: false,
            devtools: cfg!(debug_assertions),
            user_agent: Some("Inlay/0.1".to_string()),
            clipboard: true,
            autoplay: true,
            initialization_scripts: Vec::new(),
        }
    }
}
