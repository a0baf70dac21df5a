//! Configuration schema types for Inlay.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod runtime;
mod system;
mod webview;

pub use runtime::*;
pub use system::*;
pub use webview::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration for the webview plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct InlayConfig {
    pub webview: WebViewSettings,
    pub runtime: RuntimeConfig,
    pub logging: LoggingConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_correct_webview() {
        let config = InlayConfig::default();
        assert!(!config.webview.transparent);
        assert_eq!(config.webview.devtools, cfg!(debug_assertions));
        assert_eq!(config.webview.user_agent.as_deref(), Some("Inlay/0.1"));
        assert!(config.webview.clipboard);
        assert!(config.webview.autoplay);
        assert!(config.webview.initialization_scripts.is_empty());
    }

    #[test]
    fn default_config_has_correct_runtime() {
        let config = InlayConfig::default();
        assert_eq!(config.runtime.worker_threads, 1);
        assert_eq!(config.runtime.job_queue_capacity, 64);
    }

    #[test]
    fn default_config_has_correct_logging() {
        let config = InlayConfig::default();
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.logging.level.as_directive(), "info");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: InlayConfig = toml::from_str(
            r#"
[runtime]
job_queue_capacity = 8
"#,
        )
        .unwrap();
        assert_eq!(config.runtime.job_queue_capacity, 8);
        assert_eq!(config.runtime.worker_threads, 1);
        assert!(config.webview.autoplay);
    }

    #[test]
    fn log_level_is_uppercase_in_toml() {
        let config: InlayConfig = toml::from_str(
            r#"
[logging]
level = "WARNING"
"#,
        )
        .unwrap();
        assert_eq!(config.logging.level, LogLevel::Warning);
        assert_eq!(config.logging.level.as_directive(), "warn");
    }
}
