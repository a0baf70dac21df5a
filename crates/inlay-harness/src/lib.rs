//! Headless host for exercising the webview plugin.
//!
//! [`TestHost`] plays the part of a GUI framework: it owns a window, drives
//! frames through [`WebViewPlugin`](inlay_webview::WebViewPlugin) and feeds
//! scripted input into each frame's queue. [`MockBackend`] stands in for the
//! native engine. [`scenario`] replays TOML-described frame sequences on top
//! of both, which is what the `inlay-replay` binary does.

pub mod host;
pub mod mock;
pub mod scenario;

pub use host::{HostInput, ScriptedQueue, TestHost, TestWindow};
pub use mock::{MockBackend, MockCall, MockWebView};
pub use scenario::{Journal, Scenario, ScenarioError};
