//! The capability surface of a native webview engine.
//!
//! Everything here is implemented by a backend (`wry`, or the recording mock
//! in `inlay-harness`). The plugin never talks to a platform API directly.

use std::fmt;
use std::sync::{mpsc as std_mpsc, Arc};

use inlay_common::{Point, WebViewError, WindowId};
use inlay_config::WebViewSettings;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedReceiver;
use url::Url;

use crate::events::{NavigationEvent, PageLoadState, TitleEvent};
use crate::host::{MainTask, ViewEvent, ViewHandle, Window};

/// A browser cookie.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieData {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    /// Expiry as seconds since the Unix epoch; `None` for session cookies.
    pub expires: Option<u64>,
    pub secure: bool,
    pub http_only: bool,
}

/// A key/value pair in local or session storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageData {
    pub key: String,
    pub value: String,
}

impl StorageData {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Storage partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    Local,
    Session,
}

impl StorageKind {
    /// Name of the page-global storage object.
    pub fn js_object(self) -> &'static str {
        match self {
            Self::Local => "localStorage",
            Self::Session => "sessionStorage",
        }
    }
}

/// When an installed script runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallTime {
    /// At the start of every page load, before page scripts.
    OnLoadStart,
}

/// Raw events from the engine, before the plugin filters them.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeEvent {
    Navigation(NavigationEvent),
    Title(TitleEvent),
    PageLoad { state: PageLoadState, url: String },
}

/// Callback invoked with each message page script posts.
pub type MessageCallback = Box<dyn Fn(String) + Send + Sync>;

/// Handle for posting work to the UI thread of the window a webview is
/// created in.
#[derive(Clone)]
pub struct MainThread(Arc<dyn Window>);

impl MainThread {
    pub fn new(window: Arc<dyn Window>) -> Self {
        Self(window)
    }

    pub fn window_id(&self) -> WindowId {
        self.0.id()
    }

    pub fn run(&self, task: MainTask) {
        self.0.run_on_main(task);
    }

    pub fn is_current(&self) -> bool {
        self.0.is_main_thread()
    }

    /// Run `task` on the UI thread and wait for its result. Runs inline
    /// when the caller is already on that thread.
    pub fn call<R, F>(&self, task: F) -> Result<R, WebViewError>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        if self.is_current() {
            return Ok(task());
        }
        let (tx, rx) = std_mpsc::channel();
        self.run(Box::new(move || {
            let _ = tx.send(task());
        }));
        rx.recv()
            .map_err(|_| WebViewError::NotSupported("window dropped a main-thread task".into()))
    }
}

impl fmt::Debug for MainThread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MainThread").field(&self.0.id()).finish()
    }
}

/// Everything a backend needs to create or reconfigure a webview.
#[derive(Debug, Clone)]
pub struct NativeConfig {
    pub view: Option<ViewHandle>,
    pub px_per_dp: f32,
    pub settings: WebViewSettings,
    pub main_thread: Option<MainThread>,
}

impl NativeConfig {
    /// Configuration for a window that has not attached a view yet.
    pub fn detached(settings: &WebViewSettings) -> Self {
        Self {
            view: None,
            px_per_dp: 1.0,
            settings: settings.clone(),
            main_thread: None,
        }
    }

    pub fn from_view_event<W: Window>(
        window: &Arc<W>,
        event: &ViewEvent,
        settings: &WebViewSettings,
    ) -> Self {
        let window: Arc<dyn Window> = window.clone();
        Self {
            view: event.view,
            px_per_dp: 1.0,
            settings: settings.clone(),
            main_thread: Some(MainThread::new(window)),
        }
    }
}

/// Creates native webviews.
pub trait WebViewBackend: Send + Sync + 'static {
    fn create(&self, config: &NativeConfig) -> Result<Arc<dyn NativeWebView>, WebViewError>;
}

/// One native webview instance.
///
/// Methods may be called from the frame thread and from worker threads;
/// implementations marshal to the UI thread themselves when required.
pub trait NativeWebView: Send + Sync {
    fn configure(&self, config: &NativeConfig) -> Result<(), WebViewError>;

    /// Place the webview at `offset` with `size`, both in pixels relative to
    /// the window. A zero size hides it.
    fn resize(&self, size: Point, offset: Point) -> Result<(), WebViewError>;

    fn navigate(&self, url: &Url) -> Result<(), WebViewError>;

    /// Release the native control. Called at most once by the plugin.
    fn close(&self);

    /// The stream of native events. Returns `None` once taken.
    fn take_events(&self) -> Option<UnboundedReceiver<NativeEvent>>;

    fn data_manager(&self) -> &dyn DataManager;

    fn javascript_manager(&self) -> &dyn JavascriptManager;
}

/// Cookie and web-storage access.
pub trait DataManager: Send + Sync {
    fn add_cookie(&self, cookie: &CookieData) -> Result<(), WebViewError>;
    fn remove_cookie(&self, cookie: &CookieData) -> Result<(), WebViewError>;
    fn cookies(&self) -> Result<Vec<CookieData>, WebViewError>;

    fn add_storage(&self, kind: StorageKind, item: &StorageData) -> Result<(), WebViewError>;
    fn remove_storage(&self, kind: StorageKind, item: &StorageData) -> Result<(), WebViewError>;
    fn storage(&self, kind: StorageKind) -> Result<Vec<StorageData>, WebViewError>;
}

/// Script execution and page-to-host messaging.
pub trait JavascriptManager: Send + Sync {
    fn run_javascript(&self, script: &str) -> Result<(), WebViewError>;
    fn install_javascript(&self, script: &str, when: InstallTime) -> Result<(), WebViewError>;
    /// Expose `window.callback.<name>(message)` to page script.
    fn add_callback(&self, name: &str, callback: MessageCallback) -> Result<(), WebViewError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_defaults_from_partial_json() {
        let cookie: CookieData = serde_json::from_str(r#"{"name":"sid","value":"1"}"#).unwrap();
        assert_eq!(cookie.name, "sid");
        assert_eq!(cookie.expires, None);
        assert!(!cookie.secure);
    }

    #[test]
    fn storage_kind_js_objects() {
        assert_eq!(StorageKind::Local.js_object(), "localStorage");
        assert_eq!(StorageKind::Session.js_object(), "sessionStorage");
        assert_eq!(StorageKind::default(), StorageKind::Local);
    }

    struct PostingWindow {
        on_main: bool,
        posted: std::sync::Mutex<Vec<MainTask>>,
    }

    impl PostingWindow {
        fn new(on_main: bool) -> Arc<Self> {
            Arc::new(Self {
                on_main,
                posted: std::sync::Mutex::new(Vec::new()),
            })
        }
    }

    impl Window for PostingWindow {
        fn id(&self) -> WindowId {
            WindowId(7)
        }

        fn invalidate(&self) {}

        fn run_on_main(&self, task: MainTask) {
            if self.on_main {
                // Queued for a later loop turn, like a real event loop.
                self.posted.lock().unwrap().push(task);
            } else {
                std::thread::spawn(task);
            }
        }

        fn is_main_thread(&self) -> bool {
            self.on_main
        }
    }

    #[test]
    fn call_on_the_ui_thread_runs_inline() {
        let window = PostingWindow::new(true);
        let main = MainThread::new(window.clone());
        assert_eq!(main.call(|| 41 + 1).unwrap(), 42);
        assert!(window.posted.lock().unwrap().is_empty());
    }

    #[test]
    fn call_from_a_worker_waits_for_the_ui_thread() {
        let main = MainThread::new(PostingWindow::new(false));
        let caller = std::thread::current().id();
        let ran_on = main.call(|| std::thread::current().id()).unwrap();
        assert_ne!(ran_on, caller);
    }

    #[test]
    fn detached_config_has_no_view() {
        let config = NativeConfig::detached(&WebViewSettings::default());
        assert!(config.view.is_none());
        assert!(config.main_thread.is_none());
        assert!((config.px_per_dp - 1.0).abs() < f32::EPSILON);
    }
}
