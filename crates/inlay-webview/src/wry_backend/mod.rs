//! Native backend built on `wry` (WebView2, WKWebView, WebKitGTK).
//!
//! `wry::WebView` is neither `Send` nor `Sync`, so every instance lives in a
//! table owned by the UI thread. [`WryWebView`] is a proxy that marshals each
//! call there through the window's `run_on_main` and waits for the result.

mod handlers;

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc as std_mpsc, Arc, Mutex, PoisonError};
use std::thread::{self, ThreadId};
use std::time::Duration;

use inlay_common::{Point, WebViewError};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, info};
use url::Url;
use wry::dpi::{PhysicalPosition, PhysicalSize, Position, Size};
use wry::WebViewBuilder;

use crate::ipc;
use crate::native::{
    CookieData, DataManager, InstallTime, JavascriptManager, MainThread, MessageCallback,
    NativeConfig, NativeEvent, NativeWebView, StorageData, StorageKind, WebViewBackend,
};

use handlers::{Callbacks, Scripts};

thread_local! {
    static WEBVIEWS: RefCell<HashMap<u64, wry::WebView>> = RefCell::new(HashMap::new());
}

static NEXT_WEBVIEW: AtomicU64 = AtomicU64::new(1);

/// How long a worker waits for an asynchronous script result.
const SCRIPT_RESULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Creates child webviews inside the host window's native view.
#[derive(Debug, Default, Clone, Copy)]
pub struct WryBackend;

impl WryBackend {
    pub fn new() -> Self {
        Self
    }
}

/// Run `task` on the UI thread behind `main` and wait for its result.
/// `main_id` short-circuits the check once the UI thread is known.
fn run_on_main<R, F>(main: &MainThread, main_id: Option<ThreadId>, task: F) -> Result<R, WebViewError>
where
    R: Send + 'static,
    F: FnOnce() -> R + Send + 'static,
{
    if main_id == Some(thread::current().id()) {
        return Ok(task());
    }
    main.call(task)
}

impl WebViewBackend for WryBackend {
    fn create(&self, config: &NativeConfig) -> Result<Arc<dyn NativeWebView>, WebViewError> {
        let view = config
            .view
            .ok_or_else(|| WebViewError::Creation("no native view attached".into()))?;
        let main = config
            .main_thread
            .clone()
            .ok_or_else(|| WebViewError::Creation("no main thread for window".into()))?;

        let id = NEXT_WEBVIEW.fetch_add(1, Ordering::Relaxed);
        let (events, rx) = mpsc::unbounded_channel();
        let callbacks: Callbacks = Arc::default();
        let scripts: Scripts = Arc::default();
        let settings = config.settings.clone();

        let build = {
            let (callbacks, scripts) = (Arc::clone(&callbacks), Arc::clone(&scripts));
            move || -> Result<ThreadId, WebViewError> {
                let mut builder = WebViewBuilder::new()
                    .with_bounds(zero_rect())
                    .with_transparent(settings.transparent)
                    .with_devtools(settings.devtools)
                    .with_clipboard(settings.clipboard)
                    .with_autoplay(settings.autoplay)
                    .with_focused(false)
                    .with_visible(false);

                if let Some(ua) = &settings.user_agent {
                    builder = builder.with_user_agent(ua);
                }

                builder = handlers::attach_ipc_handler(builder, callbacks, id);
                builder = handlers::attach_page_load_handler(builder, events.clone(), scripts, id);
                builder = handlers::attach_title_handler(builder, events.clone(), id);
                builder = handlers::attach_navigation_handler(builder, events, id);

                let webview = builder
                    .build_as_child(&view)
                    .map_err(|e| WebViewError::Creation(e.to_string()))?;
                WEBVIEWS.with(|views| views.borrow_mut().insert(id, webview));
                Ok(thread::current().id())
            }
        };
        let main_id = run_on_main(&main, None, build)??;

        info!(webview = id, window = %main.window_id(), "wry webview created");
        Ok(Arc::new(WryWebView {
            id,
            main,
            main_id,
            events: Mutex::new(Some(rx)),
            callbacks,
            scripts,
        }))
    }
}

fn zero_rect() -> wry::Rect {
    rect(Point::ZERO, Point::ZERO)
}

fn rect(size: Point, offset: Point) -> wry::Rect {
    wry::Rect {
        position: Position::Physical(PhysicalPosition::new(
            offset.x.round() as i32,
            offset.y.round() as i32,
        )),
        size: Size::Physical(PhysicalSize::new(
            size.x.max(0.0).round() as u32,
            size.y.max(0.0).round() as u32,
        )),
    }
}

/// Thread-safe proxy for one `wry::WebView`.
pub struct WryWebView {
    id: u64,
    main: MainThread,
    main_id: ThreadId,
    events: Mutex<Option<UnboundedReceiver<NativeEvent>>>,
    callbacks: Callbacks,
    scripts: Scripts,
}

impl WryWebView {
    fn with_view<R, F>(&self, f: F) -> Result<R, WebViewError>
    where
        R: Send + 'static,
        F: FnOnce(&wry::WebView) -> Result<R, WebViewError> + Send + 'static,
    {
        let id = self.id;
        run_on_main(&self.main, Some(self.main_id), move || {
            WEBVIEWS.with(|views| match views.borrow().get(&id) {
                Some(view) => f(view),
                None => Err(WebViewError::NotSupported(format!("wry webview {id} is gone"))),
            })
        })?
    }

    fn eval(&self, script: String) -> Result<(), WebViewError> {
        self.with_view(move |view| {
            view.evaluate_script(&script)
                .map_err(|e| WebViewError::Script(e.to_string()))
        })
    }

    /// Evaluate `script` and wait for its JSON-encoded result.
    fn eval_with_result(&self, script: String) -> Result<String, WebViewError> {
        if thread::current().id() == self.main_id {
            return Err(WebViewError::NotSupported(
                "script results cannot be awaited on the UI thread".into(),
            ));
        }
        let (tx, rx) = std_mpsc::channel();
        self.with_view(move |view| {
            view.evaluate_script_with_callback(&script, move |result| {
                let _ = tx.send(result);
            })
            .map_err(|e| WebViewError::Script(e.to_string()))
        })?;
        rx.recv_timeout(SCRIPT_RESULT_TIMEOUT)
            .map_err(|e| WebViewError::Script(format!("no script result: {e}")))
    }
}

impl NativeWebView for WryWebView {
    fn configure(&self, config: &NativeConfig) -> Result<(), WebViewError> {
        // Bounds are physical pixels, so density changes need no action.
        debug!(webview = self.id, px_per_dp = config.px_per_dp, "configure");
        Ok(())
    }

    fn resize(&self, size: Point, offset: Point) -> Result<(), WebViewError> {
        let bounds = rect(size, offset);
        let visible = !size.is_empty_area();
        self.with_view(move |view| {
            view.set_bounds(bounds)
                .and_then(|()| view.set_visible(visible))
                .map_err(|e| WebViewError::NotSupported(e.to_string()))
        })
    }

    fn navigate(&self, url: &Url) -> Result<(), WebViewError> {
        let url = url.to_string();
        self.with_view(move |view| {
            view.load_url(&url)
                .map_err(|e| WebViewError::Navigation(e.to_string()))
        })
    }

    fn close(&self) {
        let id = self.id;
        let removed = run_on_main(&self.main, Some(self.main_id), move || {
            WEBVIEWS.with(|views| {
                let view = views.borrow_mut().remove(&id);
                // Dropped with the table unborrowed; teardown may re-enter it.
                let removed = view.is_some();
                drop(view);
                removed
            })
        });
        self.callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        debug!(webview = id, removed = removed.unwrap_or(false), "wry webview removed");
    }

    fn take_events(&self) -> Option<UnboundedReceiver<NativeEvent>> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn data_manager(&self) -> &dyn DataManager {
        self
    }

    fn javascript_manager(&self) -> &dyn JavascriptManager {
        self
    }
}

fn cookie_data(cookie: &wry::cookie::Cookie<'static>) -> CookieData {
    let expires = match cookie.expires() {
        Some(wry::cookie::Expiration::DateTime(at)) => u64::try_from(at.unix_timestamp()).ok(),
        _ => None,
    };
    CookieData {
        name: cookie.name().to_string(),
        value: cookie.value().to_string(),
        domain: cookie.domain().unwrap_or_default().to_string(),
        path: cookie.path().unwrap_or("/").to_string(),
        expires,
        secure: cookie.secure().unwrap_or(false),
        http_only: cookie.http_only().unwrap_or(false),
    }
}

impl DataManager for WryWebView {
    fn add_cookie(&self, cookie: &CookieData) -> Result<(), WebViewError> {
        self.eval(ipc::set_cookie_script(cookie)?)
            .map_err(|e| WebViewError::Cookie(e.to_string()))
    }

    fn remove_cookie(&self, cookie: &CookieData) -> Result<(), WebViewError> {
        self.eval(ipc::remove_cookie_script(cookie)?)
            .map_err(|e| WebViewError::Cookie(e.to_string()))
    }

    fn cookies(&self) -> Result<Vec<CookieData>, WebViewError> {
        self.with_view(|view| {
            view.cookies()
                .map(|cookies| cookies.iter().map(cookie_data).collect())
                .map_err(|e| WebViewError::Cookie(e.to_string()))
        })
    }

    fn add_storage(&self, kind: StorageKind, item: &StorageData) -> Result<(), WebViewError> {
        self.eval(ipc::set_storage_script(kind, item))
            .map_err(|e| WebViewError::Storage(e.to_string()))
    }

    fn remove_storage(&self, kind: StorageKind, item: &StorageData) -> Result<(), WebViewError> {
        self.eval(ipc::remove_storage_script(kind, item))
            .map_err(|e| WebViewError::Storage(e.to_string()))
    }

    fn storage(&self, kind: StorageKind) -> Result<Vec<StorageData>, WebViewError> {
        let raw = self.eval_with_result(ipc::list_storage_script(kind))?;
        ipc::parse_storage(&raw)
            .ok_or_else(|| WebViewError::Storage(format!("unreadable {} listing", kind.js_object())))
    }
}

impl JavascriptManager for WryWebView {
    fn run_javascript(&self, script: &str) -> Result<(), WebViewError> {
        self.eval(script.to_string())
    }

    fn install_javascript(&self, script: &str, when: InstallTime) -> Result<(), WebViewError> {
        let added = match when {
            InstallTime::OnLoadStart => self
                .scripts
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .install(script),
        };
        if !added {
            debug!(webview = self.id, "script already installed");
        }
        Ok(())
    }

    /// Re-registering a name swaps the callback; the page-side bootstrap is
    /// installed and run only for the first registration.
    fn add_callback(&self, name: &str, callback: MessageCallback) -> Result<(), WebViewError> {
        let is_new = self
            .callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .register(name, callback);
        if !is_new {
            return Ok(());
        }

        let script = ipc::callback_script(name);
        self.install_javascript(&script, InstallTime::OnLoadStart)?;
        self.eval(script)
    }
}
