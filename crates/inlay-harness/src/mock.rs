//! Recording webview backend.
//!
//! `MockBackend` hands out `MockWebView`s that keep an ordered journal of
//! every call, hold cookies and web storage in memory, and let a test emit
//! native events, invoke page callbacks, or stall data operations.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use inlay_common::{Point, WebViewError};
use inlay_webview::ipc::{self, CallbackMessage, CallbackTable, InstalledScripts};
use inlay_webview::{
    CookieData, DataManager, InstallTime, JavascriptManager, MessageCallback, NativeConfig,
    NativeEvent, NativeWebView, StorageData, StorageKind, WebViewBackend,
};
use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use url::Url;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One call made on a [`MockWebView`], in the order it happened.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum MockCall {
    Configure { px_per_dp: f32 },
    Resize { size: Point, offset: Point },
    Navigate { url: String },
    Close,
    AddCookie { name: String },
    RemoveCookie { name: String },
    ListCookies,
    AddStorage { kind: StorageKind, key: String },
    RemoveStorage { kind: StorageKind, key: String },
    ListStorage { kind: StorageKind },
    RunJavascript { script: String },
    InstallJavascript { script: String },
    AddCallback { name: String },
}

#[derive(Default)]
struct BackendState {
    views: Mutex<Vec<Arc<MockWebView>>>,
    refuse: AtomicUsize,
    configs: Mutex<Vec<f32>>,
}

/// Backend whose webviews live in memory. Clones share state.
#[derive(Clone, Default)]
pub struct MockBackend {
    state: Arc<BackendState>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse the next `count` creations.
    pub fn fail_next_create(&self, count: usize) {
        self.state.refuse.store(count, Ordering::SeqCst);
    }

    pub fn created(&self) -> usize {
        lock(&self.state.views).len()
    }

    /// Webviews in creation order.
    pub fn views(&self) -> Vec<Arc<MockWebView>> {
        lock(&self.state.views).clone()
    }

    pub fn view(&self, index: usize) -> Option<Arc<MockWebView>> {
        lock(&self.state.views).get(index).cloned()
    }

    /// Density of each creation request.
    pub fn create_densities(&self) -> Vec<f32> {
        lock(&self.state.configs).clone()
    }
}

impl WebViewBackend for MockBackend {
    fn create(&self, config: &NativeConfig) -> Result<Arc<dyn NativeWebView>, WebViewError> {
        let refused = self
            .state
            .refuse
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(WebViewError::Creation("mock backend refused".into()));
        }

        lock(&self.state.configs).push(config.px_per_dp);
        let view = Arc::new(MockWebView::new());
        lock(&self.state.views).push(Arc::clone(&view));
        Ok(view)
    }
}

#[derive(Default)]
struct Stall {
    paused: bool,
    waiting: usize,
}

/// In-memory webview.
pub struct MockWebView {
    calls: Mutex<Vec<MockCall>>,
    cookies: Mutex<Vec<CookieData>>,
    local: Mutex<Vec<StorageData>>,
    session: Mutex<Vec<StorageData>>,
    installed: Mutex<InstalledScripts>,
    callbacks: Mutex<CallbackTable>,
    failure: Mutex<Option<WebViewError>>,
    stall: Mutex<Stall>,
    resumed: Condvar,
    sender: UnboundedSender<NativeEvent>,
    receiver: Mutex<Option<UnboundedReceiver<NativeEvent>>>,
}

impl MockWebView {
    fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            calls: Mutex::new(Vec::new()),
            cookies: Mutex::new(Vec::new()),
            local: Mutex::new(Vec::new()),
            session: Mutex::new(Vec::new()),
            installed: Mutex::new(InstalledScripts::default()),
            callbacks: Mutex::new(CallbackTable::default()),
            failure: Mutex::new(None),
            stall: Mutex::new(Stall::default()),
            resumed: Condvar::new(),
            sender,
            receiver: Mutex::new(Some(receiver)),
        }
    }

    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.calls).clone()
    }

    pub fn resizes(&self) -> Vec<(Point, Point)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                MockCall::Resize { size, offset } => Some((size, offset)),
                _ => None,
            })
            .collect()
    }

    pub fn last_resize(&self) -> Option<(Point, Point)> {
        self.resizes().pop()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                MockCall::Navigate { url } => Some(url),
                _ => None,
            })
            .collect()
    }

    pub fn close_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, MockCall::Close))
            .count()
    }

    pub fn cookie_jar(&self) -> Vec<CookieData> {
        lock(&self.cookies).clone()
    }

    pub fn storage_snapshot(&self, kind: StorageKind) -> Vec<StorageData> {
        lock(self.partition(kind)).clone()
    }

    pub fn installed_scripts(&self) -> Vec<String> {
        lock(&self.installed).iter().map(str::to_string).collect()
    }

    /// Push a native event, as the engine would.
    pub fn emit(&self, event: NativeEvent) -> bool {
        self.sender.send(event).is_ok()
    }

    /// Call a registered page callback, as page script would.
    pub fn invoke_callback(&self, name: &str, message: &str) -> bool {
        lock(&self.callbacks).dispatch(CallbackMessage {
            name: name.to_string(),
            payload: message.to_string(),
        })
    }

    /// Make the next data or script operation fail with `error`.
    pub fn fail_next(&self, error: WebViewError) {
        *lock(&self.failure) = Some(error);
    }

    /// Block data and script operations until [`resume`](Self::resume).
    pub fn pause(&self) {
        lock(&self.stall).paused = true;
    }

    pub fn resume(&self) {
        lock(&self.stall).paused = false;
        self.resumed.notify_all();
    }

    /// Wait until `count` operations are blocked in [`pause`](Self::pause).
    pub fn wait_for_stalled(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if lock(&self.stall).waiting >= count {
                return true;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        false
    }

    fn partition(&self, kind: StorageKind) -> &Mutex<Vec<StorageData>> {
        match kind {
            StorageKind::Local => &self.local,
            StorageKind::Session => &self.session,
        }
    }

    fn record(&self, call: MockCall) {
        lock(&self.calls).push(call);
    }

    /// Entry point of every data and script operation.
    fn enter(&self, call: MockCall) -> Result<(), WebViewError> {
        let mut stall = lock(&self.stall);
        if stall.paused {
            stall.waiting += 1;
            while stall.paused {
                stall = self
                    .resumed
                    .wait(stall)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            stall.waiting -= 1;
        }
        drop(stall);

        self.record(call);
        match lock(&self.failure).take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl NativeWebView for MockWebView {
    fn configure(&self, config: &NativeConfig) -> Result<(), WebViewError> {
        self.record(MockCall::Configure {
            px_per_dp: config.px_per_dp,
        });
        Ok(())
    }

    fn resize(&self, size: Point, offset: Point) -> Result<(), WebViewError> {
        self.record(MockCall::Resize { size, offset });
        Ok(())
    }

    fn navigate(&self, url: &Url) -> Result<(), WebViewError> {
        self.record(MockCall::Navigate {
            url: url.to_string(),
        });
        Ok(())
    }

    fn close(&self) {
        self.record(MockCall::Close);
        *lock(&self.callbacks) = CallbackTable::default();
    }

    fn take_events(&self) -> Option<UnboundedReceiver<NativeEvent>> {
        lock(&self.receiver).take()
    }

    fn data_manager(&self) -> &dyn DataManager {
        self
    }

    fn javascript_manager(&self) -> &dyn JavascriptManager {
        self
    }
}

impl DataManager for MockWebView {
    fn add_cookie(&self, cookie: &CookieData) -> Result<(), WebViewError> {
        self.enter(MockCall::AddCookie {
            name: cookie.name.clone(),
        })?;
        ipc::set_cookie_script(cookie)?;
        let mut jar = lock(&self.cookies);
        jar.retain(|c| c.name != cookie.name || c.domain != cookie.domain);
        jar.push(cookie.clone());
        Ok(())
    }

    fn remove_cookie(&self, cookie: &CookieData) -> Result<(), WebViewError> {
        self.enter(MockCall::RemoveCookie {
            name: cookie.name.clone(),
        })?;
        lock(&self.cookies).retain(|c| c.name != cookie.name || c.domain != cookie.domain);
        Ok(())
    }

    fn cookies(&self) -> Result<Vec<CookieData>, WebViewError> {
        self.enter(MockCall::ListCookies)?;
        Ok(self.cookie_jar())
    }

    fn add_storage(&self, kind: StorageKind, item: &StorageData) -> Result<(), WebViewError> {
        self.enter(MockCall::AddStorage {
            kind,
            key: item.key.clone(),
        })?;
        let mut items = lock(self.partition(kind));
        match items.iter_mut().find(|existing| existing.key == item.key) {
            Some(existing) => existing.value = item.value.clone(),
            None => items.push(item.clone()),
        }
        Ok(())
    }

    fn remove_storage(&self, kind: StorageKind, item: &StorageData) -> Result<(), WebViewError> {
        self.enter(MockCall::RemoveStorage {
            kind,
            key: item.key.clone(),
        })?;
        lock(self.partition(kind)).retain(|existing| existing.key != item.key);
        Ok(())
    }

    fn storage(&self, kind: StorageKind) -> Result<Vec<StorageData>, WebViewError> {
        self.enter(MockCall::ListStorage { kind })?;
        Ok(self.storage_snapshot(kind))
    }
}

impl JavascriptManager for MockWebView {
    fn run_javascript(&self, script: &str) -> Result<(), WebViewError> {
        self.enter(MockCall::RunJavascript {
            script: script.to_string(),
        })
    }

    fn install_javascript(&self, script: &str, _when: InstallTime) -> Result<(), WebViewError> {
        self.enter(MockCall::InstallJavascript {
            script: script.to_string(),
        })?;
        lock(&self.installed).install(script);
        Ok(())
    }

    fn add_callback(&self, name: &str, callback: MessageCallback) -> Result<(), WebViewError> {
        self.record(MockCall::AddCallback {
            name: name.to_string(),
        });
        lock(&self.callbacks).register(name, callback);
        Ok(())
    }
}
