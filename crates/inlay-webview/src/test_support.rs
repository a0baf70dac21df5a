//! Minimal host and backend doubles for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use inlay_common::{Point, Tag, WebViewError, WindowId};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use url::Url;

use crate::host::{EventQueue, Window};
use crate::native::{
    CookieData, DataManager, InstallTime, JavascriptManager, MessageCallback, NativeConfig,
    NativeEvent, NativeWebView, StorageData, StorageKind, WebViewBackend,
};

pub(crate) struct CountingWindow {
    id: WindowId,
    invalidations: AtomicUsize,
}

impl CountingWindow {
    pub(crate) fn new(id: u64) -> Self {
        Self {
            id: WindowId(id),
            invalidations: AtomicUsize::new(0),
        }
    }

    pub(crate) fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }
}

impl Default for CountingWindow {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Window for CountingWindow {
    fn id(&self) -> WindowId {
        self.id
    }

    fn invalidate(&self) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
    }
}

/// Host queue with no native events.
#[derive(Debug, Default)]
pub(crate) struct EmptyQueue;

impl EventQueue for EmptyQueue {
    type Event = ();

    fn events(&mut self, _tag: Tag) -> Vec<()> {
        Vec::new()
    }
}

/// What a [`FakeWebView`] was asked to do.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Configure(f32),
    Resize(Point, Point),
    Navigate(String),
    Close,
}

#[derive(Default)]
pub(crate) struct FakeBackend {
    pub(crate) created: AtomicUsize,
    pub(crate) fail: AtomicBool,
    pub(crate) views: Mutex<Vec<Arc<FakeWebView>>>,
}

impl FakeBackend {
    pub(crate) fn view(&self, index: usize) -> Arc<FakeWebView> {
        Arc::clone(&self.views.lock().unwrap()[index])
    }
}

impl WebViewBackend for Arc<FakeBackend> {
    fn create(&self, _config: &NativeConfig) -> Result<Arc<dyn NativeWebView>, WebViewError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(WebViewError::Creation("no display".into()));
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        let view = Arc::new(FakeWebView::default());
        self.views.lock().unwrap().push(Arc::clone(&view));
        Ok(view)
    }
}

pub(crate) struct FakeWebView {
    pub(crate) calls: Mutex<Vec<Call>>,
    pub(crate) cookies: Mutex<Vec<CookieData>>,
    events: Mutex<Option<UnboundedReceiver<NativeEvent>>>,
    pub(crate) sender: mpsc::UnboundedSender<NativeEvent>,
    pub(crate) callbacks: Mutex<HashMap<String, MessageCallback>>,
}

impl Default for FakeWebView {
    fn default() -> Self {
        let (sender, rx) = mpsc::unbounded_channel();
        Self {
            calls: Mutex::new(Vec::new()),
            cookies: Mutex::new(Vec::new()),
            events: Mutex::new(Some(rx)),
            sender,
            callbacks: Mutex::new(HashMap::new()),
        }
    }
}

impl FakeWebView {
    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn resizes(&self) -> Vec<(Point, Point)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Resize(size, offset) => Some((size, offset)),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn closes(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| **call == Call::Close)
            .count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl NativeWebView for FakeWebView {
    fn configure(&self, config: &NativeConfig) -> Result<(), WebViewError> {
        self.record(Call::Configure(config.px_per_dp));
        Ok(())
    }

    fn resize(&self, size: Point, offset: Point) -> Result<(), WebViewError> {
        self.record(Call::Resize(size, offset));
        Ok(())
    }

    fn navigate(&self, url: &Url) -> Result<(), WebViewError> {
        self.record(Call::Navigate(url.to_string()));
        Ok(())
    }

    fn close(&self) {
        self.record(Call::Close);
    }

    fn take_events(&self) -> Option<UnboundedReceiver<NativeEvent>> {
        self.events.lock().unwrap().take()
    }

    fn data_manager(&self) -> &dyn DataManager {
        self
    }

    fn javascript_manager(&self) -> &dyn JavascriptManager {
        self
    }
}

impl DataManager for FakeWebView {
    fn add_cookie(&self, cookie: &CookieData) -> Result<(), WebViewError> {
        self.cookies.lock().unwrap().push(cookie.clone());
        Ok(())
    }

    fn remove_cookie(&self, cookie: &CookieData) -> Result<(), WebViewError> {
        self.cookies.lock().unwrap().retain(|c| c.name != cookie.name);
        Ok(())
    }

    fn cookies(&self) -> Result<Vec<CookieData>, WebViewError> {
        Ok(self.cookies.lock().unwrap().clone())
    }

    fn add_storage(&self, _kind: StorageKind, _item: &StorageData) -> Result<(), WebViewError> {
        Ok(())
    }

    fn remove_storage(&self, _kind: StorageKind, _item: &StorageData) -> Result<(), WebViewError> {
        Ok(())
    }

    fn storage(&self, _kind: StorageKind) -> Result<Vec<StorageData>, WebViewError> {
        Err(WebViewError::NotSupported("storage".into()))
    }
}

impl JavascriptManager for FakeWebView {
    fn run_javascript(&self, _script: &str) -> Result<(), WebViewError> {
        Ok(())
    }

    fn install_javascript(&self, _script: &str, _when: InstallTime) -> Result<(), WebViewError> {
        Ok(())
    }

    fn add_callback(&self, name: &str, callback: MessageCallback) -> Result<(), WebViewError> {
        self.callbacks
            .lock()
            .unwrap()
            .insert(name.to_string(), callback);
        Ok(())
    }
}
