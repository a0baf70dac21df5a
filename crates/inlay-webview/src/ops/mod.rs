//! Operations the application records into a frame's command buffer.
//!
//! ```ignore
//! let stack = webview.push(&mut ops);
//! OffsetOp::new((20, 40)).add(&mut ops);
//! RectOp::new((640, 480)).add(&mut ops);
//! NavigateOp::new("https://example.com").add(&mut ops);
//! stack.pop(&mut ops);
//! ```
//!
//! Operations between a push and its pop act on that webview. Nothing is
//! executed at record time; the plugin runs them in recorded order once the
//! frame is submitted.

mod execute;
mod identity;

pub use identity::WebViewOp;

pub(crate) use execute::dispatch_any;

use inlay_common::{Point, Tag};

use crate::host::CommandBuffer;
use crate::native::{CookieData, StorageData, StorageKind};
use crate::pool::Pool;

/// Gives every staged payload type its static pool and an `add` method.
macro_rules! pooled {
    ($($ty:ident => $pool:ident),* $(,)?) => {
        $(
            static $pool: Pool<$ty> = Pool::new();

            impl $ty {
                /// Record this operation into `ops`.
                pub fn add(self, ops: &mut CommandBuffer) {
                    $pool.add(ops, self);
                }
            }

            impl execute::Pooled for $ty {
                fn pool() -> &'static Pool<Self> {
                    &$pool
                }
            }
        )*
    };
}

pooled! {
    StackOp => STACK_POOL,
    OffsetOp => OFFSET_POOL,
    RectOp => RECT_POOL,
    NavigateOp => NAVIGATE_POOL,
    SetCookieOp => SET_COOKIE_POOL,
    RemoveCookieOp => REMOVE_COOKIE_POOL,
    ListCookieOp => LIST_COOKIE_POOL,
    SetStorageOp => SET_STORAGE_POOL,
    RemoveStorageOp => REMOVE_STORAGE_POOL,
    ListStorageOp => LIST_STORAGE_POOL,
    ExecuteJavascriptOp => EXECUTE_JS_POOL,
    InstallJavascriptOp => INSTALL_JS_POOL,
    MessageReceiverOp => MESSAGE_RECEIVER_POOL,
}

/// Push (`target: Some`) or pop (`None`) of the active webview.
#[derive(Debug, Default)]
pub(crate) struct StackOp {
    pub(crate) target: Option<WebViewOp>,
}

/// Marks the end of the region started by [`WebViewOp::push`].
#[must_use = "a pushed webview must be popped"]
#[derive(Debug)]
pub struct WebViewStack {
    _private: (),
}

impl WebViewStack {
    pub fn pop(self, ops: &mut CommandBuffer) {
        StackOp { target: None }.add(ops);
    }
}

impl WebViewOp {
    /// Make this webview active until the returned stack is popped.
    pub fn push(&self, ops: &mut CommandBuffer) -> WebViewStack {
        StackOp {
            target: Some(self.clone()),
        }
        .add(ops);
        WebViewStack { _private: () }
    }
}

impl From<&WebViewOp> for Tag {
    fn from(op: &WebViewOp) -> Tag {
        op.tag()
    }
}

/// Moves the active webview. Offsets accumulate within a frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OffsetOp {
    pub point: Point,
}

impl OffsetOp {
    pub fn new(point: impl Into<Point>) -> Self {
        Self {
            point: point.into(),
        }
    }
}

/// Sizes the active webview and makes it visible for this frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RectOp {
    pub size: Point,
}

impl RectOp {
    pub fn new(size: impl Into<Point>) -> Self {
        Self { size: size.into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavigateOp {
    pub url: String,
}

impl NavigateOp {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetCookieOp {
    pub cookie: CookieData,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoveCookieOp {
    pub cookie: CookieData,
}

/// Lists cookies; the result arrives as `WebViewEvent::Cookies` on `tag`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ListCookieOp {
    pub tag: Tag,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetStorageOp {
    pub kind: StorageKind,
    pub content: StorageData,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoveStorageOp {
    pub kind: StorageKind,
    pub content: StorageData,
}

/// Lists one storage partition; the result arrives as
/// `WebViewEvent::Storage` on `tag`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ListStorageOp {
    pub kind: StorageKind,
    pub tag: Tag,
}

/// Runs a script once in the current page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecuteJavascriptOp {
    pub script: String,
}

/// Installs a script that runs at the start of every page load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstallJavascriptOp {
    pub script: String,
}

/// Exposes `window.callback.<name>` to page script. Each call arrives as
/// `WebViewEvent::Message` on `tag`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageReceiverOp {
    pub name: String,
    pub tag: Tag,
}
