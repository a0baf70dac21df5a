//! Native webviews embedded in an immediate-mode frame loop.
//!
//! The application records webview operations into each frame's command
//! buffer alongside its drawing. [`WebViewPlugin`] intercepts the host's
//! window events, runs those operations once the frame is submitted, and
//! drives the native webviews to match:
//! - creation on first use of a [`WebViewOp`] identity, teardown when the
//!   identity drops or its window is destroyed
//! - geometry accumulated from offsets and rects, hiding when absent
//! - navigation, script execution and injection, cookies, web storage
//! - native navigation/title changes and page-script messages surfaced as
//!   [`WebViewEvent`]s through the frame's event queue

pub mod events;
pub mod host;
pub mod ipc;
pub mod manager;
pub mod native;
pub mod ops;
pub mod queue;

mod bridge;
mod pool;
mod scanner;

#[cfg(feature = "wry")]
pub mod wry_backend;

#[cfg(feature = "wry")]
pub use wry_backend::WryBackend;

#[cfg(test)]
mod test_support;

pub use events::{NavigationEvent, OperationKind, PageLoadState, TitleEvent, WebViewEvent};
pub use host::{
    CommandBuffer, EventQueue, FrameEvent, ViewEvent, ViewHandle, Window, WindowEvent,
    HOST_LAYOUT_VERSION,
};
pub use manager::WebViewPlugin;
pub use native::{
    CookieData, DataManager, InstallTime, JavascriptManager, MessageCallback, NativeConfig,
    NativeEvent, NativeWebView, StorageData, StorageKind, WebViewBackend,
};
pub use ops::{
    ExecuteJavascriptOp, InstallJavascriptOp, ListCookieOp, ListStorageOp, MessageReceiverOp,
    NavigateOp, OffsetOp, RectOp, RemoveCookieOp, RemoveStorageOp, SetCookieOp, SetStorageOp,
    WebViewOp, WebViewStack,
};
pub use queue::{ProxyQueue, QueuedEvent, SyntheticQueue};
