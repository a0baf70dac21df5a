//! Events the plugin injects into the host event queue.

use std::fmt;

use inlay_common::WebViewError;
use serde::{Deserialize, Serialize};

use crate::native::{CookieData, StorageData, StorageKind};

/// State of a page load lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageLoadState {
    /// Navigation has started.
    Started,
    /// Page has fully loaded.
    Finished,
}

/// The webview moved to a new URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationEvent {
    pub url: String,
}

/// The document title changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleEvent {
    pub title: String,
}

/// Which recorded operation an [`WebViewEvent::Error`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Create,
    Configure,
    Resize,
    Navigate,
    SetCookie,
    RemoveCookie,
    ListCookies,
    SetStorage,
    RemoveStorage,
    ListStorage,
    ExecuteJavascript,
    InstallJavascript,
    MessageReceiver,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Configure => "configure",
            Self::Resize => "resize",
            Self::Navigate => "navigate",
            Self::SetCookie => "set_cookie",
            Self::RemoveCookie => "remove_cookie",
            Self::ListCookies => "list_cookies",
            Self::SetStorage => "set_storage",
            Self::RemoveStorage => "remove_storage",
            Self::ListStorage => "list_storage",
            Self::ExecuteJavascript => "execute_javascript",
            Self::InstallJavascript => "install_javascript",
            Self::MessageReceiver => "message_receiver",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Synthetic events, delivered ahead of native events for the same tag.
#[derive(Debug, Clone, PartialEq)]
pub enum WebViewEvent {
    Navigation(NavigationEvent),
    Title(TitleEvent),
    /// Result of a `ListCookieOp`.
    Cookies(Vec<CookieData>),
    /// Result of a `ListStorageOp`.
    Storage {
        kind: StorageKind,
        items: Vec<StorageData>,
    },
    /// Payload posted by page script through a `MessageReceiverOp` callback.
    Message(String),
    /// An operation failed. Reported on the op's own tag for list and
    /// receiver ops, on the webview's tag otherwise.
    Error {
        operation: OperationKind,
        error: WebViewError,
    },
}

impl WebViewEvent {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_kind_display_matches_serde() {
        for kind in [
            OperationKind::Create,
            OperationKind::ListCookies,
            OperationKind::ExecuteJavascript,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{kind}\""));
        }
    }

    #[test]
    fn error_event_is_error() {
        let event = WebViewEvent::Error {
            operation: OperationKind::Navigate,
            error: WebViewError::Navigation("blocked".into()),
        };
        assert!(event.is_error());
        assert!(!WebViewEvent::Message("hi".into()).is_error());
    }
}
