//! Script-side protocol between page JavaScript and the host.
//!
//! Messages flow in both directions:
//! - **JS -> host**: `window.callback.<name>(message)` posts a
//!   [`CallbackMessage`] as JSON through `window.ipc.postMessage`, which
//!   reaches the backend's IPC handler.
//! - **host -> JS**: backends without native cookie or storage APIs run
//!   the snippets built here in the page context.

use std::collections::HashMap;

use inlay_common::WebViewError;
use serde::{Deserialize, Serialize};

use crate::native::{CookieData, MessageCallback, StorageData, StorageKind};

/// A message posted by page script through a registered callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackMessage {
    /// The callback name, as registered by `MessageReceiverOp`.
    pub name: String,
    pub payload: String,
}

impl CallbackMessage {
    /// Parse an IPC body. Returns `None` for anything that is not a
    /// callback message.
    pub fn from_json(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}

/// Page callbacks registered on one webview, by name.
#[derive(Default)]
pub struct CallbackTable {
    callbacks: HashMap<String, MessageCallback>,
}

impl CallbackTable {
    /// Route messages for `name` to `callback`, replacing any earlier one.
    /// Returns whether `name` is new, i.e. whether page script still needs
    /// [`callback_script`] for it.
    pub fn register(&mut self, name: &str, callback: MessageCallback) -> bool {
        self.callbacks.insert(name.to_string(), callback).is_none()
    }

    /// Hand `message` to its callback. Returns `false` if none is registered.
    pub fn dispatch(&self, message: CallbackMessage) -> bool {
        match self.callbacks.get(&message.name) {
            Some(callback) => {
                callback(message.payload);
                true
            }
            None => false,
        }
    }
}

/// Scripts replayed at the start of every page load, in install order.
/// Installing the same script again is a no-op.
#[derive(Debug, Clone, Default)]
pub struct InstalledScripts {
    scripts: Vec<String>,
}

impl InstalledScripts {
    /// Returns whether `script` was added.
    pub fn install(&mut self, script: &str) -> bool {
        if self.scripts.iter().any(|known| known == script) {
            return false;
        }
        self.scripts.push(script.to_string());
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.scripts.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

/// Quote `s` as a JavaScript string literal.
fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

/// Script defining `window.callback.<name>`. Safe to run more than once.
pub fn callback_script(name: &str) -> String {
    let name = js_string(name);
    format!(
        "(function() {{\
            window.callback = window.callback || {{}};\
            window.callback[{name}] = function(message) {{\
                window.ipc.postMessage(JSON.stringify({{ name: {name}, payload: String(message) }}));\
            }};\
        }})();"
    )
}

const EPOCH: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

/// Characters that would end a cookie field early or be mangled by
/// `document.cookie`.
fn cookie_field_ok(field: &str, allow_equals: bool) -> bool {
    field.chars().all(|c| {
        !c.is_control() && !matches!(c, ';' | ',' | '"' | '\\') && (allow_equals || c != '=')
    })
}

fn cookie_attributes(cookie: &CookieData) -> Result<String, WebViewError> {
    let invalid = |what: &str, text: &str| {
        WebViewError::Cookie(format!("invalid cookie {what}: {text:?}"))
    };
    if cookie.name.is_empty()
        || !cookie_field_ok(&cookie.name, false)
        || cookie.name.chars().any(char::is_whitespace)
    {
        return Err(invalid("name", &cookie.name));
    }
    if !cookie_field_ok(&cookie.value, true) || cookie.value.contains(' ') {
        return Err(invalid("value", &cookie.value));
    }
    if !cookie_field_ok(&cookie.domain, false) {
        return Err(invalid("domain", &cookie.domain));
    }
    if !cookie_field_ok(&cookie.path, true) {
        return Err(invalid("path", &cookie.path));
    }

    let mut text = format!("{}={}", cookie.name, cookie.value);
    if !cookie.domain.is_empty() {
        text.push_str("; domain=");
        text.push_str(&cookie.domain);
    }
    text.push_str("; path=");
    text.push_str(if cookie.path.is_empty() { "/" } else { &cookie.path });
    if cookie.secure {
        text.push_str("; secure");
    }
    Ok(text)
}

/// Script that stores `cookie` through `document.cookie`. `http_only`
/// cannot be set from page script and is ignored.
///
/// Fails with [`WebViewError::Cookie`] when a field would inject extra
/// cookie attributes.
pub fn set_cookie_script(cookie: &CookieData) -> Result<String, WebViewError> {
    let base = js_string(&cookie_attributes(cookie)?);
    Ok(match cookie.expires {
        Some(secs) => format!(
            "document.cookie = {base} + \"; expires=\" + new Date({}).toUTCString();",
            secs.saturating_mul(1000)
        ),
        None => format!("document.cookie = {base};"),
    })
}

/// Script that expires `cookie` immediately.
pub fn remove_cookie_script(cookie: &CookieData) -> Result<String, WebViewError> {
    let expired = CookieData {
        value: String::new(),
        ..cookie.clone()
    };
    let text = format!("{}; expires={EPOCH}", cookie_attributes(&expired)?);
    Ok(format!("document.cookie = {};", js_string(&text)))
}

pub fn set_storage_script(kind: StorageKind, item: &StorageData) -> String {
    format!(
        "window.{}.setItem({}, {});",
        kind.js_object(),
        js_string(&item.key),
        js_string(&item.value)
    )
}

pub fn remove_storage_script(kind: StorageKind, item: &StorageData) -> String {
    format!(
        "window.{}.removeItem({});",
        kind.js_object(),
        js_string(&item.key)
    )
}

/// Expression evaluating to a JSON array of `{key, value}` objects.
pub fn list_storage_script(kind: StorageKind) -> String {
    let store = kind.js_object();
    format!(
        "JSON.stringify(Object.keys(window.{store}).map(function(k) {{\
            return {{ key: k, value: window.{store}.getItem(k) }};\
        }}))"
    )
}

/// Parse the result of [`list_storage_script`]. Engines hand the value
/// back either as the array itself or as a JSON-encoded string of it.
pub fn parse_storage(raw: &str) -> Option<Vec<StorageData>> {
    if let Ok(items) = serde_json::from_str::<Vec<StorageData>>(raw) {
        return Some(items);
    }
    let inner: String = serde_json::from_str(raw).ok()?;
    serde_json::from_str(&inner).ok()
}
