use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};
use wry::WebViewBuilder;

use crate::events::{NavigationEvent, PageLoadState, TitleEvent};
use crate::ipc::{CallbackMessage, CallbackTable, InstalledScripts};
use crate::native::NativeEvent;

use super::WEBVIEWS;

impl From<wry::PageLoadEvent> for PageLoadState {
    fn from(e: wry::PageLoadEvent) -> Self {
        match e {
            wry::PageLoadEvent::Started => Self::Started,
            wry::PageLoadEvent::Finished => Self::Finished,
        }
    }
}

pub(super) type Callbacks = Arc<Mutex<CallbackTable>>;
pub(super) type Scripts = Arc<Mutex<InstalledScripts>>;

pub(super) fn attach_ipc_handler<'a>(
    builder: WebViewBuilder<'a>,
    callbacks: Callbacks,
    id: u64,
) -> WebViewBuilder<'a> {
    builder.with_ipc_handler(move |request| {
        let body = request.body();
        let Some(message) = CallbackMessage::from_json(body) else {
            warn!(webview = id, body_len = body.len(), "IPC message rejected: not a callback message");
            return;
        };

        let name = message.name.clone();
        let callbacks = callbacks.lock().unwrap_or_else(PoisonError::into_inner);
        if callbacks.dispatch(message) {
            debug!(webview = id, %name, "callback message");
        } else {
            warn!(webview = id, %name, "no callback registered");
        }
    })
}

/// Page load progress; installed scripts are replayed at every load start.
pub(super) fn attach_page_load_handler<'a>(
    builder: WebViewBuilder<'a>,
    events: UnboundedSender<NativeEvent>,
    scripts: Scripts,
    id: u64,
) -> WebViewBuilder<'a> {
    builder.with_on_page_load_handler(move |event, url| {
        let state = PageLoadState::from(event);
        debug!(webview = id, ?state, url = %url, "page load");

        if state == PageLoadState::Started {
            let scripts = scripts.lock().unwrap_or_else(PoisonError::into_inner).clone();
            WEBVIEWS.with(|views| {
                let Ok(views) = views.try_borrow() else {
                    return;
                };
                if let Some(view) = views.get(&id) {
                    for script in scripts.iter() {
                        if let Err(e) = view.evaluate_script(script) {
                            warn!(webview = id, error = %e, "installed script failed");
                        }
                    }
                }
            });
        }
        let _ = events.send(NativeEvent::PageLoad { state, url });
    })
}

pub(super) fn attach_title_handler<'a>(
    builder: WebViewBuilder<'a>,
    events: UnboundedSender<NativeEvent>,
    id: u64,
) -> WebViewBuilder<'a> {
    builder.with_document_title_changed_handler(move |title| {
        debug!(webview = id, title = %title, "title changed");
        let _ = events.send(NativeEvent::Title(TitleEvent { title }));
    })
}

pub(super) fn attach_navigation_handler<'a>(
    builder: WebViewBuilder<'a>,
    events: UnboundedSender<NativeEvent>,
    id: u64,
) -> WebViewBuilder<'a> {
    builder.with_navigation_handler(move |url| {
        debug!(webview = id, url = %url, "navigation");
        let _ = events.send(NativeEvent::Navigation(NavigationEvent { url }));
        true
    })
}
