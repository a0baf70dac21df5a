//! Forwarding of native webview events into the synthetic queue.

use std::sync::{Arc, PoisonError, RwLock};

use inlay_common::{HandleId, Tag};
use tokio::runtime::Handle as RuntimeHandle;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::events::WebViewEvent;
use crate::host::Window;
use crate::native::NativeEvent;
use crate::queue::SyntheticQueue;

#[derive(Clone)]
struct Route {
    queue: Arc<SyntheticQueue>,
    window: Arc<dyn Window>,
}

/// Delivers synthetic events to one window and wakes it.
///
/// Clones share the route, so [`retarget`](Self::retarget) redirects every
/// clone at once.
#[derive(Clone)]
pub(crate) struct Reporter {
    route: Arc<RwLock<Route>>,
}

impl Reporter {
    pub(crate) fn new(queue: Arc<SyntheticQueue>, window: Arc<dyn Window>) -> Self {
        Self {
            route: Arc::new(RwLock::new(Route { queue, window })),
        }
    }

    /// Send everything delivered through this reporter (and its clones) to
    /// `other`'s window from now on.
    pub(crate) fn retarget(&self, other: &Reporter) {
        let route = other.route();
        *self.route.write().unwrap_or_else(PoisonError::into_inner) = route;
    }

    pub(crate) fn deliver(&self, tag: Tag, event: WebViewEvent) {
        let route = self.route();
        route.queue.add(tag, event);
        route.window.invalidate();
    }

    pub(crate) fn invalidate(&self) {
        self.route().window.invalidate();
    }

    fn route(&self) -> Route {
        self.route
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Native events that surface to the application. Page-load progress only
/// triggers a redraw.
pub(crate) fn translate(event: NativeEvent) -> Option<WebViewEvent> {
    match event {
        NativeEvent::Navigation(event) => Some(WebViewEvent::Navigation(event)),
        NativeEvent::Title(event) => Some(WebViewEvent::Title(event)),
        NativeEvent::PageLoad { .. } => None,
    }
}

/// Listen on `events` until the stream closes or `cancel` fires.
pub(crate) fn spawn_bridge(
    runtime: &RuntimeHandle,
    id: HandleId,
    tag: Tag,
    mut events: UnboundedReceiver<NativeEvent>,
    reporter: Reporter,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    runtime.spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                event = events.recv() => {
                    let Some(event) = event else { break };
                    trace!(handle = %id, ?event, "native event");
                    match translate(event) {
                        Some(event) => reporter.deliver(tag, event),
                        None => reporter.invalidate(),
                    }
                }
            }
        }
        debug!(handle = %id, "event bridge stopped");
    })
}
