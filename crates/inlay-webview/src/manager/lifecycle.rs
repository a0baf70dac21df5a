//! Creation and teardown of webview handles.

use std::sync::Arc;

use inlay_common::{HandleId, WindowId};
use tracing::{debug, error, info, warn};

use crate::events::{OperationKind, WebViewEvent};
use crate::native::InstallTime;
use crate::ops::WebViewOp;
use crate::scanner::ScanContext;

use super::handle::Handle;
use super::Shared;

/// The live handle for `op`, creating it on first use.
///
/// A failed creation is reported on the op's tag and retried the next time
/// the identity is pushed.
pub(crate) fn ensure_handle(ctx: &mut ScanContext<'_>, op: &WebViewOp) -> Option<Arc<Handle>> {
    let id = op.id();
    if let Some(handle) = ctx.shared.handles.get(id) {
        return Some(handle);
    }

    let native = match ctx.shared.backend.create(&ctx.state.config) {
        Ok(native) => native,
        Err(error) => {
            error!(handle = %id, window = %ctx.plugin.window, %error, "failed to create webview");
            ctx.reporter().deliver(
                op.tag(),
                WebViewEvent::Error {
                    operation: OperationKind::Create,
                    error,
                },
            );
            return None;
        }
    };

    op.bind_release(&ctx.shared.released);
    let handle = Handle::start(
        id,
        op.tag(),
        native,
        ctx.plugin.window,
        ctx.reporter(),
        &ctx.shared.runtime,
        ctx.shared.job_queue_capacity,
    );

    for script in &ctx.shared.settings.initialization_scripts {
        let script = script.clone();
        handle.submit(OperationKind::InstallJavascript, handle.tag, move |native| {
            native
                .javascript_manager()
                .install_javascript(&script, InstallTime::OnLoadStart)
                .map(|()| None)
        });
    }

    ctx.shared.handles.insert(Arc::clone(&handle));
    info!(handle = %id, window = %ctx.plugin.window, "webview created");
    Some(handle)
}

/// Take `handle` over from the window that showed it last, if that was not
/// this one. The old window drops it on its next scan without hiding it.
pub(crate) fn adopt(ctx: &mut ScanContext<'_>, handle: &Handle) {
    let Some(previous) = handle.claim(ctx.plugin.window, &ctx.reporter()) else {
        return;
    };
    ctx.state.hidden.remove(&handle.id);
    if let Err(error) = handle.native.configure(&ctx.state.config) {
        warn!(handle = %handle.id, %error, "reconfigure after moving windows failed");
    }
    info!(handle = %handle.id, from = %previous, to = %ctx.plugin.window, "webview moved");
}

/// Close and unregister `id`, and remove it from every window.
pub(crate) fn release_handle(shared: &Shared, id: HandleId) -> bool {
    let Some(handle) = shared.handles.remove(id) else {
        return false;
    };
    handle.close();
    forget_everywhere(shared, id);
    debug!(handle = %id, "webview released");
    true
}

/// Close every handle `window` owns, then drop the window's state.
///
/// Handles that moved to another window since they were shown here stay
/// open.
pub(crate) fn destroy_window(shared: &Shared, window: WindowId) {
    let Some(plugin) = shared.windows.remove(window) else {
        return;
    };

    let closed: Vec<HandleId> = {
        let mut state = plugin.lock();
        let ids: Vec<HandleId> = state.seen.drain().map(|(id, _)| id).collect();
        state.bounds.clear();
        state.hidden.clear();
        ids.into_iter()
            .filter(|id| match shared.handles.remove_owned(*id, window) {
                Some(handle) => {
                    handle.close();
                    true
                }
                None => false,
            })
            .collect()
    };

    for id in &closed {
        forget_everywhere(shared, *id);
    }
    info!(window = %window, closed = closed.len(), "window destroyed");
}

/// Close every handle the plugin owns.
pub(crate) fn close_all(shared: &Shared) {
    let handles = shared.handles.drain();
    for handle in &handles {
        handle.close();
    }
    for plugin in shared.windows.all() {
        let mut state = plugin.lock();
        state.seen.clear();
        state.bounds.clear();
        state.hidden.clear();
    }
    if !handles.is_empty() {
        info!(count = handles.len(), "closed all webviews");
    }
}

fn forget_everywhere(shared: &Shared, id: HandleId) {
    for plugin in shared.windows.all() {
        plugin.forget(id);
    }
}
