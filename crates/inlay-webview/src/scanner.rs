//! The per-frame scan pass.
//!
//! Runs after the host has rendered a frame: walks the buffer's reference
//! list in recorded order, executes every staged operation, then hides the
//! webviews that were not given a rect this frame.

use std::sync::Arc;

use inlay_common::{HostError, Insets, Metric, Point};
use tracing::{debug, error, warn};

use crate::bridge::Reporter;
use crate::host::{CommandBuffer, Window, HOST_LAYOUT_VERSION};
use crate::manager::{Handle, PluginState, Shared, WindowState};
use crate::ops::dispatch_any;

/// Frame parameters the operations need.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct FrameInfo {
    pub(crate) metric: Metric,
    pub(crate) insets: Insets,
}

pub(crate) struct ScanContext<'a> {
    pub(crate) shared: &'a Shared,
    pub(crate) window: &'a Arc<dyn Window>,
    pub(crate) plugin: &'a PluginState,
    pub(crate) state: &'a mut WindowState,
    pub(crate) frame: FrameInfo,
    pub(crate) active: Option<Arc<Handle>>,
}

impl ScanContext<'_> {
    pub(crate) fn reporter(&self) -> Reporter {
        Reporter::new(Arc::clone(&self.plugin.synthetic), Arc::clone(self.window))
    }

    /// The handle between the current push and pop, if any.
    pub(crate) fn active_handle(&self, op: &'static str) -> Option<Arc<Handle>> {
        if self.active.is_none() {
            debug!(window = %self.plugin.window, op, "no active webview, ignoring");
        }
        self.active.clone()
    }

    /// Hide every handle that got no rect, drop handles another window has
    /// taken over, and reset the accumulators.
    fn finish(self) {
        let window = self.plugin.window;
        let mut unseen = Vec::new();
        let mut moved = Vec::new();
        for (id, seen) in &self.state.seen {
            match self.shared.handles.get(*id) {
                Some(handle) if !handle.is_owned_by(window) => moved.push(*id),
                Some(handle) if !*seen => unseen.push(handle),
                _ => {}
            }
        }

        for id in moved {
            debug!(handle = %id, %window, "shown elsewhere, dropping");
            self.state.seen.remove(&id);
            self.state.hidden.remove(&id);
        }
        for handle in unseen {
            if !self.state.hidden.insert(handle.id) {
                continue;
            }
            debug!(handle = %handle.id, "hiding");
            if let Err(error) = handle.native.resize(Point::ZERO, Point::ZERO) {
                warn!(handle = %handle.id, %error, "hide failed");
            }
        }
        self.state.bounds.clear();
    }
}

/// Execute the operations recorded in `ops` for `plugin`'s window.
pub(crate) fn scan(
    shared: &Shared,
    plugin: &PluginState,
    window: &Arc<dyn Window>,
    frame: FrameInfo,
    ops: &mut CommandBuffer,
) {
    if ops.layout_version() != HOST_LAYOUT_VERSION {
        let error = HostError::LayoutMismatch {
            expected: HOST_LAYOUT_VERSION,
            found: ops.layout_version(),
        };
        error!(window = %plugin.window, %error, "skipping webview scan");
        return;
    }

    let mut state = plugin.lock();
    for seen in state.seen.values_mut() {
        *seen = false;
    }

    let mut ctx = ScanContext {
        shared,
        window,
        plugin,
        state: &mut state,
        frame,
        active: None,
    };

    let mut dispatched = 0usize;
    for slot in ops.refs_mut() {
        if dispatch_any(slot, &mut ctx) {
            dispatched += 1;
        }
    }
    ctx.finish();

    debug!(window = %plugin.window, dispatched, "scan complete");
}
