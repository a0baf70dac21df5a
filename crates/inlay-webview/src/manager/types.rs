use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use inlay_common::{HandleId, Point, WindowId};

use crate::host::ViewEvent;
use crate::native::NativeConfig;
use crate::queue::SyntheticQueue;

/// Geometry accumulated for one handle during a scan.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Bounds {
    pub(crate) offset: Point,
    pub(crate) size: Point,
}

/// Plugin state for one host window.
pub(crate) struct PluginState {
    pub(crate) window: WindowId,
    pub(crate) synthetic: Arc<SyntheticQueue>,
    state: Mutex<WindowState>,
}

pub(crate) struct WindowState {
    /// Handles shown in this window, and whether a rect reached them in the
    /// current scan.
    pub(crate) seen: HashMap<HandleId, bool>,
    pub(crate) bounds: HashMap<HandleId, Bounds>,
    /// Handles already resized to zero; they are not resized again until
    /// they get a rect.
    pub(crate) hidden: HashSet<HandleId>,
    pub(crate) config: NativeConfig,
    pub(crate) view_event: Option<ViewEvent>,
}

impl PluginState {
    pub(crate) fn new(window: WindowId, config: NativeConfig) -> Self {
        Self {
            window,
            synthetic: Arc::new(SyntheticQueue::new()),
            state: Mutex::new(WindowState {
                seen: HashMap::new(),
                bounds: HashMap::new(),
                hidden: HashSet::new(),
                config,
                view_event: None,
            }),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, WindowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop every trace of `id` from this window.
    pub(crate) fn forget(&self, id: HandleId) {
        let mut state = self.lock();
        state.seen.remove(&id);
        state.bounds.remove(&id);
        state.hidden.remove(&id);
    }

    #[cfg(test)]
    pub(crate) fn for_test(window: WindowId) -> Self {
        Self::new(
            window,
            NativeConfig::detached(&inlay_config::WebViewSettings::default()),
        )
    }
}
