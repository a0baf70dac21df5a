use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use inlay_common::{HandleId, WindowId};

use super::handle::Handle;
use super::types::PluginState;

/// Live webview handles, keyed by identity. Global to one plugin.
#[derive(Default)]
pub(crate) struct HandleRegistry {
    handles: RwLock<HashMap<HandleId, Arc<Handle>>>,
}

impl HandleRegistry {
    pub(crate) fn get(&self, id: HandleId) -> Option<Arc<Handle>> {
        self.read().get(&id).cloned()
    }

    pub(crate) fn insert(&self, handle: Arc<Handle>) {
        self.write().insert(handle.id, handle);
    }

    pub(crate) fn remove(&self, id: HandleId) -> Option<Arc<Handle>> {
        self.write().remove(&id)
    }

    /// Remove `id` only if `window` owns it.
    pub(crate) fn remove_owned(&self, id: HandleId, window: WindowId) -> Option<Arc<Handle>> {
        let mut handles = self.write();
        if !handles.get(&id)?.is_owned_by(window) {
            return None;
        }
        handles.remove(&id)
    }

    /// Remove every handle. Used during shutdown.
    pub(crate) fn drain(&self) -> Vec<Arc<Handle>> {
        self.write().drain().map(|(_, handle)| handle).collect()
    }

    pub(crate) fn contains(&self, id: HandleId) -> bool {
        self.read().contains_key(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.read().len()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<HandleId, Arc<Handle>>> {
        self.handles.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<HandleId, Arc<Handle>>> {
        self.handles.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Per-window plugin state, created on the first event seen for a window.
#[derive(Default)]
pub(crate) struct WindowRegistry {
    windows: RwLock<HashMap<WindowId, Arc<PluginState>>>,
}

impl WindowRegistry {
    pub(crate) fn get(&self, id: WindowId) -> Option<Arc<PluginState>> {
        self.windows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    pub(crate) fn get_or_insert_with(
        &self,
        id: WindowId,
        create: impl FnOnce() -> PluginState,
    ) -> Arc<PluginState> {
        if let Some(state) = self.get(id) {
            return state;
        }
        let mut windows = self.windows.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(windows.entry(id).or_insert_with(|| Arc::new(create())))
    }

    pub(crate) fn remove(&self, id: WindowId) -> Option<Arc<PluginState>> {
        self.windows
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
    }

    /// Snapshot of every window's state. The registry lock is released
    /// before the caller touches any of them.
    pub(crate) fn all(&self) -> Vec<Arc<PluginState>> {
        self.windows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.windows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Identities whose last `WebViewOp` clone has dropped.
#[derive(Debug, Default)]
pub(crate) struct ReleaseQueue {
    ids: Mutex<Vec<HandleId>>,
}

impl ReleaseQueue {
    pub(crate) fn push(&self, id: HandleId) {
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(id);
    }

    pub(crate) fn drain(&self) -> Vec<HandleId> {
        std::mem::take(&mut *self.ids.lock().unwrap_or_else(PoisonError::into_inner))
    }
}
