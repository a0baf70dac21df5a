use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use inlay_common::{HandleId, Tag};

use crate::manager::ReleaseQueue;

/// Identity of one webview across frames.
///
/// Create it once and keep it alive for as long as the webview should
/// exist. Clones share the identity. When the last clone drops, the plugin
/// closes the webview at its next entry point.
#[derive(Clone)]
pub struct WebViewOp {
    token: Arc<IdentityToken>,
}

struct IdentityToken {
    id: HandleId,
    tag: Tag,
    release: OnceLock<Weak<ReleaseQueue>>,
}

impl WebViewOp {
    pub fn new() -> Self {
        Self {
            token: Arc::new(IdentityToken {
                id: HandleId::next(),
                tag: Tag::new(),
                release: OnceLock::new(),
            }),
        }
    }

    pub fn id(&self) -> HandleId {
        self.token.id
    }

    /// Tag that navigation and title events for this webview arrive on.
    pub fn tag(&self) -> Tag {
        self.token.tag
    }

    /// Route the eventual drop of this identity to `queue`. Only the first
    /// plugin to create a webview for the identity is notified.
    pub(crate) fn bind_release(&self, queue: &Arc<ReleaseQueue>) {
        let _ = self.token.release.set(Arc::downgrade(queue));
    }
}

impl Default for WebViewOp {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for WebViewOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebViewOp")
            .field("id", &self.token.id)
            .field("tag", &self.token.tag)
            .finish()
    }
}

impl Drop for IdentityToken {
    fn drop(&mut self) {
        if let Some(queue) = self.release.get().and_then(Weak::upgrade) {
            queue.push(self.id);
        }
    }
}
