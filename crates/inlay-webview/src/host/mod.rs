//! Compatibility shim for the host GUI framework.
//!
//! The plugin only needs a narrow slice of the host: a window it can wake
//! and post work to, a per-frame event queue keyed by [`Tag`], and the frame
//! event that carries the render callback. Hosts adapt their own types to
//! these.

mod ops;

pub use ops::{ClipStack, CommandBuffer, OpRef, HOST_LAYOUT_VERSION};

use inlay_common::{Insets, Metric, Point, Tag, WindowId};
use raw_window_handle::{HandleError, HasWindowHandle, RawWindowHandle, WindowHandle};

/// Work posted to the host's UI thread.
pub type MainTask = Box<dyn FnOnce() + Send>;

/// Submits a frame's command buffer to the host renderer.
pub type RenderFn = Box<dyn FnOnce(&mut CommandBuffer) + Send>;

/// A host window.
pub trait Window: Send + Sync + 'static {
    fn id(&self) -> WindowId;

    /// Request a new frame.
    fn invalidate(&self);

    /// Run `task` on the thread that owns the window's native view.
    /// Hosts with a single-threaded event loop can run it inline.
    ///
    /// Hosts that post instead must also override
    /// [`is_main_thread`](Self::is_main_thread): the plugin blocks on posted
    /// work, so it must never post from the owning thread itself.
    fn run_on_main(&self, task: MainTask) {
        task()
    }

    /// Whether the caller is on the thread [`run_on_main`](Self::run_on_main)
    /// targets. Work is run inline when it is.
    fn is_main_thread(&self) -> bool {
        true
    }
}

/// Host-side event lookup for one frame.
pub trait EventQueue {
    type Event;

    fn events(&mut self, tag: Tag) -> Vec<Self::Event>;
}

/// Native view the host attached to a window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewHandle {
    raw: RawWindowHandle,
}

impl ViewHandle {
    /// # Safety
    ///
    /// `raw` must stay valid until the host sends a view event replacing it
    /// or destroys the window.
    pub unsafe fn new(raw: RawWindowHandle) -> Self {
        Self { raw }
    }

    pub fn raw(&self) -> RawWindowHandle {
        self.raw
    }
}

// SAFETY: the handle is an opaque platform identifier. It is only
// dereferenced by native backends, on the window's main thread.
unsafe impl Send for ViewHandle {}
// SAFETY: see above; the value itself is never mutated.
unsafe impl Sync for ViewHandle {}

impl HasWindowHandle for ViewHandle {
    fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
        // SAFETY: validity is guaranteed by the contract of `ViewHandle::new`.
        Ok(unsafe { WindowHandle::borrow_raw(self.raw) })
    }
}

/// The host attached (or detached, `view: None`) a native view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewEvent {
    pub view: Option<ViewHandle>,
}

/// A frame request from the host.
pub struct FrameEvent<Q> {
    pub metric: Metric,
    /// Safe-area insets, in dp.
    pub insets: Insets,
    /// Window size in pixels.
    pub size: Point,
    pub queue: Q,
    pub(crate) render: Option<RenderFn>,
}

impl<Q> FrameEvent<Q> {
    pub fn new(
        metric: Metric,
        insets: Insets,
        size: Point,
        queue: Q,
        render: impl FnOnce(&mut CommandBuffer) + Send + 'static,
    ) -> Self {
        Self {
            metric,
            insets,
            size,
            queue,
            render: Some(Box::new(render)),
        }
    }

    /// Submit the recorded operations. Only the first call has an effect.
    pub fn frame(&mut self, ops: &mut CommandBuffer) {
        if let Some(render) = self.render.take() {
            render(ops);
        }
    }
}

impl<Q: std::fmt::Debug> std::fmt::Debug for FrameEvent<Q> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameEvent")
            .field("metric", &self.metric)
            .field("insets", &self.insets)
            .field("size", &self.size)
            .field("queue", &self.queue)
            .field("submitted", &self.render.is_none())
            .finish()
    }
}

/// Events a host window delivers. `E` carries everything the plugin does
/// not care about.
#[derive(Debug)]
pub enum WindowEvent<Q, E = ()> {
    View(ViewEvent),
    Frame(FrameEvent<Q>),
    Destroy,
    Other(E),
}
