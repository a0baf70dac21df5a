//! The webview plugin: frame interception and handle management.
//!
//! A [`WebViewPlugin`] sits between the host window and the application.
//! Every window event passes through [`WebViewPlugin::process`], which keeps
//! per-window state current and, for frames, hands back an event whose queue
//! also yields webview events and whose render callback runs the scan pass.

mod handle;
pub(crate) mod lifecycle;
mod registry;
mod types;
mod worker;

pub(crate) use handle::Handle;
pub(crate) use registry::ReleaseQueue;
pub(crate) use types::{PluginState, WindowState};

use std::sync::Arc;
use std::time::Duration;

use inlay_common::{HandleId, InlayError, WindowId};
use inlay_config::{InlayConfig, WebViewSettings};
use tokio::runtime::{Handle as RuntimeHandle, Runtime};
use tracing::{debug, info, warn};

use crate::host::{
    CommandBuffer, EventQueue, FrameEvent, RenderFn, ViewEvent, Window, WindowEvent,
};
use crate::native::{NativeConfig, WebViewBackend};
use crate::ops::WebViewOp;
use crate::queue::ProxyQueue;
use crate::scanner::{self, FrameInfo};

use registry::{HandleRegistry, WindowRegistry};

/// State shared by the plugin, its frame callbacks and its workers.
pub(crate) struct Shared {
    pub(crate) backend: Box<dyn WebViewBackend>,
    pub(crate) settings: WebViewSettings,
    pub(crate) job_queue_capacity: usize,
    pub(crate) runtime: RuntimeHandle,
    pub(crate) handles: HandleRegistry,
    pub(crate) windows: WindowRegistry,
    pub(crate) released: Arc<ReleaseQueue>,
}

impl Shared {
    fn window_state<W: Window>(&self, window: &Arc<W>) -> Arc<PluginState> {
        self.windows.get_or_insert_with(window.id(), || {
            debug!(window = %window.id(), "tracking window");
            let config = NativeConfig::from_view_event(window, &ViewEvent::default(), &self.settings);
            PluginState::new(window.id(), config)
        })
    }
}

/// Embeds native webviews in a host's frame loop.
pub struct WebViewPlugin {
    shared: Arc<Shared>,
    runtime: Option<Runtime>,
}

impl WebViewPlugin {
    /// Create a plugin with its own background runtime, sized from
    /// `config.runtime`.
    pub fn new<B: WebViewBackend>(backend: B, config: &InlayConfig) -> Result<Self, InlayError> {
        inlay_config::validation::validate(config)?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(config.runtime.worker_threads as usize)
            .thread_name("inlay-webview")
            .enable_all()
            .build()?;
        let shared = Self::shared(backend, config, runtime.handle().clone());
        info!(
            worker_threads = config.runtime.worker_threads,
            job_queue_capacity = config.runtime.job_queue_capacity,
            "webview plugin started"
        );
        Ok(Self {
            shared,
            runtime: Some(runtime),
        })
    }

    /// Create a plugin that spawns its tasks on an existing runtime.
    pub fn with_runtime<B: WebViewBackend>(
        backend: B,
        config: &InlayConfig,
        runtime: RuntimeHandle,
    ) -> Self {
        Self {
            shared: Self::shared(backend, config, runtime),
            runtime: None,
        }
    }

    fn shared<B: WebViewBackend>(
        backend: B,
        config: &InlayConfig,
        runtime: RuntimeHandle,
    ) -> Arc<Shared> {
        Arc::new(Shared {
            backend: Box::new(backend),
            settings: config.webview.clone(),
            job_queue_capacity: config.runtime.job_queue_capacity as usize,
            runtime,
            handles: HandleRegistry::default(),
            windows: WindowRegistry::default(),
            released: Arc::new(ReleaseQueue::default()),
        })
    }

    /// Observe one window event. Call this first for every event the host
    /// delivers and use the returned event in its place.
    pub fn process<W, Q, E>(
        &self,
        window: &Arc<W>,
        event: WindowEvent<Q, E>,
    ) -> WindowEvent<ProxyQueue<Q>, E>
    where
        W: Window,
        Q: EventQueue,
    {
        self.collect_released();

        match event {
            WindowEvent::Destroy => {
                lifecycle::destroy_window(&self.shared, window.id());
                WindowEvent::Destroy
            }
            WindowEvent::View(view) => {
                let plugin = self.shared.window_state(window);
                self.attach_view(window, &plugin, &view);
                WindowEvent::View(view)
            }
            WindowEvent::Frame(frame) => {
                let plugin = self.shared.window_state(window);
                WindowEvent::Frame(self.intercept_frame(window, plugin, frame))
            }
            WindowEvent::Other(other) => {
                self.shared.window_state(window);
                WindowEvent::Other(other)
            }
        }
    }

    fn attach_view<W: Window>(&self, window: &Arc<W>, plugin: &PluginState, view: &ViewEvent) {
        let mut state = plugin.lock();
        if state.view_event.as_ref() == Some(view) {
            debug!(window = %plugin.window, "view unchanged");
            return;
        }
        let px_per_dp = state.config.px_per_dp;
        state.config = NativeConfig::from_view_event(window, view, &self.shared.settings);
        state.config.px_per_dp = px_per_dp;

        for id in state.seen.keys() {
            let Some(handle) = self.shared.handles.get(*id) else {
                continue;
            };
            if !handle.is_owned_by(plugin.window) {
                continue;
            }
            if let Err(error) = handle.native.configure(&state.config) {
                warn!(handle = %id, %error, "reconfigure after view change failed");
            }
        }
        state.view_event = Some(view.clone());
        info!(window = %plugin.window, attached = view.view.is_some(), "view changed");
    }

    fn intercept_frame<W: Window, Q: EventQueue>(
        &self,
        window: &Arc<W>,
        plugin: Arc<PluginState>,
        frame: FrameEvent<Q>,
    ) -> FrameEvent<ProxyQueue<Q>> {
        let FrameEvent {
            metric,
            insets,
            size,
            queue,
            render,
        } = frame;

        let queue = ProxyQueue::new(queue, Arc::clone(&plugin.synthetic));
        let shared = Arc::clone(&self.shared);
        let window: Arc<dyn Window> = window.clone();
        let info = FrameInfo { metric, insets };
        let render: RenderFn = Box::new(move |ops: &mut CommandBuffer| {
            if let Some(render) = render {
                render(ops);
            }
            scanner::scan(&shared, &plugin, &window, info, ops);
        });

        FrameEvent {
            metric,
            insets,
            size,
            queue,
            render: Some(render),
        }
    }

    /// Close the webview for `op` now. Returns whether one was live.
    pub fn release(&self, op: &WebViewOp) -> bool {
        lifecycle::release_handle(&self.shared, op.id())
    }

    /// Close webviews whose identity has been dropped. Runs automatically
    /// at the start of [`process`](Self::process).
    pub fn collect_released(&self) -> usize {
        let ids = self.shared.released.drain();
        let released = ids
            .into_iter()
            .filter(|id| lifecycle::release_handle(&self.shared, *id))
            .count();
        if released > 0 {
            debug!(released, "collected dropped webviews");
        }
        released
    }

    pub fn is_live(&self, op: &WebViewOp) -> bool {
        self.shared.handles.contains(op.id())
    }

    pub fn handle_count(&self) -> usize {
        self.shared.handles.len()
    }

    pub fn window_count(&self) -> usize {
        self.shared.windows.len()
    }

    /// Handles that received a rect in `window`'s last scan and have not
    /// been shown in another window since.
    pub fn visible(&self, window: WindowId) -> Vec<HandleId> {
        let Some(plugin) = self.shared.windows.get(window) else {
            return Vec::new();
        };
        let state = plugin.lock();
        let mut ids: Vec<HandleId> = state
            .seen
            .iter()
            .filter(|(_, seen)| **seen)
            .map(|(id, _)| *id)
            .filter(|id| {
                self.shared
                    .handles
                    .get(*id)
                    .is_some_and(|handle| handle.is_owned_by(window))
            })
            .collect();
        ids.sort();
        ids
    }

    /// Close every webview and stop the background runtime.
    ///
    /// Waits up to two seconds for running jobs, except when called from
    /// inside an async context, where blocking is not allowed and the
    /// runtime is left to wind down in the background.
    pub fn shutdown(mut self) {
        lifecycle::close_all(&self.shared);
        if let Some(runtime) = self.runtime.take() {
            if RuntimeHandle::try_current().is_ok() {
                runtime.shutdown_background();
            } else {
                runtime.shutdown_timeout(Duration::from_secs(2));
            }
        }
        info!("webview plugin stopped");
    }
}

impl Drop for WebViewPlugin {
    fn drop(&mut self) {
        lifecycle::close_all(&self.shared);
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
