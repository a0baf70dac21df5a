use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use inlay_common::{InlayError, Insets, Metric, Point, Tag, WindowId};
use inlay_config::InlayConfig;
use inlay_webview::{
    CommandBuffer, EventQueue, FrameEvent, ProxyQueue, QueuedEvent, ViewEvent, ViewHandle,
    WebViewEvent, WebViewPlugin, Window, WindowEvent,
};
use raw_window_handle::{RawWindowHandle, WebWindowHandle};

/// Window that counts redraw requests and runs main-thread work inline.
#[derive(Debug)]
pub struct TestWindow {
    id: WindowId,
    invalidations: AtomicUsize,
}

impl TestWindow {
    pub fn new(id: u64) -> Self {
        Self {
            id: WindowId(id),
            invalidations: AtomicUsize::new(0),
        }
    }

    pub fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }
}

impl Window for TestWindow {
    fn id(&self) -> WindowId {
        self.id
    }

    fn invalidate(&self) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
    }
}

/// Host input events, as a real framework would queue them.
#[derive(Debug, Clone, PartialEq)]
pub enum HostInput {
    Pointer { x: f32, y: f32 },
    Key(String),
}

/// Host event queue preloaded with input for the coming frame.
#[derive(Debug, Default)]
pub struct ScriptedQueue {
    pending: HashMap<Tag, Vec<HostInput>>,
}

impl ScriptedQueue {
    pub fn new(pending: HashMap<Tag, Vec<HostInput>>) -> Self {
        Self { pending }
    }
}

impl EventQueue for ScriptedQueue {
    type Event = HostInput;

    fn events(&mut self, tag: Tag) -> Vec<HostInput> {
        self.pending.remove(&tag).unwrap_or_default()
    }
}

/// A single-window host driving a [`WebViewPlugin`] over a mock backend.
pub struct TestHost {
    pub plugin: WebViewPlugin,
    pub window: Arc<TestWindow>,
    pub backend: crate::MockBackend,
    pub metric: Metric,
    pub insets: Insets,
    pub size: Point,
    ops: CommandBuffer,
    pending: HashMap<Tag, Vec<HostInput>>,
}

impl TestHost {
    pub fn new() -> Result<Self, InlayError> {
        Self::with_config(&InlayConfig::default())
    }

    pub fn with_config(config: &InlayConfig) -> Result<Self, InlayError> {
        let backend = crate::MockBackend::new();
        let plugin = WebViewPlugin::new(backend.clone(), config)?;
        Ok(Self {
            plugin,
            window: Arc::new(TestWindow::new(1)),
            backend,
            metric: Metric::default(),
            insets: Insets::default(),
            size: Point::new(800.0, 600.0),
            ops: CommandBuffer::new(),
            pending: HashMap::new(),
        })
    }

    /// Queue `input` for delivery on `tag` in the next frame.
    pub fn queue_input(&mut self, tag: Tag, input: HostInput) {
        self.pending.entry(tag).or_default().push(input);
    }

    /// Run one frame: record with `record`, submit, and return the frame's
    /// queue for event lookups.
    pub fn frame(&mut self, record: impl FnOnce(&mut CommandBuffer)) -> ProxyQueue<ScriptedQueue> {
        let window = Arc::clone(&self.window);
        self.frame_in(&window, record)
    }

    /// Like [`frame`](Self::frame), for another window sharing the plugin.
    pub fn frame_in(
        &mut self,
        window: &Arc<TestWindow>,
        record: impl FnOnce(&mut CommandBuffer),
    ) -> ProxyQueue<ScriptedQueue> {
        let queue = ScriptedQueue::new(std::mem::take(&mut self.pending));
        let event: WindowEvent<ScriptedQueue> = WindowEvent::Frame(FrameEvent::new(
            self.metric,
            self.insets,
            self.size,
            queue,
            |_: &mut CommandBuffer| {},
        ));

        match self.plugin.process(window, event) {
            WindowEvent::Frame(mut frame) => {
                self.ops.reset();
                record(&mut self.ops);
                frame.frame(&mut self.ops);
                frame.queue
            }
            // A frame in is a frame out.
            _ => unreachable!("plugin turned a frame into another event"),
        }
    }

    /// Attach a stand-in native view to the window.
    pub fn attach_view(&mut self) {
        let raw = RawWindowHandle::Web(WebWindowHandle::new(1));
        // SAFETY: web handles are plain ids and the mock never dereferences them.
        let view = unsafe { ViewHandle::new(raw) };
        let event: WindowEvent<ScriptedQueue> = WindowEvent::View(ViewEvent { view: Some(view) });
        self.plugin.process(&self.window, event);
    }

    pub fn destroy(&mut self) {
        let window = Arc::clone(&self.window);
        self.destroy_window(&window);
    }

    pub fn destroy_window(&mut self, window: &Arc<TestWindow>) {
        let event: WindowEvent<ScriptedQueue> = WindowEvent::Destroy;
        self.plugin.process(window, event);
    }

    /// Run empty frames until `tag` has webview events, or `timeout` passes.
    pub fn wait_for(&mut self, tag: impl Into<Tag>, timeout: Duration) -> Vec<WebViewEvent> {
        let tag = tag.into();
        let deadline = Instant::now() + timeout;
        loop {
            let mut queue = self.frame(|_| {});
            let events = webview_events(&mut queue, tag);
            if !events.is_empty() || Instant::now() >= deadline {
                return events;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    /// Poll `condition` until it holds or `timeout` passes.
    pub fn wait_until(&self, timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    pub fn shutdown(self) {
        self.plugin.shutdown();
    }
}

/// The webview events among a frame's events for `tag`.
pub fn webview_events<Q: EventQueue>(
    queue: &mut ProxyQueue<Q>,
    tag: impl Into<Tag>,
) -> Vec<WebViewEvent> {
    queue
        .events(tag)
        .into_iter()
        .filter_map(QueuedEvent::into_webview)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use inlay_webview::{RectOp, WebViewOp};

    #[test]
    fn scripted_input_follows_webview_events() {
        let mut host = TestHost::new().unwrap();
        let tag = Tag::new();
        host.queue_input(tag, HostInput::Key("a".into()));
        host.queue_input(tag, HostInput::Pointer { x: 1.0, y: 2.0 });

        let mut queue = host.frame(|_| {});
        assert_eq!(
            queue.events(tag),
            vec![
                QueuedEvent::Native(HostInput::Key("a".into())),
                QueuedEvent::Native(HostInput::Pointer { x: 1.0, y: 2.0 }),
            ]
        );
        assert!(host.frame(|_| {}).events(tag).is_empty());
    }

    #[test]
    fn frames_reach_the_mock_backend() {
        let mut host = TestHost::new().unwrap();
        let webview = WebViewOp::new();
        host.frame(|ops| {
            let stack = webview.push(ops);
            RectOp::new((320, 240)).add(ops);
            stack.pop(ops);
        });
        assert_eq!(host.backend.created(), 1);
        let view = host.backend.view(0).unwrap();
        assert_eq!(
            view.last_resize(),
            Some((Point::new(320.0, 240.0), Point::ZERO))
        );
    }
}
