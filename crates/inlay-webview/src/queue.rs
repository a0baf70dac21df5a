//! Event queue proxying.
//!
//! Each window owns a [`SyntheticQueue`] that event bridges and workers
//! write into from any thread. During a frame the host's queue is wrapped in
//! a [`ProxyQueue`], which answers a lookup with the pending synthetic events
//! for that tag followed by the host's own.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use inlay_common::Tag;

use crate::events::WebViewEvent;
use crate::host::EventQueue;

/// Pending synthetic events, keyed by tag.
#[derive(Debug, Default)]
pub struct SyntheticQueue {
    events: Mutex<HashMap<Tag, VecDeque<WebViewEvent>>>,
}

impl SyntheticQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, tag: Tag, event: WebViewEvent) {
        self.lock().entry(tag).or_default().push_back(event);
    }

    /// Remove and return every pending event for `tag`, oldest first.
    pub fn drain(&self, tag: Tag) -> Vec<WebViewEvent> {
        self.lock()
            .remove(&tag)
            .map(Vec::from)
            .unwrap_or_default()
    }

    pub fn pending(&self, tag: Tag) -> usize {
        self.lock().get(&tag).map_or(0, VecDeque::len)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Tag, VecDeque<WebViewEvent>>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// An event seen through a [`ProxyQueue`].
#[derive(Debug, Clone, PartialEq)]
pub enum QueuedEvent<E> {
    WebView(WebViewEvent),
    Native(E),
}

impl<E> QueuedEvent<E> {
    pub fn as_webview(&self) -> Option<&WebViewEvent> {
        match self {
            Self::WebView(event) => Some(event),
            Self::Native(_) => None,
        }
    }

    pub fn into_webview(self) -> Option<WebViewEvent> {
        match self {
            Self::WebView(event) => Some(event),
            Self::Native(_) => None,
        }
    }
}

/// The host queue, with synthetic events merged in ahead of native ones.
#[derive(Debug)]
pub struct ProxyQueue<Q> {
    inner: Q,
    synthetic: Arc<SyntheticQueue>,
}

impl<Q: EventQueue> ProxyQueue<Q> {
    pub fn new(inner: Q, synthetic: Arc<SyntheticQueue>) -> Self {
        Self { inner, synthetic }
    }

    /// Events for `tag`. A `&WebViewOp` resolves to the tag its webview
    /// reports navigation and title changes on.
    pub fn events(&mut self, tag: impl Into<Tag>) -> Vec<QueuedEvent<Q::Event>> {
        self.lookup(tag.into())
    }

    pub fn inner(&self) -> &Q {
        &self.inner
    }

    pub fn into_inner(self) -> Q {
        self.inner
    }

    fn lookup(&mut self, tag: Tag) -> Vec<QueuedEvent<Q::Event>> {
        let mut merged: Vec<_> = self
            .synthetic
            .drain(tag)
            .into_iter()
            .map(QueuedEvent::WebView)
            .collect();
        merged.extend(self.inner.events(tag).into_iter().map(QueuedEvent::Native));
        merged
    }
}

impl<Q: EventQueue> EventQueue for ProxyQueue<Q> {
    type Event = QueuedEvent<Q::Event>;

    fn events(&mut self, tag: Tag) -> Vec<Self::Event> {
        self.lookup(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::TitleEvent;

    #[derive(Default)]
    struct FixedQueue {
        events: HashMap<Tag, Vec<&'static str>>,
    }

    impl EventQueue for FixedQueue {
        type Event = &'static str;

        fn events(&mut self, tag: Tag) -> Vec<&'static str> {
            self.events.remove(&tag).unwrap_or_default()
        }
    }

    fn title(text: &str) -> WebViewEvent {
        WebViewEvent::Title(TitleEvent { title: text.into() })
    }

    #[test]
    fn synthetic_events_come_first() {
        let tag = Tag::new();
        let synthetic = Arc::new(SyntheticQueue::new());
        synthetic.add(tag, title("a"));
        synthetic.add(tag, title("b"));

        let mut host = FixedQueue::default();
        host.events.insert(tag, vec!["click"]);

        let mut proxy = ProxyQueue::new(host, Arc::clone(&synthetic));
        let events = proxy.events(tag);
        assert_eq!(
            events,
            vec![
                QueuedEvent::WebView(title("a")),
                QueuedEvent::WebView(title("b")),
                QueuedEvent::Native("click"),
            ]
        );
        assert_eq!(synthetic.pending(tag), 0);
        assert!(proxy.events(tag).is_empty());
    }

    #[test]
    fn native_events_pass_through_without_synthetic() {
        let tag = Tag::new();
        let mut host = FixedQueue::default();
        host.events.insert(tag, vec!["key"]);
        let mut proxy = ProxyQueue::new(host, Arc::new(SyntheticQueue::new()));
        assert_eq!(proxy.events(tag), vec![QueuedEvent::Native("key")]);
    }

    #[test]
    fn tags_are_isolated() {
        let (a, b) = (Tag::new(), Tag::new());
        let synthetic = SyntheticQueue::new();
        synthetic.add(a, title("for a"));
        assert!(synthetic.drain(b).is_empty());
        assert_eq!(synthetic.drain(a), vec![title("for a")]);
    }
}
