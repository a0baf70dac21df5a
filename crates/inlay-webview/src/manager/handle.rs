use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use inlay_common::{HandleId, Tag, WebViewError, WindowId};
use tokio::runtime::Handle as RuntimeHandle;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bridge::{self, Reporter};
use crate::events::{OperationKind, WebViewEvent};
use crate::native::NativeWebView;

use super::worker;

pub(crate) type JobFn =
    Box<dyn FnOnce(&dyn NativeWebView) -> Result<Option<WebViewEvent>, WebViewError> + Send>;

/// Deferred work for one webview, run off the frame thread.
pub(crate) struct Job {
    pub(crate) operation: OperationKind,
    /// Where the result (or the failure) is delivered.
    pub(crate) reply_to: Tag,
    pub(crate) run: JobFn,
}

/// State shared between a handle and its worker.
pub(crate) struct Core {
    pub(crate) id: HandleId,
    pub(crate) native: Arc<dyn NativeWebView>,
    /// Held while a job runs and while the native close happens.
    gate: Mutex<()>,
    closing: AtomicBool,
    closed: AtomicBool,
}

impl Core {
    pub(crate) fn lock_gate(&self) -> MutexGuard<'_, ()> {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn is_closing(&self) -> bool {
        self.closing.load(Ordering::SeqCst)
    }

    /// Close the native webview. Callers hold the gate.
    pub(crate) fn finish_close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.native.close();
            info!(handle = %self.id, "webview closed");
        }
    }
}

/// A live native webview owned by the plugin.
pub(crate) struct Handle {
    pub(crate) id: HandleId,
    /// Tag navigation and title events are delivered on.
    pub(crate) tag: Tag,
    pub(crate) native: Arc<dyn NativeWebView>,
    /// The window whose visible set holds this handle.
    owner: AtomicU64,
    reporter: Reporter,
    jobs: mpsc::Sender<Job>,
    cancel: CancellationToken,
    core: Arc<Core>,
}

impl Handle {
    /// Wrap `native` and start its worker and event bridge on `runtime`.
    pub(crate) fn start(
        id: HandleId,
        tag: Tag,
        native: Arc<dyn NativeWebView>,
        owner: WindowId,
        reporter: Reporter,
        runtime: &RuntimeHandle,
        queue_capacity: usize,
    ) -> Arc<Self> {
        let (jobs, rx) = mpsc::channel(queue_capacity.max(1));
        let cancel = CancellationToken::new();
        let core = Arc::new(Core {
            id,
            native: Arc::clone(&native),
            gate: Mutex::new(()),
            closing: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        });

        worker::spawn(
            runtime,
            Arc::clone(&core),
            rx,
            reporter.clone(),
            cancel.clone(),
        );
        match native.take_events() {
            Some(events) => {
                bridge::spawn_bridge(runtime, id, tag, events, reporter.clone(), cancel.clone());
            }
            None => debug!(handle = %id, "backend exposes no event stream"),
        }

        Arc::new(Self {
            id,
            tag,
            native,
            owner: AtomicU64::new(owner.0),
            reporter,
            jobs,
            cancel,
            core,
        })
    }

    pub(crate) fn owner(&self) -> WindowId {
        WindowId(self.owner.load(Ordering::SeqCst))
    }

    pub(crate) fn is_owned_by(&self, window: WindowId) -> bool {
        self.owner() == window
    }

    /// Make `window` the owner and route events through `reporter`.
    /// Returns the previous owner if ownership moved.
    pub(crate) fn claim(&self, window: WindowId, reporter: &Reporter) -> Option<WindowId> {
        let previous = WindowId(self.owner.swap(window.0, Ordering::SeqCst));
        if previous == window {
            return None;
        }
        self.reporter.retarget(reporter);
        Some(previous)
    }

    /// A reporter that follows this handle's owner.
    pub(crate) fn reporter(&self) -> Reporter {
        self.reporter.clone()
    }

    /// Queue `run` behind every job already submitted for this handle.
    pub(crate) fn submit<F>(&self, operation: OperationKind, reply_to: Tag, run: F)
    where
        F: FnOnce(&dyn NativeWebView) -> Result<Option<WebViewEvent>, WebViewError>
            + Send
            + 'static,
    {
        if self.core.is_closing() {
            self.reject(operation, reply_to, WebViewError::Closed(self.id));
            return;
        }
        let job = Job {
            operation,
            reply_to,
            run: Box::new(run),
        };
        match self.jobs.try_send(job) {
            Ok(()) => debug!(handle = %self.id, %operation, "job queued"),
            Err(TrySendError::Full(job)) => {
                self.reject(job.operation, job.reply_to, WebViewError::QueueFull(self.id));
            }
            Err(TrySendError::Closed(job)) => {
                self.reject(job.operation, job.reply_to, WebViewError::Closed(self.id));
            }
        }
    }

    fn reject(&self, operation: OperationKind, reply_to: Tag, error: WebViewError) {
        warn!(handle = %self.id, %operation, %error, "dropping job");
        self.reporter
            .deliver(reply_to, WebViewEvent::Error { operation, error });
    }

    /// Stop the worker and bridge, then close the native webview.
    ///
    /// Queued jobs never run. If a job is running, the native close happens
    /// on the worker right after it returns, so this never blocks on the
    /// webview. Repeated calls are no-ops.
    pub(crate) fn close(&self) {
        if self.core.closing.swap(true, Ordering::SeqCst) {
            return;
        }
        self.cancel.cancel();
        match self.core.gate.try_lock() {
            Ok(_gate) => self.core.finish_close(),
            Err(TryLockError::Poisoned(gate)) => {
                let _gate = gate.into_inner();
                self.core.finish_close();
            }
            Err(TryLockError::WouldBlock) => {
                debug!(handle = %self.id, "close deferred until the running job returns");
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn is_closing(&self) -> bool {
        self.core.is_closing()
    }
}
