//! Per-handle job worker.

use std::sync::Arc;

use tokio::runtime::Handle as RuntimeHandle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::bridge::Reporter;
use crate::events::WebViewEvent;

use super::handle::{Core, Job};

/// Run jobs from `jobs` one at a time, in order, on the blocking pool.
pub(crate) fn spawn(
    runtime: &RuntimeHandle,
    core: Arc<Core>,
    mut jobs: mpsc::Receiver<Job>,
    reporter: Reporter,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    runtime.spawn(async move {
        loop {
            let job = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                job = jobs.recv() => match job {
                    Some(job) => job,
                    None => break,
                },
            };

            let (job_core, job_reporter) = (Arc::clone(&core), reporter.clone());
            let task = tokio::task::spawn_blocking(move || run(&job_core, &job_reporter, job));
            if let Err(e) = task.await {
                error!(handle = %core.id, error = %e, "webview job panicked");
            }
        }

        jobs.close();
        let mut skipped = 0usize;
        while jobs.try_recv().is_ok() {
            skipped += 1;
        }
        if skipped > 0 {
            debug!(handle = %core.id, skipped, "discarded queued jobs");
        }

        if core.is_closing() {
            let core = Arc::clone(&core);
            let _ = tokio::task::spawn_blocking(move || {
                let _gate = core.lock_gate();
                core.finish_close();
            })
            .await;
        }
        debug!(handle = %core.id, "worker stopped");
    })
}

fn run(core: &Core, reporter: &Reporter, job: Job) {
    let _gate = core.lock_gate();
    if core.is_closing() {
        debug!(handle = %core.id, operation = %job.operation, "webview closing, job skipped");
        core.finish_close();
        return;
    }

    let Job {
        operation,
        reply_to,
        run: task,
    } = job;
    match task(core.native.as_ref()) {
        Ok(Some(event)) => reporter.deliver(reply_to, event),
        Ok(None) => {}
        Err(error) => {
            warn!(handle = %core.id, %operation, %error, "webview job failed");
            reporter.deliver(reply_to, WebViewEvent::Error { operation, error });
        }
    }

    if core.is_closing() {
        core.finish_close();
    }
}
