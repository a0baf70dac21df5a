//! Background runtime configuration.

use serde::{Deserialize, Serialize};

/// Sizing of the async runtime that runs event bridges and per-webview
/// workers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Tokio worker threads (valid range: 1-16).
    pub worker_threads: u32,
    /// Pending cookie/storage/script jobs per webview before new ones are
    /// rejected (valid range: 1-4096).
    pub job_queue_capacity: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: 1,
            job_queue_capacity: 64,
        }
    }
}
