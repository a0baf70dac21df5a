use crate::schema::InlayConfig;

use super::helpers::validate_range;

/// Validate runtime sizing.
pub(crate) fn validate_runtime(errors: &mut Vec<String>, config: &InlayConfig) {
    validate_range(
        errors,
        "runtime.worker_threads",
        config.runtime.worker_threads,
        1,
        16,
    );
    validate_range(
        errors,
        "runtime.job_queue_capacity",
        config.runtime.job_queue_capacity,
        1,
        4096,
    );
}
