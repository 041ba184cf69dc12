//! Scheduler configuration.

use std::time::Duration;

use selection::{default_windows, ContentWindow};
use upstream::RetryPolicy;

/// Tunables for timer building and delivery execution.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Content windows armed for each group each day.
    pub windows: Vec<ContentWindow>,
    /// Ceiling on one job's total execution, retries included. Jobs past it
    /// are abandoned and recorded as failed.
    pub job_timeout: Duration,
    /// Retry policy for transport sends.
    pub send_retry: RetryPolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            windows: default_windows(),
            job_timeout: Duration::from_secs(300),
            send_retry: RetryPolicy::default(),
        }
    }
}

impl SchedulerConfig {
    /// Replace the content windows.
    pub fn with_windows(mut self, windows: Vec<ContentWindow>) -> Self {
        self.windows = windows;
        self
    }

    /// Set the per-job execution ceiling.
    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = timeout;
        self
    }

    /// Set the transport send retry policy.
    pub fn with_send_retry(mut self, policy: RetryPolicy) -> Self {
        self.send_retry = policy;
        self
    }
}
