//! Worker configuration.

use std::time::Duration;

use fanout_engine::queue::QueueConfig;
use fanout_engine::retry::RetryPolicy;

/// Worker runtime configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// How often accumulated progress deltas are reported upstream.
    pub report_interval: Duration,

    /// Endpoint variants, rotated on not-found responses.
    pub endpoints: Vec<String>,

    /// Local queue tuning.
    pub queue: QueueConfig,

    /// Retry tuning applied to every action.
    pub retry: RetryPolicy,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            report_interval: Duration::from_secs(2),
            endpoints: vec!["/vapi".to_string(), "/vapi/".to_string(), "vapi".to_string()],
            queue: QueueConfig::default(),
            retry: RetryPolicy::default(),
        }
    }
}
