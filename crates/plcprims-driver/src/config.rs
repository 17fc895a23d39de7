use std::time::Duration;

use plcprims_field::TransactionId;
use plcprims_frame::FrameConfig;

/// Configuration for a [`Driver`](crate::Driver) session.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Deadline applied by `submit`. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
    /// Upper bound on outstanding commands. Submitters wait for a slot.
    pub max_in_flight: Option<usize>,
    /// Largest transaction id before the counter wraps to 1.
    pub id_ceiling: TransactionId,
    /// Frame codec settings for both directions.
    pub frame: FrameConfig,
}

impl DriverConfig {
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_max_in_flight(mut self, limit: usize) -> Self {
        self.max_in_flight = Some(limit.max(1));
        self
    }

    pub fn with_id_ceiling(mut self, ceiling: TransactionId) -> Self {
        self.id_ceiling = ceiling;
        self
    }

    pub fn with_frame(mut self, frame: FrameConfig) -> Self {
        self.frame = frame;
        self
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            request_timeout: Some(Duration::from_secs(5)),
            max_in_flight: None,
            id_ceiling: TransactionId::MAX,
            frame: FrameConfig::default(),
        }
    }
}
