/// Configuration for the upload coordinator and its sessions
#[derive(Debug, Clone)]
pub struct UploaderConfig {
    /// Capacity of each session's status-update channel
    pub status_channel_capacity: usize,

    /// Capacity of the coordinator's outward event channel
    pub event_channel_capacity: usize,

    /// Maximum in-flight uploads per product
    pub max_concurrent_uploads: usize,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            status_channel_capacity: 64,
            event_channel_capacity: 256,
            max_concurrent_uploads: 4,
        }
    }
}

impl UploaderConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-session status channel capacity
    pub fn with_status_channel_capacity(mut self, capacity: usize) -> Self {
        self.status_channel_capacity = capacity.max(1);
        self
    }

    /// Set the outward event channel capacity
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    /// Set the per-product upload concurrency limit
    pub fn with_max_concurrent_uploads(mut self, max: usize) -> Self {
        self.max_concurrent_uploads = max.max(1);
        self
    }
}
