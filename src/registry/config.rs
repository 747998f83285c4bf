//! Registry configuration

use serde::Deserialize;

/// Default capacity of a viewer's delivery queue
pub const DEFAULT_VIEWER_QUEUE_CAPACITY: usize = 100;

/// Default capacity of a stream's HLS forwarding queue
pub const DEFAULT_HLS_QUEUE_CAPACITY: usize = 1024;

/// Configuration for the stream registry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Slots per viewer queue; packets beyond this are dropped for that viewer
    pub viewer_queue_capacity: usize,

    /// Slots in the HLS forwarding queue; packets beyond this are dropped
    pub hls_queue_capacity: usize,

    /// How many times `add_client` retries on an id collision
    pub client_id_attempts: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            viewer_queue_capacity: DEFAULT_VIEWER_QUEUE_CAPACITY,
            hls_queue_capacity: DEFAULT_HLS_QUEUE_CAPACITY,
            client_id_attempts: 3,
        }
    }
}

impl RegistryConfig {
    /// Set the viewer queue capacity (minimum 1)
    pub fn viewer_queue_capacity(mut self, capacity: usize) -> Self {
        self.viewer_queue_capacity = capacity.max(1);
        self
    }

    /// Set the HLS queue capacity (minimum 1)
    pub fn hls_queue_capacity(mut self, capacity: usize) -> Self {
        self.hls_queue_capacity = capacity.max(1);
        self
    }

    /// Set the number of client id generation attempts (minimum 1)
    pub fn client_id_attempts(mut self, attempts: u32) -> Self {
        self.client_id_attempts = attempts.max(1);
        self
    }
}
