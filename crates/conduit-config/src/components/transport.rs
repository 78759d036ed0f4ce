//! Transport component configuration

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Largest newline-delimited frame accepted or produced, in bytes.
    pub max_frame_bytes: usize,
    /// Buffered payloads per direction for in-memory channels.
    pub channel_capacity: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_frame_bytes: 16 * 1024 * 1024,
            channel_capacity: 256,
        }
    }
}
