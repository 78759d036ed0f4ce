//! Dispatcher component configuration

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Batch elements processed at the same time. 0 = no limit.
    pub batch_concurrency: usize,
    /// Refuse methods starting with `rpc.` even when a handler is registered.
    pub reject_reserved_methods: bool,
}

impl DispatcherConfig {
    /// Prefix JSON-RPC 2.0 reserves for internal methods.
    pub const RESERVED_PREFIX: &'static str = "rpc.";

    pub fn is_reserved(&self, method: &str) -> bool {
        self.reject_reserved_methods && method.starts_with(Self::RESERVED_PREFIX)
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            batch_concurrency: 64,
            reject_reserved_methods: false,
        }
    }
}
