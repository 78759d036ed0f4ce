//! Per-component configuration sections

mod client;
mod dispatcher;
mod transport;

pub use client::{ClientConfig, IdStrategy};
pub use dispatcher::DispatcherConfig;
pub use transport::TransportConfig;
