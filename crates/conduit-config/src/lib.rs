//! # Conduit Configuration
//!
//! Typed settings for the three moving parts of conduit: the dispatcher,
//! the client's call tracker and the transports. Every section has a
//! `Default`, so a config file only needs the keys it wants to change.
//!
//! ```rust,no_run
//! use conduit_config::ConduitConfig;
//!
//! let config = ConduitConfig::load(None)?;
//! println!("batch concurrency: {}", config.dispatcher.batch_concurrency);
//! # Ok::<(), conduit_config::ConfigError>(())
//! ```

mod components;
mod loader;

pub use components::{ClientConfig, DispatcherConfig, IdStrategy, TransportConfig};
pub use loader::{ConduitConfig, ConfigError};
