//! Synthetic streaming-activity dataset generator - shared modules for all binaries.

pub mod catalog;
pub mod config;
pub mod error;
pub mod models;
pub mod progress;
pub mod remote;
pub mod rng;
pub mod safety;
pub mod simulate;
pub mod sink;

pub use error::{Error, Result};

/// Install the fmt subscriber used by every binary. `RUST_LOG` overrides
/// the default `info` level.
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
