//! Public surface for Triagem.
//!
//! This crate re-exports the building blocks and wires them into a
//! [`Screen`], the unit every front-end (CLI command, panel, queue monitor)
//! runs as.

mod screen;

/// Re-export for convenience.
pub use triagem_rs_config as config;
pub use triagem_rs_core as core;
/// Re-export for convenience.
pub use triagem_rs_gateway as gateway;
/// Re-export for convenience.
pub use triagem_rs_protocol as protocol;
pub use triagem_rs_storage as storage;

pub use screen::Screen;

/// Initialize logging with env_logger, honoring `RUST_LOG`.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    let _ = env_logger::builder()
        .format_timestamp_millis()
        .parse_default_env()
        .try_init();
}
