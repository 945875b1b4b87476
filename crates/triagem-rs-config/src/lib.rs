//! Configuration models and layered config loading.
//!
//! This crate owns the Triagem config schema, validation, and the
//! layer-merging logic used by the CLI and the core store.

mod error;
mod loader;
mod model;

/// Public error type returned by config loading and validation APIs.
pub use error::ConfigError;
/// Layered config types and loader options.
pub use loader::{ConfigLayer, ConfigLayerSource, ENV_API_URL, LayeredConfig, LayeredConfigOptions};
/// Configuration schema models.
pub use model::*;
