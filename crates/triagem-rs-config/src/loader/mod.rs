//! Layered configuration loader.
//!
//! Discovers configuration layers (user, cwd, runtime overrides), validates
//! their schema, merges them, applies environment overrides, and produces the
//! final `TriageConfig`.

mod layer_io;
mod merge;
mod schema;


use crate::{ConfigError, TriageConfig};
use log::{debug, info};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// File name looked up in the cwd and under the home directory.
const DEFAULT_CONFIG_FILE: &str = "triagem.json5";
/// Default config directory under the user home.
const DEFAULT_CONFIG_DIR: &str = ".triagem";
/// Environment variable overriding `gateway.base_url`.
pub const ENV_API_URL: &str = "TRIAGEM_API_URL";

/// Merged config and the layers that produced it.
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    /// Validated result of merging every layer.
    pub config: TriageConfig,
    /// Metadata for each layer applied during load.
    pub layers: Vec<ConfigLayer>,
}

/// Where a layer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayerSource {
    /// User-specific configuration.
    User,
    /// Current working directory configuration.
    Cwd,
    /// Runtime overrides passed on the command line.
    Runtime,
    /// Environment variable overrides (highest precedence).
    Env,
}

/// Metadata about a config layer.
#[derive(Debug, Clone)]
pub struct ConfigLayer {
    pub source: ConfigLayerSource,
    /// Location on disk if the layer came from a file.
    pub path: Option<PathBuf>,
}

/// Where layered loading looks for files and overrides.
#[derive(Debug, Clone)]
pub struct LayeredConfigOptions {
    /// Working directory used to find the cwd layer.
    pub cwd: PathBuf,
    /// Optional user config path (defaults to `~/.triagem/triagem.json5`).
    pub user_config_path: Option<PathBuf>,
    /// Runtime override config paths applied after file layers.
    pub runtime_paths: Vec<PathBuf>,
    /// Value of `TRIAGEM_API_URL`, captured at construction.
    pub env_api_url: Option<String>,
}

impl LayeredConfigOptions {
    /// Options for `cwd`, the home-directory user file and `TRIAGEM_API_URL`.
    pub fn new(cwd: impl AsRef<Path>) -> Self {
        Self {
            cwd: cwd.as_ref().to_path_buf(),
            user_config_path: layer_io::default_user_config_path(),
            runtime_paths: Vec::new(),
            env_api_url: std::env::var(ENV_API_URL)
                .ok()
                .filter(|value| !value.trim().is_empty()),
        }
    }

    /// Add a `--config` file; runtime files must exist.
    pub fn with_runtime_path(mut self, path: impl AsRef<Path>) -> Self {
        self.runtime_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Replace the environment-derived base URL override.
    pub fn with_env_api_url(mut self, url: Option<String>) -> Self {
        self.env_api_url = url;
        self
    }
}

impl TriageConfig {
    /// Read one JSON5 file without layering.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        info!("loading config from path: {}", path.as_ref().display());
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let value = layer_io::parse_json5(&contents, &path.display().to_string())?;
        config_from_value(value, "config")
    }

    /// Parse one JSON5 document without layering.
    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        debug!("loading config from raw contents (len={})", contents.len());
        let value = layer_io::parse_json5(contents, "inline")?;
        config_from_value(value, "config")
    }

    /// Load user, cwd and environment layers for `cwd`.
    pub fn load_layered(cwd: impl AsRef<Path>) -> Result<LayeredConfig, ConfigError> {
        info!(
            "loading layered config with defaults (cwd={})",
            cwd.as_ref().display()
        );
        Self::load_layered_with_options(LayeredConfigOptions::new(cwd))
    }

    /// Load a layered config stack using explicit layer locations.
    ///
    /// Layer precedence (low -> high): user, cwd, runtime, environment.
    pub fn load_layered_with_options(
        options: LayeredConfigOptions,
    ) -> Result<LayeredConfig, ConfigError> {
        let mut layers = Vec::new();
        let mut merged = Value::Object(serde_json::Map::new());
        let mut seen_paths = HashSet::new();

        let candidates = [
            (ConfigLayerSource::User, options.user_config_path.clone()),
            (
                ConfigLayerSource::Cwd,
                Some(options.cwd.join(DEFAULT_CONFIG_FILE)),
            ),
        ];
        for (source, path) in candidates {
            let Some(path) = path else {
                continue;
            };
            if !seen_paths.insert(unique_path(&path)) {
                debug!(
                    "skipping duplicate layer (source={:?}, path={})",
                    source,
                    path.display()
                );
                continue;
            }
            if let Some(layer) = layer_io::read_layer(source, &path, false)? {
                merge::merge_json_values(&mut merged, &layer.value);
                layers.push(layer.meta);
            }
        }

        for runtime_path in &options.runtime_paths {
            let Some(layer) =
                layer_io::read_layer(ConfigLayerSource::Runtime, runtime_path, true)?
            else {
                continue;
            };
            debug!("loaded runtime layer (path={})", runtime_path.display());
            merge::merge_json_values(&mut merged, &layer.value);
            layers.push(layer.meta);
        }

        if let Some(url) = &options.env_api_url {
            debug!("applying {} override", ENV_API_URL);
            let overlay = serde_json::json!({ "gateway": { "base_url": url } });
            merge::merge_json_values(&mut merged, &overlay);
            layers.push(ConfigLayer {
                source: ConfigLayerSource::Env,
                path: None,
            });
        }

        let config = config_from_value(merged, "effective")?;
        info!("layered config loaded (layers={})", layers.len());
        Ok(LayeredConfig { config, layers })
    }

    /// Check ranges and formats serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = self.gateway.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(invalid("gateway.base_url", "expected http(s) URL"));
        }
        if self.polling.interval_ms == 0 {
            return Err(invalid("polling.interval_ms", "must be greater than zero"));
        }
        if self.calls.triage_cap == 0 {
            return Err(invalid("calls.triage_cap", "must be greater than zero"));
        }
        if self.calls.doctor_cap == 0 {
            return Err(invalid("calls.doctor_cap", "must be greater than zero"));
        }
        if self.calls.divergence_cap == 0 {
            return Err(invalid("calls.divergence_cap", "must be greater than zero"));
        }
        if self.calls.storage_key.trim().is_empty() {
            return Err(invalid("calls.storage_key", "must not be empty"));
        }
        Ok(())
    }
}

/// Parsed layer before merging.
#[derive(Debug, Clone)]
struct LoadedLayer {
    meta: ConfigLayer,
    value: Value,
}

fn config_from_value(value: Value, label: &str) -> Result<TriageConfig, ConfigError> {
    schema::validate_layer_schema(&value, label)?;
    let config: TriageConfig = serde_json::from_value(value)?;
    config.validate()?;
    Ok(config)
}

fn invalid(path: &str, message: &str) -> ConfigError {
    ConfigError::InvalidField {
        path: path.to_string(),
        message: message.to_string(),
    }
}

/// Produce a stable unique path used for de-duplication.
fn unique_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
