//! Configuration schema for Triagem.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root config shared by every screen.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TriageConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub calls: CallsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl TriageConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> TriageConfigBuilder {
        TriageConfigBuilder::new()
    }
}

/// Builder for assembling a `TriageConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct TriageConfigBuilder {
    config: TriageConfig,
}

impl TriageConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: TriageConfig::default(),
        }
    }

    /// Replace the gateway configuration.
    pub fn gateway(mut self, gateway: GatewayConfig) -> Self {
        self.config.gateway = gateway;
        self
    }

    /// Replace the polling configuration.
    pub fn polling(mut self, polling: PollingConfig) -> Self {
        self.config.polling = polling;
        self
    }

    /// Replace the recent-calls configuration.
    pub fn calls(mut self, calls: CallsConfig) -> Self {
        self.config.calls = calls;
        self
    }

    /// Replace the durable storage configuration.
    pub fn storage(mut self, storage: StorageConfig) -> Self {
        self.config.storage = storage;
        self
    }

    pub fn build(self) -> TriageConfig {
        self.config
    }
}

/// Backend REST service location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout; requests wait indefinitely when unset.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_ms: None,
        }
    }
}

impl GatewayConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

fn default_base_url() -> String {
    "http://localhost:1111".to_string()
}

/// Periodic refresh settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

fn default_interval_ms() -> u64 {
    3000
}

/// Recent-calls list settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CallsConfig {
    /// Durable storage key shared by every context.
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    /// List length kept after a triage call.
    #[serde(default = "default_triage_cap")]
    pub triage_cap: usize,
    /// List length kept after a doctor call.
    #[serde(default = "default_doctor_cap")]
    pub doctor_cap: usize,
    /// Room label attached to triage calls.
    #[serde(default = "default_triage_room_label")]
    pub triage_room_label: String,
    /// Room id sent to the gateway when the caller does not pick one.
    #[serde(default = "default_room_id")]
    pub default_room_id: u32,
    /// Number of divergences kept, newest last.
    #[serde(default = "default_divergence_cap")]
    pub divergence_cap: usize,
}

impl Default for CallsConfig {
    fn default() -> Self {
        Self {
            storage_key: default_storage_key(),
            triage_cap: default_triage_cap(),
            doctor_cap: default_doctor_cap(),
            triage_room_label: default_triage_room_label(),
            default_room_id: default_room_id(),
            divergence_cap: default_divergence_cap(),
        }
    }
}

fn default_storage_key() -> String {
    "recentCalls".to_string()
}

fn default_triage_cap() -> usize {
    10
}

fn default_doctor_cap() -> usize {
    4
}

fn default_triage_room_label() -> String {
    "Triagem".to_string()
}

fn default_room_id() -> u32 {
    1
}

fn default_divergence_cap() -> usize {
    50
}

/// Durable key-value storage settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for the file-backed store; `~/.triagem/storage` when unset.
    #[serde(default)]
    pub path: Option<String>,
}

impl StorageConfig {
    /// Resolve the storage directory, falling back to the user home.
    pub fn resolve_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.path {
            return Some(PathBuf::from(path));
        }
        directories::UserDirs::new().map(|dirs| dirs.home_dir().join(".triagem").join("storage"))
    }
}
