//! One running context: gateway, durable call storage, and patient store.

use anyhow::{Context, Result};
use log::{debug, info};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use triagem_rs_config::TriageConfig;
use triagem_rs_core::{CallBroadcast, PatientStore, RefreshLoop, RoomDirectory};
use triagem_rs_gateway::{Gateway, HttpGateway};
use triagem_rs_storage::FileDurableStore;

/// Screen context wired from config.
pub struct Screen {
    config: TriageConfig,
    gateway: Arc<dyn Gateway>,
    storage: FileDurableStore,
    store: PatientStore,
    watcher: Option<JoinHandle<()>>,
}

impl Screen {
    /// Open a screen against the configured backend and storage directory.
    pub fn open(config: TriageConfig) -> Result<Self> {
        let gateway = HttpGateway::from_config(&config.gateway)
            .context("failed to configure backend gateway")?;
        let root = storage_root(&config)?;
        let storage = FileDurableStore::new(&root)
            .with_context(|| format!("failed to open call storage at {}", root.display()))?;
        Ok(Self::with_parts(config, Arc::new(gateway), storage))
    }

    /// Assemble a screen from an existing gateway and storage.
    pub fn with_parts(
        config: TriageConfig,
        gateway: Arc<dyn Gateway>,
        storage: FileDurableStore,
    ) -> Self {
        let broadcast = CallBroadcast::new(
            Arc::new(storage.clone()),
            config.calls.storage_key.clone(),
        );
        let store = PatientStore::new(gateway.clone(), broadcast, config.calls.clone());
        debug!(
            "screen assembled (storage={}, calls_key={})",
            storage.root().display(),
            config.calls.storage_key
        );
        Self {
            config,
            gateway,
            storage,
            store,
            watcher: None,
        }
    }

    pub fn config(&self) -> &TriageConfig {
        &self.config
    }

    pub fn store(&self) -> &PatientStore {
        &self.store
    }

    pub fn rooms(&self) -> RoomDirectory {
        RoomDirectory::new(self.gateway.clone())
    }

    /// Follow recent calls written by other screens, including other processes.
    pub fn follow_calls(&mut self) -> Result<()> {
        if self.watcher.is_some() {
            return Ok(());
        }
        let watcher = self.storage.spawn_watcher().with_context(|| {
            format!("failed to watch call storage at {}", self.storage.root().display())
        })?;
        self.store.start_call_listener();
        self.watcher = Some(watcher);
        info!("screen following recent calls");
        Ok(())
    }

    /// Start polling the backend at the configured interval.
    pub fn start_refresh(&self) -> RefreshLoop {
        RefreshLoop::spawn(self.store.clone(), self.config.polling.interval())
    }

    /// Stop background work and clear cached state.
    pub fn close(mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
        self.store.dispose();
    }
}

impl Drop for Screen {
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
    }
}

fn storage_root(config: &TriageConfig) -> Result<PathBuf> {
    config
        .storage
        .resolve_path()
        .context("no storage path configured and home directory is unknown")
}
