//! File-backed durable store shared across processes.
//!
//! Each key is stored as `<root>/<key>.json`. Writes go through a temporary
//! file and a rename so readers never observe a partial value. Changes made by
//! other processes are picked up by a `notify` directory watcher.

use crate::error::StorageError;
use crate::provider::{
    ContextId, DurableStore, EVENT_BUFFER, EXTERNAL_ORIGIN, StorageEvent, validate_key,
};
use log::{debug, info, warn};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Extension of value files.
const VALUE_EXTENSION: &str = "json";

struct Shared {
    root: PathBuf,
    sender: broadcast::Sender<StorageEvent>,
    /// Last value this process wrote or observed per key.
    known: Mutex<HashMap<String, String>>,
}

/// Directory-backed store.
#[derive(Clone)]
pub struct FileDurableStore {
    shared: Arc<Shared>,
    context_id: ContextId,
}

impl FileDurableStore {
    /// Open (or create) storage under the given root.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        let known = scan_values(&root)?;
        info!(
            "initialized file storage (root={}, keys={})",
            root.display(),
            known.len()
        );
        let (sender, _) = broadcast::channel(EVENT_BUFFER);
        Ok(Self {
            shared: Arc::new(Shared {
                root,
                sender,
                known: Mutex::new(known),
            }),
            context_id: Uuid::new_v4(),
        })
    }

    /// Open another context over the same directory within this process.
    pub fn handle(&self) -> Self {
        Self {
            shared: self.shared.clone(),
            context_id: Uuid::new_v4(),
        }
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.shared.root
    }

    fn value_path(&self, key: &str) -> PathBuf {
        self.shared.root.join(format!("{key}.{VALUE_EXTENSION}"))
    }

    fn temp_path(&self, key: &str) -> PathBuf {
        self.shared
            .root
            .join(format!(".{key}.{}.tmp", self.context_id))
    }

    /// Compare disk contents with known values and announce external changes.
    ///
    /// Returns the number of events emitted.
    pub fn poll_changes(&self) -> Result<usize, StorageError> {
        let on_disk = scan_values(&self.shared.root)?;
        let mut known = self.shared.known.lock();
        let mut events = Vec::new();
        for (key, value) in &on_disk {
            if known.get(key) != Some(value) {
                events.push(StorageEvent {
                    key: key.clone(),
                    new_value: Some(value.clone()),
                    origin: EXTERNAL_ORIGIN,
                });
            }
        }
        for key in known.keys() {
            if !on_disk.contains_key(key) {
                events.push(StorageEvent {
                    key: key.clone(),
                    new_value: None,
                    origin: EXTERNAL_ORIGIN,
                });
            }
        }
        *known = on_disk;
        drop(known);

        let count = events.len();
        for event in events {
            debug!(
                "external storage change (key={}, removed={})",
                event.key,
                event.new_value.is_none()
            );
            let _ = self.shared.sender.send(event);
        }
        Ok(count)
    }

    /// Watch the directory and announce changes made by other processes.
    ///
    /// The returned task owns the watcher; aborting it stops watching.
    pub fn spawn_watcher(&self) -> Result<JoinHandle<()>, StorageError> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            let _ = tx.send(result);
        })?;
        watcher.watch(&self.shared.root, RecursiveMode::NonRecursive)?;
        info!("starting storage watcher (root={})", self.root().display());

        let store = self.clone();
        Ok(tokio::spawn(async move {
            let _watcher = watcher;
            while let Some(result) = rx.recv().await {
                match result {
                    Ok(event) if touches_values(&event) => {
                        while rx.try_recv().is_ok() {}
                        if let Err(err) = store.poll_changes() {
                            warn!("storage watcher failed to scan: {err}");
                        }
                    }
                    Ok(_) => {}
                    Err(err) => warn!("storage watcher error: {err}"),
                }
            }
            debug!("storage watcher stopped (root={})", store.root().display());
        }))
    }
}

impl DurableStore for FileDurableStore {
    fn context_id(&self) -> ContextId {
        self.context_id
    }

    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        validate_key(key)?;
        read_optional(&self.value_path(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        let mut known = self.shared.known.lock();
        let current = read_optional(&self.value_path(key))?;
        if current.as_deref() == Some(value) {
            known.insert(key.to_string(), value.to_string());
            return Ok(());
        }
        let temp_path = self.temp_path(key);
        fs::write(&temp_path, value)?;
        fs::rename(&temp_path, self.value_path(key))?;
        known.insert(key.to_string(), value.to_string());
        drop(known);

        debug!(
            "stored value (key={}, len={}, origin={})",
            key,
            value.len(),
            self.context_id
        );
        let _ = self.shared.sender.send(StorageEvent {
            key: key.to_string(),
            new_value: Some(value.to_string()),
            origin: self.context_id,
        });
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        let mut known = self.shared.known.lock();
        known.remove(key);
        match fs::remove_file(self.value_path(key)) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err.into()),
        }
        drop(known);
        let _ = self.shared.sender.send(StorageEvent {
            key: key.to_string(),
            new_value: None,
            origin: self.context_id,
        });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.shared.sender.subscribe()
    }
}

/// Whether an event changed a value file; temp files and access events are skipped.
fn touches_values(event: &Event) -> bool {
    !matches!(event.kind, EventKind::Access(_))
        && event
            .paths
            .iter()
            .any(|path| path.extension().and_then(|ext| ext.to_str()) == Some(VALUE_EXTENSION))
}

/// Read a file, mapping a missing file to `None`.
fn read_optional(path: &Path) -> Result<Option<String>, StorageError> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Read every value file under the root.
fn scan_values(root: &Path) -> Result<HashMap<String, String>, StorageError> {
    let mut values = HashMap::new();
    for entry in fs::read_dir(root)? {
        let path = entry?.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(VALUE_EXTENSION) {
            continue;
        }
        let Some(key) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        if validate_key(key).is_err() {
            continue;
        }
        if let Some(value) = read_optional(&path)? {
            values.insert(key.to_string(), value);
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::FileDurableStore;
    use crate::{DurableStore, EXTERNAL_ORIGIN, StorageError};
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn set_and_get_round_trip_on_disk() {
        let temp = tempdir().expect("tempdir");
        let store = FileDurableStore::new(temp.path()).expect("store");
        store.set("recentCalls", "[]").expect("set");
        assert_eq!(
            fs::read_to_string(temp.path().join("recentCalls.json")).expect("read"),
            "[]"
        );

        let reopened = FileDurableStore::new(temp.path()).expect("reopen");
        assert_eq!(
            reopened.get("recentCalls").expect("get"),
            Some("[]".to_string())
        );
    }

    #[test]
    fn rejects_path_like_keys() {
        let temp = tempdir().expect("tempdir");
        let store = FileDurableStore::new(temp.path()).expect("store");
        let err = store.set("../escape", "x").expect_err("invalid");
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }

    #[test]
    fn own_writes_are_not_reported_as_external() {
        let temp = tempdir().expect("tempdir");
        let store = FileDurableStore::new(temp.path()).expect("store");
        store.set("recentCalls", "[1]").expect("set");
        assert_eq!(store.poll_changes().expect("poll"), 0);
    }

    #[test]
    fn poll_reports_writes_from_other_processes() {
        let temp = tempdir().expect("tempdir");
        let writer = FileDurableStore::new(temp.path()).expect("writer");
        let reader = FileDurableStore::new(temp.path()).expect("reader");
        let mut events = reader.subscribe();

        writer.set("recentCalls", "[2]").expect("set");
        assert_eq!(reader.poll_changes().expect("poll"), 1);
        let event = events.try_recv().expect("event");
        assert_eq!(event.key, "recentCalls");
        assert_eq!(event.new_value, Some("[2]".to_string()));
        assert_eq!(event.origin, EXTERNAL_ORIGIN);

        writer.remove("recentCalls").expect("remove");
        assert_eq!(reader.poll_changes().expect("poll"), 1);
        assert_eq!(events.try_recv().expect("removal").new_value, None);
    }

    #[test]
    fn existing_values_are_not_replayed_on_open() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join("recentCalls.json"), "[]").expect("seed");
        let store = FileDurableStore::new(temp.path()).expect("store");
        assert_eq!(store.poll_changes().expect("poll"), 0);
    }

    #[tokio::test]
    async fn watcher_emits_external_changes() {
        let temp = tempdir().expect("tempdir");
        let reader = FileDurableStore::new(temp.path()).expect("reader");
        let mut events = reader.subscribe();
        let watcher = reader.spawn_watcher().expect("watcher");

        let staged = temp.path().join(".recentCalls.external.tmp");
        fs::write(&staged, "[3]").expect("staged write");
        fs::rename(&staged, temp.path().join("recentCalls.json")).expect("external rename");
        let event = tokio::time::timeout(std::time::Duration::from_secs(2), events.recv())
            .await
            .expect("timely")
            .expect("event");
        assert_eq!(event.new_value, Some("[3]".to_string()));
        assert_eq!(event.origin, EXTERNAL_ORIGIN);
        watcher.abort();
    }

    #[test]
    fn value_filter_skips_temp_files_and_reads() {
        use super::touches_values;
        use notify::event::{AccessKind, CreateKind, ModifyKind};
        use notify::{Event, EventKind};

        let value = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path("/store/recentCalls.json".into());
        let temp = Event::new(EventKind::Create(CreateKind::File))
            .add_path("/store/.recentCalls.1234.tmp".into());
        let read = Event::new(EventKind::Access(AccessKind::Any))
            .add_path("/store/recentCalls.json".into());
        assert!(touches_values(&value));
        assert!(!touches_values(&temp));
        assert!(!touches_values(&read));
    }
}
