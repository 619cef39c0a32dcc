//! Flat-file action log.
//!
//! The whole log is a single pretty-printed JSON array. Every mutation is a
//! read-modify-write of the complete file, serialized by an in-process mutex
//! plus an advisory lock on a sidecar `<file>.lock`, and committed by renaming
//! a temp file over the log so readers never observe a half-written array.

use std::ffi::OsString;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use fd_lock::RwLock;
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{ModlogError, Result};
use crate::types::Action;

/// Durable, insertion-ordered list of recorded actions.
pub struct ActionStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ActionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the log as an empty array if it does not exist yet.
    pub async fn ensure_exists(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let path = self.path.clone();
        run_blocking(move || {
            with_file_lock(&path, || {
                if !path.exists() {
                    debug!("Creating empty action log at {}", path.display());
                    write_log(&path, &[])?;
                }
                Ok(())
            })
        })
        .await
    }

    /// All actions in insertion order.
    ///
    /// Never fails: a missing or unreadable log reads as empty.
    pub async fn list(&self) -> Vec<Action> {
        let path = self.path.clone();
        match tokio::task::spawn_blocking(move || read_log_lenient(&path)).await {
            Ok(actions) => actions,
            Err(e) => {
                warn!("Action log read task failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Append one action to the end of the log.
    ///
    /// A missing log starts empty. A log that exists but cannot be read or
    /// parsed is left untouched and the error is returned.
    pub async fn append(&self, action: Action) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let path = self.path.clone();
        run_blocking(move || {
            with_file_lock(&path, || {
                let mut actions = read_log_for_update(&path)?;
                actions.push(action);
                write_log(&path, &actions)
            })
        })
        .await
        .inspect_err(|e| warn!("Failed to append to {}: {}", self.path.display(), e))
    }

    /// Replace the log with an empty array.
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let path = self.path.clone();
        run_blocking(move || with_file_lock(&path, || write_log(&path, &[])))
            .await
            .inspect_err(|e| warn!("Failed to clear {}: {}", self.path.display(), e))
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ModlogError::Other(anyhow::anyhow!("blocking task failed: {e}")))?
}

fn read_log(path: &Path) -> Result<Vec<Action>> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

fn read_log_lenient(path: &Path) -> Vec<Action> {
    match read_log(path) {
        Ok(actions) => actions,
        Err(ModlogError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => {
            warn!("Treating unreadable action log {} as empty: {}", path.display(), e);
            Vec::new()
        }
    }
}

fn read_log_for_update(path: &Path) -> Result<Vec<Action>> {
    match read_log(path) {
        Err(ModlogError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        other => other,
    }
}

fn write_log(path: &Path, actions: &[Action]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        serde_json::to_writer_pretty(&mut writer, actions)?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| ModlogError::Io(e.error))?;
    Ok(())
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".lock");
    PathBuf::from(name)
}

/// Run `f` while holding an exclusive advisory lock next to `path`.
fn with_file_lock<T>(path: &Path, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let lock_file = lock_path(path);
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_file)?;
    let mut lock = RwLock::new(file);
    let guard = lock.write().map_err(|e| ModlogError::Lock {
        path: lock_file.display().to_string(),
        message: e.to_string(),
    })?;
    let result = f();
    drop(guard);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Messenger;
    use std::sync::Arc;

    fn store_in(dir: &tempfile::TempDir) -> ActionStore {
        ActionStore::new(dir.path().join("actions.json"))
    }

    #[tokio::test]
    async fn test_missing_file_lists_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(store.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_append_then_list_preserves_order() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = store_in(&dir);

        let actions = vec![
            Action::ban(Some(Messenger::Telegram)),
            Action::note(Some(Messenger::Telegram), "spam"),
            Action::warn(Some(Messenger::Discord)),
            Action::note(None, "site-wide issue"),
        ];
        for action in &actions {
            store.append(action.clone()).await.unwrap();
        }

        assert_eq!(store.list().await, actions);
    }

    #[tokio::test]
    async fn test_clear_always_empties() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = store_in(&dir);

        store.clear().await.unwrap();
        assert!(store.list().await.is_empty());

        store.append(Action::ban(None)).await.unwrap();
        store.append(Action::warn(None)).await.unwrap();
        store.clear().await.unwrap();
        assert!(store.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_lists_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), "{ not json").unwrap();

        assert!(store.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_append_refuses_to_overwrite_corrupt_log() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), "{ not json").unwrap();

        let err = store.append(Action::ban(None)).await.unwrap_err();
        assert!(matches!(err, ModlogError::Serialization(_)));
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "{ not json");
    }

    #[tokio::test]
    async fn test_append_keeps_records_it_cannot_parse() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = store_in(&dir);
        let original = r#"[
  { "type": "ban", "messenger": "telegram" },
  { "type": "warn", "messenger": "signal" },
  { "type": "note", "value": "kept" }
]"#;
        std::fs::write(store.path(), original).unwrap();

        assert!(store.list().await.is_empty());
        assert!(store
            .append(Action::ban(Some(Messenger::Discord)))
            .await
            .is_err());
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), original);
    }

    #[tokio::test]
    async fn test_ensure_exists_creates_empty_array_once() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = store_in(&dir);

        store.ensure_exists().await.unwrap();
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "[]");

        store.append(Action::warn(None)).await.unwrap();
        store.ensure_exists().await.unwrap();
        assert_eq!(store.list().await.len(), 1);
    }

    #[tokio::test]
    async fn test_file_layout_is_pretty_json() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = store_in(&dir);
        store
            .append(Action::note(Some(Messenger::Matrix), "raid"))
            .await
            .unwrap();

        let contents = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(
            contents,
            "[\n  {\n    \"type\": \"note\",\n    \"messenger\": \"matrix\",\n    \"value\": \"raid\"\n  }\n]"
        );
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_not_lost() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = Arc::new(store_in(&dir));

        let mut handles = Vec::new();
        for _ in 0..25 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.append(Action::ban(Some(Messenger::Whatsapp))).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.list().await.len(), 25);
    }

    #[tokio::test]
    async fn test_write_failure_is_reported() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = ActionStore::new(dir.path().join("missing").join("actions.json"));

        assert!(store.append(Action::ban(None)).await.is_err());
        assert!(store.clear().await.is_err());
        assert!(store.list().await.is_empty());
    }
}
