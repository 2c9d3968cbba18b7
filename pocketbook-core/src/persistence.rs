//! Pluggable persistence for collection stores.
//!
//! A store keeps its entities in memory and hands the whole sequence to a
//! [`Persistence`] implementation after every mutation. [`JsonFile`] mirrors it
//! to a pretty-printed JSON array on disk; [`MemoryPersistence`] keeps it in
//! memory so tests can run without touching the filesystem.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{PocketError, PocketResult};

/// What a persistence backend hands back on load.
#[derive(Debug, Clone, PartialEq)]
pub struct Stored<T> {
    pub items: Vec<T>,
    /// Next id to assign, if the backend tracks one
    pub next_id: Option<u64>,
}

impl<T> Default for Stored<T> {
    fn default() -> Self {
        Stored {
            items: Vec::new(),
            next_id: None,
        }
    }
}

/// Backend a store loads from once and saves to after each mutation.
pub trait Persistence<T>: Send + Sync {
    fn load(&self) -> PocketResult<Stored<T>>;

    /// Replace everything persisted with `items`.
    fn save(&self, items: &[T], next_id: Option<u64>) -> PocketResult<()>;

    /// Where the data lives, for log lines.
    fn location(&self) -> String;
}

/// Load from `persistence`, falling back to an empty collection on any failure.
pub(crate) fn load_or_empty<T>(persistence: &dyn Persistence<T>) -> Stored<T> {
    match persistence.load() {
        Ok(stored) => stored,
        Err(e) if e.is_missing_file() => {
            info!(location = %persistence.location(), "No data file yet, starting empty");
            Stored::default()
        }
        Err(e) => {
            warn!(
                location = %persistence.location(),
                error = %e,
                "Could not read data file, starting empty"
            );
            Stored::default()
        }
    }
}

/// Write `contents` to a hidden temp file next to `path`, then rename it over `path`.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> PocketResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| PocketError::InvalidFilename(path.display().to_string()))?;
    let temp = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));

    let written = std::fs::write(&temp, contents).and_then(|()| std::fs::rename(&temp, path));
    if let Err(e) = written {
        // Don't leave a half-written temp file behind
        let _ = std::fs::remove_file(&temp);
        return Err(e.into());
    }
    Ok(())
}

#[derive(Serialize, Deserialize)]
struct Counter {
    next_id: u64,
}

/// A JSON array file, plus a `<stem>.seq.json` sidecar holding the id counter.
pub struct JsonFile<T> {
    path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonFile<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFile {
            path: path.into(),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn counter_path(&self) -> PathBuf {
        self.path.with_extension("seq.json")
    }

    // A broken sidecar is not fatal; the store derives the counter from the ids.
    fn read_counter(&self) -> Option<u64> {
        let path = self.counter_path();
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not read id counter");
                return None;
            }
        };

        match serde_json::from_str::<Counter>(&content) {
            Ok(counter) => Some(counter.next_id),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring malformed id counter");
                None
            }
        }
    }
}

impl<T> Persistence<T> for JsonFile<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    fn load(&self) -> PocketResult<Stored<T>> {
        let content = std::fs::read_to_string(&self.path)?;

        let items = if content.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&content)?
        };

        Ok(Stored {
            items,
            next_id: self.read_counter(),
        })
    }

    fn save(&self, items: &[T], next_id: Option<u64>) -> PocketResult<()> {
        let content = serde_json::to_string_pretty(items)?;
        write_atomic(&self.path, content.as_bytes())?;

        if let Some(next_id) = next_id {
            let counter = serde_json::to_string_pretty(&Counter { next_id })?;
            write_atomic(&self.counter_path(), counter.as_bytes())?;
        }

        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory backend. Clones share the same snapshot.
pub struct MemoryPersistence<T> {
    snapshot: Arc<Mutex<Stored<T>>>,
    fail_saves: Arc<AtomicBool>,
}

impl<T> Clone for MemoryPersistence<T> {
    fn clone(&self) -> Self {
        MemoryPersistence {
            snapshot: Arc::clone(&self.snapshot),
            fail_saves: Arc::clone(&self.fail_saves),
        }
    }
}

impl<T> Default for MemoryPersistence<T> {
    fn default() -> Self {
        MemoryPersistence {
            snapshot: Arc::new(Mutex::new(Stored::default())),
            fail_saves: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl<T: Clone> MemoryPersistence<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: Vec<T>) -> Self {
        let persistence = Self::default();
        *persistence.lock() = Stored {
            items,
            next_id: None,
        };
        persistence
    }

    /// Make every following save fail, or succeed again.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// What was last saved.
    pub fn snapshot(&self) -> Stored<T> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Stored<T>> {
        self.snapshot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T> Persistence<T> for MemoryPersistence<T>
where
    T: Clone + Send + Sync,
{
    fn load(&self) -> PocketResult<Stored<T>> {
        Ok(self.lock().clone())
    }

    fn save(&self, items: &[T], next_id: Option<u64>) -> PocketResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(PocketError::Io(std::io::Error::other("simulated write failure")));
        }

        *self.lock() = Stored {
            items: items.to_vec(),
            next_id,
        };
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
