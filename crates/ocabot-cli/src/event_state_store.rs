//! Persisted record of processed comment events, so each delivery is dispatched once.
//!
//! Every `ocabot dispatch` runs in its own process, so the state file is
//! guarded by a sibling `.lock` file held from load to save, and `save`
//! merges the keys recorded on disk by other runs before writing.

use std::{
    collections::HashSet,
    ffi::OsString,
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
    thread,
    time::{Duration, SystemTime},
};

use anyhow::{anyhow, bail, Context, Result};
use ocabot_queue::write_json_atomic;
use serde::{Deserialize, Serialize};

const EVENT_STATE_SCHEMA_VERSION: u32 = 1;
const EVENT_STATE_LOCK_POLL: Duration = Duration::from_millis(50);
pub const EVENT_STATE_LOCK_TIMEOUT: Duration = Duration::from_secs(10);
pub const EVENT_STATE_LOCK_STALE_AFTER: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EventState {
    schema_version: u32,
    #[serde(default)]
    processed_event_keys: Vec<String>,
}

impl Default for EventState {
    fn default() -> Self {
        Self {
            schema_version: EVENT_STATE_SCHEMA_VERSION,
            processed_event_keys: Vec::new(),
        }
    }
}

/// Exclusive hold on a state file; the lock file is removed on drop.
#[derive(Debug)]
pub struct EventStateLock {
    path: PathBuf,
}

impl EventStateLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for EventStateLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// `<state file name>.lock`, next to the state file.
pub fn event_state_lock_path(state_path: &Path) -> PathBuf {
    let mut name = state_path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("state"));
    name.push(".lock");
    state_path.with_file_name(name)
}

/// Takes the lock for `state_path`, waiting up to `timeout` for another run to release it.
///
/// A lock file older than `stale_after` is treated as left behind by a crashed
/// run and reclaimed. `Duration::ZERO` disables reclaiming.
pub fn acquire_event_state_lock(
    state_path: &Path,
    timeout: Duration,
    stale_after: Duration,
) -> Result<EventStateLock> {
    let path = event_state_lock_path(state_path);
    if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create state directory {}", parent.display()))?;
    }

    let start = SystemTime::now();
    loop {
        match OpenOptions::new().create_new(true).write(true).open(&path) {
            Ok(mut file) => {
                let _ = writeln!(file, "{}", std::process::id());
                return Ok(EventStateLock { path });
            }
            Err(error) if error.kind() == std::io::ErrorKind::AlreadyExists => {
                if stale_after > Duration::ZERO && reclaim_stale_lock(&path, stale_after) {
                    tracing::warn!(lock = %path.display(), "reclaimed stale event state lock");
                    continue;
                }
                let elapsed = SystemTime::now().duration_since(start).unwrap_or_default();
                if elapsed >= timeout {
                    bail!("timed out waiting for event state lock {}", path.display());
                }
                thread::sleep(EVENT_STATE_LOCK_POLL);
            }
            Err(error) => {
                return Err(anyhow!(
                    "failed to create event state lock {}: {error}",
                    path.display()
                ));
            }
        }
    }
}

fn reclaim_stale_lock(path: &Path, stale_after: Duration) -> bool {
    let Ok(modified) = std::fs::metadata(path).and_then(|metadata| metadata.modified()) else {
        return false;
    };
    let age = SystemTime::now()
        .duration_since(modified)
        .unwrap_or(Duration::ZERO);
    age >= stale_after && std::fs::remove_file(path).is_ok()
}

fn read_event_state(path: &Path) -> Result<Option<EventState>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read state file {}", path.display()))?;
    let state = serde_json::from_str::<EventState>(&raw)
        .with_context(|| format!("failed to parse state file {}", path.display()))?;
    if state.schema_version != EVENT_STATE_SCHEMA_VERSION {
        bail!(
            "unsupported event state schema: expected {}, found {}",
            EVENT_STATE_SCHEMA_VERSION,
            state.schema_version
        );
    }
    Ok(Some(state))
}

fn trim_oldest(keys: &mut Vec<String>, cap: usize) {
    if keys.len() > cap {
        let keep_from = keys.len() - cap;
        keys.drain(..keep_from);
    }
}

/// Capped FIFO of processed event keys backed by a JSON file.
#[derive(Debug)]
pub struct EventStateStore {
    path: PathBuf,
    cap: usize,
    state: EventState,
    processed_index: HashSet<String>,
    /// Keys marked since the last load or save, in marking order.
    marked_keys: Vec<String>,
    lock: Option<EventStateLock>,
}

impl EventStateStore {
    /// Loads the store from `path`, starting empty when the file does not exist yet.
    pub fn load(path: PathBuf, cap: usize) -> Result<Self> {
        let mut state = read_event_state(&path)?.unwrap_or_default();
        let cap = cap.max(1);
        trim_oldest(&mut state.processed_event_keys, cap);
        let processed_index = state.processed_event_keys.iter().cloned().collect();
        Ok(Self {
            path,
            cap,
            state,
            processed_index,
            marked_keys: Vec::new(),
            lock: None,
        })
    }

    /// Like [`EventStateStore::load`], holding the state lock until the store is dropped.
    pub fn load_locked(path: PathBuf, cap: usize) -> Result<Self> {
        let lock = acquire_event_state_lock(
            &path,
            EVENT_STATE_LOCK_TIMEOUT,
            EVENT_STATE_LOCK_STALE_AFTER,
        )?;
        let mut store = Self::load(path, cap)?;
        store.lock = Some(lock);
        Ok(store)
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.processed_index.contains(key)
    }

    pub fn len(&self) -> usize {
        self.state.processed_event_keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.processed_event_keys.is_empty()
    }

    /// Records `key`; returns false when it was already recorded.
    pub fn mark_processed(&mut self, key: &str) -> bool {
        if !self.processed_index.insert(key.to_string()) {
            return false;
        }
        self.state.processed_event_keys.push(key.to_string());
        self.marked_keys.push(key.to_string());
        while self.state.processed_event_keys.len() > self.cap {
            let removed = self.state.processed_event_keys.remove(0);
            self.processed_index.remove(&removed);
            self.marked_keys.retain(|marked| marked != &removed);
        }
        true
    }

    /// Writes the keys on disk plus the ones marked here, oldest evicted past the cap.
    pub fn save(&mut self) -> Result<()> {
        let mut merged = read_event_state(&self.path)?
            .map(|state| state.processed_event_keys)
            .unwrap_or_else(|| self.state.processed_event_keys.clone());
        let mut merged_index = merged.iter().cloned().collect::<HashSet<_>>();
        for key in self.marked_keys.drain(..) {
            if merged_index.insert(key.clone()) {
                merged.push(key);
            }
        }
        trim_oldest(&mut merged, self.cap);

        self.processed_index = merged.iter().cloned().collect();
        self.state.processed_event_keys = merged;
        write_json_atomic(&self.path, &self.state)
            .with_context(|| format!("failed to write state file {}", self.path.display()))
    }
}
