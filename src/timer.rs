//! Active timer record and the shared store every front end and the watcher read from.
//!
//! There is at most one running timer. The store is last-write-wins with no
//! compare-and-swap: two processes starting a timer at the same instant can lose one of
//! the writes. Listeners registered on a store see every value it commits, in commit
//! order; the file-backed store also surfaces writes made by other processes through
//! [`FileTimerStore::poll_changes`].

use chrono::Utc;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;

/// The running timer: which ticket, and since when (epoch milliseconds, UTC).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveTimer {
    pub ticket_id: String,
    pub start_time: i64,
}

impl ActiveTimer {
    /// Creates a timer for `ticket_id` starting now.
    pub fn start_now(ticket_id: impl Into<String>) -> Self {
        Self {
            ticket_id: ticket_id.into(),
            start_time: Utc::now().timestamp_millis(),
        }
    }

    /// Whole seconds elapsed since start, never negative.
    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds_at(Utc::now().timestamp_millis())
    }

    pub fn elapsed_seconds_at(&self, now_ms: i64) -> u64 {
        (now_ms.saturating_sub(self.start_time).max(0) / 1000) as u64
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("timer store io error: {0}")]
    Io(#[from] io::Error),
    #[error("timer store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

static STAGING_SEQUENCE: AtomicU64 = AtomicU64::new(0);
const TIMER_FILE_FALLBACK: &str = "active_timer.json";

pub type Listener = Arc<dyn Fn(Option<&ActiveTimer>) + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Single source of truth for "is a timer running".
pub trait TimerStore: Send + Sync {
    fn read(&self) -> Result<Option<ActiveTimer>, StoreError>;

    /// Replaces the current value (`None` clears it) and notifies every listener.
    fn write(&self, timer: Option<ActiveTimer>) -> Result<(), StoreError>;

    fn subscribe(&self, listener: Listener) -> SubscriptionId;

    fn unsubscribe(&self, id: SubscriptionId);
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct Listeners {
    next_id: AtomicU64,
    entries: Mutex<Vec<(SubscriptionId, Listener)>>,
}

impl Listeners {
    fn add(&self, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.entries).push((id, listener));
        id
    }

    fn remove(&self, id: SubscriptionId) {
        lock(&self.entries).retain(|(entry_id, _)| *entry_id != id);
    }

    /// Listeners run outside the registry lock so they may read the store or unsubscribe.
    fn notify(&self, value: Option<&ActiveTimer>) {
        let snapshot: Vec<Listener> = lock(&self.entries)
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in snapshot {
            listener(value);
        }
    }
}

/// In-process store, used by tests and anything that does not need persistence.
#[derive(Clone, Default)]
pub struct MemoryTimerStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    value: Mutex<Option<ActiveTimer>>,
    commit: Mutex<()>,
    listeners: Listeners,
}

impl MemoryTimerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TimerStore for MemoryTimerStore {
    fn read(&self) -> Result<Option<ActiveTimer>, StoreError> {
        Ok(lock(&self.inner.value).clone())
    }

    fn write(&self, timer: Option<ActiveTimer>) -> Result<(), StoreError> {
        let _commit = lock(&self.inner.commit);
        *lock(&self.inner.value) = timer.clone();
        self.inner.listeners.notify(timer.as_ref());
        Ok(())
    }

    fn subscribe(&self, listener: Listener) -> SubscriptionId {
        self.inner.listeners.add(listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.inner.listeners.remove(id)
    }
}

/// JSON file shared by every process on the machine. A missing file means no timer.
pub struct FileTimerStore {
    path: PathBuf,
    commit: Mutex<()>,
    last_seen: Mutex<Option<ActiveTimer>>,
    listeners: Listeners,
}

impl FileTimerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let initial = read_timer_file(&path).unwrap_or_else(|err| {
            warn!("Failed to read active timer at {}: {}", path.display(), err);
            None
        });
        Self {
            path,
            commit: Mutex::new(()),
            last_seen: Mutex::new(initial),
            listeners: Listeners::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-reads the file and notifies listeners if another process changed it since the
    /// last observed value. Returns whether a change was delivered.
    pub fn poll_changes(&self) -> Result<bool, StoreError> {
        let _commit = lock(&self.commit);
        let current = read_timer_file(&self.path)?;
        {
            let mut last_seen = lock(&self.last_seen);
            if *last_seen == current {
                return Ok(false);
            }
            *last_seen = current.clone();
        }
        debug!("Active timer changed externally: {:?}", current);
        self.listeners.notify(current.as_ref());
        Ok(true)
    }

    /// Polls the file forever at `period`. Only returns if the surrounding task is dropped.
    pub async fn watch(&self, period: Duration) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(err) = self.poll_changes() {
                warn!("Failed to poll active timer: {}", err);
            }
        }
    }

    /// Unique per process and per write so concurrent writers never rename each
    /// other's staging file.
    fn staging_path(&self) -> PathBuf {
        let sequence = STAGING_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| TIMER_FILE_FALLBACK.to_string());
        self.path
            .with_file_name(format!("{}.{}.{}.tmp", name, std::process::id(), sequence))
    }

    fn persist(&self, timer: Option<&ActiveTimer>) -> Result<(), StoreError> {
        match timer {
            Some(timer) => {
                if let Some(parent) = self.path.parent() {
                    fs::create_dir_all(parent)?;
                }
                let content = serde_json::to_string_pretty(timer)?;
                let staging = self.staging_path();
                fs::write(&staging, content)?;
                fs::rename(&staging, &self.path)?;
                Ok(())
            }
            None => match fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(err) => Err(err.into()),
            },
        }
    }
}

impl TimerStore for FileTimerStore {
    fn read(&self) -> Result<Option<ActiveTimer>, StoreError> {
        read_timer_file(&self.path)
    }

    fn write(&self, timer: Option<ActiveTimer>) -> Result<(), StoreError> {
        let _commit = lock(&self.commit);
        self.persist(timer.as_ref())?;
        *lock(&self.last_seen) = timer.clone();
        self.listeners.notify(timer.as_ref());
        Ok(())
    }

    fn subscribe(&self, listener: Listener) -> SubscriptionId {
        self.listeners.add(listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.listeners.remove(id)
    }
}

/// Missing or empty files read as no timer; a corrupt file is logged and treated the same.
fn read_timer_file(path: &Path) -> Result<Option<ActiveTimer>, StoreError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    if content.trim().is_empty() {
        return Ok(None);
    }
    match serde_json::from_str(&content) {
        Ok(timer) => Ok(Some(timer)),
        Err(err) => {
            warn!("Ignoring unreadable active timer at {}: {}", path.display(), err);
            Ok(None)
        }
    }
}
