//! Initial directory scan seeding the usage registry

use super::EvictionManager;
use crate::clock::epoch_millis;
use crate::errors::{CacheError, Result};
use crate::keys::KeyMapper;
use crate::store::EntryStore;
use parking_lot::{Condvar, Mutex};
use std::fs;
use std::io;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

/// Temporary files older than this are leftovers from an interrupted writer
const STALE_TEMP_AFTER: Duration = Duration::from_secs(10 * 60);

/// What the initial scan found
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Entry files newly registered by the scan
    pub files: u64,
    /// Payload bytes charged for those files
    pub bytes: u64,
    /// Stale temporary files deleted
    pub removed_temp_files: u64,
}

#[derive(Debug, Clone)]
enum ScanState {
    Running,
    Finished(ScanOutcome),
    Failed(String),
}

struct ScanSignal {
    state: Mutex<ScanState>,
    done: Condvar,
}

impl ScanSignal {
    fn finish(&self, state: ScanState) {
        let mut current = self.state.lock();
        if matches!(*current, ScanState::Running) {
            *current = state;
            self.done.notify_all();
        }
    }
}

/// Completion handle for a cache's initial directory scan
#[derive(Clone)]
pub struct InitialScan {
    signal: Arc<ScanSignal>,
}

impl InitialScan {
    fn running() -> Self {
        Self {
            signal: Arc::new(ScanSignal {
                state: Mutex::new(ScanState::Running),
                done: Condvar::new(),
            }),
        }
    }

    pub fn is_complete(&self) -> bool {
        !matches!(*self.signal.state.lock(), ScanState::Running)
    }

    /// Block until the scan has finished
    pub fn wait(&self) -> Result<ScanOutcome> {
        let mut state = self.signal.state.lock();
        while matches!(*state, ScanState::Running) {
            self.signal.done.wait(&mut state);
        }
        Self::outcome_of(&state)
    }

    /// Block for at most `timeout`; `None` if the scan is still running
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<ScanOutcome>> {
        let mut state = self.signal.state.lock();
        if matches!(*state, ScanState::Running) {
            let _ = self.signal.done.wait_while_for(
                &mut state,
                |s| matches!(s, ScanState::Running),
                timeout,
            );
        }
        match *state {
            ScanState::Running => None,
            ref done => Some(Self::outcome_of(done)),
        }
    }

    /// Outcome if finished, without blocking
    pub fn outcome(&self) -> Option<Result<ScanOutcome>> {
        match *self.signal.state.lock() {
            ScanState::Running => None,
            ref done => Some(Self::outcome_of(done)),
        }
    }

    fn outcome_of(state: &ScanState) -> Result<ScanOutcome> {
        match state {
            ScanState::Finished(outcome) => Ok(*outcome),
            ScanState::Failed(message) => Err(CacheError::io(
                "",
                "scan cache directory",
                io::Error::other(message.clone()),
            )),
            ScanState::Running => unreachable!("outcome requested while scan running"),
        }
    }
}

impl std::fmt::Debug for InitialScan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitialScan")
            .field("state", &*self.signal.state.lock())
            .finish()
    }
}

/// Marks the scan failed if the thread unwinds before reporting
struct FinishGuard(Arc<ScanSignal>);

impl Drop for FinishGuard {
    fn drop(&mut self) {
        self.0
            .finish(ScanState::Failed("scan thread panicked".to_string()));
    }
}

pub(super) fn spawn(manager: Arc<EvictionManager>) -> Result<InitialScan> {
    let handle = InitialScan::running();
    let signal = Arc::clone(&handle.signal);
    let cache_dir = manager.cache_dir().to_path_buf();

    std::thread::Builder::new()
        .name("diskcache-scan".to_string())
        .spawn(move || {
            let guard = FinishGuard(Arc::clone(&signal));
            let state = match scan_directory(&manager) {
                Ok(outcome) => {
                    info!(
                        cache_dir = %manager.cache_dir().display(),
                        files = outcome.files,
                        bytes = outcome.bytes,
                        removed_temp_files = outcome.removed_temp_files,
                        "initial cache scan complete"
                    );
                    ScanState::Finished(outcome)
                }
                Err(e) => {
                    warn!(cache_dir = %manager.cache_dir().display(), error = %e, "initial cache scan failed");
                    ScanState::Failed(e.to_string())
                }
            };
            signal.finish(state);
            drop(guard);
        })
        .map_err(|e| CacheError::io(cache_dir, "spawn cache scan thread", e))?;

    Ok(handle)
}

fn scan_directory(manager: &EvictionManager) -> Result<ScanOutcome> {
    let dir = manager.cache_dir();
    let mut outcome = ScanOutcome::default();

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(outcome),
        Err(e) => return Err(CacheError::io(dir, "list cache directory", e)),
    };

    let now = SystemTime::now();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => return Err(CacheError::io(dir, "list cache directory", e)),
        };
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        // Files can disappear under us (eviction, clear); skip them
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata.modified().unwrap_or(now);

        if EntryStore::is_temp_file_name(&name) {
            let age = now.duration_since(modified).unwrap_or_default();
            if age >= STALE_TEMP_AFTER && EntryStore::remove(&entry.path()).unwrap_or(false) {
                debug!(path = %entry.path().display(), "removed stale temporary file");
                outcome.removed_temp_files += 1;
            }
            continue;
        }

        if !KeyMapper::is_entry_file_name(&name) {
            continue;
        }

        let path = entry.path();
        let Ok(size) = EvictionManager::accounted_size(&path) else {
            continue;
        };
        if manager.register_existing(path, size, epoch_millis(modified)) {
            outcome.files += 1;
            outcome.bytes += size;
        }
    }

    Ok(outcome)
}
