//! Persisted "session locked" flag
//!
//! Written on every state change so a restarted shell can re-lock a session
//! that was locked when the previous instance went away. Stored as TOML at
//! `$XDG_STATE_HOME/area/lock-state.toml`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::host::LockFlagStore;

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedState {
    locked: bool,
}

pub struct FileLockStore {
    path: PathBuf,
    /// Last value written, to skip redundant writes
    cached: Option<bool>,
}

impl FileLockStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: None,
        }
    }

    /// Store under the user's state directory
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(Self::default_path()?))
    }

    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .context("Failed to get state directory")?;
        Ok(dir.join("area").join("lock-state.toml"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<PersistedState> {
        if !self.path.exists() {
            return Ok(PersistedState::default());
        }
        let content = fs::read_to_string(&self.path).context("Failed to read lock state")?;
        toml::from_str(&content).context("Failed to parse lock state")
    }

    fn write(&self, locked: bool) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create state directory")?;
        }
        let content = toml::to_string(&PersistedState { locked })
            .context("Failed to serialize lock state")?;
        fs::write(&self.path, content).context("Failed to write lock state")
    }
}

impl LockFlagStore for FileLockStore {
    fn load(&self) -> bool {
        match self.read() {
            Ok(state) => state.locked,
            Err(e) => {
                warn!("Ignoring lock state at {:?}: {:#}", self.path, e);
                false
            }
        }
    }

    fn store(&mut self, locked: bool) {
        if self.cached == Some(locked) {
            return;
        }

        match self.write(locked) {
            Ok(()) => {
                debug!("Persisted locked = {}", locked);
                self.cached = Some(locked);
            }
            Err(e) => warn!("Failed to persist lock state to {:?}: {:#}", self.path, e),
        }
    }
}
