//! Checkpoint persistence: the per-host mount state captured before a
//! migration, enabling rollback.
//!
//! The checkpoint file is never auto-deleted; its presence or absence is
//! itself load-bearing state. A save is skipped, not replaced, when the
//! freshly collected state holds no mounts and a prior checkpoint exists,
//! so a transient collection failure cannot destroy rollback capability.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::types::{Error, HostMountState, Result};

/// Mapping from host id to that host's recorded mount state. In single-host
/// mode this degenerates to one entry keyed by the local host. Keys are
/// ordered so the serialized document diffs cleanly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checkpoint {
    pub hosts: BTreeMap<String, HostMountState>,
}

impl Checkpoint {
    #[must_use]
    pub fn single(state: HostMountState) -> Self {
        let mut hosts = BTreeMap::new();
        hosts.insert(state.host_id.clone(), state);
        Self { hosts }
    }

    #[must_use]
    pub fn host(&self, host_id: &str) -> Option<&HostMountState> {
        self.hosts.get(host_id)
    }

    /// True when no host entry carries any mount record.
    #[must_use]
    pub fn has_no_mounts(&self) -> bool {
        self.hosts.values().all(|h| h.mounts.is_empty())
    }
}

/// Reads and writes the checkpoint document at a fixed path.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Persist the checkpoint as pretty-printed JSON, overwriting prior
    /// content — except under the non-destructive rule: a checkpoint with no
    /// mounts never replaces an existing file.
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        if checkpoint.has_no_mounts() && self.exists() {
            log::warn!(
                "no mounts collected; existing checkpoint {} preserved",
                self.path.display()
            );
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(&self.path)?;
        serde_json::to_writer_pretty(&file, checkpoint)
            .map_err(|e| Error::Io(std::io::Error::other(e)))?;
        file.sync_all()?;
        Ok(())
    }

    /// Load the checkpoint. Absence is a `State` error telling the operator
    /// to run the capture phase first.
    pub fn load(&self) -> Result<Checkpoint> {
        if !self.exists() {
            return Err(Error::State(format!(
                "no checkpoint found at {}; run the capture phase first to record existing mounts",
                self.path.display()
            )));
        }
        let file = File::open(&self.path)?;
        serde_json::from_reader(file).map_err(|e| Error::Parse(e.to_string()))
    }
}
