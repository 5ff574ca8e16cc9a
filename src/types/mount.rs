//! Data-only mount state types shared across the crate.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::VOLUME_DELIMITER;

/// One managed mount as recorded by the capture phase.
///
/// `source_address` and `volume_id` are the two halves of the mount source
/// split on the volume-namespace delimiter; records whose source does not
/// match that pattern are never stored (see `split_source`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountRecord {
    pub mount_point: PathBuf,
    pub volume_id: String,
    pub source_address: String,
    pub options: String,
}

impl MountRecord {
    /// Split a mount source of the form `<address>:/volumes/<id>` into
    /// `(address, volume_id)`. Returns `None` for sources outside the
    /// managed volume namespace.
    #[must_use]
    pub fn split_source(source: &str) -> Option<(&str, &str)> {
        source.split_once(VOLUME_DELIMITER)
    }

    /// Reassemble the originally recorded mount source.
    #[must_use]
    pub fn source(&self) -> String {
        format!("{}{}{}", self.source_address, VOLUME_DELIMITER, self.volume_id)
    }
}

/// A raw mount listing entry before source validation. Used for mounts whose
/// source is not in the volume namespace, e.g. virtiofs tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMount {
    pub mount_point: PathBuf,
    pub source: String,
    pub options: String,
}

/// The full recorded mount state of one host. Owned exclusively by the
/// checkpoint entry for its host; never aliased between hosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostMountState {
    pub host_id: String,
    pub host_address: String,
    pub mounts: Vec<MountRecord>,
}
