//! Immutable run configuration, constructed once and passed into every
//! component. Nothing in the crate reads globals.

use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    CANONICAL_OPTION_BASE, DEFAULT_CHECKPOINT_DIR, DEFAULT_CHECKPOINT_FILE,
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_MOUNT_TIMEOUT_SECS, DEFAULT_NFS_DOMAIN,
    DEFAULT_PROBE_TIMEOUT_SECS, DEFAULT_QUERY_TIMEOUT_SECS, MANAGED_FS_TYPE,
    MOUNT_RETRY_ATTEMPTS, MOUNT_RETRY_BACKOFF_MS, VOLUME_DELIMITER,
};

/// Canonical endpoint a migration moves mounts toward: either a DNS domain
/// resolved per connection (`remoteports=dns`), or a fixed IP endpoint range
/// spread across connections (`remoteports=<start>-<end>`, mounted via the
/// range start).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Endpoint {
    Domain(String),
    Range { start: String, end: String },
}

impl Endpoint {
    /// The host part used in mount sources and idempotence checks.
    #[must_use]
    pub fn host(&self) -> &str {
        match self {
            Endpoint::Domain(d) => d,
            Endpoint::Range { start, .. } => start,
        }
    }

    /// Value of the `remoteports=` option token for this endpoint form.
    #[must_use]
    pub fn remoteports(&self) -> String {
        match self {
            Endpoint::Domain(_) => "dns".to_string(),
            Endpoint::Range { start, end } => format!("{start}-{end}"),
        }
    }

    /// Canonical mount source for a volume, e.g.
    /// `nfs.example.com:/volumes/<id>`.
    #[must_use]
    pub fn source_for(&self, volume_id: &str) -> String {
        format!("{}{}{}", self.host(), VOLUME_DELIMITER, volume_id)
    }

    /// Addresses the reachability precheck must be able to ping. For a range
    /// both ends are probed, matching the behavior of the endpoint servers
    /// being distinct machines.
    #[must_use]
    pub fn ping_targets(&self) -> Vec<&str> {
        match self {
            Endpoint::Domain(d) => vec![d.as_str()],
            Endpoint::Range { start, end } => vec![start.as_str(), end.as_str()],
        }
    }
}

/// Per-command timeout budget. A timeout is treated identically to a command
/// failure: it fails the individual step, never the surrounding loop.
#[derive(Clone, Copy, Debug)]
pub struct Timeouts {
    /// Inventory and reachability queries.
    pub query: Duration,
    /// Remote connection establishment, distinct from the command timeout.
    pub connect: Duration,
    /// A single mount or unmount call.
    pub mount: Duration,
    /// A single verification probe command.
    pub probe: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            query: Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
            connect: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            mount: Duration::from_secs(DEFAULT_MOUNT_TIMEOUT_SECS),
            probe: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
        }
    }
}

/// Bounded retry applied to one mount call before declaring it a failure.
/// There is no retry loop across phases.
#[derive(Clone, Copy, Debug)]
pub struct Retry {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for Retry {
    fn default() -> Self {
        Self {
            attempts: MOUNT_RETRY_ATTEMPTS,
            backoff: Duration::from_millis(MOUNT_RETRY_BACKOFF_MS),
        }
    }
}

/// Configuration for a migration run.
#[derive(Clone, Debug)]
pub struct MigrateConfig {
    /// Target addressing scheme.
    pub endpoint: Endpoint,
    /// Filesystem type of managed mounts (`nfs` unless testing).
    pub managed_fs_type: String,
    /// Location of the persisted checkpoint document.
    pub checkpoint_path: PathBuf,
    /// Login identity for remote hosts; `None` uses the implicit default.
    pub ssh_user: Option<String>,
    pub timeouts: Timeouts,
    pub retry: Retry,
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::Domain(DEFAULT_NFS_DOMAIN.to_string()),
            managed_fs_type: MANAGED_FS_TYPE.to_string(),
            checkpoint_path: PathBuf::from(DEFAULT_CHECKPOINT_DIR).join(DEFAULT_CHECKPOINT_FILE),
            ssh_user: None,
            timeouts: Timeouts::default(),
            retry: Retry::default(),
        }
    }
}

impl MigrateConfig {
    /// Full canonical option string for the configured endpoint, e.g.
    /// `vers=3,nconnect=16,spread_reads,spread_writes,remoteports=dns`.
    #[must_use]
    pub fn canonical_options(&self) -> String {
        format!("{CANONICAL_OPTION_BASE},remoteports={}", self.endpoint.remoteports())
    }
}
