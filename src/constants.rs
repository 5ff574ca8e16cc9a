//! Shared crate-wide constants for mountshift.
//!
//! Centralizes magic values and default knobs used across modules.
//! Adjusting these here will propagate through the crate.

/// Delimiter marking the volume namespace inside a mount source string.
/// Sources have the shape `<address>:/volumes/<volume_id>`; anything that
/// does not contain this delimiter is outside our management scope.
pub const VOLUME_DELIMITER: &str = ":/volumes/";

/// Filesystem type of the mounts this crate manages.
pub const MANAGED_FS_TYPE: &str = "nfs";

/// Filesystem type of legacy virtio-transport mounts eligible for conversion.
pub const VIRTIOFS_FS_TYPE: &str = "virtiofs";

/// Default DNS endpoint that migrations move mounts toward.
pub const DEFAULT_NFS_DOMAIN: &str = "nfs.crusoecloudcompute.com";

/// Option tokens common to every canonical mount invocation. The
/// `remoteports=` token is appended per endpoint form (see `config::Endpoint`).
pub const CANONICAL_OPTION_BASE: &str = "vers=3,nconnect=16,spread_reads,spread_writes";

/// Option token that enables DNS-based endpoint resolution. Stripped from
/// recorded options before a rollback remount, since it only makes sense
/// against the canonical domain.
pub const DNS_RESOLUTION_TOKEN: &str = "remoteports=dns";

/// Prefix of systemd automount option tokens, also stripped on rollback.
pub const AUTOMOUNT_OPTION_PREFIX: &str = "x-systemd.";

/// Default location of the checkpoint file, relative to the working directory.
pub const DEFAULT_CHECKPOINT_DIR: &str = "./mountshift";
pub const DEFAULT_CHECKPOINT_FILE: &str = "mounts.json";

/// Default timeout in seconds for inventory and reachability queries.
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 5;

/// Default timeout in seconds for establishing a remote connection,
/// distinct from the per-command timeout.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default timeout in seconds for a single mount or unmount call.
pub const DEFAULT_MOUNT_TIMEOUT_SECS: u64 = 30;

/// Default timeout in seconds for a single verification probe command.
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 15;

/// Bounded retry count for one mount call before declaring it a failure.
pub const MOUNT_RETRY_ATTEMPTS: u32 = 5;

/// Backoff in milliseconds between mount retries.
pub const MOUNT_RETRY_BACKOFF_MS: u64 = 200;

/// Prefix for uniquely named write-probe files created by the verifier.
pub const PROBE_FILE_PREFIX: &str = ".mountshift-probe-";
