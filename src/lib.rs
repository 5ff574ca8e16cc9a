#![forbid(unsafe_code)]
//! mountshift: checkpointed migration of network-filesystem mounts between
//! addressing schemes, with deterministic rollback.
//!
//! The crate records a host's current managed mounts into a checkpoint,
//! transitions the host to the canonical addressing scheme (DNS endpoint or
//! IP endpoint range), and can reverse the transition from the checkpoint.
//! Multi-host runs apply each phase per host with failure isolation.
//!
//! Design highlights:
//! - Every remote or local operation goes through the `CommandRunner`
//!   adapter as a blocking call bound by an explicit timeout.
//! - The checkpoint is never auto-deleted and an empty collection never
//!   overwrites a prior checkpoint, so rollback capability survives
//!   transient collection failures.
//! - Remount is best-effort across a host's mount set; rollback's unmount
//!   sequence is fail-fast. The asymmetry is intentional.

pub mod adapters;
pub mod api;
pub mod checkpoint;
pub mod config;
pub mod constants;
pub mod fanout;
pub mod fstab;
pub mod inventory;
pub mod logging;
pub mod transition;
pub mod types;
pub mod verify;
pub mod volmap;

pub use api::Migrator;
pub use config::{Endpoint, MigrateConfig};
pub use fanout::HostTarget;
