//! Error taxonomy used across mountshift.
//!
//! Each variant carries a distinct failure policy:
//! - `Connectivity` is fatal for that host or step only; fleet processing continues.
//! - `Command` is reported per item; it aborts a fail-fast sequence (rollback's
//!   unmount step) but not a best-effort one (remount).
//! - `Parse` is fatal for the current collection step on that host.
//! - `State` is fatal for the whole invocation (e.g. checkpoint absent).
//! - `Validation` marks a single skipped record or a rejected input.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("host or endpoint unreachable: {0}")]
    Connectivity(String),

    #[error("command failed: {0}")]
    Command(String),

    #[error("could not decode mount listing: {0}")]
    Parse(String),

    #[error("{0}")]
    State(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("operation canceled by operator")]
    Canceled,

    #[error("checkpoint io: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenient alias for results returning a `types::Error`.
pub type Result<T> = std::result::Result<T, Error>;
