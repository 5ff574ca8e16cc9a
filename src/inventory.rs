//! Mount inventory collection: query a target for its live mounts of a
//! given filesystem type and decode them into structured records.
//!
//! An explicit empty listing is distinct from a collection error: `findmnt`
//! exits non-zero with no output when nothing matches the filter, and that
//! case is a successful empty inventory. Any other non-zero exit or a
//! timeout is a `Command` error the caller must not conflate with "zero
//! mounts".

use serde::Deserialize;

use crate::adapters::{CommandRunner, ExecError};
use crate::config::MigrateConfig;
use crate::types::{Error, MountRecord, RawMount, Result};

/// Typed schema for `findmnt --json` output.
#[derive(Debug, Deserialize)]
struct Listing {
    #[serde(default)]
    filesystems: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(default)]
    source: String,
    target: String,
    #[serde(default)]
    options: String,
}

/// List live mounts of `fs_type` without source validation.
pub fn collect_raw(
    runner: &dyn CommandRunner,
    cfg: &MigrateConfig,
    fs_type: &str,
) -> Result<Vec<RawMount>> {
    let command = format!("findmnt -t {fs_type} --json");
    let out = match runner.run(&command, cfg.timeouts.query) {
        Ok(out) => out,
        // findmnt reports "no matching mounts" as exit 1 with no output
        Err(ExecError::Exit {
            ref stdout,
            ref stderr,
            ..
        }) if stdout.is_empty() && stderr.is_empty() => return Ok(Vec::new()),
        Err(e) => return Err(Error::Command(format!("mount listing failed: {e}"))),
    };
    if out.is_empty() {
        return Ok(Vec::new());
    }

    let listing: Listing =
        serde_json::from_str(&out).map_err(|e| Error::Parse(e.to_string()))?;
    Ok(listing
        .filesystems
        .into_iter()
        .map(|e| RawMount {
            mount_point: e.target.into(),
            source: e.source,
            options: e.options,
        })
        .collect())
}

/// List live managed mounts, splitting each source into
/// `(source_address, volume_id)` on the volume-namespace delimiter.
///
/// Entries whose source is outside the volume namespace are excluded from
/// the model entirely: skipped with a warning, never stored, never fatal.
pub fn collect(runner: &dyn CommandRunner, cfg: &MigrateConfig) -> Result<Vec<MountRecord>> {
    let raw = collect_raw(runner, cfg, &cfg.managed_fs_type)?;
    let mut records = Vec::with_capacity(raw.len());
    for m in raw {
        match MountRecord::split_source(&m.source) {
            Some((address, volume_id)) => records.push(MountRecord {
                mount_point: m.mount_point,
                volume_id: volume_id.to_string(),
                source_address: address.to_string(),
                options: m.options,
            }),
            None => {
                log::warn!(
                    "skipping mount outside the volume namespace: {} on {}",
                    m.source,
                    m.mount_point.display()
                );
            }
        }
    }
    Ok(records)
}
