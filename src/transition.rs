//! Transition execution for one host: unmount, remount, rollback, and
//! virtiofs conversion over that host's recorded mount set.
//!
//! Failure policy is deliberately asymmetric: remount is best-effort (one
//! failure never blocks the rest of the set), while rollback's unmount
//! sequence is fail-fast (aborting on the first error avoids inconsistent
//! double-mount states). Within a single mount call a small bounded retry
//! with short backoff is applied before declaring that mount a failure.

use std::collections::HashSet;
use std::path::Path;

use crate::adapters::{shell_quote, CommandRunner};
use crate::config::MigrateConfig;
use crate::constants::{
    AUTOMOUNT_OPTION_PREFIX, DNS_RESOLUTION_TOKEN, MANAGED_FS_TYPE, VIRTIOFS_FS_TYPE,
};
use crate::types::{
    Error, HostMountState, ItemOutcome, MountRecord, Phase, PhaseReport, RawMount, Result,
};
use crate::volmap::VolumeMap;

pub struct TransitionExecutor<'a> {
    runner: &'a dyn CommandRunner,
    cfg: &'a MigrateConfig,
}

impl<'a> TransitionExecutor<'a> {
    #[must_use]
    pub fn new(runner: &'a dyn CommandRunner, cfg: &'a MigrateConfig) -> Self {
        Self { runner, cfg }
    }

    /// Recorded mounts not present in the live inventory, i.e. the set a
    /// remount still has to restore. Diffing is by mount point.
    #[must_use]
    pub fn pending<'s>(state: &'s HostMountState, live: &[MountRecord]) -> Vec<&'s MountRecord> {
        let live_points: HashSet<&Path> = live.iter().map(|m| m.mount_point.as_path()).collect();
        state
            .mounts
            .iter()
            .filter(|m| !live_points.contains(m.mount_point.as_path()))
            .collect()
    }

    /// Unmount every recorded mount. Each failure is recorded individually;
    /// the phase succeeds only if every unmount in the batch succeeded, but
    /// every command is attempted regardless.
    #[must_use]
    pub fn unmount(&self, state: &HostMountState) -> PhaseReport {
        let mut report = PhaseReport::begin(Phase::Unmount);
        for rec in &state.mounts {
            report.record(self.unmount_one(&rec.mount_point));
        }
        report.finish()
    }

    /// Remount recorded mounts using the canonical addressing scheme.
    ///
    /// Already-mounted entries are skipped as non-errors. The canonical
    /// endpoint must answer a reachability probe before any mount call is
    /// attempted; an unreachable endpoint fails the phase for this host
    /// immediately. Execution is best-effort across the remaining set.
    pub fn remount(&self, state: &HostMountState, live: &[MountRecord]) -> Result<PhaseReport> {
        let mut report = PhaseReport::begin(Phase::Remount);
        let pending = Self::pending(state, live);
        report.skipped = state.mounts.len() - pending.len();
        if pending.is_empty() {
            return Ok(report.finish());
        }

        self.check_endpoint_reachable()?;

        let options = self.cfg.canonical_options();
        for rec in pending {
            if let Err(e) = self.ensure_mount_point(&rec.mount_point) {
                report.record(ItemOutcome::failed(rec.mount_point.clone(), e));
                continue;
            }
            let source = self.cfg.endpoint.source_for(&rec.volume_id);
            let outcome = self.mount_with_retry(&source, &rec.mount_point, Some(&options));
            report.record(outcome);
        }
        Ok(report.finish())
    }

    /// Roll back to the originally recorded addressing.
    ///
    /// Currently live recorded mounts are unmounted first, in recorded
    /// order, aborting the remaining unmounts for this host on the first
    /// failure. Each recorded mount is then remounted with its original
    /// address and options, with canonical-scheme-only tokens stripped;
    /// empty recorded options fall back to a minimal typed mount.
    #[must_use]
    pub fn rollback(&self, state: &HostMountState, live: &[MountRecord]) -> PhaseReport {
        let mut report = PhaseReport::begin(Phase::Rollback);
        let live_points: HashSet<&Path> = live.iter().map(|m| m.mount_point.as_path()).collect();

        for rec in &state.mounts {
            if !live_points.contains(rec.mount_point.as_path()) {
                continue;
            }
            let outcome = self.unmount_one(&rec.mount_point);
            if outcome.error.is_some() {
                log::error!(
                    "rollback aborted at {}: unmount manually and retry",
                    rec.mount_point.display()
                );
                report.record(outcome);
                return report.finish_aborted();
            }
        }

        for rec in &state.mounts {
            if let Err(e) = self.ensure_mount_point(&rec.mount_point) {
                report.record(ItemOutcome::failed(rec.mount_point.clone(), e));
                continue;
            }
            let stripped = strip_rollback_options(&rec.options);
            let options = if stripped.is_empty() { None } else { Some(stripped.as_str()) };
            let outcome = self.mount_with_retry(&rec.source(), &rec.mount_point, options);
            report.record(outcome);
        }
        report.finish()
    }

    /// Convert live virtiofs mounts to managed NFS mounts.
    ///
    /// Best-effort per mount: an unmount failure triggers an attempt to put
    /// the virtiofs mount back before moving on, as does exhausting the NFS
    /// mount retries, so a half-converted host keeps its data reachable.
    pub fn convert(&self, live: &[RawMount], volumes: &VolumeMap) -> Result<PhaseReport> {
        let mut report = PhaseReport::begin(Phase::Convert);
        if live.is_empty() {
            return Ok(report.finish());
        }

        self.check_endpoint_reachable()?;

        let options = self.cfg.canonical_options();
        for m in live {
            let Some(volume_id) = volumes.get(&m.source) else {
                report.record(ItemOutcome::failed(
                    m.mount_point.clone(),
                    format!("no volume id for virtiofs tag '{}'", m.source),
                ));
                continue;
            };
            let unmounted = self.unmount_one(&m.mount_point);
            if let Some(err) = unmounted.error {
                self.restore_virtiofs(m);
                report.record(ItemOutcome::failed(
                    m.mount_point.clone(),
                    format!("unmount failed, is it in use? {err}"),
                ));
                continue;
            }
            let source = self.cfg.endpoint.source_for(volume_id);
            let outcome = self.mount_with_retry(&source, &m.mount_point, Some(&options));
            if outcome.error.is_some() {
                self.restore_virtiofs(m);
            }
            report.record(outcome);
        }
        Ok(report.finish())
    }

    /// Ping every canonical endpoint address before mounting against it.
    fn check_endpoint_reachable(&self) -> Result<()> {
        for target in self.cfg.endpoint.ping_targets() {
            let command = format!("ping -c 1 {target}");
            if let Err(e) = self.runner.run(&command, self.cfg.timeouts.query) {
                return Err(Error::Connectivity(format!("cannot reach {target}: {e}")));
            }
        }
        Ok(())
    }

    /// Idempotent mount-point directory creation.
    fn ensure_mount_point(&self, mount_point: &Path) -> std::result::Result<(), String> {
        let command = format!("sudo mkdir -p {}", shell_quote(&mount_point.display().to_string()));
        self.runner
            .run(&command, self.cfg.timeouts.query)
            .map(|_| ())
            .map_err(|e| format!("creating mount point failed: {e}"))
    }

    fn unmount_one(&self, mount_point: &Path) -> ItemOutcome {
        let command = format!("sudo umount {}", shell_quote(&mount_point.display().to_string()));
        match self.runner.run(&command, self.cfg.timeouts.mount) {
            Ok(_) => ItemOutcome::ok(mount_point.to_path_buf()),
            Err(e) => ItemOutcome::failed(mount_point.to_path_buf(), e.to_string()),
        }
    }

    /// One mount call under the bounded retry budget. `options: None` is the
    /// minimal fallback invocation `mount -t <fstype> <source> <point>`.
    fn mount_with_retry(
        &self,
        source: &str,
        mount_point: &Path,
        options: Option<&str>,
    ) -> ItemOutcome {
        let point = shell_quote(&mount_point.display().to_string());
        let command = match options {
            Some(opts) => format!("sudo mount -o {opts} {source} {point}"),
            None => format!("sudo mount -t {MANAGED_FS_TYPE} {source} {point}"),
        };
        let attempts = self.cfg.retry.attempts.max(1);
        let mut last_err = String::new();
        for attempt in 1..=attempts {
            match self.runner.run(&command, self.cfg.timeouts.mount) {
                Ok(_) => return ItemOutcome::ok(mount_point.to_path_buf()),
                Err(e) => {
                    last_err = e.to_string();
                    if attempt < attempts {
                        std::thread::sleep(self.cfg.retry.backoff);
                    }
                }
            }
        }
        ItemOutcome::failed(mount_point.to_path_buf(), last_err)
    }

    /// Best-effort re-mount of a virtiofs share after a failed conversion.
    fn restore_virtiofs(&self, m: &RawMount) {
        let command = format!(
            "sudo mount -t {VIRTIOFS_FS_TYPE} {} {}",
            shell_quote(&m.source),
            shell_quote(&m.mount_point.display().to_string()),
        );
        if let Err(e) = self.runner.run(&command, self.cfg.timeouts.mount) {
            log::error!(
                "could not restore virtiofs mount at {}: {e}",
                m.mount_point.display()
            );
        }
    }
}

/// Remove canonical-scheme-only tokens from a recorded option string before
/// a rollback remount: the DNS-resolution token exactly, and any systemd
/// automount token by prefix. All other tokens are preserved verbatim.
#[must_use]
pub fn strip_rollback_options(options: &str) -> String {
    options
        .split(',')
        .filter(|t| !t.is_empty() && *t != DNS_RESOLUTION_TOKEN && !t.starts_with(AUTOMOUNT_OPTION_PREFIX))
        .collect::<Vec<_>>()
        .join(",")
}
