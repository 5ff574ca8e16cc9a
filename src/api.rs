//! The `Migrator` facade: orchestrates collector, checkpoint store,
//! transition executor, and verifier into operator-invokable phases, and
//! wraps them in fleet fanout for multi-host runs.

use log::Level;
use serde_json::json;

use crate::adapters::{AutoConfirm, CommandRunner, Confirmer, SshRunner};
use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::config::MigrateConfig;
use crate::constants::VIRTIOFS_FS_TYPE;
use crate::fanout::{self, FleetReport, HostTarget};
use crate::fstab;
use crate::inventory;
use crate::logging::{AuditCtx, AuditSink, FactsEmitter, Stage, StageLogger};
use crate::transition::TransitionExecutor;
use crate::types::{
    Error, HostMountState, Phase, PhaseReport, Result, RewriteSummary,
};
use crate::verify::{self, HostProbeSummary, ProbeStatus};
use crate::volmap::VolumeMap;

pub struct Migrator<E: FactsEmitter, A: AuditSink> {
    facts: E,
    audit: A,
    cfg: MigrateConfig,
    confirm: Box<dyn Confirmer>,
}

impl<E: FactsEmitter, A: AuditSink> Migrator<E, A> {
    pub fn new(facts: E, audit: A, cfg: MigrateConfig) -> Self {
        Self {
            facts,
            audit,
            cfg,
            confirm: Box::new(AutoConfirm),
        }
    }

    #[must_use]
    pub fn with_confirmer(mut self, confirm: Box<dyn Confirmer>) -> Self {
        self.confirm = confirm;
        self
    }

    #[must_use]
    pub fn config(&self) -> &MigrateConfig {
        &self.cfg
    }

    fn store(&self) -> CheckpointStore {
        CheckpointStore::new(self.cfg.checkpoint_path.clone())
    }

    fn confirm_or_cancel(&self, action: &str) -> Result<()> {
        if self.confirm.confirm(action) {
            Ok(())
        } else {
            self.audit.log(Level::Warn, "operation canceled by operator");
            Err(Error::Canceled)
        }
    }

    /// Emit per-failure facts and a summary fact for a finished phase.
    fn emit_phase(&self, ctx: &AuditCtx, stage: Stage, report: &PhaseReport) {
        let slog = StageLogger::new(ctx);
        for item in report.items.iter().filter(|i| i.error.is_some()) {
            slog.stage(stage)
                .mount_point(item.mount_point.display().to_string())
                .field("error", json!(item.error))
                .emit_failure();
        }
        let summary = slog
            .stage(stage)
            .field("attempted", json!(report.attempted()))
            .field("succeeded", json!(report.succeeded()))
            .field("failed", json!(report.failed()))
            .field("skipped", json!(report.skipped));
        if report.is_success() {
            summary.emit_success();
        } else {
            summary.emit_failure();
        }
        self.audit.log(
            Level::Info,
            &format!("{}: {}", report.phase.as_str(), report.tally()),
        );
    }

    /// Capture phase: record this host's live managed mounts into the
    /// checkpoint, then unmount them all.
    ///
    /// Collecting zero mounts while a prior checkpoint entry holds state is
    /// treated as a transient failure: the entry is preserved and nothing is
    /// unmounted.
    pub fn capture(&self, runner: &dyn CommandRunner, host: &HostTarget) -> Result<PhaseReport> {
        let ctx = AuditCtx::new(&self.facts, host.host_id.clone());
        let mounts = inventory::collect(runner, &self.cfg)?;
        let store = self.store();
        let mut checkpoint = match store.load() {
            Ok(cp) => cp,
            Err(Error::State(_)) => Checkpoint::default(),
            Err(e) => return Err(e),
        };

        if mounts.is_empty() {
            let prior = checkpoint.host(&host.host_id).map_or(0, |h| h.mounts.len());
            if prior > 0 {
                self.audit.log(
                    Level::Warn,
                    &format!(
                        "{}: no mounts found; existing checkpoint entry ({prior} mount(s)) preserved",
                        host.host_id
                    ),
                );
                StageLogger::new(&ctx)
                    .stage(Stage::Capture)
                    .field("preserved", json!(prior))
                    .emit_warn();
                return Ok(PhaseReport::begin(Phase::Capture).finish());
            }
        }

        if !mounts.is_empty() {
            self.confirm_or_cancel(&format!(
                "This will unmount {} mount(s) on {}.",
                mounts.len(),
                host.host_id
            ))?;
        }

        let state = HostMountState {
            host_id: host.host_id.clone(),
            host_address: host.address.clone(),
            mounts,
        };
        checkpoint.hosts.insert(host.host_id.clone(), state.clone());
        store.save(&checkpoint)?;
        self.audit.log(
            Level::Info,
            &format!(
                "{}: recorded {} mount(s) in {}",
                host.host_id,
                state.mounts.len(),
                store.path().display()
            ),
        );
        StageLogger::new(&ctx)
            .stage(Stage::Capture)
            .field("recorded", json!(state.mounts.len()))
            .emit_success();

        if state.mounts.is_empty() {
            return Ok(PhaseReport::begin(Phase::Unmount).finish());
        }
        let report = TransitionExecutor::new(runner, &self.cfg).unmount(&state);
        self.emit_phase(&ctx, Stage::Unmount, &report);
        Ok(report)
    }

    /// Remount phase: restore this host's recorded mounts using the
    /// canonical addressing scheme. Requires a prior capture.
    pub fn remount(&self, runner: &dyn CommandRunner, host: &HostTarget) -> Result<PhaseReport> {
        let ctx = AuditCtx::new(&self.facts, host.host_id.clone());
        let state = self.recorded_state(&host.host_id)?;
        if state.mounts.is_empty() {
            return Ok(PhaseReport::begin(Phase::Remount).finish());
        }

        let live = self.live_or_empty(runner, &host.host_id);
        let pending = TransitionExecutor::pending(&state, &live);
        if pending.is_empty() {
            self.audit.log(
                Level::Info,
                &format!("{}: all recorded volumes are already mounted", host.host_id),
            );
            let mut report = PhaseReport::begin(Phase::Remount);
            report.skipped = state.mounts.len();
            return Ok(report.finish());
        }
        self.confirm_or_cancel(&format!(
            "This will remount {} volume(s) on {} via {}.",
            pending.len(),
            host.host_id,
            self.cfg.endpoint.host()
        ))?;

        let report = TransitionExecutor::new(runner, &self.cfg).remount(&state, &live)?;
        self.emit_phase(&ctx, Stage::Remount, &report);
        Ok(report)
    }

    /// Rollback phase: return this host to the originally recorded
    /// addressing using the checkpoint. Requires a prior capture.
    pub fn rollback(&self, runner: &dyn CommandRunner, host: &HostTarget) -> Result<PhaseReport> {
        let ctx = AuditCtx::new(&self.facts, host.host_id.clone());
        let state = self.recorded_state(&host.host_id)?;
        if state.mounts.is_empty() {
            return Ok(PhaseReport::begin(Phase::Rollback).finish());
        }

        let live = self.live_or_empty(runner, &host.host_id);
        self.confirm_or_cancel(&format!(
            "This will roll back {} volume(s) on {} to their recorded addresses.",
            state.mounts.len(),
            host.host_id
        ))?;

        let report = TransitionExecutor::new(runner, &self.cfg).rollback(&state, &live);
        self.emit_phase(&ctx, Stage::Rollback, &report);
        Ok(report)
    }

    /// Conversion phase: move this host's live virtiofs mounts onto managed
    /// NFS mounts, resolving share tags through the volume map.
    pub fn convert(
        &self,
        runner: &dyn CommandRunner,
        host: &HostTarget,
        volumes: &VolumeMap,
    ) -> Result<PhaseReport> {
        let ctx = AuditCtx::new(&self.facts, host.host_id.clone());
        let live = inventory::collect_raw(runner, &self.cfg, VIRTIOFS_FS_TYPE)?;
        if live.is_empty() {
            self.audit.log(
                Level::Info,
                &format!("{}: no virtiofs mounts to convert", host.host_id),
            );
            return Ok(PhaseReport::begin(Phase::Convert).finish());
        }
        self.confirm_or_cancel(&format!(
            "This will convert {} virtiofs mount(s) on {} to NFS.",
            live.len(),
            host.host_id
        ))?;

        let report = TransitionExecutor::new(runner, &self.cfg).convert(&live, volumes)?;
        self.emit_phase(&ctx, Stage::Convert, &report);
        Ok(report)
    }

    /// Rewrite this host's persisted mount configuration to the canonical
    /// scheme and swap it into place.
    pub fn rewrite_fstab(
        &self,
        runner: &dyn CommandRunner,
        host: &HostTarget,
    ) -> Result<RewriteSummary> {
        let text = self.read_fstab(runner)?;
        let outcome = fstab::rewrite(&text, &self.cfg);
        self.apply_rewrite(runner, host, outcome)
    }

    /// Rewrite this host's virtiofs configuration entries to managed NFS
    /// entries and swap the file into place.
    pub fn rewrite_fstab_virtiofs(
        &self,
        runner: &dyn CommandRunner,
        host: &HostTarget,
        volumes: &VolumeMap,
    ) -> Result<RewriteSummary> {
        let text = self.read_fstab(runner)?;
        let outcome = fstab::rewrite_virtiofs(&text, volumes, &self.cfg);
        self.apply_rewrite(runner, host, outcome)
    }

    /// Verification phase: probe every live managed mount on this host.
    #[must_use]
    pub fn verify(&self, runner: &dyn CommandRunner, host: &HostTarget) -> HostProbeSummary {
        let ctx = AuditCtx::new(&self.facts, host.host_id.clone());
        let summary = verify::probe_host(runner, &self.cfg, &host.host_id);
        let slog = StageLogger::new(&ctx);
        match &summary.status {
            ProbeStatus::Error(e) => {
                slog.stage(Stage::Verify).field("error", json!(e)).emit_failure();
            }
            ProbeStatus::Probed(probes) => {
                let builder = slog
                    .stage(Stage::Verify)
                    .field("mounts", json!(probes.len()))
                    .field(
                        "read_ok",
                        json!(probes.iter().filter(|p| p.read_ok).count()),
                    )
                    .field(
                        "write_ok",
                        json!(probes.iter().filter(|p| p.write_ok).count()),
                    );
                if summary.is_healthy() {
                    builder.emit_success();
                } else {
                    builder.emit_failure();
                }
            }
        }
        summary
    }

    /// Apply the capture phase across a fleet, isolating per-host failures.
    pub fn fleet_capture(&self, hosts: &[HostTarget]) -> FleetReport {
        self.fleet_phase(Phase::Capture, hosts, |runner, host| self.capture(runner, host))
    }

    pub fn fleet_remount(&self, hosts: &[HostTarget]) -> FleetReport {
        self.fleet_phase(Phase::Remount, hosts, |runner, host| self.remount(runner, host))
    }

    pub fn fleet_rollback(&self, hosts: &[HostTarget]) -> FleetReport {
        self.fleet_phase(Phase::Rollback, hosts, |runner, host| self.rollback(runner, host))
    }

    pub fn fleet_convert(&self, hosts: &[HostTarget], volumes: &VolumeMap) -> FleetReport {
        self.fleet_phase(Phase::Convert, hosts, |runner, host| {
            self.convert(runner, host, volumes)
        })
    }

    /// Probe every host and render the consolidated fixed-column report.
    pub fn fleet_verify(&self, hosts: &[HostTarget]) -> (Vec<HostProbeSummary>, String) {
        let summaries: Vec<HostProbeSummary> = hosts
            .iter()
            .map(|host| {
                let runner = self.runner_for(host);
                self.verify(&runner, host)
            })
            .collect();
        let rendered = verify::render_report(&summaries);
        let healthy = summaries.iter().filter(|s| s.is_healthy()).count();
        self.audit.log(
            Level::Info,
            &format!("verify: {healthy}/{} hosts healthy", summaries.len()),
        );
        (summaries, rendered)
    }

    fn fleet_phase<F>(&self, phase: Phase, hosts: &[HostTarget], phase_fn: F) -> FleetReport
    where
        F: Fn(&dyn CommandRunner, &HostTarget) -> Result<PhaseReport>,
    {
        let report = fanout::run_phase(phase, hosts, |host| {
            let runner = self.runner_for(host);
            phase_fn(&runner, host)
        });
        let ctx = AuditCtx::new(&self.facts, "fleet");
        let builder = StageLogger::new(&ctx)
            .stage(Stage::FleetSummary)
            .field("phase", json!(phase.as_str()))
            .field("hosts", json!(report.outcomes.len()))
            .field("succeeded", json!(report.succeeded()))
            .field("failed", json!(report.failed()));
        if report.is_success() {
            builder.emit_success();
        } else {
            builder.emit_failure();
        }
        self.audit
            .log(Level::Info, &format!("{}: {}", phase.as_str(), report.tally()));
        report
    }

    fn runner_for(&self, host: &HostTarget) -> SshRunner {
        let runner = SshRunner::new(host.address.clone(), self.cfg.timeouts.connect);
        match &self.cfg.ssh_user {
            Some(user) => runner.with_user(user.clone()),
            None => runner,
        }
    }

    fn recorded_state(&self, host_id: &str) -> Result<HostMountState> {
        let checkpoint = self.store().load()?;
        checkpoint.host(host_id).cloned().ok_or_else(|| {
            Error::State(format!(
                "no recorded mounts for host {host_id}; run the capture phase first"
            ))
        })
    }

    /// Live inventory, degraded to empty on collection failure so a remount
    /// or rollback can still proceed against the recorded set.
    fn live_or_empty(&self, runner: &dyn CommandRunner, host_id: &str) -> Vec<crate::types::MountRecord> {
        match inventory::collect(runner, &self.cfg) {
            Ok(live) => live,
            Err(e) => {
                self.audit.log(
                    Level::Warn,
                    &format!("{host_id}: live inventory unavailable ({e}); assuming none"),
                );
                Vec::new()
            }
        }
    }

    fn read_fstab(&self, runner: &dyn CommandRunner) -> Result<String> {
        runner
            .run("cat /etc/fstab", self.cfg.timeouts.query)
            .map_err(|e| Error::Command(format!("reading /etc/fstab failed: {e}")))
    }

    /// Swap rewritten configuration into place as two discrete, recorded
    /// steps: stage the new text under /tmp, then copy it over /etc/fstab.
    fn apply_rewrite(
        &self,
        runner: &dyn CommandRunner,
        host: &HostTarget,
        outcome: fstab::RewriteOutcome,
    ) -> Result<RewriteSummary> {
        let ctx = AuditCtx::new(&self.facts, host.host_id.clone());
        if outcome.changed == 0 {
            self.audit.log(
                Level::Info,
                &format!("{}: no fstab entries need migration", host.host_id),
            );
            return Ok(RewriteSummary {
                changed: 0,
                applied: false,
            });
        }
        self.confirm_or_cancel(&format!(
            "This will update {} fstab entr{} on {}.",
            outcome.changed,
            if outcome.changed == 1 { "y" } else { "ies" },
            host.host_id
        ))?;

        let mut text = outcome.text;
        if !text.ends_with('\n') {
            text.push('\n');
        }
        let staged = "/tmp/fstab.mountshift";
        runner
            .run(
                &format!("printf '%s' {} > {staged}", crate::adapters::shell_quote(&text)),
                self.cfg.timeouts.query,
            )
            .map_err(|e| Error::Command(format!("staging new fstab failed: {e}")))?;
        runner
            .run(&format!("sudo cp {staged} /etc/fstab"), self.cfg.timeouts.query)
            .map_err(|e| Error::Command(format!("installing new fstab failed: {e}")))?;

        StageLogger::new(&ctx)
            .stage(Stage::Rewrite)
            .field("changed", json!(outcome.changed))
            .emit_success();
        self.audit.log(
            Level::Info,
            &format!("{}: updated {} fstab entr{}", host.host_id, outcome.changed,
                if outcome.changed == 1 { "y" } else { "ies" }),
        );
        Ok(RewriteSummary {
            changed: outcome.changed,
            applied: true,
        })
    }
}
