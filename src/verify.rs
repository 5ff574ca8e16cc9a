//! Post-migration verification: bounded-time read and write liveness probes
//! against every live managed mount, per host.
//!
//! An unreachable host is a distinct `ERROR` row; it is never conflated
//! with a host that is reachable and simply has zero managed mounts.

use std::fmt::Write as _;
use std::path::PathBuf;

use uuid::Uuid;

use crate::adapters::{shell_quote, CommandRunner};
use crate::config::MigrateConfig;
use crate::constants::PROBE_FILE_PREFIX;
use crate::inventory;

/// Probe results for one mount point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountProbe {
    pub mount_point: PathBuf,
    pub read_ok: bool,
    pub write_ok: bool,
}

/// Per-host verification status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeStatus {
    /// The host could not be reached or its inventory could not be read.
    Error(String),
    /// Probe results for every live managed mount (possibly zero).
    Probed(Vec<MountProbe>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostProbeSummary {
    pub host_id: String,
    pub status: ProbeStatus,
}

impl HostProbeSummary {
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        match &self.status {
            ProbeStatus::Error(_) => false,
            ProbeStatus::Probed(probes) => probes.iter().all(|p| p.read_ok && p.write_ok),
        }
    }

    /// Compact per-mount status, e.g. `/data[r+w+],/scratch[r+w-]`.
    #[must_use]
    fn detail(&self) -> String {
        match &self.status {
            ProbeStatus::Error(e) => e.clone(),
            ProbeStatus::Probed(probes) => {
                let mut out = String::new();
                for (i, p) in probes.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    let _ = write!(
                        out,
                        "{}[r{}w{}]",
                        p.mount_point.display(),
                        if p.read_ok { '+' } else { '-' },
                        if p.write_ok { '+' } else { '-' },
                    );
                }
                out
            }
        }
    }
}

/// Probe one host: reachability first, then one read and one write probe per
/// live managed mount, each command under its own timeout.
#[must_use]
pub fn probe_host(
    runner: &dyn CommandRunner,
    cfg: &MigrateConfig,
    host_id: &str,
) -> HostProbeSummary {
    if let Err(e) = runner.run("true", cfg.timeouts.query) {
        return HostProbeSummary {
            host_id: host_id.to_string(),
            status: ProbeStatus::Error(format!("unreachable: {e}")),
        };
    }

    let mounts = match inventory::collect_raw(runner, cfg, &cfg.managed_fs_type) {
        Ok(mounts) => mounts,
        Err(e) => {
            return HostProbeSummary {
                host_id: host_id.to_string(),
                status: ProbeStatus::Error(e.to_string()),
            }
        }
    };

    let probes = mounts
        .iter()
        .map(|m| {
            let point = m.mount_point.display().to_string();
            let read_ok = runner
                .run(&format!("ls {}", shell_quote(&point)), cfg.timeouts.probe)
                .is_ok();

            // Uniquely named per attempt so concurrent probes cannot collide.
            let probe_file = format!("{point}/{PROBE_FILE_PREFIX}{}", Uuid::new_v4());
            let created = runner
                .run(&format!("touch {}", shell_quote(&probe_file)), cfg.timeouts.probe)
                .is_ok();
            let write_ok = created
                && runner
                    .run(&format!("rm -f {}", shell_quote(&probe_file)), cfg.timeouts.probe)
                    .is_ok();

            MountProbe {
                mount_point: m.mount_point.clone(),
                read_ok,
                write_ok,
            }
        })
        .collect();

    HostProbeSummary {
        host_id: host_id.to_string(),
        status: ProbeStatus::Probed(probes),
    }
}

/// Render one fixed-column row per host, with an `ERROR` sentinel in the
/// COUNT column for hosts that could not be probed.
#[must_use]
pub fn render_report(summaries: &[HostProbeSummary]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<24} {:>6} {:>6} {:>6}  {}",
        "HOST", "COUNT", "READ", "WRITE", "MOUNT_POINTS"
    );
    for s in summaries {
        match &s.status {
            ProbeStatus::Error(_) => {
                let _ = writeln!(
                    out,
                    "{:<24} {:>6} {:>6} {:>6}  {}",
                    s.host_id,
                    "ERROR",
                    "-",
                    "-",
                    s.detail()
                );
            }
            ProbeStatus::Probed(probes) => {
                let read_ok = probes.iter().filter(|p| p.read_ok).count();
                let write_ok = probes.iter().filter(|p| p.write_ok).count();
                let _ = writeln!(
                    out,
                    "{:<24} {:>6} {:>6} {:>6}  {}",
                    s.host_id,
                    probes.len(),
                    read_ok,
                    write_ok,
                    s.detail()
                );
            }
        }
    }
    out
}
