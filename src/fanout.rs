//! Fleet fanout: apply one phase across a set of hosts with per-host
//! failure isolation.
//!
//! Hosts are processed sequentially and independently; no state is shared
//! between them, so a failure (including total unreachability) on one host
//! never prevents the remaining hosts from being processed. Outcomes are
//! merged only at this aggregation boundary.

use crate::types::{Phase, PhaseReport, Result};

/// One target host: an identifier for reporting and the address commands
/// are executed against. Which hosts to target is decided by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostTarget {
    pub host_id: String,
    pub address: String,
}

impl HostTarget {
    #[must_use]
    pub fn new(host_id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            host_id: host_id.into(),
            address: address.into(),
        }
    }
}

/// Outcome of one phase on one host: either a phase report (which may itself
/// record partial failure) or the host-level error that prevented the phase
/// from producing one.
#[derive(Debug, Clone)]
pub struct HostOutcome {
    pub host_id: String,
    pub result: std::result::Result<PhaseReport, String>,
}

impl HostOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(&self.result, Ok(r) if r.is_success())
    }
}

/// Aggregate of one phase across the fleet.
#[derive(Debug, Clone)]
pub struct FleetReport {
    pub phase: Phase,
    pub outcomes: Vec<HostOutcome>,
}

impl FleetReport {
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// Final numeric tally, e.g. `3/4 hosts succeeded`.
    #[must_use]
    pub fn tally(&self) -> String {
        format!("{}/{} hosts succeeded", self.succeeded(), self.outcomes.len())
    }
}

/// Apply `phase_fn` to each host in turn, isolating per-host failures.
pub fn run_phase<F>(phase: Phase, hosts: &[HostTarget], mut phase_fn: F) -> FleetReport
where
    F: FnMut(&HostTarget) -> Result<PhaseReport>,
{
    let mut outcomes = Vec::with_capacity(hosts.len());
    for host in hosts {
        let result = match phase_fn(host) {
            Ok(report) => Ok(report),
            Err(e) => {
                log::error!("{}: {} phase failed: {e}", host.host_id, phase.as_str());
                Err(e.to_string())
            }
        };
        outcomes.push(HostOutcome {
            host_id: host.host_id.clone(),
            result,
        });
    }
    FleetReport { phase, outcomes }
}
