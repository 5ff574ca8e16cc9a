//! Fleet fanout: a failing host never prevents the remaining hosts from
//! being processed, and aggregation is purely additive.

mod common;

use std::path::PathBuf;

use mountshift::fanout::{run_phase, HostTarget};
use mountshift::types::{Error, ItemOutcome, Phase, PhaseReport};

fn hosts() -> Vec<HostTarget> {
    vec![
        HostTarget::new("host-a", "192.168.1.10"),
        HostTarget::new("host-b", "192.168.1.11"),
    ]
}

fn successful_report() -> PhaseReport {
    let mut report = PhaseReport::begin(Phase::Remount);
    report.record(ItemOutcome::ok(PathBuf::from("/data")));
    report.finish()
}

#[test]
fn host_level_error_does_not_stop_the_fleet() {
    let mut visited = Vec::new();
    let report = run_phase(Phase::Remount, &hosts(), |host| {
        visited.push(host.host_id.clone());
        if host.host_id == "host-a" {
            Err(Error::Connectivity("endpoint unreachable".into()))
        } else {
            Ok(successful_report())
        }
    });

    assert_eq!(visited, vec!["host-a", "host-b"]);
    assert_eq!(report.tally(), "1/2 hosts succeeded");
    assert!(!report.is_success());

    let a = &report.outcomes[0];
    assert_eq!(a.host_id, "host-a");
    assert!(a.result.as_ref().unwrap_err().contains("unreachable"));
    assert!(report.outcomes[1].is_success());
}

#[test]
fn partially_failed_report_counts_as_a_failed_host() {
    let report = run_phase(Phase::Unmount, &hosts(), |host| {
        let mut r = PhaseReport::begin(Phase::Unmount);
        if host.host_id == "host-a" {
            r.record(ItemOutcome::failed(
                PathBuf::from("/data"),
                "target is busy",
            ));
        }
        r.record(ItemOutcome::ok(PathBuf::from("/scratch")));
        Ok(r.finish())
    });

    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.tally(), "1/2 hosts succeeded");
}

#[test]
fn all_hosts_succeeding_yields_a_clean_fleet_report() {
    let report = run_phase(Phase::Rollback, &hosts(), |_| Ok(successful_report()));
    assert!(report.is_success());
    assert_eq!(report.tally(), "2/2 hosts succeeded");
}
