//! Transition executor phase semantics: best-effort remount, fail-fast
//! rollback unmount, reachability gating, and option-set handling.

mod common;

use std::path::PathBuf;

use common::{exit_err, test_config, ScriptedRunner};
use mountshift::transition::TransitionExecutor;
use mountshift::types::{Error, HostMountState, MountRecord, PhaseState};

fn record(mp: &str, vol: &str, addr: &str, opts: &str) -> MountRecord {
    MountRecord {
        mount_point: PathBuf::from(mp),
        volume_id: vol.to_string(),
        source_address: addr.to_string(),
        options: opts.to_string(),
    }
}

fn host_state(mounts: Vec<MountRecord>) -> HostMountState {
    HostMountState {
        host_id: "host-a".into(),
        host_address: "192.168.1.10".into(),
        mounts,
    }
}

#[test]
fn remount_skips_already_mounted_entries() {
    let td = tempfile::tempdir().unwrap();
    let cfg = test_config(td.path());
    let state = host_state(vec![
        record("/data", "abc", "10.0.0.5", "vers=3"),
        record("/scratch", "def", "10.0.0.6", "vers=3"),
    ]);
    let live = vec![record(
        "/data",
        "abc",
        "nfs.crusoecloudcompute.com",
        "vers=3",
    )];

    let runner = ScriptedRunner::new();
    let report = TransitionExecutor::new(&runner, &cfg)
        .remount(&state, &live)
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.skipped, 1);
    let mounts = runner.calls_matching("sudo mount");
    assert_eq!(mounts.len(), 1);
    assert!(mounts[0].contains(":/volumes/def"));
    assert!(!mounts[0].contains(":/volumes/abc"));
}

#[test]
fn remount_with_everything_live_succeeds_without_commands() {
    let td = tempfile::tempdir().unwrap();
    let cfg = test_config(td.path());
    let state = host_state(vec![record("/data", "abc", "10.0.0.5", "vers=3")]);
    let live = vec![record("/data", "abc", "nfs.crusoecloudcompute.com", "")];

    let runner = ScriptedRunner::new();
    let report = TransitionExecutor::new(&runner, &cfg)
        .remount(&state, &live)
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.skipped, 1);
    assert_eq!(report.attempted(), 0);
    assert!(runner.calls().is_empty(), "no commands for a no-op remount");
}

#[test]
fn unreachable_endpoint_fails_before_any_mount_call() {
    let td = tempfile::tempdir().unwrap();
    let cfg = test_config(td.path());
    let state = host_state(vec![record("/data", "abc", "10.0.0.5", "vers=3")]);

    let runner = ScriptedRunner::new().on("ping", exit_err(1, "unknown host"));
    let err = TransitionExecutor::new(&runner, &cfg)
        .remount(&state, &[])
        .unwrap_err();

    assert!(matches!(err, Error::Connectivity(_)));
    assert!(runner.calls_matching("sudo mount").is_empty());
}

#[test]
fn remount_retries_one_mount_within_the_bounded_budget() {
    let td = tempfile::tempdir().unwrap();
    let cfg = test_config(td.path());
    let state = host_state(vec![record("/data", "abc", "10.0.0.5", "vers=3")]);

    let runner = ScriptedRunner::new()
        .on("sudo mount", exit_err(32, "mount.nfs: Connection refused"))
        .on("sudo mount", exit_err(32, "mount.nfs: Connection refused"))
        .on("sudo mount", Ok(String::new()));
    let report = TransitionExecutor::new(&runner, &cfg)
        .remount(&state, &[])
        .unwrap();

    assert!(report.is_success());
    assert_eq!(runner.calls_matching("sudo mount").len(), 3);
}

#[test]
fn remount_is_best_effort_across_the_set() {
    let td = tempfile::tempdir().unwrap();
    let mut cfg = test_config(td.path());
    cfg.retry.attempts = 1;
    let state = host_state(vec![
        record("/data", "abc", "10.0.0.5", "vers=3"),
        record("/scratch", "def", "10.0.0.6", "vers=3"),
    ]);

    // First mount fails, second succeeds; both must be attempted.
    let runner = ScriptedRunner::new()
        .on("sudo mount", exit_err(32, "mount.nfs: access denied"))
        .on("sudo mount", Ok(String::new()));
    let report = TransitionExecutor::new(&runner, &cfg)
        .remount(&state, &[])
        .unwrap();

    assert_eq!(report.state, PhaseState::PartiallyFailed);
    assert_eq!(report.tally(), "1/2 succeeded");
    assert_eq!(runner.calls_matching("sudo mount").len(), 2);
}

#[test]
fn unmount_attempts_every_mount_despite_failures() {
    let td = tempfile::tempdir().unwrap();
    let cfg = test_config(td.path());
    let state = host_state(vec![
        record("/data", "abc", "10.0.0.5", "vers=3"),
        record("/scratch", "def", "10.0.0.6", "vers=3"),
    ]);

    let runner = ScriptedRunner::new()
        .on("sudo umount", exit_err(32, "target is busy"))
        .on("sudo umount", Ok(String::new()));
    let report = TransitionExecutor::new(&runner, &cfg).unmount(&state);

    assert_eq!(runner.calls_matching("sudo umount").len(), 2);
    assert_eq!(report.state, PhaseState::PartiallyFailed);
    assert!(!report.is_success(), "phase succeeds only if all unmounts do");
}

#[test]
fn rollback_unmount_aborts_on_first_failure() {
    let td = tempfile::tempdir().unwrap();
    let cfg = test_config(td.path());
    let state = host_state(vec![
        record("/data", "abc", "10.0.0.5", "vers=3"),
        record("/scratch", "def", "10.0.0.6", "vers=3"),
    ]);
    let live = state.mounts.clone();

    let runner = ScriptedRunner::new().on("sudo umount", exit_err(32, "target is busy"));
    let report = TransitionExecutor::new(&runner, &cfg).rollback(&state, &live);

    assert_eq!(report.state, PhaseState::Failed);
    // fail-fast: the second unmount and all remounts are never attempted
    assert_eq!(runner.calls_matching("sudo umount").len(), 1);
    assert!(runner.calls_matching("sudo mount").is_empty());
}

#[test]
fn rollback_strips_canonical_tokens_and_keeps_the_rest() {
    let td = tempfile::tempdir().unwrap();
    let cfg = test_config(td.path());
    let state = host_state(vec![record(
        "/data",
        "abc",
        "10.0.0.5",
        "vers=3,remoteports=dns,x-systemd.automount,rw",
    )]);

    let runner = ScriptedRunner::new();
    let report = TransitionExecutor::new(&runner, &cfg).rollback(&state, &[]);

    assert!(report.is_success());
    let mounts = runner.calls_matching("sudo mount");
    assert_eq!(mounts.len(), 1);
    assert!(mounts[0].contains("-o vers=3,rw "), "got: {}", mounts[0]);
    assert!(mounts[0].contains("10.0.0.5:/volumes/abc"));
    assert!(!mounts[0].contains("remoteports=dns"));
    assert!(!mounts[0].contains("x-systemd."));
}

#[test]
fn rollback_with_empty_options_uses_the_minimal_invocation() {
    let td = tempfile::tempdir().unwrap();
    let cfg = test_config(td.path());
    let state = host_state(vec![record("/data", "abc", "10.0.0.5", "")]);

    let runner = ScriptedRunner::new();
    let report = TransitionExecutor::new(&runner, &cfg).rollback(&state, &[]);

    assert!(report.is_success());
    let mounts = runner.calls_matching("sudo mount");
    assert_eq!(mounts.len(), 1);
    assert!(mounts[0].contains("-t nfs 10.0.0.5:/volumes/abc"), "got: {}", mounts[0]);
    assert!(!mounts[0].contains("-o "));
}
