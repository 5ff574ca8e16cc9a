//! Configuration rewriter properties: idempotence and byte-exact
//! preservation of everything outside the managed entries.

use mountshift::constants::CANONICAL_OPTION_BASE;
use mountshift::fstab;
use mountshift::MigrateConfig;

const FSTAB: &str = "\
# /etc/fstab: static file system information.
UUID=0a3407de-014b-458b-b5c1-848e92a327a3 / ext4 errors=remount-ro 0 1

10.0.0.5:/volumes/vol1 /data nfs vers=3,nconnect=16 0 0
nfs.crusoecloudcompute.com:/volumes/vol2 /scratch nfs vers=3,nconnect=16,spread_reads,spread_writes,remoteports=dns 0 0
tank:/export/home /home nfs rw 0 0
short line
";

#[test]
fn changes_exactly_the_legacy_managed_line() {
    let cfg = MigrateConfig::default();
    let out = fstab::rewrite(FSTAB, &cfg);
    assert_eq!(out.changed, 1);

    let before: Vec<&str> = FSTAB.split('\n').collect();
    let after: Vec<&str> = out.text.split('\n').collect();
    assert_eq!(before.len(), after.len());
    for (i, (b, a)) in before.iter().zip(&after).enumerate() {
        if i == 3 {
            assert_eq!(
                *a,
                format!(
                    "nfs.crusoecloudcompute.com:/volumes/vol1 /data nfs {CANONICAL_OPTION_BASE},remoteports=dns 0 0"
                )
            );
        } else {
            assert_eq!(b, a, "line {i} must be byte-identical");
        }
    }
}

#[test]
fn rewrite_is_idempotent() {
    let cfg = MigrateConfig::default();
    let once = fstab::rewrite(FSTAB, &cfg);
    let twice = fstab::rewrite(&once.text, &cfg);
    assert_eq!(twice.changed, 0);
    assert_eq!(twice.text, once.text);
}

#[test]
fn already_canonical_text_is_untouched() {
    let cfg = MigrateConfig::default();
    let text = "nfs.crusoecloudcompute.com:/volumes/vol2 /scratch nfs vers=3 0 0\n";
    let out = fstab::rewrite(text, &cfg);
    assert_eq!(out.changed, 0);
    assert_eq!(out.text, text);
}

#[test]
fn dump_and_pass_fields_are_carried_over() {
    let cfg = MigrateConfig::default();
    let out = fstab::rewrite("10.0.0.9:/volumes/v9 /v9 nfs defaults 1 2", &cfg);
    assert_eq!(out.changed, 1);
    assert!(out.text.ends_with(" 1 2"), "got: {}", out.text);
}

#[test]
fn address_sharing_the_endpoint_prefix_is_still_rewritten() {
    let mut cfg = MigrateConfig::default();
    cfg.endpoint = mountshift::Endpoint::Range {
        start: "100.64.0.2".into(),
        end: "100.64.0.17".into(),
    };
    let text = "100.64.0.23:/volumes/x /data nfs vers=3 0 0\n\
                100.64.0.2:/volumes/y /y nfs vers=3 0 0\n";
    let out = fstab::rewrite(text, &cfg);
    // only the exact endpoint address counts as already canonical
    assert_eq!(out.changed, 1);
    assert!(out.text.starts_with("100.64.0.2:/volumes/x /data nfs "), "got: {}", out.text);
    assert!(out.text.contains("100.64.0.2:/volumes/y /y nfs vers=3 0 0"));
}

#[test]
fn range_endpoint_produces_port_spread_options() {
    let mut cfg = MigrateConfig::default();
    cfg.endpoint = mountshift::Endpoint::Range {
        start: "100.64.0.2".into(),
        end: "100.64.0.17".into(),
    };
    let out = fstab::rewrite("10.0.0.5:/volumes/vol1 /data nfs vers=3 0 0", &cfg);
    assert_eq!(out.changed, 1);
    assert_eq!(
        out.text,
        format!(
            "100.64.0.2:/volumes/vol1 /data nfs {CANONICAL_OPTION_BASE},remoteports=100.64.0.2-100.64.0.17 0 0"
        )
    );
}
