//! Pure rewriting of persisted mount configuration (fstab-format text).
//!
//! Lines are read once per invocation and never mutated in place: a full new
//! line sequence is produced and swapped in by the caller. Both rewrites are
//! idempotent; re-running on already-canonical text changes nothing.

use crate::config::MigrateConfig;
use crate::constants::{MANAGED_FS_TYPE, VOLUME_DELIMITER};
use crate::volmap::VolumeMap;

/// New text plus the number of managed entries rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOutcome {
    pub text: String,
    pub changed: usize,
}

/// A line is a managed entry only if it has at least six whitespace-separated
/// fields and its filesystem-type field matches.
fn fields_of(line: &str) -> Option<Vec<&str>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 6 {
        return None;
    }
    Some(fields)
}

/// Rewrite legacy managed entries to the canonical addressing scheme.
///
/// Kept verbatim: blank lines, comments, malformed (<6 field) lines, lines of
/// another filesystem type, sources outside the volume namespace, and sources
/// already on the canonical endpoint (the idempotence guard). Everything else
/// is rebuilt from the canonical endpoint, the original mount point, the
/// managed type literal, the canonical option string, and the original
/// dump/pass fields.
#[must_use]
pub fn rewrite(text: &str, cfg: &MigrateConfig) -> RewriteOutcome {
    let mut changed = 0;
    let new_lines: Vec<String> = text
        .split('\n')
        .map(|line| {
            let Some(fields) = fields_of(line) else {
                return line.to_string();
            };
            if fields[2] != cfg.managed_fs_type {
                return line.to_string();
            }
            let Some((address, volume_id)) = fields[0].split_once(VOLUME_DELIMITER) else {
                return line.to_string();
            };
            // exact address match only; a range start must not shadow
            // longer addresses sharing its prefix
            if address == cfg.endpoint.host() {
                return line.to_string();
            }
            changed += 1;
            format!(
                "{} {} {} {} {} {}",
                cfg.endpoint.source_for(volume_id),
                fields[1],
                cfg.managed_fs_type,
                cfg.canonical_options(),
                fields[4],
                fields[5],
            )
        })
        .collect();
    RewriteOutcome {
        text: new_lines.join("\n"),
        changed,
    }
}

/// Rewrite virtiofs entries whose tag resolves through the volume map into
/// managed NFS entries against the canonical endpoint. Unresolvable tags are
/// kept verbatim with a warning so the remaining disks still convert.
#[must_use]
pub fn rewrite_virtiofs(text: &str, volumes: &VolumeMap, cfg: &MigrateConfig) -> RewriteOutcome {
    let mut changed = 0;
    let new_lines: Vec<String> = text
        .split('\n')
        .map(|line| {
            let Some(fields) = fields_of(line) else {
                return line.to_string();
            };
            if fields[2] != crate::constants::VIRTIOFS_FS_TYPE {
                return line.to_string();
            }
            let Some(volume_id) = volumes.get(fields[0]) else {
                log::warn!("no volume id for virtiofs tag '{}'; line kept", fields[0]);
                return line.to_string();
            };
            changed += 1;
            format!(
                "{} {} {} {} {} {}",
                cfg.endpoint.source_for(volume_id),
                fields[1],
                MANAGED_FS_TYPE,
                cfg.canonical_options(),
                fields[4],
                fields[5],
            )
        })
        .collect();
    RewriteOutcome {
        text: new_lines.join("\n"),
        changed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> MigrateConfig {
        MigrateConfig::default()
    }

    #[test]
    fn short_lines_and_foreign_types_pass_through() {
        let text = "proc /proc proc defaults 0 0\nbroken line\n";
        let out = rewrite(text, &cfg());
        assert_eq!(out.text, text);
        assert_eq!(out.changed, 0);
    }

    #[test]
    fn virtiofs_rewrite_is_idempotent() {
        let id = "33333333-3333-3333-3333-333333333333";
        let volumes: VolumeMap = [("disk-1".to_string(), id.to_string())]
            .into_iter()
            .collect();
        let text = "disk-1 /data virtiofs defaults 0 0";
        let once = rewrite_virtiofs(text, &volumes, &cfg());
        assert_eq!(once.changed, 1);
        assert!(once.text.contains(&format!(":/volumes/{id} /data nfs ")));
        let twice = rewrite_virtiofs(&once.text, &volumes, &cfg());
        assert_eq!(twice.changed, 0);
        assert_eq!(twice.text, once.text);
    }

    #[test]
    fn virtiofs_rewrite_keeps_unmapped_tags() {
        let volumes = VolumeMap::default();
        let text = "disk-9 /data virtiofs defaults 0 0";
        let out = rewrite_virtiofs(text, &volumes, &cfg());
        assert_eq!(out.changed, 0);
        assert_eq!(out.text, text);
    }
}
