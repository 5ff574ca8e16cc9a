//! Operator confirmation gating destructive phases.
//!
//! Modeled as a single injected capability so automated runs can stub it
//! (the `-y` auto-confirm flag of the original tooling).

use std::io::{BufRead, Write};

/// Answer whether a described destructive action may proceed.
pub trait Confirmer: Send + Sync {
    fn confirm(&self, action: &str) -> bool;
}

/// Approves every action; used for non-interactive runs and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoConfirm;

impl Confirmer for AutoConfirm {
    fn confirm(&self, _action: &str) -> bool {
        true
    }
}

/// Prompts on stdout and reads a `y` from stdin; anything else declines.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinConfirmer;

impl Confirmer for StdinConfirmer {
    fn confirm(&self, action: &str) -> bool {
        let mut stdout = std::io::stdout();
        if write!(stdout, "{action} Continue? (y/N) ").and_then(|()| stdout.flush()).is_err() {
            return false;
        }
        let mut line = String::new();
        if std::io::stdin().lock().read_line(&mut line).is_err() {
            return false;
        }
        line.trim().eq_ignore_ascii_case("y")
    }
}
