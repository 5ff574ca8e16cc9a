//! Logging seams: structured facts for machines, audit lines for humans.

use log::Level;
use serde_json::Value;

/// Receives one structured fact per emitted event. Implementations decide
/// where the JSON goes (file, collector, test buffer).
pub trait FactsEmitter {
    fn emit(&self, subsystem: &str, event: &str, decision: &str, fields: Value);
}

/// Receives human-readable progress lines.
pub trait AuditSink {
    fn log(&self, level: Level, msg: &str);
}

/// Default sink routing facts and audit lines through the `log` facade as
/// single JSON lines / plain messages.
#[derive(Default, Clone, Copy, Debug)]
pub struct JsonlSink;

impl FactsEmitter for JsonlSink {
    fn emit(&self, subsystem: &str, event: &str, decision: &str, fields: Value) {
        log::debug!(target: "mountshift::facts", "{subsystem} {event} {decision} {fields}");
    }
}

impl AuditSink for JsonlSink {
    fn log(&self, level: Level, msg: &str) {
        log::log!(target: "mountshift", level, "{msg}");
    }
}
