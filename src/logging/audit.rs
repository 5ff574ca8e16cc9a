//! Typed fact emission across migration stages.
//!
//! Every fact carries a minimal envelope: `schema_version`, `ts`, `host`,
//! `stage`, and `decision`. Stage-specific fields are layered on top through
//! the builder.

use serde_json::{json, Value};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use super::facts::FactsEmitter;

pub(crate) const SCHEMA_VERSION: i64 = 1;

const SUBSYSTEM: &str = "mountshift";

/// Current wall-clock time in RFC3339, falling back to the epoch on
/// formatting failure.
#[must_use]
pub fn now_iso() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/// Emission context for one phase run on one host.
pub struct AuditCtx<'a> {
    pub facts: &'a dyn FactsEmitter,
    pub host: String,
    pub ts: String,
}

impl<'a> AuditCtx<'a> {
    #[must_use]
    pub fn new(facts: &'a dyn FactsEmitter, host: impl Into<String>) -> Self {
        Self {
            facts,
            host: host.into(),
            ts: now_iso(),
        }
    }
}

/// Stage for typed fact emission.
#[derive(Clone, Copy, Debug)]
pub enum Stage {
    Capture,
    Unmount,
    Remount,
    Rollback,
    Convert,
    Rewrite,
    Verify,
    FleetSummary,
}

impl Stage {
    fn as_event(self) -> &'static str {
        match self {
            Stage::Capture => "capture",
            Stage::Unmount => "unmount",
            Stage::Remount => "remount",
            Stage::Rollback => "rollback",
            Stage::Convert => "convert",
            Stage::Rewrite => "rewrite",
            Stage::Verify => "verify",
            Stage::FleetSummary => "fleet.summary",
        }
    }
}

/// Decision severity for emitted facts.
#[derive(Clone, Copy, Debug)]
pub enum Decision {
    Success,
    Failure,
    Warn,
}

impl Decision {
    fn as_str(self) -> &'static str {
        match self {
            Decision::Success => "success",
            Decision::Failure => "failure",
            Decision::Warn => "warn",
        }
    }
}

/// Builder facade over fact emission with a centralized envelope.
pub struct StageLogger<'a> {
    ctx: &'a AuditCtx<'a>,
}

impl<'a> StageLogger<'a> {
    #[must_use]
    pub fn new(ctx: &'a AuditCtx<'a>) -> Self {
        Self { ctx }
    }

    #[must_use]
    pub fn stage(&self, stage: Stage) -> EventBuilder<'a> {
        EventBuilder::new(self.ctx, stage)
    }
}

pub struct EventBuilder<'a> {
    ctx: &'a AuditCtx<'a>,
    stage: Stage,
    fields: serde_json::Map<String, Value>,
}

impl<'a> EventBuilder<'a> {
    fn new(ctx: &'a AuditCtx<'a>, stage: Stage) -> Self {
        let mut fields = serde_json::Map::new();
        fields.insert("stage".to_string(), json!(stage.as_event()));
        Self { ctx, stage, fields }
    }

    #[must_use]
    pub fn mount_point(mut self, path: impl Into<String>) -> Self {
        self.fields.insert("mount_point".into(), json!(path.into()));
        self
    }

    #[must_use]
    pub fn field(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    pub fn emit(self, decision: Decision) {
        let mut fields = Value::Object(self.fields);
        if let Some(obj) = fields.as_object_mut() {
            obj.entry("schema_version").or_insert(json!(SCHEMA_VERSION));
            obj.entry("ts").or_insert(json!(self.ctx.ts));
            obj.entry("host").or_insert(json!(self.ctx.host));
            obj.entry("decision").or_insert(json!(decision.as_str()));
        }
        self.ctx
            .facts
            .emit(SUBSYSTEM, self.stage.as_event(), decision.as_str(), fields);
    }

    pub fn emit_success(self) {
        self.emit(Decision::Success);
    }

    pub fn emit_failure(self) {
        self.emit(Decision::Failure);
    }

    pub fn emit_warn(self) {
        self.emit(Decision::Warn);
    }
}
