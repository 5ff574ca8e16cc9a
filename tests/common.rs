//! Shared test helpers for the mountshift integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::Level;
use serde_json::{json, Value};

use mountshift::adapters::{CommandRunner, Confirmer, ExecError};
use mountshift::logging::{AuditSink, FactsEmitter};
use mountshift::MigrateConfig;

/// A simple in-memory emitter to capture facts during tests.
#[derive(Clone, Default)]
pub struct TestEmitter {
    pub events: Arc<Mutex<Vec<(String, String, Value)>>>,
}

impl FactsEmitter for TestEmitter {
    fn emit(&self, _subsystem: &str, event: &str, decision: &str, fields: Value) {
        self.events
            .lock()
            .unwrap()
            .push((event.into(), decision.into(), fields));
    }
}

/// A no-op audit sink for tests.
#[derive(Clone, Default)]
pub struct TestAudit;

impl AuditSink for TestAudit {
    fn log(&self, _level: Level, _msg: &str) {}
}

/// A confirmer that declines every action.
#[derive(Clone, Default)]
pub struct DeclineAll;

impl Confirmer for DeclineAll {
    fn confirm(&self, _action: &str) -> bool {
        false
    }
}

struct Rule {
    prefix: String,
    responses: VecDeque<Result<String, ExecError>>,
}

/// Command runner double: maps command prefixes to canned responses and
/// records every command it was asked to run.
///
/// Multiple responses registered for the same prefix are consumed in order;
/// the last one repeats. Commands matching no rule succeed with empty
/// output (which the inventory collector reads as an empty listing).
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn on(self, prefix: &str, response: Result<String, ExecError>) -> Self {
        {
            let mut rules = self.rules.lock().unwrap();
            if let Some(rule) = rules.iter_mut().find(|r| r.prefix == prefix) {
                rule.responses.push_back(response);
            } else {
                rules.push(Rule {
                    prefix: prefix.to_string(),
                    responses: VecDeque::from([response]),
                });
            }
        }
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_matching(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, command: &str, _timeout: Duration) -> Result<String, ExecError> {
        self.calls.lock().unwrap().push(command.to_string());
        let mut rules = self.rules.lock().unwrap();
        for rule in rules.iter_mut() {
            if command.starts_with(&rule.prefix) {
                return if rule.responses.len() > 1 {
                    rule.responses.pop_front().expect("non-empty queue")
                } else {
                    rule.responses.front().cloned().expect("non-empty queue")
                };
            }
        }
        Ok(String::new())
    }
}

/// An exit-style execution failure.
pub fn exit_err(code: i32, stderr: &str) -> Result<String, ExecError> {
    Err(ExecError::Exit {
        code,
        stdout: String::new(),
        stderr: stderr.to_string(),
    })
}

/// Serialize `(source, target, options)` triples into `findmnt --json` form.
pub fn findmnt_json(entries: &[(&str, &str, &str)]) -> String {
    let filesystems: Vec<Value> = entries
        .iter()
        .map(|(source, target, options)| {
            json!({
                "target": target,
                "source": source,
                "fstype": "nfs",
                "options": options,
            })
        })
        .collect();
    json!({ "filesystems": filesystems }).to_string()
}

/// Config pointing the checkpoint into a test-owned directory, with retry
/// backoff shortened so retry tests run quickly.
pub fn test_config(dir: &std::path::Path) -> MigrateConfig {
    let mut cfg = MigrateConfig::default();
    cfg.checkpoint_path = dir.join("mounts.json");
    cfg.retry.backoff = Duration::from_millis(1);
    cfg
}
