//! OperationScope for start/complete logging around one command
//!
//! - `{name}_BEGIN` on creation
//! - `{name}_COMPLETE` with `elapsed_ms` on `complete()`
//! - `{name}_FAILED` with the error code on `fail()`
//! - `{name}_INCOMPLETE` on drop if neither was called
//!
//! Scopes are `Send`: a command usually finishes on a store worker thread,
//! not on the thread that started it.

use std::time::Instant;

use super::logger::Logger;

pub struct OperationScope {
    name: &'static str,
    fields: Vec<(&'static str, String)>,
    started: Instant,
    finished: bool,
}

impl OperationScope {
    pub fn new(name: &'static str) -> Self {
        Self::with_fields(name, Vec::new())
    }

    pub fn with_fields(name: &'static str, fields: Vec<(&'static str, String)>) -> Self {
        let scope = Self {
            name,
            fields,
            started: Instant::now(),
            finished: false,
        };
        scope.emit("BEGIN", &[], false);
        scope
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.started.elapsed().as_millis()
    }

    pub fn complete(mut self) {
        self.finished = true;
        let elapsed = self.elapsed_ms().to_string();
        self.emit("COMPLETE", &[("elapsed_ms", elapsed.as_str())], false);
    }

    pub fn fail(mut self, code: &str) {
        self.finished = true;
        let elapsed = self.elapsed_ms().to_string();
        self.emit(
            "FAILED",
            &[("code", code), ("elapsed_ms", elapsed.as_str())],
            true,
        );
    }

    fn emit(&self, suffix: &str, extra: &[(&str, &str)], failure: bool) {
        let event = format!("{}_{}", self.name, suffix);
        let mut fields: Vec<(&str, &str)> =
            self.fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
        fields.extend_from_slice(extra);

        if failure {
            Logger::error(&event, &fields);
        } else {
            Logger::info(&event, &fields);
        }
    }
}

impl Drop for OperationScope {
    fn drop(&mut self) {
        if !self.finished {
            let event = format!("{}_INCOMPLETE", self.name);
            Logger::warn(&event, &[("reason", "scope dropped without completion")]);
        }
    }
}
