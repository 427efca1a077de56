//! Run summary and reporting
//!
//! This module defines structures for tracking and reporting the outcome
//! of one pipeline invocation.

use crate::core::metrics::{Counter, RunMetrics};
use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use std::time::Duration;

/// Pipeline stage a component error was raised in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    /// Mirroring source tables into staging
    Sync,
    /// Transforming staged rows into domain records
    Transform,
}

impl RunStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStage::Sync => "sync",
            RunStage::Transform => "transform",
        }
    }
}

/// A component-level failure collected during a run
///
/// One failed table or transformer does not abort the run; its error is
/// recorded here while the remaining components proceed.
#[derive(Debug, Clone)]
pub struct RunError {
    /// Stage the failure occurred in
    pub stage: RunStage,

    /// Failed component: a staging table name or a transformer entity
    pub component: String,

    /// Error message
    pub message: String,
}

impl RunError {
    /// Create a new run error
    pub fn new(stage: RunStage, component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stage,
            component: component.into(),
            message: message.into(),
        }
    }
}

/// Summary of one pipeline invocation
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// When the run started
    pub started_at: DateTime<Utc>,

    /// Duration of the run
    pub duration: Duration,

    /// Per-entity counters accumulated across both stages
    pub metrics: RunMetrics,

    /// Component failures encountered during the run
    pub errors: Vec<RunError>,
}

impl RunSummary {
    /// Create a new empty run summary
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            duration: Duration::from_secs(0),
            metrics: RunMetrics::new(),
            errors: Vec::new(),
        }
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Add a component error
    pub fn add_error(&mut self, error: RunError) {
        self.errors.push(error);
    }

    /// True when no component failed and no record errored
    pub fn is_success(&self) -> bool {
        self.errors.is_empty() && self.metrics.is_clean()
    }

    /// Log the summary
    pub fn log_summary(&self) {
        self.metrics.log_summary();
        tracing::info!(
            duration_secs = self.duration.as_secs(),
            component_errors = self.errors.len(),
            record_errors = self.metrics.total(Counter::Errored),
            "Run completed"
        );

        for error in &self.errors {
            tracing::warn!(
                stage = error.stage.as_str(),
                component = %error.component,
                message = %error.message,
                "Component failed during run"
            );
        }
    }

    /// Render an operator-facing counter table, one row per entity
    pub fn render_table(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<32} {:>9} {:>9} {:>8} {:>8} {:>8} {:>8}",
            "entity", "processed", "inserted", "updated", "deleted", "skipped", "errored"
        );
        for entity in self.metrics.entities() {
            let skipped = self.metrics.get(&entity, Counter::DeleteOrphansSkipped)
                + self.metrics.get(&entity, Counter::HistoricalOrphansSkipped);
            let _ = writeln!(
                out,
                "{:<32} {:>9} {:>9} {:>8} {:>8} {:>8} {:>8}",
                entity,
                self.metrics.get(&entity, Counter::Processed),
                self.metrics.get(&entity, Counter::Inserted),
                self.metrics.get(&entity, Counter::Updated),
                self.metrics.get(&entity, Counter::Deleted),
                skipped,
                self.metrics.get(&entity, Counter::Errored),
            );
        }
        out
    }
}

impl Default for RunSummary {
    fn default() -> Self {
        Self::new()
    }
}
