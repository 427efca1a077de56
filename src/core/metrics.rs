//! Per-run metrics counters
//!
//! Counters are scoped to a `(entity, counter)` pair and carried through
//! the engines by reference, so every run starts from zero and tests can
//! assert on exact counts without global state. Sync counters use the
//! `staging.<table>` entity names; transformation counters use the domain
//! entity names.

use std::collections::BTreeMap;
use std::fmt;

/// One countable outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Counter {
    /// Rows examined by an engine
    Processed,
    /// New rows written
    Inserted,
    /// Existing rows overwritten
    Updated,
    /// Rows deleted (soft-deleted in staging, removed in the domain)
    Deleted,
    /// Per-record failures; the row stays pending
    Errored,
    /// Delete rows skipped because no domain counterpart exists
    DeleteOrphansSkipped,
    /// Historical rows skipped because their parent was never transformed
    HistoricalOrphansSkipped,
    /// Write chunks applied by the sync engine
    ChunksApplied,
}

impl Counter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Counter::Processed => "processed",
            Counter::Inserted => "inserted",
            Counter::Updated => "updated",
            Counter::Deleted => "deleted",
            Counter::Errored => "errored",
            Counter::DeleteOrphansSkipped => "delete_orphans_skipped",
            Counter::HistoricalOrphansSkipped => "historical_orphans_skipped",
            Counter::ChunksApplied => "chunks_applied",
        }
    }

    /// All counters, in reporting order
    pub fn all() -> [Counter; 8] {
        [
            Counter::Processed,
            Counter::Inserted,
            Counter::Updated,
            Counter::Deleted,
            Counter::Errored,
            Counter::DeleteOrphansSkipped,
            Counter::HistoricalOrphansSkipped,
            Counter::ChunksApplied,
        ]
    }
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Counters for one pipeline run
#[derive(Debug, Clone, Default)]
pub struct RunMetrics {
    counters: BTreeMap<(String, Counter), u64>,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment one counter by one
    pub fn incr(&mut self, entity: &str, counter: Counter) {
        self.add(entity, counter, 1);
    }

    /// Increment one counter by an amount
    pub fn add(&mut self, entity: &str, counter: Counter, amount: u64) {
        if amount == 0 {
            return;
        }
        *self
            .counters
            .entry((entity.to_string(), counter))
            .or_insert(0) += amount;
    }

    /// Current value of one counter
    pub fn get(&self, entity: &str, counter: Counter) -> u64 {
        self.counters
            .get(&(entity.to_string(), counter))
            .copied()
            .unwrap_or(0)
    }

    /// Sum of one counter across all entities
    pub fn total(&self, counter: Counter) -> u64 {
        self.counters
            .iter()
            .filter(|((_, c), _)| *c == counter)
            .map(|(_, count)| count)
            .sum()
    }

    /// All entities with at least one nonzero counter, in sorted order
    pub fn entities(&self) -> Vec<String> {
        let mut entities: Vec<String> = self
            .counters
            .keys()
            .map(|(entity, _)| entity.clone())
            .collect();
        entities.dedup();
        entities
    }

    /// True when no per-record errors were counted
    pub fn is_clean(&self) -> bool {
        self.total(Counter::Errored) == 0
    }

    /// Log one structured summary line per entity
    pub fn log_summary(&self) {
        for entity in self.entities() {
            tracing::info!(
                entity = %entity,
                processed = self.get(&entity, Counter::Processed),
                inserted = self.get(&entity, Counter::Inserted),
                updated = self.get(&entity, Counter::Updated),
                deleted = self.get(&entity, Counter::Deleted),
                errored = self.get(&entity, Counter::Errored),
                skipped = self.get(&entity, Counter::DeleteOrphansSkipped)
                    + self.get(&entity, Counter::HistoricalOrphansSkipped),
                "Run metrics"
            );
        }
    }
}
