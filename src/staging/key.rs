//! Legacy primary keys and row lineage
//!
//! Current source tables key rows by a single numeric id; historical
//! variants add the revision number of the parent line. [`LegacyKey`]
//! covers both shapes, and [`Lineage`] is the explicit sum type the
//! transformers use instead of inspecting table names.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Primary key of one legacy source row and its staging mirror
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct LegacyKey {
    /// The source table's numeric primary key
    pub id: i64,

    /// Revision number, present only on rows from historical tables
    pub revision: Option<i32>,
}

impl LegacyKey {
    /// Key for a row in a current (non-historical) table
    pub fn current(id: i64) -> Self {
        Self { id, revision: None }
    }

    /// Key for a row in a historical revision table
    pub fn historical(id: i64, revision: i32) -> Self {
        Self {
            id,
            revision: Some(revision),
        }
    }

    /// The lineage this key implies
    pub fn lineage(&self) -> Lineage {
        match self.revision {
            Some(revision_number) => Lineage::Historical { revision_number },
            None => Lineage::Current,
        }
    }
}

impl fmt::Display for LegacyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.revision {
            Some(rev) => write!(f, "{}/r{}", self.id, rev),
            None => write!(f, "{}", self.id),
        }
    }
}

/// Whether a staged row comes from a current table or a historical
/// revision table
///
/// The two shapes differ only in the revision field, so a capability
/// check here replaces runtime type inspection in the transformers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lineage {
    Current,
    Historical { revision_number: i32 },
}

impl Lineage {
    pub fn is_historical(&self) -> bool {
        matches!(self, Lineage::Historical { .. })
    }

    pub fn revision_number(&self) -> Option<i32> {
        match self {
            Lineage::Current => None,
            Lineage::Historical { revision_number } => Some(*revision_number),
        }
    }
}
