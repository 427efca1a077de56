//! Pure insert/update/delete planning for one table pair
//!
//! The planner diffs the two narrow key/stamp listings and never looks at
//! row payloads, so memory stays bounded on large tables.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use crate::adapters::store::{KeyStamp, StagingKeyStamp};
use crate::staging::LegacyKey;

/// The keys one sync pass must touch for a single table pair
///
/// All three sets are sorted by key, so a plan computed from the same two
/// listings is always identical.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TablePlan {
    /// Keys present in source, absent in staging
    pub inserts: Vec<LegacyKey>,

    /// Keys present in both where the source row is newer, plus soft-deleted
    /// staging rows whose key reappeared in source
    pub updates: Vec<LegacyKey>,

    /// Live staging keys that vanished from source
    pub deletes: Vec<LegacyKey>,
}

impl TablePlan {
    /// True when the table pair is already in sync
    pub fn is_noop(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }

    /// Insert and update keys combined, inserts first
    pub fn upsert_keys(&self) -> Vec<LegacyKey> {
        let mut keys = Vec::with_capacity(self.inserts.len() + self.updates.len());
        keys.extend_from_slice(&self.inserts);
        keys.extend_from_slice(&self.updates);
        keys
    }
}

/// Diff the source and staging key listings into a plan
///
/// A staging row marked deleted is never re-deleted; if its key reappears
/// in source it is planned as an update so the row gets resurrected.
pub fn compute(source: &[KeyStamp], staging: &[StagingKeyStamp]) -> TablePlan {
    let source_by_key: BTreeMap<LegacyKey, Option<NaiveDateTime>> =
        source.iter().map(|s| (s.key, s.last_upd_date)).collect();
    let staging_by_key: BTreeMap<LegacyKey, &StagingKeyStamp> =
        staging.iter().map(|s| (s.key, s)).collect();

    let mut plan = TablePlan::default();

    for (key, source_stamp) in &source_by_key {
        match staging_by_key.get(key) {
            None => plan.inserts.push(*key),
            Some(staged) => {
                if staged.is_deleted || source_is_newer(*source_stamp, staged.last_upd_date) {
                    plan.updates.push(*key);
                }
            }
        }
    }

    for (key, staged) in &staging_by_key {
        if !staged.is_deleted && !source_by_key.contains_key(key) {
            plan.deletes.push(*key);
        }
    }

    plan
}

/// True when the source timestamp says the staged copy is stale
///
/// A source row with a timestamp always beats a staged row without one; a
/// source row with no timestamp never forces an update.
fn source_is_newer(source: Option<NaiveDateTime>, staged: Option<NaiveDateTime>) -> bool {
    match (source, staged) {
        (Some(source_ts), Some(staged_ts)) => source_ts > staged_ts,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn source_stamp(id: i64, day: u32) -> KeyStamp {
        KeyStamp {
            key: LegacyKey::current(id),
            last_upd_date: Some(ts(day)),
        }
    }

    fn staging_stamp(id: i64, day: u32, is_deleted: bool) -> StagingKeyStamp {
        StagingKeyStamp {
            key: LegacyKey::current(id),
            last_upd_date: Some(ts(day)),
            is_deleted,
        }
    }

    #[test]
    fn test_partitions_inserts_updates_deletes() {
        let source = vec![
            source_stamp(1, 5),
            source_stamp(2, 5),
            source_stamp(3, 5),
            source_stamp(4, 9),
        ];
        let staging = vec![
            staging_stamp(3, 5, false),
            staging_stamp(4, 5, false),
            staging_stamp(5, 5, false),
        ];

        let plan = compute(&source, &staging);

        assert_eq!(
            plan.inserts,
            vec![LegacyKey::current(1), LegacyKey::current(2)]
        );
        assert_eq!(plan.updates, vec![LegacyKey::current(4)]);
        assert_eq!(plan.deletes, vec![LegacyKey::current(5)]);
    }

    #[test]
    fn test_identical_listings_are_a_noop() {
        let source = vec![source_stamp(1, 5), source_stamp(2, 6)];
        let staging = vec![staging_stamp(1, 5, false), staging_stamp(2, 6, false)];

        let plan = compute(&source, &staging);

        assert!(plan.is_noop());
    }

    #[test]
    fn test_deleted_row_reappearing_in_source_is_an_update() {
        let source = vec![source_stamp(1, 5)];
        let staging = vec![staging_stamp(1, 5, true)];

        let plan = compute(&source, &staging);

        assert_eq!(plan.updates, vec![LegacyKey::current(1)]);
        assert!(plan.inserts.is_empty());
        assert!(plan.deletes.is_empty());
    }

    #[test]
    fn test_already_deleted_row_is_not_redeleted() {
        let source = vec![];
        let staging = vec![staging_stamp(1, 5, true)];

        let plan = compute(&source, &staging);

        assert!(plan.is_noop());
    }

    #[test]
    fn test_source_timestamp_beats_missing_staging_timestamp() {
        let source = vec![source_stamp(1, 5)];
        let staging = vec![StagingKeyStamp {
            key: LegacyKey::current(1),
            last_upd_date: None,
            is_deleted: false,
        }];

        let plan = compute(&source, &staging);

        assert_eq!(plan.updates, vec![LegacyKey::current(1)]);
    }

    #[test]
    fn test_missing_source_timestamp_never_forces_an_update() {
        let source = vec![KeyStamp {
            key: LegacyKey::current(1),
            last_upd_date: None,
        }];
        let staging = vec![
            staging_stamp(1, 5, false),
            StagingKeyStamp {
                key: LegacyKey::current(1),
                last_upd_date: None,
                is_deleted: false,
            },
        ];

        let plan = compute(&source, &[staging[0]]);
        assert!(plan.is_noop());

        let plan = compute(&source, &[staging[1]]);
        assert!(plan.is_noop());
    }

    #[test]
    fn test_historical_revisions_are_distinct_keys() {
        let source = vec![
            KeyStamp {
                key: LegacyKey::historical(7, 1),
                last_upd_date: Some(ts(3)),
            },
            KeyStamp {
                key: LegacyKey::historical(7, 2),
                last_upd_date: Some(ts(4)),
            },
        ];
        let staging = vec![StagingKeyStamp {
            key: LegacyKey::historical(7, 1),
            last_upd_date: Some(ts(3)),
            is_deleted: false,
        }];

        let plan = compute(&source, &staging);

        assert_eq!(plan.inserts, vec![LegacyKey::historical(7, 2)]);
        assert!(plan.updates.is_empty());
        assert!(plan.deletes.is_empty());
    }

    #[test]
    fn test_plan_output_is_sorted_regardless_of_listing_order() {
        let source = vec![source_stamp(9, 5), source_stamp(2, 5), source_stamp(5, 5)];
        let staging = vec![];

        let plan = compute(&source, &staging);

        assert_eq!(
            plan.inserts,
            vec![
                LegacyKey::current(2),
                LegacyKey::current(5),
                LegacyKey::current(9)
            ]
        );
    }
}
