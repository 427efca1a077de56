//! Integration tests for the transformation stage
//!
//! Full pipeline runs against the in-memory stores: staged legacy rows
//! come out the other side as normalized domain records, re-runs apply
//! nothing new, and deletes and orphans take their designed paths.

use chrono::{NaiveDate, NaiveDateTime};
use fake::faker::company::en::CompanyName;
use fake::faker::internet::en::SafeEmail;
use fake::Fake;
use std::sync::Arc;

use strata::adapters::blob::MemoryBlobStore;
use strata::adapters::memory::{MemorySource, MemoryTarget};
use strata::adapters::store::TargetStore;
use strata::config::StrataConfig;
use strata::core::metrics::Counter;
use strata::core::pipeline::{Pipeline, RunMode};
use strata::domain::OpportunityCategory;
use strata::staging::records::{LegacyLink, LegacyOpportunity, LegacySummary};
use strata::staging::{LegacyKey, StagingTable};

fn stamp(day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, day)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
}

fn opportunity(id: i64) -> LegacyOpportunity {
    LegacyOpportunity {
        opportunity_id: id,
        opp_number: Some(format!("HHS-2025-ACF-{id:04}")),
        opp_title: Some(CompanyName().fake()),
        opp_category: Some("M".to_string()),
        is_draft: Some("N".to_string()),
        ..Default::default()
    }
}

fn summary(id: i64, opportunity_id: i64) -> LegacySummary {
    LegacySummary {
        summary_id: id,
        opportunity_id,
        posting_date: Some(stamp(15)),
        number_of_awards: Some("12".to_string()),
        est_funding: Some("5,000,000".to_string()),
        award_ceiling: Some("$500,000".to_string()),
        award_floor: Some("TBD".to_string()),
        cost_sharing: Some("Y".to_string()),
        agency_email: Some(SafeEmail().fake()),
        ..Default::default()
    }
}

fn link(id: i64, summary_id: i64, code: &str) -> LegacyLink {
    LegacyLink {
        link_id: id,
        summary_id,
        code: Some(code.to_string()),
        ..Default::default()
    }
}

async fn seed_world(source: &MemorySource) {
    source
        .seed_record(
            StagingTable::Opportunity,
            LegacyKey::current(4711),
            Some(stamp(1)),
            &opportunity(4711),
        )
        .await
        .unwrap();
    source
        .seed_record(
            StagingTable::Summary,
            LegacyKey::current(9001),
            Some(stamp(2)),
            &summary(9001, 4711),
        )
        .await
        .unwrap();
    for (table, id, code) in [
        (StagingTable::ApplicantType, 21, "21"),
        (StagingTable::FundingCategory, 22, "HL"),
        (StagingTable::FundingInstrument, 23, "G"),
    ] {
        source
            .seed_record(table, LegacyKey::current(id), Some(stamp(3)), &link(id, 9001, code))
            .await
            .unwrap();
    }
}

fn pipeline(source: &MemorySource, target: &MemoryTarget) -> Pipeline {
    Pipeline::with_stores(
        StrataConfig::default(),
        Arc::new(source.clone()),
        Arc::new(target.clone()),
        Arc::new(MemoryBlobStore::new()),
    )
}

#[tokio::test]
async fn test_full_run_normalizes_legacy_values() {
    let source = MemorySource::new();
    let target = MemoryTarget::new();
    seed_world(&source).await;

    let run = pipeline(&source, &target).run(RunMode::Full).await;
    assert!(run.is_success(), "errors: {:?}", run.errors);

    let opportunity = target.opportunity_by_legacy_id(4711).await.unwrap();
    assert_eq!(opportunity.category, Some(OpportunityCategory::Mandatory));
    assert!(!opportunity.is_draft);
    assert_eq!(
        opportunity.opportunity_number.as_deref(),
        Some("HHS-2025-ACF-4711")
    );

    let summary = target.summary_by_lineage(9001, None).await.unwrap();
    assert_eq!(summary.opportunity_id, opportunity.opportunity_id);
    // 09:00 January 15 US-Eastern is 14:00 UTC
    assert_eq!(
        summary.post_date.unwrap().to_rfc3339(),
        "2025-01-15T14:00:00+00:00"
    );
    assert_eq!(summary.expected_number_of_awards, Some(12));
    assert_eq!(summary.estimated_total_funding, Some(5_000_000));
    assert_eq!(summary.award_ceiling, Some(500_000));
    // Placeholder text in a numeric column lands as null, not an error
    assert_eq!(summary.award_floor, None);
    assert_eq!(summary.is_cost_sharing, Some(true));

    let mut values: Vec<&str> = Vec::new();
    let links = target.links_for_summary(summary.summary_id).await;
    for l in &links {
        values.push(l.value.as_str());
    }
    values.sort_unstable();
    assert_eq!(values, vec!["grant", "health", "individuals"]);
}

#[tokio::test]
async fn test_rerun_applies_no_further_domain_writes() {
    let source = MemorySource::new();
    let target = MemoryTarget::new();
    seed_world(&source).await;

    let p = pipeline(&source, &target);
    assert!(p.run(RunMode::Full).await.is_success());
    let writes_after_first = target.domain_write_count().await;

    let second = p.run(RunMode::Full).await;
    assert!(second.is_success());
    assert_eq!(target.domain_write_count().await, writes_after_first);

    let statuses = target.staging_status().await.unwrap();
    let pending: u64 = statuses.iter().map(|s| s.pending_rows).sum();
    assert_eq!(pending, 0);
}

#[tokio::test]
async fn test_summary_ahead_of_its_opportunity_retries_next_run() {
    let source = MemorySource::new();
    let target = MemoryTarget::new();
    source
        .seed_record(
            StagingTable::Summary,
            LegacyKey::current(9001),
            Some(stamp(2)),
            &summary(9001, 4711),
        )
        .await
        .unwrap();

    let p = pipeline(&source, &target);
    let first = p.run(RunMode::Full).await;

    // The parentless summary is a record error; the row stays pending.
    assert!(!first.is_success());
    assert_eq!(first.metrics.get("summary", Counter::Errored), 1);
    assert!(target.summaries().await.is_empty());
    let row = target
        .staging_row(StagingTable::Summary, LegacyKey::current(9001))
        .await
        .unwrap();
    assert!(row.transformed_at.is_none());

    // The opportunity arrives in the source; the next run resolves it.
    source
        .seed_record(
            StagingTable::Opportunity,
            LegacyKey::current(4711),
            Some(stamp(3)),
            &opportunity(4711),
        )
        .await
        .unwrap();
    let second = p.run(RunMode::Full).await;

    assert!(second.is_success(), "errors: {:?}", second.errors);
    let parent = target.opportunity_by_legacy_id(4711).await.unwrap();
    let summary = target.summary_by_lineage(9001, None).await.unwrap();
    assert_eq!(summary.opportunity_id, parent.opportunity_id);
}

#[tokio::test]
async fn test_source_delete_cascades_through_the_domain() {
    let source = MemorySource::new();
    let target = MemoryTarget::new();
    seed_world(&source).await;

    let p = pipeline(&source, &target);
    assert!(p.run(RunMode::Full).await.is_success());
    assert_eq!(target.summaries().await.len(), 1);

    source
        .remove(StagingTable::Opportunity, LegacyKey::current(4711))
        .await;
    let run = p.run(RunMode::Full).await;

    assert!(run.is_success(), "errors: {:?}", run.errors);
    assert_eq!(run.metrics.get("opportunity", Counter::Deleted), 1);
    assert!(target.opportunities().await.is_empty());
    assert!(target.summaries().await.is_empty());
    assert!(target.links().await.is_empty());

    let row = target
        .staging_row(StagingTable::Opportunity, LegacyKey::current(4711))
        .await
        .unwrap();
    assert!(row.is_deleted);
    assert!(row.transformed_at.is_some());
}

#[tokio::test]
async fn test_historical_revisions_coexist_with_the_current_row() {
    let source = MemorySource::new();
    let target = MemoryTarget::new();
    source
        .seed_record(
            StagingTable::Opportunity,
            LegacyKey::current(4711),
            Some(stamp(1)),
            &opportunity(4711),
        )
        .await
        .unwrap();
    source
        .seed_record(
            StagingTable::Summary,
            LegacyKey::current(9001),
            Some(stamp(2)),
            &summary(9001, 4711),
        )
        .await
        .unwrap();
    for revision in 1..=2 {
        let mut record = summary(9001, 4711);
        record.revision_number = Some(revision);
        record.action_type = Some("U".to_string());
        source
            .seed_record(
                StagingTable::SummaryHist,
                LegacyKey::historical(9001, revision),
                Some(stamp(2)),
                &record,
            )
            .await
            .unwrap();
    }

    let run = pipeline(&source, &target).run(RunMode::Full).await;

    assert!(run.is_success(), "errors: {:?}", run.errors);
    let summaries = target.summaries().await;
    assert_eq!(summaries.len(), 3);
    assert!(target.summary_by_lineage(9001, None).await.unwrap().is_current());
    assert!(target.summary_by_lineage(9001, Some(1)).await.is_some());
    assert!(target.summary_by_lineage(9001, Some(2)).await.is_some());
}

#[tokio::test]
async fn test_max_records_caps_one_run() {
    let source = MemorySource::new();
    let target = MemoryTarget::new();
    for id in 1..=3 {
        source
            .seed_record(
                StagingTable::Opportunity,
                LegacyKey::current(id),
                Some(stamp(id as u32)),
                &opportunity(id),
            )
            .await
            .unwrap();
    }

    let mut config = StrataConfig::default();
    config.transform.max_records = Some(1);
    let p = Pipeline::with_stores(
        config,
        Arc::new(source.clone()),
        Arc::new(target.clone()),
        Arc::new(MemoryBlobStore::new()),
    );

    let run = p.run(RunMode::Full).await;
    assert!(run.is_success(), "errors: {:?}", run.errors);
    assert_eq!(target.opportunities().await.len(), 1);
    assert_eq!(run.metrics.get("opportunity", Counter::Inserted), 1);

    // Each further run drains one more row under the cap
    p.run(RunMode::TransformOnly).await;
    assert_eq!(target.opportunities().await.len(), 2);
}
