//! Example demonstrating a rehearsal run over the in-memory stores
//!
//! This example shows how to:
//! - Seed the in-memory source with typed legacy records
//! - Run the full pipeline (sync + transform) without a database
//! - Inspect the resulting domain records and stored documents
//! - Verify that a second run applies no further writes
//!
//! Run with:
//! ```bash
//! cargo run --example rehearsal_run
//! ```

use chrono::NaiveDate;
use std::sync::Arc;
use strata::adapters::blob::MemoryBlobStore;
use strata::adapters::memory::{MemorySource, MemoryTarget};
use strata::config::{LoggingConfig, StrataConfig};
use strata::core::pipeline::{Pipeline, RunMode};
use strata::logging::init_logging;
use strata::staging::key::LegacyKey;
use strata::staging::records::{LegacyInstruction, LegacyLink, LegacyOpportunity, LegacySummary};
use strata::staging::tables::StagingTable;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Console-only logging (keep the guard alive for the duration of the program)
    let _guard = init_logging("info", &LoggingConfig::default())?;

    let stamp = NaiveDate::from_ymd_opt(2025, 3, 10)
        .and_then(|d| d.and_hms_opt(9, 30, 0))
        .ok_or("bad fixture timestamp")?;

    // Seed the in-memory source with one opportunity, its summary, a
    // funding category link, and a competition instruction document
    let source = MemorySource::new();

    source
        .seed_record(
            StagingTable::Opportunity,
            LegacyKey::current(4711),
            Some(stamp),
            &LegacyOpportunity {
                opportunity_id: 4711,
                opp_number: Some("USDA-RD-2025-001".to_string()),
                opp_title: Some("Rural Broadband Expansion Grants".to_string()),
                owning_agency: Some("USDA-RD".to_string()),
                opp_category: Some("D".to_string()),
                is_draft: Some("N".to_string()),
                ..Default::default()
            },
        )
        .await?;

    source
        .seed_record(
            StagingTable::Summary,
            LegacyKey::current(9001),
            Some(stamp),
            &LegacySummary {
                summary_id: 9001,
                opportunity_id: 4711,
                posting_date: NaiveDate::from_ymd_opt(2025, 3, 14).and_then(|d| d.and_hms_opt(9, 0, 0)),
                number_of_awards: Some("10".to_string()),
                est_funding: Some("1,500,000".to_string()),
                award_ceiling: Some("$250,000".to_string()),
                cost_sharing: Some("N".to_string()),
                agency_email: Some("grants@usda.example.gov".to_string()),
                ..Default::default()
            },
        )
        .await?;

    source
        .seed_record(
            StagingTable::FundingCategory,
            LegacyKey::current(21),
            Some(stamp),
            &LegacyLink {
                link_id: 21,
                summary_id: 9001,
                code: Some("AG".to_string()),
                ..Default::default()
            },
        )
        .await?;

    source
        .seed_record(
            StagingTable::Instruction,
            LegacyKey::current(3100),
            Some(stamp),
            &LegacyInstruction {
                instruction_id: 3100,
                competition_id: 880,
                file_name: Some("Application Instructions.pdf".to_string()),
                file_lob: Some(b"%PDF-1.4 rehearsal instructions".to_vec()),
                ..Default::default()
            },
        )
        .await?;

    // Wire the pipeline to the in-memory stores in place of PostgreSQL
    let target = MemoryTarget::new();
    let blobs = MemoryBlobStore::new();
    let pipeline = Pipeline::with_stores(
        StrataConfig::default(),
        Arc::new(source),
        Arc::new(target.clone()),
        Arc::new(blobs.clone()),
    );

    // First run mirrors the source into staging and transforms everything
    let summary = pipeline.run(RunMode::Full).await;
    println!("{}", summary.render_table());

    for opportunity in target.opportunities().await {
        println!(
            "opportunity {}: {} ({})",
            opportunity.legacy_opportunity_id,
            opportunity.opportunity_title.as_deref().unwrap_or("untitled"),
            opportunity
                .category
                .map(|c| c.as_str())
                .unwrap_or("uncategorized"),
        );
    }
    for link in target.links().await {
        println!(
            "link {}: {} = {}",
            link.legacy_link_id,
            link.value.entity().as_str(),
            link.value.as_str(),
        );
    }
    for instruction in target.instructions().await {
        println!(
            "instruction {}: {} ({} bytes at {})",
            instruction.legacy_instruction_id,
            instruction.file_name,
            instruction.file_size_bytes,
            instruction.storage_path,
        );
    }

    // A second run sees no source changes and no pending rows
    let writes_after_first = target.domain_write_count().await;
    let rerun = pipeline.run(RunMode::Full).await;
    assert!(rerun.is_success());
    assert_eq!(target.domain_write_count().await, writes_after_first);
    println!("rerun applied no further domain writes");

    Ok(())
}
