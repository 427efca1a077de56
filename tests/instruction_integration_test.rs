//! Integration tests for instruction document handling
//!
//! Instructions are the one entity whose transformation has a side effect
//! outside the target store: document bytes land in blob storage while
//! the metadata row lands in the domain. These tests run the whole
//! pipeline and check both sides stay consistent across inserts, updates,
//! and deletes.

use chrono::{NaiveDate, NaiveDateTime};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use strata::adapters::blob::MemoryBlobStore;
use strata::adapters::memory::{MemorySource, MemoryTarget};
use strata::config::StrataConfig;
use strata::core::metrics::Counter;
use strata::core::pipeline::{Pipeline, RunMode};
use strata::staging::records::LegacyInstruction;
use strata::staging::{LegacyKey, StagingTable};

fn stamp(day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 4, day)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap()
}

fn instruction(id: i64, competition_id: i64, name: &str, body: &[u8]) -> LegacyInstruction {
    LegacyInstruction {
        instruction_id: id,
        competition_id,
        file_name: Some(name.to_string()),
        file_lob: Some(body.to_vec()),
        created_date: None,
        last_upd_date: None,
    }
}

fn pipeline(
    source: &MemorySource,
    target: &MemoryTarget,
    blobs: &MemoryBlobStore,
) -> Pipeline {
    Pipeline::with_stores(
        StrataConfig::default(),
        Arc::new(source.clone()),
        Arc::new(target.clone()),
        Arc::new(blobs.clone()),
    )
}

#[tokio::test]
async fn test_full_run_stores_document_and_metadata() {
    let source = MemorySource::new();
    let target = MemoryTarget::new();
    let blobs = MemoryBlobStore::new();
    let body = b"%PDF-1.7 grant application instructions";
    source
        .seed_record(
            StagingTable::Instruction,
            LegacyKey::current(51),
            Some(stamp(1)),
            &instruction(51, 7700, " Grant Application Instructions..PDF ", body),
        )
        .await
        .unwrap();

    let run = pipeline(&source, &target, &blobs).run(RunMode::Full).await;
    assert!(run.is_success(), "errors: {:?}", run.errors);

    let stored = target.instruction_by_competition(7700).await.unwrap();
    assert_eq!(stored.file_name, "Grant Application Instructions..PDF");
    assert_eq!(stored.extension, "pdf");
    assert_eq!(stored.content_type, "application/pdf");
    assert_eq!(stored.file_size_bytes, body.len() as i64);
    assert_eq!(stored.checksum_sha256, format!("{:x}", Sha256::digest(body)));
    assert_eq!(
        stored.storage_path,
        "competitions/7700/instructions/instructions.pdf"
    );

    let blob = blobs.get(&stored.storage_path).await.unwrap();
    assert_eq!(blob.bytes, body);
    assert_eq!(blob.content_type, "application/pdf");
}

#[tokio::test]
async fn test_replaced_document_updates_blob_and_checksum() {
    let source = MemorySource::new();
    let target = MemoryTarget::new();
    let blobs = MemoryBlobStore::new();
    source
        .seed_record(
            StagingTable::Instruction,
            LegacyKey::current(51),
            Some(stamp(1)),
            &instruction(51, 7700, "instructions.pdf", b"first draft"),
        )
        .await
        .unwrap();

    let p = pipeline(&source, &target, &blobs);
    assert!(p.run(RunMode::Full).await.is_success());
    let first = target.instruction_by_competition(7700).await.unwrap();

    source
        .seed_record(
            StagingTable::Instruction,
            LegacyKey::current(51),
            Some(stamp(2)),
            &instruction(51, 7700, "instructions.pdf", b"final version"),
        )
        .await
        .unwrap();
    let run = p.run(RunMode::Full).await;

    assert!(run.is_success(), "errors: {:?}", run.errors);
    assert_eq!(run.metrics.get("instruction", Counter::Updated), 1);
    let second = target.instruction_by_competition(7700).await.unwrap();
    assert_eq!(second.instruction_id, first.instruction_id);
    assert_ne!(second.checksum_sha256, first.checksum_sha256);
    assert_eq!(
        blobs.get(&second.storage_path).await.unwrap().bytes,
        b"final version"
    );
    assert_eq!(blobs.len().await, 1);
}

#[tokio::test]
async fn test_source_delete_removes_document_and_metadata() {
    let source = MemorySource::new();
    let target = MemoryTarget::new();
    let blobs = MemoryBlobStore::new();
    source
        .seed_record(
            StagingTable::Instruction,
            LegacyKey::current(51),
            Some(stamp(1)),
            &instruction(51, 7700, "instructions.pdf", b"doc"),
        )
        .await
        .unwrap();

    let p = pipeline(&source, &target, &blobs);
    assert!(p.run(RunMode::Full).await.is_success());
    assert_eq!(blobs.len().await, 1);

    source
        .remove(StagingTable::Instruction, LegacyKey::current(51))
        .await;
    let run = p.run(RunMode::Full).await;

    assert!(run.is_success(), "errors: {:?}", run.errors);
    assert_eq!(run.metrics.get("instruction", Counter::Deleted), 1);
    assert!(target.instruction_by_competition(7700).await.is_none());
    assert!(blobs.is_empty().await);

    let row = target
        .staging_row(StagingTable::Instruction, LegacyKey::current(51))
        .await
        .unwrap();
    assert!(row.is_deleted);
    assert!(row.transformed_at.is_some());
}

#[tokio::test]
async fn test_unusable_file_name_leaves_the_row_pending() {
    let source = MemorySource::new();
    let target = MemoryTarget::new();
    let blobs = MemoryBlobStore::new();
    source
        .seed_record(
            StagingTable::Instruction,
            LegacyKey::current(51),
            Some(stamp(1)),
            &instruction(51, 7700, "README", b"no extension to derive"),
        )
        .await
        .unwrap();

    let run = pipeline(&source, &target, &blobs).run(RunMode::Full).await;

    assert!(!run.is_success());
    assert_eq!(run.metrics.get("instruction", Counter::Errored), 1);
    assert!(target.instructions().await.is_empty());
    assert!(blobs.is_empty().await);
    let row = target
        .staging_row(StagingTable::Instruction, LegacyKey::current(51))
        .await
        .unwrap();
    assert!(row.transformed_at.is_none());
}
