//! Pipeline orchestration
//!
//! The pipeline wires the configured stores to the sync engine and the
//! transformers and drives one full invocation: mirror every configured
//! staging table, then run the transformers in dependency order. Component
//! failures are collected into the [`RunSummary`] instead of aborting the
//! run, so one broken table or entity leaves the rest of the batch intact.

pub mod summary;

pub use summary::{RunError, RunStage, RunSummary};

use crate::adapters::blob::BlobStore;
use crate::adapters::store::{create_stores, FetchOrder, SourceStore, TargetStore};
use crate::config::StrataConfig;
use crate::core::sync::SyncEngine;
use crate::core::transform::{
    run_to_completion, BatchSettings, EntityTransformer, InstructionTransformer, LinkTransformer,
    OpportunityTransformer, SummaryTransformer,
};
use crate::domain::enums::LinkEntity;
use crate::domain::Result;
use std::sync::Arc;
use std::time::Instant;

/// Which stages one invocation runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Sync then transform
    Full,
    /// Mirror staging only
    SyncOnly,
    /// Transform already-staged rows only
    TransformOnly,
}

impl RunMode {
    fn includes_sync(self) -> bool {
        matches!(self, RunMode::Full | RunMode::SyncOnly)
    }

    fn includes_transform(self) -> bool {
        matches!(self, RunMode::Full | RunMode::TransformOnly)
    }
}

/// Pipeline orchestrator
pub struct Pipeline {
    config: StrataConfig,
    source: Arc<dyn SourceStore>,
    target: Arc<dyn TargetStore>,
    blobs: Arc<dyn BlobStore>,
}

impl Pipeline {
    /// Create a pipeline with stores built from the configuration
    ///
    /// Initializes the target schema before returning, so a first run
    /// against an empty database works without manual setup.
    ///
    /// # Errors
    ///
    /// Returns an error if a store cannot be created or the schema cannot
    /// be initialized.
    pub async fn new(config: StrataConfig) -> Result<Self> {
        let (source, target, blobs) = create_stores(&config).await?;
        target.ensure_schema().await?;
        Ok(Self {
            config,
            source,
            target,
            blobs,
        })
    }

    /// Create a pipeline over existing stores
    pub fn with_stores(
        config: StrataConfig,
        source: Arc<dyn SourceStore>,
        target: Arc<dyn TargetStore>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            config,
            source,
            target,
            blobs,
        }
    }

    /// Execute one pipeline invocation
    ///
    /// Always returns a summary; failures are collected per component and
    /// reported through it.
    pub async fn run(&self, mode: RunMode) -> RunSummary {
        let start = Instant::now();
        let mut summary = RunSummary::new();

        if mode.includes_sync() {
            self.sync_stage(&mut summary).await;
        }
        if mode.includes_transform() {
            self.transform_stage(&mut summary).await;
        }

        let summary = summary.with_duration(start.elapsed());
        summary.log_summary();
        summary
    }

    /// Mirror every configured staging table
    ///
    /// A failed table is recorded and skipped; its staged rows keep their
    /// previous state and the next run picks the table up again.
    async fn sync_stage(&self, summary: &mut RunSummary) {
        tracing::info!("Starting staging sync");
        let engine = SyncEngine::new(
            self.source.clone(),
            self.target.clone(),
            self.config.sync.clone(),
        );

        let tables = match engine.tables() {
            Ok(tables) => tables,
            Err(e) => {
                tracing::error!(error = %e, "Sync table selection failed");
                summary.add_error(RunError::new(RunStage::Sync, "tables", e.to_string()));
                return;
            }
        };

        for table in tables {
            if let Err(e) = engine.sync_table(table, &mut summary.metrics).await {
                tracing::error!(table = table.as_str(), error = %e, "Table sync failed");
                summary.add_error(RunError::new(RunStage::Sync, table.as_str(), e.to_string()));
            }
        }
    }

    /// Run every transformer to completion, parents before children
    ///
    /// Opportunities come first so summaries can resolve them, then
    /// summaries so links can; instructions are independent and go last.
    /// A failed transformer is recorded and the rest still run; entities
    /// downstream of the failure simply find fewer parents and their rows
    /// stay pending until the next run.
    async fn transform_stage(&self, summary: &mut RunSummary) {
        tracing::info!("Starting transformation");

        let order = match self.config.transform.fetch_order.parse::<FetchOrder>() {
            Ok(order) => order,
            Err(message) => {
                tracing::error!(error = %message, "Invalid transform fetch order");
                summary.add_error(RunError::new(RunStage::Transform, "config", message));
                return;
            }
        };
        let settings = BatchSettings::new(
            self.config.transform.batch_size,
            self.config.transform.max_records,
            order,
        );

        let mut transformers: Vec<Box<dyn EntityTransformer>> = vec![
            Box::new(OpportunityTransformer::new(self.target.clone(), settings)),
            Box::new(SummaryTransformer::new(self.target.clone(), settings)),
            Box::new(LinkTransformer::new(
                self.target.clone(),
                LinkEntity::ApplicantType,
                settings,
            )),
            Box::new(LinkTransformer::new(
                self.target.clone(),
                LinkEntity::FundingCategory,
                settings,
            )),
            Box::new(LinkTransformer::new(
                self.target.clone(),
                LinkEntity::FundingInstrument,
                settings,
            )),
            Box::new(InstructionTransformer::new(
                self.target.clone(),
                self.blobs.clone(),
                settings,
            )),
        ];

        for transformer in &mut transformers {
            let entity = transformer.entity();
            if let Err(e) = run_to_completion(transformer.as_mut(), &mut summary.metrics).await {
                tracing::error!(entity, error = %e, "Transformer failed");
                summary.add_error(RunError::new(RunStage::Transform, entity, e.to_string()));
            }
        }
    }
}
