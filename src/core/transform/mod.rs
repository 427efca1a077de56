//! Staging-to-domain transformation
//!
//! One transformer per entity reads its pending staging rows in batches,
//! builds typed domain records, and applies each batch as a single
//! transaction of domain writes plus staging marks. Records fail
//! individually: a bad row is logged and left pending while the rest of
//! the batch commits, so the untransformed backlog doubles as the retry
//! queue.
//!
//! The [`dispatcher`] module holds the batch driver and the pieces shared
//! by every transformer; the entity modules hold the per-record rules.

pub mod dispatcher;
pub mod instructions;
pub mod links;
pub mod opportunity;
pub mod summary;

pub use dispatcher::{run_to_completion, BatchSettings, EntityTransformer};
pub use instructions::InstructionTransformer;
pub use links::LinkTransformer;
pub use opportunity::OpportunityTransformer;
pub use summary::SummaryTransformer;
