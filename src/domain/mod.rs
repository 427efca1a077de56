//! Domain models and types for Strata.
//!
//! This module contains the normalized records the transformation engine
//! produces, the enumerations legacy codes map into, and the crate's error
//! types.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`OpportunityId`], [`SummaryId`],
//!   [`LinkId`], [`InstructionId`])
//! - **Domain records** ([`Opportunity`], [`OpportunitySummary`],
//!   [`SummaryLink`], [`CompetitionInstruction`])
//! - **Legacy-code enumerations** ([`OpportunityCategory`],
//!   [`FundingCategory`], [`FundingInstrument`], [`ApplicantType`])
//! - **Error types** ([`StrataError`], [`TransformError`]) and the
//!   [`Result`] alias
//!
//! # Identity
//!
//! Every domain record carries a UUID identity separate from the legacy id
//! it was transformed from. The legacy-id column on each record is the only
//! bridge between the two worlds; repeated transformation runs look the
//! counterpart up through it and reuse the same identity instead of
//! duplicating records.
//!
//! # Construction
//!
//! Records are always built from scratch by their `from_legacy`
//! constructors, which run the value normalizers and legacy-code mappings:
//!
//! ```rust
//! use strata::domain::Opportunity;
//! use strata::staging::records::LegacyOpportunity;
//! use chrono::Utc;
//!
//! # fn example(record: LegacyOpportunity) -> Result<(), Box<dyn std::error::Error>> {
//! let opportunity = Opportunity::from_legacy(&record, None, Utc::now())?;
//! # Ok(())
//! # }
//! ```
//!
//! A populate error (unmapped code, malformed flag) surfaces as a
//! [`TransformError`] before anything is written, so the previously
//! committed record is never half-mutated.

pub mod enums;
pub mod errors;
pub mod ids;
pub mod instruction;
pub mod link;
pub mod opportunity;
pub mod result;
pub mod summary;

// Re-export commonly used types for convenience
pub use enums::{
    ApplicantType, FundingCategory, FundingInstrument, LinkEntity, LinkValue, OpportunityCategory,
};
pub use errors::{StrataError, TransformError};
pub use ids::{InstructionId, LinkId, OpportunityId, SummaryId};
pub use instruction::CompetitionInstruction;
pub use link::SummaryLink;
pub use opportunity::Opportunity;
pub use result::Result;
pub use summary::OpportunitySummary;
