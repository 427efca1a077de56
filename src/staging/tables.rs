//! Canonical staging table identities
//!
//! Every mirrored source table is addressed through one [`StagingTable`]
//! variant. Adapters resolve the physical names by qualifying the canonical
//! name with the configured source schema (foreign side) or staging schema
//! (local side), so one identity names both halves of a sync table pair.

use crate::domain::enums::LinkEntity;
use std::fmt;
use std::str::FromStr;

/// One mirrored source table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StagingTable {
    Opportunity,
    Summary,
    SummaryHist,
    ApplicantType,
    ApplicantTypeHist,
    FundingCategory,
    FundingCategoryHist,
    FundingInstrument,
    FundingInstrumentHist,
    Instruction,
}

impl StagingTable {
    /// All tables, in sync order
    pub fn all() -> [StagingTable; 10] {
        [
            StagingTable::Opportunity,
            StagingTable::Summary,
            StagingTable::SummaryHist,
            StagingTable::ApplicantType,
            StagingTable::ApplicantTypeHist,
            StagingTable::FundingCategory,
            StagingTable::FundingCategoryHist,
            StagingTable::FundingInstrument,
            StagingTable::FundingInstrumentHist,
            StagingTable::Instruction,
        ]
    }

    /// Canonical table name, shared by the source table and its mirror
    pub fn as_str(&self) -> &'static str {
        match self {
            StagingTable::Opportunity => "opportunity",
            StagingTable::Summary => "summary",
            StagingTable::SummaryHist => "summary_hist",
            StagingTable::ApplicantType => "applicant_type",
            StagingTable::ApplicantTypeHist => "applicant_type_hist",
            StagingTable::FundingCategory => "funding_category",
            StagingTable::FundingCategoryHist => "funding_category_hist",
            StagingTable::FundingInstrument => "funding_instrument",
            StagingTable::FundingInstrumentHist => "funding_instrument_hist",
            StagingTable::Instruction => "instruction",
        }
    }

    /// Metric entity name for sync counters, distinct from the
    /// transformation entity names
    pub fn metric_entity(&self) -> String {
        format!("staging.{}", self.as_str())
    }

    /// True for historical revision tables, whose rows key by
    /// `(id, revision_number)`
    pub fn is_historical(&self) -> bool {
        matches!(
            self,
            StagingTable::SummaryHist
                | StagingTable::ApplicantTypeHist
                | StagingTable::FundingCategoryHist
                | StagingTable::FundingInstrumentHist
        )
    }

    /// Name of the legacy primary-key column in the source table
    ///
    /// Historical tables pair this with `revision_number`.
    pub fn source_key_column(&self) -> &'static str {
        match self {
            StagingTable::Opportunity => "opportunity_id",
            StagingTable::Summary | StagingTable::SummaryHist => "summary_id",
            StagingTable::ApplicantType
            | StagingTable::ApplicantTypeHist
            | StagingTable::FundingCategory
            | StagingTable::FundingCategoryHist
            | StagingTable::FundingInstrument
            | StagingTable::FundingInstrumentHist => "link_id",
            StagingTable::Instruction => "instruction_id",
        }
    }

    /// The link kind this table feeds, for the three link entities
    pub fn link_entity(&self) -> Option<LinkEntity> {
        match self {
            StagingTable::ApplicantType | StagingTable::ApplicantTypeHist => {
                Some(LinkEntity::ApplicantType)
            }
            StagingTable::FundingCategory | StagingTable::FundingCategoryHist => {
                Some(LinkEntity::FundingCategory)
            }
            StagingTable::FundingInstrument | StagingTable::FundingInstrumentHist => {
                Some(LinkEntity::FundingInstrument)
            }
            _ => None,
        }
    }
}

impl fmt::Display for StagingTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StagingTable {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "opportunity" => Ok(StagingTable::Opportunity),
            "summary" => Ok(StagingTable::Summary),
            "summary_hist" => Ok(StagingTable::SummaryHist),
            "applicant_type" => Ok(StagingTable::ApplicantType),
            "applicant_type_hist" => Ok(StagingTable::ApplicantTypeHist),
            "funding_category" => Ok(StagingTable::FundingCategory),
            "funding_category_hist" => Ok(StagingTable::FundingCategoryHist),
            "funding_instrument" => Ok(StagingTable::FundingInstrument),
            "funding_instrument_hist" => Ok(StagingTable::FundingInstrumentHist),
            "instruction" => Ok(StagingTable::Instruction),
            other => Err(format!("unknown staging table: {other}")),
        }
    }
}
