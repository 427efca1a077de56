//! Domain enumerations and legacy-code mapping tables
//!
//! The legacy source encodes categorical values as short codes (single
//! letters, two-letter subject codes, two-digit applicant codes). Each
//! enumeration here owns the explicit, exhaustive mapping from those codes;
//! an unmapped code is a hard [`TransformError::UnrecognizedCode`], never a
//! silent default.

use crate::domain::errors::TransformError;
use std::fmt;

/// Normalizes a legacy code for lookup: trims whitespace, uppercases
fn canonical(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Opportunity category, mapped from the legacy single-letter code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpportunityCategory {
    Discretionary,
    Mandatory,
    Continuation,
    Earmark,
    Other,
}

impl OpportunityCategory {
    /// Maps a legacy category letter to the enumeration
    pub fn from_legacy_code(code: &str) -> Result<Self, TransformError> {
        match canonical(code).as_str() {
            "D" => Ok(Self::Discretionary),
            "M" => Ok(Self::Mandatory),
            "C" => Ok(Self::Continuation),
            "E" => Ok(Self::Earmark),
            "O" => Ok(Self::Other),
            _ => Err(TransformError::UnrecognizedCode {
                entity: "opportunity_category",
                code: code.to_string(),
            }),
        }
    }

    /// Stable storage name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discretionary => "discretionary",
            Self::Mandatory => "mandatory",
            Self::Continuation => "continuation",
            Self::Earmark => "earmark",
            Self::Other => "other",
        }
    }

    /// Parses a stored name back to the enumeration
    pub fn from_stored(value: &str) -> Result<Self, String> {
        match value {
            "discretionary" => Ok(Self::Discretionary),
            "mandatory" => Ok(Self::Mandatory),
            "continuation" => Ok(Self::Continuation),
            "earmark" => Ok(Self::Earmark),
            "other" => Ok(Self::Other),
            _ => Err(format!("unknown stored opportunity category: {value}")),
        }
    }
}

impl fmt::Display for OpportunityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Funding instrument, mapped from the legacy code on instrument link rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FundingInstrument {
    CooperativeAgreement,
    Grant,
    ProcurementContract,
    Other,
}

impl FundingInstrument {
    pub fn from_legacy_code(code: &str) -> Result<Self, TransformError> {
        match canonical(code).as_str() {
            "CA" => Ok(Self::CooperativeAgreement),
            "G" => Ok(Self::Grant),
            "PC" => Ok(Self::ProcurementContract),
            "O" => Ok(Self::Other),
            _ => Err(TransformError::UnrecognizedCode {
                entity: "funding_instrument",
                code: code.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CooperativeAgreement => "cooperative_agreement",
            Self::Grant => "grant",
            Self::ProcurementContract => "procurement_contract",
            Self::Other => "other",
        }
    }

    pub fn from_stored(value: &str) -> Result<Self, String> {
        match value {
            "cooperative_agreement" => Ok(Self::CooperativeAgreement),
            "grant" => Ok(Self::Grant),
            "procurement_contract" => Ok(Self::ProcurementContract),
            "other" => Ok(Self::Other),
            _ => Err(format!("unknown stored funding instrument: {value}")),
        }
    }
}

impl fmt::Display for FundingInstrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Funding activity category, mapped from the legacy two/three-letter
/// subject code on category link rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FundingCategory {
    Agriculture,
    Arts,
    BusinessAndCommerce,
    CommunityDevelopment,
    ConsumerProtection,
    DisasterPreventionAndRelief,
    Education,
    EmploymentLaborAndTraining,
    Energy,
    Environment,
    FoodAndNutrition,
    Health,
    Housing,
    Humanities,
    IncomeSecurityAndSocialServices,
    InformationAndStatistics,
    LawJusticeAndLegalServices,
    NaturalResources,
    RecoveryAct,
    RegionalDevelopment,
    ScienceAndTechnology,
    Transportation,
    AffordableCareAct,
    Other,
}

impl FundingCategory {
    pub fn from_legacy_code(code: &str) -> Result<Self, TransformError> {
        match canonical(code).as_str() {
            "AG" => Ok(Self::Agriculture),
            "AR" => Ok(Self::Arts),
            "BC" => Ok(Self::BusinessAndCommerce),
            "CD" => Ok(Self::CommunityDevelopment),
            "CP" => Ok(Self::ConsumerProtection),
            "DPR" => Ok(Self::DisasterPreventionAndRelief),
            "ED" => Ok(Self::Education),
            "ELT" => Ok(Self::EmploymentLaborAndTraining),
            "EN" => Ok(Self::Energy),
            "ENV" => Ok(Self::Environment),
            "FN" => Ok(Self::FoodAndNutrition),
            "HL" => Ok(Self::Health),
            "HO" => Ok(Self::Housing),
            "HU" => Ok(Self::Humanities),
            "ISS" => Ok(Self::IncomeSecurityAndSocialServices),
            "IS" => Ok(Self::InformationAndStatistics),
            "LJL" => Ok(Self::LawJusticeAndLegalServices),
            "NR" => Ok(Self::NaturalResources),
            "RA" => Ok(Self::RecoveryAct),
            "RD" => Ok(Self::RegionalDevelopment),
            "ST" => Ok(Self::ScienceAndTechnology),
            "T" => Ok(Self::Transportation),
            "ACA" => Ok(Self::AffordableCareAct),
            "O" => Ok(Self::Other),
            _ => Err(TransformError::UnrecognizedCode {
                entity: "funding_category",
                code: code.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Agriculture => "agriculture",
            Self::Arts => "arts",
            Self::BusinessAndCommerce => "business_and_commerce",
            Self::CommunityDevelopment => "community_development",
            Self::ConsumerProtection => "consumer_protection",
            Self::DisasterPreventionAndRelief => "disaster_prevention_and_relief",
            Self::Education => "education",
            Self::EmploymentLaborAndTraining => "employment_labor_and_training",
            Self::Energy => "energy",
            Self::Environment => "environment",
            Self::FoodAndNutrition => "food_and_nutrition",
            Self::Health => "health",
            Self::Housing => "housing",
            Self::Humanities => "humanities",
            Self::IncomeSecurityAndSocialServices => "income_security_and_social_services",
            Self::InformationAndStatistics => "information_and_statistics",
            Self::LawJusticeAndLegalServices => "law_justice_and_legal_services",
            Self::NaturalResources => "natural_resources",
            Self::RecoveryAct => "recovery_act",
            Self::RegionalDevelopment => "regional_development",
            Self::ScienceAndTechnology => "science_and_technology",
            Self::Transportation => "transportation",
            Self::AffordableCareAct => "affordable_care_act",
            Self::Other => "other",
        }
    }

    pub fn from_stored(value: &str) -> Result<Self, String> {
        match value {
            "agriculture" => Ok(Self::Agriculture),
            "arts" => Ok(Self::Arts),
            "business_and_commerce" => Ok(Self::BusinessAndCommerce),
            "community_development" => Ok(Self::CommunityDevelopment),
            "consumer_protection" => Ok(Self::ConsumerProtection),
            "disaster_prevention_and_relief" => Ok(Self::DisasterPreventionAndRelief),
            "education" => Ok(Self::Education),
            "employment_labor_and_training" => Ok(Self::EmploymentLaborAndTraining),
            "energy" => Ok(Self::Energy),
            "environment" => Ok(Self::Environment),
            "food_and_nutrition" => Ok(Self::FoodAndNutrition),
            "health" => Ok(Self::Health),
            "housing" => Ok(Self::Housing),
            "humanities" => Ok(Self::Humanities),
            "income_security_and_social_services" => Ok(Self::IncomeSecurityAndSocialServices),
            "information_and_statistics" => Ok(Self::InformationAndStatistics),
            "law_justice_and_legal_services" => Ok(Self::LawJusticeAndLegalServices),
            "natural_resources" => Ok(Self::NaturalResources),
            "recovery_act" => Ok(Self::RecoveryAct),
            "regional_development" => Ok(Self::RegionalDevelopment),
            "science_and_technology" => Ok(Self::ScienceAndTechnology),
            "transportation" => Ok(Self::Transportation),
            "affordable_care_act" => Ok(Self::AffordableCareAct),
            "other" => Ok(Self::Other),
            _ => Err(format!("unknown stored funding category: {value}")),
        }
    }
}

impl fmt::Display for FundingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Eligible applicant type, mapped from the legacy two-digit code on
/// applicant-type link rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApplicantType {
    StateGovernments,
    CountyGovernments,
    CityOrTownshipGovernments,
    SpecialDistrictGovernments,
    IndependentSchoolDistricts,
    PublicAndStateInstitutionsOfHigherEducation,
    FederallyRecognizedNativeAmericanTribalGovernments,
    PublicHousingAuthorities,
    OtherNativeAmericanTribalOrganizations,
    NonprofitsWith501c3,
    NonprofitsWithout501c3,
    PrivateInstitutionsOfHigherEducation,
    Individuals,
    ForProfitOrganizationsOtherThanSmallBusinesses,
    SmallBusinesses,
    Other,
    Unrestricted,
}

impl ApplicantType {
    pub fn from_legacy_code(code: &str) -> Result<Self, TransformError> {
        match canonical(code).as_str() {
            "00" => Ok(Self::StateGovernments),
            "01" => Ok(Self::CountyGovernments),
            "02" => Ok(Self::CityOrTownshipGovernments),
            "04" => Ok(Self::SpecialDistrictGovernments),
            "05" => Ok(Self::IndependentSchoolDistricts),
            "06" => Ok(Self::PublicAndStateInstitutionsOfHigherEducation),
            "07" => Ok(Self::FederallyRecognizedNativeAmericanTribalGovernments),
            "08" => Ok(Self::PublicHousingAuthorities),
            "11" => Ok(Self::OtherNativeAmericanTribalOrganizations),
            "12" => Ok(Self::NonprofitsWith501c3),
            "13" => Ok(Self::NonprofitsWithout501c3),
            "20" => Ok(Self::PrivateInstitutionsOfHigherEducation),
            "21" => Ok(Self::Individuals),
            "22" => Ok(Self::ForProfitOrganizationsOtherThanSmallBusinesses),
            "23" => Ok(Self::SmallBusinesses),
            "25" => Ok(Self::Other),
            "99" => Ok(Self::Unrestricted),
            _ => Err(TransformError::UnrecognizedCode {
                entity: "applicant_type",
                code: code.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StateGovernments => "state_governments",
            Self::CountyGovernments => "county_governments",
            Self::CityOrTownshipGovernments => "city_or_township_governments",
            Self::SpecialDistrictGovernments => "special_district_governments",
            Self::IndependentSchoolDistricts => "independent_school_districts",
            Self::PublicAndStateInstitutionsOfHigherEducation => {
                "public_and_state_institutions_of_higher_education"
            }
            Self::FederallyRecognizedNativeAmericanTribalGovernments => {
                "federally_recognized_native_american_tribal_governments"
            }
            Self::PublicHousingAuthorities => "public_housing_authorities",
            Self::OtherNativeAmericanTribalOrganizations => {
                "other_native_american_tribal_organizations"
            }
            Self::NonprofitsWith501c3 => "nonprofits_with_501c3",
            Self::NonprofitsWithout501c3 => "nonprofits_without_501c3",
            Self::PrivateInstitutionsOfHigherEducation => {
                "private_institutions_of_higher_education"
            }
            Self::Individuals => "individuals",
            Self::ForProfitOrganizationsOtherThanSmallBusinesses => {
                "for_profit_organizations_other_than_small_businesses"
            }
            Self::SmallBusinesses => "small_businesses",
            Self::Other => "other",
            Self::Unrestricted => "unrestricted",
        }
    }

    pub fn from_stored(value: &str) -> Result<Self, String> {
        match value {
            "state_governments" => Ok(Self::StateGovernments),
            "county_governments" => Ok(Self::CountyGovernments),
            "city_or_township_governments" => Ok(Self::CityOrTownshipGovernments),
            "special_district_governments" => Ok(Self::SpecialDistrictGovernments),
            "independent_school_districts" => Ok(Self::IndependentSchoolDistricts),
            "public_and_state_institutions_of_higher_education" => {
                Ok(Self::PublicAndStateInstitutionsOfHigherEducation)
            }
            "federally_recognized_native_american_tribal_governments" => {
                Ok(Self::FederallyRecognizedNativeAmericanTribalGovernments)
            }
            "public_housing_authorities" => Ok(Self::PublicHousingAuthorities),
            "other_native_american_tribal_organizations" => {
                Ok(Self::OtherNativeAmericanTribalOrganizations)
            }
            "nonprofits_with_501c3" => Ok(Self::NonprofitsWith501c3),
            "nonprofits_without_501c3" => Ok(Self::NonprofitsWithout501c3),
            "private_institutions_of_higher_education" => {
                Ok(Self::PrivateInstitutionsOfHigherEducation)
            }
            "individuals" => Ok(Self::Individuals),
            "for_profit_organizations_other_than_small_businesses" => {
                Ok(Self::ForProfitOrganizationsOtherThanSmallBusinesses)
            }
            "small_businesses" => Ok(Self::SmallBusinesses),
            "other" => Ok(Self::Other),
            "unrestricted" => Ok(Self::Unrestricted),
            _ => Err(format!("unknown stored applicant type: {value}")),
        }
    }
}

impl fmt::Display for ApplicantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which of the three link kinds a summary link belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LinkEntity {
    ApplicantType,
    FundingCategory,
    FundingInstrument,
}

impl LinkEntity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApplicantType => "applicant_type",
            Self::FundingCategory => "funding_category",
            Self::FundingInstrument => "funding_instrument",
        }
    }

    pub fn from_stored(value: &str) -> Result<Self, String> {
        match value {
            "applicant_type" => Ok(Self::ApplicantType),
            "funding_category" => Ok(Self::FundingCategory),
            "funding_instrument" => Ok(Self::FundingInstrument),
            _ => Err(format!("unknown stored link entity: {value}")),
        }
    }

    /// Maps a legacy code through this kind's mapping table
    pub fn map_code(&self, code: &str) -> Result<LinkValue, TransformError> {
        match self {
            Self::ApplicantType => {
                ApplicantType::from_legacy_code(code).map(LinkValue::ApplicantType)
            }
            Self::FundingCategory => {
                FundingCategory::from_legacy_code(code).map(LinkValue::FundingCategory)
            }
            Self::FundingInstrument => {
                FundingInstrument::from_legacy_code(code).map(LinkValue::FundingInstrument)
            }
        }
    }
}

impl fmt::Display for LinkEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The mapped value carried by a summary link record
///
/// At most one active link exists per `(summary, value)`; stores enforce
/// this on upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkValue {
    ApplicantType(ApplicantType),
    FundingCategory(FundingCategory),
    FundingInstrument(FundingInstrument),
}

impl LinkValue {
    /// Which link kind this value belongs to
    pub fn entity(&self) -> LinkEntity {
        match self {
            Self::ApplicantType(_) => LinkEntity::ApplicantType,
            Self::FundingCategory(_) => LinkEntity::FundingCategory,
            Self::FundingInstrument(_) => LinkEntity::FundingInstrument,
        }
    }

    /// Stable storage name of the inner value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApplicantType(v) => v.as_str(),
            Self::FundingCategory(v) => v.as_str(),
            Self::FundingInstrument(v) => v.as_str(),
        }
    }

    /// Reconstructs a value from its stored `(entity, value)` pair
    pub fn from_stored(entity: &str, value: &str) -> Result<Self, String> {
        match LinkEntity::from_stored(entity)? {
            LinkEntity::ApplicantType => {
                ApplicantType::from_stored(value).map(Self::ApplicantType)
            }
            LinkEntity::FundingCategory => {
                FundingCategory::from_stored(value).map(Self::FundingCategory)
            }
            LinkEntity::FundingInstrument => {
                FundingInstrument::from_stored(value).map(Self::FundingInstrument)
            }
        }
    }
}

impl fmt::Display for LinkValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
