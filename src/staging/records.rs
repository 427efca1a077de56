//! Typed shapes of the mirrored legacy records
//!
//! Staged payloads are JSON documents mirroring the source columns. These
//! structs give each source table an explicit shape; transformers decode a
//! payload into the matching struct and treat a shape mismatch as a
//! per-record error rather than trusting the legacy side to be consistent.
//!
//! All timestamps here are naive US-Eastern wall-clock values exactly as the
//! source stores them; conversion to UTC happens in the normalizers.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One row of the legacy opportunity table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyOpportunity {
    pub opportunity_id: i64,
    #[serde(default)]
    pub opp_number: Option<String>,
    #[serde(default)]
    pub opp_title: Option<String>,
    #[serde(default)]
    pub owning_agency: Option<String>,
    /// Single-letter category code
    #[serde(default)]
    pub opp_category: Option<String>,
    #[serde(default)]
    pub category_explanation: Option<String>,
    /// Legacy Y/N flag
    #[serde(default)]
    pub is_draft: Option<String>,
    #[serde(default)]
    pub revision_number: Option<i32>,
    #[serde(default)]
    pub modified_comments: Option<String>,
    #[serde(default)]
    pub created_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub last_upd_date: Option<NaiveDateTime>,
}

/// One row of the legacy summary table or its historical variant
///
/// Historical rows carry `revision_number` and an `action_type` letter;
/// current rows leave both null. The free-text "numeric" columns
/// (`number_of_awards`, `est_funding`, `award_ceiling`, `award_floor`) hold
/// digits, placeholder text, or nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacySummary {
    pub summary_id: i64,
    pub opportunity_id: i64,
    #[serde(default)]
    pub revision_number: Option<i32>,
    #[serde(default)]
    pub action_type: Option<String>,
    #[serde(default)]
    pub action_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub posting_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub response_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub archive_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub number_of_awards: Option<String>,
    #[serde(default)]
    pub est_funding: Option<String>,
    #[serde(default)]
    pub award_ceiling: Option<String>,
    #[serde(default)]
    pub award_floor: Option<String>,
    /// Legacy Y/N flag
    #[serde(default)]
    pub cost_sharing: Option<String>,
    #[serde(default)]
    pub summary_desc: Option<String>,
    #[serde(default)]
    pub agency_contact_desc: Option<String>,
    #[serde(default)]
    pub agency_email: Option<String>,
    #[serde(default)]
    pub agency_email_desc: Option<String>,
    #[serde(default)]
    pub agency_phone: Option<String>,
    #[serde(default)]
    pub created_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub last_upd_date: Option<NaiveDateTime>,
}

/// One row of a legacy link table (applicant type, funding category, or
/// funding instrument), current or historical
///
/// All three link kinds share this shape; only the meaning of `code`
/// differs, and the table identity decides which mapping applies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyLink {
    pub link_id: i64,
    pub summary_id: i64,
    #[serde(default)]
    pub revision_number: Option<i32>,
    #[serde(default)]
    pub action_type: Option<String>,
    /// The legacy code this link carries
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub created_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub last_upd_date: Option<NaiveDateTime>,
}

/// One row of the legacy competition instruction table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyInstruction {
    pub instruction_id: i64,
    pub competition_id: i64,
    /// Raw legacy file name, often with stray whitespace or doubled dots
    #[serde(default)]
    pub file_name: Option<String>,
    /// Document bytes, base64 in the staged payload
    #[serde(default, with = "lob_bytes")]
    pub file_lob: Option<Vec<u8>>,
    #[serde(default)]
    pub created_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub last_upd_date: Option<NaiveDateTime>,
}

/// Serde helper for large-object bytes inside staged payloads
///
/// Serializes as base64. Deserialization also accepts PostgreSQL hex
/// notation (`\x...`) so payloads staged straight off a `bytea` column
/// still decode.
mod lob_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match bytes {
            Some(b) => serializer.serialize_str(&STANDARD.encode(b)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value: Option<String> = Option::deserialize(deserializer)?;
        match value {
            None => Ok(None),
            Some(s) if s.starts_with("\\x") => decode_hex(&s[2..])
                .map(Some)
                .map_err(serde::de::Error::custom),
            Some(s) => STANDARD
                .decode(s.as_bytes())
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }

    fn decode_hex(s: &str) -> Result<Vec<u8>, String> {
        if s.len() % 2 != 0 {
            return Err("odd-length hex string".to_string());
        }
        (0..s.len())
            .step_by(2)
            .map(|i| {
                u8::from_str_radix(&s[i..i + 2], 16)
                    .map_err(|e| format!("invalid hex byte at {i}: {e}"))
            })
            .collect()
    }
}
