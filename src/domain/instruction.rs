//! Competition instruction domain record

use crate::domain::errors::TransformError;
use crate::domain::ids::InstructionId;
use crate::staging::normalize::clean_file_extension;
use crate::staging::records::LegacyInstruction;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// A competition's application instruction document
///
/// The document bytes live in blob storage at `storage_path`; this record
/// holds the metadata. The path is derived deterministically from the
/// legacy competition id and the cleaned file extension, so repeated
/// transformations of the same logical document resolve to the same
/// location.
#[derive(Debug, Clone, PartialEq)]
pub struct CompetitionInstruction {
    pub instruction_id: InstructionId,
    pub legacy_instruction_id: i64,
    pub legacy_competition_id: i64,
    /// Original file name, trimmed
    pub file_name: String,
    pub extension: String,
    pub storage_path: String,
    pub content_type: String,
    pub file_size_bytes: i64,
    /// Lowercase hex SHA-256 of the document bytes
    pub checksum_sha256: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CompetitionInstruction {
    /// Derived blob location for a competition's instruction document
    pub fn storage_path_for(legacy_competition_id: i64, extension: &str) -> String {
        format!("competitions/{legacy_competition_id}/instructions/instructions.{extension}")
    }

    /// Content type implied by a cleaned file extension
    pub fn content_type_for(extension: &str) -> &'static str {
        match extension {
            "pdf" => "application/pdf",
            "doc" => "application/msword",
            "docx" => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            "xls" => "application/vnd.ms-excel",
            "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            "txt" => "text/plain",
            "rtf" => "application/rtf",
            "htm" | "html" => "text/html",
            "zip" => "application/zip",
            _ => "application/octet-stream",
        }
    }

    /// Builds a fresh record from a legacy row
    ///
    /// Requires a usable file name (with a recoverable extension) and the
    /// document bytes; either missing is a per-record error, since an
    /// instruction without its document is meaningless downstream.
    pub fn from_legacy(
        record: &LegacyInstruction,
        existing: Option<&CompetitionInstruction>,
        now: DateTime<Utc>,
    ) -> Result<Self, TransformError> {
        let file_name = record
            .file_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(TransformError::MissingRequiredField {
                entity: "instruction",
                field: "file_name",
            })?;
        let extension = clean_file_extension(file_name).ok_or(
            TransformError::MissingRequiredField {
                entity: "instruction",
                field: "file_name",
            },
        )?;
        let bytes = record
            .file_lob
            .as_deref()
            .ok_or(TransformError::MissingRequiredField {
                entity: "instruction",
                field: "file_lob",
            })?;

        Ok(Self {
            instruction_id: existing
                .map(|e| e.instruction_id)
                .unwrap_or_else(InstructionId::generate),
            legacy_instruction_id: record.instruction_id,
            legacy_competition_id: record.competition_id,
            file_name: file_name.to_string(),
            storage_path: Self::storage_path_for(record.competition_id, &extension),
            content_type: Self::content_type_for(&extension).to_string(),
            extension,
            file_size_bytes: bytes.len() as i64,
            checksum_sha256: format!("{:x}", Sha256::digest(bytes)),
            created_at: existing.map(|e| e.created_at).unwrap_or(now),
            updated_at: now,
        })
    }
}
