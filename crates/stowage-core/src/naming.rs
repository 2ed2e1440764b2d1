//! Instance naming codec.
//!
//! An instance name is `<container_id>-<name>-<path>` where name and path
//! have every character that is unsafe in filenames, and `-` itself,
//! replaced with [`PLACEHOLDER`]. Backup artifacts are named
//! `<instance_name>-<YYMMDD>.tar.gz`, so an artifact name always splits
//! into exactly four `-`-delimited fields.

use chrono::NaiveDate;
use thiserror::Error;

/// Replacement for forbidden characters.
pub const PLACEHOLDER: char = '%';

/// Field separator inside instance and artifact names.
pub const SEPARATOR: char = '-';

/// Extension of every artifact written by stowage.
pub const ARTIFACT_EXTENSION: &str = ".tar.gz";

/// chrono format of the artifact date field.
pub const DATE_FORMAT: &str = "%y%m%d";

const FORBIDDEN: [char; 10] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|', SEPARATOR];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("{file_name}: expected 4 '-'-separated fields, found {found}")]
    FieldCount { file_name: String, found: usize },

    #[error("{file_name}: malformed date segment {segment:?}")]
    Date { file_name: String, segment: String },
}

pub type CodecResult<T> = Result<T, CodecError>;

/// Replace forbidden characters and the separator with [`PLACEHOLDER`].
pub fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| if FORBIDDEN.contains(&c) { PLACEHOLDER } else { c })
        .collect()
}

/// Build the instance name for a `(container_id, container_name, path)`.
pub fn instance_name(container_id: &str, container_name: &str, path_backed: &str) -> String {
    format!(
        "{container_id}{SEPARATOR}{}{SEPARATOR}{}",
        sanitize(container_name),
        sanitize(path_backed)
    )
}

/// Artifact file name for an instance backed up on `date`.
pub fn artifact_file_name(instance_name: &str, date: NaiveDate) -> String {
    format!(
        "{instance_name}{SEPARATOR}{}{ARTIFACT_EXTENSION}",
        date.format(DATE_FORMAT)
    )
}

/// A parsed artifact file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactName {
    /// Canonical instance name the artifact belongs to.
    pub instance_name: String,
    /// Calendar date embedded in the name.
    pub date: NaiveDate,
}

impl ArtifactName {
    /// Parse an artifact file name.
    ///
    /// The instance part is re-encoded so the result always equals what
    /// [`instance_name`] produces for the same id, name and path.
    pub fn parse(file_name: &str) -> CodecResult<Self> {
        let stem = strip_extension(file_name);
        let fields: Vec<&str> = stem.split(SEPARATOR).collect();
        let [container_id, name, path, date_field] = fields[..] else {
            return Err(CodecError::FieldCount {
                file_name: file_name.to_string(),
                found: fields.len(),
            });
        };

        let date = parse_date(date_field).ok_or_else(|| CodecError::Date {
            file_name: file_name.to_string(),
            segment: date_field.to_string(),
        })?;

        Ok(Self {
            instance_name: instance_name(container_id, name, path),
            date,
        })
    }
}

fn strip_extension(file_name: &str) -> &str {
    if let Some(stem) = file_name.strip_suffix(ARTIFACT_EXTENSION) {
        return stem;
    }
    // Foreign file: drop the last extension, leaving dotfiles intact.
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => &file_name[..idx],
        _ => file_name,
    }
}

fn parse_date(field: &str) -> Option<NaiveDate> {
    if field.len() != 6 || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(field, DATE_FORMAT).ok()
}
