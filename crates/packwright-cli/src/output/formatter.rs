//! Output formatter trait for CLI results.

use anyhow::Result;
use packwright_core::ArchiverResult;
use packwright_core::ArchiverType;
use serde::Serialize;
use std::path::Path;

/// Common output formatter trait
pub trait OutputFormatter {
    /// Format the result of a finished `create`
    fn format_creation_result(
        &self,
        output_path: &Path,
        format: ArchiverType,
        result: &ArchiverResult,
    ) -> Result<()>;

    /// Format the digests of an existing archive
    fn format_checksum_result(&self, archive: &Path, result: &ArchiverResult) -> Result<()>;

    /// Format warning message
    fn format_warning(&self, message: &str);
}

/// Generic JSON output structure
#[derive(Debug, Serialize)]
pub struct JsonOutput<T> {
    pub operation: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Warning,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn success(operation: impl Into<String>, data: T) -> Self {
        Self {
            operation: operation.into(),
            status: Status::Success,
            data: Some(data),
        }
    }

    pub fn warning(operation: impl Into<String>, data: T) -> Self {
        Self {
            operation: operation.into(),
            status: Status::Warning,
            data: Some(data),
        }
    }
}

/// Digest fields shared by every JSON result
#[derive(Debug, Serialize)]
pub struct DigestOutput {
    pub size: u64,
    pub sha256: String,
    pub md5: String,
}

impl From<&ArchiverResult> for DigestOutput {
    fn from(result: &ArchiverResult) -> Self {
        Self {
            size: result.size,
            sha256: result.sha256.clone(),
            md5: result.md5.clone(),
        }
    }
}
