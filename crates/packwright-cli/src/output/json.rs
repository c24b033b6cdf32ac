//! JSON output formatter for machine-readable results.

use super::formatter::DigestOutput;
use super::formatter::JsonOutput;
use super::formatter::OutputFormatter;
use anyhow::Result;
use packwright_core::ArchiverResult;
use packwright_core::ArchiverType;
use serde::Serialize;
use std::io;
use std::io::Write;
use std::path::Path;

pub struct JsonFormatter;

impl JsonFormatter {
    fn output<T: Serialize>(value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(io::stdout(), "{json}")?;
        Ok(())
    }
}

#[derive(Serialize)]
struct CreationOutput {
    output_path: String,
    format: &'static str,
    #[serde(flatten)]
    digests: DigestOutput,
}

#[derive(Serialize)]
struct ChecksumOutput {
    archive: String,
    #[serde(flatten)]
    digests: DigestOutput,
}

impl OutputFormatter for JsonFormatter {
    fn format_creation_result(
        &self,
        output_path: &Path,
        format: ArchiverType,
        result: &ArchiverResult,
    ) -> Result<()> {
        let data = CreationOutput {
            output_path: output_path.display().to_string(),
            format: format.as_str(),
            digests: result.into(),
        };

        Self::output(&JsonOutput::success("create", data))
    }

    fn format_checksum_result(&self, archive: &Path, result: &ArchiverResult) -> Result<()> {
        let data = ChecksumOutput {
            archive: archive.display().to_string(),
            digests: result.into(),
        };

        Self::output(&JsonOutput::success("checksum", data))
    }

    fn format_warning(&self, message: &str) {
        #[derive(Serialize)]
        struct WarningData {
            message: String,
        }

        let output = JsonOutput::warning(
            "warning",
            WarningData {
                message: message.to_string(),
            },
        );
        let _ = Self::output(&output);
    }
}
