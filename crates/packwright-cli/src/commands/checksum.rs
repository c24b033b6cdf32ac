//! Checksum command implementation

use crate::cli::ChecksumArgs;
use crate::error::add_archive_context;
use crate::output::OutputFormatter;
use anyhow::Result;
use packwright_core::ArchiverResult;

pub fn execute(args: &ChecksumArgs, formatter: &dyn OutputFormatter) -> Result<()> {
    let result = add_archive_context(ArchiverResult::from_path(&args.archive), &args.archive)?;
    formatter.format_checksum_result(&args.archive, &result)
}
