//! Human-readable output formatter with colors and styling.

use super::formatter::OutputFormatter;
use anyhow::Result;
use console::Term;
use console::style;
use packwright_core::ArchiverResult;
use packwright_core::ArchiverType;
use std::path::Path;

pub struct HumanFormatter {
    verbose: bool,
    quiet: bool,
    use_colors: bool,
    term: Term,
}

impl HumanFormatter {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            use_colors: console::colors_enabled(),
            term: Term::stdout(),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn format_size(bytes: u64) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if bytes >= GB {
            format!("{:.1} GB", bytes as f64 / GB as f64)
        } else if bytes >= MB {
            format!("{:.1} MB", bytes as f64 / MB as f64)
        } else if bytes >= KB {
            format!("{:.1} KB", bytes as f64 / KB as f64)
        } else {
            format!("{bytes} B")
        }
    }

    fn write_digests(&self, result: &ArchiverResult) {
        let _ = self.term.write_line(&format!(
            "  Size:     {} ({} bytes)",
            Self::format_size(result.size),
            result.size
        ));
        let _ = self
            .term
            .write_line(&format!("  SHA-256:  {}", result.sha256));
        let _ = self.term.write_line(&format!("  MD5:      {}", result.md5));
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_creation_result(
        &self,
        output_path: &Path,
        format: ArchiverType,
        result: &ArchiverResult,
    ) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        if self.use_colors {
            let _ = self.term.write_line(&format!(
                "{} Archive created: {}",
                style("✓").green().bold(),
                output_path.display()
            ));
        } else {
            let _ = self
                .term
                .write_line(&format!("Archive created: {}", output_path.display()));
        }

        let _ = self.term.write_line("");
        if self.verbose {
            let _ = self.term.write_line(&format!("  Format:   {format}"));
        }
        self.write_digests(result);

        Ok(())
    }

    fn format_checksum_result(&self, archive: &Path, result: &ArchiverResult) -> Result<()> {
        // Quiet mode keeps the sha256sum-style line so scripts can still use it.
        if self.quiet {
            let _ = self
                .term
                .write_line(&format!("{}  {}", result.sha256, archive.display()));
            return Ok(());
        }

        if self.use_colors {
            let _ = self
                .term
                .write_line(&format!("{}", style(archive.display()).bold()));
        } else {
            let _ = self.term.write_line(&archive.display().to_string());
        }
        self.write_digests(result);

        Ok(())
    }

    fn format_warning(&self, message: &str) {
        if self.quiet {
            return;
        }

        if self.use_colors {
            let _ = self
                .term
                .write_line(&format!("{} {message}", style("⚠").yellow().bold()));
        } else {
            let _ = self.term.write_line(&format!("WARNING: {message}"));
        }
    }
}
