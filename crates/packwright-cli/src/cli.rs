//! CLI argument parsing using clap.

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use clap_complete::Shell;
use packwright_core::ArchiverType;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "packwright")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new archive
    Create(CreateArgs),
    /// Print size and digests of an existing archive
    Checksum(ChecksumArgs),
    /// Generate shell completions
    Completion(CompletionArgs),
}

/// Archive container format selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    /// ZIP archive
    Zip,
    /// Gzip-compressed TAR archive
    Tar,
}

impl From<FormatArg> for ArchiverType {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Zip => Self::Zip,
            FormatArg::Tar => Self::Tar,
        }
    }
}

#[derive(clap::Args)]
pub struct CreateArgs {
    /// Output archive file path
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Source files or directories to archive
    #[arg(value_name = "SOURCE", required = true)]
    pub sources: Vec<PathBuf>,

    /// Archive format (default: detected from the output extension)
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,

    /// Path to leave out, together with everything under it (can be repeated)
    #[arg(long = "exclude", short = 'x', value_name = "PATH")]
    pub exclude: Vec<PathBuf>,

    /// Permission bits of the created archive, in octal
    #[arg(long, value_name = "OCTAL", value_parser = parse_octal_mode)]
    pub file_mode: Option<u32>,

    /// Store symbolic links as links instead of their targets' content
    #[arg(long)]
    pub keep_symlinks: bool,

    /// Pin timestamps and ownership for reproducible output
    #[arg(long)]
    pub deterministic: bool,

    /// Compression level (1-9)
    #[arg(short = 'l', long, value_parser = clap::value_parser!(u8).range(1..=9))]
    pub compression_level: Option<u8>,

    /// Add an in-memory file entry (can be repeated)
    #[arg(long = "content", value_name = "NAME=TEXT", value_parser = parse_content)]
    pub content: Vec<(String, String)>,

    /// Overwrite output file if exists
    #[arg(short = 'f', long)]
    pub force: bool,
}

#[derive(clap::Args)]
pub struct ChecksumArgs {
    /// Path to the archive file
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,
}

#[derive(clap::Args)]
pub struct CompletionArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Parse a permission mode written in octal, with optional `0o` or `0` prefix
fn parse_octal_mode(s: &str) -> Result<u32, String> {
    let s = s.trim();
    let digits = s.strip_prefix("0o").unwrap_or(s);
    if digits.is_empty() {
        return Err("empty file mode".to_string());
    }

    let mode = u32::from_str_radix(digits, 8).map_err(|_| format!("invalid octal mode: {s}"))?;
    if mode > 0o7777 {
        return Err(format!("file mode out of range (max 7777): {s}"));
    }
    Ok(mode)
}

/// Parse `NAME=TEXT`; the text may itself contain `=`
fn parse_content(s: &str) -> Result<(String, String), String> {
    let (name, text) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=TEXT, got: {s}"))?;
    if name.is_empty() {
        return Err(format!("entry name is empty: {s}"));
    }
    Ok((name.to_string(), text.to_string()))
}
