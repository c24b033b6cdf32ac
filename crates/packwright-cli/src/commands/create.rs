//! Create command implementation.

use crate::cli::CreateArgs;
use crate::error::add_archive_context;
use crate::output::OutputFormatter;
use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use packwright_core::ArchiveError;
use packwright_core::ArchiveSettings;
use packwright_core::Archiver;
use packwright_core::ArchiverType;
use packwright_core::create_archive;
use packwright_core::paths;
use std::path::Path;

pub fn execute(args: &CreateArgs, formatter: &dyn OutputFormatter) -> Result<()> {
    let format = resolve_format(args)?;

    if args.output.exists() {
        if !args.force {
            bail!(
                "Output file '{}' already exists\n\
                 HINT: Use --force to overwrite.",
                args.output.display()
            );
        }
        formatter.format_warning(&format!(
            "Overwriting existing file '{}'",
            args.output.display()
        ));
    }

    let mut settings = ArchiveSettings::default()
        .with_exclude_list(args.exclude.clone())
        .with_symlink(args.keep_symlinks)
        .with_deterministic(args.deterministic);
    if let Some(mode) = args.file_mode {
        settings = settings.with_file_mode(mode);
    }
    if let Some(level) = args.compression_level {
        settings = settings.with_compression_level(level);
    }

    tracing::debug!(
        output = %args.output.display(),
        %format,
        sources = args.sources.len(),
        "creating archive"
    );

    let result = add_archive_context(
        create_archive(&args.output, format, settings, |archiver| {
            add_sources(archiver, &args.sources)?;
            for (name, text) in &args.content {
                archiver.archive_content(text.as_bytes(), name)?;
            }
            Ok(())
        }),
        &args.output,
    )?;

    formatter.format_creation_result(&args.output, format, &result)
}

fn resolve_format(args: &CreateArgs) -> Result<ArchiverType> {
    if let Some(format) = args.format {
        return Ok(format.into());
    }
    ArchiverType::from_path(&args.output).with_context(|| {
        format!(
            "Cannot detect archive format from '{}'\n\
             HINT: Use a .zip, .tar.gz or .tgz extension, or pass --format zip|tar.",
            args.output.display()
        )
    })
}

/// Adds command-line sources to an open archiver.
///
/// A lone directory source has its contents placed at the archive root. With
/// several sources each one is stored under its own name.
fn add_sources(
    archiver: &mut dyn Archiver,
    sources: &[impl AsRef<Path>],
) -> packwright_core::Result<()> {
    if let [source] = sources
        && source.as_ref().is_dir()
    {
        return archiver.archive_dir(source.as_ref(), "");
    }

    for source in sources {
        let source = source.as_ref();
        archiver.archive_file(source, &entry_name(source)?)?;
    }
    Ok(())
}

/// The final component of `source`, after resolving `.` and `..`.
fn entry_name(source: &Path) -> packwright_core::Result<String> {
    let absolute = paths::absolute_path(source)
        .map_err(ArchiveError::io_with("resolve", source))?;
    Ok(absolute
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default())
}
