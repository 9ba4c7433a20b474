//! docsplice: insert generated docstrings below marked Python definitions.
//!
//! - **file mode**: `docsplice module.py [-o out.py]`
//! - **package mode**: `docsplice -d package/ [-o mirror/] [--no-subpackages]`

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser, ValueEnum};
use docsplice::processor::UnitReport;
use docsplice::walk::{self, WalkReport};
use docsplice::{
    DocError, FormatLayout, ProcessOptions, TreeWalker, UnitProcessor, DEFAULT_MARKER,
};
use log::LevelFilter;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "docsplice",
    about = "Generate docstrings for marked Python functions and classes"
)]
#[command(group(ArgGroup::new("input").required(true).args(["file", "directory"])))]
struct Cli {
    /// Python file to document
    file: Option<PathBuf>,

    /// Package directory to document
    #[arg(short = 'd', long)]
    directory: Option<PathBuf>,

    /// Only document the package's own modules, not its sub-packages
    #[arg(long)]
    no_subpackages: bool,

    /// Name of the decorator marking definitions to document
    #[arg(long, default_value = DEFAULT_MARKER)]
    marker_name: String,

    /// Leave the marker decorators in the output
    #[arg(long)]
    keep_markers: bool,

    /// Output file (file mode) or directory (package mode). Defaults to
    /// rewriting the input in place.
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Built-in layout: simple, emphasized
    #[arg(long, default_value = "simple")]
    layout: String,

    /// Custom layout file (JSON or YAML) with the keys description, fields,
    /// items, prefix and suffix
    #[arg(long, conflicts_with = "layout")]
    config: Option<PathBuf>,

    /// Log verbosity, overridden by RUST_LOG
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warning => LevelFilter::Warn,
            LogLevel::Error => LevelFilter::Error,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(cli.log_level.into())
        .parse_default_env()
        .format_timestamp(None)
        .init();

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every unit and entry was documented.
fn run(cli: &Cli) -> Result<bool> {
    let input = cli
        .file
        .as_deref()
        .or(cli.directory.as_deref())
        .context("no input given")?;
    if !input.exists() {
        return Err(DocError::NotFound {
            path: input.to_path_buf(),
        }
        .into());
    }

    let layout = load_layout(cli)?;
    let processor = UnitProcessor::new(ProcessOptions {
        layout,
        strip_markers: !cli.keep_markers,
        marker: cli.marker_name.clone(),
    });

    match (&cli.file, &cli.directory) {
        (Some(file), _) => document_file(&processor, file, cli.output.as_deref()),
        (None, Some(dir)) => document_package(
            &processor,
            dir,
            cli.output.as_deref(),
            !cli.no_subpackages,
        ),
        (None, None) => bail!("no input given"),
    }
}

fn load_layout(cli: &Cli) -> Result<FormatLayout> {
    let layout = match &cli.config {
        Some(path) => FormatLayout::from_file(path)?,
        None => FormatLayout::named(&cli.layout)?,
    };
    Ok(layout)
}

fn document_file(processor: &UnitProcessor, file: &Path, output: Option<&Path>) -> Result<bool> {
    if file.is_dir() {
        bail!("{} is a directory; use --directory", file.display());
    }
    if let Some(out) = output.filter(|o| o.is_dir()) {
        return Err(DocError::OutputConflict {
            path: out.to_path_buf(),
            expected_not: "a directory",
        }
        .into());
    }

    match processor.process(file, output) {
        Ok(report) => {
            print_unit(&report);
            Ok(report.is_success())
        }
        Err(e) => {
            eprintln!("error: {e}");
            Ok(false)
        }
    }
}

fn document_package(
    processor: &UnitProcessor,
    root: &Path,
    output: Option<&Path>,
    recurse: bool,
) -> Result<bool> {
    walk::check_tree_paths(root, output)?;
    let report = TreeWalker::new(processor, recurse)
        .walk(root, output)
        .with_context(|| format!("failed to document {}", root.display()))?;
    print_walk(&report);
    Ok(report.is_success())
}

fn print_unit(report: &UnitReport) {
    eprintln!(
        "{}: {} documented, {} failed",
        report.unit.display(),
        report.documented.len(),
        report.failures.len()
    );
    for failure in &report.failures {
        eprintln!("  {}: {}", failure.entry, failure.error);
    }
}

fn print_walk(report: &WalkReport) {
    for unit in report.units.iter().filter(|u| !u.is_success()) {
        print_unit(unit);
    }
    for failure in &report.failures {
        eprintln!("error: {}", failure.error);
    }
    for path in &report.foreign {
        eprintln!("skipped {} (outside the package)", path.display());
    }
    eprintln!(
        "{} entries documented in {} modules, {} entry failures, {} module failures",
        report.documented(),
        report.units.len(),
        report.entry_failures(),
        report.failures.len()
    );
}
