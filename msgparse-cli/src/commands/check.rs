//! `msgparse check` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use msgparse_core::config::MsgparseConfig;
use msgparse_engine::{Catalog, CatalogLoader, FunctionRegistry};

use crate::cli::CheckArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `check` command.
///
/// Compiles the catalog and renders a [`CheckReport`]. Load and compile failures
/// surface as [`CliError::Catalog`]; lint findings only fail under `--strict`.
pub async fn execute(
    args: CheckArgs,
    config: &MsgparseConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let path = super::catalog_path(args.catalog.as_deref(), config);
    let report = run(&path).await?;

    writer.render(&report)?;

    if args.strict && !report.findings.is_empty() {
        return Err(CliError::Lint(report.findings.len()));
    }
    Ok(())
}

/// Compile the catalog at `path` and build a report.
pub async fn run(path: &Path) -> Result<CheckReport, CliError> {
    info!(path = %path.display(), "checking catalog");

    let functions = FunctionRegistry::with_builtins();
    let catalog = CatalogLoader::load_file(path, &functions).await?;

    Ok(CheckReport::new(path, &catalog))
}

/// Result of compiling one catalog.
#[derive(Debug, Serialize)]
pub struct CheckReport {
    /// Catalog file path
    pub source: String,
    /// Catalog name
    pub catalog: String,
    /// Header rule count
    pub headers: usize,
    /// Total rule count (headers + messages)
    pub rules: usize,
    /// Known message ids, sorted
    pub message_ids: Vec<String>,
    /// Unreachable candidates
    pub findings: Vec<FindingEntry>,
}

impl CheckReport {
    fn new(path: &Path, catalog: &Catalog) -> Self {
        Self {
            source: path.display().to_string(),
            catalog: catalog.name().to_owned(),
            headers: catalog.header_rules().len(),
            rules: catalog.rule_count(),
            message_ids: catalog
                .message_ids()
                .into_iter()
                .map(str::to_owned)
                .collect(),
            findings: catalog
                .lint()
                .into_iter()
                .map(|f| FindingEntry {
                    location: f.location,
                    first: f.first,
                    second: f.second,
                    skeleton: f.skeleton,
                })
                .collect(),
        }
    }
}

/// One lint finding in serialisable form.
#[derive(Debug, Serialize)]
pub struct FindingEntry {
    pub location: String,
    pub first: String,
    pub second: String,
    pub skeleton: String,
}

impl Render for CheckReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Catalog: {} ({})", self.catalog.bold(), self.source)?;
        writeln!(
            w,
            "  Rules: {} ({} header, {} message)",
            self.rules,
            self.headers,
            self.rules - self.headers
        )?;
        writeln!(w, "  Message IDs: {}", self.message_ids.len())?;

        if self.findings.is_empty() {
            writeln!(w, "  Result: {}", "OK".green().bold())?;
            return Ok(());
        }

        writeln!(
            w,
            "  Result: {}",
            format!("{} unreachable candidate(s)", self.findings.len())
                .yellow()
                .bold()
        )?;
        for f in &self.findings {
            writeln!(
                w,
                "  {}: '{}' shadows '{}'",
                f.location.yellow(),
                f.first,
                f.second
            )?;
            writeln!(w, "      skeleton: {}", f.skeleton)?;
        }
        Ok(())
    }
}
