//! `msgparse parse` command handler
//!
//! Streams lines from a file or stdin through a [`Dispatcher`]. Every line yields
//! a record; lines that do not parse are tagged with their status, never dropped.

use std::io::Write;
use std::sync::Arc;

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::info;

use msgparse_core::config::MsgparseConfig;
use msgparse_core::types::{ParseStatus, Record};
use msgparse_engine::{DispatchOutcome, Dispatcher, FieldStore, FunctionRegistry};

use crate::cli::ParseArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `parse` command.
pub async fn execute(
    args: ParseArgs,
    config: &MsgparseConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let dispatcher = build_dispatcher(&args, config).await?;
    let mut out = std::io::BufWriter::new(std::io::stdout());
    let emit_records = !args.summary;

    let summary = match args.input_path() {
        Some(path) => {
            info!(input = %path.display(), "parsing file");
            let file = tokio::fs::File::open(path).await.map_err(|e| {
                CliError::Command(format!("cannot open input {}: {e}", path.display()))
            })?;
            run(BufReader::new(file), &dispatcher, writer, &mut out, emit_records).await?
        }
        None => {
            info!("parsing stdin");
            let stdin = BufReader::new(tokio::io::stdin());
            run(stdin, &dispatcher, writer, &mut out, emit_records).await?
        }
    };

    if args.summary {
        writer.render_to(&mut out, &summary)?;
    }
    out.flush()?;

    info!(
        total = summary.total,
        parsed = summary.parsed,
        action_failures = summary.action_failures,
        "parse finished"
    );
    Ok(())
}

/// Build a dispatcher from the engine section, applying `--catalog` and `--tz`.
pub async fn build_dispatcher(
    args: &ParseArgs,
    config: &MsgparseConfig,
) -> Result<Dispatcher, CliError> {
    let mut section = config.engine.clone();
    section.catalog_path = super::catalog_path(args.catalog.as_deref(), config)
        .display()
        .to_string();
    if let Some(tz) = &args.tz {
        section.tz_offset = tz.clone();
    }

    let functions = Arc::new(FunctionRegistry::with_builtins());
    Ok(Dispatcher::from_section(&section, functions).await?)
}

/// Dispatch every line of `reader`, writing records to `out` when `emit_records` is set.
///
/// Blank lines are skipped. The field store is reused across lines.
pub async fn run<R>(
    mut reader: R,
    dispatcher: &Dispatcher,
    writer: &OutputWriter,
    out: &mut dyn Write,
    emit_records: bool,
) -> Result<ParseSummary, CliError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::with_capacity(1024);
    let mut store = FieldStore::new();
    let mut summary = ParseSummary::default();

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            break;
        }
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        let outcome = dispatcher.dispatch_into(&line, &mut store);
        summary.observe(&outcome);

        if emit_records {
            let record = dispatcher.to_record(outcome, std::mem::take(&mut store));
            writer.emit_line(out, &record)?;
        }
    }

    Ok(summary)
}

/// Per-status line counts.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ParseSummary {
    pub total: u64,
    pub parsed: u64,
    pub no_header_match: u64,
    pub unknown_message_id: u64,
    pub no_rule_match: u64,
    pub oversized: u64,
    /// Failed actions across all lines
    pub action_failures: u64,
}

impl ParseSummary {
    fn observe(&mut self, outcome: &DispatchOutcome) {
        self.total += 1;
        self.action_failures += outcome.action_failures as u64;
        let slot = match outcome.status {
            ParseStatus::Parsed => &mut self.parsed,
            ParseStatus::NoHeaderMatch => &mut self.no_header_match,
            ParseStatus::UnknownMessageId => &mut self.unknown_message_id,
            ParseStatus::NoRuleMatch => &mut self.no_rule_match,
            ParseStatus::Oversized => &mut self.oversized,
        };
        *slot += 1;
    }
}

impl Render for ParseSummary {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Lines: {}", self.total.to_string().bold())?;
        writeln!(w, "  {:<20} {}", "parsed", self.parsed.to_string().green())?;
        for (label, count) in [
            (ParseStatus::NoHeaderMatch, self.no_header_match),
            (ParseStatus::UnknownMessageId, self.unknown_message_id),
            (ParseStatus::NoRuleMatch, self.no_rule_match),
            (ParseStatus::Oversized, self.oversized),
        ] {
            let count = if count > 0 {
                count.to_string().yellow()
            } else {
                count.to_string().normal()
            };
            writeln!(w, "  {:<20} {}", label.as_str(), count)?;
        }
        writeln!(w, "  {:<20} {}", "action failures", self.action_failures)?;
        Ok(())
    }
}

impl Render for Record {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let status = if self.is_parsed() {
            self.status.as_str().green()
        } else {
            self.status.as_str().yellow()
        };
        write!(w, "{status}")?;
        if let Some(header) = &self.header_rule {
            write!(w, " {header}")?;
        }
        if let Some(message) = &self.message_rule {
            write!(w, "/{message}")?;
        }
        if self.action_failures > 0 {
            write!(w, " ({} action failure(s))", self.action_failures)?;
        }
        writeln!(w)?;

        for (key, value) in &self.fields {
            writeln!(w, "  {key}={value:?}")?;
        }
        for (key, value) in &self.mapped {
            writeln!(w, "  {} {key}={value}", "->".dimmed())?;
        }
        Ok(())
    }
}
