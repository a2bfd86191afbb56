//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// msgparse -- rule-driven parser for vendor syslog messages.
///
/// Use `msgparse <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "msgparse", version, about, long_about = None)]
pub struct Cli {
    /// Path to the msgparse.toml configuration file.
    ///
    /// When omitted, built-in defaults plus `MSGPARSE_*` environment overrides are used.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON (one object per record for `parse`).
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile a message catalog and report unreachable candidates.
    Check(CheckArgs),

    /// Parse log lines from a file or stdin through a catalog.
    Parse(ParseArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- check ----

/// Compile a catalog without processing any traffic.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Catalog file (default: `engine.catalog_path` from the configuration).
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Treat lint findings as failures.
    #[arg(long)]
    pub strict: bool,
}

// ---- parse ----

/// Run lines through the dispatcher and print one record per line.
#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Catalog file (default: `engine.catalog_path` from the configuration).
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Input file, one message per line. Reads stdin when omitted or `-`.
    pub input: Option<PathBuf>,

    /// Override the default timezone offset for date parsing (`local` or `+HH:MM`).
    #[arg(long)]
    pub tz: Option<String>,

    /// Print only per-status counts instead of records.
    #[arg(long)]
    pub summary: bool,
}

impl ParseArgs {
    /// Returns the input path, or `None` for stdin.
    pub fn input_path(&self) -> Option<&PathBuf> {
        self.input.as_ref().filter(|p| p.as_os_str() != "-")
    }
}

// ---- config ----

/// Manage msgparse configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, engine).
        #[arg(long)]
        section: Option<String>,
    },
}
