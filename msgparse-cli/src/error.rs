//! CLI-specific error types and exit code mapping

use msgparse_core::error::MsgparseError;
use msgparse_engine::EngineError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to standard Unix exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// Catalog could not be loaded or compiled.
    #[error("catalog error: {0}")]
    Catalog(String),

    /// `check --strict` found unreachable candidates.
    #[error("lint failed: {0} finding(s)")]
    Lint(usize),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from msgparse-core.
    #[error("{0}")]
    Core(#[from] MsgparseError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                              |
    /// |------|--------------------------------------|
    /// | 0    | Success                              |
    /// | 1    | General / command error              |
    /// | 2    | Configuration error                  |
    /// | 3    | Catalog load or compile failure      |
    /// | 4    | Lint findings under `--strict`       |
    /// | 10   | IO error                             |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Core(MsgparseError::Config(_)) => 2,
            Self::Catalog(_) | Self::Core(MsgparseError::Catalog(_)) => 3,
            Self::Lint(_) => 4,
            Self::Io(_) | Self::Core(MsgparseError::Io(_)) => 10,
            Self::JsonSerialize(_) | Self::Command(_) => 1,
        }
    }
}

impl From<EngineError> for CliError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Config { .. } => Self::Config(e.to_string()),
            EngineError::Io(io) => Self::Io(io),
            other => Self::Catalog(other.to_string()),
        }
    }
}
