//! Command handlers -- one module per subcommand

pub mod check;
pub mod config;
pub mod parse;

use std::path::{Path, PathBuf};

use msgparse_core::config::MsgparseConfig;

use crate::error::CliError;

/// Load the effective configuration.
///
/// With a path, the file is read and `MSGPARSE_*` overrides are applied on top.
/// Without one, defaults are used with the same overrides.
pub async fn load_config(path: Option<&Path>) -> Result<MsgparseConfig, CliError> {
    match path {
        Some(path) => Ok(MsgparseConfig::load(path).await?),
        None => {
            let mut config = MsgparseConfig::default();
            config.apply_env_overrides();
            config.validate()?;
            Ok(config)
        }
    }
}

/// Explicit `--catalog` wins over `engine.catalog_path`.
pub(crate) fn catalog_path(explicit: Option<&Path>, config: &MsgparseConfig) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&config.engine.catalog_path))
}

/// Human-readable config source for reports.
pub(crate) fn describe_source(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "(defaults)".to_owned())
}
