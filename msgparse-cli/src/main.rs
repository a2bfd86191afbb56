use std::path::Path;

use clap::Parser;

use msgparse_cli::cli::{Cli, Commands};
use msgparse_cli::commands;
use msgparse_cli::error::CliError;
use msgparse_cli::logging;
use msgparse_cli::output::OutputWriter;
use msgparse_core::config::{GeneralConfig, MsgparseConfig};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!("error: {err}");
        std::process::exit(err.exit_code());
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let writer = OutputWriter::new(cli.output);
    let config_path = cli.config.as_deref();
    let log_level = cli.log_level.as_deref();

    match cli.command {
        Commands::Check(args) => {
            let config = setup(config_path, log_level).await?;
            commands::check::execute(args, &config, &writer).await
        }
        Commands::Parse(args) => {
            let config = setup(config_path, log_level).await?;
            commands::parse::execute(args, &config, &writer).await
        }
        Commands::Config(args) => {
            // a broken file is reported by the command, not fatal here
            logging::init_tracing(&GeneralConfig::default(), log_level)?;
            commands::config::execute(args, config_path, &writer).await
        }
    }
}

async fn setup(
    config_path: Option<&Path>,
    log_level: Option<&str>,
) -> Result<MsgparseConfig, CliError> {
    let config = commands::load_config(config_path).await?;
    logging::init_tracing(&config.general, log_level)?;
    tracing::debug!(
        config = %config_path.map(|p| p.display().to_string()).unwrap_or_default(),
        catalog = %config.engine.catalog_path,
        "msgparse starting"
    );
    Ok(config)
}
