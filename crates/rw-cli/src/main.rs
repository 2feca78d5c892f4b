use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use rw_cli::commands::{put, run, serve, status, tick};
use rw_cli::{Cli, Commands, Config};

fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    match &cli.command {
        Some(Commands::Run(args)) => {
            let mut config = load_config(cli.config.as_deref())?;
            config.apply_run_args(args);
            run::run(&config, args.sets_durations()).await?;
        }
        Some(Commands::Serve { listen }) => {
            let config = load_config(cli.config.as_deref())?;
            serve::run(&config, listen.as_deref()).await?;
        }
        Some(Commands::Status { json }) => {
            let config = load_config(cli.config.as_deref())?;
            status::run(&mut std::io::stdout(), &config, *json).await?;
        }
        Some(Commands::Tick) => {
            let config = load_config(cli.config.as_deref())?;
            tick::run(&config).await?;
        }
        Some(Commands::Put { work, rest }) => {
            let config = load_config(cli.config.as_deref())?;
            put::run(&config, *work, *rest).await?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
