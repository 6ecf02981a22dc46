//! Occultum CLI
//!
//! Ask the ancient spellbook questions answered from its scrolls.

use anyhow::Result;
use clap::Parser;
use occultum_core::error::exit_codes;
use occultum_core::{Config, OccultumError};

mod app;
mod commands;

use app::{Cli, Commands};

#[tokio::main]
async fn main() {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    let format = cli.format;
    if let Err(err) = run(cli).await {
        let code = exit_code(&err);
        commands::print_error(&format!("{:#}", err), code, format);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let format = cli.format;

    match cli.command {
        Commands::Ask(args) => commands::ask::run(args, config, format).await,
        Commands::Shell(args) => commands::shell::run(args, config, format).await,
        Commands::Search(args) => commands::search::run(args, config, format).await,
        Commands::Add(args) => commands::add::run(args, &config, format).await,
        Commands::Import(args) => commands::import::run(args, &config, format).await,
        Commands::Status => commands::status::run(&config, format).await,
        Commands::Config => commands::config::run(&config, format),
    }
}

/// File, then environment, then command-line flags
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match cli.config {
        Some(ref path) => {
            let mut config = Config::load_file(path)?;
            config.apply_env(|key| std::env::var(key).ok())?;
            config
        }
        None => Config::load()?,
    };
    cli.apply(&mut config);
    Ok(config)
}

fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<OccultumError>()
        .map(OccultumError::exit_code)
        .unwrap_or(exit_codes::GENERAL_ERROR)
}
