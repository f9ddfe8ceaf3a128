//! rpa-splice - Inspect and edit marker-delimited containers
//!
//! Splits a container on its marker, identifies each chunk by magic number,
//! and rebuilds it after adds, replacements and deletions.

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rpa_splice::cli::{self, commands, AppContext, Cli, Commands};
use rpa_splice::Config;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose {
        "debug".to_string()
    } else {
        let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
        Config::load_from(&config_path)
            .map(|c| c.general.log_level)
            .unwrap_or_else(|_| "info".to_string())
    };
    let (directive, bad_level) = match cli::log_directive(&level) {
        Some(directive) => (directive, false),
        None => (cli::log_directive("info").context("Invalid default log level")?, true),
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).compact())
        .with(EnvFilter::from_default_env().add_directive(directive))
        .init();
    if bad_level {
        tracing::warn!("Unknown log_level {:?} in config; using info", level);
    }

    let ctx = AppContext::from_cli(&cli)?;

    match &cli.command {
        Some(Commands::List(args)) => commands::list(&ctx, args)?,
        Some(Commands::Info(args)) => commands::info(&ctx, args)?,
        Some(Commands::Extract(args)) => commands::extract(&ctx, args)?,
        Some(Commands::Add(args)) => commands::add(&ctx, args)?,
        Some(Commands::Replace(args)) => commands::replace(&ctx, args)?,
        Some(Commands::Delete(args)) => commands::delete(&ctx, args)?,
        Some(Commands::Sniff(args)) => commands::sniff(&ctx, args)?,
        Some(Commands::Signatures(args)) => commands::signatures(&ctx, args)?,
        Some(Commands::Config(args)) => commands::config(&ctx, args)?,
        Some(Commands::Interactive(args)) => cli::interactive::run_interactive_session(&ctx, args)?,
        None => {
            // Default: run interactive mode
            cli::interactive::run_interactive_session(&ctx, &cli::InteractiveArgs::default())?;
        }
    }

    Ok(())
}
