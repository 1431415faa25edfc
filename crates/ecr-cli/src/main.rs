mod cli;
mod commands;
mod config;
mod observability;
mod output;

use anyhow::{Result, anyhow};
use clap::Parser;

use cli::{Cli, Commands};
use output::print_error;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let format = cli.format.unwrap_or_default();

    let app_config = config::loader::load_config(cli.config.as_deref()).map_err(|e| anyhow!(e))?;
    observability::init_tracing_with_level(&app_config.logging.level);
    tracing::debug!(match_policy = ?app_config.engine.match_policy, "Configuration loaded");

    match &cli.command {
        Commands::Evaluate(args) => {
            commands::evaluate::evaluate(&app_config, args, format).await?;
        }
        Commands::State(args) => {
            commands::state::state(args, format)?;
        }
        Commands::Actions => {
            commands::actions::actions(&app_config, format)?;
        }
    }

    Ok(())
}
