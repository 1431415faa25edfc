use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "ecr")]
#[command(about = "eCR trigger evaluation: match patient codes against reportable value sets")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to ./ecr.toml when present)
    #[arg(short, long, global = true, env = "ECR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true)]
    pub format: Option<OutputFormat>,
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Table,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the configured workflow against a launch context
    Evaluate(EvaluateArgs),
    /// Show the match-trigger status stored in a launch context
    State(StateArgs),
    /// List the configured workflow actions
    Actions,
}

#[derive(clap::Args)]
pub struct EvaluateArgs {
    /// Launch context JSON file
    #[arg(long)]
    pub launch: PathBuf,
    /// Read clinical data from a FHIR Bundle file
    #[arg(long, conflicts_with = "server", required_unless_present = "server")]
    pub bundle: Option<PathBuf>,
    /// Retrieve clinical data from the launch's EHR FHIR server
    #[arg(long)]
    pub server: bool,
    /// FHIR ValueSet JSON file (overrides value_set.path)
    #[arg(long)]
    pub value_set: Option<PathBuf>,
    /// Write the updated launch context here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct StateArgs {
    /// Launch context JSON file
    #[arg(long)]
    pub launch: PathBuf,
}
