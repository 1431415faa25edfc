use anyhow::Result;
use ecr_engine::{ActionRegistry, Workflow};

use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::output::{print_actions_table, print_json};

pub fn actions(config: &AppConfig, format: OutputFormat) -> Result<()> {
    // Collaborators are not needed to describe actions.
    let workflow = Workflow::from_config(ActionRegistry::builder().build(), &config.engine_config())?;
    for action in workflow.actions() {
        action.print();
    }

    match format {
        OutputFormat::Json => print_json(&config.actions)?,
        OutputFormat::Table => print_actions_table(&config.actions),
    }
    Ok(())
}
