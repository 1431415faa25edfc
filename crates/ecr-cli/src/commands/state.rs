use anyhow::Result;
use ecr_core::PatientExecutionState;

use crate::cli::{OutputFormat, StateArgs};
use crate::commands::read_launch;
use crate::output::{print_json, print_status_table};

pub fn state(args: &StateArgs, format: OutputFormat) -> Result<()> {
    let launch = read_launch(&args.launch)?;
    let state = PatientExecutionState::from_status(&launch.status)?;
    match format {
        OutputFormat::Json => print_json(&state.match_trigger_status)?,
        OutputFormat::Table => print_status_table(&state.match_trigger_status),
    }
    Ok(())
}
