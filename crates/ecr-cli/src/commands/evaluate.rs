use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use ecr_core::PatientExecutionState;
use ecr_engine::config::ValueSetConfig;
use ecr_engine::{
    ActionRegistry, DataRetrievalService, ReferenceValueSet, StaticValueSetProvider, Workflow,
};
use ecr_fhir::{BundleFileRetriever, FhirServerDataRetriever};

use crate::cli::{EvaluateArgs, OutputFormat};
use crate::commands::read_launch;
use crate::config::AppConfig;
use crate::output::{print_json, print_status_table, print_success};

pub async fn evaluate(config: &AppConfig, args: &EvaluateArgs, format: OutputFormat) -> Result<()> {
    let mut launch = read_launch(&args.launch)?;

    let retrieval: Arc<dyn DataRetrievalService> = match &args.bundle {
        Some(path) => Arc::new(BundleFileRetriever::new(path)),
        None => Arc::new(FhirServerDataRetriever::new(config.fhir.clone())?),
    };
    let value_sets = load_value_sets(&config.value_set, args.value_set.as_deref())?;

    let registry = ActionRegistry::builder()
        .data_retrieval(retrieval)
        .value_sets(value_sets)
        .build();
    let workflow = Workflow::from_config(registry, &config.engine_config())?;

    workflow.run(&mut launch).await?;

    let state = PatientExecutionState::from_status(&launch.status)?;
    let status = &state.match_trigger_status;
    let summary = format!(
        "Evaluated launch {}: trigger match {} ({} matched codes)",
        launch.launch_id.cyan(),
        status.trigger_match_status,
        status.matched_code_tokens().len()
    );

    match &args.output {
        Some(path) => {
            let json = serde_json::to_string_pretty(&launch)?;
            fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            print_success(&summary);
        }
        None => match format {
            OutputFormat::Json => print_json(&launch)?,
            OutputFormat::Table => {
                print_success(&summary);
                print_status_table(status);
            }
        },
    }
    Ok(())
}

/// Builds the value-set provider from a file or from inline codes.
///
/// A file carries its own identifier and version; inline codes use the
/// configured ones.
fn load_value_sets(
    config: &ValueSetConfig,
    override_path: Option<&Path>,
) -> Result<Arc<StaticValueSetProvider>> {
    let provider = match override_path.or(config.path.as_deref()) {
        Some(path) => StaticValueSetProvider::from_file(path, None, None)?,
        None => {
            if config.codes.is_empty() {
                tracing::warn!(
                    value_set = %config.id,
                    "No value set file or codes configured; nothing can match"
                );
            }
            StaticValueSetProvider::new(ReferenceValueSet::new(
                config.id.clone(),
                config.version.clone(),
                config.codes.iter().cloned(),
            ))
        }
    };
    Ok(Arc::new(provider))
}
