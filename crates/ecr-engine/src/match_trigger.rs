//! Match-trigger action.
//!
//! Pulls the patient's clinical data for the launch window, extracts codes at
//! each configured trigger path and intersects them with the reportable value
//! set. The outcome is written to the `matchTriggerStatus` sub-status of the
//! launch's execution state.
//!
//! The action runs in full on every invocation, including when the job is
//! already `COMPLETED`: later workflow steps re-run matching because clinical
//! data may be entered after the launch.

use async_trait::async_trait;
use ecr_core::{EcrError, EcrResult, JobStatus, LaunchContext, PatientExecutionState};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::action::{Action, ActionDefinition};
use crate::config::MatchPolicy;
use crate::matcher::match_codes;
use crate::registry::ActionRegistry;

pub struct MatchTriggerAction {
    definition: ActionDefinition,
    registry: Arc<ActionRegistry>,
    policy: MatchPolicy,
}

impl MatchTriggerAction {
    pub fn new(
        definition: ActionDefinition,
        registry: Arc<ActionRegistry>,
        policy: MatchPolicy,
    ) -> Self {
        Self {
            definition,
            registry,
            policy,
        }
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }
}

/// Logs and returns a fatal error.
fn fail(err: EcrError) -> EcrError {
    error!(kind = %err.kind(), "{err}");
    err
}

#[async_trait]
impl Action for MatchTriggerAction {
    fn definition(&self) -> &ActionDefinition {
        &self.definition
    }

    async fn execute(&self, context: &mut LaunchContext) -> EcrResult<()> {
        info!(
            action_id = %self.action_id(),
            launch_id = %context.launch_id,
            "Executing match trigger action"
        );

        context.validate().map_err(fail)?;

        let mut state = PatientExecutionState::from_status(&context.status).map_err(fail)?;
        if state.patient_id.is_none() {
            state.patient_id = Some(context.launch_patient_id.clone());
            state.encounter_id = context.encounter_id.clone();
        }
        state.match_trigger_status.action_id = Some(self.action_id().to_string());

        debug!(
            prior_job_status = state.match_trigger_status.job_status.as_str(),
            prior_state = %context.status,
            "Prior execution state"
        );

        let retrieval = self.registry.data_retrieval().ok_or_else(|| {
            fail(EcrError::configuration(
                "data retrieval service is not registered",
            ))
        })?;

        let window = context.window();
        info!(window = %window, "Retrieving clinical data for trigger matching");
        let data = retrieval
            .get_data(context, window.start, window.end)
            .await
            .map_err(|e| fail(EcrError::retrieval(format!("data retrieval failed: {e}"))))?
            .ok_or_else(|| {
                fail(EcrError::retrieval(
                    "No FHIR data retrieved to match trigger codes",
                ))
            })?;

        if self.definition.trigger_data.is_empty() {
            return Err(fail(EcrError::configuration(
                "No trigger data to match trigger codes",
            )));
        }

        let status = &mut state.match_trigger_status;
        status.begin_pass();

        for trigger in &self.definition.trigger_data {
            debug!(path = %trigger.path, "Matching trigger codes");

            let candidates = data.code_tokens_for_path(&trigger.path);
            if candidates.is_empty() {
                debug!(path = %trigger.path, "No codes found for path");
                continue;
            }
            info!(path = %trigger.path, codes = candidates.len(), "Found patient codes");

            let value_set = self
                .registry
                .value_sets()
                .ok_or_else(|| {
                    fail(EcrError::configuration(
                        "reportable value set provider is not registered",
                    ))
                })?
                .reportable_value_set();
            debug!(
                value_set = %value_set.id,
                codes = value_set.len(),
                "Codes in trigger value set"
            );

            let outcome = match_codes(&candidates, &value_set.codes);
            if outcome.is_match {
                info!(
                    path = %trigger.path,
                    matched = outcome.intersection.len(),
                    "Matched trigger codes"
                );
                status.trigger_match_status = true;
                status.add_matched_codes(
                    outcome.intersection,
                    value_set.id.clone(),
                    trigger.path.clone(),
                    value_set.version.clone(),
                );
            } else {
                info!(path = %trigger.path, "No matched codes found");
                if self.policy == MatchPolicy::LastWriteWins {
                    status.trigger_match_status = false;
                }
            }
        }

        // Completed means evaluated, not matched; consumers read triggerMatchStatus.
        status.job_status = JobStatus::Completed;
        let trigger_match_status = status.trigger_match_status;

        context.status = state.to_status().map_err(fail)?;

        info!(
            action_id = %self.action_id(),
            trigger_match_status,
            "Match trigger action completed"
        );
        Ok(())
    }
}
