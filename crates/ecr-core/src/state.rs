//! Per-patient execution state persisted in a launch context.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

use crate::error::{EcrError, EcrResult};

/// Lifecycle of one evaluation pass.
///
/// `Completed` means "evaluation finished", not "a reportable condition was
/// found"; it is re-entered whenever the job runs again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    #[default]
    NotStarted,
    Scheduled,
    InProgress,
    Completed,
    Aborted,
    Suspended,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::NotStarted => "NOT_STARTED",
            JobStatus::Scheduled => "SCHEDULED",
            JobStatus::InProgress => "IN_PROGRESS",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Aborted => "ABORTED",
            JobStatus::Suspended => "SUSPENDED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "NOT_STARTED" => Some(JobStatus::NotStarted),
            "SCHEDULED" => Some(JobStatus::Scheduled),
            "IN_PROGRESS" => Some(JobStatus::InProgress),
            "COMPLETED" => Some(JobStatus::Completed),
            "ABORTED" => Some(JobStatus::Aborted),
            "SUSPENDED" => Some(JobStatus::Suspended),
            _ => None,
        }
    }
}

/// Evidence of one successful match: which path, against which value set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedTriggerCodes {
    /// Code path the candidate codes were extracted from.
    pub path: String,
    /// Identifier (OID) of the reference value set.
    pub value_set: String,
    /// Version of the reference value set.
    pub value_set_version: String,
    /// Codes present in both the patient data and the value set.
    pub matched_codes: BTreeSet<String>,
}

/// Sub-status owned by the match-trigger action.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchTriggerStatus {
    /// Action that last ran against this status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_id: Option<String>,
    #[serde(default)]
    pub job_status: JobStatus,
    #[serde(default)]
    pub trigger_match_status: bool,
    #[serde(default)]
    pub matched_codes: Vec<MatchedTriggerCodes>,
}

impl MatchTriggerStatus {
    /// Resets match evidence so a new pass never merges with a stale one.
    pub fn begin_pass(&mut self) {
        self.trigger_match_status = false;
        self.matched_codes.clear();
    }

    pub fn add_matched_codes(
        &mut self,
        codes: BTreeSet<String>,
        value_set: impl Into<String>,
        path: impl Into<String>,
        value_set_version: impl Into<String>,
    ) {
        self.matched_codes.push(MatchedTriggerCodes {
            path: path.into(),
            value_set: value_set.into(),
            value_set_version: value_set_version.into(),
            matched_codes: codes,
        });
    }

    /// What downstream document generation checks before reporting.
    pub fn is_reportable(&self) -> bool {
        self.trigger_match_status
    }

    /// All matched codes across every match record.
    pub fn matched_code_tokens(&self) -> BTreeSet<&str> {
        self.matched_codes
            .iter()
            .flat_map(|m| m.matched_codes.iter().map(String::as_str))
            .collect()
    }
}

/// Decoded form of [`LaunchContext::status`].
///
/// Sub-statuses written by other workflow steps are kept verbatim in
/// `other_statuses` so an untouched state re-serializes without loss.
///
/// Decoding normalizes the fields this type owns: a `null` `patientId` or
/// `encounterId` is written back absent, and a missing `matchTriggerStatus`
/// is written back as a `NOT_STARTED` record.
///
/// [`LaunchContext::status`]: crate::launch::LaunchContext::status
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientExecutionState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encounter_id: Option<String>,
    #[serde(default)]
    pub match_trigger_status: MatchTriggerStatus,
    #[serde(flatten)]
    pub other_statuses: Map<String, Value>,
}

impl PatientExecutionState {
    pub fn new(patient_id: impl Into<String>, encounter_id: Option<String>) -> Self {
        Self {
            patient_id: Some(patient_id.into()),
            encounter_id,
            ..Self::default()
        }
    }

    /// Decodes a persisted status field.
    ///
    /// A blank field is a launch no action has run against yet and decodes to
    /// the default state.
    ///
    /// # Errors
    ///
    /// Returns `EcrError::StateCorruption` when the text is not a valid state.
    pub fn from_status(status: &str) -> EcrResult<Self> {
        if status.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(status).map_err(|e| {
            EcrError::state_corruption(format!("Unable to read execution state: {e}"))
        })
    }

    /// Encodes the state for the persisted status field.
    ///
    /// # Errors
    ///
    /// Returns `EcrError::SerializationFailure` if encoding fails.
    pub fn to_status(&self) -> EcrResult<String> {
        serde_json::to_string(self).map_err(|e| {
            EcrError::serialization(format!("Unable to update execution state: {e}"))
        })
    }
}
