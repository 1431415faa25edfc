//! Launch context for one clinical session.
//!
//! A launch context identifies the EHR server, the patient and the time window
//! a workflow evaluates, and carries the serialized [`PatientExecutionState`]
//! in its `status` field. It is created once per launch and rewritten by every
//! action that runs against it.
//!
//! # Lifecycle
//!
//! - Created by the orchestration layer when the app is launched
//! - Read and rewritten by each workflow action (`status` only)
//! - Versioned by the launch-context store on every successful write
//!
//! [`PatientExecutionState`]: crate::state::PatientExecutionState

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{EcrError, EcrResult};
use crate::fhir::FhirVersion;
use crate::window::TimeWindow;

/// One clinical session as seen by the trigger engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchContext {
    /// Opaque launch identifier, the key used by the launch-context store.
    pub launch_id: String,

    /// Base URL of the EHR's FHIR endpoint.
    pub ehr_server_url: String,

    /// Patient the launch is about (FHIR resource ID).
    pub launch_patient_id: String,

    /// Current encounter ID, if the launch is encounter-scoped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encounter_id: Option<String>,

    /// FHIR version spoken by the EHR server.
    #[serde(default)]
    pub fhir_version: FhirVersion,

    /// Start of the inclusive evaluation window.
    #[serde(with = "time::serde::rfc3339")]
    pub start_date: OffsetDateTime,

    /// End of the inclusive evaluation window.
    #[serde(with = "time::serde::rfc3339")]
    pub end_date: OffsetDateTime,

    /// Serialized execution state. Empty until the first action runs.
    #[serde(default)]
    pub status: String,

    /// Optimistic-concurrency token, bumped by the store on every write.
    #[serde(default)]
    pub state_version: u64,
}

impl LaunchContext {
    /// Creates a launch context with an empty execution state.
    #[must_use]
    pub fn new(
        launch_id: impl Into<String>,
        ehr_server_url: impl Into<String>,
        launch_patient_id: impl Into<String>,
        window: TimeWindow,
    ) -> Self {
        Self {
            launch_id: launch_id.into(),
            ehr_server_url: ehr_server_url.into(),
            launch_patient_id: launch_patient_id.into(),
            encounter_id: None,
            fhir_version: FhirVersion::default(),
            start_date: window.start,
            end_date: window.end,
            status: String::new(),
            state_version: 0,
        }
    }

    #[must_use]
    pub fn with_encounter(mut self, encounter_id: impl Into<String>) -> Self {
        self.encounter_id = Some(encounter_id.into());
        self
    }

    #[must_use]
    pub fn with_fhir_version(mut self, fhir_version: FhirVersion) -> Self {
        self.fhir_version = fhir_version;
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.start_date, self.end_date)
    }

    /// Checks that the context can be evaluated at all.
    ///
    /// # Errors
    ///
    /// Returns `EcrError::PreconditionViolation` if the launch id or patient
    /// id is blank, or the window ends before it starts.
    pub fn validate(&self) -> EcrResult<()> {
        if self.launch_id.trim().is_empty() {
            return Err(EcrError::precondition("launch id must not be empty"));
        }
        if self.launch_patient_id.trim().is_empty() {
            return Err(EcrError::precondition(format!(
                "launch {} has no patient id",
                self.launch_id
            )));
        }
        if !self.window().is_ordered() {
            return Err(EcrError::precondition(format!(
                "launch {} has an inverted time window {}",
                self.launch_id,
                self.window()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;
    use time::macros::datetime;

    fn march() -> TimeWindow {
        TimeWindow::new(
            datetime!(2020-03-01 0:00 UTC),
            datetime!(2020-03-31 0:00 UTC),
        )
    }

    #[test]
    fn test_deserialize_launch_details() {
        let json = json!({
            "launchId": "launch-1",
            "ehrServerUrl": "https://ehr.example.org/fhir",
            "launchPatientId": "pat-1",
            "encounterId": "enc-9",
            "fhirVersion": "R4",
            "startDate": "2020-03-01T00:00:00Z",
            "endDate": "2020-03-31T00:00:00Z"
        });

        let ctx: LaunchContext = serde_json::from_value(json).unwrap();
        assert_eq!(ctx.launch_patient_id, "pat-1");
        assert_eq!(ctx.encounter_id.as_deref(), Some("enc-9"));
        assert_eq!(ctx.fhir_version, FhirVersion::R4);
        assert_eq!(ctx.status, "");
        assert_eq!(ctx.state_version, 0);
        assert_eq!(ctx.window(), march());
    }

    #[test]
    fn test_deserialize_lenient_fhir_version() {
        let decode = |tag: &str| {
            let json = json!({
                "launchId": "launch-1",
                "ehrServerUrl": "https://ehr.example.org/fhir",
                "launchPatientId": "pat-1",
                "fhirVersion": tag,
                "startDate": "2020-03-01T00:00:00Z",
                "endDate": "2020-03-31T00:00:00Z"
            });
            serde_json::from_value::<LaunchContext>(json).unwrap().fhir_version
        };

        assert_eq!(decode("R7"), FhirVersion::Dstu2);
        assert_eq!(decode("r4"), FhirVersion::R4);
        assert_eq!(decode("STU3"), FhirVersion::Dstu3);
        assert_eq!(decode("4.0.1"), FhirVersion::R4);
    }

    #[test]
    fn test_validate_accepts_well_formed_context() {
        let ctx = LaunchContext::new("launch-1", "https://ehr", "pat-1", march());
        assert!(ctx.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_patient() {
        let ctx = LaunchContext::new("launch-1", "https://ehr", " ", march());
        let err = ctx.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PreconditionViolation);
    }

    #[test]
    fn test_validate_rejects_inverted_window() {
        let window = TimeWindow::new(march().end, march().start);
        let ctx = LaunchContext::new("launch-1", "https://ehr", "pat-1", window);
        let err = ctx.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PreconditionViolation);
        assert!(err.to_string().contains("inverted time window"));
    }

    #[test]
    fn test_builders() {
        let ctx = LaunchContext::new("launch-1", "https://ehr", "pat-1", march())
            .with_encounter("enc-1")
            .with_fhir_version(FhirVersion::R4)
            .with_status("{}");
        assert_eq!(ctx.encounter_id.as_deref(), Some("enc-1"));
        assert_eq!(ctx.fhir_version, FhirVersion::R4);
        assert_eq!(ctx.status, "{}");
    }
}
