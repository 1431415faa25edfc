//! # ecr-core
//!
//! Shared types for the eCR trigger-evaluation engine.
//!
//! ## Overview
//!
//! - [`LaunchContext`]: one clinical session (server, patient, time window)
//!   carrying the serialized execution state in its `status` field.
//! - [`PatientExecutionState`]: the decoded form of that field, including the
//!   [`MatchTriggerStatus`] written by the match-trigger action.
//! - [`ClinicalData`]: resources retrieved for a launch, queried by code path.
//! - [`EcrError`]: the uniform failure signal, discriminated by [`ErrorKind`].

pub mod clinical;
pub mod error;
pub mod fhir;
pub mod launch;
pub mod state;
pub mod window;

pub use clinical::{ClinicalData, Code};
pub use error::{EcrError, EcrResult, ErrorKind};
pub use fhir::FhirVersion;
pub use launch::LaunchContext;
pub use state::{JobStatus, MatchTriggerStatus, MatchedTriggerCodes, PatientExecutionState};
pub use window::{TimeWindow, parse_fhir_date_time};
