//! Data-retrieval adapters for the eCR trigger engine.
//!
//! - [`FhirServerDataRetriever`]: searches the launch's EHR FHIR endpoint
//! - [`BundleFileRetriever`]: reads a FHIR Bundle from disk for offline runs

pub mod bundle;
pub mod client;
pub mod config;
pub mod error;
pub mod retriever;

pub use bundle::BundleFileRetriever;
pub use client::FhirClient;
pub use config::{FhirClientConfig, ResourceQuery};
pub use error::FhirClientError;
pub use retriever::FhirServerDataRetriever;
