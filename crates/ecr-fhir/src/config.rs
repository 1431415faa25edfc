//! FHIR retrieval configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Settings for [`FhirServerDataRetriever`](crate::FhirServerDataRetriever).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FhirClientConfig {
    /// Per-request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Cap on entries collected per search across all pages
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Cap on pages followed per search, including the first
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Patient-compartment searches issued for every launch
    #[serde(default = "default_resources")]
    pub resources: Vec<ResourceQuery>,
}

impl Default for FhirClientConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            max_results: default_max_results(),
            max_pages: default_max_pages(),
            resources: default_resources(),
        }
    }
}

impl FhirClientConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.request_timeout_ms == 0 {
            return Err("fhir.request_timeout_ms must be > 0".into());
        }
        if self.max_results == 0 {
            return Err("fhir.max_results must be > 0".into());
        }
        if self.max_pages == 0 {
            return Err("fhir.max_pages must be > 0".into());
        }
        if let Some(query) = self
            .resources
            .iter()
            .find(|q| q.resource_type.trim().is_empty())
        {
            return Err(format!("fhir.resources has a blank resource type: {query:?}"));
        }
        Ok(())
    }
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_max_results() -> usize {
    500
}

fn default_max_pages() -> usize {
    20
}

fn default_resources() -> Vec<ResourceQuery> {
    vec![
        ResourceQuery::new("Condition"),
        ResourceQuery::with_category("Observation", "laboratory"),
        ResourceQuery::new("MedicationAdministration"),
        ResourceQuery::new("MedicationStatement"),
        ResourceQuery::new("Immunization"),
        ResourceQuery::new("DiagnosticReport"),
        ResourceQuery::new("ServiceRequest"),
    ]
}

/// One search: a resource type and an optional `category` filter.
///
/// Deserializes from either `"Condition"` or
/// `{ resource_type = "Observation", category = "laboratory" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawResourceQuery")]
pub struct ResourceQuery {
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl ResourceQuery {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            category: None,
        }
    }

    pub fn with_category(resource_type: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            category: Some(category.into()),
        }
    }
}

impl fmt::Display for ResourceQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.category {
            Some(category) => write!(f, "{}?category={category}", self.resource_type),
            None => write!(f, "{}", self.resource_type),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawResourceQuery {
    Name(String),
    Full {
        resource_type: String,
        #[serde(default)]
        category: Option<String>,
    },
}

impl From<RawResourceQuery> for ResourceQuery {
    fn from(raw: RawResourceQuery) -> Self {
        match raw {
            RawResourceQuery::Name(resource_type) => Self::new(resource_type),
            RawResourceQuery::Full {
                resource_type,
                category,
            } => Self {
                resource_type,
                category,
            },
        }
    }
}
