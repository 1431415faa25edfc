//! Patient-compartment retrieval from the launch's EHR FHIR server.

use std::collections::HashSet;

use async_trait::async_trait;
use ecr_core::{ClinicalData, EcrResult, LaunchContext, TimeWindow};
use ecr_engine::DataRetrievalService;
use serde_json::Value;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::client::{FhirClient, next_link};
use crate::config::{FhirClientConfig, ResourceQuery};
use crate::error::FhirClientError;

/// Searches every configured resource type for the launch patient.
///
/// A failed search is logged and skipped. If every search fails the result is
/// `Ok(None)`, which the engine treats as a retrieval failure.
pub struct FhirServerDataRetriever {
    http: reqwest::Client,
    config: FhirClientConfig,
}

impl FhirServerDataRetriever {
    pub fn new(config: FhirClientConfig) -> Result<Self, FhirClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| FhirClientError::Client(e.to_string()))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &FhirClientConfig {
        &self.config
    }

    /// Collects entries of one search across pages, up to `max_results`.
    ///
    /// Paging stops at `max_pages`, on a `next` link already followed, or on a
    /// page that adds no entries. A failure after the first page keeps what
    /// the earlier pages returned.
    async fn search_all(
        &self,
        client: &FhirClient,
        query: &ResourceQuery,
        patient_id: &str,
    ) -> Result<Vec<Value>, FhirClientError> {
        let mut params = vec![("patient", patient_id)];
        if let Some(category) = &query.category {
            params.push(("category", category.as_str()));
        }

        let mut resources = Vec::new();
        let mut visited = HashSet::new();
        let mut bundle = client.search(&query.resource_type, &params).await?;
        let mut pages = 1usize;
        loop {
            let before = resources.len();
            resources.extend(bundle_resources(&bundle));
            if resources.len() >= self.config.max_results {
                resources.truncate(self.config.max_results);
                break;
            }
            if resources.len() == before {
                break;
            }

            let Some(next) = next_link(&bundle) else {
                break;
            };
            if !visited.insert(next.to_string()) {
                warn!(search = %query, next, "Next link repeats an earlier page, stopping");
                break;
            }
            if pages >= self.config.max_pages {
                warn!(search = %query, pages, "Page limit reached, stopping");
                break;
            }

            bundle = match client.page(next).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(
                        search = %query,
                        kept = resources.len(),
                        error = %e,
                        "Next page failed, keeping earlier pages"
                    );
                    break;
                }
            };
            pages += 1;
        }
        Ok(resources)
    }
}

fn bundle_resources(bundle: &Value) -> impl Iterator<Item = Value> + '_ {
    bundle
        .get("entry")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|entry| entry.get("resource").cloned())
}

#[async_trait]
impl DataRetrievalService for FhirServerDataRetriever {
    async fn get_data(
        &self,
        context: &LaunchContext,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> EcrResult<Option<ClinicalData>> {
        let client = FhirClient::new(
            self.http.clone(),
            &context.ehr_server_url,
            context.fhir_version,
        )?;
        let patient_id = context.launch_patient_id.as_str();

        let mut data = ClinicalData::new();
        let mut succeeded = 0usize;
        for query in &self.config.resources {
            match self.search_all(&client, query, patient_id).await {
                Ok(resources) => {
                    info!(search = %query, patient_id, count = resources.len(), "Received resources");
                    for resource in resources {
                        data.push(resource);
                    }
                    succeeded += 1;
                }
                Err(e) => {
                    warn!(search = %query, patient_id, error = %e, "Search failed, skipping");
                }
            }
        }

        if succeeded == 0 && !self.config.resources.is_empty() {
            warn!(launch_id = %context.launch_id, "Every search failed");
            return Ok(None);
        }

        if let Some(encounter_id) = &context.encounter_id {
            match client.read("Encounter", encounter_id).await {
                Ok(encounter) => {
                    data.push(encounter);
                }
                Err(e) => {
                    warn!(encounter_id = %encounter_id, error = %e, "Encounter read failed, skipping");
                }
            }
        }

        let before = data.len();
        data.retain_within(&TimeWindow::new(start, end));
        info!(
            launch_id = %context.launch_id,
            retrieved = before,
            in_window = data.len(),
            "Clinical data retrieved"
        );
        Ok(Some(data))
    }
}
