//! Offline retrieval from a FHIR Bundle file.

use async_trait::async_trait;
use ecr_core::{ClinicalData, EcrError, EcrResult, LaunchContext, TimeWindow};
use ecr_engine::DataRetrievalService;
use serde_json::Value;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

/// Serves the resources of one Bundle file to every launch.
///
/// The file is read on each call so edits show up on the next evaluation.
#[derive(Debug, Clone)]
pub struct BundleFileRetriever {
    path: PathBuf,
}

impl BundleFileRetriever {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DataRetrievalService for BundleFileRetriever {
    async fn get_data(
        &self,
        context: &LaunchContext,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> EcrResult<Option<ClinicalData>> {
        let text = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            EcrError::retrieval(format!("cannot read bundle {}: {e}", self.path.display()))
        })?;
        let bundle: Value = serde_json::from_str(&text).map_err(|e| {
            EcrError::retrieval(format!("cannot parse bundle {}: {e}", self.path.display()))
        })?;

        let mut data = ClinicalData::from_bundle(&bundle)?;
        data.retain_within(&TimeWindow::new(start, end));
        tracing::info!(
            launch_id = %context.launch_id,
            path = %self.path.display(),
            resources = data.len(),
            "Loaded clinical data from bundle file"
        );
        Ok(Some(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecr_core::ErrorKind;
    use serde_json::json;
    use std::io::Write;
    use time::macros::datetime;

    fn launch() -> LaunchContext {
        LaunchContext::new(
            "l1",
            "https://ehr.example.org/fhir",
            "pat-1",
            TimeWindow::new(
                datetime!(2020-03-01 0:00 UTC),
                datetime!(2020-03-31 0:00 UTC),
            ),
        )
    }

    #[tokio::test]
    async fn test_reads_and_filters_bundle() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let bundle = json!({
            "resourceType": "Bundle",
            "type": "collection",
            "entry": [
                {"resource": {"resourceType": "Condition", "onsetDateTime": "2020-03-10",
                    "code": {"coding": [{"code": "U07.1"}]}}},
                {"resource": {"resourceType": "Condition", "onsetDateTime": "2019-01-01",
                    "code": {"coding": [{"code": "J11.1"}]}}}
            ]
        });
        write!(file, "{bundle}").unwrap();

        let ctx = launch();
        let retriever = BundleFileRetriever::new(file.path());
        let data = retriever
            .get_data(&ctx, ctx.start_date, ctx.end_date)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(data.len(), 1);
        assert!(data.code_tokens_for_path("Condition.code").contains("U07.1"));
    }

    #[tokio::test]
    async fn test_missing_file_is_retrieval_failure() {
        let ctx = launch();
        let err = BundleFileRetriever::new("/nonexistent/bundle.json")
            .get_data(&ctx, ctx.start_date, ctx.end_date)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RetrievalFailure);
    }

    #[tokio::test]
    async fn test_non_bundle_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", json!({"resourceType": "Patient"})).unwrap();

        let ctx = launch();
        let err = BundleFileRetriever::new(file.path())
            .get_data(&ctx, ctx.start_date, ctx.end_date)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("expected a Bundle"));
    }
}
