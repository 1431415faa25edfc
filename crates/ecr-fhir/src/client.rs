use ecr_core::FhirVersion;
use serde_json::Value;
use url::Url;

use crate::error::FhirClientError;

/// Thin REST client for one EHR FHIR endpoint.
pub struct FhirClient {
    http: reqwest::Client,
    base_url: Url,
    media_type: &'static str,
}

impl FhirClient {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        fhir_version: FhirVersion,
    ) -> Result<Self, FhirClientError> {
        // A trailing slash makes relative joins land under the base path.
        let base_url = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))?;
        Ok(Self {
            http,
            base_url,
            media_type: fhir_version.media_type(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn request(&self, url: Url) -> reqwest::RequestBuilder {
        self.http.get(url).header("Accept", self.media_type)
    }

    pub async fn read(&self, resource_type: &str, id: &str) -> Result<Value, FhirClientError> {
        let url = self.base_url.join(&format!("{resource_type}/{id}"))?;
        tracing::debug!(%url, "Reading resource");
        let resp = self.request(url).send().await?;
        handle_response(resp).await
    }

    /// Runs a search and returns the first page Bundle.
    pub async fn search(
        &self,
        resource_type: &str,
        params: &[(&str, &str)],
    ) -> Result<Value, FhirClientError> {
        let url = self.base_url.join(resource_type)?;
        tracing::info!(%url, ?params, "Invoking search");
        let resp = self.request(url).query(params).send().await?;
        expect_bundle(handle_response(resp).await?)
    }

    /// Fetches a search page by its `next` link, relative to the base URL.
    pub async fn page(&self, link: &str) -> Result<Value, FhirClientError> {
        let url = self.base_url.join(link)?;
        tracing::debug!(%url, "Following next link");
        let resp = self.request(url).send().await?;
        expect_bundle(handle_response(resp).await?)
    }
}

/// The `next` link of a search Bundle, if the server paged the result.
pub fn next_link(bundle: &Value) -> Option<&str> {
    bundle
        .get("link")?
        .as_array()?
        .iter()
        .find(|link| link.get("relation").and_then(Value::as_str) == Some("next"))?
        .get("url")?
        .as_str()
}

fn expect_bundle(value: Value) -> Result<Value, FhirClientError> {
    match value.get("resourceType").and_then(Value::as_str) {
        Some("Bundle") => Ok(value),
        other => Err(FhirClientError::UnexpectedResponse(format!(
            "expected a Bundle, got {}",
            other.unwrap_or("no resourceType")
        ))),
    }
}

async fn handle_response(resp: reqwest::Response) -> Result<Value, FhirClientError> {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();

    if !status.is_success() {
        if let Ok(json) = serde_json::from_str::<Value>(&body)
            && json.get("resourceType").and_then(|v| v.as_str()) == Some("OperationOutcome")
            && let Some(issues) = json.get("issue").and_then(|v| v.as_array())
        {
            let msgs: Vec<&str> = issues
                .iter()
                .filter_map(|i| i.get("diagnostics").and_then(|d| d.as_str()))
                .collect();
            if !msgs.is_empty() {
                return Err(FhirClientError::Http {
                    status: status.as_u16(),
                    message: msgs.join("; "),
                });
            }
        }
        return Err(FhirClientError::Http {
            status: status.as_u16(),
            message: body,
        });
    }

    serde_json::from_str(&body).map_err(|e| FhirClientError::Parse(e.to_string()))
}
