//! FhirServerDataRetriever against a mock FHIR server.

use ecr_core::{FhirVersion, LaunchContext, TimeWindow};
use ecr_engine::DataRetrievalService;
use ecr_fhir::{FhirClientConfig, FhirServerDataRetriever, ResourceQuery};
use serde_json::{Value, json};
use std::time::Duration;
use time::macros::datetime;
use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn launch(server: &MockServer) -> LaunchContext {
    LaunchContext::new(
        "launch-1",
        server.uri(),
        "pat-1",
        TimeWindow::new(
            datetime!(2020-03-01 0:00 UTC),
            datetime!(2020-03-31 0:00 UTC),
        ),
    )
    .with_fhir_version(FhirVersion::R4)
}

fn retriever(resources: Vec<ResourceQuery>) -> FhirServerDataRetriever {
    FhirServerDataRetriever::new(FhirClientConfig {
        request_timeout_ms: 5_000,
        resources,
        ..FhirClientConfig::default()
    })
    .expect("retriever")
}

fn searchset(resources: Vec<Value>, next: Option<String>) -> Value {
    let mut bundle = json!({
        "resourceType": "Bundle",
        "type": "searchset",
        "entry": resources.into_iter().map(|r| json!({"resource": r})).collect::<Vec<_>>()
    });
    if let Some(url) = next {
        bundle["link"] = json!([{"relation": "next", "url": url}]);
    }
    bundle
}

fn condition(id: &str, onset: &str, code: &str) -> Value {
    json!({
        "resourceType": "Condition",
        "id": id,
        "onsetDateTime": onset,
        "code": {"coding": [{"system": "http://hl7.org/fhir/sid/icd-10-cm", "code": code}]}
    })
}

#[tokio::test]
async fn searches_pages_and_filters_by_window() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Condition"))
        .and(query_param("patient", "pat-1"))
        .and(query_param_is_missing("page"))
        .and(header("Accept", "application/fhir+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(searchset(
            vec![condition("c1", "2020-03-10T08:00:00Z", "U07.1")],
            Some(format!("{}/Condition?patient=pat-1&page=2", server.uri())),
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/Condition"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(searchset(
            vec![condition("c2", "2019-06-01T08:00:00Z", "J11.1")],
            None,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = launch(&server);
    let data = retriever(vec![ResourceQuery::new("Condition")])
        .get_data(&ctx, ctx.start_date, ctx.end_date)
        .await
        .unwrap()
        .expect("data");

    assert_eq!(data.len(), 1);
    assert_eq!(data.resources("Condition")[0]["id"], "c1");
    assert!(
        data.code_tokens_for_path("Condition.code")
            .contains("http://hl7.org/fhir/sid/icd-10-cm|U07.1")
    );
}

#[tokio::test]
async fn category_is_sent_and_failed_searches_are_skipped() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Observation"))
        .and(query_param("patient", "pat-1"))
        .and(query_param("category", "laboratory"))
        .respond_with(ResponseTemplate::new(200).set_body_json(searchset(
            vec![json!({
                "resourceType": "Observation",
                "effectiveDateTime": "2020-03-12",
                "code": {"coding": [{"system": "http://loinc.org", "code": "94500-6"}]}
            })],
            None,
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/Condition"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "resourceType": "OperationOutcome",
            "issue": [{"severity": "error", "code": "exception", "diagnostics": "boom"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = launch(&server);
    let data = retriever(vec![
        ResourceQuery::new("Condition"),
        ResourceQuery::with_category("Observation", "laboratory"),
    ])
    .get_data(&ctx, ctx.start_date, ctx.end_date)
    .await
    .unwrap()
    .expect("data");

    assert_eq!(data.len(), 1);
    assert!(data.resources("Condition").is_empty());
}

#[tokio::test]
async fn every_search_failing_yields_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let ctx = launch(&server);
    let result = retriever(vec![
        ResourceQuery::new("Condition"),
        ResourceQuery::new("Observation"),
    ])
    .get_data(&ctx, ctx.start_date, ctx.end_date)
    .await
    .unwrap();

    assert!(result.is_none());
}

#[tokio::test]
async fn encounter_is_read_and_dstu2_media_type_is_used() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Condition"))
        .and(header("Accept", "application/json+fhir"))
        .respond_with(ResponseTemplate::new(200).set_body_json(searchset(vec![], None)))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/Encounter/enc-1"))
        .and(header("Accept", "application/json+fhir"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resourceType": "Encounter",
            "id": "enc-1",
            "period": {"start": "2020-03-09T10:00:00Z"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = launch(&server)
        .with_fhir_version(FhirVersion::Dstu2)
        .with_encounter("enc-1");
    let data = retriever(vec![ResourceQuery::new("Condition")])
        .get_data(&ctx, ctx.start_date, ctx.end_date)
        .await
        .unwrap()
        .expect("data");

    assert_eq!(data.resources("Encounter").len(), 1);
}

#[tokio::test]
async fn results_are_capped_per_search() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Condition"))
        .and(query_param_is_missing("page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(searchset(
            vec![
                condition("c1", "2020-03-02", "U07.1"),
                condition("c2", "2020-03-03", "U07.1"),
                condition("c3", "2020-03-04", "U07.1"),
            ],
            Some(format!("{}/Condition?page=2", server.uri())),
        )))
        .mount(&server)
        .await;

    // The cap is reached on the first page, so the next link is never followed.
    Mock::given(method("GET"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(searchset(vec![], None)))
        .expect(0)
        .mount(&server)
        .await;

    let ctx = launch(&server);
    let data = FhirServerDataRetriever::new(FhirClientConfig {
        request_timeout_ms: 5_000,
        max_results: 2,
        resources: vec![ResourceQuery::new("Condition")],
        ..FhirClientConfig::default()
    })
    .unwrap()
    .get_data(&ctx, ctx.start_date, ctx.end_date)
    .await
    .unwrap()
    .expect("data");

    assert_eq!(data.len(), 2);
}

#[tokio::test]
async fn self_linked_empty_page_stops_paging() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Condition"))
        .respond_with(ResponseTemplate::new(200).set_body_json(searchset(
            vec![],
            Some(format!("{}/Condition?patient=pat-1", server.uri())),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = launch(&server);
    let result = tokio::time::timeout(
        Duration::from_secs(5),
        retriever(vec![ResourceQuery::new("Condition")]).get_data(
            &ctx,
            ctx.start_date,
            ctx.end_date,
        ),
    )
    .await
    .expect("paging should stop");

    assert!(result.unwrap().expect("data").is_empty());
}

#[tokio::test]
async fn repeated_next_link_is_followed_once() {
    let server = MockServer::start().await;
    let page_two = format!("{}/Condition?patient=pat-1&page=2", server.uri());

    Mock::given(method("GET"))
        .and(path("/Condition"))
        .and(query_param_is_missing("page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(searchset(
            vec![condition("c1", "2020-03-10", "U07.1")],
            Some(page_two.clone()),
        )))
        .expect(1)
        .mount(&server)
        .await;

    // Page two points back at itself.
    Mock::given(method("GET"))
        .and(path("/Condition"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(searchset(
            vec![condition("c2", "2020-03-11", "U07.1")],
            Some(page_two),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = launch(&server);
    let data = retriever(vec![ResourceQuery::new("Condition")])
        .get_data(&ctx, ctx.start_date, ctx.end_date)
        .await
        .unwrap()
        .expect("data");

    assert_eq!(data.len(), 2);
}

#[tokio::test]
async fn page_limit_stops_paging() {
    let server = MockServer::start().await;

    for page in 1..=3 {
        let matcher = Mock::given(method("GET")).and(path("/Condition"));
        let matcher = if page == 1 {
            matcher.and(query_param_is_missing("page"))
        } else {
            matcher.and(query_param("page", page.to_string()))
        };
        matcher
            .respond_with(ResponseTemplate::new(200).set_body_json(searchset(
                vec![condition(&format!("c{page}"), "2020-03-10", "U07.1")],
                Some(format!("{}/Condition?page={}", server.uri(), page + 1)),
            )))
            .expect(if page == 3 { 0 } else { 1 })
            .mount(&server)
            .await;
    }

    let ctx = launch(&server);
    let data = FhirServerDataRetriever::new(FhirClientConfig {
        max_pages: 2,
        resources: vec![ResourceQuery::new("Condition")],
        ..FhirClientConfig::default()
    })
    .unwrap()
    .get_data(&ctx, ctx.start_date, ctx.end_date)
    .await
    .unwrap()
    .expect("data");

    assert_eq!(data.len(), 2);
}

#[tokio::test]
async fn later_page_failure_keeps_earlier_pages() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Condition"))
        .and(query_param_is_missing("page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(searchset(
            vec![condition("c1", "2020-03-10", "U07.1")],
            Some(format!("{}/Condition?patient=pat-1&page=2", server.uri())),
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/Condition"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = launch(&server);
    let data = retriever(vec![ResourceQuery::new("Condition")])
        .get_data(&ctx, ctx.start_date, ctx.end_date)
        .await
        .unwrap()
        .expect("data");

    assert_eq!(data.len(), 1);
    assert_eq!(data.resources("Condition")[0]["id"], "c1");
}
