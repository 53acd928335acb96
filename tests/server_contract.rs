//! Contract tests for the gateway HTTP surface.
//!
//! Each test starts the gateway on an auto-assigned port in front of a
//! wiremock backend and talks to it over real HTTP.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::time::Duration;

use searchgate::config::RuleConfig;
use searchgate::{AppState, GatewayConfig, GatewayServer};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn start_gateway(
    backend: &MockServer,
    configure: impl FnOnce(&mut GatewayConfig),
) -> GatewayServer {
    let mut config = GatewayConfig::default();
    config.server.port = 0;
    config.backend.url = backend.uri();
    config.backend.max_retries = 1;
    config.backend.retry_delay_ms = (0, 0);
    configure(&mut config);

    let state = AppState::from_config(&config, CancellationToken::new()).expect("state");
    GatewayServer::start(state, &config.server)
        .await
        .expect("start gateway")
}

fn url(server: &GatewayServer, route: &str) -> String {
    format!("http://{}{route}", server.addr())
}

fn search_body(index: &str) -> Value {
    json!({"query": [
        {"id": "results", "index": index, "body": {"query": {"match": {"title": "iphone"}}}},
        {"id": "suggest", "type": "suggestion", "index": index, "value": "iph",
         "dataField": ["title"], "body": {"query": {"match_phrase_prefix": {"title": "iph"}}}}
    ]})
}

fn backend_reply() -> Value {
    json!({
        "took": 5,
        "responses": [
            {"hits": {"total": 2, "hits": [
                {"_index": "products", "_id": "1", "_source": {"title": "iphone 11"}},
                {"_index": "products", "_id": "42", "_source": {"title": "iphone 12"}}
            ]}},
            {"hits": {"total": 1, "hits": [
                {"_index": "products", "_id": "42", "_source": {"title": "iphone 12"}}
            ]}}
        ]
    })
}

#[tokio::test]
async fn health_reports_ok() {
    let backend = MockServer::start().await;
    let gateway = start_gateway(&backend, |_| {}).await;

    let resp = reqwest::get(url(&gateway, "/health")).await.expect("request");
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("json");
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn validate_echoes_ndjson() {
    let backend = MockServer::start().await;
    let gateway = start_gateway(&backend, |_| {}).await;
    let payload = "{\"index\":\"products\"}\n{\"query\":{\"match_all\":{}}}\n";

    let resp = reqwest::Client::new()
        .post(url(&gateway, "/validate"))
        .body(payload)
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "application/x-ndjson");
    assert_eq!(resp.headers()["x-content-type-options"], "nosniff");
    assert_eq!(resp.text().await.expect("body"), payload);
}

#[tokio::test]
async fn search_applies_alias_and_rules() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/catalog/_msearch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(backend_reply()))
        .expect(1)
        .mount(&backend)
        .await;

    let gateway = start_gateway(&backend, |config| {
        config
            .aliases
            .insert("products".into(), "catalog".into());
        config.rules.push(RuleConfig {
            index: "catalog".into(),
            match_term: "iphone".into(),
            promote: Some(json!({"banner": "iphone week"})),
            hide: vec!["42".into()],
        });
    })
    .await;

    let resp = reqwest::Client::new()
        .post(url(&gateway, "/search"))
        .header("X-Search-Query", "iPhone")
        .json(&search_body("catalog"))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("json");

    assert_eq!(body["settings"]["took"], 5);
    let results = &body["results"];
    assert_eq!(results["hits"]["total"], 1);
    assert_eq!(results["hits"]["hits"][0]["_id"], "1");
    assert_eq!(results["hits"]["hits"][0]["_index"], "catalog");
    assert_eq!(results["promoted"]["banner"], "iphone week");

    let suggestions = body["suggest"]["hits"]["hits"].as_array().expect("list");
    assert_eq!(suggestions[0]["value"], "iphone 12");
    assert_eq!(suggestions[0]["_index"], "catalog");
}

#[tokio::test]
async fn search_without_term_header_skips_rules() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(backend_reply()))
        .mount(&backend)
        .await;

    let gateway = start_gateway(&backend, |config| {
        config.rules.push(RuleConfig {
            index: "products".into(),
            match_term: "iphone".into(),
            promote: None,
            hide: vec!["42".into()],
        });
    })
    .await;

    let resp = reqwest::Client::new()
        .post(url(&gateway, "/search"))
        .json(&search_body("products"))
        .send()
        .await
        .expect("request");
    let body: Value = resp.json().await.expect("json");
    assert_eq!(body["results"]["hits"]["total"], 2);
}

#[tokio::test]
async fn duplicate_ids_are_bad_request() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(backend_reply()))
        .expect(0)
        .mount(&backend)
        .await;
    let gateway = start_gateway(&backend, |_| {}).await;

    let body = json!({"query": [
        {"id": "a", "body": {}},
        {"id": "a", "body": {}}
    ]});
    let resp = reqwest::Client::new()
        .post(url(&gateway, "/search"))
        .json(&body)
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), 400);
    let err: Value = resp.json().await.expect("json");
    assert_eq!(err["error"]["code"], 400);
    assert_eq!(err["error"]["status"], "Bad Request");
    assert!(
        err["error"]["message"]
            .as_str()
            .expect("message")
            .contains("duplicate query id")
    );
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let backend = MockServer::start().await;
    let gateway = start_gateway(&backend, |_| {}).await;

    let resp = reqwest::Client::new()
        .post(url(&gateway, "/search"))
        .body("not json")
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn backend_rejection_passes_through() {
    let backend = MockServer::start().await;
    let reply = r#"{"error":{"type":"parsing_exception"},"status":400}"#;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string(reply))
        .expect(1)
        .mount(&backend)
        .await;
    let gateway = start_gateway(&backend, |_| {}).await;

    let resp = reqwest::Client::new()
        .post(url(&gateway, "/search"))
        .json(&search_body("products"))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), 400);
    assert_eq!(resp.text().await.expect("body"), reply);
}

#[tokio::test]
async fn unavailable_backend_reports_its_status() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&backend)
        .await;
    let gateway = start_gateway(&backend, |_| {}).await;

    let resp = reqwest::Client::new()
        .post(url(&gateway, "/search"))
        .json(&search_body("products"))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), 503);
    let err: Value = resp.json().await.expect("json");
    assert_eq!(err["error"]["code"], 503);
}

#[tokio::test]
async fn shutdown_cancels_in_flight_search() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(backend_reply())
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&backend)
        .await;
    let gateway = start_gateway(&backend, |_| {}).await;

    let request = reqwest::Client::new()
        .post(url(&gateway, "/search"))
        .json(&search_body("products"))
        .send();
    let pending = tokio::spawn(request);

    tokio::time::sleep(Duration::from_millis(200)).await;
    gateway.shutdown();

    let resp = pending.await.expect("join").expect("response");
    assert_eq!(resp.status(), 503);
    assert!(resp.bytes().await.expect("body").is_empty());
}
