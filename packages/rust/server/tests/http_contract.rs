//! HTTP-level contract tests for the ConceptLens server.
//!
//! The router runs in-process against a scripted completion client, so these
//! tests need no network access or API key.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use conceptlens_completion::CompletionClient;
use conceptlens_core::{Orchestrator, PromptCatalog};
use conceptlens_server::{AppState, build_router};
use conceptlens_shared::{CompletionError, PipelineConfig};

// ── Scripted completion client ─────────────────────────────────

/// Answers each prompt kind from its template wording.
struct Scripted {
    extraction: String,
    delay: Duration,
}

impl Scripted {
    fn extracting(concepts: &[&str]) -> Self {
        Self {
            extraction: json!({ "concepts": concepts }).to_string(),
            delay: Duration::ZERO,
        }
    }
}

#[async_trait]
impl CompletionClient for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        tokio::time::sleep(self.delay).await;

        if prompt.contains("The text: ") {
            return Ok(self.extraction.clone());
        }
        let concept = prompt
            .split("The concept: ")
            .nth(1)
            .and_then(|rest| rest.lines().next())
            .unwrap_or_default();
        if prompt.contains("scientific description") {
            return Ok(format!("Definition of {concept}."));
        }
        if prompt.contains("scientific synonyms") {
            return Ok(format!("{concept} alias"));
        }
        if prompt.contains("single best fitting ontology") {
            return Ok("PO".into());
        }
        Err(CompletionError::Permanent("unexpected prompt".into()))
    }
}

// ── Test app builders ──────────────────────────────────────────

fn configured_app(client: Scripted, timeout: Duration) -> axum::Router {
    let orchestrator = Orchestrator::new(
        Arc::new(client),
        Arc::new(PromptCatalog::builtin()),
        &PipelineConfig::default(),
    );
    build_router(AppState::new(Arc::new(orchestrator), timeout))
}

fn unconfigured_app() -> axum::Router {
    build_router(AppState::dev_only(Duration::from_secs(5)))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(request).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or_else(
        |_| json!({ "raw": String::from_utf8_lossy(&bytes).to_string() }),
    );
    (status, body)
}

fn identify_body(text: &str, known: &[&str]) -> Value {
    json!({ "text": text, "known_concepts": known })
}

// ── Tests ───────────────────────────────────────────────────────

#[tokio::test]
async fn dev_mode_returns_the_fixed_record() {
    let expected = json!({
        "unknownConcepts": [{
            "originalLabel": "staticConcept",
            "synonym": "staticSynonym",
            "links": {"ontology": "staticOntologyLink"},
            "id": "1234",
            "suggested_description": "This is a static description for development mode."
        }]
    });

    for body in [
        identify_body("Photosynthesis occurs in chloroplasts.", &["chloroplast"]),
        identify_body("", &[]),
        identify_body("anything at all", &["a", "b", "c"]),
    ] {
        let (status, json) = send(
            unconfigured_app(),
            post_json("/identify_unknown_concepts/?dev_mode=true", body),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, expected);
    }
}

#[tokio::test]
async fn identify_enriches_only_unknown_concepts() {
    let app = configured_app(
        Scripted::extracting(&["photosynthesis", "chloroplast"]),
        Duration::from_secs(5),
    );
    let (status, json) = send(
        app,
        post_json(
            "/identify_unknown_concepts/",
            identify_body("Photosynthesis occurs in chloroplasts.", &["chloroplast"]),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["extraction"], "generated");
    let records = json["unknownConcepts"].as_array().unwrap();
    assert_eq!(records.len(), 1);

    let record = &records[0];
    assert_eq!(record["originalLabel"], "photosynthesis");
    assert_eq!(record["suggested_description"], "Definition of photosynthesis.");
    assert_eq!(record["synonym"], "photosynthesis alias");
    assert_eq!(record["links"], json!({"ontology": "PO"}));
    assert_eq!(record["status"]["state"], "complete");
    assert!(!record["id"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn empty_extraction_gives_empty_list() {
    let app = configured_app(Scripted::extracting(&[]), Duration::from_secs(5));
    let (status, json) = send(
        app,
        post_json("/identify_unknown_concepts/", identify_body("Water.", &[])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["unknownConcepts"], json!([]));
    assert_eq!(json["extraction"], "empty");
}

#[tokio::test]
async fn malformed_extraction_gives_empty_list() {
    let client = Scripted {
        extraction: "I could not find any concepts.".into(),
        delay: Duration::ZERO,
    };
    let app = configured_app(client, Duration::from_secs(5));
    let (status, json) = send(
        app,
        post_json("/identify_unknown_concepts/", identify_body("Water.", &[])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["unknownConcepts"], json!([]));
    assert_eq!(json["extraction"], json!({"failed": "malformed"}));
}

#[tokio::test]
async fn labels_variant_skips_enrichment() {
    let app = configured_app(
        Scripted::extracting(&["xylem", "phloem", "root"]),
        Duration::from_secs(5),
    );
    let (status, json) = send(
        app,
        post_json(
            "/identify_unknown_concepts/labels",
            identify_body("Xylem and phloem run from the root.", &["ROOT"]),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json["unknownConcepts"],
        json!([{"originalLabel": "xylem"}, {"originalLabel": "phloem"}])
    );
}

#[tokio::test]
async fn synonyms_variant_returns_only_synonyms() {
    let app = configured_app(Scripted::extracting(&[]), Duration::from_secs(5));
    let (status, json) = send(
        app,
        post_json("/concepts/synonyms", json!({"concepts": ["lignin", " lignin ", "suberin"]})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let records = json["unknownConcepts"].as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["originalLabel"], "lignin");
    assert_eq!(records[0]["synonym"], "lignin alias");
    assert!(records[0].get("links").is_none());
    assert!(records[0].get("suggested_description").is_none());
    assert_eq!(records[1]["originalLabel"], "suberin");
}

#[tokio::test]
async fn ontologies_and_descriptions_variants() {
    let app = configured_app(Scripted::extracting(&[]), Duration::from_secs(5));
    let (_, json) = send(
        app.clone(),
        post_json("/concepts/ontologies", json!({"concepts": ["leaf"]})),
    )
    .await;
    let record = &json["unknownConcepts"][0];
    assert_eq!(record["links"], json!({"ontology": "PO"}));
    assert!(record.get("synonym").is_none());

    let (_, json) = send(
        app,
        post_json("/concepts/descriptions", json!({"concepts": ["leaf"]})),
    )
    .await;
    let record = &json["unknownConcepts"][0];
    assert_eq!(record["suggested_description"], "Definition of leaf.");
    assert!(record.get("links").is_none());
}

#[tokio::test]
async fn variant_dev_mode_projects_the_fixed_record() {
    let (status, json) = send(
        unconfigured_app(),
        post_json("/concepts/synonyms?dev_mode=true", json!({"concepts": ["x"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json,
        json!({"unknownConcepts": [{
            "originalLabel": "staticConcept",
            "id": "1234",
            "synonym": "staticSynonym"
        }]})
    );
}

#[tokio::test]
async fn llm_routes_fail_without_configuration() {
    let (status, json) = send(
        unconfigured_app(),
        post_json("/identify_unknown_concepts/", identify_body("text", &[])),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json, json!({"detail": "completion service not configured"}));
}

#[tokio::test]
async fn bad_body_is_422_with_detail() {
    let app = configured_app(Scripted::extracting(&[]), Duration::from_secs(5));
    let (status, json) = send(
        app,
        post_json("/identify_unknown_concepts/", json!({"text": "no known list"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json["detail"].as_str().unwrap().contains("known_concepts"));
}

#[tokio::test]
async fn blank_text_is_422() {
    let app = configured_app(Scripted::extracting(&["x"]), Duration::from_secs(5));
    let (status, json) = send(
        app,
        post_json("/identify_unknown_concepts/", identify_body("   ", &[])),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json["detail"].as_str().unwrap().contains("text must not be empty"));
}

#[tokio::test]
async fn slow_pipeline_times_out() {
    let client = Scripted {
        extraction: json!({"concepts": ["x"]}).to_string(),
        delay: Duration::from_secs(2),
    };
    let app = configured_app(client, Duration::from_millis(50));
    let (status, json) = send(
        app,
        post_json("/identify_unknown_concepts/", identify_body("text", &[])),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["detail"].as_str().unwrap().contains("timed out"));
}

#[tokio::test]
async fn health_reports_configuration() {
    let req = || Request::builder().uri("/health").body(Body::empty()).unwrap();

    let (status, json) = send(unconfigured_app(), req()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["llm_configured"], false);
    assert!(json["prompt_version"].is_null());

    let app = configured_app(Scripted::extracting(&[]), Duration::from_secs(5));
    let (_, json) = send(app, req()).await;
    assert_eq!(json["llm_configured"], true);
    assert_eq!(
        json["prompt_version"],
        PromptCatalog::builtin().version().as_str()
    );
}
