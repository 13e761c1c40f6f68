//! POST /identify_unknown_concepts/ and its label-only variant.
//!
//! Accepts `{text, known_concepts}` and returns the unknown concepts found in
//! the text, fully enriched or as bare labels.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};
use tracing::info;

use conceptlens_core::{SilentEnrichmentProgress, static_record};
use conceptlens_shared::{Concept, FieldOutcome, KnownConceptSet, UnknownConceptRecord};

use super::DevModeQuery;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct IdentifyRequest {
    pub text: String,
    pub known_concepts: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct IdentifyResponse {
    #[serde(rename = "unknownConcepts")]
    pub unknown_concepts: Vec<UnknownConceptRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction: Option<FieldOutcome>,
}

#[derive(Debug, Serialize)]
pub struct LabelEntry {
    #[serde(rename = "originalLabel")]
    pub original_label: Concept,
}

#[derive(Debug, Serialize)]
pub struct LabelsResponse {
    #[serde(rename = "unknownConcepts")]
    pub unknown_concepts: Vec<LabelEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction: Option<FieldOutcome>,
}

pub async fn identify_unknown_concepts(
    State(state): State<Arc<AppState>>,
    query: Result<Query<DevModeQuery>, QueryRejection>,
    body: Result<Json<IdentifyRequest>, JsonRejection>,
) -> Result<Json<IdentifyResponse>, ApiError> {
    let Query(query) = query?;
    if query.dev_mode {
        info!("dev mode: returning static record");
        return Ok(Json(IdentifyResponse {
            unknown_concepts: vec![static_record()],
            extraction: None,
        }));
    }

    let Json(request) = body?;
    let orchestrator = state.orchestrator()?;
    let known: KnownConceptSet = request.known_concepts.iter().collect();

    let output = state
        .bounded(orchestrator.identify(&request.text, &known, &SilentEnrichmentProgress))
        .await??;

    Ok(Json(IdentifyResponse {
        unknown_concepts: output.records,
        extraction: Some(output.extraction),
    }))
}

pub async fn unknown_labels(
    State(state): State<Arc<AppState>>,
    query: Result<Query<DevModeQuery>, QueryRejection>,
    body: Result<Json<IdentifyRequest>, JsonRejection>,
) -> Result<Json<LabelsResponse>, ApiError> {
    let Query(query) = query?;
    if query.dev_mode {
        return Ok(Json(LabelsResponse {
            unknown_concepts: vec![LabelEntry {
                original_label: static_record().original_label,
            }],
            extraction: None,
        }));
    }

    let Json(request) = body?;
    let orchestrator = state.orchestrator()?;
    let known: KnownConceptSet = request.known_concepts.iter().collect();

    let output = state
        .bounded(orchestrator.unknown_labels(&request.text, &known))
        .await??;

    Ok(Json(LabelsResponse {
        unknown_concepts: output
            .unknown
            .into_iter()
            .map(|original_label| LabelEntry { original_label })
            .collect(),
        extraction: Some(output.extraction),
    }))
}
