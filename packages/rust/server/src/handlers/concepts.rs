//! POST /concepts/{synonyms,descriptions,ontologies}
//!
//! Field-specific enrichment of caller-supplied concepts. Extraction and
//! filtering against known concepts are skipped; repeated labels are
//! enriched once.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};

use conceptlens_core::{FieldSelection, SilentEnrichmentProgress, filter_unknown, static_record};
use conceptlens_shared::{
    Concept, EnrichmentStatus, KnownConceptSet, OntologyLinks, UnknownConceptRecord,
};

use super::DevModeQuery;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ConceptsRequest {
    pub concepts: Vec<String>,
}

/// A record reduced to the fields one variant produces.
#[derive(Debug, Serialize)]
pub struct FieldRecord {
    #[serde(rename = "originalLabel")]
    pub original_label: Concept,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synonym: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<OntologyLinks>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<EnrichmentStatus>,
}

impl FieldRecord {
    pub fn project(record: UnknownConceptRecord, selection: FieldSelection) -> Self {
        Self {
            original_label: record.original_label,
            id: record.id,
            synonym: selection.synonym.then_some(record.synonym),
            links: selection.ontology.then_some(record.links),
            suggested_description: selection
                .description
                .then_some(record.suggested_description),
            status: record.status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FieldsResponse {
    #[serde(rename = "unknownConcepts")]
    pub unknown_concepts: Vec<FieldRecord>,
}

pub async fn synonyms(
    state: State<Arc<AppState>>,
    query: Result<Query<DevModeQuery>, QueryRejection>,
    body: Result<Json<ConceptsRequest>, JsonRejection>,
) -> Result<Json<FieldsResponse>, ApiError> {
    enrich_fields(state, query, body, FieldSelection::SYNONYM_ONLY).await
}

pub async fn descriptions(
    state: State<Arc<AppState>>,
    query: Result<Query<DevModeQuery>, QueryRejection>,
    body: Result<Json<ConceptsRequest>, JsonRejection>,
) -> Result<Json<FieldsResponse>, ApiError> {
    enrich_fields(state, query, body, FieldSelection::DESCRIPTION_ONLY).await
}

pub async fn ontologies(
    state: State<Arc<AppState>>,
    query: Result<Query<DevModeQuery>, QueryRejection>,
    body: Result<Json<ConceptsRequest>, JsonRejection>,
) -> Result<Json<FieldsResponse>, ApiError> {
    enrich_fields(state, query, body, FieldSelection::ONTOLOGY_ONLY).await
}

async fn enrich_fields(
    State(state): State<Arc<AppState>>,
    query: Result<Query<DevModeQuery>, QueryRejection>,
    body: Result<Json<ConceptsRequest>, JsonRejection>,
    selection: FieldSelection,
) -> Result<Json<FieldsResponse>, ApiError> {
    let Query(query) = query?;
    if query.dev_mode {
        return Ok(Json(FieldsResponse {
            unknown_concepts: vec![FieldRecord::project(static_record(), selection)],
        }));
    }

    let Json(request) = body?;
    let orchestrator = state.orchestrator()?;
    let candidates: Vec<Concept> = request.concepts.iter().filter_map(Concept::new).collect();
    let concepts = filter_unknown(&candidates, &KnownConceptSet::new());

    let records = state
        .bounded(orchestrator.enrich(concepts, selection, &SilentEnrichmentProgress))
        .await?;

    Ok(Json(FieldsResponse {
        unknown_concepts: records
            .into_iter()
            .map(|record| FieldRecord::project(record, selection))
            .collect(),
    }))
}
