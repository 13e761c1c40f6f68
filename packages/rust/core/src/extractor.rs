//! Turns raw text into an ordered list of candidate concept labels.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, instrument, warn};

use conceptlens_completion::CompletionClient;
use conceptlens_shared::{Concept, ConceptLensError, FailureKind, FieldOutcome, Result};

use crate::prompts::{PromptCatalog, PromptPurpose, slot};

/// Shape the extraction prompt asks the service to answer with.
#[derive(Debug, Deserialize)]
struct ExtractionPayload {
    concepts: Vec<String>,
}

/// Candidate concepts plus how the extraction call went.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub concepts: Vec<Concept>,
    pub outcome: FieldOutcome,
}

impl Extraction {
    fn failed(kind: FailureKind) -> Self {
        Self {
            concepts: Vec::new(),
            outcome: FieldOutcome::Failed(kind),
        }
    }
}

/// Extracts candidate concepts through the completion service.
#[derive(Clone)]
pub struct ConceptExtractor {
    client: Arc<dyn CompletionClient>,
    catalog: Arc<PromptCatalog>,
}

impl ConceptExtractor {
    pub fn new(client: Arc<dyn CompletionClient>, catalog: Arc<PromptCatalog>) -> Self {
        Self { client, catalog }
    }

    /// Extract candidate concepts from `text`.
    ///
    /// Never fails: service errors and unparseable responses yield an empty
    /// list, with the reason recorded in [`Extraction::outcome`].
    #[instrument(skip_all, fields(text_len = text.len()))]
    pub async fn extract(&self, text: &str) -> Extraction {
        let prompt = match self
            .catalog
            .render(PromptPurpose::Extraction, &[(slot::TEXT, text)])
        {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!(error = %e, "could not render extraction prompt");
                return Extraction::failed(FailureKind::Internal);
            }
        };

        let raw = match self.client.complete(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "concept extraction failed, continuing without candidates");
                return Extraction::failed(FailureKind::from(&e));
            }
        };
        debug!(raw = %raw, "concepts generated");

        match parse_concepts(&raw) {
            Ok(concepts) if concepts.is_empty() => Extraction {
                concepts,
                outcome: FieldOutcome::Empty,
            },
            Ok(concepts) => Extraction {
                concepts,
                outcome: FieldOutcome::Generated,
            },
            Err(e) => {
                warn!(error = %e, "error parsing extraction response");
                Extraction::failed(FailureKind::Malformed)
            }
        }
    }
}

/// Parse `{"concepts": [...]}`, optionally wrapped in a Markdown code fence.
/// Labels are trimmed and blank ones dropped; order is preserved.
pub fn parse_concepts(raw: &str) -> Result<Vec<Concept>> {
    let body = strip_code_fence(raw);
    let payload: ExtractionPayload = serde_json::from_str(body)
        .map_err(|e| ConceptLensError::parse(format!("extraction response: {e}")))?;

    Ok(payload
        .concepts
        .iter()
        .filter_map(Concept::new)
        .collect())
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. `json`) on the opening fence line.
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.trim_end().trim_end_matches("```").trim()
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use conceptlens_shared::CompletionError;

    use super::*;

    struct Fixed(std::result::Result<String, CompletionError>);

    #[async_trait]
    impl CompletionClient for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn complete(&self, _prompt: &str) -> std::result::Result<String, CompletionError> {
            self.0.clone()
        }
    }

    fn extractor(reply: std::result::Result<String, CompletionError>) -> ConceptExtractor {
        ConceptExtractor::new(Arc::new(Fixed(reply)), Arc::new(PromptCatalog::builtin()))
    }

    fn labels(extraction: &Extraction) -> Vec<&str> {
        extraction.concepts.iter().map(Concept::as_str).collect()
    }

    #[test]
    fn parses_plain_object() {
        let concepts = parse_concepts(r#"{"concepts": ["photosynthesis", " chloroplast "]}"#).unwrap();
        let labels: Vec<_> = concepts.iter().map(Concept::as_str).collect();
        assert_eq!(labels, vec!["photosynthesis", "chloroplast"]);
    }

    #[test]
    fn parses_fenced_object() {
        let raw = "```json\n{\"concepts\": [\"xylem\", \"\", \"phloem\"]}\n```";
        let concepts = parse_concepts(raw).unwrap();
        let labels: Vec<_> = concepts.iter().map(Concept::as_str).collect();
        assert_eq!(labels, vec!["xylem", "phloem"]);
    }

    #[test]
    fn rejects_missing_field_and_bare_lists() {
        assert!(parse_concepts(r#"{"terms": ["xylem"]}"#).is_err());
        assert!(parse_concepts(r#"["xylem"]"#).is_err());
        assert!(parse_concepts("Sure! Here are the concepts: xylem").is_err());
    }

    #[tokio::test]
    async fn extract_keeps_order() {
        let e = extractor(Ok(r#"{"concepts": ["photosynthesis", "chloroplast", "ATP"]}"#.into()));
        let out = e.extract("Photosynthesis occurs in chloroplasts.").await;
        assert_eq!(labels(&out), vec!["photosynthesis", "chloroplast", "ATP"]);
        assert_eq!(out.outcome, FieldOutcome::Generated);
    }

    #[tokio::test]
    async fn malformed_json_yields_empty() {
        let out = extractor(Ok("not json at all".into())).extract("text").await;
        assert!(out.concepts.is_empty());
        assert_eq!(out.outcome, FieldOutcome::Failed(FailureKind::Malformed));
    }

    #[tokio::test]
    async fn service_failure_yields_empty() {
        let out = extractor(Err(CompletionError::Permanent("HTTP 401".into())))
            .extract("text")
            .await;
        assert!(out.concepts.is_empty());
        assert_eq!(out.outcome, FieldOutcome::Failed(FailureKind::Permanent));

        let out = extractor(Err(CompletionError::Timeout(100))).extract("text").await;
        assert_eq!(out.outcome, FieldOutcome::Failed(FailureKind::Transient));
    }

    #[tokio::test]
    async fn empty_list_is_not_a_failure() {
        let out = extractor(Ok(r#"{"concepts": []}"#.into())).extract("text").await;
        assert!(out.concepts.is_empty());
        assert_eq!(out.outcome, FieldOutcome::Empty);
    }
}
