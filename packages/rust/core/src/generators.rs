//! Per-field enrichment generators: definition, synonym, and ontology match.
//!
//! Each generator renders its template, makes one completion call, and fails
//! open: an error becomes an empty value tagged with the failure kind.

use std::sync::Arc;

use tracing::{instrument, warn};

use conceptlens_completion::CompletionClient;
use conceptlens_shared::{
    Concept, FailureKind, FieldOutcome, FieldResult, ONTOLOGY_LINK_KEY, OntologyLinks,
};

use crate::ontology::{catalog_listing, first_catalog_match};
use crate::prompts::{PromptCatalog, PromptPurpose, slot};

/// Shared render-and-complete step.
#[derive(Clone)]
struct Generator {
    client: Arc<dyn CompletionClient>,
    catalog: Arc<PromptCatalog>,
}

impl Generator {
    async fn generate(
        &self,
        purpose: PromptPurpose,
        concept: &Concept,
        values: &[(&str, &str)],
    ) -> FieldResult<String> {
        let prompt = match self.catalog.render(purpose, values) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!(%concept, purpose = purpose.as_str(), error = %e, "prompt render failed");
                return FieldResult::failed(FailureKind::Internal);
            }
        };

        match self.client.complete(&prompt).await {
            Ok(text) => FieldResult::from_text(text),
            Err(e) => {
                warn!(
                    %concept,
                    purpose = purpose.as_str(),
                    error = %e,
                    "generation failed, leaving field empty"
                );
                FieldResult::failed(FailureKind::from(&e))
            }
        }
    }
}

/// Produces a short scientific description of a concept.
#[derive(Clone)]
pub struct DefinitionGenerator(Generator);

impl DefinitionGenerator {
    #[instrument(skip_all, fields(concept = %concept))]
    pub async fn define(&self, concept: &Concept) -> FieldResult<String> {
        self.0
            .generate(
                PromptPurpose::Definition,
                concept,
                &[(slot::CONCEPT, concept.as_str())],
            )
            .await
    }
}

/// Produces synonyms for a concept, given its definition as context.
#[derive(Clone)]
pub struct SynonymGenerator(Generator);

impl SynonymGenerator {
    /// `definition` may be empty when its generation failed upstream.
    #[instrument(skip_all, fields(concept = %concept))]
    pub async fn synonym(&self, concept: &Concept, definition: &str) -> FieldResult<String> {
        self.0
            .generate(
                PromptPurpose::Synonym,
                concept,
                &[
                    (slot::CONCEPT, concept.as_str()),
                    (slot::DEFINITION, definition),
                ],
            )
            .await
    }
}

/// Picks the best-fitting reference vocabulary for a concept.
#[derive(Clone)]
pub struct OntologyMatcher {
    generator: Generator,
    listing: Arc<str>,
}

impl OntologyMatcher {
    /// Returns `{"ontology": ID}` where `ID` is always a catalog identifier.
    /// Output that names no catalog identifier is reported as malformed.
    #[instrument(skip_all, fields(concept = %concept))]
    pub async fn match_ontology(
        &self,
        concept: &Concept,
        definition: &str,
    ) -> FieldResult<OntologyLinks> {
        let raw = self
            .generator
            .generate(
                PromptPurpose::OntologyMatch,
                concept,
                &[
                    (slot::CONCEPT, concept.as_str()),
                    (slot::DEFINITION, definition),
                    (slot::ONTOLOGY_CATALOG, &*self.listing),
                ],
            )
            .await;

        match raw.outcome {
            FieldOutcome::Generated => match first_catalog_match(&raw.value) {
                Some(found) => FieldResult {
                    value: OntologyLinks::from([(
                        ONTOLOGY_LINK_KEY.to_string(),
                        found.id.to_string(),
                    )]),
                    outcome: FieldOutcome::Generated,
                },
                None => {
                    warn!(%concept, output = %raw.value, "no catalog ontology in response");
                    FieldResult::failed(FailureKind::Malformed)
                }
            },
            outcome => FieldResult {
                value: OntologyLinks::new(),
                outcome,
            },
        }
    }
}

/// The three generators, sharing one client and catalog.
#[derive(Clone)]
pub struct EnrichmentGenerators {
    pub definition: DefinitionGenerator,
    pub synonym: SynonymGenerator,
    pub ontology: OntologyMatcher,
}

impl EnrichmentGenerators {
    pub fn new(client: Arc<dyn CompletionClient>, catalog: Arc<PromptCatalog>) -> Self {
        let generator = Generator { client, catalog };
        Self {
            definition: DefinitionGenerator(generator.clone()),
            synonym: SynonymGenerator(generator.clone()),
            ontology: OntologyMatcher {
                generator,
                listing: Arc::from(catalog_listing()),
            },
        }
    }
}
