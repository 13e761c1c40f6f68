//! Pipeline orchestration: extract, filter, then enrich every unknown concept.
//!
//! Enrichment fans out one task per concept, bounded by
//! `max_concurrent_concepts`. Within a concept the definition is generated
//! first; synonym and ontology match then run concurrently against it.
//! Output order always equals input order.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument};

use conceptlens_completion::CompletionClient;
use conceptlens_shared::{
    Concept, ConceptLensError, EnrichmentStatus, FailureKind, FieldOutcome, FieldResult,
    KnownConceptSet, OntologyLinks, PipelineConfig, RecordState, Result, UnknownConceptRecord,
    new_record_id,
};

use crate::extractor::ConceptExtractor;
use crate::filter::filter_unknown;
use crate::generators::EnrichmentGenerators;
use crate::prompts::PromptCatalog;

// ---------------------------------------------------------------------------
// Request shapes
// ---------------------------------------------------------------------------

/// Which record fields to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSelection {
    pub description: bool,
    pub synonym: bool,
    pub ontology: bool,
}

impl FieldSelection {
    pub const ALL: Self = Self {
        description: true,
        synonym: true,
        ontology: true,
    };
    pub const DESCRIPTION_ONLY: Self = Self {
        description: true,
        synonym: false,
        ontology: false,
    };
    pub const SYNONYM_ONLY: Self = Self {
        description: false,
        synonym: true,
        ontology: false,
    };
    pub const ONTOLOGY_ONLY: Self = Self {
        description: false,
        synonym: false,
        ontology: true,
    };

    /// Every field is derived from the definition, so any selection needs it.
    pub fn needs_definition(&self) -> bool {
        self.description || self.synonym || self.ontology
    }
}

/// Result of a full identify run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub records: Vec<UnknownConceptRecord>,
    /// How the extraction call went; `Failed` means the empty record list
    /// says nothing about the text.
    pub extraction: FieldOutcome,
}

/// Result of extraction and filtering only.
#[derive(Debug, Clone)]
pub struct LabelOutput {
    pub unknown: Vec<Concept>,
    pub extraction: FieldOutcome,
}

// ---------------------------------------------------------------------------
// Progress trait
// ---------------------------------------------------------------------------

/// Progress callback for enrichment operations.
pub trait EnrichmentProgress: Send + Sync {
    /// A new phase has started.
    fn phase(&self, name: &str);
    /// A concept finished enriching (`current` of `total`).
    fn task_progress(&self, current: usize, total: usize, detail: &str);
}

/// No-op progress reporter.
pub struct SilentEnrichmentProgress;

impl EnrichmentProgress for SilentEnrichmentProgress {
    fn phase(&self, _name: &str) {}
    fn task_progress(&self, _current: usize, _total: usize, _detail: &str) {}
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Runs the concept pipeline against one completion client.
pub struct Orchestrator {
    extractor: ConceptExtractor,
    generators: EnrichmentGenerators,
    max_concurrent: usize,
    prompt_version: String,
}

impl Orchestrator {
    pub fn new(
        client: Arc<dyn CompletionClient>,
        catalog: Arc<PromptCatalog>,
        config: &PipelineConfig,
    ) -> Self {
        let prompt_version = catalog.version();
        info!(
            client = client.name(),
            prompt_version = %prompt_version,
            max_concurrent = config.max_concurrent_concepts,
            "orchestrator ready"
        );
        Self {
            extractor: ConceptExtractor::new(client.clone(), catalog.clone()),
            generators: EnrichmentGenerators::new(client, catalog),
            max_concurrent: config.max_concurrent_concepts.max(1),
            prompt_version,
        }
    }

    /// Fingerprint of the prompt catalog in use.
    pub fn prompt_version(&self) -> &str {
        &self.prompt_version
    }

    /// Extract candidates from `text` and drop the ones in `known`.
    #[instrument(skip_all, fields(text_len = text.len(), known = known.len()))]
    pub async fn unknown_labels(&self, text: &str, known: &KnownConceptSet) -> Result<LabelOutput> {
        if text.trim().is_empty() {
            return Err(ConceptLensError::validation("text must not be empty"));
        }

        let extraction = self.extractor.extract(text).await;
        let unknown = filter_unknown(&extraction.concepts, known);
        info!(
            candidates = extraction.concepts.len(),
            unknown = unknown.len(),
            "filtered extracted concepts"
        );

        Ok(LabelOutput {
            unknown,
            extraction: extraction.outcome,
        })
    }

    /// Full pipeline: extract, filter, and enrich every unknown concept.
    pub async fn identify(
        &self,
        text: &str,
        known: &KnownConceptSet,
        progress: &dyn EnrichmentProgress,
    ) -> Result<PipelineOutput> {
        progress.phase("Extracting concepts");
        let labels = self.unknown_labels(text, known).await?;

        progress.phase("Enriching concepts");
        let records = self
            .enrich(labels.unknown, FieldSelection::ALL, progress)
            .await;

        Ok(PipelineOutput {
            records,
            extraction: labels.extraction,
        })
    }

    /// Enrich caller-supplied concepts with the selected fields.
    ///
    /// Never fails: a field that could not be generated is left empty and
    /// marked in the record's status.
    #[instrument(skip_all, fields(concepts = concepts.len()))]
    pub async fn enrich(
        &self,
        concepts: Vec<Concept>,
        selection: FieldSelection,
        progress: &dyn EnrichmentProgress,
    ) -> Vec<UnknownConceptRecord> {
        let total = concepts.len();
        if total == 0 {
            return Vec::new();
        }

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut tasks = JoinSet::new();

        for (idx, concept) in concepts.iter().cloned().enumerate() {
            let generators = self.generators.clone();
            let sem = semaphore.clone();
            tasks.spawn(async move {
                let Ok(_permit) = sem.acquire().await else {
                    return (idx, failed_record(concept, selection, FailureKind::Internal));
                };
                (idx, enrich_concept(&generators, concept, selection).await)
            });
        }

        let mut slots: Vec<Option<UnknownConceptRecord>> = vec![None; total];
        let mut completed = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, record)) => {
                    completed += 1;
                    progress.task_progress(completed, total, record.original_label.as_str());
                    slots[idx] = Some(record);
                }
                Err(e) => error!(error = %e, "concept enrichment task failed"),
            }
        }

        let records: Vec<UnknownConceptRecord> = concepts
            .into_iter()
            .zip(slots)
            .map(|(concept, slot)| {
                slot.unwrap_or_else(|| failed_record(concept, selection, FailureKind::Internal))
            })
            .collect();

        let degraded = records
            .iter()
            .filter(|r| {
                r.status
                    .as_ref()
                    .is_some_and(|s| s.state == RecordState::PartiallyFailed)
            })
            .count();
        info!(records = records.len(), degraded, "enrichment complete");

        records
    }
}

/// Definition first, then synonym and ontology concurrently.
async fn enrich_concept(
    generators: &EnrichmentGenerators,
    concept: Concept,
    selection: FieldSelection,
) -> UnknownConceptRecord {
    let definition = if selection.needs_definition() {
        generators.definition.define(&concept).await
    } else {
        FieldResult::skipped()
    };

    let (synonym, ontology) = tokio::join!(
        async {
            if selection.synonym {
                generators.synonym.synonym(&concept, &definition.value).await
            } else {
                FieldResult::skipped()
            }
        },
        async {
            if selection.ontology {
                generators
                    .ontology
                    .match_ontology(&concept, &definition.value)
                    .await
            } else {
                FieldResult::skipped()
            }
        },
    );

    let description = if selection.description {
        definition
    } else {
        FieldResult::skipped()
    };

    let status = EnrichmentStatus::new(description.outcome, synonym.outcome, ontology.outcome);
    debug!(concept = %concept, state = ?status.state, "concept enriched");

    UnknownConceptRecord {
        original_label: concept,
        synonym: synonym.value,
        links: ontology.value,
        id: new_record_id(),
        suggested_description: description.value,
        status: Some(status),
    }
}

/// A record whose every selected field failed with `kind`.
fn failed_record(
    concept: Concept,
    selection: FieldSelection,
    kind: FailureKind,
) -> UnknownConceptRecord {
    let outcome = |selected: bool| {
        if selected {
            FieldOutcome::Failed(kind)
        } else {
            FieldOutcome::Skipped
        }
    };

    UnknownConceptRecord {
        original_label: concept,
        synonym: String::new(),
        links: OntologyLinks::new(),
        id: new_record_id(),
        suggested_description: String::new(),
        status: Some(EnrichmentStatus::new(
            outcome(selection.description),
            outcome(selection.synonym),
            outcome(selection.ontology),
        )),
    }
}
