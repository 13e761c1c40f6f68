//! Concept pipeline for ConceptLens.
//!
//! This crate holds the prompt and ontology catalogs, the extraction and
//! filtering steps, the per-field enrichment generators, and the
//! [`Orchestrator`] that sequences them for a request.

pub mod dev;
pub mod extractor;
pub mod filter;
pub mod generators;
pub mod ontology;
pub mod orchestrator;
pub mod prompts;

pub use dev::static_record;
pub use extractor::{ConceptExtractor, Extraction, parse_concepts};
pub use filter::filter_unknown;
pub use generators::{DefinitionGenerator, EnrichmentGenerators, OntologyMatcher, SynonymGenerator};
pub use ontology::{ONTOLOGY_CATALOG, OntologyRef, catalog_listing, lookup_ontology};
pub use orchestrator::{
    EnrichmentProgress, FieldSelection, LabelOutput, Orchestrator, PipelineOutput,
    SilentEnrichmentProgress,
};
pub use prompts::{PromptCatalog, PromptPurpose, PromptTemplate};
