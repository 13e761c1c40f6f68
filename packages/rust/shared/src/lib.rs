//! Shared types, error model, and configuration for ConceptLens.
//!
//! This crate is the foundation depended on by all other ConceptLens crates.
//! It provides:
//! - [`ConceptLensError`] and [`CompletionError`]: the error model
//! - Domain types ([`Concept`], [`KnownConceptSet`], [`UnknownConceptRecord`])
//! - Configuration ([`AppConfig`], config loading, API key resolution)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    ApiKey, AppConfig, CompletionConfig, PipelineConfig, PromptsConfig, RetryConfig,
    ServerConfig, config_dir, config_file_path, init_config, load_config, load_config_from,
    resolve_api_key,
};
pub use error::{CompletionError, ConceptLensError, FailureKind, Result};
pub use types::{
    Concept, EnrichmentStatus, FieldOutcome, FieldResult, KnownConceptSet, ONTOLOGY_LINK_KEY,
    OntologyLinks, RecordState, UnknownConceptRecord, new_record_id, normalize_label,
};
