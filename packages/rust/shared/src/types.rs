//! Core domain types for concept identification and enrichment.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::FailureKind;

// ---------------------------------------------------------------------------
// Concept
// ---------------------------------------------------------------------------

/// A domain term label. Identity is the label itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Concept(String);

impl Concept {
    /// Build a concept from a raw label, trimming surrounding whitespace.
    /// Returns `None` for labels that are empty after trimming.
    pub fn new(label: impl AsRef<str>) -> Option<Self> {
        let trimmed = label.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Wrap a fixed label that is already trimmed and non-empty.
    pub fn from_static(label: &'static str) -> Self {
        debug_assert!(!label.is_empty() && label.trim() == label);
        Self(label.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Comparison key: inner whitespace collapsed, lowercased.
    pub fn key(&self) -> String {
        normalize_label(&self.0)
    }
}

impl std::fmt::Display for Concept {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Concept {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Normalize a label for membership tests.
pub fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// ---------------------------------------------------------------------------
// KnownConceptSet
// ---------------------------------------------------------------------------

/// Caller-supplied vocabulary of labels that are already known.
#[derive(Debug, Clone, Default)]
pub struct KnownConceptSet {
    keys: HashSet<String>,
}

impl KnownConceptSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `concept` is known, compared by [`Concept::key`].
    pub fn contains(&self, concept: &Concept) -> bool {
        self.keys.contains(&concept.key())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for KnownConceptSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let keys = iter
            .into_iter()
            .map(|s| normalize_label(s.as_ref()))
            .filter(|k| !k.is_empty())
            .collect();
        Self { keys }
    }
}

// ---------------------------------------------------------------------------
// Field outcomes
// ---------------------------------------------------------------------------

/// How a single generated field came to hold its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldOutcome {
    /// The service produced a usable value.
    Generated,
    /// The service answered with nothing.
    Empty,
    /// The field was not requested.
    Skipped,
    /// Generation failed; the field holds an empty value.
    Failed(FailureKind),
}

impl FieldOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// A generated value together with its outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldResult<T> {
    pub value: T,
    pub outcome: FieldOutcome,
}

impl<T: Default> FieldResult<T> {
    /// An empty value tagged with the failure that produced it.
    pub fn failed(kind: FailureKind) -> Self {
        Self {
            value: T::default(),
            outcome: FieldOutcome::Failed(kind),
        }
    }

    /// An empty value for a field nobody asked for.
    pub fn skipped() -> Self {
        Self {
            value: T::default(),
            outcome: FieldOutcome::Skipped,
        }
    }
}

impl FieldResult<String> {
    /// Wrap service text, classifying blank output as [`FieldOutcome::Empty`].
    pub fn from_text(text: String) -> Self {
        let value = text.trim().to_string();
        let outcome = if value.is_empty() {
            FieldOutcome::Empty
        } else {
            FieldOutcome::Generated
        };
        Self { value, outcome }
    }
}

// ---------------------------------------------------------------------------
// UnknownConceptRecord
// ---------------------------------------------------------------------------

/// Vocabulary kind → ontology identifier.
pub type OntologyLinks = BTreeMap<String, String>;

/// Key under which the best-fit ontology identifier is stored.
pub const ONTOLOGY_LINK_KEY: &str = "ontology";

/// Terminal state of a concept's enrichment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    Complete,
    PartiallyFailed,
}

/// Per-field outcomes attached to a generated record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentStatus {
    pub state: RecordState,
    pub description: FieldOutcome,
    pub synonym: FieldOutcome,
    pub ontology: FieldOutcome,
}

impl EnrichmentStatus {
    pub fn new(description: FieldOutcome, synonym: FieldOutcome, ontology: FieldOutcome) -> Self {
        let any_failed = [description, synonym, ontology]
            .iter()
            .any(FieldOutcome::is_failed);
        Self {
            state: if any_failed {
                RecordState::PartiallyFailed
            } else {
                RecordState::Complete
            },
            description,
            synonym,
            ontology,
        }
    }
}

/// An unknown concept with its generated enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnknownConceptRecord {
    #[serde(rename = "originalLabel")]
    pub original_label: Concept,
    pub synonym: String,
    pub links: OntologyLinks,
    pub id: String,
    pub suggested_description: String,
    /// Absent only on the fixed development-mode record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<EnrichmentStatus>,
}

/// Generate a fresh opaque record identifier (UUID v7, time-sortable).
pub fn new_record_id() -> String {
    Uuid::now_v7().to_string()
}
