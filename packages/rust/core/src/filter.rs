//! Removes already-known labels from the extracted candidates.

use std::collections::HashSet;

use conceptlens_shared::{Concept, KnownConceptSet};

/// Candidates not in `known`, in extraction order.
///
/// Labels are compared by [`Concept::key`] (trimmed, whitespace-collapsed,
/// lowercased). Repeated labels keep only their first occurrence.
pub fn filter_unknown(candidates: &[Concept], known: &KnownConceptSet) -> Vec<Concept> {
    let mut seen = HashSet::new();
    candidates
        .iter()
        .filter(|c| !known.contains(c))
        .filter(|c| seen.insert(c.key()))
        .cloned()
        .collect()
}
