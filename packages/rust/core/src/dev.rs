//! Development mode: a fixed record served without touching the pipeline.

use conceptlens_shared::{Concept, ONTOLOGY_LINK_KEY, OntologyLinks, UnknownConceptRecord};

pub const STATIC_LABEL: &str = "staticConcept";

/// The literal record returned when `dev_mode` is set.
pub fn static_record() -> UnknownConceptRecord {
    UnknownConceptRecord {
        original_label: Concept::from_static(STATIC_LABEL),
        synonym: "staticSynonym".into(),
        links: OntologyLinks::from([(
            ONTOLOGY_LINK_KEY.to_string(),
            "staticOntologyLink".to_string(),
        )]),
        id: "1234".into(),
        suggested_description: "This is a static description for development mode.".into(),
        status: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_to_the_fixed_shape() {
        let json = serde_json::to_value(static_record()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "originalLabel": "staticConcept",
                "synonym": "staticSynonym",
                "links": {"ontology": "staticOntologyLink"},
                "id": "1234",
                "suggested_description": "This is a static description for development mode."
            })
        );
    }
}
