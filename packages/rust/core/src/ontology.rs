//! The fixed catalog of reference vocabularies a concept can be mapped into.

use std::sync::LazyLock;

use regex::Regex;

/// One reference vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OntologyRef {
    pub id: &'static str,
    pub description: &'static str,
}

const fn onto(id: &'static str, description: &'static str) -> OntologyRef {
    OntologyRef { id, description }
}

/// Every identifier the ontology matcher may emit.
pub const ONTOLOGY_CATALOG: &[OntologyRef] = &[
    onto("THYSANOPTERA", "Thysanoptera ontology (thrips, Insecta)"),
    onto("LIT_I", "Lithologs rock names ontology for igneous rocks"),
    onto("IHO", "World seas"),
    onto("PTO", "Plant Trait Ontology"),
    onto(
        "SCHEMAORG",
        "Schemas for structured data on the Internet, on web pages, in email messages, and beyond",
    ),
    onto("OBOE", "Semantics of scientific observation and measurement"),
    onto("COL", "Global species checklists"),
    onto("OBA", "Ontology of Biological Attributes"),
    onto("CHEBI", "Chemical Entities of Biological Interest Ontology"),
    onto("QUDT", "Quantities, Units, Dimensions, and Types Ontology"),
    onto("BCO", "Biological Collections Ontology"),
    onto("ENVO", "The Environment Ontology"),
    onto("I-ADOPT", "Machine-readable variable descriptions"),
    onto("PATO", "Phenotypic Quality Ontology"),
    onto("KINGDOM", "Biological taxa"),
    onto(
        "GEONAMES",
        "Geographical database covering all countries with over eleven million placenames",
    ),
    onto("ORIBATIDA", "Oribatida (moss or beetle mites)"),
    onto("RECORDBASIS", "The specific nature of the data record"),
    onto("BIOBANK", "AMMOD metabarcoding ontology"),
    onto("UNESCO6", "UNESCO nomenclature for fields of science and technology"),
    onto("FLOPO", "Flora Phenotype Ontology"),
    onto("ETS", "Ecological Trait-data Standard"),
    onto("IOC", "IOC World Bird List"),
    onto("SWEET", "Semantic Web for Earth and Environment Technology"),
    onto("ATOL", "Animal Trait Ontology for Livestock"),
    onto("ISOCOUNTRIES", "Countries and subdivisions"),
    onto("TRICHOPTERA", "Trichoptera (caddisflies, Insecta)"),
    onto("ABCD", "ABCD base ontology"),
    onto("SRAO", "Hierarchy of academic disciplines"),
    onto("PO", "Plant Ontology"),
    onto(
        "NCBI",
        "Nomenclature for all organisms in the public sequence databases",
    ),
];

static IDENTIFIER_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9_]+(?:-[A-Za-z0-9_]+)*").expect("static regex"));

/// Render the catalog as `ID: description` lines for embedding in a prompt.
pub fn catalog_listing() -> String {
    ONTOLOGY_CATALOG
        .iter()
        .map(|o| format!("{}: {}", o.id, o.description))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Look up a single token, ignoring ASCII case.
pub fn lookup_ontology(token: &str) -> Option<&'static OntologyRef> {
    let token = token.trim();
    ONTOLOGY_CATALOG
        .iter()
        .find(|o| o.id.eq_ignore_ascii_case(token))
}

/// Catalog identifier named by free-form service output.
///
/// A reply that is nothing but an identifier matches in any case. Inside
/// longer prose only tokens spelled exactly like a catalog id count, so
/// ordinary words such as "kingdom" or "sweet" never match.
pub fn first_catalog_match(text: &str) -> Option<&'static OntologyRef> {
    let whole = text.trim().trim_end_matches(['.', '!']);
    lookup_ontology(whole).or_else(|| {
        IDENTIFIER_TOKEN
            .find_iter(text)
            .find_map(|m| ONTOLOGY_CATALOG.iter().find(|o| o.id == m.as_str()))
    })
}
