//! Prompt templates keyed by purpose.
//!
//! Templates are versioned data: named `{slot}` insertion points, rendered in
//! a single pass. Brace groups that are not slots of the template's purpose
//! (such as the JSON example in the extraction prompt) are left untouched, and
//! substituted values are never re-scanned.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use sha2::{Digest, Sha256};

use conceptlens_shared::{ConceptLensError, PromptsConfig, Result};

/// Slot names shared by the built-in templates.
pub mod slot {
    pub const TEXT: &str = "text";
    pub const CONCEPT: &str = "concept";
    pub const DEFINITION: &str = "definition";
    pub const ONTOLOGY_CATALOG: &str = "ontology_catalog";
}

static SLOT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-z_]+)\}").expect("static regex"));

const EXTRACTION_TEMPLATE: &str = r#"
You are an expert in Biology. Considering only the text provided below, identify every concept that relates to your field.
Return a JSON object of the form {"concepts": ["first concept", "second concept"]}.

DO NOT OUTPUT ANY ADDITIONAL TEXT EXCEPT THIS JSON OBJECT
The text: {text}
"#;

const DEFINITION_TEMPLATE: &str = r#"
I will provide you a concept extracted from various ontologies. You have to provide a scientific description of this concept in two sentences maximum.

DO NOT OUTPUT ANY ADDITIONAL TEXT EXCEPT THESE DEFINITION SENTENCES
The concept: {concept}"#;

const SYNONYM_TEMPLATE: &str = r#"
I will provide you a concept and its definition. You have to provide 2 or 3 scientific synonyms for that concept, separated by commas, without writing a sentence.

DO NOT OUTPUT ANY ADDITIONAL TEXT EXCEPT THESE SYNONYMS
The concept: {concept}
The definition: {definition}"#;

const ONTOLOGY_TEMPLATE: &str = r#"
You are an expert in Ontologies.

You know these ontologies and all their content and classes:
{ontology_catalog}

I will provide a concept and its definition. Using all your knowledge, identify the single best fitting ontology from the list and return just its identifier.

DO NOT OUTPUT ANY ADDITIONAL TEXT EXCEPT THIS IDENTIFIER
The concept: {concept}
The definition: {definition}"#;

// ---------------------------------------------------------------------------
// PromptPurpose
// ---------------------------------------------------------------------------

/// What a template is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PromptPurpose {
    Extraction,
    Definition,
    Synonym,
    OntologyMatch,
}

impl PromptPurpose {
    pub const ALL: [PromptPurpose; 4] = [
        Self::Extraction,
        Self::Definition,
        Self::Synonym,
        Self::OntologyMatch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extraction => "extraction",
            Self::Definition => "definition",
            Self::Synonym => "synonym",
            Self::OntologyMatch => "ontology_match",
        }
    }

    /// Slots a template for this purpose must contain.
    pub fn required_slots(&self) -> &'static [&'static str] {
        match self {
            Self::Extraction => &[slot::TEXT],
            Self::Definition => &[slot::CONCEPT],
            Self::Synonym => &[slot::CONCEPT, slot::DEFINITION],
            Self::OntologyMatch => &[slot::CONCEPT, slot::DEFINITION, slot::ONTOLOGY_CATALOG],
        }
    }

    fn builtin_text(&self) -> &'static str {
        match self {
            Self::Extraction => EXTRACTION_TEMPLATE,
            Self::Definition => DEFINITION_TEMPLATE,
            Self::Synonym => SYNONYM_TEMPLATE,
            Self::OntologyMatch => ONTOLOGY_TEMPLATE,
        }
    }
}

// ---------------------------------------------------------------------------
// PromptTemplate
// ---------------------------------------------------------------------------

/// A template with named insertion points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    purpose: PromptPurpose,
    text: String,
}

impl PromptTemplate {
    /// Build a template, checking that every required slot appears in `text`.
    pub fn new(purpose: PromptPurpose, text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        let present: Vec<&str> = SLOT_PATTERN
            .captures_iter(&text)
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .collect();

        let missing: Vec<&str> = purpose
            .required_slots()
            .iter()
            .copied()
            .filter(|s| !present.contains(s))
            .collect();

        if !missing.is_empty() {
            return Err(ConceptLensError::validation(format!(
                "{} template is missing slot(s): {}",
                purpose.as_str(),
                missing.join(", ")
            )));
        }

        Ok(Self { purpose, text })
    }

    pub fn purpose(&self) -> PromptPurpose {
        self.purpose
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Substitute `values` into the template's slots.
    pub fn render(&self, values: &[(&str, &str)]) -> Result<String> {
        let slots = self.purpose.required_slots();

        if let Some(missing) = slots
            .iter()
            .find(|s| !values.iter().any(|(name, _)| name == *s))
        {
            return Err(ConceptLensError::validation(format!(
                "no value for slot `{missing}` in {} template",
                self.purpose.as_str()
            )));
        }

        let rendered = SLOT_PATTERN.replace_all(&self.text, |caps: &Captures<'_>| {
            let name = &caps[1];
            if slots.contains(&name) {
                values
                    .iter()
                    .find(|(n, _)| *n == name)
                    .map(|(_, v)| (*v).to_string())
                    .unwrap_or_default()
            } else {
                caps[0].to_string()
            }
        });

        Ok(rendered.into_owned())
    }
}

// ---------------------------------------------------------------------------
// PromptCatalog
// ---------------------------------------------------------------------------

/// The table of templates, one per purpose.
#[derive(Debug, Clone)]
pub struct PromptCatalog {
    templates: BTreeMap<PromptPurpose, PromptTemplate>,
}

impl PromptCatalog {
    /// The built-in templates.
    pub fn builtin() -> Self {
        let templates = PromptPurpose::ALL
            .into_iter()
            .map(|p| {
                (
                    p,
                    PromptTemplate {
                        purpose: p,
                        text: p.builtin_text().to_string(),
                    },
                )
            })
            .collect();
        Self { templates }
    }

    /// Replace one purpose's template.
    pub fn with_override(mut self, purpose: PromptPurpose, text: impl Into<String>) -> Result<Self> {
        let template = PromptTemplate::new(purpose, text)?;
        self.templates.insert(purpose, template);
        Ok(self)
    }

    /// Built-in templates with any overrides from `[prompts]` applied.
    pub fn from_config(config: &PromptsConfig) -> Result<Self> {
        let overrides = [
            (PromptPurpose::Extraction, &config.extraction),
            (PromptPurpose::Definition, &config.definition),
            (PromptPurpose::Synonym, &config.synonym),
            (PromptPurpose::OntologyMatch, &config.ontology_match),
        ];

        let mut catalog = Self::builtin();
        for (purpose, text) in overrides {
            if let Some(text) = text {
                catalog = catalog.with_override(purpose, text.clone())?;
                tracing::info!(purpose = purpose.as_str(), "using prompt override");
            }
        }
        Ok(catalog)
    }

    pub fn get(&self, purpose: PromptPurpose) -> &PromptTemplate {
        // Every purpose is inserted by `builtin()` and never removed.
        &self.templates[&purpose]
    }

    pub fn render(&self, purpose: PromptPurpose, values: &[(&str, &str)]) -> Result<String> {
        self.get(purpose).render(values)
    }

    /// SHA-256 fingerprint over every template, for logging and health output.
    pub fn version(&self) -> String {
        let mut hasher = Sha256::new();
        for (purpose, template) in &self.templates {
            hasher.update(purpose.as_str().as_bytes());
            hasher.update([0u8]);
            hasher.update(template.text.as_bytes());
            hasher.update([0u8]);
        }
        let digest = format!("{:x}", hasher.finalize());
        digest[..16].to_string()
    }
}

impl Default for PromptCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
