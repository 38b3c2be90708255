//! Core data model: search specifications, document identifiers, rendered
//! documents and the bibliographic records extracted from them.
//!
//! Every value here is created, used and dropped while a single identifier
//! is processed. Nothing is shared between identifiers.

use crate::error::InvalidIdentifier;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Source tag attached to every record.
pub const SOURCE_TAG: &str = "WIPO";

/// Only the first three auxiliary terms take part in a search.
pub const MAX_AUXILIARY_TERMS: usize = 3;

/// Default cap on the number of identifiers processed per run.
pub const DEFAULT_MAX_RESULTS: usize = 50;

/// What to search for: a molecule name plus optional development codes and
/// registry number.
///
/// Immutable once built; the `with_*` methods consume and return `self`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSpec {
    primary_term: String,
    auxiliary_terms: Vec<String>,
    registry_number: Option<String>,
    max_results: usize,
}

impl SearchSpec {
    pub fn new(primary_term: impl Into<String>) -> Self {
        Self {
            primary_term: primary_term.into(),
            auxiliary_terms: Vec::new(),
            registry_number: None,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    pub fn with_auxiliary_terms<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.auxiliary_terms = terms.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_registry_number(mut self, registry_number: impl Into<String>) -> Self {
        self.registry_number = Some(registry_number.into());
        self
    }

    /// Set the result cap. Zero is raised to one; the cap is always positive.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.max(1);
        self
    }

    pub fn primary_term(&self) -> &str {
        &self.primary_term
    }

    pub fn auxiliary_terms(&self) -> &[String] {
        &self.auxiliary_terms
    }

    pub fn registry_number(&self) -> Option<&str> {
        self.registry_number.as_deref()
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Terms that make up the search disjunction, in order: the primary term,
    /// at most [`MAX_AUXILIARY_TERMS`] auxiliary terms, then the registry
    /// number. Blank terms are skipped.
    pub fn query_terms(&self) -> Vec<&str> {
        std::iter::once(self.primary_term.as_str())
            .chain(
                self.auxiliary_terms
                    .iter()
                    .take(MAX_AUXILIARY_TERMS)
                    .map(String::as_str),
            )
            .chain(self.registry_number.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect()
    }
}

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Z]{2}[0-9]{4}[0-9]{6}$").expect("identifier regex is valid")
    })
}

/// Opaque token naming one document, e.g. `WO2019028689`.
///
/// Only the lexical shape (office code, four-digit year, six-digit serial) is
/// checked. Equality is exact string equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentIdentifier(String);

impl DocumentIdentifier {
    pub fn parse(raw: &str) -> Result<Self, InvalidIdentifier> {
        let trimmed = raw.trim();
        if identifier_pattern().is_match(trimmed) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(InvalidIdentifier(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DocumentIdentifier {
    type Err = InvalidIdentifier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DocumentIdentifier {
    type Error = InvalidIdentifier;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DocumentIdentifier> for String {
    fn from(id: DocumentIdentifier) -> Self {
        id.0
    }
}

/// Drop repeated identifiers, keeping the first occurrence of each.
pub fn dedup_preserving_order<I>(ids: I) -> Vec<DocumentIdentifier>
where
    I: IntoIterator<Item = DocumentIdentifier>,
{
    let mut seen = HashSet::new();
    ids.into_iter()
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

/// Serialized DOM of a fully rendered detail page, tagged with the identifier
/// it was fetched for.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    identifier: DocumentIdentifier,
    html: String,
}

impl RenderedDocument {
    pub fn new(identifier: DocumentIdentifier, html: String) -> Self {
        Self { identifier, html }
    }

    pub fn identifier(&self) -> &DocumentIdentifier {
        &self.identifier
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn len(&self) -> usize {
        self.html.len()
    }

    pub fn is_empty(&self) -> bool {
        self.html.is_empty()
    }
}

/// Bibliographic fields read from a detail page. Every field is independent:
/// a missing one never invalidates the others.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiblioFields {
    pub publication_number: Option<String>,
    pub publication_date: Option<String>,
    pub application_number: Option<String>,
    pub filing_date: Option<String>,
    pub title: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub applicants: Vec<String>,
    pub inventors: Vec<String>,
    pub agents: Vec<String>,
    pub ipc_codes: Vec<String>,
    pub cpc_codes: Vec<String>,
    pub priority_data: Option<String>,
}

impl BiblioFields {
    /// A record counts as extracted when both the publication number and
    /// the title resolved.
    pub fn is_complete(&self) -> bool {
        self.publication_number.is_some() && self.title.is_some()
    }
}

/// The structured output for one identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiblioRecord {
    pub identifier: DocumentIdentifier,
    pub source: String,
    #[serde(rename = "extraction_successful")]
    pub extraction_succeeded: bool,
    #[serde(rename = "biblio_data")]
    pub fields: BiblioFields,
}

impl BiblioRecord {
    /// Assemble a record; the success flag is derived from the fields.
    pub fn new(identifier: DocumentIdentifier, fields: BiblioFields) -> Self {
        Self {
            identifier,
            source: SOURCE_TAG.to_string(),
            extraction_succeeded: fields.is_complete(),
            fields,
        }
    }
}
