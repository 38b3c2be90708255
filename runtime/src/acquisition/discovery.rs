//! Identifier discovery: turn a [`SearchSpec`] into an ordered, deduplicated
//! list of document identifiers.
//!
//! The search result page is plain server-rendered HTML, so one HTTP GET is
//! enough. Identifiers are read from the `docId=` parameter of detail-page
//! hyperlinks.

use super::http_client::HttpClient;
use crate::config::HarvestConfig;
use crate::error::DiscoveryFailure;
use crate::model::{dedup_preserving_order, DocumentIdentifier, SearchSpec};
use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::OnceLock;
use tracing::debug;

/// Hyperlink targets must point at the detail page to count.
const DETAIL_LINK_MARKER: &str = "detail.jsf?docId=";

/// Produces the identifiers a batch will process.
#[async_trait]
pub trait IdentifierSource: Send + Sync {
    /// Human-readable name for logs.
    fn name(&self) -> &str;

    /// At most `spec.max_results()` identifiers, no duplicates, in
    /// first-seen order.
    async fn discover(&self, spec: &SearchSpec)
        -> Result<Vec<DocumentIdentifier>, DiscoveryFailure>;
}

/// Build the free-text disjunction, e.g.
/// `FP:(darolutamide OR ODM-201 OR BAY-1841788)`.
pub fn build_query(spec: &SearchSpec) -> String {
    format!("FP:({})", spec.query_terms().join(" OR "))
}

fn doc_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"docId=([A-Z]{2}[0-9]{4}[0-9]{6})\b").expect("docId regex is valid")
    })
}

fn link_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| Selector::parse("a[href]").expect("link selector is valid"))
}

/// Scan a search result page for detail-page identifiers.
///
/// Deduplicates preserving first-seen order and truncates to `max_results`.
pub fn extract_identifiers(html: &str, max_results: usize) -> Vec<DocumentIdentifier> {
    let document = Html::parse_document(html);
    let found = document
        .select(link_selector())
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| href.contains(DETAIL_LINK_MARKER))
        .filter_map(|href| doc_id_pattern().captures(href))
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| DocumentIdentifier::parse(m.as_str()).ok());

    let mut ids = dedup_preserving_order(found);
    ids.truncate(max_results);
    ids
}

/// Discovery against the PATENTSCOPE result page.
pub struct PatentscopeSearch {
    client: HttpClient,
    search_url: String,
}

impl PatentscopeSearch {
    pub fn new(config: &HarvestConfig) -> Self {
        Self {
            client: HttpClient::new(&config.user_agent, config.search_timeout()),
            search_url: config.search_url.clone(),
        }
    }
}

#[async_trait]
impl IdentifierSource for PatentscopeSearch {
    fn name(&self) -> &str {
        "patentscope"
    }

    async fn discover(
        &self,
        spec: &SearchSpec,
    ) -> Result<Vec<DocumentIdentifier>, DiscoveryFailure> {
        let query = build_query(spec);
        let resp = self
            .client
            .get(&self.search_url, &[("query", query.as_str())])
            .await
            .map_err(|e| DiscoveryFailure::Transport(format!("{e:#}")))?;

        debug!(url = %resp.final_url, status = resp.status, "search response");
        if !resp.is_success() {
            return Err(DiscoveryFailure::Status(resp.status));
        }

        Ok(extract_identifiers(&resp.body, spec.max_results()))
    }
}

/// A fixed identifier list, for runs where the documents are already known.
pub struct FixedIdentifiers {
    ids: Vec<DocumentIdentifier>,
}

impl FixedIdentifiers {
    pub fn new(ids: impl IntoIterator<Item = DocumentIdentifier>) -> Self {
        Self {
            ids: dedup_preserving_order(ids),
        }
    }
}

#[async_trait]
impl IdentifierSource for FixedIdentifiers {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn discover(
        &self,
        spec: &SearchSpec,
    ) -> Result<Vec<DocumentIdentifier>, DiscoveryFailure> {
        Ok(self.ids.iter().take(spec.max_results()).cloned().collect())
    }
}
