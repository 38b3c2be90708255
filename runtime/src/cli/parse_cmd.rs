//! CLI handler for `patentscope parse <file> --doc-id <docId>`.

use crate::cli::output;
use crate::extraction;
use crate::model::DocumentIdentifier;
use anyhow::{Context, Result};
use std::path::Path;

/// Extract a record from a saved page. Incomplete records are still
/// printed; the exit status stays 0 because the parse itself succeeded.
pub fn run(file: &Path, doc_id: &str) -> Result<()> {
    let id = DocumentIdentifier::parse(doc_id)?;
    let html = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;

    let record = extraction::extract_html(&html, &id);
    if !record.extraction_succeeded && !output::is_json() && !output::is_quiet() {
        eprintln!("  Warning: publication number or title not found in {}", file.display());
    }
    output::print_records(std::slice::from_ref(&record));
    Ok(())
}
