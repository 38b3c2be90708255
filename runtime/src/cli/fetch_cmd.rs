//! CLI handler for `patentscope fetch <docId>...`.

use crate::acquisition::discovery::FixedIdentifiers;
use crate::acquisition::orchestrator::PageAcquirer;
use crate::batch::Harvester;
use crate::cli::output;
use crate::config::HarvestConfig;
use crate::error::UnitFailure;
use crate::events::EventBus;
use crate::extraction;
use crate::model::{DocumentIdentifier, SearchSpec};
use crate::renderer::chromium::{ChromiumRenderer, LaunchOptions};
use anyhow::{bail, Context, Result};
use std::path::Path;
use std::sync::Arc;

/// Run the fetch command.
pub async fn run(doc_ids: &[String], headed: bool, save_html: Option<&Path>) -> Result<()> {
    let ids = doc_ids
        .iter()
        .map(|raw| DocumentIdentifier::parse(raw))
        .collect::<Result<Vec<_>, _>>()?;

    let config = Arc::new(HarvestConfig::default());
    let events = EventBus::default();
    let renderer = Arc::new(ChromiumRenderer::new(LaunchOptions::from_config(
        &config, !headed,
    )));
    let acquirer = PageAcquirer::new(renderer, Arc::clone(&config), events.clone());

    if let Some(path) = save_html {
        let [id] = ids.as_slice() else {
            bail!("--save-html takes exactly one document identifier");
        };
        return fetch_and_save(&acquirer, &config, id, path).await;
    }

    let spec = SearchSpec::new(doc_ids.join(" ")).with_max_results(ids.len());
    let source = Arc::new(FixedIdentifiers::new(ids));
    let harvester = Harvester::new(source, acquirer, config, events);
    let records = harvester.run(&spec, None).await;

    if !output::is_quiet() && !output::is_json() {
        println!("  {}/{} records extracted\n", records.len(), doc_ids.len());
    }
    output::print_records(&records);
    Ok(())
}

/// One document under the unit ceiling, keeping the captured page on disk
/// even when extraction comes back incomplete.
async fn fetch_and_save(
    acquirer: &PageAcquirer,
    config: &HarvestConfig,
    id: &DocumentIdentifier,
    path: &Path,
) -> Result<()> {
    let ceiling = config.unit_ceiling();
    let doc = match tokio::time::timeout(ceiling, acquirer.acquire(id)).await {
        Ok(result) => result.map_err(UnitFailure::from)?,
        Err(_) => {
            return Err(UnitFailure::UnitTimeout {
                ceiling_ms: ceiling.as_millis() as u64,
            }
            .into())
        }
    };

    std::fs::write(path, doc.html())
        .with_context(|| format!("failed to write {}", path.display()))?;
    if !output::is_quiet() && !output::is_json() {
        println!("  Saved {} chars to {}\n", doc.len(), path.display());
    }

    let record = extraction::extract(&doc);
    if !record.extraction_succeeded && !output::is_json() {
        eprintln!("  Warning: extraction incomplete for {id}");
    }
    output::print_records(std::slice::from_ref(&record));
    Ok(())
}
