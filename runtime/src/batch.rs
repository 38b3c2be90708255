//! Batch coordination: discovery once, then one bounded unit per identifier.
//!
//! Units run strictly one at a time. Each unit (acquire then extract) is
//! wrapped in a wall-clock ceiling; a unit that fails in any way, or overruns
//! the ceiling, is skipped and the batch moves on. Dropping the unit's future
//! at the ceiling drops its session guard, which releases the browser.

use crate::acquisition::discovery::{build_query, IdentifierSource};
use crate::acquisition::orchestrator::PageAcquirer;
use crate::config::HarvestConfig;
use crate::error::UnitFailure;
use crate::events::{EventBus, HarvestEventKind};
use crate::extraction;
use crate::model::{BiblioRecord, DocumentIdentifier, SearchSpec};
use crate::progress::{self, percent_of, ProgressSender};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout};
use tracing::debug;

/// Runs harvests. Holds no per-identifier state between units.
pub struct Harvester {
    source: Arc<dyn IdentifierSource>,
    acquirer: PageAcquirer,
    config: Arc<HarvestConfig>,
    events: EventBus,
}

impl Harvester {
    pub fn new(
        source: Arc<dyn IdentifierSource>,
        acquirer: PageAcquirer,
        config: Arc<HarvestConfig>,
        events: EventBus,
    ) -> Self {
        Self {
            source,
            acquirer,
            config,
            events,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Discover identifiers for `spec` and harvest each in order.
    ///
    /// Always returns; the result holds only successfully extracted records,
    /// in discovery order. Failures surface as events, not errors.
    pub async fn run(
        &self,
        spec: &SearchSpec,
        progress_tx: Option<ProgressSender>,
    ) -> Vec<BiblioRecord> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let mut seq = 0u64;
        let started = Instant::now();

        progress::emit(&progress_tx, &request_id, &mut seq, 0, "Searching PATENTSCOPE...");
        self.events.info(
            None,
            HarvestEventKind::DiscoveryStarted {
                query: build_query(spec),
            },
        );

        debug!(source = self.source.name(), request_id = %request_id, "discovering");
        let mut ids = match self.source.discover(spec).await {
            Ok(ids) => ids,
            Err(e) => {
                self.events.error(
                    None,
                    HarvestEventKind::DiscoveryFailed {
                        reason: e.reason(),
                        detail: e.to_string(),
                    },
                );
                Vec::new()
            }
        };
        ids.truncate(spec.max_results());
        self.events
            .info(None, HarvestEventKind::DiscoveryCompleted { count: ids.len() });
        if ids.is_empty() {
            return Vec::new();
        }

        let total = ids.len();
        let mut records = Vec::with_capacity(total);
        for (i, id) in ids.iter().enumerate() {
            let n = i + 1;
            progress::emit(
                &progress_tx,
                &request_id,
                &mut seq,
                percent_of(n, total),
                format!("Processing {id} ({n}/{total})"),
            );

            match self.process_bounded(id).await {
                Ok(record) => records.push(record),
                Err(failure) => self.events.warn(
                    Some(id),
                    HarvestEventKind::UnitFailed {
                        reason: failure.reason(),
                        detail: failure.to_string(),
                    },
                ),
            }

            if n < total {
                sleep(self.config.pacing()).await;
            }
        }

        progress::emit(
            &progress_tx,
            &request_id,
            &mut seq,
            100,
            format!("Harvest complete: {}/{total} records", records.len()),
        );
        self.events.info(
            None,
            HarvestEventKind::BatchCompleted {
                extracted: records.len(),
                total,
                elapsed_ms: started.elapsed().as_millis() as u64,
            },
        );
        records
    }

    /// One unit under the wall-clock ceiling.
    pub async fn process_bounded(
        &self,
        id: &DocumentIdentifier,
    ) -> Result<BiblioRecord, UnitFailure> {
        let ceiling = self.config.unit_ceiling();
        match timeout(ceiling, self.process(id)).await {
            Ok(result) => result,
            Err(_) => Err(UnitFailure::UnitTimeout {
                ceiling_ms: ceiling.as_millis() as u64,
            }),
        }
    }

    /// One unit: acquire the page, extract the record, check completeness.
    pub async fn process(&self, id: &DocumentIdentifier) -> Result<BiblioRecord, UnitFailure> {
        let doc = self.acquirer.acquire(id).await?;
        let record = extraction::extract(&doc);
        drop(doc);

        if !record.extraction_succeeded {
            let has_publication_number = record.fields.publication_number.is_some();
            let has_title = record.fields.title.is_some();
            self.events.warn(
                Some(id),
                HarvestEventKind::PartialExtraction {
                    has_publication_number,
                    has_title,
                },
            );
            return Err(UnitFailure::ExtractionIncomplete {
                has_publication_number,
                has_title,
            });
        }

        self.events.info(
            Some(id),
            HarvestEventKind::RecordExtracted {
                publication_number: record
                    .fields
                    .publication_number
                    .clone()
                    .unwrap_or_default(),
            },
        );
        Ok(record)
    }
}
