//! CLI handler for `patentscope search <molecule>`.

use crate::cli::output;
use crate::config::HarvestConfig;
use crate::events::EventBus;
use crate::model::SearchSpec;
use crate::progress::{self, ProgressReceiver};
use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

pub struct SearchArgs {
    pub molecule: String,
    pub dev_codes: Vec<String>,
    pub cas: Option<String>,
    pub max_results: usize,
    pub headed: bool,
    pub unit_timeout: Option<u64>,
    pub pacing_ms: Option<u64>,
}

impl SearchArgs {
    fn spec(&self) -> SearchSpec {
        let mut spec = SearchSpec::new(self.molecule.clone())
            .with_auxiliary_terms(self.dev_codes.iter().cloned())
            .with_max_results(self.max_results);
        if let Some(cas) = &self.cas {
            spec = spec.with_registry_number(cas.clone());
        }
        spec
    }

    fn config(&self) -> HarvestConfig {
        let mut config = HarvestConfig::default();
        if let Some(ms) = self.unit_timeout {
            config.unit_ceiling_ms = ms;
        }
        if let Some(ms) = self.pacing_ms {
            config.pacing_ms = ms;
        }
        config
    }
}

/// Run the search command.
pub async fn run(args: SearchArgs) -> Result<()> {
    let spec = args.spec();
    let harvester = crate::harvester(args.config(), !args.headed, EventBus::default());

    let show_bar = !output::is_quiet() && !output::is_json();
    let (tx, rx) = progress::channel();
    let bar_task = show_bar.then(|| tokio::spawn(drive_bar(rx)));

    let records = harvester.run(&spec, Some(tx)).await;

    if let Some(task) = bar_task {
        let _ = task.await;
    }

    if !output::is_quiet() && !output::is_json() {
        println!("  {} records extracted for {}\n", records.len(), spec.primary_term());
    }
    output::print_records(&records);
    Ok(())
}

/// Render progress events until the sender side is dropped.
async fn drive_bar(mut rx: ProgressReceiver) {
    let bar = ProgressBar::new(100);
    if let Ok(style) =
        ProgressStyle::with_template("{spinner:.green} [{bar:40.green/dim}] {pos:>3}% {msg}")
    {
        bar.set_style(style.progress_chars("=> "));
    }
    bar.enable_steady_tick(Duration::from_millis(120));

    loop {
        match rx.recv().await {
            Ok(event) => {
                bar.set_position(u64::from(event.percent));
                bar.set_message(event.message);
            }
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => break,
        }
    }
    bar.finish_and_clear();
}
