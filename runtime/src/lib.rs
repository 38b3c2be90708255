// Copyright 2026 PatentScope Harvest Contributors
// SPDX-License-Identifier: Apache-2.0

//! PatentScope harvest runtime: bibliographic records for patent documents
//! on a JavaScript-rendered search service.
//!
//! Discovery finds document identifiers over plain HTTP; each identifier is
//! then rendered in an isolated browser session, gated on a content marker,
//! and parsed by label-anchored extraction.

pub mod acquisition;
pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod extraction;
pub mod model;
pub mod progress;
pub mod renderer;

use acquisition::discovery::PatentscopeSearch;
use acquisition::orchestrator::PageAcquirer;
use batch::Harvester;
use config::HarvestConfig;
use events::EventBus;
use model::{BiblioRecord, SearchSpec};
use progress::ProgressSender;
use renderer::chromium::{ChromiumRenderer, LaunchOptions};
use std::sync::Arc;

/// Build a harvester against the live service with the given settings.
pub fn harvester(config: HarvestConfig, headless: bool, events: EventBus) -> Harvester {
    let config = Arc::new(config);
    let renderer = Arc::new(ChromiumRenderer::new(LaunchOptions::from_config(
        &config, headless,
    )));
    let acquirer = PageAcquirer::new(renderer, Arc::clone(&config), events.clone());
    let source = Arc::new(PatentscopeSearch::new(&config));
    Harvester::new(source, acquirer, config, events)
}

/// Search and harvest with default settings.
///
/// Always returns; an empty result means nothing matched or every
/// document failed, which the emitted events distinguish.
pub async fn run(
    spec: &SearchSpec,
    headless: bool,
    progress: Option<ProgressSender>,
) -> Vec<BiblioRecord> {
    harvester(HarvestConfig::default(), headless, EventBus::default())
        .run(spec, progress)
        .await
}
