// Copyright 2026 PatentScope Harvest Contributors
// SPDX-License-Identifier: Apache-2.0

//! Harvest event bus: structured events from every pipeline stage.
//!
//! The EventBus is a `tokio::sync::broadcast` channel that carries
//! [`HarvestEvent`] values. Tests subscribe to assert on what happened to a
//! given identifier; the CLI relies on the `tracing` mirror. When no
//! subscribers exist, events are silently dropped.

use crate::error::FailureReason;
use crate::model::DocumentIdentifier;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

/// Severity of an event; also selects the `tracing` level of the mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// One observable occurrence, optionally scoped to an identifier.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HarvestEvent {
    pub timestamp: String,
    pub level: EventLevel,
    pub identifier: Option<DocumentIdentifier>,
    pub kind: HarvestEventKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HarvestEventKind {
    // ── Discovery ─────────────────────────
    DiscoveryStarted { query: String },
    DiscoveryCompleted { count: usize },
    DiscoveryFailed { reason: FailureReason, detail: String },

    // ── Acquisition ───────────────────────
    SessionOpened,
    /// The quiet-network window did not arrive in time; acquisition goes on.
    SettleTimedOut { waited_ms: u64 },
    DocumentCaptured { bytes: usize, elapsed_ms: u64 },

    // ── Extraction ────────────────────────
    PartialExtraction {
        has_publication_number: bool,
        has_title: bool,
    },
    RecordExtracted { publication_number: String },

    // ── Units and batch ───────────────────
    UnitFailed { reason: FailureReason, detail: String },
    BatchCompleted {
        extracted: usize,
        total: usize,
        elapsed_ms: u64,
    },
}

impl fmt::Display for HarvestEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DiscoveryStarted { query } => write!(f, "search query: {query}"),
            Self::DiscoveryCompleted { count } => write!(f, "found {count} documents"),
            Self::DiscoveryFailed { reason, detail } => write!(f, "{reason}: {detail}"),
            Self::SessionOpened => write!(f, "browser session opened"),
            Self::SettleTimedOut { waited_ms } => {
                write!(f, "network not idle after {waited_ms}ms, continuing")
            }
            Self::DocumentCaptured { bytes, elapsed_ms } => {
                write!(f, "captured {bytes} chars in {elapsed_ms}ms")
            }
            Self::PartialExtraction {
                has_publication_number,
                has_title,
            } => write!(
                f,
                "partial extraction: publication number={has_publication_number}, title={has_title}"
            ),
            Self::RecordExtracted { publication_number } => {
                write!(f, "extracted {publication_number}")
            }
            Self::UnitFailed { reason, detail } => write!(f, "{reason}: {detail}"),
            Self::BatchCompleted {
                extracted,
                total,
                elapsed_ms,
            } => write!(f, "{extracted}/{total} records extracted in {elapsed_ms}ms"),
        }
    }
}

impl HarvestEvent {
    pub fn new(
        level: EventLevel,
        identifier: Option<&DocumentIdentifier>,
        kind: HarvestEventKind,
    ) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            level,
            identifier: identifier.cloned(),
            kind,
        }
    }
}

/// The event sink handed to every pipeline component.
///
/// Cloning is cheap; clones share the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<HarvestEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Mirror the event into `tracing`, then broadcast it. Never blocks.
    pub fn emit(&self, event: HarvestEvent) {
        let id = event
            .identifier
            .as_ref()
            .map(DocumentIdentifier::as_str)
            .unwrap_or("-");
        match event.level {
            EventLevel::Debug => tracing::debug!(identifier = id, "{}", event.kind),
            EventLevel::Info => tracing::info!(identifier = id, "{}", event.kind),
            EventLevel::Warn => tracing::warn!(identifier = id, "{}", event.kind),
            EventLevel::Error => tracing::error!(identifier = id, "{}", event.kind),
        }
        let _ = self.sender.send(event);
    }

    pub fn debug(&self, id: Option<&DocumentIdentifier>, kind: HarvestEventKind) {
        self.emit(HarvestEvent::new(EventLevel::Debug, id, kind));
    }

    pub fn info(&self, id: Option<&DocumentIdentifier>, kind: HarvestEventKind) {
        self.emit(HarvestEvent::new(EventLevel::Info, id, kind));
    }

    pub fn warn(&self, id: Option<&DocumentIdentifier>, kind: HarvestEventKind) {
        self.emit(HarvestEvent::new(EventLevel::Warn, id, kind));
    }

    pub fn error(&self, id: Option<&DocumentIdentifier>, kind: HarvestEventKind) {
        self.emit(HarvestEvent::new(EventLevel::Error, id, kind));
    }

    /// Subscribe to receive all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<HarvestEvent> {
        self.sender.subscribe()
    }
}

/// Drain whatever is currently buffered in a receiver.
pub fn drain(rx: &mut broadcast::Receiver<HarvestEvent>) -> Vec<HarvestEvent> {
    let mut out = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => out.push(event),
            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
    out
}
