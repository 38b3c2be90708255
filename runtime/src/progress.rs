// Copyright 2026 PatentScope Harvest Contributors
// SPDX-License-Identifier: Apache-2.0

//! Progress events and broadcast channel for batch runs.
//!
//! The coordinator emits a `ProgressEvent` before discovery and once per
//! identifier. Events flow through a `tokio::sync::broadcast` channel, so
//! sending never blocks the pipeline; with no subscriber they are dropped.

use serde::{Deserialize, Serialize};

/// A progress report: percent complete plus a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// The run this event belongs to.
    pub request_id: String,
    /// Monotonically increasing sequence number.
    pub seq: u64,
    /// 0..=100.
    pub percent: u8,
    pub message: String,
}

/// Sender handle for emitting progress events.
pub type ProgressSender = tokio::sync::broadcast::Sender<ProgressEvent>;

/// Receiver handle for consuming progress events.
pub type ProgressReceiver = tokio::sync::broadcast::Receiver<ProgressEvent>;

/// Create a new progress broadcast channel with a bounded buffer.
pub fn channel() -> (ProgressSender, ProgressReceiver) {
    tokio::sync::broadcast::channel(256)
}

/// Percent complete after `done` of `total` items, rounded to the nearest
/// integer and clamped to 100.
pub fn percent_of(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = (done as f64 / total as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

/// Emit a progress event, silently ignoring send errors (which occur when
/// no receivers are listening).
pub fn emit(
    tx: &Option<ProgressSender>,
    request_id: &str,
    seq: &mut u64,
    percent: u8,
    message: impl Into<String>,
) {
    if let Some(ref sender) = tx {
        *seq += 1;
        let _ = sender.send(ProgressEvent {
            request_id: request_id.to_string(),
            seq: *seq,
            percent: percent.min(100),
            message: message.into(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_rounds() {
        assert_eq!(percent_of(1, 3), 33);
        assert_eq!(percent_of(2, 3), 67);
        assert_eq!(percent_of(3, 3), 100);
        assert_eq!(percent_of(1, 8), 13);
        assert_eq!(percent_of(0, 0), 100);
    }

    #[test]
    fn test_emit_sequence() {
        let (tx, mut rx) = channel();
        let tx = Some(tx);
        let mut seq = 0;
        emit(&tx, "run-1", &mut seq, 0, "Searching...");
        emit(&tx, "run-1", &mut seq, 50, "Processing WO2019028689 (1/2)");

        let first = rx.try_recv().unwrap();
        let second = rx.try_recv().unwrap();
        assert_eq!(first.seq, 1);
        assert_eq!(second.seq, 2);
        assert_eq!(second.percent, 50);
        assert_eq!(second.request_id, "run-1");
    }

    #[test]
    fn test_channel_no_receivers() {
        let (tx, rx) = channel();
        drop(rx);
        emit(&Some(tx), "test", &mut 0, 10, "test");
    }

    #[test]
    fn test_emit_none_sender() {
        let mut seq = 0;
        emit(&None, "test", &mut seq, 10, "test");
        assert_eq!(seq, 0);
    }
}
