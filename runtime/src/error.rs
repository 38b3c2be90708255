//! Typed failure taxonomy.
//!
//! Every identifier-scoped failure is a value, never a panic: the batch
//! coordinator turns each one into "no record for this identifier" and
//! carries on.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A string that does not have the shape of a document identifier.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid document identifier: {0:?}")]
pub struct InvalidIdentifier(pub String);

/// The search request failed. Never fatal: callers treat it as an empty
/// identifier list.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryFailure {
    #[error("search request failed: {0}")]
    Transport(String),

    #[error("search returned HTTP {0}")]
    Status(u16),
}

/// Why a detail page could not be acquired.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionFailure {
    #[error("browser session could not be created: {0}")]
    SessionInitFailed(String),

    #[error("navigation did not complete: {0}")]
    NavigationTimeout(String),

    #[error("readiness marker never appeared: {0}")]
    ContentNeverAppeared(String),

    #[error("rendered document could not be captured: {0}")]
    CaptureFailed(String),
}

/// Why a unit (acquire then extract, for one identifier) produced no record.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum UnitFailure {
    #[error(transparent)]
    Acquisition(#[from] AcquisitionFailure),

    #[error("required fields missing (publication number present: {has_publication_number}, title present: {has_title})")]
    ExtractionIncomplete {
        has_publication_number: bool,
        has_title: bool,
    },

    #[error("unit exceeded its {ceiling_ms}ms wall-clock ceiling")]
    UnitTimeout { ceiling_ms: u64 },
}

/// Flat reason code used in events and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    DiscoveryFailed,
    SessionInitFailed,
    NavigationTimeout,
    ContentNeverAppeared,
    CaptureFailed,
    ExtractionIncomplete,
    UnitTimeout,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::DiscoveryFailed => "discovery_failed",
            Self::SessionInitFailed => "session_init_failed",
            Self::NavigationTimeout => "navigation_timeout",
            Self::ContentNeverAppeared => "content_never_appeared",
            Self::CaptureFailed => "capture_failed",
            Self::ExtractionIncomplete => "extraction_incomplete",
            Self::UnitTimeout => "unit_timeout",
        };
        f.write_str(s)
    }
}

impl DiscoveryFailure {
    pub fn reason(&self) -> FailureReason {
        FailureReason::DiscoveryFailed
    }
}

impl AcquisitionFailure {
    pub fn reason(&self) -> FailureReason {
        match self {
            Self::SessionInitFailed(_) => FailureReason::SessionInitFailed,
            Self::NavigationTimeout(_) => FailureReason::NavigationTimeout,
            Self::ContentNeverAppeared(_) => FailureReason::ContentNeverAppeared,
            Self::CaptureFailed(_) => FailureReason::CaptureFailed,
        }
    }
}

impl UnitFailure {
    pub fn reason(&self) -> FailureReason {
        match self {
            Self::Acquisition(a) => a.reason(),
            Self::ExtractionIncomplete { .. } => FailureReason::ExtractionIncomplete,
            Self::UnitTimeout { .. } => FailureReason::UnitTimeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_failure_reason_flattens_acquisition() {
        let failure: UnitFailure =
            AcquisitionFailure::ContentNeverAppeared("10000ms".into()).into();
        assert_eq!(failure.reason(), FailureReason::ContentNeverAppeared);
        assert_eq!(
            UnitFailure::UnitTimeout { ceiling_ms: 60_000 }.reason(),
            FailureReason::UnitTimeout
        );
    }

    #[test]
    fn test_failure_reason_serializes_snake_case() {
        let json = serde_json::to_string(&FailureReason::NavigationTimeout).unwrap();
        assert_eq!(json, "\"navigation_timeout\"");
        assert_eq!(FailureReason::NavigationTimeout.to_string(), "navigation_timeout");
    }

    #[test]
    fn test_failure_messages() {
        let f = UnitFailure::ExtractionIncomplete {
            has_publication_number: true,
            has_title: false,
        };
        assert!(f.to_string().contains("title present: false"));
        assert_eq!(
            DiscoveryFailure::Status(503).to_string(),
            "search returned HTTP 503"
        );
    }
}
