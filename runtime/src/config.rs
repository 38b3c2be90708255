//! Harvest configuration: endpoints, timeouts and browser settings.
//!
//! The defaults are the fixed reference constants. Overrides exist for tests
//! and a couple of CLI flags; there is no configuration file.

use crate::model::DocumentIdentifier;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const SEARCH_URL: &str = "https://patentscope.wipo.int/search/en/result.jsf";
pub const DETAIL_URL: &str = "https://patentscope.wipo.int/search/en/detail.jsf";

/// Text whose appearance proves the bibliographic block has rendered.
pub const READINESS_MARKER: &str = "Publication Number";

pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                              AppleWebKit/537.36 (KHTML, like Gecko) \
                              Chrome/131.0.0.0 Safari/537.36";

/// Environment variable that points at a Chromium binary.
pub const CHROMIUM_PATH_ENV: &str = "PATENTSCOPE_CHROMIUM_PATH";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestConfig {
    pub search_url: String,
    pub detail_url: String,
    /// Whole search request, including the body read.
    pub search_timeout_ms: u64,
    /// Until the initial document has been parsed.
    pub navigation_timeout_ms: u64,
    /// Best-effort quiet-network window; overrunning it is not fatal.
    pub settle_timeout_ms: u64,
    /// Until the readiness marker is visible.
    pub content_gate_timeout_ms: u64,
    /// Hard ceiling for one acquire-then-extract unit.
    pub unit_ceiling_ms: u64,
    /// Delay between consecutive identifiers.
    pub pacing_ms: u64,
    pub readiness_marker: String,
    pub user_agent: String,
    pub window_size: (u32, u32),
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            search_url: SEARCH_URL.to_string(),
            detail_url: DETAIL_URL.to_string(),
            search_timeout_ms: 30_000,
            navigation_timeout_ms: 30_000,
            settle_timeout_ms: 5_000,
            content_gate_timeout_ms: 10_000,
            unit_ceiling_ms: 60_000,
            pacing_ms: 1_000,
            readiness_marker: READINESS_MARKER.to_string(),
            user_agent: USER_AGENT.to_string(),
            window_size: (1920, 1080),
        }
    }
}

impl HarvestConfig {
    pub fn search_timeout(&self) -> Duration {
        Duration::from_millis(self.search_timeout_ms)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn settle_timeout(&self) -> Duration {
        Duration::from_millis(self.settle_timeout_ms)
    }

    pub fn content_gate_timeout(&self) -> Duration {
        Duration::from_millis(self.content_gate_timeout_ms)
    }

    pub fn unit_ceiling(&self) -> Duration {
        Duration::from_millis(self.unit_ceiling_ms)
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    /// Detail page URL for one identifier.
    pub fn detail_url_for(&self, id: &DocumentIdentifier) -> String {
        match url::Url::parse_with_params(&self.detail_url, [("docId", id.as_str())]) {
            Ok(u) => u.to_string(),
            Err(_) => format!("{}?docId={}", self.detail_url, id),
        }
    }
}

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. explicit override
    if let Ok(p) = std::env::var(CHROMIUM_PATH_ENV) {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.patentscope/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".patentscope/chromium/chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".patentscope/chromium/chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".patentscope/chromium/chrome"),
            ]
        } else {
            vec![
                home.join(".patentscope/chromium/chrome-linux64/chrome"),
                home.join(".patentscope/chromium/chrome"),
            ]
        };
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    // 3. PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    if cfg!(target_os = "macos") {
        let common = PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_constants() {
        let c = HarvestConfig::default();
        assert_eq!(c.navigation_timeout(), Duration::from_secs(30));
        assert_eq!(c.settle_timeout(), Duration::from_secs(5));
        assert_eq!(c.content_gate_timeout(), Duration::from_secs(10));
        assert_eq!(c.unit_ceiling(), Duration::from_secs(60));
        assert_eq!(c.pacing(), Duration::from_secs(1));
        assert_eq!(c.readiness_marker, "Publication Number");
    }

    #[test]
    fn test_detail_url_for() {
        let c = HarvestConfig::default();
        let id = DocumentIdentifier::parse("WO2019028689").unwrap();
        assert_eq!(
            c.detail_url_for(&id),
            "https://patentscope.wipo.int/search/en/detail.jsf?docId=WO2019028689"
        );
    }
}
