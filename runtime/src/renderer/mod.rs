//! Renderer abstraction for browser-based page rendering.
//!
//! Defines the `Renderer` and `RenderContext` traits that abstract over
//! the browser engine (Chromium via chromiumoxide in production, a scripted
//! double in tests). Context methods wait without their own deadline; the
//! acquisition orchestrator bounds every call.

pub mod chromium;
pub mod scripted;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time until the initial document was parsed, in milliseconds.
    pub load_time_ms: u64,
}

/// A browser engine that hands out isolated rendering sessions.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Open a fresh session with its own cookie, cache and storage space.
    async fn new_context(&self) -> Result<Box<dyn RenderContext>>;
    /// Number of sessions opened and not yet closed.
    fn active_contexts(&self) -> usize;
}

/// A single isolated browser session.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Navigate and return once the initial document has been parsed
    /// (DOMContentLoaded), not after the full load.
    async fn navigate(&mut self, url: &str) -> Result<NavigationResult>;
    /// Return once the page has had no requests in flight for a short
    /// quiet window.
    async fn wait_for_network_idle(&mut self) -> Result<()>;
    /// Return once `text` is part of the rendered page text.
    async fn wait_for_text(&mut self, text: &str) -> Result<()>;
    /// Serialize the full rendered document.
    async fn get_html(&self) -> Result<String>;
    /// Close this session and release everything it holds.
    async fn close(self: Box<Self>) -> Result<()>;
}
