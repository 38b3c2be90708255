//! Scripted renderer for exercising the pipeline without a browser.
//!
//! Each page script decides, stage by stage, whether the session succeeds,
//! fails, or never answers. Scripts are matched by a substring of the URL
//! (typically the `docId`), so one renderer can serve a whole batch.

use super::{NavigationResult, RenderContext, Renderer};
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Outcome of one scripted stage.
#[derive(Debug, Clone)]
pub enum Step {
    /// Succeed after the given delay.
    Ready(Duration),
    /// Fail immediately with this message.
    Fail(String),
    /// Never complete.
    Hang,
}

impl Step {
    pub fn now() -> Self {
        Self::Ready(Duration::ZERO)
    }

    pub fn after(delay: Duration) -> Self {
        Self::Ready(delay)
    }

    async fn play(&self) -> Result<()> {
        match self {
            Step::Ready(delay) => {
                if !delay.is_zero() {
                    tokio::time::sleep(*delay).await;
                }
                Ok(())
            }
            Step::Fail(message) => bail!("{message}"),
            Step::Hang => std::future::pending().await,
        }
    }
}

/// How a page behaves from session open to capture.
#[derive(Debug, Clone)]
pub struct PageScript {
    pub navigate: Step,
    pub settle: Step,
    pub content: Step,
    pub capture: Step,
    pub html: String,
}

impl PageScript {
    /// A page that renders promptly and serves `html`.
    pub fn ready(html: impl Into<String>) -> Self {
        Self {
            navigate: Step::now(),
            settle: Step::now(),
            content: Step::now(),
            capture: Step::now(),
            html: html.into(),
        }
    }

    pub fn with_navigate(mut self, step: Step) -> Self {
        self.navigate = step;
        self
    }

    pub fn with_settle(mut self, step: Step) -> Self {
        self.settle = step;
        self
    }

    pub fn with_content(mut self, step: Step) -> Self {
        self.content = step;
        self
    }

    pub fn with_capture(mut self, step: Step) -> Self {
        self.capture = step;
        self
    }
}

#[derive(Default, Clone)]
struct Scripts {
    pages: Vec<(String, PageScript)>,
    fallback: Option<PageScript>,
}

impl Scripts {
    fn lookup(&self, url: &str) -> Option<PageScript> {
        self.pages
            .iter()
            .find(|(fragment, _)| url.contains(fragment.as_str()))
            .map(|(_, s)| s.clone())
            .or_else(|| self.fallback.clone())
    }
}

#[derive(Default)]
struct Counters {
    opened: AtomicUsize,
    closed: AtomicUsize,
}

/// A renderer whose pages follow [`PageScript`]s.
///
/// The script is picked when the session navigates, since the URL is only
/// known then. Open and close counts are tracked so callers can check that
/// no session outlives its unit.
pub struct ScriptedRenderer {
    scripts: Arc<Scripts>,
    fail_sessions: bool,
    counters: Arc<Counters>,
    visited: Arc<Mutex<Vec<String>>>,
}

impl Default for ScriptedRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedRenderer {
    pub fn new() -> Self {
        Self {
            scripts: Arc::new(Scripts::default()),
            fail_sessions: false,
            counters: Arc::new(Counters::default()),
            visited: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A renderer whose `new_context` always fails.
    pub fn failing_sessions() -> Self {
        Self {
            fail_sessions: true,
            ..Self::new()
        }
    }

    /// Serve `script` for every URL containing `url_fragment`.
    pub fn with_page(mut self, url_fragment: impl Into<String>, script: PageScript) -> Self {
        Arc::make_mut(&mut self.scripts)
            .pages
            .push((url_fragment.into(), script));
        self
    }

    /// Serve `script` for URLs no other script matches.
    pub fn with_fallback(mut self, script: PageScript) -> Self {
        Arc::make_mut(&mut self.scripts).fallback = Some(script);
        self
    }

    /// Sessions ever opened.
    pub fn opened(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }

    /// Sessions closed.
    pub fn closed(&self) -> usize {
        self.counters.closed.load(Ordering::SeqCst)
    }

    /// URLs navigated to, in order.
    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Renderer for ScriptedRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        if self.fail_sessions {
            bail!("scripted session failure");
        }
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedContext {
            scripts: Arc::clone(&self.scripts),
            current: None,
            counters: Arc::clone(&self.counters),
            visited: Arc::clone(&self.visited),
        }))
    }

    fn active_contexts(&self) -> usize {
        self.opened().saturating_sub(self.closed())
    }
}

struct ScriptedContext {
    scripts: Arc<Scripts>,
    current: Option<PageScript>,
    counters: Arc<Counters>,
    visited: Arc<Mutex<Vec<String>>>,
}

impl ScriptedContext {
    fn current(&self) -> Result<&PageScript> {
        match &self.current {
            Some(s) => Ok(s),
            None => bail!("no page loaded"),
        }
    }
}

#[async_trait]
impl RenderContext for ScriptedContext {
    async fn navigate(&mut self, url: &str) -> Result<NavigationResult> {
        if let Ok(mut visited) = self.visited.lock() {
            visited.push(url.to_string());
        }
        let Some(script) = self.scripts.lookup(url) else {
            bail!("net::ERR_NAME_NOT_RESOLVED");
        };
        script.navigate.play().await?;
        self.current = Some(script);
        Ok(NavigationResult {
            final_url: url.to_string(),
            load_time_ms: 0,
        })
    }

    async fn wait_for_network_idle(&mut self) -> Result<()> {
        let step = self.current()?.settle.clone();
        step.play().await
    }

    async fn wait_for_text(&mut self, _text: &str) -> Result<()> {
        let step = self.current()?.content.clone();
        step.play().await
    }

    async fn get_html(&self) -> Result<String> {
        let script = self.current()?;
        script.capture.play().await?;
        Ok(script.html.clone())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_page_serves_html() {
        let renderer = ScriptedRenderer::new().with_page("WO1", PageScript::ready("<p>one</p>"));
        let mut ctx = renderer.new_context().await.unwrap();
        let nav = ctx.navigate("https://x/detail.jsf?docId=WO1").await.unwrap();
        assert_eq!(nav.final_url, "https://x/detail.jsf?docId=WO1");
        ctx.wait_for_network_idle().await.unwrap();
        ctx.wait_for_text("Publication Number").await.unwrap();
        assert_eq!(ctx.get_html().await.unwrap(), "<p>one</p>");
        assert_eq!(renderer.active_contexts(), 1);
        ctx.close().await.unwrap();
        assert_eq!(renderer.active_contexts(), 0);
        assert_eq!(renderer.visited(), vec!["https://x/detail.jsf?docId=WO1"]);
    }

    #[tokio::test]
    async fn test_unknown_url_fails_navigation() {
        let renderer = ScriptedRenderer::new();
        let mut ctx = renderer.new_context().await.unwrap();
        assert!(ctx.navigate("https://x/?docId=WO9").await.is_err());
    }

    #[tokio::test]
    async fn test_capture_step_fails_get_html() {
        let renderer = ScriptedRenderer::new().with_page(
            "WO1",
            PageScript::ready("<p>one</p>").with_capture(Step::Fail("target closed".into())),
        );
        let mut ctx = renderer.new_context().await.unwrap();
        ctx.navigate("https://x/?docId=WO1").await.unwrap();
        let err = ctx.get_html().await.unwrap_err();
        assert!(err.to_string().contains("target closed"));
    }

    #[tokio::test]
    async fn test_failing_sessions() {
        let renderer = ScriptedRenderer::failing_sessions();
        assert!(renderer.new_context().await.is_err());
        assert_eq!(renderer.opened(), 0);
    }
}
