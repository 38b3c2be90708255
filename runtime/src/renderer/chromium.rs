//! Chromium-based renderer using chromiumoxide.
//!
//! Each session is its own Chromium process with a throwaway profile
//! directory, so cookies, cache and storage never carry over from one
//! document to the next.

use super::{NavigationResult, RenderContext, Renderer};
use crate::config::{find_chromium, HarvestConfig};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::{
    EventLifecycleEvent, NavigateParams, SetLifecycleEventsEnabledParams,
};
use chromiumoxide::listeners::EventStream;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tracing::debug;

/// Interval between readiness-marker checks.
const TEXT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Chrome lifecycle event names.
const DOM_CONTENT_LOADED: &str = "DOMContentLoaded";
const NETWORK_IDLE: &str = "networkIdle";

/// How each session's browser is launched.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    pub user_agent: String,
    pub window_size: (u32, u32),
}

impl LaunchOptions {
    pub fn from_config(config: &HarvestConfig, headless: bool) -> Self {
        Self {
            headless,
            user_agent: config.user_agent.clone(),
            window_size: config.window_size,
        }
    }
}

/// Chromium-based renderer.
///
/// Launching is deferred to [`Renderer::new_context`], so constructing the
/// renderer never fails; a missing browser surfaces as a per-document
/// session-init failure.
pub struct ChromiumRenderer {
    options: LaunchOptions,
    active_count: Arc<AtomicUsize>,
}

impl ChromiumRenderer {
    pub fn new(options: LaunchOptions) -> Self {
        Self {
            options,
            active_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn browser_config(&self, profile: &TempDir) -> Result<BrowserConfig> {
        let chrome_path =
            find_chromium().context("Chromium not found. Run `patentscope doctor`.")?;
        let (width, height) = self.options.window_size;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .user_data_dir(profile.path())
            .window_size(width, height)
            .arg(format!("--user-agent={}", self.options.user_agent))
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking");
        if !self.options.headless {
            builder = builder.with_head();
        }

        builder
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        let profile = tempfile::Builder::new()
            .prefix("patentscope-profile-")
            .tempdir()
            .context("failed to create browser profile directory")?;
        let config = self.browser_config(&profile)?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let opened = open_page(&browser).await;
        let (page, lifecycle) = match opened {
            Ok(p) => p,
            Err(e) => {
                shutdown_browser(&mut browser, handler_task).await;
                return Err(e);
            }
        };

        self.active_count.fetch_add(1, Ordering::Relaxed);

        Ok(Box::new(ChromiumContext {
            browser,
            page: Some(page),
            handler_task: Some(handler_task),
            lifecycle,
            main_frame: None,
            network_idle_seen: false,
            active_count: Arc::clone(&self.active_count),
            _profile: profile,
        }))
    }

    fn active_contexts(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }
}

async fn open_page(browser: &Browser) -> Result<(Page, EventStream<EventLifecycleEvent>)> {
    let page = browser
        .new_page("about:blank")
        .await
        .context("failed to create new page")?;
    if let Err(e) = page.execute(SetLifecycleEventsEnabledParams::new(true)).await {
        debug!("lifecycle events already enabled or unavailable: {e}");
    }
    let lifecycle = page
        .event_listener::<EventLifecycleEvent>()
        .await
        .context("failed to subscribe to lifecycle events")?;
    Ok((page, lifecycle))
}

async fn shutdown_browser(browser: &mut Browser, handler_task: JoinHandle<()>) {
    let _ = browser.close().await;
    let _ = browser.wait().await;
    handler_task.abort();
}

/// Identifies the main-frame document a navigation produced, so that
/// lifecycle events left over from `about:blank` are ignored.
#[derive(Debug, Clone)]
struct MainFrame {
    frame_id: String,
    loader_id: Option<String>,
}

impl MainFrame {
    fn matches(&self, event: &EventLifecycleEvent) -> bool {
        let frame_id: &str = event.frame_id.as_ref();
        let loader_id: &str = event.loader_id.as_ref();
        frame_id == self.frame_id
            && self.loader_id.as_deref().map_or(true, |l| l == loader_id)
    }
}

/// One Chromium process plus its single page.
pub struct ChromiumContext {
    browser: Browser,
    page: Option<Page>,
    handler_task: Option<JoinHandle<()>>,
    lifecycle: EventStream<EventLifecycleEvent>,
    main_frame: Option<MainFrame>,
    network_idle_seen: bool,
    active_count: Arc<AtomicUsize>,
    _profile: TempDir,
}

impl ChromiumContext {
    fn page(&self) -> Result<&Page> {
        self.page.as_ref().context("page already closed")
    }

    /// Consume lifecycle events until `name` fires for the main frame.
    async fn wait_for_lifecycle(&mut self, name: &str) -> Result<()> {
        let frame = self
            .main_frame
            .clone()
            .context("no navigation in progress")?;
        while let Some(event) = self.lifecycle.next().await {
            if !frame.matches(&event) {
                continue;
            }
            if event.name == NETWORK_IDLE {
                self.network_idle_seen = true;
            }
            if event.name == name {
                return Ok(());
            }
        }
        bail!("lifecycle event stream ended before {name}")
    }
}

#[async_trait]
impl RenderContext for ChromiumContext {
    async fn navigate(&mut self, url: &str) -> Result<NavigationResult> {
        let start = Instant::now();
        self.network_idle_seen = false;

        let response = self
            .page()?
            .execute(NavigateParams::new(url))
            .await
            .context("navigation command failed")?;
        if let Some(error_text) = response.result.error_text.as_ref() {
            bail!("navigation failed: {error_text}");
        }

        let frame_id: &str = response.result.frame_id.as_ref();
        self.main_frame = Some(MainFrame {
            frame_id: frame_id.to_string(),
            loader_id: response.result.loader_id.as_ref().map(|l| {
                let l: &str = l.as_ref();
                l.to_string()
            }),
        });

        self.wait_for_lifecycle(DOM_CONTENT_LOADED).await?;

        let final_url = self
            .page()?
            .url()
            .await
            .unwrap_or_default()
            .unwrap_or_else(|| url.to_string());

        Ok(NavigationResult {
            final_url,
            load_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn wait_for_network_idle(&mut self) -> Result<()> {
        if self.network_idle_seen {
            return Ok(());
        }
        self.wait_for_lifecycle(NETWORK_IDLE).await
    }

    async fn wait_for_text(&mut self, text: &str) -> Result<()> {
        let script = text_presence_script(text)?;
        loop {
            match self.page()?.evaluate(script.as_str()).await {
                Ok(result) => {
                    if result.into_value::<bool>().unwrap_or(false) {
                        return Ok(());
                    }
                }
                // The execution context is replaced while the page swaps
                // documents; keep polling.
                Err(e) => debug!("readiness check failed: {e}"),
            }
            tokio::time::sleep(TEXT_POLL_INTERVAL).await;
        }
    }

    async fn get_html(&self) -> Result<String> {
        let result = self
            .page()?
            .evaluate("document.documentElement.outerHTML")
            .await
            .context("failed to get HTML")?;

        let html: String = result
            .into_value()
            .map_err(|e| anyhow::anyhow!("failed to convert HTML result: {e:?}"))?;

        Ok(html)
    }

    async fn close(mut self: Box<Self>) -> Result<()> {
        self.active_count.fetch_sub(1, Ordering::Relaxed);
        if let Some(page) = self.page.take() {
            let _ = page.close().await;
        }
        if let Some(task) = self.handler_task.take() {
            shutdown_browser(&mut self.browser, task).await;
        }
        Ok(())
    }
}

/// Script answering whether `text` occurs in the body's text content.
///
/// `textContent` also covers nodes hidden by CSS and needs no layout pass.
fn text_presence_script(text: &str) -> Result<String> {
    let literal = serde_json::to_string(text)?;
    Ok(format!(
        "(() => {{ const b = document.body; return !!b && b.textContent.includes({literal}); }})()"
    ))
}
