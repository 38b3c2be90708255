//! Page acquisition: drive one isolated browser session from open to
//! captured DOM through a bounded sequence of readiness checks.
//!
//! Stages, strictly in order and never retried within a call:
//!
//! 1. session init: fresh isolated context
//! 2. navigate: until DOMContentLoaded, bounded by the navigation deadline
//! 3. settle: quiet network, best effort; overrunning is only logged
//! 4. readiness gate: the marker text must appear
//! 5. capture: serialize the DOM, close the session
//!
//! The session is released on every exit path. Explicit closes cover the
//! normal paths; [`SessionGuard`]'s `Drop` covers cancellation by an outer
//! timeout.

use crate::config::HarvestConfig;
use crate::error::AcquisitionFailure;
use crate::events::{EventBus, HarvestEventKind};
use crate::model::{DocumentIdentifier, RenderedDocument};
use crate::renderer::{RenderContext, Renderer};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, warn};

/// Owns a browser session and guarantees it is closed.
///
/// Prefer [`SessionGuard::close`]. If the guard is dropped while still
/// holding the session (for instance because the enclosing future was
/// cancelled), the close is spawned onto the runtime captured at
/// construction.
pub struct SessionGuard {
    context: Option<Box<dyn RenderContext>>,
    label: String,
    runtime_handle: tokio::runtime::Handle,
}

impl SessionGuard {
    /// Must be called from within a tokio runtime.
    pub fn new(context: Box<dyn RenderContext>, label: impl Into<String>) -> Self {
        Self {
            context: Some(context),
            label: label.into(),
            runtime_handle: tokio::runtime::Handle::current(),
        }
    }

    pub fn context_mut(&mut self) -> Option<&mut (dyn RenderContext + 'static)> {
        self.context.as_deref_mut()
    }

    /// Close the session, logging (not returning) close errors.
    pub async fn close(mut self) {
        if let Some(ctx) = self.context.take() {
            if let Err(e) = ctx.close().await {
                warn!("failed to close browser session for {}: {e:#}", self.label);
            } else {
                debug!("browser session closed for {}", self.label);
            }
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Some(ctx) = self.context.take() {
            let label = std::mem::take(&mut self.label);
            self.runtime_handle.spawn(async move {
                if let Err(e) = ctx.close().await {
                    warn!("deferred session close failed for {label}: {e:#}");
                } else {
                    debug!("deferred session close for {label}");
                }
            });
        }
    }
}

/// Acquires rendered detail pages, one isolated session per call.
#[derive(Clone)]
pub struct PageAcquirer {
    renderer: Arc<dyn Renderer>,
    config: Arc<HarvestConfig>,
    events: EventBus,
}

impl PageAcquirer {
    pub fn new(renderer: Arc<dyn Renderer>, config: Arc<HarvestConfig>, events: EventBus) -> Self {
        Self {
            renderer,
            config,
            events,
        }
    }

    /// Acquire the fully rendered detail page for `id`.
    pub async fn acquire(
        &self,
        id: &DocumentIdentifier,
    ) -> Result<RenderedDocument, AcquisitionFailure> {
        let start = Instant::now();

        // 1. Session init
        let context = self
            .renderer
            .new_context()
            .await
            .map_err(|e| AcquisitionFailure::SessionInitFailed(format!("{e:#}")))?;
        let mut session = SessionGuard::new(context, id.as_str());
        self.events.debug(Some(id), HarvestEventKind::SessionOpened);

        let result = self.drive(&mut session, id).await;
        session.close().await;

        let html = result?;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        self.events.info(
            Some(id),
            HarvestEventKind::DocumentCaptured {
                bytes: html.len(),
                elapsed_ms,
            },
        );
        Ok(RenderedDocument::new(id.clone(), html))
    }

    /// Stages 2 to 5 against an open session.
    async fn drive(
        &self,
        session: &mut SessionGuard,
        id: &DocumentIdentifier,
    ) -> Result<String, AcquisitionFailure> {
        let Some(ctx) = session.context_mut() else {
            return Err(AcquisitionFailure::SessionInitFailed(
                "session already closed".to_string(),
            ));
        };
        let url = self.config.detail_url_for(id);

        // 2. Navigate
        let nav_deadline = self.config.navigation_timeout();
        match timeout(nav_deadline, ctx.navigate(&url)).await {
            Ok(Ok(nav)) => debug!(
                identifier = %id,
                final_url = %nav.final_url,
                "DOMContentLoaded after {}ms",
                nav.load_time_ms
            ),
            Ok(Err(e)) => {
                return Err(AcquisitionFailure::NavigationTimeout(format!(
                    "{url}: {e:#}"
                )))
            }
            Err(_) => {
                return Err(AcquisitionFailure::NavigationTimeout(format!(
                    "{url}: no DOMContentLoaded after {}ms",
                    millis(nav_deadline)
                )))
            }
        }

        // 3. Settle (best effort)
        let settle_deadline = self.config.settle_timeout();
        match timeout(settle_deadline, ctx.wait_for_network_idle()).await {
            Ok(Ok(())) => debug!(identifier = %id, "network idle"),
            Ok(Err(e)) => debug!(identifier = %id, "network idle wait unavailable: {e:#}"),
            Err(_) => self.events.warn(
                Some(id),
                HarvestEventKind::SettleTimedOut {
                    waited_ms: millis(settle_deadline),
                },
            ),
        }

        // 4. Readiness gate
        let gate_deadline = self.config.content_gate_timeout();
        let marker = self.config.readiness_marker.as_str();
        match timeout(gate_deadline, ctx.wait_for_text(marker)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(AcquisitionFailure::ContentNeverAppeared(format!(
                    "{marker:?}: {e:#}"
                )))
            }
            Err(_) => {
                return Err(AcquisitionFailure::ContentNeverAppeared(format!(
                    "{marker:?} not rendered after {}ms",
                    millis(gate_deadline)
                )))
            }
        }

        // 5. Capture
        ctx.get_html()
            .await
            .map_err(|e| AcquisitionFailure::CaptureFailed(format!("{e:#}")))
    }
}

fn millis(d: Duration) -> u64 {
    d.as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::drain;
    use crate::renderer::scripted::{PageScript, ScriptedRenderer, Step};

    const ID: &str = "WO2019028689";

    fn acquirer(renderer: Arc<ScriptedRenderer>) -> (PageAcquirer, EventBus) {
        let events = EventBus::new(64);
        let acq = PageAcquirer::new(renderer, Arc::new(HarvestConfig::default()), events.clone());
        (acq, events)
    }

    fn id() -> DocumentIdentifier {
        DocumentIdentifier::parse(ID).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_returns_rendered_document() {
        let renderer = Arc::new(
            ScriptedRenderer::new().with_page(ID, PageScript::ready("<html>ok</html>")),
        );
        let (acq, _) = acquirer(Arc::clone(&renderer));

        let doc = acq.acquire(&id()).await.unwrap();
        assert_eq!(doc.html(), "<html>ok</html>");
        assert_eq!(doc.identifier(), &id());
        assert_eq!(renderer.opened(), 1);
        assert_eq!(renderer.active_contexts(), 0);
        assert_eq!(
            renderer.visited(),
            vec!["https://patentscope.wipo.int/search/en/detail.jsf?docId=WO2019028689"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_init_failure() {
        let renderer = Arc::new(ScriptedRenderer::failing_sessions());
        let (acq, _) = acquirer(Arc::clone(&renderer));

        let err = acq.acquire(&id()).await.unwrap_err();
        assert!(matches!(err, AcquisitionFailure::SessionInitFailed(_)));
        assert_eq!(renderer.active_contexts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_timeout_closes_session() {
        let renderer = Arc::new(
            ScriptedRenderer::new().with_page(ID, PageScript::ready("").with_navigate(Step::Hang)),
        );
        let (acq, _) = acquirer(Arc::clone(&renderer));

        let err = acq.acquire(&id()).await.unwrap_err();
        assert!(matches!(err, AcquisitionFailure::NavigationTimeout(_)));
        assert_eq!(renderer.opened(), 1);
        assert_eq!(renderer.closed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_network_error_is_navigation_failure() {
        let renderer = Arc::new(ScriptedRenderer::new().with_page(
            ID,
            PageScript::ready("").with_navigate(Step::Fail("net::ERR_CONNECTION_RESET".into())),
        ));
        let (acq, _) = acquirer(Arc::clone(&renderer));

        let err = acq.acquire(&id()).await.unwrap_err();
        match err {
            AcquisitionFailure::NavigationTimeout(detail) => {
                assert!(detail.contains("ERR_CONNECTION_RESET"))
            }
            other => panic!("unexpected failure: {other:?}"),
        }
        assert_eq!(renderer.active_contexts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_timeout_is_not_fatal() {
        let renderer = Arc::new(ScriptedRenderer::new().with_page(
            ID,
            PageScript::ready("<html>late idle</html>").with_settle(Step::Hang),
        ));
        let (acq, events) = acquirer(Arc::clone(&renderer));
        let mut rx = events.subscribe();

        let doc = acq.acquire(&id()).await.unwrap();
        assert_eq!(doc.html(), "<html>late idle</html>");

        let seen = drain(&mut rx);
        assert!(seen
            .iter()
            .any(|e| e.kind == HarvestEventKind::SettleTimedOut { waited_ms: 5000 }));
        assert_eq!(renderer.active_contexts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_content_never_appeared() {
        let renderer = Arc::new(
            ScriptedRenderer::new().with_page(ID, PageScript::ready("").with_content(Step::Hang)),
        );
        let (acq, _) = acquirer(Arc::clone(&renderer));

        let started = tokio::time::Instant::now();
        let err = acq.acquire(&id()).await.unwrap_err();
        assert!(matches!(err, AcquisitionFailure::ContentNeverAppeared(_)));
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(10) && waited < Duration::from_secs(11));
        assert_eq!(renderer.closed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_marker_wait_error_is_content_never_appeared() {
        let renderer = Arc::new(ScriptedRenderer::new().with_page(
            ID,
            PageScript::ready("<html/>")
                .with_content(Step::Fail("execution context destroyed".into())),
        ));
        let (acq, _) = acquirer(Arc::clone(&renderer));

        let started = tokio::time::Instant::now();
        let err = acq.acquire(&id()).await.unwrap_err();
        match err {
            AcquisitionFailure::ContentNeverAppeared(detail) => {
                assert!(detail.contains("execution context destroyed"))
            }
            other => panic!("unexpected failure: {other:?}"),
        }
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(renderer.opened(), 1);
        assert_eq!(renderer.closed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_error_is_capture_failed() {
        let renderer = Arc::new(ScriptedRenderer::new().with_page(
            ID,
            PageScript::ready("<html/>").with_capture(Step::Fail("target closed".into())),
        ));
        let (acq, _) = acquirer(Arc::clone(&renderer));

        let err = acq.acquire(&id()).await.unwrap_err();
        match err {
            AcquisitionFailure::CaptureFailed(detail) => assert!(detail.contains("target closed")),
            other => panic!("unexpected failure: {other:?}"),
        }
        assert_eq!(renderer.opened(), 1);
        assert_eq!(renderer.closed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadlines_are_independent() {
        // 20s navigate + 4s settle + 9s gate: each within its own bound.
        let renderer = Arc::new(ScriptedRenderer::new().with_page(
            ID,
            PageScript::ready("<html/>")
                .with_navigate(Step::after(Duration::from_secs(20)))
                .with_settle(Step::after(Duration::from_secs(4)))
                .with_content(Step::after(Duration::from_secs(9))),
        ));
        let (acq, _) = acquirer(Arc::clone(&renderer));
        assert!(acq.acquire(&id()).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_acquire_releases_session() {
        let renderer = Arc::new(
            ScriptedRenderer::new().with_page(ID, PageScript::ready("").with_content(Step::Hang)),
        );
        let (acq, _) = acquirer(Arc::clone(&renderer));

        let outcome = timeout(Duration::from_secs(2), acq.acquire(&id())).await;
        assert!(outcome.is_err());
        // Let the deferred close run.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(renderer.opened(), 1);
        assert_eq!(renderer.active_contexts(), 0);
    }
}
