//! Consumer-facing composition: trust-guide gating, loader lifecycle, and
//! the external-tab fallback, behind one configuration.
//!
//! The surrounding page renders whatever `HostView` says and forwards user
//! actions and frame load/error events back in; there is no other surface.

use fg_core::EmbedResult;
use fg_frame::FrameElement;
use fg_frame::FrameEvent;
use fg_frame::ProxyRules;
use fg_frame::RetrySettings;
use fg_frame::SecureFrameLoader;
use fg_guide::GuideStep;
use fg_guide::TrustGuideFlow;
use fg_sandbox::FrameSandbox;
use fg_storage::KeyValueStore;

/// Configuration for one hosted embed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedHostConfig {
    pub source_url: String,
    pub title: String,
    pub height: String,
    pub sandbox: FrameSandbox,
    pub proxy: ProxyRules,
    pub retry: RetrySettings,
    /// Whether the certificate-trust wizard must run before first mount.
    pub guide_required: bool,
    /// When true, an explicit "open" affirmation mounts the frame; when
    /// false it mounts as soon as the guide allows it.
    pub mount_on_affirm: bool,
}

impl EmbedHostConfig {
    pub fn new(source_url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            title: title.into(),
            height: "600px".to_owned(),
            sandbox: FrameSandbox::default(),
            proxy: ProxyRules::pass_through(),
            retry: RetrySettings::default(),
            guide_required: false,
            mount_on_affirm: true,
        }
    }

    pub fn validate(&self) -> EmbedResult<()> {
        if self.source_url.trim().is_empty() {
            return Err(fg_core::EmbedError::new(
                "host.source_missing",
                "embed host requires a source URL",
            ));
        }

        self.sandbox.validate()
    }
}

/// External-tab escape hatch. Opened without handing the target a reference
/// back to the opener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackLink {
    pub href: String,
    pub target: &'static str,
    pub rel: &'static str,
}

impl FallbackLink {
    fn for_source(source: &str) -> Self {
        Self {
            href: source.to_owned(),
            target: "_blank",
            rel: "noopener noreferrer",
        }
    }
}

/// What the surrounding page should render right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostView {
    /// Trust wizard at the given step.
    Guide { step: GuideStep },
    /// Single "open the embed" confirmation, no wizard.
    Affirmation,
    /// Mounted frame; the fallback link shows once revealed.
    Frame {
        loading: bool,
        fallback: Option<FallbackLink>,
    },
    /// Automatic attempts exhausted: manual retry plus the fallback link.
    Terminal { fallback: FallbackLink },
}

/// One reliably-hosted embed: guide + loader + escape hatch.
#[derive(Debug)]
pub struct EmbedHost<S: KeyValueStore> {
    config: EmbedHostConfig,
    store: S,
    guide: TrustGuideFlow,
    loader: Option<SecureFrameLoader>,
    fallback_revealed: bool,
}

impl<S: KeyValueStore> EmbedHost<S> {
    pub fn new(config: EmbedHostConfig, store: S, now_ms: u64) -> EmbedResult<Self> {
        config.validate()?;

        let mut guide = TrustGuideFlow::load(&store, config.guide_required)?;
        if !guide.is_completed() {
            guide.enter();
        }

        let mut host = Self {
            config,
            store,
            guide,
            loader: None,
            fallback_revealed: false,
        };

        if host.guide.is_completed() && !host.config.mount_on_affirm {
            host.mount_loader(now_ms)?;
        }

        Ok(host)
    }

    pub fn config(&self) -> &EmbedHostConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn view(&self) -> HostView {
        if let Some(loader) = &self.loader {
            let state = loader.state();
            if state.attempts_exhausted() {
                return HostView::Terminal {
                    fallback: self.fallback_link(),
                };
            }

            // A pending retry still counts as loading; no error surfaces
            // until the attempt budget is spent.
            return HostView::Frame {
                loading: state.is_loading || loader.has_pending_timer(),
                fallback: self.fallback_revealed.then(|| self.fallback_link()),
            };
        }

        if !self.guide.is_completed() {
            return HostView::Guide {
                step: self.guide.step(),
            };
        }

        HostView::Affirmation
    }

    pub fn guide_next(&mut self) {
        self.guide.next();
    }

    pub fn guide_previous(&mut self) {
        self.guide.previous();
    }

    /// Finishes the wizard from any step, persists completion, and mounts
    /// the frame right away; the completion click is the user's go-ahead.
    pub fn complete_guide(&mut self, now_ms: u64) -> EmbedResult<()> {
        self.guide.complete_and_proceed(&mut self.store)?;
        if self.loader.is_none() {
            self.mount_loader(now_ms)?;
        }

        Ok(())
    }

    /// The "open embed" affirmation shown when no wizard is involved.
    pub fn affirm_open(&mut self, now_ms: u64) -> EmbedResult<()> {
        if self.guide.is_completed() && self.loader.is_none() {
            self.mount_loader(now_ms)?;
        }

        Ok(())
    }

    /// Drives pending loader timers; call from the page's update loop.
    pub fn poll(&mut self, now_ms: u64) -> EmbedResult<Option<FrameEvent>> {
        match self.loader.as_mut() {
            Some(loader) => loader.poll(now_ms),
            None => Ok(None),
        }
    }

    pub fn notify_loaded(&mut self) -> Option<FrameEvent> {
        self.loader.as_mut()?.notify_loaded()
    }

    /// Frame error event. Also reveals the fallback link so the user has a
    /// way out while automatic retries run.
    pub fn notify_error(&mut self, now_ms: u64) -> Option<FrameEvent> {
        let event = self.loader.as_mut()?.notify_error(now_ms)?;
        self.fallback_revealed = true;
        Some(event)
    }

    pub fn manual_retry(&mut self, now_ms: u64) -> EmbedResult<Option<FrameEvent>> {
        match self.loader.as_mut() {
            Some(loader) => loader.manual_retry(now_ms),
            None => Ok(None),
        }
    }

    /// "Problems viewing?" control: shows the external-tab link without
    /// waiting for a failure.
    pub fn reveal_fallback(&mut self) {
        self.fallback_revealed = true;
    }

    /// Explicit user reset: clears persisted completion, drops the mounted
    /// frame, and reopens the wizard at step 1.
    pub fn reset_guide(&mut self) -> EmbedResult<()> {
        self.guide.reset(&mut self.store)?;
        if let Some(loader) = self.loader.as_mut() {
            loader.detach();
        }
        self.loader = None;
        self.fallback_revealed = false;

        Ok(())
    }

    pub fn frame_state(&self) -> Option<&fg_frame::FrameState> {
        self.loader.as_ref().map(SecureFrameLoader::state)
    }

    fn fallback_link(&self) -> FallbackLink {
        // Always the nominal source, never the proxied one: the new tab
        // negotiates trust with the real origin directly.
        FallbackLink::for_source(&self.config.source_url)
    }

    fn mount_loader(&mut self, now_ms: u64) -> EmbedResult<()> {
        let element = FrameElement::new(
            self.config.title.clone(),
            self.config.height.clone(),
            self.config.sandbox.clone(),
        )?;
        self.loader = Some(SecureFrameLoader::mount(
            &self.config.source_url,
            element,
            self.config.proxy.clone(),
            self.config.retry,
            now_ms,
        )?);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::EmbedHost;
    use super::EmbedHostConfig;
    use super::HostView;
    use fg_frame::FrameEvent;
    use fg_frame::ProxyRules;
    use fg_guide::GuideStep;
    use fg_storage::MemoryStore;

    fn reservation_config() -> EmbedHostConfig {
        let mut config = EmbedHostConfig::new(
            "https://10.101.5.111:4433",
            "Sistema de Reserva de Turnos",
        );
        config.proxy = ProxyRules::portal_defaults();
        config
    }

    fn host(config: EmbedHostConfig, store: MemoryStore, now_ms: u64) -> EmbedHost<MemoryStore> {
        match EmbedHost::new(config, store, now_ms) {
            Ok(host) => host,
            Err(error) => panic!("{error}"),
        }
    }

    fn drive_to_terminal(host: &mut EmbedHost<MemoryStore>, start_ms: u64) {
        let mut now = start_ms;
        let _ = host.poll(now);
        for _ in 0..2 {
            host.notify_error(now);
            now += 1_500;
            let _ = host.poll(now);
        }
        host.notify_error(now);
    }

    #[test]
    fn required_guide_gates_the_mount() {
        let mut config = reservation_config();
        config.guide_required = true;

        let mut host = host(config, MemoryStore::new(), 0);
        assert_eq!(
            host.view(),
            HostView::Guide {
                step: GuideStep::Step1
            }
        );

        host.guide_next();
        assert_eq!(
            host.view(),
            HostView::Guide {
                step: GuideStep::Step2
            }
        );

        assert!(host.complete_guide(0).is_ok());
        assert_eq!(
            host.view(),
            HostView::Frame {
                loading: true,
                fallback: None,
            }
        );
    }

    #[test]
    fn completed_guide_is_skipped_on_later_mounts() {
        let mut config = reservation_config();
        config.guide_required = true;
        config.mount_on_affirm = false;

        let mut first = host(config.clone(), MemoryStore::new(), 0);
        assert!(first.complete_guide(0).is_ok());

        // Same store, fresh mount: wizard not shown, frame mounts directly.
        let second = host(config, first.store().clone(), 0);
        assert!(matches!(second.view(), HostView::Frame { .. }));
    }

    #[test]
    fn guide_not_required_goes_straight_to_affirmation() {
        let mut host = host(reservation_config(), MemoryStore::new(), 0);
        assert_eq!(host.view(), HostView::Affirmation);

        assert!(host.affirm_open(0).is_ok());
        let event = host.poll(0);
        assert_eq!(
            event,
            Ok(Some(FrameEvent::SourceAssigned {
                src: "/reservation-proxy".to_owned(),
            }))
        );

        assert!(host.notify_loaded().is_some());
        assert_eq!(
            host.view(),
            HostView::Frame {
                loading: false,
                fallback: None,
            }
        );
    }

    #[test]
    fn exhausted_retries_render_terminal_panel_with_fallback() {
        let mut config = reservation_config();
        config.mount_on_affirm = false;

        let mut host = host(config, MemoryStore::new(), 0);
        drive_to_terminal(&mut host, 0);

        match host.view() {
            HostView::Terminal { fallback } => {
                assert_eq!(fallback.href, "https://10.101.5.111:4433");
                assert_eq!(fallback.target, "_blank");
                assert_eq!(fallback.rel, "noopener noreferrer");
            }
            other => panic!("expected terminal view, got {other:?}"),
        }
    }

    #[test]
    fn manual_retry_leaves_terminal_state() {
        let mut config = reservation_config();
        config.mount_on_affirm = false;

        let mut host = host(config, MemoryStore::new(), 0);
        drive_to_terminal(&mut host, 0);

        assert!(host.manual_retry(10_000).is_ok());
        assert!(matches!(
            host.view(),
            HostView::Frame { loading: true, .. }
        ));
        assert!(host.frame_state().is_some_and(|state| state.attempt_count == 0));
    }

    #[test]
    fn retry_wait_window_still_shows_loading() {
        let mut config = reservation_config();
        config.mount_on_affirm = false;

        let mut host = host(config, MemoryStore::new(), 0);
        let _ = host.poll(0);

        // Retry scheduled 1500ms out; the whole wait renders as loading,
        // not as a settled error.
        host.notify_error(0);
        assert!(matches!(
            host.view(),
            HostView::Frame { loading: true, .. }
        ));

        // Still loading once the retry fires and the frame reloads.
        let _ = host.poll(1_500);
        assert!(matches!(
            host.view(),
            HostView::Frame { loading: true, .. }
        ));
    }

    #[test]
    fn error_without_mounted_frame_does_not_reveal_fallback() {
        let mut host = host(reservation_config(), MemoryStore::new(), 0);
        assert_eq!(host.view(), HostView::Affirmation);

        // Stray error event before any frame exists is a no-op.
        assert_eq!(host.notify_error(0), None);

        assert!(host.affirm_open(0).is_ok());
        let _ = host.poll(0);
        assert!(matches!(
            host.view(),
            HostView::Frame { fallback: None, .. }
        ));
    }

    #[test]
    fn error_reveals_fallback_during_automatic_retries() {
        let mut config = reservation_config();
        config.mount_on_affirm = false;

        let mut host = host(config, MemoryStore::new(), 0);
        let _ = host.poll(0);
        host.notify_error(0);

        match host.view() {
            HostView::Frame { fallback, .. } => {
                assert!(fallback.is_some());
            }
            other => panic!("expected frame view, got {other:?}"),
        }
    }

    #[test]
    fn fallback_can_be_revealed_manually_before_any_failure() {
        let mut config = reservation_config();
        config.mount_on_affirm = false;

        let mut host = host(config, MemoryStore::new(), 0);
        host.reveal_fallback();

        assert!(matches!(
            host.view(),
            HostView::Frame {
                fallback: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn reset_guide_reopens_the_wizard_and_drops_the_frame() {
        let mut config = reservation_config();
        config.guide_required = true;

        let mut host = host(config, MemoryStore::new(), 0);
        assert!(host.complete_guide(0).is_ok());
        assert!(matches!(host.view(), HostView::Frame { .. }));

        assert!(host.reset_guide().is_ok());
        assert_eq!(
            host.view(),
            HostView::Guide {
                step: GuideStep::Step1
            }
        );
        assert!(host.frame_state().is_none());
    }

    #[test]
    fn empty_source_is_rejected_at_construction() {
        let config = EmbedHostConfig::new("   ", "Reservas");
        let built = EmbedHost::new(config, MemoryStore::new(), 0);
        assert!(built.is_err());
        if let Err(error) = built {
            assert_eq!(error.code, "host.source_missing");
        }
    }
}
