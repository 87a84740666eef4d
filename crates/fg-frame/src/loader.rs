//! Lifecycle owner for one embedded-content region.

use crate::element::FrameElement;
use crate::resolve::ProxyRules;
use crate::resolve::resolve_source;
use crate::resolve::with_cache_buster;
use fg_core::EmbedError;
use fg_core::EmbedResult;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1500;

/// Automatic-recovery bounds for one loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
        }
    }
}

/// Load/error/attempt snapshot for one embedded resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameState {
    pub requested_source: String,
    pub resolved_source: Option<String>,
    pub is_loading: bool,
    pub has_error: bool,
    pub attempt_count: u32,
    pub max_attempts: u32,
}

impl FrameState {
    fn fresh(requested_source: String, max_attempts: u32) -> Self {
        Self {
            requested_source,
            resolved_source: None,
            is_loading: true,
            has_error: false,
            attempt_count: 0,
            max_attempts,
        }
    }

    /// Terminal failure: every automatic attempt consumed and still failing.
    pub fn attempts_exhausted(&self) -> bool {
        self.has_error && self.attempt_count >= self.max_attempts
    }
}

/// Notification surfaced to the host when loader state changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameEvent {
    /// The frame element received a (new) `src` value.
    SourceAssigned { src: String },
    Loaded,
    RetryScheduled { attempt: u32, due_at_ms: u64 },
    AttemptsExhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerTask {
    Resolve,
    Retry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingTimer {
    due_at_ms: u64,
    generation: u64,
    task: TimerTask,
}

/// Owns one embed's lifecycle: deferred source resolution, load/error
/// handling, and timed automatic retry capped at `max_attempts`.
///
/// At most one timer is pending per loader. Changing the source or
/// detaching cancels it; a timer that outlives its generation is a no-op.
/// Time is supplied by the caller as unix milliseconds and timers fire
/// from `poll`, which the host drives from its update loop.
#[derive(Debug)]
pub struct SecureFrameLoader {
    state: FrameState,
    rules: ProxyRules,
    retry: RetrySettings,
    element: Option<FrameElement>,
    pending: Option<PendingTimer>,
    generation: u64,
    bust_sequence: u64,
}

impl SecureFrameLoader {
    /// Mounts the loader and schedules resolution for the next poll tick,
    /// so the element can never observe a premature `src`.
    pub fn mount(
        requested_source: &str,
        element: FrameElement,
        rules: ProxyRules,
        retry: RetrySettings,
        now_ms: u64,
    ) -> EmbedResult<Self> {
        let trimmed = requested_source.trim();
        if trimmed.is_empty() {
            return Err(EmbedError::new(
                "frame.source_missing",
                "cannot mount a loader without a source",
            ));
        }

        let mut loader = Self {
            state: FrameState::fresh(trimmed.to_owned(), retry.max_attempts),
            rules,
            retry,
            element: Some(element),
            pending: None,
            generation: 0,
            bust_sequence: 0,
        };
        loader.schedule(TimerTask::Resolve, now_ms);

        Ok(loader)
    }

    pub fn state(&self) -> &FrameState {
        &self.state
    }

    pub fn element(&self) -> Option<&FrameElement> {
        self.element.as_ref()
    }

    pub fn has_pending_timer(&self) -> bool {
        self.pending.is_some()
    }

    /// Replaces the requested source: resets attempt state, cancels any
    /// pending timer, and schedules a fresh resolution.
    pub fn set_source(&mut self, requested_source: &str, now_ms: u64) -> EmbedResult<()> {
        let trimmed = requested_source.trim();
        if trimmed.is_empty() {
            return Err(EmbedError::new(
                "frame.source_missing",
                "cannot switch to an empty source",
            ));
        }

        // Detached loaders have nothing to resolve into.
        if self.element.is_none() {
            return Ok(());
        }

        self.generation += 1;
        self.pending = None;
        self.state = FrameState::fresh(trimmed.to_owned(), self.retry.max_attempts);
        self.schedule(TimerTask::Resolve, now_ms);

        Ok(())
    }

    /// Fires the pending timer if it is due. Stale generations and timers
    /// belonging to a detached element are discarded without effect.
    pub fn poll(&mut self, now_ms: u64) -> EmbedResult<Option<FrameEvent>> {
        let Some(timer) = self.pending else {
            return Ok(None);
        };
        if timer.due_at_ms > now_ms {
            return Ok(None);
        }

        self.pending = None;
        if timer.generation != self.generation || self.element.is_none() {
            return Ok(None);
        }

        match timer.task {
            TimerTask::Resolve => {
                let resolved = resolve_source(&self.state.requested_source, &self.rules)?;
                self.state.resolved_source = Some(resolved.clone());
                self.state.is_loading = true;
                self.assign(&resolved)?;
                Ok(Some(FrameEvent::SourceAssigned { src: resolved }))
            }
            TimerTask::Retry => self.reassign_busted(now_ms).map(Some),
        }
    }

    /// Load event for the current attempt. The attempt count survives a
    /// successful load; prior failures stay observable.
    pub fn notify_loaded(&mut self) -> Option<FrameEvent> {
        self.element.as_ref()?;

        self.state.is_loading = false;
        self.state.has_error = false;
        Some(FrameEvent::Loaded)
    }

    /// Error event for the current attempt: consumes one attempt and either
    /// schedules a delayed retry or goes terminal.
    pub fn notify_error(&mut self, now_ms: u64) -> Option<FrameEvent> {
        self.element.as_ref()?;

        self.state.is_loading = false;
        self.state.has_error = true;

        if self.state.attempt_count >= self.state.max_attempts {
            return Some(FrameEvent::AttemptsExhausted);
        }

        self.state.attempt_count += 1;
        if self.state.attempt_count < self.state.max_attempts {
            let due_at_ms = now_ms + self.retry.retry_delay_ms;
            self.schedule(TimerTask::Retry, due_at_ms);
            return Some(FrameEvent::RetryScheduled {
                attempt: self.state.attempt_count,
                due_at_ms,
            });
        }

        self.pending = None;
        Some(FrameEvent::AttemptsExhausted)
    }

    /// User-driven retry, available even after automatic attempts ran out.
    /// Resets the attempt count and reloads immediately.
    pub fn manual_retry(&mut self, now_ms: u64) -> EmbedResult<Option<FrameEvent>> {
        if self.element.is_none() {
            return Ok(None);
        }

        self.pending = None;
        self.state.attempt_count = 0;
        self.state.has_error = false;
        self.state.is_loading = true;

        if self.state.resolved_source.is_some() {
            return self.reassign_busted(now_ms).map(Some);
        }

        // Resolution never completed; run it again instead of reassigning.
        self.schedule(TimerTask::Resolve, now_ms);
        Ok(None)
    }

    /// Tears the loader away from its element; pending timers are dropped
    /// and later events become no-ops.
    pub fn detach(&mut self) {
        self.pending = None;
        self.element = None;
    }

    fn schedule(&mut self, task: TimerTask, due_at_ms: u64) {
        self.pending = Some(PendingTimer {
            due_at_ms,
            generation: self.generation,
            task,
        });
    }

    fn reassign_busted(&mut self, now_ms: u64) -> EmbedResult<FrameEvent> {
        let resolved = self.state.resolved_source.clone().ok_or_else(|| {
            EmbedError::new(
                "frame.not_resolved",
                "cannot reload before resolution completed",
            )
        })?;

        self.bust_sequence += 1;
        let stamp = format!("{now_ms}-{}", self.bust_sequence);
        let busted = with_cache_buster(&resolved, &stamp)?;

        self.state.resolved_source = Some(busted.clone());
        self.state.is_loading = true;
        self.state.has_error = false;
        self.assign(&busted)?;

        Ok(FrameEvent::SourceAssigned { src: busted })
    }

    fn assign(&mut self, src: &str) -> EmbedResult<()> {
        match self.element.as_mut() {
            Some(element) => element.assign_source(src),
            None => Ok(()),
        }
    }
}
