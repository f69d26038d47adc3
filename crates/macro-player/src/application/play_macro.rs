//! PlayMacroUseCase: the playback scheduler.
//!
//! # Timing model
//!
//! Each pass starts a fresh stopwatch.  For every event the scheduler
//! computes `target = timestamp / speed`; if the stopwatch is behind, it
//! sleeps for the difference and then injects.  A late injection delays the
//! events after it but never reorders or drops them.
//!
//! ```text
//! pass 1: ──e0──────e1──e2──┐
//!                           │ 50 ms gap (or interval_seconds in interval mode)
//! pass 2:                   └──e0──────e1──e2──┐ ...
//! ```
//!
//! # Cancellation
//!
//! Every sleep races a [`CancellationToken`].  The token is a child of the
//! caller's token (if any), so either [`PlaybackEngine::stop`] or the caller
//! can end playback; the outcome records which one did.  The token is also
//! checked immediately before each injection, so once cancellation is
//! signalled no further event is injected.
//!
//! # Finished notification
//!
//! A run is represented by a [`PlaybackRun`] whose `Drop` impl publishes the
//! report on the finished channel.  That makes the notification exactly-once
//! for every exit path: completion, stop, caller cancellation, failure, a
//! panicking transport, or the future being dropped mid-flight.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use macro_core::{CoordinateNormalizer, Event, EventStream};
use tokio::sync::broadcast;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::inject_input::{synthesize, InputTransport};
use super::resolve_desktop::{virtual_desktop, DesktopMetrics};

/// Pause between passes when interval mode is off.
pub const PASS_GAP: Duration = Duration::from_millis(50);

/// Lowest accepted speed multiplier.
pub const MIN_SPEED: f64 = 0.01;

const FINISHED_CHANNEL_CAPACITY: usize = 16;

/// Parameters of one `play_macro` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackOptions {
    /// Speed multiplier; `2.0` plays twice as fast.  Positive infinity
    /// replays with no delays; NaN and anything below [`MIN_SPEED`] are
    /// raised to [`MIN_SPEED`].
    pub speed: f64,
    /// Number of passes; `0` (or negative) repeats until stopped.
    pub loops: i32,
    /// When set, wait `interval_seconds` between passes instead of
    /// [`PASS_GAP`].
    pub interval_mode: bool,
    /// Negative values are treated as `0`.
    pub interval_seconds: i64,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            speed: 1.0,
            loops: 1,
            interval_mode: false,
            interval_seconds: 5,
        }
    }
}

impl PlaybackOptions {
    pub fn effective_speed(&self) -> f64 {
        if self.speed == f64::INFINITY {
            f64::INFINITY
        } else if self.speed.is_finite() {
            self.speed.max(MIN_SPEED)
        } else {
            MIN_SPEED
        }
    }

    /// `None` means unlimited.
    pub fn pass_limit(&self) -> Option<u32> {
        u32::try_from(self.loops).ok().filter(|n| *n > 0)
    }

    pub fn between_passes(&self) -> Duration {
        if self.interval_mode {
            Duration::from_secs(u64::try_from(self.interval_seconds).unwrap_or(0))
        } else {
            PASS_GAP
        }
    }
}

/// How a playback run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// Every requested pass ran to the end.
    Completed,
    /// [`PlaybackEngine::stop`] was called.
    Stopped,
    /// The caller's cancellation token fired, or the playback future was
    /// dropped.
    Cancelled,
    /// Playback could not run or was aborted by a panic.
    Failed(String),
}

/// Summary published when a run finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackReport {
    pub outcome: PlaybackOutcome,
    /// Fully completed passes.
    pub passes: u32,
    pub events_injected: u64,
}

struct ActiveRun {
    id: u64,
    token: CancellationToken,
}

#[derive(Default)]
struct EngineState {
    active: Option<ActiveRun>,
    next_id: u64,
}

/// Replays event streams through an [`InputTransport`].
pub struct PlaybackEngine {
    batched: Arc<dyn InputTransport>,
    legacy: Arc<dyn InputTransport>,
    metrics: Arc<dyn DesktopMetrics>,
    use_send_input: AtomicBool,
    state: Mutex<EngineState>,
    finished: broadcast::Sender<PlaybackReport>,
}

impl PlaybackEngine {
    /// Creates an idle engine.  `batched` is used until
    /// [`set_use_send_input(false)`](Self::set_use_send_input) selects
    /// `legacy`.
    pub fn new(
        batched: Arc<dyn InputTransport>,
        legacy: Arc<dyn InputTransport>,
        metrics: Arc<dyn DesktopMetrics>,
    ) -> Self {
        let (finished, _) = broadcast::channel(FINISHED_CHANNEL_CAPACITY);
        Self {
            batched,
            legacy,
            metrics,
            use_send_input: AtomicBool::new(true),
            state: Mutex::new(EngineState::default()),
            finished,
        }
    }

    /// Selects the batched (`true`) or legacy (`false`) transport.  Takes
    /// effect from the next injected event.
    pub fn set_use_send_input(&self, enabled: bool) {
        self.use_send_input.store(enabled, Ordering::Relaxed);
    }

    pub fn uses_send_input(&self) -> bool {
        self.use_send_input.load(Ordering::Relaxed)
    }

    pub fn is_playing(&self) -> bool {
        self.state().active.is_some()
    }

    /// Receives one [`PlaybackReport`] per finished run.
    pub fn subscribe_finished(&self) -> broadcast::Receiver<PlaybackReport> {
        self.finished.subscribe()
    }

    /// Stops the active run, if any.  Callable from any thread; idempotent.
    ///
    /// An injection already in progress completes; nothing after it is
    /// injected.
    pub fn stop(&self) {
        let run = self.state().active.take();
        if let Some(run) = run {
            run.token.cancel();
            info!("playback stop requested");
        }
    }

    /// Plays `stream` according to `options`.
    ///
    /// Returns `None` without doing anything if the stream is empty or a
    /// run is already active.  Otherwise returns the same report that is
    /// published to [`subscribe_finished`](Self::subscribe_finished).
    pub async fn play_macro(
        &self,
        stream: &EventStream,
        options: PlaybackOptions,
        cancel: Option<CancellationToken>,
    ) -> Option<PlaybackReport> {
        if stream.is_empty() {
            debug!("play_macro ignored: empty stream");
            return None;
        }

        let token = cancel
            .as_ref()
            .map_or_else(CancellationToken::new, CancellationToken::child_token);
        let id = {
            let mut state = self.state();
            if state.active.is_some() {
                debug!("play_macro ignored: already playing");
                return None;
            }
            state.next_id += 1;
            let id = state.next_id;
            state.active = Some(ActiveRun {
                id,
                token: token.clone(),
            });
            id
        };

        let mut run = PlaybackRun {
            engine: self,
            id,
            token,
            external: cancel,
            passes: 0,
            events_injected: 0,
            outcome: None,
        };
        let outcome = run.execute(stream, options).await;
        run.outcome = Some(outcome.clone());
        Some(run.report(outcome))
    }

    fn inject(&self, event: &Event, normalizer: &CoordinateNormalizer) {
        let inputs = synthesize(event, normalizer);
        let transport = if self.uses_send_input() {
            &self.batched
        } else {
            &self.legacy
        };
        if let Err(e) = transport.send(&inputs) {
            warn!(timestamp = event.timestamp, "input injection failed: {e}");
        }
    }

    fn finish(&self, id: u64, report: PlaybackReport) {
        {
            let mut state = self.state();
            if state.active.as_ref().map(|run| run.id) == Some(id) {
                state.active = None;
            }
        }
        info!(
            outcome = ?report.outcome,
            passes = report.passes,
            events = report.events_injected,
            "playback finished"
        );
        // No receivers is fine.
        let _ = self.finished.send(report);
    }

    fn state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One `play_macro` invocation.  Dropping it publishes the report.
struct PlaybackRun<'a> {
    engine: &'a PlaybackEngine,
    id: u64,
    token: CancellationToken,
    external: Option<CancellationToken>,
    passes: u32,
    events_injected: u64,
    outcome: Option<PlaybackOutcome>,
}

impl PlaybackRun<'_> {
    async fn execute(&mut self, stream: &EventStream, options: PlaybackOptions) -> PlaybackOutcome {
        let normalizer = match virtual_desktop(self.engine.metrics.as_ref()) {
            Ok(desktop) => desktop.normalizer(),
            Err(e) => {
                error!("cannot play macro: {e}");
                return PlaybackOutcome::Failed(e.to_string());
            }
        };
        let speed = options.effective_speed();
        let limit = options.pass_limit();
        let pause = options.between_passes();
        info!(
            events = stream.len(),
            speed,
            loops = ?limit,
            pause_ms = pause.as_millis() as u64,
            "playback started"
        );

        loop {
            if !self.play_once(stream, speed, &normalizer).await {
                return self.interrupted_outcome();
            }
            self.passes += 1;
            if limit.is_some_and(|n| self.passes >= n) {
                return PlaybackOutcome::Completed;
            }
            if pause.is_zero() {
                // Keep a zero-delay loop from starving other tasks.
                tokio::task::yield_now().await;
                if self.token.is_cancelled() {
                    return self.interrupted_outcome();
                }
            } else if !self.suspend(pause).await {
                return self.interrupted_outcome();
            }
        }
    }

    /// Returns `false` if the pass was cut short by cancellation.
    async fn play_once(
        &mut self,
        stream: &EventStream,
        speed: f64,
        normalizer: &CoordinateNormalizer,
    ) -> bool {
        let started = Instant::now();
        for event in stream.iter() {
            let target = scaled_offset(event, speed);
            let elapsed = started.elapsed();
            if target > elapsed && !self.suspend(target - elapsed).await {
                return false;
            }
            if self.token.is_cancelled() {
                return false;
            }
            self.engine.inject(event, normalizer);
            self.events_injected += 1;
        }
        true
    }

    /// Sleeps for `duration`; returns `false` if cancelled first.
    async fn suspend(&self, duration: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => false,
            _ = time::sleep(duration) => true,
        }
    }

    fn interrupted_outcome(&self) -> PlaybackOutcome {
        if self.external.as_ref().is_some_and(CancellationToken::is_cancelled) {
            PlaybackOutcome::Cancelled
        } else {
            PlaybackOutcome::Stopped
        }
    }

    fn report(&self, outcome: PlaybackOutcome) -> PlaybackReport {
        PlaybackReport {
            outcome,
            passes: self.passes,
            events_injected: self.events_injected,
        }
    }
}

impl Drop for PlaybackRun<'_> {
    fn drop(&mut self) {
        let outcome = self.outcome.take().unwrap_or_else(|| {
            if std::thread::panicking() {
                PlaybackOutcome::Failed("playback panicked".to_string())
            } else {
                PlaybackOutcome::Cancelled
            }
        });
        self.token.cancel();
        let report = self.report(outcome);
        self.engine.finish(self.id, report);
    }
}

fn scaled_offset(event: &Event, speed: f64) -> Duration {
    Duration::try_from_secs_f64(event.timestamp / speed).unwrap_or(Duration::MAX)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::inject_input::{InjectionError, MockInputTransport};
    use crate::infrastructure::desktop_metrics::mock::FixedDesktopMetrics;
    use macro_core::{DesktopRect, EventKind};
    use tokio::sync::broadcast::error::TryRecvError;

    fn three_keys() -> EventStream {
        let key = |t: f64, pressed: bool| {
            Event::new(
                t,
                EventKind::KeyChange { vk_code: 0x41, key: "a".to_string(), pressed },
            )
        };
        EventStream::new(vec![key(0.0, true), key(0.1, false), key(0.2, true)]).unwrap()
    }

    fn engine_with(batched: MockInputTransport, legacy: MockInputTransport) -> PlaybackEngine {
        PlaybackEngine::new(
            Arc::new(batched),
            Arc::new(legacy),
            Arc::new(FixedDesktopMetrics::single_1080p()),
        )
    }

    #[test]
    fn test_speed_is_floored() {
        let opts = |speed| PlaybackOptions { speed, ..PlaybackOptions::default() };
        assert_eq!(opts(0.0).effective_speed(), MIN_SPEED);
        assert_eq!(opts(-3.0).effective_speed(), MIN_SPEED);
        assert_eq!(opts(f64::NAN).effective_speed(), MIN_SPEED);
        assert_eq!(opts(f64::NEG_INFINITY).effective_speed(), MIN_SPEED);
        assert_eq!(opts(2.5).effective_speed(), 2.5);
    }

    #[test]
    fn test_infinite_speed_replays_without_delay() {
        // Arrange
        let opts = PlaybackOptions { speed: f64::INFINITY, ..PlaybackOptions::default() };
        let late = Event::new(12.5, EventKind::PointerMove { x: 0, y: 0 });

        // Act
        let speed = opts.effective_speed();

        // Assert
        assert_eq!(speed, f64::INFINITY);
        assert_eq!(scaled_offset(&late, speed), Duration::ZERO);
    }

    #[test]
    fn test_non_positive_loops_mean_unlimited() {
        let opts = |loops| PlaybackOptions { loops, ..PlaybackOptions::default() };
        assert_eq!(opts(0).pass_limit(), None);
        assert_eq!(opts(-4).pass_limit(), None);
        assert_eq!(opts(3).pass_limit(), Some(3));
    }

    #[test]
    fn test_pause_between_passes() {
        let gap = PlaybackOptions::default();
        assert_eq!(gap.between_passes(), PASS_GAP);

        let interval = PlaybackOptions { interval_mode: true, interval_seconds: 7, ..gap };
        assert_eq!(interval.between_passes(), Duration::from_secs(7));

        let negative = PlaybackOptions { interval_seconds: -1, ..interval };
        assert_eq!(negative.between_passes(), Duration::ZERO);
    }

    #[test]
    fn test_huge_offsets_saturate() {
        let event = Event::new(1e300, EventKind::PointerMove { x: 0, y: 0 });
        assert_eq!(scaled_offset(&event, MIN_SPEED), Duration::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_is_not_fatal() {
        // Arrange
        let mut batched = MockInputTransport::new();
        batched
            .expect_send()
            .times(3)
            .returning(|inputs| Err(InjectionError::Partial { sent: 0, expected: inputs.len() as u32 }));
        let engine = engine_with(batched, MockInputTransport::new());

        // Act
        let report = engine
            .play_macro(&three_keys(), PlaybackOptions::default(), None)
            .await
            .expect("playback should run");

        // Assert
        assert_eq!(report.outcome, PlaybackOutcome::Completed);
        assert_eq!(report.events_injected, 3);
        assert!(!engine.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_legacy_transport_is_used_when_selected() {
        let mut batched = MockInputTransport::new();
        batched.expect_send().times(0);
        let mut legacy = MockInputTransport::new();
        legacy.expect_send().times(3).returning(|_| Ok(()));
        let engine = engine_with(batched, legacy);

        engine.set_use_send_input(false);
        let report = engine
            .play_macro(&three_keys(), PlaybackOptions::default(), None)
            .await
            .unwrap();

        assert_eq!(report.outcome, PlaybackOutcome::Completed);
        assert!(!engine.uses_send_input());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_display_fails_with_single_notification() {
        let mut batched = MockInputTransport::new();
        batched.expect_send().times(0);
        let engine = PlaybackEngine::new(
            Arc::new(batched),
            Arc::new(MockInputTransport::new()),
            Arc::new(FixedDesktopMetrics::new(DesktopRect::new(0, 0, 0, 0), (0, 0))),
        );
        let mut finished = engine.subscribe_finished();

        let report = engine
            .play_macro(&three_keys(), PlaybackOptions::default(), None)
            .await
            .unwrap();

        assert!(matches!(report.outcome, PlaybackOutcome::Failed(_)));
        assert_eq!(finished.try_recv().unwrap(), report);
        assert_eq!(finished.try_recv(), Err(TryRecvError::Empty));
        assert!(!engine.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_future_still_notifies() {
        let mut batched = MockInputTransport::new();
        batched.expect_send().returning(|_| Ok(()));
        let engine = engine_with(batched, MockInputTransport::new());
        let mut finished = engine.subscribe_finished();
        let stream = three_keys();

        // The first event is injected, then the run sleeps towards t=0.1 s.
        let timed_out = time::timeout(
            Duration::from_millis(50),
            engine.play_macro(&stream, PlaybackOptions::default(), None),
        )
        .await;

        assert!(timed_out.is_err());
        let report = finished.try_recv().unwrap();
        assert_eq!(report.outcome, PlaybackOutcome::Cancelled);
        assert_eq!(report.events_injected, 1);
        assert!(!engine.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_when_idle_is_a_no_op() {
        let engine = engine_with(MockInputTransport::new(), MockInputTransport::new());
        let mut finished = engine.subscribe_finished();
        engine.stop();
        engine.stop();
        assert!(!engine.is_playing());
        assert_eq!(finished.try_recv(), Err(TryRecvError::Empty));
    }
}
