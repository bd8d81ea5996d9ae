//! Continuous heading session.
//!
//! One tokio task per session owns the decoder and the governor. Native
//! events arrive through an unbounded channel and only overwrite the retained
//! sample; the throttle timer evaluates the gates and delivers readings.
//!
//! ```text
//!   HeadingSource ──SensorEvent──▶ mpsc ──▶ SessionTask ──CompassReading──▶ on_reading
//!                                              │    ▲
//!                                  faults ─────┘    └──── interval(updateThrottle)
//!                                     ▼
//!                                  on_error
//! ```

use std::sync::Arc;
use std::time::Duration;

use compass_core::{
    CompassError, CompassReading, Decoded, HeadingDecoder, ReadingNormalizer, SensorEvent,
    SessionState, SessionTracker, SubscriptionId, UpdateGovernor,
};
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::clock::SessionClock;
use crate::platform::Platform;

/// Callback receiving governed readings.
pub type ReadingCallback = Arc<dyn Fn(CompassReading) + Send + Sync>;

/// Callback receiving runtime faults. Faults do not stop the session.
pub type ErrorCallback = Arc<dyn Fn(CompassError) + Send + Sync>;

/// Caller's view of a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: u64,
    state: watch::Receiver<SessionState>,
}

impl SessionHandle {
    pub(crate) fn new(id: u64, state: watch::Receiver<SessionState>) -> Self {
        SessionHandle { id, state }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn is_active(&self) -> bool {
        self.state().is_active()
    }

    /// Wait until the session has ended (stopped, replaced or stream closed).
    pub async fn ended(&mut self) {
        // An error means the adapter is gone, which also ends the session
        let _ = self.state.wait_for(|state| *state == SessionState::Idle).await;
    }
}

/// Adapter-side record of the running session.
pub(crate) struct ActiveSession {
    pub id: u64,
    pub subscription: SubscriptionId,
    pub token: CancellationToken,
    pub state: Arc<watch::Sender<SessionState>>,
}

pub(crate) struct SessionTask {
    pub id: u64,
    pub platform: Platform,
    pub decoder: Box<dyn HeadingDecoder>,
    pub governor: UpdateGovernor,
    pub normalizer: ReadingNormalizer,
    pub tracker: SessionTracker,
    pub clock: SessionClock,
    pub on_reading: ReadingCallback,
    pub on_error: Option<ErrorCallback>,
    pub state: Arc<watch::Sender<SessionState>>,
}

impl SessionTask {
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<SensorEvent>, token: CancellationToken) {
        let throttle = Duration::from_millis(self.governor.config().update_throttle_ms);
        let mut ticker = interval_at(Instant::now() + throttle, throttle);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        log::debug!(
            "{} session {}: running, throttle {:?}",
            self.platform,
            self.id,
            throttle
        );

        loop {
            tokio::select! {
                biased;

                _ = token.cancelled() => {
                    log::debug!("{} session {}: cancelled", self.platform, self.id);
                    break;
                }
                event = events.recv() => match event {
                    Some(event) => self.on_event(event),
                    None => {
                        log::warn!("{} session {}: native stream closed", self.platform, self.id);
                        self.report(CompassError::NativeFault("sensor subscription closed".into()));
                        break;
                    }
                },
                instant = ticker.tick() => self.on_tick(instant),
            }
        }

        self.tracker.stopped();
        self.state.send_replace(self.tracker.state());
        log::info!(
            "{} session {}: finished, {} readings, {} faults",
            self.platform,
            self.id,
            self.governor.emitted_count(),
            self.tracker.faults()
        );
    }

    fn on_event(&mut self, event: SensorEvent) {
        match self.decoder.decode(event) {
            Decoded::Sample(raw) => {
                let smoothed = self.governor.on_sample(raw);
                log::trace!(
                    "{} session {}: sample {:.1}° smoothed {:.1}°",
                    self.platform,
                    self.id,
                    raw.heading,
                    smoothed
                );
            }
            Decoded::Fault(error) => self.report(error),
            Decoded::Nothing => {}
        }
    }

    fn on_tick(&mut self, instant: Instant) {
        let now_ms = self.clock.ms_at(instant);
        match self.governor.evaluate(now_ms) {
            Ok(raw) => {
                let reading = self.normalizer.normalize(&raw);
                self.tracker.reading_delivered();
                log::trace!(
                    "{} session {}: reading {:.1}° ±{:.0}°",
                    self.platform,
                    self.id,
                    reading.heading,
                    reading.accuracy
                );
                (self.on_reading)(reading);
            }
            Err(reason) => {
                log::trace!(
                    "{} session {}: suppressed at {} ms ({:?})",
                    self.platform,
                    self.id,
                    now_ms,
                    reason
                );
            }
        }
    }

    fn report(&mut self, error: CompassError) {
        self.tracker.fault_reported();
        log::warn!("{} session {}: {}", self.platform, self.id, error);
        if let Some(on_error) = &self.on_error {
            on_error(error);
        }
    }
}
