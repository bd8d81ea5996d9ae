//! Compass adapter contract and the engine shared by both platform variants.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │ LocationCompass / FusionCompass (type aliases)       │
//! │  - one PlatformProfile per platform                  │
//! └──────────────────────────────────────────────────────┘
//!                    │
//!                    ▼
//! ┌──────────────────────────────────────────────────────┐
//! │ CompassCore<P: PlatformProfile, S: HeadingSource>    │
//! │  - validation, availability, permission              │
//! │  - owns the single continuous session                │
//! │  - one-shot requests                                 │
//! └──────────────────────────────────────────────────────┘
//!                    │
//!                    ▼
//! ┌──────────────────────────────────────────────────────┐
//! │ HeadingSource (native binding or SimulatedSensor)    │
//! └──────────────────────────────────────────────────────┘
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use compass_core::{
    CompassError, CompassOptions, CompassReading, GovernorConfig, HeadingSource, Permission,
    ReadingNormalizer, SensorCapabilities, SensorEvent, SessionState, SessionTracker,
    UpdateGovernor,
};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::clock::SessionClock;
use crate::one_shot::{self, ONE_SHOT_TIMEOUT};
use crate::platform::{Platform, PlatformProfile};
use crate::session::{ActiveSession, ErrorCallback, ReadingCallback, SessionHandle, SessionTask};

// =============================================================================
// CompassAdapter Trait
// =============================================================================

/// Application-facing compass.
///
/// All operations report failure through [`CompassError`] or a `bool`; none
/// of them panic.
#[async_trait]
pub trait CompassAdapter: Send + Sync {
    fn platform(&self) -> Platform;

    /// True when the device can serve headings. False on any internal error.
    fn is_available(&self) -> bool;

    /// Start continuous updates, replacing any running session.
    ///
    /// Options are validated before any native resource is touched.
    /// `on_error` receives faults raised after a successful start.
    async fn start_updating(
        &self,
        options: CompassOptions,
        on_reading: ReadingCallback,
        on_error: Option<ErrorCallback>,
    ) -> Result<SessionHandle, CompassError>;

    /// Stop continuous updates. Returns true when nothing was running or the
    /// native subscription was released cleanly.
    fn stop_updating(&self) -> bool;

    fn session_state(&self) -> SessionState;

    /// One reading from a temporary high-sensitivity subscription.
    ///
    /// Does not disturb a running session. Fails with
    /// [`CompassError::Timeout`] after three seconds without a sample.
    async fn get_current_reading(
        &self,
        options: CompassOptions,
    ) -> Result<CompassReading, CompassError>;
}

// =============================================================================
// CompassCore
// =============================================================================

/// Adapter engine parameterized by platform variant and native source.
///
/// [`crate::LocationCompass`] and [`crate::FusionCompass`] are this type with
/// their profile filled in.
pub struct CompassCore<P: PlatformProfile, S: HeadingSource> {
    profile: P,
    source: Arc<S>,
    clock: SessionClock,
    active: Mutex<Option<ActiveSession>>,
    next_id: AtomicU64,
}

impl<P: PlatformProfile, S: HeadingSource> CompassCore<P, S> {
    pub fn with_profile(profile: P, source: Arc<S>, clock: SessionClock) -> Self {
        CompassCore {
            profile,
            source,
            clock,
            active: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    pub fn clock(&self) -> SessionClock {
        self.clock
    }

    fn lock_active(&self) -> MutexGuard<'_, Option<ActiveSession>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn capabilities(&self) -> Result<SensorCapabilities, CompassError> {
        let capabilities = self.source.capabilities().map_err(|e| {
            log::debug!("{}: capability query failed: {}", self.platform(), e);
            CompassError::Unavailable
        })?;
        if self.profile.supports(&capabilities) {
            Ok(capabilities)
        } else {
            Err(CompassError::Unavailable)
        }
    }

    fn ensure_permission(&self) -> Result<(), CompassError> {
        match self.source.permission() {
            Permission::Granted => Ok(()),
            Permission::Denied => Err(CompassError::PermissionDenied),
            Permission::Undetermined => {
                let answer = self.source.request_permission();
                log::info!(
                    "{}: permission requested (currently {}), retry once answered",
                    self.platform(),
                    answer
                );
                Err(CompassError::PermissionPending)
            }
        }
    }

    fn shutdown(&self, session: ActiveSession) -> bool {
        session.token.cancel();
        session.state.send_replace(SessionState::Idle);
        match self.source.unsubscribe(session.subscription) {
            Ok(()) => {
                log::info!("{} session {}: stopped", self.platform(), session.id);
                true
            }
            Err(e) => {
                log::warn!(
                    "{} session {}: failed to release subscription: {}",
                    self.platform(),
                    session.id,
                    e
                );
                false
            }
        }
    }
}

impl<P: PlatformProfile + Default, S: HeadingSource> CompassCore<P, S> {
    /// Adapter on `source`, timestamps anchored at the current time.
    pub fn new(source: Arc<S>) -> Self {
        Self::with_clock(source, SessionClock::start())
    }

    /// Adapter sharing `clock` with its native source.
    pub fn with_clock(source: Arc<S>, clock: SessionClock) -> Self {
        Self::with_profile(P::default(), source, clock)
    }
}

#[async_trait]
impl<P: PlatformProfile, S: HeadingSource> CompassAdapter for CompassCore<P, S> {
    fn platform(&self) -> Platform {
        self.profile.platform()
    }

    fn is_available(&self) -> bool {
        self.capabilities().is_ok()
    }

    async fn start_updating(
        &self,
        options: CompassOptions,
        on_reading: ReadingCallback,
        on_error: Option<ErrorCallback>,
    ) -> Result<SessionHandle, CompassError> {
        let resolved = options.resolve()?;
        let capabilities = self.capabilities()?;
        self.stop_updating();
        self.ensure_permission()?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut tracker = SessionTracker::new();
        tracker.start();
        let (state_tx, state_rx) = watch::channel(tracker.state());
        let state = Arc::new(state_tx);

        let (tx, rx) = mpsc::unbounded_channel();
        let request = self.profile.request(&resolved, &capabilities, false);
        let subscription = match self
            .source
            .subscribe(request, Box::new(move |event: SensorEvent| tx.send(event).is_ok()))
        {
            Ok(subscription) => subscription,
            Err(e) => {
                tracker.stopped();
                state.send_replace(tracker.state());
                log::warn!("{} session {}: subscribe failed: {}", self.platform(), id, e);
                return Err(e);
            }
        };

        tracker.activated(self.clock.now_ms());
        state.send_replace(tracker.state());
        log::info!(
            "{} session {}: started ({:?})",
            self.platform(),
            id,
            request
        );

        let token = CancellationToken::new();
        let task = SessionTask {
            id,
            platform: self.platform(),
            decoder: self.profile.decoder(&resolved, &capabilities),
            governor: UpdateGovernor::new(GovernorConfig::from(&resolved)),
            normalizer: ReadingNormalizer::new(resolved.uses_true_heading),
            tracker,
            clock: self.clock,
            on_reading,
            on_error,
            state: state.clone(),
        };
        tokio::spawn(task.run(rx, token.clone()));

        let replaced = self.lock_active().replace(ActiveSession {
            id,
            subscription,
            token,
            state,
        });
        if let Some(previous) = replaced {
            // Lost a race with a concurrent start
            self.shutdown(previous);
        }

        Ok(SessionHandle::new(id, state_rx))
    }

    fn stop_updating(&self) -> bool {
        let Some(session) = self.lock_active().take() else {
            return true;
        };
        self.shutdown(session)
    }

    fn session_state(&self) -> SessionState {
        self.lock_active()
            .as_ref()
            .map_or(SessionState::Idle, |session| *session.state.borrow())
    }

    async fn get_current_reading(
        &self,
        options: CompassOptions,
    ) -> Result<CompassReading, CompassError> {
        let resolved = options.resolve()?;
        let capabilities = self.capabilities()?;
        self.ensure_permission()?;

        let request = self.profile.request(&resolved, &capabilities, true);
        let decoder = self.profile.decoder(&resolved, &capabilities);
        log::debug!("{}: one-shot ({:?})", self.platform(), request);

        let raw = one_shot::read_once(self.source.as_ref(), request, decoder, ONE_SHOT_TIMEOUT).await?;
        Ok(ReadingNormalizer::new(resolved.uses_true_heading).normalize(&raw))
    }
}

impl<P: PlatformProfile, S: HeadingSource> Drop for CompassCore<P, S> {
    fn drop(&mut self) {
        self.stop_updating();
    }
}
