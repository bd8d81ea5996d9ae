//! Session state machines.
//!
//! Pure state transitions, no I/O. The host crate drives these from its
//! session task and one-shot request and reads them back for status queries.
//!
//! ```text
//! continuous:  Idle ──start──▶ Starting ──subscribed──▶ Active
//!               ▲                  │                       │
//!               └──────failed──────┘◀───────stop/closed────┘
//!
//! one-shot:    Idle ──▶ Awaiting ──▶ Resolved | TimedOut | Failed ──▶ Idle
//! ```

use serde::{Deserialize, Serialize};

// =============================================================================
// Continuous session
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionState {
    /// No session
    #[default]
    Idle,
    /// Options validated, permission and subscription in progress
    Starting,
    /// Subscribed and delivering readings
    Active,
}

impl SessionState {
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Active)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::Starting => write!(f, "Starting"),
            SessionState::Active => write!(f, "Active"),
        }
    }
}

/// Tracks one continuous session.
///
/// Transitions that make no sense from the current state are ignored, so a
/// late "closed" from a session that was already stopped cannot revive it.
#[derive(Debug, Clone, Default)]
pub struct SessionTracker {
    state: SessionState,
    started_ms: Option<u64>,
    readings: u64,
    faults: u64,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Milliseconds spent active, if active.
    pub fn active_for_ms(&self, now_ms: u64) -> Option<u64> {
        match (self.state, self.started_ms) {
            (SessionState::Active, Some(start)) => Some(now_ms.saturating_sub(start)),
            _ => None,
        }
    }

    pub fn readings(&self) -> u64 {
        self.readings
    }

    pub fn faults(&self) -> u64 {
        self.faults
    }

    pub fn start(&mut self) {
        if self.state == SessionState::Idle {
            self.state = SessionState::Starting;
            self.readings = 0;
            self.faults = 0;
        }
    }

    pub fn activated(&mut self, now_ms: u64) {
        if self.state == SessionState::Starting {
            self.state = SessionState::Active;
            self.started_ms = Some(now_ms);
        }
    }

    pub fn reading_delivered(&mut self) {
        if self.state == SessionState::Active {
            self.readings += 1;
        }
    }

    /// Faults do not end the session; the consumer decides.
    pub fn fault_reported(&mut self) {
        if self.state == SessionState::Active {
            self.faults += 1;
        }
    }

    /// Stop, start failure, or the native stream closing.
    pub fn stopped(&mut self) {
        self.state = SessionState::Idle;
        self.started_ms = None;
    }
}

// =============================================================================
// One-shot request
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OneShotState {
    #[default]
    Idle,
    Awaiting,
    Resolved,
    TimedOut,
    Failed,
}

impl OneShotState {
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            OneShotState::Resolved | OneShotState::TimedOut | OneShotState::Failed
        )
    }
}

impl std::fmt::Display for OneShotState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OneShotState::Idle => write!(f, "Idle"),
            OneShotState::Awaiting => write!(f, "Awaiting"),
            OneShotState::Resolved => write!(f, "Resolved"),
            OneShotState::TimedOut => write!(f, "Timed out"),
            OneShotState::Failed => write!(f, "Failed"),
        }
    }
}

/// Tracks one one-shot request. The first outcome wins.
#[derive(Debug, Clone, Default)]
pub struct OneShotTracker {
    state: OneShotState,
}

impl OneShotTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> OneShotState {
        self.state
    }

    pub fn awaiting(&mut self) {
        if self.state == OneShotState::Idle {
            self.state = OneShotState::Awaiting;
        }
    }

    pub fn resolved(&mut self) {
        self.finish(OneShotState::Resolved);
    }

    pub fn timed_out(&mut self) {
        self.finish(OneShotState::TimedOut);
    }

    pub fn failed(&mut self) {
        self.finish(OneShotState::Failed);
    }

    /// Return to idle once resources are released. Returns the outcome.
    pub fn released(&mut self) -> OneShotState {
        let outcome = self.state;
        self.state = OneShotState::Idle;
        outcome
    }

    fn finish(&mut self, outcome: OneShotState) {
        if self.state == OneShotState::Awaiting {
            self.state = outcome;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_lifecycle() {
        let mut session = SessionTracker::new();
        assert_eq!(session.state(), SessionState::Idle);

        session.start();
        assert_eq!(session.state(), SessionState::Starting);
        assert_eq!(session.active_for_ms(100), None);

        session.activated(100);
        assert!(session.state().is_active());
        assert_eq!(session.active_for_ms(350), Some(250));

        session.reading_delivered();
        session.fault_reported();
        assert!(session.state().is_active());
        assert_eq!(session.readings(), 1);
        assert_eq!(session.faults(), 1);

        session.stopped();
        assert_eq!(session.state(), SessionState::Idle);

        // Stopping twice is harmless
        session.stopped();
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_activation_requires_start() {
        let mut session = SessionTracker::new();
        session.activated(0);
        assert_eq!(session.state(), SessionState::Idle);
        session.reading_delivered();
        assert_eq!(session.readings(), 0);
    }

    #[test]
    fn test_failed_start_returns_to_idle() {
        let mut session = SessionTracker::new();
        session.start();
        session.stopped();
        assert_eq!(session.state(), SessionState::Idle);
        session.start();
        assert_eq!(session.state(), SessionState::Starting);
    }

    #[test]
    fn test_one_shot_first_outcome_wins() {
        let mut shot = OneShotTracker::new();
        shot.awaiting();
        assert_eq!(shot.state(), OneShotState::Awaiting);

        shot.resolved();
        shot.timed_out();
        assert_eq!(shot.state(), OneShotState::Resolved);
        assert!(shot.state().is_finished());

        assert_eq!(shot.released(), OneShotState::Resolved);
        assert_eq!(shot.state(), OneShotState::Idle);
    }

    #[test]
    fn test_one_shot_timeout() {
        let mut shot = OneShotTracker::new();
        shot.awaiting();
        shot.timed_out();
        shot.resolved();
        assert_eq!(shot.released(), OneShotState::TimedOut);
    }

    #[test]
    fn test_one_shot_outcome_needs_request() {
        let mut shot = OneShotTracker::new();
        shot.resolved();
        assert_eq!(shot.state(), OneShotState::Idle);
    }
}
