//! Needle interpolation for display.
//!
//! The displayed angle is unbounded: turning from 350° to 10° moves the
//! needle to 370°, not back through 180°. Progress is computed from elapsed
//! wall-clock milliseconds so the needle moves at the same speed whatever the
//! frame rate.

use crate::angle;

/// Length of one needle animation in milliseconds
pub const ANIMATION_DURATION_MS: u64 = 200;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Animation {
    start_ms: u64,
    from: f64,
    to: f64,
}

#[derive(Debug, Clone)]
pub struct NeedleInterpolator {
    displayed: f64,
    duration_ms: u64,
    animation: Option<Animation>,
}

impl Default for NeedleInterpolator {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl NeedleInterpolator {
    /// Start at rest at `angle`.
    pub fn new(angle: f64) -> Self {
        Self::with_duration(angle, ANIMATION_DURATION_MS)
    }

    pub fn with_duration(angle: f64, duration_ms: u64) -> Self {
        NeedleInterpolator {
            displayed: angle,
            duration_ms,
            animation: None,
        }
    }

    /// Angle currently shown (unbounded).
    pub fn displayed(&self) -> f64 {
        self.displayed
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    /// Final angle of the running animation, or the displayed angle at rest.
    pub fn target(&self) -> f64 {
        self.animation.map_or(self.displayed, |a| a.to)
    }

    /// Point the needle at `heading` (degrees, any range) starting at `now_ms`.
    ///
    /// Returns the signed delta that will be travelled. An animation still in
    /// flight is first completed instantly, so its rotation is never lost.
    pub fn set_target(&mut self, heading: f64, now_ms: u64) -> f64 {
        if let Some(running) = self.animation.take() {
            self.displayed = running.to;
        }

        let delta = angle::shortest_delta(self.displayed, heading);
        self.animation = Some(Animation {
            start_ms: now_ms,
            from: self.displayed,
            to: self.displayed + delta,
        });
        delta
    }

    /// Advance to `now_ms` and return the angle to show.
    pub fn sample(&mut self, now_ms: u64) -> f64 {
        let Some(animation) = self.animation else {
            return self.displayed;
        };

        let elapsed = now_ms.saturating_sub(animation.start_ms);
        if elapsed >= self.duration_ms {
            self.displayed = animation.to;
            self.animation = None;
        } else {
            let progress = elapsed as f64 / self.duration_ms as f64;
            self.displayed = animation.from + (animation.to - animation.from) * progress;
        }
        self.displayed
    }

    /// Jump to `angle` and stop any animation.
    pub fn reset(&mut self, angle: f64) {
        self.displayed = angle;
        self.animation = None;
    }
}
