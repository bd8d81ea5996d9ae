//! Update governor: decides whether a heading sample reaches the application.
//!
//! The governor is a pure state machine driven by two inputs:
//!
//! - [`UpdateGovernor::on_sample`] for every raw sample from the platform. It
//!   updates the smoothed heading and retains the sample, overwriting the
//!   previous one. Nothing is emitted here.
//! - [`UpdateGovernor::evaluate`] on every throttle tick. It applies the
//!   freshness, throttle and threshold gates to the retained sample and
//!   returns the heading to emit, if any.
//!
//! Time is passed in as milliseconds since the Unix epoch so the same code
//! runs under a real clock or a paused test clock.

use crate::angle;
use crate::options::ResolvedOptions;
use crate::reading::RawHeading;

/// Samples older than this at evaluation time are discarded
pub const MAX_SAMPLE_AGE_MS: u64 = 500;

/// Gate settings for one session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GovernorConfig {
    /// Degrees the smoothed heading must move before another emission
    pub min_change_threshold: f64,
    /// Minimum milliseconds between emissions
    pub update_throttle_ms: u64,
    /// Smoothing coefficient in `[0, 1]`
    pub filter: f64,
    /// Freshness bound for the retained sample
    pub max_sample_age_ms: u64,
}

impl From<&ResolvedOptions> for GovernorConfig {
    fn from(options: &ResolvedOptions) -> Self {
        GovernorConfig {
            min_change_threshold: options.min_change_threshold,
            update_throttle_ms: options.update_throttle_ms,
            filter: options.filter,
            max_sample_age_ms: MAX_SAMPLE_AGE_MS,
        }
    }
}

impl Default for GovernorConfig {
    fn default() -> Self {
        GovernorConfig::from(&ResolvedOptions::default())
    }
}

/// Why the last evaluation did not emit. Useful for trace logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suppressed {
    /// No sample received yet
    NoSample,
    /// Retained sample is older than the freshness bound
    Stale,
    /// Less than one throttle interval since the last emission
    Throttled,
    /// Change since the last emission is below the threshold
    BelowThreshold,
}

#[derive(Debug, Clone)]
pub struct UpdateGovernor {
    config: GovernorConfig,
    smoothed: Option<f64>,
    latest: Option<RawHeading>,
    last_emitted: Option<f64>,
    last_emit_ms: Option<u64>,
    emitted: u64,
}

impl UpdateGovernor {
    pub fn new(config: GovernorConfig) -> Self {
        UpdateGovernor {
            config,
            smoothed: None,
            latest: None,
            last_emitted: None,
            last_emit_ms: None,
            emitted: 0,
        }
    }

    pub fn config(&self) -> &GovernorConfig {
        &self.config
    }

    /// Current smoothed heading, if any sample has arrived.
    pub fn smoothed(&self) -> Option<f64> {
        self.smoothed
    }

    /// Last heading handed to the application.
    pub fn last_emitted(&self) -> Option<f64> {
        self.last_emitted
    }

    /// Number of readings emitted so far.
    pub fn emitted_count(&self) -> u64 {
        self.emitted
    }

    /// Apply one smoothing step from `current` towards `sample`.
    ///
    /// `filter == 0` returns `sample` unchanged and `filter == 1` returns
    /// `current` unchanged.
    pub fn smooth(current: f64, sample: f64, filter: f64) -> f64 {
        if filter <= 0.0 {
            return sample;
        }
        let step = (1.0 - filter) * angle::shortest_delta(current, sample);
        angle::normalize(current + step)
    }

    /// Record a raw sample. Returns the new smoothed heading.
    pub fn on_sample(&mut self, sample: RawHeading) -> f64 {
        let smoothed = match self.smoothed {
            None => sample.heading,
            Some(current) => Self::smooth(current, sample.heading, self.config.filter),
        };
        self.smoothed = Some(smoothed);
        self.latest = Some(sample);
        smoothed
    }

    /// Evaluate the gates at `now_ms`.
    ///
    /// On success the retained sample is returned with its heading replaced by
    /// the smoothed heading, and the emission is recorded.
    pub fn evaluate(&mut self, now_ms: u64) -> Result<RawHeading, Suppressed> {
        let (Some(sample), Some(smoothed)) = (self.latest, self.smoothed) else {
            return Err(Suppressed::NoSample);
        };

        if sample.age_ms(now_ms) > self.config.max_sample_age_ms {
            return Err(Suppressed::Stale);
        }

        if let Some(last_ms) = self.last_emit_ms {
            if now_ms.saturating_sub(last_ms) < self.config.update_throttle_ms {
                return Err(Suppressed::Throttled);
            }
        }

        // No threshold before the first emission
        if let Some(last) = self.last_emitted {
            if angle::distance(last, smoothed) < self.config.min_change_threshold {
                return Err(Suppressed::BelowThreshold);
            }
        }

        self.last_emitted = Some(smoothed);
        self.last_emit_ms = Some(now_ms);
        self.emitted += 1;
        Ok(sample.with_heading(smoothed))
    }
}
