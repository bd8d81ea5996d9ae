//! Heading samples and the canonical reading handed to applications.

use serde::{Deserialize, Serialize};

use crate::angle;

/// Accuracy reported when the platform says it does not know (degrees)
pub const UNKNOWN_ACCURACY: f64 = 15.0;

/// Sentinel used by platforms for "no true heading available"
pub const NO_TRUE_HEADING: f64 = -1.0;

// =============================================================================
// RawHeading
// =============================================================================

/// One heading sample as produced by a platform decoder.
///
/// Native conventions are kept: a negative `accuracy` means unknown and a
/// negative `true_heading` means the device has no true-north reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawHeading {
    /// Primary heading in degrees, `[0, 360)`
    pub heading: f64,
    /// Accuracy in degrees, negative when unknown
    pub accuracy: f64,
    /// Magnetic heading in degrees
    pub magnetic_heading: f64,
    /// True heading in degrees, or [`NO_TRUE_HEADING`]
    pub true_heading: f64,
    /// Capture time in milliseconds since the Unix epoch
    pub timestamp_ms: u64,
}

impl RawHeading {
    /// A sample where every heading field carries the same value.
    pub fn magnetic(heading: f64, accuracy: f64, timestamp_ms: u64) -> Self {
        RawHeading {
            heading,
            accuracy,
            magnetic_heading: heading,
            true_heading: NO_TRUE_HEADING,
            timestamp_ms,
        }
    }

    /// Same sample with a different primary heading (used after smoothing).
    pub fn with_heading(self, heading: f64) -> Self {
        RawHeading { heading, ..self }
    }

    pub fn is_valid(&self) -> bool {
        angle::is_valid_heading(self.heading)
    }

    /// Milliseconds between capture and `now_ms` (zero for future stamps).
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.timestamp_ms)
    }
}

// =============================================================================
// CompassReading
// =============================================================================

/// Canonical reading delivered to the application.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompassReading {
    /// 0-360 degrees from north
    pub heading: f64,
    /// Accuracy in degrees (lower = better)
    pub accuracy: f64,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
    /// Only present when different from `heading`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magnetic_heading: Option<f64>,
    /// Only present in true-heading mode and when different from `heading`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub true_heading: Option<f64>,
}

// =============================================================================
// ReadingNormalizer
// =============================================================================

/// Turns a [`RawHeading`] into a [`CompassReading`].
///
/// Optional fields are compared with exact float equality: a magnetic heading
/// that is bit-for-bit the primary heading is dropped, anything else is kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadingNormalizer {
    uses_true_heading: bool,
}

impl ReadingNormalizer {
    pub fn new(uses_true_heading: bool) -> Self {
        ReadingNormalizer { uses_true_heading }
    }

    pub fn normalize(&self, raw: &RawHeading) -> CompassReading {
        let accuracy = if raw.accuracy >= 0.0 {
            raw.accuracy
        } else {
            UNKNOWN_ACCURACY
        };

        let magnetic_heading = (raw.magnetic_heading != raw.heading).then_some(raw.magnetic_heading);

        let true_heading = (self.uses_true_heading
            && raw.true_heading >= 0.0
            && raw.true_heading != raw.heading)
            .then_some(raw.true_heading);

        CompassReading {
            heading: raw.heading,
            accuracy,
            timestamp: raw.timestamp_ms,
            magnetic_heading,
            true_heading,
        }
    }
}

// =============================================================================
// Sensor accuracy status
// =============================================================================

/// Coarse accuracy status reported by motion sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorAccuracy {
    High,
    Medium,
    Low,
    Unreliable,
}

impl SensorAccuracy {
    /// Accuracy assumed before the sensor reports a status
    pub const INITIAL_DEGREES: f64 = 5.0;

    pub fn degrees(&self) -> f64 {
        match self {
            SensorAccuracy::High => 1.0,
            SensorAccuracy::Medium => 3.0,
            SensorAccuracy::Low => 10.0,
            SensorAccuracy::Unreliable => UNKNOWN_ACCURACY,
        }
    }
}
