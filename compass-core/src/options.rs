//! Compass options: the user-facing schema and its validated form.
//!
//! `CompassOptions` mirrors what an application passes in (every field
//! optional, camelCase JSON). `CompassOptions::resolve` applies defaults and
//! range checks and produces a `ResolvedOptions` that the rest of the
//! pipeline trusts.
//!
//! ```rust
//! use compass_core::options::CompassOptions;
//!
//! let options = CompassOptions::from_json(r#"{"minChangeThreshold": 5, "filter": 0.5}"#).unwrap();
//! let resolved = options.resolve().unwrap();
//! assert_eq!(resolved.min_change_threshold, 5.0);
//! assert_eq!(resolved.update_throttle_ms, 200);
//!
//! let bad = CompassOptions { min_change_threshold: Some(200.0), ..Default::default() };
//! assert!(bad.resolve().is_err());
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CompassError;

// =============================================================================
// Limits and defaults
// =============================================================================

pub const DEFAULT_MIN_CHANGE_THRESHOLD: f64 = 3.0;
pub const MIN_CHANGE_THRESHOLD_RANGE: (f64, f64) = (0.1, 180.0);

pub const DEFAULT_UPDATE_THROTTLE_MS: u64 = 200;
pub const UPDATE_THROTTLE_RANGE_MS: (u64, u64) = (50, 5000);

pub const DEFAULT_FILTER: f64 = 0.8;
pub const FILTER_RANGE: (f64, f64) = (0.0, 1.0);

/// Hardware heading filter used for one-shot readings
pub const ONE_SHOT_HEADING_FILTER: f64 = 1.0;

// =============================================================================
// Sensor delay
// =============================================================================

/// Motion sensor polling rate requested from the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorDelay {
    Fastest,
    Game,
    #[default]
    Ui,
    Normal,
}

impl SensorDelay {
    /// Sampling period the platform is asked for.
    pub fn sampling_period(&self) -> Duration {
        match self {
            SensorDelay::Fastest => Duration::ZERO,
            SensorDelay::Game => Duration::from_micros(20_000),
            SensorDelay::Ui => Duration::from_micros(66_667),
            SensorDelay::Normal => Duration::from_micros(200_000),
        }
    }
}

impl std::fmt::Display for SensorDelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensorDelay::Fastest => write!(f, "fastest"),
            SensorDelay::Game => write!(f, "game"),
            SensorDelay::Ui => write!(f, "ui"),
            SensorDelay::Normal => write!(f, "normal"),
        }
    }
}

impl std::str::FromStr for SensorDelay {
    type Err = CompassError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fastest" => Ok(SensorDelay::Fastest),
            "game" => Ok(SensorDelay::Game),
            "ui" => Ok(SensorDelay::Ui),
            "normal" => Ok(SensorDelay::Normal),
            other => Err(CompassError::invalid(
                "sensorDelay",
                format!("'{}' is not one of fastest, game, ui, normal", other),
            )),
        }
    }
}

// =============================================================================
// User-facing options
// =============================================================================

/// Options for the motion-sensor fusion platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FusionOptions {
    /// Fuse gyroscope with accelerometer/magnetometer (default: true)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_sensor_fusion: Option<bool>,
    /// Sensor polling rate (default: ui)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensor_delay: Option<SensorDelay>,
}

/// Options for the location-manager heading platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LocationOptions {
    /// Report true north instead of magnetic north (default: false)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uses_true_heading: Option<bool>,
    /// Minimum degrees of change for a hardware update (default: minChangeThreshold)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading_filter: Option<f64>,
}

/// Options as passed by the application. Missing fields take defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CompassOptions {
    /// Minimum change in degrees, after filtering, before a reading is emitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_change_threshold: Option<f64>,
    /// Minimum interval between emitted readings, in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_throttle: Option<u64>,
    /// Smoothing coefficient: 0.0 = none, 1.0 = maximum
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<f64>,
    #[serde(default, alias = "android", skip_serializing_if = "Option::is_none")]
    pub fusion: Option<FusionOptions>,
    #[serde(default, alias = "ios", skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationOptions>,
}

impl CompassOptions {
    /// Parse options from JSON. Unknown fields are rejected.
    pub fn from_json(json: &str) -> Result<Self, CompassError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Apply defaults and validate every range.
    ///
    /// Nothing here touches a sensor, so a failure leaves no state behind.
    pub fn resolve(&self) -> Result<ResolvedOptions, CompassError> {
        let min_change_threshold = self
            .min_change_threshold
            .unwrap_or(DEFAULT_MIN_CHANGE_THRESHOLD);
        let update_throttle_ms = self.update_throttle.unwrap_or(DEFAULT_UPDATE_THROTTLE_MS);
        let filter = self.filter.unwrap_or(DEFAULT_FILTER);

        let (lo, hi) = MIN_CHANGE_THRESHOLD_RANGE;
        if !(lo..=hi).contains(&min_change_threshold) {
            return Err(CompassError::invalid(
                "minChangeThreshold",
                format!("must be between {} and {} degrees", lo, hi),
            ));
        }
        let (lo, hi) = UPDATE_THROTTLE_RANGE_MS;
        if !(lo..=hi).contains(&update_throttle_ms) {
            return Err(CompassError::invalid(
                "updateThrottle",
                format!("must be between {} and {} ms", lo, hi),
            ));
        }
        let (lo, hi) = FILTER_RANGE;
        if !(lo..=hi).contains(&filter) {
            return Err(CompassError::invalid(
                "filter",
                "must be between 0.0 and 1.0",
            ));
        }

        let fusion = self.fusion.clone().unwrap_or_default();
        let location = self.location.clone().unwrap_or_default();

        let heading_filter = match location.heading_filter {
            Some(f) if f.is_nan() => {
                return Err(CompassError::invalid("headingFilter", "must be a number"));
            }
            Some(f) if f > 0.0 => f,
            _ => min_change_threshold,
        };

        Ok(ResolvedOptions {
            min_change_threshold,
            update_throttle_ms,
            filter,
            use_sensor_fusion: fusion.use_sensor_fusion.unwrap_or(true),
            sensor_delay: fusion.sensor_delay.unwrap_or_default(),
            uses_true_heading: location.uses_true_heading.unwrap_or(false),
            heading_filter,
        })
    }
}

// =============================================================================
// Resolved options
// =============================================================================

/// Validated options with every default applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedOptions {
    pub min_change_threshold: f64,
    pub update_throttle_ms: u64,
    pub filter: f64,
    pub use_sensor_fusion: bool,
    pub sensor_delay: SensorDelay,
    pub uses_true_heading: bool,
    pub heading_filter: f64,
}

impl ResolvedOptions {
    pub fn update_throttle(&self) -> Duration {
        Duration::from_millis(self.update_throttle_ms)
    }
}

impl Default for ResolvedOptions {
    fn default() -> Self {
        // Defaults always validate
        ResolvedOptions {
            min_change_threshold: DEFAULT_MIN_CHANGE_THRESHOLD,
            update_throttle_ms: DEFAULT_UPDATE_THROTTLE_MS,
            filter: DEFAULT_FILTER,
            use_sensor_fusion: true,
            sensor_delay: SensorDelay::Ui,
            uses_true_heading: false,
            heading_filter: DEFAULT_MIN_CHANGE_THRESHOLD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let resolved = CompassOptions::default().resolve().unwrap();
        assert_eq!(resolved, ResolvedOptions::default());
        assert_eq!(resolved.update_throttle(), Duration::from_millis(200));
    }

    #[test]
    fn test_threshold_out_of_range() {
        let options = CompassOptions {
            min_change_threshold: Some(200.0),
            ..Default::default()
        };
        let err = options.resolve().unwrap_err();
        assert_eq!(err.field(), Some("minChangeThreshold"));

        let options = CompassOptions {
            min_change_threshold: Some(0.05),
            ..Default::default()
        };
        assert!(options.resolve().is_err());

        let options = CompassOptions {
            min_change_threshold: Some(f64::NAN),
            ..Default::default()
        };
        assert!(options.resolve().is_err());
    }

    #[test]
    fn test_range_edges_accepted() {
        for (threshold, throttle, filter) in [(0.1, 50, 0.0), (180.0, 5000, 1.0)] {
            let options = CompassOptions {
                min_change_threshold: Some(threshold),
                update_throttle: Some(throttle),
                filter: Some(filter),
                ..Default::default()
            };
            assert!(options.resolve().is_ok());
        }
    }

    #[test]
    fn test_throttle_and_filter_out_of_range() {
        let options = CompassOptions {
            update_throttle: Some(49),
            ..Default::default()
        };
        assert_eq!(options.resolve().unwrap_err().field(), Some("updateThrottle"));

        let options = CompassOptions {
            update_throttle: Some(5001),
            ..Default::default()
        };
        assert_eq!(options.resolve().unwrap_err().field(), Some("updateThrottle"));

        let options = CompassOptions {
            filter: Some(1.5),
            ..Default::default()
        };
        assert_eq!(options.resolve().unwrap_err().field(), Some("filter"));

        let options = CompassOptions {
            filter: Some(-0.1),
            ..Default::default()
        };
        assert_eq!(options.resolve().unwrap_err().field(), Some("filter"));
    }

    #[test]
    fn test_heading_filter_falls_back_to_threshold() {
        let options = CompassOptions {
            min_change_threshold: Some(5.0),
            ..Default::default()
        };
        assert_eq!(options.resolve().unwrap().heading_filter, 5.0);

        let options = CompassOptions {
            min_change_threshold: Some(5.0),
            location: Some(LocationOptions {
                heading_filter: Some(0.0),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(options.resolve().unwrap().heading_filter, 5.0);

        let options = CompassOptions {
            location: Some(LocationOptions {
                heading_filter: Some(1.0),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(options.resolve().unwrap().heading_filter, 1.0);
    }

    #[test]
    fn test_json_with_platform_aliases() {
        let json = r#"{
            "minChangeThreshold": 2,
            "updateThrottle": 100,
            "filter": 0.5,
            "android": { "useSensorFusion": false, "sensorDelay": "game" },
            "ios": { "usesTrueHeading": true, "headingFilter": 1.5 }
        }"#;
        let resolved = CompassOptions::from_json(json).unwrap().resolve().unwrap();
        assert_eq!(resolved.min_change_threshold, 2.0);
        assert_eq!(resolved.update_throttle_ms, 100);
        assert_eq!(resolved.filter, 0.5);
        assert!(!resolved.use_sensor_fusion);
        assert_eq!(resolved.sensor_delay, SensorDelay::Game);
        assert!(resolved.uses_true_heading);
        assert_eq!(resolved.heading_filter, 1.5);
    }

    #[test]
    fn test_json_rejects_unknown() {
        let err = CompassOptions::from_json(r#"{"minChangeTreshold": 2}"#).unwrap_err();
        assert_eq!(err.field(), Some("options"));

        let err = CompassOptions::from_json(r#"{"fusion": {"sensorDelay": "turbo"}}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_sensor_delay() {
        assert_eq!("GAME".parse::<SensorDelay>().unwrap(), SensorDelay::Game);
        assert!("turbo".parse::<SensorDelay>().is_err());
        assert_eq!(SensorDelay::Fastest.sampling_period(), Duration::ZERO);
        assert_eq!(
            SensorDelay::Normal.sampling_period(),
            Duration::from_micros(200_000)
        );
        assert_eq!(SensorDelay::Ui.to_string(), "ui");
    }
}
