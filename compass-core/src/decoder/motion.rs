use nalgebra::Vector3;

use crate::angle;
use crate::fusion::{self, GyroFusion, Orientation};
use crate::reading::{RawHeading, SensorAccuracy, NO_TRUE_HEADING};
use crate::sensor::{decode_status, Decoded, HeadingDecoder, SensorCapabilities, SensorEvent};

/// Minimum spacing between orientation updates driven by the magnetometer
pub const MAGNETOMETER_THROTTLE_MS: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionMode {
    /// Accelerometer + magnetometer only
    AccMag,
    /// Gyroscope integration corrected by accelerometer + magnetometer
    Gyro,
}

impl MotionMode {
    /// Pick the mode for a device. Fusion needs a gyroscope; without one the
    /// decoder silently falls back to accelerometer + magnetometer.
    pub fn select(use_sensor_fusion: bool, capabilities: &SensorCapabilities) -> Self {
        if use_sensor_fusion && capabilities.gyroscope {
            MotionMode::Gyro
        } else {
            MotionMode::AccMag
        }
    }
}

/// Decoder for raw motion sensors.
#[derive(Debug, Clone)]
pub struct MotionDecoder {
    mode: MotionMode,
    accuracy: f64,
    gravity: Option<Vector3<f64>>,
    field: Option<Vector3<f64>>,
    last_field_ms: Option<u64>,
    fusion: GyroFusion,
}

impl MotionDecoder {
    pub fn new(mode: MotionMode) -> Self {
        MotionDecoder {
            mode,
            accuracy: SensorAccuracy::INITIAL_DEGREES,
            gravity: None,
            field: None,
            last_field_ms: None,
            fusion: GyroFusion::default(),
        }
    }

    pub fn mode(&self) -> MotionMode {
        self.mode
    }

    /// Accuracy attached to the next sample, in degrees.
    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }

    fn sample(&self, orientation: &Orientation, timestamp_ms: u64) -> RawHeading {
        let heading = angle::heading_from_radians(orientation.x);
        RawHeading {
            heading,
            accuracy: self.accuracy,
            magnetic_heading: heading,
            true_heading: NO_TRUE_HEADING,
            timestamp_ms,
        }
    }

    fn on_field(&mut self, values: [f64; 3], timestamp_ms: u64) -> Decoded {
        self.field = Some(Vector3::from(values));

        if let Some(last) = self.last_field_ms {
            if timestamp_ms.saturating_sub(last) < MAGNETOMETER_THROTTLE_MS {
                return Decoded::Nothing;
            }
        }
        self.last_field_ms = Some(timestamp_ms);

        let (Some(gravity), Some(field)) = (self.gravity, self.field) else {
            return Decoded::Nothing;
        };
        let Some(orientation) = fusion::orientation_from_sensors(&gravity, &field) else {
            return Decoded::Nothing;
        };

        match self.mode {
            MotionMode::AccMag => Decoded::Sample(self.sample(&orientation, timestamp_ms)),
            MotionMode::Gyro => {
                self.fusion.update_accmag(orientation);
                Decoded::Nothing
            }
        }
    }

    fn on_rate(&mut self, values: [f64; 3], timestamp_ms: u64) -> Decoded {
        if self.mode != MotionMode::Gyro {
            return Decoded::Nothing;
        }
        match self.fusion.update_gyro(&Vector3::from(values), timestamp_ms) {
            Some(fused) => Decoded::Sample(self.sample(&fused, timestamp_ms)),
            None => Decoded::Nothing,
        }
    }
}

impl HeadingDecoder for MotionDecoder {
    fn decode(&mut self, event: SensorEvent) -> Decoded {
        if let Some(status) = decode_status(&event) {
            return status;
        }
        match event {
            SensorEvent::Accelerometer { values, .. } => {
                self.gravity = Some(Vector3::from(values));
                Decoded::Nothing
            }
            SensorEvent::Magnetometer {
                values,
                timestamp_ms,
            } => self.on_field(values, timestamp_ms),
            SensorEvent::Gyroscope {
                values,
                timestamp_ms,
            } => self.on_rate(values, timestamp_ms),
            SensorEvent::AccuracyChanged(status) => {
                self.accuracy = status.degrees();
                Decoded::Nothing
            }
            _ => Decoded::Nothing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompassError;

    fn gravity(t: u64) -> SensorEvent {
        SensorEvent::Accelerometer {
            values: [0.0, 0.0, 9.81],
            timestamp_ms: t,
        }
    }

    fn field(heading_deg: f64, t: u64) -> SensorEvent {
        let h = heading_deg.to_radians();
        SensorEvent::Magnetometer {
            values: [-22.0 * h.sin(), 22.0 * h.cos(), -40.0],
            timestamp_ms: t,
        }
    }

    fn still(t: u64) -> SensorEvent {
        SensorEvent::Gyroscope {
            values: [0.0; 3],
            timestamp_ms: t,
        }
    }

    #[test]
    fn test_mode_selection() {
        let mut caps = SensorCapabilities::all();
        assert_eq!(MotionMode::select(true, &caps), MotionMode::Gyro);
        assert_eq!(MotionMode::select(false, &caps), MotionMode::AccMag);
        caps.gyroscope = false;
        assert_eq!(MotionMode::select(true, &caps), MotionMode::AccMag);
    }

    #[test]
    fn test_accmag_heading() {
        let mut decoder = MotionDecoder::new(MotionMode::AccMag);
        // No gravity yet
        assert_eq!(decoder.decode(field(90.0, 0)), Decoded::Nothing);

        decoder.decode(gravity(50));
        let Decoded::Sample(raw) = decoder.decode(field(90.0, 100)) else {
            panic!("expected a sample");
        };
        assert!((raw.heading - 90.0).abs() < 1e-6);
        assert_eq!(raw.magnetic_heading, raw.heading);
        assert_eq!(raw.true_heading, NO_TRUE_HEADING);
        assert_eq!(raw.accuracy, SensorAccuracy::INITIAL_DEGREES);
        assert_eq!(raw.timestamp_ms, 100);
    }

    #[test]
    fn test_magnetometer_throttle() {
        let mut decoder = MotionDecoder::new(MotionMode::AccMag);
        decoder.decode(gravity(0));
        assert!(matches!(decoder.decode(field(10.0, 0)), Decoded::Sample(_)));
        assert_eq!(decoder.decode(field(20.0, 50)), Decoded::Nothing);
        assert_eq!(decoder.decode(field(30.0, 99)), Decoded::Nothing);

        let Decoded::Sample(raw) = decoder.decode(field(40.0, 100)) else {
            panic!("expected a sample");
        };
        assert!((raw.heading - 40.0).abs() < 1e-6);
    }

    #[test]
    fn test_accuracy_status() {
        let mut decoder = MotionDecoder::new(MotionMode::AccMag);
        decoder.decode(SensorEvent::AccuracyChanged(SensorAccuracy::Low));
        assert_eq!(decoder.accuracy(), 10.0);
        decoder.decode(gravity(0));
        let Decoded::Sample(raw) = decoder.decode(field(0.0, 0)) else {
            panic!("expected a sample");
        };
        assert_eq!(raw.accuracy, 10.0);
    }

    #[test]
    fn test_gyro_mode_emits_on_rate_samples() {
        let mut decoder = MotionDecoder::new(MotionMode::Gyro);
        // Nothing before an absolute reference exists
        assert_eq!(decoder.decode(still(0)), Decoded::Nothing);

        decoder.decode(gravity(0));
        // In fusion mode the magnetometer only feeds the filter
        assert_eq!(decoder.decode(field(270.0, 10)), Decoded::Nothing);

        let Decoded::Sample(raw) = decoder.decode(still(20)) else {
            panic!("expected a sample");
        };
        assert!(angle::distance(raw.heading, 270.0) < 1e-6, "{}", raw.heading);
    }

    #[test]
    fn test_accmag_mode_ignores_gyro() {
        let mut decoder = MotionDecoder::new(MotionMode::AccMag);
        decoder.decode(gravity(0));
        decoder.decode(field(0.0, 0));
        assert_eq!(decoder.decode(still(10)), Decoded::Nothing);
    }

    #[test]
    fn test_permission_revoked() {
        let mut decoder = MotionDecoder::new(MotionMode::Gyro);
        assert_eq!(
            decoder.decode(SensorEvent::PermissionChanged(
                crate::sensor::Permission::Denied
            )),
            Decoded::Fault(CompassError::PermissionDenied)
        );
    }
}
