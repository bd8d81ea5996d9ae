use crate::angle;
use crate::options::ResolvedOptions;
use crate::reading::RawHeading;
use crate::sensor::{decode_status, Decoded, HeadingDecoder, NativeHeading, SensorEvent};

/// Decoder for platform heading services that report magnetic and true
/// heading directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocationDecoder {
    uses_true_heading: bool,
}

impl LocationDecoder {
    pub fn new(uses_true_heading: bool) -> Self {
        LocationDecoder { uses_true_heading }
    }

    pub fn from_options(options: &ResolvedOptions) -> Self {
        Self::new(options.uses_true_heading)
    }

    /// Map one native heading update.
    ///
    /// The primary heading is the true heading when requested and available,
    /// magnetic otherwise. A missing true heading is reported as the magnetic
    /// one so the normalizer can drop it.
    pub fn convert(&self, native: &NativeHeading) -> RawHeading {
        let has_true = native.true_heading >= 0.0;
        let heading = if self.uses_true_heading && has_true {
            native.true_heading
        } else {
            native.magnetic_heading
        };

        RawHeading {
            heading: angle::normalize(heading),
            accuracy: native.accuracy,
            magnetic_heading: native.magnetic_heading,
            true_heading: if has_true {
                native.true_heading
            } else {
                native.magnetic_heading
            },
            timestamp_ms: native.timestamp_ms,
        }
    }
}

impl HeadingDecoder for LocationDecoder {
    fn decode(&mut self, event: SensorEvent) -> Decoded {
        if let Some(status) = decode_status(&event) {
            return status;
        }
        match event {
            SensorEvent::Heading(native) => {
                let raw = self.convert(&native);
                if raw.is_valid() {
                    Decoded::Sample(raw)
                } else {
                    Decoded::Nothing
                }
            }
            _ => Decoded::Nothing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompassError;
    use crate::reading::ReadingNormalizer;

    fn native(magnetic: f64, true_heading: f64) -> NativeHeading {
        NativeHeading {
            magnetic_heading: magnetic,
            true_heading,
            accuracy: 4.0,
            timestamp_ms: 1_000,
        }
    }

    #[test]
    fn test_magnetic_mode() {
        let mut decoder = LocationDecoder::new(false);
        let Decoded::Sample(raw) = decoder.decode(SensorEvent::Heading(native(100.0, 103.0))) else {
            panic!("expected a sample");
        };
        assert_eq!(raw.heading, 100.0);
        assert_eq!(raw.magnetic_heading, 100.0);
        assert_eq!(raw.true_heading, 103.0);

        let reading = ReadingNormalizer::new(false).normalize(&raw);
        assert_eq!(reading.magnetic_heading, None);
        assert_eq!(reading.true_heading, None);
    }

    #[test]
    fn test_true_heading_mode() {
        let decoder = LocationDecoder::new(true);
        let raw = decoder.convert(&native(100.0, 103.0));
        assert_eq!(raw.heading, 103.0);

        let reading = ReadingNormalizer::new(true).normalize(&raw);
        assert_eq!(reading.heading, 103.0);
        assert_eq!(reading.magnetic_heading, Some(100.0));
        // Equal to the primary heading, so omitted
        assert_eq!(reading.true_heading, None);
    }

    #[test]
    fn test_true_heading_unavailable_falls_back() {
        let decoder = LocationDecoder::new(true);
        let raw = decoder.convert(&native(100.0, -1.0));
        assert_eq!(raw.heading, 100.0);
        assert_eq!(raw.true_heading, 100.0);

        let reading = ReadingNormalizer::new(true).normalize(&raw);
        assert_eq!(reading.magnetic_heading, None);
        assert_eq!(reading.true_heading, None);
    }

    #[test]
    fn test_faults_and_garbage() {
        let mut decoder = LocationDecoder::default();
        assert_eq!(
            decoder.decode(SensorEvent::Fault("heading failure".into())),
            Decoded::Fault(CompassError::NativeFault("heading failure".into()))
        );
        assert_eq!(
            decoder.decode(SensorEvent::Heading(native(f64::NAN, -1.0))),
            Decoded::Nothing
        );
        assert_eq!(
            decoder.decode(SensorEvent::Accelerometer {
                values: [0.0, 0.0, 9.81],
                timestamp_ms: 0
            }),
            Decoded::Nothing
        );
    }
}
