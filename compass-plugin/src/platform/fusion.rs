//! Motion-sensor compass: accelerometer and magnetometer, optionally fused
//! with the gyroscope.

use compass_core::{
    HeadingDecoder, MotionDecoder, MotionMode, ResolvedOptions, SensorCapabilities,
    SubscriptionRequest,
};

use super::{Platform, PlatformProfile};
use crate::adapter::CompassCore;

#[derive(Debug, Clone, Copy, Default)]
pub struct FusionProfile;

impl PlatformProfile for FusionProfile {
    fn platform(&self) -> Platform {
        Platform::Fusion
    }

    fn supports(&self, capabilities: &SensorCapabilities) -> bool {
        capabilities.accelerometer && capabilities.magnetometer
    }

    fn request(
        &self,
        options: &ResolvedOptions,
        capabilities: &SensorCapabilities,
        _one_shot: bool,
    ) -> SubscriptionRequest {
        let mode = MotionMode::select(options.use_sensor_fusion, capabilities);
        SubscriptionRequest::Motion {
            sampling_period: options.sensor_delay.sampling_period(),
            gyroscope: mode == MotionMode::Gyro,
        }
    }

    fn decoder(
        &self,
        options: &ResolvedOptions,
        capabilities: &SensorCapabilities,
    ) -> Box<dyn HeadingDecoder> {
        let mode = MotionMode::select(options.use_sensor_fusion, capabilities);
        if options.use_sensor_fusion && mode == MotionMode::AccMag {
            log::info!("Fusion: no gyroscope, using accelerometer and magnetometer only");
        }
        Box::new(MotionDecoder::new(mode))
    }
}

/// Compass backed by raw motion sensors.
pub type FusionCompass<S> = CompassCore<FusionProfile, S>;
