//! Location-manager heading service.
//!
//! The platform does the sensor work and reports magnetic and true heading
//! directly; the hardware heading filter is set from `headingFilter`.

use compass_core::options::ONE_SHOT_HEADING_FILTER;
use compass_core::{
    HeadingDecoder, LocationDecoder, ResolvedOptions, SensorCapabilities, SubscriptionRequest,
};

use super::{Platform, PlatformProfile};
use crate::adapter::CompassCore;

#[derive(Debug, Clone, Copy, Default)]
pub struct LocationProfile;

impl PlatformProfile for LocationProfile {
    fn platform(&self) -> Platform {
        Platform::Location
    }

    fn supports(&self, capabilities: &SensorCapabilities) -> bool {
        capabilities.heading
    }

    fn request(
        &self,
        options: &ResolvedOptions,
        _capabilities: &SensorCapabilities,
        one_shot: bool,
    ) -> SubscriptionRequest {
        let heading_filter = if one_shot {
            ONE_SHOT_HEADING_FILTER
        } else {
            options.heading_filter
        };
        SubscriptionRequest::Heading { heading_filter }
    }

    fn decoder(
        &self,
        options: &ResolvedOptions,
        _capabilities: &SensorCapabilities,
    ) -> Box<dyn HeadingDecoder> {
        Box::new(LocationDecoder::from_options(options))
    }
}

/// Compass backed by a location-manager heading service.
pub type LocationCompass<S> = CompassCore<LocationProfile, S>;

#[cfg(test)]
mod tests {
    use super::*;
    use compass_core::CompassOptions;

    #[test]
    fn test_heading_filter() {
        let options = CompassOptions {
            min_change_threshold: Some(4.0),
            ..Default::default()
        }
        .resolve()
        .unwrap();
        let caps = SensorCapabilities::all();

        assert_eq!(
            LocationProfile.request(&options, &caps, false),
            SubscriptionRequest::Heading { heading_filter: 4.0 }
        );
        assert_eq!(
            LocationProfile.request(&options, &caps, true),
            SubscriptionRequest::Heading { heading_filter: 1.0 }
        );
    }

    #[test]
    fn test_needs_heading_hardware() {
        let mut caps = SensorCapabilities::all();
        assert!(LocationProfile.supports(&caps));
        caps.heading = false;
        assert!(!LocationProfile.supports(&caps));
    }
}
