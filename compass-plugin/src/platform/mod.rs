//! Platform variants.
//!
//! A variant decides three things about a native heading service: whether the
//! device can serve it, what to subscribe to, and how to decode the events
//! that come back. Everything else (sessions, timers, one-shot) is shared in
//! [`crate::adapter::CompassCore`].

use std::sync::Arc;

use compass_core::{
    HeadingDecoder, HeadingSource, ResolvedOptions, SensorCapabilities, SubscriptionRequest,
};
use serde::{Deserialize, Serialize};

use crate::adapter::CompassAdapter;
use crate::clock::SessionClock;

pub mod fusion;
pub mod location;

pub use fusion::{FusionCompass, FusionProfile};
pub use location::{LocationCompass, LocationProfile};

/// Which native heading service an adapter drives.
#[derive(
    clap::ValueEnum,
    strum::Display,
    strum::EnumString,
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Location-manager heading service (magnetic and true heading)
    Location,
    /// Accelerometer/magnetometer with optional gyroscope fusion
    Fusion,
}

impl Platform {
    /// Variant native to the compilation target.
    pub fn detect() -> Self {
        if cfg!(any(target_os = "ios", target_os = "macos")) {
            Platform::Location
        } else {
            Platform::Fusion
        }
    }
}

/// Build the adapter variant for `platform`.
pub fn create_adapter<S: HeadingSource>(
    platform: Platform,
    source: Arc<S>,
    clock: SessionClock,
) -> Box<dyn CompassAdapter> {
    match platform {
        Platform::Location => Box::new(LocationCompass::with_clock(source, clock)),
        Platform::Fusion => Box::new(FusionCompass::with_clock(source, clock)),
    }
}

/// Per-variant behaviour plugged into the shared adapter engine.
pub trait PlatformProfile: Send + Sync + 'static {
    fn platform(&self) -> Platform;

    /// True when the device has the hardware this variant needs.
    fn supports(&self, capabilities: &SensorCapabilities) -> bool;

    /// Subscription for a continuous session or, with `one_shot`, for a
    /// single high-sensitivity reading.
    fn request(
        &self,
        options: &ResolvedOptions,
        capabilities: &SensorCapabilities,
        one_shot: bool,
    ) -> SubscriptionRequest;

    /// Fresh decoder for one subscription.
    fn decoder(
        &self,
        options: &ResolvedOptions,
        capabilities: &SensorCapabilities,
    ) -> Box<dyn HeadingDecoder>;
}
