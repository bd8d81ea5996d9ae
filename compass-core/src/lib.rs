//! # Compass Core
//!
//! Platform-independent heading pipeline.
//!
//! This crate contains the pure logic of a compass: option validation,
//! decoding of native sensor events, smoothing and rate limiting, reading
//! normalization and needle interpolation. It has **no async runtime and no
//! I/O**; time is always passed in as milliseconds.
//!
//! ## Architecture
//!
//! The native heading service is abstracted through the [`HeadingSource`]
//! trait, so the same pipeline runs against a real platform binding or a
//! simulated sensor.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  compass-core (no tokio, no I/O)                                 │
//! │                                                                  │
//! │  SensorEvent ─▶ decoder ─▶ UpdateGovernor ─▶ ReadingNormalizer   │
//! │   (sensor)      (location,    (filter,          (CompassReading) │
//! │                  motion)       throttle,                         │
//! │                                threshold)                        │
//! │                                                                  │
//! │  CompassOptions ─▶ ResolvedOptions      NeedleInterpolator       │
//! └──────────────────────────────────────────────────────────────────┘
//!                 ▲
//!    ┌────────────┴─────────────────────────┐
//!    │  compass-plugin                      │
//!    │  (tokio session task, one-shot,      │
//!    │   LocationCompass, FusionCompass)    │
//!    └──────────────────────────────────────┘
//! ```
//!
//! ## Key Modules
//!
//! - [`options`] - User options, defaults and validation
//! - [`sensor`] - Native heading service trait ([`HeadingSource`]) and events
//! - [`decoder`] - Per-platform event decoding
//! - [`fusion`] - Accelerometer/magnetometer orientation and gyro fusion
//! - [`governor`] - Smoothing, throttle and threshold gates
//! - [`reading`] - Raw samples and the normalized [`CompassReading`]
//! - [`interpolator`] - Shortest-path needle animation
//! - [`session`] - Session and one-shot state machines
//!
//! ## Example: Governing a sample stream
//!
//! ```rust
//! use compass_core::{CompassOptions, GovernorConfig, RawHeading, ReadingNormalizer, UpdateGovernor};
//!
//! let options = CompassOptions { filter: Some(0.0), ..Default::default() }.resolve().unwrap();
//! let mut governor = UpdateGovernor::new(GovernorConfig::from(&options));
//! let normalizer = ReadingNormalizer::new(options.uses_true_heading);
//!
//! governor.on_sample(RawHeading::magnetic(10.0, 2.0, 0));
//! governor.on_sample(RawHeading::magnetic(12.0, 2.0, 100));
//!
//! let raw = governor.evaluate(200).unwrap();
//! let reading = normalizer.normalize(&raw);
//! assert_eq!(reading.heading, 12.0);
//! assert_eq!(reading.timestamp, 100);
//! ```

pub mod angle;
pub mod decoder;
pub mod error;
pub mod fusion;
pub mod governor;
pub mod interpolator;
pub mod options;
pub mod reading;
pub mod sensor;
pub mod session;

// Re-export commonly used types
pub use decoder::{LocationDecoder, MotionDecoder, MotionMode};
pub use error::CompassError;
pub use governor::{GovernorConfig, Suppressed, UpdateGovernor};
pub use interpolator::NeedleInterpolator;
pub use options::{CompassOptions, FusionOptions, LocationOptions, ResolvedOptions, SensorDelay};
pub use reading::{CompassReading, RawHeading, ReadingNormalizer, SensorAccuracy};
pub use sensor::{
    Decoded, HeadingDecoder, HeadingSource, NativeHeading, Permission, SensorCapabilities,
    SensorEvent, SensorSink, SubscriptionId, SubscriptionRequest,
};
pub use session::{OneShotState, OneShotTracker, SessionState, SessionTracker};
