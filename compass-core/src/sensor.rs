//! Native sensor abstraction.
//!
//! The platform heading services are external collaborators. This module
//! defines the narrow interface the pipeline needs from them, so the same
//! session logic runs against a real platform binding or the simulated
//! sensor used by tests and the demo.
//!
//! # Push delivery
//!
//! A subscription hands the source a [`SensorSink`]. The source pushes
//! [`SensorEvent`]s into it from whatever thread its framework uses. The sink
//! returns `false` once nobody is listening anymore, which lets a source drop
//! dead subscriptions on its own.
//!
//! # Example
//!
//! ```rust,ignore
//! use compass_core::sensor::{HeadingSource, Permission, SubscriptionRequest};
//!
//! fn start<S: HeadingSource>(source: &S, sink: Box<dyn SensorSink>) {
//!     if source.permission() == Permission::Granted {
//!         let id = source
//!             .subscribe(SubscriptionRequest::Heading { heading_filter: 3.0 }, sink)
//!             .unwrap();
//!         // ... later
//!         source.unsubscribe(id).unwrap();
//!     }
//! }
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CompassError;
use crate::reading::{RawHeading, SensorAccuracy};

// =============================================================================
// Capabilities and permission
// =============================================================================

/// Hardware the platform reports as present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorCapabilities {
    /// Platform heading service (location manager style)
    pub heading: bool,
    pub accelerometer: bool,
    pub magnetometer: bool,
    pub gyroscope: bool,
}

impl SensorCapabilities {
    pub fn all() -> Self {
        SensorCapabilities {
            heading: true,
            accelerometer: true,
            magnetometer: true,
            gyroscope: true,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }
}

/// Permission state, unified across platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Granted,
    Denied,
    /// Not asked yet, or asked and not answered
    Undetermined,
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Permission::Granted => write!(f, "granted"),
            Permission::Denied => write!(f, "denied"),
            Permission::Undetermined => write!(f, "undetermined"),
        }
    }
}

// =============================================================================
// Subscriptions and events
// =============================================================================

/// Opaque handle to an active native subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// What a subscription asks the platform for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SubscriptionRequest {
    /// Heading updates from the platform heading service
    Heading {
        /// Minimum degrees of change between hardware updates
        heading_filter: f64,
    },
    /// Raw motion sensor samples
    Motion {
        sampling_period: Duration,
        /// Also deliver gyroscope samples
        gyroscope: bool,
    },
}

/// Heading update as a platform heading service reports it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NativeHeading {
    pub magnetic_heading: f64,
    /// Negative when the device has no true-north reference
    pub true_heading: f64,
    /// Negative when unknown
    pub accuracy: f64,
    pub timestamp_ms: u64,
}

/// Event pushed by a source into a subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorEvent {
    Heading(NativeHeading),
    /// Acceleration including gravity, m/s², device frame
    Accelerometer { values: [f64; 3], timestamp_ms: u64 },
    /// Geomagnetic field, µT, device frame
    Magnetometer { values: [f64; 3], timestamp_ms: u64 },
    /// Angular rate, rad/s, device frame
    Gyroscope { values: [f64; 3], timestamp_ms: u64 },
    AccuracyChanged(SensorAccuracy),
    /// Platform error text
    Fault(String),
    PermissionChanged(Permission),
}

/// Receiving end of a subscription.
pub trait SensorSink: Send + Sync {
    /// Deliver one event. Returns `false` when the receiver is gone.
    fn deliver(&self, event: SensorEvent) -> bool;
}

impl<F> SensorSink for F
where
    F: Fn(SensorEvent) -> bool + Send + Sync,
{
    fn deliver(&self, event: SensorEvent) -> bool {
        self(event)
    }
}

// =============================================================================
// HeadingSource Trait
// =============================================================================

/// Platform heading/sensor service.
///
/// Implementations must be cheap to call from any thread. Errors are returned,
/// never thrown: callers treat any failure of `capabilities` as "not
/// available".
pub trait HeadingSource: Send + Sync + 'static {
    /// Hardware present on this device.
    fn capabilities(&self) -> Result<SensorCapabilities, CompassError>;

    /// Current permission state. Never prompts.
    fn permission(&self) -> Permission;

    /// Ask the user for permission. Does not block for the answer; the state
    /// seen right after may still be `Undetermined`.
    fn request_permission(&self) -> Permission;

    /// Start pushing events for `request` into `sink`.
    fn subscribe(
        &self,
        request: SubscriptionRequest,
        sink: Box<dyn SensorSink>,
    ) -> Result<SubscriptionId, CompassError>;

    /// Stop a subscription. Unknown ids are not an error.
    fn unsubscribe(&self, id: SubscriptionId) -> Result<(), CompassError>;
}

// =============================================================================
// Decoding
// =============================================================================

/// Result of feeding one event to a decoder.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Sample(RawHeading),
    Fault(CompassError),
    /// Event consumed without producing anything
    Nothing,
}

/// Turns a platform's event stream into heading samples.
///
/// Each platform variant owns one decoder per subscription; decoders keep
/// whatever state they need between events (last vectors, fusion matrices).
pub trait HeadingDecoder: Send {
    fn decode(&mut self, event: SensorEvent) -> Decoded;
}

/// Map the events every platform treats the same way.
///
/// Returns `None` for sensor data, which the platform decoder handles.
pub fn decode_status(event: &SensorEvent) -> Option<Decoded> {
    match event {
        SensorEvent::Fault(message) => {
            Some(Decoded::Fault(CompassError::NativeFault(message.clone())))
        }
        SensorEvent::PermissionChanged(Permission::Denied) => {
            Some(Decoded::Fault(CompassError::PermissionDenied))
        }
        SensorEvent::PermissionChanged(_) => Some(Decoded::Nothing),
        _ => None,
    }
}
