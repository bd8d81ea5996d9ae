//! Platform decoders: native event stream in, heading samples out.
//!
//! | Decoder            | Source events                         | Heading              |
//! |--------------------|---------------------------------------|----------------------|
//! | `LocationDecoder`  | `Heading`                             | magnetic or true     |
//! | `MotionDecoder`    | `Accelerometer`, `Magnetometer`       | azimuth              |
//! | `MotionDecoder`    | + `Gyroscope` (fusion mode)           | fused azimuth        |
//!
//! All decoders map `Fault` and a `PermissionChanged(Denied)` the same way,
//! see [`crate::sensor::decode_status`].

mod location;
mod motion;

pub use location::LocationDecoder;
pub use motion::{MotionDecoder, MotionMode, MAGNETOMETER_THROTTLE_MS};

pub use crate::sensor::{Decoded, HeadingDecoder};
