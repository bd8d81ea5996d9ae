//! Orientation math for motion-sensor compasses.
//!
//! Device frame: x right, y up along the screen, z out of the screen.
//! World frame: x east, y north, z up. Orientation is `[azimuth, pitch, roll]`
//! in radians, azimuth in `(-π, π]` measured clockwise from magnetic north.
//!
//! Two estimators are provided:
//!
//! ```text
//!   accelerometer ─┐
//!                  ├─▶ rotation_from_gravity_and_field ─▶ orientation (noisy, absolute)
//!   magnetometer ──┘                                            │
//!                                                               ▼
//!   gyroscope ─────▶ GyroFusion::update_gyro ─▶ integrate ─▶ blend 98/2 ─▶ fused orientation
//! ```

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use nalgebra::{Matrix3, Rotation3, Vector3};

/// Weight of the gyroscope estimate in the complementary filter
pub const FILTER_COEFFICIENT: f64 = 0.98;

/// Below this the horizontal field vector is too short to trust (device in
/// free fall or close to magnetic north/south pole)
const MIN_FIELD_NORM: f64 = 0.1;

/// Gravity vectors shorter than this are rejected (m/s²)
const MIN_GRAVITY_NORM: f64 = 0.1 * 9.81;

/// Azimuth, pitch, roll in radians.
pub type Orientation = Vector3<f64>;

// =============================================================================
// Accelerometer + magnetometer
// =============================================================================

/// Rotation matrix from device to world frame.
///
/// Returns `None` when gravity and field are (near) parallel, or when either
/// is too short to define a frame.
pub fn rotation_from_gravity_and_field(
    gravity: &Vector3<f64>,
    field: &Vector3<f64>,
) -> Option<Matrix3<f64>> {
    if gravity.norm() < MIN_GRAVITY_NORM {
        return None;
    }

    let east = field.cross(gravity);
    if east.norm() < MIN_FIELD_NORM {
        return None;
    }
    let east = east.normalize();
    let up = gravity.normalize();
    let north = up.cross(&east);

    Some(Matrix3::new(
        east.x, east.y, east.z, //
        north.x, north.y, north.z, //
        up.x, up.y, up.z,
    ))
}

/// Extract `[azimuth, pitch, roll]` from a rotation matrix.
pub fn orientation_from_rotation(r: &Matrix3<f64>) -> Orientation {
    Vector3::new(
        r[(0, 1)].atan2(r[(1, 1)]),
        (-r[(2, 1)]).clamp(-1.0, 1.0).asin(),
        (-r[(2, 0)]).atan2(r[(2, 2)]),
    )
}

/// Rebuild a rotation matrix from `[azimuth, pitch, roll]`.
///
/// Inverse of [`orientation_from_rotation`] for pitch inside `(-π/2, π/2)`.
pub fn rotation_from_orientation(o: &Orientation) -> Matrix3<f64> {
    let (sin_z, cos_z) = o.x.sin_cos();
    let (sin_x, cos_x) = o.y.sin_cos();
    let (sin_y, cos_y) = o.z.sin_cos();

    let pitch = Matrix3::new(
        1.0, 0.0, 0.0, //
        0.0, cos_x, sin_x, //
        0.0, -sin_x, cos_x,
    );
    let roll = Matrix3::new(
        cos_y, 0.0, sin_y, //
        0.0, 1.0, 0.0, //
        -sin_y, 0.0, cos_y,
    );
    let azimuth = Matrix3::new(
        cos_z, sin_z, 0.0, //
        -sin_z, cos_z, 0.0, //
        0.0, 0.0, 1.0,
    );

    azimuth * (pitch * roll)
}

/// Orientation from one accelerometer and one magnetometer sample.
pub fn orientation_from_sensors(
    gravity: &Vector3<f64>,
    field: &Vector3<f64>,
) -> Option<Orientation> {
    rotation_from_gravity_and_field(gravity, field).map(|r| orientation_from_rotation(&r))
}

// =============================================================================
// Complementary filter
// =============================================================================

/// Blend one angle, handling the ±π seam.
///
/// When the two estimates sit on opposite sides of the seam, the negative one
/// is moved up by a full turn before blending and the result wrapped back.
pub fn blend_angle(gyro: f64, accmag: f64, coefficient: f64) -> f64 {
    let rest = 1.0 - coefficient;
    let fused = if gyro < -FRAC_PI_2 && accmag > 0.0 {
        coefficient * (gyro + TAU) + rest * accmag
    } else if accmag < -FRAC_PI_2 && gyro > 0.0 {
        coefficient * gyro + rest * (accmag + TAU)
    } else {
        return coefficient * gyro + rest * accmag;
    };

    if fused > PI {
        fused - TAU
    } else {
        fused
    }
}

/// Gyroscope integration corrected by accelerometer/magnetometer orientation.
///
/// Nothing is produced until one absolute orientation has been seen; the gyro
/// matrix is seeded from it and re-seeded from every fused result.
#[derive(Debug, Clone)]
pub struct GyroFusion {
    coefficient: f64,
    accmag: Option<Orientation>,
    gyro_matrix: Option<Matrix3<f64>>,
    gyro_orientation: Orientation,
    last_gyro_ms: Option<u64>,
}

impl Default for GyroFusion {
    fn default() -> Self {
        Self::new(FILTER_COEFFICIENT)
    }
}

impl GyroFusion {
    pub fn new(coefficient: f64) -> Self {
        GyroFusion {
            coefficient,
            accmag: None,
            gyro_matrix: None,
            gyro_orientation: Vector3::zeros(),
            last_gyro_ms: None,
        }
    }

    /// Latest absolute orientation.
    pub fn accmag(&self) -> Option<Orientation> {
        self.accmag
    }

    pub fn update_accmag(&mut self, orientation: Orientation) {
        if self.accmag.is_none() {
            self.gyro_orientation = orientation;
        }
        self.accmag = Some(orientation);
    }

    /// Integrate one angular-rate sample (rad/s) and return the fused
    /// orientation.
    pub fn update_gyro(&mut self, rate: &Vector3<f64>, timestamp_ms: u64) -> Option<Orientation> {
        let accmag = self.accmag?;
        let matrix = self
            .gyro_matrix
            .get_or_insert_with(|| rotation_from_orientation(&accmag));

        let delta = match self.last_gyro_ms {
            Some(previous) => {
                let dt = timestamp_ms.saturating_sub(previous) as f64 / 1000.0;
                Rotation3::from_scaled_axis(rate * dt).into_inner()
            }
            None => Matrix3::identity(),
        };
        self.last_gyro_ms = Some(timestamp_ms);

        *matrix *= delta;
        let gyro = orientation_from_rotation(matrix);

        let fused = Vector3::new(
            blend_angle(gyro.x, accmag.x, self.coefficient),
            blend_angle(gyro.y, accmag.y, self.coefficient),
            blend_angle(gyro.z, accmag.z, self.coefficient),
        );

        self.gyro_matrix = Some(rotation_from_orientation(&fused));
        self.gyro_orientation = fused;
        Some(fused)
    }

    /// Last integrated (and fused) orientation.
    pub fn orientation(&self) -> Orientation {
        self.gyro_orientation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::angle;

    const G: f64 = 9.81;

    fn flat_field(heading_deg: f64) -> Vector3<f64> {
        let h = heading_deg.to_radians();
        Vector3::new(-22.0 * h.sin(), 22.0 * h.cos(), -40.0)
    }

    fn heading(gravity: Vector3<f64>, field: Vector3<f64>) -> f64 {
        let o = orientation_from_sensors(&gravity, &field).unwrap();
        angle::heading_from_radians(o.x)
    }

    fn close(a: f64, b: f64, eps: f64) -> bool {
        angle::distance(a, b) < eps
    }

    #[test]
    fn test_flat_device_cardinal_points() {
        let up = Vector3::new(0.0, 0.0, G);
        assert!(close(heading(up, Vector3::new(0.0, 22.0, -40.0)), 0.0, 1e-9));
        assert!(close(heading(up, Vector3::new(22.0, 0.0, -40.0)), 270.0, 1e-9));
        assert!(close(heading(up, Vector3::new(-22.0, 0.0, -40.0)), 90.0, 1e-9));
        assert!(close(heading(up, Vector3::new(0.0, -22.0, -40.0)), 180.0, 1e-9));
    }

    #[test]
    fn test_flat_device_sweep() {
        let up = Vector3::new(0.0, 0.0, G);
        for deg in (0..360).step_by(15) {
            let h = heading(up, flat_field(deg as f64));
            assert!(close(h, deg as f64, 1e-6), "{} -> {}", deg, h);
        }
    }

    #[test]
    fn test_degenerate_inputs() {
        // Field parallel to gravity
        assert!(orientation_from_sensors(&Vector3::new(0.0, 0.0, G), &Vector3::new(0.0, 0.0, -40.0)).is_none());
        // Free fall
        assert!(orientation_from_sensors(&Vector3::zeros(), &flat_field(0.0)).is_none());
    }

    #[test]
    fn test_orientation_round_trip() {
        let o = Vector3::new(1.2, 0.3, -0.4);
        let back = orientation_from_rotation(&rotation_from_orientation(&o));
        assert!((back - o).norm() < 1e-12, "{:?}", back);

        let o = Vector3::new(-2.9, -0.2, 2.0);
        let back = orientation_from_rotation(&rotation_from_orientation(&o));
        assert!((back - o).norm() < 1e-12, "{:?}", back);
    }

    #[test]
    fn test_blend_across_seam() {
        // 179° gyro and -179° accmag should fuse near ±180°, never near 0
        let gyro = 179f64.to_radians();
        let accmag = (-179f64).to_radians();
        let fused = blend_angle(gyro, accmag, FILTER_COEFFICIENT);
        assert!(fused.abs() > 178f64.to_radians(), "{}", fused.to_degrees());

        let fused = blend_angle(accmag, gyro, FILTER_COEFFICIENT);
        assert!(fused.abs() > 178f64.to_radians(), "{}", fused.to_degrees());
        assert!(fused <= PI);

        // Same side is a plain weighted sum
        assert!((blend_angle(1.0, 0.0, 0.98) - 0.98).abs() < 1e-12);
    }

    #[test]
    fn test_gyro_needs_absolute_reference() {
        let mut fusion = GyroFusion::default();
        assert!(fusion.update_gyro(&Vector3::new(0.0, 0.0, 1.0), 0).is_none());
    }

    #[test]
    fn test_gyro_at_rest_holds_heading() {
        let mut fusion = GyroFusion::default();
        let reference = Vector3::new(FRAC_PI_2, 0.0, 0.0);
        fusion.update_accmag(reference);
        for t in (0..1000).step_by(10) {
            let fused = fusion.update_gyro(&Vector3::zeros(), t).unwrap();
            assert!((fused - reference).norm() < 1e-9);
        }
    }

    #[test]
    fn test_gyro_converges_to_accmag() {
        let mut fusion = GyroFusion::default();
        fusion.update_accmag(Vector3::zeros());
        fusion.update_gyro(&Vector3::zeros(), 0);

        // Absolute reference jumps to 30°, device not rotating
        fusion.update_accmag(Vector3::new(30f64.to_radians(), 0.0, 0.0));
        let mut fused = Vector3::zeros();
        for t in 1..=400u64 {
            fused = fusion.update_gyro(&Vector3::zeros(), t * 10).unwrap();
        }
        assert!((fused.x.to_degrees() - 30.0).abs() < 0.1, "{}", fused.x.to_degrees());
    }

    #[test]
    fn test_gyro_rotation_moves_azimuth() {
        // Pure gyro (coefficient 1): rotating about device z turns the azimuth
        let mut fusion = GyroFusion::new(1.0);
        fusion.update_accmag(Vector3::zeros());
        fusion.update_gyro(&Vector3::zeros(), 0);
        // -0.5 rad/s about z for one second
        for t in 1..=100u64 {
            fusion.update_gyro(&Vector3::new(0.0, 0.0, -0.5), t * 10);
        }
        let az = fusion.orientation().x;
        assert!((az.abs() - 0.5).abs() < 1e-6, "{}", az);
    }
}
