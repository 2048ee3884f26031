//! Vector, quaternion, and angle math shared by the projection and range code
//!
//! Orientation follows the upstream capture convention: unit quaternions with
//! Euler angles derived in Y·X·Z composition order, reported in degrees and
//! normalized to `[0, 360)`. Euler angles are only ever derived for tolerance
//! comparison and the PITCH/YAW/ROLL wire fields; the quaternion stays the
//! primary representation.

use serde::{Deserialize, Serialize};

/// 3D vector in upstream units (meters for positions)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const ZERO: Vector3 = Vector3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Vector3 { x, y, z }
    }
}

impl std::ops::Sub for Vector3 {
    type Output = Vector3;

    fn sub(self, rhs: Vector3) -> Vector3 {
        Vector3 {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
        }
    }
}

/// Unit quaternion, component order (x, y, z, w)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quaternion {
    /// Identity rotation
    pub fn identity() -> Self {
        Quaternion {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }

    pub fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Quaternion { x, y, z, w }
    }

    /// Derive Euler angles in the upstream convention
    ///
    /// Decomposes as yaw about Y, then pitch about X, then roll about Z
    /// (q = Qy·Qx·Qz). Angles are degrees in `[0, 360)`, matching what the
    /// capture software reports and what deployed clients compare against.
    pub fn euler_angles(&self) -> EulerAngles {
        let (x, y, z, w) = (self.x, self.y, self.z, self.w);

        // Sine of pitch; clamped so accumulated float error near the poles
        // cannot push asin out of domain.
        let sin_pitch = (2.0 * (w * x - y * z)).clamp(-1.0, 1.0);
        let pitch = sin_pitch.asin();

        let yaw = (2.0 * (w * y + x * z)).atan2(1.0 - 2.0 * (x * x + y * y));
        let roll = (2.0 * (w * z + x * y)).atan2(1.0 - 2.0 * (x * x + z * z));

        EulerAngles {
            pitch: wrap_degrees(pitch.to_degrees()),
            yaw: wrap_degrees(yaw.to_degrees()),
            roll: wrap_degrees(roll.to_degrees()),
        }
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Quaternion::identity()
    }
}

/// Euler angles in degrees, `[0, 360)`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EulerAngles {
    /// Rotation about X
    pub pitch: f64,
    /// Rotation about Y
    pub yaw: f64,
    /// Rotation about Z
    pub roll: f64,
}

/// Normalize an angle in degrees to `[0, 360)`
pub fn wrap_degrees(deg: f64) -> f64 {
    let wrapped = deg.rem_euclid(360.0);
    // rem_euclid(-1e-16, 360.0) yields 360.0 exactly; fold it back.
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Round to 3 decimal places
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
