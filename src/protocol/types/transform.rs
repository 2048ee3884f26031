//! Flattened wire projection of a pose
//!
//! The `Transform` DTO is the protocol's workhorse: a millimeter-scaled,
//! 3-decimal-rounded projection of a [`Pose`], optionally relative to the
//! calibration origin. It is one-way: built from a pose, never turned back
//! into one. The same wire shape doubles as the `setrange` tolerance payload,
//! where X/Y/Z/PITCH/YAW/ROLL are read as six independent magnitudes; that
//! reinterpretation happens only through the explicit adapters here so the
//! ambiguity never reaches the domain model.

use serde::{Deserialize, Serialize};

use crate::error::{LinkError, Result};
use crate::math::round3;
use crate::session::ToleranceWindow;
use crate::source::Pose;

const METERS_TO_MM: f64 = 1000.0;

/// Wire DTO: `{X,Y,Z, RX,RY,RZ,RW, PITCH,YAW,ROLL}`
///
/// Field names are part of the client contract and must serialize exactly as
/// written. Decoding tolerates missing fields (they default to 0), matching
/// the permissive parser deployed clients were built against.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", default)]
pub struct Transform {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub rx: f64,
    pub ry: f64,
    pub rz: f64,
    pub rw: f64,
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

impl Transform {
    /// Project a pose onto the wire, optionally relative to an origin
    ///
    /// Calibrated (origin present): position is the component-wise delta,
    /// rounded to 3 decimals in meters and then scaled to millimeters;
    /// orientation fields are the raw component-wise difference of the
    /// quaternions and of the derived Euler angles. This is deliberately not
    /// a quaternion composition; deployed clients decode exactly this.
    ///
    /// Uncalibrated: position scaled to millimeters and rounded to whole
    /// units; orientation fields taken from the raw pose, 3-decimal rounded.
    pub fn from_pose(pose: &Pose, origin: Option<&Pose>) -> Transform {
        let q = pose.orientation;
        let e = q.euler_angles();

        match origin {
            Some(origin) => {
                let oq = origin.orientation;
                let oe = oq.euler_angles();
                Transform {
                    x: round3(pose.position.x - origin.position.x) * METERS_TO_MM,
                    y: round3(pose.position.y - origin.position.y) * METERS_TO_MM,
                    z: round3(pose.position.z - origin.position.z) * METERS_TO_MM,
                    rx: round3(q.x - oq.x),
                    ry: round3(q.y - oq.y),
                    rz: round3(q.z - oq.z),
                    rw: round3(q.w - oq.w),
                    pitch: round3(e.pitch - oe.pitch),
                    yaw: round3(e.yaw - oe.yaw),
                    roll: round3(e.roll - oe.roll),
                }
            }
            None => Transform {
                x: (pose.position.x * METERS_TO_MM).round(),
                y: (pose.position.y * METERS_TO_MM).round(),
                z: (pose.position.z * METERS_TO_MM).round(),
                rx: round3(q.x),
                ry: round3(q.y),
                rz: round3(q.z),
                rw: round3(q.w),
                pitch: round3(e.pitch),
                yaw: round3(e.yaw),
                roll: round3(e.roll),
            },
        }
    }

    /// Reinterpret a `setrange` payload as a tolerance window
    ///
    /// Only X/Y/Z/PITCH/YAW/ROLL participate; RX/RY/RZ/RW are ignored.
    /// Magnitudes must be non-negative.
    pub fn into_tolerance(self) -> Result<ToleranceWindow> {
        let magnitudes = [self.x, self.y, self.z, self.pitch, self.yaw, self.roll];
        if magnitudes.iter().any(|m| *m < 0.0) {
            return Err(LinkError::InvalidArgument(
                "tolerance magnitudes must be non-negative".into(),
            ));
        }
        Ok(ToleranceWindow {
            x: self.x,
            y: self.y,
            z: self.z,
            pitch: self.pitch,
            yaw: self.yaw,
            roll: self.roll,
        })
    }

    /// Echo a tolerance window back onto the wire (`getrange`)
    pub fn from_tolerance(window: &ToleranceWindow) -> Transform {
        Transform {
            x: window.x,
            y: window.y,
            z: window.z,
            pitch: window.pitch,
            yaw: window.yaw,
            roll: window.roll,
            ..Transform::default()
        }
    }
}
