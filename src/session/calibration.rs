//! Tolerance window and the per-axis range predicate

use crate::source::Pose;

/// Per-axis maximum allowed deviation used by range checks
///
/// Position axes are compared in raw upstream pose units, angle axes in
/// degrees. Absent until `setrange` installs one; every range check performed
/// before that fails with a configuration error rather than reporting a
/// false "in range".
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ToleranceWindow {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

/// Test whether `pose` lies within `tolerance` of `reference` on all six axes
///
/// Strict inequality on every axis: a deviation exactly equal to the
/// tolerance is out of range, and a zero tolerance admits only an exact
/// match. Position axes compare raw coordinates; angle axes compare the
/// derived Euler angles of the two orientations.
pub fn is_ranged(pose: &Pose, reference: &Pose, tolerance: &ToleranceWindow) -> bool {
    let pe = pose.orientation.euler_angles();
    let re = reference.orientation.euler_angles();

    (pose.position.x - reference.position.x).abs() < tolerance.x
        && (pose.position.y - reference.position.y).abs() < tolerance.y
        && (pose.position.z - reference.position.z).abs() < tolerance.z
        && (pe.pitch - re.pitch).abs() < tolerance.pitch
        && (pe.yaw - re.yaw).abs() < tolerance.yaw
        && (pe.roll - re.roll).abs() < tolerance.roll
}
