//! Wire representation of a single marker
//!
//! Positions go out in millimeters rounded to whole units, both for the
//! unlabeled point cloud (`getallmarkers`) and for the per-definition
//! layout answered by `getposition id$Markers`.

use serde::{Deserialize, Serialize};

use crate::math::Vector3;
use crate::source::{MarkerState, Pose, RigidBodyDefinition};

const METERS_TO_MM: f64 = 1000.0;

/// Wire DTO for one marker
///
/// Field names and the nested lowercase `{x,y,z}` position object are part
/// of the client contract. `IsActive` and `Size` are carried for shape
/// compatibility and stay at their defaults on both reply paths.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Marker {
    pub id: i32,
    pub is_active: bool,
    pub labeled: bool,
    pub name: String,
    pub position: Vector3,
    pub size: f64,
}

impl Marker {
    /// Build the `getallmarkers` entry for a live marker state
    pub fn from_state(state: &MarkerState) -> Marker {
        Marker {
            id: state.id,
            labeled: state.labeled,
            name: state.name.clone(),
            position: scale_mm(state.position),
            ..Marker::default()
        }
    }

    /// Build the `getposition id$Markers` entry for one defined marker
    ///
    /// The reported position is the current pose position minus the marker's
    /// body-local position, in millimeters. Every entry carries the rigid
    /// body's id and an index-suffixed name.
    pub fn from_definition(
        definition: &RigidBodyDefinition,
        index: usize,
        pose: &Pose,
    ) -> Marker {
        let local = definition.markers[index].position;
        Marker {
            id: definition.id,
            name: format!("{} - {}", definition.name, index),
            position: scale_mm(pose.position - local),
            ..Marker::default()
        }
    }
}

fn scale_mm(v: Vector3) -> Vector3 {
    Vector3 {
        x: (v.x * METERS_TO_MM).round(),
        y: (v.y * METERS_TO_MM).round(),
        z: (v.z * METERS_TO_MM).round(),
    }
}
