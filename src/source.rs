//! Mocap source collaborator contract
//!
//! The capture system itself (NatNet streaming client, simulator, test stub)
//! lives outside this crate. This module defines the data it supplies and the
//! trait the command server consumes it through. Implementations must be
//! callable from both the network tasks and the pose-feed tick, so every
//! method takes `&self` and the trait requires `Send + Sync`.

use serde::{Deserialize, Serialize};

use crate::math::{Quaternion, Vector3};

/// Position and orientation of an asset at a moment in time
///
/// Position is in upstream units (meters); orientation is a unit quaternion.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    pub position: Vector3,
    pub orientation: Quaternion,
}

impl Pose {
    pub fn new(position: Vector3, orientation: Quaternion) -> Self {
        Pose {
            position,
            orientation,
        }
    }
}

/// One marker inside a rigid-body definition, in body-local coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerDefinition {
    pub id: i32,
    pub name: String,
    pub position: Vector3,
}

/// Rigid-body definition as registered in the capture software
#[derive(Debug, Clone, PartialEq)]
pub struct RigidBodyDefinition {
    pub id: i32,
    pub name: String,
    pub markers: Vec<MarkerDefinition>,
}

/// Live state of a single (possibly unlabeled) marker
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerState {
    pub id: i32,
    pub name: String,
    pub position: Vector3,
    /// False for point-cloud markers that no rigid body claimed this frame
    pub labeled: bool,
}

/// Description of the capture host, answered verbatim to `serverdescription`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServerDescription {
    pub host_name: String,
    pub host_app: String,
    pub host_app_version: String,
    #[serde(rename = "NatNetVersion")]
    pub natnet_version: String,
}

/// Interface onto the external motion-capture feed
///
/// The command server pulls everything through this trait; it never talks to
/// the capture network itself. `latest_rigid_body_state` returns `None` while
/// the source has not yet reported the requested asset (e.g. right after an
/// asset switch, before the settle delay elapses).
pub trait MocapSource: Send + Sync {
    /// Subscribe to an asset id so the source starts reporting it
    fn register_rigid_body(&self, asset_id: i32);

    /// Latest pose for an asset, or `None` if the source has none yet
    fn latest_rigid_body_state(&self, asset_id: i32, network_compensation: bool) -> Option<Pose>;

    /// Definition (name + marker layout) for an asset id
    fn rigid_body_definition(&self, asset_id: i32) -> Option<RigidBodyDefinition>;

    /// Most recent states of all markers, labeled and unlabeled
    fn latest_marker_states(&self) -> Vec<MarkerState>;

    /// Description of the capture host
    fn server_description(&self) -> ServerDescription;

    /// Enable a named asset in the capture software
    fn enable_asset(&self, name: &str) -> crate::Result<()>;

    /// Disable a named asset in the capture software
    fn disable_asset(&self, name: &str) -> crate::Result<()>;
}

#[cfg(test)]
pub(crate) mod stub {
    //! Scripted in-memory source used by unit tests across the crate.

    use std::sync::Mutex;

    use super::*;
    use crate::error::LinkError;

    pub struct ScriptedSource {
        pose: Mutex<Option<Pose>>,
        definition: Mutex<Option<RigidBodyDefinition>>,
        markers: Mutex<Vec<MarkerState>>,
        pub registered: Mutex<Vec<i32>>,
        pub known_assets: Vec<String>,
    }

    impl ScriptedSource {
        pub fn new() -> Self {
            ScriptedSource {
                pose: Mutex::new(Some(Pose::default())),
                definition: Mutex::new(None),
                markers: Mutex::new(Vec::new()),
                registered: Mutex::new(Vec::new()),
                known_assets: vec!["Wand".into()],
            }
        }

        pub fn set_pose(&self, pose: Option<Pose>) {
            *self.pose.lock().unwrap() = pose;
        }

        pub fn set_definition(&self, definition: RigidBodyDefinition) {
            *self.definition.lock().unwrap() = Some(definition);
        }

        pub fn set_markers(&self, markers: Vec<MarkerState>) {
            *self.markers.lock().unwrap() = markers;
        }
    }

    impl MocapSource for ScriptedSource {
        fn register_rigid_body(&self, asset_id: i32) {
            self.registered.lock().unwrap().push(asset_id);
        }

        fn latest_rigid_body_state(&self, _asset_id: i32, _compensation: bool) -> Option<Pose> {
            *self.pose.lock().unwrap()
        }

        fn rigid_body_definition(&self, asset_id: i32) -> Option<RigidBodyDefinition> {
            self.definition
                .lock()
                .unwrap()
                .clone()
                .filter(|d| d.id == asset_id)
        }

        fn latest_marker_states(&self) -> Vec<MarkerState> {
            self.markers.lock().unwrap().clone()
        }

        fn server_description(&self) -> ServerDescription {
            ServerDescription {
                host_name: "capture-host".into(),
                host_app: "Motive".into(),
                host_app_version: "3.0.0".into(),
                natnet_version: "4.0".into(),
            }
        }

        fn enable_asset(&self, name: &str) -> crate::Result<()> {
            if self.known_assets.iter().any(|a| a == name) {
                Ok(())
            } else {
                Err(LinkError::InvalidArgument(format!("unknown asset: {name}")))
            }
        }

        fn disable_asset(&self, name: &str) -> crate::Result<()> {
            self.enable_asset(name)
        }
    }
}
