//! Shared session state and its concurrency guard
//!
//! All mutable server state lives in one [`SessionState`] behind one mutex:
//! command handlers (one per connection task) and the pose-feed tick are the
//! only writers. Handlers compute their reply inside the critical section,
//! release, and only then touch the socket, so a slow peer never stalls
//! unrelated clients on the lock.

pub mod calibration;
pub mod tracking;

use std::sync::{Arc, Mutex, PoisonError};

pub use calibration::{is_ranged, ToleranceWindow};
pub use tracking::TrackingBuffer;

use crate::source::{Pose, RigidBodyDefinition};

/// The mutable model: active asset, latest pose, calibration, tolerance,
/// tracking buffer
///
/// The calibration invariant, `calibrated()` implies an origin is present,
/// is held by keeping the origin private behind `calibrate`/`clear_calibration`.
#[derive(Debug, Default)]
pub struct SessionState {
    pub asset_id: i32,
    pub latest_pose: Option<Pose>,
    pub rigid_body: Option<RigidBodyDefinition>,
    pub tolerance: Option<ToleranceWindow>,
    pub tracking: TrackingBuffer,
    origin: Option<Pose>,
}

impl SessionState {
    pub fn new(asset_id: i32) -> Self {
        SessionState {
            asset_id,
            ..SessionState::default()
        }
    }

    /// Capture `origin` as the zero reference for relative reads
    pub fn calibrate(&mut self, origin: Pose) {
        self.origin = Some(origin);
    }

    /// Drop the calibration origin (asset id 0 on `resetorigin`)
    pub fn clear_calibration(&mut self) {
        self.origin = None;
    }

    pub fn origin(&self) -> Option<&Pose> {
        self.origin.as_ref()
    }

    pub fn calibrated(&self) -> bool {
        self.origin.is_some()
    }
}

/// Cloneable handle to the mutex-guarded [`SessionState`]
///
/// Lock poisoning is absorbed: every mutation is a plain assignment, so a
/// panicking holder cannot leave the state half-written.
#[derive(Debug, Clone, Default)]
pub struct SharedState(Arc<Mutex<SessionState>>);

impl SharedState {
    pub fn new(asset_id: i32) -> Self {
        SharedState(Arc::new(Mutex::new(SessionState::new(asset_id))))
    }

    pub fn lock(&self) -> std::sync::MutexGuard<'_, SessionState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
