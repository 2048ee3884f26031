//! Stateful command dispatcher
//!
//! Maps each inbound `COMMAND#PAYLOAD` message to a handler, validates the
//! payload, reads or mutates the shared session state, and produces the
//! encoded reply. Handlers run directly on the receiving connection's task,
//! concurrently with other clients' handlers and with the pose-feed tick;
//! every state access goes through the [`SharedState`] guard and no lock is
//! held across an await or a socket write.
//!
//! Reply policy (externally observable, preserved exactly):
//! - recognized command → its reply, delivered via the transport's
//!   broadcast primitive
//! - configuration error → explicit `ERROR#...` reply
//! - malformed/invalid message → no reply, logged
//! - unrecognized command → no reply at all

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::error::{LinkError, Result};
use crate::protocol::codec;
use crate::protocol::command::{parse_asset_id, AssetKind, AssetQuery, Command};
use crate::protocol::types::{Marker, Transform};
use crate::session::{is_ranged, SharedState};
use crate::source::MocapSource;

/// Reply to `echosocket`
const ECHO_REPLY: &str = "connected";

/// Command state machine over the shared session state
pub struct CommandDispatcher {
    state: SharedState,
    source: Arc<dyn MocapSource>,
    settle_delay: Duration,
    network_compensation: bool,
}

impl CommandDispatcher {
    pub fn new(
        state: SharedState,
        source: Arc<dyn MocapSource>,
        settle_delay: Duration,
        network_compensation: bool,
    ) -> Self {
        CommandDispatcher {
            state,
            source,
            settle_delay,
            network_compensation,
        }
    }

    /// Decode one raw inbound message and run its handler
    ///
    /// Returns the encoded reply to broadcast, or `None` when the message
    /// produces no reply (malformed input, invalid argument, unknown
    /// command).
    pub async fn handle_message(&self, raw: &[u8]) -> Option<Bytes> {
        let text = match std::str::from_utf8(raw).map_err(LinkError::from) {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "dropping non-text message");
                return None;
            }
        };

        let (command_token, payload) = match codec::split(text) {
            Ok(parts) => parts,
            Err(e) => {
                warn!(error = %e, "dropping malformed message");
                return None;
            }
        };

        let command = match Command::parse(command_token) {
            Some(command) => command,
            None => {
                // Silent ignore is part of the observed protocol surface.
                debug!(token = command_token, "ignoring unrecognized command");
                return None;
            }
        };

        debug!(?command, payload, "dispatching");

        match self.dispatch(command, payload).await {
            Ok(reply) => Some(reply),
            Err(err @ LinkError::Configuration(_)) => {
                warn!(?command, error = %err, "command rejected");
                Some(codec::encode_error(&err))
            }
            Err(err) => {
                warn!(?command, error = %err, "dropping command");
                None
            }
        }
    }

    async fn dispatch(&self, command: Command, payload: &str) -> Result<Bytes> {
        match command {
            Command::EchoSocket => Ok(codec::encode_text(ECHO_REPLY)),
            Command::ServerDescription => codec::encode_json(&self.source.server_description()),
            Command::EnableAsset => {
                self.source.enable_asset(payload)?;
                Ok(codec::ack())
            }
            Command::DisableAsset => {
                self.source.disable_asset(payload)?;
                Ok(codec::ack())
            }
            Command::ResetOrigin => self.reset_origin(payload).await,
            Command::GetPosition => self.get_position(payload).await,
            Command::SetRange => self.set_range(payload),
            Command::CheckRange => self.check_range(),
            Command::GetRange => self.get_range(),
            Command::StartTracking => self.start_tracking(),
            Command::EndTracking => self.end_tracking(),
            Command::CheckTracking => self.check_tracking(),
            Command::GetAllMarkers => self.get_all_markers(),
        }
    }

    /// Switch the active asset and wait for the feed to settle
    ///
    /// The id switch and re-registration happen under the guard; the settle
    /// sleep does not, so it blocks only this handler's task.
    async fn change_rigid_body(&self, asset_id: i32) {
        {
            let mut state = self.state.lock();
            state.asset_id = asset_id;
            self.source.register_rigid_body(asset_id);
        }
        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }
    }

    async fn reset_origin(&self, payload: &str) -> Result<Bytes> {
        let asset_id = parse_asset_id(payload)?;

        // Id 0 means "uncalibrate", not "calibrate asset 0".
        if asset_id == 0 {
            self.state.lock().clear_calibration();
            debug!("calibration cleared");
            return Ok(codec::ack());
        }

        self.change_rigid_body(asset_id).await;

        let mut state = self.state.lock();
        let pose = self
            .source
            .latest_rigid_body_state(state.asset_id, self.network_compensation)
            .ok_or_else(|| {
                LinkError::Configuration(format!("no pose reported yet for asset {asset_id}"))
            })?;
        state.latest_pose = Some(pose);
        state.calibrate(pose);
        Ok(codec::ack())
    }

    async fn get_position(&self, payload: &str) -> Result<Bytes> {
        let query: AssetQuery = payload.parse()?;

        // Selecting the asset is a side effect of the read.
        self.change_rigid_body(query.id).await;

        match query.kind {
            AssetKind::RigidBody => {
                let mut state = self.state.lock();
                let pose = self
                    .source
                    .latest_rigid_body_state(state.asset_id, self.network_compensation)
                    .ok_or_else(|| {
                        LinkError::Configuration(format!(
                            "no pose reported yet for asset {}",
                            query.id
                        ))
                    })?;
                state.latest_pose = Some(pose);
                codec::encode_json(&Transform::from_pose(&pose, state.origin()))
            }
            AssetKind::Markers => {
                let mut state = self.state.lock();
                let definition = self
                    .source
                    .rigid_body_definition(state.asset_id)
                    .ok_or_else(|| {
                        LinkError::InvalidArgument(format!(
                            "no rigid-body definition for asset {}",
                            query.id
                        ))
                    })?;
                let pose = self
                    .source
                    .latest_rigid_body_state(state.asset_id, self.network_compensation)
                    .ok_or_else(|| {
                        LinkError::Configuration(format!(
                            "no pose reported yet for asset {}",
                            query.id
                        ))
                    })?;
                state.latest_pose = Some(pose);

                let markers: Vec<Marker> = (0..definition.markers.len())
                    .map(|index| Marker::from_definition(&definition, index, &pose))
                    .collect();
                state.rigid_body = Some(definition);
                codec::encode_json_array(&markers)
            }
        }
    }

    fn set_range(&self, payload: &str) -> Result<Bytes> {
        let wire: Transform = serde_json::from_str(payload)?;
        let window = wire.into_tolerance()?;
        self.state.lock().tolerance = Some(window);
        debug!(?window, "tolerance window installed");
        Ok(codec::ack())
    }

    fn check_range(&self) -> Result<Bytes> {
        let state = self.state.lock();
        let tolerance = state.tolerance.as_ref().ok_or_else(|| {
            LinkError::Configuration("tolerance window not set; call setrange first".into())
        })?;
        let origin = state.origin().ok_or_else(|| {
            LinkError::Configuration("no calibration origin; call resetorigin first".into())
        })?;
        let live = state.latest_pose.as_ref().ok_or_else(|| {
            LinkError::Configuration("no pose received from the capture feed yet".into())
        })?;
        Ok(codec::encode_flag(is_ranged(origin, live, tolerance)))
    }

    fn get_range(&self) -> Result<Bytes> {
        let state = self.state.lock();
        let tolerance = state.tolerance.as_ref().ok_or_else(|| {
            LinkError::Configuration("tolerance window not set; call setrange first".into())
        })?;
        codec::encode_json(&Transform::from_tolerance(tolerance))
    }

    fn start_tracking(&self) -> Result<Bytes> {
        let mut state = self.state.lock();
        state.tracking.start();
        Ok(codec::encode_count(state.tracking.len()))
    }

    fn end_tracking(&self) -> Result<Bytes> {
        let mut state = self.state.lock();
        state.tracking.stop();
        Ok(codec::encode_count(state.tracking.len()))
    }

    fn check_tracking(&self) -> Result<Bytes> {
        let state = self.state.lock();
        let tolerance = state.tolerance.as_ref().ok_or_else(|| {
            LinkError::Configuration("tolerance window not set; call setrange first".into())
        })?;
        let live = state.latest_pose.as_ref().ok_or_else(|| {
            LinkError::Configuration("no pose received from the capture feed yet".into())
        })?;
        let count = state.tracking.out_of_range_count(live, tolerance);
        Ok(codec::encode_count(count))
    }

    fn get_all_markers(&self) -> Result<Bytes> {
        let markers: Vec<Marker> = self
            .source
            .latest_marker_states()
            .iter()
            .filter(|m| !m.labeled)
            .map(Marker::from_state)
            .collect();
        codec::encode_json_array(&markers)
    }
}
