//! The closed command set and its payload sub-parsers
//!
//! Dispatch is a pure lookup on the lower-cased command token. The set is
//! closed: anything else maps to `None` and the dispatcher ignores it
//! without a reply, matching the behavior deployed clients rely on.

use std::str::FromStr;

use crate::error::{LinkError, Result};

/// Protocol command, parsed case-insensitively from the command token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Connectivity probe; answered with the literal `connected`
    EchoSocket,
    /// Capture-host description as JSON
    ServerDescription,
    /// Enable a named asset in the capture software
    EnableAsset,
    /// Disable a named asset in the capture software
    DisableAsset,
    /// Capture the current pose as the calibration origin (id 0 clears)
    ResetOrigin,
    /// Switch the active asset and read its pose or marker layout
    GetPosition,
    /// Install the per-axis tolerance window
    SetRange,
    /// Test the live pose against origin and tolerance
    CheckRange,
    /// Echo the installed tolerance window
    GetRange,
    /// Clear the tracking buffer and begin capturing
    StartTracking,
    /// Stop capturing, retaining the buffer
    EndTracking,
    /// Count buffered samples out of range of the live pose
    CheckTracking,
    /// List all unlabeled markers
    GetAllMarkers,
}

impl Command {
    /// Look up a command token, case-insensitively
    pub fn parse(token: &str) -> Option<Command> {
        match token.to_ascii_lowercase().as_str() {
            "echosocket" => Some(Command::EchoSocket),
            "serverdescription" => Some(Command::ServerDescription),
            "enableasset" => Some(Command::EnableAsset),
            "disableasset" => Some(Command::DisableAsset),
            "resetorigin" => Some(Command::ResetOrigin),
            "getposition" => Some(Command::GetPosition),
            "setrange" => Some(Command::SetRange),
            "checkrange" => Some(Command::CheckRange),
            "getrange" => Some(Command::GetRange),
            "starttracking" => Some(Command::StartTracking),
            "endtracking" => Some(Command::EndTracking),
            "checktracking" => Some(Command::CheckTracking),
            "getallmarkers" => Some(Command::GetAllMarkers),
            _ => None,
        }
    }
}

/// What a `getposition` query asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    /// The flattened pose projection
    RigidBody,
    /// The marker layout of the rigid-body definition
    Markers,
}

/// Parsed `getposition` payload: `<id>$<RigidBody|Markers>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetQuery {
    pub id: i32,
    pub kind: AssetKind,
}

impl FromStr for AssetQuery {
    type Err = LinkError;

    fn from_str(payload: &str) -> Result<AssetQuery> {
        let (id_token, kind_token) = payload.split_once('$').ok_or_else(|| {
            LinkError::MalformedMessage(format!("missing '$' in getposition payload {payload:?}"))
        })?;

        let id = parse_asset_id(id_token)?;

        let kind = if kind_token.eq_ignore_ascii_case("RigidBody") {
            AssetKind::RigidBody
        } else if kind_token.eq_ignore_ascii_case("Markers") {
            AssetKind::Markers
        } else {
            return Err(LinkError::InvalidArgument(format!(
                "unknown asset kind: {kind_token:?}"
            )));
        };

        Ok(AssetQuery { id, kind })
    }
}

/// Parse a decimal asset id token
pub fn parse_asset_id(token: &str) -> Result<i32> {
    token
        .trim()
        .parse::<i32>()
        .map_err(|_| LinkError::InvalidArgument(format!("asset id is not an integer: {token:?}")))
}
