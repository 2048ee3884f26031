//! Error types for the mocap command server
//!
//! This module defines all error types that can occur while decoding,
//! dispatching, and answering protocol commands.

use thiserror::Error;

/// Unified error type for the command server
///
/// All fallible operations in this library return `Result<T, LinkError>`.
#[derive(Error, Debug)]
pub enum LinkError {
    /// Message could not be split into a command and a payload
    ///
    /// This error occurs when:
    /// - The `#` delimiter is missing from an inbound message
    /// - A required payload sub-token is absent (e.g. no `$` in a
    ///   `getposition` payload)
    ///
    /// The offending message is dropped and the connection stays open.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// Payload was well-formed but its content is not usable
    ///
    /// This error occurs when:
    /// - An asset id is not a decimal integer
    /// - An asset-kind token is neither `RigidBody` nor `Markers`
    /// - The mocap source rejects an asset name
    /// - A tolerance payload carries a negative magnitude
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A command was issued before the state it depends on exists
    ///
    /// This error occurs when:
    /// - `checkrange`/`checktracking`/`getrange` run before `setrange`
    /// - `checkrange` runs with no calibration origin
    /// - A range check runs before any pose arrived from the feed
    ///
    /// Unlike the kinds above, this one is answered on the wire as an
    /// explicit error reply rather than a false boolean.
    #[error("not configured: {0}")]
    Configuration(String),

    /// I/O error during socket communication
    ///
    /// Wraps standard library I/O errors: bind failures, resets by peer,
    /// broken pipes. Transport loops recover from these per connection;
    /// they never terminate the process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Inbound bytes are not valid UTF-8
    ///
    /// The wire encoding is single-byte ASCII-safe text; anything that
    /// fails UTF-8 validation is treated like a malformed message.
    #[error("message is not valid text: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// JSON encoding or decoding failed
    ///
    /// Occurs for unparseable `setrange` payloads and (in principle) for
    /// reply serialization, which cannot fail for the types used here.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for command-server operations
pub type Result<T> = std::result::Result<T, LinkError>;
