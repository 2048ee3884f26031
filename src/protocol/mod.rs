//! Protocol implementation: message codec, command set, wire types
//!
//! Inbound messages are `COMMAND#PAYLOAD` text; replies are ASCII decimals,
//! flags, or JSON. See [`codec`] for the framing rules and [`command`] for
//! the closed command set.

pub mod codec;
pub mod command;
pub mod types;

// Re-export commonly used items
pub use codec::COMMAND_DELIMITER;
pub use command::{AssetKind, AssetQuery, Command};
pub use types::{Marker, Transform};
