//! Wire codec for the `COMMAND#PAYLOAD` text protocol
//!
//! Inbound messages are newline-free single-byte text split on the first
//! `#`. Replies are compact ASCII: bare decimals and `"1"`/`"0"` for counts
//! and flags, JSON for structured values. Marker lists travel inside an
//! `{"Items":[...]}` envelope because that is the array shape deployed
//! clients deserialize against.

use bytes::Bytes;
use serde::Serialize;

use crate::error::{LinkError, Result};

/// Separator between the command token and the payload token
pub const COMMAND_DELIMITER: char = '#';

/// Split a raw message into `(command, payload)`
///
/// Fails with [`LinkError::MalformedMessage`] when the delimiter is absent.
/// The payload is passed through unmodified; an empty payload is valid
/// (`"checkrange#"`).
pub fn split(message: &str) -> Result<(&str, &str)> {
    match message.split_once(COMMAND_DELIMITER) {
        Some((command, payload)) => Ok((command, payload)),
        None => Err(LinkError::MalformedMessage(format!(
            "missing '{COMMAND_DELIMITER}' delimiter in {message:?}"
        ))),
    }
}

/// Literal `"1"` acknowledgment
pub fn ack() -> Bytes {
    Bytes::from_static(b"1")
}

/// `"1"` / `"0"` boolean reply
pub fn encode_flag(value: bool) -> Bytes {
    if value {
        Bytes::from_static(b"1")
    } else {
        Bytes::from_static(b"0")
    }
}

/// ASCII decimal reply
pub fn encode_count(value: usize) -> Bytes {
    Bytes::from(value.to_string())
}

/// Literal text reply
pub fn encode_text(value: &str) -> Bytes {
    Bytes::from(value.to_owned())
}

/// Bare JSON object reply
pub fn encode_json<T: Serialize>(value: &T) -> Result<Bytes> {
    Ok(Bytes::from(serde_json::to_vec(value)?))
}

#[derive(Serialize)]
struct ArrayEnvelope<'a, T> {
    #[serde(rename = "Items")]
    items: &'a [T],
}

/// JSON array reply, wrapped in the `{"Items":[...]}` envelope
pub fn encode_json_array<T: Serialize>(items: &[T]) -> Result<Bytes> {
    encode_json(&ArrayEnvelope { items })
}

/// Explicit error reply, `ERROR#<message>`
///
/// Only configuration errors are answered this way; malformed or invalid
/// messages are dropped without a reply.
pub fn encode_error(err: &LinkError) -> Bytes {
    Bytes::from(format!("ERROR{COMMAND_DELIMITER}{err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_command_and_payload() {
        let (command, payload) = split("getposition#3$RigidBody").unwrap();
        assert_eq!(command, "getposition");
        assert_eq!(payload, "3$RigidBody");
    }

    #[test]
    fn test_split_empty_payload() {
        let (command, payload) = split("checkrange#").unwrap();
        assert_eq!(command, "checkrange");
        assert_eq!(payload, "");
    }

    #[test]
    fn test_split_keeps_extra_delimiters_in_payload() {
        let (command, payload) = split("setrange#{\"X\":1}#tail").unwrap();
        assert_eq!(command, "setrange");
        assert_eq!(payload, "{\"X\":1}#tail");
    }

    #[test]
    fn test_split_missing_delimiter() {
        let err = split("echosocket").unwrap_err();
        assert!(matches!(err, LinkError::MalformedMessage(_)));
    }

    #[test]
    fn test_flag_and_count() {
        assert_eq!(&encode_flag(true)[..], b"1");
        assert_eq!(&encode_flag(false)[..], b"0");
        assert_eq!(&encode_count(42)[..], b"42");
    }

    #[test]
    fn test_array_envelope() {
        #[derive(Serialize)]
        struct Item {
            #[serde(rename = "Id")]
            id: i32,
        }
        let encoded = encode_json_array(&[Item { id: 7 }]).unwrap();
        assert_eq!(&encoded[..], br#"{"Items":[{"Id":7}]}"#);
    }

    #[test]
    fn test_empty_array_envelope() {
        let encoded = encode_json_array::<i32>(&[]).unwrap();
        assert_eq!(&encoded[..], br#"{"Items":[]}"#);
    }

    #[test]
    fn test_error_reply_shape() {
        let err = LinkError::Configuration("tolerance window not set".into());
        let reply = encode_error(&err);
        let text = std::str::from_utf8(&reply).unwrap();
        assert!(text.starts_with("ERROR#"));
        assert!(text.contains("tolerance window not set"));
    }
}
