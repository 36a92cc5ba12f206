//! Protocol error types.

use thiserror::Error;

/// Errors that can occur while encoding or decoding wire payloads.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The inbound payload is not a valid command per the wire schema.
    /// The message is discarded; the connection stays open.
    #[error("malformed message: {0}")]
    MalformedMessage(serde_json::Error),

    /// The game state failed to serialize.
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),
}
