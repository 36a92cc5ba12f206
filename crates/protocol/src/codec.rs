//! JSON codec for state snapshots and client commands.

use crate::{ClientCommand, GameState, ProtocolError};

/// Serialize the full game state into a wire payload.
///
/// An empty state encodes as `{"players":{}}`.
pub fn encode_state(state: &GameState) -> Result<String, ProtocolError> {
    serde_json::to_string(state).map_err(ProtocolError::Encode)
}

/// Decode an inbound payload into a typed client command.
///
/// Fails with [`ProtocolError::MalformedMessage`] on anything that is
/// not a valid command; the caller discards the message and keeps the
/// connection open.
pub fn decode_command(payload: &str) -> Result<ClientCommand, ProtocolError> {
    serde_json::from_str(payload).map_err(ProtocolError::MalformedMessage)
}
