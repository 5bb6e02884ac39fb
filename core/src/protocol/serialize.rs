// Serialization layer - Convert protocol messages to/from JSON text frames
//!
//! The authority speaks JSON over a persistent duplex connection. Each frame
//! holds exactly one message.

use super::{InboundMessage, OutboundMessage};
use crate::error::{Result, SyncError};

/// Serialize an outbound command to a text frame
pub fn encode_message(msg: &OutboundMessage) -> Result<String> {
    serde_json::to_string(msg).map_err(SyncError::from)
}

/// Deserialize an inbound message from a text frame
pub fn decode_message(frame: &str) -> Result<InboundMessage> {
    let value: serde_json::Value = serde_json::from_str(frame)
        .map_err(|e| SyncError::InvalidMessage(format!("failed to parse frame: {}", e)))?;
    InboundMessage::from_value(value)
}
