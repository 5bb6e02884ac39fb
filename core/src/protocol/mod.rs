//! Wire protocol messages
//!
//! Inbound messages use a `{type, body}` envelope. Outbound messages are
//! commands addressed to the authority.
//!
//! ```text
//! inbound:  { "type": "subscribe",   "body": { "document": { "id", "content", "version" } } }
//!           { "type": "unsubscribe", "body": { "document": { "id" } } }
//!           { "type": "transforms",  "body": { "document": { "id" }, "transforms": [..] } }
//!           { "type": "correction",  "body": { "document": { "id" }, "version": 4 } }
//!           { "type": "error",       "body": <any> }
//!           { "type": "pong",        "body": <any> }
//!
//! outbound: { "command": "submit", "document": { "id" }, "transform": { .. } }
//!           { "command": "create", "document": { "content" } }
//!           { "command": "subscribe", "document": { "id" } }
//!           { "command": "unsubscribe", "document": { "id" } }
//!           { "command": "ping" }
//! ```

pub mod serialize;

use crate::error::{Result, SyncError};
use crate::transform::Transform;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use serialize::{decode_message, encode_message};

/// A full document snapshot delivered on subscribe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    pub id: String,
    pub content: String,
    pub version: u64,
}

/// Reference to a document by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub id: String,
}

impl DocumentRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Initial content of a document the authority should create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDocument {
    pub content: String,
}

/// Body of an inbound `subscribe` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeBody {
    pub document: DocumentSnapshot,
}

/// Body of an inbound `unsubscribe` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsubscribeBody {
    pub document: DocumentRef,
}

/// Body of an inbound `transforms` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformsBody {
    pub document: DocumentRef,
    pub transforms: Vec<Transform>,
}

/// Body of an inbound `correction` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionBody {
    pub document: DocumentRef,
    #[serde(deserialize_with = "crate::transform::deserialize_version")]
    pub version: u64,
}

/// A message received from the authority.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    Subscribe(SubscribeBody),
    Unsubscribe(UnsubscribeBody),
    Transforms(TransformsBody),
    Correction(CorrectionBody),
    Error(Value),
    Pong(Value),
}

impl InboundMessage {
    /// Decode a `{type, body}` envelope.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut envelope) = value else {
            return Err(SyncError::InvalidMessage(
                "message was not a JSON object".to_string(),
            ));
        };

        let kind = match envelope.remove("type") {
            Some(Value::String(kind)) => kind,
            _ => {
                return Err(SyncError::InvalidMessage(
                    "message did not contain a valid type".to_string(),
                ))
            }
        };
        let body = envelope.remove("body").unwrap_or(Value::Null);

        let message = match kind.as_str() {
            "subscribe" => InboundMessage::Subscribe(body_of(&kind, body)?),
            "unsubscribe" => InboundMessage::Unsubscribe(body_of(&kind, body)?),
            "transforms" => InboundMessage::Transforms(body_of(&kind, body)?),
            "correction" => InboundMessage::Correction(body_of(&kind, body)?),
            "error" => InboundMessage::Error(body),
            "pong" => InboundMessage::Pong(body),
            other => {
                return Err(SyncError::InvalidMessage(format!(
                    "message type was not recognised: {}",
                    other
                )))
            }
        };
        Ok(message)
    }

    /// Document this message is addressed to, if any
    pub fn document_id(&self) -> Option<&str> {
        match self {
            InboundMessage::Subscribe(body) => Some(&body.document.id),
            InboundMessage::Unsubscribe(body) => Some(&body.document.id),
            InboundMessage::Transforms(body) => Some(&body.document.id),
            InboundMessage::Correction(body) => Some(&body.document.id),
            InboundMessage::Error(_) | InboundMessage::Pong(_) => None,
        }
    }

    /// Human-readable error text carried by an `error` message.
    pub fn error_text(body: &Value) -> String {
        match body {
            Value::String(s) => s.clone(),
            Value::Object(map) => match map.get("message").or(map.get("error")) {
                Some(Value::String(s)) => s.clone(),
                _ => body.to_string(),
            },
            Value::Null => "server sent undeterminable error".to_string(),
            other => other.to_string(),
        }
    }
}

fn body_of<T: DeserializeOwned>(kind: &str, body: Value) -> Result<T> {
    serde_json::from_value(body)
        .map_err(|e| SyncError::InvalidMessage(format!("invalid {} body: {}", kind, e)))
}

/// A command sent to the authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum OutboundMessage {
    Submit {
        document: DocumentRef,
        transform: Transform,
    },
    Create {
        document: NewDocument,
    },
    Subscribe {
        document: DocumentRef,
    },
    Unsubscribe {
        document: DocumentRef,
    },
    Ping,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_inbound_transforms_shape() {
        let msg = InboundMessage::from_value(json!({
            "type": "transforms",
            "body": {
                "document": { "id": "doc" },
                "transforms": [{ "position": "6", "insert": "x", "version": 2 }]
            }
        }))
        .unwrap();

        assert_eq!(msg.document_id(), Some("doc"));
        match msg {
            InboundMessage::Transforms(body) => {
                assert_eq!(body.transforms, vec![Transform::insert(6, "x").with_version(2)]);
            }
            other => panic!("Expected transforms, got {:?}", other),
        }
    }

    #[test]
    fn test_inbound_pong_without_body() {
        let msg = InboundMessage::from_value(json!({ "type": "pong" })).unwrap();
        assert_eq!(msg, InboundMessage::Pong(Value::Null));
        assert_eq!(msg.document_id(), None);
    }

    #[test]
    fn test_inbound_correction_coerces_version() {
        let msg = InboundMessage::from_value(json!({
            "type": "correction",
            "body": { "document": { "id": "doc" }, "version": "6" }
        }))
        .unwrap();
        assert_eq!(
            msg,
            InboundMessage::Correction(CorrectionBody {
                document: DocumentRef::new("doc"),
                version: 6,
            })
        );
    }

    #[test]
    fn test_inbound_rejects_bad_envelopes() {
        assert!(matches!(
            InboundMessage::from_value(json!([1, 2])),
            Err(SyncError::InvalidMessage(_))
        ));
        assert!(matches!(
            InboundMessage::from_value(json!({ "body": {} })),
            Err(SyncError::InvalidMessage(_))
        ));
        assert!(matches!(
            InboundMessage::from_value(json!({ "type": "chat", "body": {} })),
            Err(SyncError::InvalidMessage(_))
        ));
        assert!(matches!(
            InboundMessage::from_value(json!({ "type": "transforms", "body": { "transforms": [] } })),
            Err(SyncError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_inbound_invalid_transform_is_rejected() {
        let err = InboundMessage::from_value(json!({
            "type": "transforms",
            "body": {
                "document": { "id": "doc" },
                "transforms": [{ "position": "NaN", "version": 2 }]
            }
        }))
        .unwrap_err();
        assert!(err.to_string().contains("position"));
    }

    #[test]
    fn test_outbound_submit_shape() {
        let msg = OutboundMessage::Submit {
            document: DocumentRef::new("doc"),
            transform: Transform::insert(6, "crazy ").with_version(2),
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "command": "submit",
                "document": { "id": "doc" },
                "transform": { "position": 6, "num_delete": 0, "insert": "crazy ", "version": 2 }
            })
        );
        assert_eq!(
            serde_json::to_value(OutboundMessage::Ping).unwrap(),
            json!({ "command": "ping" })
        );
    }

    #[test]
    fn test_outbound_create_shape() {
        let msg = OutboundMessage::Create {
            document: NewDocument {
                content: "hello 🙁".to_string(),
            },
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({ "command": "create", "document": { "content": "hello 🙁" } })
        );
    }

    #[test]
    fn test_error_text() {
        assert_eq!(InboundMessage::error_text(&json!("boom")), "boom");
        assert_eq!(
            InboundMessage::error_text(&json!({ "message": "denied" })),
            "denied"
        );
        assert_eq!(
            InboundMessage::error_text(&json!(null)),
            "server sent undeterminable error"
        );
        assert_eq!(InboundMessage::error_text(&json!(42)), "42");
    }
}
