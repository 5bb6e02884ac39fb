//! Client: one connection to the authority
//!
//! A client owns the transport, a [`ConsistencyModel`] per subscribed
//! document and the list of event handlers. The host feeds it inbound frames
//! with [`Client::handle_frame`] and local edits with
//! [`Client::submit_transform`]; everything the host must do in response is
//! delivered as an [`Event`].
//!
//! # Example
//!
//! ```rust
//! use cotext_core::{Client, ClientConfig, Event, EventKind, Transform};
//! use std::sync::{Arc, Mutex};
//!
//! let mut client = Client::connect(Vec::<String>::new(), ClientConfig::default());
//!
//! let applied = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&applied);
//! client.on(EventKind::Transforms, move |event| {
//!     if let Event::Transforms { transforms, .. } = event {
//!         sink.lock().unwrap().extend(transforms.iter().cloned());
//!     }
//! });
//!
//! client.handle_frame(
//!     r#"{"type":"subscribe","body":{"document":{"id":"doc","content":"hello world","version":1}}}"#,
//! ).unwrap();
//! client.submit_transform("doc", Transform::insert(6, "crazy ")).unwrap();
//! assert_eq!(client.transport().len(), 1);
//! ```

pub mod events;

use crate::config::ClientConfig;
use crate::error::{Result, SyncError};
use crate::model::{Action, ConsistencyModel};
use crate::protocol::{
    decode_message, encode_message, DocumentRef, InboundMessage, NewDocument, OutboundMessage,
};
use crate::transform::Transform;
use std::collections::HashMap;
use tracing::{debug, instrument, trace, warn};
use uuid::Uuid;

pub use events::{Event, EventKind, Handler, Observers};

/// Outbound half of a connection to the authority.
pub trait Transport {
    /// Transmit one text frame
    fn send(&mut self, frame: String) -> Result<()>;
}

/// Recording transport, keeps every frame it is given.
impl Transport for Vec<String> {
    fn send(&mut self, frame: String) -> Result<()> {
        self.push(frame);
        Ok(())
    }
}

/// A connection to the authority.
pub struct Client<T: Transport> {
    session_id: Uuid,
    transport: T,
    config: ClientConfig,
    models: HashMap<String, ConsistencyModel>,
    observers: Observers,
    closed: bool,
}

impl<T: Transport> Client<T> {
    /// Wrap an established transport
    pub fn connect(transport: T, config: ClientConfig) -> Self {
        let session_id = Uuid::new_v4();
        debug!(%session_id, "connection opened");
        Self {
            session_id,
            transport,
            config,
            models: HashMap::new(),
            observers: Observers::new(),
            closed: false,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Model for a subscribed document
    pub fn model(&self, document_id: &str) -> Option<&ConsistencyModel> {
        self.models.get(document_id)
    }

    /// Ids of every subscribed document
    pub fn documents(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    /// Register a handler for every event of `kind`
    pub fn on<F>(&mut self, kind: EventKind, handler: F)
    where
        F: FnMut(&Event) + Send + 'static,
    {
        self.observers.on(kind, Box::new(handler));
    }

    /// Register a handler for the next event of `kind` only
    pub fn on_next<F>(&mut self, kind: EventKind, handler: F)
    where
        F: FnMut(&Event) + Send + 'static,
    {
        self.observers.on_next(kind, Box::new(handler));
    }

    /// Remove every handler registered for `kind`
    pub fn clear_handlers(&mut self, kind: EventKind) {
        self.observers.clear(kind);
    }

    /// Ask the authority to open a document
    pub fn subscribe(&mut self, document_id: &str) -> Result<()> {
        self.ensure_open()?;
        self.send(&OutboundMessage::Subscribe {
            document: DocumentRef::new(document_id),
        })
    }

    /// Ask the authority to create a document holding `content`. The
    /// document opens once the authority answers with a `subscribe`.
    pub fn create_document(&mut self, content: &str) -> Result<()> {
        self.ensure_open()?;
        self.send(&OutboundMessage::Create {
            document: NewDocument {
                content: content.to_string(),
            },
        })
    }

    /// Ask the authority to close a document
    pub fn unsubscribe(&mut self, document_id: &str) -> Result<()> {
        self.ensure_open()?;
        if !self.models.contains_key(document_id) {
            return Err(SyncError::UnknownDocument(document_id.to_string()));
        }
        self.send(&OutboundMessage::Unsubscribe {
            document: DocumentRef::new(document_id),
        })
    }

    /// Keep an idle connection alive
    pub fn ping(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.send(&OutboundMessage::Ping)
    }

    /// Submit a local edit that the host has already applied to its copy.
    #[instrument(skip(self, transform), fields(position = transform.position))]
    pub fn submit_transform(&mut self, document_id: &str, transform: Transform) -> Result<()> {
        self.ensure_open()?;
        let Some(model) = self.models.get_mut(document_id) else {
            return Err(SyncError::UnknownDocument(document_id.to_string()));
        };

        let outcome = model
            .submit(transform)
            .and_then(|action| self.perform(document_id, action));
        outcome.map_err(|e| self.fail(Some(document_id), e))
    }

    /// Process one inbound frame from the authority.
    pub fn handle_frame(&mut self, frame: &str) -> Result<()> {
        self.ensure_open()?;
        trace!(frame, "inbound frame");

        let message = decode_message(frame).map_err(|e| self.fail(None, e))?;
        let document_id = message.document_id().map(str::to_string);
        self.dispatch(message).map_err(|e| {
            let from_server = matches!(e, SyncError::Server(_));
            let e = self.fail(document_id.as_deref(), e);
            if from_server {
                self.close();
            }
            e
        })
    }

    /// Close the connection, discarding every document and handler.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.models.clear();
        debug!(session_id = %self.session_id, "connection closed");
        self.observers.emit(&Event::Disconnect);
        self.observers.clear_all();
    }

    fn dispatch(&mut self, message: InboundMessage) -> Result<()> {
        match message {
            InboundMessage::Subscribe(body) => {
                let document = body.document;
                debug!(document_id = %document.id, version = document.version, "subscribed");
                let model = ConsistencyModel::new(document.version)
                    .with_coalescing(self.config.coalesce_local_edits);
                self.models.insert(document.id.clone(), model);
                self.observers.emit(&Event::Subscribe { document });
                Ok(())
            }
            InboundMessage::Unsubscribe(body) => {
                let document_id = body.document.id;
                if self.models.remove(&document_id).is_none() {
                    return Err(SyncError::UnknownDocument(document_id));
                }
                debug!(%document_id, "unsubscribed");
                self.observers.emit(&Event::Unsubscribe { document_id });
                Ok(())
            }
            InboundMessage::Transforms(body) => {
                let document_id = body.document.id;
                let action = self.model_mut(&document_id)?.receive(body.transforms)?;
                self.perform(&document_id, action)
            }
            InboundMessage::Correction(body) => {
                let document_id = body.document.id;
                let action = self.model_mut(&document_id)?.correct(body.version)?;
                self.perform(&document_id, action)
            }
            InboundMessage::Error(body) => Err(SyncError::Server(InboundMessage::error_text(&body))),
            InboundMessage::Pong(_) => {
                trace!("pong");
                Ok(())
            }
        }
    }

    fn model_mut(&mut self, document_id: &str) -> Result<&mut ConsistencyModel> {
        self.models
            .get_mut(document_id)
            .ok_or_else(|| SyncError::UnknownDocument(document_id.to_string()))
    }

    /// Carry out a model action: apply first, then transmit.
    fn perform(&mut self, document_id: &str, action: Action) -> Result<()> {
        if let Some(transforms) = action.to_apply() {
            if !transforms.is_empty() {
                self.observers.emit(&Event::Transforms {
                    document_id: document_id.to_string(),
                    transforms: transforms.to_vec(),
                });
            }
        }
        if let Some(transform) = action.to_send() {
            self.send(&OutboundMessage::Submit {
                document: DocumentRef::new(document_id),
                transform: transform.clone(),
            })?;
        }
        Ok(())
    }

    fn send(&mut self, message: &OutboundMessage) -> Result<()> {
        let frame = encode_message(message)?;
        trace!(frame = %frame, "outbound frame");
        self.transport.send(frame)
    }

    /// Report an error to the handlers, discarding the document when it is
    /// fatal. Returns the error for propagation.
    fn fail(&mut self, document_id: Option<&str>, error: SyncError) -> SyncError {
        let fatal = error.is_fatal();
        warn!(document_id = document_id.unwrap_or("-"), fatal, "{}", error);
        if fatal {
            if let Some(id) = document_id {
                self.models.remove(id);
            }
        }
        self.observers.emit(&Event::Error {
            document_id: document_id.map(str::to_string),
            message: error.to_string(),
            fatal,
        });
        error
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(SyncError::Closed)
        } else {
            Ok(())
        }
    }
}

impl<T: Transport> Drop for Client<T> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<T: Transport> std::fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("session_id", &self.session_id)
            .field("documents", &self.models.len())
            .field("observers", &self.observers)
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    fn subscribed(content: &str, version: u64) -> Client<Vec<String>> {
        let mut client = Client::connect(Vec::new(), ClientConfig::default());
        client
            .handle_frame(
                &json!({
                    "type": "subscribe",
                    "body": { "document": { "id": "doc", "content": content, "version": version } }
                })
                .to_string(),
            )
            .unwrap();
        client
    }

    fn sent(client: &Client<Vec<String>>) -> Vec<Value> {
        client
            .transport()
            .iter()
            .map(|f| serde_json::from_str(f).unwrap())
            .collect()
    }

    fn record(client: &mut Client<Vec<String>>, kind: EventKind) -> Arc<Mutex<Vec<Event>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        client.on(kind, move |e| sink.lock().unwrap().push(e.clone()));
        seen
    }

    #[test]
    fn test_subscribe_creates_model() {
        let client = subscribed("hello", 3);
        assert_eq!(client.model("doc").map(|m| m.version()), Some(3));
        assert_eq!(client.documents().collect::<Vec<_>>(), vec!["doc"]);
    }

    #[test]
    fn test_commands() {
        let mut client = subscribed("hello", 1);
        client.subscribe("other").unwrap();
        client.ping().unwrap();
        client.unsubscribe("doc").unwrap();

        assert_eq!(
            sent(&client),
            vec![
                json!({ "command": "subscribe", "document": { "id": "other" } }),
                json!({ "command": "ping" }),
                json!({ "command": "unsubscribe", "document": { "id": "doc" } }),
            ]
        );
    }

    #[test]
    fn test_create_document() {
        let mut client = Client::connect(Vec::new(), ClientConfig::default());
        let subscribed = record(&mut client, EventKind::Subscribe);

        client.create_document("fresh text").unwrap();
        assert_eq!(
            sent(&client),
            vec![json!({ "command": "create", "document": { "content": "fresh text" } })]
        );
        assert!(client.model("new-doc").is_none());

        client
            .handle_frame(
                r#"{"type":"subscribe","body":{"document":{"id":"new-doc","content":"fresh text","version":1}}}"#,
            )
            .unwrap();
        assert_eq!(client.model("new-doc").map(|m| m.version()), Some(1));
        assert_eq!(subscribed.lock().unwrap().len(), 1);

        client.close();
        assert!(matches!(client.create_document(""), Err(SyncError::Closed)));
    }

    #[test]
    fn test_submit_unknown_document() {
        let mut client = Client::connect(Vec::new(), ClientConfig::default());
        let err = client
            .submit_transform("nope", Transform::insert(0, "x"))
            .unwrap_err();
        assert!(matches!(err, SyncError::UnknownDocument(id) if id == "nope"));
    }

    #[test]
    fn test_submit_sends_versioned_transform() {
        let mut client = subscribed("hello world", 1);
        client
            .submit_transform("doc", Transform::insert(6, "crazy "))
            .unwrap();

        assert_eq!(
            sent(&client),
            vec![json!({
                "command": "submit",
                "document": { "id": "doc" },
                "transform": { "position": 6, "num_delete": 0, "insert": "crazy ", "version": 2 }
            })]
        );
    }

    #[test]
    fn test_transforms_event() {
        let mut client = subscribed("hello world", 1);
        let seen = record(&mut client, EventKind::Transforms);

        client
            .handle_frame(
                r#"{"type":"transforms","body":{"document":{"id":"doc"},"transforms":[{"position":0,"insert":">","version":2}]}}"#,
            )
            .unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![Event::Transforms {
                document_id: "doc".to_string(),
                transforms: vec![Transform::insert(0, ">").with_version(2)],
            }]
        );
    }

    #[test]
    fn test_fatal_error_discards_model() {
        let mut client = subscribed("hello world", 1);
        let errors = record(&mut client, EventKind::Error);

        let err = client
            .handle_frame(
                r#"{"type":"transforms","body":{"document":{"id":"doc"},"transforms":[{"position":0,"insert":">","version":5}]}}"#,
            )
            .unwrap_err();

        assert!(matches!(err, SyncError::VersionMismatch { expected: 2, .. }));
        assert!(client.model("doc").is_none());
        assert!(!client.is_closed());
        let errors = errors.lock().unwrap();
        match &errors[..] {
            [Event::Error {
                document_id,
                fatal,
                ..
            }] => {
                assert_eq!(document_id.as_deref(), Some("doc"));
                assert!(*fatal);
            }
            other => panic!("Expected one error event, got {:?}", other),
        };
    }

    #[test]
    fn test_invalid_frame_is_not_fatal() {
        let mut client = subscribed("hello world", 1);
        let errors = record(&mut client, EventKind::Error);

        assert!(client.handle_frame(r#"{"type":"bogus"}"#).is_err());
        assert!(client.model("doc").is_some());
        assert_eq!(errors.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_server_error_closes_connection() {
        let mut client = subscribed("hello world", 1);
        let errors = record(&mut client, EventKind::Error);
        let disconnects = record(&mut client, EventKind::Disconnect);

        let err = client
            .handle_frame(r#"{"type":"error","body":{"message":"document not found"}}"#)
            .unwrap_err();

        assert!(matches!(err, SyncError::Server(ref m) if m == "document not found"));
        assert!(client.is_closed());
        assert!(client.model("doc").is_none());
        assert_eq!(errors.lock().unwrap().len(), 1);
        assert_eq!(*disconnects.lock().unwrap(), vec![Event::Disconnect]);
        assert!(matches!(client.ping(), Err(SyncError::Closed)));
    }

    #[test]
    fn test_close_emits_disconnect_once() {
        let mut client = subscribed("hello world", 1);
        let disconnects = record(&mut client, EventKind::Disconnect);

        client.close();
        client.close();

        assert_eq!(disconnects.lock().unwrap().len(), 1);
        assert!(matches!(
            client.handle_frame(r#"{"type":"pong"}"#),
            Err(SyncError::Closed)
        ));
    }

    #[test]
    fn test_unsubscribe_event() {
        let mut client = subscribed("hello world", 1);
        let seen = record(&mut client, EventKind::Unsubscribe);

        client
            .handle_frame(r#"{"type":"unsubscribe","body":{"document":{"id":"doc"}}}"#)
            .unwrap();

        assert!(client.model("doc").is_none());
        assert_eq!(
            *seen.lock().unwrap(),
            vec![Event::Unsubscribe {
                document_id: "doc".to_string()
            }]
        );
    }

    #[test]
    fn test_coalescing_follows_config() {
        let mut client = Client::connect(
            Vec::new(),
            ClientConfig::default().with_coalesce_local_edits(false),
        );
        client
            .handle_frame(
                r#"{"type":"subscribe","body":{"document":{"id":"doc","content":"","version":1}}}"#,
            )
            .unwrap();

        client.submit_transform("doc", Transform::insert(0, "a")).unwrap();
        client.submit_transform("doc", Transform::insert(1, "b")).unwrap();
        client.submit_transform("doc", Transform::insert(2, "c")).unwrap();

        assert_eq!(client.model("doc").map(|m| m.unsent_len()), Some(2));
    }
}
