//! Client events and the observer list they are delivered through

use crate::protocol::DocumentSnapshot;
use crate::transform::Transform;

/// Kinds of event a handler can be registered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Subscribe,
    Unsubscribe,
    Transforms,
    Error,
    Disconnect,
}

/// An event emitted by a [`Client`](super::Client)
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The authority opened a document for us
    Subscribe { document: DocumentSnapshot },

    /// A document was closed
    Unsubscribe { document_id: String },

    /// Transforms the host must apply to its copy of the document, in order
    Transforms {
        document_id: String,
        transforms: Vec<Transform>,
    },

    /// Something went wrong. When `fatal` is set the document (or, without a
    /// document id, the connection) is gone.
    Error {
        document_id: Option<String>,
        message: String,
        fatal: bool,
    },

    /// The connection was closed
    Disconnect,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Subscribe { .. } => EventKind::Subscribe,
            Event::Unsubscribe { .. } => EventKind::Unsubscribe,
            Event::Transforms { .. } => EventKind::Transforms,
            Event::Error { .. } => EventKind::Error,
            Event::Disconnect => EventKind::Disconnect,
        }
    }
}

/// Boxed event handler
pub type Handler = Box<dyn FnMut(&Event) + Send>;

struct Registration {
    kind: EventKind,
    once: bool,
    handler: Handler,
}

/// Ordered list of event handlers, owned by one connection.
#[derive(Default)]
pub struct Observers {
    registrations: Vec<Registration>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for every event of `kind`
    pub fn on(&mut self, kind: EventKind, handler: Handler) {
        self.registrations.push(Registration {
            kind,
            once: false,
            handler,
        });
    }

    /// Register a handler for the next event of `kind` only
    pub fn on_next(&mut self, kind: EventKind, handler: Handler) {
        self.registrations.push(Registration {
            kind,
            once: true,
            handler,
        });
    }

    /// Remove every handler registered for `kind`
    pub fn clear(&mut self, kind: EventKind) {
        self.registrations.retain(|r| r.kind != kind);
    }

    pub fn clear_all(&mut self) {
        self.registrations.clear();
    }

    /// Number of handlers registered for `kind`
    pub fn count(&self, kind: EventKind) -> usize {
        self.registrations.iter().filter(|r| r.kind == kind).count()
    }

    /// Deliver an event to its handlers in registration order
    pub fn emit(&mut self, event: &Event) {
        let kind = event.kind();
        self.registrations.retain_mut(|r| {
            if r.kind != kind {
                return true;
            }
            (r.handler)(event);
            !r.once
        });
    }
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("registrations", &self.registrations.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder() -> (Arc<Mutex<Vec<Event>>>, Handler) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, Box::new(move |e: &Event| sink.lock().unwrap().push(e.clone())))
    }

    #[test]
    fn test_emit_by_kind() {
        let mut observers = Observers::new();
        let (disconnects, handler) = recorder();
        observers.on(EventKind::Disconnect, handler);

        observers.emit(&Event::Unsubscribe {
            document_id: "doc".to_string(),
        });
        observers.emit(&Event::Disconnect);
        observers.emit(&Event::Disconnect);

        assert_eq!(disconnects.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_on_next_fires_once() {
        let mut observers = Observers::new();
        let (seen, handler) = recorder();
        observers.on_next(EventKind::Disconnect, handler);

        observers.emit(&Event::Disconnect);
        observers.emit(&Event::Disconnect);

        assert_eq!(seen.lock().unwrap().len(), 1);
        assert_eq!(observers.count(EventKind::Disconnect), 0);
    }

    #[test]
    fn test_clear() {
        let mut observers = Observers::new();
        let (seen, handler) = recorder();
        let (_, other) = recorder();
        observers.on(EventKind::Disconnect, handler);
        observers.on(EventKind::Error, other);

        observers.clear(EventKind::Disconnect);
        observers.emit(&Event::Disconnect);

        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(observers.count(EventKind::Error), 1);
    }
}
