//! Cotext Core - Client-side consistency engine for collaborative text
//!
//! This is the Rust core of Cotext, compiled to both native and WASM.
//! It implements:
//! - Codepoint-indexed text that never splits a character
//! - The transform algebra (apply, merge, collide)
//! - A per-document consistency model that keeps a client in step with the
//!   authority ordering everyone's edits
//! - The JSON wire protocol and a connection object that drives models
//! - Editor bindings with desync detection
//!
//! # Examples
//!
//! ```rust
//! use cotext_core::{transform, Action, CodepointText, ConsistencyModel, Transform};
//!
//! let mut content = CodepointText::from("hello world");
//! let mut model = ConsistencyModel::new(1);
//!
//! // A local edit is applied immediately and sent
//! let local = Transform::insert(6, "testing ");
//! content = transform::apply(&local, &content);
//! assert!(matches!(model.submit(local).unwrap(), Action::Send(_)));
//!
//! // Someone else's edits arrive before our send is acknowledged
//! model.receive(vec![
//!     Transform::insert(11, " you fool").with_version(2),
//!     Transform::new(2, 3, "y").with_version(3),
//! ]).unwrap();
//!
//! // The authority accepted ours as version 4
//! let action = model.correct(4).unwrap();
//! for t in action.to_apply().unwrap_or_default() {
//!     content = transform::apply(t, &content);
//! }
//! assert_eq!(content, "hey testing world you fool");
//! ```

pub mod binding;
pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod protocol;
pub mod text;
pub mod transform;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-exports for convenience
pub use binding::{BufferBinding, EditorBuffer};
pub use client::{Client, Event, EventKind, Transport};
pub use config::ClientConfig;
pub use error::{Result, SyncError};
pub use model::{Action, ConsistencyModel, ModelState};
pub use protocol::{InboundMessage, OutboundMessage};
pub use text::CodepointText;
pub use transform::Transform;
