//! Client configuration
//!
//! Every field has a default, so a partial JSON object (or `{}`) is a valid
//! configuration.
//!
//! ```rust
//! use cotext_core::ClientConfig;
//!
//! let config = ClientConfig::from_json(r#"{ "heartbeat_interval_ms": 1000 }"#).unwrap();
//! assert_eq!(config.heartbeat_interval_ms, 1000);
//! assert!(config.coalesce_local_edits);
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a [`Client`](crate::Client) and the bindings it feeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Period at which the host should ping an idle connection
    pub heartbeat_interval_ms: u64,

    /// Merge each submitted edit into the last queued one while a send is in
    /// flight. Queued edits are always merged when promoted.
    pub coalesce_local_edits: bool,

    /// Check editor buffers for desync after replaying inbound transforms
    pub verify_after_apply: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: 5000,
            coalesce_local_edits: true,
            verify_after_apply: true,
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from JSON, filling missing fields with defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_heartbeat_interval_ms(mut self, millis: u64) -> Self {
        self.heartbeat_interval_ms = millis;
        self
    }

    pub fn with_coalesce_local_edits(mut self, coalesce: bool) -> Self {
        self.coalesce_local_edits = coalesce;
        self
    }

    pub fn with_verify_after_apply(mut self, verify: bool) -> Self {
        self.verify_after_apply = verify;
        self
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }
}
