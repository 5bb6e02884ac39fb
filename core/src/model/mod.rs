//! ConsistencyModel: per-document OT state machine
//!
//! Tracks inbound and outbound transforms for one open document and tells the
//! caller, at each step, what to apply locally and what to transmit.
//!
//! # States
//!
//! - **Ready**: no send in flight; received transforms apply immediately
//! - **Sending**: one local transform is in flight, optimistically versioned
//!   `version + 1`, awaiting the authority's correction
//! - **Buffering**: the correction for our send has arrived, but remote
//!   transforms ordered before it are still outstanding
//!
//! At most one local transform is outstanding at any time. Further local
//! edits are merged into, or queued behind, the pending ones.
//!
//! # Example
//!
//! ```rust
//! use cotext_core::{Action, ConsistencyModel, Transform};
//!
//! let mut model = ConsistencyModel::new(1);
//!
//! let action = model.submit(Transform::insert(6, "crazy ")).unwrap();
//! match action {
//!     Action::Send(t) => assert_eq!(t.version, Some(2)),
//!     other => panic!("unexpected action: {:?}", other),
//! }
//!
//! // The authority accepted our transform as version 2
//! let action = model.correct(2).unwrap();
//! assert_eq!(action, Action::Apply(vec![]));
//! assert_eq!(model.version(), 2);
//! ```

use crate::error::{Result, SyncError};
use crate::transform::{self, Transform};
use std::collections::VecDeque;
use std::fmt;
use tracing::{debug, trace};

/// State of a [`ConsistencyModel`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    Ready,
    Sending,
    Buffering,
}

impl fmt::Display for ModelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelState::Ready => write!(f, "READY"),
            ModelState::Sending => write!(f, "SENDING"),
            ModelState::Buffering => write!(f, "BUFFERING"),
        }
    }
}

/// What the caller must do after a model operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Nothing to do
    None,

    /// Apply these transforms to the local document, in order
    Apply(Vec<Transform>),

    /// Transmit this transform to the authority
    Send(Transform),

    /// Apply the transforms locally, then transmit the transform
    SendAndApply(Transform, Vec<Transform>),
}

impl Action {
    /// Transforms to apply locally, if any
    pub fn to_apply(&self) -> Option<&[Transform]> {
        match self {
            Action::Apply(ts) | Action::SendAndApply(_, ts) => Some(ts),
            _ => None,
        }
    }

    /// Transform to transmit, if any
    pub fn to_send(&self) -> Option<&Transform> {
        match self {
            Action::Send(t) | Action::SendAndApply(t, _) => Some(t),
            _ => None,
        }
    }
}

/// Per-document consistency model.
#[derive(Debug, Clone)]
pub struct ConsistencyModel {
    state: ModelState,

    /// Last authority-ordered transform fully incorporated
    version: u64,

    /// Version the authority assigned to `sending` (valid while Buffering)
    corrected_version: u64,

    /// Remote transforms received but not yet safe to apply
    unapplied: Vec<Transform>,

    /// Local transforms not yet transmitted
    unsent: VecDeque<Transform>,

    /// The local transform in flight
    sending: Option<Transform>,

    /// Whether `submit` folds new edits into the last queued one
    coalesce: bool,
}

impl ConsistencyModel {
    /// Create a model at the authority-supplied base version
    pub fn new(base_version: u64) -> Self {
        Self {
            state: ModelState::Ready,
            version: base_version,
            corrected_version: 0,
            unapplied: Vec::new(),
            unsent: VecDeque::new(),
            sending: None,
            coalesce: true,
        }
    }

    /// Enable or disable merging each submitted edit into the last queued
    /// one. Queued edits are still merged into a single send on promotion.
    pub fn with_coalescing(mut self, coalesce: bool) -> Self {
        self.coalesce = coalesce;
        self
    }

    pub fn state(&self) -> ModelState {
        self.state
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Version of the in-flight send, once corrected
    pub fn corrected_version(&self) -> Option<u64> {
        match self.state {
            ModelState::Buffering => Some(self.corrected_version),
            _ => None,
        }
    }

    pub fn sending(&self) -> Option<&Transform> {
        self.sending.as_ref()
    }

    pub fn unsent_len(&self) -> usize {
        self.unsent.len()
    }

    pub fn unapplied_len(&self) -> usize {
        self.unapplied.len()
    }

    /// Submit a local transform that has already been applied to the
    /// local document.
    pub fn submit(&mut self, mut transform: Transform) -> Result<Action> {
        if transform.is_noop() {
            trace!("ignoring no-op transform at {}", transform.position);
            return Ok(Action::None);
        }

        match self.state {
            ModelState::Ready => {
                transform.version = Some(self.version + 1);
                self.state = ModelState::Sending;
                self.sending = Some(transform.clone());
                debug!("sending transform version {}", self.version + 1);
                Ok(Action::Send(transform))
            }
            ModelState::Sending | ModelState::Buffering => {
                let merged = self.coalesce
                    && self
                        .unsent
                        .back_mut()
                        .is_some_and(|last| transform::merge(last, &transform));
                if !merged {
                    self.unsent.push_back(transform);
                }
                trace!(
                    "queued local transform (merged: {}, unsent: {})",
                    merged,
                    self.unsent.len()
                );
                Ok(Action::None)
            }
        }
    }

    /// Receive authority-ordered transforms.
    ///
    /// The first transform must carry `version + unapplied + 1`; otherwise the
    /// session is out of sync and nothing is changed.
    pub fn receive(&mut self, transforms: Vec<Transform>) -> Result<Action> {
        let Some(first) = transforms.first() else {
            return Ok(Action::None);
        };

        let expected = self.version + self.unapplied.len() as u64 + 1;
        if first.version != Some(expected) {
            return Err(SyncError::VersionMismatch {
                expected,
                received: first.version,
            });
        }

        match self.state {
            ModelState::Ready => {
                self.version += transforms.len() as u64;
                trace!("applying {} transforms, now at {}", transforms.len(), self.version);
                Ok(Action::Apply(transforms))
            }
            ModelState::Sending => {
                self.unapplied.extend(transforms);
                trace!("buffered remote transforms ({} unapplied)", self.unapplied.len());
                Ok(Action::None)
            }
            ModelState::Buffering => {
                self.unapplied.extend(transforms);
                Ok(self.resolve())
            }
        }
    }

    /// Receive the authority's version for our in-flight transform.
    pub fn correct(&mut self, version: u64) -> Result<Action> {
        match self.state {
            ModelState::Sending => {
                debug!("send corrected to version {}", version);
                self.state = ModelState::Buffering;
                self.corrected_version = version;
                Ok(self.resolve())
            }
            state => Err(SyncError::UnexpectedCorrection { state }),
        }
    }

    /// Settle the Buffering state once every remote transform ordered before
    /// our send has arrived.
    fn resolve(&mut self) -> Action {
        if self.state != ModelState::Buffering {
            return Action::None;
        }

        let available = self.version + self.unapplied.len() as u64;
        if available < self.corrected_version.saturating_sub(1) {
            trace!(
                "waiting for {} more transforms",
                self.corrected_version.saturating_sub(1) - available
            );
            return Action::None;
        }

        self.version += self.unapplied.len() as u64 + 1;

        let mut unapplied = std::mem::take(&mut self.unapplied);
        let mut sending = self.sending.take();
        for remote in unapplied.iter_mut() {
            for local in sending.iter_mut().chain(self.unsent.iter_mut()) {
                transform::collide(remote, local);
            }
        }

        // Collisions can cancel local edits out entirely
        self.unsent.retain(|t| !t.is_noop());

        match self.promote() {
            Some(mut next) => {
                next.version = Some(self.version + 1);
                self.sending = Some(next.clone());
                self.state = ModelState::Sending;
                debug!(
                    "resolved at version {}, sending version {}",
                    self.version,
                    self.version + 1
                );
                Action::SendAndApply(next, unapplied)
            }
            None => {
                self.state = ModelState::Ready;
                debug!("resolved at version {}", self.version);
                Action::Apply(unapplied)
            }
        }
    }

    /// Fold the front of `unsent` into one transform to send next. Queued
    /// edits always merge here, whatever the coalescing setting. Merges that
    /// cancel out are dropped and the following entry is tried instead.
    fn promote(&mut self) -> Option<Transform> {
        while let Some(mut next) = self.unsent.pop_front() {
            while let Some(following) = self.unsent.front() {
                if !transform::merge(&mut next, following) {
                    break;
                }
                self.unsent.pop_front();
            }
            if next.is_noop() {
                trace!("dropping queued edits that cancelled out at {}", next.position);
                continue;
            }
            return Some(next);
        }
        None
    }
}
