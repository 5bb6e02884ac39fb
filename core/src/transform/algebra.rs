//! Transform algebra: apply, merge and collide
//!
//! These are the stateless operations the consistency model is built on:
//!
//! - **apply**: produce new content from content + transform
//! - **merge**: fold two pending local transforms into one
//! - **collide**: reconcile a remote and a local transform that happened
//!   concurrently, so each stays valid once the other has been applied
//!
//! # Convergence
//!
//! For content `C` and two transforms `a` (remote) and `b` (local) that are
//! both valid against `C`, after `collide(&mut a, &mut b)`:
//!
//! ```text
//! apply(b', apply(a, C)) == apply(a', apply(b, C))
//! ```
//!
//! # Example
//!
//! ```rust
//! use cotext_core::{transform, CodepointText, Transform};
//!
//! let content = CodepointText::from("hello world");
//! let mut remote = Transform::insert(11, "!");
//! let mut local = Transform::insert(6, "crazy ");
//!
//! let local_first = transform::apply(&local, &content);
//! let remote_first = transform::apply(&remote, &content);
//!
//! transform::collide(&mut remote, &mut local);
//!
//! assert_eq!(
//!     transform::apply(&remote, &local_first),
//!     transform::apply(&local, &remote_first),
//! );
//! ```

use super::Transform;
use crate::text::CodepointText;

/// Apply a transform to content, producing new content.
///
/// Offsets are clamped to the content bounds; the consistency model is what
/// guarantees a transform is applied against the content it was written for.
pub fn apply(transform: &Transform, content: &CodepointText) -> CodepointText {
    let len = content.len();
    let start = transform.position.min(len);
    let end = transform.position.saturating_add(transform.num_delete).min(len);

    CodepointText::concat(&[
        &content.slice(0, start),
        &transform.insert,
        &content.slice_from(end.max(start)),
    ])
}

/// Fold `second` into `first`, both local transforms in submission order.
///
/// Returns `true` and rewrites `first` when the two can be expressed as one
/// transform. Returns `false` and leaves both untouched when their targets
/// are disjoint; they must then be sent separately, in order.
pub fn merge(first: &mut Transform, second: &Transform) -> bool {
    let first_len = first.insert.len();

    // Second continues right where first's insertion ends
    if first.position + first_len == second.position {
        first.insert = CodepointText::concat(&[&first.insert, &second.insert]);
        first.num_delete += second.num_delete;
        return true;
    }

    // Second targets the same point: it edits first's insertion from the start
    if second.position == first.position {
        let remainder = second.num_delete.saturating_sub(first_len);
        first.num_delete += remainder;
        first.insert = CodepointText::concat(&[
            &second.insert,
            &first.insert.slice_from(second.num_delete),
        ]);
        return true;
    }

    // Second starts inside first's insertion
    if second.position > first.position && second.position < first.position + first_len {
        let overlap = second.position - first.position;
        let remainder = second.num_delete.saturating_sub(first_len - overlap);
        first.num_delete += remainder;
        first.insert = CodepointText::concat(&[
            &first.insert.slice(0, overlap),
            &second.insert,
            &first.insert.slice_from(overlap + second.num_delete),
        ]);
        return true;
    }

    false
}

/// Reconcile a remote (authority-ordered) and a local transform that were
/// both written against the same content.
///
/// Afterwards `remote` is valid against content that already has `local`
/// applied, and `local` is valid against content that already has `remote`
/// applied. On equal positions the remote transform counts as the earlier one.
pub fn collide(remote: &mut Transform, local: &mut Transform) {
    if remote.position <= local.position {
        collide_ordered(remote, local);
    } else {
        collide_ordered(local, remote);
    }
}

fn collide_ordered(earlier: &mut Transform, later: &mut Transform) {
    let earlier_len = earlier.insert.len();
    let later_len = later.insert.len();

    if earlier.num_delete == 0 {
        later.position += earlier_len;
    } else if earlier.position + earlier.num_delete <= later.position {
        // Earlier's deleted span ends at or before later starts
        later.position = later.position + earlier_len - earlier.num_delete;
    } else {
        let gap = later.position - earlier.position;
        let excess = earlier.num_delete.saturating_sub(gap);

        if excess > later.num_delete {
            // Later sits entirely inside earlier's deletion: earlier absorbs it
            earlier.num_delete = earlier.num_delete + later_len - later.num_delete;
            earlier.insert = CodepointText::concat(&[&earlier.insert, &later.insert]);
        } else {
            earlier.num_delete = gap;
        }

        later.num_delete = later.num_delete.saturating_sub(excess);
        later.position = earlier.position + earlier_len;
    }
}
