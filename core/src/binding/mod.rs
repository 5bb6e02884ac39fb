//! Editor bindings
//!
//! An editor widget keeps its own buffer. A [`BufferBinding`] tracks the
//! content the consistency model believes the document holds, turns widget
//! edits into transforms and replays inbound transforms onto the widget,
//! checking afterwards that the two still agree.

use crate::error::{Result, SyncError};
use crate::text::CodepointText;
use crate::transform::{self, Transform};
use tracing::{trace, warn};

/// Text storage of an editor widget, addressed in codepoints.
pub trait EditorBuffer {
    /// Full buffer content
    fn text(&self) -> String;

    /// Length in codepoints
    fn len_chars(&self) -> usize;

    /// Delete `num_delete` codepoints at `position`, then insert `insert`
    /// there. Out-of-range offsets are clamped.
    fn replace(&mut self, position: usize, num_delete: usize, insert: &str);
}

impl EditorBuffer for String {
    fn text(&self) -> String {
        self.clone()
    }

    fn len_chars(&self) -> usize {
        self.chars().count()
    }

    fn replace(&mut self, position: usize, num_delete: usize, insert: &str) {
        let start = byte_offset(self, position);
        let end = byte_offset(self, position.saturating_add(num_delete));
        self.replace_range(start..end, insert);
    }
}

/// Byte offset of codepoint `index`, or the end of the string.
fn byte_offset(s: &str, index: usize) -> usize {
    s.char_indices()
        .nth(index)
        .map(|(offset, _)| offset)
        .unwrap_or(s.len())
}

#[cfg(feature = "rope")]
impl EditorBuffer for ropey::Rope {
    fn text(&self) -> String {
        self.to_string()
    }

    fn len_chars(&self) -> usize {
        ropey::Rope::len_chars(self)
    }

    fn replace(&mut self, position: usize, num_delete: usize, insert: &str) {
        let len = ropey::Rope::len_chars(self);
        let start = position.min(len);
        let end = position.saturating_add(num_delete).min(len);
        self.remove(start..end);
        self.insert(start, insert);
    }
}

/// Keeps an editor buffer in step with one document.
#[derive(Debug, Clone)]
pub struct BufferBinding<B: EditorBuffer> {
    document_id: String,
    content: CodepointText,
    buffer: B,
    verify: bool,
}

impl<B: EditorBuffer> BufferBinding<B> {
    /// Bind a buffer that currently holds the subscribed content
    pub fn new(document_id: impl Into<String>, buffer: B) -> Self {
        let content = CodepointText::from(buffer.text());
        Self {
            document_id: document_id.into(),
            content,
            buffer,
            verify: true,
        }
    }

    /// Enable or disable the desync check after [`apply`](Self::apply)
    pub fn with_verification(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    /// Content as tracked on the model's side
    pub fn content(&self) -> &CodepointText {
        &self.content
    }

    pub fn buffer(&self) -> &B {
        &self.buffer
    }

    pub fn into_buffer(self) -> B {
        self.buffer
    }

    /// Record a widget edit and return the transform to submit.
    pub fn edit(&mut self, position: usize, num_delete: usize, insert: &str) -> Transform {
        let len = self.content.len();
        let position = position.min(len);
        let num_delete = num_delete.min(len - position);

        let transform = Transform::new(position, num_delete, insert);
        self.content = transform::apply(&transform, &self.content);
        self.buffer.replace(position, num_delete, insert);
        transform
    }

    /// Replay inbound transforms onto the widget in order.
    pub fn apply(&mut self, transforms: &[Transform]) -> Result<()> {
        for t in transforms {
            trace!(
                document_id = %self.document_id,
                position = t.position,
                num_delete = t.num_delete,
                "replaying transform"
            );
            self.content = transform::apply(t, &self.content);
            self.buffer.replace(t.position, t.num_delete, t.insert.as_str());
        }

        if self.verify {
            self.verify()?;
        }
        Ok(())
    }

    /// Check that the widget still holds the tracked content
    pub fn verify(&self) -> Result<()> {
        let text = self.buffer.text();
        if text == self.content.as_str() {
            return Ok(());
        }

        let error = SyncError::Desync {
            document_id: self.document_id.clone(),
            expected: self.content.len(),
            actual: self.buffer.len_chars(),
        };
        warn!("{}", error);
        Err(error)
    }
}
