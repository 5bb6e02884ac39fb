//! CodepointText: a string with a lazily cached codepoint view
//!
//! Transform offsets count Unicode scalar values, never bytes or UTF-16 code
//! units. `CodepointText` holds either a `String` or a `Vec<char>` and derives
//! the other representation on first use, caching it afterwards.
//!
//! # Example
//!
//! ```rust
//! use cotext_core::CodepointText;
//!
//! let text = CodepointText::from("hello 🙁 world");
//!
//! assert_eq!(text.len(), 13);  // Not 16 (bytes) or 14 (UTF-16 units)
//! assert_eq!(text.chars()[6], '🙁');
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cell::OnceCell;
use std::fmt;

/// Text with both a string view and a codepoint-array view.
///
/// Values are treated as immutable: every operation that changes content
/// returns a new `CodepointText`, so the two cached views can never disagree.
#[derive(Clone, Default)]
pub struct CodepointText {
    text: OnceCell<String>,
    chars: OnceCell<Vec<char>>,
}

impl CodepointText {
    /// Create an empty text
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a transport string
    pub fn from_string(text: String) -> Self {
        Self {
            text: OnceCell::from(text),
            chars: OnceCell::new(),
        }
    }

    /// Wrap a precomputed codepoint array
    pub fn from_chars(chars: Vec<char>) -> Self {
        Self {
            text: OnceCell::new(),
            chars: OnceCell::from(chars),
        }
    }

    /// String view, joined from the codepoint array on first use
    pub fn as_str(&self) -> &str {
        self.text.get_or_init(|| {
            // Both cells empty only for `Default`, which is the empty string
            self.chars
                .get()
                .map(|chars| chars.iter().collect())
                .unwrap_or_default()
        })
    }

    /// Codepoint view, split from the string on first use
    pub fn chars(&self) -> &[char] {
        self.chars
            .get_or_init(|| self.as_str().chars().collect())
            .as_slice()
    }

    /// Number of codepoints
    pub fn len(&self) -> usize {
        self.chars().len()
    }

    /// Check if the text is empty
    pub fn is_empty(&self) -> bool {
        match (self.text.get(), self.chars.get()) {
            (Some(text), _) => text.is_empty(),
            (None, Some(chars)) => chars.is_empty(),
            (None, None) => true,
        }
    }

    /// Codepoints in `start..end`, clamped to the text bounds.
    pub fn slice(&self, start: usize, end: usize) -> CodepointText {
        let chars = self.chars();
        let end = end.min(chars.len());
        let start = start.min(end);
        CodepointText::from_chars(chars[start..end].to_vec())
    }

    /// Codepoints from `start` to the end, clamped.
    pub fn slice_from(&self, start: usize) -> CodepointText {
        self.slice(start, usize::MAX)
    }

    /// Concatenate several texts into a new one.
    pub fn concat(parts: &[&CodepointText]) -> CodepointText {
        let capacity = parts.iter().map(|p| p.len()).sum();
        let mut chars = Vec::with_capacity(capacity);
        for part in parts {
            chars.extend_from_slice(part.chars());
        }
        CodepointText::from_chars(chars)
    }

    /// Consume into the string representation.
    pub fn into_string(self) -> String {
        let Self { text, chars } = self;
        match text.into_inner() {
            Some(text) => text,
            None => chars
                .into_inner()
                .map(|chars| chars.into_iter().collect())
                .unwrap_or_default(),
        }
    }
}

impl PartialEq for CodepointText {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for CodepointText {}

impl PartialEq<str> for CodepointText {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for CodepointText {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl fmt::Debug for CodepointText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl fmt::Display for CodepointText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for CodepointText {
    fn from(text: String) -> Self {
        Self::from_string(text)
    }
}

impl From<&str> for CodepointText {
    fn from(text: &str) -> Self {
        Self::from_string(text.to_string())
    }
}

impl From<Vec<char>> for CodepointText {
    fn from(chars: Vec<char>) -> Self {
        Self::from_chars(chars)
    }
}

impl Serialize for CodepointText {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CodepointText {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(CodepointText::from_string)
    }
}
