//! Transforms: atomic delete-then-insert edits at a codepoint offset
//!
//! A transform removes `num_delete` codepoints starting at `position` and then
//! inserts `insert` at the same point. Once the authority has ordered it, it
//! also carries a `version`.
//!
//! Transforms arriving over the wire are loosely typed: numeric fields may be
//! numbers or numeric strings, and `insert` may be a string or an array of
//! codepoints. Deserialization coerces these and rejects anything else, so a
//! `Transform` value is always valid.
//!
//! # Example
//!
//! ```rust
//! use cotext_core::Transform;
//!
//! let t: Transform = serde_json::from_str(
//!     r#"{ "position": "6", "insert": "crazy " }"#
//! ).unwrap();
//!
//! assert_eq!(t.position, 6);
//! assert_eq!(t.num_delete, 0);
//! assert_eq!(t.version, None);
//! ```

pub mod algebra;

use crate::error::{Result, SyncError};
use crate::text::CodepointText;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub use algebra::{apply, collide, merge};

/// An edit expressed in codepoint offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transform {
    /// Codepoint offset where the edit starts
    pub position: usize,

    /// Number of codepoints removed starting at `position`
    pub num_delete: usize,

    /// Codepoints inserted after the deletion
    pub insert: CodepointText,

    /// Version assigned by the authority, `None` until submitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
}

impl Transform {
    /// Create an unversioned transform
    pub fn new(position: usize, num_delete: usize, insert: impl Into<CodepointText>) -> Self {
        Self {
            position,
            num_delete,
            insert: insert.into(),
            version: None,
        }
    }

    /// Pure insertion at `position`
    pub fn insert(position: usize, text: impl Into<CodepointText>) -> Self {
        Self::new(position, 0, text)
    }

    /// Pure deletion of `num_delete` codepoints at `position`
    pub fn delete(position: usize, num_delete: usize) -> Self {
        Self::new(position, num_delete, CodepointText::new())
    }

    /// Set the authority version
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self
    }

    /// A transform that neither deletes nor inserts. These are never transmitted.
    pub fn is_noop(&self) -> bool {
        self.num_delete == 0 && self.insert.is_empty()
    }

    /// Validate and coerce a loosely typed JSON transform.
    pub fn from_value(value: &Value) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| {
            SyncError::InvalidMessage(format!("transform was not an object: {}", value))
        })?;

        let position = match object.get("position") {
            Some(v) => coerce_count("position", v)?,
            None => return Err(SyncError::invalid_transform("position", "missing")),
        };
        let num_delete = match object.get("num_delete") {
            Some(Value::Null) | None => 0,
            Some(v) => coerce_count("num_delete", v)?,
        };
        let version = match object.get("version") {
            Some(Value::Null) | None => None,
            Some(v) => Some(coerce_u64("version", v)?),
        };
        let insert = match object.get("insert") {
            Some(Value::Null) | None => CodepointText::new(),
            Some(v) => coerce_insert(v)?,
        };

        Ok(Self {
            position,
            num_delete,
            insert,
            version,
        })
    }
}

impl<'de> Deserialize<'de> for Transform {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Transform::from_value(&value).map_err(serde::de::Error::custom)
    }
}

/// Deserialize a loosely typed version number, as used by corrections.
pub(crate) fn deserialize_version<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    coerce_u64("version", &value).map_err(serde::de::Error::custom)
}

/// Coerce a numeric-like JSON value into a non-negative integer.
///
/// Accepts integers, finite non-negative floats (truncated) and strings
/// holding a non-negative integer.
fn coerce_u64(field: &'static str, value: &Value) -> Result<u64> {
    match value {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Ok(u)
            } else {
                match n.as_f64() {
                    Some(f) if f.is_finite() && f >= 0.0 && f < u64::MAX as f64 => {
                        Ok(f.trunc() as u64)
                    }
                    _ => Err(SyncError::invalid_transform(
                        field,
                        format!("not a non-negative integer: {}", n),
                    )),
                }
            }
        }
        Value::String(s) => s.trim().parse::<u64>().map_err(|_| {
            SyncError::invalid_transform(field, format!("not a non-negative integer: {:?}", s))
        }),
        other => Err(SyncError::invalid_transform(
            field,
            format!("unexpected type: {}", other),
        )),
    }
}

/// Coerce a codepoint count or offset.
fn coerce_count(field: &'static str, value: &Value) -> Result<usize> {
    usize::try_from(coerce_u64(field, value)?)
        .map_err(|_| SyncError::invalid_transform(field, "out of range"))
}

fn coerce_insert(value: &Value) -> Result<CodepointText> {
    match value {
        Value::String(s) => Ok(CodepointText::from(s.as_str())),
        Value::Array(items) => {
            let mut chars = Vec::with_capacity(items.len());
            for item in items {
                let mut it = item.as_str().map(str::chars).ok_or_else(|| {
                    SyncError::invalid_transform("insert", format!("non-string codepoint: {}", item))
                })?;
                match (it.next(), it.next()) {
                    (Some(c), None) => chars.push(c),
                    _ => {
                        return Err(SyncError::invalid_transform(
                            "insert",
                            format!("array entry is not a single codepoint: {}", item),
                        ))
                    }
                }
            }
            Ok(CodepointText::from_chars(chars))
        }
        other => Err(SyncError::invalid_transform(
            "insert",
            format!("non-string value: {}", other),
        )),
    }
}
