//! Sync marker search.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Two-byte value marking the start of a frame.
///
/// Serialized as its big-endian `u16` value; deserializes from either a JSON
/// number (`2111`) or a hex string (`"0x083F"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "PatternRepr")]
pub struct SyncPattern([u8; 2]);

impl SyncPattern {
    pub const fn new(bytes: [u8; 2]) -> Self {
        Self(bytes)
    }

    pub const fn from_u16(value: u16) -> Self {
        Self(value.to_be_bytes())
    }

    pub const fn as_u16(&self) -> u16 {
        u16::from_be_bytes(self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<SyncPattern> for u16 {
    fn from(pattern: SyncPattern) -> Self {
        pattern.as_u16()
    }
}

impl fmt::Display for SyncPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06X}", self.as_u16())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PatternRepr {
    Number(u16),
    Text(String),
}

impl TryFrom<PatternRepr> for SyncPattern {
    type Error = String;

    fn try_from(repr: PatternRepr) -> Result<Self, Self::Error> {
        match repr {
            PatternRepr::Number(value) => Ok(Self::from_u16(value)),
            PatternRepr::Text(text) => {
                let digits = text
                    .strip_prefix("0x")
                    .or_else(|| text.strip_prefix("0X"))
                    .unwrap_or(&text);
                u16::from_str_radix(digits, 16)
                    .map(Self::from_u16)
                    .map_err(|e| format!("invalid sync pattern {text:?}: {e}"))
            }
        }
    }
}

/// Index of the first occurrence of `pattern` in `buffer`.
///
/// An empty pattern matches at 0.
pub fn locate(buffer: &[u8], pattern: &[u8]) -> Option<usize> {
    locate_from(buffer, pattern, 0)
}

/// Same as [`locate`], ignoring matches that start before `start`.
///
/// The returned index is relative to the whole buffer.
pub fn locate_from(buffer: &[u8], pattern: &[u8], start: usize) -> Option<usize> {
    let haystack = buffer.get(start..)?;
    if pattern.is_empty() {
        return Some(start);
    }
    haystack
        .windows(pattern.len())
        .position(|window| window == pattern)
        .map(|idx| idx + start)
}
