//! Typed property values.
//!
//! DTB payloads carry no type information. [`PropertyValue::decode`] guesses
//! one from the property name and the payload length.

use alloc::{
    format,
    string::{String, ToString},
    vec::Vec,
};
use core::fmt;

/// A decoded property payload.
///
/// Values own their data and stay valid after the tree is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    /// Nothing could be decoded (an empty `compatible`)
    Absent,
    /// A C string with its final byte removed
    Text(String),
    /// Big-endian 32-bit cells rendered as `0x`-prefixed lowercase hex
    NumberList(Vec<String>),
    /// A presence-only property; always `true`
    Flag(bool),
    /// A payload that fits none of the other shapes
    Bytes(Vec<u8>),
}

impl PropertyValue {
    /// Decodes `payload` of the property called `name`.
    ///
    /// Rules, first match wins:
    /// 1. `compatible` is text minus its final byte (empty -> `Absent`).
    /// 2. A positive multiple of 4 bytes is a list of cells.
    /// 3. An empty payload is a flag.
    /// 4. A NUL-terminated UTF-8 string is text.
    /// 5. Anything else is kept as bytes.
    pub fn decode(name: &str, payload: &[u8]) -> Self {
        if name == "compatible" {
            return match payload.split_last() {
                Some((_, text)) => PropertyValue::Text(String::from_utf8_lossy(text).into_owned()),
                None => PropertyValue::Absent,
            };
        }

        if payload.is_empty() {
            return PropertyValue::Flag(true);
        }

        if payload.len() % 4 == 0 {
            let cells = payload
                .chunks_exact(4)
                .map(|c| format!("{:#x}", u32::from_be_bytes([c[0], c[1], c[2], c[3]])))
                .collect();
            return PropertyValue::NumberList(cells);
        }

        if let Some((&0, text)) = payload.split_last() {
            if let Ok(s) = core::str::from_utf8(text) {
                return PropertyValue::Text(s.to_string());
            }
        }

        PropertyValue::Bytes(payload.to_vec())
    }

    /// Returns the text if this is a `Text` value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the rendered cells if this is a `NumberList` value.
    pub fn as_cells(&self) -> Option<&[String]> {
        match self {
            PropertyValue::NumberList(cells) => Some(cells),
            _ => None,
        }
    }

    /// Whether this is a presence-only flag.
    pub fn is_flag(&self) -> bool {
        matches!(self, PropertyValue::Flag(_))
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Absent => write!(f, "<absent>"),
            PropertyValue::Text(s) => {
                // string lists keep their separators; show them the DTS way
                write!(f, "\"")?;
                for (i, part) in s.split('\0').enumerate() {
                    if i > 0 {
                        write!(f, "\", \"")?;
                    }
                    write!(f, "{}", part.escape_debug())?;
                }
                write!(f, "\"")
            }
            PropertyValue::NumberList(cells) => write!(f, "<{}>", cells.join(" ")),
            PropertyValue::Flag(_) => Ok(()),
            PropertyValue::Bytes(bytes) => {
                write!(f, "[")?;
                for (i, b) in bytes.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{:02x}", b)?;
                }
                write!(f, "]")
            }
        }
    }
}
