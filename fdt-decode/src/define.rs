//! Core type definitions and constants for FDT decoding.
//!
//! This module provides the magic number, the structure block tokens and
//! the small value types shared by every other module.

use core::fmt::{self, Display};

/// Magic number at offset 0 of every blob, stored big-endian.
pub const FDT_MAGIC: u32 = 0xd00dfeed;

/// Size in bytes of the version 17 header (ten big-endian `u32` fields).
pub const HEADER_SIZE: usize = 40;

/// Oldest header version the decoder accepts.
pub const FDT_FIRST_SUPPORTED_VERSION: u32 = 16;

/// Newest `last_comp_version` the decoder understands.
pub const FDT_LAST_SUPPORTED_VERSION: u32 = 17;

const FDT_BEGIN_NODE: u32 = 0x1;
const FDT_END_NODE: u32 = 0x2;
const FDT_PROP: u32 = 0x3;
const FDT_NOP: u32 = 0x4;
const FDT_END: u32 = 0x9;

/// One `(address, size)` pair of the memory reservation block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoryReservation {
    /// Start of the reserved physical range
    pub address: u64,
    /// Length of the range in bytes
    pub size: u64,
}

/// A 32-bit tag of the structure block.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Token {
    /// `FDT_BEGIN_NODE`, followed by the NUL-terminated node name
    BeginNode,
    /// `FDT_END_NODE`
    EndNode,
    /// `FDT_PROP`, followed by length, name offset and payload
    Prop,
    /// `FDT_NOP`
    Nop,
    /// `FDT_END`
    End,
    /// A value that is not a known tag
    Unknown(u32),
}

impl From<u32> for Token {
    fn from(raw: u32) -> Self {
        match raw {
            FDT_BEGIN_NODE => Token::BeginNode,
            FDT_END_NODE => Token::EndNode,
            FDT_PROP => Token::Prop,
            FDT_NOP => Token::Nop,
            FDT_END => Token::End,
            other => Token::Unknown(other),
        }
    }
}

impl From<Token> for u32 {
    fn from(token: Token) -> Self {
        match token {
            Token::BeginNode => FDT_BEGIN_NODE,
            Token::EndNode => FDT_END_NODE,
            Token::Prop => FDT_PROP,
            Token::Nop => FDT_NOP,
            Token::End => FDT_END,
            Token::Unknown(raw) => raw,
        }
    }
}

/// Position of a node inside the structure block.
///
/// The value is the byte offset of the node's `FDT_BEGIN_NODE` token,
/// counted from the start of the structure block, so the root node is
/// always at offset 0. An offset is only meaningful for the
/// [`DeviceTree`](crate::DeviceTree) that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct StructureOffset(usize);

impl StructureOffset {
    /// Offset of the root node.
    pub const ROOT: StructureOffset = StructureOffset(0);

    /// Wraps a raw offset. Queries on an offset that does not point at an
    /// `FDT_BEGIN_NODE` token fail with `CorruptStructure`.
    pub const fn new(offset: usize) -> Self {
        Self(offset)
    }

    /// Returns the offset as a `usize`.
    pub fn as_usize(&self) -> usize {
        self.0
    }
}

impl Display for StructureOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
