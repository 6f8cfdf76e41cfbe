//! Errors that can occur while loading or querying a device tree.
//!
//! Every public operation returns `Result<_, FdtError>`. A failed query never
//! invalidates the [`DeviceTree`](crate::DeviceTree) it was run against.

use alloc::string::String;

use crate::define::{FDT_MAGIC, HEADER_SIZE};

/// The four classes of failure reported by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The buffer is not a usable DTB (bad magic, truncated, size mismatch)
    InvalidFormat,
    /// A well-formed path named a node that does not exist
    PathNotFound,
    /// The path string itself could not be interpreted
    InvalidPath,
    /// The structure or strings block violates the DTB grammar
    CorruptStructure,
}

/// Reasons a buffer is rejected by header validation.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatIssue {
    /// The buffer cannot hold a complete header
    #[error("buffer of {len} bytes is shorter than the {HEADER_SIZE}-byte header")]
    Truncated {
        /// Length of the buffer that was supplied
        len: usize,
    },
    /// The FDT magic number doesn't match the expected value
    #[error("invalid magic number {0:#x} != {FDT_MAGIC:#x}")]
    BadMagic(u32),
    /// The declared total size is larger than the buffer or smaller than the header
    #[error("declared total size {declared} does not fit a buffer of {actual} bytes")]
    SizeMismatch {
        /// `totalsize` field of the header
        declared: u32,
        /// Length of the buffer that was supplied
        actual: usize,
    },
    /// The header version is outside the supported range
    #[error("unsupported version {version} (last compatible {last_comp_version})")]
    UnsupportedVersion {
        /// `version` field of the header
        version: u32,
        /// `last_comp_version` field of the header
        last_comp_version: u32,
    },
    /// A block described by the header does not lie inside the blob
    #[error("{block} block at {offset:#x} (+{size:#x}) lies outside the blob")]
    BlockOutOfBounds {
        /// Which block is out of bounds
        block: &'static str,
        /// Declared offset of the block
        offset: u32,
        /// Declared size of the block
        size: u32,
    },
}

/// Ways the structure or strings block can violate the DTB grammar.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Corruption {
    /// A read ran past the end of the named block
    #[error("read past the end of the {0} block")]
    PastEnd(&'static str),
    /// A 32-bit value that is not one of the five structure tokens
    #[error("unknown token {0:#x}")]
    UnknownTag(u32),
    /// `FDT_END_NODE` with no open node
    #[error("end of node without a matching begin")]
    UnmatchedEndNode,
    /// `FDT_END` while nodes are still open
    #[error("end of structure inside an open node")]
    UnexpectedEnd,
    /// Tokens after the root node other than `FDT_NOP` and `FDT_END`
    #[error("data after the root node")]
    TrailingData,
    /// The offset does not point at an `FDT_BEGIN_NODE` token
    #[error("offset does not point at a node")]
    NotANode,
    /// The offset is not aligned to a 4-byte token boundary
    #[error("offset is not 4-byte aligned")]
    Misaligned,
    /// A string ran to the end of its block without a NUL terminator
    #[error("unterminated string")]
    UnterminatedString,
    /// A node or property name is not valid UTF-8
    #[error("name is not valid UTF-8")]
    Utf8,
}

/// Errors returned by the decoder.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FdtError {
    /// The buffer was rejected when loading
    #[error("invalid format: {0}")]
    InvalidFormat(#[from] FormatIssue),
    /// No node matches the given path
    #[error("path `{0}` not found")]
    PathNotFound(String),
    /// The path is empty, malformed or starts with an unknown alias
    #[error("invalid path `{0}`")]
    InvalidPath(String),
    /// The tree violates the DTB grammar at `pos`
    #[error("corrupt structure at {pos:#x}: {issue}")]
    CorruptStructure {
        /// Absolute byte offset into the blob
        pos: usize,
        /// What was wrong at that position
        issue: Corruption,
    },
}

impl FdtError {
    pub(crate) fn corrupt(pos: usize, issue: Corruption) -> Self {
        FdtError::CorruptStructure { pos, issue }
    }

    /// Returns the class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FdtError::InvalidFormat(_) => ErrorKind::InvalidFormat,
            FdtError::PathNotFound(_) => ErrorKind::PathNotFound,
            FdtError::InvalidPath(_) => ErrorKind::InvalidPath,
            FdtError::CorruptStructure { .. } => ErrorKind::CorruptStructure,
        }
    }
}
