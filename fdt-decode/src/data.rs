//! Low-level data access primitives for FDT decoding.
//!
//! This module provides bounds-checked views into one block of the blob and
//! a sequential reader over them. Positions handed out by a [`Reader`] are
//! relative to the start of its block; errors report absolute blob offsets.

use core::{ffi::CStr, ops::Range};

use crate::{Corruption, FdtError, Token};

/// A named window into the blob.
///
/// `Block` remembers where it starts inside the whole blob so that errors
/// raised while reading it can point at absolute positions.
#[derive(Clone, Copy)]
pub(crate) struct Block<'a> {
    data: &'a [u8],
    base: usize,
    name: &'static str,
}

impl<'a> Block<'a> {
    /// Creates a block covering `range` of `blob`.
    ///
    /// Ranges come from a validated header; a range that does not fit the
    /// blob yields an empty block.
    pub fn new(blob: &'a [u8], range: Range<usize>, name: &'static str) -> Self {
        let base = range.start;
        Self {
            data: blob.get(range).unwrap_or_default(),
            base,
            name,
        }
    }

    /// Returns the underlying byte slice.
    pub fn as_slice(&self) -> &'a [u8] {
        self.data
    }

    /// Returns the length of the block.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Converts a block-relative position to an absolute blob offset.
    pub fn absolute(&self, pos: usize) -> usize {
        self.base.saturating_add(pos)
    }

    /// Builds a `CorruptStructure` error located at block position `pos`.
    pub fn corrupt(&self, pos: usize, issue: Corruption) -> FdtError {
        FdtError::corrupt(self.absolute(pos), issue)
    }

    /// Creates a reader starting at block position `pos`.
    pub fn reader_at(&self, pos: usize) -> Result<Reader<'a>, FdtError> {
        if pos % 4 != 0 {
            return Err(self.corrupt(pos, Corruption::Misaligned));
        }
        if pos >= self.len() {
            return Err(self.corrupt(pos, Corruption::PastEnd(self.name)));
        }
        Ok(Reader {
            block: *self,
            pos,
        })
    }

    /// Reads the NUL-terminated string starting at block position `pos`.
    pub fn cstr_at(&self, pos: usize) -> Result<&'a str, FdtError> {
        let bytes = self
            .data
            .get(pos..)
            .filter(|rest| !rest.is_empty())
            .ok_or_else(|| self.corrupt(pos, Corruption::PastEnd(self.name)))?;
        let cstr = CStr::from_bytes_until_nul(bytes)
            .map_err(|_| self.corrupt(pos, Corruption::UnterminatedString))?;
        cstr.to_str()
            .map_err(|_| self.corrupt(pos, Corruption::Utf8))
    }
}

/// Sequential reader for decoding FDT data structures.
///
/// `Reader` provides sequential read access with position tracking. Every
/// read is bounds-checked against the block it was created from.
#[derive(Clone)]
pub(crate) struct Reader<'a> {
    block: Block<'a>,
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Returns the current read position within the block.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn past_end(&self) -> FdtError {
        self.block
            .corrupt(self.pos, Corruption::PastEnd(self.block.name))
    }

    /// Reads the specified number of bytes, advancing the position.
    pub fn read_bytes(&mut self, size: usize) -> Result<&'a [u8], FdtError> {
        let end = self
            .pos
            .checked_add(size)
            .filter(|end| *end <= self.block.len())
            .ok_or_else(|| self.past_end())?;
        let bytes = &self.block.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    /// Reads a big-endian u32 value.
    pub fn read_u32(&mut self) -> Result<u32, FdtError> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Reads a token from the FDT structure block.
    pub fn read_token(&mut self) -> Result<Token, FdtError> {
        self.read_u32().map(Token::from)
    }

    /// Reads a NUL-terminated string and moves past its terminator.
    pub fn read_cstr(&mut self) -> Result<&'a str, FdtError> {
        let s = self.block.cstr_at(self.pos)?;
        self.pos += s.len() + 1;
        Ok(s)
    }

    /// Skips padding up to the next 4-byte boundary.
    pub fn align4(&mut self) {
        self.pos = (self.pos + 3) & !3;
    }
}
