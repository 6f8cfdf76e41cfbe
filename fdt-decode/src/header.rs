//! The 40-byte blob header and the checks run on it before any traversal.

use core::ops::Range;

use crate::{
    FDT_FIRST_SUPPORTED_VERSION, FDT_LAST_SUPPORTED_VERSION, FDT_MAGIC, FdtError, FormatIssue,
    HEADER_SIZE,
};

/// Header fields in host byte order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Must equal [`FDT_MAGIC`]
    pub magic: u32,
    /// Declared size of the whole blob
    pub totalsize: u32,
    /// Offset in bytes from the start of the header to the structure block
    pub off_dt_struct: u32,
    /// Offset in bytes from the start of the header to the strings block
    pub off_dt_strings: u32,
    /// Offset in bytes from the start of the header to the memory reservation block
    pub off_mem_rsvmap: u32,
    /// FDT version number
    pub version: u32,
    /// Last compatible FDT version
    pub last_comp_version: u32,
    /// Physical ID of the boot CPU
    pub boot_cpuid_phys: u32,
    /// Length in bytes of the strings block
    pub size_dt_strings: u32,
    /// Length in bytes of the structure block
    pub size_dt_struct: u32,
}

impl Header {
    /// Read a header from a byte slice.
    ///
    /// Parses the ten header fields from the beginning of `data` and checks
    /// the magic number. Sizes and offsets are not checked here; see
    /// [`Header::validate`].
    ///
    /// # Errors
    ///
    /// Returns `InvalidFormat` if the slice is too small to contain a
    /// complete header or the magic number doesn't match.
    pub fn from_bytes(data: &[u8]) -> Result<Self, FdtError> {
        let raw = data
            .get(..HEADER_SIZE)
            .ok_or(FormatIssue::Truncated { len: data.len() })?;

        let mut fields = [0u32; HEADER_SIZE / 4];
        for (field, chunk) in fields.iter_mut().zip(raw.chunks_exact(4)) {
            *field = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        let [
            magic,
            totalsize,
            off_dt_struct,
            off_dt_strings,
            off_mem_rsvmap,
            version,
            last_comp_version,
            boot_cpuid_phys,
            size_dt_strings,
            size_dt_struct,
        ] = fields;

        if magic != FDT_MAGIC {
            return Err(FormatIssue::BadMagic(magic).into());
        }

        Ok(Header {
            magic,
            totalsize,
            off_dt_struct,
            off_dt_strings,
            off_mem_rsvmap,
            version,
            last_comp_version,
            boot_cpuid_phys,
            size_dt_strings,
            size_dt_struct,
        })
    }

    /// Check the header against the length of the buffer it came from.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFormat` when the declared total size does not fit the
    /// buffer, the version is unsupported, or one of the blocks lies outside
    /// the declared total size.
    pub fn validate(&self, buffer_len: usize) -> Result<(), FdtError> {
        let total = self.totalsize as usize;
        if total > buffer_len || total < HEADER_SIZE {
            return Err(FormatIssue::SizeMismatch {
                declared: self.totalsize,
                actual: buffer_len,
            }
            .into());
        }

        if self.version < FDT_FIRST_SUPPORTED_VERSION
            || self.last_comp_version > FDT_LAST_SUPPORTED_VERSION
        {
            return Err(FormatIssue::UnsupportedVersion {
                version: self.version,
                last_comp_version: self.last_comp_version,
            }
            .into());
        }

        let struct_block = self.struct_range();
        if self.off_dt_struct % 4 != 0
            || (self.off_dt_struct as usize) < HEADER_SIZE
            || struct_block.start > struct_block.end
            || struct_block.end > total
        {
            return Err(FormatIssue::BlockOutOfBounds {
                block: "structure",
                offset: self.off_dt_struct,
                size: self.size_dt_struct,
            }
            .into());
        }

        let strings_block = self.strings_range();
        if (self.off_dt_strings as usize) < HEADER_SIZE
            || strings_block.start > strings_block.end
            || strings_block.end > total
        {
            return Err(FormatIssue::BlockOutOfBounds {
                block: "strings",
                offset: self.off_dt_strings,
                size: self.size_dt_strings,
            }
            .into());
        }

        if (self.off_mem_rsvmap as usize) < HEADER_SIZE || self.off_mem_rsvmap as usize > total {
            return Err(FormatIssue::BlockOutOfBounds {
                block: "memory reservation",
                offset: self.off_mem_rsvmap,
                size: 0,
            }
            .into());
        }

        Ok(())
    }

    /// Byte range of the structure block within the blob.
    ///
    /// Version 16 headers carry no `size_dt_struct`, so the block is taken to
    /// run up to the declared total size.
    pub fn struct_range(&self) -> Range<usize> {
        let start = self.off_dt_struct as usize;
        if self.version >= 17 {
            start..start.saturating_add(self.size_dt_struct as usize)
        } else {
            start..(self.totalsize as usize).max(start)
        }
    }

    /// Byte range of the strings block within the blob.
    pub fn strings_range(&self) -> Range<usize> {
        let start = self.off_dt_strings as usize;
        start..start.saturating_add(self.size_dt_strings as usize)
    }
}

/// Parse and validate the header of `data`.
///
/// This is the entry check performed by [`DeviceTree::from_bytes`](crate::DeviceTree::from_bytes)
/// before any traversal takes place.
pub fn validate(data: &[u8]) -> Result<Header, FdtError> {
    let header = Header::from_bytes(data)?;
    header.validate(data.len())?;
    Ok(header)
}
