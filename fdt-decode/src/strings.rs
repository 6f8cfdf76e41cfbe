//! Property name lookup in the strings block.

use crate::{FdtError, data::Block};

/// The strings block of a device tree.
///
/// Property records refer to their names by byte offset into this block.
#[derive(Clone, Copy)]
pub struct StringTable<'a> {
    block: Block<'a>,
}

impl<'a> StringTable<'a> {
    pub(crate) fn new(block: Block<'a>) -> Self {
        Self { block }
    }

    /// Returns the NUL-terminated string starting at `offset`.
    ///
    /// # Errors
    ///
    /// `CorruptStructure` if the offset is outside the block, or the string
    /// runs to the end of the block without a terminator, or it is not
    /// valid UTF-8.
    pub fn name_at(&self, offset: u32) -> Result<&'a str, FdtError> {
        self.block.cstr_at(offset as usize)
    }

    /// Size of the block in bytes.
    pub fn len(&self) -> usize {
        self.block.len()
    }

    /// Whether the block holds no strings at all.
    pub fn is_empty(&self) -> bool {
        self.block.len() == 0
    }

    /// Raw bytes of the block.
    pub fn as_slice(&self) -> &'a [u8] {
        self.block.as_slice()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Corruption;

    const STRINGS: &[u8] = b"compatible\0reg\0#size-cells\0status";

    fn table() -> StringTable<'static> {
        StringTable::new(Block::new(STRINGS, 0..STRINGS.len(), "strings"))
    }

    #[test]
    fn test_name_at() {
        let table = table();
        assert_eq!(table.name_at(0).unwrap(), "compatible");
        assert_eq!(table.name_at(11).unwrap(), "reg");
        assert_eq!(table.name_at(15).unwrap(), "#size-cells");
        // names may share a suffix
        assert_eq!(table.name_at(17).unwrap(), "ize-cells");
    }

    #[test]
    fn test_name_out_of_bounds() {
        let err = table().name_at(STRINGS.len() as u32).unwrap_err();
        assert_eq!(
            err,
            FdtError::corrupt(STRINGS.len(), Corruption::PastEnd("strings"))
        );
    }

    #[test]
    fn test_name_unterminated() {
        let err = table().name_at(27).unwrap_err();
        assert_eq!(err, FdtError::corrupt(27, Corruption::UnterminatedString));
    }
}
