//! Path resolution.
//!
//! Paths are either absolute (`/soc/uart@10000000`) or start with an alias
//! name (`serial0`, `serial0/child`), which is looked up in `/aliases` and
//! must point at an absolute path. Segments are compared against the full
//! node name, unit address included.

use alloc::string::ToString;

use log::trace;

use crate::{DeviceTree, FdtError, StructureOffset};

impl<B: AsRef<[u8]>> DeviceTree<B> {
    /// Resolve `path` to the offset of the node it names.
    ///
    /// # Errors
    ///
    /// - `InvalidPath` for an empty path, a path containing NUL, an unknown
    ///   alias, or an alias whose target is not absolute.
    /// - `PathNotFound` when a segment matches no child.
    /// - `CorruptStructure` when the walk hits malformed data, including
    ///   inside `/aliases` while looking up an alias.
    pub fn path_offset(&self, path: &str) -> Result<StructureOffset, FdtError> {
        if path.is_empty() || path.contains('\0') {
            return Err(FdtError::InvalidPath(path.to_string()));
        }

        let offset = match path.strip_prefix('/') {
            Some(rest) => self.resolve_from(StructureOffset::ROOT, rest, path)?,
            None => {
                let (alias, rest) = path.split_once('/').unwrap_or((path, ""));
                let target = self
                    .lookup_alias(alias)?
                    .ok_or_else(|| FdtError::InvalidPath(path.to_string()))?;
                let target_rest = target
                    .strip_prefix('/')
                    .ok_or_else(|| FdtError::InvalidPath(path.to_string()))?;
                trace!("alias `{}` -> `{}`", alias, target);
                let start = self.resolve_from(StructureOffset::ROOT, target_rest, target)?;
                self.resolve_from(start, rest, path)?
            }
        };

        trace!("path `{}` -> {}", path, offset);
        Ok(offset)
    }

    /// Walks `rest` segment by segment below `start`.
    ///
    /// `full` is only used for error reporting.
    pub(crate) fn resolve_from(
        &self,
        start: StructureOffset,
        rest: &str,
        full: &str,
    ) -> Result<StructureOffset, FdtError> {
        let walker = self.walker();
        let mut current = start;

        for segment in rest.split('/').filter(|s| !s.is_empty()) {
            let mut found = None;
            for child in walker.children(current)? {
                let child = child?;
                if child.name() == segment {
                    found = Some(child.offset());
                    break;
                }
            }
            current = found.ok_or_else(|| FdtError::PathNotFound(full.to_string()))?;
        }

        Ok(current)
    }
}
