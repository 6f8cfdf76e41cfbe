use alloc::{string::String, vec::Vec};
use core::fmt;

use log::{debug, warn};

use crate::{
    Corruption, FdtError, Header, MemoryReservation, PropertyMap, PropertyValue, StructureOffset,
    data::Block,
    header,
    strings::StringTable,
    walker::{NodeIter, StructureWalker},
};

/// Walks the memory reservation block up to its all-zero terminator.
pub struct MemoryReservationIter<'a> {
    data: &'a [u8],
    offset: usize,
}

impl Iterator for MemoryReservationIter<'_> {
    type Item = MemoryReservation;

    fn next(&mut self) -> Option<Self::Item> {
        // address and size, 8 bytes each; a missing terminator ends the block
        let entry = self.data.get(self.offset..self.offset.checked_add(16)?)?;
        let address = u64::from_be_bytes(entry[..8].try_into().ok()?);
        let size = u64::from_be_bytes(entry[8..].try_into().ok()?);

        if address == 0 && size == 0 {
            return None;
        }

        self.offset += 16;
        Some(MemoryReservation { address, size })
    }
}

/// Selects a node either by offset or by path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRef<'p> {
    /// A previously resolved offset
    Offset(StructureOffset),
    /// A path, resolved with [`DeviceTree::path_offset`]
    Path(&'p str),
}

impl From<StructureOffset> for NodeRef<'_> {
    fn from(value: StructureOffset) -> Self {
        NodeRef::Offset(value)
    }
}

impl<'p> From<&'p str> for NodeRef<'p> {
    fn from(value: &'p str) -> Self {
        NodeRef::Path(value)
    }
}

/// A loaded, validated device tree.
///
/// The tree holds its buffer `B` (`Vec<u8>` when owned, `&[u8]` when
/// borrowed) and never modifies it. Every name, payload and node handed out
/// borrows from the tree, and a failed query leaves the tree usable.
#[derive(Clone)]
pub struct DeviceTree<B = Vec<u8>> {
    header: Header,
    data: B,
}

impl<B: AsRef<[u8]>> DeviceTree<B> {
    /// Validate the header of `data` and take it as a device tree.
    ///
    /// # Errors
    ///
    /// `InvalidFormat` if the header is rejected; see [`Header::validate`].
    pub fn from_bytes(data: B) -> Result<Self, FdtError> {
        let header = header::validate(data.as_ref())?;
        debug!(
            "loaded FDT v{}: {} bytes, structure {:#x}+{:#x}, strings {:#x}+{:#x}",
            header.version,
            header.totalsize,
            header.off_dt_struct,
            header.size_dt_struct,
            header.off_dt_strings,
            header.size_dt_strings
        );
        Ok(Self { header, data })
    }

    /// The validated header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Magic number as read from the blob.
    pub fn magic(&self) -> u32 {
        self.header.magic
    }

    /// Header version.
    pub fn version(&self) -> u32 {
        self.header.version
    }

    /// Declared total size of the blob.
    pub fn total_size(&self) -> u32 {
        self.header.totalsize
    }

    /// The blob, cut to its declared total size.
    pub fn as_slice(&self) -> &[u8] {
        self.data
            .as_ref()
            .get(..self.header.totalsize as usize)
            .unwrap_or_default()
    }

    /// Decoder for the structure block.
    pub fn walker(&self) -> StructureWalker<'_> {
        StructureWalker::new(Block::new(
            self.data.as_ref(),
            self.header.struct_range(),
            "structure",
        ))
    }

    /// The strings block.
    pub fn strings(&self) -> StringTable<'_> {
        StringTable::new(Block::new(
            self.data.as_ref(),
            self.header.strings_range(),
            "strings",
        ))
    }

    /// Name of the node at `offset`.
    pub fn node_name(&self, offset: StructureOffset) -> Result<&str, FdtError> {
        self.walker().node_at(offset).map(|(name, _)| name)
    }

    /// Every node of the tree, root first, with its depth.
    pub fn all_nodes(&self) -> Result<NodeIter<'_>, FdtError> {
        self.walker().nodes()
    }

    /// Decode all properties of a node given by offset or path.
    ///
    /// ```no_run
    /// # use fdt_decode::DeviceTree;
    /// # fn demo(tree: &DeviceTree) -> Result<(), fdt_decode::FdtError> {
    /// let props = tree.properties_of("/soc/uart@10000000")?;
    /// println!("{}", props["compatible"]);
    /// # Ok(())
    /// # }
    /// ```
    pub fn properties_of<'p>(
        &self,
        node: impl Into<NodeRef<'p>>,
    ) -> Result<PropertyMap<'_>, FdtError> {
        let offset = match node.into() {
            NodeRef::Offset(offset) => offset,
            NodeRef::Path(path) => self.path_offset(path)?,
        };
        self.decode_node(offset)
    }

    /// Decode all properties of the node at `offset`.
    ///
    /// A name that occurs twice keeps its first position and its last value.
    pub fn decode_node(&self, offset: StructureOffset) -> Result<PropertyMap<'_>, FdtError> {
        let strings = self.strings();
        let mut map = PropertyMap::new();
        for record in self.walker().properties_at(offset)? {
            let record = record?;
            let name = strings.name_at(record.name_offset())?;
            let value = PropertyValue::decode(name, record.value());
            if map.insert(name, value).is_some() {
                debug!(
                    "property `{}` repeated at {:#x}, keeping the later value",
                    name,
                    record.offset()
                );
            }
        }
        Ok(map)
    }

    /// Raw payload of property `name` of the node at `offset`.
    pub fn raw_property(
        &self,
        offset: StructureOffset,
        name: &str,
    ) -> Result<Option<&[u8]>, FdtError> {
        let strings = self.strings();
        let mut found = None;
        for record in self.walker().properties_at(offset)? {
            let record = record?;
            if strings.name_at(record.name_offset())? == name {
                found = Some(record.value());
            }
        }
        Ok(found)
    }

    /// Looks up `name` in the `/aliases` node.
    ///
    /// Returns the alias target with its trailing NUL removed, or `None` if
    /// the tree has no such alias. Corruption met on the way is logged and
    /// also reported as `None`; [`DeviceTree::path_offset`] surfaces it.
    pub fn alias(&self, name: &str) -> Option<&str> {
        match self.lookup_alias(name) {
            Ok(target) => target,
            Err(e) => {
                warn!("alias lookup failed: {}", e);
                None
            }
        }
    }

    pub(crate) fn lookup_alias(&self, name: &str) -> Result<Option<&str>, FdtError> {
        let aliases = match self.resolve_from(StructureOffset::ROOT, "aliases", "/aliases") {
            Ok(offset) => offset,
            Err(FdtError::PathNotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        let Some(value) = self.raw_property(aliases, name)? else {
            return Ok(None);
        };
        let text = value.strip_suffix(&[0]).unwrap_or(value);
        Ok(core::str::from_utf8(text).ok())
    }

    /// Rebuild the absolute path of the node at `offset`.
    ///
    /// # Errors
    ///
    /// `CorruptStructure` if `offset` is not a node.
    pub fn node_path(&self, offset: StructureOffset) -> Result<String, FdtError> {
        self.walker().node_at(offset)?;

        let mut stack: Vec<&str> = Vec::new();
        for node in self.all_nodes()? {
            let node = node?;
            stack.truncate(node.level());
            stack.push(node.name());

            if node.offset() == offset {
                if stack.len() == 1 {
                    return Ok(String::from("/"));
                }
                let mut path = String::new();
                for name in stack.iter().skip(1) {
                    path.push('/');
                    path.push_str(name);
                }
                return Ok(path);
            }
        }

        Err(FdtError::corrupt(
            self.header.off_dt_struct as usize + offset.as_usize(),
            Corruption::NotANode,
        ))
    }

    /// Entries of the memory reservation block.
    pub fn memory_reservations(&self) -> MemoryReservationIter<'_> {
        MemoryReservationIter {
            data: self.as_slice(),
            offset: self.header.off_mem_rsvmap as usize,
        }
    }
}

fn indent(f: &mut fmt::Formatter<'_>, level: usize) -> fmt::Result {
    write!(f, "{:width$}", "", width = level * 4)
}

impl<B: AsRef<[u8]>> fmt::Display for DeviceTree<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "/dts-v1/;")?;
        for rsv in self.memory_reservations() {
            writeln!(f, "/memreserve/ {:#x} {:#x};", rsv.address, rsv.size)?;
        }
        writeln!(f)?;

        let nodes = match self.all_nodes() {
            Ok(nodes) => nodes,
            Err(e) => return writeln!(f, "/* {} */", e),
        };

        let mut open = 0;
        for node in nodes {
            let node = match node {
                Ok(node) => node,
                Err(e) => {
                    writeln!(f, "/* {} */", e)?;
                    break;
                }
            };
            let level = node.level();

            // close the nodes that ended before this one
            while open > level {
                open -= 1;
                indent(f, open)?;
                writeln!(f, "}};")?;
            }

            indent(f, level)?;
            let name = if node.name().is_empty() {
                "/"
            } else {
                node.name()
            };
            writeln!(f, "{} {{", name)?;

            match self.decode_node(node.offset()) {
                Ok(props) => {
                    for (name, value) in props.iter() {
                        indent(f, level + 1)?;
                        if value.is_flag() {
                            writeln!(f, "{};", name)?;
                        } else {
                            writeln!(f, "{} = {};", name, value)?;
                        }
                    }
                }
                Err(e) => {
                    indent(f, level + 1)?;
                    writeln!(f, "/* {} */", e)?;
                }
            }

            open = level + 1;
        }

        while open > 0 {
            open -= 1;
            indent(f, open)?;
            writeln!(f, "}};")?;
        }

        Ok(())
    }
}

impl<B> fmt::Debug for DeviceTree<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceTree")
            .field("header", &self.header)
            .finish_non_exhaustive()
    }
}
