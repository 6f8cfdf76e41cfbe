//! Read-only decoder for Flattened Device Tree (FDT) blobs.
//!
//! This crate validates a device tree blob, resolves node paths to
//! structure offsets and decodes the properties of a node into typed
//! values. It never writes or modifies a blob.
//!
//! # Features
//!
//! - `#![no_std]` compatible (needs `alloc`)
//! - Zero-copy names and payloads borrowed from the blob
//! - Bounds-checked traversal; malformed blobs produce errors, not panics
//! - Alias-prefixed paths (`serial0/child`) as well as absolute ones
//!
//! # Example
//!
//! ```no_run
//! use fdt_decode::{DeviceTree, PropertyValue};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = std::fs::read("path/to/device.dtb")?;
//! let tree = DeviceTree::from_bytes(data)?;
//!
//! println!("FDT version: {}", tree.version());
//! println!("Total size: {} bytes", tree.total_size());
//!
//! let uart = tree.path_offset("/soc/uart@10000000")?;
//! for (name, value) in tree.properties_of(uart)?.iter() {
//!     match value {
//!         PropertyValue::Flag(_) => println!("{};", name),
//!         other => println!("{} = {};", name, other),
//!     }
//! }
//!
//! if let Some(target) = tree.alias("serial0") {
//!     println!("serial0 -> {}", target);
//! }
//! # Ok(())
//! # }
//! ```

#![no_std]
#![deny(warnings, missing_docs)]

extern crate alloc;

mod data;
mod define;
mod error;
mod fdt;
mod header;
mod map;
mod path;
mod strings;
mod value;
mod walker;

pub use define::*;
pub use error::{Corruption, ErrorKind, FdtError, FormatIssue};
pub use fdt::{DeviceTree, MemoryReservationIter, NodeRef};
pub use header::{Header, validate};
pub use map::PropertyMap;
pub use strings::StringTable;
pub use value::PropertyValue;
pub use walker::{Boundary, Node, NodeIter, PropIter, PropertyRecord, StructureWalker};
