//! Traversal of the structure block.
//!
//! [`StructureWalker`] decodes one tag at a time and builds two kinds of
//! lazy iteration on top of that: node iteration with depth tracking
//! ([`NodeIter`]) and property iteration for a single node ([`PropIter`]).

use log::warn;

use crate::{Corruption, FdtError, StructureOffset, Token, data::Block};

/// One raw property occurrence in the structure block.
///
/// The payload borrows the structure block; padding after the payload is
/// not part of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyRecord<'a> {
    offset: usize,
    name_offset: u32,
    value: &'a [u8],
}

impl<'a> PropertyRecord<'a> {
    /// Offset of the `FDT_PROP` token within the structure block.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Offset of the property name within the strings block.
    pub fn name_offset(&self) -> u32 {
        self.name_offset
    }

    /// The raw payload.
    pub fn value(&self) -> &'a [u8] {
        self.value
    }

    /// Declared payload length.
    pub fn len(&self) -> usize {
        self.value.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

/// A node as seen while walking the structure block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node<'a> {
    name: &'a str,
    offset: StructureOffset,
    level: usize,
}

impl<'a> Node<'a> {
    /// Full node name including any `@unit-address`; empty for the root.
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// Offset of the node's `FDT_BEGIN_NODE` token.
    pub fn offset(&self) -> StructureOffset {
        self.offset
    }

    /// Depth relative to where the walk started (the root is level 0).
    pub fn level(&self) -> usize {
        self.level
    }
}

/// A single decoded tag.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Tag<'a> {
    BeginNode(&'a str),
    EndNode,
    Prop(PropertyRecord<'a>),
    Nop,
    End,
}

/// The next structural event found by [`StructureWalker::next_node_boundary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary<'a> {
    /// An `FDT_BEGIN_NODE` token
    Begin {
        /// Node name
        name: &'a str,
        /// Offset of the token
        offset: StructureOffset,
        /// Offset of the first tag inside the node, after the padded name
        child_start: usize,
    },
    /// An `FDT_END_NODE` token
    Close {
        /// Offset of the token
        pos: usize,
        /// Offset of the following tag
        next: usize,
    },
    /// The `FDT_END` token
    Finish {
        /// Offset of the token
        pos: usize,
    },
}

/// Decoder for the structure block of one device tree.
#[derive(Clone, Copy)]
pub struct StructureWalker<'a> {
    block: Block<'a>,
}

impl<'a> StructureWalker<'a> {
    pub(crate) fn new(block: Block<'a>) -> Self {
        Self { block }
    }

    /// Size of the structure block in bytes.
    pub fn len(&self) -> usize {
        self.block.len()
    }

    /// Whether the structure block is empty.
    pub fn is_empty(&self) -> bool {
        self.block.len() == 0
    }

    /// Decodes the tag at `pos` and returns it with the position of the next tag.
    pub(crate) fn tag_at(&self, pos: usize) -> Result<(Tag<'a>, usize), FdtError> {
        let mut reader = self.block.reader_at(pos)?;
        let tag = match reader.read_token()? {
            Token::BeginNode => {
                let name = reader.read_cstr()?;
                reader.align4();
                Tag::BeginNode(name)
            }
            Token::EndNode => Tag::EndNode,
            Token::Prop => {
                let len = reader.read_u32()?;
                let name_offset = reader.read_u32()?;
                let value = reader.read_bytes(len as usize)?;
                reader.align4();
                Tag::Prop(PropertyRecord {
                    offset: pos,
                    name_offset,
                    value,
                })
            }
            Token::Nop => Tag::Nop,
            Token::End => Tag::End,
            Token::Unknown(v) => return Err(self.block.corrupt(pos, Corruption::UnknownTag(v))),
        };
        Ok((tag, reader.position()))
    }

    /// Finds the next node boundary at or after `pos`.
    ///
    /// `FDT_NOP` and `FDT_PROP` tags are skipped. A single boundary carries
    /// no depth; [`NodeIter`] counts it from the sequence of boundaries.
    pub fn next_node_boundary(&self, mut pos: usize) -> Result<Boundary<'a>, FdtError> {
        loop {
            let (tag, next) = self.tag_at(pos)?;
            match tag {
                Tag::Nop | Tag::Prop(_) => pos = next,
                Tag::BeginNode(name) => {
                    return Ok(Boundary::Begin {
                        name,
                        offset: StructureOffset::new(pos),
                        child_start: next,
                    });
                }
                Tag::EndNode => return Ok(Boundary::Close { pos, next }),
                Tag::End => return Ok(Boundary::Finish { pos }),
            }
        }
    }

    /// Decodes the `FDT_BEGIN_NODE` at `offset`, returning its name and the
    /// position of its first inner tag.
    pub fn node_at(&self, offset: StructureOffset) -> Result<(&'a str, usize), FdtError> {
        match self.tag_at(offset.as_usize())? {
            (Tag::BeginNode(name), child_start) => Ok((name, child_start)),
            _ => Err(self.block.corrupt(offset.as_usize(), Corruption::NotANode)),
        }
    }

    /// Iterates over the properties of the node at `offset`.
    pub fn properties_at(&self, offset: StructureOffset) -> Result<PropIter<'a>, FdtError> {
        let (_, child_start) = self.node_at(offset)?;
        Ok(PropIter {
            walker: *self,
            pos: child_start,
            finished: false,
        })
    }

    /// Iterates over every node below `offset`, in structure order.
    ///
    /// Levels are relative to `offset`: its children are level 1.
    pub fn descendants(&self, offset: StructureOffset) -> Result<NodeIter<'a>, FdtError> {
        let (_, child_start) = self.node_at(offset)?;
        Ok(NodeIter {
            walker: *self,
            pos: child_start,
            depth: 1,
            pending: None,
            whole_tree: false,
            finished: false,
        })
    }

    /// Iterates over the direct children of the node at `offset`.
    pub fn children(
        &self,
        offset: StructureOffset,
    ) -> Result<impl Iterator<Item = Result<Node<'a>, FdtError>> + 'a, FdtError> {
        Ok(self
            .descendants(offset)?
            .filter(|node| node.as_ref().map_or(true, |n| n.level() == 1)))
    }

    /// Iterates over the root node and all of its descendants.
    ///
    /// After the root node closes, only `FDT_NOP` tags may precede `FDT_END`.
    pub fn nodes(&self) -> Result<NodeIter<'a>, FdtError> {
        let (name, child_start) = self.node_at(StructureOffset::ROOT)?;
        Ok(NodeIter {
            walker: *self,
            pos: child_start,
            depth: 1,
            pending: Some(Node {
                name,
                offset: StructureOffset::ROOT,
                level: 0,
            }),
            whole_tree: true,
            finished: false,
        })
    }
}

/// Depth-tracking node iterator.
///
/// `FDT_BEGIN_NODE` increments the depth and `FDT_END_NODE` decrements it;
/// iteration ends when the starting node is closed.
pub struct NodeIter<'a> {
    walker: StructureWalker<'a>,
    pos: usize,
    depth: usize,
    pending: Option<Node<'a>>,
    whole_tree: bool,
    finished: bool,
}

impl<'a> NodeIter<'a> {
    fn fail(&mut self, err: FdtError) -> Option<Result<Node<'a>, FdtError>> {
        warn!("structure walk stopped: {}", err);
        self.finished = true;
        Some(Err(err))
    }

    /// Checks that nothing but `FDT_NOP` separates the root's end from `FDT_END`.
    fn check_tail(&mut self) -> Option<Result<Node<'a>, FdtError>> {
        self.finished = true;
        match self.walker.next_node_boundary(self.pos) {
            Ok(Boundary::Finish { .. }) => None,
            Ok(Boundary::Close { pos, .. }) => {
                let err = self.walker.block.corrupt(pos, Corruption::UnmatchedEndNode);
                self.fail(err)
            }
            Ok(Boundary::Begin { offset, .. }) => {
                let err = self
                    .walker
                    .block
                    .corrupt(offset.as_usize(), Corruption::TrailingData);
                self.fail(err)
            }
            Err(e) => self.fail(e),
        }
    }
}

impl<'a> Iterator for NodeIter<'a> {
    type Item = Result<Node<'a>, FdtError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(node) = self.pending.take() {
            return Some(Ok(node));
        }
        if self.finished {
            return None;
        }

        loop {
            let boundary = match self.walker.next_node_boundary(self.pos) {
                Ok(b) => b,
                Err(e) => return self.fail(e),
            };
            match boundary {
                Boundary::Begin {
                    name,
                    offset,
                    child_start,
                } => {
                    let node = Node {
                        name,
                        offset,
                        level: self.depth,
                    };
                    self.depth += 1;
                    self.pos = child_start;
                    return Some(Ok(node));
                }
                Boundary::Close { next, .. } => {
                    self.depth -= 1;
                    self.pos = next;
                    if self.depth == 0 {
                        if self.whole_tree {
                            return self.check_tail();
                        }
                        self.finished = true;
                        return None;
                    }
                }
                Boundary::Finish { pos } => {
                    let err = self.walker.block.corrupt(pos, Corruption::UnexpectedEnd);
                    return self.fail(err);
                }
            }
        }
    }
}

/// Lazy iterator over the properties of one node.
///
/// Stops at the first nested node or at the node's `FDT_END_NODE`.
pub struct PropIter<'a> {
    walker: StructureWalker<'a>,
    pos: usize,
    finished: bool,
}

impl<'a> Iterator for PropIter<'a> {
    type Item = Result<PropertyRecord<'a>, FdtError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            let (tag, next) = match self.walker.tag_at(self.pos) {
                Ok(t) => t,
                Err(e) => {
                    warn!("property walk stopped: {}", e);
                    self.finished = true;
                    return Some(Err(e));
                }
            };
            match tag {
                Tag::Prop(record) => {
                    self.pos = next;
                    return Some(Ok(record));
                }
                Tag::Nop => self.pos = next,
                Tag::BeginNode(_) | Tag::EndNode => {
                    self.finished = true;
                    return None;
                }
                Tag::End => {
                    self.finished = true;
                    let err = self.walker.block.corrupt(self.pos, Corruption::UnexpectedEnd);
                    warn!("property walk stopped: {}", err);
                    return Some(Err(err));
                }
            }
        }
    }
}
