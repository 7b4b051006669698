use std::fmt::{self, Display, Formatter};

use crate::errors::{Result, StorageError};

/// Largest sequence number that still renders as a five digit block id.
pub const MAX_BLOCKS: u32 = 99_999;

/// Position of a block within one upload, starting at 1.
///
/// Rendered on the wire as a zero-padded five digit decimal string, so the
/// lexical order of ids matches upload order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(u32);

impl BlockId {
    pub fn sequence(&self) -> u32 {
        self.0
    }
}

impl Display for BlockId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:05}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStatus {
    Uncommitted,
    Committed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDescriptor {
    pub id: BlockId,
    pub status: BlockStatus,
}

/// Ordered blocks of a single upload session.
///
/// Ids are only ever handed out by [`BlockList::next_block`], which keeps the
/// list gapless: the n-th entry always has sequence n.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockList {
    blocks: Vec<BlockDescriptor>,
}

impl BlockList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an uncommitted block with the next sequence number and returns its id.
    pub fn next_block(&mut self) -> Result<BlockId> {
        let sequence = self.blocks.len() as u32 + 1;
        if sequence > MAX_BLOCKS {
            return Err(StorageError::TooManyBlocks { max: MAX_BLOCKS });
        }
        let id = BlockId(sequence);
        self.blocks.push(BlockDescriptor {
            id,
            status: BlockStatus::Uncommitted,
        });
        Ok(id)
    }

    pub(crate) fn mark_committed(&mut self) {
        for block in self.blocks.iter_mut() {
            block.status = BlockStatus::Committed;
        }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlockDescriptor> {
        self.blocks.iter()
    }

    /// Wire ids in commit order.
    pub fn ids(&self) -> Vec<String> {
        self.blocks.iter().map(|b| b.id.to_string()).collect()
    }
}
