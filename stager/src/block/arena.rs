//! Arena owning every block of a hierarchy.

use super::{Block, BlockEntry, BlockHandle};
use crate::errors::{BlockError, PlacementError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Append-only storage of blocks addressed by [`BlockHandle`] or by id.
///
/// Blocks reference their children by handle, so the whole hierarchy can be
/// cloned or serialized without pointer graphs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockArena {
    blocks: Vec<Block>,
    blocks_ids: BTreeMap<String, BlockHandle>,
}

impl BlockArena {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an arena whose first block is `root`.
    #[must_use]
    pub fn with_root(root: Block) -> (Self, BlockHandle) {
        let handle = BlockHandle(0);
        let mut blocks_ids = BTreeMap::new();
        blocks_ids.insert(root.id().to_string(), handle);
        let arena = Self {
            blocks: vec![root],
            blocks_ids,
        };
        (arena, handle)
    }

    /// Stores a block and returns its handle.
    ///
    /// # Errors
    ///
    /// Fails if a block with the same id is already stored.
    pub fn insert(&mut self, block: Block) -> Result<BlockHandle, BlockError> {
        if self.blocks_ids.contains_key(block.id()) {
            return Err(BlockError::DuplicateBlock {
                block: block.id().to_string(),
            });
        }
        let handle = BlockHandle(self.blocks.len());
        self.blocks_ids.insert(block.id().to_string(), handle);
        self.blocks.push(block);
        Ok(handle)
    }

    /// Number of blocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Returns true if no block is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Returns a block by handle.
    #[must_use]
    pub fn get(&self, handle: BlockHandle) -> Option<&Block> {
        self.blocks.get(handle.0)
    }

    /// Returns a mutable block by handle.
    pub fn get_mut(&mut self, handle: BlockHandle) -> Option<&mut Block> {
        self.blocks.get_mut(handle.0)
    }

    /// Returns a mutable block, failing for unknown handles.
    pub(crate) fn block_mut(&mut self, handle: BlockHandle) -> Result<&mut Block, BlockError> {
        self.blocks
            .get_mut(handle.0)
            .ok_or(BlockError::UnknownHandle { handle: handle.0 })
    }

    /// Looks up a handle by block id.
    #[must_use]
    pub fn handle_of(&self, id: &str) -> Option<BlockHandle> {
        self.blocks_ids.get(id).copied()
    }

    /// Returns true if the handle points to a stored block.
    #[must_use]
    pub fn contains(&self, handle: BlockHandle) -> bool {
        handle.0 < self.blocks.len()
    }

    /// Iterates over blocks in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (BlockHandle, &Block)> {
        self.blocks
            .iter()
            .enumerate()
            .map(|(i, block)| (BlockHandle(i), block))
    }

    /// Returns the next leaf entry under `handle`, depth first.
    ///
    /// A nested block is walked to exhaustion before the parent advances.
    /// Returns `None` once the whole subtree is exhausted; call
    /// [`BlockArena::restore_all`] to walk again.
    pub fn next(&mut self, handle: BlockHandle) -> Option<BlockEntry> {
        loop {
            let entry = self.get(handle)?.current()?.clone();
            match entry.nested() {
                Some(child) => {
                    if let Some(leaf) = self.next(child) {
                        return Some(leaf);
                    }
                    self.get_mut(handle)?.advance();
                }
                None => {
                    self.get_mut(handle)?.advance();
                    return Some(entry);
                }
            }
        }
    }

    /// Snapshots every block.
    pub fn backup_all(&mut self) {
        self.blocks.iter_mut().for_each(Block::backup);
    }

    /// Restores every block in creation order.
    pub fn restore_all(&mut self) {
        self.blocks.iter_mut().for_each(Block::restore);
    }

    /// Finalizes every block in creation order.
    ///
    /// Stops at the first placement error.
    pub fn finalize_all_with_rng<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<(), PlacementError> {
        for block in &mut self.blocks {
            block.finalize_with_rng(&mut *rng)?;
        }
        Ok(())
    }
}
