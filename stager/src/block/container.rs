//! The block container and its position resolver.

use super::{BlockEntry, BlockKind, PositionSpec};
use crate::errors::{BlockError, PlacementError};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// An entry waiting for its position to be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingEntry {
    /// The entry.
    pub entry: BlockEntry,
    /// Where the entry may go.
    pub positions: PositionSpec,
}

/// State saved by [`Block::backup`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSnapshot {
    items: Vec<Option<BlockEntry>>,
    unfinished_items: Vec<PendingEntry>,
    taken_positions: Vec<usize>,
    items_ids: BTreeSet<String>,
}

/// An ordered container resolving per-item position constraints.
///
/// Items are declared with [`Block::add`] and only receive a fixed index when
/// [`Block::finalize`] runs. Until then they can be removed or re-added
/// freely. Nested blocks are stored as [`BlockEntry::Block`] handles into a
/// [`BlockArena`](super::BlockArena).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    kind: BlockKind,
    id: String,
    positions: PositionSpec,
    items: Vec<Option<BlockEntry>>,
    unfinished_items: Vec<PendingEntry>,
    items_ids: BTreeSet<String>,
    taken_positions: Vec<usize>,
    index: usize,
    finalized: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reset_snapshot: Option<Box<BlockSnapshot>>,
}

impl Block {
    /// Creates an empty block.
    #[must_use]
    pub fn new(kind: BlockKind, id: impl Into<String>, positions: PositionSpec) -> Self {
        Self {
            kind,
            id: id.into(),
            positions,
            items: Vec::new(),
            unfinished_items: Vec::new(),
            items_ids: BTreeSet::new(),
            taken_positions: Vec::new(),
            index: 0,
            finalized: false,
            reset_snapshot: None,
        }
    }

    /// Returns the block id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the block kind.
    #[must_use]
    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    /// Returns the position of this block inside its parent.
    #[must_use]
    pub fn positions(&self) -> &PositionSpec {
        &self.positions
    }

    /// Returns true once positions are resolved.
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Number of placed plus pending items.
    #[must_use]
    pub fn size(&self) -> usize {
        self.items.iter().flatten().count() + self.unfinished_items.len()
    }

    /// Returns true if the block holds no item.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Returns true if an item with this id is present.
    #[must_use]
    pub fn has_item(&self, id: &str) -> bool {
        self.items_ids.contains(id)
    }

    /// Placed items by slot.
    #[must_use]
    pub fn items(&self) -> &[Option<BlockEntry>] {
        &self.items
    }

    /// Items still waiting for a position.
    #[must_use]
    pub fn unfinished_items(&self) -> &[PendingEntry] {
        &self.unfinished_items
    }

    /// Slots already assigned.
    #[must_use]
    pub fn taken_positions(&self) -> &[usize] {
        &self.taken_positions
    }

    /// Every entry, placed ones first in slot order, then pending ones.
    pub fn entries(&self) -> impl Iterator<Item = &BlockEntry> {
        self.items
            .iter()
            .flatten()
            .chain(self.unfinished_items.iter().map(|pending| &pending.entry))
    }

    /// Declares an entry with its position specification.
    ///
    /// # Errors
    ///
    /// Fails if the block is finalized or already holds an entry with the
    /// same id.
    pub fn add(&mut self, entry: BlockEntry, positions: PositionSpec) -> Result<(), BlockError> {
        if self.finalized {
            return Err(BlockError::finalized(&self.id, "add items"));
        }
        if self.items_ids.contains(entry.id()) {
            return Err(BlockError::duplicate_item(&self.id, entry.id()));
        }

        self.items_ids.insert(entry.id().to_string());
        self.unfinished_items.push(PendingEntry { entry, positions });
        Ok(())
    }

    /// Removes an entry by id, returning it if it was present.
    pub fn remove(&mut self, id: &str) -> Result<Option<BlockEntry>, BlockError> {
        if self.finalized {
            return Err(BlockError::finalized(&self.id, "remove items"));
        }
        if !self.items_ids.remove(id) {
            return Ok(None);
        }

        if let Some(i) = self.unfinished_items.iter().position(|p| p.entry.id() == id) {
            return Ok(Some(self.unfinished_items.remove(i).entry));
        }

        let slot = self
            .items
            .iter()
            .position(|item| item.as_ref().is_some_and(|entry| entry.id() == id));
        Ok(slot.and_then(|slot| {
            self.taken_positions.retain(|&taken| taken != slot);
            self.items[slot].take()
        }))
    }

    /// Removes every entry.
    pub fn remove_all_items(&mut self) -> Result<(), BlockError> {
        if self.finalized {
            return Err(BlockError::finalized(&self.id, "remove items"));
        }
        let ids: Vec<String> = self.entries().map(|entry| entry.id().to_string()).collect();
        for id in ids {
            self.remove(&id)?;
        }
        self.items.clear();
        Ok(())
    }

    /// Resolves every pending position using the thread-local RNG.
    pub fn finalize(&mut self) -> Result<(), PlacementError> {
        self.finalize_with_rng(&mut rand::thread_rng())
    }

    /// Resolves every pending position.
    ///
    /// Items are placed most-constrained first; each one takes a slot chosen
    /// uniformly among those still legal for it. On error the block is left
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns a [`PlacementError`] naming the first item left with no legal
    /// slot.
    pub fn finalize_with_rng<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), PlacementError> {
        if self.finalized {
            return Ok(());
        }
        if self.unfinished_items.is_empty() {
            self.finalized = true;
            return Ok(());
        }

        let mut pending = self.unfinished_items.clone();
        let mut dropped = None;
        if self.kind == BlockKind::StepEnclosure
            && self.size() > 1
            && pending[0].entry.is_default_step()
        {
            dropped = Some(pending.remove(0).entry);
        }

        let size = self.items.iter().flatten().count() + pending.len();
        let available: Vec<usize> = (0..size)
            .filter(|slot| !self.taken_positions.contains(slot))
            .collect();

        let mut candidates: Vec<(usize, Vec<usize>)> = pending
            .iter()
            .enumerate()
            .map(|(ordinal, p)| (ordinal, p.positions.resolve(ordinal, &available)))
            .collect();

        let mut assignments = Vec::with_capacity(candidates.len());
        while let Some(pick) = candidates
            .iter()
            .enumerate()
            .min_by_key(|(_, (_, legal))| legal.len())
            .map(|(i, _)| i)
        {
            let (ordinal, legal) = candidates.remove(pick);
            let Some(&slot) = legal.choose(&mut *rng) else {
                return Err(PlacementError::new(pending[ordinal].entry.id(), &self.id));
            };
            for (_, others) in &mut candidates {
                others.retain(|&other| other != slot);
            }
            assignments.push((ordinal, slot));
        }

        if let Some(entry) = dropped {
            debug!(block = %self.id, step = %entry.id(), "Dropping placeholder step");
            self.items_ids.remove(entry.id());
        }

        let mut entries: Vec<Option<BlockEntry>> =
            pending.into_iter().map(|p| Some(p.entry)).collect();
        self.items.resize(size, None);
        for (ordinal, slot) in assignments {
            self.items[slot] = entries[ordinal].take();
            self.taken_positions.push(slot);
        }
        self.unfinished_items.clear();
        self.finalized = true;
        Ok(())
    }

    /// Returns the entry at the iterator position without advancing.
    #[must_use]
    pub fn current(&self) -> Option<&BlockEntry> {
        self.items.get(self.index).and_then(Option::as_ref)
    }

    /// Advances the iterator position.
    pub fn advance(&mut self) {
        if self.index < self.items.len() {
            self.index += 1;
        }
    }

    /// Returns the next placed entry of this block, without descending into
    /// nested blocks.
    pub fn next_slot(&mut self) -> Option<BlockEntry> {
        while self.index < self.items.len() {
            let entry = self.items[self.index].clone();
            self.index += 1;
            if entry.is_some() {
                return entry;
            }
        }
        None
    }

    /// Returns the iterator position.
    #[must_use]
    pub fn position(&self) -> usize {
        self.index
    }

    /// Saves the current contents for [`Block::restore`].
    pub fn backup(&mut self) {
        self.reset_snapshot = Some(Box::new(BlockSnapshot {
            items: self.items.clone(),
            unfinished_items: self.unfinished_items.clone(),
            taken_positions: self.taken_positions.clone(),
            items_ids: self.items_ids.clone(),
        }));
    }

    /// Reverts to the last backup and reopens the block.
    ///
    /// The iterator is rewound even when no backup exists.
    pub fn restore(&mut self) {
        if let Some(snapshot) = self.reset_snapshot.as_deref() {
            self.items = snapshot.items.clone();
            self.unfinished_items = snapshot.unfinished_items.clone();
            self.taken_positions = snapshot.taken_positions.clone();
            self.items_ids = snapshot.items_ids.clone();
        }
        self.index = 0;
        self.finalized = false;
    }

    /// Returns true if a backup is stored.
    #[must_use]
    pub fn has_backup(&self) -> bool {
        self.reset_snapshot.is_some()
    }
}
