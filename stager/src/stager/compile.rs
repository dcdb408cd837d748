//! Compilation of the block hierarchy into the flat sequence.

use super::{summarize, SequenceEntry, SequenceFormat, Stager};
use crate::block::BlockEntry;
use crate::core::StageKind;
use crate::errors::{codes, Result, ValidationError};
use rand::Rng;
use tracing::{debug, warn};

impl Stager {
    /// Returns true while the stager is compiled.
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// The compiled sequence; empty while building.
    #[must_use]
    pub fn sequence(&self) -> &[SequenceEntry] {
        &self.sequence
    }

    /// Renders the compiled sequence as stage ids or `"stage.step"` ids.
    ///
    /// # Errors
    ///
    /// Fails while the stager is not finalized.
    pub fn sequence_summary(&self, format: SequenceFormat) -> Result<Vec<String>> {
        if !self.finalized {
            return Err(ValidationError::coded(
                codes::SEQUENCE_INVALID,
                "Stager is not finalized: call finalize() first",
            )
            .into());
        }
        Ok(summarize(&self.sequence, format))
    }

    /// Compiles the sequence using the thread-local RNG.
    pub fn finalize(&mut self) -> Result<&mut Self> {
        self.finalize_with_rng(&mut rand::thread_rng())
    }

    /// Compiles the sequence.
    ///
    /// Every block is snapshotted, closed and finalized in creation order,
    /// then the root is walked depth first. Skipped stages are left out
    /// unless they are gameover. Skipped steps are left out, and so are
    /// placeholder steps of stages that have other steps.
    ///
    /// Nothing happens when the stager is already compiled or no stage was
    /// declared.
    ///
    /// # Errors
    ///
    /// Returns the placement error of the first block whose positions
    /// cannot be resolved. The stager is then back in its previous state.
    pub fn finalize_with_rng<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<&mut Self> {
        if self.finalized || self.blocks.len() <= 1 {
            return Ok(self);
        }

        self.blocks.backup_all();
        self.unfinished_blocks_cache = self.open_blocks().into_iter().map(String::from).collect();
        self.unfinished_blocks.clear();

        if let Err(err) = self.blocks.finalize_all_with_rng(rng) {
            warn!(item = %err.item, block = %err.block, "Finalize failed, rolling back");
            self.blocks.restore_all();
            self.reopen_cached_blocks();
            return Err(err.into());
        }

        self.sequence = self.compile_sequence();
        self.finalized = true;
        debug!(stages = self.sequence.len(), "Stager finalized");
        Ok(self)
    }

    /// Reverts [`Stager::finalize`]: blocks get their pending items back and
    /// the sequence is cleared. Nothing happens while building.
    pub fn reset(&mut self) -> &mut Self {
        if !self.finalized {
            return self;
        }

        self.reopen_cached_blocks();
        self.blocks.restore_all();
        self.sequence.clear();
        self.finalized = false;
        debug!("Stager reset");
        self
    }

    /// Drops every record, block and flag. Settings are kept.
    pub fn clear(&mut self) -> &mut Self {
        *self = Self::with_settings(self.settings.clone());
        self
    }

    fn reopen_cached_blocks(&mut self) {
        self.unfinished_blocks = self
            .unfinished_blocks_cache
            .iter()
            .filter_map(|id| self.blocks.handle_of(id))
            .collect();
    }

    fn compile_sequence(&mut self) -> Vec<SequenceEntry> {
        let mut sequence: Vec<SequenceEntry> = Vec::new();
        let mut dropping = false;

        while let Some(entry) = self.blocks.next(self.root) {
            match entry {
                BlockEntry::Stage(item) => {
                    dropping = item.kind != StageKind::Gameover && self.is_skipped(&item.id, None);
                    if dropping {
                        debug!(stage = %item.id, "Skipping stage");
                    } else {
                        sequence.push(SequenceEntry::from(&item));
                    }
                }
                BlockEntry::Step(item) => {
                    if dropping || self.is_skipped(&item.stage, Some(&item.step)) {
                        continue;
                    }
                    let superseded = item.is_default
                        && self.get_stage(&item.stage).is_some_and(|stage| stage.steps.len() > 1);
                    if superseded {
                        continue;
                    }
                    if let Some(current) = sequence.last_mut().filter(|entry| entry.id == item.stage) {
                        current.steps.push(item.step);
                    }
                }
                BlockEntry::Block { .. } => {}
            }
        }
        for entry in sequence.iter().filter(|e| e.kind != StageKind::Gameover && e.steps.is_empty()) {
            warn!(stage = %entry.id, "Stage compiled without steps");
        }
        sequence
    }
}
