//! The stager: registries, fluent sequence building and compilation.
//!
//! A [`Stager`] keeps a registry of steps and stages and a hierarchy of
//! [`Block`](crate::block::Block)s describing where each stage and step may
//! run. The root block holds one stage enclosure per stage invocation; each
//! enclosure holds the stage item followed by a nested step enclosure.
//!
//! The implementation is split by concern:
//! - `registry`: adding, cloning and looking up steps and stages
//! - `builder`: `stage`/`next`/`repeat`/`loop_stage`/`do_loop`/`gameover`/`step`
//! - `skip`: skip flags
//! - `extend`: updates of registered steps and stages
//! - `compile`: `finalize`/`reset` and the compiled sequence
//! - `state`: serializable snapshots

mod builder;
mod compile;
mod extend;
mod registry;
mod sequence;
mod settings;
mod skip;
mod state;
#[cfg(test)]
mod stager_tests;

pub use builder::{StageRef, StepRef};
pub use sequence::{summarize, SequenceEntry, SequenceFormat};
pub use settings::StagerSettings;
pub use skip::SkipFlags;
pub use state::{SetStateMode, StagerState};

use crate::block::{Block, BlockArena, BlockHandle, BlockKind, PositionSpec};
use crate::core::{Stage, Step};
use std::collections::HashMap;

/// Id of the root block.
pub const ROOT_BLOCK_ID: &str = "__default";

/// Id of the stage added by [`Stager::gameover`].
pub const GAMEOVER: &str = "gameover";

pub(crate) fn stage_block_id(item_id: &str) -> String {
    format!("__stage_{item_id}")
}

pub(crate) fn step_block_id(item_id: &str) -> String {
    format!("__steps_{item_id}")
}

/// Builds and compiles the sequence of stages and steps of a game.
///
/// The stager is either *building* (mutations allowed, no sequence) or
/// *compiled* (after [`Stager::finalize`], sequence available). Use
/// [`Stager::reset`] to go back to building.
#[derive(Debug, Clone)]
pub struct Stager {
    pub(crate) steps: HashMap<String, Step>,
    pub(crate) stages: HashMap<String, Stage>,
    pub(crate) aliases: HashMap<String, String>,
    pub(crate) blocks: BlockArena,
    pub(crate) root: BlockHandle,
    pub(crate) unfinished_blocks: Vec<BlockHandle>,
    pub(crate) unfinished_blocks_cache: Vec<String>,
    pub(crate) to_skip: SkipFlags,
    pub(crate) sequence: Vec<SequenceEntry>,
    pub(crate) finalized: bool,
    pub(crate) current_stage: Option<String>,
    pub(crate) current_step_block: Option<BlockHandle>,
    pub(crate) settings: StagerSettings,
}

impl Default for Stager {
    fn default() -> Self {
        Self::new()
    }
}

impl Stager {
    /// Creates an empty stager with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_settings(StagerSettings::default())
    }

    /// Creates an empty stager.
    #[must_use]
    pub fn with_settings(settings: StagerSettings) -> Self {
        let (blocks, root) = BlockArena::with_root(Block::new(
            BlockKind::Default,
            ROOT_BLOCK_ID,
            PositionSpec::Linear,
        ));

        Self {
            steps: HashMap::new(),
            stages: HashMap::new(),
            aliases: HashMap::new(),
            blocks,
            root,
            unfinished_blocks: vec![root],
            unfinished_blocks_cache: Vec::new(),
            to_skip: SkipFlags::default(),
            sequence: Vec::new(),
            finalized: false,
            current_stage: None,
            current_step_block: None,
            settings,
        }
    }

    /// Returns the stage currently receiving steps, if any.
    #[must_use]
    pub fn current_stage(&self) -> Option<&str> {
        self.current_stage.as_deref()
    }

    /// Returns the block hierarchy.
    #[must_use]
    pub fn blocks(&self) -> &BlockArena {
        &self.blocks
    }

    /// Returns the root block handle.
    #[must_use]
    pub fn root(&self) -> BlockHandle {
        self.root
    }

    /// Returns the ids of the blocks still accepting items.
    #[must_use]
    pub fn open_blocks(&self) -> Vec<&str> {
        self.unfinished_blocks
            .iter()
            .filter_map(|&handle| self.blocks.get(handle))
            .map(Block::id)
            .collect()
    }

    /// Returns the skip flags.
    #[must_use]
    pub fn skip_flags(&self) -> &SkipFlags {
        &self.to_skip
    }
}
