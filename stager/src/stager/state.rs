//! Serializable snapshots used to transfer a game definition.

use super::{step_block_id, SequenceEntry, SkipFlags, Stager, StagerSettings, GAMEOVER, ROOT_BLOCK_ID};
use crate::block::{BlockArena, BlockHandle};
use crate::core::{Stage, Step};
use crate::errors::{codes, RecordKind, Result, StagerError, ValidationError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Everything needed to rebuild a stager elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagerState {
    /// Registered steps.
    pub steps: BTreeMap<String, Step>,
    /// Registered stages.
    pub stages: BTreeMap<String, Stage>,
    /// Stage aliases.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
    /// The compiled sequence, empty unless `finalized`.
    #[serde(default)]
    pub sequence: Vec<SequenceEntry>,
    /// Skip flags.
    #[serde(default)]
    pub to_skip: SkipFlags,
    /// The block hierarchy.
    pub blocks: BlockArena,
    /// Ids of the blocks accepting items.
    #[serde(default)]
    pub unfinished_blocks: Vec<String>,
    /// Ids of the blocks reopened by `reset`.
    #[serde(default)]
    pub unfinished_blocks_cache: Vec<String>,
    /// Whether the sequence is compiled.
    #[serde(default)]
    pub finalized: bool,
    /// The stage receiving steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_stage: Option<String>,
    /// Default callbacks, properties and hooks.
    #[serde(default)]
    pub settings: StagerSettings,
}

impl StagerState {
    /// Serializes the state to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses a state from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// SHA-256 of the JSON encoding, hex encoded.
    ///
    /// Two peers holding the same definition get the same fingerprint.
    pub fn fingerprint(&self) -> Result<String> {
        let json = self.to_json()?;
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        Ok(hex::encode(hasher.finalize()))
    }
}

/// How [`Stager::set_state`] combines a snapshot with the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetStateMode {
    /// Drop the current state first.
    #[default]
    Replace,
    /// Merge registries, aliases, flags and settings.
    Append,
}

impl fmt::Display for SetStateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Replace => write!(f, "replace"),
            Self::Append => write!(f, "append"),
        }
    }
}

impl FromStr for SetStateMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "replace" => Ok(Self::Replace),
            "append" => Ok(Self::Append),
            other => Err(ValidationError::coded(
                codes::RECORD_INVALID,
                format!("Unknown set_state mode: '{other}'"),
            )
            .with_fix_hint("Use \"replace\" or \"append\".")),
        }
    }
}

impl Stager {
    /// Snapshots the stager, compiling it first when `finalize` is true.
    ///
    /// # Errors
    ///
    /// Returns the placement error of a failed compilation.
    pub fn get_state(&mut self, finalize: bool) -> Result<StagerState> {
        if finalize {
            self.finalize()?;
        }

        Ok(StagerState {
            steps: self.steps.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            stages: self.stages.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            aliases: self.aliases.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            sequence: self.sequence.clone(),
            to_skip: self.to_skip.clone(),
            blocks: self.blocks.clone(),
            unfinished_blocks: self.open_blocks().into_iter().map(String::from).collect(),
            unfinished_blocks_cache: self.unfinished_blocks_cache.clone(),
            finalized: self.finalized,
            current_stage: self.current_stage.clone(),
            settings: self.settings.clone(),
        })
    }

    /// Loads a snapshot.
    ///
    /// [`SetStateMode::Replace`] discards the current state. With
    /// [`SetStateMode::Append`] incoming records replace local ones with the
    /// same id. The incoming blocks and sequence are adopted when no stage
    /// has been placed locally yet.
    ///
    /// # Errors
    ///
    /// Fails if the snapshot has no root block or names unknown open blocks,
    /// when appending to a finalized stager, and when appending placed
    /// stages onto a stager that has placed stages of its own. Nothing is
    /// merged on error.
    pub fn set_state(&mut self, state: StagerState, mode: SetStateMode) -> Result<&mut Self> {
        if mode == SetStateMode::Append {
            self.ensure_building("set_state")?;
        }
        let root = state.blocks.handle_of(ROOT_BLOCK_ID).ok_or_else(|| {
            ValidationError::coded(codes::RECORD_INVALID, "Snapshot has no root block")
                .with_id(ROOT_BLOCK_ID)
        })?;
        let open = Self::handles_of(&state.blocks, &state.unfinished_blocks)?;
        if mode == SetStateMode::Append && self.blocks.len() > 1 && state.blocks.len() > 1 {
            return Err(ValidationError::coded(
                codes::SEQUENCE_INVALID,
                "Cannot append a block hierarchy onto a stager with placed stages",
            )
            .with_fix_hint("Append onto a stager with no placed stages, or use replace.")
            .into());
        }

        match mode {
            SetStateMode::Replace => {
                *self = Self::with_settings(state.settings);
                self.steps = state.steps.into_iter().collect();
                self.stages = state.stages.into_iter().collect();
                self.aliases = state.aliases.into_iter().collect();
                self.to_skip = state.to_skip;
            }
            SetStateMode::Append => {
                let adopt = self.blocks.len() <= 1;
                self.steps.extend(state.steps);
                self.stages.extend(state.stages);
                self.aliases.extend(state.aliases);
                self.to_skip.merge(state.to_skip);
                self.settings.merge(state.settings);
                if !adopt {
                    debug!("Snapshot has no placed stages, merged into registries");
                    return Ok(self);
                }
            }
        }

        self.blocks = state.blocks;
        self.root = root;
        self.unfinished_blocks = open;
        self.unfinished_blocks_cache = state.unfinished_blocks_cache;
        self.sequence = state.sequence;
        self.finalized = state.finalized;
        self.current_step_block = state
            .current_stage
            .as_deref()
            .filter(|stage| *stage != GAMEOVER)
            .and_then(|stage| self.blocks.handle_of(&step_block_id(stage)))
            .filter(|handle| self.unfinished_blocks.contains(handle));
        self.current_stage = state.current_stage;

        debug!(mode = %mode, blocks = self.blocks.len(), "Loaded stager state");
        Ok(self)
    }

    fn handles_of(blocks: &BlockArena, ids: &[String]) -> Result<Vec<BlockHandle>> {
        ids.iter()
            .map(|id| {
                blocks
                    .handle_of(id)
                    .ok_or_else(|| StagerError::not_found(RecordKind::Block, id))
            })
            .collect()
    }
}
