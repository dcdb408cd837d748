//! Entries stored inside blocks.

use crate::core::{Callback, StageKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a block inside a [`BlockArena`](super::BlockArena).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockHandle(pub(crate) usize);

impl BlockHandle {
    /// Returns the raw arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for BlockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The role of a block in the stage/step hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockKind {
    /// The root block holding every stage enclosure.
    #[default]
    Default,
    /// Holds one stage item followed by its step enclosure.
    StageEnclosure,
    /// Holds the step items of one stage.
    StepEnclosure,
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::StageEnclosure => write!(f, "stageEnclosure"),
            Self::StepEnclosure => write!(f, "stepEnclosure"),
        }
    }
}

/// A stage invocation inside a stage enclosure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageItem {
    /// Id in the sequence: the alias if one was used, else the stage id.
    pub id: String,
    /// The registered stage the item refers to.
    pub stage: String,
    /// How the executor runs the stage.
    pub kind: StageKind,
    /// Number of repetitions for [`StageKind::Repeat`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num: Option<u32>,
    /// Loop condition for [`StageKind::Loop`] and [`StageKind::DoLoop`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cb: Option<Callback>,
}

impl StageItem {
    /// Creates a plain stage item.
    #[must_use]
    pub fn new(id: impl Into<String>, stage: impl Into<String>, kind: StageKind) -> Self {
        Self {
            id: id.into(),
            stage: stage.into(),
            kind,
            num: None,
            cb: None,
        }
    }
}

/// A step inside a step enclosure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepItem {
    /// The id of the enclosing stage item.
    pub stage: String,
    /// The step id.
    pub step: String,
    /// Whether the step is a synthesized placeholder.
    #[serde(default)]
    pub is_default: bool,
}

impl StepItem {
    /// Creates a step item.
    #[must_use]
    pub fn new(stage: impl Into<String>, step: impl Into<String>, is_default: bool) -> Self {
        Self {
            stage: stage.into(),
            step: step.into(),
            is_default,
        }
    }
}

/// Anything a block can hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BlockEntry {
    /// A stage item.
    Stage(StageItem),
    /// A step item.
    Step(StepItem),
    /// A nested block.
    Block {
        /// The nested block id.
        id: String,
        /// The nested block handle.
        handle: BlockHandle,
    },
}

impl BlockEntry {
    /// The id used for uniqueness inside the enclosing block.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Stage(item) => &item.id,
            Self::Step(item) => &item.step,
            Self::Block { id, .. } => id,
        }
    }

    /// Returns true for a placeholder step.
    #[must_use]
    pub fn is_default_step(&self) -> bool {
        matches!(self, Self::Step(item) if item.is_default)
    }

    /// Returns the nested block handle, if any.
    #[must_use]
    pub fn nested(&self) -> Option<BlockHandle> {
        match self {
            Self::Block { handle, .. } => Some(*handle),
            _ => None,
        }
    }
}
