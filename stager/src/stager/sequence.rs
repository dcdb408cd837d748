//! The compiled sequence consumed by the executor.

use crate::block::StageItem;
use crate::core::{Callback, StageKind};
use serde::{Deserialize, Serialize};

/// One stage of the compiled sequence with the steps it runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceEntry {
    /// Stage id, or alias when the stage was inserted under one.
    pub id: String,
    /// How the executor runs the stage.
    pub kind: StageKind,
    /// Number of repetitions for repeat stages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num: Option<u32>,
    /// Loop condition for loop and doLoop stages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cb: Option<Callback>,
    /// Step ids, in execution order.
    #[serde(default)]
    pub steps: Vec<String>,
}

impl From<&StageItem> for SequenceEntry {
    fn from(item: &StageItem) -> Self {
        Self {
            id: item.id.clone(),
            kind: item.kind,
            num: item.num,
            cb: item.cb.clone(),
            steps: Vec::new(),
        }
    }
}

/// Human-readable views of the compiled sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceFormat {
    /// Stage ids in order.
    Stages,
    /// `"stage.step"` ids in order.
    Steps,
}

/// Renders a sequence in the requested format.
#[must_use]
pub fn summarize(sequence: &[SequenceEntry], format: SequenceFormat) -> Vec<String> {
    match format {
        SequenceFormat::Stages => sequence.iter().map(|entry| entry.id.clone()).collect(),
        SequenceFormat::Steps => sequence
            .iter()
            .flat_map(|entry| {
                entry
                    .steps
                    .iter()
                    .map(move |step| crate::utils::step_key(&entry.id, step))
            })
            .collect(),
    }
}
