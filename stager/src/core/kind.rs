//! Stage kind enum.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How the executor runs a stage entry of the compiled sequence.
///
/// The stager only records the kind; repetition is decided by the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StageKind {
    /// Run the stage once.
    #[default]
    Plain,
    /// Run the stage a fixed number of times.
    Repeat,
    /// Run the stage while a callback returns true, checked before each run.
    Loop,
    /// Run the stage at least once, then while a callback returns true.
    DoLoop,
    /// Terminal stage of the game.
    Gameover,
}

impl StageKind {
    /// Returns true for kinds that carry a callback.
    #[must_use]
    pub fn is_loop(self) -> bool {
        matches!(self, Self::Loop | Self::DoLoop)
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Repeat => write!(f, "repeat"),
            Self::Loop => write!(f, "loop"),
            Self::DoLoop => write!(f, "doLoop"),
            Self::Gameover => write!(f, "gameover"),
        }
    }
}
