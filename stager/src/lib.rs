//! # Stager
//!
//! Sequence builder for synchronized, multi-participant, step-based sessions.
//!
//! A game definition is made of *stages*, each an ordered list of *steps*.
//! Stages and steps declare where they may run (a fixed slot, a range of
//! slots, anywhere, or the next free slot) and the stager resolves all the
//! declarations at once into one linear sequence for an external executor.
//!
//! - **Registries**: steps and stages with opaque callback handles
//! - **Blocks**: nestable containers resolving position constraints
//! - **Compilation**: `finalize`/`reset` with full rollback
//! - **Snapshots**: serializable state to transfer a definition to a peer
//!
//! ## Quick Start
//!
//! ```rust
//! use stager::prelude::*;
//!
//! let mut stager = Stager::new();
//! stager
//!     .add_stage(Stage::new("intro").with_callback("show_rules"))?
//!     .stage("intro", None)?
//!     .stage("round", None)?
//!     .step("bid", None)?
//!     .step("reveal", None)?
//!     .gameover()?
//!     .finalize()?;
//!
//! assert_eq!(
//!     stager.sequence_summary(SequenceFormat::Steps)?,
//!     vec!["intro.intro", "round.bid", "round.reveal"]
//! );
//! # Ok::<(), stager::errors::StagerError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod block;
pub mod core;
pub mod errors;
pub mod stager;
pub mod testing;
pub mod utils;

pub use crate::stager::Stager;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::block::{Block, BlockArena, BlockEntry, BlockHandle, BlockKind, PositionSpec};
    pub use crate::core::{Callback, Stage, StageKind, StageUpdate, Step, StepUpdate};
    pub use crate::errors::{
        BlockError, ErrorInfo, PlacementError, RecordKind, StagerError, ValidationError,
    };
    pub use crate::stager::{
        SequenceEntry, SequenceFormat, SetStateMode, SkipFlags, Stager, StagerSettings,
        StagerState, StageRef, StepRef,
    };
}
