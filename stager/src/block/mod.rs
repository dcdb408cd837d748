//! Recursive ordered containers with position constraints.
//!
//! This module provides:
//! - The position mini-language (`"linear"`, `"*"`, `"0,2-4,7"`)
//! - Block entries and handles
//! - The `Block` container and its resolver
//! - The `BlockArena` owning a block hierarchy

mod arena;
mod container;
mod entry;
mod position;

pub use arena::BlockArena;
pub use container::{Block, BlockSnapshot, PendingEntry};
pub use entry::{BlockEntry, BlockHandle, BlockKind, StageItem, StepItem};
pub use position::{
    parse_positions, resolve_positions, PositionRange, PositionSpec, LINEAR, WILDCARD,
};
