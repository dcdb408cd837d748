//! Testing utilities for stager definitions.
//!
//! This module provides:
//! - A fixture builder for stagers with registered and placed stages
//! - Assertions on compiled sequences

mod assertions;
mod fixtures;

pub use assertions::{
    assert_sequence_stages, assert_sequence_steps, assert_stage_kind, assert_step_skipped,
};
pub use fixtures::{seeded_rng, StagerFixture};
