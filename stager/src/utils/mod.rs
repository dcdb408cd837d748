//! Utility functions for id validation and stage references.

mod validation;

pub use validation::{parse_stage_reference, step_key, validate_id, StageReference};
