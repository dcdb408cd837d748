//! Core domain model types for the stager.
//!
//! This module contains the records the builder registers and compiles:
//! - Opaque callback handles
//! - Step and stage records with their partial updates
//! - The stage kind recorded in the compiled sequence

mod callback;
mod kind;
mod stage;
mod step;

pub use callback::{Callback, DEFAULT_CALLBACK};
pub use kind::StageKind;
pub use stage::{Stage, StageUpdate};
pub use step::{Step, StepUpdate};
