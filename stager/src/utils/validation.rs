//! Validation utilities for step and stage identifiers.
//!
//! Ids are used as keys in the registries, in `"stage.step"` skip keys and in
//! the `"<stage> AS <alias>"` reference syntax, so they must be non-empty,
//! must not contain a dot and must not start with a digit.

use crate::errors::{codes, ErrorInfo, RecordKind, ValidationError};
use regex::Regex;
use std::sync::LazyLock;

static ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^0-9.][^.]*$").expect("valid id pattern")
});

static ALIAS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\S+)\s+AS\s+(\S+)\s*$").expect("valid alias pattern")
});

/// Validates a step, stage or alias id.
pub fn validate_id(kind: RecordKind, id: &str) -> Result<(), ValidationError> {
    if id.is_empty() {
        return Err(ValidationError::coded(
            codes::ID_INVALID,
            format!("{kind} id cannot be empty"),
        ));
    }

    if !ID_PATTERN.is_match(id) {
        let reason = if id.contains('.') {
            "cannot contain '.'"
        } else {
            "cannot start with a digit"
        };
        return Err(ValidationError::new(format!("{kind} id '{id}' {reason}"))
            .with_id(id)
            .with_error_info(
                ErrorInfo::new(codes::ID_INVALID, format!("Invalid {kind} id"))
                    .with_fix_hint("Use an id without dots that starts with a letter or underscore.")
                    .with_context_entry("id", id),
            ));
    }

    Ok(())
}

/// A parsed stage reference: the stage id plus an optional alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReference {
    /// The referenced stage id.
    pub id: String,
    /// The alias the stage is inserted under, if any.
    pub alias: Option<String>,
}

impl StageReference {
    /// The id the stage appears under in the sequence.
    #[must_use]
    pub fn sequence_id(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.id)
    }
}

/// Parses `"stage"` or `"stage AS alias"`.
///
/// Both ids are validated.
pub fn parse_stage_reference(input: &str) -> Result<StageReference, ValidationError> {
    if let Some(caps) = ALIAS_PATTERN.captures(input) {
        let id = caps[1].to_string();
        let alias = caps[2].to_string();
        validate_id(RecordKind::Stage, &id)?;
        validate_id(RecordKind::Alias, &alias)?;
        if id == alias {
            return Err(ValidationError::coded(
                codes::ID_INVALID,
                format!("Alias '{alias}' cannot be equal to the stage id"),
            )
            .with_id(alias));
        }
        return Ok(StageReference {
            id,
            alias: Some(alias),
        });
    }

    let id = input.trim();
    validate_id(RecordKind::Stage, id)?;
    Ok(StageReference {
        id: id.to_string(),
        alias: None,
    })
}

/// Builds the `"stage.step"` key used by the skip registry.
#[must_use]
pub fn step_key(stage: &str, step: &str) -> String {
    format!("{stage}.{step}")
}
