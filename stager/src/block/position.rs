//! Position specifications and their resolution.
//!
//! A position specification tells a [`Block`](super::Block) where an item
//! may be placed:
//! - `"linear"`: the slot matching the item's declaration order
//! - `"*"`: any slot still open
//! - `"0,2-4,7"`: any open slot among the listed indices and inclusive ranges

use crate::errors::{codes, ErrorInfo, ValidationError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Keyword for linear placement.
pub const LINEAR: &str = "linear";

/// Keyword for wildcard placement.
pub const WILDCARD: &str = "*";

static TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)(?:\s*-\s*(\d+))?$").expect("valid position token pattern")
});

/// One element of an explicit position list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionRange {
    /// A single index.
    Index(usize),
    /// An inclusive range of indices.
    Range {
        /// First index.
        start: usize,
        /// Last index.
        end: usize,
    },
}

impl PositionRange {
    /// Returns true if the index is covered.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        match *self {
            Self::Index(i) => i == index,
            Self::Range { start, end } => (start..=end).contains(&index),
        }
    }
}

impl fmt::Display for PositionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{i}"),
            Self::Range { start, end } => write!(f, "{start}-{end}"),
        }
    }
}

/// Where an item may be placed inside its block.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PositionSpec {
    /// The slot matching the declaration order.
    #[default]
    Linear,
    /// Any open slot.
    Wildcard,
    /// Any open slot among the listed indices.
    Explicit(Vec<PositionRange>),
}

impl PositionSpec {
    /// Parses a position expression.
    ///
    /// # Errors
    ///
    /// Returns an error for empty expressions, empty tokens, non-numeric
    /// tokens and descending ranges.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        parse_positions(input)
    }

    /// Parses an optional expression, defaulting to linear.
    pub fn parse_optional(input: Option<&str>) -> Result<Self, ValidationError> {
        input.map_or(Ok(Self::Linear), parse_positions)
    }

    /// Returns the legal indices for an item.
    #[must_use]
    pub fn resolve(&self, ordinal: usize, available: &[usize]) -> Vec<usize> {
        resolve_positions(self, ordinal, available)
    }
}

impl fmt::Display for PositionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linear => f.write_str(LINEAR),
            Self::Wildcard => f.write_str(WILDCARD),
            Self::Explicit(ranges) => {
                let parts: Vec<String> = ranges.iter().map(ToString::to_string).collect();
                f.write_str(&parts.join(","))
            }
        }
    }
}

impl FromStr for PositionSpec {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_positions(s)
    }
}

impl TryFrom<String> for PositionSpec {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_positions(&value)
    }
}

impl From<PositionSpec> for String {
    fn from(spec: PositionSpec) -> Self {
        spec.to_string()
    }
}

fn invalid(input: &str, reason: &str) -> ValidationError {
    ValidationError::new(format!("Invalid position expression '{input}': {reason}"))
        .with_error_info(
            ErrorInfo::new(codes::POSITION_INVALID, "Invalid position expression")
                .with_fix_hint("Use \"linear\", \"*\" or a list like \"0,2-4,7\".")
                .with_context_entry("positions", input),
        )
}

/// Parses a position expression into a [`PositionSpec`].
pub fn parse_positions(input: &str) -> Result<PositionSpec, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(invalid(input, "expression is empty"));
    }
    if trimmed == LINEAR {
        return Ok(PositionSpec::Linear);
    }
    if trimmed == WILDCARD {
        return Ok(PositionSpec::Wildcard);
    }

    let mut ranges = Vec::new();
    for token in trimmed.split(',') {
        let token = token.trim();
        if token.is_empty() {
            return Err(invalid(input, "empty element"));
        }
        let caps = TOKEN_PATTERN
            .captures(token)
            .ok_or_else(|| invalid(input, &format!("'{token}' is not an index or a range")))?;

        let start: usize = caps[1]
            .parse()
            .map_err(|_| invalid(input, &format!("'{token}' is out of range")))?;
        match caps.get(2) {
            None => ranges.push(PositionRange::Index(start)),
            Some(end) => {
                let end: usize = end
                    .as_str()
                    .parse()
                    .map_err(|_| invalid(input, &format!("'{token}' is out of range")))?;
                if end < start {
                    return Err(invalid(input, &format!("range '{token}' is descending")));
                }
                ranges.push(PositionRange::Range { start, end });
            }
        }
    }

    Ok(PositionSpec::Explicit(ranges))
}

/// Resolves a specification against the currently available slots.
///
/// `ordinal` is the item's declaration index among the pending items and is
/// only used by [`PositionSpec::Linear`]. The result keeps the order of
/// `available`.
#[must_use]
pub fn resolve_positions(spec: &PositionSpec, ordinal: usize, available: &[usize]) -> Vec<usize> {
    match spec {
        PositionSpec::Linear => available
            .iter()
            .copied()
            .filter(|&slot| slot == ordinal)
            .collect(),
        PositionSpec::Wildcard => available.to_vec(),
        PositionSpec::Explicit(ranges) => available
            .iter()
            .copied()
            .filter(|&slot| ranges.iter().any(|range| range.contains(slot)))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_keywords() {
        assert_eq!(parse_positions("linear").unwrap(), PositionSpec::Linear);
        assert_eq!(parse_positions(" * ").unwrap(), PositionSpec::Wildcard);
    }

    #[test]
    fn test_parse_explicit_list() {
        let spec = parse_positions("0, 2-4,7").unwrap();
        assert_eq!(
            spec,
            PositionSpec::Explicit(vec![
                PositionRange::Index(0),
                PositionRange::Range { start: 2, end: 4 },
                PositionRange::Index(7),
            ])
        );
        assert_eq!(spec.to_string(), "0,2-4,7");
    }

    #[test]
    fn test_parse_errors() {
        for input in ["", "  ", "1,", ",1", "a", "1-", "4-2", "-1", "1.5", "linear,1"] {
            let err = parse_positions(input).unwrap_err();
            assert_eq!(err.code(), Some(codes::POSITION_INVALID), "input {input:?}");
        }
    }

    #[test]
    fn test_parse_optional_defaults_to_linear() {
        assert_eq!(PositionSpec::parse_optional(None).unwrap(), PositionSpec::Linear);
        assert_eq!(
            PositionSpec::parse_optional(Some("*")).unwrap(),
            PositionSpec::Wildcard
        );
    }

    #[test]
    fn test_resolve_linear() {
        assert_eq!(resolve_positions(&PositionSpec::Linear, 1, &[0, 1, 2]), vec![1]);
        assert!(resolve_positions(&PositionSpec::Linear, 1, &[0, 2]).is_empty());
    }

    #[test]
    fn test_resolve_wildcard() {
        assert_eq!(
            resolve_positions(&PositionSpec::Wildcard, 0, &[0, 2, 3]),
            vec![0, 2, 3]
        );
    }

    #[test]
    fn test_resolve_explicit_intersects_available() {
        let spec = parse_positions("0,2-4,7").unwrap();
        assert_eq!(resolve_positions(&spec, 0, &[0, 1, 3, 4, 5]), vec![0, 3, 4]);
        assert!(resolve_positions(&spec, 0, &[1, 5, 6]).is_empty());
    }

    #[test]
    fn test_serde_as_string() {
        let spec = parse_positions("1-3").unwrap();
        let json = serde_json::to_string(&spec).unwrap();
        assert_eq!(json, "\"1-3\"");
        let back: PositionSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spec);
        assert!(serde_json::from_str::<PositionSpec>("\"x\"").is_err());
    }
}
