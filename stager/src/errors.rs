//! Error types for the stager crate.
//!
//! Every failure is synchronous and surfaces to the caller while the game
//! definition is being authored. Validation problems, block misuse and
//! placement conflicts each have their own type so embedders can tell an
//! authoring bug from a lifecycle mistake.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Stable error codes attached to [`ErrorInfo`].
pub mod codes {
    /// An id is empty, contains a dot or starts with a digit.
    pub const ID_INVALID: &str = "STAGER-ID-INVALID";
    /// A position expression could not be parsed.
    pub const POSITION_INVALID: &str = "STAGER-POSITION-INVALID";
    /// A record is malformed (missing steps, both steps and cb, ...).
    pub const RECORD_INVALID: &str = "STAGER-RECORD-INVALID";
    /// An update tried to change an immutable field.
    pub const UPDATE_INVALID: &str = "STAGER-UPDATE-INVALID";
    /// A builder call was made in the wrong state.
    pub const SEQUENCE_INVALID: &str = "STAGER-SEQUENCE-INVALID";
    /// A skip call mixed two lists of ids.
    pub const SKIP_AMBIGUOUS: &str = "STAGER-SKIP-AMBIGUOUS";
    /// No legal slot was left for an item.
    pub const PLACEMENT: &str = "STAGER-PLACEMENT";
}

/// The main error type for stager operations.
#[derive(Debug, Error)]
pub enum StagerError {
    /// A record, id, position or builder call failed validation.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// A block could not resolve its positions.
    #[error("{0}")]
    Placement(#[from] PlacementError),

    /// A block rejected an operation.
    #[error("{0}")]
    Block(#[from] BlockError),

    /// A mutation was attempted while the stager is compiled.
    #[error("Stager is finalized: call reset() before {operation}")]
    Finalized {
        /// The rejected operation.
        operation: String,
    },

    /// A referenced record does not exist.
    #[error("{kind} not found: '{id}'")]
    NotFound {
        /// The kind of record.
        kind: RecordKind,
        /// The missing id.
        id: String,
    },

    /// A record with the same id is already registered.
    #[error("{kind} already exists: '{id}'")]
    Duplicate {
        /// The kind of record.
        kind: RecordKind,
        /// The duplicated id.
        id: String,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StagerError {
    /// Creates a finalized error for the given operation.
    #[must_use]
    pub fn finalized(operation: impl Into<String>) -> Self {
        Self::Finalized {
            operation: operation.into(),
        }
    }

    /// Creates a not found error.
    #[must_use]
    pub fn not_found(kind: RecordKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Creates a duplicate error.
    #[must_use]
    pub fn duplicate(kind: RecordKind, id: impl Into<String>) -> Self {
        Self::Duplicate {
            kind,
            id: id.into(),
        }
    }

    /// Returns the error code when the error carries one.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Validation(err) => err.error_info.as_ref().map(|info| info.code.as_str()),
            Self::Placement(err) => Some(err.error_info.code.as_str()),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for StagerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// The kind of record an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// A step record.
    Step,
    /// A stage record.
    Stage,
    /// A stage alias.
    Alias,
    /// A block.
    Block,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Step => write!(f, "Step"),
            Self::Stage => write!(f, "Stage"),
            Self::Alias => write!(f, "Alias"),
            Self::Block => write!(f, "Block"),
        }
    }
}

/// Metadata about an error for better diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ErrorInfo {
    /// Error code (e.g., "STAGER-PLACEMENT").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ErrorInfo {
    /// Creates a new error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Error raised when an id, record, position or builder call is invalid.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ValidationError {
    /// The error message.
    pub message: String,
    /// The ids involved in the error.
    pub ids: Vec<String>,
    /// Optional error info.
    pub error_info: Option<ErrorInfo>,
}

impl ValidationError {
    /// Creates a new validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ids: Vec::new(),
            error_info: None,
        }
    }

    /// Creates a validation error carrying an error code.
    #[must_use]
    pub fn coded(code: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let info = ErrorInfo::new(code, message.clone());
        Self::new(message).with_error_info(info)
    }

    /// Sets the ids involved.
    #[must_use]
    pub fn with_ids(mut self, ids: Vec<String>) -> Self {
        self.ids = ids;
        self
    }

    /// Adds a single id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.ids.push(id.into());
        self
    }

    /// Sets the error info.
    #[must_use]
    pub fn with_error_info(mut self, info: ErrorInfo) -> Self {
        self.error_info = Some(info);
        self
    }

    /// Sets the fix hint, creating the error info when missing.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        let info = self
            .error_info
            .take()
            .unwrap_or_else(|| ErrorInfo::new(codes::RECORD_INVALID, self.message.clone()));
        self.error_info = Some(info.with_fix_hint(hint));
        self
    }

    /// Returns the error code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.error_info.as_ref().map(|info| info.code.as_str())
    }
}

/// Error raised when an item's position constraints leave it no legal slot.
#[derive(Debug, Clone, Error)]
#[error("Cannot place item '{item}' in block '{block}': no legal position left")]
pub struct PlacementError {
    /// The item that could not be placed.
    pub item: String,
    /// The block being finalized.
    pub block: String,
    /// Error info.
    pub error_info: ErrorInfo,
}

impl PlacementError {
    /// Creates a new placement error.
    #[must_use]
    pub fn new(item: impl Into<String>, block: impl Into<String>) -> Self {
        let item = item.into();
        let block = block.into();
        let info = ErrorInfo::new(
            codes::PLACEMENT,
            format!("Item '{item}' has no free position in block '{block}'"),
        )
        .with_fix_hint("Check for contradictory explicit positions among items of the same block.")
        .with_context_entry("item", item.clone())
        .with_context_entry("block", block.clone());

        Self {
            item,
            block,
            error_info: info,
        }
    }
}

/// Errors raised by block operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockError {
    /// The block is finalized and cannot be mutated.
    #[error("Block '{block}' is finalized: cannot {operation}")]
    Finalized {
        /// The block id.
        block: String,
        /// The rejected operation.
        operation: String,
    },

    /// The item id is already present in the block.
    #[error("Block '{block}' already contains item '{item}'")]
    DuplicateItem {
        /// The block id.
        block: String,
        /// The duplicated item id.
        item: String,
    },

    /// A block with the same id already exists in the arena.
    #[error("Block already exists: '{block}'")]
    DuplicateBlock {
        /// The block id.
        block: String,
    },

    /// No block is stored under the handle.
    #[error("Unknown block handle: {handle}")]
    UnknownHandle {
        /// The raw handle.
        handle: usize,
    },
}

impl BlockError {
    /// Creates a finalized error.
    #[must_use]
    pub fn finalized(block: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::Finalized {
            block: block.into(),
            operation: operation.into(),
        }
    }

    /// Creates a duplicate item error.
    #[must_use]
    pub fn duplicate_item(block: impl Into<String>, item: impl Into<String>) -> Self {
        Self::DuplicateItem {
            block: block.into(),
            item: item.into(),
        }
    }
}

/// Result type used throughout the crate.
pub type Result<T, E = StagerError> = std::result::Result<T, E>;
