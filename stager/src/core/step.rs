//! Step records and step updates.

use super::Callback;
use crate::errors::{codes, RecordKind, ValidationError};
use crate::utils::validate_id;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A named unit of work plus optional lifecycle hooks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// The unique step id.
    pub id: String,
    /// The step callback.
    pub cb: Callback,
    /// Hook run before the step callback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init: Option<Callback>,
    /// Hook run when the step is left.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit: Option<Callback>,
    /// Hook deciding whether the step is done.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done: Option<Callback>,
    /// Whether the builder synthesized this step as a placeholder.
    #[serde(default)]
    pub is_default: bool,
    /// Extra properties forwarded to the executor untouched.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
}

impl Step {
    /// Creates a new step.
    #[must_use]
    pub fn new(id: impl Into<String>, cb: impl Into<Callback>) -> Self {
        Self {
            id: id.into(),
            cb: cb.into(),
            init: None,
            exit: None,
            done: None,
            is_default: false,
            properties: Map::new(),
        }
    }

    /// Creates a placeholder step synthesized by a shorthand call.
    #[must_use]
    pub(crate) fn placeholder(id: impl Into<String>, cb: Callback) -> Self {
        let mut step = Self::new(id, cb);
        step.is_default = true;
        step
    }

    /// Sets the init hook.
    #[must_use]
    pub fn with_init(mut self, cb: impl Into<Callback>) -> Self {
        self.init = Some(cb.into());
        self
    }

    /// Sets the exit hook.
    #[must_use]
    pub fn with_exit(mut self, cb: impl Into<Callback>) -> Self {
        self.exit = Some(cb.into());
        self
    }

    /// Sets the done hook.
    #[must_use]
    pub fn with_done(mut self, cb: impl Into<Callback>) -> Self {
        self.done = Some(cb.into());
        self
    }

    /// Adds a property.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// Validates the step.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_id(RecordKind::Step, &self.id)
    }

    /// Shallow-merges an update into the step.
    ///
    /// The id cannot be changed through an update.
    pub fn apply(&mut self, update: StepUpdate) -> Result<(), ValidationError> {
        if let Some(id) = update.id {
            if id != self.id {
                return Err(ValidationError::coded(
                    codes::UPDATE_INVALID,
                    format!("Step '{}': id cannot be changed to '{id}'", self.id),
                )
                .with_ids(vec![self.id.clone(), id]));
            }
        }
        if let Some(cb) = update.cb {
            self.cb = cb;
        }
        if let Some(init) = update.init {
            self.init = Some(init);
        }
        if let Some(exit) = update.exit {
            self.exit = Some(exit);
        }
        if let Some(done) = update.done {
            self.done = Some(done);
        }
        self.properties.extend(update.properties);
        Ok(())
    }
}

/// A partial step used by `extend_step`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepUpdate {
    /// Must match the step id when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Replacement callback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cb: Option<Callback>,
    /// Replacement init hook.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init: Option<Callback>,
    /// Replacement exit hook.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit: Option<Callback>,
    /// Replacement done hook.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done: Option<Callback>,
    /// Properties merged over the existing ones.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
}

impl StepUpdate {
    /// Creates an empty update.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the id the update expects.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Replaces the callback.
    #[must_use]
    pub fn with_cb(mut self, cb: impl Into<Callback>) -> Self {
        self.cb = Some(cb.into());
        self
    }

    /// Replaces the init hook.
    #[must_use]
    pub fn with_init(mut self, cb: impl Into<Callback>) -> Self {
        self.init = Some(cb.into());
        self
    }

    /// Replaces the exit hook.
    #[must_use]
    pub fn with_exit(mut self, cb: impl Into<Callback>) -> Self {
        self.exit = Some(cb.into());
        self
    }

    /// Replaces the done hook.
    #[must_use]
    pub fn with_done(mut self, cb: impl Into<Callback>) -> Self {
        self.done = Some(cb.into());
        self
    }

    /// Sets a property.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_step_creation() {
        let step = Step::new("intro", "show_intro")
            .with_init("prepare")
            .with_property("timer", json!(30_000));

        assert_eq!(step.id, "intro");
        assert_eq!(step.cb.name(), "show_intro");
        assert_eq!(step.init, Some(Callback::new("prepare")));
        assert!(!step.is_default);
        assert!(step.validate().is_ok());
    }

    #[test]
    fn test_step_invalid_id() {
        assert!(Step::new("a.b", "cb").validate().is_err());
        assert!(Step::new("9a", "cb").validate().is_err());
    }

    #[test]
    fn test_step_apply_merges() {
        let mut step = Step::new("intro", "show_intro").with_property("timer", json!(10));
        step.apply(
            StepUpdate::new()
                .with_cb("show_intro_v2")
                .with_done("check")
                .with_property("timer", json!(20))
                .with_property("width", json!(100)),
        )
        .unwrap();

        assert_eq!(step.cb.name(), "show_intro_v2");
        assert_eq!(step.done, Some(Callback::new("check")));
        assert_eq!(step.properties.get("timer"), Some(&json!(20)));
        assert_eq!(step.properties.get("width"), Some(&json!(100)));
    }

    #[test]
    fn test_step_apply_rejects_id_change() {
        let mut step = Step::new("intro", "cb");
        let err = step.apply(StepUpdate::new().with_id("other")).unwrap_err();
        assert_eq!(err.code(), Some(codes::UPDATE_INVALID));
        assert_eq!(step.id, "intro");

        assert!(step.apply(StepUpdate::new().with_id("intro")).is_ok());
    }

    #[test]
    fn test_step_serialization_skips_empty_fields() {
        let value = serde_json::to_value(Step::new("a", "cb")).unwrap();
        assert_eq!(value, json!({"id": "a", "cb": "cb", "isDefault": false}));
    }
}
