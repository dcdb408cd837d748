//! Stage records and stage updates.

use super::Callback;
use crate::errors::{codes, RecordKind, ValidationError};
use crate::utils::validate_id;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// A named, ordered group of steps.
///
/// A stage is declared either with a list of step ids or with a single
/// callback. In the latter case registering the stage synthesizes a step
/// with the same id, and the stored record only keeps `steps = [id]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    /// The unique stage id.
    pub id: String,
    /// Ordered step ids.
    #[serde(default)]
    pub steps: Vec<String>,
    /// Callback of the single synthesized step, only set before registration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cb: Option<Callback>,
    /// Hook run when the stage is entered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init: Option<Callback>,
    /// Hook run when the stage is left.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit: Option<Callback>,
    /// Hook deciding whether the stage is done.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done: Option<Callback>,
    /// Extra properties forwarded to the executor untouched.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
}

impl Stage {
    /// Creates a stage without steps.
    ///
    /// Either [`Stage::with_steps`] or [`Stage::with_callback`] must be used
    /// before the stage can be registered.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            steps: Vec::new(),
            cb: None,
            init: None,
            exit: None,
            done: None,
            properties: Map::new(),
        }
    }

    /// Sets the step ids.
    #[must_use]
    pub fn with_steps<I, S>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.steps = steps.into_iter().map(Into::into).collect();
        self
    }

    /// Appends a step id.
    #[must_use]
    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.steps.push(step.into());
        self
    }

    /// Declares the stage through a single callback.
    #[must_use]
    pub fn with_callback(mut self, cb: impl Into<Callback>) -> Self {
        self.cb = Some(cb.into());
        self
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

    /// Validates a stage declaration.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is invalid, if both or neither of
    /// `steps`/`cb` are set, or if a step id is invalid or repeated.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_id(RecordKind::Stage, &self.id)?;

        match (&self.cb, self.steps.is_empty()) {
            (Some(_), false) => Err(ValidationError::coded(
                codes::RECORD_INVALID,
                format!("Stage '{}': steps and cb cannot be set together", self.id),
            )
            .with_id(&self.id)),
            (None, true) => Err(ValidationError::coded(
                codes::RECORD_INVALID,
                format!("Stage '{}': either steps or cb must be set", self.id),
            )
            .with_id(&self.id)
            .with_fix_hint("Use Stage::with_steps or Stage::with_callback.")),
            (Some(_), true) => Ok(()),
            (None, false) => self.validate_steps(),
        }
    }

    /// Validates the step list of a registered stage.
    pub(crate) fn validate_steps(&self) -> Result<(), ValidationError> {
        if self.steps.is_empty() {
            return Err(ValidationError::coded(
                codes::RECORD_INVALID,
                format!("Stage '{}': steps cannot be empty", self.id),
            )
            .with_id(&self.id));
        }

        let mut seen = HashSet::new();
        for step in &self.steps {
            validate_id(RecordKind::Step, step)?;
            if !seen.insert(step.as_str()) {
                return Err(ValidationError::coded(
                    codes::RECORD_INVALID,
                    format!("Stage '{}': step '{step}' is listed twice", self.id),
                )
                .with_ids(vec![self.id.clone(), step.clone()]));
            }
        }
        Ok(())
    }

    /// Shallow-merges an update into the stage.
    ///
    /// Returns true if the step list changed.
    pub fn apply(&mut self, update: StageUpdate) -> Result<bool, ValidationError> {
        if let Some(id) = update.id {
            if id != self.id {
                return Err(ValidationError::coded(
                    codes::UPDATE_INVALID,
                    format!("Stage '{}': id cannot be changed to '{id}'", self.id),
                )
                .with_ids(vec![self.id.clone(), id]));
            }
        }
        if update.cb.is_some() {
            return Err(ValidationError::coded(
                codes::UPDATE_INVALID,
                format!("Stage '{}': cb cannot be set through an update", self.id),
            )
            .with_id(&self.id)
            .with_fix_hint("Extend the stage steps instead."));
        }

        let steps_changed = match update.steps {
            Some(steps) if steps != self.steps => {
                self.steps = steps;
                true
            }
            _ => false,
        };
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

        self.validate_steps()?;
        Ok(steps_changed)
    }
}

/// A partial stage used by `extend_stage`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageUpdate {
    /// Must match the stage id when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Always rejected: a stage callback can only be given at creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cb: Option<Callback>,
    /// Replacement step list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<String>>,
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

impl StageUpdate {
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

    /// Sets a callback, which `apply` rejects.
    #[must_use]
    pub fn with_cb(mut self, cb: impl Into<Callback>) -> Self {
        self.cb = Some(cb.into());
        self
    }

    /// Replaces the step list.
    #[must_use]
    pub fn with_steps<I, S>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.steps = Some(steps.into_iter().map(Into::into).collect());
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
    fn test_stage_with_steps() {
        let stage = Stage::new("s1").with_steps(["a", "b"]).with_step("c");
        assert_eq!(stage.steps, vec!["a", "b", "c"]);
        assert!(stage.validate().is_ok());
    }

    #[test]
    fn test_stage_with_callback() {
        let stage = Stage::new("s1").with_callback("play");
        assert!(stage.validate().is_ok());
    }

    #[test]
    fn test_stage_requires_exactly_one_body() {
        let err = Stage::new("s1").validate().unwrap_err();
        assert_eq!(err.code(), Some(codes::RECORD_INVALID));

        let err = Stage::new("s1")
            .with_steps(["a"])
            .with_callback("play")
            .validate()
            .unwrap_err();
        assert!(err.message.contains("together"));
    }

    #[test]
    fn test_stage_rejects_repeated_step() {
        let err = Stage::new("s1").with_steps(["a", "a"]).validate().unwrap_err();
        assert!(err.message.contains("twice"));
    }

    #[test]
    fn test_stage_rejects_invalid_step_id() {
        assert!(Stage::new("s1").with_steps(["a.b"]).validate().is_err());
    }

    #[test]
    fn test_stage_apply_steps() {
        let mut stage = Stage::new("s1").with_steps(["a"]);
        let changed = stage
            .apply(StageUpdate::new().with_steps(["a", "b"]).with_property("rounds", json!(3)))
            .unwrap();
        assert!(changed);
        assert_eq!(stage.steps, vec!["a", "b"]);
        assert_eq!(stage.properties.get("rounds"), Some(&json!(3)));

        let changed = stage.apply(StageUpdate::new().with_init("enter")).unwrap();
        assert!(!changed);
        assert_eq!(stage.init, Some(Callback::new("enter")));
    }

    #[test]
    fn test_stage_apply_rejects_cb_and_id() {
        let mut stage = Stage::new("s1").with_steps(["a"]);
        assert!(stage.apply(StageUpdate::new().with_cb("play")).is_err());
        assert!(stage.apply(StageUpdate::new().with_id("s2")).is_err());
        assert!(stage.apply(StageUpdate::new().with_steps(Vec::<String>::new())).is_err());
    }
}
