//! Step and stage registries.

use super::Stager;
use crate::core::{Stage, Step};
use crate::errors::{RecordKind, Result, StagerError};
use crate::utils::validate_id;
use tracing::debug;

impl Stager {
    /// Fails with [`StagerError::Finalized`] while the stager is compiled.
    pub(crate) fn ensure_building(&self, operation: &str) -> Result<()> {
        if self.finalized {
            return Err(StagerError::finalized(operation));
        }
        Ok(())
    }

    /// Maps an alias to its stage id; other ids are returned unchanged.
    pub(crate) fn resolve_stage_id<'a>(&'a self, id: &'a str) -> &'a str {
        self.aliases.get(id).map_or(id, String::as_str)
    }

    fn ensure_stage_id_free(&self, id: &str) -> Result<()> {
        if self.stages.contains_key(id) {
            return Err(StagerError::duplicate(RecordKind::Stage, id));
        }
        if self.aliases.contains_key(id) {
            return Err(StagerError::duplicate(RecordKind::Alias, id));
        }
        Ok(())
    }

    /// Registers a step.
    ///
    /// # Errors
    ///
    /// Fails if the id is invalid or already registered. Use
    /// [`Stager::extend_step`] to modify an existing step.
    pub fn add_step(&mut self, step: Step) -> Result<&mut Self> {
        self.ensure_building("add_step")?;
        step.validate()?;
        if self.steps.contains_key(&step.id) {
            return Err(StagerError::duplicate(RecordKind::Step, &step.id));
        }

        debug!(step = %step.id, "Registering step");
        self.steps.insert(step.id.clone(), step);
        Ok(self)
    }

    /// Registers several steps, stopping at the first error.
    pub fn add_steps(&mut self, steps: impl IntoIterator<Item = Step>) -> Result<&mut Self> {
        for step in steps {
            self.add_step(step)?;
        }
        Ok(self)
    }

    /// Registers a stage.
    ///
    /// A stage declared with a callback gets a step with the same id.
    ///
    /// # Errors
    ///
    /// Fails if the stage is malformed, if its id is taken by a stage or an
    /// alias, or if a callback stage collides with an existing step.
    pub fn add_stage(&mut self, stage: Stage) -> Result<&mut Self> {
        self.ensure_building("add_stage")?;
        stage.validate()?;
        self.ensure_stage_id_free(&stage.id)?;

        let mut stage = stage;
        if let Some(cb) = stage.cb.take() {
            if self.steps.contains_key(&stage.id) {
                return Err(StagerError::duplicate(RecordKind::Step, &stage.id));
            }
            self.steps
                .insert(stage.id.clone(), Step::new(stage.id.clone(), cb));
            stage.steps = vec![stage.id.clone()];
        }

        debug!(stage = %stage.id, steps = ?stage.steps, "Registering stage");
        self.stages.insert(stage.id.clone(), stage);
        Ok(self)
    }

    /// Registers several stages, stopping at the first error.
    pub fn add_stages(&mut self, stages: impl IntoIterator<Item = Stage>) -> Result<&mut Self> {
        for stage in stages {
            self.add_stage(stage)?;
        }
        Ok(self)
    }

    /// Registers a copy of a step under a new id.
    ///
    /// The copy is never a placeholder, even if the source is.
    pub fn clone_step(&mut self, id: &str, new_id: &str) -> Result<&mut Self> {
        self.ensure_building("clone_step")?;
        let source = self
            .steps
            .get(id)
            .ok_or_else(|| StagerError::not_found(RecordKind::Step, id))?;
        if self.steps.contains_key(new_id) {
            return Err(StagerError::duplicate(RecordKind::Step, new_id));
        }

        let mut copy = source.clone();
        copy.id = new_id.to_string();
        copy.is_default = false;
        copy.validate()?;

        debug!(step = %id, clone = %new_id, "Cloning step");
        self.steps.insert(copy.id.clone(), copy);
        Ok(self)
    }

    /// Registers a copy of a stage under a new id.
    ///
    /// The copy references the same step ids. Aliases are resolved, so
    /// cloning an alias copies the aliased stage.
    pub fn clone_stage(&mut self, id: &str, new_id: &str) -> Result<&mut Self> {
        self.ensure_building("clone_stage")?;
        let source = self
            .stages
            .get(self.resolve_stage_id(id))
            .ok_or_else(|| StagerError::not_found(RecordKind::Stage, id))?;
        self.ensure_stage_id_free(new_id)?;

        let mut copy = source.clone();
        copy.id = new_id.to_string();
        validate_id(RecordKind::Stage, &copy.id)?;
        copy.validate_steps()?;

        debug!(stage = %id, clone = %new_id, "Cloning stage");
        self.stages.insert(copy.id.clone(), copy);
        Ok(self)
    }

    /// Returns a step by id.
    #[must_use]
    pub fn get_step(&self, id: &str) -> Option<&Step> {
        self.steps.get(id)
    }

    /// Returns a stage by id or alias.
    #[must_use]
    pub fn get_stage(&self, id: &str) -> Option<&Stage> {
        self.stages.get(self.resolve_stage_id(id))
    }

    /// Returns true if the step is registered.
    #[must_use]
    pub fn has_step(&self, id: &str) -> bool {
        self.steps.contains_key(id)
    }

    /// Returns true if the stage or alias is registered.
    #[must_use]
    pub fn has_stage(&self, id: &str) -> bool {
        self.get_stage(id).is_some()
    }

    /// Returns the stage an alias points to.
    #[must_use]
    pub fn alias_target(&self, alias: &str) -> Option<&str> {
        self.aliases.get(alias).map(String::as_str)
    }

    /// Registered step ids, sorted.
    #[must_use]
    pub fn step_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.steps.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Registered stage ids without aliases, sorted.
    #[must_use]
    pub fn stage_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.stages.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Registers a step with the default callback unless it exists.
    ///
    /// Returns whether the step is a placeholder.
    pub(crate) fn ensure_step(&mut self, id: &str) -> Result<bool> {
        if let Some(step) = self.steps.get(id) {
            return Ok(step.is_default);
        }
        validate_id(RecordKind::Step, id)?;
        debug!(step = %id, "Creating step with the default callback");
        self.steps
            .insert(id.to_string(), Step::new(id, self.default_callback()));
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Callback;
    use crate::errors::codes;

    #[test]
    fn test_add_step() {
        let mut stager = Stager::new();
        stager.add_step(Step::new("a", "cb_a")).unwrap();
        assert!(stager.has_step("a"));
        assert_eq!(stager.get_step("a").unwrap().cb, Callback::new("cb_a"));
    }

    #[test]
    fn test_add_step_duplicate() {
        let mut stager = Stager::new();
        stager.add_step(Step::new("a", "cb")).unwrap();
        let err = stager.add_step(Step::new("a", "other")).unwrap_err();
        assert!(matches!(err, StagerError::Duplicate { kind: RecordKind::Step, .. }));
    }

    #[test]
    fn test_add_step_invalid_id() {
        let mut stager = Stager::new();
        let err = stager.add_step(Step::new("a.b", "cb")).unwrap_err();
        assert_eq!(err.code(), Some(codes::ID_INVALID));
    }

    #[test]
    fn test_add_stage_with_callback_synthesizes_step() {
        let mut stager = Stager::new();
        stager.add_stage(Stage::new("intro").with_callback("show")).unwrap();

        let stage = stager.get_stage("intro").unwrap();
        assert_eq!(stage.steps, vec!["intro"]);
        assert!(stage.cb.is_none());

        let step = stager.get_step("intro").unwrap();
        assert_eq!(step.cb, Callback::new("show"));
        assert!(!step.is_default);
    }

    #[test]
    fn test_add_stage_with_callback_conflicts_with_step() {
        let mut stager = Stager::new();
        stager.add_step(Step::new("intro", "x")).unwrap();
        let err = stager
            .add_stage(Stage::new("intro").with_callback("show"))
            .unwrap_err();
        assert!(matches!(err, StagerError::Duplicate { kind: RecordKind::Step, .. }));
        assert!(!stager.has_stage("intro"));
    }

    #[test]
    fn test_add_stage_duplicate_and_invalid() {
        let mut stager = Stager::new();
        stager.add_stage(Stage::new("s1").with_steps(["a"])).unwrap();
        assert!(stager.add_stage(Stage::new("s1").with_steps(["b"])).is_err());
        assert!(stager.add_stage(Stage::new("s2")).is_err());
        assert!(stager.add_stage(Stage::new("2s").with_steps(["a"])).is_err());
    }

    #[test]
    fn test_add_batches() {
        let mut stager = Stager::new();
        stager
            .add_steps([Step::new("a", "cb"), Step::new("b", "cb")])
            .unwrap()
            .add_stages([
                Stage::new("s1").with_steps(["a"]),
                Stage::new("s2").with_steps(["b"]),
            ])
            .unwrap();
        assert_eq!(stager.step_ids(), vec!["a", "b"]);
        assert_eq!(stager.stage_ids(), vec!["s1", "s2"]);
    }

    #[test]
    fn test_clone_step() {
        let mut stager = Stager::new();
        stager.add_step(Step::new("a", "cb").with_init("i")).unwrap();
        stager.clone_step("a", "a2").unwrap();

        let copy = stager.get_step("a2").unwrap();
        assert_eq!(copy.cb, Callback::new("cb"));
        assert_eq!(copy.init, Some(Callback::new("i")));

        assert!(stager.clone_step("missing", "x").is_err());
        assert!(stager.clone_step("a", "a2").is_err());
        assert!(stager.clone_step("a", "bad.id").is_err());
    }

    #[test]
    fn test_clone_stage_is_independent() {
        let mut stager = Stager::new();
        stager.add_stage(Stage::new("s1").with_steps(["a", "b"])).unwrap();
        stager.clone_stage("s1", "s1bis").unwrap();

        stager.stages.get_mut("s1bis").unwrap().steps.push("c".to_string());
        assert_eq!(stager.get_stage("s1").unwrap().steps, vec!["a", "b"]);
        assert_eq!(stager.get_stage("s1bis").unwrap().steps, vec!["a", "b", "c"]);

        assert!(matches!(
            stager.clone_stage("nope", "x").unwrap_err(),
            StagerError::NotFound { kind: RecordKind::Stage, .. }
        ));
    }

    #[test]
    fn test_ensure_step_uses_default_callback() {
        let mut stager = Stager::new();
        stager.set_default_callback("idle");
        assert!(!stager.ensure_step("x").unwrap());
        assert_eq!(stager.get_step("x").unwrap().cb, Callback::new("idle"));
        assert!(stager.ensure_step("1x").is_err());
    }
}
