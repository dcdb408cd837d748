//! Updates of registered steps and stages.
//!
//! Updates are applied to a copy which replaces the record only once it is
//! valid, so a failed update leaves the registry untouched.

use super::Stager;
use crate::block::{BlockEntry, BlockKind};
use crate::core::{Stage, StageUpdate, Step, StepUpdate};
use crate::errors::{codes, RecordKind, Result, StagerError, ValidationError};
use tracing::{debug, warn};

impl Stager {
    /// Shallow-merges an update into a step.
    ///
    /// # Errors
    ///
    /// Fails if the step is unknown or the update changes its id.
    pub fn extend_step(&mut self, id: &str, update: StepUpdate) -> Result<&mut Self> {
        self.ensure_building("extend_step")?;
        let mut step = self
            .steps
            .get(id)
            .cloned()
            .ok_or_else(|| StagerError::not_found(RecordKind::Step, id))?;
        step.apply(update)?;

        debug!(step = %id, "Extended step");
        self.steps.insert(id.to_string(), step);
        Ok(self)
    }

    /// Replaces a step with the result of `f` applied to a copy of it.
    ///
    /// # Errors
    ///
    /// Fails if the step is unknown or `f` returns a step with another id.
    pub fn extend_step_with<F>(&mut self, id: &str, f: F) -> Result<&mut Self>
    where
        F: FnOnce(Step) -> Step,
    {
        self.ensure_building("extend_step")?;
        let current = self
            .steps
            .get(id)
            .cloned()
            .ok_or_else(|| StagerError::not_found(RecordKind::Step, id))?;

        let step = f(current);
        if step.id != id {
            return Err(ValidationError::coded(
                codes::UPDATE_INVALID,
                format!("Step '{id}': the update returned step '{}'", step.id),
            )
            .with_ids(vec![id.to_string(), step.id])
            .into());
        }
        step.validate()?;

        debug!(step = %id, "Replaced step");
        self.steps.insert(id.to_string(), step);
        Ok(self)
    }

    /// Applies the same update to several steps; unknown ids are skipped.
    pub fn extend_steps(&mut self, ids: &[&str], update: &StepUpdate) -> Result<&mut Self> {
        self.ensure_building("extend_steps")?;
        for id in ids {
            if self.has_step(id) {
                self.extend_step(id, update.clone())?;
            } else {
                warn!(step = %id, "extend_steps: unknown step");
            }
        }
        Ok(self)
    }

    /// Applies `f` to several steps; unknown ids are skipped.
    pub fn extend_steps_with<F>(&mut self, ids: &[&str], mut f: F) -> Result<&mut Self>
    where
        F: FnMut(Step) -> Step,
    {
        self.ensure_building("extend_steps")?;
        for id in ids {
            if self.has_step(id) {
                self.extend_step_with(id, &mut f)?;
            } else {
                warn!(step = %id, "extend_steps: unknown step");
            }
        }
        Ok(self)
    }

    /// Applies the same update to every registered step.
    pub fn extend_all_steps(&mut self, update: &StepUpdate) -> Result<&mut Self> {
        let ids = self.owned_step_ids();
        let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
        self.extend_steps(&ids, update)
    }

    /// Applies `f` to every registered step.
    pub fn extend_all_steps_with<F>(&mut self, f: F) -> Result<&mut Self>
    where
        F: FnMut(Step) -> Step,
    {
        let ids = self.owned_step_ids();
        let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
        self.extend_steps_with(&ids, f)
    }

    /// Shallow-merges an update into a stage, by id or alias.
    ///
    /// When the step list changes, every step enclosure of the stage is
    /// rebuilt with the new list.
    ///
    /// # Errors
    ///
    /// Fails if the stage is unknown, the update changes the id or sets a
    /// callback, or the resulting step list is invalid.
    pub fn extend_stage(&mut self, id: &str, update: StageUpdate) -> Result<&mut Self> {
        self.ensure_building("extend_stage")?;
        let stage_id = self.resolve_stage_id(id).to_string();
        let mut stage = self
            .stages
            .get(&stage_id)
            .cloned()
            .ok_or_else(|| StagerError::not_found(RecordKind::Stage, id))?;

        let mut update = update;
        if update.id.as_deref() == Some(id) {
            update.id = Some(stage_id.clone());
        }
        let steps_changed = stage.apply(update)?;
        self.replace_stage(stage, steps_changed)
    }

    /// Replaces a stage with the result of `f` applied to a copy of it.
    ///
    /// # Errors
    ///
    /// Fails if the stage is unknown or `f` returns a stage with another id,
    /// a callback, or an invalid step list.
    pub fn extend_stage_with<F>(&mut self, id: &str, f: F) -> Result<&mut Self>
    where
        F: FnOnce(Stage) -> Stage,
    {
        self.ensure_building("extend_stage")?;
        let stage_id = self.resolve_stage_id(id).to_string();
        let current = self
            .stages
            .get(&stage_id)
            .cloned()
            .ok_or_else(|| StagerError::not_found(RecordKind::Stage, id))?;
        let previous_steps = current.steps.clone();

        let stage = f(current);
        if stage.id != stage_id {
            return Err(ValidationError::coded(
                codes::UPDATE_INVALID,
                format!("Stage '{stage_id}': the update returned stage '{}'", stage.id),
            )
            .with_ids(vec![stage_id, stage.id])
            .into());
        }
        if stage.cb.is_some() {
            return Err(ValidationError::coded(
                codes::UPDATE_INVALID,
                format!("Stage '{stage_id}': cb cannot be set through an update"),
            )
            .with_id(stage_id)
            .into());
        }
        stage.validate_steps()?;

        let steps_changed = stage.steps != previous_steps;
        self.replace_stage(stage, steps_changed)
    }

    /// Applies the same update to several stages; unknown ids are skipped.
    pub fn extend_stages(&mut self, ids: &[&str], update: &StageUpdate) -> Result<&mut Self> {
        self.ensure_building("extend_stages")?;
        for id in ids {
            if self.has_stage(id) {
                self.extend_stage(id, update.clone())?;
            } else {
                warn!(stage = %id, "extend_stages: unknown stage");
            }
        }
        Ok(self)
    }

    /// Applies `f` to several stages; unknown ids are skipped.
    pub fn extend_stages_with<F>(&mut self, ids: &[&str], mut f: F) -> Result<&mut Self>
    where
        F: FnMut(Stage) -> Stage,
    {
        self.ensure_building("extend_stages")?;
        for id in ids {
            if self.has_stage(id) {
                self.extend_stage_with(id, &mut f)?;
            } else {
                warn!(stage = %id, "extend_stages: unknown stage");
            }
        }
        Ok(self)
    }

    /// Applies the same update to every registered stage.
    pub fn extend_all_stages(&mut self, update: &StageUpdate) -> Result<&mut Self> {
        let ids = self.owned_stage_ids();
        let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
        self.extend_stages(&ids, update)
    }

    /// Applies `f` to every registered stage.
    pub fn extend_all_stages_with<F>(&mut self, f: F) -> Result<&mut Self>
    where
        F: FnMut(Stage) -> Stage,
    {
        let ids = self.owned_stage_ids();
        let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
        self.extend_stages_with(&ids, f)
    }

    fn owned_step_ids(&self) -> Vec<String> {
        self.step_ids().into_iter().map(ToString::to_string).collect()
    }

    fn owned_stage_ids(&self) -> Vec<String> {
        self.stage_ids().into_iter().map(ToString::to_string).collect()
    }

    fn replace_stage(&mut self, stage: Stage, steps_changed: bool) -> Result<&mut Self> {
        let stage_id = stage.id.clone();
        let steps = stage.steps.clone();

        debug!(stage = %stage_id, steps_changed, "Extended stage");
        self.stages.insert(stage_id.clone(), stage);
        if steps_changed {
            self.rebuild_step_blocks(&stage_id, &steps)?;
        }
        Ok(self)
    }

    /// Refills every step enclosure of `stage_id` with `steps`.
    fn rebuild_step_blocks(&mut self, stage_id: &str, steps: &[String]) -> Result<()> {
        let targets: Vec<_> = self
            .blocks
            .iter()
            .filter(|(_, block)| block.kind() == BlockKind::StageEnclosure)
            .filter_map(|(_, block)| {
                let mut entries = block.entries();
                let item = match entries.next() {
                    Some(BlockEntry::Stage(item)) if item.stage == stage_id => item.id.clone(),
                    _ => return None,
                };
                let nested = entries.find_map(BlockEntry::nested)?;
                Some((item, nested))
            })
            .collect();

        for (item_id, handle) in targets {
            debug!(stage = %stage_id, item = %item_id, "Rebuilding step enclosure");
            self.blocks.block_mut(handle)?.remove_all_items()?;
            self.fill_step_block(handle, &item_id, steps)?;
        }
        Ok(())
    }
}
