//! Fluent construction of the block hierarchy.

use super::{stage_block_id, step_block_id, Stager, GAMEOVER};
use crate::block::{Block, BlockEntry, BlockHandle, BlockKind, PositionSpec, StageItem, StepItem};
use crate::core::{Callback, Stage, StageKind, Step};
use crate::errors::{codes, BlockError, RecordKind, Result, StagerError, ValidationError};
use crate::utils::parse_stage_reference;
use tracing::debug;

/// A stage given to a builder call: an id (optionally `"id AS alias"`) or a
/// record to register on the fly.
#[derive(Debug, Clone, PartialEq)]
pub enum StageRef {
    /// A registered stage id, an unknown id to synthesize, or an alias
    /// declaration.
    Id(String),
    /// A stage registered by the call.
    Record(Stage),
}

impl From<&str> for StageRef {
    fn from(id: &str) -> Self {
        Self::Id(id.to_string())
    }
}

impl From<String> for StageRef {
    fn from(id: String) -> Self {
        Self::Id(id)
    }
}

impl From<Stage> for StageRef {
    fn from(stage: Stage) -> Self {
        Self::Record(stage)
    }
}

/// A step given to [`Stager::step`].
#[derive(Debug, Clone, PartialEq)]
pub enum StepRef {
    /// A step id; unknown ids get the default callback.
    Id(String),
    /// A step registered by the call.
    Record(Step),
}

impl From<&str> for StepRef {
    fn from(id: &str) -> Self {
        Self::Id(id.to_string())
    }
}

impl From<String> for StepRef {
    fn from(id: String) -> Self {
        Self::Id(id)
    }
}

impl From<Step> for StepRef {
    fn from(step: Step) -> Self {
        Self::Record(step)
    }
}

/// The parts of a stage item that depend on the builder call.
struct Invocation {
    kind: StageKind,
    num: Option<u32>,
    cb: Option<Callback>,
}

impl Invocation {
    fn new(kind: StageKind) -> Self {
        Self {
            kind,
            num: None,
            cb: None,
        }
    }
}

impl Stager {
    /// Appends a plain stage to the sequence.
    ///
    /// `positions` constrains where the stage lands among the other stages;
    /// `None` means the next free slot.
    ///
    /// # Errors
    ///
    /// Fails if the stager is finalized, the reference or positions are
    /// invalid, or the stage is already in the sequence.
    pub fn stage(&mut self, stage: impl Into<StageRef>, positions: Option<&str>) -> Result<&mut Self> {
        self.open_stage(stage.into(), Invocation::new(StageKind::Plain), positions, "stage")
    }

    /// Same as [`Stager::stage`].
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self, stage: impl Into<StageRef>, positions: Option<&str>) -> Result<&mut Self> {
        self.open_stage(stage.into(), Invocation::new(StageKind::Plain), positions, "next")
    }

    /// Appends a stage run `num` times.
    pub fn repeat(
        &mut self,
        stage: impl Into<StageRef>,
        num: u32,
        positions: Option<&str>,
    ) -> Result<&mut Self> {
        if num == 0 {
            return Err(ValidationError::coded(
                codes::SEQUENCE_INVALID,
                "repeat() requires at least one repetition",
            )
            .with_fix_hint("Pass num >= 1.")
            .into());
        }
        let mut invocation = Invocation::new(StageKind::Repeat);
        invocation.num = Some(num);
        self.open_stage(stage.into(), invocation, positions, "repeat")
    }

    /// Appends a stage repeated while `cb` holds, checked before each run.
    pub fn loop_stage(
        &mut self,
        stage: impl Into<StageRef>,
        cb: impl Into<Callback>,
        positions: Option<&str>,
    ) -> Result<&mut Self> {
        let mut invocation = Invocation::new(StageKind::Loop);
        invocation.cb = Some(cb.into());
        self.open_stage(stage.into(), invocation, positions, "loop_stage")
    }

    /// Appends a stage run once, then repeated while `cb` holds.
    pub fn do_loop(
        &mut self,
        stage: impl Into<StageRef>,
        cb: impl Into<Callback>,
        positions: Option<&str>,
    ) -> Result<&mut Self> {
        let mut invocation = Invocation::new(StageKind::DoLoop);
        invocation.cb = Some(cb.into());
        self.open_stage(stage.into(), invocation, positions, "do_loop")
    }

    /// Appends the gameover stage.
    ///
    /// It has no steps and is kept in the sequence even when skipped.
    pub fn gameover(&mut self) -> Result<&mut Self> {
        self.ensure_building("gameover")?;
        self.ensure_not_in_sequence(GAMEOVER)?;

        let item = StageItem::new(GAMEOVER, GAMEOVER, StageKind::Gameover);
        self.open_blocks_for(item, PositionSpec::Linear, &[])?;
        self.current_step_block = None;
        Ok(self)
    }

    /// Adds a step to the stage opened last and to that stage's record.
    ///
    /// # Errors
    ///
    /// Fails if no stage is open, the open stage is gameover, or the step
    /// is already part of the stage.
    pub fn step(&mut self, step: impl Into<StepRef>, positions: Option<&str>) -> Result<&mut Self> {
        self.ensure_building("step")?;
        let (Some(item_id), Some(handle)) = (self.current_stage.clone(), self.current_step_block)
        else {
            let message = if self.current_stage.as_deref() == Some(GAMEOVER) {
                "Cannot add steps to the gameover stage"
            } else {
                "No stage is open: call stage() before step()"
            };
            return Err(ValidationError::coded(codes::SEQUENCE_INVALID, message).into());
        };
        let positions = PositionSpec::parse_optional(positions)?;

        let step = step.into();
        let step_id = match &step {
            StepRef::Id(id) => id.clone(),
            StepRef::Record(record) => record.id.clone(),
        };
        if self.blocks.get(handle).is_some_and(|block| block.has_item(&step_id)) {
            return Err(BlockError::duplicate_item(step_block_id(&item_id), &step_id).into());
        }

        let is_default = match step {
            StepRef::Id(id) => self.ensure_step(&id)?,
            StepRef::Record(record) => {
                self.add_step(record)?;
                false
            }
        };

        let stage_id = self.resolve_stage_id(&item_id).to_string();
        self.blocks.block_mut(handle)?.add(
            BlockEntry::Step(StepItem::new(&item_id, &step_id, is_default)),
            positions,
        )?;
        if let Some(stage) = self.stages.get_mut(&stage_id) {
            stage.steps.push(step_id.clone());
        }

        debug!(stage = %item_id, step = %step_id, "Added step to open stage");
        Ok(self)
    }

    /// Closes every open enclosure; the root stays open.
    pub(crate) fn end_blocks(&mut self) {
        let root = self.root;
        self.unfinished_blocks.retain(|&handle| handle == root);
        self.current_step_block = None;
    }

    fn ensure_not_in_sequence(&self, item_id: &str) -> Result<()> {
        let block_id = stage_block_id(item_id);
        if self.blocks.handle_of(&block_id).is_some() {
            return Err(ValidationError::coded(
                codes::SEQUENCE_INVALID,
                format!("Stage '{item_id}' is already in the sequence"),
            )
            .with_id(item_id)
            .with_fix_hint(format!("Insert it again under an alias: \"{item_id} AS other\"."))
            .into());
        }
        Ok(())
    }

    fn open_stage(
        &mut self,
        reference: StageRef,
        invocation: Invocation,
        positions: Option<&str>,
        operation: &str,
    ) -> Result<&mut Self> {
        self.ensure_building(operation)?;
        let positions = PositionSpec::parse_optional(positions)?;

        let (stage_id, item_id) = match reference {
            StageRef::Record(stage) => {
                self.ensure_not_in_sequence(&stage.id)?;
                let id = stage.id.clone();
                self.add_stage(stage)?;
                (id.clone(), id)
            }
            StageRef::Id(reference) => {
                let reference = parse_stage_reference(&reference)?;
                self.ensure_not_in_sequence(reference.sequence_id())?;
                let stage_id = self.resolve_stage_id(&reference.id).to_string();
                if let Some(alias) = &reference.alias {
                    if self.stages.contains_key(alias) || self.aliases.contains_key(alias) {
                        return Err(StagerError::duplicate(RecordKind::Alias, alias));
                    }
                }
                if !self.stages.contains_key(&stage_id) {
                    self.synthesize_stage(&stage_id);
                }
                if let Some(alias) = &reference.alias {
                    debug!(stage = %stage_id, alias = %alias, "Registering alias");
                    self.aliases.insert(alias.clone(), stage_id.clone());
                }
                (stage_id, reference.sequence_id().to_string())
            }
        };

        let steps = self
            .stages
            .get(&stage_id)
            .map(|stage| stage.steps.clone())
            .ok_or_else(|| StagerError::not_found(RecordKind::Stage, &stage_id))?;

        let mut item = StageItem::new(&item_id, &stage_id, invocation.kind);
        item.num = invocation.num;
        item.cb = invocation.cb;
        self.open_blocks_for(item, positions, &steps)?;
        Ok(self)
    }

    /// Registers a stage for a shorthand call with an unknown id.
    fn synthesize_stage(&mut self, id: &str) {
        if !self.steps.contains_key(id) {
            debug!(stage = %id, "Synthesizing stage with a placeholder step");
            self.steps
                .insert(id.to_string(), Step::placeholder(id, self.default_callback()));
        }
        self.stages
            .insert(id.to_string(), Stage::new(id).with_step(id));
    }

    /// Builds the stage enclosure and its step enclosure for one invocation.
    fn open_blocks_for(
        &mut self,
        item: StageItem,
        positions: PositionSpec,
        steps: &[String],
    ) -> Result<()> {
        self.end_blocks();

        let item_id = item.id.clone();
        let stage_block = stage_block_id(&item_id);
        let step_block = step_block_id(&item_id);

        let stage_handle = self.blocks.insert(Block::new(
            BlockKind::StageEnclosure,
            &stage_block,
            positions.clone(),
        ))?;
        let step_handle = self.blocks.insert(Block::new(
            BlockKind::StepEnclosure,
            &step_block,
            PositionSpec::Linear,
        ))?;

        let enclosure = self.blocks.block_mut(stage_handle)?;
        enclosure.add(BlockEntry::Stage(item), PositionSpec::Linear)?;
        enclosure.add(
            BlockEntry::Block {
                id: step_block,
                handle: step_handle,
            },
            PositionSpec::Linear,
        )?;
        self.blocks.block_mut(self.root)?.add(
            BlockEntry::Block {
                id: stage_block,
                handle: stage_handle,
            },
            positions,
        )?;

        self.fill_step_block(step_handle, &item_id, steps)?;

        self.unfinished_blocks.push(stage_handle);
        self.unfinished_blocks.push(step_handle);
        self.current_stage = Some(item_id.clone());
        self.current_step_block = Some(step_handle);

        debug!(stage = %item_id, steps = steps.len(), "Opened stage");
        Ok(())
    }

    /// Adds `steps` linearly to a step enclosure.
    pub(crate) fn fill_step_block(
        &mut self,
        handle: BlockHandle,
        item_id: &str,
        steps: &[String],
    ) -> Result<()> {
        for step in steps {
            let is_default = self.ensure_step(step)?;
            self.blocks.block_mut(handle)?.add(
                BlockEntry::Step(StepItem::new(item_id, step, is_default)),
                PositionSpec::Linear,
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_stage_opens_enclosures() {
        let mut stager = Stager::new();
        stager
            .add_stage(Stage::new("s1").with_steps(["a", "b"]))
            .unwrap()
            .stage("s1", None)
            .unwrap();

        assert_eq!(stager.current_stage(), Some("s1"));
        assert_eq!(stager.open_blocks(), vec!["__default", "__stage_s1", "__steps_s1"]);

        let steps = stager.blocks().handle_of("__steps_s1").unwrap();
        let block = stager.blocks().get(steps).unwrap();
        assert_eq!(block.kind(), BlockKind::StepEnclosure);
        assert_eq!(block.size(), 2);
        assert!(block.has_item("a") && block.has_item("b"));
    }

    #[test]
    fn test_next_stage_closes_previous_enclosures() {
        let mut stager = Stager::new();
        stager.stage("s1", None).unwrap().next("s2", None).unwrap();
        assert_eq!(stager.open_blocks(), vec!["__default", "__stage_s2", "__steps_s2"]);
    }

    #[test]
    fn test_shorthand_stage_synthesizes_placeholder() {
        let mut stager = Stager::new();
        stager.stage("s2", None).unwrap();

        assert_eq!(stager.get_stage("s2").unwrap().steps, vec!["s2"]);
        let step = stager.get_step("s2").unwrap();
        assert!(step.is_default);
        assert_eq!(step.cb, Callback::default_callback());
    }

    #[test]
    fn test_shorthand_stage_reuses_existing_step() {
        let mut stager = Stager::new();
        stager.add_step(Step::new("quiz", "ask")).unwrap();
        stager.stage("quiz", None).unwrap();
        assert!(!stager.get_step("quiz").unwrap().is_default);
    }

    #[test]
    fn test_stage_record_is_registered() {
        let mut stager = Stager::new();
        stager
            .stage(Stage::new("intro").with_callback("show"), None)
            .unwrap();
        assert!(stager.has_stage("intro"));
        assert!(stager.has_step("intro"));
    }

    #[test]
    fn test_stage_twice_requires_alias() {
        let mut stager = Stager::new();
        stager.stage("s1", None).unwrap();
        let err = stager.stage("s1", None).unwrap_err();
        assert_eq!(err.code(), Some(codes::SEQUENCE_INVALID));

        stager.stage("s1 AS s1_again", None).unwrap();
        assert_eq!(stager.alias_target("s1_again"), Some("s1"));
        assert_eq!(stager.current_stage(), Some("s1_again"));
        assert!(stager.blocks().handle_of("__steps_s1_again").is_some());
    }

    #[test]
    fn test_alias_cannot_shadow_stage() {
        let mut stager = Stager::new();
        stager.stage("s1", None).unwrap();
        stager.add_stage(Stage::new("s2").with_steps(["x"])).unwrap();
        assert!(matches!(
            stager.stage("s1 AS s2", None).unwrap_err(),
            StagerError::Duplicate { kind: RecordKind::Alias, .. }
        ));
    }

    #[test]
    fn test_repeat_requires_positive_num() {
        let mut stager = Stager::new();
        assert!(stager.repeat("r", 0, None).is_err());
        stager.repeat("r", 3, None).unwrap();

        let handle = stager.blocks().handle_of("__stage_r").unwrap();
        let Some(BlockEntry::Stage(item)) = stager.blocks().get(handle).unwrap().entries().next().cloned()
        else {
            panic!("expected a stage item");
        };
        assert_eq!(item.kind, StageKind::Repeat);
        assert_eq!(item.num, Some(3));
    }

    #[test]
    fn test_loops_carry_callback() {
        let mut stager = Stager::new();
        stager
            .loop_stage("l", "keep_going", None)
            .unwrap()
            .do_loop("d", "again", None)
            .unwrap();

        let handle = stager.blocks().handle_of("__stage_d").unwrap();
        let Some(BlockEntry::Stage(item)) = stager.blocks().get(handle).unwrap().entries().next().cloned()
        else {
            panic!("expected a stage item");
        };
        assert_eq!(item.kind, StageKind::DoLoop);
        assert_eq!(item.cb, Some(Callback::new("again")));
    }

    #[test]
    fn test_step_requires_open_stage() {
        let mut stager = Stager::new();
        let err = stager.step("a", None).unwrap_err();
        assert_eq!(err.code(), Some(codes::SEQUENCE_INVALID));

        stager.gameover().unwrap();
        let err = stager.step("a", None).unwrap_err();
        assert!(err.to_string().contains("gameover"));
    }

    #[test]
    fn test_step_appends_to_stage_record() {
        let mut stager = Stager::new();
        stager
            .stage("s1", None)
            .unwrap()
            .step("a", None)
            .unwrap()
            .step(Step::new("b", "cb_b"), Some("0"))
            .unwrap();

        assert_eq!(stager.get_stage("s1").unwrap().steps, vec!["s1", "a", "b"]);
        assert_eq!(stager.get_step("a").unwrap().cb, Callback::default_callback());
        assert_eq!(stager.get_step("b").unwrap().cb, Callback::new("cb_b"));

        let err = stager.step("a", None).unwrap_err();
        assert!(matches!(err, StagerError::Block(_)));
    }

    #[test]
    fn test_invalid_positions_leave_no_trace() {
        let mut stager = Stager::new();
        assert!(stager.stage("s1", Some("2-1")).is_err());
        assert!(!stager.has_stage("s1"));
        assert_eq!(stager.blocks().len(), 1);
    }
}
