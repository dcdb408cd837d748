//! Skip flags for stages and steps.

use super::{Stager, GAMEOVER};
use crate::errors::{codes, Result, ValidationError};
use crate::utils::step_key;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Stage and step skip flags.
///
/// Stages are keyed by the id they appear under in the sequence, steps by
/// `"stage.step"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipFlags {
    /// Stage flags.
    #[serde(default)]
    pub stages: BTreeMap<String, bool>,
    /// Step flags keyed by `"stage.step"`.
    #[serde(default)]
    pub steps: BTreeMap<String, bool>,
}

impl SkipFlags {
    /// Returns true if the stage itself is flagged.
    #[must_use]
    pub fn stage(&self, stage: &str) -> bool {
        self.stages.get(stage).copied().unwrap_or(false)
    }

    /// Returns true if the step of the stage is flagged.
    #[must_use]
    pub fn step(&self, stage: &str, step: &str) -> bool {
        self.steps.get(&step_key(stage, step)).copied().unwrap_or(false)
    }

    /// Sets a flag.
    pub fn set(&mut self, stage: &str, step: Option<&str>, value: bool) {
        match step {
            Some(step) => self.steps.insert(step_key(stage, step), value),
            None => self.stages.insert(stage.to_string(), value),
        };
    }

    /// Copies every flag of `other` over this one.
    pub fn merge(&mut self, other: Self) {
        self.stages.extend(other.stages);
        self.steps.extend(other.steps);
    }
}

impl Stager {
    /// Marks a stage, or one step of it, as skipped.
    ///
    /// Unknown ids only log a warning; the flag is recorded anyway since the
    /// stage may be declared later.
    pub fn skip(&mut self, stage: &str, step: Option<&str>) -> Result<&mut Self> {
        self.set_skip(stage, step, true, "skip")
    }

    /// Clears a skip flag.
    pub fn unskip(&mut self, stage: &str, step: Option<&str>) -> Result<&mut Self> {
        self.set_skip(stage, step, false, "unskip")
    }

    /// Skips several stages, or several steps of one stage, or one step of
    /// several stages.
    ///
    /// # Errors
    ///
    /// Fails if `stages` is empty or if both lists hold more than one id.
    pub fn skip_many(&mut self, stages: &[&str], steps: &[&str]) -> Result<&mut Self> {
        self.set_skip_many(stages, steps, true, "skip")
    }

    /// Clears the flags set by [`Stager::skip_many`].
    pub fn unskip_many(&mut self, stages: &[&str], steps: &[&str]) -> Result<&mut Self> {
        self.set_skip_many(stages, steps, false, "unskip")
    }

    /// Returns true if the stage, or the step of the stage, is skipped.
    ///
    /// A step is skipped when its stage is. A stage is also skipped when
    /// every one of its steps is; a placeholder first step does not count
    /// when the stage has other steps.
    #[must_use]
    pub fn is_skipped(&self, stage: &str, step: Option<&str>) -> bool {
        if self.to_skip.stage(stage) {
            return true;
        }
        if let Some(step) = step {
            return self.to_skip.step(stage, step);
        }

        let Some(record) = self.get_stage(stage) else {
            return false;
        };
        let mut steps = record.steps.as_slice();
        if steps.len() > 1 && self.steps.get(&steps[0]).is_some_and(|s| s.is_default) {
            steps = &steps[1..];
        }
        !steps.is_empty() && steps.iter().all(|step| self.to_skip.step(stage, step))
    }

    fn set_skip(&mut self, stage: &str, step: Option<&str>, value: bool, operation: &str) -> Result<&mut Self> {
        self.ensure_building(operation)?;

        if stage != GAMEOVER && !self.has_stage(stage) {
            warn!(stage = %stage, "{operation}: unknown stage");
        } else if let Some(step) = step {
            let known = self
                .get_stage(stage)
                .is_some_and(|record| record.steps.iter().any(|s| s == step));
            if !known {
                warn!(stage = %stage, step = %step, "{operation}: step is not part of the stage");
            }
        }

        self.to_skip.set(stage, step, value);
        Ok(self)
    }

    fn set_skip_many(
        &mut self,
        stages: &[&str],
        steps: &[&str],
        value: bool,
        operation: &str,
    ) -> Result<&mut Self> {
        self.ensure_building(operation)?;
        if stages.is_empty() {
            return Err(ValidationError::coded(
                codes::SKIP_AMBIGUOUS,
                format!("{operation}: at least one stage id is required"),
            )
            .into());
        }
        if stages.len() > 1 && steps.len() > 1 {
            return Err(ValidationError::coded(
                codes::SKIP_AMBIGUOUS,
                format!("{operation}: stage and step ids cannot both be lists"),
            )
            .with_ids(stages.iter().chain(steps).map(ToString::to_string).collect())
            .with_fix_hint("Call it once per stage instead.")
            .into());
        }

        for stage in stages {
            if steps.is_empty() {
                self.set_skip(stage, None, value, operation)?;
            }
            for step in steps {
                self.set_skip(stage, Some(step), value, operation)?;
            }
        }
        Ok(self)
    }
}
