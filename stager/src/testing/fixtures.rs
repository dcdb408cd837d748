//! Test fixtures for stager definitions.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::core::{Stage, Step};
use crate::stager::{Stager, StagerSettings};

/// Returns a deterministic RNG for `finalize_with_rng`.
#[must_use]
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// A stage declared by the fixture.
#[derive(Debug, Clone)]
struct FixtureStage {
    id: String,
    steps: Vec<String>,
    positions: Option<String>,
}

/// A builder producing a stager with steps and stages already placed.
///
/// Every step gets a callback named `"cb_<step>"`.
#[derive(Debug, Clone, Default)]
pub struct StagerFixture {
    settings: StagerSettings,
    stages: Vec<FixtureStage>,
    gameover: bool,
}

impl StagerFixture {
    /// Creates an empty fixture.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses the given settings.
    #[must_use]
    pub fn with_settings(mut self, settings: StagerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Registers a stage with its steps and places it linearly.
    #[must_use]
    pub fn stage(mut self, id: impl Into<String>, steps: &[&str]) -> Self {
        self.stages.push(FixtureStage {
            id: id.into(),
            steps: steps.iter().map(ToString::to_string).collect(),
            positions: None,
        });
        self
    }

    /// Registers a stage with its steps and places it at `positions`.
    #[must_use]
    pub fn stage_at(mut self, id: impl Into<String>, steps: &[&str], positions: &str) -> Self {
        self.stages.push(FixtureStage {
            id: id.into(),
            steps: steps.iter().map(ToString::to_string).collect(),
            positions: Some(positions.to_string()),
        });
        self
    }

    /// Ends the sequence with gameover.
    #[must_use]
    pub fn with_gameover(mut self) -> Self {
        self.gameover = true;
        self
    }

    /// Builds the stager, still building.
    ///
    /// # Panics
    ///
    /// Panics if a declared stage or step is invalid.
    #[must_use]
    pub fn build(&self) -> Stager {
        let mut stager = Stager::with_settings(self.settings.clone());
        for stage in &self.stages {
            for step in &stage.steps {
                if !stager.has_step(step) {
                    stager
                        .add_step(Step::new(step.as_str(), format!("cb_{step}")))
                        .expect("fixture step is valid");
                }
            }
            stager
                .add_stage(Stage::new(stage.id.as_str()).with_steps(stage.steps.clone()))
                .expect("fixture stage is valid")
                .stage(stage.id.as_str(), stage.positions.as_deref())
                .expect("fixture stage can be placed");
        }
        if self.gameover {
            stager.gameover().expect("gameover can be placed");
        }
        stager
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Callback;

    #[test]
    fn test_fixture_registers_and_places() {
        let stager = StagerFixture::new()
            .stage("s1", &["a", "b"])
            .stage_at("s2", &["b"], "*")
            .with_gameover()
            .build();

        assert_eq!(stager.step_ids(), vec!["a", "b"]);
        assert_eq!(stager.stage_ids(), vec!["s1", "s2"]);
        assert_eq!(stager.get_step("a").unwrap().cb, Callback::new("cb_a"));
        assert_eq!(stager.current_stage(), Some("gameover"));
        assert_eq!(stager.blocks().len(), 7);
    }

    #[test]
    fn test_fixture_settings() {
        let stager = StagerFixture::new()
            .with_settings(StagerSettings::new().with_default_callback("idle"))
            .build();
        assert_eq!(stager.default_callback(), Callback::new("idle"));
    }

    #[test]
    fn test_seeded_rng_is_deterministic() {
        use rand::Rng;
        let a: u64 = seeded_rng(7).gen();
        let b: u64 = seeded_rng(7).gen();
        assert_eq!(a, b);
    }
}
