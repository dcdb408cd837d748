//! Test assertions for compiled sequences.

use crate::core::StageKind;
use crate::stager::{SequenceFormat, Stager};

/// Asserts that the compiled sequence lists exactly these stage ids.
pub fn assert_sequence_stages(stager: &Stager, expected: &[&str]) {
    let actual = stager
        .sequence_summary(SequenceFormat::Stages)
        .unwrap_or_else(|err| panic!("Expected a compiled sequence: {err}"));
    assert_eq!(
        actual, expected,
        "Expected stages {expected:?}, got {actual:?}"
    );
}

/// Asserts that the compiled sequence lists exactly these `"stage.step"` ids.
pub fn assert_sequence_steps(stager: &Stager, expected: &[&str]) {
    let actual = stager
        .sequence_summary(SequenceFormat::Steps)
        .unwrap_or_else(|err| panic!("Expected a compiled sequence: {err}"));
    assert_eq!(
        actual, expected,
        "Expected steps {expected:?}, got {actual:?}"
    );
}

/// Asserts the kind of a stage in the compiled sequence.
pub fn assert_stage_kind(stager: &Stager, stage: &str, expected: StageKind) {
    let entry = stager
        .sequence()
        .iter()
        .find(|entry| entry.id == stage)
        .unwrap_or_else(|| panic!("Expected stage '{stage}' in the sequence"));
    assert_eq!(
        entry.kind, expected,
        "Expected kind {expected} for '{stage}', got {}",
        entry.kind
    );
}

/// Asserts that a step of a stage is skipped.
pub fn assert_step_skipped(stager: &Stager, stage: &str, step: &str) {
    assert!(
        stager.is_skipped(stage, Some(step)),
        "Expected step '{stage}.{step}' to be skipped"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StagerFixture;

    fn compiled() -> Stager {
        let mut stager = StagerFixture::new()
            .stage("s1", &["a", "b"])
            .with_gameover()
            .build();
        stager.finalize().unwrap();
        stager
    }

    #[test]
    fn test_assert_sequence_stages() {
        assert_sequence_stages(&compiled(), &["s1", "gameover"]);
    }

    #[test]
    #[should_panic(expected = "Expected stages")]
    fn test_assert_sequence_stages_fails() {
        assert_sequence_stages(&compiled(), &["gameover"]);
    }

    #[test]
    #[should_panic(expected = "Expected a compiled sequence")]
    fn test_assert_sequence_requires_finalize() {
        let stager = StagerFixture::new().stage("s1", &["a"]).build();
        assert_sequence_steps(&stager, &["s1.a"]);
    }

    #[test]
    fn test_assert_sequence_steps() {
        assert_sequence_steps(&compiled(), &["s1.a", "s1.b"]);
    }

    #[test]
    fn test_assert_stage_kind() {
        assert_stage_kind(&compiled(), "gameover", StageKind::Gameover);
    }

    #[test]
    fn test_assert_step_skipped() {
        let mut stager = StagerFixture::new().stage("s1", &["a"]).build();
        stager.skip("s1", Some("a")).unwrap();
        assert_step_skipped(&stager, "s1", "a");
    }
}
