//! End-to-end tests for building and compiling sequences.

#[cfg(test)]
mod tests {
    use crate::block::{BlockEntry, BlockKind};
    use crate::core::{Callback, Stage, StageKind, Step};
    use crate::stager::{SequenceFormat, Stager};
    use crate::testing::{assert_sequence_stages, assert_sequence_steps, StagerFixture};
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tracing_subscriber::EnvFilter;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    #[test]
    fn test_two_linear_steps() {
        let mut stager = Stager::new();
        stager
            .add_steps([Step::new("a", "cb_a"), Step::new("b", "cb_b")])
            .unwrap()
            .add_stage(Stage::new("s1").with_steps(["a", "b"]))
            .unwrap()
            .stage("s1", None)
            .unwrap()
            .finalize()
            .unwrap();

        let sequence = stager.sequence();
        assert_eq!(sequence.len(), 1);
        assert_eq!(sequence[0].id, "s1");
        assert_eq!(sequence[0].kind, StageKind::Plain);
        assert_eq!(sequence[0].steps, vec!["a", "b"]);
    }

    #[test]
    fn test_explicit_step_positions_fix_order() {
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut stager = Stager::new();
            stager
                .stage(Stage::new("s1").with_callback("first"), None)
                .unwrap()
                .step("late", Some("2"))
                .unwrap()
                .step("early", Some("1"))
                .unwrap()
                .finalize_with_rng(&mut rng)
                .unwrap();

            assert_sequence_steps(&stager, &["s1.s1", "s1.early", "s1.late"]);
        }
    }

    #[test]
    fn test_skipped_stage_is_left_out() {
        let mut stager = StagerFixture::new().stage("s1", &["a", "b"]).stage("s2", &["c"]).build();
        stager.skip("s1", None).unwrap().finalize().unwrap();
        assert_sequence_stages(&stager, &["s2"]);
    }

    #[test]
    fn test_gameover_survives_skip() {
        let mut stager = StagerFixture::new().stage("s1", &["a"]).build();
        stager
            .gameover()
            .unwrap()
            .skip("gameover", None)
            .unwrap()
            .finalize()
            .unwrap();

        assert_sequence_stages(&stager, &["s1", "gameover"]);
        let gameover = &stager.sequence()[1];
        assert_eq!(gameover.kind, StageKind::Gameover);
        assert!(gameover.steps.is_empty());
    }

    #[test]
    fn test_shorthand_stage_placeholder_is_superseded() {
        let mut stager = Stager::new();
        stager.stage("s2", None).unwrap();

        assert!(stager.has_stage("s2"));
        assert!(stager.get_step("s2").unwrap().is_default);

        stager.step("real", None).unwrap().finalize().unwrap();
        assert_sequence_steps(&stager, &["s2.real"]);
    }

    #[test]
    fn test_shorthand_stage_alone_keeps_placeholder() {
        let mut stager = Stager::new();
        stager.stage("s2", None).unwrap().finalize().unwrap();
        assert_sequence_steps(&stager, &["s2.s2"]);
    }

    #[test]
    fn test_skip_propagation_over_steps() {
        let mut stager = StagerFixture::new().stage("s", &["a", "b", "c"]).build();
        stager.skip("s", Some("a")).unwrap().skip("s", Some("b")).unwrap();
        assert!(!stager.is_skipped("s", None));

        stager.finalize().unwrap();
        assert_sequence_steps(&stager, &["s.c"]);

        stager.reset().skip("s", Some("c")).unwrap();
        assert!(stager.is_skipped("s", None));
        stager.finalize().unwrap();
        assert!(stager.sequence().is_empty());
    }

    #[test]
    fn test_alias_runs_stage_twice() {
        let mut stager = StagerFixture::new().stage("round", &["bid", "reveal"]).build();
        stager
            .repeat("round AS final_round", 2, None)
            .unwrap()
            .finalize()
            .unwrap();

        assert_sequence_steps(
            &stager,
            &["round.bid", "round.reveal", "final_round.bid", "final_round.reveal"],
        );
        assert_eq!(stager.sequence()[1].num, Some(2));
        assert_eq!(stager.sequence()[1].kind, StageKind::Repeat);
    }

    #[test]
    fn test_unknown_ids_only_warn() {
        init_tracing();
        let mut stager = StagerFixture::new().stage("s1", &["a"]).build();
        stager
            .skip("ghost", None)
            .unwrap()
            .skip("s1", Some("ghost_step"))
            .unwrap()
            .extend_steps(&["ghost"], &crate::core::StepUpdate::new().with_exit("x"))
            .unwrap()
            .finalize()
            .unwrap();

        assert_sequence_steps(&stager, &["s1.a"]);
        assert!(stager.skip_flags().stages.contains_key("ghost"));
    }

    #[test]
    fn test_skip_alias_only() {
        let mut stager = StagerFixture::new().stage("round", &["bid"]).build();
        stager
            .stage("round AS again", None)
            .unwrap()
            .skip("again", None)
            .unwrap()
            .finalize()
            .unwrap();
        assert_sequence_stages(&stager, &["round"]);
    }

    #[test]
    fn test_loops_in_sequence() {
        let mut stager = Stager::new();
        stager
            .loop_stage(Stage::new("l").with_callback("tick"), "while_open", None)
            .unwrap()
            .do_loop(Stage::new("d").with_callback("tock"), "until_done", None)
            .unwrap()
            .finalize()
            .unwrap();

        let sequence = stager.sequence();
        assert_eq!(sequence[0].kind, StageKind::Loop);
        assert_eq!(sequence[0].cb, Some(Callback::new("while_open")));
        assert_eq!(sequence[1].kind, StageKind::DoLoop);
        assert_eq!(sequence[1].cb, Some(Callback::new("until_done")));
        assert_eq!(sequence[1].steps, vec!["d"]);
    }

    #[test]
    fn test_wildcard_stages_stay_legal() {
        for seed in 0..30 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut stager = Stager::new();
            stager
                .stage("intro", Some("0"))
                .unwrap()
                .stage("a", Some("1-2"))
                .unwrap()
                .stage("b", Some("1-2"))
                .unwrap()
                .stage("outro", Some("*"))
                .unwrap()
                .finalize_with_rng(&mut rng)
                .unwrap();

            let stages = stager.sequence_summary(SequenceFormat::Stages).unwrap();
            assert_eq!(stages[0], "intro");
            assert_eq!(stages[3], "outro");
            assert!(stages[1..3].contains(&"a".to_string()));
            assert!(stages[1..3].contains(&"b".to_string()));
        }
    }

    #[test]
    fn test_reset_restores_pending_split() {
        let mut stager = StagerFixture::new().stage("s1", &["a", "b"]).stage("s2", &["c"]).build();
        let before: Vec<_> = stager
            .blocks()
            .iter()
            .map(|(_, block)| (block.unfinished_items().to_vec(), block.items().to_vec()))
            .collect();

        stager.finalize().unwrap().reset();

        let after: Vec<_> = stager
            .blocks()
            .iter()
            .map(|(_, block)| (block.unfinished_items().to_vec(), block.items().to_vec()))
            .collect();
        assert_eq!(after, before);
    }

    #[test]
    fn test_finalize_twice_changes_nothing() {
        let mut stager = StagerFixture::new().stage("s1", &["a"]).build();
        stager.finalize().unwrap();
        let blocks = stager.blocks().clone();
        stager.finalize().unwrap();
        assert_eq!(stager.blocks(), &blocks);
    }

    #[test]
    fn test_hierarchy_shape() {
        let stager = StagerFixture::new().stage("s1", &["a"]).build();
        let root = stager.blocks().get(stager.root()).unwrap();
        assert_eq!(root.kind(), BlockKind::Default);

        let entries: Vec<&BlockEntry> = root.entries().collect();
        assert_eq!(entries.len(), 1);
        let enclosure = stager.blocks().get(entries[0].nested().unwrap()).unwrap();
        assert_eq!(enclosure.kind(), BlockKind::StageEnclosure);

        let inner: Vec<&str> = enclosure.entries().map(BlockEntry::id).collect();
        assert_eq!(inner, vec!["s1", "__steps_s1"]);
    }

    #[test]
    fn test_unknown_stage_steps_get_default_callback() {
        let mut stager = Stager::new();
        stager.set_default_callback("wait");
        stager
            .add_stage(Stage::new("s1").with_steps(["a"]))
            .unwrap()
            .stage("s1", None)
            .unwrap();
        assert_eq!(stager.get_step("a").unwrap().cb, Callback::new("wait"));
    }
}
