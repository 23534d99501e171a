//! Sequencer behaviour suite: command semantics, ordering, and properties.

#![allow(
    clippy::pedantic,
    clippy::nursery,
    clippy::float_cmp,
    clippy::too_many_lines
)]

use log as _;
use proptest::prelude::*;
use rstest::rstest;
use sequencer_core::{
    compare, drive, Catalog, EventLog, ExecutionMode, FlagState, IdleCause, InstructionRejection,
    ManualClock, OperandState, PhaseSet, PhaseTag, Sequencer, SequencerConfig, SequencerError,
    SequencerEvent, SequencerState,
};
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

fn sequencer(phase_set: PhaseSet) -> Sequencer<EventLog> {
    let config = SequencerConfig {
        phase_set,
        ..SequencerConfig::default()
    };
    Sequencer::new(config.catalog(), config, EventLog::new())
}

fn all_instructions() -> Vec<(PhaseSet, String)> {
    [PhaseSet::Classic, PhaseSet::SixStep, PhaseSet::Numbered]
        .into_iter()
        .flat_map(|set| {
            Catalog::for_phase_set(set)
                .mnemonics()
                .map(|mnemonic| (set, mnemonic.to_owned()))
                .collect::<Vec<_>>()
        })
        .collect()
}

#[rstest]
#[case(PhaseSet::Classic)]
#[case(PhaseSet::SixStep)]
#[case(PhaseSet::Numbered)]
fn stepping_len_times_completes_exactly_once(#[case] phase_set: PhaseSet) {
    let catalog = Catalog::for_phase_set(phase_set);
    for definition in catalog.instructions() {
        let mut sequencer = sequencer(phase_set);
        sequencer
            .select(&definition.mnemonic)
            .expect("built-in mnemonic");

        for call in 0..definition.len() {
            assert!(
                sequencer.snapshot().mode != ExecutionMode::Timed,
                "{} call {call}",
                definition.mnemonic
            );
            sequencer.step();
        }

        assert!(sequencer.state().is_idle(), "{}", definition.mnemonic);
        assert_eq!(sequencer.completed_runs(), 1, "{}", definition.mnemonic);
        assert_eq!(sequencer.observer().computed_flags().len(), 1);
        let expected: Vec<_> = (0..definition.len()).collect();
        assert_eq!(sequencer.observer().entered_steps(), expected);
    }
}

#[rstest]
#[case(10, 20, FlagState { carry: true, zero: false, sign: true })]
#[case(20, 10, FlagState { carry: false, zero: false, sign: false })]
#[case(15, 15, FlagState { carry: false, zero: true, sign: false })]
fn compare_reference_values(#[case] a: u16, #[case] b: u16, #[case] expected: FlagState) {
    assert_eq!(compare(a, b), expected);
}

#[test]
fn stop_then_restart_resets_and_discards_aborted_run() {
    let mut sequencer = sequencer(PhaseSet::Classic);
    sequencer.start("ADD R1, (R2)").expect("known mnemonic");
    sequencer.tick(1000);
    sequencer.tick(400);
    assert_eq!(sequencer.state().step_index(), Some(1));

    sequencer.stop();
    assert_eq!(sequencer.state(), SequencerState::Idle);
    assert_eq!(sequencer.snapshot().progress_percent, 0.0);
    assert!(!sequencer.is_running());

    sequencer.start("ADD R1, (R2)").expect("known mnemonic");
    let snapshot = sequencer.snapshot();
    assert_eq!(snapshot.step_index, Some(0));
    assert_eq!(snapshot.progress_percent, 0.0);
    assert!(sequencer.observer().computed_flags().is_empty());
    assert_eq!(sequencer.flags(), None);
}

#[test]
fn start_unknown_while_idle_leaves_state_unchanged() {
    let mut sequencer = sequencer(PhaseSet::Classic);
    let before = sequencer.snapshot();

    let err = sequencer.start("UNKNOWN").unwrap_err();

    assert_eq!(
        err,
        SequencerError::InvalidInstruction {
            mnemonic: "UNKNOWN".to_owned(),
            reason: InstructionRejection::Unknown,
        }
    );
    assert_eq!(sequencer.snapshot(), before);
    assert!(sequencer.observer().is_empty());
}

#[test]
fn start_unknown_while_running_keeps_prior_step() {
    let mut sequencer = sequencer(PhaseSet::Numbered);
    let ticket = sequencer.start("CMP AX, BX").expect("known mnemonic");
    sequencer.tick(1000);
    sequencer.tick(300);
    let before = sequencer.snapshot();
    let events_before = sequencer.observer().len();

    assert!(sequencer.start("UNKNOWN").is_err());
    assert!(sequencer.select("UNKNOWN").is_err());
    assert!(sequencer
        .run_to_completion("UNKNOWN", OperandState::default())
        .is_err());

    assert_eq!(sequencer.snapshot(), before);
    assert_eq!(sequencer.timer(), Some(ticket));
    assert_eq!(sequencer.observer().len(), events_before);
}

#[test]
fn start_while_running_is_implicit_stop_and_restart() {
    let mut sequencer = sequencer(PhaseSet::Classic);
    let first = sequencer.start("JMP 2000H").expect("known mnemonic");
    sequencer.tick(1000);
    sequencer.observer_mut().clear();

    let second = sequencer.start("JZ 3000H").expect("known mnemonic");

    assert_ne!(first, second);
    let events: Vec<_> = sequencer.observer().events().cloned().collect();
    assert_eq!(
        events,
        [
            SequencerEvent::ReturnedToIdle {
                cause: IdleCause::Stopped
            },
            SequencerEvent::StepEntered {
                step_index: 0,
                phase: PhaseTag::Fetch
            },
        ]
    );
}

#[test]
fn stale_ticket_never_mutates_a_later_run() {
    let mut sequencer = sequencer(PhaseSet::SixStep);
    let stale = sequencer.start("CMP AX, BX").expect("known mnemonic");
    sequencer.stop();
    assert!(!sequencer.tick_timer(stale, 600));

    let fresh = sequencer.start("CMP AX, BX").expect("known mnemonic");
    let before = sequencer.snapshot();
    assert!(!sequencer.tick_timer(stale, 600));
    assert_eq!(sequencer.snapshot(), before);

    assert!(sequencer.tick_timer(fresh, 600));
    assert_eq!(sequencer.snapshot().phase, PhaseTag::If);
}

#[test]
fn run_to_completion_during_timed_run_stops_it_first() {
    let mut sequencer = sequencer(PhaseSet::Classic);
    let ticket = sequencer.start("ADD R1, (R2)").expect("known mnemonic");
    sequencer.tick(1000);
    sequencer.tick(100);
    assert_eq!(sequencer.state().step_index(), Some(1));

    let flags = sequencer
        .run_to_completion("CMP R1, R2", OperandState::new(15, 15))
        .expect("known mnemonic");

    assert_eq!(flags, compare(15, 15));
    let events: Vec<_> = sequencer.observer().events().cloned().collect();
    assert_eq!(
        events[events.len() - 2..],
        [
            SequencerEvent::ReturnedToIdle {
                cause: IdleCause::Stopped
            },
            SequencerEvent::FlagsComputed {
                flags,
                operands: OperandState::new(15, 15),
            },
        ]
    );
    assert_eq!(sequencer.observer().computed_flags().len(), 1);
    assert!(sequencer.state().is_idle());
    assert!(!sequencer.tick(50));
    assert!(!sequencer.tick_timer(ticket, 50));
}

#[test]
fn manual_step_on_final_timed_step_completes_like_a_tick() {
    let mut sequencer = sequencer(PhaseSet::Classic);
    sequencer.set_operands(OperandState::new(10, 20));
    let ticket = sequencer.start("CMP R1, R2").expect("known mnemonic");
    sequencer.tick(1000);
    sequencer.tick(800);
    sequencer.tick(1000);
    assert_eq!(sequencer.state().step_index(), Some(3));
    sequencer.observer_mut().clear();

    sequencer.step();

    assert_eq!(sequencer.state(), SequencerState::Idle);
    assert_eq!(sequencer.completed_runs(), 1);
    assert_eq!(sequencer.flags(), Some(compare(10, 20)));
    let events: Vec<_> = sequencer.observer().events().cloned().collect();
    assert_eq!(
        events,
        [
            SequencerEvent::ProgressAdvanced {
                step_index: 3,
                progress_percent: 100.0,
            },
            SequencerEvent::FlagsComputed {
                flags: compare(10, 20),
                operands: OperandState::new(10, 20),
            },
            SequencerEvent::ReturnedToIdle {
                cause: IdleCause::Completed
            },
        ]
    );
    assert!(!sequencer.tick_timer(ticket, 50));
    assert!(!sequencer.is_running());
}

#[test]
fn flags_follow_final_step_and_precede_idle_reset() {
    let mut sequencer = sequencer(PhaseSet::Numbered);
    sequencer.set_operands(OperandState::new(20, 10));
    sequencer.start("CMP AX, BX").expect("known mnemonic");
    let outcome = drive(&mut sequencer, &mut ManualClock::new(50));
    assert!(outcome.completed);

    let transitions: Vec<_> = sequencer
        .observer()
        .events()
        .filter(|event| !matches!(event, SequencerEvent::ProgressAdvanced { .. }))
        .cloned()
        .collect();
    assert_eq!(
        transitions[transitions.len() - 3..],
        [
            SequencerEvent::StepEntered {
                step_index: 4,
                phase: PhaseTag::Step5
            },
            SequencerEvent::FlagsComputed {
                flags: FlagState::default(),
                operands: OperandState::new(20, 10),
            },
            SequencerEvent::ReturnedToIdle {
                cause: IdleCause::Completed
            },
        ]
    );
}

#[test]
fn manual_step_snapshots_report_completed_step() {
    let mut sequencer = sequencer(PhaseSet::Classic);
    sequencer.select("CMP R1, R2").expect("known mnemonic");
    sequencer.step();

    let snapshot = sequencer.snapshot();
    assert_eq!(snapshot.mode, ExecutionMode::Manual);
    assert_eq!(snapshot.step_index, Some(0));
    assert_eq!(snapshot.progress_percent, 100.0);
    assert_eq!(snapshot.overall_progress_percent, 25.0);
    assert!(!snapshot.is_running);
    assert_eq!(
        sequencer.current_step().map(|step| step.name.as_str()),
        Some("Fetch Instruction")
    );
}

#[test]
fn running_flag_tracks_armed_timer() {
    let mut sequencer = sequencer(PhaseSet::Classic);
    sequencer.start("MOV R1, (R2)").expect("known mnemonic");
    sequencer.tick(500);
    sequencer.step();
    sequencer.resume().expect("manual mode");
    drive(&mut sequencer, &mut ManualClock::new(100));

    for (_, snapshot) in sequencer.observer().records() {
        assert_eq!(
            snapshot.is_running,
            snapshot.mode == ExecutionMode::Timed,
            "{snapshot:?}"
        );
    }
}

fn assert_progress_invariants(records: &[(SequencerEvent, sequencer_core::ExecutionSnapshot)]) {
    let mut current_step: Option<usize> = None;
    let mut last_progress = 0.0_f64;
    for (event, snapshot) in records {
        match event {
            SequencerEvent::StepEntered { step_index, .. } => {
                let expected = current_step.map_or(0, |index| index + 1);
                assert_eq!(*step_index, expected, "steps must be contiguous");
                assert_eq!(snapshot.progress_percent, 0.0);
                current_step = Some(*step_index);
                last_progress = 0.0;
            }
            SequencerEvent::ProgressAdvanced {
                step_index,
                progress_percent,
            } => {
                assert_eq!(Some(*step_index), current_step);
                assert!(*progress_percent > last_progress);
                assert!(*progress_percent <= 100.0);
                last_progress = *progress_percent;
            }
            SequencerEvent::ReturnedToIdle { .. } => {
                assert_eq!(last_progress, 100.0);
                current_step = None;
            }
            _ => {}
        }
    }
}

proptest! {
    #[test]
    fn property_instant_and_animated_paths_agree(
        a in any::<u16>(),
        b in any::<u16>(),
        pick in any::<prop::sample::Index>(),
        quantum in 1u32..=700,
    ) {
        let instructions = all_instructions();
        let (phase_set, mnemonic) = &instructions[pick.index(instructions.len())];
        let operands = OperandState::new(a, b);

        let mut animated = sequencer(*phase_set);
        animated.set_operands(operands);
        animated.start(mnemonic).expect("built-in mnemonic");
        let outcome = drive(&mut animated, &mut ManualClock::new(quantum));
        prop_assert!(outcome.completed);

        let mut instant = sequencer(*phase_set);
        let flags = instant.run_to_completion(mnemonic, operands).expect("built-in mnemonic");

        prop_assert_eq!(animated.flags(), Some(flags));
        prop_assert_eq!(flags, compare(a, b));
        prop_assert!(instant.state().is_idle());
    }

    #[test]
    fn property_progress_is_monotonic_and_steps_never_skip(
        pick in any::<prop::sample::Index>(),
        ticks in prop::collection::vec(0u32..=1500, 1..200),
    ) {
        let instructions = all_instructions();
        let (phase_set, mnemonic) = &instructions[pick.index(instructions.len())];
        let mut sequencer = sequencer(*phase_set);
        sequencer.start(mnemonic).expect("built-in mnemonic");

        for elapsed in ticks {
            let before = sequencer.state().step_index();
            if !sequencer.tick(elapsed) {
                break;
            }
            let after = sequencer.state().step_index();
            match (before, after) {
                (Some(from), Some(to)) => prop_assert!(to == from || to == from + 1),
                (Some(_), None) => prop_assert_eq!(sequencer.completed_runs(), 1),
                (None, _) => return Err(TestCaseError::fail("tick delivered while idle")),
            }
        }

        assert_progress_invariants(sequencer.observer().records());
    }

    #[test]
    fn property_compare_is_pure(a in any::<u16>(), b in any::<u16>()) {
        let first = compare(a, b);
        prop_assert_eq!(first, compare(a, b));
        prop_assert_eq!(first.carry, a < b);
        prop_assert_eq!(first.zero, a == b);
        prop_assert_eq!(first.sign, i32::from(a) - i32::from(b) < 0);
    }
}
