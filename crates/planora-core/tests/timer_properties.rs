//! Property tests for start and tick invariants.

use std::sync::Arc;

use chrono::{Duration, Utc};
use planora_core::{MemoryReporter, MemoryStore, PendingModal, SessionConfig, StudyTimerEngine};
use proptest::prelude::*;

fn engine() -> StudyTimerEngine {
    StudyTimerEngine::new(
        Box::new(MemoryStore::new()),
        Arc::new(MemoryReporter::new()),
    )
}

fn config_strategy() -> impl Strategy<Value = SessionConfig> {
    (1u32..=8, 1u32..=90, 0u32..=30).prop_map(|(total_cycles, focus_minutes, break_minutes)| {
        SessionConfig {
            total_cycles,
            focus_minutes,
            break_minutes,
        }
    })
}

fn short_config_strategy() -> impl Strategy<Value = SessionConfig> {
    (1u32..=4, 1u32..=3, 0u32..=2).prop_map(|(total_cycles, focus_minutes, break_minutes)| {
        SessionConfig {
            total_cycles,
            focus_minutes,
            break_minutes,
        }
    })
}

proptest! {
    #[test]
    fn start_sets_full_focus_countdown(config in config_strategy()) {
        let mut engine = engine();
        engine.configure(config).unwrap();
        engine.select_subject("Biology").unwrap();
        engine.start_at(Utc::now()).unwrap();

        prop_assert_eq!(engine.state().time_remaining, u64::from(config.focus_minutes) * 60);
        prop_assert_eq!(engine.state().current_cycle, 1);
        prop_assert_eq!(engine.state().cycles_completed, 0);
    }

    #[test]
    fn focus_tick_moves_countdown_and_study_time_together(
        config in config_strategy(),
        ticks in 1u64..600,
    ) {
        let mut engine = engine();
        engine.configure(config).unwrap();
        engine.select_subject("Biology").unwrap();
        let t0 = Utc::now();
        engine.start_at(t0).unwrap();

        let focus_secs = u64::from(config.focus_minutes) * 60;
        let ticks = ticks.min(focus_secs - 1);
        for i in 1..=ticks {
            let before = engine.state().clone();
            engine.clock_tick_at(t0 + Duration::seconds(i as i64));
            prop_assert_eq!(engine.state().time_remaining, before.time_remaining - 1);
            prop_assert_eq!(engine.state().total_study_time, before.total_study_time + 1);
        }
        prop_assert_eq!(engine.pending_modal(), PendingModal::None);
    }

    #[test]
    fn cycles_completed_never_exceed_total(config in short_config_strategy(), accept in any::<bool>()) {
        let mut engine = engine();
        engine.configure(config).unwrap();
        engine.select_subject("Biology").unwrap();
        let mut now = Utc::now();
        engine.start_at(now).unwrap();

        let phase_limit = u64::from(config.focus_minutes.max(config.break_minutes)) * 60 + 2;
        for _ in 0..(config.total_cycles * 2 + 1) {
            for _ in 0..phase_limit {
                now += Duration::seconds(1);
                engine.clock_tick_at(now);
                if engine.pending_modal().is_pending() {
                    break;
                }
            }
            prop_assert!(engine.state().cycles_completed <= config.total_cycles);
            match engine.pending_modal() {
                PendingModal::CycleDone if accept => {
                    engine.accept_break_at(now);
                }
                PendingModal::CycleDone => {
                    engine.skip_break_at(now);
                }
                PendingModal::BreakDone => {
                    engine.continue_after_break_at(now);
                }
                PendingModal::SessionComplete | PendingModal::None => break,
            }
        }
        prop_assert_eq!(engine.pending_modal(), PendingModal::SessionComplete);
        prop_assert_eq!(engine.state().cycles_completed, config.total_cycles);
    }
}
