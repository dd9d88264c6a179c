//! Property tests for the session state machine.
//!
//! Random interleavings of impulses, ticks and modifier windows must
//! keep the meter in range, never move the stage backwards and freeze
//! the state once an outcome is recorded.

use proptest::prelude::*;
use shakeroom_core::{ModifierKind, Session, SessionConfig, Transition};

#[derive(Debug, Clone)]
enum Op {
    Impulse { gap_ms: u64 },
    ClockTick,
    DecayTick { gap_ms: u64 },
    Activate(ModifierKind),
    Resolve(ModifierKind),
    BossExpired,
}

fn kind() -> impl Strategy<Value = ModifierKind> {
    prop::sample::select(ModifierKind::ALL.to_vec())
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (0u64..1500).prop_map(|gap_ms| Op::Impulse { gap_ms }),
        2 => Just(Op::ClockTick),
        2 => (0u64..2000).prop_map(|gap_ms| Op::DecayTick { gap_ms }),
        1 => kind().prop_map(Op::Activate),
        1 => kind().prop_map(Op::Resolve),
        1 => Just(Op::BossExpired),
    ]
}

/// Replays operations, tracking the epochs a real engine would time.
struct Driver {
    session: Session,
    now_ms: u64,
    epochs: [Option<u64>; 5],
    boss_epoch: Option<u64>,
}

impl Driver {
    fn new(config: SessionConfig) -> Self {
        Self {
            session: Session::new(config),
            now_ms: 0,
            epochs: [None; 5],
            boss_epoch: None,
        }
    }

    fn apply(&mut self, op: &Op) -> Transition {
        let transition = match *op {
            Op::Impulse { gap_ms } => {
                self.now_ms += gap_ms;
                self.session.impulse(self.now_ms)
            }
            Op::ClockTick => self.session.clock_tick(self.now_ms),
            Op::DecayTick { gap_ms } => {
                self.now_ms += gap_ms;
                self.session.decay_tick(self.now_ms)
            }
            Op::Activate(kind) => match self.session.activate(kind, self.now_ms) {
                Some(epoch) => {
                    self.epochs[kind.index()] = Some(epoch);
                    Transition::Updated
                }
                None => Transition::Ignored,
            },
            Op::Resolve(kind) => match self.epochs[kind.index()] {
                Some(epoch) => self.session.resolve(kind, epoch, self.now_ms),
                None => Transition::Ignored,
            },
            Op::BossExpired => match self.boss_epoch {
                Some(epoch) => self.session.boss_expired(epoch, self.now_ms),
                None => Transition::Ignored,
            },
        };
        if let Transition::BossStarted { epoch } = transition {
            self.boss_epoch = Some(epoch);
        }
        transition
    }

    /// Ticks the clock `ticks` times, counting session ends.
    fn run_clock(&mut self, ticks: u32) -> u32 {
        let mut ended = 0;
        for _ in 0..ticks {
            if matches!(self.session.clock_tick(self.now_ms), Transition::Ended(_)) {
                ended += 1;
            }
        }
        ended
    }
}

fn short_config(duration_secs: u32) -> SessionConfig {
    SessionConfig::default()
        .with_seed(0)
        .with_duration(duration_secs)
}

proptest! {
    #[test]
    fn prop_clock_never_moves_at_full_meter(
        ops in prop::collection::vec(op(), 1..300),
    ) {
        let mut driver = Driver::new(short_config(70));
        for op in &ops {
            let full = driver.session.progress() >= 1.0;
            let before = driver.session.time_left();
            driver.apply(op);
            if full && matches!(op, Op::ClockTick) {
                prop_assert_eq!(driver.session.time_left(), before);
            }
        }
    }

    #[test]
    fn prop_progress_stays_in_unit_range(
        ops in prop::collection::vec(op(), 1..300),
        duration in 1u32..80,
    ) {
        let mut driver = Driver::new(short_config(duration));
        for op in &ops {
            driver.apply(op);
            let progress = driver.session.progress();
            prop_assert!((0.0..=1.0).contains(&progress), "progress {} after {:?}", progress, op);
        }
    }

    #[test]
    fn prop_stage_never_decreases(
        ops in prop::collection::vec(op(), 1..300),
    ) {
        let mut driver = Driver::new(short_config(70));
        let mut stage = driver.session.stage();
        for op in &ops {
            driver.apply(op);
            let next = driver.session.stage();
            prop_assert!(next >= stage);
            prop_assert!((1..=3).contains(&next));
            prop_assert_eq!(driver.session.wave(), next);
            stage = next;
        }
    }

    #[test]
    fn prop_combo_stays_consistent(
        ops in prop::collection::vec(op(), 1..300),
    ) {
        let mut driver = Driver::new(short_config(70));
        let max = driver.session.config().combo.max_multiplier;
        for op in &ops {
            driver.apply(op);
            let snapshot = driver.session.snapshot();
            prop_assert!(snapshot.best_combo >= snapshot.combo);
            prop_assert!((1..=max).contains(&snapshot.combo_multiplier));
        }
    }

    #[test]
    fn prop_state_is_frozen_after_the_end(
        ops in prop::collection::vec(op(), 1..300),
        tail in prop::collection::vec(op(), 1..50),
        duration in 1u32..5,
    ) {
        let mut driver = Driver::new(short_config(duration));
        let mut ended = 0;
        for op in &ops {
            if matches!(driver.apply(op), Transition::Ended(_)) {
                ended += 1;
            }
        }
        // Run the clock out, close any boss window (the clock holds while
        // the meter is full), then run whatever time is left.
        ended += driver.run_clock(duration);
        if driver.session.boss_active() {
            if let Some(epoch) = driver.boss_epoch {
                if matches!(driver.session.boss_expired(epoch, driver.now_ms), Transition::Ended(_)) {
                    ended += 1;
                }
            }
        }
        ended += driver.run_clock(duration);
        prop_assert!(driver.session.is_over());
        prop_assert_eq!(ended, 1);

        let frozen = driver.session.snapshot();
        for op in &tail {
            prop_assert_eq!(driver.apply(op), Transition::Ignored);
        }
        prop_assert_eq!(driver.session.expire_message(u64::MAX), Transition::Ignored);
        prop_assert_eq!(driver.session.snapshot(), frozen);
    }
}
