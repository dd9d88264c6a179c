//! Shake session state machine.
//!
//! `Session` owns every field of one play-through and applies the rules
//! for impulses, clock ticks, decay ticks, modifier windows and the boss
//! stage. It has no clock and no threads: every operation takes the
//! current time in milliseconds since session start, and the async
//! engine is responsible for calling it.
//!
//! ## Termination
//!
//! Once [`Session::outcome`] is set, every operation returns
//! [`Transition::Ignored`] and leaves the state untouched.

use tracing::{debug, info, trace};

use super::boss::{BossStage, BossVerdict};
use super::combo::{ComboStep, ComboTracker};
use super::modifier::{ModifierKind, Modifiers};
use super::scoring::{clamp_progress, decay_amount, impulse_gain, stage_for};
use super::snapshot::{Outcome, Snapshot};
use crate::storage::SessionConfig;

/// What an operation did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Nothing changed.
    Ignored,
    /// State changed; publish a snapshot.
    Updated,
    /// An impulse went through the normal scoring path.
    Scored,
    /// The boss window opened; the caller must time it.
    BossStarted { epoch: u64 },
    /// The session just ended.
    Ended(Outcome),
}

impl Transition {
    pub fn is_change(self) -> bool {
        self != Transition::Ignored
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    config: SessionConfig,
    progress: f32,
    time_left: u32,
    stage: u32,
    shakes: u32,
    bonus_caught: u32,
    freeze_breaks: u32,
    boss_success: bool,
    combo: ComboTracker,
    modifiers: Modifiers,
    boss: BossStage,
    /// Last impulse that counts against idle decay (ms).
    last_impulse_at: u64,
    message: String,
    message_expires_at: Option<u64>,
    outcome: Option<Outcome>,
}

impl Session {
    /// Fresh session: zero progress, full clock, stage 1.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            combo: ComboTracker::new(config.combo.clone()),
            time_left: config.duration_secs,
            config,
            progress: 0.0,
            stage: 1,
            shakes: 0,
            bonus_caught: 0,
            freeze_breaks: 0,
            boss_success: false,
            modifiers: Modifiers::default(),
            boss: BossStage::default(),
            last_impulse_at: 0,
            message: String::new(),
            message_expires_at: None,
            outcome: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    pub fn stage(&self) -> u32 {
        self.stage
    }

    /// Wave mirrors stage and scales decay.
    pub fn wave(&self) -> u32 {
        self.stage
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn is_active(&self, kind: ModifierKind) -> bool {
        self.modifiers.is_active(kind)
    }

    pub fn boss_active(&self) -> bool {
        self.boss.is_active()
    }

    pub fn boss_hits(&self) -> u32 {
        self.boss.hits()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// When the current message should be cleared (ms), if any.
    pub fn message_deadline(&self) -> Option<u64> {
        if self.is_over() {
            return None;
        }
        self.message_expires_at
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            progress: self.progress,
            time_left: self.time_left,
            stage: self.stage,
            wave: self.wave(),
            combo: self.combo.combo(),
            combo_multiplier: self.combo.multiplier(),
            fever: self.combo.fever(),
            best_combo: self.combo.best(),
            shakes: self.shakes,
            bonus_caught: self.bonus_caught,
            freeze_breaks: self.freeze_breaks,
            bonus_active: self.is_active(ModifierKind::Bonus),
            freeze_active: self.is_active(ModifierKind::Freeze),
            boss_active: self.boss.is_active(),
            fatigue_active: self.is_active(ModifierKind::Fatigue),
            poison_active: self.is_active(ModifierKind::Poison),
            fake_bonus_active: self.is_active(ModifierKind::FakeBonus),
            boss_success: self.boss_success,
            message: self.message.clone(),
            outcome: self.outcome,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Resolve one impulse.
    pub fn impulse(&mut self, now_ms: u64) -> Transition {
        if self.is_over() {
            return Transition::Ignored;
        }

        if self.boss.is_active() {
            self.shakes += 1;
            self.last_impulse_at = now_ms;
            let hits = self.boss.hit();
            trace!(hits, "boss impulse");
            if hits >= self.config.boss.required {
                let epoch = self.boss.epoch();
                return self.close_boss(epoch, now_ms);
            }
            return Transition::Updated;
        }

        if self.modifiers.any_active(&[ModifierKind::Poison, ModifierKind::FakeBonus]) {
            self.shakes += 1;
            self.modifiers.record_penalty_hit();
            return Transition::Updated;
        }

        self.shakes += 1;
        self.last_impulse_at = now_ms;
        self.combo.record_impulse(now_ms);

        if self.is_active(ModifierKind::Bonus) {
            let opened_at = self.modifiers.slot(ModifierKind::Bonus).opened_at;
            let caught = self
                .combo
                .span_of_last(2, opened_at)
                .is_some_and(|gap| gap < self.config.bonus.pair_gap_ms);
            if caught {
                self.modifiers.close(ModifierKind::Bonus);
                self.bonus_caught += 1;
                let reward = self.config.bonus.reward;
                self.progress = clamp_progress(self.progress + reward);
                self.set_message(format!("Totem caught! +{}%!", percent(reward)), now_ms);
                debug!(progress = self.progress, "bonus caught");
                return self.after_gain(now_ms, false);
            }
        }

        if self.is_active(ModifierKind::Freeze) {
            let opened_at = self.modifiers.slot(ModifierKind::Freeze).opened_at;
            let broken = self
                .combo
                .span_of_last(self.config.freeze.break_count, opened_at)
                .is_some_and(|span| span < self.config.freeze.break_span_ms);
            if broken {
                self.modifiers.close(ModifierKind::Freeze);
                self.freeze_breaks += 1;
                self.set_message("Ice broken!", now_ms);
                debug!("freeze broken");
            }
            return Transition::Updated;
        }

        if let ComboStep::Extended { multiplier } = self.combo.evaluate() {
            self.set_message(format!("Combo! x{multiplier}"), now_ms);
        }

        let gain = impulse_gain(
            &self.config.gains,
            self.progress,
            self.is_active(ModifierKind::Fatigue),
            self.combo.fever(),
            self.combo.multiplier(),
        );
        self.progress = clamp_progress(self.progress + gain);

        match self.after_gain(now_ms, true) {
            Transition::Updated => Transition::Scored,
            other => other,
        }
    }

    /// One second of the session clock.
    pub fn clock_tick(&mut self, now_ms: u64) -> Transition {
        // The clock holds while the meter is full.
        if self.is_over() || self.time_left == 0 || self.progress >= 1.0 {
            return Transition::Ignored;
        }
        self.time_left -= 1;
        if self.time_left > 0 {
            return Transition::Updated;
        }
        if self.boss.is_active() {
            // Let the open boss window decide; a win beats the clock.
            debug!("clock expired during boss stage");
            self.boss.defer_timeout();
            return Transition::Updated;
        }
        self.set_message("Time's up!", now_ms);
        self.finish(Outcome::Lost)
    }

    /// One idle-decay tick.
    pub fn decay_tick(&mut self, now_ms: u64) -> Transition {
        if self.is_over()
            || self.boss.is_active()
            || self.modifiers.any_active(&[ModifierKind::Freeze, ModifierKind::Poison])
        {
            return Transition::Ignored;
        }
        if now_ms.saturating_sub(self.last_impulse_at) <= self.config.decay.idle_window_ms {
            return Transition::Ignored;
        }
        if self.progress <= 0.0 {
            return Transition::Ignored;
        }
        let amount = decay_amount(&self.config.decay, self.progress, self.wave());
        self.progress = clamp_progress(self.progress - amount);
        Transition::Updated
    }

    /// Try to open a modifier window; returns its epoch when it opened.
    pub fn activate(&mut self, kind: ModifierKind, now_ms: u64) -> Option<u64> {
        if self.is_over() || self.boss.is_active() {
            return None;
        }
        if kind.needs_room_below_boss() && self.progress >= self.config.boss.trigger_at {
            return None;
        }
        if self.modifiers.any_active(kind.blocked_by()) {
            trace!(%kind, "activation refused");
            return None;
        }
        let epoch = self.modifiers.open(kind, now_ms);
        let window_ms = self.config.schedule(kind).window_ms;
        self.set_message(kind.activation_message(window_ms), now_ms);
        debug!(%kind, epoch, "modifier activated");
        Some(epoch)
    }

    /// Close a modifier window when its active span ends.
    ///
    /// A window that already closed early (bonus caught, freeze broken)
    /// or was superseded by a newer activation is left alone.
    pub fn resolve(&mut self, kind: ModifierKind, epoch: u64, now_ms: u64) -> Transition {
        if self.is_over() {
            return Transition::Ignored;
        }
        let Some(slot) = self.modifiers.close_if_current(kind, epoch) else {
            return Transition::Ignored;
        };
        debug!(%kind, epoch, hits = slot.hits, "modifier resolved");

        match kind {
            ModifierKind::Poison if slot.hits > 0 => {
                let penalty = self.config.poison.penalty;
                self.apply_penalty(penalty);
                let message = format!("Ouch, you shook under poison! -{}%", percent(penalty));
                self.set_message(message, now_ms);
            }
            ModifierKind::FakeBonus if slot.hits > 0 => {
                let penalty = self.config.fake_bonus.penalty;
                self.apply_penalty(penalty);
                let message = format!("Gotcha, it was a trap! -{}%", percent(penalty));
                self.set_message(message, now_ms);
            }
            ModifierKind::Fatigue => self.set_message("The fatigue wears off.", now_ms),
            _ => {}
        }
        Transition::Updated
    }

    /// The boss window timed out.
    pub fn boss_expired(&mut self, epoch: u64, now_ms: u64) -> Transition {
        if self.is_over() {
            return Transition::Ignored;
        }
        self.close_boss(epoch, now_ms)
    }

    /// Clear the status message once its time is up.
    pub fn expire_message(&mut self, now_ms: u64) -> Transition {
        match self.message_deadline() {
            Some(deadline) if now_ms >= deadline => {
                self.message.clear();
                self.message_expires_at = None;
                Transition::Updated
            }
            _ => Transition::Ignored,
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn set_message(&mut self, message: impl Into<String>, now_ms: u64) {
        self.message = message.into();
        self.message_expires_at = Some(now_ms + self.config.message_ttl_ms);
    }

    fn apply_penalty(&mut self, penalty: f32) {
        self.progress = clamp_progress(self.progress - penalty);
    }

    /// Stage bookkeeping, completion and boss entry after progress grew.
    fn after_gain(&mut self, now_ms: u64, allow_boss: bool) -> Transition {
        let target = stage_for(&self.config.stages, self.progress);
        while self.stage < target {
            self.stage += 1;
            let message = if self.stage == 2 {
                "Stage 2 cleared! New wave!".to_string()
            } else {
                format!("Stage {} cleared!", self.stage)
            };
            self.set_message(message, now_ms);
            debug!(stage = self.stage, "stage advanced");
        }

        if allow_boss && !self.boss.is_active() && self.progress >= self.config.boss.trigger_at {
            let epoch = self.modifiers.next_epoch();
            self.boss.enter(epoch);
            let boss = &self.config.boss;
            self.set_message(
                format!(
                    "Final boss! Shake {}x in {}s or fall back to {}%!",
                    boss.required,
                    boss.window_ms.div_ceil(1000),
                    percent(boss.fallback)
                ),
                now_ms,
            );
            debug!(epoch, progress = self.progress, "boss stage started");
            return Transition::BossStarted { epoch };
        }

        if self.progress >= 1.0 {
            return self.finish(Outcome::Won);
        }
        Transition::Updated
    }

    fn close_boss(&mut self, epoch: u64, now_ms: u64) -> Transition {
        match self.boss.close(epoch, self.config.boss.required) {
            None => Transition::Ignored,
            Some(BossVerdict::Won) => {
                self.progress = 1.0;
                self.boss_success = true;
                self.set_message("Boss defeated!", now_ms);
                self.finish(Outcome::Won)
            }
            Some(BossVerdict::Failed) => {
                self.progress = clamp_progress(self.config.boss.fallback);
                self.set_message("Missed... the boss pushed you back!", now_ms);
                debug!(hits = self.boss.hits(), "boss stage failed");
                if self.boss.timeout_pending() || self.time_left == 0 {
                    return self.finish(Outcome::Lost);
                }
                Transition::Updated
            }
        }
    }

    /// First write wins; later calls are dropped.
    fn finish(&mut self, outcome: Outcome) -> Transition {
        if self.outcome.is_some() {
            return Transition::Ignored;
        }
        self.outcome = Some(outcome);
        info!(
            ?outcome,
            progress = self.progress,
            shakes = self.shakes,
            best_combo = self.combo.best(),
            "session ended"
        );
        Transition::Ended(outcome)
    }
}

fn percent(fraction: f32) -> u32 {
    (fraction * 100.0).round() as u32
}
