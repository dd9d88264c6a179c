//! Modifier kinds and their per-session activation slots.

use serde::{Deserialize, Serialize};

/// A temporary, randomly scheduled state that changes how impulses resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierKind {
    /// Two quick impulses catch a progress reward.
    Bonus,
    /// Intercepts scoring until broken by a fast triple impulse.
    Freeze,
    /// Weakens every impulse while active.
    Fatigue,
    /// Any impulse during the window costs progress.
    Poison,
    /// Looks like a bonus, punishes like poison.
    FakeBonus,
}

impl ModifierKind {
    pub const ALL: [ModifierKind; 5] = [
        ModifierKind::Bonus,
        ModifierKind::Freeze,
        ModifierKind::Fatigue,
        ModifierKind::Poison,
        ModifierKind::FakeBonus,
    ];

    pub fn index(self) -> usize {
        match self {
            ModifierKind::Bonus => 0,
            ModifierKind::Freeze => 1,
            ModifierKind::Fatigue => 2,
            ModifierKind::Poison => 3,
            ModifierKind::FakeBonus => 4,
        }
    }

    /// Config section name.
    pub fn key(self) -> &'static str {
        match self {
            ModifierKind::Bonus => "bonus",
            ModifierKind::Freeze => "freeze",
            ModifierKind::Fatigue => "fatigue",
            ModifierKind::Poison => "poison",
            ModifierKind::FakeBonus => "fake_bonus",
        }
    }

    /// Modifiers whose active window prevents this one from starting.
    pub fn blocked_by(self) -> &'static [ModifierKind] {
        match self {
            ModifierKind::Bonus => &[ModifierKind::Bonus],
            ModifierKind::Freeze => &[ModifierKind::Freeze],
            ModifierKind::Fatigue | ModifierKind::Poison => {
                &[ModifierKind::Fatigue, ModifierKind::Poison]
            }
            ModifierKind::FakeBonus => &[ModifierKind::FakeBonus],
        }
    }

    /// Whether impulses during the window are withheld from scoring and
    /// settled as one penalty at resolve time.
    pub fn is_penalty(self) -> bool {
        matches!(self, ModifierKind::Poison | ModifierKind::FakeBonus)
    }

    /// Whether activation is refused once the boss threshold is reached.
    pub fn needs_room_below_boss(self) -> bool {
        matches!(self, ModifierKind::Bonus | ModifierKind::Freeze)
    }

    pub fn activation_message(self, window_ms: u64) -> String {
        match self {
            ModifierKind::Bonus => "A totem appears! Double-shake fast to catch it!".into(),
            ModifierKind::Freeze => "Freeze! Shake fast to break the ice!".into(),
            ModifierKind::Fatigue => "Fatigue! Your shakes are weaker...".into(),
            ModifierKind::Poison => format!(
                "Poison! Do NOT shake for {}s or you fall back!",
                window_ms.div_ceil(1000)
            ),
            ModifierKind::FakeBonus => "A totem appears! ...or does it? Don't shake!".into(),
        }
    }
}

impl std::fmt::Display for ModifierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Runtime state of one modifier within a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierSlot {
    pub active: bool,
    /// Generation of the current (or last) activation.
    pub epoch: u64,
    /// When the current window opened (ms since session start).
    pub opened_at: u64,
    /// Impulses received during the current window.
    pub hits: u32,
}

/// The five modifier slots plus the activation generation counter.
#[derive(Debug, Clone, Default)]
pub struct Modifiers {
    slots: [ModifierSlot; 5],
    next_epoch: u64,
}

impl Modifiers {
    pub fn slot(&self, kind: ModifierKind) -> &ModifierSlot {
        &self.slots[kind.index()]
    }

    pub fn is_active(&self, kind: ModifierKind) -> bool {
        self.slot(kind).active
    }

    /// True when any of `kinds` is active.
    pub fn any_active(&self, kinds: &[ModifierKind]) -> bool {
        kinds.iter().any(|&kind| self.is_active(kind))
    }

    /// Open a new window and return its epoch.
    pub fn open(&mut self, kind: ModifierKind, now_ms: u64) -> u64 {
        self.next_epoch += 1;
        self.slots[kind.index()] = ModifierSlot {
            active: true,
            epoch: self.next_epoch,
            opened_at: now_ms,
            hits: 0,
        };
        self.next_epoch
    }

    /// Close the window if `epoch` is still the live one; returns the
    /// closed slot so the caller can settle it.
    pub fn close_if_current(&mut self, kind: ModifierKind, epoch: u64) -> Option<ModifierSlot> {
        let slot = &mut self.slots[kind.index()];
        if !slot.active || slot.epoch != epoch {
            return None;
        }
        slot.active = false;
        Some(*slot)
    }

    /// Close the window regardless of epoch (early success).
    pub fn close(&mut self, kind: ModifierKind) {
        self.slots[kind.index()].active = false;
    }

    /// Count an impulse against every active penalty window.
    pub fn record_penalty_hit(&mut self) {
        for kind in ModifierKind::ALL.into_iter().filter(|kind| kind.is_penalty()) {
            let slot = &mut self.slots[kind.index()];
            if slot.active {
                slot.hits += 1;
            }
        }
    }

    pub fn next_epoch(&mut self) -> u64 {
        self.next_epoch += 1;
        self.next_epoch
    }
}
