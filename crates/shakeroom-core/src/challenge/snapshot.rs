use serde::{Deserialize, Serialize};

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Won,
    Lost,
}

impl Outcome {
    pub fn is_win(self) -> bool {
        self == Outcome::Won
    }
}

/// Read-only copy of the session state, handed to the host for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// 0.0 ..= 1.0
    pub progress: f32,
    pub time_left: u32,
    pub stage: u32,
    pub wave: u32,
    pub combo: u32,
    pub combo_multiplier: u32,
    pub fever: bool,
    pub best_combo: u32,
    pub shakes: u32,
    pub bonus_caught: u32,
    pub freeze_breaks: u32,
    pub bonus_active: bool,
    pub freeze_active: bool,
    pub boss_active: bool,
    pub fatigue_active: bool,
    pub poison_active: bool,
    pub fake_bonus_active: bool,
    pub boss_success: bool,
    /// Transient status line; empty when nothing to show.
    pub message: String,
    pub outcome: Option<Outcome>,
}
