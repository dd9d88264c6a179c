mod boss;
mod combo;
mod modifier;
mod scoring;
mod session;
mod snapshot;

pub use boss::{BossStage, BossVerdict};
pub use combo::{ComboStep, ComboTracker};
pub use modifier::{ModifierKind, ModifierSlot, Modifiers};
pub use scoring::{decay_amount, impulse_gain, stage_for};
pub use session::{Session, Transition};
pub use snapshot::{Outcome, Snapshot};
