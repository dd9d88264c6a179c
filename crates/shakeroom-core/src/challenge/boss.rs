//! Boss stage bookkeeping.
//!
//! ```text
//! Dormant -> Active(epoch) -> Won | Dormant (fallback)
//! ```
//!
//! The stage may be re-entered after a failure once progress climbs back
//! over the trigger; every entry gets a fresh epoch and a zeroed counter.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BossVerdict {
    Won,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BossStage {
    active: bool,
    epoch: u64,
    hits: u32,
    /// The session clock ran out while the window was open.
    timeout_pending: bool,
}

impl BossStage {
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn hits(&self) -> u32 {
        self.hits
    }

    pub fn timeout_pending(&self) -> bool {
        self.timeout_pending
    }

    pub fn enter(&mut self, epoch: u64) {
        self.active = true;
        self.epoch = epoch;
        self.hits = 0;
        self.timeout_pending = false;
    }

    /// Count one impulse; returns the running total.
    pub fn hit(&mut self) -> u32 {
        self.hits += 1;
        self.hits
    }

    pub fn defer_timeout(&mut self) {
        self.timeout_pending = true;
    }

    /// Close the window if `epoch` is live and judge the attempt.
    pub fn close(&mut self, epoch: u64, required: u32) -> Option<BossVerdict> {
        if !self.active || self.epoch != epoch {
            return None;
        }
        self.active = false;
        Some(if self.hits >= required {
            BossVerdict::Won
        } else {
            BossVerdict::Failed
        })
    }
}
