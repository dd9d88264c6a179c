//! Combo tracking.
//!
//! Keeps a short, time-bounded history of impulse timestamps and derives
//! the combo chain, multiplier and fever status from their spacing.

use std::collections::VecDeque;

use crate::storage::ComboConfig;

/// Hard cap on retained timestamps, independent of the time window.
const MAX_HISTORY: usize = 64;

/// What one `evaluate` call did to the combo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComboStep {
    /// The chain continued; carries the new multiplier.
    Extended { multiplier: u32 },
    /// The gap since the previous impulse broke the chain.
    Reset,
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct ComboTracker {
    config: ComboConfig,
    /// Timestamps (ms since session start), oldest first.
    history: VecDeque<u64>,
    /// Gap between the last two recorded impulses, even if pruned.
    last_gap_ms: Option<u64>,
    last_at: Option<u64>,
    combo: u32,
    multiplier: u32,
    best: u32,
}

impl ComboTracker {
    pub fn new(config: ComboConfig) -> Self {
        Self {
            config,
            history: VecDeque::with_capacity(8),
            last_gap_ms: None,
            last_at: None,
            combo: 0,
            multiplier: 1,
            best: 0,
        }
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn multiplier(&self) -> u32 {
        self.multiplier
    }

    pub fn best(&self) -> u32 {
        self.best
    }

    pub fn fever(&self) -> bool {
        self.multiplier >= self.config.fever_multiplier
    }

    /// Recent timestamps, oldest first.
    pub fn history(&self) -> impl Iterator<Item = u64> + '_ {
        self.history.iter().copied()
    }

    /// Append an impulse and prune entries older than the history window.
    pub fn record_impulse(&mut self, now_ms: u64) {
        self.last_gap_ms = self.last_at.map(|last| now_ms.saturating_sub(last));
        self.last_at = Some(now_ms);

        self.history.push_back(now_ms);
        let horizon = now_ms.saturating_sub(self.config.history_window_ms);
        while self
            .history
            .front()
            .is_some_and(|&oldest| oldest < horizon)
        {
            self.history.pop_front();
        }
        while self.history.len() > MAX_HISTORY {
            self.history.pop_front();
        }
    }

    /// Span covered by the latest `count` impulses recorded at or after
    /// `since_ms`, or `None` if fewer than `count` qualify.
    pub fn span_of_last(&self, count: usize, since_ms: u64) -> Option<u64> {
        if count == 0 {
            return None;
        }
        let mut recent = self.history.iter().rev().take_while(|&&at| at >= since_ms);
        let newest = *recent.next()?;
        if count == 1 {
            return Some(0);
        }
        let oldest = *recent.nth(count - 2)?;
        Some(newest - oldest)
    }

    /// Advance or break the combo chain based on the latest impulse.
    pub fn evaluate(&mut self) -> ComboStep {
        let chained = self
            .span_of_last(self.config.chain_len, 0)
            .is_some_and(|span| span < self.config.chain_span_ms);

        let step = if chained {
            self.combo += 1;
            self.multiplier = (self.multiplier + 1).min(self.config.max_multiplier.max(1));
            ComboStep::Extended {
                multiplier: self.multiplier,
            }
        } else if self
            .last_gap_ms
            .is_some_and(|gap| gap > self.config.reset_gap_ms)
        {
            self.combo = 0;
            self.multiplier = 1;
            ComboStep::Reset
        } else {
            ComboStep::Unchanged
        };

        self.best = self.best.max(self.combo);
        step
    }
}
