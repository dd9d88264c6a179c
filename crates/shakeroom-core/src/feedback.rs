//! Best-effort side effects (haptics, sound) triggered by the engine.
//!
//! Implementations live in the host. The engine never lets a failing
//! device interfere with the session: errors are logged and dropped.

use std::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    /// A scoring impulse went through.
    Impulse,
    /// The boss window opened.
    BossStarted,
    SessionEnded { won: bool },
}

pub trait Feedback: Send + Sync {
    fn pulse(&self, _kind: FeedbackKind) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(()) // default no-op
    }
}

/// Feedback sink that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFeedback;

impl Feedback for NoFeedback {}
