use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::challenge::{Outcome, Snapshot};

/// Every state change in a session produces an Event.
/// The host renders `StateChanged` and tears down on `SessionEnded`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    StateChanged {
        snapshot: Snapshot,
        at: DateTime<Utc>,
    },
    /// Sent exactly once per session, never after `stop()`.
    SessionEnded {
        won: bool,
        snapshot: Snapshot,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn snapshot(&self) -> &Snapshot {
        match self {
            Event::StateChanged { snapshot, .. } | Event::SessionEnded { snapshot, .. } => snapshot,
        }
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Event::SessionEnded { .. })
    }
}

/// Final result of one session, handed back to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub won: bool,
    pub snapshot: Snapshot,
}

impl SessionReport {
    pub fn outcome(&self) -> Outcome {
        if self.won {
            Outcome::Won
        } else {
            Outcome::Lost
        }
    }
}
