//! # Shakeroom Core Library
//!
//! This library provides the game logic for Shakeroom, a timed
//! shake-to-fill challenge. The host feeds discrete shake impulses in,
//! the engine fills a progress meter against a countdown and publishes
//! state snapshots until the session is won or lost.
//!
//! ## Architecture
//!
//! - **Challenge**: A synchronous, clock-free state machine that takes
//!   explicit millisecond timestamps. Combo, scoring, decay, modifiers
//!   and the boss stage all live here and are unit tested without a
//!   runtime.
//! - **Engine**: An async façade on Tokio. One actor task owns the
//!   session; the clock, decay, modifier spawners and boss timer only
//!   sleep and send commands.
//! - **Storage**: TOML-based configuration with every tuning constant
//!   exposed as a default.
//! - **Input**: Accelerometer sample to impulse classifier.
//!
//! ## Key Components
//!
//! - [`Session`]: Core challenge state machine
//! - [`Engine`]: Spawns and drives one session
//! - [`EngineHandle`]: Host-side control of a running session
//! - [`Config`]: Application configuration management
//! - [`Feedback`]: Trait for haptic or audio side effects

pub mod challenge;
pub mod engine;
pub mod error;
pub mod events;
pub mod feedback;
pub mod input;
pub mod storage;

pub use challenge::{ModifierKind, Outcome, Session, Snapshot, Transition};
pub use engine::{CancelToken, Engine, EngineHandle};
pub use error::{ConfigError, CoreError, EngineError};
pub use events::{Event, SessionReport};
pub use feedback::{Feedback, FeedbackKind, NoFeedback};
pub use input::{MotionSample, ShakeDetector};
pub use storage::{Config, InputConfig, SessionConfig};
