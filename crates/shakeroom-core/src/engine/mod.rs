//! Async engine façade.
//!
//! The engine runs one shake session on the Tokio runtime:
//!
//! ```text
//!  clock ──┐
//!  decay ──┤                     ┌──> watch<Snapshot>
//!  spawners┼──> Command ──> actor┤
//!  boss ───┤    (mpsc)   (Session)└──> mpsc<Event>
//!  host ───┘ on_impulse()
//! ```
//!
//! Only the actor touches the [`Session`]. Timed tasks just sleep and
//! send commands, so every mutation is serialized without a lock, and a
//! command arriving after the session ended is dropped by the session.
//!
//! ## Usage
//!
//! ```ignore
//! let (handle, mut events) = Engine::new(SessionConfig::default()).start()?;
//! // From the input adapter:
//! handle.on_impulse();
//! // Render loop:
//! while let Some(event) = events.recv().await { /* ... */ }
//! ```

mod cancel;
mod tasks;

pub use cancel::CancelToken;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::SeedableRng;
use rand_pcg::Mcg128Xsl64;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::challenge::{ModifierKind, Session, Snapshot, Transition};
use crate::error::{EngineError, Result};
use crate::events::{Event, SessionReport};
use crate::feedback::{Feedback, FeedbackKind, NoFeedback};
use crate::storage::SessionConfig;

/// Spreads one base seed over the per-modifier generators.
const SEED_SPREAD: u64 = 0x9E37_79B9_7F4A_7C15;

/// Messages consumed by the session actor.
#[derive(Debug)]
pub(crate) enum Command {
    Impulse(Instant),
    ClockTick,
    DecayTick,
    Activate {
        kind: ModifierKind,
        reply: oneshot::Sender<Option<u64>>,
    },
    Resolve {
        kind: ModifierKind,
        epoch: u64,
    },
    BossExpired {
        epoch: u64,
    },
}

/// Builder for one session.
pub struct Engine {
    config: SessionConfig,
    feedback: Arc<dyn Feedback>,
}

impl Engine {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            feedback: Arc::new(NoFeedback),
        }
    }

    pub fn with_feedback(mut self, feedback: Arc<dyn Feedback>) -> Self {
        self.feedback = feedback;
        self
    }

    /// Validate the config and spawn the actor plus every timed task.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the session config does not
    /// validate; nothing is spawned in that case.
    pub fn start(self) -> Result<(EngineHandle, mpsc::UnboundedReceiver<Event>)> {
        self.config.validate()?;

        let session = Session::new(self.config.clone());
        let started = Instant::now();
        let cancel = CancelToken::new();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(session.snapshot());

        let seed = self.config.seed.unwrap_or_else(rand::random);
        info!(
            duration_secs = self.config.duration_secs,
            seed, "session started"
        );

        tokio::spawn(tasks::run_ticker(
            Duration::from_millis(self.config.clock_tick_ms),
            || Command::ClockTick,
            commands_tx.clone(),
            cancel.clone(),
        ));
        tokio::spawn(tasks::run_ticker(
            Duration::from_millis(self.config.decay.tick_ms),
            || Command::DecayTick,
            commands_tx.clone(),
            cancel.clone(),
        ));
        for kind in ModifierKind::ALL {
            if !self.config.enabled.is_enabled(kind) {
                continue;
            }
            let rng = Mcg128Xsl64::seed_from_u64(
                seed ^ SEED_SPREAD.wrapping_mul(kind.index() as u64 + 1),
            );
            tokio::spawn(tasks::run_spawner(
                kind,
                self.config.schedule(kind).clone(),
                rng,
                commands_tx.clone(),
                cancel.clone(),
            ));
        }

        let actor = Actor {
            session,
            started,
            commands: commands_tx.clone(),
            events: events_tx,
            state: state_tx,
            feedback: self.feedback,
            cancel: cancel.clone(),
        };
        let actor = tokio::spawn(actor.run(commands_rx));

        let handle = EngineHandle {
            commands: commands_tx,
            cancel,
            state: state_rx,
            actor,
        };
        Ok((handle, events_rx))
    }
}

/// Host-side control of a running session.
///
/// Dropping the handle does not stop the session; call [`stop`].
///
/// [`stop`]: EngineHandle::stop
pub struct EngineHandle {
    commands: mpsc::UnboundedSender<Command>,
    cancel: CancelToken,
    state: watch::Receiver<Snapshot>,
    actor: JoinHandle<Option<SessionReport>>,
}

impl EngineHandle {
    /// Deliver one impulse, timestamped now. Never blocks.
    pub fn on_impulse(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        let _ = self.commands.send(Command::Impulse(Instant::now()));
    }

    /// Cancel every task of the session. No `SessionEnded` is emitted.
    pub fn stop(&self) {
        if !self.cancel.is_cancelled() {
            debug!("session stop requested");
        }
        self.cancel.cancel();
    }

    /// False once the session ended or was stopped.
    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Latest published state.
    pub fn snapshot(&self) -> Snapshot {
        self.state.borrow().clone()
    }

    /// Watch the latest published state.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.state.clone()
    }

    /// Wait for the session to end.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AlreadyStopped`] if the session was stopped
    /// before reaching an outcome.
    pub async fn finished(self) -> std::result::Result<SessionReport, EngineError> {
        match self.actor.await {
            Ok(Some(report)) => Ok(report),
            Ok(None) => Err(EngineError::AlreadyStopped),
            Err(_) => Err(EngineError::ActorGone),
        }
    }
}

/// Sole owner of the session state.
struct Actor {
    session: Session,
    started: Instant,
    commands: mpsc::UnboundedSender<Command>,
    events: mpsc::UnboundedSender<Event>,
    state: watch::Sender<Snapshot>,
    feedback: Arc<dyn Feedback>,
    cancel: CancelToken,
}

impl Actor {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) -> Option<SessionReport> {
        self.publish();
        loop {
            let message_deadline = self
                .session
                .message_deadline()
                .map(|ms| self.started + Duration::from_millis(ms));

            let command = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!("session stopped before an outcome");
                    return None;
                }
                command = commands.recv() => match command {
                    Some(command) => command,
                    None => return None,
                },
                _ = sleep_until(message_deadline) => {
                    let now = self.now_ms();
                    if self.session.expire_message(now).is_change() {
                        self.publish();
                    }
                    continue;
                }
            };

            let transition = self.apply(command);
            if let Some(report) = self.react(transition) {
                return Some(report);
            }
        }
    }

    fn now_ms(&self) -> u64 {
        self.ms_at(Instant::now())
    }

    fn ms_at(&self, at: Instant) -> u64 {
        at.saturating_duration_since(self.started).as_millis() as u64
    }

    fn apply(&mut self, command: Command) -> Transition {
        match command {
            Command::Impulse(at) => {
                let at = self.ms_at(at);
                self.session.impulse(at)
            }
            Command::ClockTick => {
                let now = self.now_ms();
                self.session.clock_tick(now)
            }
            Command::DecayTick => {
                let now = self.now_ms();
                self.session.decay_tick(now)
            }
            Command::Activate { kind, reply } => {
                let now = self.now_ms();
                let epoch = self.session.activate(kind, now);
                let _ = reply.send(epoch);
                if epoch.is_some() {
                    Transition::Updated
                } else {
                    Transition::Ignored
                }
            }
            Command::Resolve { kind, epoch } => {
                let now = self.now_ms();
                self.session.resolve(kind, epoch, now)
            }
            Command::BossExpired { epoch } => {
                let now = self.now_ms();
                self.session.boss_expired(epoch, now)
            }
        }
    }

    /// Publish and schedule follow-ups; returns the report once ended.
    fn react(&mut self, transition: Transition) -> Option<SessionReport> {
        match transition {
            Transition::Ignored => None,
            Transition::Updated => {
                self.publish();
                None
            }
            Transition::Scored => {
                self.publish();
                self.pulse(FeedbackKind::Impulse);
                None
            }
            Transition::BossStarted { epoch } => {
                self.publish();
                self.pulse(FeedbackKind::BossStarted);
                let window = Duration::from_millis(self.session.config().boss.window_ms);
                tokio::spawn(tasks::run_boss_timer(
                    window,
                    epoch,
                    self.commands.clone(),
                    self.cancel.clone(),
                ));
                None
            }
            Transition::Ended(outcome) => {
                self.cancel.cancel();
                let snapshot = self.publish();
                let won = outcome.is_win();
                let _ = self.events.send(Event::SessionEnded {
                    won,
                    snapshot: snapshot.clone(),
                    at: Utc::now(),
                });
                self.pulse(FeedbackKind::SessionEnded { won });
                Some(SessionReport { won, snapshot })
            }
        }
    }

    fn publish(&self) -> Snapshot {
        let snapshot = self.session.snapshot();
        self.state.send_replace(snapshot.clone());
        let _ = self.events.send(Event::StateChanged {
            snapshot: snapshot.clone(),
            at: Utc::now(),
        });
        snapshot
    }

    fn pulse(&self, kind: FeedbackKind) {
        if let Err(e) = self.feedback.pulse(kind) {
            debug!(error = %e, ?kind, "feedback failed");
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
