//! Timed tasks of a running session.
//!
//! None of these own session state. Each one sleeps, then sends a
//! [`Command`] to the session actor, and exits as soon as the cancel
//! token fires or the actor stops listening.

use std::time::Duration;

use rand::Rng;
use rand_pcg::Mcg128Xsl64;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::trace;

use super::cancel::CancelToken;
use super::Command;
use crate::challenge::ModifierKind;
use crate::storage::ModifierSchedule;

/// Send `make()` every `period` until cancelled.
pub(super) async fn run_ticker(
    period: Duration,
    make: fn() -> Command,
    commands: mpsc::UnboundedSender<Command>,
    cancel: CancelToken,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if commands.send(make()).is_err() {
                    break;
                }
            }
        }
    }
}

/// Sleep → activate → active window → resolve → cooldown, forever.
pub(super) async fn run_spawner(
    kind: ModifierKind,
    schedule: ModifierSchedule,
    mut rng: Mcg128Xsl64,
    commands: mpsc::UnboundedSender<Command>,
    cancel: CancelToken,
) {
    loop {
        let wait = rng.gen_range(schedule.min_interval_ms..=schedule.max_interval_ms);
        if !cancel.sleep(Duration::from_millis(wait)).await {
            break;
        }
        if !rng.gen_bool(schedule.chance) {
            trace!(%kind, "activation skipped by chance");
            continue;
        }

        let (reply, accepted) = oneshot::channel();
        if commands.send(Command::Activate { kind, reply }).is_err() {
            break;
        }
        let epoch = match accepted.await {
            Ok(Some(epoch)) => epoch,
            Ok(None) => continue,
            Err(_) => break,
        };

        if !cancel.sleep(Duration::from_millis(schedule.window_ms)).await {
            break;
        }
        if commands.send(Command::Resolve { kind, epoch }).is_err() {
            break;
        }

        if schedule.cooldown_ms > 0
            && !cancel
                .sleep(Duration::from_millis(schedule.cooldown_ms))
                .await
        {
            break;
        }
    }
    trace!(%kind, "spawner stopped");
}

/// One-shot timer for an open boss window.
pub(super) async fn run_boss_timer(
    window: Duration,
    epoch: u64,
    commands: mpsc::UnboundedSender<Command>,
    cancel: CancelToken,
) {
    if cancel.sleep(window).await {
        let _ = commands.send(Command::BossExpired { epoch });
    }
}
