use std::error::Error;
use std::time::Duration;

use clap::Args;
use rand::{Rng, SeedableRng};
use rand_pcg::Mcg128Xsl64;
use shakeroom_core::{Config, Engine, Event, SessionConfig, SessionReport, Snapshot};
use tracing::debug;

/// Keeps impulse jitter independent of the modifier spawners.
const JITTER_SALT: u64 = 0x5348_414B_4552_4F4F;

const BAR_WIDTH: usize = 20;

#[derive(Args)]
pub struct PlayArgs {
    /// Seed for modifiers and impulse jitter
    #[arg(long)]
    seed: Option<u64>,
    /// Synthetic impulses per second
    #[arg(long, default_value_t = 4.0)]
    rate: f64,
    /// Session length in seconds (overrides config)
    #[arg(long)]
    duration: Option<u32>,
    /// Print events as JSON lines
    #[arg(long)]
    json: bool,
}

/// Runs one session; exits with code 2 when it is lost.
pub fn run(args: PlayArgs) -> Result<(), Box<dyn Error>> {
    if !(args.rate.is_finite() && args.rate > 0.0) {
        return Err(format!("--rate must be a positive number, got {}", args.rate).into());
    }

    let mut session = Config::load_or_default().session;
    let seed = args.seed.or(session.seed).unwrap_or_else(rand::random);
    session.seed = Some(seed);
    if let Some(duration) = args.duration {
        session.duration_secs = duration;
    }

    if !args.json {
        println!("seed {seed}, {}s, {} impulses/s", session.duration_secs, args.rate);
    }

    let runtime = tokio::runtime::Runtime::new()?;
    let report = runtime.block_on(play(session, seed, &args))?;

    if !args.json {
        print_summary(&report);
    }
    if !report.won {
        std::process::exit(2);
    }
    Ok(())
}

async fn play(
    session: SessionConfig,
    seed: u64,
    args: &PlayArgs,
) -> Result<SessionReport, Box<dyn Error>> {
    let (handle, mut events) = Engine::new(session).start()?;
    let mut jitter = Mcg128Xsl64::seed_from_u64(seed ^ JITTER_SALT);
    let period = 1.0 / args.rate;
    let mut last_line = String::new();

    let next_gap = |rng: &mut Mcg128Xsl64| Duration::from_secs_f64(period * rng.gen_range(0.5..1.5));
    let impulse = tokio::time::sleep(next_gap(&mut jitter));
    tokio::pin!(impulse);

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                if args.json {
                    println!("{}", serde_json::to_string(&event)?);
                } else if let Event::StateChanged { snapshot, .. } = &event {
                    let line = render(snapshot);
                    if line != last_line {
                        println!("{line}");
                        last_line = line;
                    }
                }
                if event.is_end() {
                    break;
                }
            }
            _ = &mut impulse => {
                handle.on_impulse();
                impulse.as_mut().reset(tokio::time::Instant::now() + next_gap(&mut jitter));
            }
        }
    }

    debug!("event stream finished");
    Ok(handle.finished().await?)
}

fn render(s: &Snapshot) -> String {
    let filled = (s.progress * BAR_WIDTH as f32).round() as usize;
    let bar = format!(
        "{}{}",
        "#".repeat(filled.min(BAR_WIDTH)),
        "-".repeat(BAR_WIDTH - filled.min(BAR_WIDTH))
    );

    let mut flags = Vec::new();
    if s.fever {
        flags.push("FEVER");
    }
    if s.bonus_active {
        flags.push("totem");
    }
    if s.freeze_active {
        flags.push("ice");
    }
    if s.fatigue_active {
        flags.push("fatigue");
    }
    if s.poison_active {
        flags.push("poison");
    }
    if s.fake_bonus_active {
        flags.push("totem?");
    }
    if s.boss_active {
        flags.push("BOSS");
    }

    let mut line = format!(
        "[{:>2}s] {bar} {:>3}% stage {} x{}",
        s.time_left,
        (s.progress * 100.0).round() as u32,
        s.stage,
        s.combo_multiplier,
    );
    if !flags.is_empty() {
        line.push_str(&format!(" [{}]", flags.join(" ")));
    }
    if !s.message.is_empty() {
        line.push_str(&format!("  {}", s.message));
    }
    line
}

fn print_summary(report: &SessionReport) {
    let s = &report.snapshot;
    println!();
    if report.won {
        println!("Won{}!", if s.boss_success { ", boss defeated" } else { "" });
    } else {
        println!("Lost at {}%.", (s.progress * 100.0).round() as u32);
    }
    println!(
        "shakes {}, best combo {}, totems {}, ice broken {}",
        s.shakes, s.best_combo, s.bonus_caught, s.freeze_breaks
    );
}
