mod config;

pub use config::{
    BonusConfig, BossConfig, ComboConfig, Config, DecayBand, DecayConfig, EnabledModifiers,
    FakeBonusConfig, FatigueConfig, FreezeConfig, GainConfig, InputConfig, ModifierSchedule,
    PoisonConfig, SessionConfig, StageConfig,
};

use std::path::PathBuf;

/// Returns `~/.config/shakeroom[-dev]/` based on SHAKEROOM_ENV.
///
/// Set SHAKEROOM_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("SHAKEROOM_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("shakeroom-dev")
    } else {
        base_dir.join("shakeroom")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
