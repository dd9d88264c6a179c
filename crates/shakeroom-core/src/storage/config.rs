//! TOML-based session configuration.
//!
//! Every gameplay constant of the shake challenge lives here:
//! - Session length and RNG seed
//! - Combo chain timing and multiplier caps
//! - Progress gain bands and decay bands
//! - Per-modifier spawn schedules, rewards and penalties
//! - Boss stage window and fallback
//! - Input calibration for the shake detector
//!
//! Configuration is stored at `~/.config/shakeroom/config.toml`.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::challenge::ModifierKind;
use crate::error::{ConfigError, Result};

/// Spawn policy shared by every modifier.
///
/// A spawner sleeps a random interval in `[min_interval_ms, max_interval_ms]`,
/// rolls `chance`, holds the modifier for `window_ms`, then rests `cooldown_ms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifierSchedule {
    pub min_interval_ms: u64,
    pub max_interval_ms: u64,
    pub window_ms: u64,
    pub cooldown_ms: u64,
    /// Probability that a due activation actually happens (0.0-1.0)
    pub chance: f64,
}

impl ModifierSchedule {
    pub const fn new(min_interval_ms: u64, max_interval_ms: u64, window_ms: u64) -> Self {
        Self {
            min_interval_ms,
            max_interval_ms,
            window_ms,
            cooldown_ms: 0,
            chance: 1.0,
        }
    }

    pub const fn with_cooldown(mut self, cooldown_ms: u64) -> Self {
        self.cooldown_ms = cooldown_ms;
        self
    }

    pub const fn with_chance(mut self, chance: f64) -> Self {
        self.chance = chance;
        self
    }

    fn validate(&self, key: &str) -> Result<(), ConfigError> {
        if self.min_interval_ms > self.max_interval_ms {
            return Err(ConfigError::invalid(
                key,
                format!(
                    "min_interval_ms ({}) exceeds max_interval_ms ({})",
                    self.min_interval_ms, self.max_interval_ms
                ),
            ));
        }
        if self.window_ms == 0 {
            return Err(ConfigError::invalid(key, "window_ms must be positive"));
        }
        if !(0.0..=1.0).contains(&self.chance) {
            return Err(ConfigError::invalid(key, "chance must be within 0.0..=1.0"));
        }
        Ok(())
    }
}

/// A partial `[*.schedule]` table laid over one modifier's defaults.
#[derive(Debug, Deserialize)]
struct ScheduleOverrides {
    min_interval_ms: Option<u64>,
    max_interval_ms: Option<u64>,
    window_ms: Option<u64>,
    cooldown_ms: Option<u64>,
    chance: Option<f64>,
}

impl ScheduleOverrides {
    fn apply(self, base: ModifierSchedule) -> ModifierSchedule {
        ModifierSchedule {
            min_interval_ms: self.min_interval_ms.unwrap_or(base.min_interval_ms),
            max_interval_ms: self.max_interval_ms.unwrap_or(base.max_interval_ms),
            window_ms: self.window_ms.unwrap_or(base.window_ms),
            cooldown_ms: self.cooldown_ms.unwrap_or(base.cooldown_ms),
            chance: self.chance.unwrap_or(base.chance),
        }
    }
}

const BONUS_SCHEDULE: ModifierSchedule =
    ModifierSchedule::new(7_000, 16_000, 3_000).with_cooldown(4_000);
const FREEZE_SCHEDULE: ModifierSchedule =
    ModifierSchedule::new(10_000, 19_000, 2_500).with_cooldown(4_000);
const FATIGUE_SCHEDULE: ModifierSchedule =
    ModifierSchedule::new(15_000, 25_000, 5_000).with_chance(0.5);
const POISON_SCHEDULE: ModifierSchedule =
    ModifierSchedule::new(18_000, 30_000, 3_000).with_chance(0.5);
const FAKE_BONUS_SCHEDULE: ModifierSchedule =
    ModifierSchedule::new(20_000, 35_000, 2_200).with_chance(0.5);

fn schedule_over<'de, D: Deserializer<'de>>(
    deserializer: D,
    base: ModifierSchedule,
) -> Result<ModifierSchedule, D::Error> {
    Ok(ScheduleOverrides::deserialize(deserializer)?.apply(base))
}

fn bonus_schedule<'de, D: Deserializer<'de>>(d: D) -> Result<ModifierSchedule, D::Error> {
    schedule_over(d, BONUS_SCHEDULE)
}

fn freeze_schedule<'de, D: Deserializer<'de>>(d: D) -> Result<ModifierSchedule, D::Error> {
    schedule_over(d, FREEZE_SCHEDULE)
}

fn fatigue_schedule<'de, D: Deserializer<'de>>(d: D) -> Result<ModifierSchedule, D::Error> {
    schedule_over(d, FATIGUE_SCHEDULE)
}

fn poison_schedule<'de, D: Deserializer<'de>>(d: D) -> Result<ModifierSchedule, D::Error> {
    schedule_over(d, POISON_SCHEDULE)
}

fn fake_bonus_schedule<'de, D: Deserializer<'de>>(d: D) -> Result<ModifierSchedule, D::Error> {
    schedule_over(d, FAKE_BONUS_SCHEDULE)
}

/// Combo chain timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComboConfig {
    /// Impulses older than this are pruned from the history
    pub history_window_ms: u64,
    /// Number of impulses that form a chain
    pub chain_len: usize,
    /// A chain must span strictly less than this
    pub chain_span_ms: u64,
    /// A gap longer than this breaks the combo
    pub reset_gap_ms: u64,
    pub max_multiplier: u32,
    /// Fever starts at this multiplier
    pub fever_multiplier: u32,
}

impl Default for ComboConfig {
    fn default() -> Self {
        Self {
            history_window_ms: 1500,
            chain_len: 4,
            chain_span_ms: 1100,
            reset_gap_ms: 1300,
            max_multiplier: 5,
            fever_multiplier: 3,
        }
    }
}

/// Per-impulse progress gain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GainConfig {
    pub fatigue: f32,
    pub endgame_threshold: f32,
    pub endgame: f32,
    pub late_threshold: f32,
    pub late: f32,
    /// Flat gain while in fever, not multiplied
    pub fever: f32,
    pub base: f32,
}

impl Default for GainConfig {
    fn default() -> Self {
        Self {
            fatigue: 0.017,
            endgame_threshold: 0.88,
            endgame: 0.019,
            late_threshold: 0.66,
            late: 0.027,
            fever: 0.08,
            base: 0.037,
        }
    }
}

/// One decay band: applies when progress is strictly above `above`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecayBand {
    pub above: f32,
    pub rate: f32,
}

/// Idle decay of progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayConfig {
    pub tick_ms: u64,
    /// Decay only applies once no impulse was seen for this long
    pub idle_window_ms: u64,
    /// Bands ordered from the highest threshold down
    pub bands: Vec<DecayBand>,
    /// Rate applied below every band
    pub floor_rate: f32,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            tick_ms: 350,
            idle_window_ms: 1600,
            bands: vec![
                DecayBand { above: 0.80, rate: 0.04 },
                DecayBand { above: 0.66, rate: 0.03 },
                DecayBand { above: 0.33, rate: 0.02 },
            ],
            floor_rate: 0.012,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BonusConfig {
    #[serde(deserialize_with = "bonus_schedule")]
    pub schedule: ModifierSchedule,
    /// Two impulses closer than this catch the bonus
    pub pair_gap_ms: u64,
    pub reward: f32,
}

impl Default for BonusConfig {
    fn default() -> Self {
        Self {
            schedule: BONUS_SCHEDULE,
            pair_gap_ms: 400,
            reward: 0.14,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FreezeConfig {
    #[serde(deserialize_with = "freeze_schedule")]
    pub schedule: ModifierSchedule,
    pub break_count: usize,
    pub break_span_ms: u64,
}

impl Default for FreezeConfig {
    fn default() -> Self {
        Self {
            schedule: FREEZE_SCHEDULE,
            break_count: 3,
            break_span_ms: 900,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FatigueConfig {
    #[serde(deserialize_with = "fatigue_schedule")]
    pub schedule: ModifierSchedule,
}

impl Default for FatigueConfig {
    fn default() -> Self {
        Self {
            schedule: FATIGUE_SCHEDULE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoisonConfig {
    #[serde(deserialize_with = "poison_schedule")]
    pub schedule: ModifierSchedule,
    pub penalty: f32,
}

impl Default for PoisonConfig {
    fn default() -> Self {
        Self {
            schedule: POISON_SCHEDULE,
            penalty: 0.11,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FakeBonusConfig {
    #[serde(deserialize_with = "fake_bonus_schedule")]
    pub schedule: ModifierSchedule,
    pub penalty: f32,
}

impl Default for FakeBonusConfig {
    fn default() -> Self {
        Self {
            schedule: FAKE_BONUS_SCHEDULE,
            penalty: 0.15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BossConfig {
    /// Progress at which the boss stage opens
    pub trigger_at: f32,
    pub window_ms: u64,
    pub required: u32,
    /// Progress after a failed boss stage
    pub fallback: f32,
}

impl Default for BossConfig {
    fn default() -> Self {
        Self {
            trigger_at: 0.95,
            window_ms: 3_000,
            required: 10,
            fallback: 0.80,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    /// Progress thresholds for stage 2, 3, ...
    pub thresholds: Vec<f32>,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            thresholds: vec![0.33, 0.66],
        }
    }
}

/// Which modifier spawners run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnabledModifiers {
    #[serde(default = "default_true")]
    pub bonus: bool,
    #[serde(default = "default_true")]
    pub freeze: bool,
    #[serde(default = "default_true")]
    pub fatigue: bool,
    #[serde(default = "default_true")]
    pub poison: bool,
    #[serde(default = "default_true")]
    pub fake_bonus: bool,
}

impl Default for EnabledModifiers {
    fn default() -> Self {
        Self::all()
    }
}

impl EnabledModifiers {
    pub fn all() -> Self {
        Self {
            bonus: true,
            freeze: true,
            fatigue: true,
            poison: true,
            fake_bonus: true,
        }
    }

    pub fn none() -> Self {
        Self {
            bonus: false,
            freeze: false,
            fatigue: false,
            poison: false,
            fake_bonus: false,
        }
    }

    pub fn is_enabled(&self, kind: ModifierKind) -> bool {
        match kind {
            ModifierKind::Bonus => self.bonus,
            ModifierKind::Freeze => self.freeze,
            ModifierKind::Fatigue => self.fatigue,
            ModifierKind::Poison => self.poison,
            ModifierKind::FakeBonus => self.fake_bonus,
        }
    }

    pub fn set(&mut self, kind: ModifierKind, enabled: bool) {
        match kind {
            ModifierKind::Bonus => self.bonus = enabled,
            ModifierKind::Freeze => self.freeze = enabled,
            ModifierKind::Fatigue => self.fatigue = enabled,
            ModifierKind::Poison => self.poison = enabled,
            ModifierKind::FakeBonus => self.fake_bonus = enabled,
        }
    }
}

/// Everything one shake session needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_duration_secs")]
    pub duration_secs: u32,
    /// Seed for spawner randomness; entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_clock_tick_ms")]
    pub clock_tick_ms: u64,
    #[serde(default = "default_message_ttl_ms")]
    pub message_ttl_ms: u64,
    #[serde(default)]
    pub enabled: EnabledModifiers,
    #[serde(default)]
    pub combo: ComboConfig,
    #[serde(default)]
    pub gains: GainConfig,
    #[serde(default)]
    pub decay: DecayConfig,
    #[serde(default)]
    pub stages: StageConfig,
    #[serde(default)]
    pub bonus: BonusConfig,
    #[serde(default)]
    pub freeze: FreezeConfig,
    #[serde(default)]
    pub fatigue: FatigueConfig,
    #[serde(default)]
    pub poison: PoisonConfig,
    #[serde(default)]
    pub fake_bonus: FakeBonusConfig,
    #[serde(default)]
    pub boss: BossConfig,
}

/// Shake detector calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    /// Deviation from gravity (m/s²) that counts as one impulse
    #[serde(default = "default_shake_threshold")]
    pub threshold: f32,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/shakeroom/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub input: InputConfig,
}

// Default functions
fn default_duration_secs() -> u32 {
    70
}
fn default_clock_tick_ms() -> u64 {
    1_000
}
fn default_message_ttl_ms() -> u64 {
    1_200
}
fn default_shake_threshold() -> f32 {
    2.6
}
fn default_true() -> bool {
    true
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            threshold: default_shake_threshold(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration_secs: default_duration_secs(),
            seed: None,
            clock_tick_ms: default_clock_tick_ms(),
            message_ttl_ms: default_message_ttl_ms(),
            enabled: EnabledModifiers::default(),
            combo: ComboConfig::default(),
            gains: GainConfig::default(),
            decay: DecayConfig::default(),
            stages: StageConfig::default(),
            bonus: BonusConfig::default(),
            freeze: FreezeConfig::default(),
            fatigue: FatigueConfig::default(),
            poison: PoisonConfig::default(),
            fake_bonus: FakeBonusConfig::default(),
            boss: BossConfig::default(),
        }
    }
}

impl SessionConfig {
    pub fn with_duration(mut self, duration_secs: u32) -> Self {
        self.duration_secs = duration_secs;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_enabled(mut self, enabled: EnabledModifiers) -> Self {
        self.enabled = enabled;
        self
    }

    /// Spawn schedule for the given modifier.
    pub fn schedule(&self, kind: ModifierKind) -> &ModifierSchedule {
        match kind {
            ModifierKind::Bonus => &self.bonus.schedule,
            ModifierKind::Freeze => &self.freeze.schedule,
            ModifierKind::Fatigue => &self.fatigue.schedule,
            ModifierKind::Poison => &self.poison.schedule,
            ModifierKind::FakeBonus => &self.fake_bonus.schedule,
        }
    }

    pub fn schedule_mut(&mut self, kind: ModifierKind) -> &mut ModifierSchedule {
        match kind {
            ModifierKind::Bonus => &mut self.bonus.schedule,
            ModifierKind::Freeze => &mut self.freeze.schedule,
            ModifierKind::Fatigue => &mut self.fatigue.schedule,
            ModifierKind::Poison => &mut self.poison.schedule,
            ModifierKind::FakeBonus => &mut self.fake_bonus.schedule,
        }
    }

    /// Check ranges and orderings the engine relies on.
    ///
    /// # Errors
    ///
    /// Returns the first offending key as [`ConfigError::InvalidValue`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.duration_secs == 0 {
            return Err(ConfigError::invalid("duration_secs", "must be positive"));
        }
        if self.clock_tick_ms == 0 {
            return Err(ConfigError::invalid("clock_tick_ms", "must be positive"));
        }
        if self.decay.tick_ms == 0 {
            return Err(ConfigError::invalid("decay.tick_ms", "must be positive"));
        }
        if self.combo.chain_len < 2 {
            return Err(ConfigError::invalid("combo.chain_len", "must be at least 2"));
        }
        if self.combo.max_multiplier == 0 {
            return Err(ConfigError::invalid("combo.max_multiplier", "must be at least 1"));
        }
        if self.freeze.break_count == 0 {
            return Err(ConfigError::invalid("freeze.break_count", "must be positive"));
        }
        if self.boss.required == 0 {
            return Err(ConfigError::invalid("boss.required", "must be positive"));
        }
        check_unit("boss.trigger_at", self.boss.trigger_at)?;
        check_unit("boss.fallback", self.boss.fallback)?;
        if self.boss.fallback >= self.boss.trigger_at {
            return Err(ConfigError::invalid(
                "boss.fallback",
                "must be below boss.trigger_at",
            ));
        }
        check_unit("bonus.reward", self.bonus.reward)?;
        check_unit("poison.penalty", self.poison.penalty)?;
        check_unit("fake_bonus.penalty", self.fake_bonus.penalty)?;

        let gains = &self.gains;
        check_unit("gains.fatigue", gains.fatigue)?;
        check_unit("gains.endgame_threshold", gains.endgame_threshold)?;
        check_unit("gains.endgame", gains.endgame)?;
        check_unit("gains.late_threshold", gains.late_threshold)?;
        check_unit("gains.late", gains.late)?;
        check_unit("gains.fever", gains.fever)?;
        check_unit("gains.base", gains.base)?;
        check_unit("decay.floor_rate", self.decay.floor_rate)?;

        let mut previous = 0.0_f32;
        for &threshold in &self.stages.thresholds {
            if !threshold.is_finite() || threshold <= previous || threshold >= 1.0 {
                return Err(ConfigError::invalid(
                    "stages.thresholds",
                    "must be strictly ascending within (0, 1)",
                ));
            }
            previous = threshold;
        }

        let mut previous = f32::INFINITY;
        for band in &self.decay.bands {
            check_unit("decay.bands", band.above)?;
            check_unit("decay.bands", band.rate)?;
            if band.above >= previous {
                return Err(ConfigError::invalid(
                    "decay.bands",
                    "must be ordered from the highest threshold down",
                ));
            }
            previous = band.above;
        }

        for kind in ModifierKind::ALL {
            self.schedule(kind)
                .validate(&format!("{}.schedule", kind.key()))?;
        }
        Ok(())
    }
}

fn check_unit(key: &str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::invalid(key, format!("{value} is outside 0.0..=1.0")))
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |part| part.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;
            let new_value = match existing {
                serde_json::Value::Bool(_) => value
                    .parse::<bool>()
                    .map(serde_json::Value::Bool)
                    .map_err(|e| ConfigError::invalid(key, e.to_string()))?,
                serde_json::Value::Number(_) => parse_number(key, value)?,
                // Unset optionals (e.g. `session.seed`) accept a number.
                serde_json::Value::Null => parse_number(key, value)?,
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    serde_json::from_str(value)
                        .map_err(|e| ConfigError::invalid(key, e.to_string()))?
                }
                serde_json::Value::String(_) => serde_json::Value::String(value.into()),
            };
            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    /// Default location of the config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be created.
    pub fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            let cfg = Self::default();
            cfg.save_to(&path)?;
            Ok(cfg)
        }
    }

    /// Load from an explicit path and validate the session section.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let cfg: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseFailed(format!("{}: {e}", path.display())))?;
        cfg.session.validate()?;
        Ok(cfg)
    }

    /// Persist to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    /// Persist to an explicit path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without touching disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the resulting session config does not validate.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json)?;
        updated.session.validate()?;
        *self = updated;
        Ok(())
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}

fn parse_number(key: &str, value: &str) -> Result<serde_json::Value, ConfigError> {
    if let Ok(n) = value.parse::<u64>() {
        Ok(serde_json::Value::Number(n.into()))
    } else if let Ok(n) = value.parse::<f64>() {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .ok_or_else(|| ConfigError::invalid(key, format!("cannot parse '{value}' as number")))
    } else {
        Err(ConfigError::invalid(
            key,
            format!("cannot parse '{value}' as number"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn default_session_config_is_valid() {
        assert!(SessionConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let parsed: Config = toml::from_str(
            r#"
            [session]
            duration_secs = 30

            [session.poison]
            penalty = 0.2
            "#,
        )
        .unwrap();
        assert_eq!(parsed.session.duration_secs, 30);
        assert_eq!(parsed.session.poison.penalty, 0.2);
        assert_eq!(parsed.session.poison.schedule.window_ms, 3_000);
        assert_eq!(parsed.session.fake_bonus.penalty, 0.15);
        assert_eq!(parsed.session.boss.required, 10);
        assert_eq!(parsed.input.threshold, 2.6);
    }

    #[test]
    fn partial_schedule_table_keeps_modifier_defaults() {
        let parsed: Config = toml::from_str(
            r#"
            [session.poison.schedule]
            chance = 0.3

            [session.bonus.schedule]
            window_ms = 2000
            "#,
        )
        .unwrap();
        let session = &parsed.session;
        assert_eq!(session.poison.schedule, POISON_SCHEDULE.with_chance(0.3));
        assert_eq!(session.poison.penalty, 0.11);
        assert_eq!(
            session.bonus.schedule,
            ModifierSchedule::new(7_000, 16_000, 2_000).with_cooldown(4_000)
        );
        assert_eq!(session.fake_bonus.schedule, FAKE_BONUS_SCHEDULE);
        assert!(session.validate().is_ok());
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("session.duration_secs").as_deref(), Some("70"));
        assert_eq!(cfg.get("session.boss.required").as_deref(), Some("10"));
        assert_eq!(cfg.get("session.enabled.poison").as_deref(), Some("true"));
        assert!(cfg.get("session.missing_key").is_none());
    }

    #[test]
    fn set_updates_nested_values() {
        let mut cfg = Config::default();
        cfg.set("session.enabled.poison", "false").unwrap();
        cfg.set("session.boss.required", "12").unwrap();
        cfg.set("session.bonus.reward", "0.2").unwrap();
        assert!(!cfg.session.enabled.poison);
        assert_eq!(cfg.session.boss.required, 12);
        assert!((cfg.session.bonus.reward - 0.2).abs() < 1e-6);
    }

    #[test]
    fn set_accepts_seed_on_unset_optional() {
        let mut cfg = Config::default();
        cfg.set("session.seed", "42").unwrap();
        assert_eq!(cfg.session.seed, Some(42));
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut cfg = Config::default();
        let result = cfg.set("session.nonexistent_key", "1");
        assert!(matches!(
            result,
            Err(CoreError::Config(ConfigError::UnknownKey(_)))
        ));
    }

    #[test]
    fn set_rejects_invalid_type() {
        let mut cfg = Config::default();
        assert!(cfg.set("session.enabled.bonus", "not_a_bool").is_err());
        assert!(cfg.session.enabled.bonus);
    }

    #[test]
    fn set_rejects_values_that_fail_validation() {
        let mut cfg = Config::default();
        assert!(cfg.set("session.boss.fallback", "0.99").is_err());
        assert_eq!(cfg.session.boss.fallback, 0.80);
    }

    #[test]
    fn validate_rejects_inverted_interval() {
        let mut cfg = SessionConfig::default();
        cfg.freeze.schedule.min_interval_ms = 20_000;
        cfg.freeze.schedule.max_interval_ms = 10_000;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("freeze.schedule"));
    }

    #[test]
    fn validate_rejects_bad_chance_and_thresholds() {
        let mut cfg = SessionConfig::default();
        cfg.poison.schedule.chance = 1.5;
        assert!(cfg.validate().is_err());

        let mut cfg = SessionConfig::default();
        cfg.stages.thresholds = vec![0.66, 0.33];
        assert!(cfg.validate().is_err());

        let mut cfg = SessionConfig::default();
        cfg.decay.bands.reverse();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_nan_gain() {
        let mut cfg = SessionConfig::default();
        cfg.gains.base = f32::NAN;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("gains.base"));

        let mut cfg = SessionConfig::default();
        cfg.gains.fever = 1.5;
        assert!(cfg.validate().is_err());

        let mut cfg = SessionConfig::default();
        cfg.stages.thresholds = vec![0.33, f32::NAN];
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("stages.thresholds"));
    }

    #[test]
    fn validate_rejects_negative_decay_rate() {
        let mut cfg = SessionConfig::default();
        cfg.decay.floor_rate = -0.5;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("decay.floor_rate"));

        let mut cfg = SessionConfig::default();
        cfg.decay.bands[1].rate = -0.03;
        assert!(cfg.validate().is_err());

        let mut cfg = SessionConfig::default();
        cfg.decay.bands[0].above = f32::NAN;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn set_rejects_negative_decay_rate() {
        let mut cfg = Config::default();
        assert!(cfg.set("session.decay.floor_rate", "-0.5").is_err());
        assert_eq!(cfg.session.decay.floor_rate, 0.012);
    }

    #[test]
    fn schedule_mut_edits_the_matching_modifier() {
        let mut cfg = SessionConfig::default();
        cfg.schedule_mut(ModifierKind::Freeze).window_ms = 1_000;
        assert_eq!(cfg.freeze.schedule.window_ms, 1_000);
        assert_eq!(cfg.schedule(ModifierKind::Freeze).window_ms, 1_000);
        assert_eq!(cfg.bonus.schedule, BONUS_SCHEDULE);
    }

    #[test]
    fn save_and_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = Config::default();
        cfg.session.duration_secs = 45;
        cfg.session.seed = Some(7);
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn load_from_missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load_from(&dir.path().join("absent.toml"));
        assert!(matches!(
            result,
            Err(CoreError::Config(ConfigError::LoadFailed { .. }))
        ));
    }

    #[test]
    fn load_from_malformed_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[session\nduration_secs = ").unwrap();

        match Config::load_from(&path) {
            Err(CoreError::Config(ConfigError::ParseFailed(message))) => {
                assert!(message.contains("config.toml"));
            }
            other => panic!("expected a parse failure, got {other:?}"),
        }
    }
}
