//! Progress arithmetic: per-impulse gain, idle decay and stage thresholds.

use crate::storage::{DecayConfig, GainConfig, StageConfig};

/// Progress gained by one scoring impulse.
///
/// Bands are checked in order: fatigue, endgame, late game, fever, base.
/// Every band except fever scales with the combo multiplier.
pub fn impulse_gain(
    gains: &GainConfig,
    progress: f32,
    fatigue: bool,
    fever: bool,
    multiplier: u32,
) -> f32 {
    let m = multiplier.max(1) as f32;
    if fatigue {
        gains.fatigue * m
    } else if progress > gains.endgame_threshold {
        gains.endgame * m
    } else if progress > gains.late_threshold {
        gains.late * m
    } else if fever {
        gains.fever
    } else {
        gains.base * m
    }
}

/// Progress lost on one idle decay tick.
pub fn decay_amount(decay: &DecayConfig, progress: f32, wave: u32) -> f32 {
    let rate = decay
        .bands
        .iter()
        .find(|band| progress > band.above)
        .map(|band| band.rate)
        .unwrap_or(decay.floor_rate);
    rate * wave.max(1) as f32
}

/// Stage implied by `progress`: one plus the number of thresholds passed.
pub fn stage_for(stages: &StageConfig, progress: f32) -> u32 {
    1 + stages
        .thresholds
        .iter()
        .filter(|&&threshold| progress > threshold)
        .count() as u32
}

pub fn clamp_progress(progress: f32) -> f32 {
    progress.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn gain_bands() {
        let g = GainConfig::default();
        assert!(close(impulse_gain(&g, 0.1, false, false, 1), 0.037));
        assert!(close(impulse_gain(&g, 0.1, false, false, 2), 0.074));
        assert!(close(impulse_gain(&g, 0.1, false, true, 4), 0.08));
        assert!(close(impulse_gain(&g, 0.7, false, true, 3), 0.081));
        assert!(close(impulse_gain(&g, 0.9, false, false, 2), 0.038));
        assert!(close(impulse_gain(&g, 0.1, true, true, 3), 0.051));
    }

    #[test]
    fn fatigue_is_the_lowest_gain() {
        let g = GainConfig::default();
        for progress in [0.0, 0.5, 0.7, 0.9] {
            let tired = impulse_gain(&g, progress, true, false, 1);
            let fresh = impulse_gain(&g, progress, false, false, 1);
            assert!(tired <= fresh);
        }
    }

    #[test]
    fn decay_scales_with_band_and_wave() {
        let d = DecayConfig::default();
        assert!(close(decay_amount(&d, 0.1, 1), 0.012));
        assert!(close(decay_amount(&d, 0.4, 2), 0.04));
        assert!(close(decay_amount(&d, 0.7, 3), 0.09));
        assert!(close(decay_amount(&d, 0.85, 3), 0.12));
        assert!(close(decay_amount(&d, 0.33, 1), 0.012));
    }

    #[test]
    fn stage_thresholds_are_exclusive() {
        let s = StageConfig::default();
        assert_eq!(stage_for(&s, 0.0), 1);
        assert_eq!(stage_for(&s, 0.33), 1);
        assert_eq!(stage_for(&s, 0.34), 2);
        assert_eq!(stage_for(&s, 0.67), 3);
        assert_eq!(stage_for(&s, 1.0), 3);
    }
}
