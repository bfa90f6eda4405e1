//! Emotional state model: pure functions from an agent's psychological
//! vector to derived modifiers, trigger conditions, and decayed states.
//! No hidden state; the registry owns all mutation.

use std::fmt;
use std::str::FromStr;

use contracts::{DecayConfig, EmotionalState, StimulusKind};

use crate::error::EngineError;

/// Floor and ceiling of the effectiveness modifier: an agent is never fully
/// incapacitated and never immune to their own state.
pub const MODIFIER_FLOOR: f64 = 0.2;
pub const MODIFIER_CEILING: f64 = 1.0;

/// Elapsed in-game time as whole hours. Duration arguments enter the engine
/// only through this type; a partially specified duration cannot exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElapsedHours(pub u64);

impl ElapsedHours {
    pub fn hours(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ElapsedHours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h", self.0)
    }
}

impl FromStr for ElapsedHours {
    type Err = EngineError;

    /// Accepts `"36"` or `"36h"`. Fractions, negatives, other units, and
    /// empty input are rejected so a malformed elapsed time can only skip a
    /// decay tick, never corrupt one.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let digits = trimmed.strip_suffix('h').unwrap_or(trimmed);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(EngineError::DurationFormat(raw.to_string()));
        }
        digits
            .parse::<u64>()
            .map(ElapsedHours)
            .map_err(|_| EngineError::DurationFormat(raw.to_string()))
    }
}

/// An involuntary flashback/panic event. The resolver consumes this to
/// reduce the agent's contribution for the phase.
#[derive(Debug, Clone, PartialEq)]
pub struct TraumaEvent {
    pub stimulus: StimulusKind,
    pub trauma_level: f64,
}

/// Combat/operational effectiveness in `[0.2, 1.0]`, monotonically
/// decreasing in fear, trauma, and stress, and increasing in trust (trust
/// cushions the burden rather than adding capability of its own).
pub fn effectiveness_modifier(state: &EmotionalState) -> f64 {
    let state = state.clamped();
    let burden = 0.4 * state.fear + 0.3 * state.trauma + 0.3 * state.stress;
    let cushion = 1.0 - 0.35 * state.trust;
    (1.0 - burden * cushion).clamp(MODIFIER_FLOOR, MODIFIER_CEILING)
}

/// Fires when trauma is at or above `threshold` AND the stimulus matches a
/// recorded trigger category.
pub fn check_trauma_trigger(
    state: &EmotionalState,
    stimulus: StimulusKind,
    recorded_triggers: &[StimulusKind],
    threshold: f64,
) -> Option<TraumaEvent> {
    if state.trauma >= threshold && recorded_triggers.contains(&stimulus) {
        Some(TraumaEvent {
            stimulus,
            trauma_level: state.trauma,
        })
    } else {
        None
    }
}

/// Exponential decay of fear and stress toward their baselines over elapsed
/// in-game hours. Anger decays toward zero on the stress half-life; trauma
/// decays toward zero far slower (near-persistent); trust is relationship-
/// driven and does not decay here.
pub fn decay(state: &EmotionalState, elapsed: ElapsedHours, config: &DecayConfig) -> EmotionalState {
    fn factor(hours: u64, half_life_hours: u64) -> f64 {
        0.5_f64.powf(hours as f64 / half_life_hours.max(1) as f64)
    }

    let hours = elapsed.hours();
    let fear_f = factor(hours, config.fear_half_life_hours);
    let stress_f = factor(hours, config.stress_half_life_hours);
    let trauma_f = factor(hours, config.trauma_half_life_hours);

    EmotionalState {
        fear: config.fear_baseline + (state.fear - config.fear_baseline) * fear_f,
        anger: state.anger * stress_f,
        trauma: state.trauma * trauma_f,
        trust: state.trust,
        stress: config.stress_baseline + (state.stress - config.stress_baseline) * stress_f,
    }
    .clamped()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(fear: f64, trauma: f64, trust: f64, stress: f64) -> EmotionalState {
        EmotionalState {
            fear,
            anger: 0.0,
            trauma,
            trust,
            stress,
        }
    }

    #[test]
    fn modifier_stays_within_bounds() {
        let broken = state(1.0, 1.0, 0.0, 1.0);
        let serene = state(0.0, 0.0, 1.0, 0.0);
        assert_eq!(effectiveness_modifier(&broken), MODIFIER_FLOOR);
        assert_eq!(effectiveness_modifier(&serene), MODIFIER_CEILING);
    }

    #[test]
    fn modifier_decreases_with_fear() {
        let calm = effectiveness_modifier(&state(0.1, 0.2, 0.5, 0.2));
        let scared = effectiveness_modifier(&state(0.9, 0.2, 0.5, 0.2));
        assert!(scared < calm);
    }

    #[test]
    fn modifier_increases_with_trust() {
        let wary = effectiveness_modifier(&state(0.5, 0.3, 0.1, 0.4));
        let bonded = effectiveness_modifier(&state(0.5, 0.3, 0.9, 0.4));
        assert!(bonded > wary);
    }

    #[test]
    fn trigger_requires_threshold_and_matching_stimulus() {
        let shaken = state(0.3, 0.8, 0.4, 0.3);
        let triggers = vec![StimulusKind::Explosion];

        let fired =
            check_trauma_trigger(&shaken, StimulusKind::Explosion, &triggers, 0.7).expect("fires");
        assert_eq!(fired.stimulus, StimulusKind::Explosion);
        assert_eq!(fired.trauma_level, 0.8);

        // Wrong stimulus: no trigger.
        assert!(check_trauma_trigger(&shaken, StimulusKind::Violence, &triggers, 0.7).is_none());

        // Below threshold: no trigger.
        let steadier = state(0.3, 0.5, 0.4, 0.3);
        assert!(check_trauma_trigger(&steadier, StimulusKind::Explosion, &triggers, 0.7).is_none());
    }

    #[test]
    fn decay_pulls_fear_toward_baseline_and_spares_trauma() {
        let config = DecayConfig::default();
        let after_op = state(0.9, 0.6, 0.5, 0.8);
        let rested = decay(&after_op, ElapsedHours(config.fear_half_life_hours), &config);

        // One fear half-life: halfway back to baseline.
        let expected_fear = config.fear_baseline + (0.9 - config.fear_baseline) * 0.5;
        assert!((rested.fear - expected_fear).abs() < 1e-12);
        assert!(rested.stress < after_op.stress);

        // Trauma barely moves on that timescale.
        assert!(rested.trauma > 0.59);
        assert_eq!(rested.trust, after_op.trust);
    }

    #[test]
    fn decay_result_stays_in_bounds_over_long_spans() {
        let config = DecayConfig::default();
        let decayed = decay(&state(1.0, 1.0, 1.0, 1.0), ElapsedHours(1_000_000), &config);
        assert!(decayed.in_bounds());
    }

    #[test]
    fn elapsed_hours_parses_whole_hours_only() {
        assert_eq!("36".parse::<ElapsedHours>().unwrap(), ElapsedHours(36));
        assert_eq!("36h".parse::<ElapsedHours>().unwrap(), ElapsedHours(36));

        for bad in ["", "h", "-4", "3.5", "2d", "1h30m", "soon"] {
            let parsed = bad.parse::<ElapsedHours>();
            assert!(
                matches!(parsed, Err(EngineError::DurationFormat(_))),
                "{bad:?} should be rejected"
            );
        }
    }
}
