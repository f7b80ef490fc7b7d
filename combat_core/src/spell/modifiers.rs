//! SpellModifiers - the mutable accumulator every spell mod writes into
//!
//! Damage multipliers follow an additive-then-multiplicative model:
//! `(1 + sum of additive) * product of multiplicative`. Additive parts are
//! plain sums and multiplicative parts plain products, so every change can
//! be undone exactly by its inverse.

use crate::timer::TimeOffset;
use serde::{Deserialize, Serialize};

/// One additive percentage plus one multiplicative factor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MultiplierPair {
    /// Sum of additive bonuses (0.10 = +10%)
    pub additive: f64,
    /// Product of multiplicative factors
    pub multiplicative: f64,
}

impl Default for MultiplierPair {
    fn default() -> Self {
        MultiplierPair {
            additive: 0.0,
            multiplicative: 1.0,
        }
    }
}

impl MultiplierPair {
    /// Final multiplier: `(1 + additive) * multiplicative`
    pub fn value(&self) -> f64 {
        (1.0 + self.additive) * self.multiplicative
    }
}

/// Damage multipliers split by what they apply to
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DamageMultipliers {
    /// Applies to everything the spell deals
    pub base: MultiplierPair,
    /// Applies only to direct (non-periodic) damage
    pub impact: MultiplierPair,
    /// Applies only to periodic damage
    pub periodic: MultiplierPair,
}

impl DamageMultipliers {
    pub fn direct(&self) -> f64 {
        self.base.value() * self.impact.value()
    }

    pub fn periodic(&self) -> f64 {
        self.base.value() * self.periodic.value()
    }

    pub fn for_periodic(&self, periodic: bool) -> f64 {
        if periodic {
            self.periodic()
        } else {
            self.direct()
        }
    }
}

/// Everything spell mods are allowed to change on a spell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpellModifiers {
    pub damage: DamageMultipliers,

    // === Cost ===
    pub cost_flat: f64,
    /// Additive percent change of the cost (-0.1 = 10% cheaper)
    pub cost_pct: f64,

    // === Timing ===
    pub cooldown_offset: TimeOffset,
    pub cast_time_offset: TimeOffset,
    /// Additive percent change of the cast time
    pub cast_time_pct: f64,
    pub gcd_offset: TimeOffset,

    // === Outcome ===
    /// Crit chance bonus in percent
    pub bonus_crit_percent: f64,
    /// Hit chance bonus in percent
    pub bonus_hit_percent: f64,
    /// Power scaling coefficient
    pub coefficient: f64,
    pub crit_damage_bonus: f64,

    // === Periodic ===
    pub dot_ticks: i32,
    pub dot_tick_length_offset: TimeOffset,

    pub threat_multiplier: f64,
}

impl Default for SpellModifiers {
    fn default() -> Self {
        SpellModifiers {
            damage: DamageMultipliers::default(),
            cost_flat: 0.0,
            cost_pct: 0.0,
            cooldown_offset: TimeOffset::ZERO,
            cast_time_offset: TimeOffset::ZERO,
            cast_time_pct: 0.0,
            gcd_offset: TimeOffset::ZERO,
            bonus_crit_percent: 0.0,
            bonus_hit_percent: 0.0,
            coefficient: 0.0,
            crit_damage_bonus: 0.0,
            dot_ticks: 0,
            dot_tick_length_offset: TimeOffset::ZERO,
            threat_multiplier: 1.0,
        }
    }
}

impl SpellModifiers {
    /// Cost after flat and percent modifiers, never negative
    pub fn apply_cost(&self, base: f64) -> f64 {
        ((base + self.cost_flat) * (1.0 + self.cost_pct)).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifiers_serialize_with_offsets() {
        let modifiers = SpellModifiers {
            cast_time_offset: TimeOffset::from_millis(-500),
            gcd_offset: TimeOffset::from_millis(-1500),
            ..SpellModifiers::default()
        };
        let json = serde_json::to_string(&modifiers).unwrap();
        let back: SpellModifiers = serde_json::from_str(&json).unwrap();
        assert_eq!(back.cast_time_offset, TimeOffset::from_millis(-500));
        assert_eq!(back, modifiers);
    }

    #[test]
    fn test_pair_value() {
        let pair = MultiplierPair {
            additive: 0.40,
            multiplicative: 1.2,
        };
        assert!((pair.value() - 1.68).abs() < 1e-12);
    }

    #[test]
    fn test_direct_and_periodic_split() {
        let mut damage = DamageMultipliers::default();
        damage.base.additive += 0.10;
        damage.impact.additive += 0.20;
        damage.periodic.multiplicative *= 1.5;

        assert!((damage.direct() - 1.1 * 1.2).abs() < 1e-12);
        assert!((damage.periodic() - 1.1 * 1.5).abs() < 1e-12);
        assert!((damage.for_periodic(true) - damage.periodic()).abs() < f64::EPSILON);
    }

    #[test]
    fn test_cost_modifiers() {
        let mut mods = SpellModifiers::default();
        mods.cost_flat = -50.0;
        mods.cost_pct = -0.10;
        // (400 - 50) * 0.9
        assert!((mods.apply_cost(400.0) - 315.0).abs() < 1e-9);

        mods.cost_pct = -2.0;
        assert!(mods.apply_cost(400.0).abs() < f64::EPSILON);
    }
}
