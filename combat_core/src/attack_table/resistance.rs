//! Resistance - magic mitigation by partial resists and binary misses
//!
//! A resistance coefficient in `[0, 1]` maps to the probabilities of
//! resisting 25%, 50% or 75% of a hit. The probabilities are interpolated
//! linearly between four vertices at `coef * 3 = 0, 1, 2, 3`, which gives an
//! average resist of `0.75 * coef - 3/16 * max(0, coef - 2/3)`.
//!
//! Binary spells never partially resist; they miss outright with
//! probability `binary_factor * coef`.

use crate::config::ResistanceConstants;

/// (p25, p50, p75) at `coef * 3 = 0, 1, 2, 3`
const VERTICES: [[f64; 3]; 4] = [
    [0.00, 0.00, 0.00],
    [0.55, 0.15, 0.05],
    [0.20, 0.51, 0.26],
    [0.03, 0.19, 0.78],
];

/// Probability of each partial-resist bucket
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartialResistChances {
    pub resist25: f64,
    pub resist50: f64,
    pub resist75: f64,
}

impl PartialResistChances {
    pub fn for_coefficient(coef: f64) -> Self {
        let x = (coef * 3.0).clamp(0.0, 3.0);
        let i = (x.floor() as usize).min(2);
        let t = x - i as f64;
        let lo = VERTICES[i];
        let hi = VERTICES[i + 1];
        let lerp = |k: usize| lo[k] + (hi[k] - lo[k]) * t;
        PartialResistChances {
            resist25: lerp(0),
            resist50: lerp(1),
            resist75: lerp(2),
        }
    }

    pub fn none(&self) -> f64 {
        (1.0 - self.resist25 - self.resist50 - self.resist75).max(0.0)
    }

    /// Expected fraction of damage resisted
    pub fn expected_resist(&self) -> f64 {
        0.25 * self.resist25 + 0.50 * self.resist50 + 0.75 * self.resist75
    }

    /// Cumulative thresholds `(t00, t25, t50)` for a single roll: a roll at
    /// or above `t00` resists nothing, at or above `t25` resists 25%, at or
    /// above `t50` resists 50%, anything lower resists 75%
    pub fn thresholds(&self) -> (f64, f64, f64) {
        let t50 = self.resist75;
        let t25 = t50 + self.resist50;
        let t00 = t25 + self.resist25;
        (t00, t25, t50)
    }

    /// Fraction resisted for a roll in `[0, 1)`
    pub fn resisted_fraction(&self, roll: f64) -> f64 {
        let (t00, t25, t50) = self.thresholds();
        if roll >= t00 {
            0.0
        } else if roll >= t25 {
            0.25
        } else if roll >= t50 {
            0.50
        } else {
            0.75
        }
    }
}

/// Closed form of the average resist for a coefficient
pub fn expected_resist(coef: f64) -> f64 {
    let c = coef.clamp(0.0, 1.0);
    0.75 * c - 3.0 / 16.0 * (c - 2.0 / 3.0).max(0.0)
}

/// Resistance coefficient for a single school
///
/// `resistance` is the defender's school resistance, `penetration` the
/// attacker's spell penetration, `level_delta` defender minus attacker level.
pub fn resist_coefficient(
    resistance: f64,
    penetration: f64,
    attacker_level: u32,
    level_delta: i32,
    binary: bool,
    pure_dot: bool,
    constants: &ResistanceConstants,
) -> f64 {
    let mut effective = (resistance - penetration).max(0.0);
    if !binary {
        effective += constants.per_level_bonus * level_delta.max(0) as f64;
    }
    let cap = constants.cap_per_level * attacker_level.max(1) as f64;
    let mut coef = (effective / cap).min(1.0);
    if pure_dot {
        coef /= constants.pure_dot_divisor;
    }
    coef
}

/// Chance a binary spell is not resisted
pub fn binary_hit_chance(coef: f64, constants: &ResistanceConstants) -> f64 {
    (1.0 - constants.binary_factor * coef).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constants() -> ResistanceConstants {
        ResistanceConstants::default()
    }

    #[test]
    fn test_vertices_match_closed_form() {
        for i in 0..=3 {
            let coef = i as f64 / 3.0;
            let chances = PartialResistChances::for_coefficient(coef);
            assert!(
                (chances.expected_resist() - expected_resist(coef)).abs() < 1e-9,
                "coef {coef}"
            );
        }
    }

    #[test]
    fn test_zero_coefficient_never_resists() {
        let chances = PartialResistChances::for_coefficient(0.0);
        assert!((chances.none() - 1.0).abs() < f64::EPSILON);
        assert!((chances.resisted_fraction(0.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn test_thresholds_are_ordered() {
        let chances = PartialResistChances::for_coefficient(0.5);
        let (t00, t25, t50) = chances.thresholds();
        assert!(t00 >= t25 && t25 >= t50 && t50 >= 0.0);
        assert!(t00 <= 1.0);
        assert!((chances.resisted_fraction(0.999) - 0.0).abs() < f64::EPSILON);
        assert!((chances.resisted_fraction(0.0) - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_coefficient_level_bonus() {
        // 75 resist + 3 levels * 8 = 99 vs 5 * 60 = 300 cap
        let coef = resist_coefficient(75.0, 0.0, 60, 3, false, false, &constants());
        assert!((coef - 99.0 / 300.0).abs() < 1e-12);

        // Binary spells do not receive the level bonus
        let binary = resist_coefficient(75.0, 0.0, 60, 3, true, false, &constants());
        assert!((binary - 75.0 / 300.0).abs() < 1e-12);
    }

    #[test]
    fn test_penetration_and_cap() {
        let coef = resist_coefficient(50.0, 80.0, 60, 0, false, false, &constants());
        assert!(coef.abs() < f64::EPSILON);

        let capped = resist_coefficient(1000.0, 0.0, 60, 0, false, false, &constants());
        assert!((capped - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pure_dot_divisor() {
        let coef = resist_coefficient(300.0, 0.0, 60, 0, false, true, &constants());
        assert!((coef - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_binary_hit_chance() {
        let chance = binary_hit_chance(0.5, &constants());
        assert!((chance - 0.625).abs() < 1e-12);
    }
}
