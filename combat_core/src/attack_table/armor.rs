//! Armor - physical damage reduction scaled by attacker level

use crate::config::ArmorConstants;

/// Damage multiplier from armor
///
/// Formula: `1 - a / (a + base + per_level * attacker_level)` where `a` is
/// armor after penetration (never negative). The reduction is capped.
pub fn armor_multiplier(
    armor: f64,
    armor_penetration: f64,
    attacker_level: u32,
    constants: &ArmorConstants,
) -> f64 {
    1.0 - armor_reduction(armor, armor_penetration, attacker_level, constants)
}

/// Fraction of physical damage removed by armor, in `[0, max_reduction]`
pub fn armor_reduction(
    armor: f64,
    armor_penetration: f64,
    attacker_level: u32,
    constants: &ArmorConstants,
) -> f64 {
    let effective = (armor - armor_penetration).max(0.0);
    if effective <= 0.0 {
        return 0.0;
    }
    let divisor = effective + constants.base + constants.per_level * attacker_level as f64;
    (effective / divisor).min(constants.max_reduction)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constants() -> ArmorConstants {
        ArmorConstants::default()
    }

    #[test]
    fn test_no_armor() {
        let mult = armor_multiplier(0.0, 0.0, 60, &constants());
        assert!((mult - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_boss_armor_vs_level_60() {
        // 3731 / (3731 + 400 + 85 * 60) = 3731 / 9231 ~ 40.42%
        let reduction = armor_reduction(3731.0, 0.0, 60, &constants());
        assert!((reduction - 3731.0 / 9231.0).abs() < 1e-12);
    }

    #[test]
    fn test_penetration_floors_at_zero() {
        let mult = armor_multiplier(500.0, 2000.0, 60, &constants());
        assert!((mult - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_reduction_cap() {
        let reduction = armor_reduction(1_000_000.0, 0.0, 60, &constants());
        assert!((reduction - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_higher_level_attacker_ignores_more() {
        let low = armor_reduction(3000.0, 0.0, 50, &constants());
        let high = armor_reduction(3000.0, 0.0, 60, &constants());
        assert!(low > high);
    }
}
