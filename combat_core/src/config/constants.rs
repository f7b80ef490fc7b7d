//! Tunable combat constants

use super::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Every tunable number the combat formulas read
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CombatConstants {
    #[serde(default)]
    pub melee: MeleeConstants,
    #[serde(default)]
    pub spell: SpellConstants,
    #[serde(default)]
    pub armor: ArmorConstants,
    #[serde(default)]
    pub resistance: ResistanceConstants,
    #[serde(default)]
    pub limits: LimitConstants,
}

impl CombatConstants {
    /// Reject values that would break probability or time arithmetic
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.spell.pushback_min_ms > self.spell.pushback_max_ms {
            return Err(ConfigError::ValidationError(format!(
                "pushback_min_ms ({}) exceeds pushback_max_ms ({})",
                self.spell.pushback_min_ms, self.spell.pushback_max_ms
            )));
        }
        if !(0.0..=1.0).contains(&self.spell.channel_pushback_fraction) {
            return Err(ConfigError::ValidationError(format!(
                "channel_pushback_fraction must be within [0, 1], got {}",
                self.spell.channel_pushback_fraction
            )));
        }
        if !(0.0..1.0).contains(&self.armor.max_reduction) {
            return Err(ConfigError::ValidationError(format!(
                "armor max_reduction must be within [0, 1), got {}",
                self.armor.max_reduction
            )));
        }
        if self.resistance.pure_dot_divisor <= 0.0 {
            return Err(ConfigError::ValidationError(
                "pure_dot_divisor must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeleeConstants {
    /// Damage multiplier of a melee or ranged crit
    #[serde(default = "default_melee_crit_multiplier")]
    pub crit_multiplier: f64,
    /// Damage multiplier of a crushing blow
    #[serde(default = "default_crush_multiplier")]
    pub crush_multiplier: f64,
    /// Extra miss chance on white swings while dual wielding
    #[serde(default = "default_dual_wield_penalty")]
    pub dual_wield_miss_penalty: f64,
}

impl Default for MeleeConstants {
    fn default() -> Self {
        MeleeConstants {
            crit_multiplier: default_melee_crit_multiplier(),
            crush_multiplier: default_crush_multiplier(),
            dual_wield_miss_penalty: default_dual_wield_penalty(),
        }
    }
}

fn default_melee_crit_multiplier() -> f64 {
    2.0
}
fn default_crush_multiplier() -> f64 {
    1.5
}
fn default_dual_wield_penalty() -> f64 {
    0.19
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpellConstants {
    /// Damage multiplier of a spell or heal crit
    #[serde(default = "default_spell_crit_multiplier")]
    pub crit_multiplier: f64,
    /// Floor of the spell miss chance after hit bonuses
    #[serde(default = "default_min_spell_miss")]
    pub min_miss_chance: f64,
    #[serde(default = "default_gcd_min_ms")]
    pub gcd_min_ms: u64,
    #[serde(default = "default_pushback_min_ms")]
    pub pushback_min_ms: u64,
    #[serde(default = "default_pushback_max_ms")]
    pub pushback_max_ms: u64,
    /// Fraction of a channel's full duration lost per pushback
    #[serde(default = "default_channel_pushback_fraction")]
    pub channel_pushback_fraction: f64,
}

impl SpellConstants {
    pub fn gcd_min(&self) -> Duration {
        Duration::from_millis(self.gcd_min_ms)
    }
}

impl Default for SpellConstants {
    fn default() -> Self {
        SpellConstants {
            crit_multiplier: default_spell_crit_multiplier(),
            min_miss_chance: default_min_spell_miss(),
            gcd_min_ms: default_gcd_min_ms(),
            pushback_min_ms: default_pushback_min_ms(),
            pushback_max_ms: default_pushback_max_ms(),
            channel_pushback_fraction: default_channel_pushback_fraction(),
        }
    }
}

fn default_spell_crit_multiplier() -> f64 {
    1.5
}
fn default_min_spell_miss() -> f64 {
    0.01
}
fn default_gcd_min_ms() -> u64 {
    1000
}
fn default_pushback_min_ms() -> u64 {
    500
}
fn default_pushback_max_ms() -> u64 {
    1000
}
fn default_channel_pushback_fraction() -> f64 {
    0.25
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmorConstants {
    /// Formula: reduction = armor / (armor + base + per_level * attacker_level)
    #[serde(default = "default_armor_base")]
    pub base: f64,
    #[serde(default = "default_armor_per_level")]
    pub per_level: f64,
    #[serde(default = "default_armor_max_reduction")]
    pub max_reduction: f64,
}

impl Default for ArmorConstants {
    fn default() -> Self {
        ArmorConstants {
            base: default_armor_base(),
            per_level: default_armor_per_level(),
            max_reduction: default_armor_max_reduction(),
        }
    }
}

fn default_armor_base() -> f64 {
    400.0
}
fn default_armor_per_level() -> f64 {
    85.0
}
fn default_armor_max_reduction() -> f64 {
    0.75
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResistanceConstants {
    /// Resistance granted per level the defender is above the attacker
    #[serde(default = "default_per_level_bonus")]
    pub per_level_bonus: f64,
    /// Resistance that yields a full coefficient, per attacker level
    #[serde(default = "default_cap_per_level")]
    pub cap_per_level: f64,
    #[serde(default = "default_pure_dot_divisor")]
    pub pure_dot_divisor: f64,
    /// Binary spells miss with probability `binary_factor * coefficient`
    #[serde(default = "default_binary_factor")]
    pub binary_factor: f64,
}

impl Default for ResistanceConstants {
    fn default() -> Self {
        ResistanceConstants {
            per_level_bonus: default_per_level_bonus(),
            cap_per_level: default_cap_per_level(),
            pure_dot_divisor: default_pure_dot_divisor(),
            binary_factor: default_binary_factor(),
        }
    }
}

fn default_per_level_bonus() -> f64 {
    8.0
}
fn default_cap_per_level() -> f64 {
    5.0
}
fn default_pure_dot_divisor() -> f64 {
    10.0
}
fn default_binary_factor() -> f64 {
    0.75
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitConstants {
    #[serde(default = "default_max_spells")]
    pub max_spells_per_unit: usize,
    #[serde(default = "default_max_timers")]
    pub max_timers_per_unit: usize,
}

impl Default for LimitConstants {
    fn default() -> Self {
        LimitConstants {
            max_spells_per_unit: default_max_spells(),
            max_timers_per_unit: default_max_timers(),
        }
    }
}

fn default_max_spells() -> usize {
    200
}
fn default_max_timers() -> usize {
    100
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_toml;

    #[test]
    fn test_default_constants() {
        let constants = CombatConstants::default();
        assert!((constants.melee.crit_multiplier - 2.0).abs() < f64::EPSILON);
        assert!((constants.spell.crit_multiplier - 1.5).abs() < f64::EPSILON);
        assert!((constants.armor.per_level - 85.0).abs() < f64::EPSILON);
        assert_eq!(constants.spell.gcd_min(), Duration::from_secs(1));
        assert_eq!(constants.limits.max_spells_per_unit, 200);
        assert!(constants.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml = r#"
            [spell]
            pushback_max_ms = 800

            [armor]
            max_reduction = 0.5
        "#;
        let constants: CombatConstants = parse_toml(toml).unwrap();
        assert_eq!(constants.spell.pushback_max_ms, 800);
        assert_eq!(constants.spell.pushback_min_ms, 500);
        assert!((constants.armor.max_reduction - 0.5).abs() < f64::EPSILON);
        assert!((constants.resistance.binary_factor - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_validation_rejects_inverted_pushback() {
        let mut constants = CombatConstants::default();
        constants.spell.pushback_min_ms = 2000;
        assert!(matches!(
            constants.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }
}
