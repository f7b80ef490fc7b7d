//! Spell definition loading
//!
//! Data-driven spells are plain records in `config/spells.toml`. A
//! definition becomes a [`SpellConfig`] with [`SpellDefinition::to_config`];
//! anything needing custom callbacks is built in code instead.

use super::ConfigError;
use crate::flags::{ProcMask, SpellFlags, SpellSchool};
use crate::outcome::Outcome;
use crate::spell::{CastConfig, CooldownConfig, DotConfig, SpellConfig, SpellCost};
use crate::types::{ActionId, ResourceKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Container for spell definitions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpellsConfig {
    #[serde(rename = "spells")]
    pub spells: Vec<SpellDefinition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostDefinition {
    #[serde(default = "default_resource")]
    pub resource: ResourceKind,
    pub amount: f64,
}

/// Direct damage rolled uniformly between `min` and `max`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DotDefinition {
    pub ticks: u32,
    pub tick_length_ms: u64,
    pub tick_damage: f64,
    #[serde(default = "default_tick_outcome")]
    pub outcome: Outcome,
    #[serde(default)]
    pub affected_by_cast_speed: bool,
}

/// A spell as written in configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpellDefinition {
    pub id: String,
    pub name: String,
    pub action_id: u32,
    #[serde(default = "default_school")]
    pub school: SpellSchool,
    #[serde(default)]
    pub proc_mask: ProcMask,
    #[serde(default)]
    pub flags: SpellFlags,
    #[serde(default)]
    pub cost: Option<CostDefinition>,
    #[serde(default)]
    pub cast_time_ms: u64,
    #[serde(default = "default_gcd_ms")]
    pub gcd_ms: u64,
    #[serde(default)]
    pub cooldown_ms: u64,
    #[serde(default)]
    pub coefficient: f64,
    #[serde(default)]
    pub damage: Option<DamageRange>,
    #[serde(default = "default_outcome")]
    pub outcome: Outcome,
    #[serde(default)]
    pub dot: Option<DotDefinition>,
}

fn default_resource() -> ResourceKind {
    ResourceKind::Mana
}

fn default_school() -> SpellSchool {
    SpellSchool::PHYSICAL
}

fn default_gcd_ms() -> u64 {
    CastConfig::DEFAULT_GCD.as_millis() as u64
}

fn default_outcome() -> Outcome {
    Outcome::MagicHitAndCrit
}

fn default_tick_outcome() -> Outcome {
    Outcome::Tick
}

impl SpellDefinition {
    pub fn cast_config(&self) -> CastConfig {
        CastConfig {
            cast_time: Duration::from_millis(self.cast_time_ms),
            gcd: Duration::from_millis(self.gcd_ms),
            ignore_haste: false,
        }
    }

    /// Build a registrable spell
    ///
    /// Direct damage is rolled under the label `"<name> Damage"`; a spell
    /// with both direct damage and a periodic part applies the periodic part
    /// after the hit.
    pub fn to_config(&self) -> SpellConfig {
        let mut config = SpellConfig::new(self.name.clone(), ActionId::Spell(self.action_id))
            .with_school(self.school)
            .with_proc_mask(self.proc_mask)
            .with_flags(self.flags)
            .with_coefficient(self.coefficient)
            .with_cast(self.cast_config());

        if let Some(cost) = self.cost {
            config = config.with_cost(SpellCost::new(cost.resource, cost.amount));
        }
        if self.cooldown_ms > 0 {
            config = config.with_cooldown(CooldownConfig::new(Duration::from_millis(self.cooldown_ms)));
        }
        if let Some(dot) = self.dot {
            let mut periodic = DotConfig::new(self.name.clone(), dot.ticks, Duration::from_millis(dot.tick_length_ms))
                .with_tick_damage(dot.tick_damage)
                .with_tick_outcome(dot.outcome);
            if dot.affected_by_cast_speed {
                periodic = periodic.affected_by_cast_speed();
            }
            config = config.with_dot(periodic);
        }
        if let Some(damage) = self.damage {
            let label = format!("{} Damage", self.name);
            let outcome = self.outcome;
            let has_dot = self.dot.is_some();
            config = config.with_effects(move |sim, spell, target| {
                let base = sim.roll(&label, damage.min, damage.max);
                let result = sim.calc_and_deal_damage(spell, target, base, outcome);
                if has_dot && result.landed() {
                    if let Some(dot) = sim.dot_for(spell, target) {
                        sim.apply_dot(dot);
                    }
                }
            });
        }
        config
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(damage) = self.damage {
            if damage.min > damage.max || damage.min < 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "spell '{}' has an invalid damage range {}..{}",
                    self.id, damage.min, damage.max
                )));
            }
        }
        if let Some(dot) = self.dot {
            if dot.ticks == 0 || dot.tick_length_ms == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "spell '{}' has an empty periodic effect",
                    self.id
                )));
            }
        }
        if self.flags.contains(SpellFlags::CHANNELED) && self.dot.is_none() {
            return Err(ConfigError::ValidationError(format!(
                "channeled spell '{}' needs a periodic effect",
                self.id
            )));
        }
        Ok(())
    }
}

fn into_map(config: SpellsConfig) -> Result<HashMap<String, SpellDefinition>, ConfigError> {
    let mut map = HashMap::new();
    for spell in config.spells {
        spell.validate()?;
        if map.contains_key(&spell.id) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate spell id '{}'",
                spell.id
            )));
        }
        map.insert(spell.id.clone(), spell);
    }
    Ok(map)
}

/// Load spell definitions from a TOML file
pub fn load_spell_definitions(path: &Path) -> Result<HashMap<String, SpellDefinition>, ConfigError> {
    let config: SpellsConfig = super::load_toml(path)?;
    into_map(config)
}

/// Load spell definitions from a TOML string
pub fn parse_spell_definitions(content: &str) -> Result<HashMap<String, SpellDefinition>, ConfigError> {
    let config: SpellsConfig = super::parse_toml(content)?;
    into_map(config)
}

/// Get the bundled spell definitions
pub fn default_spell_definitions() -> HashMap<String, SpellDefinition> {
    let toml = include_str!("../../config/spells.toml");
    parse_spell_definitions(toml).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "bundled spell definitions failed to load");
        HashMap::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_spells() {
        let toml = r#"
[[spells]]
id = "frostbolt"
name = "Frostbolt"
action_id = 116
school = "FROST"
proc_mask = "SPELL_DAMAGE"
flags = "BINARY"
cast_time_ms = 3000
coefficient = 0.814

[spells.cost]
amount = 260

[spells.damage]
min = 440
max = 475
"#;

        let spells = parse_spell_definitions(toml).unwrap();
        let frostbolt = &spells["frostbolt"];
        assert_eq!(frostbolt.school, SpellSchool::FROST);
        assert!(frostbolt.flags.contains(SpellFlags::BINARY));
        assert_eq!(frostbolt.gcd_ms, 1500);
        assert_eq!(frostbolt.outcome, Outcome::MagicHitAndCrit);
        assert_eq!(frostbolt.cost.unwrap().resource, ResourceKind::Mana);

        let config = frostbolt.to_config();
        assert_eq!(config.cast.cast_time, Duration::from_millis(3000));
        assert!(config.apply_effects.is_some());
    }

    #[test]
    fn test_channel_without_dot_rejected() {
        let toml = r#"
[[spells]]
id = "broken"
name = "Broken"
action_id = 1
flags = "CHANNELED"
"#;
        assert!(matches!(
            parse_spell_definitions(toml),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let toml = r#"
[[spells]]
id = "strike"
name = "Strike"
action_id = 1

[[spells]]
id = "strike"
name = "Strike Again"
action_id = 2
"#;
        assert!(parse_spell_definitions(toml).is_err());
    }

    #[test]
    fn test_default_spells_loads_all() {
        let spells = default_spell_definitions();
        let expected = [
            "fireball",
            "frostbolt",
            "shadow_bolt",
            "arcane_missiles",
            "corruption",
            "sinister_strike",
        ];
        assert_eq!(spells.len(), expected.len());
        for id in expected {
            assert!(spells.contains_key(id), "Missing spell: {}", id);
        }
        assert!(spells["arcane_missiles"].to_config().dot.is_some());
    }
}
