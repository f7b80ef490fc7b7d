//! AttackTable - cached outcome probabilities for an attacker/defender pair
//!
//! Tables are derived from both units' levels and stats. They are created on
//! first use and recomputed lazily whenever either unit's version differs
//! from the one the table was built against. The damage multipliers stored
//! on a table are not derived from stats and survive recomputation.

mod armor;
mod resistance;

pub use armor::{armor_multiplier, armor_reduction};
pub use resistance::{
    binary_hit_chance, expected_resist, resist_coefficient, PartialResistChances,
};

use crate::config::CombatConstants;
use crate::flags::{SpellSchool, SCHOOL_COUNT};
use crate::sim::Sim;
use crate::stats::Stat;
use crate::types::UnitId;
use crate::unit::Unit;
use std::collections::hash_map::Entry;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackTable {
    pub attacker: UnitId,
    pub defender: UnitId,

    // === Avoidance ===
    pub base_miss_chance: f64,
    pub hit_suppression: f64,
    pub dual_wield_penalty: f64,
    pub base_dodge_chance: f64,
    pub base_parry_chance: f64,
    pub base_block_chance: f64,
    pub base_glance_chance: f64,
    pub glance_multiplier_min: f64,
    pub glance_multiplier_max: f64,

    // === Crits ===
    pub base_crit_chance: f64,
    pub crit_suppression: f64,
    pub base_crush_chance: f64,

    // === Spells ===
    pub base_spell_miss_chance: f64,

    // === Mitigation ===
    pub armor_multiplier: f64,
    pub resistances: [f64; SCHOOL_COUNT],
    pub spell_penetration: f64,
    pub attacker_level: u32,
    /// Defender level minus attacker level
    pub level_delta: i32,

    // === Multipliers ===
    pub damage_dealt_multiplier: f64,
    pub damage_taken_multiplier: f64,
    pub healing_dealt_multiplier: f64,

    attacker_version: u64,
    defender_version: u64,
}

impl AttackTable {
    pub fn new(attacker: &Unit, defender: &Unit, constants: &CombatConstants) -> Self {
        let mut table = AttackTable {
            attacker: attacker.id,
            defender: defender.id,
            base_miss_chance: 0.0,
            hit_suppression: 0.0,
            dual_wield_penalty: constants.melee.dual_wield_miss_penalty,
            base_dodge_chance: 0.0,
            base_parry_chance: 0.0,
            base_block_chance: 0.0,
            base_glance_chance: 0.0,
            glance_multiplier_min: 1.0,
            glance_multiplier_max: 1.0,
            base_crit_chance: 0.0,
            crit_suppression: 0.0,
            base_crush_chance: 0.0,
            base_spell_miss_chance: 0.0,
            armor_multiplier: 1.0,
            resistances: [0.0; SCHOOL_COUNT],
            spell_penetration: 0.0,
            attacker_level: attacker.level(),
            level_delta: 0,
            damage_dealt_multiplier: 1.0,
            damage_taken_multiplier: 1.0,
            healing_dealt_multiplier: 1.0,
            attacker_version: 0,
            defender_version: 0,
        };
        table.recompute(attacker, defender, constants);
        table
    }

    pub fn is_stale(&self, attacker: &Unit, defender: &Unit) -> bool {
        self.attacker_version != attacker.version() || self.defender_version != defender.version()
    }

    /// Rebuild every stat-derived field
    pub fn recompute(&mut self, attacker: &Unit, defender: &Unit, constants: &CombatConstants) {
        let att_level = attacker.level();
        let def_level = defender.level();
        self.attacker_level = att_level;
        self.level_delta = def_level as i32 - att_level as i32;
        self.dual_wield_penalty = constants.melee.dual_wield_miss_penalty;
        self.base_spell_miss_chance = spell_miss_for_level_delta(self.level_delta);

        let weapon_skill = 5.0 * att_level as f64 + attacker.pseudo().weapon_skill_bonus;
        let defense = 5.0 * def_level as f64 + defender.stat(Stat::Defense);

        if defender.is_enemy() {
            self.fill_enemy_defender(attacker, weapon_skill, defense, def_level);
        } else {
            self.fill_player_defender(attacker, defender, weapon_skill, defense);
        }

        self.armor_multiplier = armor_multiplier(
            defender.stat(Stat::Armor),
            attacker.stat(Stat::ArmorPenetration),
            att_level,
            &constants.armor,
        );
        self.resistances = defender.stats().resistances();
        self.spell_penetration = attacker.stat(Stat::SpellPenetration);

        self.attacker_version = attacker.version();
        self.defender_version = defender.version();
    }

    fn fill_enemy_defender(&mut self, attacker: &Unit, weapon_skill: f64, defense: f64, def_level: u32) {
        let delta = defense - weapon_skill;
        let in_front = attacker.pseudo().in_front_of_target;

        self.base_miss_chance = if delta <= 10.0 {
            0.05 + 0.001 * delta
        } else {
            0.07 + 0.004 * (delta - 10.0)
        }
        .max(0.0);
        self.hit_suppression = if delta > 10.0 { 0.01 } else { 0.0 };
        self.base_dodge_chance = (0.05 + 0.001 * delta).max(0.0);
        self.base_parry_chance = if in_front {
            if delta <= 10.0 {
                0.05 + 0.001 * delta
            } else {
                0.06 + 0.016 * (delta - 10.0)
            }
            .max(0.0)
        } else {
            0.0
        };
        self.base_block_chance = if in_front {
            (0.05 + 0.001 * delta).max(0.0)
        } else {
            0.0
        };

        let capped_skill = (5.0 * attacker.level() as f64).min(weapon_skill);
        self.base_glance_chance = (0.10 + 0.02 * (5.0 * def_level as f64 - capped_skill)).max(0.0);
        self.glance_multiplier_min = (1.3 - 0.05 * delta).clamp(0.01, 0.91);
        self.glance_multiplier_max = (1.2 - 0.03 * delta).clamp(0.2, 0.99);

        self.base_crit_chance = 0.0;
        self.crit_suppression = 0.002 * delta
            + if def_level >= attacker.level() + 3 {
                0.018
            } else {
                0.0
            };
        self.base_crush_chance = 0.0;
    }

    fn fill_player_defender(&mut self, attacker: &Unit, defender: &Unit, weapon_skill: f64, defense: f64) {
        let delta = weapon_skill - defense;
        let shift = 0.0004 * delta;
        let pseudo = defender.pseudo();

        self.base_miss_chance = (0.05 - shift).max(0.0);
        self.hit_suppression = 0.0;
        self.base_dodge_chance = (defender.stat(Stat::Dodge) / 100.0 - shift).max(0.0);
        self.base_parry_chance = if pseudo.can_parry {
            (defender.stat(Stat::Parry) / 100.0 - shift).max(0.0)
        } else {
            0.0
        };
        self.base_block_chance = if pseudo.can_block {
            (defender.stat(Stat::Block) / 100.0 - shift).max(0.0)
        } else {
            0.0
        };
        self.base_glance_chance = 0.0;
        self.glance_multiplier_min = 1.0;
        self.glance_multiplier_max = 1.0;

        if attacker.is_enemy() {
            self.base_crit_chance = (0.05 + shift).max(0.0);
            self.base_crush_chance = (0.02 * delta - 0.15).max(0.0);
        } else {
            self.base_crit_chance = 0.0;
            self.base_crush_chance = 0.0;
        }
        self.crit_suppression = 0.0;
    }

    /// Resistance coefficient for a spell school against this defender
    ///
    /// Multi-school spells use whichever school the defender resists least.
    pub fn resist_coefficient(
        &self,
        school: SpellSchool,
        binary: bool,
        pure_dot: bool,
        constants: &CombatConstants,
    ) -> f64 {
        school
            .iter()
            .filter(|s| *s != SpellSchool::PHYSICAL)
            .map(|s| {
                resist_coefficient(
                    self.resistances[s.index()],
                    self.spell_penetration,
                    self.attacker_level,
                    self.level_delta,
                    binary,
                    pure_dot,
                    &constants.resistance,
                )
            })
            .fold(None, |lowest: Option<f64>, c| Some(lowest.map_or(c, |l| l.min(c))))
            .unwrap_or(0.0)
    }
}

/// Base spell miss chance by defender-minus-attacker level difference
pub fn spell_miss_for_level_delta(delta: i32) -> f64 {
    let chance = match delta {
        d if d < 0 => 0.04 + 0.01 * d as f64,
        0 => 0.04,
        1 => 0.05,
        2 => 0.06,
        d => 0.17 + 0.11 * (d - 3) as f64,
    };
    chance.clamp(0.0, 1.0)
}

impl Sim {
    /// Current table for a pair, recomputed first if either unit changed
    pub fn attack_table(&mut self, attacker: UnitId, defender: UnitId) -> AttackTable {
        *self.attack_table_mut(attacker, defender)
    }

    /// Mutable table access for the non-derived multipliers
    pub fn attack_table_mut(&mut self, attacker: UnitId, defender: UnitId) -> &mut AttackTable {
        let att = &self.units[attacker.index()];
        let def = &self.units[defender.index()];
        match self.tables.entry((attacker, defender)) {
            Entry::Occupied(entry) => {
                let table = entry.into_mut();
                if table.is_stale(att, def) {
                    tracing::trace!(attacker = %attacker, defender = %defender, "attack table recomputed");
                    table.recompute(att, def, &self.constants);
                }
                table
            }
            Entry::Vacant(entry) => entry.insert(AttackTable::new(att, def, &self.constants)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SeededRandom;
    use crate::stats::Stats;
    use crate::types::UnitKind;
    use crate::unit::UnitConfig;

    fn setup(def_level: u32) -> (Sim, UnitId, UnitId) {
        let mut sim = Sim::new(CombatConstants::default(), SeededRandom::new(1));
        let player = sim.add_unit(UnitConfig::new("player", UnitKind::Player, 60));
        let boss = sim.add_unit(
            UnitConfig::new("boss", UnitKind::Enemy, def_level)
                .with_stats(Stats::new().with(Stat::Armor, 3731.0)),
        );
        (sim, player, boss)
    }

    #[test]
    fn test_boss_table_from_behind() {
        let (mut sim, player, boss) = setup(63);
        let table = sim.attack_table(player, boss);
        // delta = 315 - 300 = 15
        assert!((table.base_miss_chance - (0.07 + 0.004 * 5.0)).abs() < 1e-12);
        assert!((table.hit_suppression - 0.01).abs() < 1e-12);
        assert!((table.base_dodge_chance - 0.065).abs() < 1e-12);
        assert!(table.base_parry_chance.abs() < f64::EPSILON);
        assert!(table.base_block_chance.abs() < f64::EPSILON);
        assert!((table.base_glance_chance - 0.40).abs() < 1e-12);
        assert!((table.glance_multiplier_min - 0.55).abs() < 1e-12);
        assert!((table.glance_multiplier_max - 0.75).abs() < 1e-12);
        assert!((table.crit_suppression - 0.048).abs() < 1e-12);
        assert!((table.base_spell_miss_chance - 0.17).abs() < 1e-12);
        assert_eq!(table.level_delta, 3);
    }

    #[test]
    fn test_boss_table_in_front() {
        let (mut sim, player, boss) = setup(63);
        sim.update_pseudo(player, |p| p.in_front_of_target = true);
        let table = sim.attack_table(player, boss);
        assert!((table.base_parry_chance - (0.06 + 0.016 * 5.0)).abs() < 1e-12);
        assert!((table.base_block_chance - 0.065).abs() < 1e-12);
    }

    #[test]
    fn test_same_level_target() {
        let (mut sim, player, boss) = setup(60);
        let table = sim.attack_table(player, boss);
        assert!((table.base_miss_chance - 0.05).abs() < 1e-12);
        assert!(table.hit_suppression.abs() < f64::EPSILON);
        assert!((table.base_glance_chance - 0.10).abs() < 1e-12);
        assert!((table.base_spell_miss_chance - 0.04).abs() < 1e-12);
    }

    #[test]
    fn test_weapon_skill_reduces_delta() {
        let (mut sim, player, boss) = setup(63);
        sim.update_pseudo(player, |p| p.weapon_skill_bonus = 5.0);
        let table = sim.attack_table(player, boss);
        // delta = 10 -> low bracket
        assert!((table.base_miss_chance - 0.06).abs() < 1e-12);
        assert!(table.hit_suppression.abs() < f64::EPSILON);
        // glance uses min(300, 305) = 300, unchanged
        assert!((table.base_glance_chance - 0.40).abs() < 1e-12);
    }

    #[test]
    fn test_lazy_recompute_after_stat_change() {
        let (mut sim, player, boss) = setup(63);
        let before = sim.attack_table(player, boss).armor_multiplier;
        sim.add_stat(boss, Stat::Armor, -2000.0);
        let after = sim.attack_table(player, boss).armor_multiplier;
        assert!(after > before);
    }

    #[test]
    fn test_multipliers_survive_recompute() {
        let (mut sim, player, boss) = setup(63);
        sim.attack_table_mut(player, boss).damage_taken_multiplier = 1.1;
        sim.add_stat(player, Stat::SpellPower, 10.0);
        let table = sim.attack_table(player, boss);
        assert!((table.damage_taken_multiplier - 1.1).abs() < f64::EPSILON);
    }

    #[test]
    fn test_enemy_attacking_player() {
        let mut sim = Sim::new(CombatConstants::default(), SeededRandom::new(1));
        let tank = sim.add_unit(
            UnitConfig::new("tank", UnitKind::Player, 60).with_stats(
                Stats::new()
                    .with(Stat::Defense, 100.0)
                    .with(Stat::Dodge, 10.0)
                    .with(Stat::Parry, 12.0)
                    .with(Stat::Block, 15.0),
            ),
        );
        sim.update_pseudo(tank, |p| {
            p.can_parry = true;
            p.can_block = false;
        });
        let boss = sim.add_unit(UnitConfig::new("boss", UnitKind::Enemy, 63));
        let table = sim.attack_table(boss, tank);
        // skill 315 vs defense 400: delta = -85
        let shift = 0.0004 * -85.0;
        assert!((table.base_miss_chance - (0.05 - shift)).abs() < 1e-12);
        assert!((table.base_dodge_chance - (0.10 - shift)).abs() < 1e-12);
        assert!((table.base_parry_chance - (0.12 - shift)).abs() < 1e-12);
        assert!(table.base_block_chance.abs() < f64::EPSILON);
        assert!((table.base_crit_chance - (0.05 + shift)).abs() < 1e-12);
        assert!(table.base_crush_chance.abs() < f64::EPSILON);
    }

    #[test]
    fn test_crushing_blows_when_undefended() {
        let mut sim = Sim::new(CombatConstants::default(), SeededRandom::new(1));
        let warlock = sim.add_unit(UnitConfig::new("warlock", UnitKind::Player, 60));
        let boss = sim.add_unit(UnitConfig::new("boss", UnitKind::Enemy, 63));
        let table = sim.attack_table(boss, warlock);
        // delta = 15 -> 30% - 15%
        assert!((table.base_crush_chance - 0.15).abs() < 1e-12);
    }

    #[test]
    fn test_spell_miss_levels() {
        assert!((spell_miss_for_level_delta(-2) - 0.02).abs() < 1e-12);
        assert!(spell_miss_for_level_delta(-10).abs() < f64::EPSILON);
        assert!((spell_miss_for_level_delta(4) - 0.28).abs() < 1e-12);
    }

    #[test]
    fn test_multi_school_uses_lowest_resistance() {
        let mut sim = Sim::new(CombatConstants::default(), SeededRandom::new(1));
        let mage = sim.add_unit(UnitConfig::new("mage", UnitKind::Player, 60));
        let boss = sim.add_unit(
            UnitConfig::new("boss", UnitKind::Enemy, 60).with_stats(
                Stats::new()
                    .with(Stat::FireResistance, 150.0)
                    .with(Stat::FrostResistance, 30.0),
            ),
        );
        let table = sim.attack_table(mage, boss);
        let constants = CombatConstants::default();
        let coef = table.resist_coefficient(
            SpellSchool::FIRE | SpellSchool::FROST,
            false,
            false,
            &constants,
        );
        assert!((coef - 0.1).abs() < 1e-12);
    }
}
