//! Unit stat vectors and pseudo-stat multipliers

use crate::flags::{SpellSchool, SCHOOL_COUNT};
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// A primary or derived stat tracked per unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    Strength,
    Agility,
    Stamina,
    Intellect,
    Spirit,
    AttackPower,
    RangedAttackPower,
    SpellPower,
    HealingPower,
    /// Melee/ranged hit chance in percent
    MeleeHit,
    /// Spell hit chance in percent
    SpellHit,
    /// Melee/ranged crit chance in percent
    MeleeCrit,
    /// Spell crit chance in percent
    SpellCrit,
    Armor,
    ArmorPenetration,
    SpellPenetration,
    Defense,
    /// Dodge chance in percent
    Dodge,
    /// Parry chance in percent
    Parry,
    /// Block chance in percent
    Block,
    BlockValue,
    ArcaneResistance,
    FireResistance,
    FrostResistance,
    NatureResistance,
    ShadowResistance,
    Health,
    Mana,
}

impl Stat {
    pub const COUNT: usize = 28;

    /// Resistance stat for a single school, if that school can be resisted
    pub fn resistance_for(school: SpellSchool) -> Option<Stat> {
        match school {
            s if s == SpellSchool::ARCANE => Some(Stat::ArcaneResistance),
            s if s == SpellSchool::FIRE => Some(Stat::FireResistance),
            s if s == SpellSchool::FROST => Some(Stat::FrostResistance),
            s if s == SpellSchool::NATURE => Some(Stat::NatureResistance),
            s if s == SpellSchool::SHADOW => Some(Stat::ShadowResistance),
            _ => None,
        }
    }
}

/// Dense stat vector indexed by [`Stat`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats([f64; Stat::COUNT]);

impl Default for Stats {
    fn default() -> Self {
        Stats([0.0; Stat::COUNT])
    }
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter
    pub fn with(mut self, stat: Stat, value: f64) -> Self {
        self[stat] = value;
        self
    }

    pub fn add(&mut self, other: &Stats) {
        for (a, b) in self.0.iter_mut().zip(other.0.iter()) {
            *a += b;
        }
    }

    pub fn subtract(&mut self, other: &Stats) {
        for (a, b) in self.0.iter_mut().zip(other.0.iter()) {
            *a -= b;
        }
    }

    /// Resistance for each school, in school index order
    pub fn resistances(&self) -> [f64; SCHOOL_COUNT] {
        let mut out = [0.0; SCHOOL_COUNT];
        for (i, slot) in out.iter_mut().enumerate() {
            if let Some(stat) = Stat::resistance_for(SpellSchool::from_index(i)) {
                *slot = self[stat];
            }
        }
        out
    }
}

impl Index<Stat> for Stats {
    type Output = f64;
    fn index(&self, stat: Stat) -> &f64 {
        &self.0[stat as usize]
    }
}

impl IndexMut<Stat> for Stats {
    fn index_mut(&mut self, stat: Stat) -> &mut f64 {
        &mut self.0[stat as usize]
    }
}

/// Multipliers and switches that are not part of the stat vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PseudoStats {
    // === Damage ===
    pub damage_dealt_multiplier: f64,
    pub school_damage_dealt_multiplier: [f64; SCHOOL_COUNT],
    pub damage_taken_multiplier: f64,
    pub school_damage_taken_multiplier: [f64; SCHOOL_COUNT],
    pub crit_damage_bonus: f64,
    /// Flat reduction of crit chance against this unit (0.01 = 1%)
    pub reduced_crit_taken: f64,

    // === Healing / threat ===
    pub healing_dealt_multiplier: f64,
    pub healing_taken_multiplier: f64,
    pub threat_multiplier: f64,

    // === Casting ===
    /// Cast speed multiplier; 1.1 casts 10% faster
    pub cast_speed_multiplier: f64,
    pub spell_pushback_multiplier: f64,

    // === Melee ===
    pub weapon_skill_bonus: f64,
    pub can_block: bool,
    pub can_parry: bool,
    /// Whether this unit attacks its target from the front
    pub in_front_of_target: bool,
}

impl Default for PseudoStats {
    fn default() -> Self {
        PseudoStats {
            damage_dealt_multiplier: 1.0,
            school_damage_dealt_multiplier: [1.0; SCHOOL_COUNT],
            damage_taken_multiplier: 1.0,
            school_damage_taken_multiplier: [1.0; SCHOOL_COUNT],
            crit_damage_bonus: 0.0,
            reduced_crit_taken: 0.0,
            healing_dealt_multiplier: 1.0,
            healing_taken_multiplier: 1.0,
            threat_multiplier: 1.0,
            cast_speed_multiplier: 1.0,
            spell_pushback_multiplier: 1.0,
            weapon_skill_bonus: 0.0,
            can_block: false,
            can_parry: false,
            in_front_of_target: false,
        }
    }
}

impl PseudoStats {
    /// Damage-dealt multiplier for a (possibly multi-school) spell; the best
    /// school wins
    pub fn school_dealt(&self, school: SpellSchool) -> f64 {
        school
            .iter()
            .map(|s| self.school_damage_dealt_multiplier[s.index()])
            .fold(None, |best: Option<f64>, m| Some(best.map_or(m, |b| b.max(m))))
            .unwrap_or(1.0)
    }

    /// Damage-taken multiplier for a (possibly multi-school) spell; the best
    /// school for the attacker wins
    pub fn school_taken(&self, school: SpellSchool) -> f64 {
        school
            .iter()
            .map(|s| self.school_damage_taken_multiplier[s.index()])
            .fold(None, |best: Option<f64>, m| Some(best.map_or(m, |b| b.max(m))))
            .unwrap_or(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stat_count_matches_variants() {
        assert_eq!(Stat::Mana as usize + 1, Stat::COUNT);
    }

    #[test]
    fn test_stats_builder_and_add() {
        let mut a = Stats::new().with(Stat::SpellPower, 300.0);
        let b = Stats::new()
            .with(Stat::SpellPower, 50.0)
            .with(Stat::SpellCrit, 5.0);
        a.add(&b);
        assert!((a[Stat::SpellPower] - 350.0).abs() < f64::EPSILON);
        assert!((a[Stat::SpellCrit] - 5.0).abs() < f64::EPSILON);

        a.subtract(&b);
        assert!((a[Stat::SpellPower] - 300.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_resistance_lookup() {
        let stats = Stats::new()
            .with(Stat::FireResistance, 75.0)
            .with(Stat::ShadowResistance, 10.0);
        let res = stats.resistances();
        assert!((res[SpellSchool::FIRE.index()] - 75.0).abs() < f64::EPSILON);
        assert!((res[SpellSchool::SHADOW.index()] - 10.0).abs() < f64::EPSILON);
        assert!((res[SpellSchool::HOLY.index()]).abs() < f64::EPSILON);
        assert_eq!(Stat::resistance_for(SpellSchool::PHYSICAL), None);
    }

    #[test]
    fn test_school_multiplier_best_of() {
        let mut pseudo = PseudoStats::default();
        pseudo.school_damage_dealt_multiplier[SpellSchool::FROST.index()] = 1.1;
        let frostfire = SpellSchool::FROST | SpellSchool::FIRE;
        assert!((pseudo.school_dealt(frostfire) - 1.1).abs() < f64::EPSILON);
        assert!((pseudo.school_dealt(SpellSchool::FIRE) - 1.0).abs() < f64::EPSILON);
    }
}
