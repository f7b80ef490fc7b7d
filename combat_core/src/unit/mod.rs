//! Units - attackers and defenders with stats, resources and cast state

mod resources;
mod weapons;

pub use resources::Resources;
pub use weapons::{AutoAttacks, Weapon, WeaponSlot};

use crate::error::CombatError;
use crate::sim::Sim;
use crate::spell::Hardcast;
use crate::stats::{PseudoStats, Stat, Stats};
use crate::timer::Timer;
use crate::types::{AuraId, CategoryId, DotId, ModId, SpellId, TimerId, UnitId, UnitKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Everything needed to create a unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitConfig {
    pub label: String,
    pub kind: UnitKind,
    pub level: u32,
    #[serde(default)]
    pub stats: Stats,
    #[serde(default)]
    pub pseudo: PseudoStats,
}

impl UnitConfig {
    pub fn new(label: impl Into<String>, kind: UnitKind, level: u32) -> Self {
        UnitConfig {
            label: label.into(),
            kind,
            level,
            stats: Stats::default(),
            pseudo: PseudoStats::default(),
        }
    }

    pub fn with_stats(mut self, stats: Stats) -> Self {
        self.stats = stats;
        self
    }

    pub fn with_pseudo(mut self, pseudo: PseudoStats) -> Self {
        self.pseudo = pseudo;
        self
    }
}

/// A combatant
pub struct Unit {
    pub id: UnitId,
    pub label: String,
    pub kind: UnitKind,
    level: u32,

    // === Stats ===
    stats: Stats,
    pseudo: PseudoStats,
    /// Bumped on every stat, pseudo-stat, level or weapon change
    version: u64,

    // === Combat state ===
    pub current_target: Option<UnitId>,
    pub(crate) resources: Resources,
    pub(crate) gcd: Timer,
    pub(crate) timers: Vec<Timer>,
    pub(crate) hardcast: Option<Hardcast>,
    pub(crate) hardcast_seq: u64,
    pub(crate) channel: Option<DotId>,
    pub(crate) moving: bool,
    pub(crate) weapons: AutoAttacks,

    // === Registries ===
    pub(crate) spells: Vec<SpellId>,
    pub(crate) auras: Vec<AuraId>,
    pub(crate) aura_labels: HashMap<String, AuraId>,
    pub(crate) mods: Vec<ModId>,
    pub(crate) exclusive_categories: HashMap<String, CategoryId>,

    // === Metrics ===
    pub(crate) damage_taken: f64,
}

impl Unit {
    fn new(id: UnitId, config: UnitConfig) -> Self {
        let resources = Resources::new(config.stats[Stat::Health], config.stats[Stat::Mana]);
        Unit {
            id,
            label: config.label,
            kind: config.kind,
            level: config.level,
            stats: config.stats,
            pseudo: config.pseudo,
            version: 0,
            current_target: None,
            resources,
            gcd: Timer::default(),
            timers: Vec::new(),
            hardcast: None,
            hardcast_seq: 0,
            channel: None,
            moving: false,
            weapons: AutoAttacks::default(),
            spells: Vec::new(),
            auras: Vec::new(),
            aura_labels: HashMap::new(),
            mods: Vec::new(),
            exclusive_categories: HashMap::new(),
            damage_taken: 0.0,
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn stat(&self, stat: Stat) -> f64 {
        self.stats[stat]
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn pseudo(&self) -> &PseudoStats {
        &self.pseudo
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_enemy(&self) -> bool {
        self.kind == UnitKind::Enemy
    }

    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    pub fn weapons(&self) -> &AutoAttacks {
        &self.weapons
    }

    pub fn gcd(&self) -> &Timer {
        &self.gcd
    }

    pub fn hardcast(&self) -> Option<&Hardcast> {
        self.hardcast.as_ref()
    }

    pub fn is_casting(&self) -> bool {
        self.hardcast.is_some()
    }

    pub fn is_channeling(&self) -> bool {
        self.channel.is_some()
    }

    pub fn channel(&self) -> Option<DotId> {
        self.channel
    }

    pub fn is_moving(&self) -> bool {
        self.moving
    }

    pub fn spells(&self) -> &[SpellId] {
        &self.spells
    }

    pub fn auras(&self) -> &[AuraId] {
        &self.auras
    }

    pub fn damage_taken(&self) -> f64 {
        self.damage_taken
    }

    /// Cast speed, never below a tiny positive value
    pub fn cast_speed(&self) -> f64 {
        self.pseudo.cast_speed_multiplier.max(f64::EPSILON)
    }

    fn bump(&mut self) {
        self.version += 1;
    }

    fn reset(&mut self) {
        self.resources.reset();
        self.gcd.reset();
        for timer in &mut self.timers {
            timer.reset();
        }
        self.hardcast = None;
        self.channel = None;
        self.moving = false;
        self.weapons.reset();
        self.damage_taken = 0.0;
    }
}

impl Sim {
    pub fn add_unit(&mut self, config: UnitConfig) -> UnitId {
        let id = UnitId(self.units.len() as u32);
        tracing::debug!(unit = %id, label = %config.label, level = config.level, "unit added");
        self.units.push(Unit::new(id, config));
        id
    }

    pub fn unit(&self, id: UnitId) -> &Unit {
        &self.units[id.index()]
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// Checked lookup for handles that may come from outside this sim
    pub fn try_unit(&self, id: UnitId) -> Result<&Unit, CombatError> {
        self.units.get(id.index()).ok_or(CombatError::UnknownUnit(id))
    }

    pub fn set_target(&mut self, unit: UnitId, target: Option<UnitId>) {
        self.units[unit.index()].current_target = target;
    }

    pub fn set_level(&mut self, unit: UnitId, level: u32) {
        let u = &mut self.units[unit.index()];
        u.level = level;
        u.bump();
    }

    pub fn add_stat(&mut self, unit: UnitId, stat: Stat, delta: f64) {
        let u = &mut self.units[unit.index()];
        u.stats[stat] += delta;
        if matches!(stat, Stat::Health) {
            u.resources.max_health += delta;
        } else if matches!(stat, Stat::Mana) {
            u.resources.max_mana += delta;
        }
        u.bump();
    }

    pub fn add_stats(&mut self, unit: UnitId, stats: &Stats) {
        let u = &mut self.units[unit.index()];
        u.stats.add(stats);
        u.resources.max_health += stats[Stat::Health];
        u.resources.max_mana += stats[Stat::Mana];
        u.bump();
    }

    pub fn remove_stats(&mut self, unit: UnitId, stats: &Stats) {
        let u = &mut self.units[unit.index()];
        u.stats.subtract(stats);
        u.resources.max_health -= stats[Stat::Health];
        u.resources.max_mana -= stats[Stat::Mana];
        u.bump();
    }

    /// Mutate pseudo stats; always invalidates cached attack tables
    pub fn update_pseudo(&mut self, unit: UnitId, update: impl FnOnce(&mut PseudoStats)) {
        let u = &mut self.units[unit.index()];
        update(&mut u.pseudo);
        u.bump();
    }

    pub fn equip(&mut self, unit: UnitId, slot: WeaponSlot, weapon: Option<Weapon>) {
        let u = &mut self.units[unit.index()];
        u.weapons.equip(slot, weapon);
        u.bump();
    }

    pub fn resources_mut(&mut self, unit: UnitId) -> &mut Resources {
        &mut self.units[unit.index()].resources
    }

    /// Allocate a ready-at timer on a unit
    pub fn new_timer(&mut self, unit: UnitId) -> Result<TimerId, CombatError> {
        let limit = self.constants().limits.max_timers_per_unit;
        let u = self
            .units
            .get_mut(unit.index())
            .ok_or(CombatError::UnknownUnit(unit))?;
        if u.timers.len() >= limit {
            return Err(CombatError::TooManyTimers { unit, limit });
        }
        u.timers.push(Timer::default());
        Ok(TimerId {
            unit,
            index: (u.timers.len() - 1) as u32,
        })
    }

    pub fn gcd_time_to_ready(&self, unit: UnitId) -> Duration {
        self.units[unit.index()].gcd.time_to_ready(self.now())
    }

    /// Start or stop moving; starting cancels any hardcast or channel
    pub fn set_moving(&mut self, unit: UnitId, moving: bool) {
        self.units[unit.index()].moving = moving;
        if !moving {
            return;
        }
        if self.units[unit.index()].hardcast.take().is_some() {
            tracing::debug!(unit = %unit, now_ms = self.now().as_millis() as u64, "movement cancelled hardcast");
        }
        if self.units[unit.index()].channel.is_some() {
            tracing::debug!(unit = %unit, now_ms = self.now().as_millis() as u64, "movement cancelled channel");
            self.cancel_channel(unit);
        }
    }

    pub(crate) fn reset_units(&mut self) {
        for unit in &mut self.units {
            unit.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CombatConstants;
    use crate::sim::SeededRandom;

    fn sim() -> Sim {
        Sim::new(CombatConstants::default(), SeededRandom::new(1))
    }

    #[test]
    fn test_add_unit_initial_resources() {
        let mut sim = sim();
        let stats = Stats::new()
            .with(Stat::Health, 4000.0)
            .with(Stat::Mana, 6000.0);
        let id = sim.add_unit(UnitConfig::new("mage", UnitKind::Player, 60).with_stats(stats));
        let unit = sim.unit(id);
        assert!((unit.resources().health - 4000.0).abs() < f64::EPSILON);
        assert!((unit.resources().mana - 6000.0).abs() < f64::EPSILON);
        assert_eq!(unit.level(), 60);
    }

    #[test]
    fn test_stat_changes_bump_version() {
        let mut sim = sim();
        let id = sim.add_unit(UnitConfig::new("mage", UnitKind::Player, 60));
        let before = sim.unit(id).version();
        sim.add_stat(id, Stat::SpellPower, 100.0);
        sim.update_pseudo(id, |p| p.cast_speed_multiplier = 1.2);
        sim.equip(id, WeaponSlot::MainHand, Some(Weapon::new(1.0, 2.0, 2.0)));
        assert_eq!(sim.unit(id).version(), before + 3);
        assert!((sim.unit(id).stat(Stat::SpellPower) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_timer_limit() {
        let mut constants = CombatConstants::default();
        constants.limits.max_timers_per_unit = 2;
        let mut sim = Sim::new(constants, SeededRandom::new(1));
        let id = sim.add_unit(UnitConfig::new("mage", UnitKind::Player, 60));
        assert!(sim.new_timer(id).is_ok());
        assert!(sim.new_timer(id).is_ok());
        assert!(matches!(
            sim.new_timer(id),
            Err(CombatError::TooManyTimers { limit: 2, .. })
        ));
    }

    #[test]
    fn test_unknown_unit() {
        let sim = sim();
        assert!(matches!(
            sim.try_unit(UnitId(9)),
            Err(CombatError::UnknownUnit(_))
        ));
    }
}
