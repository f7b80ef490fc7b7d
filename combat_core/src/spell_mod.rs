//! Spell mods - toggleable, predicate-matched spell modifiers
//!
//! A mod belongs to a unit and affects every spell of that unit whose
//! class mask, school, proc mask, flags and defense type match. Spells
//! registered after the mod are picked up at registration time. Apply and
//! remove always run in matching pairs on the same set of spells.

use crate::error::CombatError;
use crate::flags::{ProcMask, SpellFlags, SpellSchool};
use crate::sim::Sim;
use crate::spell::{Spell, SpellModifiers};
use crate::timer::TimeOffset;
use crate::types::{DefenseType, ModId, SpellId, UnitId};
use std::fmt;
use std::mem;
use std::rc::Rc;

pub type ModifierFn = Rc<dyn Fn(&mut SpellModifiers)>;

/// Paired apply/remove closures for effects the built-in kinds don't cover
#[derive(Clone)]
pub struct CustomMod {
    apply: ModifierFn,
    remove: ModifierFn,
}

impl fmt::Debug for CustomMod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomMod")
    }
}

/// What a mod does to each matching spell
#[derive(Debug, Clone)]
pub enum SpellModKind {
    /// Multiplicative damage (0.1 = x1.1)
    DamageDonePct(f64),
    /// Additive damage percent (0.1 = +10%)
    DamageDoneFlat(f64),
    ImpactDamageDoneFlat(f64),
    PeriodicDamageDoneFlat(f64),
    PowerCostPct(f64),
    PowerCostFlat(f64),
    CooldownFlat(TimeOffset),
    CastTimePct(f64),
    CastTimeFlat(TimeOffset),
    GlobalCooldownFlat(TimeOffset),
    /// Crit chance in percent
    BonusCritFlat(f64),
    /// Hit chance in percent
    BonusHitFlat(f64),
    BonusCoefficientFlat(f64),
    CritDamageBonusFlat(f64),
    DotNumberOfTicksFlat(i32),
    DotTickLengthFlat(TimeOffset),
    /// Multiplicative threat (0.3 = x1.3)
    ThreatPct(f64),
    Custom(CustomMod),
}

impl SpellModKind {
    /// A custom kind; both halves are required so removal can mirror apply
    pub fn custom(
        apply: impl Fn(&mut SpellModifiers) + 'static,
        remove: impl Fn(&mut SpellModifiers) + 'static,
    ) -> Self {
        SpellModKind::Custom(CustomMod {
            apply: Rc::new(apply),
            remove: Rc::new(remove),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            SpellModKind::DamageDonePct(_) => "DamageDonePct",
            SpellModKind::DamageDoneFlat(_) => "DamageDoneFlat",
            SpellModKind::ImpactDamageDoneFlat(_) => "ImpactDamageDoneFlat",
            SpellModKind::PeriodicDamageDoneFlat(_) => "PeriodicDamageDoneFlat",
            SpellModKind::PowerCostPct(_) => "PowerCostPct",
            SpellModKind::PowerCostFlat(_) => "PowerCostFlat",
            SpellModKind::CooldownFlat(_) => "CooldownFlat",
            SpellModKind::CastTimePct(_) => "CastTimePct",
            SpellModKind::CastTimeFlat(_) => "CastTimeFlat",
            SpellModKind::GlobalCooldownFlat(_) => "GlobalCooldownFlat",
            SpellModKind::BonusCritFlat(_) => "BonusCritFlat",
            SpellModKind::BonusHitFlat(_) => "BonusHitFlat",
            SpellModKind::BonusCoefficientFlat(_) => "BonusCoefficientFlat",
            SpellModKind::CritDamageBonusFlat(_) => "CritDamageBonusFlat",
            SpellModKind::DotNumberOfTicksFlat(_) => "DotNumberOfTicksFlat",
            SpellModKind::DotTickLengthFlat(_) => "DotTickLengthFlat",
            SpellModKind::ThreatPct(_) => "ThreatPct",
            SpellModKind::Custom(_) => "Custom",
        }
    }

    fn apply_to(&self, m: &mut SpellModifiers) {
        match self {
            SpellModKind::DamageDonePct(v) => m.damage.base.multiplicative *= 1.0 + v,
            SpellModKind::DamageDoneFlat(v) => m.damage.base.additive += v,
            SpellModKind::ImpactDamageDoneFlat(v) => m.damage.impact.additive += v,
            SpellModKind::PeriodicDamageDoneFlat(v) => m.damage.periodic.additive += v,
            SpellModKind::PowerCostPct(v) => m.cost_pct += v,
            SpellModKind::PowerCostFlat(v) => m.cost_flat += v,
            SpellModKind::CooldownFlat(t) => m.cooldown_offset += *t,
            SpellModKind::CastTimePct(v) => m.cast_time_pct += v,
            SpellModKind::CastTimeFlat(t) => m.cast_time_offset += *t,
            SpellModKind::GlobalCooldownFlat(t) => m.gcd_offset += *t,
            SpellModKind::BonusCritFlat(v) => m.bonus_crit_percent += v,
            SpellModKind::BonusHitFlat(v) => m.bonus_hit_percent += v,
            SpellModKind::BonusCoefficientFlat(v) => m.coefficient += v,
            SpellModKind::CritDamageBonusFlat(v) => m.crit_damage_bonus += v,
            SpellModKind::DotNumberOfTicksFlat(n) => m.dot_ticks += n,
            SpellModKind::DotTickLengthFlat(t) => m.dot_tick_length_offset += *t,
            SpellModKind::ThreatPct(v) => m.threat_multiplier *= 1.0 + v,
            SpellModKind::Custom(c) => (c.apply)(m),
        }
    }

    fn remove_from(&self, m: &mut SpellModifiers) {
        match self {
            SpellModKind::DamageDonePct(v) => m.damage.base.multiplicative /= 1.0 + v,
            SpellModKind::DamageDoneFlat(v) => m.damage.base.additive -= v,
            SpellModKind::ImpactDamageDoneFlat(v) => m.damage.impact.additive -= v,
            SpellModKind::PeriodicDamageDoneFlat(v) => m.damage.periodic.additive -= v,
            SpellModKind::PowerCostPct(v) => m.cost_pct -= v,
            SpellModKind::PowerCostFlat(v) => m.cost_flat -= v,
            SpellModKind::CooldownFlat(t) => m.cooldown_offset -= *t,
            SpellModKind::CastTimePct(v) => m.cast_time_pct -= v,
            SpellModKind::CastTimeFlat(t) => m.cast_time_offset -= *t,
            SpellModKind::GlobalCooldownFlat(t) => m.gcd_offset -= *t,
            SpellModKind::BonusCritFlat(v) => m.bonus_crit_percent -= v,
            SpellModKind::BonusHitFlat(v) => m.bonus_hit_percent -= v,
            SpellModKind::BonusCoefficientFlat(v) => m.coefficient -= v,
            SpellModKind::CritDamageBonusFlat(v) => m.crit_damage_bonus -= v,
            SpellModKind::DotNumberOfTicksFlat(n) => m.dot_ticks -= n,
            SpellModKind::DotTickLengthFlat(t) => m.dot_tick_length_offset -= *t,
            SpellModKind::ThreatPct(v) => m.threat_multiplier /= 1.0 + v,
            SpellModKind::Custom(c) => (c.remove)(m),
        }
    }
}

/// A mod kind plus the predicate deciding which spells it touches
///
/// Empty predicate fields match everything.
#[derive(Debug, Clone)]
pub struct SpellModConfig {
    pub kind: SpellModKind,
    pub class_mask: u64,
    pub school: SpellSchool,
    pub proc_mask: ProcMask,
    /// All of these flags must be set on the spell
    pub spell_flags: SpellFlags,
    pub defense_type: Option<DefenseType>,
}

impl SpellModConfig {
    pub fn new(kind: SpellModKind) -> Self {
        SpellModConfig {
            kind,
            class_mask: 0,
            school: SpellSchool::empty(),
            proc_mask: ProcMask::empty(),
            spell_flags: SpellFlags::empty(),
            defense_type: None,
        }
    }

    pub fn with_class_mask(mut self, mask: u64) -> Self {
        self.class_mask = mask;
        self
    }

    pub fn with_school(mut self, school: SpellSchool) -> Self {
        self.school = school;
        self
    }

    pub fn with_proc_mask(mut self, mask: ProcMask) -> Self {
        self.proc_mask = mask;
        self
    }

    pub fn with_spell_flags(mut self, flags: SpellFlags) -> Self {
        self.spell_flags = flags;
        self
    }

    pub fn with_defense_type(mut self, defense_type: DefenseType) -> Self {
        self.defense_type = Some(defense_type);
        self
    }

    pub fn matches(&self, spell: &Spell) -> bool {
        (self.class_mask == 0 || spell.class_mask & self.class_mask != 0)
            && (self.school.is_empty() || spell.school.intersects(self.school))
            && (self.proc_mask.is_empty() || spell.proc_mask.intersects(self.proc_mask))
            && spell.flags.contains(self.spell_flags)
            && self.defense_type.map_or(true, |d| d == spell.defense_type)
    }
}

pub struct SpellMod {
    pub id: ModId,
    pub unit: UnitId,
    config: SpellModConfig,
    active: bool,
    affected: Vec<SpellId>,
}

impl SpellMod {
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn kind(&self) -> &SpellModKind {
        &self.config.kind
    }

    pub fn affected_spells(&self) -> &[SpellId] {
        &self.affected
    }
}

impl Sim {
    /// Register a mod that is active immediately and stays active
    pub fn add_static_mod(&mut self, unit: UnitId, config: SpellModConfig) -> ModId {
        let id = self.add_dynamic_mod(unit, config);
        self.activate_mod(id);
        id
    }

    /// Register a mod that starts inactive
    pub fn add_dynamic_mod(&mut self, unit: UnitId, config: SpellModConfig) -> ModId {
        let id = ModId(self.mods.len() as u32);
        self.mods.push(SpellMod {
            id,
            unit,
            config,
            active: false,
            affected: Vec::new(),
        });
        self.units[unit.index()].mods.push(id);
        id
    }

    pub fn spell_mod(&self, id: ModId) -> &SpellMod {
        &self.mods[id.index()]
    }

    pub fn is_mod_active(&self, id: ModId) -> bool {
        self.mods[id.index()].active
    }

    pub fn activate_mod(&mut self, id: ModId) {
        if self.mods[id.index()].active {
            return;
        }
        let unit = self.mods[id.index()].unit;
        let spell_ids = self.units[unit.index()].spells.clone();
        let m = &mut self.mods[id.index()];
        m.active = true;
        for spell_id in spell_ids {
            let spell = &mut self.spells[spell_id.index()];
            if m.config.matches(spell) {
                m.config.kind.apply_to(&mut spell.modifiers);
                m.affected.push(spell_id);
            }
        }
    }

    pub fn deactivate_mod(&mut self, id: ModId) {
        let m = &mut self.mods[id.index()];
        if !m.active {
            return;
        }
        m.active = false;
        for spell_id in mem::take(&mut m.affected) {
            m.config.kind.remove_from(&mut self.spells[spell_id.index()].modifiers);
        }
    }

    /// Swap the payload of a mod; an active mod is re-applied in place
    pub fn update_mod(&mut self, id: ModId, kind: SpellModKind) -> Result<(), CombatError> {
        let m = &mut self.mods[id.index()];
        let from = m.config.kind.name();
        let to = kind.name();
        if from != to {
            return Err(CombatError::ModKindMismatch { from, to });
        }
        if m.active {
            for spell_id in &m.affected {
                let modifiers = &mut self.spells[spell_id.index()].modifiers;
                m.config.kind.remove_from(modifiers);
                kind.apply_to(modifiers);
            }
        }
        m.config.kind = kind;
        Ok(())
    }

    /// Apply every active matching mod of the owner to a new spell
    pub(crate) fn apply_existing_mods(&mut self, spell_id: SpellId) {
        let unit = self.spells[spell_id.index()].unit;
        for mod_id in self.units[unit.index()].mods.clone() {
            let m = &mut self.mods[mod_id.index()];
            let spell = &mut self.spells[spell_id.index()];
            if m.active && m.config.matches(spell) {
                m.config.kind.apply_to(&mut spell.modifiers);
                m.affected.push(spell_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_remove_symmetry() {
        let kinds = vec![
            SpellModKind::DamageDoneFlat(0.15),
            SpellModKind::ImpactDamageDoneFlat(0.05),
            SpellModKind::PeriodicDamageDoneFlat(0.10),
            SpellModKind::PowerCostPct(-0.2),
            SpellModKind::PowerCostFlat(-30.0),
            SpellModKind::CooldownFlat(TimeOffset::from_millis(-5000)),
            SpellModKind::CastTimeFlat(TimeOffset::from_millis(-500)),
            SpellModKind::GlobalCooldownFlat(TimeOffset::from_millis(-500)),
            SpellModKind::BonusCritFlat(5.0),
            SpellModKind::BonusHitFlat(3.0),
            SpellModKind::BonusCoefficientFlat(0.2),
            SpellModKind::CritDamageBonusFlat(0.5),
            SpellModKind::DotNumberOfTicksFlat(2),
            SpellModKind::DotTickLengthFlat(TimeOffset::from_millis(-200)),
        ];
        for kind in kinds {
            let mut m = SpellModifiers::default();
            kind.apply_to(&mut m);
            assert_ne!(m, SpellModifiers::default(), "{} had no effect", kind.name());
            kind.remove_from(&mut m);
            assert_eq!(m, SpellModifiers::default(), "{} not symmetric", kind.name());
        }
    }

    #[test]
    fn test_multiplicative_kinds_roundtrip() {
        let mut m = SpellModifiers::default();
        let kind = SpellModKind::DamageDonePct(0.1);
        kind.apply_to(&mut m);
        assert!((m.damage.base.multiplicative - 1.1).abs() < 1e-12);
        kind.remove_from(&mut m);
        assert!((m.damage.base.multiplicative - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_custom_requires_both_halves() {
        let kind = SpellModKind::custom(|m| m.coefficient += 1.0, |m| m.coefficient -= 1.0);
        let mut m = SpellModifiers::default();
        kind.apply_to(&mut m);
        assert!((m.coefficient - 1.0).abs() < f64::EPSILON);
        kind.remove_from(&mut m);
        assert!(m.coefficient.abs() < f64::EPSILON);
    }
}
