//! Proc triggers - chance-based reactions attached to auras
//!
//! A trigger filters the results reaching one of its aura's hooks, checks
//! its internal cooldown and extra condition, rolls its chance and then runs
//! its handler. Results produced by procs only reach triggers that opt in
//! with `can_proc_from_procs`.

use super::{AuraConfig, DynamicProcManager, PpmManager, ResultHookFn, SpellHookFn};
use crate::error::CombatError;
use crate::flags::{HitOutcome, ProcMask, SpellFlags, SpellSchool};
use crate::outcome::{Provenance, SpellResult};
use crate::sim::Sim;
use crate::spell::Spell;
use crate::timer::Cooldown;
use crate::types::{AuraId, BuildPhase, SpellId, UnitId};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

pub type ProcHandler = Rc<dyn Fn(&mut Sim, AuraId, &SpellResult)>;
pub type ProcCondition = Rc<dyn Fn(&Sim, &SpellResult) -> bool>;

/// Which aura hook a trigger listens on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcCallback {
    SpellHitDealt,
    SpellHitTaken,
    PeriodicDamageDealt,
    HealDealt,
    CastComplete,
}

/// Where a trigger comes from, for the suppression flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcSource {
    Weapon,
    Equip,
    Other,
}

/// How often a trigger fires
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProcRate {
    Always,
    /// Flat chance per qualifying result
    Chance(f64),
    /// Procs per minute from the weapons equipped at registration
    ///
    /// Weapons must be equipped before the trigger is registered; use
    /// [`ProcRate::Dpm`] when they can change later.
    Ppm(f64),
    /// Procs per minute, recomputed when weapons change
    Dpm(f64),
}

#[derive(Clone)]
pub struct ProcTrigger {
    pub name: String,
    pub callback: ProcCallback,
    pub source: ProcSource,
    pub proc_mask: ProcMask,
    pub proc_mask_exclude: ProcMask,
    /// Flags the spell must carry
    pub spell_flags: SpellFlags,
    pub spell_flags_exclude: SpellFlags,
    pub school: SpellSchool,
    pub class_mask: u64,
    pub outcome: HitOutcome,
    /// Only landed results that dealt damage qualify
    pub harmful: bool,
    pub rate: ProcRate,
    pub icd: Option<Duration>,
    pub can_proc_from_procs: bool,
    pub extra_condition: Option<ProcCondition>,
    pub handler: ProcHandler,
}

impl ProcTrigger {
    pub fn new(
        name: impl Into<String>,
        callback: ProcCallback,
        handler: impl Fn(&mut Sim, AuraId, &SpellResult) + 'static,
    ) -> Self {
        ProcTrigger {
            name: name.into(),
            callback,
            source: ProcSource::Other,
            proc_mask: ProcMask::empty(),
            proc_mask_exclude: ProcMask::empty(),
            spell_flags: SpellFlags::empty(),
            spell_flags_exclude: SpellFlags::empty(),
            school: SpellSchool::empty(),
            class_mask: 0,
            outcome: HitOutcome::empty(),
            harmful: false,
            rate: ProcRate::Always,
            icd: None,
            can_proc_from_procs: false,
            extra_condition: None,
            handler: Rc::new(handler),
        }
    }

    pub fn with_source(mut self, source: ProcSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_proc_mask(mut self, mask: ProcMask) -> Self {
        self.proc_mask = mask;
        self
    }

    pub fn excluding_proc_mask(mut self, mask: ProcMask) -> Self {
        self.proc_mask_exclude = mask;
        self
    }

    pub fn with_spell_flags(mut self, flags: SpellFlags) -> Self {
        self.spell_flags = flags;
        self
    }

    pub fn excluding_spell_flags(mut self, flags: SpellFlags) -> Self {
        self.spell_flags_exclude = flags;
        self
    }

    pub fn with_school(mut self, school: SpellSchool) -> Self {
        self.school = school;
        self
    }

    pub fn with_class_mask(mut self, mask: u64) -> Self {
        self.class_mask = mask;
        self
    }

    pub fn with_outcome(mut self, outcome: HitOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn harmful(mut self) -> Self {
        self.harmful = true;
        self
    }

    pub fn with_rate(mut self, rate: ProcRate) -> Self {
        self.rate = rate;
        self
    }

    pub fn with_icd(mut self, icd: Duration) -> Self {
        self.icd = Some(icd);
        self
    }

    pub fn procs_from_procs(mut self) -> Self {
        self.can_proc_from_procs = true;
        self
    }

    pub fn with_condition(mut self, f: impl Fn(&Sim, &SpellResult) -> bool + 'static) -> Self {
        self.extra_condition = Some(Rc::new(f));
        self
    }

    /// Static filters: masks, flags, school, class, outcome and provenance
    pub fn matches(&self, spell: &Spell, result: &SpellResult) -> bool {
        let mask = if self.can_proc_from_procs {
            self.proc_mask.with_proc_categories()
        } else {
            self.proc_mask
        };
        if !mask.is_empty() && !spell.proc_mask.intersects(mask) {
            return false;
        }
        if spell.proc_mask.intersects(self.proc_mask_exclude) {
            return false;
        }
        if !spell.flags.contains(self.spell_flags) || spell.flags.intersects(self.spell_flags_exclude) {
            return false;
        }
        if !self.school.is_empty() && !spell.school.intersects(self.school) {
            return false;
        }
        if self.class_mask != 0 && spell.class_mask & self.class_mask == 0 {
            return false;
        }
        if self.callback != ProcCallback::CastComplete {
            if !self.outcome.is_empty() && !result.outcome.intersects(self.outcome) {
                return false;
            }
            if self.harmful && !(result.landed() && result.damage > 0.0) {
                return false;
            }
        }
        provenance_allows(self, spell.flags, result.provenance)
    }

    fn build_phase(&self) -> BuildPhase {
        match self.source {
            ProcSource::Weapon | ProcSource::Equip => BuildPhase::Gear,
            ProcSource::Other => BuildPhase::Talents,
        }
    }
}

/// Whether a result of the given provenance may fire `trigger`
///
/// Proc results only reach triggers that proc from procs; spells flagged to
/// suppress weapon or equip procs never fire triggers of that source.
pub fn provenance_allows(trigger: &ProcTrigger, spell_flags: SpellFlags, provenance: Provenance) -> bool {
    if provenance == Provenance::Proc && !trigger.can_proc_from_procs {
        return false;
    }
    match trigger.source {
        ProcSource::Weapon => !spell_flags.contains(SpellFlags::SUPPRESS_WEAPON_PROCS),
        ProcSource::Equip => !spell_flags.contains(SpellFlags::SUPPRESS_EQUIP_PROCS),
        ProcSource::Other => true,
    }
}

enum ProcChance {
    Fixed(f64),
    Static(PpmManager),
    Dynamic(RefCell<DynamicProcManager>),
}

impl Sim {
    /// Attach a trigger to an existing aura
    pub fn register_proc_trigger(&mut self, aura: AuraId, trigger: ProcTrigger) -> Result<(), CombatError> {
        let unit = self.auras[aura.index()].unit;
        if let Some(duration) = trigger.icd {
            let timer = self.new_timer(unit)?;
            self.auras[aura.index()].icd = Some(Cooldown { timer, duration });
        }

        let base_mask = if trigger.proc_mask.is_empty() {
            ProcMask::MELEE_OR_RANGED
        } else {
            trigger.proc_mask
        };
        // Proc results carry only their proc category, so the weapon slots
        // must cover it too
        let ppm_mask = if trigger.can_proc_from_procs {
            base_mask.with_proc_categories()
        } else {
            base_mask
        };
        let chance = match trigger.rate {
            ProcRate::Always => ProcChance::Fixed(1.0),
            ProcRate::Chance(c) => ProcChance::Fixed(c),
            ProcRate::Ppm(ppm) => {
                let manager = PpmManager::new(ppm, ppm_mask, &self.units[unit.index()].weapons);
                if manager.is_empty() {
                    tracing::warn!(
                        trigger = %trigger.name,
                        unit = %unit,
                        "ppm trigger registered with no matching weapon; it will never proc"
                    );
                }
                ProcChance::Static(manager)
            }
            ProcRate::Dpm(ppm) => ProcChance::Dynamic(RefCell::new(DynamicProcManager::new(ppm, ppm_mask))),
        };

        let callback = trigger.callback;
        let trigger = Rc::new(trigger);
        let chance = Rc::new(chance);
        let hooks = &mut self.auras[aura.index()].hooks;
        if callback == ProcCallback::CastComplete {
            let hook: SpellHookFn = Rc::new(move |sim: &mut Sim, aura_id: AuraId, spell: SpellId, target: UnitId| {
                let provenance = Provenance::from_proc_mask(sim.spells[spell.index()].proc_mask);
                let result = SpellResult::new(spell, target, provenance);
                sim.try_proc(aura_id, &trigger, &chance, &result);
            });
            hooks.on_cast_complete.push(hook);
        } else {
            let hook: ResultHookFn = Rc::new(move |sim: &mut Sim, aura_id: AuraId, result: &SpellResult| {
                sim.try_proc(aura_id, &trigger, &chance, result);
            });
            match callback {
                ProcCallback::SpellHitDealt => hooks.on_spell_hit_dealt.push(hook),
                ProcCallback::SpellHitTaken => hooks.on_spell_hit_taken.push(hook),
                ProcCallback::PeriodicDamageDealt => hooks.on_periodic_damage_dealt.push(hook),
                ProcCallback::HealDealt => hooks.on_heal_dealt.push(hook),
                ProcCallback::CastComplete => {}
            }
        }
        Ok(())
    }

    /// Register a permanent aura carrying one trigger, active from the
    /// gear or talents build phase depending on the trigger's source
    pub fn register_proc_aura(&mut self, unit: UnitId, trigger: ProcTrigger) -> Result<AuraId, CombatError> {
        let config = AuraConfig::permanent(trigger.name.clone()).with_build_phase(trigger.build_phase());
        let aura = self.register_aura(unit, config)?;
        self.register_proc_trigger(aura, trigger)?;
        Ok(aura)
    }

    fn try_proc(&mut self, aura: AuraId, trigger: &ProcTrigger, chance: &ProcChance, result: &SpellResult) {
        let spell = &self.spells[result.spell.index()];
        if !trigger.matches(spell, result) {
            return;
        }
        let spell_mask = spell.proc_mask;
        let icd = self.auras[aura.index()].icd;
        if let Some(icd) = icd {
            if !self.is_cooldown_ready(&icd) {
                return;
            }
        }
        if let Some(condition) = &trigger.extra_condition {
            if !condition(self, result) {
                return;
            }
        }

        let unit = self.auras[aura.index()].unit;
        let p = match chance {
            ProcChance::Fixed(c) => *c,
            ProcChance::Static(manager) => manager.chance(spell_mask),
            ProcChance::Dynamic(manager) => manager
                .borrow_mut()
                .chance(&self.units[unit.index()].weapons, spell_mask),
        };
        if !self.proc(&trigger.name, p) {
            return;
        }
        if let Some(icd) = icd {
            self.use_cooldown(&icd);
        }
        tracing::debug!(
            proc = %trigger.name,
            unit = %unit,
            now_ms = self.now().as_millis() as u64,
            "proc triggered"
        );
        (trigger.handler)(self, aura, result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trigger(source: ProcSource, from_procs: bool) -> ProcTrigger {
        let t = ProcTrigger::new("t", ProcCallback::SpellHitDealt, |_, _, _| {}).with_source(source);
        if from_procs {
            t.procs_from_procs()
        } else {
            t
        }
    }

    #[test]
    fn test_proc_results_need_opt_in() {
        let plain = trigger(ProcSource::Other, false);
        let chained = trigger(ProcSource::Other, true);
        assert!(provenance_allows(&plain, SpellFlags::empty(), Provenance::Primary));
        assert!(!provenance_allows(&plain, SpellFlags::empty(), Provenance::Proc));
        assert!(provenance_allows(&chained, SpellFlags::empty(), Provenance::Proc));
    }

    #[test]
    fn test_suppression_flags_match_source() {
        let weapon = trigger(ProcSource::Weapon, false);
        let equip = trigger(ProcSource::Equip, false);
        let flags = SpellFlags::SUPPRESS_WEAPON_PROCS;
        assert!(!provenance_allows(&weapon, flags, Provenance::Primary));
        assert!(provenance_allows(&equip, flags, Provenance::Primary));
        assert!(!provenance_allows(&equip, SpellFlags::SUPPRESS_EQUIP_PROCS, Provenance::Primary));
    }
}
