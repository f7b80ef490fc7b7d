//! Damage and healing pipeline
//!
//! Calculation order for damage:
//! 1. Base damage plus coefficient times the relevant power
//! 2. Attacker multipliers (spell modifiers, pseudo stats, attack table)
//! 3. Mitigation (armor for physical, partial resist roll for magic)
//! 4. Outcome roll (miss, crit, block, ...)
//! 5. Target multipliers
//! 6. Threat
//!
//! Calculation never touches health; `deal_*` applies a result.

use crate::attack_table::{AttackTable, PartialResistChances};
use crate::aura::ResultHook;
use crate::flags::{HitOutcome, ProcMask, SpellFlags};
use crate::outcome::{Outcome, OutcomeApplier, Provenance, SpellResult};
use crate::sim::Sim;
use crate::stats::Stat;
use crate::types::{DotId, SpellId, UnitId};

/// Whether power scaling and attacker multipliers still need applying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scaling {
    Fresh,
    Snapshotted,
}

impl Sim {
    fn power_stat(&self, spell: SpellId, healing: bool) -> Stat {
        let s = &self.spells[spell.index()];
        if healing {
            Stat::HealingPower
        } else if !s.school.is_physical() {
            Stat::SpellPower
        } else if s.proc_mask.intersects(ProcMask::RANGED | ProcMask::RANGED_PROC) {
            Stat::RangedAttackPower
        } else {
            Stat::AttackPower
        }
    }

    fn scaled_base(&self, spell: SpellId, base: f64, healing: bool) -> f64 {
        let s = &self.spells[spell.index()];
        let power = self.units[s.unit.index()].stat(self.power_stat(spell, healing));
        base + s.modifiers.coefficient * power
    }

    fn attacker_multiplier(&self, spell: SpellId, periodic: bool, table: &AttackTable) -> f64 {
        let s = &self.spells[spell.index()];
        if s.flags.contains(SpellFlags::IGNORE_ATTACKER_MODIFIERS) {
            return 1.0;
        }
        let pseudo = self.units[s.unit.index()].pseudo();
        s.modifiers.damage.for_periodic(periodic)
            * pseudo.damage_dealt_multiplier
            * pseudo.school_dealt(s.school)
            * table.damage_dealt_multiplier
    }

    fn target_multiplier(&self, spell: SpellId, target: UnitId, table: &AttackTable) -> f64 {
        let s = &self.spells[spell.index()];
        if s.flags.contains(SpellFlags::IGNORE_TARGET_MODIFIERS) {
            return 1.0;
        }
        let pseudo = self.units[target.index()].pseudo();
        pseudo.damage_taken_multiplier * pseudo.school_taken(s.school) * table.damage_taken_multiplier
    }

    fn is_periodic_hit(&self, spell: SpellId, periodic: bool) -> bool {
        periodic
            || self.spells[spell.index()]
                .flags
                .contains(SpellFlags::TREAT_AS_PERIODIC)
    }

    fn mitigate(&mut self, result: &mut SpellResult, periodic: bool, table: &AttackTable) {
        let s = &self.spells[result.spell.index()];
        let flags = s.flags;
        let school = s.school;

        if school.is_physical() {
            if !periodic || flags.contains(SpellFlags::APPLY_ARMOR_REDUCTION) {
                result.damage *= table.armor_multiplier;
            }
            return;
        }
        if flags.intersects(SpellFlags::IGNORE_RESISTS | SpellFlags::BINARY) {
            return;
        }

        let coef = table.resist_coefficient(school, false, flags.contains(SpellFlags::PURE_DOT), &self.constants);
        let chances = PartialResistChances::for_coefficient(coef);
        if chances.none() >= 1.0 {
            return;
        }
        let fraction = chances.resisted_fraction(self.random_float("Partial Resist"));
        result.resistance_multiplier = 1.0 - fraction;
        result.damage *= result.resistance_multiplier;
        if fraction >= 0.75 {
            result.outcome |= HitOutcome::PARTIAL75;
        } else if fraction >= 0.50 {
            result.outcome |= HitOutcome::PARTIAL50;
        } else if fraction >= 0.25 {
            result.outcome |= HitOutcome::PARTIAL25;
        }
    }

    fn resolve_damage(
        &mut self,
        spell: SpellId,
        target: UnitId,
        amount: f64,
        periodic: bool,
        applier: OutcomeApplier,
        scaling: Scaling,
    ) -> SpellResult {
        let s = &self.spells[spell.index()];
        let attacker = s.unit;
        let mut result = SpellResult::new(spell, target, Provenance::from_proc_mask(s.proc_mask));
        if periodic {
            result.outcome |= HitOutcome::TICK;
        }
        let table = self.attack_table(attacker, target);
        let periodic = self.is_periodic_hit(spell, periodic);

        result.damage = match scaling {
            Scaling::Fresh => self.scaled_base(spell, amount, false) * self.attacker_multiplier(spell, periodic, &table),
            Scaling::Snapshotted => amount,
        };
        self.mitigate(&mut result, periodic, &table);
        self.apply_outcome(&mut result, applier, &table);
        result.damage *= self.target_multiplier(spell, target, &table);

        let s = &self.spells[spell.index()];
        result.threat = result.damage
            * s.modifiers.threat_multiplier
            * self.units[attacker.index()].pseudo().threat_multiplier;
        result
    }

    /// Direct damage result without applying it
    pub fn calc_damage(
        &mut self,
        spell: SpellId,
        target: UnitId,
        base: f64,
        outcome: impl Into<OutcomeApplier>,
    ) -> SpellResult {
        self.resolve_damage(spell, target, base, false, outcome.into(), Scaling::Fresh)
    }

    /// Periodic damage result; marks the result as a tick
    pub fn calc_periodic_damage(
        &mut self,
        spell: SpellId,
        target: UnitId,
        base: f64,
        outcome: impl Into<OutcomeApplier>,
    ) -> SpellResult {
        self.resolve_damage(spell, target, base, true, outcome.into(), Scaling::Fresh)
    }

    /// Tick result from the values a dot captured when it was applied
    pub fn calc_snapshot_tick(&mut self, dot: DotId, outcome: impl Into<OutcomeApplier>) -> SpellResult {
        let d = &self.dots[dot.index()];
        let (spell, target) = (d.spell, d.target);
        let amount = d.snapshot_base_damage * d.snapshot_multiplier;
        self.resolve_damage(spell, target, amount, true, outcome.into(), Scaling::Snapshotted)
    }

    /// Capture power scaling and attacker multipliers for later ticks
    pub fn snapshot_dot(&mut self, dot: DotId) {
        let d = &self.dots[dot.index()];
        let (spell, target, tick_damage) = (d.spell, d.target, d.config.tick_damage);
        let attacker = self.spells[spell.index()].unit;
        let table = self.attack_table(attacker, target);
        let base = self.scaled_base(spell, tick_damage, false);
        let multiplier = self.attacker_multiplier(spell, true, &table);
        let d = &mut self.dots[dot.index()];
        d.snapshot_base_damage = base;
        d.snapshot_multiplier = multiplier;
    }

    /// Apply a damage result to its target and fire the damage hooks
    pub fn deal_damage(&mut self, result: &SpellResult) {
        let s = &mut self.spells[result.spell.index()];
        let flags = s.flags;
        let attacker = s.unit;
        if !flags.contains(SpellFlags::NO_METRICS) {
            s.metrics.total_damage += result.damage;
            s.metrics.total_threat += result.threat;
        }
        if !flags.contains(SpellFlags::NO_LOGS) {
            tracing::trace!(
                spell = %s.label,
                target = %result.target,
                damage = result.damage,
                outcome = ?result.outcome,
                "damage dealt"
            );
        }

        if result.damage > 0.0 {
            let target = &mut self.units[result.target.index()];
            let taken = target.resources.take_damage(result.damage);
            target.damage_taken += taken;
        }

        let periodic = result.is_periodic();
        if !flags.contains(SpellFlags::NO_ON_DAMAGE_DEALT) {
            if periodic {
                self.dispatch_result_hooks(attacker, ResultHook::PeriodicDamageDealt, result);
            } else {
                self.dispatch_result_hooks(attacker, ResultHook::SpellHitDealt, result);
                self.dispatch_result_hooks(result.target, ResultHook::SpellHitTaken, result);
            }
        }

        if !periodic && result.landed() && result.damage > 0.0 {
            self.apply_pushback(result.target);
        }
    }

    pub fn deal_periodic_damage(&mut self, result: &SpellResult) {
        debug_assert!(result.is_periodic());
        self.deal_damage(result);
    }

    pub fn calc_and_deal_damage(
        &mut self,
        spell: SpellId,
        target: UnitId,
        base: f64,
        outcome: impl Into<OutcomeApplier>,
    ) -> SpellResult {
        let result = self.calc_damage(spell, target, base, outcome);
        self.deal_damage(&result);
        result
    }

    pub fn calc_and_deal_periodic_damage(
        &mut self,
        spell: SpellId,
        target: UnitId,
        base: f64,
        outcome: impl Into<OutcomeApplier>,
    ) -> SpellResult {
        let result = self.calc_periodic_damage(spell, target, base, outcome);
        self.deal_periodic_damage(&result);
        result
    }

    /// Healing result without applying it
    pub fn calc_healing(
        &mut self,
        spell: SpellId,
        target: UnitId,
        base: f64,
        outcome: impl Into<OutcomeApplier>,
    ) -> SpellResult {
        let s = &self.spells[spell.index()];
        let caster = s.unit;
        let flags = s.flags;
        let mut result = SpellResult::new(spell, target, Provenance::from_proc_mask(s.proc_mask));
        let table = self.attack_table(caster, target);

        let mut amount = self.scaled_base(spell, base, true);
        if !flags.contains(SpellFlags::IGNORE_ATTACKER_MODIFIERS) {
            amount *= self.spells[spell.index()].modifiers.damage.direct()
                * self.units[caster.index()].pseudo().healing_dealt_multiplier
                * table.healing_dealt_multiplier;
        }
        result.damage = amount;
        self.apply_outcome(&mut result, outcome.into(), &table);
        if !flags.contains(SpellFlags::IGNORE_TARGET_MODIFIERS) {
            result.damage *= self.units[target.index()].pseudo().healing_taken_multiplier;
        }
        result
    }

    pub fn deal_healing(&mut self, result: &SpellResult) {
        let s = &mut self.spells[result.spell.index()];
        let caster = s.unit;
        let flags = s.flags;
        let healed = self.units[result.target.index()].resources.heal(result.damage);
        let s = &mut self.spells[result.spell.index()];
        if !flags.contains(SpellFlags::NO_METRICS) {
            s.metrics.total_healing += healed;
        }
        if !flags.contains(SpellFlags::NO_LOGS) {
            tracing::trace!(spell = %s.label, target = %result.target, healed, "healing dealt");
        }
        if !flags.contains(SpellFlags::NO_ON_DAMAGE_DEALT) {
            self.dispatch_result_hooks(caster, ResultHook::HealDealt, result);
        }
    }

    pub fn calc_and_deal_healing(
        &mut self,
        spell: SpellId,
        target: UnitId,
        base: f64,
        outcome: impl Into<OutcomeApplier>,
    ) -> SpellResult {
        let result = self.calc_healing(spell, target, base, outcome);
        self.deal_healing(&result);
        result
    }

    /// Average damage of one attack, from the analytic outcome distribution
    /// and the expected partial resist
    pub fn expected_damage(&mut self, spell: SpellId, target: UnitId, base: f64, outcome: Outcome) -> f64 {
        let attacker = self.spells[spell.index()].unit;
        let table = self.attack_table(attacker, target);
        let periodic = self.is_periodic_hit(spell, outcome.is_periodic());
        let s = &self.spells[spell.index()];
        let flags = s.flags;
        let school = s.school;

        let mut damage = self.scaled_base(spell, base, false) * self.attacker_multiplier(spell, periodic, &table);
        if school.is_physical() {
            if !periodic || flags.contains(SpellFlags::APPLY_ARMOR_REDUCTION) {
                damage *= table.armor_multiplier;
            }
        } else if !flags.intersects(SpellFlags::IGNORE_RESISTS | SpellFlags::BINARY) {
            let coef = table.resist_coefficient(school, false, flags.contains(SpellFlags::PURE_DOT), &self.constants);
            damage *= 1.0 - PartialResistChances::for_coefficient(coef).expected_resist();
        }

        let target_multiplier = self.target_multiplier(spell, target, &table);
        self.expected_outcome_damage(spell, target, outcome, damage) * target_multiplier
    }
}
