//! Outcome resolution
//!
//! Every attack shape is an [`Outcome`] variant. A variant turns the
//! attacker/defender [`AttackTable`] plus the spell's bonuses into a
//! [`RollPlan`]: a ladder of `(outcome, width)` steps walked with a single
//! draw in the fixed order miss, dodge, parry, glance, block, crit, crush,
//! then hit, optionally followed by a binary-resist roll and a separate crit
//! roll. The sampler and the analytic [`OutcomeDistribution`] read the same
//! plan, so they cannot disagree.

mod magic;
mod melee;
mod result;

pub use result::{Provenance, SpellMetrics, SpellResult};

use crate::attack_table::AttackTable;
use crate::flags::{HitOutcome, ProcMask, SpellFlags};
use crate::sim::Sim;
use crate::stats::Stat;
use crate::types::{SpellId, UnitId};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Attack shapes understood by the outcome resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    AlwaysHit,
    AlwaysMiss,
    MeleeWhite,
    MeleeSpecialHit,
    MeleeSpecialHitAndCrit,
    MeleeSpecialNoBlockDodgeParry,
    MeleeSpecialCritOnly,
    RangedHit,
    RangedHitAndCrit,
    RangedCritOnly,
    MagicHit,
    MagicCrit,
    MagicHitAndCrit,
    Healing,
    HealingCrit,
    Tick,
    TickCrit,
    TickMagicHit,
    TickMagicHitAndCrit,
    EnemyMeleeWhite,
}

impl Outcome {
    /// Same classification without touching spell metrics
    pub fn no_hit_counter(self) -> OutcomeApplier {
        OutcomeApplier {
            outcome: self,
            counted: false,
        }
    }

    pub fn is_periodic(self) -> bool {
        matches!(
            self,
            Outcome::Tick | Outcome::TickCrit | Outcome::TickMagicHit | Outcome::TickMagicHitAndCrit
        )
    }

    fn plan(self, inputs: &OutcomeInputs) -> RollPlan {
        match self {
            Outcome::AlwaysHit | Outcome::Tick => RollPlan::certain(CritFamily::Physical),
            Outcome::AlwaysMiss => RollPlan {
                table_label: "Always Miss",
                ladder: Ladder::default().step(HitOutcome::MISS, 1.0),
                binary_land: None,
                crit_roll: None,
                crit_family: CritFamily::Physical,
            },
            Outcome::MeleeWhite
            | Outcome::MeleeSpecialHit
            | Outcome::MeleeSpecialHitAndCrit
            | Outcome::MeleeSpecialNoBlockDodgeParry
            | Outcome::MeleeSpecialCritOnly
            | Outcome::RangedHit
            | Outcome::RangedHitAndCrit
            | Outcome::RangedCritOnly
            | Outcome::EnemyMeleeWhite => melee::plan(self, inputs),
            Outcome::MagicHit
            | Outcome::MagicCrit
            | Outcome::MagicHitAndCrit
            | Outcome::Healing
            | Outcome::HealingCrit
            | Outcome::TickCrit
            | Outcome::TickMagicHit
            | Outcome::TickMagicHitAndCrit => magic::plan(self, inputs),
        }
    }
}

/// An outcome variant plus whether it records into spell metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutcomeApplier {
    pub outcome: Outcome,
    pub counted: bool,
}

impl From<Outcome> for OutcomeApplier {
    fn from(outcome: Outcome) -> Self {
        OutcomeApplier {
            outcome,
            counted: true,
        }
    }
}

/// Which crit multiplier a plan uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CritFamily {
    Physical,
    Magic,
}

/// Everything a plan needs, gathered once per attack
#[derive(Debug, Clone, Copy)]
pub(crate) struct OutcomeInputs {
    pub table: AttackTable,
    pub proc_mask: ProcMask,
    /// Whether the spell deals magic rather than physical damage
    pub magic: bool,
    pub binary: bool,
    pub dual_wielding: bool,
    /// Melee/ranged hit as a fraction, spell bonus included
    pub melee_hit: f64,
    pub spell_hit: f64,
    pub melee_crit: f64,
    pub spell_crit: f64,
    pub reduced_crit_taken: f64,
    pub binary_coefficient: f64,
    pub binary_factor: f64,
    pub min_spell_miss: f64,
}

impl OutcomeInputs {
    pub fn effective_melee_hit(&self) -> f64 {
        (self.melee_hit - self.table.hit_suppression).max(0.0)
    }

    pub fn special_miss(&self) -> f64 {
        (self.table.base_miss_chance - self.effective_melee_hit()).max(0.0)
    }

    pub fn white_miss(&self) -> f64 {
        let penalty = if self.dual_wielding && self.proc_mask.intersects(ProcMask::MELEE_WHITE) {
            self.table.dual_wield_penalty
        } else {
            0.0
        };
        (self.table.base_miss_chance + penalty - self.effective_melee_hit()).max(0.0)
    }

    pub fn physical_crit(&self) -> f64 {
        (self.melee_crit + self.table.base_crit_chance
            - self.table.crit_suppression
            - self.reduced_crit_taken)
            .max(0.0)
    }

    pub fn spell_miss(&self) -> f64 {
        let floor = self.min_spell_miss.min(self.table.base_spell_miss_chance);
        (self.table.base_spell_miss_chance - self.spell_hit).max(floor)
    }

    pub fn spell_crit(&self) -> f64 {
        (self.spell_crit - self.reduced_crit_taken).max(0.0)
    }

    pub fn binary_land(&self) -> Option<f64> {
        if self.binary {
            Some((1.0 - self.binary_factor * self.binary_coefficient).clamp(0.0, 1.0))
        } else {
            None
        }
    }
}

/// Ordered outcome thresholds for a single roll
#[derive(Debug, Clone, Default)]
pub(crate) struct Ladder {
    steps: SmallVec<[(HitOutcome, f64); 8]>,
}

impl Ladder {
    pub fn step(mut self, outcome: HitOutcome, width: f64) -> Self {
        if width > 0.0 {
            self.steps.push((outcome, width));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// First step whose cumulative threshold exceeds the roll, else a hit
    pub fn pick(&self, roll: f64) -> HitOutcome {
        let mut chance = 0.0;
        for &(outcome, width) in &self.steps {
            chance += width;
            if roll < chance {
                return outcome;
            }
        }
        HitOutcome::HIT
    }

    /// Probability of each step, truncated at certainty, with the hit remainder
    pub fn probabilities(&self) -> SmallVec<[(HitOutcome, f64); 8]> {
        let mut out = SmallVec::new();
        let mut cumulative = 0.0_f64;
        for &(outcome, width) in &self.steps {
            let next = (cumulative + width).min(1.0);
            let p = next - cumulative;
            if p > 0.0 {
                out.push((outcome, p));
            }
            cumulative = next;
        }
        if cumulative < 1.0 {
            out.push((HitOutcome::HIT, 1.0 - cumulative));
        }
        out
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RollPlan {
    pub table_label: &'static str,
    pub ladder: Ladder,
    /// Chance a binary spell survives its resist check
    pub binary_land: Option<f64>,
    /// Separate crit roll applied to landed results
    pub crit_roll: Option<(&'static str, f64)>,
    pub crit_family: CritFamily,
}

impl RollPlan {
    fn certain(crit_family: CritFamily) -> Self {
        RollPlan {
            table_label: "",
            ladder: Ladder::default(),
            binary_land: None,
            crit_roll: None,
            crit_family,
        }
    }

    fn sample(&self, sim: &mut Sim) -> HitOutcome {
        let mut outcome = if self.ladder.is_empty() {
            HitOutcome::HIT
        } else {
            let roll = sim.random_float(self.table_label);
            self.ladder.pick(roll)
        };

        let rollable = outcome == HitOutcome::HIT || outcome == HitOutcome::BLOCK;
        if rollable {
            if let Some(land) = self.binary_land {
                if sim.random_float("Binary Resist") >= land {
                    return HitOutcome::MISS;
                }
            }
            if let Some((label, chance)) = self.crit_roll {
                if sim.proc(label, chance) {
                    outcome = crit_of(outcome);
                }
            }
        }
        outcome
    }

    fn distribution(&self) -> OutcomeDistribution {
        let mut dist = OutcomeDistribution::default();
        for (outcome, p) in self.ladder.probabilities() {
            let rollable = outcome == HitOutcome::HIT || outcome == HitOutcome::BLOCK;
            if !rollable {
                dist.add(outcome, p);
                continue;
            }
            let land = self.binary_land.unwrap_or(1.0);
            dist.add(HitOutcome::MISS, p * (1.0 - land));
            let landed = p * land;
            match self.crit_roll {
                Some((_, chance)) => {
                    let chance = chance.clamp(0.0, 1.0);
                    dist.add(crit_of(outcome), landed * chance);
                    dist.add(outcome, landed * (1.0 - chance));
                }
                None => dist.add(outcome, landed),
            }
        }
        dist
    }
}

fn crit_of(outcome: HitOutcome) -> HitOutcome {
    if outcome == HitOutcome::BLOCK {
        HitOutcome::BLOCK | HitOutcome::CRIT
    } else {
        HitOutcome::CRIT
    }
}

/// Analytic probability of each outcome for one attack
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutcomeDistribution {
    entries: SmallVec<[(HitOutcome, f64); 12]>,
}

impl OutcomeDistribution {
    fn add(&mut self, outcome: HitOutcome, p: f64) {
        if p <= 0.0 {
            return;
        }
        match self.entries.iter_mut().find(|(o, _)| *o == outcome) {
            Some(entry) => entry.1 += p,
            None => self.entries.push((outcome, p)),
        }
    }

    /// Probability of exactly this outcome
    pub fn probability(&self, outcome: HitOutcome) -> f64 {
        self.entries
            .iter()
            .filter(|(o, _)| *o == outcome)
            .map(|(_, p)| p)
            .sum()
    }

    /// Probability of any outcome containing all bits of `outcome`
    pub fn probability_containing(&self, outcome: HitOutcome) -> f64 {
        self.entries
            .iter()
            .filter(|(o, _)| o.contains(outcome))
            .map(|(_, p)| p)
            .sum()
    }

    pub fn landed(&self) -> f64 {
        self.entries
            .iter()
            .filter(|(o, _)| o.landed())
            .map(|(_, p)| p)
            .sum()
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, p)| p).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(HitOutcome, f64)> {
        self.entries.iter()
    }
}

impl Sim {
    pub(crate) fn outcome_inputs(&self, spell: SpellId, target: UnitId, table: &AttackTable) -> OutcomeInputs {
        let s = &self.spells[spell.index()];
        let attacker = &self.units[s.unit.index()];
        let defender = &self.units[target.index()];
        let bonus_hit = s.modifiers.bonus_hit_percent;
        let bonus_crit = s.modifiers.bonus_crit_percent;
        let binary = s.flags.contains(SpellFlags::BINARY);
        let binary_coefficient = if binary && !s.flags.contains(SpellFlags::IGNORE_RESISTS) {
            table.resist_coefficient(s.school, true, false, &self.constants)
        } else {
            0.0
        };

        OutcomeInputs {
            table: *table,
            proc_mask: s.proc_mask,
            magic: s.school.is_magic(),
            binary,
            dual_wielding: attacker.weapons().is_dual_wielding(),
            melee_hit: (attacker.stat(Stat::MeleeHit) + bonus_hit) / 100.0,
            spell_hit: (attacker.stat(Stat::SpellHit) + bonus_hit) / 100.0,
            melee_crit: (attacker.stat(Stat::MeleeCrit) + bonus_crit) / 100.0,
            spell_crit: (attacker.stat(Stat::SpellCrit) + bonus_crit) / 100.0,
            reduced_crit_taken: defender.pseudo().reduced_crit_taken,
            binary_coefficient,
            binary_factor: self.constants.resistance.binary_factor,
            min_spell_miss: self.constants.spell.min_miss_chance,
        }
    }

    /// Analytic distribution of `outcome` for `spell` against `target`
    pub fn outcome_distribution(&mut self, spell: SpellId, target: UnitId, outcome: Outcome) -> OutcomeDistribution {
        let attacker = self.spells[spell.index()].unit;
        let table = self.attack_table(attacker, target);
        let inputs = self.outcome_inputs(spell, target, &table);
        outcome.plan(&inputs).distribution()
    }

    /// Average of `damage` after the outcome adjustments of `outcome`
    pub fn expected_outcome_damage(&mut self, spell: SpellId, target: UnitId, outcome: Outcome, damage: f64) -> f64 {
        let attacker = self.spells[spell.index()].unit;
        let table = self.attack_table(attacker, target);
        let inputs = self.outcome_inputs(spell, target, &table);
        let plan = outcome.plan(&inputs);
        let crit = self.crit_multiplier(spell, plan.crit_family);
        let crush = self.constants.melee.crush_multiplier;
        let block_value = self.units[target.index()].stat(Stat::BlockValue);
        let glance = (table.glance_multiplier_min + table.glance_multiplier_max) / 2.0;

        plan.distribution()
            .iter()
            .filter(|(o, _)| o.landed())
            .map(|&(o, p)| {
                let mut value = damage;
                if o.contains(HitOutcome::GLANCE) {
                    value *= glance;
                }
                if o.contains(HitOutcome::BLOCK) {
                    value = (value - block_value).max(0.0);
                }
                if o.contains(HitOutcome::CRIT) {
                    value *= crit;
                }
                if o.contains(HitOutcome::CRUSH) {
                    value *= crush;
                }
                p * value
            })
            .sum()
    }

    /// Classify `result` and adjust its damage accordingly
    pub(crate) fn apply_outcome(
        &mut self,
        result: &mut SpellResult,
        applier: OutcomeApplier,
        table: &AttackTable,
    ) {
        let spell = result.spell;
        let inputs = self.outcome_inputs(spell, result.target, table);
        let plan = applier.outcome.plan(&inputs);
        let rolled = plan.sample(self);

        result.pre_outcome_damage = result.damage;
        if rolled.landed() {
            result.outcome |= rolled;
        } else {
            result.outcome = (result.outcome - HitOutcome::PARTIAL) | rolled;
            result.damage = 0.0;
        }

        if rolled.contains(HitOutcome::GLANCE) {
            let m = self.roll(
                "Glance Multiplier",
                table.glance_multiplier_min,
                table.glance_multiplier_max,
            );
            result.damage *= m;
        }
        if rolled.contains(HitOutcome::BLOCK) {
            let block_value = self.units[result.target.index()].stat(Stat::BlockValue);
            result.damage = (result.damage - block_value).max(0.0);
        }
        if rolled.contains(HitOutcome::CRIT) {
            result.damage *= self.crit_multiplier(spell, plan.crit_family);
        }
        if rolled.contains(HitOutcome::CRUSH) {
            result.damage *= self.constants.melee.crush_multiplier;
        }

        let s = &mut self.spells[spell.index()];
        if applier.counted && !s.flags.contains(SpellFlags::NO_METRICS) {
            s.metrics.record_outcome(result.outcome);
        }
        if !s.flags.contains(SpellFlags::NO_LOGS) {
            tracing::trace!(
                spell = %s.label,
                outcome = ?result.outcome,
                damage = result.damage,
                "outcome resolved"
            );
        }
    }

    fn crit_multiplier(&self, spell: SpellId, family: CritFamily) -> f64 {
        let s = &self.spells[spell.index()];
        let base = match family {
            CritFamily::Physical => self.constants.melee.crit_multiplier,
            CritFamily::Magic => self.constants.spell.crit_multiplier,
        };
        base + s.modifiers.crit_damage_bonus + self.units[s.unit.index()].pseudo().crit_damage_bonus
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ladder_pick_order() {
        let ladder = Ladder::default()
            .step(HitOutcome::MISS, 0.125)
            .step(HitOutcome::DODGE, 0.25)
            .step(HitOutcome::CRIT, 0.375);
        assert_eq!(ladder.pick(0.0625), HitOutcome::MISS);
        assert_eq!(ladder.pick(0.125), HitOutcome::DODGE);
        assert_eq!(ladder.pick(0.374), HitOutcome::CRIT);
        assert_eq!(ladder.pick(0.749), HitOutcome::CRIT);
        // Widths are exact in binary, so the ladder ends at exactly 0.75
        assert_eq!(ladder.pick(0.75), HitOutcome::HIT);
    }

    #[test]
    fn test_ladder_skips_non_positive_widths() {
        let ladder = Ladder::default()
            .step(HitOutcome::MISS, 0.0)
            .step(HitOutcome::DODGE, -0.1);
        assert!(ladder.is_empty());
    }

    #[test]
    fn test_probabilities_truncate_at_one() {
        let ladder = Ladder::default()
            .step(HitOutcome::MISS, 0.7)
            .step(HitOutcome::DODGE, 0.5)
            .step(HitOutcome::CRIT, 0.2);
        let probs = ladder.probabilities();
        assert_eq!(probs.len(), 2);
        assert!((probs[0].1 - 0.7).abs() < 1e-12);
        assert!((probs[1].1 - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_distribution_splits_crits_and_binary() {
        let plan = RollPlan {
            table_label: "t",
            ladder: Ladder::default().step(HitOutcome::MISS, 0.1),
            binary_land: Some(0.5),
            crit_roll: Some(("c", 0.2)),
            crit_family: CritFamily::Magic,
        };
        let dist = plan.distribution();
        // miss = 0.1 + 0.9 * 0.5
        assert!((dist.probability(HitOutcome::MISS) - 0.55).abs() < 1e-12);
        assert!((dist.probability(HitOutcome::CRIT) - 0.09).abs() < 1e-12);
        assert!((dist.probability(HitOutcome::HIT) - 0.36).abs() < 1e-12);
        assert!((dist.total() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_blocked_crit_distribution() {
        let plan = RollPlan {
            table_label: "t",
            ladder: Ladder::default().step(HitOutcome::BLOCK, 0.5),
            binary_land: None,
            crit_roll: Some(("c", 0.5)),
            crit_family: CritFamily::Physical,
        };
        let dist = plan.distribution();
        assert!((dist.probability(HitOutcome::BLOCK | HitOutcome::CRIT) - 0.25).abs() < 1e-12);
        assert!((dist.probability_containing(HitOutcome::CRIT) - 0.5).abs() < 1e-12);
        assert!((dist.landed() - 1.0).abs() < 1e-12);
    }
}
