//! Melee, ranged and enemy swing tables

use super::{CritFamily, Ladder, Outcome, OutcomeInputs, RollPlan};
use crate::flags::HitOutcome;

const WHITE_TABLE: &str = "White Hit Table";
const SPECIAL_TABLE: &str = "Special Hit Table";
const RANGED_TABLE: &str = "Ranged Hit Table";
const ENEMY_TABLE: &str = "Enemy Hit Table";
const PHYSICAL_CRIT: &str = "Physical Crit Roll";

pub(super) fn plan(outcome: Outcome, inputs: &OutcomeInputs) -> RollPlan {
    let table = &inputs.table;
    let crit = inputs.physical_crit();

    let (table_label, ladder, crit_roll) = match outcome {
        Outcome::MeleeWhite => (
            WHITE_TABLE,
            Ladder::default()
                .step(HitOutcome::MISS, inputs.white_miss())
                .step(HitOutcome::DODGE, table.base_dodge_chance)
                .step(HitOutcome::PARRY, table.base_parry_chance)
                .step(HitOutcome::GLANCE, table.base_glance_chance)
                .step(HitOutcome::BLOCK, table.base_block_chance)
                .step(HitOutcome::CRIT, crit),
            None,
        ),
        Outcome::MeleeSpecialHit => (SPECIAL_TABLE, special_avoidance(inputs), None),
        Outcome::MeleeSpecialHitAndCrit => (
            SPECIAL_TABLE,
            special_avoidance(inputs),
            Some((PHYSICAL_CRIT, crit)),
        ),
        Outcome::MeleeSpecialNoBlockDodgeParry => (
            SPECIAL_TABLE,
            Ladder::default().step(HitOutcome::MISS, inputs.special_miss()),
            Some((PHYSICAL_CRIT, crit)),
        ),
        Outcome::MeleeSpecialCritOnly | Outcome::RangedCritOnly => {
            (SPECIAL_TABLE, Ladder::default(), Some((PHYSICAL_CRIT, crit)))
        }
        Outcome::RangedHit => (RANGED_TABLE, ranged_avoidance(inputs), None),
        Outcome::RangedHitAndCrit => (
            RANGED_TABLE,
            ranged_avoidance(inputs),
            Some((PHYSICAL_CRIT, crit)),
        ),
        Outcome::EnemyMeleeWhite => (
            ENEMY_TABLE,
            Ladder::default()
                .step(HitOutcome::MISS, table.base_miss_chance)
                .step(HitOutcome::DODGE, table.base_dodge_chance)
                .step(HitOutcome::PARRY, table.base_parry_chance)
                .step(HitOutcome::BLOCK, table.base_block_chance)
                .step(HitOutcome::CRIT, crit)
                .step(HitOutcome::CRUSH, table.base_crush_chance),
            None,
        ),
        _ => (SPECIAL_TABLE, Ladder::default(), None),
    };

    RollPlan {
        table_label,
        ladder,
        binary_land: None,
        crit_roll,
        crit_family: CritFamily::Physical,
    }
}

fn special_avoidance(inputs: &OutcomeInputs) -> Ladder {
    let table = &inputs.table;
    Ladder::default()
        .step(HitOutcome::MISS, inputs.special_miss())
        .step(HitOutcome::DODGE, table.base_dodge_chance)
        .step(HitOutcome::PARRY, table.base_parry_chance)
        .step(HitOutcome::BLOCK, table.base_block_chance)
}

// Ranged attacks cannot be parried.
fn ranged_avoidance(inputs: &OutcomeInputs) -> Ladder {
    let table = &inputs.table;
    Ladder::default()
        .step(HitOutcome::MISS, inputs.special_miss())
        .step(HitOutcome::DODGE, table.base_dodge_chance)
        .step(HitOutcome::BLOCK, table.base_block_chance)
}
