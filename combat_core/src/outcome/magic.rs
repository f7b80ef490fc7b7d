//! Spell, heal and periodic tick tables

use super::{CritFamily, Ladder, Outcome, OutcomeInputs, RollPlan};
use crate::flags::HitOutcome;

const MAGIC_HIT: &str = "Magical Hit Roll";
const MAGIC_CRIT: &str = "Magical Crit Roll";
const HEALING_CRIT: &str = "Healing Crit Roll";
const PHYSICAL_CRIT: &str = "Physical Crit Roll";

pub(super) fn plan(outcome: Outcome, inputs: &OutcomeInputs) -> RollPlan {
    let hit_check = || Ladder::default().step(HitOutcome::MISS, inputs.spell_miss());

    let (ladder, binary_land, crit_roll, family) = match outcome {
        Outcome::MagicHit | Outcome::TickMagicHit => {
            (hit_check(), inputs.binary_land(), None, CritFamily::Magic)
        }
        Outcome::MagicCrit => (
            Ladder::default(),
            None,
            Some((MAGIC_CRIT, inputs.spell_crit())),
            CritFamily::Magic,
        ),
        Outcome::MagicHitAndCrit | Outcome::TickMagicHitAndCrit => (
            hit_check(),
            inputs.binary_land(),
            Some((MAGIC_CRIT, inputs.spell_crit())),
            CritFamily::Magic,
        ),
        Outcome::HealingCrit => (
            Ladder::default(),
            None,
            Some((HEALING_CRIT, inputs.spell_crit)),
            CritFamily::Magic,
        ),
        Outcome::TickCrit if inputs.magic => (
            Ladder::default(),
            None,
            Some((MAGIC_CRIT, inputs.spell_crit())),
            CritFamily::Magic,
        ),
        Outcome::TickCrit => (
            Ladder::default(),
            None,
            Some((PHYSICAL_CRIT, inputs.physical_crit())),
            CritFamily::Physical,
        ),
        _ => (Ladder::default(), None, None, CritFamily::Magic),
    };

    RollPlan {
        table_label: MAGIC_HIT,
        ladder,
        binary_land,
        crit_roll,
        crit_family: family,
    }
}
