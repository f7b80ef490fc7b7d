//! Spell pushback from damage taken while casting

use super::Hardcast;
use crate::sim::{ActionPriority, Sim};
use crate::types::{DotId, SpellId, UnitId};
use std::time::Duration;

impl Sim {
    /// React to a landed, damaging, non-periodic hit on `unit`
    ///
    /// A hardcast is delayed by a random amount; a channel loses a fixed
    /// fraction of its full duration instead.
    pub fn apply_pushback(&mut self, unit: UnitId) {
        let u = &self.units[unit.index()];
        if let Some(hardcast) = u.hardcast {
            self.push_back_hardcast(unit, hardcast);
        } else if let Some(channel) = u.channel {
            self.push_back_channel(channel);
        }
    }

    fn resists_pushback(&mut self, spell: SpellId) -> bool {
        let reduction = self.spells[spell.index()].pushback_reduction;
        if reduction >= 1.0 {
            return true;
        }
        reduction > 0.0 && self.random_float("Pushback Resist") < reduction
    }

    fn push_back_hardcast(&mut self, unit: UnitId, hardcast: Hardcast) {
        if self.resists_pushback(hardcast.spell) {
            return;
        }
        let (min, max) = (
            self.constants.spell.pushback_min_ms as f64,
            self.constants.spell.pushback_max_ms as f64,
        );
        let multiplier = self.units[unit.index()].pseudo().spell_pushback_multiplier;
        let ms = self.roll("Pushback", min, max) * multiplier;
        let delay = Duration::from_millis(ms.max(0.0).round() as u64);
        if delay.is_zero() {
            return;
        }

        let u = &mut self.units[unit.index()];
        u.hardcast_seq += 1;
        let seq = u.hardcast_seq;
        let expires = hardcast.expires + delay;
        u.hardcast = Some(Hardcast {
            expires,
            seq,
            ..hardcast
        });
        u.weapons.delay_melee_until(expires);
        tracing::debug!(
            spell = %self.spells[hardcast.spell.index()].label,
            delay_ms = delay.as_millis() as u64,
            expires_ms = expires.as_millis() as u64,
            "hardcast pushed back"
        );
        self.schedule(expires, ActionPriority::DEFAULT, move |sim| {
            sim.complete_hardcast(unit, seq)
        });
    }

    fn push_back_channel(&mut self, channel: DotId) {
        if self.resists_pushback(self.dots[channel.index()].spell) {
            return;
        }
        let fraction = self.constants.spell.channel_pushback_fraction;
        self.compress_dot(channel, fraction);
    }
}
