//! The cast state machine: gating, hardcasts and completion

use super::SpellCost;
use crate::aura::SpellHook;
use crate::error::CastFailure;
use crate::flags::SpellFlags;
use crate::sim::{ActionPriority, Sim};
use crate::types::{SpellId, UnitId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Resolved parameters of one cast
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Cast {
    pub cost: f64,
    pub gcd: Duration,
    pub cast_time: Duration,
    pub channel_time: Duration,
}

impl Cast {
    /// How long the cast keeps the caster busy
    pub fn effective_time(&self) -> Duration {
        self.gcd.max(self.cast_time + self.channel_time)
    }
}

/// Default timing of a spell before modifiers and haste
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CastConfig {
    pub cast_time: Duration,
    pub gcd: Duration,
    #[serde(default)]
    pub ignore_haste: bool,
}

impl CastConfig {
    pub const DEFAULT_GCD: Duration = Duration::from_millis(1500);

    /// Instant cast on the global cooldown
    pub fn instant() -> Self {
        CastConfig {
            gcd: Self::DEFAULT_GCD,
            ..Default::default()
        }
    }

    /// Hardcast on the global cooldown
    pub fn with_cast_time(cast_time: Duration) -> Self {
        CastConfig {
            cast_time,
            gcd: Self::DEFAULT_GCD,
            ignore_haste: false,
        }
    }

    /// Instant cast that does not touch the global cooldown
    pub fn off_gcd() -> Self {
        CastConfig::default()
    }

    pub fn ignoring_haste(mut self) -> Self {
        self.ignore_haste = true;
        self
    }
}

/// A cast in progress
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hardcast {
    pub spell: SpellId,
    pub target: UnitId,
    pub started: Duration,
    pub expires: Duration,
    pub(crate) seq: u64,
}

impl Sim {
    /// Cast parameters the spell would use right now
    pub fn compute_cast(&self, spell: SpellId) -> Cast {
        let s = &self.spells[spell.index()];
        let speed = if s.cast_config.ignore_haste {
            1.0
        } else {
            self.units[s.unit.index()].cast_speed()
        };

        let cast_scale = (1.0 + s.modifiers.cast_time_pct).max(0.0) / speed;
        let cast_time = s
            .modifiers
            .cast_time_offset
            .apply(s.cast_config.cast_time)
            .mul_f64(cast_scale);

        let gcd = if s.cast_config.gcd.is_zero() {
            Duration::ZERO
        } else {
            s.modifiers
                .gcd_offset
                .apply(s.cast_config.gcd)
                .div_f64(speed)
                .max(self.constants.spell.gcd_min())
        };

        let channel_time = if s.flags.contains(SpellFlags::CHANNELED) {
            self.dot_schedule(spell)
                .map_or(Duration::ZERO, |(ticks, tick_length)| tick_length * ticks)
        } else {
            Duration::ZERO
        };

        let mut cast = Cast {
            cost: s.current_cost(),
            gcd,
            cast_time,
            channel_time,
        };
        if let Some(modify) = &s.modify_cast {
            modify(self, spell, &mut cast);
        }
        cast
    }

    /// Evaluate every cast gate in order without changing any state
    pub fn check_cast(&self, spell: SpellId, target: UnitId, cast: &Cast) -> Result<(), CastFailure> {
        let now = self.now();
        let s = &self.spells[spell.index()];
        let unit = &self.units[s.unit.index()];

        if s.is_swapped() {
            return Err(CastFailure::Swapped);
        }
        if let Some(condition) = &s.extra_cast_condition {
            if !condition(self, spell, target) {
                return Err(CastFailure::ConditionFailed);
            }
        }
        if let Some(SpellCost { resource, .. }) = s.cost {
            if cast.cost > 0.0 && !unit.resources.has(resource, cast.cost) {
                return Err(CastFailure::InsufficientResource {
                    resource,
                    needed: cast.cost,
                    available: unit.resources.get(resource),
                });
            }
        }
        for cooldown in [s.cooldown, s.shared_cooldown].into_iter().flatten() {
            let timer = self.timer(cooldown.timer);
            if !timer.is_ready(now) {
                return Err(CastFailure::OnCooldown {
                    ready_at: timer.ready_at(),
                });
            }
        }
        if !cast.gcd.is_zero() && !unit.gcd.is_ready(now) {
            return Err(CastFailure::GcdNotReady);
        }
        if unit.hardcast.is_some() && !s.flags.contains(SpellFlags::CAST_WHILE_CASTING) {
            return Err(CastFailure::Casting);
        }
        if let Some(channel) = unit.channel {
            if !s.flags.contains(SpellFlags::CAST_WHILE_CHANNELING) && !self.channel_interruptible_by(channel, spell) {
                return Err(CastFailure::Channeling);
            }
        }
        if unit.moving && !cast.cast_time.is_zero() {
            return Err(CastFailure::Moving);
        }
        Ok(())
    }

    pub fn can_cast(&self, spell: SpellId, target: UnitId) -> bool {
        let cast = self.compute_cast(spell);
        self.check_cast(spell, target, &cast).is_ok()
    }

    /// Attempt to cast; a refusal leaves every timer, resource and record untouched
    pub fn cast(&mut self, spell: SpellId, target: UnitId) -> Result<(), CastFailure> {
        let now = self.now();
        let cast = self.compute_cast(spell);
        if let Err(failure) = self.check_cast(spell, target, &cast) {
            tracing::debug!(
                spell = %self.spells[spell.index()].label,
                %failure,
                now_ms = now.as_millis() as u64,
                "cast refused"
            );
            return Err(failure);
        }

        let s = &mut self.spells[spell.index()];
        s.cur_cast = cast;
        let unit = s.unit;
        let flags = s.flags;
        let cooldown = s.cooldown;
        let shared = s.shared_cooldown;
        let cooldown_offset = s.modifiers.cooldown_offset;

        if self.units[unit.index()].channel.is_some() && !flags.contains(SpellFlags::CAST_WHILE_CHANNELING) {
            self.cancel_channel(unit);
        }

        let cast_end = now + cast.cast_time;
        if let Some(cd) = cooldown {
            self.timer_mut(cd.timer).set(cast_end + cooldown_offset.apply(cd.duration));
        }
        if let Some(cd) = shared {
            self.timer_mut(cd.timer).set(cast_end + cd.duration);
        }
        if !cast.gcd.is_zero() {
            self.units[unit.index()].gcd.set(now + cast.gcd.max(cast.cast_time));
        }

        if cast.cast_time.is_zero() {
            self.finish_cast(spell, target);
            return Ok(());
        }

        let u = &mut self.units[unit.index()];
        u.hardcast_seq += 1;
        let seq = u.hardcast_seq;
        u.hardcast = Some(Hardcast {
            spell,
            target,
            started: now,
            expires: cast_end,
            seq,
        });
        u.weapons.delay_melee_until(cast_end);
        if !flags.contains(SpellFlags::NO_LOGS) {
            tracing::debug!(
                spell = %self.spells[spell.index()].label,
                cast_ms = cast.cast_time.as_millis() as u64,
                now_ms = now.as_millis() as u64,
                "hardcast started"
            );
        }
        self.schedule(cast_end, ActionPriority::DEFAULT, move |sim| {
            sim.complete_hardcast(unit, seq)
        });
        Ok(())
    }

    /// Finish a hardcast unless it was cancelled or pushed back since
    pub(crate) fn complete_hardcast(&mut self, unit: UnitId, seq: u64) {
        let Some(hardcast) = self.units[unit.index()].hardcast else {
            return;
        };
        if hardcast.seq != seq {
            return;
        }
        self.units[unit.index()].hardcast = None;

        let s = &self.spells[hardcast.spell.index()];
        if let Some(cost) = s.cost {
            let needed = s.cur_cast.cost;
            if needed > 0.0 && !self.units[unit.index()].resources.has(cost.resource, needed) {
                tracing::debug!(
                    spell = %s.label,
                    now_ms = self.now().as_millis() as u64,
                    "hardcast finished without enough resource"
                );
                return;
            }
        }
        self.finish_cast(hardcast.spell, hardcast.target);
    }

    /// Stop the current hardcast without applying it
    pub fn cancel_hardcast(&mut self, unit: UnitId) {
        if let Some(hardcast) = self.units[unit.index()].hardcast.take() {
            tracing::debug!(
                spell = %self.spells[hardcast.spell.index()].label,
                now_ms = self.now().as_millis() as u64,
                "hardcast cancelled"
            );
        }
    }

    fn finish_cast(&mut self, spell: SpellId, target: UnitId) {
        let s = &self.spells[spell.index()];
        let unit = s.unit;
        let flags = s.flags;
        if let Some(cost) = s.cost {
            let amount = s.cur_cast.cost;
            if amount > 0.0 {
                self.units[unit.index()].resources.spend(cost.resource, amount);
            }
        }
        self.apply_spell_effects(spell, target);
        if !flags.contains(SpellFlags::NO_ON_CAST_COMPLETE) {
            self.dispatch_spell_hooks(unit, SpellHook::CastComplete, spell, target);
        }
    }

    /// Run a spell's effects as if its cast had just completed
    ///
    /// Spells without explicit effects apply their periodic effect.
    pub fn apply_spell_effects(&mut self, spell: SpellId, target: UnitId) {
        let s = &mut self.spells[spell.index()];
        if !s.flags.contains(SpellFlags::NO_METRICS) {
            s.metrics.casts += 1;
        }
        if !s.flags.contains(SpellFlags::NO_LOGS) {
            tracing::debug!(spell = %s.label, target = %target, "spell applied");
        }
        let unit = s.unit;
        let effects = s.apply_effects.clone();
        let has_dot = s.dot.is_some();

        self.dispatch_spell_hooks(unit, SpellHook::ApplyEffects, spell, target);
        match effects {
            Some(f) => f(self, spell, target),
            None if has_dot => {
                if let Some(dot) = self.dot_for(spell, target) {
                    self.apply_dot(dot);
                }
            }
            None => {}
        }
    }

    /// Time until every timer gating the spell is ready
    pub fn spell_time_to_ready(&self, spell: SpellId) -> Duration {
        let now = self.now();
        let s = &self.spells[spell.index()];
        let mut wait = Duration::ZERO;
        for cooldown in [s.cooldown, s.shared_cooldown].into_iter().flatten() {
            wait = wait.max(self.timer(cooldown.timer).time_to_ready(now));
        }
        if !s.cast_config.gcd.is_zero() {
            wait = wait.max(self.units[s.unit.index()].gcd.time_to_ready(now));
        }
        wait
    }

    /// Cast time after modifiers and haste
    pub fn spell_cast_time(&self, spell: SpellId) -> Duration {
        self.compute_cast(spell).cast_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_time() {
        let cast = Cast {
            cost: 0.0,
            gcd: Duration::from_millis(1500),
            cast_time: Duration::from_millis(1000),
            channel_time: Duration::ZERO,
        };
        assert_eq!(cast.effective_time(), Duration::from_millis(1500));

        let channel = Cast {
            channel_time: Duration::from_secs(5),
            ..cast
        };
        assert_eq!(channel.effective_time(), Duration::from_secs(6));
    }

    #[test]
    fn test_cast_config_helpers() {
        assert_eq!(CastConfig::instant().gcd, CastConfig::DEFAULT_GCD);
        assert!(CastConfig::off_gcd().gcd.is_zero());
        assert!(CastConfig::with_cast_time(Duration::from_secs(3)).ignoring_haste().ignore_haste);
    }
}
