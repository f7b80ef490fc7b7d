//! Dot - periodic effects and channels
//!
//! One [`Dot`] exists per (spell, target) pair, created on first use. Its
//! lifetime is an aura on the target: applying the dot (re)activates the
//! aura and starts a fresh tick chain, and the aura fading ends the chain.
//! Every application bumps a generation counter so ticks scheduled by an
//! earlier application are ignored.

use crate::aura::{AuraConfig, AuraDuration};
use crate::flags::SpellFlags;
use crate::outcome::Outcome;
use crate::sim::{ActionPriority, Sim};
use crate::types::{AuraId, DotId, SpellId, UnitId};
use std::rc::Rc;
use std::time::Duration;

pub type DotTickFn = Rc<dyn Fn(&mut Sim, DotId)>;
pub type DotInterruptFn = Rc<dyn Fn(&Sim, SpellId) -> bool>;

/// Definition of a periodic effect
#[derive(Clone)]
pub struct DotConfig {
    /// Label of the aura placed on the target
    pub label: String,
    pub number_of_ticks: u32,
    pub tick_length: Duration,
    /// Tick length divided by the caster's cast speed
    pub affected_by_cast_speed: bool,
    /// Base damage per tick before power scaling
    pub tick_damage: f64,
    /// Outcome used by the default tick
    pub tick_outcome: Outcome,
    /// Replaces the default snapshot
    pub on_snapshot: Option<DotTickFn>,
    /// Replaces the default tick
    pub on_tick: Option<DotTickFn>,
    /// Lets another spell interrupt the channel this dot drives
    pub interrupt_condition: Option<DotInterruptFn>,
}

impl DotConfig {
    pub fn new(label: impl Into<String>, number_of_ticks: u32, tick_length: Duration) -> Self {
        DotConfig {
            label: label.into(),
            number_of_ticks,
            tick_length,
            affected_by_cast_speed: false,
            tick_damage: 0.0,
            tick_outcome: Outcome::Tick,
            on_snapshot: None,
            on_tick: None,
            interrupt_condition: None,
        }
    }

    pub fn with_tick_damage(mut self, damage: f64) -> Self {
        self.tick_damage = damage;
        self
    }

    pub fn with_tick_outcome(mut self, outcome: Outcome) -> Self {
        self.tick_outcome = outcome;
        self
    }

    pub fn affected_by_cast_speed(mut self) -> Self {
        self.affected_by_cast_speed = true;
        self
    }

    pub fn on_snapshot(mut self, f: impl Fn(&mut Sim, DotId) + 'static) -> Self {
        self.on_snapshot = Some(Rc::new(f));
        self
    }

    pub fn on_tick(mut self, f: impl Fn(&mut Sim, DotId) + 'static) -> Self {
        self.on_tick = Some(Rc::new(f));
        self
    }

    pub fn with_interrupt_condition(mut self, f: impl Fn(&Sim, SpellId) -> bool + 'static) -> Self {
        self.interrupt_condition = Some(Rc::new(f));
        self
    }
}

/// Runtime state of one periodic effect on one target
pub struct Dot {
    pub id: DotId,
    pub spell: SpellId,
    pub caster: UnitId,
    pub target: UnitId,
    pub aura: AuraId,
    pub(crate) config: Rc<DotConfig>,
    pub(crate) channeled: bool,

    pub(crate) generation: u64,
    pub(crate) ticks_remaining: u32,
    pub(crate) total_ticks: u32,
    pub(crate) tick_count: u32,
    pub(crate) tick_length: Duration,
    pub(crate) next_tick_at: Duration,

    // === Snapshot ===
    /// Damage per tick captured at application, power scaling included
    pub snapshot_base_damage: f64,
    /// Attacker multiplier captured at application
    pub snapshot_multiplier: f64,
}

impl Dot {
    pub fn is_channel(&self) -> bool {
        self.channeled
    }

    pub fn ticks_remaining(&self) -> u32 {
        self.ticks_remaining
    }

    pub fn total_ticks(&self) -> u32 {
        self.total_ticks
    }

    /// Ticks dealt by the current application
    pub fn tick_count(&self) -> u32 {
        self.tick_count
    }

    pub fn tick_length(&self) -> Duration {
        self.tick_length
    }

    pub fn next_tick_at(&self) -> Duration {
        self.next_tick_at
    }

    /// Time of the last remaining tick
    pub fn expires_at(&self) -> Option<Duration> {
        if self.ticks_remaining == 0 {
            return None;
        }
        Some(self.next_tick_at + self.tick_length * (self.ticks_remaining - 1))
    }

    /// Snapshotted damage per second
    pub fn dps(&self) -> f64 {
        if self.tick_length.is_zero() {
            return 0.0;
        }
        self.snapshot_base_damage * self.snapshot_multiplier / self.tick_length.as_secs_f64()
    }
}

impl Sim {
    /// Tick count and tick length the spell's dot would use right now
    pub fn dot_schedule(&self, spell: SpellId) -> Option<(u32, Duration)> {
        let s = &self.spells[spell.index()];
        let config = s.dot.as_ref()?;
        let ticks = (config.number_of_ticks as i64 + s.modifiers.dot_ticks as i64).max(0) as u32;
        let mut tick_length = s.modifiers.dot_tick_length_offset.apply(config.tick_length);
        if config.affected_by_cast_speed {
            tick_length = tick_length.div_f64(self.units[s.unit.index()].cast_speed());
        }
        Some((ticks, tick_length))
    }

    pub fn dot(&self, id: DotId) -> &Dot {
        &self.dots[id.index()]
    }

    /// Existing dot of a spell on a target
    pub fn spell_dot(&self, spell: SpellId, target: UnitId) -> Option<DotId> {
        self.spells[spell.index()].dots.get(&target).copied()
    }

    /// Dot of a spell on a target, created on first use
    pub fn dot_for(&mut self, spell: SpellId, target: UnitId) -> Option<DotId> {
        let s = &self.spells[spell.index()];
        if let Some(&existing) = s.dots.get(&target) {
            return Some(existing);
        }
        let config = s.dot.clone()?;
        let caster = s.unit;
        let channeled = s.flags.contains(SpellFlags::CHANNELED);

        let id = DotId(self.dots.len() as u32);
        let label = format!("{} [{}]", config.label, caster.index());
        let aura_config = AuraConfig::new(label, config.tick_length * config.number_of_ticks)
            .on_expire(move |sim, _| sim.on_dot_faded(id));
        let aura = self.insert_aura(target, aura_config);

        self.dots.push(Dot {
            id,
            spell,
            caster,
            target,
            aura,
            config,
            channeled,
            generation: 0,
            ticks_remaining: 0,
            total_ticks: 0,
            tick_count: 0,
            tick_length: Duration::ZERO,
            next_tick_at: Duration::ZERO,
            snapshot_base_damage: 0.0,
            snapshot_multiplier: 1.0,
        });
        self.spells[spell.index()].dots.insert(target, id);
        Some(id)
    }

    pub fn is_dot_active(&self, dot: DotId) -> bool {
        self.is_aura_active(self.dots[dot.index()].aura)
    }

    /// Apply or reapply a dot: snapshot, (re)activate its aura and restart ticking
    pub fn apply_dot(&mut self, dot: DotId) {
        let spell = self.dots[dot.index()].spell;
        let Some((ticks, tick_length)) = self.dot_schedule(spell) else {
            return;
        };
        if ticks == 0 || tick_length.is_zero() {
            tracing::debug!(spell = %self.spells[spell.index()].label, "dot modified down to nothing");
            return;
        }

        let now = self.now();
        let d = &mut self.dots[dot.index()];
        d.generation += 1;
        d.ticks_remaining = ticks;
        d.total_ticks = ticks;
        d.tick_count = 0;
        d.tick_length = tick_length;
        d.next_tick_at = now + tick_length;
        let generation = d.generation;
        let aura = d.aura;
        let caster = d.caster;
        let channeled = d.channeled;
        let on_snapshot = d.config.on_snapshot.clone();

        match on_snapshot {
            Some(f) => f(self, dot),
            None => self.snapshot_dot(dot),
        }

        self.set_aura_duration(aura, AuraDuration::Fixed(tick_length * ticks));
        self.activate_aura(aura);
        if channeled {
            self.units[caster.index()].channel = Some(dot);
        }
        self.schedule(now + tick_length, ActionPriority::DOT, move |sim| {
            sim.tick_dot(dot, generation)
        });
    }

    fn tick_dot(&mut self, dot: DotId, generation: u64) {
        let d = &mut self.dots[dot.index()];
        if d.generation != generation || d.ticks_remaining == 0 {
            return;
        }
        d.ticks_remaining -= 1;
        d.tick_count += 1;
        let on_tick = d.config.on_tick.clone();
        match on_tick {
            Some(f) => f(self, dot),
            None => self.deal_dot_tick(dot),
        }

        // The tick may have reapplied or cancelled the dot
        let d = &mut self.dots[dot.index()];
        if d.generation != generation {
            return;
        }
        if d.ticks_remaining == 0 {
            let aura = d.aura;
            self.deactivate_aura(aura);
        } else {
            d.next_tick_at += d.tick_length;
            let at = d.next_tick_at;
            self.schedule(at, ActionPriority::DOT, move |sim| sim.tick_dot(dot, generation));
        }
    }

    /// Default tick: snapshotted damage through the periodic pipeline
    pub fn deal_dot_tick(&mut self, dot: DotId) {
        let outcome = self.dots[dot.index()].config.tick_outcome;
        let result = self.calc_snapshot_tick(dot, outcome);
        self.deal_periodic_damage(&result);
    }

    fn on_dot_faded(&mut self, dot: DotId) {
        let d = &mut self.dots[dot.index()];
        d.generation += 1;
        d.ticks_remaining = 0;
        let caster = d.caster;
        let channel = &mut self.units[caster.index()].channel;
        if *channel == Some(dot) {
            *channel = None;
        }
    }

    /// Stop the unit's channel, if any
    pub fn cancel_channel(&mut self, unit: UnitId) {
        let Some(dot) = self.units[unit.index()].channel.take() else {
            return;
        };
        tracing::debug!(
            spell = %self.spells[self.dots[dot.index()].spell.index()].label,
            now_ms = self.now().as_millis() as u64,
            "channel cancelled"
        );
        let aura = self.dots[dot.index()].aura;
        self.deactivate_aura(aura);
        self.on_dot_faded(dot);
    }

    pub(crate) fn channel_interruptible_by(&self, channel: DotId, spell: SpellId) -> bool {
        self.dots[channel.index()]
            .config
            .interrupt_condition
            .as_ref()
            .is_some_and(|condition| condition(self, spell))
    }

    /// Shorten a running dot by `fraction` of its full duration, dropping
    /// the ticks that now fall past its end
    pub(crate) fn compress_dot(&mut self, dot: DotId, fraction: f64) {
        let d = &self.dots[dot.index()];
        let Some(last_tick) = d.expires_at() else {
            return;
        };
        let full = d.tick_length * d.total_ticks;
        let new_end = last_tick.saturating_sub(full.mul_f64(fraction.clamp(0.0, 1.0)));
        if new_end < d.next_tick_at {
            let caster = d.caster;
            let aura = d.aura;
            if d.channeled {
                self.cancel_channel(caster);
            } else {
                self.deactivate_aura(aura);
            }
            return;
        }

        let span = (new_end - d.next_tick_at).as_nanos();
        let kept = ((span / d.tick_length.as_nanos()) as u32 + 1).min(d.ticks_remaining);
        let dropped = d.ticks_remaining - kept;
        let expires = d.next_tick_at + d.tick_length * (kept - 1);
        let aura = d.aura;
        self.dots[dot.index()].ticks_remaining = kept;
        self.set_aura_expiry(aura, expires);
        tracing::debug!(
            spell = %self.spells[self.dots[dot.index()].spell.index()].label,
            dropped,
            now_ms = self.now().as_millis() as u64,
            "dot shortened"
        );
    }

    pub(crate) fn reset_dots(&mut self) {
        for dot in &mut self.dots {
            dot.generation += 1;
            dot.ticks_remaining = 0;
            dot.tick_count = 0;
        }
    }
}
