//! Auras - named, timed, stackable state on a unit
//!
//! An aura is registered once per (unit, label) and reused every iteration.
//! Activation starts its duration, fires its gain hook and switches on its
//! exclusive effects; deactivation zeroes stacks, rolls back exclusive
//! effects and fires its expire hook. Expiry is an ordinary scheduled
//! action that checks the aura is still due before deactivating it.

mod exclusive;
mod ppm;
mod proc;

pub use exclusive::{ExclusiveCategory, ExclusiveEffect, ExclusiveEffectConfig, ExclusiveFn};
pub use ppm::{DynamicProcManager, PpmManager};
pub use proc::{provenance_allows, ProcCallback, ProcCondition, ProcHandler, ProcRate, ProcSource, ProcTrigger};

use crate::error::CombatError;
use crate::outcome::SpellResult;
use crate::sim::{ActionPriority, Sim};
use crate::timer::Cooldown;
use crate::types::{ActionId, AuraId, BuildPhase, EffectId, SpellId, UnitId};
use smallvec::SmallVec;
use std::rc::Rc;
use std::time::Duration;

pub type AuraFn = Rc<dyn Fn(&mut Sim, AuraId)>;
pub type StacksFn = Rc<dyn Fn(&mut Sim, AuraId, u32, u32)>;
pub type ResultHookFn = Rc<dyn Fn(&mut Sim, AuraId, &SpellResult)>;
pub type SpellHookFn = Rc<dyn Fn(&mut Sim, AuraId, SpellId, UnitId)>;

/// How long an aura lasts once activated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuraDuration {
    Fixed(Duration),
    Permanent,
}

impl AuraDuration {
    fn expires_at(self, now: Duration) -> Option<Duration> {
        match self {
            AuraDuration::Fixed(d) => Some(now + d),
            AuraDuration::Permanent => None,
        }
    }
}

/// Callbacks an aura reacts with
#[derive(Clone, Default)]
pub struct AuraHooks {
    pub on_reset: Option<AuraFn>,
    pub on_gain: Option<AuraFn>,
    pub on_expire: Option<AuraFn>,
    /// Receives (old stacks, new stacks)
    pub on_stacks_change: Option<StacksFn>,
    pub on_spell_hit_dealt: Vec<ResultHookFn>,
    pub on_spell_hit_taken: Vec<ResultHookFn>,
    pub on_periodic_damage_dealt: Vec<ResultHookFn>,
    pub on_heal_dealt: Vec<ResultHookFn>,
    pub on_cast_complete: Vec<SpellHookFn>,
    pub on_apply_effects: Vec<SpellHookFn>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResultHook {
    SpellHitDealt,
    SpellHitTaken,
    PeriodicDamageDealt,
    HealDealt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SpellHook {
    CastComplete,
    ApplyEffects,
}

impl AuraHooks {
    fn result_hooks(&self, kind: ResultHook) -> &[ResultHookFn] {
        match kind {
            ResultHook::SpellHitDealt => &self.on_spell_hit_dealt,
            ResultHook::SpellHitTaken => &self.on_spell_hit_taken,
            ResultHook::PeriodicDamageDealt => &self.on_periodic_damage_dealt,
            ResultHook::HealDealt => &self.on_heal_dealt,
        }
    }

    fn spell_hooks(&self, kind: SpellHook) -> &[SpellHookFn] {
        match kind {
            SpellHook::CastComplete => &self.on_cast_complete,
            SpellHook::ApplyEffects => &self.on_apply_effects,
        }
    }
}

/// Definition of an aura
#[derive(Clone)]
pub struct AuraConfig {
    pub label: String,
    pub action_id: Option<ActionId>,
    pub duration: AuraDuration,
    /// Zero means the aura does not stack
    pub max_stacks: u32,
    pub build_phase: Option<BuildPhase>,
    pub hooks: AuraHooks,
}

impl AuraConfig {
    pub fn new(label: impl Into<String>, duration: Duration) -> Self {
        AuraConfig {
            label: label.into(),
            action_id: None,
            duration: AuraDuration::Fixed(duration),
            max_stacks: 0,
            build_phase: None,
            hooks: AuraHooks::default(),
        }
    }

    /// An aura that never expires on its own
    pub fn permanent(label: impl Into<String>) -> Self {
        AuraConfig {
            duration: AuraDuration::Permanent,
            ..AuraConfig::new(label, Duration::ZERO)
        }
    }

    pub fn with_action_id(mut self, action_id: ActionId) -> Self {
        self.action_id = Some(action_id);
        self
    }

    pub fn with_max_stacks(mut self, max_stacks: u32) -> Self {
        self.max_stacks = max_stacks;
        self
    }

    /// Activate at the start of every iteration in the given phase
    pub fn with_build_phase(mut self, phase: BuildPhase) -> Self {
        self.build_phase = Some(phase);
        self
    }

    pub fn on_reset(mut self, f: impl Fn(&mut Sim, AuraId) + 'static) -> Self {
        self.hooks.on_reset = Some(Rc::new(f));
        self
    }

    pub fn on_gain(mut self, f: impl Fn(&mut Sim, AuraId) + 'static) -> Self {
        self.hooks.on_gain = Some(Rc::new(f));
        self
    }

    pub fn on_expire(mut self, f: impl Fn(&mut Sim, AuraId) + 'static) -> Self {
        self.hooks.on_expire = Some(Rc::new(f));
        self
    }

    pub fn on_stacks_change(mut self, f: impl Fn(&mut Sim, AuraId, u32, u32) + 'static) -> Self {
        self.hooks.on_stacks_change = Some(Rc::new(f));
        self
    }

    pub fn on_spell_hit_dealt(mut self, f: impl Fn(&mut Sim, AuraId, &SpellResult) + 'static) -> Self {
        self.hooks.on_spell_hit_dealt.push(Rc::new(f));
        self
    }

    pub fn on_spell_hit_taken(mut self, f: impl Fn(&mut Sim, AuraId, &SpellResult) + 'static) -> Self {
        self.hooks.on_spell_hit_taken.push(Rc::new(f));
        self
    }

    pub fn on_periodic_damage_dealt(
        mut self,
        f: impl Fn(&mut Sim, AuraId, &SpellResult) + 'static,
    ) -> Self {
        self.hooks.on_periodic_damage_dealt.push(Rc::new(f));
        self
    }

    pub fn on_heal_dealt(mut self, f: impl Fn(&mut Sim, AuraId, &SpellResult) + 'static) -> Self {
        self.hooks.on_heal_dealt.push(Rc::new(f));
        self
    }

    pub fn on_cast_complete(mut self, f: impl Fn(&mut Sim, AuraId, SpellId, UnitId) + 'static) -> Self {
        self.hooks.on_cast_complete.push(Rc::new(f));
        self
    }

    pub fn on_apply_effects(mut self, f: impl Fn(&mut Sim, AuraId, SpellId, UnitId) + 'static) -> Self {
        self.hooks.on_apply_effects.push(Rc::new(f));
        self
    }

    fn validate(&self) -> Result<(), CombatError> {
        if self.duration == AuraDuration::Fixed(Duration::ZERO) {
            return Err(CombatError::ZeroDurationAura {
                label: self.label.clone(),
            });
        }
        if self.hooks.on_stacks_change.is_some() && self.max_stacks == 0 {
            return Err(CombatError::MissingMaxStacks {
                label: self.label.clone(),
            });
        }
        Ok(())
    }
}

/// Runtime aura record
pub struct Aura {
    pub id: AuraId,
    pub unit: UnitId,
    pub label: String,
    pub action_id: Option<ActionId>,
    pub(crate) duration: AuraDuration,
    max_stacks: u32,
    build_phase: Option<BuildPhase>,
    pub(crate) hooks: AuraHooks,
    pub(crate) icd: Option<Cooldown>,
    pub(crate) effects: Vec<EffectId>,

    active: bool,
    stacks: u32,
    started_at: Duration,
    expires: Option<Duration>,

    // === Metrics ===
    uptime: Duration,
    activations: u64,
}

impl Aura {
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn stacks(&self) -> u32 {
        self.stacks
    }

    pub fn max_stacks(&self) -> u32 {
        self.max_stacks
    }

    pub fn expires_at(&self) -> Option<Duration> {
        self.expires
    }

    pub fn duration(&self) -> AuraDuration {
        self.duration
    }

    pub fn build_phase(&self) -> Option<BuildPhase> {
        self.build_phase
    }

    pub fn activations(&self) -> u64 {
        self.activations
    }

    /// Time remaining, `None` for permanent or inactive auras
    pub fn remaining(&self, now: Duration) -> Option<Duration> {
        if !self.active {
            return None;
        }
        self.expires.map(|e| e.saturating_sub(now))
    }

    /// Total active time, including the current activation
    pub fn uptime(&self, now: Duration) -> Duration {
        if self.active {
            self.uptime + now.saturating_sub(self.started_at)
        } else {
            self.uptime
        }
    }
}

impl Sim {
    /// Register an aura, or return the existing one with the same label
    pub fn register_aura(&mut self, unit: UnitId, config: AuraConfig) -> Result<AuraId, CombatError> {
        if unit.index() >= self.units.len() {
            return Err(CombatError::UnknownUnit(unit));
        }
        if let Some(&existing) = self.units[unit.index()].aura_labels.get(&config.label) {
            return Ok(existing);
        }
        config.validate()?;
        Ok(self.insert_aura(unit, config))
    }

    /// Registration for internally built auras whose config is known valid
    pub(crate) fn insert_aura(&mut self, unit: UnitId, config: AuraConfig) -> AuraId {
        if let Some(&existing) = self.units[unit.index()].aura_labels.get(&config.label) {
            return existing;
        }
        let id = AuraId(self.auras.len() as u32);
        let u = &mut self.units[unit.index()];
        u.aura_labels.insert(config.label.clone(), id);
        u.auras.push(id);
        self.auras.push(Aura {
            id,
            unit,
            label: config.label,
            action_id: config.action_id,
            duration: config.duration,
            max_stacks: config.max_stacks,
            build_phase: config.build_phase,
            hooks: config.hooks,
            icd: None,
            effects: Vec::new(),
            active: false,
            stacks: 0,
            started_at: Duration::ZERO,
            expires: None,
            uptime: Duration::ZERO,
            activations: 0,
        });
        id
    }

    pub fn aura(&self, id: AuraId) -> &Aura {
        &self.auras[id.index()]
    }

    pub fn aura_by_label(&self, unit: UnitId, label: &str) -> Option<AuraId> {
        self.units[unit.index()].aura_labels.get(label).copied()
    }

    pub fn is_aura_active(&self, id: AuraId) -> bool {
        self.auras[id.index()].active
    }

    pub fn aura_stacks(&self, id: AuraId) -> u32 {
        self.auras[id.index()].stacks
    }

    /// Activate, or refresh the duration if already active
    pub fn activate_aura(&mut self, id: AuraId) {
        if self.auras[id.index()].active {
            self.refresh_aura(id);
            return;
        }
        let now = self.now();
        let aura = &mut self.auras[id.index()];
        aura.active = true;
        aura.started_at = now;
        aura.activations += 1;
        aura.expires = aura.duration.expires_at(now);
        let expires = aura.expires;
        let on_gain = aura.hooks.on_gain.clone();
        let effects = aura.effects.clone();
        tracing::debug!(aura = %aura.label, unit = %aura.unit, now_ms = now.as_millis() as u64, "aura gained");

        if let Some(at) = expires {
            self.schedule_expiry(id, at);
        }
        if let Some(f) = on_gain {
            f(self, id);
        }
        for effect in effects {
            self.exclusive_insert(effect);
        }
    }

    /// Restart the duration of an active aura
    pub fn refresh_aura(&mut self, id: AuraId) {
        let now = self.now();
        let aura = &mut self.auras[id.index()];
        if !aura.active {
            return;
        }
        if let Some(at) = aura.duration.expires_at(now) {
            aura.expires = Some(at);
            self.schedule_expiry(id, at);
        }
    }

    /// Set the duration used by future activations and refreshes
    pub fn set_aura_duration(&mut self, id: AuraId, duration: AuraDuration) {
        self.auras[id.index()].duration = duration;
    }

    /// Move the expiry of an active aura to an absolute time
    pub fn set_aura_expiry(&mut self, id: AuraId, at: Duration) {
        let aura = &mut self.auras[id.index()];
        if !aura.active {
            return;
        }
        aura.expires = Some(at);
        self.schedule_expiry(id, at);
    }

    fn schedule_expiry(&mut self, id: AuraId, at: Duration) {
        self.schedule(at, ActionPriority::EXPIRE, move |sim| {
            let aura = &sim.auras[id.index()];
            if aura.active && aura.expires == Some(at) {
                sim.deactivate_aura(id);
            }
        });
    }

    pub fn deactivate_aura(&mut self, id: AuraId) {
        let now = self.now();
        let aura = &mut self.auras[id.index()];
        if !aura.active {
            return;
        }
        aura.active = false;
        aura.uptime += now.saturating_sub(aura.started_at);
        aura.expires = None;
        let old_stacks = std::mem::take(&mut aura.stacks);
        let on_stacks = aura.hooks.on_stacks_change.clone();
        let on_expire = aura.hooks.on_expire.clone();
        let effects = aura.effects.clone();
        tracing::debug!(aura = %aura.label, unit = %aura.unit, now_ms = now.as_millis() as u64, "aura faded");

        if old_stacks > 0 {
            if let Some(f) = on_stacks {
                f(self, id, old_stacks, 0);
            }
        }
        for effect in effects {
            self.exclusive_remove(effect);
        }
        if let Some(f) = on_expire {
            f(self, id);
        }
    }

    /// Set the stack count, clamped to `[0, max]`
    ///
    /// An inactive aura is activated first when the clamped count is
    /// positive; reaching zero deactivates it. The stacks hook fires once,
    /// only if the count actually changes.
    pub fn set_stacks(&mut self, id: AuraId, stacks: i32) {
        let aura = &self.auras[id.index()];
        if aura.max_stacks == 0 {
            tracing::warn!(aura = %aura.label, "stacks set on an aura without max stacks");
            return;
        }
        let new = stacks.clamp(0, aura.max_stacks as i32) as u32;
        if !aura.active {
            if new == 0 {
                return;
            }
            self.activate_aura(id);
        }

        let aura = &mut self.auras[id.index()];
        if !aura.active || aura.stacks == new {
            return;
        }
        let old = aura.stacks;
        aura.stacks = new;
        let on_stacks = aura.hooks.on_stacks_change.clone();
        if let Some(f) = on_stacks {
            f(self, id, old, new);
        }
        if new == 0 {
            self.deactivate_aura(id);
        }
    }

    pub fn add_stack(&mut self, id: AuraId) {
        let stacks = self.auras[id.index()].stacks as i32;
        self.set_stacks(id, stacks + 1);
    }

    pub fn remove_stack(&mut self, id: AuraId) {
        let stacks = self.auras[id.index()].stacks as i32;
        self.set_stacks(id, stacks - 1);
    }

    // === Hook dispatch ===

    pub(crate) fn dispatch_result_hooks(&mut self, unit: UnitId, kind: ResultHook, result: &SpellResult) {
        let mut calls: SmallVec<[(AuraId, ResultHookFn); 8]> = SmallVec::new();
        for &aura_id in &self.units[unit.index()].auras {
            let aura = &self.auras[aura_id.index()];
            if aura.active {
                calls.extend(aura.hooks.result_hooks(kind).iter().map(|h| (aura_id, h.clone())));
            }
        }
        for (aura_id, hook) in calls {
            if self.auras[aura_id.index()].active {
                hook(self, aura_id, result);
            }
        }
    }

    pub(crate) fn dispatch_spell_hooks(&mut self, unit: UnitId, kind: SpellHook, spell: SpellId, target: UnitId) {
        let mut calls: SmallVec<[(AuraId, SpellHookFn); 8]> = SmallVec::new();
        for &aura_id in &self.units[unit.index()].auras {
            let aura = &self.auras[aura_id.index()];
            if aura.active {
                calls.extend(aura.hooks.spell_hooks(kind).iter().map(|h| (aura_id, h.clone())));
            }
        }
        for (aura_id, hook) in calls {
            if self.auras[aura_id.index()].active {
                hook(self, aura_id, spell, target);
            }
        }
    }

    // === Iteration lifecycle ===

    pub(crate) fn deactivate_all_auras(&mut self) {
        for index in 0..self.auras.len() {
            if self.auras[index].active {
                self.deactivate_aura(AuraId(index as u32));
            }
        }
    }

    pub(crate) fn run_reset_hooks(&mut self) {
        for index in 0..self.auras.len() {
            let hook = self.auras[index].hooks.on_reset.clone();
            if let Some(f) = hook {
                f(self, AuraId(index as u32));
            }
        }
    }

    pub(crate) fn activate_build_phase_auras(&mut self) {
        let mut phased: Vec<(i32, AuraId)> = self
            .auras
            .iter()
            .filter_map(|a| a.build_phase.map(|p| (p.priority(), a.id)))
            .collect();
        phased.sort_by_key(|(priority, _)| *priority);
        for (_, id) in phased {
            self.activate_aura(id);
        }
    }
}
