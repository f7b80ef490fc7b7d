//! Spells - registered actions with mutable runtime modifiers
//!
//! A spell is registered once per unit from a [`SpellConfig`]. Its
//! [`SpellModifiers`] start from the config's base values and are changed
//! afterwards only by spell mods.

mod cast;
mod damage;
mod dot;
mod modifiers;
mod pushback;

pub use cast::{Cast, CastConfig, Hardcast};
pub use dot::{Dot, DotConfig, DotInterruptFn, DotTickFn};
pub use modifiers::{DamageMultipliers, MultiplierPair, SpellModifiers};

use crate::error::CombatError;
use crate::flags::{ProcMask, SpellFlags, SpellSchool};
use crate::outcome::SpellMetrics;
use crate::sim::Sim;
use crate::timer::Cooldown;
use crate::types::{ActionId, DefenseType, DotId, ResourceKind, SpellId, TimerId, UnitId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

pub type SpellEffectFn = Rc<dyn Fn(&mut Sim, SpellId, UnitId)>;
pub type CastConditionFn = Rc<dyn Fn(&Sim, SpellId, UnitId) -> bool>;
pub type ModifyCastFn = Rc<dyn Fn(&Sim, SpellId, &mut Cast)>;

/// Resource cost of a spell before modifiers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpellCost {
    pub resource: ResourceKind,
    pub amount: f64,
}

impl SpellCost {
    pub fn new(resource: ResourceKind, amount: f64) -> Self {
        SpellCost { resource, amount }
    }

    pub fn mana(amount: f64) -> Self {
        SpellCost::new(ResourceKind::Mana, amount)
    }
}

/// Cooldown declaration; `timer: None` allocates a private timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownConfig {
    pub timer: Option<TimerId>,
    pub duration: Duration,
}

impl CooldownConfig {
    pub fn new(duration: Duration) -> Self {
        CooldownConfig {
            timer: None,
            duration,
        }
    }

    /// A cooldown on a timer other spells also use
    pub fn shared(timer: TimerId, duration: Duration) -> Self {
        CooldownConfig {
            timer: Some(timer),
            duration,
        }
    }
}

/// Definition of a spell
#[derive(Clone)]
pub struct SpellConfig {
    pub label: String,
    pub action_id: ActionId,
    pub school: SpellSchool,
    pub proc_mask: ProcMask,
    pub flags: SpellFlags,
    pub class_mask: u64,
    pub defense_type: DefenseType,

    pub cost: Option<SpellCost>,
    pub cast: CastConfig,
    pub cooldown: Option<CooldownConfig>,
    pub shared_cooldown: Option<CooldownConfig>,

    // === Base modifiers ===
    /// Multiplicative damage factor; anything but 1.0 needs a proc mask
    pub damage_multiplier: f64,
    pub damage_multiplier_additive: f64,
    pub coefficient: f64,
    pub bonus_crit_percent: f64,
    pub bonus_hit_percent: f64,
    pub crit_damage_bonus: f64,
    pub threat_multiplier: f64,
    /// Chance in `[0, 1]` to ignore a pushback
    pub pushback_reduction: f64,

    pub dot: Option<DotConfig>,
    pub apply_effects: Option<SpellEffectFn>,
    pub extra_cast_condition: Option<CastConditionFn>,
    pub modify_cast: Option<ModifyCastFn>,
}

impl SpellConfig {
    pub fn new(label: impl Into<String>, action_id: ActionId) -> Self {
        SpellConfig {
            label: label.into(),
            action_id,
            school: SpellSchool::PHYSICAL,
            proc_mask: ProcMask::empty(),
            flags: SpellFlags::empty(),
            class_mask: 0,
            defense_type: DefenseType::None,
            cost: None,
            cast: CastConfig::default(),
            cooldown: None,
            shared_cooldown: None,
            damage_multiplier: 1.0,
            damage_multiplier_additive: 0.0,
            coefficient: 0.0,
            bonus_crit_percent: 0.0,
            bonus_hit_percent: 0.0,
            crit_damage_bonus: 0.0,
            threat_multiplier: 1.0,
            pushback_reduction: 0.0,
            dot: None,
            apply_effects: None,
            extra_cast_condition: None,
            modify_cast: None,
        }
    }

    pub fn with_school(mut self, school: SpellSchool) -> Self {
        self.school = school;
        self
    }

    pub fn with_proc_mask(mut self, mask: ProcMask) -> Self {
        self.proc_mask = mask;
        self
    }

    pub fn with_flags(mut self, flags: SpellFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_class_mask(mut self, mask: u64) -> Self {
        self.class_mask = mask;
        self
    }

    pub fn with_defense_type(mut self, defense_type: DefenseType) -> Self {
        self.defense_type = defense_type;
        self
    }

    pub fn with_cost(mut self, cost: SpellCost) -> Self {
        self.cost = Some(cost);
        self
    }

    pub fn with_cast(mut self, cast: CastConfig) -> Self {
        self.cast = cast;
        self
    }

    pub fn with_cooldown(mut self, cooldown: CooldownConfig) -> Self {
        self.cooldown = Some(cooldown);
        self
    }

    pub fn with_shared_cooldown(mut self, cooldown: CooldownConfig) -> Self {
        self.shared_cooldown = Some(cooldown);
        self
    }

    pub fn with_damage_multiplier(mut self, multiplier: f64) -> Self {
        self.damage_multiplier = multiplier;
        self
    }

    pub fn with_coefficient(mut self, coefficient: f64) -> Self {
        self.coefficient = coefficient;
        self
    }

    pub fn with_bonus_crit_percent(mut self, percent: f64) -> Self {
        self.bonus_crit_percent = percent;
        self
    }

    pub fn with_threat_multiplier(mut self, multiplier: f64) -> Self {
        self.threat_multiplier = multiplier;
        self
    }

    pub fn with_pushback_reduction(mut self, reduction: f64) -> Self {
        self.pushback_reduction = reduction;
        self
    }

    pub fn with_dot(mut self, dot: DotConfig) -> Self {
        self.dot = Some(dot);
        self
    }

    pub fn with_effects(mut self, f: impl Fn(&mut Sim, SpellId, UnitId) + 'static) -> Self {
        self.apply_effects = Some(Rc::new(f));
        self
    }

    pub fn with_cast_condition(mut self, f: impl Fn(&Sim, SpellId, UnitId) -> bool + 'static) -> Self {
        self.extra_cast_condition = Some(Rc::new(f));
        self
    }

    pub fn with_modify_cast(mut self, f: impl Fn(&Sim, SpellId, &mut Cast) + 'static) -> Self {
        self.modify_cast = Some(Rc::new(f));
        self
    }

    fn validate(&self) -> Result<(), CombatError> {
        let multiplied = self.damage_multiplier != 1.0 || self.damage_multiplier_additive != 0.0;
        if multiplied && self.proc_mask.is_empty() {
            return Err(CombatError::DamageMultiplierWithoutProcMask {
                label: self.label.clone(),
                multiplier: self.damage_multiplier * (1.0 + self.damage_multiplier_additive),
            });
        }
        for cooldown in [self.cooldown, self.shared_cooldown].into_iter().flatten() {
            if cooldown.duration.is_zero() {
                return Err(CombatError::CooldownWithoutDuration {
                    label: self.label.clone(),
                });
            }
        }
        if let Some(dot) = &self.dot {
            if dot.number_of_ticks == 0 || dot.tick_length.is_zero() {
                return Err(CombatError::EmptyDot {
                    label: self.label.clone(),
                });
            }
        }
        Ok(())
    }

    fn base_modifiers(&self) -> SpellModifiers {
        let mut modifiers = SpellModifiers::default();
        modifiers.damage.base.multiplicative = self.damage_multiplier;
        modifiers.damage.base.additive = self.damage_multiplier_additive;
        modifiers.coefficient = self.coefficient;
        modifiers.bonus_crit_percent = self.bonus_crit_percent;
        modifiers.bonus_hit_percent = self.bonus_hit_percent;
        modifiers.crit_damage_bonus = self.crit_damage_bonus;
        modifiers.threat_multiplier = self.threat_multiplier;
        modifiers
    }
}

/// Runtime spell record
pub struct Spell {
    pub id: SpellId,
    pub unit: UnitId,
    pub label: String,
    pub action_id: ActionId,
    pub school: SpellSchool,
    pub proc_mask: ProcMask,
    pub flags: SpellFlags,
    pub class_mask: u64,
    pub defense_type: DefenseType,

    pub(crate) cost: Option<SpellCost>,
    pub(crate) cast_config: CastConfig,
    pub(crate) cur_cast: Cast,
    pub(crate) cooldown: Option<Cooldown>,
    pub(crate) shared_cooldown: Option<Cooldown>,
    pub(crate) pushback_reduction: f64,
    pub(crate) modifiers: SpellModifiers,
    pub(crate) metrics: SpellMetrics,

    pub(crate) dot: Option<Rc<DotConfig>>,
    pub(crate) dots: HashMap<UnitId, DotId>,
    pub(crate) apply_effects: Option<SpellEffectFn>,
    pub(crate) extra_cast_condition: Option<CastConditionFn>,
    pub(crate) modify_cast: Option<ModifyCastFn>,
}

impl Spell {
    pub fn modifiers(&self) -> &SpellModifiers {
        &self.modifiers
    }

    pub fn metrics(&self) -> &SpellMetrics {
        &self.metrics
    }

    pub fn cost(&self) -> Option<SpellCost> {
        self.cost
    }

    /// Cost after modifiers
    pub fn current_cost(&self) -> f64 {
        self.cost.map_or(0.0, |c| self.modifiers.apply_cost(c.amount))
    }

    pub fn cooldown(&self) -> Option<Cooldown> {
        self.cooldown
    }

    pub fn shared_cooldown(&self) -> Option<Cooldown> {
        self.shared_cooldown
    }

    /// Parameters of the most recent cast
    pub fn current_cast(&self) -> &Cast {
        &self.cur_cast
    }

    pub fn cast_config(&self) -> &CastConfig {
        &self.cast_config
    }

    pub fn has_dot(&self) -> bool {
        self.dot.is_some()
    }

    pub fn is_channeled(&self) -> bool {
        self.flags.contains(SpellFlags::CHANNELED)
    }

    pub fn is_swapped(&self) -> bool {
        self.flags.contains(SpellFlags::SWAPPED)
    }
}

impl Sim {
    /// Register a spell on a unit
    ///
    /// Every active spell mod of the unit that matches is applied before the
    /// spell is returned.
    pub fn register_spell(&mut self, unit: UnitId, config: SpellConfig) -> Result<SpellId, CombatError> {
        let limit = self.constants.limits.max_spells_per_unit;
        let owner = self.units.get(unit.index()).ok_or(CombatError::UnknownUnit(unit))?;
        if owner.spells.len() >= limit {
            return Err(CombatError::TooManySpells { unit, limit });
        }
        config.validate()?;

        let cooldown = config
            .cooldown
            .map(|cd| self.cooldown_from(unit, cd))
            .transpose()?;
        let shared_cooldown = config
            .shared_cooldown
            .map(|cd| self.cooldown_from(unit, cd))
            .transpose()?;

        let id = SpellId(self.spells.len() as u32);
        let modifiers = config.base_modifiers();
        tracing::debug!(spell = %config.label, unit = %unit, action = %config.action_id, "spell registered");
        self.spells.push(Spell {
            id,
            unit,
            label: config.label,
            action_id: config.action_id,
            school: config.school,
            proc_mask: config.proc_mask,
            flags: config.flags,
            class_mask: config.class_mask,
            defense_type: config.defense_type,
            cost: config.cost,
            cast_config: config.cast,
            cur_cast: Cast::default(),
            cooldown,
            shared_cooldown,
            pushback_reduction: config.pushback_reduction.clamp(0.0, 1.0),
            modifiers,
            metrics: SpellMetrics::new(),
            dot: config.dot.map(Rc::new),
            dots: HashMap::new(),
            apply_effects: config.apply_effects,
            extra_cast_condition: config.extra_cast_condition,
            modify_cast: config.modify_cast,
        });
        self.units[unit.index()].spells.push(id);
        self.apply_existing_mods(id);
        Ok(id)
    }

    fn cooldown_from(&mut self, unit: UnitId, config: CooldownConfig) -> Result<Cooldown, CombatError> {
        let timer = match config.timer {
            Some(timer) => timer,
            None => self.new_timer(unit)?,
        };
        Ok(Cooldown {
            timer,
            duration: config.duration,
        })
    }

    pub fn spell(&self, id: SpellId) -> &Spell {
        &self.spells[id.index()]
    }

    pub fn spells(&self) -> &[Spell] {
        &self.spells
    }

    pub fn spell_by_label(&self, unit: UnitId, label: &str) -> Option<SpellId> {
        self.units[unit.index()]
            .spells
            .iter()
            .copied()
            .find(|id| self.spells[id.index()].label == label)
    }

    /// Mark a spell unavailable (or available again) around an item swap
    pub fn set_spell_swapped(&mut self, spell: SpellId, swapped: bool) {
        self.spells[spell.index()].flags.set(SpellFlags::SWAPPED, swapped);
    }

    pub(crate) fn reset_spells(&mut self) {
        for spell in &mut self.spells {
            spell.cur_cast = Cast::default();
        }
    }
}
