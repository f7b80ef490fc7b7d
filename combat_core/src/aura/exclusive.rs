//! Exclusive effects - only the strongest effect of a category is live
//!
//! Each unit owns named categories. An aura contributes effects to
//! categories; while the aura is active its effect is queued in priority
//! order and only the head of the queue has its gain side effects applied.
//! A change of head always rolls back the old holder before applying the
//! new one. Equal priorities keep the incumbent.

use crate::sim::Sim;
use crate::types::{AuraId, CategoryId, EffectId, UnitId};
use std::rc::Rc;

pub type ExclusiveFn = Rc<dyn Fn(&mut Sim, EffectId)>;

/// Definition of an exclusive effect
#[derive(Clone)]
pub struct ExclusiveEffectConfig {
    pub category: String,
    pub priority: f64,
    pub on_gain: Option<ExclusiveFn>,
    pub on_expire: Option<ExclusiveFn>,
}

impl ExclusiveEffectConfig {
    pub fn new(category: impl Into<String>, priority: f64) -> Self {
        ExclusiveEffectConfig {
            category: category.into(),
            priority,
            on_gain: None,
            on_expire: None,
        }
    }

    pub fn on_gain(mut self, f: impl Fn(&mut Sim, EffectId) + 'static) -> Self {
        self.on_gain = Some(Rc::new(f));
        self
    }

    pub fn on_expire(mut self, f: impl Fn(&mut Sim, EffectId) + 'static) -> Self {
        self.on_expire = Some(Rc::new(f));
        self
    }
}

pub struct ExclusiveEffect {
    pub id: EffectId,
    pub aura: AuraId,
    pub category: CategoryId,
    priority: f64,
    on_gain: Option<ExclusiveFn>,
    on_expire: Option<ExclusiveFn>,
    live: bool,
}

impl ExclusiveEffect {
    pub fn priority(&self) -> f64 {
        self.priority
    }

    /// Whether this effect's gain side effects are currently applied
    pub fn is_live(&self) -> bool {
        self.live
    }
}

pub struct ExclusiveCategory {
    pub id: CategoryId,
    pub unit: UnitId,
    pub name: String,
    /// Queued effects, highest priority first
    entries: Vec<EffectId>,
    live: Option<EffectId>,
}

impl ExclusiveCategory {
    pub fn live(&self) -> Option<EffectId> {
        self.live
    }

    pub fn queued(&self) -> &[EffectId] {
        &self.entries
    }
}

impl Sim {
    /// Category of a unit by name, created on first use
    pub fn exclusive_category(&mut self, unit: UnitId, name: &str) -> CategoryId {
        if let Some(&id) = self.units[unit.index()].exclusive_categories.get(name) {
            return id;
        }
        let id = CategoryId(self.categories.len() as u32);
        self.categories.push(ExclusiveCategory {
            id,
            unit,
            name: name.to_string(),
            entries: Vec::new(),
            live: None,
        });
        self.units[unit.index()]
            .exclusive_categories
            .insert(name.to_string(), id);
        id
    }

    pub fn category(&self, id: CategoryId) -> &ExclusiveCategory {
        &self.categories[id.index()]
    }

    pub fn exclusive_effect(&self, id: EffectId) -> &ExclusiveEffect {
        &self.effects[id.index()]
    }

    /// Attach an exclusive effect to an aura, in a category on the aura's unit
    pub fn register_exclusive_effect(&mut self, aura: AuraId, config: ExclusiveEffectConfig) -> EffectId {
        let unit = self.auras[aura.index()].unit;
        let category = self.exclusive_category(unit, &config.category);
        let id = EffectId(self.effects.len() as u32);
        self.effects.push(ExclusiveEffect {
            id,
            aura,
            category,
            priority: config.priority,
            on_gain: config.on_gain,
            on_expire: config.on_expire,
            live: false,
        });
        self.auras[aura.index()].effects.push(id);
        if self.auras[aura.index()].is_active() {
            self.exclusive_insert(id);
        }
        id
    }

    /// Change an effect's priority, re-ranking it if queued
    pub fn set_exclusive_priority(&mut self, effect: EffectId, priority: f64) {
        let category = self.effects[effect.index()].category;
        let queued = self.categories[category.index()].entries.contains(&effect);
        if queued {
            self.categories[category.index()].entries.retain(|&e| e != effect);
        }
        self.effects[effect.index()].priority = priority;
        if queued {
            self.queue_effect(effect);
            self.settle_category(category);
        }
    }

    pub(crate) fn exclusive_insert(&mut self, effect: EffectId) {
        let category = self.effects[effect.index()].category;
        if self.categories[category.index()].entries.contains(&effect) {
            return;
        }
        self.queue_effect(effect);
        self.settle_category(category);
    }

    pub(crate) fn exclusive_remove(&mut self, effect: EffectId) {
        let category = self.effects[effect.index()].category;
        self.categories[category.index()].entries.retain(|&e| e != effect);
        self.settle_category(category);
    }

    // Before the first entry of strictly lower priority, so ties keep the incumbent
    fn queue_effect(&mut self, effect: EffectId) {
        let priority = self.effects[effect.index()].priority;
        let category = self.effects[effect.index()].category;
        let effects = &self.effects;
        let entries = &mut self.categories[category.index()].entries;
        let position = entries
            .iter()
            .position(|e| effects[e.index()].priority < priority)
            .unwrap_or(entries.len());
        entries.insert(position, effect);
    }

    fn settle_category(&mut self, category: CategoryId) {
        let cat = &self.categories[category.index()];
        let head = cat.entries.first().copied();
        let previous = cat.live;
        if head == previous {
            return;
        }
        self.categories[category.index()].live = head;

        if let Some(old) = previous {
            self.effects[old.index()].live = false;
            let on_expire = self.effects[old.index()].on_expire.clone();
            if let Some(f) = on_expire {
                f(self, old);
            }
        }
        if let Some(new) = head {
            self.effects[new.index()].live = true;
            let on_gain = self.effects[new.index()].on_gain.clone();
            if let Some(f) = on_gain {
                f(self, new);
            }
        }
        tracing::trace!(
            category = %self.categories[category.index()].name,
            previous = ?previous,
            live = ?head,
            "exclusive category settled"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aura::AuraConfig;
    use crate::config::CombatConstants;
    use crate::sim::SeededRandom;
    use crate::types::UnitKind;
    use crate::unit::UnitConfig;
    use std::cell::RefCell;
    use std::time::Duration;

    fn debuff(sim: &mut Sim, target: UnitId, label: &'static str, priority: f64, log: &Rc<RefCell<Vec<String>>>) -> AuraId {
        let aura = sim
            .register_aura(target, AuraConfig::new(label, Duration::from_secs(30)))
            .unwrap();
        let (gain, expire) = (log.clone(), log.clone());
        sim.register_exclusive_effect(
            aura,
            ExclusiveEffectConfig::new("Armor Reduction", priority)
                .on_gain(move |_, _| gain.borrow_mut().push(format!("+{label}")))
                .on_expire(move |_, _| expire.borrow_mut().push(format!("-{label}"))),
        );
        aura
    }

    fn setup() -> (Sim, UnitId) {
        let mut sim = Sim::new(CombatConstants::default(), SeededRandom::new(2));
        let boss = sim.add_unit(UnitConfig::new("boss", UnitKind::Enemy, 63));
        sim.reset();
        (sim, boss)
    }

    #[test]
    fn test_equal_priority_keeps_incumbent() {
        let (mut sim, boss) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = debuff(&mut sim, boss, "A", 5.0, &log);
        let b = debuff(&mut sim, boss, "B", 5.0, &log);
        sim.activate_aura(a);
        sim.activate_aura(b);
        assert_eq!(*log.borrow(), vec!["+A"]);

        sim.deactivate_aura(a);
        assert_eq!(*log.borrow(), vec!["+A", "-A", "+B"]);
    }

    #[test]
    fn test_lower_priority_never_goes_live_over_higher() {
        let (mut sim, boss) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));
        let strong = debuff(&mut sim, boss, "Strong", 10.0, &log);
        let weak = debuff(&mut sim, boss, "Weak", 1.0, &log);
        sim.activate_aura(strong);
        sim.activate_aura(weak);
        sim.deactivate_aura(weak);
        assert_eq!(*log.borrow(), vec!["+Strong"]);
    }

    #[test]
    fn test_priority_change_reorders() {
        let (mut sim, boss) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = debuff(&mut sim, boss, "A", 2.0, &log);
        let b = debuff(&mut sim, boss, "B", 1.0, &log);
        sim.activate_aura(a);
        sim.activate_aura(b);
        let b_effect = sim.aura(b).effects[0];
        sim.set_exclusive_priority(b_effect, 3.0);
        assert_eq!(*log.borrow(), vec!["+A", "-A", "+B"]);
        assert!(sim.exclusive_effect(b_effect).is_live());
        let category = sim.exclusive_effect(b_effect).category;
        assert_eq!(sim.category(category).live(), Some(b_effect));
    }
}
