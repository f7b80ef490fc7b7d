//! The simulation context
//!
//! [`Sim`] owns every unit, spell, aura, modifier and periodic effect in
//! arenas addressed by typed handles, plus the clock, the pending action
//! queue and the random source. Callbacks receive `&mut Sim` and a handle,
//! so there is no shared ownership between records.

mod queue;
mod random;

pub use queue::{Action, ActionPriority};
pub use random::{LabeledRandom, RandomSource, ScriptedRandom, SeededRandom};

use crate::attack_table::AttackTable;
use crate::aura::{Aura, ExclusiveCategory, ExclusiveEffect};
use crate::config::CombatConstants;
use crate::spell::{Dot, Spell};
use crate::spell_mod::SpellMod;
use crate::types::UnitId;
use crate::unit::Unit;
use queue::EventQueue;
use std::collections::HashMap;
use std::time::Duration;

pub struct Sim {
    now: Duration,
    iteration: u64,
    elapsed_total: Duration,
    pub(crate) constants: CombatConstants,
    random: Box<dyn RandomSource>,
    queue: EventQueue,

    pub(crate) units: Vec<Unit>,
    pub(crate) spells: Vec<Spell>,
    pub(crate) auras: Vec<Aura>,
    pub(crate) mods: Vec<SpellMod>,
    pub(crate) dots: Vec<Dot>,
    pub(crate) effects: Vec<ExclusiveEffect>,
    pub(crate) categories: Vec<ExclusiveCategory>,
    pub(crate) tables: HashMap<(UnitId, UnitId), AttackTable>,
}

impl Sim {
    pub fn new(constants: CombatConstants, random: impl RandomSource + 'static) -> Self {
        Sim {
            now: Duration::ZERO,
            iteration: 0,
            elapsed_total: Duration::ZERO,
            constants,
            random: Box::new(random),
            queue: EventQueue::default(),
            units: Vec::new(),
            spells: Vec::new(),
            auras: Vec::new(),
            mods: Vec::new(),
            dots: Vec::new(),
            effects: Vec::new(),
            categories: Vec::new(),
            tables: HashMap::new(),
        }
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    /// Number of iterations started so far
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Simulated time summed over all finished iterations
    pub fn elapsed_total(&self) -> Duration {
        self.elapsed_total
    }

    pub fn constants(&self) -> &CombatConstants {
        &self.constants
    }

    pub fn set_random_source(&mut self, random: impl RandomSource + 'static) {
        self.random = Box::new(random);
    }

    // === Randomness ===

    /// Uniform float in `[0, 1)` for the given purpose
    pub fn random_float(&mut self, label: &str) -> f64 {
        let value = self.random.next_f64(label);
        tracing::trace!(label, value, "random draw");
        value
    }

    /// Uniform float in `[min, max)`
    pub fn roll(&mut self, label: &str, min: f64, max: f64) -> f64 {
        min + (max - min) * self.random_float(label)
    }

    /// True with probability `chance`; certain outcomes skip the draw
    pub fn proc(&mut self, label: &str, chance: f64) -> bool {
        if chance >= 1.0 {
            return true;
        }
        if chance <= 0.0 {
            return false;
        }
        self.random_float(label) < chance
    }

    // === Scheduling ===

    /// Run `action` at `at` (never earlier than now)
    pub fn schedule(&mut self, at: Duration, priority: i32, action: impl FnOnce(&mut Sim) + 'static) {
        let at = at.max(self.now);
        self.queue.push(at, priority, Box::new(action));
    }

    pub fn schedule_after(
        &mut self,
        delay: Duration,
        priority: i32,
        action: impl FnOnce(&mut Sim) + 'static,
    ) {
        self.schedule(self.now + delay, priority, action);
    }

    pub fn next_action_time(&self) -> Option<Duration> {
        self.queue.peek_time()
    }

    pub fn pending_actions(&self) -> usize {
        self.queue.len()
    }

    /// Run the next due action, if any; returns false when the queue is empty
    pub fn step(&mut self) -> bool {
        match self.queue.pop() {
            Some((at, action)) => {
                self.now = self.now.max(at);
                action(self);
                true
            }
            None => false,
        }
    }

    /// Run every action due at or before `end`, then advance the clock to `end`
    pub fn run_until(&mut self, end: Duration) {
        while let Some(at) = self.queue.peek_time() {
            if at > end {
                break;
            }
            self.step();
        }
        self.now = self.now.max(end);
    }

    // === Iteration lifecycle ===

    /// Start a new iteration
    ///
    /// Clears the clock and queue, refills resources, resets timers, casts
    /// and periodic effects, fires every aura's reset hook and finally
    /// activates build-phase auras in phase order.
    pub fn reset(&mut self) {
        self.deactivate_all_auras();
        self.now = Duration::ZERO;
        self.queue.clear();
        self.iteration += 1;
        self.random.begin_iteration(self.iteration);

        self.reset_units();
        self.reset_spells();
        self.reset_dots();
        self.run_reset_hooks();
        self.activate_build_phase_auras();

        tracing::debug!(iteration = self.iteration, "iteration started");
    }

    /// End the current iteration
    ///
    /// Every active aura is deactivated through its normal expire path, so
    /// modifiers applied on gain are removed symmetrically.
    pub fn finish_iteration(&mut self) {
        self.deactivate_all_auras();
        for unit in &mut self.units {
            unit.hardcast = None;
        }
        self.elapsed_total += self.now;
        tracing::debug!(
            iteration = self.iteration,
            duration_ms = self.now.as_millis() as u64,
            "iteration finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn sim() -> Sim {
        Sim::new(CombatConstants::default(), SeededRandom::new(3))
    }

    #[test]
    fn test_run_until_advances_clock() {
        let mut sim = sim();
        let log = Rc::new(RefCell::new(Vec::new()));

        for ms in [300u64, 100, 200] {
            let log = log.clone();
            sim.schedule(Duration::from_millis(ms), ActionPriority::DEFAULT, move |sim| {
                log.borrow_mut().push(sim.now().as_millis() as u64);
            });
        }

        sim.run_until(Duration::from_millis(250));
        assert_eq!(*log.borrow(), vec![100, 200]);
        assert_eq!(sim.now(), Duration::from_millis(250));

        sim.run_until(Duration::from_millis(1000));
        assert_eq!(*log.borrow(), vec![100, 200, 300]);
    }

    #[test]
    fn test_actions_can_schedule_more_actions() {
        let mut sim = sim();
        let count = Rc::new(RefCell::new(0));
        let c = count.clone();
        sim.schedule(Duration::from_millis(10), ActionPriority::DEFAULT, move |sim| {
            *c.borrow_mut() += 1;
            let c2 = c.clone();
            sim.schedule_after(Duration::from_millis(10), ActionPriority::DEFAULT, move |_| {
                *c2.borrow_mut() += 1;
            });
        });
        sim.run_until(Duration::from_millis(100));
        assert_eq!(*count.borrow(), 2);
    }

    #[test]
    fn test_reset_clears_queue_and_time() {
        let mut sim = sim();
        sim.schedule(Duration::from_secs(5), ActionPriority::DEFAULT, |_| {});
        sim.run_until(Duration::from_secs(1));
        sim.finish_iteration();
        sim.reset();
        assert_eq!(sim.now(), Duration::ZERO);
        assert_eq!(sim.pending_actions(), 0);
        assert_eq!(sim.iteration(), 1);
        assert_eq!(sim.elapsed_total(), Duration::from_secs(1));
    }

    #[test]
    fn test_proc_shortcuts() {
        let mut sim = Sim::new(CombatConstants::default(), ScriptedRandom::new(0.99));
        assert!(sim.proc("certain", 1.0));
        assert!(!sim.proc("never", 0.0));
        assert!(!sim.proc("unlikely", 0.5));
        let v = sim.roll("range", 500.0, 1000.0);
        assert!((v - 995.0).abs() < 1e-9);
    }
}
