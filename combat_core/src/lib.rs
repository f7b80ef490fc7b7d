//! combat_core - Combat resolution core for a turn-free combat simulator
//!
//! This library provides:
//! - Sim: arena-backed simulation context with a clock, action queue and labelled randomness
//! - AttackTable: cached attacker/defender matchups with armor and partial resist math
//! - Outcome: attack shapes resolved by one ladder roll, sampled or as a distribution
//! - Spells: the cast state machine, cooldowns, pushback, damage and periodic effects
//! - SpellMods: reversible modifiers that follow late-registered spells
//! - Auras: timed buffs with stacks, hooks, exclusive categories and proc triggers
//! - EffectCatalog: item and enchant effects keyed by game id

pub mod attack_table;
pub mod aura;
pub mod catalog;
pub mod config;
pub mod error;
pub mod flags;
pub mod outcome;
pub mod prelude;
pub mod sim;
pub mod spell;
pub mod spell_mod;
pub mod stats;
pub mod timer;
pub mod types;
pub mod unit;

// Re-export core types for convenience
pub use attack_table::AttackTable;
pub use aura::{AuraConfig, ExclusiveEffectConfig, ProcTrigger};
pub use catalog::{EffectCatalog, EffectKey};
pub use config::{default_spell_definitions, CombatConstants, SpellDefinition};
pub use error::{CastFailure, CombatError};
pub use flags::{HitOutcome, ProcMask, SpellFlags, SpellSchool};
pub use outcome::{Outcome, OutcomeDistribution, SpellResult};
pub use sim::{ActionPriority, RandomSource, SeededRandom, Sim};
pub use spell::{CastConfig, DotConfig, SpellConfig, SpellCost};
pub use spell_mod::{SpellModConfig, SpellModKind};
pub use stats::{PseudoStats, Stat, Stats};
pub use types::{ActionId, AuraId, DotId, ModId, ResourceKind, SpellId, UnitId, UnitKind};
pub use unit::{UnitConfig, Weapon, WeaponSlot};
