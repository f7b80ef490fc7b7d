//! Prelude module for convenient imports
//!
//! ```rust
//! use combat_core::prelude::*;
//! ```

// Simulation
pub use crate::sim::{ActionPriority, LabeledRandom, RandomSource, ScriptedRandom, SeededRandom, Sim};
pub use crate::config::CombatConstants;

// Handles and enums
pub use crate::types::{ActionId, AuraId, BuildPhase, DotId, ModId, ResourceKind, SpellId, UnitId, UnitKind};
pub use crate::flags::{HitOutcome, ProcMask, SpellFlags, SpellSchool};

// Units
pub use crate::stats::{PseudoStats, Stat, Stats};
pub use crate::unit::{UnitConfig, Weapon, WeaponSlot};

// Spells
pub use crate::spell::{CastConfig, CooldownConfig, DotConfig, SpellConfig, SpellCost};
pub use crate::spell_mod::{SpellModConfig, SpellModKind};
pub use crate::outcome::{Outcome, SpellResult};

// Auras and procs
pub use crate::aura::{AuraConfig, ExclusiveEffectConfig, ProcCallback, ProcRate, ProcSource, ProcTrigger};
pub use crate::catalog::{EffectCatalog, EffectKey};

// Errors
pub use crate::error::{CastFailure, CombatError};
