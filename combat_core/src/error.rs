//! Error types for registration and casting

use crate::config::ConfigError;
use crate::types::{ResourceKind, UnitId};
use std::time::Duration;
use thiserror::Error;

/// Configuration error raised while wiring units, spells and auras
///
/// These indicate programmer mistakes in setup code; callers are expected to
/// abort the run.
#[derive(Error, Debug)]
pub enum CombatError {
    #[error("spell '{label}' sets a damage multiplier of {multiplier} but has no proc mask")]
    DamageMultiplierWithoutProcMask { label: String, multiplier: f64 },
    #[error("spell '{label}' declares a cooldown timer without a duration")]
    CooldownWithoutDuration { label: String },
    #[error("effect {key} is already registered")]
    DuplicateEffect { key: String },
    #[error("unit {unit} exceeded the limit of {limit} spells")]
    TooManySpells { unit: UnitId, limit: usize },
    #[error("unit {unit} exceeded the limit of {limit} timers")]
    TooManyTimers { unit: UnitId, limit: usize },
    #[error("aura '{label}' has a zero duration")]
    ZeroDurationAura { label: String },
    #[error("aura '{label}' tracks stacks but has no max stacks")]
    MissingMaxStacks { label: String },
    #[error("spell '{label}' has a periodic effect with no ticks")]
    EmptyDot { label: String },
    #[error("spell mod update changes its kind from {from} to {to}")]
    ModKindMismatch { from: &'static str, to: &'static str },
    #[error("unknown unit {0}")]
    UnknownUnit(UnitId),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Why a cast attempt was refused
///
/// A refusal never changes simulation state.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum CastFailure {
    #[error("spell is unavailable while its item is swapped out")]
    Swapped,
    #[error("extra cast condition failed")]
    ConditionFailed,
    #[error("not enough {resource:?}: need {needed}, have {available}")]
    InsufficientResource {
        resource: ResourceKind,
        needed: f64,
        available: f64,
    },
    #[error("on cooldown until {ready_at:?}")]
    OnCooldown { ready_at: Duration },
    #[error("global cooldown not ready")]
    GcdNotReady,
    #[error("already casting")]
    Casting,
    #[error("channeling")]
    Channeling,
    #[error("cannot cast while moving")]
    Moving,
}
