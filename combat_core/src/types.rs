//! Handles and small enums shared across the combat core

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! arena_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub(crate) u32);

        impl $name {
            /// Position of this handle in its arena
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }
    };
}

arena_handle!(
    /// Handle to a unit registered on a [`crate::Sim`]
    UnitId
);
arena_handle!(
    /// Handle to a registered spell
    SpellId
);
arena_handle!(
    /// Handle to a registered aura
    AuraId
);
arena_handle!(
    /// Handle to a spell modifier
    ModId
);
arena_handle!(
    /// Handle to a periodic effect instance (one per spell and target)
    DotId
);
arena_handle!(
    /// Handle to an exclusive effect contender
    EffectId
);
arena_handle!(
    /// Handle to an exclusive effect category
    CategoryId
);

/// Handle to a ready-at timer owned by a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId {
    pub(crate) unit: UnitId,
    pub(crate) index: u32,
}

impl TimerId {
    pub fn unit(self) -> UnitId {
        self.unit
    }
}

/// Game-facing identifier of an action (spell id, item id, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ActionId {
    Spell(u32),
    Item(u32),
    Other(u32),
}

impl Default for ActionId {
    fn default() -> Self {
        ActionId::Other(0)
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionId::Spell(id) => write!(f, "spell:{id}"),
            ActionId::Item(id) => write!(f, "item:{id}"),
            ActionId::Other(id) => write!(f, "other:{id}"),
        }
    }
}

/// Who a unit is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    Player,
    Pet,
    Enemy,
}

/// Spendable resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Mana,
    Rage,
    Energy,
}

/// How an attack is defended against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefenseType {
    #[default]
    None,
    Magic,
    Melee,
    Ranged,
}

/// Pre-combat phase in which a permanent aura is switched on
///
/// Phases activate in ascending [`BuildPhase::priority`] order at the start
/// of each iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildPhase {
    Base,
    Gear,
    Talents,
    Buffs,
    Consumes,
}

impl BuildPhase {
    pub fn priority(self) -> i32 {
        match self {
            BuildPhase::Base => -100,
            BuildPhase::Gear => 0,
            BuildPhase::Talents => 100,
            BuildPhase::Buffs => 200,
            BuildPhase::Consumes => 300,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_phase_order() {
        let mut phases = vec![
            BuildPhase::Consumes,
            BuildPhase::Base,
            BuildPhase::Buffs,
            BuildPhase::Gear,
            BuildPhase::Talents,
        ];
        phases.sort_by_key(|p| p.priority());
        assert_eq!(
            phases,
            vec![
                BuildPhase::Base,
                BuildPhase::Gear,
                BuildPhase::Talents,
                BuildPhase::Buffs,
                BuildPhase::Consumes
            ]
        );
    }

    #[test]
    fn test_action_id_display() {
        assert_eq!(ActionId::Spell(133).to_string(), "spell:133");
        assert_eq!(UnitId(3).to_string(), "UnitId#3");
    }

    #[test]
    fn test_action_id_serialization() {
        let json = serde_json::to_string(&ActionId::Item(19019)).unwrap();
        assert!(json.contains("item"));
    }
}
