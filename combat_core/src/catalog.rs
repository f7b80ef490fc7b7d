//! EffectCatalog - item and enchant effects keyed by game id
//!
//! A catalog is a plain value built once at startup and handed to whoever
//! equips units. Each entry wires its auras, procs and mods onto a unit.

use crate::error::CombatError;
use crate::sim::Sim;
use crate::types::UnitId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Game id of a catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EffectKey {
    Item(u32),
    Enchant(u32),
}

impl fmt::Display for EffectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EffectKey::Item(id) => write!(f, "item:{id}"),
            EffectKey::Enchant(id) => write!(f, "enchant:{id}"),
        }
    }
}

pub type EffectBuilder = Rc<dyn Fn(&mut Sim, UnitId) -> Result<(), CombatError>>;

#[derive(Clone, Default)]
pub struct EffectCatalog {
    effects: HashMap<EffectKey, EffectBuilder>,
}

impl EffectCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry; a key can only be registered once
    pub fn register(
        &mut self,
        key: EffectKey,
        builder: impl Fn(&mut Sim, UnitId) -> Result<(), CombatError> + 'static,
    ) -> Result<(), CombatError> {
        if self.effects.contains_key(&key) {
            return Err(CombatError::DuplicateEffect { key: key.to_string() });
        }
        self.effects.insert(key, Rc::new(builder));
        Ok(())
    }

    pub fn contains(&self, key: EffectKey) -> bool {
        self.effects.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Wire one entry onto a unit
    ///
    /// Returns `Ok(false)` for keys without an entry; items with no special
    /// effect are common.
    pub fn apply(&self, sim: &mut Sim, unit: UnitId, key: EffectKey) -> Result<bool, CombatError> {
        sim.try_unit(unit)?;
        let Some(builder) = self.effects.get(&key).cloned() else {
            return Ok(false);
        };
        builder(sim, unit)?;
        tracing::debug!(unit = %unit, effect = %key, "catalog effect applied");
        Ok(true)
    }

    /// Wire every known entry in `keys`; returns how many were applied
    pub fn apply_all(&self, sim: &mut Sim, unit: UnitId, keys: &[EffectKey]) -> Result<usize, CombatError> {
        let mut applied = 0;
        for &key in keys {
            if self.apply(sim, unit, key)? {
                applied += 1;
            }
        }
        Ok(applied)
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

    fn trinket(sim: &mut Sim, unit: UnitId) -> Result<(), CombatError> {
        sim.register_aura(unit, AuraConfig::permanent("Trinket Passive"))?;
        Ok(())
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let mut catalog = EffectCatalog::new();
        catalog.register(EffectKey::Item(19379), trinket).unwrap();
        let err = catalog.register(EffectKey::Item(19379), trinket).unwrap_err();
        assert!(matches!(err, CombatError::DuplicateEffect { ref key } if key == "item:19379"));

        // Same number under another kind is a different entry
        catalog.register(EffectKey::Enchant(19379), trinket).unwrap();
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_apply_wires_unit() {
        let mut sim = Sim::new(CombatConstants::default(), SeededRandom::new(1));
        let mage = sim.add_unit(UnitConfig::new("mage", UnitKind::Player, 60));
        let mut catalog = EffectCatalog::new();
        catalog.register(EffectKey::Item(1), trinket).unwrap();

        let keys = [EffectKey::Item(1), EffectKey::Item(2)];
        assert_eq!(catalog.apply_all(&mut sim, mage, &keys).unwrap(), 1);
        assert!(sim.aura_by_label(mage, "Trinket Passive").is_some());
    }
}
