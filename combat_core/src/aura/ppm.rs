//! Procs-per-minute chance managers

use crate::flags::ProcMask;
use crate::unit::{AutoAttacks, WeaponSlot};
use smallvec::SmallVec;

/// Per-attack proc chances for a PPM rate, one entry per distinct weapon speed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PpmManager {
    chances: SmallVec<[(ProcMask, f64); 3]>,
}

impl PpmManager {
    /// Build chances for the weapons equipped right now
    ///
    /// Each slot covers the part of `mask` that belongs to it; slots with
    /// the same swing speed share one entry.
    pub fn new(ppm: f64, mask: ProcMask, weapons: &AutoAttacks) -> Self {
        let ranged = ProcMask::RANGED | ProcMask::RANGED_PROC;
        let slots = [
            (WeaponSlot::MainHand, mask - (ranged | ProcMask::MELEE_OH)),
            (WeaponSlot::OffHand, mask - (ranged | ProcMask::MELEE_MH)),
            (WeaponSlot::Ranged, mask & ranged),
        ];

        let mut manager = PpmManager::default();
        for (slot, slot_mask) in slots {
            if slot_mask.is_empty() {
                continue;
            }
            let Some(weapon) = weapons.weapon(slot) else {
                continue;
            };
            let chance = ppm * weapon.swing_speed / 60.0;
            match manager.chances.iter_mut().find(|(_, c)| *c == chance) {
                Some(entry) => entry.0 |= slot_mask,
                None => manager.chances.push((slot_mask, chance)),
            }
        }
        manager
    }

    /// Chance for an attack with the given proc mask; zero if no slot matches
    pub fn chance(&self, mask: ProcMask) -> f64 {
        self.chances
            .iter()
            .find(|(m, _)| m.intersects(mask))
            .map_or(0.0, |(_, c)| *c)
    }

    pub fn is_empty(&self) -> bool {
        self.chances.is_empty()
    }

    pub fn entries(&self) -> &[(ProcMask, f64)] {
        &self.chances
    }
}

/// A [`PpmManager`] rebuilt whenever the unit's weapons change
#[derive(Debug, Clone)]
pub struct DynamicProcManager {
    ppm: f64,
    mask: ProcMask,
    weapons_version: Option<u64>,
    current: PpmManager,
}

impl DynamicProcManager {
    pub fn new(ppm: f64, mask: ProcMask) -> Self {
        DynamicProcManager {
            ppm,
            mask,
            weapons_version: None,
            current: PpmManager::default(),
        }
    }

    pub fn chance(&mut self, weapons: &AutoAttacks, mask: ProcMask) -> f64 {
        if self.weapons_version != Some(weapons.version()) {
            self.current = PpmManager::new(self.ppm, self.mask, weapons);
            self.weapons_version = Some(weapons.version());
        }
        self.current.chance(mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::Weapon;

    fn weapons(mh: f64, oh: Option<f64>) -> AutoAttacks {
        let mut w = AutoAttacks::default();
        w.equip(WeaponSlot::MainHand, Some(Weapon::new(100.0, 200.0, mh)));
        w.equip(WeaponSlot::OffHand, oh.map(|s| Weapon::new(50.0, 100.0, s)));
        w
    }

    #[test]
    fn test_chance_from_weapon_speed() {
        let manager = PpmManager::new(1.0, ProcMask::MELEE, &weapons(2.0, None));
        assert!((manager.chance(ProcMask::MELEE_MH_AUTO) - 2.0 / 60.0).abs() < 1e-12);
        assert!(manager.chance(ProcMask::MELEE_OH_AUTO).abs() < f64::EPSILON);
        assert!(manager.chance(ProcMask::SPELL_DAMAGE).abs() < f64::EPSILON);
    }

    #[test]
    fn test_equal_speeds_merge() {
        let same = PpmManager::new(2.0, ProcMask::MELEE, &weapons(2.6, Some(2.6)));
        assert_eq!(same.entries().len(), 1);
        assert!((same.chance(ProcMask::MELEE_OH_SPECIAL) - 2.0 * 2.6 / 60.0).abs() < 1e-12);

        let different = PpmManager::new(2.0, ProcMask::MELEE, &weapons(2.6, Some(1.5)));
        assert_eq!(different.entries().len(), 2);
        assert!((different.chance(ProcMask::MELEE_OH_AUTO) - 2.0 * 1.5 / 60.0).abs() < 1e-12);
    }

    #[test]
    fn test_dynamic_manager_follows_weapon_swaps() {
        let mut w = weapons(2.0, None);
        let mut manager = DynamicProcManager::new(3.0, ProcMask::MELEE);
        assert!((manager.chance(&w, ProcMask::MELEE_MH) - 0.1).abs() < 1e-12);

        w.equip(WeaponSlot::MainHand, Some(Weapon::new(1.0, 2.0, 3.0)));
        assert!((manager.chance(&w, ProcMask::MELEE_MH) - 0.15).abs() < 1e-12);
    }
}
