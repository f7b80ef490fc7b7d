//! Equipped weapons and the melee swing clock

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponSlot {
    MainHand,
    OffHand,
    Ranged,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weapon {
    pub min_damage: f64,
    pub max_damage: f64,
    /// Seconds between swings
    pub swing_speed: f64,
}

impl Weapon {
    pub fn new(min_damage: f64, max_damage: f64, swing_speed: f64) -> Self {
        Weapon {
            min_damage,
            max_damage,
            swing_speed,
        }
    }

    pub fn average_damage(&self) -> f64 {
        (self.min_damage + self.max_damage) / 2.0
    }
}

/// The weapons a unit swings and when it may next swing
///
/// `version` changes whenever a weapon is equipped or removed so dynamic
/// proc rates know to recompute.
#[derive(Debug, Clone, Default)]
pub struct AutoAttacks {
    main_hand: Option<Weapon>,
    off_hand: Option<Weapon>,
    ranged: Option<Weapon>,
    melee_delayed_until: Duration,
    version: u64,
}

impl AutoAttacks {
    pub fn weapon(&self, slot: WeaponSlot) -> Option<&Weapon> {
        match slot {
            WeaponSlot::MainHand => self.main_hand.as_ref(),
            WeaponSlot::OffHand => self.off_hand.as_ref(),
            WeaponSlot::Ranged => self.ranged.as_ref(),
        }
    }

    pub fn equip(&mut self, slot: WeaponSlot, weapon: Option<Weapon>) {
        match slot {
            WeaponSlot::MainHand => self.main_hand = weapon,
            WeaponSlot::OffHand => self.off_hand = weapon,
            WeaponSlot::Ranged => self.ranged = weapon,
        }
        self.version += 1;
    }

    pub fn is_dual_wielding(&self) -> bool {
        self.main_hand.is_some() && self.off_hand.is_some()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Push the next melee swing back to at least `until`
    pub fn delay_melee_until(&mut self, until: Duration) {
        self.melee_delayed_until = self.melee_delayed_until.max(until);
    }

    pub fn melee_delayed_until(&self) -> Duration {
        self.melee_delayed_until
    }

    pub fn melee_ready(&self, now: Duration) -> bool {
        self.melee_delayed_until <= now
    }

    pub(crate) fn reset(&mut self) {
        self.melee_delayed_until = Duration::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equip_bumps_version() {
        let mut attacks = AutoAttacks::default();
        assert_eq!(attacks.version(), 0);
        attacks.equip(WeaponSlot::MainHand, Some(Weapon::new(100.0, 200.0, 2.6)));
        assert_eq!(attacks.version(), 1);
        assert!(!attacks.is_dual_wielding());

        attacks.equip(WeaponSlot::OffHand, Some(Weapon::new(50.0, 90.0, 1.8)));
        assert!(attacks.is_dual_wielding());
        assert_eq!(attacks.version(), 2);
    }

    #[test]
    fn test_melee_delay_only_extends() {
        let mut attacks = AutoAttacks::default();
        attacks.delay_melee_until(Duration::from_secs(3));
        attacks.delay_melee_until(Duration::from_secs(1));
        assert_eq!(attacks.melee_delayed_until(), Duration::from_secs(3));
        assert!(!attacks.melee_ready(Duration::from_secs(2)));
        attacks.reset();
        assert!(attacks.melee_ready(Duration::ZERO));
    }

    #[test]
    fn test_average_damage() {
        let weapon = Weapon::new(100.0, 200.0, 2.0);
        assert!((weapon.average_damage() - 150.0).abs() < f64::EPSILON);
    }
}
