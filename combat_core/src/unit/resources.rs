//! Health and spendable resource pools

use crate::types::ResourceKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resources {
    pub health: f64,
    pub max_health: f64,
    pub mana: f64,
    pub max_mana: f64,
    pub rage: f64,
    pub max_rage: f64,
    pub energy: f64,
    pub max_energy: f64,
}

impl Resources {
    pub fn new(max_health: f64, max_mana: f64) -> Self {
        Resources {
            health: max_health,
            max_health,
            mana: max_mana,
            max_mana,
            rage: 0.0,
            max_rage: 100.0,
            energy: 100.0,
            max_energy: 100.0,
        }
    }

    pub fn get(&self, kind: ResourceKind) -> f64 {
        match kind {
            ResourceKind::Mana => self.mana,
            ResourceKind::Rage => self.rage,
            ResourceKind::Energy => self.energy,
        }
    }

    pub fn has(&self, kind: ResourceKind, amount: f64) -> bool {
        self.get(kind) >= amount
    }

    /// Spend up to `amount`; returns what was actually spent
    pub fn spend(&mut self, kind: ResourceKind, amount: f64) -> f64 {
        let pool = self.pool_mut(kind);
        let spent = amount.max(0.0).min(*pool);
        *pool -= spent;
        spent
    }

    /// Gain up to the pool maximum; returns what was actually gained
    pub fn gain(&mut self, kind: ResourceKind, amount: f64) -> f64 {
        let max = self.max(kind);
        let pool = self.pool_mut(kind);
        let gained = amount.max(0.0).min(max - *pool).max(0.0);
        *pool += gained;
        gained
    }

    pub fn max(&self, kind: ResourceKind) -> f64 {
        match kind {
            ResourceKind::Mana => self.max_mana,
            ResourceKind::Rage => self.max_rage,
            ResourceKind::Energy => self.max_energy,
        }
    }

    fn pool_mut(&mut self, kind: ResourceKind) -> &mut f64 {
        match kind {
            ResourceKind::Mana => &mut self.mana,
            ResourceKind::Rage => &mut self.rage,
            ResourceKind::Energy => &mut self.energy,
        }
    }

    /// Apply damage to health, never below zero; returns damage absorbed
    pub fn take_damage(&mut self, amount: f64) -> f64 {
        let taken = amount.max(0.0).min(self.health);
        self.health -= taken;
        taken
    }

    /// Heal up to max health; returns the effective healing
    pub fn heal(&mut self, amount: f64) -> f64 {
        let healed = amount.max(0.0).min(self.max_health - self.health).max(0.0);
        self.health += healed;
        healed
    }

    /// Refill for a new iteration
    pub fn reset(&mut self) {
        self.health = self.max_health;
        self.mana = self.max_mana;
        self.rage = 0.0;
        self.energy = self.max_energy;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spend_and_gain_clamp() {
        let mut res = Resources::new(1000.0, 500.0);
        assert!((res.spend(ResourceKind::Mana, 200.0) - 200.0).abs() < f64::EPSILON);
        assert!((res.mana - 300.0).abs() < f64::EPSILON);

        assert!((res.gain(ResourceKind::Mana, 1000.0) - 200.0).abs() < f64::EPSILON);
        assert!((res.mana - 500.0).abs() < f64::EPSILON);

        assert!((res.spend(ResourceKind::Rage, 10.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn test_damage_and_heal() {
        let mut res = Resources::new(100.0, 0.0);
        assert!((res.take_damage(150.0) - 100.0).abs() < f64::EPSILON);
        assert!((res.health).abs() < f64::EPSILON);
        assert!((res.heal(40.0) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_reset_refills() {
        let mut res = Resources::new(100.0, 50.0);
        res.spend(ResourceKind::Mana, 50.0);
        res.gain(ResourceKind::Rage, 30.0);
        res.reset();
        assert!((res.mana - 50.0).abs() < f64::EPSILON);
        assert!((res.rage).abs() < f64::EPSILON);
    }
}
