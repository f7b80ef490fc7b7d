//! SpellResult and SpellMetrics - the outcome of one attack and the running
//! totals per spell

use crate::flags::{HitOutcome, ProcMask};
use crate::types::{SpellId, UnitId};
use serde::{Deserialize, Serialize};

/// Whether a result comes from a primary action or from a proc
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Primary,
    Proc,
}

impl Provenance {
    pub fn from_proc_mask(mask: ProcMask) -> Self {
        if mask.is_proc() {
            Provenance::Proc
        } else {
            Provenance::Primary
        }
    }
}

/// Outcome of resolving one attack, tick or heal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpellResult {
    pub spell: SpellId,
    pub target: UnitId,
    pub outcome: HitOutcome,
    /// Final amount after every multiplier and the outcome
    pub damage: f64,
    /// Amount before the outcome roll adjusted it
    pub pre_outcome_damage: f64,
    pub resistance_multiplier: f64,
    pub threat: f64,
    pub provenance: Provenance,
}

impl SpellResult {
    pub fn new(spell: SpellId, target: UnitId, provenance: Provenance) -> Self {
        SpellResult {
            spell,
            target,
            outcome: HitOutcome::empty(),
            damage: 0.0,
            pre_outcome_damage: 0.0,
            resistance_multiplier: 1.0,
            threat: 0.0,
            provenance,
        }
    }

    pub fn landed(&self) -> bool {
        self.outcome.landed()
    }

    pub fn did_crit(&self) -> bool {
        self.outcome.contains(HitOutcome::CRIT)
    }

    pub fn is_periodic(&self) -> bool {
        self.outcome.contains(HitOutcome::TICK)
    }
}

/// Running totals for one spell across iterations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpellMetrics {
    // === Counts ===
    pub casts: u64,
    pub hits: u64,
    pub crits: u64,
    pub ticks: u64,
    pub crit_ticks: u64,
    pub misses: u64,
    pub dodges: u64,
    pub parries: u64,
    pub blocks: u64,
    pub glances: u64,
    pub crushes: u64,
    pub resists_25: u64,
    pub resists_50: u64,
    pub resists_75: u64,

    // === Totals ===
    pub total_damage: f64,
    pub total_healing: f64,
    pub total_threat: f64,
}

impl SpellMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one classified outcome
    pub fn record_outcome(&mut self, outcome: HitOutcome) {
        let periodic = outcome.contains(HitOutcome::TICK);
        if outcome.contains(HitOutcome::CRIT) {
            if periodic {
                self.crit_ticks += 1;
            } else {
                self.crits += 1;
            }
        } else if outcome.landed() {
            if periodic {
                self.ticks += 1;
            } else {
                self.hits += 1;
            }
        }
        if outcome.contains(HitOutcome::MISS) {
            self.misses += 1;
        }
        if outcome.contains(HitOutcome::DODGE) {
            self.dodges += 1;
        }
        if outcome.contains(HitOutcome::PARRY) {
            self.parries += 1;
        }
        if outcome.contains(HitOutcome::BLOCK) {
            self.blocks += 1;
        }
        if outcome.contains(HitOutcome::GLANCE) {
            self.glances += 1;
        }
        if outcome.contains(HitOutcome::CRUSH) {
            self.crushes += 1;
        }
        if outcome.contains(HitOutcome::PARTIAL25) {
            self.resists_25 += 1;
        }
        if outcome.contains(HitOutcome::PARTIAL50) {
            self.resists_50 += 1;
        }
        if outcome.contains(HitOutcome::PARTIAL75) {
            self.resists_75 += 1;
        }
    }

    /// Number of classified direct attacks (ticks excluded)
    pub fn attempts(&self) -> u64 {
        self.hits + self.crits + self.misses + self.dodges + self.parries
    }

    pub fn crit_rate(&self) -> f64 {
        let landed = self.hits + self.crits;
        if landed == 0 {
            return 0.0;
        }
        self.crits as f64 / landed as f64
    }

    pub fn miss_rate(&self) -> f64 {
        let attempts = self.attempts();
        if attempts == 0 {
            return 0.0;
        }
        self.misses as f64 / attempts as f64
    }

    pub fn merge(&mut self, other: &SpellMetrics) {
        self.casts += other.casts;
        self.hits += other.hits;
        self.crits += other.crits;
        self.ticks += other.ticks;
        self.crit_ticks += other.crit_ticks;
        self.misses += other.misses;
        self.dodges += other.dodges;
        self.parries += other.parries;
        self.blocks += other.blocks;
        self.glances += other.glances;
        self.crushes += other.crushes;
        self.resists_25 += other.resists_25;
        self.resists_50 += other.resists_50;
        self.resists_75 += other.resists_75;
        self.total_damage += other.total_damage;
        self.total_healing += other.total_healing;
        self.total_threat += other.total_threat;
    }

    /// Get a summary string
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();

        if self.casts > 0 {
            parts.push(format!("{} casts", self.casts));
        }
        if self.total_damage > 0.0 {
            parts.push(format!("{:.0} damage", self.total_damage));
        }
        if self.total_healing > 0.0 {
            parts.push(format!("{:.0} healing", self.total_healing));
        }
        if self.hits + self.crits > 0 {
            parts.push(format!("{:.1}% crit", self.crit_rate() * 100.0));
        }
        if self.misses > 0 {
            parts.push(format!("{:.1}% miss", self.miss_rate() * 100.0));
        }
        if self.ticks + self.crit_ticks > 0 {
            parts.push(format!("{} ticks", self.ticks + self.crit_ticks));
        }
        let partials = self.resists_25 + self.resists_50 + self.resists_75;
        if partials > 0 {
            parts.push(format!("{partials} partial resists"));
        }

        if parts.is_empty() {
            "No activity".to_string()
        } else {
            parts.join(", ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_direct_and_periodic() {
        let mut metrics = SpellMetrics::new();
        metrics.record_outcome(HitOutcome::HIT);
        metrics.record_outcome(HitOutcome::CRIT);
        metrics.record_outcome(HitOutcome::MISS);
        metrics.record_outcome(HitOutcome::HIT | HitOutcome::TICK);
        metrics.record_outcome(HitOutcome::HIT | HitOutcome::PARTIAL50);

        assert_eq!(metrics.hits, 2);
        assert_eq!(metrics.crits, 1);
        assert_eq!(metrics.misses, 1);
        assert_eq!(metrics.ticks, 1);
        assert_eq!(metrics.resists_50, 1);
        assert!((metrics.crit_rate() - 1.0 / 3.0).abs() < 1e-12);
        assert!((metrics.miss_rate() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_block_crit_counts_both() {
        let mut metrics = SpellMetrics::new();
        metrics.record_outcome(HitOutcome::BLOCK | HitOutcome::CRIT);
        assert_eq!(metrics.blocks, 1);
        assert_eq!(metrics.crits, 1);
        assert_eq!(metrics.hits, 0);
    }

    #[test]
    fn test_summary() {
        let mut metrics = SpellMetrics::new();
        assert_eq!(metrics.summary(), "No activity");
        metrics.casts = 2;
        metrics.total_damage = 1500.0;
        metrics.record_outcome(HitOutcome::HIT);
        metrics.record_outcome(HitOutcome::CRIT);
        assert_eq!(metrics.summary(), "2 casts, 1500 damage, 50.0% crit");
    }

    #[test]
    fn test_merge() {
        let mut a = SpellMetrics::new();
        a.casts = 1;
        a.total_damage = 10.0;
        let mut b = SpellMetrics::new();
        b.casts = 2;
        b.total_damage = 5.0;
        a.merge(&b);
        assert_eq!(a.casts, 3);
        assert!((a.total_damage - 15.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_provenance_from_mask() {
        assert_eq!(
            Provenance::from_proc_mask(ProcMask::SPELL_PROC),
            Provenance::Proc
        );
        assert_eq!(
            Provenance::from_proc_mask(ProcMask::MELEE_MH_AUTO),
            Provenance::Primary
        );
    }

    #[test]
    fn test_metrics_serialize() {
        let metrics = SpellMetrics::new();
        let json = serde_json::to_string(&metrics).unwrap();
        assert!(json.contains("total_damage"));
    }
}
