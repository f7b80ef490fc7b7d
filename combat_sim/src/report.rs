//! Aggregated results of a simulation batch

use combat_core::outcome::SpellMetrics;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub iterations: u32,
    pub duration_s: f64,
    pub seed: u64,
    pub dps: DpsSummary,
    pub boss_damage_taken: f64,
    pub spells: Vec<SpellReport>,
    pub auras: Vec<AuraReport>,
}

/// Spread of per-iteration damage per second
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DpsSummary {
    pub mean: f64,
    pub stddev: f64,
    pub min: f64,
    pub max: f64,
}

impl DpsSummary {
    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return DpsSummary {
                mean: 0.0,
                stddev: 0.0,
                min: 0.0,
                max: 0.0,
            };
        }
        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let variance = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
        DpsSummary {
            mean,
            stddev: variance.sqrt(),
            min: samples.iter().copied().fold(f64::INFINITY, f64::min),
            max: samples.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SpellReport {
    pub name: String,
    pub casts: u64,
    pub hits: u64,
    pub crits: u64,
    pub misses: u64,
    pub ticks: u64,
    pub total_damage: f64,
    pub dps: f64,
    pub crit_rate: f64,
    pub miss_rate: f64,
    pub summary: String,
}

impl SpellReport {
    /// `elapsed_s` is the simulated time summed over all iterations
    pub fn new(name: &str, metrics: &SpellMetrics, elapsed_s: f64) -> Self {
        SpellReport {
            name: name.to_string(),
            casts: metrics.casts,
            hits: metrics.hits,
            crits: metrics.crits,
            misses: metrics.misses,
            ticks: metrics.ticks,
            total_damage: metrics.total_damage,
            dps: if elapsed_s > 0.0 { metrics.total_damage / elapsed_s } else { 0.0 },
            crit_rate: metrics.crit_rate(),
            miss_rate: metrics.miss_rate(),
            summary: metrics.summary(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuraReport {
    pub name: String,
    pub uptime_pct: f64,
    pub activations_per_fight: f64,
}

impl Report {
    /// Human-readable table on stdout
    pub fn print(&self) {
        println!(
            "{} iterations of {:.0}s (seed {})",
            self.iterations, self.duration_s, self.seed
        );
        println!(
            "DPS: {:.1} +/- {:.1} (min {:.1}, max {:.1})",
            self.dps.mean, self.dps.stddev, self.dps.min, self.dps.max
        );
        println!();
        println!("{:<24} {:>8} {:>10} {:>8}  {}", "Spell", "DPS", "Share", "Casts", "Details");
        let total: f64 = self.spells.iter().map(|s| s.total_damage).sum();
        for spell in &self.spells {
            let share = if total > 0.0 { spell.total_damage / total * 100.0 } else { 0.0 };
            println!(
                "{:<24} {:>8.1} {:>9.1}% {:>8}  {}",
                spell.name, spell.dps, share, spell.casts, spell.summary
            );
        }
        if !self.auras.is_empty() {
            println!();
            println!("{:<28} {:>8} {:>12}", "Aura", "Uptime", "Per fight");
            for aura in &self.auras {
                println!(
                    "{:<28} {:>7.1}% {:>12.2}",
                    aura.name, aura.uptime_pct, aura.activations_per_fight
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dps_summary() {
        let summary = DpsSummary::from_samples(&[100.0, 200.0, 300.0]);
        assert!((summary.mean - 200.0).abs() < 1e-9);
        assert!((summary.stddev - (20000.0f64 / 3.0).sqrt()).abs() < 1e-9);
        assert!((summary.min - 100.0).abs() < 1e-9);
        assert!((summary.max - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_samples() {
        assert_eq!(DpsSummary::from_samples(&[]).mean, 0.0);
    }

    #[test]
    fn test_report_serializes() {
        let report = Report {
            iterations: 1,
            duration_s: 60.0,
            seed: 3,
            dps: DpsSummary::from_samples(&[50.0]),
            boss_damage_taken: 3000.0,
            spells: vec![SpellReport::new("Frostbolt", &SpellMetrics::default(), 60.0)],
            auras: vec![],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["spells"][0]["name"], "Frostbolt");
        assert_eq!(json["dps"]["mean"], 50.0);
    }
}
