//! Fight setup and the iteration loop
//!
//! One mage attacks one raid boss. The mage follows a first-ready priority
//! list, procs Clearcasting, and may contribute a spell vulnerability that
//! competes with an external curse in the same exclusive category.

use crate::cli::Args;
use crate::items::{self, TALISMAN_LABEL};
use crate::report::{AuraReport, DpsSummary, Report, SpellReport};
use anyhow::{bail, Context};
use combat_core::config::{load_spell_definitions, load_toml};
use combat_core::prelude::*;
use combat_core::{default_spell_definitions, SpellDefinition};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

const MANA_TICK: Duration = Duration::from_secs(2);
const IDLE_WAIT: Duration = Duration::from_millis(250);
const BOSS_SWING: Duration = Duration::from_secs(2);
/// Decisions run after everything else due at the same instant
const DECISION_PRIORITY: i32 = ActionPriority::EXPIRE - 1;

const VULNERABILITY_CATEGORY: &str = "Spell Vulnerability";
const VULNERABLE_SCHOOLS: [SpellSchool; 4] = [
    SpellSchool::ARCANE,
    SpellSchool::FIRE,
    SpellSchool::FROST,
    SpellSchool::SHADOW,
];

/// Everything needed to run a batch of iterations
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub iterations: u32,
    pub duration: Duration,
    pub seed: u64,
    pub rotation: Vec<String>,
    pub definitions: HashMap<String, SpellDefinition>,
    pub constants: CombatConstants,
    pub curse: bool,
    pub boss_melee: bool,
    pub loadout: Vec<EffectKey>,
}

impl SimulationConfig {
    pub fn from_args(args: &Args) -> anyhow::Result<Self> {
        if args.iterations == 0 {
            bail!("at least one iteration is required");
        }
        if args.duration == 0 {
            bail!("fight duration must be positive");
        }

        let definitions = match &args.spells {
            Some(path) => load_spell_definitions(path)
                .with_context(|| format!("loading spell definitions from {}", path.display()))?,
            None => default_spell_definitions(),
        };
        for id in &args.rotation {
            if !definitions.contains_key(id) {
                bail!("rotation names unknown spell '{id}'");
            }
        }

        let constants = match &args.constants {
            Some(path) => {
                let constants: CombatConstants = load_toml(path)
                    .with_context(|| format!("loading combat constants from {}", path.display()))?;
                constants.validate()?;
                constants
            }
            None => CombatConstants::default(),
        };

        Ok(SimulationConfig {
            iterations: args.iterations,
            duration: Duration::from_secs(args.duration),
            seed: args.seed,
            rotation: args.rotation.clone(),
            definitions,
            constants,
            curse: !args.no_curse,
            boss_melee: args.boss_melee,
            loadout: vec![
                items::BRIARWOOD_REED,
                items::TALISMAN_OF_EPHEMERAL_POWER,
                items::SPELL_POWER_ENCHANT,
            ],
        })
    }
}

/// What the decision loop needs to pick the next cast
struct Plan {
    caster: UnitId,
    target: UnitId,
    cooldowns: Vec<SpellId>,
    rotation: Vec<SpellId>,
}

/// A wired fight, ready to be reset and run
pub struct Fight {
    pub sim: Sim,
    pub mage: UnitId,
    pub boss: UnitId,
    plan: Rc<Plan>,
    boss_melee: Option<SpellId>,
    tracked_auras: Vec<AuraId>,
}

pub fn build_fight(config: &SimulationConfig) -> anyhow::Result<Fight> {
    let mut sim = Sim::new(config.constants.clone(), LabeledRandom::new(config.seed));

    let mage = sim.add_unit(
        UnitConfig::new("mage", UnitKind::Player, 60).with_stats(
            Stats::new()
                .with(Stat::Health, 4200.0)
                .with(Stat::Mana, 7500.0)
                .with(Stat::Intellect, 310.0)
                .with(Stat::SpellPower, 620.0)
                .with(Stat::SpellCrit, 11.0)
                .with(Stat::SpellHit, 6.0),
        ),
    );
    let boss = sim.add_unit(
        UnitConfig::new("boss", UnitKind::Enemy, 63).with_stats(
            Stats::new()
                .with(Stat::Health, 100_000_000.0)
                .with(Stat::Armor, 3731.0)
                .with(Stat::FireResistance, 15.0)
                .with(Stat::ShadowResistance, 15.0),
        ),
    );
    sim.set_target(mage, Some(boss));
    sim.set_target(boss, Some(mage));

    let mut spells = HashMap::new();
    for id in &config.rotation {
        if spells.contains_key(id) {
            continue;
        }
        let Some(definition) = config.definitions.get(id) else {
            bail!("rotation names unknown spell '{id}'");
        };
        let spell = sim
            .register_spell(mage, definition.to_config())
            .with_context(|| format!("registering spell '{id}'"))?;
        spells.insert(id.clone(), spell);
    }
    let rotation = config.rotation.iter().filter_map(|id| spells.get(id).copied()).collect();

    let catalog = items::item_catalog()?;
    let applied = catalog.apply_all(&mut sim, mage, &config.loadout)?;
    tracing::info!(applied, requested = config.loadout.len(), "loadout equipped");
    let cooldowns = sim.spell_by_label(mage, TALISMAN_LABEL).into_iter().collect();

    let mut tracked_auras = vec![wire_clearcasting(&mut sim, mage)?];
    tracked_auras.extend(wire_vulnerabilities(&mut sim, mage, boss, config.curse)?);
    if let Some(buff) = sim.aura_by_label(mage, "Essence of Sapphiron") {
        tracked_auras.push(buff);
    }

    let boss_melee = if config.boss_melee {
        Some(sim.register_spell(
            boss,
            SpellConfig::new("Boss Melee", ActionId::Other(1))
                .with_proc_mask(ProcMask::MELEE_MH_AUTO)
                .with_cast(CastConfig::off_gcd())
                .with_effects(|sim, spell, target| {
                    let damage = sim.roll("Boss Melee Damage", 180.0, 260.0);
                    sim.calc_and_deal_damage(spell, target, damage, Outcome::EnemyMeleeWhite);
                }),
        )?)
    } else {
        None
    };

    Ok(Fight {
        sim,
        mage,
        boss,
        plan: Rc::new(Plan {
            caster: mage,
            target: boss,
            cooldowns,
            rotation,
        }),
        boss_melee,
        tracked_auras,
    })
}

/// Arcane Concentration: 10% of landed damaging spells make the next spell free
fn wire_clearcasting(sim: &mut Sim, mage: UnitId) -> Result<AuraId, CombatError> {
    let free_cast = sim.add_dynamic_mod(
        mage,
        SpellModConfig::new(SpellModKind::PowerCostPct(-1.0)).with_proc_mask(ProcMask::SPELL_DAMAGE),
    );
    let clearcasting = sim.register_aura(
        mage,
        AuraConfig::new("Clearcasting", Duration::from_secs(15))
            .on_gain(move |sim, _| sim.activate_mod(free_cast))
            .on_expire(move |sim, _| sim.deactivate_mod(free_cast))
            // Consumed by the next damaging spell that resolves
            .on_apply_effects(|sim, aura, spell, _| {
                if sim.spell(spell).proc_mask.intersects(ProcMask::SPELL_DAMAGE) {
                    sim.deactivate_aura(aura);
                }
            }),
    )?;
    sim.register_proc_aura(
        mage,
        ProcTrigger::new("Arcane Concentration", ProcCallback::SpellHitDealt, move |sim, _, _| {
            sim.activate_aura(clearcasting)
        })
        .with_source(ProcSource::Other)
        .with_proc_mask(ProcMask::SPELL_DAMAGE)
        .harmful()
        .with_rate(ProcRate::Chance(0.10)),
    )?;
    Ok(clearcasting)
}

/// Curse of the Elements and the mage's own weaker fire vulnerability share
/// one category on the boss; only the stronger one is ever applied.
fn wire_vulnerabilities(
    sim: &mut Sim,
    mage: UnitId,
    boss: UnitId,
    curse: bool,
) -> Result<Vec<AuraId>, CombatError> {
    let mut tracked = Vec::new();
    if curse {
        let aura = sim.register_aura(
            boss,
            AuraConfig::permanent("Curse of the Elements").with_build_phase(BuildPhase::Buffs),
        )?;
        sim.register_exclusive_effect(aura, vulnerability(boss, 0.10));
        tracked.push(aura);
    }

    let exposure = sim.register_aura(boss, AuraConfig::new("Elemental Exposure", Duration::from_secs(12)))?;
    sim.register_exclusive_effect(exposure, vulnerability(boss, 0.06));
    sim.register_proc_aura(
        mage,
        ProcTrigger::new("Elemental Exposure Trigger", ProcCallback::SpellHitDealt, move |sim, _, _| {
            sim.activate_aura(exposure)
        })
        .with_proc_mask(ProcMask::SPELL_DAMAGE)
        .with_school(SpellSchool::FIRE)
        .harmful()
        .with_rate(ProcRate::Chance(0.33)),
    )?;
    tracked.push(exposure);
    Ok(tracked)
}

fn vulnerability(boss: UnitId, bonus: f64) -> ExclusiveEffectConfig {
    ExclusiveEffectConfig::new(VULNERABILITY_CATEGORY, bonus)
        .on_gain(move |sim, _| scale_damage_taken(sim, boss, 1.0 + bonus))
        .on_expire(move |sim, _| scale_damage_taken(sim, boss, 1.0 / (1.0 + bonus)))
}

fn scale_damage_taken(sim: &mut Sim, unit: UnitId, factor: f64) {
    sim.update_pseudo(unit, |pseudo| {
        for school in VULNERABLE_SCHOOLS {
            pseudo.school_damage_taken_multiplier[school.index()] *= factor;
        }
    });
}

// === Decision loop ===

fn decide(sim: &mut Sim, plan: Rc<Plan>) {
    let caster = plan.caster;
    let target = plan.target;
    let unit = sim.unit(caster);
    if !unit.is_casting() && !unit.is_channeling() {
        for &spell in &plan.cooldowns {
            if sim.can_cast(spell, target) {
                if let Err(failure) = sim.cast(spell, target) {
                    tracing::debug!(spell = %spell, %failure, "cooldown refused");
                }
            }
        }
        for &spell in &plan.rotation {
            if dot_still_ticking(sim, spell, target) || !sim.can_cast(spell, target) {
                continue;
            }
            if let Err(failure) = sim.cast(spell, target) {
                tracing::debug!(spell = %spell, %failure, "cast refused");
            }
            break;
        }
    }

    let next = next_decision(sim, &plan);
    sim.schedule(next, DECISION_PRIORITY, move |sim| decide(sim, plan));
}

/// Pure dots are not refreshed while they still tick
fn dot_still_ticking(sim: &Sim, spell: SpellId, target: UnitId) -> bool {
    if !sim.spell(spell).flags.contains(SpellFlags::PURE_DOT) {
        return false;
    }
    sim.spell_dot(spell, target).is_some_and(|dot| sim.is_dot_active(dot))
}

fn next_decision(sim: &Sim, plan: &Plan) -> Duration {
    let now = sim.now();
    let unit = sim.unit(plan.caster);
    let next = if let Some(hardcast) = unit.hardcast() {
        hardcast.expires
    } else if let Some(channel) = unit.channel() {
        sim.dot(channel).expires_at().unwrap_or(now)
    } else {
        let gcd = now + sim.gcd_time_to_ready(plan.caster);
        let soonest = plan
            .rotation
            .iter()
            .map(|&spell| now + sim.spell_time_to_ready(spell))
            .min()
            .unwrap_or(gcd);
        gcd.max(soonest)
    };
    if next <= now {
        now + IDLE_WAIT
    } else {
        next
    }
}

fn schedule_mana_tick(sim: &mut Sim, unit: UnitId) {
    sim.schedule_after(MANA_TICK, ActionPriority::DEFAULT, move |sim| {
        let regen = sim.unit(unit).resources().max(ResourceKind::Mana) * 0.02;
        sim.resources_mut(unit).gain(ResourceKind::Mana, regen);
        schedule_mana_tick(sim, unit);
    });
}

fn schedule_boss_swing(sim: &mut Sim, spell: SpellId, target: UnitId) {
    sim.schedule_after(BOSS_SWING, ActionPriority::AUTO, move |sim| {
        if let Err(failure) = sim.cast(spell, target) {
            tracing::debug!(%failure, "boss swing refused");
        }
        schedule_boss_swing(sim, spell, target);
    });
}

// === Iterations ===

impl Fight {
    /// Damage the mage's spells have dealt across all iterations so far
    fn mage_damage(&self) -> f64 {
        self.sim
            .unit(self.mage)
            .spells()
            .iter()
            .map(|&spell| self.sim.spell(spell).metrics().total_damage)
            .sum()
    }

    /// Run one iteration and return its damage per second
    pub fn run_iteration(&mut self, duration: Duration) -> f64 {
        let before = self.mage_damage();
        self.sim.reset();
        schedule_mana_tick(&mut self.sim, self.mage);
        if let Some(spell) = self.boss_melee {
            schedule_boss_swing(&mut self.sim, spell, self.mage);
        }
        let plan = self.plan.clone();
        self.sim.schedule(Duration::ZERO, DECISION_PRIORITY, move |sim| decide(sim, plan));
        self.sim.run_until(duration);
        self.sim.finish_iteration();
        (self.mage_damage() - before) / duration.as_secs_f64()
    }
}

pub fn run(config: &SimulationConfig) -> anyhow::Result<Report> {
    let mut fight = build_fight(config)?;
    tracing::info!(
        iterations = config.iterations,
        duration_s = config.duration.as_secs(),
        seed = config.seed,
        "simulation started"
    );

    let mut samples = Vec::with_capacity(config.iterations as usize);
    for _ in 0..config.iterations {
        samples.push(fight.run_iteration(config.duration));
    }
    let dps = DpsSummary::from_samples(&samples);
    tracing::info!(mean = dps.mean, stddev = dps.stddev, "simulation finished");

    Ok(summarize(&fight, config, dps))
}

fn summarize(fight: &Fight, config: &SimulationConfig, dps: DpsSummary) -> Report {
    let sim = &fight.sim;
    let elapsed = sim.elapsed_total().as_secs_f64();
    let iterations = f64::from(config.iterations);

    let spells = sim
        .unit(fight.mage)
        .spells()
        .iter()
        .map(|&id| {
            let spell = sim.spell(id);
            SpellReport::new(&spell.label, spell.metrics(), elapsed)
        })
        .filter(|report| report.casts > 0 || report.total_damage > 0.0)
        .collect();

    let auras = fight
        .tracked_auras
        .iter()
        .map(|&id| {
            let aura = sim.aura(id);
            AuraReport {
                name: aura.label.clone(),
                uptime_pct: aura.uptime(sim.now()).as_secs_f64() / elapsed * 100.0,
                activations_per_fight: aura.activations() as f64 / iterations,
            }
        })
        .collect();

    Report {
        iterations: config.iterations,
        duration_s: config.duration.as_secs_f64(),
        seed: config.seed,
        dps,
        boss_damage_taken: sim.unit(fight.boss).damage_taken(),
        spells,
        auras,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(rotation: &[&str], iterations: u32) -> SimulationConfig {
        SimulationConfig {
            iterations,
            duration: Duration::from_secs(60),
            seed: 7,
            rotation: rotation.iter().map(|s| s.to_string()).collect(),
            definitions: default_spell_definitions(),
            constants: CombatConstants::default(),
            curse: true,
            boss_melee: false,
            loadout: vec![items::BRIARWOOD_REED, items::TALISMAN_OF_EPHEMERAL_POWER],
        }
    }

    #[test]
    fn test_frostbolt_rotation_deals_damage() {
        let report = run(&config(&["frostbolt"], 5)).unwrap();
        assert!(report.dps.mean > 0.0);
        let frostbolt = report.spells.iter().find(|s| s.name == "Frostbolt").unwrap();
        assert!(frostbolt.casts > 0);
    }

    #[test]
    fn test_same_seed_same_result() {
        let a = run(&config(&["corruption", "fireball"], 3)).unwrap();
        let b = run(&config(&["corruption", "fireball"], 3)).unwrap();
        assert_eq!(a.dps.mean, b.dps.mean);
    }

    #[test]
    fn test_vulnerability_rolled_back_after_iteration() {
        let mut fight = build_fight(&config(&["fireball"], 1)).unwrap();
        fight.run_iteration(Duration::from_secs(30));
        // Gains were rolled back when the iteration finished
        let pseudo = fight.sim.unit(fight.boss).pseudo();
        let fire = pseudo.school_damage_taken_multiplier[SpellSchool::FIRE.index()];
        assert!((fire - 1.0).abs() < 1e-9, "fire multiplier left at {fire}");
    }

    #[test]
    fn test_unknown_rotation_spell_rejected() {
        let mut cfg = config(&["frostbolt"], 1);
        cfg.rotation.push("pyroblast".to_string());
        assert!(build_fight(&cfg).is_err());
    }
}
