//! Integration test: cast gating, hardcasts, pushback and movement
//!
//! Drives the public cast API through the scheduler and checks that a
//! refused cast leaves no trace.

use combat_core::prelude::*;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

fn ms(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

/// Mage and boss with the given mana pool
fn setup(mana: f64, random: impl RandomSource + 'static) -> (Sim, UnitId, UnitId) {
    let mut sim = Sim::new(CombatConstants::default(), random);
    let mage = sim.add_unit(
        UnitConfig::new("mage", UnitKind::Player, 60)
            .with_stats(Stats::new().with(Stat::Health, 4000.0).with(Stat::Mana, mana)),
    );
    let boss = sim.add_unit(
        UnitConfig::new("boss", UnitKind::Enemy, 63).with_stats(Stats::new().with(Stat::Health, 1_000_000.0)),
    );
    sim.set_target(mage, Some(boss));
    sim.set_target(boss, Some(mage));
    (sim, mage, boss)
}

/// 3 second fire hardcast that records when it lands
fn slow_bolt(sim: &mut Sim, mage: UnitId, landed: &Rc<RefCell<Vec<Duration>>>, pushback_reduction: f64) -> SpellId {
    let landed = landed.clone();
    sim.register_spell(
        mage,
        SpellConfig::new("Slow Bolt", ActionId::Spell(1))
            .with_school(SpellSchool::FIRE)
            .with_proc_mask(ProcMask::SPELL_DAMAGE)
            .with_cost(SpellCost::mana(100.0))
            .with_cast(CastConfig::with_cast_time(ms(3000)))
            .with_pushback_reduction(pushback_reduction)
            .with_effects(move |sim, _, _| landed.borrow_mut().push(sim.now())),
    )
    .unwrap()
}

/// Boss melee special that always lands
fn boss_strike(sim: &mut Sim, boss: UnitId) -> SpellId {
    sim.register_spell(
        boss,
        SpellConfig::new("Strike", ActionId::Other(1))
            .with_proc_mask(ProcMask::MELEE_MH_SPECIAL)
            .with_cast(CastConfig::off_gcd())
            .with_effects(|sim, spell, target| {
                sim.calc_and_deal_damage(spell, target, 200.0, Outcome::AlwaysHit);
            }),
    )
    .unwrap()
}

fn strike_at(sim: &mut Sim, at: Duration, strike: SpellId, target: UnitId) {
    sim.schedule(at, ActionPriority::DEFAULT, move |sim| {
        sim.cast(strike, target).unwrap();
    });
}

#[test]
fn test_insufficient_mana_changes_nothing() {
    let (mut sim, mage, boss) = setup(50.0, SeededRandom::new(1));
    let applied = Rc::new(Cell::new(0));
    let counter = applied.clone();
    let spell = sim
        .register_spell(
            mage,
            SpellConfig::new("Pyroblast", ActionId::Spell(2))
                .with_school(SpellSchool::FIRE)
                .with_cost(SpellCost::mana(100.0))
                .with_cast(CastConfig::instant())
                .with_cooldown(CooldownConfig::new(Duration::from_secs(10)))
                .with_effects(move |_, _, _| counter.set(counter.get() + 1)),
        )
        .unwrap();
    sim.reset();

    let err = sim.cast(spell, boss).unwrap_err();
    match err {
        CastFailure::InsufficientResource {
            resource,
            needed,
            available,
        } => {
            assert_eq!(resource, ResourceKind::Mana);
            assert!((needed - 100.0).abs() < f64::EPSILON);
            assert!((available - 50.0).abs() < f64::EPSILON);
        }
        other => panic!("unexpected failure: {other}"),
    }

    assert!(sim.unit(mage).gcd().is_ready(sim.now()));
    assert_eq!(sim.spell_time_to_ready(spell), Duration::ZERO);
    assert!(sim.unit(mage).hardcast().is_none());
    assert!((sim.unit(mage).resources().mana - 50.0).abs() < f64::EPSILON);
    assert_eq!(sim.spell(spell).metrics().casts, 0);
    assert_eq!(applied.get(), 0);
    assert_eq!(sim.pending_actions(), 0);
}

#[test]
fn test_hardcast_completes_and_spends() {
    let (mut sim, mage, boss) = setup(1000.0, SeededRandom::new(1));
    let landed = Rc::new(RefCell::new(Vec::new()));
    let bolt = slow_bolt(&mut sim, mage, &landed, 0.0);
    sim.reset();

    sim.cast(bolt, boss).unwrap();
    assert!(sim.unit(mage).is_casting());
    // Mana is only spent when the cast finishes
    assert!((sim.unit(mage).resources().mana - 1000.0).abs() < f64::EPSILON);
    assert_eq!(sim.cast(bolt, boss), Err(CastFailure::GcdNotReady));

    sim.run_until(ms(3000));
    assert_eq!(*landed.borrow(), vec![ms(3000)]);
    assert!((sim.unit(mage).resources().mana - 900.0).abs() < f64::EPSILON);
    assert!(!sim.unit(mage).is_casting());
}

#[test]
fn test_drained_hardcast_applies_nothing() {
    let (mut sim, mage, boss) = setup(1000.0, SeededRandom::new(6));
    let applied = Rc::new(Cell::new(0));
    let counter = applied.clone();
    let blast = sim
        .register_spell(
            mage,
            SpellConfig::new("Greater Blast", ActionId::Spell(6))
                .with_school(SpellSchool::ARCANE)
                .with_cost(SpellCost::mana(500.0))
                .with_cast(CastConfig::with_cast_time(ms(3000)))
                .with_effects(move |_, _, _| counter.set(counter.get() + 1)),
        )
        .unwrap();
    sim.reset();

    sim.cast(blast, boss).unwrap();
    sim.schedule(ms(1000), ActionPriority::DEFAULT, move |sim| {
        sim.resources_mut(mage).spend(ResourceKind::Mana, 800.0);
    });
    sim.run_until(ms(4000));

    // The cast time was spent but neither mana nor effects were
    assert!(!sim.unit(mage).is_casting());
    assert_eq!(applied.get(), 0);
    assert!((sim.unit(mage).resources().mana - 200.0).abs() < f64::EPSILON);
    assert_eq!(sim.spell(blast).metrics().casts, 0);
}

#[test]
fn test_pushback_delays_hardcast() {
    let random = ScriptedRandom::new(0.0).with("Pushback", &[0.5]);
    let (mut sim, mage, boss) = setup(1000.0, random);
    let landed = Rc::new(RefCell::new(Vec::new()));
    let bolt = slow_bolt(&mut sim, mage, &landed, 0.0);
    let strike = boss_strike(&mut sim, boss);
    sim.reset();

    sim.cast(bolt, boss).unwrap();
    strike_at(&mut sim, ms(500), strike, mage);

    sim.run_until(ms(3000));
    assert!(landed.borrow().is_empty());
    assert_eq!(sim.unit(mage).hardcast().map(|h| h.expires), Some(ms(3750)));

    sim.run_until(ms(5000));
    assert_eq!(*landed.borrow(), vec![ms(3750)]);
}

#[test]
fn test_pushback_scaled_by_pseudo_stat() {
    let random = ScriptedRandom::new(0.0).with("Pushback", &[1.0]);
    let (mut sim, mage, boss) = setup(1000.0, random);
    sim.update_pseudo(mage, |p| p.spell_pushback_multiplier = 0.3);
    let landed = Rc::new(RefCell::new(Vec::new()));
    let bolt = slow_bolt(&mut sim, mage, &landed, 0.0);
    let strike = boss_strike(&mut sim, boss);
    sim.reset();

    sim.cast(bolt, boss).unwrap();
    strike_at(&mut sim, ms(500), strike, mage);
    sim.run_until(ms(5000));
    assert_eq!(*landed.borrow(), vec![ms(3300)]);
}

#[test]
fn test_full_pushback_reduction_keeps_cast_time() {
    let random = ScriptedRandom::new(0.0).with("Pushback", &[0.5]);
    let (mut sim, mage, boss) = setup(1000.0, random);
    let landed = Rc::new(RefCell::new(Vec::new()));
    let bolt = slow_bolt(&mut sim, mage, &landed, 1.0);
    let strike = boss_strike(&mut sim, boss);
    sim.reset();

    sim.cast(bolt, boss).unwrap();
    strike_at(&mut sim, ms(500), strike, mage);
    strike_at(&mut sim, ms(1500), strike, mage);
    sim.run_until(ms(5000));
    assert_eq!(*landed.borrow(), vec![ms(3000)]);
}

#[test]
fn test_moving_blocks_hardcasts_only() {
    let (mut sim, mage, boss) = setup(1000.0, SeededRandom::new(3));
    let landed = Rc::new(RefCell::new(Vec::new()));
    let bolt = slow_bolt(&mut sim, mage, &landed, 0.0);
    let blink = sim
        .register_spell(
            mage,
            SpellConfig::new("Blink", ActionId::Spell(3)).with_cast(CastConfig::off_gcd()),
        )
        .unwrap();
    sim.reset();

    sim.set_moving(mage, true);
    assert_eq!(sim.cast(bolt, boss), Err(CastFailure::Moving));
    assert!(sim.cast(blink, boss).is_ok());
    sim.set_moving(mage, false);

    sim.cast(bolt, boss).unwrap();
    sim.run_until(ms(1000));
    sim.set_moving(mage, true);
    assert!(!sim.unit(mage).is_casting());
    sim.run_until(ms(5000));
    assert!(landed.borrow().is_empty());
}

#[test]
fn test_global_cooldown_scales_with_haste() {
    let (mut sim, mage, boss) = setup(1000.0, SeededRandom::new(4));
    let instant = sim
        .register_spell(
            mage,
            SpellConfig::new("Fire Blast", ActionId::Spell(4)).with_cast(CastConfig::instant()),
        )
        .unwrap();
    sim.reset();

    sim.cast(instant, boss).unwrap();
    assert_eq!(sim.cast(instant, boss), Err(CastFailure::GcdNotReady));
    assert_eq!(sim.gcd_time_to_ready(mage), ms(1500));

    sim.run_until(ms(1500));
    sim.update_pseudo(mage, |p| p.cast_speed_multiplier = 1.25);
    sim.cast(instant, boss).unwrap();
    let gcd = sim.gcd_time_to_ready(mage).as_secs_f64();
    assert!((gcd - 1.2).abs() < 1e-6, "hasted gcd was {gcd}");

    // Haste never pushes the global cooldown under its floor
    sim.run_until(ms(2700));
    sim.update_pseudo(mage, |p| p.cast_speed_multiplier = 3.0);
    sim.cast(instant, boss).unwrap();
    assert_eq!(sim.gcd_time_to_ready(mage), ms(1000));
}

#[test]
fn test_cooldown_starts_when_cast_ends() {
    let (mut sim, mage, boss) = setup(1000.0, SeededRandom::new(5));
    let nova = sim
        .register_spell(
            mage,
            SpellConfig::new("Nova", ActionId::Spell(5))
                .with_cast(CastConfig::with_cast_time(ms(2000)).ignoring_haste())
                .with_cooldown(CooldownConfig::new(Duration::from_secs(8))),
        )
        .unwrap();
    sim.reset();

    sim.cast(nova, boss).unwrap();
    assert_eq!(sim.spell_time_to_ready(nova), ms(10_000));
    sim.run_until(ms(2000));
    assert!(matches!(
        sim.cast(nova, boss),
        Err(CastFailure::OnCooldown { ready_at }) if ready_at == ms(10_000)
    ));
}
