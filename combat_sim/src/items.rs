//! Item and enchant effects known to the simulator

use combat_core::prelude::*;
use std::time::Duration;

pub const BRIARWOOD_REED: EffectKey = EffectKey::Item(12930);
pub const TALISMAN_OF_EPHEMERAL_POWER: EffectKey = EffectKey::Item(18820);
pub const SPELL_POWER_ENCHANT: EffectKey = EffectKey::Enchant(2504);

/// Label of the on-use spell the talisman registers
pub const TALISMAN_LABEL: &str = "Talisman of Ephemeral Power";

/// Catalog with every effect the default loadout uses
pub fn item_catalog() -> Result<EffectCatalog, CombatError> {
    let mut catalog = EffectCatalog::new();
    catalog.register(BRIARWOOD_REED, |sim, unit| {
        equip_spell_power(sim, unit, "Briarwood Reed", 29.0)
    })?;
    catalog.register(SPELL_POWER_ENCHANT, |sim, unit| {
        equip_spell_power(sim, unit, "Enchant Weapon - Spell Power", 30.0)
    })?;
    catalog.register(TALISMAN_OF_EPHEMERAL_POWER, talisman)?;
    Ok(catalog)
}

/// Passive spell power, present from the gear phase of every iteration
fn equip_spell_power(sim: &mut Sim, unit: UnitId, label: &str, amount: f64) -> Result<(), CombatError> {
    let config = AuraConfig::permanent(label)
        .with_build_phase(BuildPhase::Gear)
        .on_gain(move |sim, _| sim.add_stat(unit, Stat::SpellPower, amount))
        .on_expire(move |sim, _| sim.add_stat(unit, Stat::SpellPower, -amount));
    sim.register_aura(unit, config)?;
    Ok(())
}

/// 175 spell power for 15 seconds on a 90 second cooldown
fn talisman(sim: &mut Sim, unit: UnitId) -> Result<(), CombatError> {
    const BONUS: f64 = 175.0;
    let buff = sim.register_aura(
        unit,
        AuraConfig::new("Essence of Sapphiron", Duration::from_secs(15))
            .with_action_id(ActionId::Item(18820))
            .on_gain(move |sim, _| sim.add_stat(unit, Stat::SpellPower, BONUS))
            .on_expire(move |sim, _| sim.add_stat(unit, Stat::SpellPower, -BONUS)),
    )?;
    sim.register_spell(
        unit,
        SpellConfig::new(TALISMAN_LABEL, ActionId::Item(18820))
            .with_cast(CastConfig::off_gcd())
            .with_cooldown(CooldownConfig::new(Duration::from_secs(90)))
            .with_effects(move |sim, _, _| sim.activate_aura(buff)),
    )?;
    Ok(())
}
