//! Bit sets describing spells and attack outcomes
//!
//! Spell schools, proc masks, spell flags and hit outcomes are all plain
//! bit sets so predicates (spell mods, proc triggers) can test membership
//! with a single `intersects`/`contains`.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Number of distinct spell schools (indexable arrays use this length)
pub const SCHOOL_COUNT: usize = 7;

bitflags! {
    /// Damage school(s) of a spell. Multi-school spells set several bits.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct SpellSchool: u8 {
        const PHYSICAL = 1 << 0;
        const ARCANE   = 1 << 1;
        const FIRE     = 1 << 2;
        const FROST    = 1 << 3;
        const HOLY     = 1 << 4;
        const NATURE   = 1 << 5;
        const SHADOW   = 1 << 6;

        const MAGIC = Self::ARCANE.bits()
            | Self::FIRE.bits()
            | Self::FROST.bits()
            | Self::HOLY.bits()
            | Self::NATURE.bits()
            | Self::SHADOW.bits();
    }
}

impl SpellSchool {
    /// Index of a single-school value into per-school arrays.
    ///
    /// For multi-school values the lowest set bit wins.
    pub fn index(self) -> usize {
        if self.is_empty() {
            return 0;
        }
        self.bits().trailing_zeros() as usize
    }

    /// Single-school value for an array index
    pub fn from_index(index: usize) -> SpellSchool {
        SpellSchool::from_bits_truncate(1 << index.min(SCHOOL_COUNT - 1))
    }

    /// Whether any magic school is present
    pub fn is_magic(self) -> bool {
        self.intersects(SpellSchool::MAGIC)
    }

    /// Whether the school is purely physical
    pub fn is_physical(self) -> bool {
        self == SpellSchool::PHYSICAL
    }
}

bitflags! {
    /// What kind of attack a spell is, for proc and modifier filtering.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ProcMask: u32 {
        const MELEE_MH_AUTO    = 1 << 0;
        const MELEE_OH_AUTO    = 1 << 1;
        const MELEE_MH_SPECIAL = 1 << 2;
        const MELEE_OH_SPECIAL = 1 << 3;
        const RANGED_AUTO      = 1 << 4;
        const RANGED_SPECIAL   = 1 << 5;
        const SPELL_DAMAGE     = 1 << 6;
        const SPELL_HEALING    = 1 << 7;
        const MELEE_PROC       = 1 << 8;
        const RANGED_PROC      = 1 << 9;
        const SPELL_PROC       = 1 << 10;

        const MELEE_MH = Self::MELEE_MH_AUTO.bits() | Self::MELEE_MH_SPECIAL.bits();
        const MELEE_OH = Self::MELEE_OH_AUTO.bits() | Self::MELEE_OH_SPECIAL.bits();
        const MELEE = Self::MELEE_MH.bits() | Self::MELEE_OH.bits();
        const MELEE_WHITE = Self::MELEE_MH_AUTO.bits() | Self::MELEE_OH_AUTO.bits();
        const MELEE_SPECIAL = Self::MELEE_MH_SPECIAL.bits() | Self::MELEE_OH_SPECIAL.bits();
        const RANGED = Self::RANGED_AUTO.bits() | Self::RANGED_SPECIAL.bits();
        const WHITE_HIT = Self::MELEE_WHITE.bits() | Self::RANGED_AUTO.bits();
        const MELEE_OR_RANGED = Self::MELEE.bits() | Self::RANGED.bits();
        const SPELL = Self::SPELL_DAMAGE.bits() | Self::SPELL_HEALING.bits();
        const PROC = Self::MELEE_PROC.bits() | Self::RANGED_PROC.bits() | Self::SPELL_PROC.bits();
    }
}

impl ProcMask {
    /// Widen a trigger mask so it also matches secondary procs of the same
    /// category (melee procs for melee masks, and so on).
    pub fn with_proc_categories(self) -> ProcMask {
        let mut widened = self;
        if self.intersects(ProcMask::MELEE) {
            widened |= ProcMask::MELEE_PROC;
        }
        if self.intersects(ProcMask::RANGED) {
            widened |= ProcMask::RANGED_PROC;
        }
        if self.intersects(ProcMask::SPELL) {
            widened |= ProcMask::SPELL_PROC;
        }
        widened
    }

    /// Whether this mask describes a secondary proc rather than a primary action
    pub fn is_proc(self) -> bool {
        self.intersects(ProcMask::PROC)
    }
}

bitflags! {
    /// Behavioural switches on a spell.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct SpellFlags: u32 {
        const IGNORE_RESISTS            = 1 << 0;
        const IGNORE_ATTACKER_MODIFIERS = 1 << 1;
        const IGNORE_TARGET_MODIFIERS   = 1 << 2;
        const NO_ON_CAST_COMPLETE       = 1 << 3;
        const NO_METRICS                = 1 << 4;
        const NO_LOGS                   = 1 << 5;
        const NO_ON_DAMAGE_DEALT        = 1 << 6;
        const CHANNELED                 = 1 << 7;
        const CAST_WHILE_CASTING        = 1 << 8;
        const CAST_WHILE_CHANNELING     = 1 << 9;
        /// Lands fully or not at all; never partially resisted
        const BINARY                    = 1 << 10;
        /// Damage over time with no initial hit
        const PURE_DOT                  = 1 << 11;
        const APPLY_ARMOR_REDUCTION     = 1 << 12;
        const TREAT_AS_PERIODIC         = 1 << 13;
        const SUPPRESS_WEAPON_PROCS     = 1 << 14;
        const SUPPRESS_EQUIP_PROCS      = 1 << 15;
        /// Temporarily unavailable because its item is swapped out
        const SWAPPED                   = 1 << 16;
        const HELPFUL                   = 1 << 17;
        const PASSIVE                   = 1 << 18;
    }
}

bitflags! {
    /// Classification of a single resolved attack or tick.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct HitOutcome: u16 {
        const MISS      = 1 << 0;
        const HIT       = 1 << 1;
        const CRIT      = 1 << 2;
        const CRUSH     = 1 << 3;
        const BLOCK     = 1 << 4;
        const DODGE     = 1 << 5;
        const PARRY     = 1 << 6;
        const GLANCE    = 1 << 7;
        const PARTIAL25 = 1 << 8;
        const PARTIAL50 = 1 << 9;
        const PARTIAL75 = 1 << 10;
        const TICK      = 1 << 11;

        const PARTIAL = Self::PARTIAL25.bits() | Self::PARTIAL50.bits() | Self::PARTIAL75.bits();
        const LANDED = Self::HIT.bits()
            | Self::CRIT.bits()
            | Self::CRUSH.bits()
            | Self::GLANCE.bits()
            | Self::BLOCK.bits();
        const AVOIDED = Self::MISS.bits() | Self::DODGE.bits() | Self::PARRY.bits();
    }
}

impl HitOutcome {
    pub fn landed(self) -> bool {
        self.intersects(HitOutcome::LANDED)
    }

    pub fn is_partial_resist(self) -> bool {
        self.intersects(HitOutcome::PARTIAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_school_index_roundtrip() {
        for i in 0..SCHOOL_COUNT {
            assert_eq!(SpellSchool::from_index(i).index(), i);
        }
        assert_eq!(SpellSchool::SHADOW.index(), 6);
    }

    #[test]
    fn test_multi_school_is_magic() {
        let shadowfrost = SpellSchool::SHADOW | SpellSchool::FROST;
        assert!(shadowfrost.is_magic());
        assert!(!shadowfrost.is_physical());
        assert!(SpellSchool::PHYSICAL.is_physical());
    }

    #[test]
    fn test_proc_mask_widening() {
        let widened = ProcMask::MELEE_MH_AUTO.with_proc_categories();
        assert!(widened.contains(ProcMask::MELEE_PROC));
        assert!(!widened.contains(ProcMask::SPELL_PROC));

        let spell = ProcMask::SPELL_DAMAGE.with_proc_categories();
        assert!(spell.contains(ProcMask::SPELL_PROC));
    }

    #[test]
    fn test_landed_outcomes() {
        assert!((HitOutcome::BLOCK | HitOutcome::CRIT).landed());
        assert!(HitOutcome::GLANCE.landed());
        assert!(!HitOutcome::DODGE.landed());
        assert!(!HitOutcome::MISS.landed());
        assert!((HitOutcome::HIT | HitOutcome::PARTIAL50).is_partial_resist());
    }

    #[test]
    fn test_flags_parse_from_toml_strings() {
        #[derive(Deserialize)]
        struct Holder {
            flags: SpellFlags,
        }
        let holder: Holder = toml::from_str(r#"flags = "BINARY | CHANNELED""#).unwrap();
        assert!(holder.flags.contains(SpellFlags::BINARY));
        assert!(holder.flags.contains(SpellFlags::CHANNELED));
    }
}
