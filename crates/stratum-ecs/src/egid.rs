//! Entity-group identifiers.
//!
//! An [`Egid`] is a 64-bit handle that packs a *group* ordinal in the high 32
//! bits and an *entity* ordinal in the low 32 bits. The packed value `0` is
//! reserved as the invalid sentinel, and ordering follows the packed value, so
//! ids sort group-major, entity-minor.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

/// Stock group ordinals used to partition view collections.
///
/// Any non-zero `u32` is a usable group; these are the labels the engine
/// layer builds its entities into.
pub mod groups {
    /// Reserved. No reservation or query may use group 0.
    pub const INVALID: u32 = 0;
    /// Entities that exist but are skipped by per-frame engines.
    pub const INACTIVE: u32 = 1;
    /// Entities iterated by per-frame engines.
    pub const ACTIVE: u32 = 2;
    /// Scratch group for entities not yet sorted into one of the above.
    pub const FREE: u32 = 3;
}

// ---------------------------------------------------------------------------
// Egid
// ---------------------------------------------------------------------------

/// A packed entity + group identifier.
///
/// Layout: `[group: u32 | entity: u32]`
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Egid(u64);

impl Egid {
    /// The invalid sentinel (packed value 0).
    pub const INVALID: Egid = Egid(0);

    /// Entity 1 in group 0. Valid, but not usable for reservations since its
    /// group is the reserved one.
    pub const DEFAULT: Egid = Egid(1);

    /// Pack an entity ordinal and a group ordinal.
    #[inline]
    pub const fn new(entity: u32, group: u32) -> Self {
        Self((group as u64) << 32 | entity as u64)
    }

    /// The entity portion (low 32 bits).
    #[inline]
    pub const fn entity(self) -> u32 {
        self.0 as u32
    }

    /// The group portion (high 32 bits).
    #[inline]
    pub const fn group(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// `false` only for the zero value.
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 > 0
    }

    /// Raw `u64` representation.
    #[inline]
    pub const fn to_raw(self) -> u64 {
        self.0
    }

    /// Reconstruct from a raw `u64`.
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<u64> for Egid {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<Egid> for u64 {
    fn from(egid: Egid) -> Self {
        egid.0
    }
}

impl fmt::Debug for Egid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Egid({}@{})", self.entity(), self.group())
    }
}

impl fmt::Display for Egid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.entity(), self.group())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_and_unpack() {
        let id = Egid::new(42, groups::ACTIVE);
        assert_eq!(id.entity(), 42);
        assert_eq!(id.group(), groups::ACTIVE);
        assert_eq!(id.to_raw(), (2u64 << 32) | 42);
    }

    #[test]
    fn zero_is_the_only_invalid_value() {
        assert!(!Egid::new(0, 0).is_valid());
        assert!(!Egid::INVALID.is_valid());
        assert!(!Egid::default().is_valid());
        assert!(Egid::DEFAULT.is_valid());
        // A zero entity in a non-zero group still packs to a non-zero value.
        assert!(Egid::new(0, groups::ACTIVE).is_valid());
    }

    #[test]
    fn ordering_is_group_major() {
        let a = Egid::new(u32::MAX, groups::INACTIVE);
        let b = Egid::new(1, groups::ACTIVE);
        assert!(a < b);
        assert!(Egid::new(1, groups::ACTIVE) < Egid::new(2, groups::ACTIVE));
    }

    #[test]
    fn extremes_survive_packing() {
        let id = Egid::new(u32::MAX, u32::MAX);
        assert_eq!(id.entity(), u32::MAX);
        assert_eq!(id.group(), u32::MAX);
        assert_eq!(Egid::from_raw(id.to_raw()), id);
        assert_eq!(Egid::from(u64::from(id)), id);
    }

    #[test]
    fn display_and_debug() {
        let id = Egid::new(7, groups::FREE);
        assert_eq!(id.to_string(), "7@3");
        assert_eq!(format!("{id:?}"), "Egid(7@3)");
    }

    #[test]
    fn serde_uses_the_packed_value() {
        let id = Egid::new(5, groups::ACTIVE);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, id.to_raw().to_string());
        let back: Egid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
