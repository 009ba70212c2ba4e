//! Stratum ECS -- pointer-stable implementer pools with group-partitioned views.
//!
//! Component values ("implementers") live in per-type bucketed pools whose
//! elements never move once reserved. Engines publish small view records that
//! point at those implementers, partitioned by view type and group, and later
//! query them back in bulk (per group) or by [`Egid`](egid::Egid).
//!
//! # Quick Start
//!
//! ```
//! use stratum_ecs::prelude::*;
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Position { x: f32, y: f32 }
//! impl Implementer for Position {}
//!
//! #[derive(Default)]
//! struct PositionView { gid: Egid, position: Option<ImplementerPtr<Position>> }
//!
//! impl EntityView for PositionView {
//!     fn gid(&self) -> Egid { self.gid }
//!     fn set_gid(&mut self, gid: Egid) { self.gid = gid; }
//! }
//!
//! let mut db = EntityDatabase::new();
//! let egid = db.new_entity_id_in(groups::ACTIVE).unwrap();
//! let position = db.reserve_implementer::<Position>();
//! db.reserve_view::<PositionView>(egid).unwrap().position = Some(position);
//!
//! assert_eq!(db.query_group::<PositionView>(groups::ACTIVE).unwrap().len(), 1);
//! assert_eq!(db.implementer(position).unwrap(), &Position { x: 0.0, y: 0.0 });
//! ```

#![deny(unsafe_code)]

pub mod database;
pub mod egid;
#[allow(unsafe_code)]
pub mod implementer;
pub mod view;

pub use database::{DatabaseConfig, DatabaseStats, EntityDatabase};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by database operations.
///
/// Every variant reports a caller bug (a broken precondition). The failing
/// operation has made no change.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DbError {
    /// The zero id cannot own views.
    #[error("invalid egid {egid:?}: the zero id cannot own resources")]
    InvalidEgid { egid: egid::Egid },

    /// Group 0 is reserved.
    #[error("group {group} is reserved and cannot be used for reservations or queries")]
    InvalidGroup { group: u32 },

    /// No record of this view type was reserved for the entity in the group.
    #[error("entity {entity} was never reserved for view '{view}' in group {group}")]
    UnreservedEntity {
        view: &'static str,
        entity: u32,
        group: u32,
    },

    /// Every `u32` entity ordinal has been issued.
    #[error("entity id counter exhausted after issuing {issued} ids")]
    EntityIdsExhausted { issued: u32 },

    /// The pointer was not issued by this database's pool for its type.
    #[error("pointer {addr:#x} does not refer to a live '{implementer}' in this database")]
    ForeignImplementer {
        implementer: &'static str,
        addr: usize,
    },

    /// A pool was asked for a type other than the one it stores.
    #[error("pool stores '{expected}' but '{found}' was requested")]
    ImplementerTypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// A [`ViewSlot`](view::ViewSlot) past the end of its collection.
    #[error("slot {slot} is out of range for view '{view}' in group {group} ({len} records)")]
    SlotOutOfRange {
        view: &'static str,
        group: u32,
        slot: usize,
        len: usize,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::database::{DatabaseConfig, DatabaseStats, EntityDatabase};
    pub use crate::egid::{groups, Egid};
    pub use crate::implementer::{
        Implementer, ImplementerPool, ImplementerPtr, DEFAULT_BUCKET_BYTES, MAX_BUCKET_BYTES,
    };
    pub use crate::view::{BindView, EntityView, ViewCollection, ViewSlot};
    pub use crate::DbError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------
