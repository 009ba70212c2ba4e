//! Entity views and their per-group collections.
//!
//! A view is a small record that stamps an [`Egid`] and holds non-owning
//! [`ImplementerPtr`](crate::implementer::ImplementerPtr)s into implementer
//! pools. Views of one type are kept per group in a [`ViewCollection`]: a
//! packed, growable record buffer plus an index from entity ordinal to slot.
//!
//! ## Stability
//!
//! Appending to a collection may relocate its buffer. References returned by
//! the database borrow it, so the compiler already rejects holding one across
//! a reservation. Callers that must name a record across reservations keep a
//! [`ViewSlot`] instead; slots are never invalidated because records are never
//! removed.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

use crate::egid::Egid;

// ---------------------------------------------------------------------------
// EntityView / BindView
// ---------------------------------------------------------------------------

/// A record type that can be stored in a [`ViewCollection`].
///
/// `Default` plays the role of the zero-initialised record: every pointer
/// field starts unbound.
pub trait EntityView: Default + 'static {
    /// The identifier stamped on this record.
    fn gid(&self) -> Egid;
    /// Stamp the identifier. Called once, on reservation.
    fn set_gid(&mut self, gid: Egid);
}

/// A view whose pointer fields can be bound in one call.
///
/// `Fields` is a per-view struct naming each pointer with its implementer
/// type, so binding a pointer of the wrong type does not compile.
///
/// ```
/// use stratum_ecs::prelude::*;
///
/// #[derive(Default)]
/// struct Health(u32);
/// impl Implementer for Health {}
///
/// #[derive(Default)]
/// struct HealthView {
///     gid: Egid,
///     health: Option<ImplementerPtr<Health>>,
/// }
///
/// impl EntityView for HealthView {
///     fn gid(&self) -> Egid { self.gid }
///     fn set_gid(&mut self, gid: Egid) { self.gid = gid; }
/// }
///
/// struct HealthFields {
///     health: ImplementerPtr<Health>,
/// }
///
/// impl BindView for HealthView {
///     type Fields = HealthFields;
///     fn bind(&mut self, fields: HealthFields) {
///         self.health = Some(fields.health);
///     }
/// }
///
/// let mut db = EntityDatabase::new();
/// let egid = db.new_entity_id_in(groups::ACTIVE).unwrap();
/// let health = db.reserve_implementer::<Health>();
/// db.bind_view::<HealthView>(egid, HealthFields { health }).unwrap();
/// assert_eq!(db.query_one::<HealthView>(egid).unwrap().health, Some(health));
/// ```
pub trait BindView: EntityView {
    /// The typed pointers this view binds.
    type Fields;
    /// Assign every field. The identifier is already stamped.
    fn bind(&mut self, fields: Self::Fields);
}

// ---------------------------------------------------------------------------
// ViewSlot
// ---------------------------------------------------------------------------

/// Stable position of a record inside one [`ViewCollection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewSlot(pub(crate) usize);

impl ViewSlot {
    /// Record index within the collection.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

// ---------------------------------------------------------------------------
// ViewCollection
// ---------------------------------------------------------------------------

/// All records of one view type in one group.
pub struct ViewCollection<V> {
    group: u32,
    records: Vec<V>,
    /// Entity ordinal -> slot of its most recent record.
    index: BTreeMap<u32, usize>,
    /// How many appends outgrew a non-empty record buffer.
    relocations: usize,
}

impl<V: EntityView> ViewCollection<V> {
    /// Create an empty collection for `group`.
    pub fn new(group: u32) -> Self {
        Self {
            group,
            records: Vec::new(),
            index: BTreeMap::new(),
            relocations: 0,
        }
    }

    /// The group this collection belongs to.
    #[inline]
    pub fn group(&self) -> u32 {
        self.group
    }

    /// Number of records ever appended.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no record has been appended.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records that fit before the next relocation.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.records.capacity()
    }

    /// Number of appends that outgrew a non-empty buffer and reallocated it.
    /// The first allocation is not counted.
    #[inline]
    pub fn relocations(&self) -> usize {
        self.relocations
    }

    /// Append a default record stamped with `egid` and index it under
    /// `egid.entity()`.
    ///
    /// Re-reserving an entity repoints the index at the new record; the old
    /// record stays in the buffer and still counts towards [`len`](Self::len).
    pub fn reserve_slot(&mut self, egid: Egid) -> (ViewSlot, &mut V) {
        debug_assert_eq!(egid.group(), self.group);

        let slot = self.records.len();
        let before = self.records.capacity();
        let mut record = V::default();
        record.set_gid(egid);
        self.records.push(record);
        if slot > 0 && self.records.capacity() != before {
            self.relocations += 1;
            tracing::trace!(
                view = std::any::type_name::<V>(),
                group = self.group,
                len = self.records.len(),
                capacity = self.records.capacity(),
                "view buffer relocated"
            );
        }

        if let Some(previous) = self.index.insert(egid.entity(), slot) {
            tracing::warn!(
                view = std::any::type_name::<V>(),
                egid = %egid,
                previous_slot = previous,
                slot,
                "entity re-reserved; previous record is no longer indexed"
            );
        }

        (ViewSlot(slot), &mut self.records[slot])
    }

    /// Slot of the record indexed under `entity`.
    pub fn slot_of(&self, entity: u32) -> Option<ViewSlot> {
        self.index.get(&entity).copied().map(ViewSlot)
    }

    /// Record indexed under `entity`.
    pub fn get(&self, entity: u32) -> Option<&V> {
        let slot = *self.index.get(&entity)?;
        self.records.get(slot)
    }

    /// Mutable record indexed under `entity`.
    pub fn get_mut(&mut self, entity: u32) -> Option<&mut V> {
        let slot = *self.index.get(&entity)?;
        self.records.get_mut(slot)
    }

    /// Record at `slot`.
    pub fn at(&self, slot: ViewSlot) -> Option<&V> {
        self.records.get(slot.0)
    }

    /// Mutable record at `slot`.
    pub fn at_mut(&mut self, slot: ViewSlot) -> Option<&mut V> {
        self.records.get_mut(slot.0)
    }

    /// Every record, in append order.
    #[inline]
    pub fn as_slice(&self) -> &[V] {
        &self.records
    }

    /// Every record, mutably, in append order.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [V] {
        &mut self.records
    }

    /// `(entity, slot)` pairs for every indexed entity, by entity ordinal.
    pub fn indexed(&self) -> impl Iterator<Item = (u32, ViewSlot)> + '_ {
        self.index
            .iter()
            .map(|(&entity, &slot)| (entity, ViewSlot(slot)))
    }
}

impl<V> fmt::Debug for ViewCollection<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewCollection")
            .field("view", &std::any::type_name::<V>())
            .field("group", &self.group)
            .field("len", &self.records.len())
            .field("indexed", &self.index.len())
            .field("relocations", &self.relocations)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// AnyViewCollection -- type-erased handle used by the database registry
// ---------------------------------------------------------------------------

/// Object-safe face of a [`ViewCollection`], so collections of different view
/// types can share one registry and be downcast back on access.
pub(crate) trait AnyViewCollection: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn len(&self) -> usize;
    fn group(&self) -> u32;
    fn view_type_name(&self) -> &'static str;
}

impl<V: EntityView> AnyViewCollection for ViewCollection<V> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn len(&self) -> usize {
        self.records.len()
    }

    fn group(&self) -> u32 {
        self.group
    }

    fn view_type_name(&self) -> &'static str {
        std::any::type_name::<V>()
    }
}

impl fmt::Debug for dyn AnyViewCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyViewCollection")
            .field("view", &self.view_type_name())
            .field("group", &self.group())
            .field("len", &self.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
