//! The [`EntityDatabase`] is the top-level container of the storage engine. It
//! issues entity ids and owns every implementer pool and view collection.
//!
//! Pools are keyed by the implementer's `TypeId`; view collections by the
//! view's `TypeId` together with a group ordinal. Both are created lazily on
//! first reservation and live until the database is dropped.

use std::any::TypeId;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::egid::{groups, Egid};
use crate::implementer::{Implementer, ImplementerPool, ImplementerPtr, DEFAULT_BUCKET_BYTES};
use crate::view::{AnyViewCollection, BindView, EntityView, ViewCollection, ViewSlot};
use crate::DbError;

// ---------------------------------------------------------------------------
// DatabaseConfig
// ---------------------------------------------------------------------------

/// Tuning for an [`EntityDatabase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Bytes per implementer bucket. Each pool fits
    /// `bucket_byte_budget / size_of::<T>()` elements (at least one) per
    /// bucket. Budgets above
    /// [`MAX_BUCKET_BYTES`](crate::implementer::MAX_BUCKET_BYTES) are clamped.
    pub bucket_byte_budget: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            bucket_byte_budget: DEFAULT_BUCKET_BYTES,
        }
    }
}

// ---------------------------------------------------------------------------
// DatabaseStats
// ---------------------------------------------------------------------------

/// Point-in-time totals, for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DatabaseStats {
    /// Entity ids handed out so far.
    pub issued_entities: u32,
    /// Distinct implementer types with a pool.
    pub implementer_pools: usize,
    /// Implementers reserved across all pools.
    pub implementers: usize,
    /// Buckets allocated across all pools.
    pub buckets: usize,
    /// Distinct (view type, group) collections.
    pub view_collections: usize,
    /// Records appended across all collections.
    pub views: usize,
}

// ---------------------------------------------------------------------------
// ViewKey
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ViewKey {
    view: TypeId,
    group: u32,
}

impl ViewKey {
    fn of<V: 'static>(group: u32) -> Self {
        Self {
            view: TypeId::of::<V>(),
            group,
        }
    }
}

// ---------------------------------------------------------------------------
// EntityDatabase
// ---------------------------------------------------------------------------

/// Owner of all implementer pools and view collections.
///
/// Every operation is synchronous and all-or-nothing: a call that returns
/// `Err` has not changed the database.
pub struct EntityDatabase {
    config: DatabaseConfig,
    /// Last entity ordinal issued; 0 means none yet.
    id_counter: u32,
    /// One pool per implementer type.
    implementers: HashMap<TypeId, ImplementerPool>,
    /// One collection per (view type, group).
    views: HashMap<ViewKey, Box<dyn AnyViewCollection>>,
}

impl std::fmt::Debug for EntityDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityDatabase")
            .field("config", &self.config)
            .field("issued_entities", &self.id_counter)
            .field("implementer_pools", &self.implementers.len())
            .field("view_collections", &self.views.len())
            .finish()
    }
}

impl EntityDatabase {
    /// Create an empty database with the default bucket budget.
    pub fn new() -> Self {
        Self::with_config(DatabaseConfig::default())
    }

    /// Create an empty database.
    pub fn with_config(config: DatabaseConfig) -> Self {
        Self {
            config,
            id_counter: 0,
            implementers: HashMap::new(),
            views: HashMap::new(),
        }
    }

    /// The configuration this database was created with.
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    // -- identifiers --------------------------------------------------------

    /// Issue the next entity ordinal. The first call returns 1.
    pub fn new_entity_id(&mut self) -> Result<u32, DbError> {
        let next = self
            .id_counter
            .checked_add(1)
            .ok_or(DbError::EntityIdsExhausted {
                issued: self.id_counter,
            })?;
        self.id_counter = next;
        Ok(next)
    }

    /// Issue the next entity ordinal, packed with `group`.
    pub fn new_entity_id_in(&mut self, group: u32) -> Result<Egid, DbError> {
        check_group(group)?;
        let entity = self.new_entity_id()?;
        Ok(Egid::new(entity, group))
    }

    /// Number of entity ordinals issued so far (also the last one issued).
    pub fn issued_entities(&self) -> u32 {
        self.id_counter
    }

    // -- implementers -------------------------------------------------------

    /// Reserve a default-constructed `T` at an address that stays fixed for
    /// the lifetime of this database.
    pub fn reserve_implementer<T: Implementer>(&mut self) -> ImplementerPtr<T> {
        let budget = self.config.bucket_byte_budget;
        self.implementers
            .entry(TypeId::of::<T>())
            .or_insert_with(|| ImplementerPool::new::<T>(budget))
            .reserve::<T>()
    }

    /// Borrow an implementer reserved from this database.
    pub fn implementer<T: Implementer>(&self, ptr: ImplementerPtr<T>) -> Result<&T, DbError> {
        match self.implementers.get(&TypeId::of::<T>()) {
            Some(pool) => pool.get(ptr),
            None => Err(foreign::<T>(ptr)),
        }
    }

    /// Mutably borrow an implementer reserved from this database.
    pub fn implementer_mut<T: Implementer>(
        &mut self,
        ptr: ImplementerPtr<T>,
    ) -> Result<&mut T, DbError> {
        match self.implementers.get_mut(&TypeId::of::<T>()) {
            Some(pool) => pool.get_mut(ptr),
            None => Err(foreign::<T>(ptr)),
        }
    }

    /// The pool backing `T`, if any `T` has been reserved.
    pub fn implementer_pool<T: Implementer>(&self) -> Option<&ImplementerPool> {
        self.implementers.get(&TypeId::of::<T>())
    }

    /// Number of `T`s reserved.
    pub fn implementer_count<T: Implementer>(&self) -> usize {
        self.implementer_pool::<T>().map_or(0, ImplementerPool::len)
    }

    /// Number of buckets allocated for `T`.
    pub fn bucket_count<T: Implementer>(&self) -> usize {
        self.implementer_pool::<T>()
            .map_or(0, ImplementerPool::bucket_count)
    }

    // -- view collections ---------------------------------------------------

    fn collection<V: EntityView>(&self, group: u32) -> Option<&ViewCollection<V>> {
        self.views
            .get(&ViewKey::of::<V>(group))
            .and_then(|views| views.as_any().downcast_ref::<ViewCollection<V>>())
    }

    fn collection_mut<V: EntityView>(&mut self, group: u32) -> Option<&mut ViewCollection<V>> {
        self.views
            .get_mut(&ViewKey::of::<V>(group))
            .and_then(|views| views.as_any_mut().downcast_mut::<ViewCollection<V>>())
    }

    fn collection_or_insert<V: EntityView>(&mut self, group: u32) -> &mut ViewCollection<V> {
        let views = self.views.entry(ViewKey::of::<V>(group)).or_insert_with(|| {
            tracing::debug!(
                view = std::any::type_name::<V>(),
                group,
                "created view collection"
            );
            Box::new(ViewCollection::<V>::new(group))
        });
        match views.as_any_mut().downcast_mut::<ViewCollection<V>>() {
            Some(views) => views,
            // The key carries `TypeId::of::<V>()`, so the entry always holds a
            // `ViewCollection<V>`.
            None => unreachable!(
                "view collection keyed by {} holds another type",
                std::any::type_name::<V>()
            ),
        }
    }

    /// Append a default `V` for `egid` to the `(V, egid.group())` collection
    /// and return it.
    ///
    /// The returned reference borrows the database; any further reservation
    /// may move the record. Use [`reserve_view_slot`](Self::reserve_view_slot)
    /// for a handle that survives.
    pub fn reserve_view<V: EntityView>(&mut self, egid: Egid) -> Result<&mut V, DbError> {
        check_egid(egid)?;
        let (_, record) = self.collection_or_insert::<V>(egid.group()).reserve_slot(egid);
        Ok(record)
    }

    /// As [`reserve_view`](Self::reserve_view), returning the stable slot.
    pub fn reserve_view_slot<V: EntityView>(&mut self, egid: Egid) -> Result<ViewSlot, DbError> {
        check_egid(egid)?;
        let (slot, _) = self.collection_or_insert::<V>(egid.group()).reserve_slot(egid);
        Ok(slot)
    }

    /// Reserve a `V` for `egid` and bind its pointer fields.
    pub fn bind_view<V: BindView>(&mut self, egid: Egid, fields: V::Fields) -> Result<&mut V, DbError> {
        let record = self.reserve_view::<V>(egid)?;
        record.bind(fields);
        Ok(record)
    }

    /// Every `V` record in `group`, in append order. Empty if nothing was
    /// reserved there.
    pub fn query_group<V: EntityView>(&self, group: u32) -> Result<&[V], DbError> {
        check_group(group)?;
        Ok(self
            .collection::<V>(group)
            .map_or(&[][..], ViewCollection::as_slice))
    }

    /// Mutable form of [`query_group`](Self::query_group).
    pub fn query_group_mut<V: EntityView>(&mut self, group: u32) -> Result<&mut [V], DbError> {
        check_group(group)?;
        Ok(match self.collection_mut::<V>(group) {
            Some(views) => views.as_mut_slice(),
            None => Default::default(),
        })
    }

    /// The `V` record most recently reserved for `egid`.
    pub fn query_one<V: EntityView>(&self, egid: Egid) -> Result<&V, DbError> {
        check_egid(egid)?;
        self.collection::<V>(egid.group())
            .and_then(|views| views.get(egid.entity()))
            .ok_or_else(|| unreserved::<V>(egid))
    }

    /// Mutable form of [`query_one`](Self::query_one).
    pub fn query_one_mut<V: EntityView>(&mut self, egid: Egid) -> Result<&mut V, DbError> {
        check_egid(egid)?;
        self.collection_mut::<V>(egid.group())
            .and_then(|views| views.get_mut(egid.entity()))
            .ok_or_else(|| unreserved::<V>(egid))
    }

    /// Stable slot of the `V` record most recently reserved for `egid`.
    pub fn view_slot<V: EntityView>(&self, egid: Egid) -> Result<ViewSlot, DbError> {
        check_egid(egid)?;
        self.collection::<V>(egid.group())
            .and_then(|views| views.slot_of(egid.entity()))
            .ok_or_else(|| unreserved::<V>(egid))
    }

    /// The `V` record at `slot` in `group`.
    pub fn view_at<V: EntityView>(&self, group: u32, slot: ViewSlot) -> Result<&V, DbError> {
        check_group(group)?;
        let views = self.collection::<V>(group);
        let len = views.map_or(0, ViewCollection::len);
        views
            .and_then(|views| views.at(slot))
            .ok_or_else(|| out_of_range::<V>(group, slot, len))
    }

    /// Mutable form of [`view_at`](Self::view_at).
    pub fn view_at_mut<V: EntityView>(
        &mut self,
        group: u32,
        slot: ViewSlot,
    ) -> Result<&mut V, DbError> {
        check_group(group)?;
        let len = self.view_count::<V>(group);
        self.collection_mut::<V>(group)
            .and_then(|views| views.at_mut(slot))
            .ok_or_else(|| out_of_range::<V>(group, slot, len))
    }

    /// Number of `V` records ever appended to `group`.
    pub fn view_count<V: EntityView>(&self, group: u32) -> usize {
        self.collection::<V>(group).map_or(0, ViewCollection::len)
    }

    /// Number of times the `(V, group)` buffer moved while growing.
    pub fn view_relocations<V: EntityView>(&self, group: u32) -> usize {
        self.collection::<V>(group)
            .map_or(0, ViewCollection::relocations)
    }

    /// Groups holding at least one `V` collection, ascending.
    pub fn groups_of<V: EntityView>(&self) -> Vec<u32> {
        let view = TypeId::of::<V>();
        let mut groups: Vec<u32> = self
            .views
            .keys()
            .filter(|key| key.view == view)
            .map(|key| key.group)
            .collect();
        groups.sort_unstable();
        groups
    }

    /// Totals across every pool and collection.
    pub fn stats(&self) -> DatabaseStats {
        DatabaseStats {
            issued_entities: self.id_counter,
            implementer_pools: self.implementers.len(),
            implementers: self.implementers.values().map(ImplementerPool::len).sum(),
            buckets: self
                .implementers
                .values()
                .map(ImplementerPool::bucket_count)
                .sum(),
            view_collections: self.views.len(),
            views: self.views.values().map(|views| views.len()).sum(),
        }
    }
}

impl Default for EntityDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EntityDatabase {
    fn drop(&mut self) {
        let stats = self.stats();
        tracing::debug!(
            issued_entities = stats.issued_entities,
            implementers = stats.implementers,
            buckets = stats.buckets,
            views = stats.views,
            "tearing down entity database"
        );
        // Views point into the pools; drop them first.
        self.views.clear();
        self.implementers.clear();
    }
}

// ---------------------------------------------------------------------------
// Precondition helpers
// ---------------------------------------------------------------------------

fn check_group(group: u32) -> Result<(), DbError> {
    if group == groups::INVALID {
        return Err(DbError::InvalidGroup { group });
    }
    Ok(())
}

fn check_egid(egid: Egid) -> Result<(), DbError> {
    if !egid.is_valid() {
        return Err(DbError::InvalidEgid { egid });
    }
    check_group(egid.group())
}

fn unreserved<V>(egid: Egid) -> DbError {
    DbError::UnreservedEntity {
        view: std::any::type_name::<V>(),
        entity: egid.entity(),
        group: egid.group(),
    }
}

fn out_of_range<V>(group: u32, slot: ViewSlot, len: usize) -> DbError {
    DbError::SlotOutOfRange {
        view: std::any::type_name::<V>(),
        group,
        slot: slot.index(),
        len,
    }
}

fn foreign<T>(ptr: ImplementerPtr<T>) -> DbError {
    DbError::ForeignImplementer {
        implementer: std::any::type_name::<T>(),
        addr: ptr.addr(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
