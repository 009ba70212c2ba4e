//! Pointer-stable implementer storage.
//!
//! An [`ImplementerPool`] stores every value of one implementer type in a list
//! of fixed-capacity buckets. Each bucket is allocated once, sized to the
//! database's byte budget, and never resized or moved, so the address handed
//! out by [`ImplementerPool::reserve`] stays valid until the pool is dropped.
//!
//! # Safety
//!
//! Buckets are type-erased byte blocks. The pool remembers the concrete type
//! through a vtable captured at construction; every typed
//! entry point checks the requested type against it before touching memory.
// Note: unsafe_code is allowed on this module via #[allow(unsafe_code)] in lib.rs

use std::alloc::{self, Layout};
use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ptr::{self, NonNull};

use crate::DbError;

/// Bucket byte budget used when no [`DatabaseConfig`](crate::DatabaseConfig)
/// overrides it.
pub const DEFAULT_BUCKET_BYTES: usize = 32_000;

/// Largest bucket byte budget a pool honors (16 MiB). Larger budgets are
/// clamped to it.
pub const MAX_BUCKET_BYTES: usize = 1 << 24;

// ---------------------------------------------------------------------------
// Implementer
// ---------------------------------------------------------------------------

/// Marker for types that may be stored in an [`ImplementerPool`].
///
/// Implementers are plain component values. They are default-constructed on
/// reservation and dropped when the owning pool is dropped; nothing else is
/// required of them.
pub trait Implementer: Default + 'static {}

// ---------------------------------------------------------------------------
// ImplementerPtr
// ---------------------------------------------------------------------------

/// A non-owning pointer to a reserved implementer.
///
/// The pointee lives in a bucket of the pool that issued it and never moves.
/// Holding an `ImplementerPtr` does not keep the pool alive; dereferencing one
/// after the owning database is dropped is undefined behaviour, which is why
/// the dereferencing methods are `unsafe`. Prefer
/// [`EntityDatabase::implementer`](crate::database::EntityDatabase::implementer)
/// when a database is at hand.
pub struct ImplementerPtr<T> {
    ptr: NonNull<T>,
    _marker: PhantomData<*mut T>,
}

impl<T> ImplementerPtr<T> {
    #[inline]
    pub(crate) fn new(ptr: NonNull<T>) -> Self {
        Self {
            ptr,
            _marker: PhantomData,
        }
    }

    /// The raw pointer.
    #[inline]
    pub fn as_ptr(self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// The pointee's address, for identity comparisons and logging.
    #[inline]
    pub fn addr(self) -> usize {
        self.ptr.as_ptr() as usize
    }

    /// Borrow the implementer.
    ///
    /// # Safety
    ///
    /// The issuing pool must still be alive, and no `&mut` to the same
    /// implementer may exist for the chosen lifetime.
    #[inline]
    pub unsafe fn as_ref<'a>(self) -> &'a T {
        &*self.ptr.as_ptr()
    }

    /// Mutably borrow the implementer.
    ///
    /// # Safety
    ///
    /// The issuing pool must still be alive, and no other reference to the
    /// same implementer may exist for the chosen lifetime.
    #[inline]
    pub unsafe fn as_mut<'a>(self) -> &'a mut T {
        &mut *self.ptr.as_ptr()
    }
}

impl<T> Clone for ImplementerPtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ImplementerPtr<T> {}

impl<T> PartialEq for ImplementerPtr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr
    }
}

impl<T> Eq for ImplementerPtr<T> {}

impl<T> Hash for ImplementerPtr<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ptr.hash(state);
    }
}

impl<T> fmt::Debug for ImplementerPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ImplementerPtr<{}>({:#x})",
            std::any::type_name::<T>(),
            self.addr()
        )
    }
}

// ---------------------------------------------------------------------------
// ImplementerVtable -- type-erased operations for an implementer type
// ---------------------------------------------------------------------------

/// Function pointer and layout facts for the concrete type stored in a pool.
#[derive(Clone)]
pub(crate) struct ImplementerVtable {
    /// Drop `len` contiguous values starting at the pointer.
    drop_fn: unsafe fn(*mut u8, usize),
    size: usize,
    align: usize,
    type_id: TypeId,
    type_name: &'static str,
}

impl ImplementerVtable {
    fn new<T: Implementer>() -> Self {
        unsafe fn drop_fn_impl<T>(data: *mut u8, len: usize) {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(data as *mut T, len));
        }

        Self {
            drop_fn: drop_fn_impl::<T>,
            size: std::mem::size_of::<T>(),
            align: std::mem::align_of::<T>(),
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }
}

impl fmt::Debug for ImplementerVtable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImplementerVtable")
            .field("type_name", &self.type_name)
            .field("size", &self.size)
            .field("align", &self.align)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Bucket
// ---------------------------------------------------------------------------

/// One fixed-capacity block. `len` counts the initialised prefix.
struct Bucket {
    data: NonNull<u8>,
    len: usize,
}

// ---------------------------------------------------------------------------
// ImplementerPool
// ---------------------------------------------------------------------------

/// A bucketed arena for a single implementer type.
///
/// Reservation `n` lands in bucket `n / capacity` at offset `n % capacity`,
/// where `capacity = byte_budget / size_of::<T>()` (at least 1) and the budget
/// is clamped to `1..=`[`MAX_BUCKET_BYTES`]. Growth only appends buckets.
pub struct ImplementerPool {
    vtable: ImplementerVtable,
    /// Allocation layout of one bucket; `None` for zero-sized types.
    bucket_layout: Option<Layout>,
    bucket_capacity: usize,
    buckets: Vec<Bucket>,
    count: usize,
}

impl ImplementerPool {
    /// Create an empty pool for `T` whose buckets hold `byte_budget` bytes,
    /// clamped to at most [`MAX_BUCKET_BYTES`].
    pub fn new<T: Implementer>(byte_budget: usize) -> Self {
        let vtable = ImplementerVtable::new::<T>();
        if byte_budget > MAX_BUCKET_BYTES {
            tracing::warn!(
                implementer = vtable.type_name,
                byte_budget,
                max = MAX_BUCKET_BYTES,
                "bucket byte budget clamped"
            );
        }
        let byte_budget = byte_budget.clamp(1, MAX_BUCKET_BYTES);
        let bucket_capacity = if vtable.size == 0 {
            byte_budget
        } else {
            (byte_budget / vtable.size).max(1)
        };
        let bucket_layout = if vtable.size == 0 {
            None
        } else {
            // capacity * size <= max(MAX_BUCKET_BYTES, size_of::<T>()), which
            // always fits a layout.
            match Layout::array::<T>(bucket_capacity) {
                Ok(layout) => Some(layout),
                Err(_) => unreachable!(
                    "bucket of {bucket_capacity} x '{}' exceeds the maximum allocation size",
                    vtable.type_name
                ),
            }
        };
        tracing::debug!(
            implementer = vtable.type_name,
            bucket_capacity,
            element_size = vtable.size,
            "created implementer pool"
        );
        Self {
            vtable,
            bucket_layout,
            bucket_capacity,
            buckets: Vec::new(),
            count: 0,
        }
    }

    /// Number of reserved implementers.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether nothing has been reserved yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of allocated buckets.
    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Elements per bucket.
    #[inline]
    pub fn bucket_capacity(&self) -> usize {
        self.bucket_capacity
    }

    /// `size_of` the stored type.
    #[inline]
    pub fn element_size(&self) -> usize {
        self.vtable.size
    }

    /// `TypeId` of the stored type.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.vtable.type_id
    }

    /// Name of the stored type.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.vtable.type_name
    }

    // -- internal helpers ---------------------------------------------------

    fn push_bucket(&mut self) {
        let data = match self.bucket_layout {
            Some(layout) => {
                let raw = unsafe { alloc::alloc_zeroed(layout) };
                match NonNull::new(raw) {
                    Some(data) => data,
                    None => alloc::handle_alloc_error(layout),
                }
            }
            // ZST: every element shares one dangling, well-aligned address.
            None => unsafe { NonNull::new_unchecked(self.vtable.align as *mut u8) },
        };
        self.buckets.push(Bucket { data, len: 0 });
        tracing::trace!(
            implementer = self.vtable.type_name,
            bucket = self.buckets.len() - 1,
            capacity = self.bucket_capacity,
            "allocated implementer bucket"
        );
    }

    fn check_type<T: 'static>(&self) -> Result<(), DbError> {
        if self.vtable.type_id == TypeId::of::<T>() {
            Ok(())
        } else {
            Err(DbError::ImplementerTypeMismatch {
                expected: self.vtable.type_name,
                found: std::any::type_name::<T>(),
            })
        }
    }

    // -- public typed access ------------------------------------------------

    /// Reserve the next implementer, default-constructed, and return its
    /// stable address.
    ///
    /// A new bucket is appended when the current one is full; existing
    /// elements are never moved. Allocation failure aborts through
    /// [`std::alloc::handle_alloc_error`].
    ///
    /// # Panics
    ///
    /// Panics if `T` is not the type this pool was created for.
    pub fn reserve<T: Implementer>(&mut self) -> ImplementerPtr<T> {
        if let Err(err) = self.check_type::<T>() {
            panic!("{err}");
        }

        let bucket_index = self.count / self.bucket_capacity;
        let sub_index = self.count % self.bucket_capacity;
        if bucket_index == self.buckets.len() {
            self.push_bucket();
        }

        let bucket = &mut self.buckets[bucket_index];
        debug_assert_eq!(bucket.len, sub_index);
        // Safety: `sub_index < bucket_capacity`, so the slot lies inside the
        // bucket allocation, is suitably aligned for `T`, and is not yet
        // initialised (it is exactly the bucket's `len`).
        let slot = unsafe {
            let slot = (bucket.data.as_ptr() as *mut T).add(sub_index);
            ptr::write(slot, T::default());
            NonNull::new_unchecked(slot)
        };
        bucket.len += 1;
        self.count += 1;
        ImplementerPtr::new(slot)
    }

    /// Whether `addr` is the address of a live element of this pool.
    pub fn contains_addr(&self, addr: usize) -> bool {
        let size = self.vtable.size;
        if size == 0 {
            return self.count > 0 && addr == self.vtable.align;
        }
        self.buckets.iter().any(|bucket| {
            let start = bucket.data.as_ptr() as usize;
            let end = start + bucket.len * size;
            addr >= start && addr < end && (addr - start) % size == 0
        })
    }

    /// Whether `ptr` was issued by this pool.
    pub fn contains<T: 'static>(&self, ptr: ImplementerPtr<T>) -> bool {
        self.vtable.type_id == TypeId::of::<T>() && self.contains_addr(ptr.addr())
    }

    /// Borrow an implementer issued by this pool.
    pub fn get<T: 'static>(&self, ptr: ImplementerPtr<T>) -> Result<&T, DbError> {
        self.check_type::<T>()?;
        if !self.contains_addr(ptr.addr()) {
            return Err(DbError::ForeignImplementer {
                implementer: self.vtable.type_name,
                addr: ptr.addr(),
            });
        }
        // Safety: the address is a live, initialised `T` inside one of our
        // buckets, and `&self` prevents a concurrent `get_mut`.
        Ok(unsafe { ptr.as_ref() })
    }

    /// Mutably borrow an implementer issued by this pool.
    pub fn get_mut<T: 'static>(&mut self, ptr: ImplementerPtr<T>) -> Result<&mut T, DbError> {
        self.check_type::<T>()?;
        if !self.contains_addr(ptr.addr()) {
            return Err(DbError::ForeignImplementer {
                implementer: self.vtable.type_name,
                addr: ptr.addr(),
            });
        }
        // Safety: as in `get`, and `&mut self` makes the borrow exclusive.
        Ok(unsafe { ptr.as_mut() })
    }
}

impl Drop for ImplementerPool {
    fn drop(&mut self) {
        for bucket in self.buckets.drain(..) {
            unsafe {
                (self.vtable.drop_fn)(bucket.data.as_ptr(), bucket.len);
                if let Some(layout) = self.bucket_layout {
                    alloc::dealloc(bucket.data.as_ptr(), layout);
                }
            }
        }
        self.count = 0;
    }
}

impl fmt::Debug for ImplementerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImplementerPool")
            .field("vtable", &self.vtable)
            .field("len", &self.count)
            .field("bucket_count", &self.buckets.len())
            .field("bucket_capacity", &self.bucket_capacity)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
