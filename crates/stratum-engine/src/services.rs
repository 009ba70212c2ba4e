//! Type-keyed owner of process-level services.
//!
//! At most one service of each type is registered. Services are torn down in
//! reverse registration order, either by [`ServiceRegistry::shutdown`] or when
//! the registry is dropped, so a service registered later may rely on earlier
//! ones during its own teardown.

use std::any::{Any, TypeId};
use std::collections::HashMap;

struct Entry {
    name: &'static str,
    service: Box<dyn Any>,
}

#[derive(Default)]
pub struct ServiceRegistry {
    /// Registration order.
    entries: Vec<Entry>,
    index: HashMap<TypeId, usize>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `service` and return a handle to it.
    ///
    /// # Panics
    ///
    /// Panics if a service of type `T` is already registered.
    pub fn register<T: 'static>(&mut self, service: T) -> &mut T {
        let name = std::any::type_name::<T>();
        assert!(
            !self.index.contains_key(&TypeId::of::<T>()),
            "duplicate service: {name}"
        );

        let slot = self.entries.len();
        self.index.insert(TypeId::of::<T>(), slot);
        self.entries.push(Entry {
            name,
            service: Box::new(service),
        });
        tracing::debug!(service = name, "service registered");

        match self.entries[slot].service.downcast_mut::<T>() {
            Some(service) => service,
            None => unreachable!("service stored under the wrong type id"),
        }
    }

    pub fn get<T: 'static>(&self) -> Option<&T> {
        let slot = *self.index.get(&TypeId::of::<T>())?;
        self.entries[slot].service.downcast_ref::<T>()
    }

    pub fn get_mut<T: 'static>(&mut self) -> Option<&mut T> {
        let slot = *self.index.get(&TypeId::of::<T>())?;
        self.entries[slot].service.downcast_mut::<T>()
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.index.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every service, newest first. Calling it again does nothing.
    pub fn shutdown(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        self.index.clear();
        while let Some(entry) = self.entries.pop() {
            tracing::debug!(service = entry.name, "service released");
            drop(entry.service);
        }
    }
}

impl Drop for ServiceRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| e.name))
            .finish()
    }
}
