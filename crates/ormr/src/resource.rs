//! # Resources — Type-Keyed Singletons
//!
//! A resource is per-app state that exists exactly once and belongs to no
//! entity: the tick clock, an input snapshot, a rendering context the host
//! hands in. [`Resources`] is a bag of such values, each slot addressed by
//! its Rust type — `resources.get::<Time>()` — so a system names the type it
//! wants and the store does the lookup. At most one value per type can exist,
//! which is the point: the type *is* the key.
//!
//! Two storage modes, differing in who owns the value:
//!
//! * **Owned** ([`Resources::insert`]) — the store takes the value and keeps
//!   it until it is removed or replaced. The default for anything the app
//!   itself creates.
//! * **Shared** ([`Resources::insert_shared`]) — the store keeps one `Arc`
//!   clone while the host keeps another. Made for singletons the frame
//!   driver cannot give away (it still renders with that context every
//!   frame) yet systems must reach; the `Arc` lets both sides hold it with
//!   no lifetime tie between them.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// Type-keyed singleton storage.
pub struct Resources {
    owned: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    shared: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Resources {
    pub fn new() -> Self {
        Self {
            owned: HashMap::new(),
            shared: HashMap::new(),
        }
    }

    // ── Owned resources ──────────────────────────────────────────────

    /// Insert an owned resource. Replaces any existing resource of the same
    /// type.
    pub fn insert<T: 'static + Send + Sync>(&mut self, value: T) {
        self.owned.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Shared reference to an owned resource.
    ///
    /// # Panics
    ///
    /// Panics if the resource was never inserted. Use [`get`](Self::get) for
    /// the fallible variant.
    pub fn resource<T: 'static + Send + Sync>(&self) -> &T {
        self.get::<T>().unwrap_or_else(|| {
            panic!("resource `{}` was never inserted", std::any::type_name::<T>())
        })
    }

    /// Mutable reference to an owned resource.
    ///
    /// # Panics
    ///
    /// Panics if the resource was never inserted.
    pub fn resource_mut<T: 'static + Send + Sync>(&mut self) -> &mut T {
        self.get_mut::<T>().unwrap_or_else(|| {
            panic!("resource `{}` was never inserted", std::any::type_name::<T>())
        })
    }

    /// Shared reference to an owned resource, `None` if absent.
    pub fn get<T: 'static + Send + Sync>(&self) -> Option<&T> {
        self.owned.get(&TypeId::of::<T>())?.downcast_ref::<T>()
    }

    /// Mutable reference to an owned resource, `None` if absent.
    pub fn get_mut<T: 'static + Send + Sync>(&mut self) -> Option<&mut T> {
        self.owned.get_mut(&TypeId::of::<T>())?.downcast_mut::<T>()
    }

    /// Remove an owned resource, taking ownership. `None` if absent.
    ///
    /// Useful for the extract/reinsert pattern when a resource must be
    /// borrowed alongside the rest of the app.
    pub fn remove<T: 'static + Send + Sync>(&mut self) -> Option<T> {
        self.owned
            .remove(&TypeId::of::<T>())
            .and_then(|b| b.downcast::<T>().ok())
            .map(|b| *b)
    }

    // ── Shared (host-owned) resources ────────────────────────────────

    /// Publish a host-owned singleton by shared handle. Replaces any prior
    /// handle of the same type. The host keeps its own `Arc` and remains the
    /// value's primary owner.
    pub fn insert_shared<T: 'static + Send + Sync>(&mut self, value: Arc<T>) {
        self.shared.insert(TypeId::of::<T>(), value);
    }

    /// A clone of the published handle, `None` if absent.
    pub fn get_shared<T: 'static + Send + Sync>(&self) -> Option<Arc<T>> {
        let handle = self.shared.get(&TypeId::of::<T>())?.clone();
        handle.downcast::<T>().ok()
    }

    /// Unpublish a shared resource, returning the store's handle.
    pub fn remove_shared<T: 'static + Send + Sync>(&mut self) -> Option<Arc<T>> {
        self.shared
            .remove(&TypeId::of::<T>())
            .and_then(|handle| handle.downcast::<T>().ok())
    }

    // ── Common ───────────────────────────────────────────────────────

    /// Whether a resource of type `T` exists, owned or shared.
    pub fn has<T: 'static + Send + Sync>(&self) -> bool {
        let tid = TypeId::of::<T>();
        self.owned.contains_key(&tid) || self.shared.contains_key(&tid)
    }

    /// Drop every resource, owned and shared.
    pub fn clear(&mut self) {
        self.owned.clear();
        self.shared.clear();
    }
}

impl Default for Resources {
    fn default() -> Self {
        Self::new()
    }
}
