//! # Component Registry — Dense Runtime Type Identifiers
//!
//! Archetype signatures are sorted, hashed, and compared constantly, so the
//! registry maps every component type to a small dense [`ComponentId`] instead
//! of working with [`TypeId`]s directly. A `TypeId` is an opaque 64/128-bit
//! value with no useful ordering; a `ComponentId` is just the next counter
//! value, which keeps signatures cheap to sort and compare and lets archetypes
//! key their columns with a plain integer.
//!
//! Registration is explicit and idempotent. Ids are assigned in registration
//! order, are unique within one [`World`](super::world::World), and are never
//! reused — component types cannot be unregistered.

use std::any::TypeId;
use std::collections::HashMap;

/// Dense identifier for a registered component type.
///
/// Assigned sequentially on first registration. Not stable across worlds: two
/// worlds that register the same types in different orders assign different
/// ids.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ComponentId(pub(crate) u32);

impl ComponentId {
    /// The raw dense index.
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Metadata recorded once per registered component type.
pub struct ComponentInfo {
    /// The Rust type identity behind this id.
    pub type_id: TypeId,
    /// Display name, as reported by `std::any::type_name`.
    pub name: &'static str,
    /// Size of one component value in bytes.
    pub size: usize,
}

/// Maps Rust component types to dense [`ComponentId`]s.
pub struct ComponentRegistry {
    ids: HashMap<TypeId, ComponentId>,
    infos: Vec<ComponentInfo>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self {
            ids: HashMap::new(),
            infos: Vec::new(),
        }
    }

    /// Register `T`, assigning the next sequential id.
    ///
    /// Idempotent: repeated calls return the id assigned by the first.
    pub fn register<T: 'static>(&mut self) -> ComponentId {
        let type_id = TypeId::of::<T>();
        if let Some(&id) = self.ids.get(&type_id) {
            return id;
        }
        let id = ComponentId(self.infos.len() as u32);
        let info = ComponentInfo {
            type_id,
            name: std::any::type_name::<T>(),
            size: std::mem::size_of::<T>(),
        };
        log::debug!("registered component `{}` ({} bytes) as {:?}", info.name, info.size, id);
        self.infos.push(info);
        self.ids.insert(type_id, id);
        id
    }

    /// Look up the id for `T`. `None` when `T` was never registered.
    pub fn id_of<T: 'static>(&self) -> Option<ComponentId> {
        self.ids.get(&TypeId::of::<T>()).copied()
    }

    /// Look up by raw `TypeId`, for type-erased callers.
    pub fn id_of_type_id(&self, type_id: TypeId) -> Option<ComponentId> {
        self.ids.get(&type_id).copied()
    }

    /// Metadata for a registered id.
    ///
    /// # Panics
    ///
    /// Panics if `id` did not come from this registry.
    pub fn info(&self, id: ComponentId) -> &ComponentInfo {
        &self.infos[id.0 as usize]
    }

    /// Number of registered component types.
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}
