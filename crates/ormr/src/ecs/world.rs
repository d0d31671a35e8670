//! # World — Entity and Archetype Storage
//!
//! The [`World`] owns the component registry, the entity allocator, every
//! archetype, and the directory mapping each live entity to its physical
//! location. Everything an entity is — whether it lives, where its row sits,
//! what components it carries — is answered here.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │ World                                                │
//! │                                                      │
//! │  ComponentRegistry: type → dense ComponentId         │
//! │                                                      │
//! │  EntityAllocator: handle lifecycle                   │
//! │                                                      │
//! │  archetypes: HashMap<ArchetypeId, Archetype>         │
//! │    key = canonical hash of the sorted signature      │
//! │                                                      │
//! │  entity_index: entity index → (archetype, row)       │
//! │                                                      │
//! │  structure_version: bumped when an archetype is      │
//! │    created (or the world cleared); cached queries    │
//! │    compare it to know when to re-resolve             │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Structural changes
//!
//! Adding or removing a component moves the entity between archetypes: its
//! row is extracted from the source (swap-remove, so the source stays dense),
//! the new component set is appended to the destination, and the directory is
//! updated — including the entry of whichever entity the swap-remove moved
//! into the freed row. Every archetype memoizes its ±1-component neighbors,
//! so repeated identical migrations skip the signature hash.
//!
//! Structural changes take effect immediately; there is no command buffer.
//! References obtained through [`World::get`] are invalidated by any
//! structural change — the borrow checker enforces exactly this.

use std::any::TypeId;
use std::collections::HashMap;

use crate::error::SpawnError;

use super::archetype::{Archetype, ArchetypeId, RowParts, Signature};
use super::entity::{Entity, EntityAllocator};
use super::query::{QueryParam, QueryResult};
use super::registry::{ComponentId, ComponentRegistry};

/// An entity's physical location: which archetype, which row.
#[derive(Clone, Copy)]
pub(crate) struct EntityLocation {
    pub archetype: ArchetypeId,
    pub row: usize,
}

/// The central container for entities, components, and archetypes.
pub struct World {
    registry: ComponentRegistry,
    allocator: EntityAllocator,
    /// All archetypes, keyed by the canonical hash of their signature.
    archetypes: HashMap<ArchetypeId, Archetype>,
    /// Maps entity index → its location in archetype storage.
    entity_index: HashMap<u32, EntityLocation>,
    /// Bumped whenever the set of archetypes changes. Cached queries compare
    /// against it instead of the world holding back-references to them.
    structure_version: u64,
}

impl World {
    pub fn new() -> Self {
        Self {
            registry: ComponentRegistry::new(),
            allocator: EntityAllocator::new(),
            archetypes: HashMap::new(),
            entity_index: HashMap::new(),
            structure_version: 0,
        }
    }

    // ── Registry ─────────────────────────────────────────────────────

    /// Register component type `T`, assigning it a dense id. Idempotent.
    ///
    /// Types must be registered before they can be spawned, inserted, or
    /// queried.
    pub fn register_component<T: 'static + Send + Sync>(&mut self) -> ComponentId {
        self.registry.register::<T>()
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    // ── Introspection ────────────────────────────────────────────────

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.allocator.alive_count()
    }

    /// Number of archetypes that exist (archetypes are created lazily and
    /// never destroyed, so this only grows between clears).
    pub fn archetype_count(&self) -> usize {
        self.archetypes.len()
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.allocator.is_alive(entity)
    }

    /// The archetype holding `entity`, if it is alive.
    pub fn archetype_of(&self, entity: Entity) -> Option<ArchetypeId> {
        if !self.allocator.is_alive(entity) {
            return None;
        }
        self.entity_index.get(&entity.index()).map(|loc| loc.archetype)
    }

    pub fn archetype(&self, id: ArchetypeId) -> Option<&Archetype> {
        self.archetypes.get(&id)
    }

    /// Iterate all archetypes. Used by query resolution.
    pub fn archetypes(&self) -> impl Iterator<Item = &Archetype> {
        self.archetypes.values()
    }

    pub(crate) fn structure_version(&self) -> u64 {
        self.structure_version
    }

    // ── Spawn / Despawn ──────────────────────────────────────────────

    /// Spawn an entity with no components. It lives in the empty archetype
    /// until components are inserted.
    pub fn spawn_empty(&mut self) -> Entity {
        let entity = self.allocator.allocate();
        let arch_id = self.get_or_create_archetype(Signature::empty());
        let arch = self.archetypes.get_mut(&arch_id).unwrap();
        let row = match arch.push_row(entity, RowParts::new()) {
            Ok(row) => row,
            // Empty parts always match the empty signature.
            Err(_) => unreachable!(),
        };
        self.entity_index.insert(entity.index(), EntityLocation { archetype: arch_id, row });
        entity
    }

    /// Spawn an entity with a bundle of components (a tuple).
    ///
    /// Every component type must be registered, and no type may appear twice
    /// in the bundle. The entity lands in the archetype whose signature is
    /// exactly the bundle's type set — the same archetype it would reach by
    /// being spawned empty and having each component inserted in any order.
    ///
    /// # Example
    ///
    /// ```ignore
    /// world.register_component::<Position>();
    /// world.register_component::<Velocity>();
    /// let e = world.spawn((Position { x: 0.0, y: 0.0 }, Velocity { dx: 1.0, dy: 0.0 }))?;
    /// ```
    pub fn spawn<B: Bundle>(&mut self, bundle: B) -> Result<Entity, SpawnError> {
        let type_ids = B::type_ids();
        let names = B::type_names();

        let mut ids = Vec::with_capacity(type_ids.len());
        for (tid, &name) in type_ids.iter().zip(names.iter()) {
            match self.registry.id_of_type_id(*tid) {
                Some(id) => ids.push(id),
                None => return Err(SpawnError::UnregisteredType(name)),
            }
        }

        let signature = match Signature::new(ids.clone()) {
            Some(signature) => signature,
            None => {
                let mut sorted = ids;
                sorted.sort_unstable();
                let dup = sorted.windows(2).find(|w| w[0] == w[1]).unwrap()[0];
                return Err(SpawnError::DuplicateComponent(self.registry.info(dup).name));
            }
        };

        let arch_id = self.get_or_create_archetype(signature);
        let entity = self.allocator.allocate();

        let mut parts = RowParts::new();
        for (tid, value) in bundle.into_parts() {
            let id = self.registry.id_of_type_id(tid).unwrap();
            parts.insert(id, value);
        }

        let arch = self.archetypes.get_mut(&arch_id).unwrap();
        match arch.push_row(entity, parts) {
            Ok(row) => {
                self.entity_index.insert(entity.index(), EntityLocation { archetype: arch_id, row });
                Ok(entity)
            }
            Err(_) => {
                self.allocator.deallocate(entity);
                Err(SpawnError::ArchetypeInsert)
            }
        }
    }

    /// Despawn an entity, freeing its handle for reuse.
    ///
    /// Returns `false` if the handle was already stale.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        if !self.allocator.is_alive(entity) {
            return false;
        }
        if let Some(loc) = self.entity_index.remove(&entity.index()) {
            if let Some(arch) = self.archetypes.get_mut(&loc.archetype) {
                let moved = arch.swap_remove_row(loc.row);
                // The swapped-in entity now lives at the freed row.
                if let Some(moved_entity) = moved {
                    if let Some(moved_loc) = self.entity_index.get_mut(&moved_entity.index()) {
                        moved_loc.row = loc.row;
                    }
                }
            }
        }
        self.allocator.deallocate(entity);
        true
    }

    /// Remove every entity and archetype. Registered component types survive;
    /// all previously issued handles become stale.
    pub fn clear(&mut self) {
        self.archetypes.clear();
        self.entity_index.clear();
        self.allocator.clear();
        // Force every cached query to re-resolve.
        self.structure_version += 1;
    }

    // ── Per-Entity Component Access ──────────────────────────────────

    /// Shared access to a component on `entity`. `None` if the entity is dead
    /// or doesn't have `T`.
    pub fn get<T: 'static>(&self, entity: Entity) -> Option<&T> {
        if !self.allocator.is_alive(entity) {
            return None;
        }
        let id = self.registry.id_of::<T>()?;
        let loc = self.entity_index.get(&entity.index())?;
        let arch = self.archetypes.get(&loc.archetype)?;
        arch.component_of(entity, id)?.downcast_ref::<T>()
    }

    /// Mutable access to a component on `entity`.
    pub fn get_mut<T: 'static>(&mut self, entity: Entity) -> Option<&mut T> {
        if !self.allocator.is_alive(entity) {
            return None;
        }
        let id = self.registry.id_of::<T>()?;
        let loc = self.entity_index.get(&entity.index())?;
        let arch = self.archetypes.get_mut(&loc.archetype)?;
        let row = loc.row;
        arch.column_mut(id)?.get_mut::<T>(row)
    }

    /// Whether `entity` is alive and has a component of type `T`.
    pub fn has<T: 'static>(&self, entity: Entity) -> bool {
        if !self.allocator.is_alive(entity) {
            return false;
        }
        let Some(id) = self.registry.id_of::<T>() else {
            return false;
        };
        let Some(loc) = self.entity_index.get(&entity.index()) else {
            return false;
        };
        self.archetypes[&loc.archetype].has_component_type(id)
    }

    // ── Component Add / Remove (archetype migration) ─────────────────

    /// Add component `T` to `entity`, migrating it to the archetype with `T`
    /// in its signature.
    ///
    /// Returns `false` — leaving the world untouched — when the entity is
    /// dead, `T` is unregistered, or the entity already has a `T`. Use
    /// [`get_mut`](Self::get_mut) to overwrite an existing value in place.
    pub fn insert<T: 'static + Send + Sync>(&mut self, entity: Entity, value: T) -> bool {
        let Some(id) = self.registry.id_of::<T>() else {
            return false;
        };
        if !self.allocator.is_alive(entity) {
            return false;
        }
        let Some(&loc) = self.entity_index.get(&entity.index()) else {
            return false;
        };
        if self.archetypes[&loc.archetype].has_component_type(id) {
            return false;
        }

        let dest_id = self.add_destination(loc.archetype, id);

        let src = self.archetypes.get_mut(&loc.archetype).unwrap();
        let (mut parts, moved) = src.extract_row(loc.row);
        parts.insert(id, Box::new(value));

        let dest = self.archetypes.get_mut(&dest_id).unwrap();
        match dest.push_row(entity, parts) {
            Ok(new_row) => {
                self.entity_index
                    .insert(entity.index(), EntityLocation { archetype: dest_id, row: new_row });
                if let Some(moved_entity) = moved {
                    self.entity_index.get_mut(&moved_entity.index()).unwrap().row = loc.row;
                }
                true
            }
            Err(mut parts) => {
                // The destination refused the row: put the entity back where
                // it was, dropping the new component.
                parts.remove(&id);
                self.restore_row(loc.archetype, entity, parts, moved, loc.row);
                false
            }
        }
    }

    /// Remove component `T` from `entity`, migrating it to the archetype
    /// without `T` in its signature. The removed value is dropped.
    ///
    /// Returns `false` — leaving the world untouched — when the entity is
    /// dead, `T` is unregistered, or the entity has no `T`.
    pub fn remove<T: 'static + Send + Sync>(&mut self, entity: Entity) -> bool {
        let Some(id) = self.registry.id_of::<T>() else {
            return false;
        };
        if !self.allocator.is_alive(entity) {
            return false;
        }
        let Some(&loc) = self.entity_index.get(&entity.index()) else {
            return false;
        };
        if !self.archetypes[&loc.archetype].has_component_type(id) {
            return false;
        }

        let dest_id = self.remove_destination(loc.archetype, id);

        let src = self.archetypes.get_mut(&loc.archetype).unwrap();
        let (mut parts, moved) = src.extract_row(loc.row);
        // Keep the removed value alive until the migration is committed.
        let removed = parts.remove(&id);

        let dest = self.archetypes.get_mut(&dest_id).unwrap();
        match dest.push_row(entity, parts) {
            Ok(new_row) => {
                self.entity_index
                    .insert(entity.index(), EntityLocation { archetype: dest_id, row: new_row });
                if let Some(moved_entity) = moved {
                    self.entity_index.get_mut(&moved_entity.index()).unwrap().row = loc.row;
                }
                drop(removed);
                true
            }
            Err(mut parts) => {
                parts.insert(id, removed.unwrap());
                self.restore_row(loc.archetype, entity, parts, moved, loc.row);
                false
            }
        }
    }

    /// Destination archetype for adding `id` to `src`: edge cache hit, or
    /// compute the canonical id, create the archetype if needed, and record
    /// the edge.
    fn add_destination(&mut self, src_id: ArchetypeId, id: ComponentId) -> ArchetypeId {
        if let Some(dest) = self.archetypes[&src_id].add_edge(id) {
            return dest;
        }
        let dest_signature = self.archetypes[&src_id].signature().with(id);
        let dest_id = self.get_or_create_archetype(dest_signature);
        self.archetypes.get_mut(&src_id).unwrap().set_add_edge(id, dest_id);
        // The inverse transition is known for free; memoize it too.
        self.archetypes.get_mut(&dest_id).unwrap().set_remove_edge(id, src_id);
        dest_id
    }

    /// Destination archetype for removing `id` from `src`.
    fn remove_destination(&mut self, src_id: ArchetypeId, id: ComponentId) -> ArchetypeId {
        if let Some(dest) = self.archetypes[&src_id].remove_edge(id) {
            return dest;
        }
        let dest_signature = self.archetypes[&src_id].signature().without(id);
        let dest_id = self.get_or_create_archetype(dest_signature);
        self.archetypes.get_mut(&src_id).unwrap().set_remove_edge(id, dest_id);
        self.archetypes.get_mut(&dest_id).unwrap().set_add_edge(id, src_id);
        dest_id
    }

    /// Undo a failed migration: push the extracted parts back into the source
    /// archetype and repair the directory.
    fn restore_row(
        &mut self,
        arch_id: ArchetypeId,
        entity: Entity,
        parts: RowParts,
        moved: Option<Entity>,
        old_row: usize,
    ) {
        let arch = self.archetypes.get_mut(&arch_id).unwrap();
        let row = arch
            .push_row(entity, parts)
            .unwrap_or_else(|_| panic!("restoring a row into its source archetype cannot fail"));
        self.entity_index.insert(entity.index(), EntityLocation { archetype: arch_id, row });
        if let Some(moved_entity) = moved {
            self.entity_index.get_mut(&moved_entity.index()).unwrap().row = old_row;
        }
    }

    fn get_or_create_archetype(&mut self, signature: Signature) -> ArchetypeId {
        let id = signature.archetype_id();
        if !self.archetypes.contains_key(&id) {
            log::debug!("new archetype {:?} with {} component types", id, signature.len());
            self.archetypes.insert(id, Archetype::new(signature));
            self.structure_version += 1;
        }
        id
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// One-shot, uncached query: every row of every archetype whose signature
    /// is a superset of `required`, as `(entity, archetype, row)` results.
    ///
    /// For a query that runs every tick, use a
    /// [`CachedQuery`](super::query::CachedQuery) instead — it remembers the
    /// matching archetypes between structural changes.
    pub fn query_dynamic<'w>(
        &'w self,
        required: &Signature,
    ) -> impl Iterator<Item = QueryResult> + 'w {
        let required = required.clone();
        self.archetypes
            .values()
            .filter(move |arch| arch.signature().is_superset_of(&required))
            .flat_map(|arch| {
                arch.entities()
                    .iter()
                    .enumerate()
                    .map(move |(row, &entity)| QueryResult {
                        entity,
                        archetype: arch.id(),
                        row,
                    })
            })
    }

    /// Typed query: invoke `f` with `(entity, components)` for every entity
    /// that has all the requested component types.
    ///
    /// # Example
    ///
    /// ```ignore
    /// world.query::<(&mut Position, &Velocity)>(|entity, (pos, vel)| {
    ///     pos.x += vel.dx;
    /// });
    /// ```
    pub fn query<Q: QueryParam>(&mut self, mut f: impl FnMut(Entity, Q::Item<'_>)) {
        let mut required = Vec::new();
        for tid in Q::type_ids() {
            match self.registry.id_of_type_id(tid) {
                Some(id) => required.push(id),
                // An unregistered type can't be on any entity.
                None => return,
            }
        }

        let matching: Vec<ArchetypeId> = self
            .archetypes
            .values()
            .filter(|arch| required.iter().all(|&id| arch.has_component_type(id)))
            .map(|arch| arch.id())
            .collect();

        let registry = &self.registry;
        for arch_id in matching {
            let arch = self.archetypes.get_mut(&arch_id).unwrap();
            let (entities, columns) = arch.entities_and_columns();
            let mut cols = Q::extract(registry, columns);
            for (row, &entity) in entities.iter().enumerate() {
                f(entity, Q::fetch(&mut cols, row));
            }
            Q::restore(cols, columns);
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

// ── Spawn Bundles (tuple support) ────────────────────────────────────────

/// A set of components that can be spawned together. Implemented for tuples
/// of up to eight components.
pub trait Bundle {
    /// The `TypeId` of each component, in tuple order.
    fn type_ids() -> Vec<TypeId>;
    /// Display names parallel to [`type_ids`](Bundle::type_ids), for error
    /// reporting.
    fn type_names() -> Vec<&'static str>;
    /// Box each component for type-erased storage.
    fn into_parts(self) -> Vec<(TypeId, Box<dyn std::any::Any + Send + Sync>)>;
}

macro_rules! impl_bundle {
    ($($T:ident),+) => {
        impl<$($T: 'static + Send + Sync),+> Bundle for ($($T,)+) {
            fn type_ids() -> Vec<TypeId> {
                vec![$(TypeId::of::<$T>()),+]
            }

            fn type_names() -> Vec<&'static str> {
                vec![$(std::any::type_name::<$T>()),+]
            }

            #[allow(non_snake_case)]
            fn into_parts(self) -> Vec<(TypeId, Box<dyn std::any::Any + Send + Sync>)> {
                let ($($T,)+) = self;
                vec![$((TypeId::of::<$T>(), Box::new($T) as Box<dyn std::any::Any + Send + Sync>)),+]
            }
        }
    };
}

impl_bundle!(A);
impl_bundle!(A, B);
impl_bundle!(A, B, C);
impl_bundle!(A, B, C, D);
impl_bundle!(A, B, C, D, E);
impl_bundle!(A, B, C, D, E, F);
impl_bundle!(A, B, C, D, E, F, G);
impl_bundle!(A, B, C, D, E, F, G, H);
