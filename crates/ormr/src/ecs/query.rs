//! # Queries — Selecting Entities by Component Type
//!
//! Three query surfaces, from most to least ergonomic:
//!
//! * [`World::query`](super::world::World::query) — typed closure queries:
//!   `world.query::<(&A, &mut B)>(|entity, (a, b)| ...)`. The [`QueryParam`]
//!   trait drives these.
//! * [`CachedQuery`] — a reusable selector that remembers which archetypes
//!   match its required component set. The cache survives between ticks and
//!   is re-resolved only after the archetype set changes.
//! * [`World::query_dynamic`](super::world::World::query_dynamic) — one-shot,
//!   uncached iteration yielding [`QueryResult`]s.
//!
//! ## Why Typed Queries Take a Closure
//!
//! A typed query hands out `&mut` component borrows row by row while the
//! archetype itself stays mutably borrowed — a shape std iterators cannot
//! return safely. So [`QueryParam::extract`] *moves* each requested
//! [`ComponentColumn`] out of the archetype's map for the duration of the
//! scan. Once a column is a local value, handing out per-row references from
//! it is ordinary safe borrowing, and two columns of the same archetype can
//! be borrowed with different mutability because they are now separate
//! locals. When the scan finishes, [`QueryParam::restore`] moves every column
//! back under its [`ComponentId`]. The closure is what bounds the scan: its
//! return is the point at which restoration is guaranteed to run.
//!
//! ## Cache Invalidation
//!
//! A [`CachedQuery`] stamps its cached archetype list with the world's
//! structure version. Creating an archetype (or clearing the world) bumps the
//! version, so every cached query re-resolves on its next use — the world
//! never needs to hold references to the queries observing it. The cache is
//! deliberately *soft*: a cached archetype may have become empty (that just
//! yields no rows), but a newly created matching archetype is never missed.

use std::any::TypeId;
use std::collections::HashMap;

use super::archetype::{ArchetypeId, Signature};
use super::component::ComponentColumn;
use super::entity::Entity;
use super::registry::{ComponentId, ComponentRegistry};
use super::world::World;

// ── Typed query parameters ───────────────────────────────────────────────

/// A component access pattern fetchable from an archetype: `&T`, `&mut T`,
/// or a tuple of those.
///
/// The `Column` associated type carries the extracted column(s) while the
/// archetype's map is temporarily missing them.
pub trait QueryParam {
    /// The item yielded per entity.
    type Item<'w>;

    /// Owned column data extracted from the archetype.
    type Column;

    /// The component `TypeId`s this parameter needs.
    fn type_ids() -> Vec<TypeId>;

    /// Remove the needed column(s) from the archetype's column map.
    fn extract(
        registry: &ComponentRegistry,
        columns: &mut HashMap<ComponentId, ComponentColumn>,
    ) -> Self::Column;

    /// Put the column(s) back.
    fn restore(col: Self::Column, columns: &mut HashMap<ComponentId, ComponentColumn>);

    /// Fetch the item for the entity at `row` from the extracted column.
    fn fetch(col: &mut Self::Column, row: usize) -> Self::Item<'_>;
}

/// Shared read access to a component.
impl<T: 'static + Send + Sync> QueryParam for &T {
    type Item<'w> = &'w T;
    type Column = (ComponentId, ComponentColumn);

    fn type_ids() -> Vec<TypeId> {
        vec![TypeId::of::<T>()]
    }

    fn extract(
        registry: &ComponentRegistry,
        columns: &mut HashMap<ComponentId, ComponentColumn>,
    ) -> Self::Column {
        let id = registry.id_of::<T>().unwrap_or_else(|| {
            panic!("query: component `{}` is not registered", std::any::type_name::<T>())
        });
        let col = columns.remove(&id).unwrap_or_else(|| {
            panic!(
                "query: column for `{}` missing from matched archetype",
                std::any::type_name::<T>()
            )
        });
        (id, col)
    }

    fn restore(col: Self::Column, columns: &mut HashMap<ComponentId, ComponentColumn>) {
        columns.insert(col.0, col.1);
    }

    fn fetch(col: &mut Self::Column, row: usize) -> Self::Item<'_> {
        col.1.get::<T>(row).unwrap_or_else(|| {
            panic!("query fetch: no `{}` at row {row}", std::any::type_name::<T>())
        })
    }
}

/// Exclusive write access to a component.
impl<T: 'static + Send + Sync> QueryParam for &mut T {
    type Item<'w> = &'w mut T;
    type Column = (ComponentId, ComponentColumn);

    fn type_ids() -> Vec<TypeId> {
        vec![TypeId::of::<T>()]
    }

    fn extract(
        registry: &ComponentRegistry,
        columns: &mut HashMap<ComponentId, ComponentColumn>,
    ) -> Self::Column {
        let id = registry.id_of::<T>().unwrap_or_else(|| {
            panic!("query: component `{}` is not registered", std::any::type_name::<T>())
        });
        let col = columns.remove(&id).unwrap_or_else(|| {
            panic!(
                "query: column for `{}` missing from matched archetype",
                std::any::type_name::<T>()
            )
        });
        (id, col)
    }

    fn restore(col: Self::Column, columns: &mut HashMap<ComponentId, ComponentColumn>) {
        columns.insert(col.0, col.1);
    }

    fn fetch(col: &mut Self::Column, row: usize) -> Self::Item<'_> {
        col.1.get_mut::<T>(row).unwrap_or_else(|| {
            panic!("query fetch: no `{}` at row {row}", std::any::type_name::<T>())
        })
    }
}

/// One impl per tuple arity: a tuple fetches whatever each of its elements
/// fetches, so mixed access like `(&A, &mut B)` composes without special
/// cases.
macro_rules! impl_query_param_tuple {
    ($($P:ident),+) => {
        impl<$($P: QueryParam),+> QueryParam for ($($P,)+) {
            type Item<'w> = ($($P::Item<'w>,)+);
            type Column = ($($P::Column,)+);

            fn type_ids() -> Vec<TypeId> {
                let mut ids = Vec::new();
                $(ids.extend($P::type_ids());)+
                ids
            }

            fn extract(
                registry: &ComponentRegistry,
                columns: &mut HashMap<ComponentId, ComponentColumn>,
            ) -> Self::Column {
                ($($P::extract(registry, columns),)+)
            }

            #[allow(non_snake_case)]
            fn restore(col: Self::Column, columns: &mut HashMap<ComponentId, ComponentColumn>) {
                let ($($P,)+) = col;
                $($P::restore($P, columns);)+
            }

            #[allow(non_snake_case)]
            fn fetch(col: &mut Self::Column, row: usize) -> Self::Item<'_> {
                let ($($P,)+) = col;
                ($($P::fetch($P, row),)+)
            }
        }
    };
}

impl_query_param_tuple!(A);
impl_query_param_tuple!(A, B);
impl_query_param_tuple!(A, B, C);
impl_query_param_tuple!(A, B, C, D);
impl_query_param_tuple!(A, B, C, D, E);
impl_query_param_tuple!(A, B, C, D, E, F);
impl_query_param_tuple!(A, B, C, D, E, F, G);
impl_query_param_tuple!(A, B, C, D, E, F, G, H);

// ── Query results ────────────────────────────────────────────────────────

/// One matched row: the entity plus its physical location at yield time.
#[derive(Clone, Copy, Debug)]
pub struct QueryResult {
    pub entity: Entity,
    pub archetype: ArchetypeId,
    pub row: usize,
}

impl QueryResult {
    /// Resolve a component of the matched entity.
    ///
    /// Goes back through the entity directory rather than the captured
    /// `(archetype, row)`, so it stays correct even if structural changes
    /// have moved the entity since the row was yielded.
    pub fn get<'w, T: 'static>(&self, world: &'w World) -> Option<&'w T> {
        world.get::<T>(self.entity)
    }

    /// Mutable variant of [`get`](Self::get).
    pub fn get_mut<'w, T: 'static>(&self, world: &'w mut World) -> Option<&'w mut T> {
        world.get_mut::<T>(self.entity)
    }
}

// ── Cached queries ───────────────────────────────────────────────────────

#[derive(Debug)]
struct QueryCache {
    /// World structure version the cache was resolved against.
    version: u64,
    /// Every archetype whose signature ⊇ the required set, at that version.
    archetypes: Vec<ArchetypeId>,
}

/// A reusable selector over archetypes whose signatures contain a required
/// component set.
///
/// The matching archetype list is resolved lazily on first use and kept until
/// the world's archetype set changes. Typical use is one `CachedQuery` per
/// system, queried every tick:
///
/// ```ignore
/// let mut movers = CachedQuery::new(Signature::new(vec![pos_id, vel_id]).unwrap());
/// for result in movers.query(&world) {
///     // result.entity, result.archetype, result.row
/// }
/// ```
pub struct CachedQuery {
    required: Signature,
    cache: Option<QueryCache>,
}

impl CachedQuery {
    pub fn new(required: Signature) -> Self {
        Self { required, cache: None }
    }

    /// The component set an archetype must contain to match.
    pub fn required(&self) -> &Signature {
        &self.required
    }

    /// Drop the cached archetype list. The next [`query`](Self::query)
    /// re-resolves from scratch. Rarely needed — the structure-version check
    /// already catches every archetype created in `world`.
    pub fn invalidate_cache(&mut self) {
        self.cache = None;
    }

    /// Whether the next query will re-resolve the archetype list.
    pub fn is_stale(&self, world: &World) -> bool {
        match &self.cache {
            None => true,
            Some(cache) => cache.version != world.structure_version(),
        }
    }

    /// The cached archetype ids, if the cache is populated.
    pub fn cached_archetypes(&self) -> Option<&[ArchetypeId]> {
        self.cache.as_ref().map(|c| c.archetypes.as_slice())
    }

    /// Iterate every row of every matching archetype.
    ///
    /// Re-resolves the archetype list first if the cache is stale.
    pub fn query<'w>(&mut self, world: &'w World) -> QueryIter<'w> {
        if self.is_stale(world) {
            let archetypes = world
                .archetypes()
                .filter(|arch| arch.signature().is_superset_of(&self.required))
                .map(|arch| arch.id())
                .collect();
            self.cache = Some(QueryCache {
                version: world.structure_version(),
                archetypes,
            });
        }
        QueryIter {
            world,
            archetypes: self.cache.as_ref().unwrap().archetypes.clone(),
            position: 0,
            row: 0,
        }
    }
}

/// Lazy iterator over the rows of a [`CachedQuery`]'s matched archetypes.
pub struct QueryIter<'w> {
    world: &'w World,
    archetypes: Vec<ArchetypeId>,
    position: usize,
    row: usize,
}

impl Iterator for QueryIter<'_> {
    type Item = QueryResult;

    fn next(&mut self) -> Option<QueryResult> {
        loop {
            let archetype = *self.archetypes.get(self.position)?;
            let Some(arch) = self.world.archetype(archetype) else {
                self.position += 1;
                self.row = 0;
                continue;
            };
            if self.row < arch.len() {
                let entity = arch.entities()[self.row];
                let result = QueryResult { entity, archetype, row: self.row };
                self.row += 1;
                return Some(result);
            }
            self.position += 1;
            self.row = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct A(u32);
    #[derive(Debug, PartialEq)]
    struct B(u32);

    fn world_with_types() -> World {
        let mut world = World::new();
        world.register_component::<A>();
        world.register_component::<B>();
        world
    }

    fn query_for<T: 'static>(world: &World) -> CachedQuery {
        let id = world.registry().id_of::<T>().unwrap();
        CachedQuery::new(Signature::new(vec![id]).unwrap())
    }

    #[test]
    fn cache_resolves_lazily() {
        let mut world = world_with_types();
        world.spawn((A(1),)).unwrap();

        let mut query = query_for::<A>(&world);
        assert!(query.is_stale(&world));
        assert!(query.cached_archetypes().is_none());

        assert_eq!(query.query(&world).count(), 1);
        assert!(!query.is_stale(&world));
        assert_eq!(query.cached_archetypes().unwrap().len(), 1);
    }

    #[test]
    fn new_archetype_invalidates_cache() {
        let mut world = world_with_types();
        world.spawn((A(1),)).unwrap();

        let mut query = query_for::<A>(&world);
        assert_eq!(query.query(&world).count(), 1);

        // A new archetype with a superset signature appears; the stale cache
        // must be detected and the new archetype picked up.
        world.spawn((A(2), B(3))).unwrap();
        assert!(query.is_stale(&world));
        assert_eq!(query.query(&world).count(), 2);
        assert_eq!(query.cached_archetypes().unwrap().len(), 2);
    }

    #[test]
    fn spawning_into_known_archetype_keeps_cache() {
        let mut world = world_with_types();
        world.spawn((A(1),)).unwrap();

        let mut query = query_for::<A>(&world);
        query.query(&world).count();

        // Same archetype, no structural growth: the cache stays warm but the
        // new row is still visited.
        world.spawn((A(2),)).unwrap();
        assert!(!query.is_stale(&world));
        assert_eq!(query.query(&world).count(), 2);
    }

    #[test]
    fn cache_lists_only_superset_archetypes() {
        let mut world = world_with_types();
        world.spawn((A(1),)).unwrap();
        world.spawn((A(2), B(1))).unwrap();
        world.spawn((B(2),)).unwrap();

        let mut query = query_for::<A>(&world);
        query.query(&world).count();

        let required = query.required().clone();
        for &id in query.cached_archetypes().unwrap() {
            let arch = world.archetype(id).unwrap();
            assert!(arch.signature().is_superset_of(&required));
        }
        assert_eq!(query.cached_archetypes().unwrap().len(), 2);
    }

    #[test]
    fn explicit_invalidate_forces_refresh() {
        let mut world = world_with_types();
        world.spawn((A(1),)).unwrap();

        let mut query = query_for::<A>(&world);
        query.query(&world).count();
        assert!(!query.is_stale(&world));

        query.invalidate_cache();
        assert!(query.is_stale(&world));
        assert_eq!(query.query(&world).count(), 1);
    }

    #[test]
    fn despawn_keeps_cache_but_hides_rows() {
        let mut world = world_with_types();
        let e1 = world.spawn((A(1),)).unwrap();
        world.spawn((A(2),)).unwrap();

        let mut query = query_for::<A>(&world);
        assert_eq!(query.query(&world).count(), 2);

        // Despawn is not archetype growth: the cache stays, the row is gone.
        world.despawn(e1);
        assert!(!query.is_stale(&world));
        assert_eq!(query.query(&world).count(), 1);
    }

    #[test]
    fn clear_invalidates_cache() {
        let mut world = world_with_types();
        world.spawn((A(1),)).unwrap();

        let mut query = query_for::<A>(&world);
        assert_eq!(query.query(&world).count(), 1);

        world.clear();
        assert!(query.is_stale(&world));
        assert_eq!(query.query(&world).count(), 0);
    }

    #[test]
    fn results_resolve_components() {
        let mut world = world_with_types();
        let e = world.spawn((A(7), B(9))).unwrap();

        let mut query = query_for::<A>(&world);
        let results: Vec<_> = query.query(&world).collect();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].entity, e);
        assert_eq!(results[0].archetype, world.archetype_of(e).unwrap());
        assert_eq!(results[0].get::<A>(&world), Some(&A(7)));
        assert_eq!(results[0].get::<B>(&world), Some(&B(9)));

        let result = results[0];
        result.get_mut::<B>(&mut world).unwrap().0 = 10;
        assert_eq!(world.get::<B>(e), Some(&B(10)));
    }

    #[test]
    fn result_get_survives_migration() {
        let mut world = world_with_types();
        let e = world.spawn((A(7),)).unwrap();

        let mut query = query_for::<A>(&world);
        let result = query.query(&world).next().unwrap();

        // The entity moves to another archetype; the result re-resolves
        // through the directory instead of the stale row.
        world.insert(e, B(1));
        assert_eq!(result.get::<A>(&world), Some(&A(7)));
    }
}
