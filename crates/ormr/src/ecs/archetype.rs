//! # Archetype — Grouping Entities by Exact Component Set
//!
//! An archetype stores every entity whose component set is *exactly* one
//! [`Signature`]. Entities with the same signature share dense, parallel
//! columns, so iterating a query is a linear scan over matching archetypes.
//!
//! ## Storage Shape
//!
//! Per component id in the signature there is one [`ComponentColumn`]; beside
//! them sits the `entities` array naming the owner of each row. A row index
//! means the same thing everywhere — `columns[Position][4]`,
//! `columns[Velocity][4]`, and `entities[4]` together describe one entity —
//! and every column stays exactly `entities.len()` long.
//!
//! Rows are kept dense with swap-remove: removing a row moves the last row
//! into the hole. Whoever removes a row receives the entity that was moved so
//! the world's directory can be corrected.
//!
//! ## Identity and Edges
//!
//! An [`ArchetypeId`] is the canonical hash of the sorted signature, so any
//! component set resolves to the same archetype no matter what order its types
//! were listed in, and the destination of a migration can be computed without
//! walking a graph. On top of that, each archetype memoizes the neighbor
//! reached by adding or removing exactly one component type, turning repeated
//! identical migrations into a single map lookup. Edges are pure cache — the
//! hash of the destination signature is always authoritative.

use std::any::Any;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use super::component::ComponentColumn;
use super::entity::Entity;
use super::registry::ComponentId;

/// Canonical identifier of an archetype: a hash of its sorted signature.
///
/// Two archetypes with identical component sets always have identical ids.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ArchetypeId(u64);

/// A sorted, duplicate-free set of component ids — an archetype's signature.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Signature(Vec<ComponentId>);

impl Signature {
    /// The signature of the component-less archetype.
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    /// Build a signature from arbitrary ids. Sorts them; `None` if any id
    /// appears twice.
    pub fn new(mut ids: Vec<ComponentId>) -> Option<Self> {
        ids.sort_unstable();
        if ids.windows(2).any(|w| w[0] == w[1]) {
            return None;
        }
        Some(Self(ids))
    }

    /// The ids, in sorted order.
    pub fn ids(&self) -> &[ComponentId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: ComponentId) -> bool {
        self.0.binary_search(&id).is_ok()
    }

    /// Whether this signature contains every id of `required`.
    pub fn is_superset_of(&self, required: &Signature) -> bool {
        required.0.iter().all(|&id| self.contains(id))
    }

    /// This signature with `id` added. No-op if already present.
    pub fn with(&self, id: ComponentId) -> Signature {
        let mut ids = self.0.clone();
        if let Err(pos) = ids.binary_search(&id) {
            ids.insert(pos, id);
        }
        Signature(ids)
    }

    /// This signature with `id` removed. No-op if absent.
    pub fn without(&self, id: ComponentId) -> Signature {
        Signature(self.0.iter().copied().filter(|&c| c != id).collect())
    }

    /// The canonical archetype id for this signature.
    pub fn archetype_id(&self) -> ArchetypeId {
        let mut hasher = DefaultHasher::new();
        self.0.hash(&mut hasher);
        ArchetypeId(hasher.finish())
    }
}

/// One row's components, keyed by component id. Produced by
/// [`Archetype::extract_row`] and consumed by [`Archetype::push_row`] during
/// migration.
pub(crate) type RowParts = HashMap<ComponentId, Box<dyn Any + Send + Sync>>;

/// A table of entities that all share the same component signature.
pub struct Archetype {
    id: ArchetypeId,
    signature: Signature,
    /// One column per component id of the signature.
    columns: HashMap<ComponentId, ComponentColumn>,
    /// Which entity occupies each row; parallel to the columns.
    entities: Vec<Entity>,
    /// Entity index → row, the inverse of `entities`.
    rows: HashMap<u32, usize>,
    /// Memoized destination when adding exactly one component type.
    add_edges: HashMap<ComponentId, ArchetypeId>,
    /// Memoized destination when removing exactly one component type.
    remove_edges: HashMap<ComponentId, ArchetypeId>,
}

impl Archetype {
    pub(crate) fn new(signature: Signature) -> Self {
        let id = signature.archetype_id();
        let columns = signature
            .ids()
            .iter()
            .map(|&c| (c, ComponentColumn::new()))
            .collect();
        Self {
            id,
            signature,
            columns,
            entities: Vec::new(),
            rows: HashMap::new(),
            add_edges: HashMap::new(),
            remove_edges: HashMap::new(),
        }
    }

    pub fn id(&self) -> ArchetypeId {
        self.id
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Number of entities stored.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// The stored entities, indexed by row.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Membership check on the signature.
    pub fn has_component_type(&self, id: ComponentId) -> bool {
        self.signature.contains(id)
    }

    /// The row occupied by `entity`, if it lives here.
    pub fn row_of(&self, entity: Entity) -> Option<usize> {
        self.rows.get(&entity.index()).copied()
    }

    /// Type-erased access to one of `entity`'s components.
    pub fn component_of(&self, entity: Entity, id: ComponentId) -> Option<&dyn Any> {
        let row = self.row_of(entity)?;
        self.columns.get(&id)?.get_any(row)
    }

    pub(crate) fn column(&self, id: ComponentId) -> Option<&ComponentColumn> {
        self.columns.get(&id)
    }

    pub(crate) fn column_mut(&mut self, id: ComponentId) -> Option<&mut ComponentColumn> {
        self.columns.get_mut(&id)
    }

    /// Split borrow for query iteration: the entity list alongside mutable
    /// column access.
    pub(crate) fn entities_and_columns(
        &mut self,
    ) -> (&[Entity], &mut HashMap<ComponentId, ComponentColumn>) {
        (&self.entities, &mut self.columns)
    }

    /// Append one row. The part map's key set must equal the signature; on
    /// mismatch the parts are handed back untouched so the caller can restore
    /// them.
    pub(crate) fn push_row(&mut self, entity: Entity, mut parts: RowParts) -> Result<usize, RowParts> {
        if parts.len() != self.signature.len()
            || !parts.keys().all(|&id| self.signature.contains(id))
        {
            return Err(parts);
        }
        let row = self.entities.len();
        for &id in self.signature.ids() {
            let value = parts.remove(&id).unwrap();
            self.columns.get_mut(&id).unwrap().push_any(value);
        }
        self.entities.push(entity);
        self.rows.insert(entity.index(), row);
        debug_assert!(self.columns.values().all(|c| c.len() == self.entities.len()));
        Ok(row)
    }

    /// Swap-remove the row, dropping its components. Returns the entity that
    /// was moved into the freed row, if any — its directory entry must be
    /// updated by the caller.
    pub(crate) fn swap_remove_row(&mut self, row: usize) -> Option<Entity> {
        for column in self.columns.values_mut() {
            column.swap_remove(row);
        }
        let removed = self.entities.swap_remove(row);
        self.rows.remove(&removed.index());
        if row < self.entities.len() {
            let moved = self.entities[row];
            self.rows.insert(moved.index(), row);
            Some(moved)
        } else {
            None
        }
    }

    /// Like [`swap_remove_row`](Self::swap_remove_row), but hands ownership of
    /// the row's components back keyed by component id, for migration into
    /// another archetype.
    pub(crate) fn extract_row(&mut self, row: usize) -> (RowParts, Option<Entity>) {
        let mut parts = RowParts::with_capacity(self.columns.len());
        for (&id, column) in self.columns.iter_mut() {
            parts.insert(id, column.take(row));
        }
        let removed = self.entities.swap_remove(row);
        self.rows.remove(&removed.index());
        let moved = if row < self.entities.len() {
            let moved = self.entities[row];
            self.rows.insert(moved.index(), row);
            Some(moved)
        } else {
            None
        };
        (parts, moved)
    }

    // ── Edge cache ───────────────────────────────────────────────────

    /// Memoized destination for adding `id`, if one was recorded.
    pub fn add_edge(&self, id: ComponentId) -> Option<ArchetypeId> {
        self.add_edges.get(&id).copied()
    }

    pub(crate) fn set_add_edge(&mut self, id: ComponentId, dest: ArchetypeId) {
        self.add_edges.insert(id, dest);
    }

    /// Memoized destination for removing `id`, if one was recorded.
    pub fn remove_edge(&self, id: ComponentId) -> Option<ArchetypeId> {
        self.remove_edges.get(&id).copied()
    }

    pub(crate) fn set_remove_edge(&mut self, id: ComponentId, dest: ArchetypeId) {
        self.remove_edges.insert(id, dest);
    }
}
