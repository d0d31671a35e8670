//! # Entity Component System
//!
//! An archetype-based ECS: entities with the same exact component set are
//! stored together in dense parallel columns, so queries are linear scans
//! over matching archetypes.
//!
//! ## Design
//!
//! - Component types are registered once and given dense [`ComponentId`]s.
//! - Entity handles are generational indices; stale handles fail safely.
//! - Archetypes are identified by the canonical hash of their sorted
//!   signature and memoize their ±1-component neighbors.
//! - Adding/removing a component migrates the entity between archetypes,
//!   preserving its identity and the values of its other components.
//! - Cached queries compare a world structure version instead of being
//!   tracked by the world.

pub mod archetype;
pub mod component;
pub mod entity;
pub mod query;
pub mod registry;
pub mod world;

pub use archetype::{Archetype, ArchetypeId, Signature};
pub use component::ComponentColumn;
pub use entity::Entity;
pub use query::{CachedQuery, QueryIter, QueryParam, QueryResult};
pub use registry::{ComponentId, ComponentInfo, ComponentRegistry};
pub use world::{Bundle, World};
