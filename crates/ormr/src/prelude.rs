//! Convenience re-exports — `use ormr::prelude::*` for the common items.

pub use crate::app::App;
pub use crate::ecs::{
    ArchetypeId, Bundle, CachedQuery, ComponentId, Entity, QueryResult, Signature, World,
};
pub use crate::error::{BuildError, SpawnError, TickError};
pub use crate::plugin::Plugin;
pub use crate::resource::Resources;
pub use crate::system::{Schedule, Stage, System};
pub use crate::time::{Time, TimePlugin};
