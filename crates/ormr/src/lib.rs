//! # ormr — Archetype ECS Core
//!
//! A headless, single-threaded entity-component-system runtime: entities are
//! generational handles, components live in dense archetype columns grouped
//! by exact component set, and behavior is composed from plain systems
//! dispatched in lifecycle stages by an [`App`](app::App) that plugins
//! assemble.
//!
//! Start with `use ormr::prelude::*`, register component types on the world,
//! and tick the app from whatever drives your frames:
//!
//! ```ignore
//! let mut app = App::new().with_plugin(TimePlugin)?.with_plugin(GamePlugin)?;
//! app.build()?;
//! loop {
//!     app.update_all(dt)?;
//! }
//! ```

pub mod app;
pub mod ecs;
pub mod error;
pub mod plugin;
pub mod prelude;
pub mod resource;
pub mod system;
pub mod time;
