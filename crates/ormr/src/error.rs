//! Error types surfaced by the library.
//!
//! Two families, matching how failures propagate:
//!
//! * [`SpawnError`] — structural failures from fallible world operations.
//!   Most runtime structural operations (`insert`, `remove`, `despawn`, `get`)
//!   fail softly with `false`/`None` instead; `spawn` reports *why* a bundle
//!   was rejected.
//! * [`BuildError`] / [`TickError`] — composition-time and dispatch-time
//!   failures from the app layer. Plugin and system bodies report opaque
//!   [`anyhow::Error`]s; the app layer wraps them with the offending name.

use thiserror::Error;

/// Why a component bundle could not be spawned.
#[derive(Debug, Error)]
pub enum SpawnError {
    /// A bundle component type was never registered with the world.
    #[error("component type `{0}` is not registered")]
    UnregisteredType(&'static str),
    /// The bundle names the same component type twice.
    #[error("bundle contains component type `{0}` more than once")]
    DuplicateComponent(&'static str),
    /// The target archetype refused the new row. The world is left unchanged.
    #[error("archetype rejected the new row")]
    ArchetypeInsert,
}

/// Composition-phase failures. These halt construction of the app.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("a system named `{0}` is already registered")]
    DuplicateSystemName(String),
    #[error("a plugin named `{0}` is already registered")]
    DuplicatePluginName(String),
    #[error("plugin `{plugin}` depends on unknown plugin `{dependency}`")]
    UnknownDependency { plugin: String, dependency: String },
    #[error("plugin dependency cycle through `{0}`")]
    DependencyCycle(String),
    #[error("plugin `{name}` failed to build")]
    PluginBuild {
        name: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("system `{name}` failed to initialize")]
    SystemInit {
        name: String,
        #[source]
        source: anyhow::Error,
    },
}

/// A system body failed during dispatch. The tick is aborted: systems after
/// the failing one do not run this tick.
#[derive(Debug, Error)]
#[error("system `{name}` failed; tick aborted")]
pub struct TickError {
    /// Name of the failing system.
    pub name: String,
    #[source]
    pub source: anyhow::Error,
}
