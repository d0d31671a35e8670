//! # App — Composition Root
//!
//! The [`App`] owns the [`World`], the [`Resources`] store, the system
//! [`Schedule`], and the [`Plugins`] registry, and wires them together:
//!
//! 1. Register plugins, resources, and systems (builder phase).
//! 2. [`App::build`] — plugins build in dependency order, then every system's
//!    `init` runs once.
//! 3. The frame driver calls [`App::update_all`] once per tick with the
//!    elapsed time; systems run stage by stage against this app.
//!
//! The core is headless: there is no event loop here. Whatever drives frames
//! — a windowing loop, a fixed-step simulation, a test — owns the `App` and
//! ticks it.
//!
//! ## Example
//!
//! ```ignore
//! let mut app = App::new()
//!     .with_plugin(TimePlugin)?
//!     .with_plugin(GameplayPlugin)?;
//! app.build()?;
//! loop {
//!     app.update_all(dt)?;
//! }
//! ```

use crate::ecs::World;
use crate::error::{BuildError, TickError};
use crate::plugin::{self, Plugin, Plugins};
use crate::resource::Resources;
use crate::system::{self, Schedule, Stage, System};

/// The composition root: world, resources, systems, and plugins.
pub struct App {
    pub world: World,
    pub resources: Resources,
    pub systems: Schedule,
    pub plugins: Plugins,
    built: bool,
}

impl App {
    pub fn new() -> Self {
        Self {
            world: World::new(),
            resources: Resources::new(),
            systems: Schedule::new(),
            plugins: Plugins::new(),
            built: false,
        }
    }

    // ── Builder phase ────────────────────────────────────────────────
    //
    // Consuming `with_*` variants for fluent setup in `main`, non-consuming
    // variants for plugin bodies that only have `&mut App`.

    /// Insert a resource (consuming builder form).
    pub fn with_resource<T: 'static + Send + Sync>(mut self, value: T) -> Self {
        self.resources.insert(value);
        self
    }

    /// Register a plugin (consuming builder form).
    pub fn with_plugin(mut self, plugin: impl Plugin + 'static) -> Result<Self, BuildError> {
        self.add_plugin(plugin)?;
        Ok(self)
    }

    /// Add a system to a stage (consuming builder form).
    pub fn with_system(mut self, stage: Stage, system: impl System + 'static) -> Result<Self, BuildError> {
        self.add_system(stage, system)?;
        Ok(self)
    }

    /// Insert a resource.
    pub fn insert_resource<T: 'static + Send + Sync>(&mut self, value: T) {
        self.resources.insert(value);
    }

    /// Register a plugin. Fails on a duplicate plugin name.
    pub fn add_plugin(&mut self, plugin: impl Plugin + 'static) -> Result<(), BuildError> {
        self.plugins.add(Box::new(plugin))
    }

    /// Add a system to a stage. Fails on a duplicate system name.
    pub fn add_system(&mut self, stage: Stage, system: impl System + 'static) -> Result<(), BuildError> {
        self.systems.add(stage, system)
    }

    /// Add a closure system to a stage under an explicit name.
    pub fn add_system_fn(
        &mut self,
        name: &str,
        stage: Stage,
        f: impl FnMut(&mut App, f64) -> anyhow::Result<()> + 'static,
    ) -> Result<(), BuildError> {
        self.systems.add_fn(name, stage, f)
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Build the app: run every plugin's `build` in dependency order, then
    /// `on_enable` in the same order, then every system's `init` exactly
    /// once. Idempotent — repeated calls do nothing.
    pub fn build(&mut self) -> Result<(), BuildError> {
        if self.built {
            return Ok(());
        }
        plugin::dispatch_build(self)?;
        system::dispatch_init(self)?;
        self.built = true;
        Ok(())
    }

    /// Run one tick: every enabled system, stage by stage, in insertion
    /// order, each receiving this app and the elapsed time.
    ///
    /// A failing system aborts the tick; the remaining systems do not run
    /// and the error propagates to the frame driver.
    pub fn update_all(&mut self, dt: f64) -> Result<(), TickError> {
        system::dispatch_update(self, dt)
    }

    /// Invoke every plugin's `on_disable`, in reverse build order.
    pub fn shutdown(&mut self) {
        plugin::dispatch_shutdown(self);
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuildError;

    /// Records the order hooks fire in, as a resource systems/plugins append to.
    #[derive(Default)]
    struct Trace(Vec<String>);

    fn push_trace(app: &mut App, entry: &str) {
        app.resources.resource_mut::<Trace>().0.push(entry.to_string());
    }

    fn tracing_app() -> App {
        App::new().with_resource(Trace::default())
    }

    // ── Stage and insertion order ────────────────────────────────────

    #[test]
    fn systems_run_in_stage_then_insertion_order() {
        let mut app = tracing_app();
        // Registered out of stage order on purpose.
        app.add_system_fn("draw", Stage::Render, |app, _| {
            push_trace(app, "draw");
            Ok(())
        })
        .unwrap();
        app.add_system_fn("integrate", Stage::Update, |app, _| {
            push_trace(app, "integrate");
            Ok(())
        })
        .unwrap();
        app.add_system_fn("input", Stage::PreUpdate, |app, _| {
            push_trace(app, "input");
            Ok(())
        })
        .unwrap();
        app.add_system_fn("collide", Stage::Update, |app, _| {
            push_trace(app, "collide");
            Ok(())
        })
        .unwrap();
        app.add_system_fn("cleanup", Stage::PostUpdate, |app, _| {
            push_trace(app, "cleanup");
            Ok(())
        })
        .unwrap();

        app.build().unwrap();
        app.update_all(0.016).unwrap();

        assert_eq!(
            app.resources.resource::<Trace>().0,
            vec!["input", "integrate", "collide", "cleanup", "draw"]
        );
    }

    #[test]
    fn failing_system_aborts_the_tick() {
        let mut app = tracing_app();
        app.add_system_fn("first", Stage::Update, |app, _| {
            push_trace(app, "first");
            Ok(())
        })
        .unwrap();
        app.add_system_fn("boom", Stage::Update, |_, _| Err(anyhow::anyhow!("exploded")))
            .unwrap();
        app.add_system_fn("after", Stage::PostUpdate, |app, _| {
            push_trace(app, "after");
            Ok(())
        })
        .unwrap();

        app.build().unwrap();
        let err = app.update_all(0.016).unwrap_err();
        assert_eq!(err.name, "boom");
        // Everything after the failure was skipped.
        assert_eq!(app.resources.resource::<Trace>().0, vec!["first"]);

        // The next tick runs again from the top.
        app.resources.resource_mut::<Trace>().0.clear();
        assert!(app.update_all(0.016).is_err());
        assert_eq!(app.resources.resource::<Trace>().0, vec!["first"]);
    }

    #[test]
    fn disabled_systems_are_skipped() {
        let mut app = tracing_app();
        app.add_system_fn("worker", Stage::Update, |app, _| {
            push_trace(app, "worker");
            Ok(())
        })
        .unwrap();

        app.build().unwrap();
        app.update_all(0.016).unwrap();
        assert!(app.systems.set_enabled("worker", false));
        app.update_all(0.016).unwrap();
        assert!(app.systems.set_enabled("worker", true));
        app.update_all(0.016).unwrap();

        assert_eq!(app.resources.resource::<Trace>().0, vec!["worker", "worker"]);
    }

    #[test]
    fn a_system_can_pause_another() {
        let mut app = tracing_app();
        app.add_system_fn("pauser", Stage::PreUpdate, |app, _| {
            app.systems.set_enabled("worker", false);
            Ok(())
        })
        .unwrap();
        app.add_system_fn("worker", Stage::Update, |app, _| {
            push_trace(app, "worker");
            Ok(())
        })
        .unwrap();

        app.build().unwrap();
        // Disabled from within the same tick, before its stage ran.
        app.update_all(0.016).unwrap();
        assert!(app.resources.resource::<Trace>().0.is_empty());
    }

    // ── Init ─────────────────────────────────────────────────────────

    struct InitCounting;

    impl System for InitCounting {
        fn name(&self) -> &str {
            "init_counting"
        }

        fn init(&mut self, app: &mut App) -> anyhow::Result<()> {
            push_trace(app, "init");
            Ok(())
        }

        fn update(&mut self, app: &mut App, _dt: f64) -> anyhow::Result<()> {
            push_trace(app, "update");
            Ok(())
        }
    }

    #[test]
    fn init_runs_once_even_for_disabled_systems() {
        let mut app = tracing_app().with_system(Stage::Update, InitCounting).unwrap();
        app.systems.set_enabled("init_counting", false);

        app.build().unwrap();
        // build is idempotent; init must not run twice.
        app.build().unwrap();
        app.update_all(0.016).unwrap();

        // init fired despite the disable; update did not.
        assert_eq!(app.resources.resource::<Trace>().0, vec!["init"]);
    }

    // ── Plugins ──────────────────────────────────────────────────────

    struct TracingPlugin {
        name: &'static str,
        dependencies: Vec<String>,
    }

    impl Plugin for TracingPlugin {
        fn name(&self) -> &str {
            self.name
        }

        fn dependencies(&self) -> Vec<String> {
            self.dependencies.clone()
        }

        fn build(&mut self, app: &mut App) -> anyhow::Result<()> {
            push_trace(app, &format!("build:{}", self.name));
            Ok(())
        }

        fn on_enable(&mut self, app: &mut App) {
            push_trace(app, &format!("enable:{}", self.name));
        }

        fn on_disable(&mut self, app: &mut App) {
            push_trace(app, &format!("disable:{}", self.name));
        }
    }

    #[test]
    fn plugins_build_in_dependency_order() {
        let mut app = tracing_app();
        // X depends on Y but is registered first.
        app.add_plugin(TracingPlugin {
            name: "x",
            dependencies: vec!["y".to_string()],
        })
        .unwrap();
        app.add_plugin(TracingPlugin {
            name: "y",
            dependencies: vec![],
        })
        .unwrap();

        app.build().unwrap();
        // All builds precede all enables, each in dependency order.
        assert_eq!(
            app.resources.resource::<Trace>().0,
            vec!["build:y", "build:x", "enable:y", "enable:x"]
        );

        app.shutdown();
        let trace = &app.resources.resource::<Trace>().0;
        assert_eq!(trace.len(), 6);
        assert_eq!(trace[4], "disable:x");
        assert_eq!(trace[5], "disable:y");
    }

    #[test]
    fn unknown_dependency_fails_build() {
        let mut app = tracing_app();
        app.add_plugin(TracingPlugin {
            name: "x",
            dependencies: vec!["missing".to_string()],
        })
        .unwrap();

        let err = app.build().unwrap_err();
        assert!(matches!(
            err,
            BuildError::UnknownDependency { plugin, dependency }
                if plugin == "x" && dependency == "missing"
        ));
    }

    #[test]
    fn dependency_cycle_fails_build() {
        let mut app = tracing_app();
        app.add_plugin(TracingPlugin {
            name: "a",
            dependencies: vec!["b".to_string()],
        })
        .unwrap();
        app.add_plugin(TracingPlugin {
            name: "b",
            dependencies: vec!["a".to_string()],
        })
        .unwrap();

        let err = app.build().unwrap_err();
        assert!(matches!(err, BuildError::DependencyCycle(_)));
    }

    #[test]
    fn duplicate_plugin_name_rejected() {
        let mut app = App::new();
        app.add_plugin(TracingPlugin { name: "p", dependencies: vec![] }).unwrap();
        let err = app
            .add_plugin(TracingPlugin { name: "p", dependencies: vec![] })
            .unwrap_err();
        assert!(matches!(err, BuildError::DuplicatePluginName(name) if name == "p"));
    }

    struct FailingPlugin;

    impl Plugin for FailingPlugin {
        fn name(&self) -> &str {
            "failing"
        }

        fn build(&mut self, _app: &mut App) -> anyhow::Result<()> {
            anyhow::bail!("config missing")
        }
    }

    #[test]
    fn plugin_build_error_halts_construction() {
        let mut app = tracing_app();
        app.add_plugin(FailingPlugin).unwrap();
        app.add_plugin(TracingPlugin { name: "other", dependencies: vec![] }).unwrap();

        let err = app.build().unwrap_err();
        assert!(matches!(err, BuildError::PluginBuild { name, .. } if name == "failing"));
        // No plugin was enabled.
        let trace = &app.resources.resource::<Trace>().0;
        assert!(trace.iter().all(|entry| !entry.starts_with("enable:")));
    }

    // ── Plugins composing the full surface ───────────────────────────

    #[derive(Debug, PartialEq)]
    struct Body {
        x: f64,
    }
    #[derive(Debug, PartialEq)]
    struct Speed {
        dx: f64,
    }

    struct MotionPlugin;

    impl Plugin for MotionPlugin {
        fn name(&self) -> &str {
            "motion"
        }

        fn build(&mut self, app: &mut App) -> anyhow::Result<()> {
            app.world.register_component::<Body>();
            app.world.register_component::<Speed>();
            app.add_system_fn("integrate", Stage::Update, |app, dt| {
                app.world.query::<(&mut Body, &Speed)>(|_, (body, speed)| {
                    body.x += speed.dx * dt;
                });
                Ok(())
            })?;
            Ok(())
        }
    }

    #[test]
    fn plugin_wires_components_systems_and_ticks() {
        let mut app = App::new().with_plugin(MotionPlugin).unwrap();
        app.build().unwrap();

        let e = app.world.spawn((Body { x: 0.0 }, Speed { dx: 2.0 })).unwrap();
        for _ in 0..10 {
            app.update_all(0.5).unwrap();
        }
        assert_eq!(app.world.get::<Body>(e), Some(&Body { x: 10.0 }));
    }
}
