//! # Plugins — Dependency-Ordered One-Shot Builders
//!
//! A plugin bundles related setup — component registration, resources,
//! systems — behind a name and a list of plugin names it depends on. Building
//! the app topologically sorts the plugins so every dependency builds first,
//! then calls `build` and `on_enable` in that order. Unknown dependencies and
//! cycles are composition errors that halt construction.
//!
//! Plugins run exactly once. `on_disable` is the symmetric hook, invoked in
//! reverse build order by [`App::shutdown`].

use std::collections::HashMap;

use crate::app::App;
use crate::error::BuildError;

/// A one-shot builder that extends the app.
///
/// # Example
///
/// ```ignore
/// struct PhysicsPlugin;
///
/// impl Plugin for PhysicsPlugin {
///     fn name(&self) -> &str {
///         "physics"
///     }
///
///     fn dependencies(&self) -> Vec<String> {
///         vec!["time".to_string()]
///     }
///
///     fn build(&mut self, app: &mut App) -> anyhow::Result<()> {
///         app.world.register_component::<RigidBody>();
///         app.add_system_fn("integrate", Stage::Update, integrate)?;
///         Ok(())
///     }
/// }
/// ```
pub trait Plugin {
    /// Stable identifying name, unique among registered plugins.
    fn name(&self) -> &str;

    /// Names of plugins that must build before this one.
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// Register types, resources, and systems. Called once, after every
    /// dependency's `build`.
    fn build(&mut self, app: &mut App) -> anyhow::Result<()>;

    /// Called after *all* plugins have built, in build order.
    fn on_enable(&mut self, app: &mut App) {
        let _ = app;
    }

    /// Called by [`App::shutdown`], in reverse build order.
    fn on_disable(&mut self, app: &mut App) {
        let _ = app;
    }
}

/// The registered plugins and the realized build order.
pub struct Plugins {
    plugins: Vec<Box<dyn Plugin>>,
    /// Indices into `plugins` in the order the last successful build ran.
    build_order: Vec<usize>,
    built: bool,
}

impl Plugins {
    pub fn new() -> Self {
        Self {
            plugins: Vec::new(),
            build_order: Vec::new(),
            built: false,
        }
    }

    /// Register a plugin. Fails on a duplicate name.
    pub fn add(&mut self, plugin: Box<dyn Plugin>) -> Result<(), BuildError> {
        let name = plugin.name();
        if self.plugins.iter().any(|p| p.name() == name) {
            return Err(BuildError::DuplicatePluginName(name.to_string()));
        }
        self.plugins.push(plugin);
        Ok(())
    }

    /// Number of registered plugins.
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Whether [`App::build`] has already run the plugins.
    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Topologically sort the plugins by declared dependencies.
    ///
    /// Depth-first with three node states; visiting an in-progress node means
    /// the declarations form a cycle.
    fn resolve_order(&self) -> Result<Vec<usize>, BuildError> {
        fn visit(
            plugins: &[Box<dyn Plugin>],
            index_of: &HashMap<&str, usize>,
            state: &mut [VisitState],
            order: &mut Vec<usize>,
            i: usize,
        ) -> Result<(), BuildError> {
            match state[i] {
                VisitState::Done => return Ok(()),
                VisitState::InProgress => {
                    return Err(BuildError::DependencyCycle(plugins[i].name().to_string()));
                }
                VisitState::Unvisited => {}
            }
            state[i] = VisitState::InProgress;
            for dependency in plugins[i].dependencies() {
                let Some(&dep) = index_of.get(dependency.as_str()) else {
                    return Err(BuildError::UnknownDependency {
                        plugin: plugins[i].name().to_string(),
                        dependency,
                    });
                };
                visit(plugins, index_of, state, order, dep)?;
            }
            state[i] = VisitState::Done;
            order.push(i);
            Ok(())
        }

        #[derive(Clone, Copy, PartialEq)]
        enum VisitState {
            Unvisited,
            InProgress,
            Done,
        }

        let index_of: HashMap<&str, usize> = self
            .plugins
            .iter()
            .enumerate()
            .map(|(i, p)| (p.name(), i))
            .collect();
        let mut state = vec![VisitState::Unvisited; self.plugins.len()];
        let mut order = Vec::with_capacity(self.plugins.len());
        for i in 0..self.plugins.len() {
            visit(&self.plugins, &index_of, &mut state, &mut order, i)?;
        }
        Ok(order)
    }
}

impl Default for Plugins {
    fn default() -> Self {
        Self::new()
    }
}

/// Build every registered plugin in dependency order, then call `on_enable`
/// in the same order. Called once by [`App::build`].
pub(crate) fn dispatch_build(app: &mut App) -> Result<(), BuildError> {
    if app.plugins.built {
        return Ok(());
    }
    let order = app.plugins.resolve_order()?;

    // Plugins receive &mut App, which contains this registry, so the boxes
    // cannot stay inside it while they run.
    let mut taken = std::mem::take(&mut app.plugins.plugins);
    let mut result = Ok(());
    for &i in &order {
        let plugin = &mut taken[i];
        log::info!("building plugin `{}`", plugin.name());
        if let Err(source) = plugin.build(app) {
            result = Err(BuildError::PluginBuild {
                name: plugin.name().to_string(),
                source,
            });
            break;
        }
    }
    if result.is_ok() {
        for &i in &order {
            taken[i].on_enable(app);
        }
        app.plugins.build_order = order;
        app.plugins.built = true;
    }

    // Restore, keeping any plugin registered during the build (it will not
    // be built — plugins are one-shot).
    let added = std::mem::take(&mut app.plugins.plugins);
    app.plugins.plugins = taken;
    app.plugins.plugins.extend(added);
    result
}

/// Call `on_disable` in reverse build order. No-op before a successful build.
pub(crate) fn dispatch_shutdown(app: &mut App) {
    if !app.plugins.built {
        return;
    }
    let order = std::mem::take(&mut app.plugins.build_order);
    let mut taken = std::mem::take(&mut app.plugins.plugins);
    for &i in order.iter().rev() {
        taken[i].on_disable(app);
    }
    let added = std::mem::take(&mut app.plugins.plugins);
    app.plugins.plugins = taken;
    app.plugins.plugins.extend(added);
    app.plugins.built = false;
}
