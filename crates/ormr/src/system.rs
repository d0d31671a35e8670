//! # Systems — Staged Per-Tick Processors
//!
//! A system is a named processor invoked once per tick. Systems are grouped
//! into lifecycle [`Stage`]s with a fixed total order — `pre_update`,
//! `update`, `post_update`, `render` — and run in insertion order within each
//! stage. Dispatch is single-threaded and cooperative: each system runs to
//! completion and observes every change made by the systems before it.
//!
//! There is no automatic parallelism and no dependency analysis between
//! systems; ordering is entirely stage-then-insertion order, which is easy to
//! reason about and all this core needs.
//!
//! A failing system aborts the tick: later systems do not run, and the error
//! is surfaced to the frame driver as a [`TickError`].

use std::collections::HashMap;

use crate::app::App;
use crate::error::{BuildError, TickError};

/// A processor invoked once per tick while enabled.
pub trait System {
    /// Stable identifying name, unique within a schedule.
    fn name(&self) -> &str;

    /// Called exactly once when the app is built, before any tick. Disabled
    /// systems are initialized too.
    fn init(&mut self, app: &mut App) -> anyhow::Result<()> {
        let _ = app;
        Ok(())
    }

    /// Called every tick, in stage-then-insertion order.
    fn update(&mut self, app: &mut App, dt: f64) -> anyhow::Result<()>;
}

/// Lifecycle stages, dispatched in declaration order every tick.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Stage {
    PreUpdate,
    Update,
    PostUpdate,
    Render,
}

impl Stage {
    /// All stages, in dispatch order.
    pub const ALL: [Stage; 4] = [Stage::PreUpdate, Stage::Update, Stage::PostUpdate, Stage::Render];

    fn index(self) -> usize {
        self as usize
    }
}

struct SystemEntry {
    name: String,
    system: Box<dyn System>,
}

/// Wraps a closure as a [`System`] with an explicit name.
struct FnSystem {
    name: String,
    #[allow(clippy::type_complexity)]
    f: Box<dyn FnMut(&mut App, f64) -> anyhow::Result<()>>,
}

impl System for FnSystem {
    fn name(&self) -> &str {
        &self.name
    }

    fn update(&mut self, app: &mut App, dt: f64) -> anyhow::Result<()> {
        (self.f)(app, dt)
    }
}

/// The ordered registry of systems, grouped by stage.
///
/// Enable flags live beside the entries, so
/// [`set_enabled`](Schedule::set_enabled) works even from inside a running
/// system: a system disabled mid-tick is skipped for the rest of that tick.
pub struct Schedule {
    stages: [Vec<SystemEntry>; 4],
    /// name → enabled. Also the duplicate-name check: every registered system
    /// has an entry here.
    enabled: HashMap<String, bool>,
}

impl Schedule {
    pub fn new() -> Self {
        Self {
            stages: Default::default(),
            enabled: HashMap::new(),
        }
    }

    /// Append a system to a stage. Fails on a duplicate name.
    pub fn add(&mut self, stage: Stage, system: impl System + 'static) -> Result<(), BuildError> {
        let name = system.name().to_string();
        if self.enabled.contains_key(&name) {
            return Err(BuildError::DuplicateSystemName(name));
        }
        self.enabled.insert(name.clone(), true);
        self.stages[stage.index()].push(SystemEntry {
            name,
            system: Box::new(system),
        });
        Ok(())
    }

    /// Append a closure system under an explicit name.
    pub fn add_fn(
        &mut self,
        name: &str,
        stage: Stage,
        f: impl FnMut(&mut App, f64) -> anyhow::Result<()> + 'static,
    ) -> Result<(), BuildError> {
        self.add(
            stage,
            FnSystem {
                name: name.to_string(),
                f: Box::new(f),
            },
        )
    }

    /// Enable or disable a system by name. Disabled systems are skipped by
    /// dispatch but still receive `init`. Returns `false` for unknown names.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        match self.enabled.get_mut(name) {
            Some(flag) => {
                *flag = enabled;
                true
            }
            None => false,
        }
    }

    /// Current enable flag for a system, `None` for unknown names.
    pub fn is_enabled(&self, name: &str) -> Option<bool> {
        self.enabled.get(name).copied()
    }

    /// Number of registered systems across all stages.
    pub fn len(&self) -> usize {
        self.stages.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.iter().all(Vec::is_empty)
    }

    /// Take the entries out for dispatch. Systems receive `&mut App`, which
    /// contains this schedule, so the entries cannot stay inside it while
    /// they run.
    fn take_entries(&mut self) -> [Vec<SystemEntry>; 4] {
        std::mem::take(&mut self.stages)
    }

    /// Put dispatched entries back. Systems registered *during* the tick are
    /// kept, appended after the ones that ran.
    fn restore_entries(&mut self, mut taken: [Vec<SystemEntry>; 4]) {
        for (ran, added) in taken.iter_mut().zip(self.stages.iter_mut()) {
            ran.append(added);
        }
        self.stages = taken;
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self::new()
    }
}

/// Run every system's `init`, in stage-then-insertion order. Called once by
/// [`App::build`].
pub(crate) fn dispatch_init(app: &mut App) -> Result<(), BuildError> {
    let mut taken = app.systems.take_entries();
    let mut result = Ok(());
    'stages: for stage in taken.iter_mut() {
        for entry in stage.iter_mut() {
            if let Err(source) = entry.system.init(app) {
                result = Err(BuildError::SystemInit {
                    name: entry.name.clone(),
                    source,
                });
                break 'stages;
            }
        }
    }
    app.systems.restore_entries(taken);
    result
}

/// Run one tick: every enabled system, in stage-then-insertion order. The
/// first failure aborts the tick.
pub(crate) fn dispatch_update(app: &mut App, dt: f64) -> Result<(), TickError> {
    let mut taken = app.systems.take_entries();
    let mut result = Ok(());
    'stages: for stage in taken.iter_mut() {
        for entry in stage.iter_mut() {
            if app.systems.is_enabled(&entry.name) == Some(false) {
                continue;
            }
            if let Err(source) = entry.system.update(app, dt) {
                log::error!("system `{}` failed: {source:#}", entry.name);
                result = Err(TickError {
                    name: entry.name.clone(),
                    source,
                });
                break 'stages;
            }
        }
    }
    app.systems.restore_entries(taken);
    result
}
