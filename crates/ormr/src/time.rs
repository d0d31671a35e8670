//! Tick timing resource.
//!
//! The core is headless, so time is whatever the frame driver says it is:
//! [`TimePlugin`] installs a `pre_update` system that folds each tick's `dt`
//! into the [`Time`] resource, and every later system reads the result.

use crate::app::App;
use crate::plugin::Plugin;
use crate::system::Stage;

/// Accumulated tick timing. Inserted by [`TimePlugin`] and advanced at the
/// start of every tick.
#[derive(Clone, Copy, Debug, Default)]
pub struct Time {
    delta: f64,
    elapsed: f64,
    tick: u64,
}

impl Time {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn advance(&mut self, dt: f64) {
        self.delta = dt;
        self.elapsed += dt;
        self.tick += 1;
    }

    /// Duration of the current tick, in seconds.
    pub fn delta(&self) -> f64 {
        self.delta
    }

    /// Total time accumulated across all ticks, in seconds.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Number of ticks run so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }
}

/// Inserts [`Time`] and keeps it advancing.
pub struct TimePlugin;

impl Plugin for TimePlugin {
    fn name(&self) -> &str {
        "time"
    }

    fn build(&mut self, app: &mut App) -> anyhow::Result<()> {
        app.insert_resource(Time::new());
        app.add_system_fn("advance_time", Stage::PreUpdate, |app, dt| {
            app.resources.resource_mut::<Time>().advance(dt);
            Ok(())
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_advances_each_tick() {
        let mut app = App::new().with_plugin(TimePlugin).unwrap();
        app.build().unwrap();

        app.update_all(0.25).unwrap();
        app.update_all(0.5).unwrap();

        let time = app.resources.resource::<Time>();
        assert_eq!(time.delta(), 0.5);
        assert_eq!(time.elapsed(), 0.75);
        assert_eq!(time.tick(), 2);
    }

    #[test]
    fn time_is_visible_to_update_systems() {
        let mut app = App::new().with_plugin(TimePlugin).unwrap();
        app.insert_resource(Vec::<u64>::new());
        app.add_system_fn("observe", Stage::Update, |app, _| {
            let tick = app.resources.resource::<Time>().tick();
            app.resources.resource_mut::<Vec<u64>>().push(tick);
            Ok(())
        })
        .unwrap();
        app.build().unwrap();

        app.update_all(0.016).unwrap();
        app.update_all(0.016).unwrap();

        // pre_update advanced the counter before update observed it.
        assert_eq!(app.resources.resource::<Vec<u64>>(), &vec![1, 2]);
    }
}
