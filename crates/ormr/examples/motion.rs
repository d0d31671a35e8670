//! Headless motion demo: a plugin wires up components and an integration
//! system, the main loop plays frame driver with a fixed timestep.
//!
//! Run with `RUST_LOG=debug cargo run --example motion` to watch archetypes
//! and plugins come up.

use ormr::prelude::*;

#[derive(Debug)]
struct Position {
    x: f64,
    y: f64,
}

struct Velocity {
    dx: f64,
    dy: f64,
}

/// Marker for entities the demo reports on.
struct Tracked;

struct MotionPlugin;

impl Plugin for MotionPlugin {
    fn name(&self) -> &str {
        "motion"
    }

    fn dependencies(&self) -> Vec<String> {
        vec!["time".to_string()]
    }

    fn build(&mut self, app: &mut App) -> anyhow::Result<()> {
        app.world.register_component::<Position>();
        app.world.register_component::<Velocity>();
        app.world.register_component::<Tracked>();

        app.add_system_fn("integrate", Stage::Update, |app, dt| {
            app.world.query::<(&mut Position, &Velocity)>(|_, (pos, vel)| {
                pos.x += vel.dx * dt;
                pos.y += vel.dy * dt;
            });
            Ok(())
        })?;
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut app = App::new().with_plugin(TimePlugin)?.with_plugin(MotionPlugin)?;
    app.build()?;

    let tracked = app.world.spawn((
        Position { x: 0.0, y: 0.0 },
        Velocity { dx: 1.0, dy: 0.5 },
        Tracked,
    ))?;
    for i in 0..4 {
        app.world.spawn((
            Position { x: f64::from(i), y: 0.0 },
            Velocity { dx: 0.0, dy: 1.0 },
        ))?;
    }

    // Fixed-step frame driver.
    let dt = 1.0 / 60.0;
    for _ in 0..120 {
        app.update_all(dt)?;
    }

    let time = app.resources.resource::<Time>();
    println!(
        "{} entities across {} archetypes after {} ticks ({:.2}s simulated)",
        app.world.entity_count(),
        app.world.archetype_count(),
        time.tick(),
        time.elapsed(),
    );
    let pos = app.world.get::<Position>(tracked).expect("tracked entity has a position");
    println!("tracked entity ended at ({:.2}, {:.2})", pos.x, pos.y);

    app.shutdown();
    Ok(())
}
