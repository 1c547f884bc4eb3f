//! Entity allocation demo
//!
//! Spawns a handful of entities with position and velocity tables, steps
//! them, despawns the ones that leave the field, and shows that reused slots
//! never see stale data. Finishes with the host-boundary flow a scripting
//! runtime would use.
//!
//! Usage: `entity_demo [config.toml|config.ron]`

use entity_alloc::prelude::*;

const FIELD_HALF_WIDTH: f32 = 10.0;

#[derive(Debug, Clone, Copy)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, Copy)]
struct Velocity {
    dx: f32,
    dy: f32,
}

struct EntityDemo {
    allocator: Allocator,
    positions: IndexedStore<Position>,
    velocities: IndexedStore<Velocity>,
    names: IndexedStore<String>,
}

impl EntityDemo {
    fn new(config: &AllocConfig) -> Self {
        log::info!("Creating entity demo...");
        Self {
            allocator: Allocator::from_config(&config.allocator),
            positions: IndexedStore::from_config(&config.store),
            velocities: IndexedStore::from_config(&config.store),
            names: IndexedStore::from_config(&config.store),
        }
    }

    fn spawn(&mut self, name: &str, position: Position, velocity: Velocity) -> Result<Handle, AllocError> {
        let entity = self.allocator.allocate()?;
        self.positions.set(entity, position);
        self.velocities.set(entity, velocity);
        self.names.set(entity, name.to_string());
        log::info!("Spawned {name} as {entity}");
        Ok(entity)
    }

    fn step(&mut self, delta_time: f32) {
        let live: Vec<_> = self.allocator.iter_live().collect();
        for entity in live {
            let Some(velocity) = self.velocities.get(entity).copied() else {
                continue;
            };
            if let Some(position) = self.positions.get_mut(entity) {
                position.x += velocity.dx * delta_time;
                position.y += velocity.dy * delta_time;
            }
        }
    }

    fn despawn_outside_field(&mut self) -> usize {
        let outside: Vec<_> = self
            .allocator
            .iter_live()
            .filter(|&entity| {
                self.positions
                    .get(entity)
                    .is_some_and(|p| p.x.abs() > FIELD_HALF_WIDTH || p.y.abs() > FIELD_HALF_WIDTH)
            })
            .collect();

        for &entity in &outside {
            let name = self.names.get(entity).cloned().unwrap_or_default();
            self.allocator.free(entity);
            log::info!("Despawned {name} ({entity})");
        }

        for dropped in [
            self.positions.retain_live(&self.allocator),
            self.velocities.retain_live(&self.allocator),
            self.names.retain_live(&self.allocator),
        ] {
            debug_assert_eq!(dropped, outside.len());
        }
        outside.len()
    }

    fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let ship = self.spawn("ship", Position { x: 0.0, y: 0.0 }, Velocity { dx: 1.0, dy: 0.5 })?;
        let rock = self.spawn("rock", Position { x: 8.0, y: 0.0 }, Velocity { dx: 4.0, dy: 0.0 })?;
        self.spawn("comet", Position { x: -9.0, y: 9.0 }, Velocity { dx: -2.0, dy: 2.0 })?;

        for frame in 0..4 {
            self.step(0.5);
            let despawned = self.despawn_outside_field();
            log::info!(
                "Frame {frame}: {} live, {despawned} despawned",
                self.allocator.len()
            );
        }

        let replacement = self.spawn("drone", Position { x: 1.0, y: 1.0 }, Velocity { dx: 0.0, dy: 0.0 })?;
        if replacement.slot() == rock.slot() {
            log::info!(
                "{replacement} reuses the slot of {rock}; stale lookup gives {:?}",
                self.names.get(rock)
            );
        }

        if let Some(position) = self.positions.get(ship) {
            log::info!("Ship ended at ({:.1}, {:.1})", position.x, position.y);
        }
        log::info!(
            "Allocator: {} live, {} slots, {} free",
            self.allocator.len(),
            self.allocator.capacity(),
            self.allocator.free_len()
        );
        Ok(())
    }
}

fn run_host_flow() -> Result<(), BoundaryError> {
    log::info!("Running host boundary flow...");
    let mut host: HostBindings = HostBindings::new();

    let allocator = host.new_allocator(Some(255));
    let store = host.new_store();

    let a = host.allocate(allocator)?;
    let b = host.allocate(allocator)?;
    host.store_set(store, a, HostValue::Int(10))?;
    host.store_set(store, b, HostValue::from("an_object"))?;

    log::info!("a -> {:?}", host.store_get(store, a)?);
    log::info!("b -> {:?}", host.store_get(store, b)?);
    log::info!("removed a -> {:?}", host.store_remove(store, a)?);
    log::info!("a after remove -> {:?}", host.store_get(store, a)?);

    host.dispose_allocator(allocator)?;
    host.dispose_store(store)?;

    if let Err(err) = host.allocate(allocator) {
        log::info!("Use after dispose rejected: {err}");
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => AllocConfig::load_from_file(&path)?,
        None => AllocConfig::default(),
    };
    config.validate()?;
    entity_alloc::logging::init_with_level(&config.log_level);

    let mut demo = EntityDemo::new(&config);
    demo.run()?;
    run_host_flow()?;

    log::info!("Demo complete");
    Ok(())
}
