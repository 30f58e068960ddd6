//! Driver surface for scripted or interactive controllers
//!
//! `Simulation` wraps a `World` and remembers how it was built, so `reset`
//! can replay the exact same trajectory.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::core::config::SimulationConfig;
use crate::core::error::Result;
use crate::ecs::world::World;
use crate::simulation::population::{setup_world, EntityCounts};
use crate::simulation::stats::{collect_statistics, SimulationStatistics, WorldSnapshot};
use crate::simulation::tick::SimulationEvent;

pub struct Simulation {
    world: World,
    initial_rng: ChaCha8Rng,
    counts: Option<EntityCounts>,
}

impl Simulation {
    /// Simulation seeded from `config.seed`
    pub fn new(config: SimulationConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self::with_rng(config, rng)
    }

    /// Simulation drawing from an explicit random source
    pub fn with_rng(config: SimulationConfig, rng: ChaCha8Rng) -> Self {
        Self {
            world: World::with_rng(config, rng.clone()),
            initial_rng: rng,
            counts: None,
        }
    }

    /// Populate the world; counts are kept for `reset`
    pub fn setup(&mut self, counts: EntityCounts) -> Result<()> {
        self.world.config().validate()?;
        setup_world(&mut self.world, &counts)?;
        self.counts = Some(counts);
        Ok(())
    }

    pub fn step(&mut self) -> Vec<SimulationEvent> {
        self.world.step()
    }

    /// Run up to `steps` steps; returns how many actually ran
    pub fn run(&mut self, steps: usize) -> usize {
        let mut executed = 0;
        while executed < steps && !self.world.is_complete() {
            self.world.step();
            executed += 1;
        }
        executed
    }

    pub fn statistics(&self) -> SimulationStatistics {
        collect_statistics(&self.world)
    }

    pub fn is_complete(&self) -> bool {
        self.world.is_complete()
    }

    pub fn completion(&self) -> Option<&str> {
        self.world.completion()
    }

    /// Rebuild from the same config, random source and entity counts
    pub fn reset(&mut self) -> Result<()> {
        let config = self.world.config().clone();
        self.world = World::with_rng(config, self.initial_rng.clone());
        if let Some(counts) = self.counts {
            setup_world(&mut self.world, &counts)?;
        }
        tracing::info!("Simulation reset");
        Ok(())
    }

    /// Read-only access for rendering and observation
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable access for scripted setups
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot::capture(&self.world)
    }

    pub fn snapshot_json(&self) -> Result<String> {
        self.snapshot().to_json()
    }
}
