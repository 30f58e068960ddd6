//! World - the explicit simulation context
//!
//! Owns the grid, the flat entity table, the random source and the tick
//! counter. Every subsystem receives the world by reference; nothing in the
//! crate keeps global state.

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::core::config::SimulationConfig;
use crate::core::error::{EldoriaError, Result};
use crate::core::types::{EntityId, Position, Tick};
use crate::entity::hunter::Hunter;
use crate::entity::kind::{Entity, EntityKind};
use crate::entity::knight::Knight;
use crate::entity::resource::{RESOURCE_MAX, RESOURCE_MIN};
use crate::entity::structures::{Garrison, Hideout};
use crate::entity::treasure::{Treasure, TreasureLocation};
use crate::simulation::interaction::{CapturePredictor, HeuristicPredictor};
use crate::simulation::stats::{AgentStatus, SimulationCounters};
use crate::simulation::tick::{run_simulation_tick, SimulationEvent};
use crate::spatial::torus::{Occupancy, ToroidalGrid};

/// The simulation world containing all entities
pub struct World {
    config: SimulationConfig,
    grid: ToroidalGrid,
    entities: BTreeMap<EntityId, Entity>,
    rng: ChaCha8Rng,
    current_tick: Tick,
    next_id: u32,
    predictor: Box<dyn CapturePredictor>,
    completion: Option<String>,
    pub counters: SimulationCounters,
}

impl World {
    /// Build an empty world seeded from `config.seed`
    pub fn new(config: SimulationConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self::with_rng(config, rng)
    }

    /// Build an empty world around an explicit random source
    pub fn with_rng(config: SimulationConfig, rng: ChaCha8Rng) -> Self {
        let grid = ToroidalGrid::new(config.grid.width.max(1), config.grid.height.max(1));
        Self {
            config,
            grid,
            entities: BTreeMap::new(),
            rng,
            current_tick: 0,
            next_id: 1,
            predictor: Box::new(HeuristicPredictor),
            completion: None,
            counters: SimulationCounters::default(),
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn grid(&self) -> &ToroidalGrid {
        &self.grid
    }

    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    pub fn current_tick(&self) -> Tick {
        self.current_tick
    }

    pub fn completion(&self) -> Option<&str> {
        self.completion.as_deref()
    }

    pub fn is_complete(&self) -> bool {
        self.completion.is_some()
    }

    pub(crate) fn set_completion(&mut self, reason: &str) {
        if self.completion.is_none() {
            self.completion = Some(reason.to_string());
        }
    }

    pub(crate) fn advance_tick(&mut self) {
        self.current_tick += 1;
    }

    /// Swap the capture outcome strategy
    pub fn set_capture_predictor(&mut self, predictor: Box<dyn CapturePredictor>) {
        self.predictor = predictor;
    }

    pub(crate) fn predictor_and_rng(&mut self) -> (&dyn CapturePredictor, &mut ChaCha8Rng) {
        (self.predictor.as_ref(), &mut self.rng)
    }

    /// Run one step of the simulation pipeline
    pub fn step(&mut self) -> Vec<SimulationEvent> {
        run_simulation_tick(self)
    }

    // ---------------------------------------------------------------------
    // Entity table
    // ---------------------------------------------------------------------

    /// All entities in ascending id order
    pub fn entities(&self) -> impl Iterator<Item = (EntityId, &Entity)> + '_ {
        self.entities.iter().map(|(id, e)| (*id, e))
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Ids of every entity of a kind, ascending
    pub fn ids_of_kind(&self, kind: EntityKind) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|(_, e)| e.kind() == kind)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn count_of_kind(&self, kind: EntityKind) -> usize {
        self.entities.values().filter(|e| e.kind() == kind).count()
    }

    pub fn treasure(&self, id: EntityId) -> Option<&Treasure> {
        self.entities.get(&id).and_then(Entity::as_treasure)
    }

    pub fn treasure_mut(&mut self, id: EntityId) -> Option<&mut Treasure> {
        self.entities.get_mut(&id).and_then(Entity::as_treasure_mut)
    }

    pub fn hunter(&self, id: EntityId) -> Option<&Hunter> {
        self.entities.get(&id).and_then(Entity::as_hunter)
    }

    pub fn hunter_mut(&mut self, id: EntityId) -> Option<&mut Hunter> {
        self.entities.get_mut(&id).and_then(Entity::as_hunter_mut)
    }

    pub fn knight(&self, id: EntityId) -> Option<&Knight> {
        self.entities.get(&id).and_then(Entity::as_knight)
    }

    pub fn knight_mut(&mut self, id: EntityId) -> Option<&mut Knight> {
        self.entities.get_mut(&id).and_then(Entity::as_knight_mut)
    }

    pub fn hideout(&self, id: EntityId) -> Option<&Hideout> {
        self.entities.get(&id).and_then(Entity::as_hideout)
    }

    pub fn hideout_mut(&mut self, id: EntityId) -> Option<&mut Hideout> {
        self.entities.get_mut(&id).and_then(Entity::as_hideout_mut)
    }

    pub fn garrison(&self, id: EntityId) -> Option<&Garrison> {
        self.entities.get(&id).and_then(Entity::as_garrison)
    }

    pub fn garrison_mut(&mut self, id: EntityId) -> Option<&mut Garrison> {
        self.entities.get_mut(&id).and_then(Entity::as_garrison_mut)
    }

    // ---------------------------------------------------------------------
    // Spatial lookups (the grid is the only place positions live)
    // ---------------------------------------------------------------------

    pub fn position_of(&self, id: EntityId) -> Option<Position> {
        self.grid.position_of(id)
    }

    pub fn occupants_at(&self, pos: Position) -> &[Occupancy] {
        self.grid.occupants(pos)
    }

    pub fn owner_at(&self, pos: Position) -> Option<Occupancy> {
        self.grid.owner(pos)
    }

    /// Structure standing on a cell, if any
    pub fn structure_at(&self, pos: Position) -> Option<Occupancy> {
        self.grid
            .occupants(pos)
            .iter()
            .find(|o| o.kind.is_structure())
            .copied()
    }

    /// Uniformly random empty cell, drawn from the world's random source
    pub fn random_empty_cell(&mut self) -> Option<Position> {
        let mut empty = Vec::new();
        for y in 0..self.grid.height() {
            for x in 0..self.grid.width() {
                let pos = Position::new(x, y);
                if self.grid.is_empty_cell(pos) {
                    empty.push(pos);
                }
            }
        }
        if empty.is_empty() {
            return None;
        }
        let idx = self.rng.gen_range(0..empty.len());
        Some(empty[idx])
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    /// Add an entity, placing it at `pos` if it occupies a cell
    pub fn spawn(&mut self, entity: Entity, pos: Position) -> Result<EntityId> {
        let kind = entity.kind();
        let id = EntityId(self.next_id);
        if entity.occupies_cell() {
            self.grid.add(id, kind, pos)?;
        }
        self.next_id += 1;
        self.entities.insert(id, entity);
        Ok(id)
    }

    pub fn spawn_treasure(&mut self, treasure: Treasure, pos: Position) -> Result<EntityId> {
        self.spawn(Entity::Treasure(treasure), pos)
    }

    /// Spawn a hunter; inside a hideout it becomes a resident
    pub fn spawn_hunter(&mut self, hunter: Hunter, pos: Position) -> Result<EntityId> {
        let pos = self.grid.wrap_pos(pos);
        self.check_admission(pos, EntityKind::Hunter)?;
        let id = self.spawn(Entity::Hunter(hunter), pos)?;
        self.enter_structure(id, pos);
        Ok(id)
    }

    /// Spawn a knight; inside a garrison it becomes a resident
    pub fn spawn_knight(&mut self, knight: Knight, pos: Position) -> Result<EntityId> {
        let pos = self.grid.wrap_pos(pos);
        self.check_admission(pos, EntityKind::Knight)?;
        let id = self.spawn(Entity::Knight(knight), pos)?;
        self.enter_structure(id, pos);
        Ok(id)
    }

    fn check_admission(&self, pos: Position, kind: EntityKind) -> Result<()> {
        let Some(structure) = self.structure_at(pos) else {
            return Ok(());
        };
        if !structure.kind.shelters(kind) {
            return Ok(());
        }
        let (full, capacity) = match self.entities.get(&structure.id) {
            Some(Entity::Hideout(h)) => (h.is_full(), h.capacity),
            Some(Entity::Garrison(g)) => (g.is_full(), g.capacity),
            _ => (false, 0),
        };
        if full {
            return Err(EldoriaError::CapacityExceeded {
                structure: structure.id,
                capacity,
            });
        }
        Ok(())
    }

    pub fn spawn_hideout(&mut self, pos: Position) -> Result<EntityId> {
        self.check_structure_cell(pos)?;
        let hideout = Hideout::new(&self.config);
        self.spawn(Entity::Hideout(hideout), pos)
    }

    pub fn spawn_garrison(&mut self, pos: Position) -> Result<EntityId> {
        self.check_structure_cell(pos)?;
        let garrison = Garrison::new(&self.config);
        self.spawn(Entity::Garrison(garrison), pos)
    }

    fn check_structure_cell(&self, pos: Position) -> Result<()> {
        if self.grid.is_empty_cell(pos) {
            Ok(())
        } else {
            Err(EldoriaError::InvalidPlacement {
                position: self.grid.wrap_pos(pos),
                reason: "structures need an empty cell".into(),
            })
        }
    }

    /// Remove an entity from the table and the grid
    pub fn despawn(&mut self, id: EntityId) -> Option<Entity> {
        self.grid.remove(id);
        let entity = self.entities.remove(&id)?;
        for structure in self.entities.values_mut() {
            match structure {
                Entity::Hideout(h) => {
                    h.release(id);
                }
                Entity::Garrison(g) => {
                    g.release(id);
                }
                _ => {}
            }
        }
        Some(entity)
    }

    /// Put an off-grid entity back on the grid
    pub(crate) fn place(&mut self, id: EntityId, pos: Position) -> Result<Position> {
        let kind = self
            .entities
            .get(&id)
            .map(Entity::kind)
            .ok_or(EldoriaError::EntityNotFound(id))?;
        self.grid.add(id, kind, pos)
    }

    pub(crate) fn lift(&mut self, id: EntityId) -> Option<Position> {
        self.grid.remove(id)
    }

    /// Move an agent one cell, keeping structure residency in step
    ///
    /// Entering a structure requires admission; a full structure turns the
    /// move into a rejected one. Returns false if nothing moved.
    pub fn move_agent(&mut self, id: EntityId, to: Position) -> bool {
        let Some(from) = self.grid.position_of(id) else {
            return false;
        };
        let to = self.grid.wrap_pos(to);
        if from == to {
            return false;
        }

        let Some(kind) = self.grid.kind_of(id) else {
            return false;
        };
        if !self.grid.can_enter(to, kind) {
            return false;
        }
        if let Some(structure) = self.structure_at(to) {
            if structure.kind.shelters(kind) && !self.admit(structure.id, id) {
                return false;
            }
        }
        if !self.grid.move_entity(id, to) {
            return false;
        }
        if let Some(structure) = self.structure_at(from) {
            self.release(structure.id, id);
        }
        true
    }

    fn enter_structure(&mut self, id: EntityId, pos: Position) {
        if let Some(structure) = self.structure_at(pos) {
            let kind = self.grid.kind_of(id);
            if kind.is_some_and(|k| structure.kind.shelters(k)) && !self.admit(structure.id, id) {
                tracing::warn!("{} placed in full structure {}", id, structure.id);
            }
        }
    }

    fn admit(&mut self, structure: EntityId, who: EntityId) -> bool {
        let admitted = match self.entities.get_mut(&structure) {
            Some(Entity::Hideout(h)) => h.admit(structure, who),
            Some(Entity::Garrison(g)) => g.admit(structure, who),
            _ => return false,
        };
        match admitted {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!("{} turned away: {}", who, err);
                false
            }
        }
    }

    fn release(&mut self, structure: EntityId, who: EntityId) {
        match self.entities.get_mut(&structure) {
            Some(Entity::Hideout(h)) => {
                h.release(who);
            }
            Some(Entity::Garrison(g)) => {
                g.release(who);
            }
            _ => {}
        }
    }

    // ---------------------------------------------------------------------
    // Observation
    // ---------------------------------------------------------------------

    /// Resource and state snapshot for a hunter or knight
    pub fn agent_status(&self, id: EntityId) -> Option<AgentStatus> {
        let position = self.position_of(id);
        match self.entities.get(&id)? {
            Entity::Hunter(h) => Some(AgentStatus {
                id,
                kind: EntityKind::Hunter,
                position,
                resource: h.stamina.value(),
                resource_state: h.stamina.state(),
                state: format!("{:?}", h.state),
                carrying: h.carrying,
            }),
            Entity::Knight(k) => Some(AgentStatus {
                id,
                kind: EntityKind::Knight,
                position,
                resource: k.energy.value(),
                resource_state: k.energy.state(),
                state: format!("{:?}", k.state),
                carrying: None,
            }),
            _ => None,
        }
    }

    /// Cross-check the grid, the entity table and structure residency
    pub fn check_invariants(&self) -> Result<()> {
        self.grid.check_consistency()?;
        let fail = |msg: String| Err(EldoriaError::InvariantViolation(msg));

        for (&id, entity) in &self.entities {
            let placed = self.grid.kind_of(id);
            if entity.occupies_cell() != placed.is_some() {
                return fail(format!("{} occupies_cell={} but placed={:?}", id, entity.occupies_cell(), placed));
            }
            if let Some(kind) = placed {
                if kind != entity.kind() {
                    return fail(format!("{} is {:?} but indexed as {:?}", id, entity.kind(), kind));
                }
            }

            match entity {
                Entity::Treasure(t) => {
                    if let TreasureLocation::CarriedBy(hunter) = t.location {
                        if self.hunter(hunter).and_then(|h| h.carrying) != Some(id) {
                            return fail(format!("{} claims carrier {} which does not hold it", id, hunter));
                        }
                    }
                }
                Entity::Hunter(h) => {
                    let v = h.stamina.value();
                    if !(RESOURCE_MIN..=RESOURCE_MAX).contains(&v) {
                        return fail(format!("{} stamina {} out of range", id, v));
                    }
                    if let Some(t) = h.carrying {
                        if self.treasure(t).and_then(Treasure::carrier) != Some(id) {
                            return fail(format!("{} carries {} which is not marked as carried", id, t));
                        }
                    }
                }
                Entity::Knight(k) => {
                    let v = k.energy.value();
                    if !(RESOURCE_MIN..=RESOURCE_MAX).contains(&v) {
                        return fail(format!("{} energy {} out of range", id, v));
                    }
                }
                Entity::Hideout(h) => {
                    self.check_residents(id, &h.residents, h.capacity, EntityKind::Hunter)?;
                }
                Entity::Garrison(g) => {
                    self.check_residents(id, &g.residents, g.capacity, EntityKind::Knight)?;
                }
            }
        }
        Ok(())
    }

    fn check_residents(&self, id: EntityId, residents: &[EntityId], capacity: usize, kind: EntityKind) -> Result<()> {
        if residents.len() > capacity {
            return Err(EldoriaError::InvariantViolation(format!(
                "{} holds {} residents over capacity {}",
                id,
                residents.len(),
                capacity
            )));
        }
        let home = self.position_of(id);
        for r in residents {
            if self.grid.kind_of(*r) != Some(kind) || self.position_of(*r) != home {
                return Err(EldoriaError::InvariantViolation(format!(
                    "{} lists resident {} which is not inside it",
                    id, r
                )));
            }
        }
        if let Some(home) = home {
            for occ in self.grid.occupants(home) {
                if occ.kind == kind && !residents.contains(&occ.id) {
                    return Err(EldoriaError::InvariantViolation(format!(
                        "{} stands in {} without being admitted",
                        occ.id, id
                    )));
                }
            }
        }
        Ok(())
    }
}
