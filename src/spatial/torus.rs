//! Wraparound occupancy grid
//!
//! The grid is the single source of truth for where every placed entity is.
//! Cells can hold several occupants (a hunter standing in a hideout, a knight
//! on top of the hunter it is capturing); whether an entity may join a cell is
//! decided by the occupants' kinds.

use ahash::AHashMap;

use crate::core::error::{EldoriaError, Result};
use crate::core::types::{EntityId, Metric, Position};
use crate::entity::kind::EntityKind;

/// One entry in a cell's occupant list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occupancy {
    pub id: EntityId,
    pub kind: EntityKind,
}

/// Which neighbours `neighbors` enumerates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeighborKind {
    Orthogonal,
    Diagonal,
    All,
}

/// The four orthogonal unit steps, in a fixed order
pub const ORTHOGONAL_STEPS: [(i32, i32); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];

/// Toroidal grid with O(1) occupancy lookups
#[derive(Debug, Clone)]
pub struct ToroidalGrid {
    width: i32,
    height: i32,
    cells: AHashMap<Position, Vec<Occupancy>>,
    index: AHashMap<EntityId, (Position, EntityKind)>,
}

impl ToroidalGrid {
    pub fn new(width: i32, height: i32) -> Self {
        assert!(width > 0 && height > 0, "grid must be non-empty");
        Self {
            width,
            height,
            cells: AHashMap::new(),
            index: AHashMap::new(),
        }
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Normalize coordinates into `[0, width) x [0, height)`
    #[inline]
    pub fn wrap(&self, x: i32, y: i32) -> Position {
        Position::new(x.rem_euclid(self.width), y.rem_euclid(self.height))
    }

    #[inline]
    pub fn wrap_pos(&self, pos: Position) -> Position {
        self.wrap(pos.x, pos.y)
    }

    /// Shortest signed per-axis delta from `a` to `b`
    ///
    /// Each component lies in `(-size/2, size/2]`.
    pub fn signed_delta(&self, a: Position, b: Position) -> (i32, i32) {
        (
            shortest_signed(b.x - a.x, self.width),
            shortest_signed(b.y - a.y, self.height),
        )
    }

    /// Per-axis minimum of the direct and wraparound deltas
    #[inline]
    pub fn axis_deltas(&self, a: Position, b: Position) -> (i32, i32) {
        let dx = (a.x - b.x).rem_euclid(self.width);
        let dy = (a.y - b.y).rem_euclid(self.height);
        (dx.min(self.width - dx), dy.min(self.height - dy))
    }

    pub fn distance(&self, a: Position, b: Position, metric: Metric) -> f32 {
        let (dx, dy) = self.axis_deltas(a, b);
        match metric {
            Metric::Euclidean => ((dx * dx + dy * dy) as f32).sqrt(),
            Metric::Manhattan => (dx + dy) as f32,
        }
    }

    #[inline]
    pub fn manhattan(&self, a: Position, b: Position) -> i32 {
        let (dx, dy) = self.axis_deltas(a, b);
        dx + dy
    }

    /// Largest distance any two cells can be apart (the wrapped half-diagonal)
    pub fn max_distance(&self, metric: Metric) -> f32 {
        let hx = self.width / 2;
        let hy = self.height / 2;
        match metric {
            Metric::Euclidean => ((hx * hx + hy * hy) as f32).sqrt(),
            Metric::Manhattan => (hx + hy) as f32,
        }
    }

    /// Cells around `pos` within `radius` steps per axis, excluding `pos`
    ///
    /// On small grids several offsets can wrap onto the same cell; each cell
    /// is reported once, in order of first discovery.
    pub fn neighbors(&self, pos: Position, radius: i32, kind: NeighborKind) -> Vec<Position> {
        let origin = self.wrap_pos(pos);
        let mut out = Vec::new();
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let keep = match kind {
                    NeighborKind::Orthogonal => dx == 0 || dy == 0,
                    NeighborKind::Diagonal => dx.abs() == dy.abs(),
                    NeighborKind::All => true,
                };
                if !keep {
                    continue;
                }
                let cell = self.wrap(origin.x + dx, origin.y + dy);
                if cell != origin && !out.contains(&cell) {
                    out.push(cell);
                }
            }
        }
        out
    }

    /// The four orthogonally adjacent cells, in `ORTHOGONAL_STEPS` order
    pub fn orthogonal_neighbors(&self, pos: Position) -> [Position; 4] {
        ORTHOGONAL_STEPS.map(|(dx, dy)| self.wrap(pos.x + dx, pos.y + dy))
    }

    /// All cells within a Manhattan radius, including `pos` itself
    pub fn cells_within(&self, pos: Position, radius: i32) -> Vec<Position> {
        let mut cells = vec![self.wrap_pos(pos)];
        for cell in self.neighbors(pos, radius, NeighborKind::All) {
            if self.manhattan(pos, cell) <= radius {
                cells.push(cell);
            }
        }
        cells
    }

    pub fn occupants(&self, pos: Position) -> &[Occupancy] {
        self.cells
            .get(&self.wrap_pos(pos))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The occupant that owns a cell for collision purposes
    ///
    /// A structure always owns its cell; otherwise the earliest arrival does.
    pub fn owner(&self, pos: Position) -> Option<Occupancy> {
        let occupants = self.occupants(pos);
        occupants
            .iter()
            .find(|o| o.kind.is_structure())
            .or_else(|| occupants.first())
            .copied()
    }

    pub fn is_empty_cell(&self, pos: Position) -> bool {
        self.occupants(pos).is_empty()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn position_of(&self, id: EntityId) -> Option<Position> {
        self.index.get(&id).map(|(pos, _)| *pos)
    }

    pub fn kind_of(&self, id: EntityId) -> Option<EntityKind> {
        self.index.get(&id).map(|(_, kind)| *kind)
    }

    pub fn first_of_kind(&self, pos: Position, kind: EntityKind) -> Option<EntityId> {
        self.occupants(pos)
            .iter()
            .find(|o| o.kind == kind)
            .map(|o| o.id)
    }

    /// Number of placed entities
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Whether an entity of kind `mover` may join the occupants at `pos`
    pub fn can_enter(&self, pos: Position, mover: EntityKind) -> bool {
        let occupants = self.occupants(pos);
        let sheltered = occupants.iter().any(|o| o.kind.shelters(mover));
        occupants
            .iter()
            .all(|o| o.kind.is_passable_for(mover) || (sheltered && o.kind == mover))
    }

    /// Place an entity that is not yet on the grid
    pub fn add(&mut self, id: EntityId, kind: EntityKind, pos: Position) -> Result<Position> {
        if self.index.contains_key(&id) {
            return Err(EldoriaError::InvariantViolation(format!(
                "{} is already placed at {:?}",
                id,
                self.position_of(id)
            )));
        }
        let pos = self.wrap_pos(pos);
        if !self.can_enter(pos, kind) {
            return Err(EldoriaError::InvalidPlacement {
                position: pos,
                reason: format!("{:?} cannot share a cell with {:?}", kind, self.occupants(pos)),
            });
        }
        self.cells.entry(pos).or_default().push(Occupancy { id, kind });
        self.index.insert(id, (pos, kind));
        Ok(pos)
    }

    /// Take an entity off the grid, returning where it was
    pub fn remove(&mut self, id: EntityId) -> Option<Position> {
        let (pos, _) = self.index.remove(&id)?;
        if let Some(cell) = self.cells.get_mut(&pos) {
            cell.retain(|o| o.id != id);
            if cell.is_empty() {
                self.cells.remove(&pos);
            }
        }
        Some(pos)
    }

    /// Move a placed entity
    ///
    /// Returns false without mutating anything when the entity is not placed
    /// or the destination holds an incompatible occupant.
    pub fn move_entity(&mut self, id: EntityId, to: Position) -> bool {
        let Some(&(from, kind)) = self.index.get(&id) else {
            return false;
        };
        let to = self.wrap_pos(to);
        if from == to {
            return true;
        }
        if !self.can_enter(to, kind) {
            return false;
        }
        if let Some(cell) = self.cells.get_mut(&from) {
            cell.retain(|o| o.id != id);
            if cell.is_empty() {
                self.cells.remove(&from);
            }
        }
        self.cells.entry(to).or_default().push(Occupancy { id, kind });
        self.index.insert(id, (to, kind));
        true
    }

    /// Cross-check the cell lists against the id index
    pub fn check_consistency(&self) -> Result<()> {
        let mut seen = 0usize;
        for (pos, cell) in &self.cells {
            if cell.is_empty() {
                return Err(EldoriaError::InvariantViolation(format!("empty cell list kept at {}", pos)));
            }
            let structures = cell.iter().filter(|o| o.kind.is_structure()).count();
            if structures > 1 {
                return Err(EldoriaError::InvariantViolation(format!(
                    "{} structures share cell {}",
                    structures, pos
                )));
            }
            for occ in cell {
                match self.index.get(&occ.id) {
                    Some((p, k)) if p == pos && *k == occ.kind => seen += 1,
                    other => {
                        return Err(EldoriaError::InvariantViolation(format!(
                            "{} listed at {} but indexed at {:?}",
                            occ.id, pos, other
                        )))
                    }
                }
            }
        }
        if seen != self.index.len() {
            return Err(EldoriaError::InvariantViolation(format!(
                "{} cell entries for {} indexed entities",
                seen,
                self.index.len()
            )));
        }
        Ok(())
    }
}

fn shortest_signed(delta: i32, size: i32) -> i32 {
    let d = delta.rem_euclid(size);
    if d > size / 2 {
        d - size
    } else {
        d
    }
}
