//! A* pathfinding over the wraparound grid
//!
//! Cells are traversable unless one of their occupants has a kind outside the
//! caller's allow-list. The goal cell is always accepted; whether the mover may
//! actually enter it is the grid's decision at move time.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ahash::{AHashMap, AHashSet};
use ordered_float::OrderedFloat;

use crate::core::types::{Metric, Position};
use crate::entity::kind::EntityKind;
use crate::spatial::torus::ToroidalGrid;

/// Node in the A* open set
#[derive(Debug, Clone)]
struct PathNode {
    pos: Position,
    f_cost: OrderedFloat<f32>,
    seq: u64,
}

impl PartialEq for PathNode {
    fn eq(&self, other: &Self) -> bool {
        self.f_cost == other.f_cost && self.seq == other.seq
    }
}

impl Eq for PathNode {}

impl Ord for PathNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap; earlier insertions win ties
        other
            .f_cost
            .cmp(&self.f_cost)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for PathNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Whether every occupant of `pos` has an allowed kind
pub fn is_traversable(grid: &ToroidalGrid, pos: Position, allow: &[EntityKind]) -> bool {
    grid.occupants(pos).iter().all(|o| allow.contains(&o.kind))
}

/// Find a path using A*
///
/// The returned cells run from the step after `start` up to and including
/// `goal`. An empty path means no route exists (or `start == goal`).
pub fn find_path(
    grid: &ToroidalGrid,
    start: Position,
    goal: Position,
    allow: &[EntityKind],
) -> Vec<Position> {
    let start = grid.wrap_pos(start);
    let goal = grid.wrap_pos(goal);
    if start == goal {
        return Vec::new();
    }

    let mut open_set = BinaryHeap::new();
    let mut came_from: AHashMap<Position, Position> = AHashMap::new();
    let mut g_scores: AHashMap<Position, f32> = AHashMap::new();
    let mut closed: AHashSet<Position> = AHashSet::new();
    let mut seq = 0u64;

    g_scores.insert(start, 0.0);
    open_set.push(PathNode {
        pos: start,
        f_cost: OrderedFloat(grid.distance(start, goal, Metric::Euclidean)),
        seq,
    });

    while let Some(current) = open_set.pop() {
        if current.pos == goal {
            return reconstruct_path(&came_from, start, goal);
        }
        if !closed.insert(current.pos) {
            continue;
        }

        let current_g = *g_scores.get(&current.pos).unwrap_or(&f32::INFINITY);

        for neighbor in grid.orthogonal_neighbors(current.pos) {
            if closed.contains(&neighbor) {
                continue;
            }
            if neighbor != goal && !is_traversable(grid, neighbor, allow) {
                continue;
            }

            let tentative_g = current_g + 1.0;
            let neighbor_g = *g_scores.get(&neighbor).unwrap_or(&f32::INFINITY);

            if tentative_g < neighbor_g {
                came_from.insert(neighbor, current.pos);
                g_scores.insert(neighbor, tentative_g);

                seq += 1;
                let f_cost = tentative_g + grid.distance(neighbor, goal, Metric::Euclidean);
                open_set.push(PathNode {
                    pos: neighbor,
                    f_cost: OrderedFloat(f_cost),
                    seq,
                });
            }
        }
    }

    Vec::new()
}

/// Reconstruct path from came_from map, excluding the start cell
fn reconstruct_path(
    came_from: &AHashMap<Position, Position>,
    start: Position,
    mut current: Position,
) -> Vec<Position> {
    let mut path = vec![current];
    while let Some(&prev) = came_from.get(&current) {
        if prev == start {
            break;
        }
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

/// Single wrapped steps that close the distance to `to`, best first
///
/// The axis with the larger remaining delta comes first; on a tie the y axis
/// is preferred.
pub fn greedy_steps(grid: &ToroidalGrid, from: Position, to: Position) -> Vec<Position> {
    let (dx, dy) = grid.signed_delta(from, to);
    let x_step = (dx != 0).then(|| grid.wrap(from.x + dx.signum(), from.y));
    let y_step = (dy != 0).then(|| grid.wrap(from.x, from.y + dy.signum()));

    let ordered = if dx.abs() > dy.abs() {
        [x_step, y_step]
    } else {
        [y_step, x_step]
    };
    ordered.into_iter().flatten().collect()
}

/// Movement policy: a greedy step at short range, full search otherwise
///
/// Returns `None` when already at the target or when neither strategy finds a
/// traversable first step.
pub fn next_step(
    grid: &ToroidalGrid,
    from: Position,
    to: Position,
    allow: &[EntityKind],
    greedy_range: i32,
) -> Option<Position> {
    let to = grid.wrap_pos(to);
    if grid.wrap_pos(from) == to {
        return None;
    }

    if grid.manhattan(from, to) <= greedy_range {
        let greedy = greedy_steps(grid, from, to)
            .into_iter()
            .find(|&cell| cell == to || is_traversable(grid, cell, allow));
        if greedy.is_some() {
            return greedy;
        }
    }

    find_path(grid, from, to, allow).first().copied()
}
