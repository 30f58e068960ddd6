//! Target selection strategies
//!
//! Nearest-neighbour for single candidates, a weighted priority score for
//! knights choosing among detected hunters, and a cluster-assisted pick for
//! hunters that remember several treasures.

use std::f32::consts::TAU;

use rand::Rng;

use crate::core::config::TargetingConfig;
use crate::core::types::{EntityId, Metric, Position};
use crate::entity::hunter::HunterSkill;
use crate::spatial::torus::ToroidalGrid;

/// Candidate with minimum wrapped distance; ties go to the earlier candidate
pub fn nearest<T: Copy>(
    grid: &ToroidalGrid,
    from: Position,
    candidates: &[(T, Position)],
    metric: Metric,
) -> Option<(T, Position)> {
    let mut best: Option<((T, Position), f32)> = None;
    for &(item, pos) in candidates {
        let d = grid.distance(from, pos, metric);
        if best.as_ref().map_or(true, |(_, bd)| d < *bd) {
            best = Some(((item, pos), d));
        }
    }
    best.map(|(c, _)| c)
}

/// What a knight knows about a detected hunter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PursuitCandidate {
    pub hunter: EntityId,
    pub distance: f32,
    pub carrying: bool,
    pub stamina: f32,
    pub resting: bool,
}

pub fn priority_score(candidate: &PursuitCandidate, detection_radius: f32, weights: &TargetingConfig) -> f32 {
    let carrying = if candidate.carrying { 1.0 } else { 0.0 };
    let resting = if candidate.resting { 1.0 } else { 0.0 };
    weights.carrying_weight * carrying
        + weights.proximity_weight * (detection_radius - candidate.distance)
        + weights.fatigue_weight * (100.0 - candidate.stamina)
        + weights.resting_weight * resting
}

/// Highest-scoring candidate, with a random pick among exact ties
pub fn select_by_priority<R: Rng + ?Sized>(
    candidates: &[PursuitCandidate],
    detection_radius: f32,
    weights: &TargetingConfig,
    rng: &mut R,
) -> Option<EntityId> {
    let scores: Vec<f32> = candidates
        .iter()
        .map(|c| priority_score(c, detection_radius, weights))
        .collect();
    let best = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let tied: Vec<EntityId> = candidates
        .iter()
        .zip(&scores)
        .filter(|(_, s)| **s == best)
        .map(|(c, _)| c.hunter)
        .collect();

    match tied.len() {
        0 => None,
        1 => Some(tied[0]),
        n => Some(tied[rng.gen_range(0..n)]),
    }
}

/// Whether a hunter slips past one knight evaluation
pub fn stealth_evades<R: Rng + ?Sized>(skill: HunterSkill, evasion: f64, rng: &mut R) -> bool {
    skill == HunterSkill::Stealth && rng.gen_bool(evasion)
}

/// A spatial group of candidate indices with its centroid
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub members: Vec<usize>,
    pub centroid: (f32, f32),
}

/// Partition positions into at most `max_groups` spatial groups
///
/// Implementations must be deterministic and must place every input index in
/// exactly one group.
pub trait SpatialGrouping {
    fn group(&self, grid: &ToroidalGrid, points: &[Position], max_groups: usize) -> Vec<Group>;
}

/// Lloyd-style k-means on the torus with farthest-point seeding
#[derive(Debug, Clone, Copy)]
pub struct KMeansGrouping {
    pub max_iterations: usize,
}

impl Default for KMeansGrouping {
    fn default() -> Self {
        Self { max_iterations: 10 }
    }
}

impl SpatialGrouping for KMeansGrouping {
    fn group(&self, grid: &ToroidalGrid, points: &[Position], max_groups: usize) -> Vec<Group> {
        if points.is_empty() || max_groups == 0 {
            return Vec::new();
        }

        let mut distinct: Vec<Position> = Vec::new();
        for p in points {
            if !distinct.contains(p) {
                distinct.push(*p);
            }
        }
        let k = max_groups.min(distinct.len());

        // Seed with the first point, then repeatedly the farthest remaining one
        let mut centroids: Vec<(f32, f32)> = vec![as_f32(distinct[0])];
        while centroids.len() < k {
            let mut far = distinct[0];
            let mut far_d = -1.0;
            for p in &distinct {
                let d = centroids
                    .iter()
                    .map(|c| torus_distance(grid, *p, *c))
                    .fold(f32::INFINITY, f32::min);
                if d > far_d {
                    far = *p;
                    far_d = d;
                }
            }
            centroids.push(as_f32(far));
        }

        let mut assignment = vec![usize::MAX; points.len()];
        for _ in 0..self.max_iterations.max(1) {
            let next: Vec<usize> = points
                .iter()
                .map(|p| closest_centroid(grid, *p, &centroids))
                .collect();
            let changed = next != assignment;
            assignment = next;
            for (ci, centroid) in centroids.iter_mut().enumerate() {
                let members: Vec<Position> = points
                    .iter()
                    .zip(&assignment)
                    .filter(|(_, a)| **a == ci)
                    .map(|(p, _)| *p)
                    .collect();
                if !members.is_empty() {
                    *centroid = torus_centroid(grid, &members);
                }
            }
            if !changed {
                break;
            }
        }

        centroids
            .iter()
            .enumerate()
            .filter_map(|(ci, centroid)| {
                let members: Vec<usize> = (0..points.len()).filter(|&i| assignment[i] == ci).collect();
                (!members.is_empty()).then(|| Group {
                    members,
                    centroid: *centroid,
                })
            })
            .collect()
    }
}

/// Pick the group nearest the agent, then the nearest candidate inside it
pub fn select_cluster_assisted<T: Copy>(
    grid: &ToroidalGrid,
    from: Position,
    candidates: &[(T, Position)],
    grouping: &dyn SpatialGrouping,
    max_groups: usize,
) -> Option<(T, Position)> {
    if candidates.len() <= 1 {
        return candidates.first().copied();
    }
    let points: Vec<Position> = candidates.iter().map(|(_, p)| *p).collect();
    let groups = grouping.group(grid, &points, max_groups);

    let mut best: Option<(&Group, f32)> = None;
    for group in &groups {
        let d = torus_distance(grid, from, group.centroid);
        if best.map_or(true, |(_, bd)| d < bd) {
            best = Some((group, d));
        }
    }

    match best {
        Some((group, _)) => {
            let members: Vec<(T, Position)> = group.members.iter().map(|&i| candidates[i]).collect();
            nearest(grid, from, &members, Metric::Manhattan)
        }
        None => nearest(grid, from, candidates, Metric::Manhattan),
    }
}

/// Candidates farther than `radius` (Manhattan) from every threat
///
/// When every candidate is near a threat the full list comes back unchanged.
pub fn avoid_threats<T: Copy>(
    grid: &ToroidalGrid,
    candidates: &[(T, Position)],
    threats: &[Position],
    radius: i32,
) -> Vec<(T, Position)> {
    let safe: Vec<(T, Position)> = candidates
        .iter()
        .filter(|(_, p)| threats.iter().all(|t| grid.manhattan(*p, *t) > radius))
        .copied()
        .collect();
    if safe.is_empty() {
        candidates.to_vec()
    } else {
        safe
    }
}

/// Mean of coordinates on a circle of circumference `size`
pub fn circular_mean(values: &[i32], size: i32) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let size_f = size as f32;
    let (mut s, mut c) = (0.0f32, 0.0f32);
    for v in values {
        let angle = *v as f32 / size_f * TAU;
        s += angle.sin();
        c += angle.cos();
    }
    if s.abs() < 1e-6 && c.abs() < 1e-6 {
        return values[0] as f32;
    }
    let angle = s.atan2(c).rem_euclid(TAU);
    (angle / TAU * size_f).rem_euclid(size_f)
}

fn torus_centroid(grid: &ToroidalGrid, members: &[Position]) -> (f32, f32) {
    let xs: Vec<i32> = members.iter().map(|p| p.x).collect();
    let ys: Vec<i32> = members.iter().map(|p| p.y).collect();
    (circular_mean(&xs, grid.width()), circular_mean(&ys, grid.height()))
}

fn torus_distance(grid: &ToroidalGrid, p: Position, c: (f32, f32)) -> f32 {
    let axis = |a: f32, b: f32, size: f32| {
        let d = (a - b).abs().rem_euclid(size);
        d.min(size - d)
    };
    let dx = axis(p.x as f32, c.0, grid.width() as f32);
    let dy = axis(p.y as f32, c.1, grid.height() as f32);
    (dx * dx + dy * dy).sqrt()
}

fn closest_centroid(grid: &ToroidalGrid, p: Position, centroids: &[(f32, f32)]) -> usize {
    let mut best = 0;
    let mut best_d = f32::INFINITY;
    for (i, c) in centroids.iter().enumerate() {
        let d = torus_distance(grid, p, *c);
        if d < best_d {
            best = i;
            best_d = d;
        }
    }
    best
}

fn as_f32(p: Position) -> (f32, f32) {
    (p.x as f32, p.y as f32)
}
