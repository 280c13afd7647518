mod astar;
mod pareto;
mod reachability;

pub use astar::{a_star_search, Heuristic, Move, SearchLimits, SearchOutcome, Solution};
pub use pareto::{apply_pareto_filter, pareto_front};
pub use reachability::build_reachability_graph;

use crate::common::{Variant, NUM_AGENTS};

/// Compressed maze: walking variants between every ordered pair of points of interest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReachabilityGraph {
    num_keys: usize,
    // edges[source][target], empty when unreachable or source == target.
    edges: Vec<Vec<Vec<Variant>>>,
}

impl ReachabilityGraph {
    pub fn new(num_points: usize) -> Self {
        ReachabilityGraph {
            num_keys: num_points.saturating_sub(NUM_AGENTS),
            edges: vec![vec![Vec::new(); num_points]; num_points],
        }
    }

    pub fn num_points(&self) -> usize {
        self.edges.len()
    }

    pub fn num_keys(&self) -> usize {
        self.num_keys
    }

    pub fn variants(&self, source: usize, target: usize) -> &[Variant] {
        &self.edges[source][target]
    }

    pub(crate) fn variants_mut(&mut self, source: usize, target: usize) -> &mut Vec<Variant> {
        &mut self.edges[source][target]
    }

    pub(crate) fn set_row(&mut self, source: usize, row: Vec<Vec<Variant>>) {
        self.edges[source] = row;
    }

    /// Variants leading from `source` into key rank `key`.
    pub fn key_variants(&self, source: usize, key: usize) -> &[Variant] {
        self.variants(source, NUM_AGENTS + key)
    }

    /// Shortest distance of any variant in the graph, 0 when there are no edges.
    pub fn min_edge_distance(&self) -> usize {
        self.edges
            .iter()
            .flatten()
            .flatten()
            .map(|variant| variant.distance)
            .min()
            .unwrap_or(0)
    }

    /// Shortest distance from `source` to `target` ignoring doors.
    pub fn min_distance(&self, source: usize, target: usize) -> Option<usize> {
        self.edges[source][target]
            .iter()
            .map(|variant| variant.distance)
            .min()
    }
}
