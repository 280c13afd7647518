use crate::algorithm::{
    a_star_search, apply_pareto_filter, build_reachability_graph, ReachabilityGraph,
    SearchOutcome, Solution,
};
use crate::common::PointsOfInterest;
use crate::config::Config;
use crate::map::{Map, MapError};
use crate::stat::Stats;

use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum SolveError {
    #[error(transparent)]
    Map(#[from] MapError),
    #[error("search gave up after expanding {expanded} and pushing {pushed} nodes")]
    SearchLimit { expanded: usize, pushed: usize },
}

pub trait Solver {
    /// `Ok(None)` means no order of moves collects every key.
    fn solve(&mut self, config: &Config) -> Result<Option<Solution>, SolveError>;
}

pub struct KeySolver {
    map: Map,
    points: PointsOfInterest,
    graph: Option<ReachabilityGraph>,
    stats: Stats,
}

impl KeySolver {
    pub fn new(map: &Map) -> Result<Self, MapError> {
        let points = PointsOfInterest::locate(map)?;
        Ok(KeySolver {
            map: map.clone(),
            points,
            graph: None,
            stats: Stats::default(),
        })
    }

    /// Filtered graph of the last `solve` call.
    pub fn graph(&self) -> Option<&ReachabilityGraph> {
        self.graph.as_ref()
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn describe_plan(&self, solution: &Solution) -> Vec<String> {
        solution
            .moves
            .iter()
            .map(|step| {
                format!(
                    "robot {} takes '{}' ({} steps)",
                    step.agent,
                    self.points.key_char(step.key),
                    step.distance
                )
            })
            .collect()
    }
}

impl Solver for KeySolver {
    fn solve(&mut self, config: &Config) -> Result<Option<Solution>, SolveError> {
        let total_solve_start_time = Instant::now();
        self.stats = Stats::default();

        let mut graph =
            build_reachability_graph(&self.map, &self.points, config.parallel, &mut self.stats);
        apply_pareto_filter(&mut graph, &mut self.stats);
        let outcome = a_star_search(
            &graph,
            config.heuristic,
            config.search_limits(),
            &mut self.stats,
        );
        self.graph = Some(graph);
        self.stats.time_us = total_solve_start_time.elapsed().as_micros() as usize;

        match outcome {
            SearchOutcome::Found(solution) => {
                self.stats.costs = Some(solution.cost);
                self.stats.print();
                Ok(Some(solution))
            }
            SearchOutcome::Unreachable => {
                self.stats.print();
                info!("no way to collect all {} keys", self.points.num_keys());
                Ok(None)
            }
            SearchOutcome::LimitReached { expanded, pushed } => {
                self.stats.print();
                debug!("stopped after {expanded} expansions and {pushed} pushes");
                Err(SolveError::SearchLimit { expanded, pushed })
            }
        }
    }
}

/// Minimum total steps to collect every key, `None` when that is impossible.
pub fn solve(map: &Map) -> Result<Option<usize>, SolveError> {
    let mut solver = KeySolver::new(map)?;
    let solution = solver.solve(&Config::default())?;
    Ok(solution.map(|solution| solution.cost))
}

/// Printable answer: the step count, or -1 when the keys cannot all be collected.
pub fn answer_code(answer: Option<usize>) -> i64 {
    answer.map_or(-1, |cost| cost as i64)
}
