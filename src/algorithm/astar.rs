use super::ReachabilityGraph;
use crate::common::{full_mask, State, NUM_AGENTS};
use crate::stat::Stats;

use clap::ValueEnum;
use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use tracing::{debug, instrument, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Heuristic {
    /// Remaining keys times the shortest edge of the whole graph.
    #[default]
    MinEdge,
    /// Sum over remaining keys of the shortest way in from a robot or another remaining key.
    NearestSource,
}

/// One robot walking to one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub agent: usize,
    pub key: usize,
    pub distance: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    pub cost: usize,
    pub moves: Vec<Move>,
}

impl Solution {
    /// Replays the plan on `graph`: every move must follow an open variant and the
    /// distances must add up to `cost`.
    pub fn verify(&self, graph: &ReachabilityGraph) -> bool {
        let mut state = State::initial();
        let mut total = 0;

        for step in &self.moves {
            if step.agent >= NUM_AGENTS || step.key >= graph.num_keys() || state.has_key(step.key)
            {
                return false;
            }
            let from = state.agents[step.agent];
            let legal = graph
                .key_variants(from, step.key)
                .iter()
                .any(|variant| variant.distance == step.distance && variant.is_open_with(state.keys));
            if !legal {
                return false;
            }
            total += step.distance;
            state = state.move_agent(step.agent, step.key);
        }

        state.keys == full_mask(graph.num_keys()) && total == self.cost
    }
}

/// Bounds on a single search, `None` leaves that side unbounded.
///
/// Every push adds at most one open-list entry and one best-cost entry, so
/// `max_pushes` caps the memory the search can hold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchLimits {
    pub max_expansions: Option<usize>,
    pub max_pushes: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Found(Solution),
    Unreachable,
    LimitReached { expanded: usize, pushed: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct OpenNode {
    f_cost: usize,
    g_cost: usize,
    state: State,
}

// Lower f first; on ties, deeper nodes (higher g) first.
impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f_cost
            .cmp(&self.f_cost)
            .then_with(|| self.g_cost.cmp(&other.g_cost))
            .then_with(|| other.state.cmp(&self.state))
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

struct Estimator {
    heuristic: Heuristic,
    num_keys: usize,
    min_edge: usize,
    // min_into[point][key]: shortest variant from point into key, ignoring doors.
    min_into: Vec<Vec<Option<usize>>>,
}

impl Estimator {
    fn new(graph: &ReachabilityGraph, heuristic: Heuristic) -> Self {
        let num_keys = graph.num_keys();
        let min_into = (0..graph.num_points())
            .map(|point| {
                (0..num_keys)
                    .map(|key| graph.min_distance(point, NUM_AGENTS + key))
                    .collect()
            })
            .collect();

        Estimator {
            heuristic,
            num_keys,
            min_edge: graph.min_edge_distance(),
            min_into,
        }
    }

    /// Lower bound on the cost still to pay, `None` when some remaining key can
    /// no longer be entered from anywhere.
    fn estimate(&self, state: &State) -> Option<usize> {
        let remaining = self.num_keys - state.collected();
        match self.heuristic {
            Heuristic::MinEdge => Some(remaining * self.min_edge),
            Heuristic::NearestSource => {
                let mut total = 0;
                for key in (0..self.num_keys).filter(|&key| !state.has_key(key)) {
                    let from_agents = state.agents.iter().map(|&point| self.min_into[point][key]);
                    let from_keys = (0..self.num_keys)
                        .filter(|&other| other != key && !state.has_key(other))
                        .map(|other| self.min_into[NUM_AGENTS + other][key]);
                    total += from_agents.chain(from_keys).flatten().min()?;
                }
                Some(total)
            }
        }
    }
}

// Best known g cost of each state and the move that achieved it.
type BestCost = HashMap<State, (usize, Option<(State, Move)>)>;

fn construct_plan(best_cost: &BestCost, mut current: State) -> Vec<Move> {
    let mut moves = Vec::new();
    while let Some(&(_, Some((previous, step)))) = best_cost.get(&current) {
        moves.push(step);
        current = previous;
    }
    moves.reverse();
    moves
}

/// Best-first search over (robot positions, collected keys) for the cheapest
/// order that collects every key.
#[instrument(skip_all, name = "a_star", fields(keys = graph.num_keys(), heuristic = ?heuristic), level = "debug")]
pub fn a_star_search(
    graph: &ReachabilityGraph,
    heuristic: Heuristic,
    limits: SearchLimits,
    stats: &mut Stats,
) -> SearchOutcome {
    let num_keys = graph.num_keys();
    let goal_keys = full_mask(num_keys);
    let estimator = Estimator::new(graph, heuristic);

    let mut open_list = BinaryHeap::new();
    let mut best_cost = BestCost::new();

    let start = State::initial();
    let Some(start_h_cost) = estimator.estimate(&start) else {
        debug!("some key has no way in at all");
        return SearchOutcome::Unreachable;
    };
    best_cost.insert(start, (0, None));
    open_list.push(OpenNode {
        f_cost: start_h_cost,
        g_cost: 0,
        state: start,
    });

    while let Some(current) = open_list.pop() {
        if current.g_cost > g_cost_of(&best_cost, &current.state) {
            stats.a_star_stale_nodes += 1;
            continue;
        }

        if current.state.keys == goal_keys {
            debug!("goal reached with cost {}", current.g_cost);
            return SearchOutcome::Found(Solution {
                cost: current.g_cost,
                moves: construct_plan(&best_cost, current.state),
            });
        }

        if limits
            .max_expansions
            .is_some_and(|limit| stats.a_star_expand_nodes >= limit)
        {
            debug!("expansion limit reached");
            return limit_reached(stats);
        }

        trace!("expand node: {current:?}");
        stats.a_star_expand_nodes += 1;

        for (agent, &from) in current.state.agents.iter().enumerate() {
            for key in (0..num_keys).filter(|&key| !current.state.has_key(key)) {
                let Some(distance) = graph
                    .key_variants(from, key)
                    .iter()
                    .filter(|variant| variant.is_open_with(current.state.keys))
                    .map(|variant| variant.distance)
                    .min()
                else {
                    continue;
                };

                let next = current.state.move_agent(agent, key);
                let tentative_g_cost = current.g_cost + distance;
                if tentative_g_cost >= g_cost_of(&best_cost, &next) {
                    continue;
                }
                let Some(h_cost) = estimator.estimate(&next) else {
                    continue;
                };
                if limits
                    .max_pushes
                    .is_some_and(|limit| stats.a_star_push_nodes >= limit)
                {
                    debug!("push limit reached");
                    return limit_reached(stats);
                }

                let step = Move {
                    agent,
                    key,
                    distance,
                };
                best_cost.insert(next, (tentative_g_cost, Some((current.state, step))));
                open_list.push(OpenNode {
                    f_cost: tentative_g_cost + h_cost,
                    g_cost: tentative_g_cost,
                    state: next,
                });
                stats.a_star_push_nodes += 1;
            }
        }
    }

    debug!("cannot collect every key");
    SearchOutcome::Unreachable
}

fn g_cost_of(best_cost: &BestCost, state: &State) -> usize {
    best_cost.get(state).map_or(usize::MAX, |&(g_cost, _)| g_cost)
}

fn limit_reached(stats: &Stats) -> SearchOutcome {
    SearchOutcome::LimitReached {
        expanded: stats.a_star_expand_nodes,
        pushed: stats.a_star_push_nodes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::{apply_pareto_filter, build_reachability_graph};
    use crate::common::PointsOfInterest;
    use crate::map::Map;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt().with_env_filter("debug").try_init();
    }

    fn compressed(text: &str) -> ReachabilityGraph {
        let map: Map = text.parse().unwrap();
        let points = PointsOfInterest::locate(&map).unwrap();
        let mut stats = Stats::default();
        let mut graph = build_reachability_graph(&map, &points, false, &mut stats);
        apply_pareto_filter(&mut graph, &mut stats);
        graph
    }

    fn search(graph: &ReachabilityGraph, heuristic: Heuristic) -> SearchOutcome {
        a_star_search(graph, heuristic, SearchLimits::default(), &mut Stats::default())
    }

    const CHAIN: &str = "\
@.aA.bB..c
##########
@#@#@#####";

    #[test]
    fn test_no_keys_costs_nothing() {
        init_tracing();
        let graph = compressed("@.@\n...\n@.@");
        assert_eq!(
            search(&graph, Heuristic::MinEdge),
            SearchOutcome::Found(Solution {
                cost: 0,
                moves: vec![]
            })
        );
    }

    #[test]
    fn test_forced_key_order() {
        init_tracing();
        let graph = compressed(CHAIN);
        let SearchOutcome::Found(solution) = search(&graph, Heuristic::MinEdge) else {
            panic!("chain should be solvable");
        };

        assert_eq!(solution.cost, 2 + 3 + 4);
        let keys: Vec<usize> = solution.moves.iter().map(|step| step.key).collect();
        assert_eq!(keys, vec![0, 1, 2]);
        assert!(solution.moves.iter().all(|step| step.agent == 0));
        assert!(solution.verify(&graph));
    }

    #[test]
    fn test_key_behind_its_own_door() {
        init_tracing();
        let graph = compressed("@.Aa\n####\n@@@.");
        assert_eq!(search(&graph, Heuristic::MinEdge), SearchOutcome::Unreachable);
        assert_eq!(
            search(&graph, Heuristic::NearestSource),
            SearchOutcome::Unreachable
        );
    }

    #[test]
    fn test_robots_share_the_work() {
        init_tracing();
        // Robot 0 is next to a, robot 1 next to b; one robot doing both would pay more.
        let graph = compressed("@a....b@\n########\n@......@");
        let SearchOutcome::Found(solution) = search(&graph, Heuristic::MinEdge) else {
            panic!("should be solvable");
        };
        assert_eq!(solution.cost, 2);
        assert!(solution.verify(&graph));
    }

    #[test]
    fn test_heuristics_agree() {
        init_tracing();
        let graph = compressed(
            "\
#########
#b.A.@.a#
#.#######
#@.C.D@B#
#d#####c#
####@####",
        );
        let min_edge = search(&graph, Heuristic::MinEdge);
        let nearest = search(&graph, Heuristic::NearestSource);

        let (SearchOutcome::Found(a), SearchOutcome::Found(b)) = (&min_edge, &nearest) else {
            panic!("expected both searches to succeed: {min_edge:?} {nearest:?}");
        };
        assert_eq!(a.cost, b.cost);
        assert!(a.verify(&graph));
        assert!(b.verify(&graph));
    }

    #[test]
    fn test_start_estimate_is_admissible() {
        let graph = compressed(CHAIN);
        for heuristic in [Heuristic::MinEdge, Heuristic::NearestSource] {
            let estimator = Estimator::new(&graph, heuristic);
            let h_cost = estimator.estimate(&State::initial()).unwrap();
            assert!(h_cost <= 9, "{heuristic:?} overestimates: {h_cost}");
        }
    }

    #[test]
    fn test_expansion_limit() {
        let graph = compressed(CHAIN);
        let mut stats = Stats::default();
        let limits = SearchLimits {
            max_expansions: Some(1),
            ..SearchLimits::default()
        };
        assert_eq!(
            a_star_search(&graph, Heuristic::MinEdge, limits, &mut stats),
            SearchOutcome::LimitReached {
                expanded: 1,
                pushed: 1
            }
        );
        assert_eq!(stats.a_star_expand_nodes, 1);
    }

    // 30x30 open room, robots in the corners, 26 keys in one row.
    fn open_field() -> String {
        let n = 30;
        let mut grid = vec![vec!['.'; n]; n];
        for (x, y) in [(0, 0), (0, n - 1), (n - 1, 0), (n - 1, n - 1)] {
            grid[x][y] = '@';
        }
        for (i, letter) in ('a'..='z').enumerate() {
            grid[n / 2][2 + i] = letter;
        }
        grid.iter()
            .map(|row| row.iter().collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_push_limit_bounds_the_open_list() {
        init_tracing();
        let graph = compressed(&open_field());
        let mut stats = Stats::default();
        let limits = SearchLimits {
            max_expansions: None,
            max_pushes: Some(100),
        };

        // The start alone has 4 * 26 successors, so the cap trips inside the first expansion.
        assert_eq!(
            a_star_search(&graph, Heuristic::NearestSource, limits, &mut stats),
            SearchOutcome::LimitReached {
                expanded: 1,
                pushed: 100
            }
        );
        assert_eq!(stats.a_star_push_nodes, 100);
        assert_eq!(stats.a_star_expand_nodes, 1);
    }

    #[test]
    fn test_generous_push_limit_still_finds_the_plan() {
        let graph = compressed(CHAIN);
        let limits = SearchLimits {
            max_expansions: None,
            max_pushes: Some(1_000),
        };
        let SearchOutcome::Found(solution) =
            a_star_search(&graph, Heuristic::MinEdge, limits, &mut Stats::default())
        else {
            panic!("chain should be solvable within the cap");
        };
        assert_eq!(solution.cost, 9);
        assert!(solution.verify(&graph));
    }

    #[test]
    fn test_verify_rejects_tampered_plans() {
        let graph = compressed(CHAIN);
        let SearchOutcome::Found(solution) = search(&graph, Heuristic::MinEdge) else {
            panic!("chain should be solvable");
        };

        let mut wrong_cost = solution.clone();
        wrong_cost.cost -= 1;
        assert!(!wrong_cost.verify(&graph));

        let mut wrong_order = solution.clone();
        wrong_order.moves.swap(0, 1);
        assert!(!wrong_order.verify(&graph));

        let mut missing_key = solution;
        missing_key.moves.pop();
        missing_key.cost -= 4;
        assert!(!missing_key.verify(&graph));
    }
}
