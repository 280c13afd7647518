use super::ReachabilityGraph;
use crate::common::{KeyMask, PointsOfInterest, Variant};
use crate::map::{Map, Tile};
use crate::stat::Stats;

use rayon::prelude::*;
use std::collections::VecDeque;
use tracing::{debug, instrument, trace};

/// Runs one door-aware BFS per point of interest and collects every
/// non-dominated `(door mask, distance)` way of reaching the other points.
#[instrument(skip_all, name = "reachability", fields(points = points.len(), parallel = parallel), level = "debug")]
pub fn build_reachability_graph(
    map: &Map,
    points: &PointsOfInterest,
    parallel: bool,
    stats: &mut Stats,
) -> ReachabilityGraph {
    let rows: Vec<(Vec<Vec<Variant>>, Stats)> = if parallel {
        (0..points.len())
            .into_par_iter()
            .map(|source| explore_from(map, points, source))
            .collect()
    } else {
        (0..points.len())
            .map(|source| explore_from(map, points, source))
            .collect()
    };

    let mut graph = ReachabilityGraph::new(points.len());
    for (source, (row, source_stats)) in rows.into_iter().enumerate() {
        stats.merge_bfs(&source_stats);
        graph.set_row(source, row);
    }

    debug!(
        "built graph: {} points, {} raw variants, {} BFS expansions",
        graph.num_points(),
        stats.raw_variants,
        stats.bfs_expand_cells
    );
    graph
}

fn explore_from(map: &Map, points: &PointsOfInterest, source: usize) -> (Vec<Vec<Variant>>, Stats) {
    let mut row = vec![Vec::new(); points.len()];
    let mut stats = Stats::default();

    // Door masks already queued per cell. No entry is a subset of another.
    let mut seen_masks: Vec<Vec<KeyMask>> = vec![Vec::new(); map.height * map.width];
    let start = points.positions[source];
    seen_masks[start.0 * map.width + start.1].push(0);

    let mut queue = VecDeque::new();
    queue.push_back((start, 0usize, 0 as KeyMask));

    while let Some(((x, y), distance, door_mask)) = queue.pop_front() {
        stats.bfs_expand_cells += 1;

        if let Some(target) = points.index_of((x, y)) {
            if target != source {
                trace!("source {source} reaches {target}: mask {door_mask:#b}, distance {distance}");
                row[target].push(Variant::new(door_mask, distance));
                stats.raw_variants += 1;
            }
        }

        for (new_x, new_y) in map.get_neighbors(x, y) {
            let new_mask = match map.tile(new_x, new_y) {
                Tile::Door(letter) => match points.door_bit(letter) {
                    Some(bit) => door_mask | bit,
                    None => continue,
                },
                _ => door_mask,
            };

            // FIFO order: anything already recorded here is no farther away.
            let masks = &mut seen_masks[new_x * map.width + new_y];
            if masks.iter().any(|&seen| seen & new_mask == seen) {
                continue;
            }
            masks.retain(|&seen| seen & new_mask != new_mask);
            masks.push(new_mask);

            queue.push_back(((new_x, new_y), distance + 1, new_mask));
        }
    }

    (row, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::apply_pareto_filter;

    fn build(text: &str) -> (PointsOfInterest, ReachabilityGraph) {
        let map: Map = text.parse().unwrap();
        let points = PointsOfInterest::locate(&map).unwrap();
        let graph = build_reachability_graph(&map, &points, false, &mut Stats::default());
        (points, graph)
    }

    // Robot 0 can reach key b through door A (4 steps) or around it (8 steps).
    const DETOUR: &str = "\
@.A.b
.###.
.....
@#@@a";

    #[test]
    fn test_door_and_detour_are_both_kept() {
        let (points, graph) = build(DETOUR);
        assert_eq!(points.index_of((0, 4)), Some(5));

        assert_eq!(
            graph.variants(0, 5),
            &[Variant::new(0b1, 4), Variant::new(0b0, 8)]
        );
    }

    #[test]
    fn test_no_self_edges() {
        let (points, graph) = build(DETOUR);
        for point in 0..points.len() {
            assert!(graph.variants(point, point).is_empty());
        }
    }

    #[test]
    fn test_open_path_survives_filter() {
        let (_, mut graph) = build(DETOUR);
        apply_pareto_filter(&mut graph, &mut Stats::default());

        assert_eq!(graph.variants(0, 4), &[Variant::new(0, 7)]);
        assert_eq!(graph.variants(3, 4), &[Variant::new(0, 1)]);
        assert_eq!(graph.variants(4, 3), &[Variant::new(0, 1)]);
    }

    #[test]
    fn test_walls_split_components() {
        let (_, graph) = build("@a#@\n####\n@#b@");
        // Robot 0 sees only key a; robot 1 is sealed in.
        assert_eq!(graph.variants(0, 4), &[Variant::new(0, 1)]);
        assert!(graph.variants(0, 5).is_empty());
        assert!(graph.variants(1, 4).is_empty());
        assert!(graph.variants(1, 5).is_empty());
        assert_eq!(graph.variants(2, 5).len(), 0);
        assert_eq!(graph.variants(3, 5), &[Variant::new(0, 1)]);
    }

    #[test]
    fn test_orphan_door_is_a_wall() {
        let (_, graph) = build("@Q.a\n####\n@@@.");
        assert!(graph.variants(0, 4).is_empty());
    }

    #[test]
    fn test_walking_over_a_key_does_not_stop_the_search() {
        let (_, graph) = build("@ab\n###\n@@@");
        assert_eq!(graph.variants(0, 4), &[Variant::new(0, 1)]);
        assert_eq!(graph.variants(0, 5), &[Variant::new(0, 2)]);
    }

    #[test]
    fn test_parallel_build_matches_sequential() {
        let map: Map = DETOUR.parse().unwrap();
        let points = PointsOfInterest::locate(&map).unwrap();
        let mut sequential_stats = Stats::default();
        let mut parallel_stats = Stats::default();

        let sequential = build_reachability_graph(&map, &points, false, &mut sequential_stats);
        let parallel = build_reachability_graph(&map, &points, true, &mut parallel_stats);

        assert_eq!(sequential, parallel);
        assert_eq!(sequential_stats.raw_variants, parallel_stats.raw_variants);
        assert_eq!(
            sequential_stats.bfs_expand_cells,
            parallel_stats.bfs_expand_cells
        );
    }
}
