use super::ReachabilityGraph;
use crate::common::{KeyMask, Variant};
use crate::stat::Stats;

use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Pareto frontier of `variants` over (door mask by inclusion, distance).
///
/// The result is sorted by distance, then mask.
pub fn pareto_front(variants: &[Variant]) -> Vec<Variant> {
    let mut best_distance: BTreeMap<KeyMask, usize> = BTreeMap::new();
    for variant in variants {
        best_distance
            .entry(variant.door_mask)
            .and_modify(|distance| *distance = (*distance).min(variant.distance))
            .or_insert(variant.distance);
    }

    let candidates: Vec<Variant> = best_distance
        .into_iter()
        .map(|(door_mask, distance)| Variant::new(door_mask, distance))
        .collect();

    let mut front: Vec<Variant> = candidates
        .iter()
        .filter(|variant| {
            !candidates
                .iter()
                .any(|other| other.door_mask != variant.door_mask && other.dominates(variant))
        })
        .copied()
        .collect();
    front.sort_by_key(|variant| (variant.distance, variant.door_mask));
    front
}

#[instrument(skip_all, name = "pareto_filter", level = "debug")]
pub fn apply_pareto_filter(graph: &mut ReachabilityGraph, stats: &mut Stats) {
    let num_points = graph.num_points();
    let mut kept = 0;
    for source in 0..num_points {
        for target in 0..num_points {
            let variants = graph.variants_mut(source, target);
            if variants.is_empty() {
                continue;
            }
            *variants = pareto_front(variants);
            kept += variants.len();
        }
    }
    stats.filtered_variants = kept;
    debug!("pareto filter kept {kept} variants");
}
