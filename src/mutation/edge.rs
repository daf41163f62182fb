//! Edge-topology mutation operators. Every operator takes the species'
//! shared [`TopologySpec`] and every individual in that species, so a
//! change to the edge list can be mirrored into every weight array in the
//! same step (the weight-slot bookkeeping invariant). All return `bool`:
//! `true` on a structural change, `false` on soft failure (no candidate
//! found), per the mutation-impossibility error kind.

use crate::config::WeakEdgePruningConfig;
use crate::errors::EvoResult;
use crate::individual::{glorot_sample, Individual};
use crate::topology::{ConnectivityAnalyzer, Edge, TopologySpec, BIAS_ROW};
use rand::seq::SliceRandom;
use rand::Rng;

const SPLIT_SMART_SEED_WEIGHT: f32 = 0.01;

fn nodes_in_rows(topology: &TopologySpec, rows: impl Iterator<Item = usize>) -> Vec<usize> {
    rows.flat_map(|r| {
        let (start, count) = topology.row_span(r);
        start..start + count
    })
    .collect()
}

/// Appends one new edge. Destination row drawn from the computed rows
/// (everything past the input row); source drawn from any earlier row.
pub fn edge_add(topology: &mut TopologySpec, individuals: &mut [Individual], rng: &mut impl Rng) -> EvoResult<bool> {
    let dest_row = rng.gen_range(2..topology.row_count());
    let (dest_start, dest_count) = topology.row_span(dest_row);
    let destination = dest_start + rng.gen_range(0..dest_count);
    if topology.in_degree(destination) >= topology.max_in_degree() {
        tracing::debug!(destination, "edge_add: destination at in-degree cap");
        return Ok(false);
    }

    let mut sources = nodes_in_rows(topology, 0..dest_row);
    sources.shuffle(rng);
    let source = sources
        .into_iter()
        .find(|&s| topology.parallel_count(s, destination) == 0);

    let Some(source) = source else {
        tracing::debug!(destination, "edge_add: no non-duplicate source available");
        return Ok(false);
    };

    topology.push_edge(Edge::new(source, destination));
    for individual in individuals.iter_mut() {
        let weight = glorot_sample(topology, source, destination, rng);
        individual.insert_weight_slot(individual.weights.len(), weight);
    }
    topology.recompile(individuals)?;
    Ok(true)
}

/// Samples up to 10 random edges and deletes the first deletable one.
pub fn edge_delete_random(
    topology: &mut TopologySpec,
    individuals: &mut [Individual],
    rng: &mut impl Rng,
) -> EvoResult<bool> {
    let edge_count = topology.edges().len();
    if edge_count == 0 {
        return Ok(false);
    }
    for _ in 0..10 {
        let index = rng.gen_range(0..edge_count);
        let edge = topology.edges()[index];
        if ConnectivityAnalyzer::can_delete_edge(topology, edge) {
            topology.remove_edge_raw(index, individuals);
            topology.rebuild_and_validate()?;
            return Ok(true);
        }
    }
    tracing::debug!("edge_delete_random: no deletable edge found in 10 samples");
    Ok(false)
}

/// Replaces an edge spanning >= 2 rows with two edges through an
/// intermediate row.
pub fn edge_split(topology: &mut TopologySpec, individuals: &mut [Individual], rng: &mut impl Rng) -> EvoResult<bool> {
    let mut candidates: Vec<usize> = (0..topology.edges().len())
        .filter(|&i| {
            let e = topology.edges()[i];
            topology.row_of(e.destination) - topology.row_of(e.source) >= 2
        })
        .collect();
    candidates.shuffle(rng);

    for edge_index in candidates {
        let edge = topology.edges()[edge_index];
        let source_row = topology.row_of(edge.source);
        let dest_row = topology.row_of(edge.destination);
        let mut rows: Vec<usize> = (source_row + 1..dest_row).collect();
        rows.shuffle(rng);
        for row in rows {
            let (start, count) = topology.row_span(row);
            let mut nodes: Vec<usize> = (start..start + count).collect();
            nodes.shuffle(rng);
            if let Some(&mid) = nodes.iter().find(|&&n| topology.in_degree(n) < topology.max_in_degree()) {
                topology.remove_edge_raw(edge_index, individuals);
                topology.push_edge(Edge::new(edge.source, mid));
                topology.push_edge(Edge::new(mid, edge.destination));
                for individual in individuals.iter_mut() {
                    let w1 = glorot_sample(topology, edge.source, mid, rng);
                    let w2 = glorot_sample(topology, mid, edge.destination, rng);
                    individual.insert_weight_slot(individual.weights.len(), w1);
                    individual.insert_weight_slot(individual.weights.len(), w2);
                }
                topology.recompile(individuals)?;
                return Ok(true);
            }
        }
    }
    tracing::debug!("edge_split: no candidate edge/intermediate-row/node found");
    Ok(false)
}

/// Same as [`edge_split`] but the intermediate node must be currently
/// inactive and have room for two incoming edges; also wires one extra
/// active-source and one extra active-sink edge through it, seeded at a
/// very small weight so the network's behavior barely changes.
pub fn edge_split_smart(
    topology: &mut TopologySpec,
    individuals: &mut [Individual],
    rng: &mut impl Rng,
) -> EvoResult<bool> {
    let active = ConnectivityAnalyzer::active_nodes(topology);

    let mut candidates: Vec<usize> = (0..topology.edges().len())
        .filter(|&i| {
            let e = topology.edges()[i];
            topology.row_of(e.destination) - topology.row_of(e.source) >= 2
        })
        .collect();
    candidates.shuffle(rng);

    for edge_index in candidates {
        let edge = topology.edges()[edge_index];
        let source_row = topology.row_of(edge.source);
        let dest_row = topology.row_of(edge.destination);
        let mut rows: Vec<usize> = (source_row + 1..dest_row).collect();
        rows.shuffle(rng);

        for row in rows {
            let (start, count) = topology.row_span(row);
            let mut nodes: Vec<usize> = (start..start + count)
                .filter(|n| !active.contains(n) && topology.in_degree(*n) + 2 <= topology.max_in_degree())
                .collect();
            nodes.shuffle(rng);
            let Some(mid) = nodes.into_iter().next() else {
                continue;
            };

            let mut extra_sources: Vec<usize> = nodes_in_rows(topology, 0..row)
                .into_iter()
                .filter(|n| active.contains(n) && topology.parallel_count(*n, mid) == 0)
                .collect();
            extra_sources.shuffle(rng);
            let Some(&extra_source) = extra_sources.first() else {
                continue;
            };

            let mut extra_sinks: Vec<usize> = nodes_in_rows(topology, row + 1..topology.row_count())
                .into_iter()
                .filter(|n| active.contains(n) && topology.parallel_count(mid, *n) == 0)
                .collect();
            extra_sinks.shuffle(rng);
            let Some(&extra_sink) = extra_sinks.first() else {
                continue;
            };

            topology.remove_edge_raw(edge_index, individuals);
            topology.push_edge(Edge::new(edge.source, mid));
            topology.push_edge(Edge::new(mid, edge.destination));
            topology.push_edge(Edge::new(extra_source, mid));
            topology.push_edge(Edge::new(mid, extra_sink));
            for individual in individuals.iter_mut() {
                for _ in 0..4 {
                    individual.insert_weight_slot(individual.weights.len(), SPLIT_SMART_SEED_WEIGHT);
                }
            }
            topology.recompile(individuals)?;
            return Ok(true);
        }
    }
    tracing::debug!("edge_split_smart: no inactive intermediate node with room found");
    Ok(false)
}

/// Flips a coin: rewires an edge's source to a different earlier-row node,
/// or its destination to a different later-row node with in-degree
/// headroom.
pub fn edge_redirect(topology: &mut TopologySpec, individuals: &mut [Individual], rng: &mut impl Rng) -> EvoResult<bool> {
    let edge_count = topology.edges().len();
    if edge_count == 0 {
        return Ok(false);
    }
    let index = rng.gen_range(0..edge_count);
    let edge = topology.edges()[index];

    if rng.gen_bool(0.5) {
        let mut candidates: Vec<usize> = nodes_in_rows(topology, 0..topology.row_of(edge.destination))
            .into_iter()
            .filter(|&n| n != edge.source && topology.parallel_count(n, edge.destination) == 0)
            .collect();
        candidates.shuffle(rng);
        let Some(&new_source) = candidates.first() else {
            tracing::debug!("edge_redirect: no alternate source available");
            return Ok(false);
        };
        topology.edges_mut()[index].source = new_source;
    } else {
        let mut candidates: Vec<usize> = nodes_in_rows(topology, topology.row_of(edge.source) + 1..topology.row_count())
            .into_iter()
            .filter(|&n| {
                n != edge.destination
                    && topology.in_degree(n) < topology.max_in_degree()
                    && topology.parallel_count(edge.source, n) == 0
            })
            .collect();
        candidates.shuffle(rng);
        let Some(&new_destination) = candidates.first() else {
            tracing::debug!("edge_redirect: no alternate destination available");
            return Ok(false);
        };
        topology.edges_mut()[index].destination = new_destination;
    }
    topology.recompile(individuals)?;
    Ok(true)
}

/// Picks two distinct edges and swaps their destinations, iff doing so
/// preserves layering and introduces no duplicate or in-degree overflow.
pub fn edge_swap(topology: &mut TopologySpec, individuals: &mut [Individual], rng: &mut impl Rng) -> EvoResult<bool> {
    let edge_count = topology.edges().len();
    if edge_count < 2 {
        return Ok(false);
    }
    let i = rng.gen_range(0..edge_count);
    let mut j = rng.gen_range(0..edge_count);
    while j == i {
        j = rng.gen_range(0..edge_count);
    }
    let e1 = topology.edges()[i];
    let e2 = topology.edges()[j];

    let layered_ok = topology.row_of(e1.source) < topology.row_of(e2.destination)
        && topology.row_of(e2.source) < topology.row_of(e1.destination);
    let no_duplicate = topology.parallel_count(e1.source, e2.destination) == 0
        && topology.parallel_count(e2.source, e1.destination) == 0;

    if !layered_ok || !no_duplicate {
        tracing::debug!("edge_swap: candidate pair would violate layering or duplicate an edge");
        return Ok(false);
    }

    topology.edges_mut()[i].destination = e2.destination;
    topology.edges_mut()[j].destination = e1.destination;
    topology.recompile(individuals)?;
    Ok(true)
}

/// Probabilistically prunes edges whose species-mean absolute weight falls
/// below `cfg.threshold`, skipping any that aren't safely deletable.
/// Returns the number of edges pruned.
pub fn weak_edge_prune(
    topology: &mut TopologySpec,
    individuals: &mut [Individual],
    cfg: &WeakEdgePruningConfig,
    rng: &mut impl Rng,
) -> EvoResult<usize> {
    if !cfg.enabled || individuals.is_empty() {
        return Ok(0);
    }

    let edge_count = topology.edges().len();
    let mean_abs: Vec<f32> = (0..edge_count)
        .map(|i| {
            let sum: f32 = individuals.iter().map(|ind| ind.weights[i].abs()).sum();
            sum / individuals.len() as f32
        })
        .collect();

    let mut candidates: Vec<usize> = (0..edge_count).filter(|&i| mean_abs[i] < cfg.threshold).collect();
    candidates.sort_unstable_by(|a, b| b.cmp(a));

    let mut pruned = 0usize;
    for index in candidates {
        let edge = topology.edges()[index];
        if !ConnectivityAnalyzer::can_delete_edge(topology, edge) {
            continue;
        }
        let p = (cfg.base_prune_rate * (1.0 - (mean_abs[index] / cfg.threshold) as f64)).min(0.9);
        if rng.gen_bool(p.max(0.0)) {
            topology.remove_edge_raw(index, individuals);
            pruned += 1;
        }
    }
    if pruned > 0 {
        topology.rebuild_and_validate()?;
    }
    Ok(pruned)
}

#[allow(dead_code)]
const _BIAS_ROW_REFERENCE: usize = BIAS_ROW;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activations::{mask_from, Activation, BIAS_ROW_MASK};
    use crate::topology::TopologySpec;

    fn chain_topology() -> (TopologySpec, Vec<Individual>) {
        let spec = TopologySpec::new(
            vec![1, 2, 2, 1],
            vec![
                BIAS_ROW_MASK,
                Activation::Linear.bit(),
                mask_from(&[Activation::Tanh]),
                mask_from(&[Activation::Tanh]),
            ],
            8,
            vec![Edge::new(1, 3), Edge::new(3, 5), Edge::new(4, 5), Edge::new(2, 4)],
        )
        .unwrap();
        let mut rng = rand::thread_rng();
        let individuals: Vec<Individual> = (0..10).map(|_| Individual::new_random(&spec, &mut rng)).collect();
        (spec, individuals)
    }

    #[test]
    fn swapping_the_same_edge_pair_twice_restores_the_original_edge_set() {
        let spec = TopologySpec::new(
            vec![1, 2, 2],
            vec![
                BIAS_ROW_MASK,
                Activation::Linear.bit(),
                mask_from(&[Activation::Tanh]),
            ],
            8,
            vec![Edge::new(1, 3), Edge::new(2, 4)],
        )
        .unwrap();
        let mut individuals: Vec<Individual> = (0..3)
            .map(|_| Individual::new_random(&spec, &mut rand::thread_rng()))
            .collect();
        let mut spec = spec;
        let original: Vec<Edge> = spec.edges().to_vec();

        let mut rng = rand::thread_rng();
        // With exactly two eligible edges, every successful swap exchanges
        // the same unordered pair, so two applications are an involution.
        assert!(edge_swap(&mut spec, &mut individuals, &mut rng).unwrap());
        let mut after_one: Vec<Edge> = spec.edges().to_vec();
        after_one.sort_by_key(|e| (e.source, e.destination));
        let mut original_sorted = original.clone();
        original_sorted.sort_by_key(|e| (e.source, e.destination));
        assert_ne!(after_one, original_sorted);

        assert!(edge_swap(&mut spec, &mut individuals, &mut rng).unwrap());
        let mut after_two: Vec<Edge> = spec.edges().to_vec();
        after_two.sort_by_key(|e| (e.source, e.destination));
        assert_eq!(after_two, original_sorted);
    }

    #[test]
    fn edge_add_extends_every_individuals_weights() {
        let (mut spec, mut individuals) = chain_topology();
        let original_edges = spec.edges().len();
        let mut rng = rand::thread_rng();
        let added = edge_add(&mut spec, &mut individuals, &mut rng).unwrap();
        assert!(added);
        assert_eq!(spec.edges().len(), original_edges + 1);
        for ind in &individuals {
            assert_eq!(ind.weights.len(), spec.edges().len());
            assert!(ind.weights.last().unwrap().is_finite());
        }
    }

    #[test]
    fn weak_edge_prune_preserves_output_reachability() {
        let spec = TopologySpec::new(
            vec![1, 1, 1, 1, 1],
            vec![
                BIAS_ROW_MASK,
                Activation::Linear.bit(),
                mask_from(&[Activation::Tanh]),
                mask_from(&[Activation::Tanh]),
                mask_from(&[Activation::Tanh]),
            ],
            4,
            vec![Edge::new(1, 2), Edge::new(2, 3), Edge::new(3, 4)],
        )
        .unwrap();
        let mut individuals: Vec<Individual> = (0..5)
            .map(|_| Individual::new_random(&spec, &mut rand::thread_rng()))
            .collect();
        for ind in individuals.iter_mut() {
            for w in ind.weights.iter_mut() {
                *w = 1e-6;
            }
        }
        let mut spec = spec;
        let cfg = WeakEdgePruningConfig {
            enabled: true,
            threshold: 0.05,
            base_prune_rate: 1.0,
            apply_during_evolution: true,
        };
        let mut rng = rand::thread_rng();
        weak_edge_prune(&mut spec, &mut individuals, &cfg, &mut rng).unwrap();

        let outputs = nodes_in_rows(&spec, spec.output_row()..spec.output_row() + 1);
        let inputs = nodes_in_rows(&spec, crate::topology::INPUT_ROW..crate::topology::INPUT_ROW + 1);
        let forward = ConnectivityAnalyzer::reachable_forward(spec.edges(), spec.total_nodes(), &inputs);
        for o in outputs {
            assert!(forward.contains(&o));
        }
    }
}
