//! Species replacement: clone-and-perturb a top performer's topology, then
//! inherit weights into it wherever edges still match (spec §4.10).

use crate::activations::{random_activation_from_mask, Activation, ActivationMask};
use crate::config::EvolutionConfig;
use crate::individual::{glorot_sample, Individual};
use crate::species::Species;
use crate::topology::{Edge, TopologySpec, BIAS_ROW};
use rand::Rng;
use std::collections::HashMap;

/// Builds the replacement species for a culled slot.
pub fn diversify(species: &[Species], config: &EvolutionConfig, rng: &mut impl Rng) -> Species {
    let donor_index = pick_donor(species, rng);
    let donor = &species[donor_index];

    let perturbed = perturb_topology(&donor.topology, rng);
    let individuals = inherit_individuals(donor, &perturbed, config, rng);

    Species::new(perturbed, individuals)
}

/// Picks one of the top-2 species by `median_fitness` uniformly; if only
/// one species qualifies it is returned for both ranks (self-pairing is
/// allowed).
fn pick_donor(species: &[Species], rng: &mut impl Rng) -> usize {
    let mut order: Vec<usize> = (0..species.len()).collect();
    order.sort_by(|&a, &b| {
        species[b]
            .stats
            .median_fitness
            .partial_cmp(&species[a].stats.median_fitness)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let top = &order[..order.len().min(2)];
    top[rng.gen_range(0..top.len())]
}

fn perturb_topology(donor: &TopologySpec, rng: &mut impl Rng) -> TopologySpec {
    let mut row_counts = donor.row_counts().to_vec();
    for row in 2..row_counts.len() - 1 {
        let delta: i32 = [-2, -1, 0, 1, 2][rng.gen_range(0..5)];
        let new_count = (row_counts[row] as i32 + delta).clamp(2, 16);
        row_counts[row] = new_count as usize;
    }

    let mut allowed = donor.allowed_activations_per_row().to_vec();
    let output_row = allowed.len() - 1;
    let flips = 1 + rng.gen_range(0..3);
    for _ in 0..flips {
        let row = rng.gen_range(1..allowed.len());
        if row == BIAS_ROW {
            continue;
        }
        let bit: ActivationMask = 1 << rng.gen_range(0..crate::activations::ACTIVATION_COUNT as u16);
        let candidate = allowed[row] ^ bit;
        let candidate = if row == output_row {
            candidate & crate::activations::OUTPUT_ROW_MASK
        } else {
            candidate
        };
        if candidate != 0 {
            allowed[row] = candidate;
        }
    }

    let max_in_degree_delta: i32 = [-1, 0, 1][rng.gen_range(0..3)];
    let max_in_degree = (donor.max_in_degree() as i32 + max_in_degree_delta).clamp(4, 12) as usize;

    let new_node_row = compute_node_row(&row_counts);
    let new_total_nodes: usize = row_counts.iter().sum();
    let surviving: Vec<Edge> = donor
        .edges()
        .iter()
        .copied()
        .filter(|e| e.source < new_total_nodes && e.destination < new_total_nodes)
        .filter(|e| new_node_row[e.source] < new_node_row[e.destination])
        .collect();

    // max_in_degree may have shrunk below what some destination already has;
    // drop the excess, keeping the donor's earliest edges into that node.
    let mut in_degree = vec![0usize; new_total_nodes];
    let edges: Vec<Edge> = surviving
        .into_iter()
        .filter(|e| {
            if in_degree[e.destination] < max_in_degree {
                in_degree[e.destination] += 1;
                true
            } else {
                false
            }
        })
        .collect();

    TopologySpec::new(row_counts, allowed, max_in_degree, edges)
        .expect("perturbation filters every edge that would violate layering, range, or in-degree")
}

fn compute_node_row(row_counts: &[usize]) -> Vec<usize> {
    let mut node_row = Vec::with_capacity(row_counts.iter().sum());
    for (r, &count) in row_counts.iter().enumerate() {
        node_row.extend(std::iter::repeat(r).take(count));
    }
    node_row
}

fn is_structurally_identical(a: &TopologySpec, b: &TopologySpec) -> bool {
    a.row_counts() == b.row_counts() && a.edges().len() == b.edges().len()
}

/// Maps a node in `new` back to its counterpart in `old` by (row, position
/// within row), which stays meaningful across a hidden-row resize even
/// though raw node indices shift. `None` when the new row is larger than
/// the old one at this position.
fn corresponding_old_node(old: &TopologySpec, new: &TopologySpec, new_node: usize) -> Option<usize> {
    let row = new.row_of(new_node);
    let (new_start, _) = new.row_span(row);
    let pos = new_node - new_start;
    let (old_start, old_count) = old.row_span(row);
    if pos < old_count {
        Some(old_start + pos)
    } else {
        None
    }
}

/// Builds a (new_source, new_destination) -> donor_edge_index map so every
/// new edge that corresponds to a donor edge inherits its weight.
fn build_edge_correspondence(donor_topology: &TopologySpec, new_topology: &TopologySpec) -> HashMap<(usize, usize), usize> {
    let mut old_to_new = HashMap::new();
    for new_node in 0..new_topology.total_nodes() {
        if let Some(old_node) = corresponding_old_node(donor_topology, new_topology, new_node) {
            old_to_new.insert(old_node, new_node);
        }
    }

    let mut map = HashMap::new();
    for (donor_idx, edge) in donor_topology.edges().iter().enumerate() {
        if let (Some(&new_source), Some(&new_destination)) =
            (old_to_new.get(&edge.source), old_to_new.get(&edge.destination))
        {
            map.insert((new_source, new_destination), donor_idx);
        }
    }
    map
}

fn inherit_individuals(
    donor: &Species,
    new_topology: &TopologySpec,
    config: &EvolutionConfig,
    rng: &mut impl Rng,
) -> Vec<Individual> {
    let mut out = Vec::with_capacity(config.individuals_per_species);

    if is_structurally_identical(&donor.topology, new_topology) && !donor.individuals.is_empty() {
        for slot in 0..config.individuals_per_species {
            let mut child = donor.individuals[slot % donor.individuals.len()].clone();
            child.age = 0;
            child.fitness = f32::NEG_INFINITY;
            out.push(child);
        }
        return out;
    }

    let edge_correspondence = build_edge_correspondence(&donor.topology, new_topology);

    for slot in 0..config.individuals_per_species {
        let parent = donor.individuals.get(slot % donor.individuals.len().max(1));
        out.push(build_inherited_individual(
            parent,
            &donor.topology,
            new_topology,
            &edge_correspondence,
            rng,
        ));
    }
    out
}

fn build_inherited_individual(
    parent: Option<&Individual>,
    donor_topology: &TopologySpec,
    new_topology: &TopologySpec,
    edge_correspondence: &HashMap<(usize, usize), usize>,
    rng: &mut impl Rng,
) -> Individual {
    let weights: Vec<f32> = new_topology
        .edges()
        .iter()
        .enumerate()
        .map(|(_, edge)| {
            let key = (edge.source, edge.destination);
            match (parent, edge_correspondence.get(&key)) {
                (Some(p), Some(&donor_idx)) => p.weights[donor_idx],
                _ => glorot_sample(new_topology, edge.source, edge.destination, rng),
            }
        })
        .collect();

    let total_nodes = new_topology.total_nodes();
    let mut activations = Vec::with_capacity(total_nodes);
    let mut node_params = Vec::with_capacity(total_nodes * crate::activations::MAX_ACTIVATION_PARAMS);
    for new_node in 0..total_nodes {
        let mask = new_topology.allowed_activations_per_row()[new_topology.row_of(new_node)];
        let inherited = parent.and_then(|p| {
            corresponding_old_node(donor_topology, new_topology, new_node).and_then(|old_node| matching_node(p, old_node, mask))
        });
        let (activation, params) = inherited.unwrap_or_else(|| {
            let activation = random_activation_from_mask(mask, rng);
            (activation, activation.default_params())
        });
        activations.push(activation);
        node_params.extend_from_slice(&params);
    }

    Individual {
        weights,
        activations,
        node_params,
        fitness: f32::NEG_INFINITY,
        age: 0,
    }
}

fn matching_node(parent: &Individual, old_node: usize, mask: ActivationMask) -> Option<(Activation, [f32; 4])> {
    if old_node >= parent.activations.len() {
        return None;
    }
    let activation = parent.activations[old_node];
    if mask & activation.bit() == 0 {
        return None;
    }
    let mut params = [0.0f32; 4];
    params.copy_from_slice(parent.node_params(old_node));
    Some((activation, params))
}
