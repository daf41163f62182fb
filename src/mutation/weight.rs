//! Weight-level and activation-parameter mutation operators. Each function
//! mutates in place; the per-individual gating probability from
//! `MutationRates` is rolled by the caller (`mutation::apply_weight_mutations`),
//! never inside these functions, so they stay trivially unit-testable.

use crate::activations::{random_activation_from_mask, MAX_ACTIVATION_PARAMS};
use crate::config::MutationRates;
use crate::individual::Individual;
use crate::topology::TopologySpec;
use rand::distributions::Uniform;
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Indices into `individual.weights` whose edge is sourced at the bias node.
pub fn bias_weight_indices(topology: &TopologySpec) -> Vec<usize> {
    topology
        .edges()
        .iter()
        .enumerate()
        .filter(|(_, e)| e.source == crate::topology::BIAS_ROW)
        .map(|(i, _)| i)
        .collect()
}

/// Adds N(0, jitter_stddev * |w|) to every weight at the given indices.
pub fn jitter(weights: &mut [f32], indices: &[usize], jitter_stddev: f32, rng: &mut impl Rng) {
    for &i in indices {
        let w = weights[i];
        let sigma = (jitter_stddev * w.abs()).max(f32::EPSILON);
        let normal = Normal::new(0.0, sigma as f64).unwrap();
        weights[i] += normal.sample(rng) as f32;
    }
}

/// Replaces one uniformly chosen weight among `indices` with U(-1, 1).
pub fn reset_one(weights: &mut [f32], indices: &[usize], rng: &mut impl Rng) {
    if indices.is_empty() {
        return;
    }
    let pick = indices[rng.gen_range(0..indices.len())];
    weights[pick] = rng.sample(Uniform::new(-1.0, 1.0));
}

/// Multiplies every weight at `indices` by (1 - shrink_factor).
pub fn l1_shrink(weights: &mut [f32], indices: &[usize], shrink_factor: f32) {
    for &i in indices {
        weights[i] *= 1.0 - shrink_factor;
    }
}

/// Picks a non-bias node uniformly, replaces its activation with a uniform
/// draw from its row's allowed mask, and resets its parameter block to the
/// new activation's defaults.
pub fn activation_swap(individual: &mut Individual, topology: &TopologySpec, rng: &mut impl Rng) {
    let (input_start, _) = topology.row_span(crate::topology::INPUT_ROW);
    let total_nodes = topology.total_nodes();
    if total_nodes <= input_start {
        return;
    }
    let node = rng.gen_range(input_start..total_nodes);
    let mask = topology.allowed_activations_per_row()[topology.row_of(node)];
    let activation = random_activation_from_mask(mask, rng);
    individual.set_activation(node, activation);
}

/// For a non-bias node whose activation has >= 1 parameter, adds
/// N(0, stddev) to each used parameter slot and clamps to [-10, 10].
pub fn activation_param_jitter(
    individual: &mut Individual,
    topology: &TopologySpec,
    stddev: f32,
    rng: &mut impl Rng,
) {
    let (input_start, _) = topology.row_span(crate::topology::INPUT_ROW);
    let total_nodes = topology.total_nodes();
    let candidates: Vec<usize> = (input_start..total_nodes)
        .filter(|&n| individual.activations[n].required_param_count() > 0)
        .collect();
    if candidates.is_empty() {
        return;
    }
    let node = candidates[rng.gen_range(0..candidates.len())];
    let arity = individual.activations[node].required_param_count();
    let normal = Normal::new(0.0, stddev as f64).unwrap();
    let params = individual.node_params_mut(node);
    for slot in params.iter_mut().take(arity) {
        *slot = (*slot + normal.sample(rng) as f32).clamp(-10.0, 10.0);
    }
}

/// Rolls every weight-level and activation gate from `rates` once, each
/// independently, and applies the corresponding operator to `individual`
/// when its gate fires.
///
/// Bias is realized as weights sourced at the bias node rather than a
/// separate storage array, so "weight jitter/reset/shrink" (§4.5) rolls
/// against the non-bias weights and "bias jitter/reset/shrink" rolls
/// separately, with the same rates, against `bias_weight_indices` -- two
/// independent gates over disjoint index sets rather than one doubled-up
/// pass over everything.
pub fn apply_weight_mutations(
    individual: &mut Individual,
    topology: &TopologySpec,
    rates: &MutationRates,
    rng: &mut impl Rng,
) {
    let bias_indices = bias_weight_indices(topology);
    let bias_set: std::collections::HashSet<usize> = bias_indices.iter().copied().collect();
    let non_bias_indices: Vec<usize> = (0..individual.weights.len()).filter(|i| !bias_set.contains(i)).collect();

    if rng.gen_bool(rates.weight_jitter) {
        jitter(&mut individual.weights, &non_bias_indices, rates.weight_jitter_stddev, rng);
    }
    if rng.gen_bool(rates.weight_reset) {
        reset_one(&mut individual.weights, &non_bias_indices, rng);
    }
    if rng.gen_bool(rates.weight_l1_shrink) {
        l1_shrink(&mut individual.weights, &non_bias_indices, rates.l1_shrink_factor);
    }
    if rng.gen_bool(rates.weight_jitter) {
        jitter(&mut individual.weights, &bias_indices, rates.weight_jitter_stddev, rng);
    }
    if rng.gen_bool(rates.weight_reset) {
        reset_one(&mut individual.weights, &bias_indices, rng);
    }
    if rng.gen_bool(rates.weight_l1_shrink) {
        l1_shrink(&mut individual.weights, &bias_indices, rates.l1_shrink_factor);
    }
    if rng.gen_bool(rates.activation_swap) {
        activation_swap(individual, topology, rng);
    }
    if rng.gen_bool(rates.node_param_mutate) {
        activation_param_jitter(individual, topology, rates.node_param_stddev, rng);
    }
}

#[allow(dead_code)]
const _ASSERT_PARAM_WIDTH: usize = MAX_ACTIVATION_PARAMS;
