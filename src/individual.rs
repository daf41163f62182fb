//! Per-individual parameters: edge weights, per-node activation choice and
//! activation parameters, and the bookkeeping fields selection operates on.

use crate::activations::{random_activation_from_mask, Activation, MAX_ACTIVATION_PARAMS};
use crate::errors::{EvoResult, EvolutionError};
use crate::topology::TopologySpec;
use rand::distributions::Uniform;
use rand::Rng;

#[derive(Debug, Clone)]
pub struct Individual {
    /// `weights[i]` is the gain of `topology.edges()[i]`. Bias is realized
    /// as ordinary edges sourced at node 0 (the bias node), so there is no
    /// separate bias array -- see `mutation::weight` for the jitter/reset/
    /// shrink operators that act on that subset.
    pub weights: Vec<f32>,
    pub activations: Vec<Activation>,
    /// `node_params[n * MAX_ACTIVATION_PARAMS .. (n+1) * MAX_ACTIVATION_PARAMS]`
    /// is node `n`'s parameter block; only the activation's
    /// `required_param_count()` leading slots are meaningful.
    pub node_params: Vec<f32>,
    pub fitness: f32,
    pub age: u32,
}

impl Individual {
    pub fn new_random(topology: &TopologySpec, rng: &mut impl Rng) -> Self {
        let weights = topology
            .edges()
            .iter()
            .map(|e| glorot_sample(topology, e.source, e.destination, rng))
            .collect();

        let total_nodes = topology.total_nodes();
        let mut activations = Vec::with_capacity(total_nodes);
        let mut node_params = Vec::with_capacity(total_nodes * MAX_ACTIVATION_PARAMS);
        for node in 0..total_nodes {
            let row = topology.row_of(node);
            let mask = topology.allowed_activations_per_row()[row];
            let activation = random_activation_from_mask(mask, rng);
            node_params.extend_from_slice(&activation.default_params());
            activations.push(activation);
        }

        Self {
            weights,
            activations,
            node_params,
            fitness: f32::NEG_INFINITY,
            age: 0,
        }
    }

    pub fn node_params(&self, node: usize) -> &[f32] {
        let start = node * MAX_ACTIVATION_PARAMS;
        &self.node_params[start..start + MAX_ACTIVATION_PARAMS]
    }

    pub fn node_params_mut(&mut self, node: usize) -> &mut [f32] {
        let start = node * MAX_ACTIVATION_PARAMS;
        &mut self.node_params[start..start + MAX_ACTIVATION_PARAMS]
    }

    pub fn set_activation(&mut self, node: usize, activation: Activation) {
        self.activations[node] = activation;
        let params = activation.default_params();
        self.node_params_mut(node).copy_from_slice(&params);
    }

    pub(crate) fn insert_weight_slot(&mut self, index: usize, value: f32) {
        self.weights.insert(index, value);
    }

    pub(crate) fn remove_weight_slot(&mut self, index: usize) -> f32 {
        self.weights.remove(index)
    }

    /// Checks this individual's arrays against `topology`: lengths, and
    /// every node's activation against its row's allowed mask (invariant
    /// #7). `weights`/`activations`/`node_params` are public, so a caller
    /// outside this crate could hand `forward` a corrupted individual;
    /// this is the boundary check for that.
    pub fn validate(&self, topology: &TopologySpec) -> EvoResult<()> {
        if self.weights.len() != topology.edges().len() {
            return Err(EvolutionError::LengthMismatch {
                expected: topology.edges().len(),
                found: self.weights.len(),
            });
        }
        let total_nodes = topology.total_nodes();
        if self.activations.len() != total_nodes {
            return Err(EvolutionError::LengthMismatch {
                expected: total_nodes,
                found: self.activations.len(),
            });
        }
        for node in 0..total_nodes {
            if !topology.activation_allowed(node, self.activations[node]) {
                return Err(EvolutionError::ActivationNotAllowed {
                    node,
                    row: topology.row_of(node),
                });
            }
        }
        Ok(())
    }
}

/// limit = sqrt(6 / (fan_in + fan_out)); sampled from U(-limit, limit).
pub fn glorot_sample(topology: &TopologySpec, source: usize, destination: usize, rng: &mut impl Rng) -> f32 {
    let fan_in = topology.in_degree(destination).max(1) as f32;
    let fan_out = topology.out_degree(source).max(1) as f32;
    let limit = (6.0 / (fan_in + fan_out)).sqrt();
    rng.sample(Uniform::new(-limit, limit))
}
