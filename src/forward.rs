//! The deterministic, row-synchronous forward pass.

use crate::errors::{EvoResult, EvolutionError};
use crate::individual::Individual;
use crate::topology::TopologySpec;

/// Evaluates a [`TopologySpec`] + [`Individual`] pair against an input
/// vector. Owns a reusable `node_values` scratch buffer so repeated calls
/// (one per environment tick) don't reallocate.
pub struct ForwardEvaluator {
    node_values: Vec<f32>,
}

impl ForwardEvaluator {
    pub fn new(topology: &TopologySpec) -> Self {
        Self {
            node_values: vec![0.0; topology.total_nodes()],
        }
    }

    /// Runs one forward pass and returns the output-row slice. `inputs` must
    /// have exactly the input row's node count.
    #[tracing::instrument(skip(self, topology, individual, inputs))]
    pub fn forward<'a>(
        &'a mut self,
        topology: &TopologySpec,
        individual: &Individual,
        inputs: &[f32],
    ) -> EvoResult<&'a [f32]> {
        let (input_start, input_count) = topology.row_span(crate::topology::INPUT_ROW);
        if inputs.len() != input_count {
            return Err(EvolutionError::LengthMismatch {
                expected: input_count,
                found: inputs.len(),
            });
        }
        individual.validate(topology)?;
        if self.node_values.len() != topology.total_nodes() {
            self.node_values = vec![0.0; topology.total_nodes()];
        }

        for v in self.node_values.iter_mut() {
            *v = 0.0;
        }
        self.node_values[0] = 1.0;
        self.node_values[input_start..input_start + input_count].copy_from_slice(inputs);

        for row in 2..topology.row_count() {
            let (row_start, row_count) = topology.row_span(row);
            for v in self.node_values[row_start..row_start + row_count].iter_mut() {
                *v = 0.0;
            }
            for (edge_index, edge) in topology.edges_for_row(row).iter().enumerate() {
                let global_index = topology.row_plans()[row].edge_start + edge_index;
                let contribution = individual.weights[global_index] * self.node_values[edge.source];
                self.node_values[edge.destination] += contribution;
            }
            for node in row_start..row_start + row_count {
                let activation = individual.activations[node];
                let params = individual.node_params(node);
                self.node_values[node] = activation.apply(self.node_values[node], params);
            }
        }

        let (output_start, output_count) = topology.row_span(topology.output_row());
        Ok(&self.node_values[output_start..output_start + output_count])
    }
}
