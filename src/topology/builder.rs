//! Fluent construction of a [`TopologySpec`].

use super::{Edge, TopologySpec, BIAS_ROW_MASK};
use crate::activations::{mask_from, Activation, ActivationMask, OUTPUT_ROW_MASK};
use crate::errors::{EvoResult, EvolutionError};
use rand::Rng;

pub struct TopologyBuilder {
    row_counts: Vec<usize>,
    allowed: Vec<ActivationMask>,
    max_in_degree: usize,
    edges: Vec<Edge>,
}

impl Default for TopologyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TopologyBuilder {
    /// Seeds the builder with the mandatory bias row (row 0).
    pub fn new() -> Self {
        Self {
            row_counts: vec![1],
            allowed: vec![BIAS_ROW_MASK],
            max_in_degree: 8,
            edges: Vec::new(),
        }
    }

    pub fn input_row(mut self, count: usize) -> Self {
        self.row_counts.push(count);
        self.allowed.push(Activation::Linear.bit());
        self
    }

    pub fn hidden_row(mut self, count: usize, allowed: &[Activation]) -> Self {
        self.row_counts.push(count);
        self.allowed.push(mask_from(allowed));
        self
    }

    pub fn output_row(mut self, count: usize, allowed: &[Activation]) -> Self {
        let mask = mask_from(allowed);
        debug_assert!(
            mask & !OUTPUT_ROW_MASK == 0,
            "output row activations must be a subset of {{Linear, Tanh}}"
        );
        self.row_counts.push(count);
        self.allowed.push(mask);
        self
    }

    pub fn max_in_degree(mut self, cap: usize) -> Self {
        self.max_in_degree = cap;
        self
    }

    fn row_span(&self, row: usize) -> (usize, usize) {
        let start: usize = self.row_counts[..row].iter().sum();
        (start, self.row_counts[row])
    }

    fn connect_rows_dense(&mut self, from_row: usize, to_row: usize) {
        let (from_start, from_count) = self.row_span(from_row);
        let (to_start, to_count) = self.row_span(to_row);
        for s in from_start..from_start + from_count {
            for d in to_start..to_start + to_count {
                self.edges.push(Edge::new(s, d));
            }
        }
    }

    /// Wires every adjacent non-bias row pair fully, plus a single bias edge
    /// from the bias node into every computed row (every row but the bias
    /// and input rows, since input values are copied rather than
    /// accumulated).
    pub fn dense_edges(mut self) -> Self {
        let last = self.row_counts.len() - 1;
        for r in 1..last {
            self.connect_rows_dense(r, r + 1);
        }
        for r in 2..=last {
            self.connect_rows_dense(0, r);
        }
        self
    }

    /// Wires edges between earlier and later rows (skip connections
    /// included) independently at random with probability `p`, respecting
    /// `max_in_degree` as generation proceeds.
    pub fn sparse_edges(mut self, probability: f64, rng: &mut impl Rng) -> Self {
        let total_rows = self.row_counts.len();
        let total_nodes: usize = self.row_counts.iter().sum();
        let mut in_degree = vec![0usize; total_nodes];
        for to_row in 1..total_rows {
            let (to_start, to_count) = self.row_span(to_row);
            for d in to_start..to_start + to_count {
                if in_degree[d] >= self.max_in_degree {
                    continue;
                }
                for from_row in 0..to_row {
                    let (from_start, from_count) = self.row_span(from_row);
                    for s in from_start..from_start + from_count {
                        if in_degree[d] >= self.max_in_degree {
                            break;
                        }
                        if rng.gen_bool(probability) {
                            self.edges.push(Edge::new(s, d));
                            in_degree[d] += 1;
                        }
                    }
                }
            }
        }
        self
    }

    pub fn explicit_edges(mut self, edges: Vec<Edge>) -> Self {
        self.edges = edges;
        self
    }

    pub fn build(self) -> EvoResult<TopologySpec> {
        if self.row_counts.len() < 3 {
            return Err(EvolutionError::InvalidTopology(
                "a topology needs at least a bias row, an input row, and an output row".into(),
            ));
        }
        TopologySpec::new(self.row_counts, self.allowed, self.max_in_degree, self.edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dense_topology_matches_expected_edge_counts() {
        let spec = TopologyBuilder::new()
            .input_row(2)
            .hidden_row(4, &[Activation::Tanh])
            .output_row(1, &[Activation::Tanh])
            .max_in_degree(12)
            .dense_edges()
            .build()
            .unwrap();
        // input(2) -> hidden(4): 8, hidden(4) -> output(1): 4, bias -> hidden: 4, bias -> output: 1
        assert_eq!(spec.edges().len(), 8 + 4 + 4 + 1);
    }

    #[test]
    fn sparse_topology_respects_in_degree_cap() {
        use rand::SeedableRng;
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let spec = TopologyBuilder::new()
            .input_row(3)
            .hidden_row(5, &[Activation::Tanh])
            .output_row(1, &[Activation::Linear])
            .max_in_degree(2)
            .sparse_edges(0.9, &mut rng)
            .build()
            .unwrap();
        for node in 0..spec.total_nodes() {
            assert!(spec.in_degree(node) <= 2);
        }
    }
}
