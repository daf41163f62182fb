//! Topology representation and row-plan compilation.
//!
//! A [`TopologySpec`] is a layered, acyclic edge list: every edge must run
//! from an earlier row to a later row, which makes the graph trivially
//! acyclic without an explicit cycle check. Row 0 always holds the single
//! bias node, row 1 is the input row, and the last row is the output row.

pub mod builder;
pub mod connectivity;

use crate::activations::{Activation, ActivationMask, BIAS_ROW_MASK, OUTPUT_ROW_MASK};
use crate::errors::{EvoResult, EvolutionError};
use crate::individual::Individual;

pub use builder::TopologyBuilder;
pub use connectivity::ConnectivityAnalyzer;

pub const BIAS_ROW: usize = 0;
pub const INPUT_ROW: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub source: usize,
    pub destination: usize,
}

impl Edge {
    pub fn new(source: usize, destination: usize) -> Self {
        Self { source, destination }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RowPlan {
    pub node_start: usize,
    pub node_count: usize,
    pub edge_start: usize,
    pub edge_count: usize,
}

#[derive(Debug, Clone)]
pub struct TopologySpec {
    row_counts: Vec<usize>,
    allowed_activations_per_row: Vec<ActivationMask>,
    max_in_degree: usize,
    edges: Vec<Edge>,
    row_plans: Vec<RowPlan>,
    node_row: Vec<usize>,
}

impl TopologySpec {
    /// Builds and validates a spec from raw parts. Edges need not already be
    /// sorted; this sorts them once and computes row plans from scratch.
    pub fn new(
        row_counts: Vec<usize>,
        allowed_activations_per_row: Vec<ActivationMask>,
        max_in_degree: usize,
        edges: Vec<Edge>,
    ) -> EvoResult<Self> {
        let mut spec = Self {
            row_counts,
            allowed_activations_per_row,
            max_in_degree,
            edges,
            row_plans: Vec::new(),
            node_row: Vec::new(),
        };
        spec.sort_edges_in_place();
        spec.rebuild_row_plans();
        spec.validate()?;
        Ok(spec)
    }

    pub fn row_counts(&self) -> &[usize] {
        &self.row_counts
    }

    pub fn allowed_activations_per_row(&self) -> &[ActivationMask] {
        &self.allowed_activations_per_row
    }

    pub fn max_in_degree(&self) -> usize {
        self.max_in_degree
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn row_plans(&self) -> &[RowPlan] {
        &self.row_plans
    }

    pub fn total_nodes(&self) -> usize {
        self.row_counts.iter().sum()
    }

    pub fn row_count(&self) -> usize {
        self.row_counts.len()
    }

    pub fn output_row(&self) -> usize {
        self.row_counts.len() - 1
    }

    pub fn row_of(&self, node: usize) -> usize {
        self.node_row[node]
    }

    pub fn row_span(&self, row: usize) -> (usize, usize) {
        let plan = self.row_plans[row];
        (plan.node_start, plan.node_count)
    }

    pub fn edges_for_row(&self, row: usize) -> &[Edge] {
        let plan = self.row_plans[row];
        &self.edges[plan.edge_start..plan.edge_start + plan.edge_count]
    }

    pub fn in_degree(&self, node: usize) -> usize {
        self.edges.iter().filter(|e| e.destination == node).count()
    }

    pub fn out_degree(&self, node: usize) -> usize {
        self.edges.iter().filter(|e| e.source == node).count()
    }

    /// Counts parallel edges between an exact (source, destination) pair.
    pub fn parallel_count(&self, source: usize, destination: usize) -> usize {
        self.edges
            .iter()
            .filter(|e| e.source == source && e.destination == destination)
            .count()
    }

    fn compute_node_row(row_counts: &[usize]) -> Vec<usize> {
        let mut node_row = Vec::with_capacity(row_counts.iter().sum());
        for (r, &count) in row_counts.iter().enumerate() {
            node_row.extend(std::iter::repeat(r).take(count));
        }
        node_row
    }

    fn sort_edges_in_place(&mut self) {
        let node_row = Self::compute_node_row(&self.row_counts);
        let mut indexed: Vec<(usize, Edge)> = self.edges.iter().copied().enumerate().collect();
        indexed.sort_by_key(|&(orig_idx, e)| (node_row[e.destination], e.destination, orig_idx));
        self.edges = indexed.into_iter().map(|(_, e)| e).collect();
        self.node_row = node_row;
    }

    fn rebuild_row_plans(&mut self) {
        if self.node_row.len() != self.total_nodes() {
            self.node_row = Self::compute_node_row(&self.row_counts);
        }
        let mut row_plans = Vec::with_capacity(self.row_counts.len());
        let mut node_start = 0;
        for &count in &self.row_counts {
            row_plans.push(RowPlan {
                node_start,
                node_count: count,
                edge_start: 0,
                edge_count: 0,
            });
            node_start += count;
        }
        let mut pos = 0;
        for (r, plan) in row_plans.iter_mut().enumerate() {
            plan.edge_start = pos;
            let mut count = 0;
            while pos < self.edges.len() && self.node_row[self.edges[pos].destination] == r {
                count += 1;
                pos += 1;
            }
            plan.edge_count = count;
        }
        self.row_plans = row_plans;
    }

    /// Re-sorts the edge list by `(destination_row, destination_node)`,
    /// permutes every individual's weight vector to match, and rebuilds the
    /// row plans. Must be called after any mutation that touches `edges` or
    /// `row_counts`.
    pub(crate) fn recompile(&mut self, individuals: &mut [Individual]) -> EvoResult<()> {
        let node_row = Self::compute_node_row(&self.row_counts);
        let mut indexed: Vec<(usize, Edge)> = self.edges.iter().copied().enumerate().collect();
        indexed.sort_by_key(|&(orig_idx, e)| (node_row[e.destination], e.destination, orig_idx));
        let perm: Vec<usize> = indexed.iter().map(|&(orig_idx, _)| orig_idx).collect();
        self.edges = indexed.into_iter().map(|(_, e)| e).collect();
        self.node_row = node_row;

        for individual in individuals.iter_mut() {
            if individual.weights.len() != perm.len() {
                return Err(EvolutionError::LengthMismatch {
                    expected: perm.len(),
                    found: individual.weights.len(),
                });
            }
            individual.weights = perm.iter().map(|&old| individual.weights[old]).collect();
        }

        self.rebuild_row_plans();
        self.validate()
    }

    /// Validates every invariant from the data model. Runs on build and
    /// after every mutation.
    pub fn validate(&self) -> EvoResult<()> {
        if self.row_counts.len() < 2 {
            return Err(EvolutionError::InvalidTopology(
                "topology must have at least a bias row and an output row".into(),
            ));
        }
        if self.row_counts[BIAS_ROW] != 1 {
            return Err(EvolutionError::InvalidTopology(
                "bias row must contain exactly one node".into(),
            ));
        }
        if self.row_counts.iter().any(|&c| c == 0) {
            return Err(EvolutionError::InvalidTopology(
                "every row must have at least one node".into(),
            ));
        }
        if self.allowed_activations_per_row.len() != self.row_counts.len() {
            return Err(EvolutionError::InvalidTopology(
                "allowed_activations_per_row must align with row_counts".into(),
            ));
        }
        if self.allowed_activations_per_row[BIAS_ROW] != BIAS_ROW_MASK {
            return Err(EvolutionError::InvalidTopology(
                "bias row mask must be {Linear}".into(),
            ));
        }
        if self.allowed_activations_per_row[self.output_row()] & !OUTPUT_ROW_MASK != 0 {
            return Err(EvolutionError::InvalidTopology(
                "output row mask must be a subset of {Linear, Tanh}".into(),
            ));
        }
        if self.allowed_activations_per_row.iter().any(|&m| m == 0) {
            return Err(EvolutionError::InvalidTopology(
                "no row may have an empty allowed-activation mask".into(),
            ));
        }
        if self.max_in_degree == 0 {
            return Err(EvolutionError::InvalidTopology(
                "max_in_degree must be positive".into(),
            ));
        }

        let total_nodes = self.total_nodes();
        for edge in &self.edges {
            if edge.source >= total_nodes || edge.destination >= total_nodes {
                return Err(EvolutionError::EdgeOutOfRange(format!(
                    "{} -> {} (total nodes {})",
                    edge.source, edge.destination, total_nodes
                )));
            }
            let source_row = self.node_row[edge.source];
            let dest_row = self.node_row[edge.destination];
            if source_row >= dest_row {
                return Err(EvolutionError::NotLayered {
                    src_node: edge.source,
                    destination: edge.destination,
                });
            }
        }

        use std::collections::HashMap;
        let mut pair_counts: HashMap<(usize, usize), usize> = HashMap::new();
        let mut in_degrees = vec![0usize; total_nodes];
        for edge in &self.edges {
            in_degrees[edge.destination] += 1;
            let count = pair_counts.entry((edge.source, edge.destination)).or_insert(0);
            *count += 1;
            if *count > 2 {
                return Err(EvolutionError::ParallelEdgeOverflow {
                    src_node: edge.source,
                    destination: edge.destination,
                });
            }
        }
        for (node, &degree) in in_degrees.iter().enumerate() {
            if degree > self.max_in_degree {
                return Err(EvolutionError::InDegreeExceeded {
                    node,
                    cap: self.max_in_degree,
                });
            }
        }

        for (r, plan) in self.row_plans.iter().enumerate() {
            let expected_count = self.edges[plan.edge_start..plan.edge_start + plan.edge_count]
                .iter()
                .filter(|e| self.node_row[e.destination] == r)
                .count();
            if expected_count != plan.edge_count {
                return Err(EvolutionError::InvalidTopology(format!(
                    "row plan for row {} is inconsistent with the edge list",
                    r
                )));
            }
        }

        Ok(())
    }

    /// Checks that a node's chosen activation is permitted by its row's mask.
    pub fn activation_allowed(&self, node: usize, activation: Activation) -> bool {
        let row = self.row_of(node);
        self.allowed_activations_per_row[row] & activation.bit() != 0
    }

    /// Mutable access to the raw edge list for in-place edits (redirect,
    /// swap). Callers must follow up with [`TopologySpec::recompile`].
    pub(crate) fn edges_mut(&mut self) -> &mut Vec<Edge> {
        &mut self.edges
    }

    /// Appends a new edge with no matching weight slot yet. Callers must
    /// push a weight onto every individual's `weights` (same index, the new
    /// last slot) before calling [`TopologySpec::recompile`].
    pub(crate) fn push_edge(&mut self, edge: Edge) {
        self.edges.push(edge);
    }

    /// Removes the edge (and its weight slot in every individual) at a
    /// known index without re-sorting -- valid only when the edge list
    /// stays sorted by `(destination_row, destination_node)` after the
    /// removal, which a plain deletion by index always preserves.
    pub(crate) fn remove_edge_raw(&mut self, index: usize, individuals: &mut [Individual]) {
        self.edges.remove(index);
        for individual in individuals.iter_mut() {
            individual.remove_weight_slot(index);
        }
    }

    /// Rebuilds row plans and validates without re-sorting or permuting
    /// weights. Used after a batch of `remove_edge_raw` calls.
    pub(crate) fn rebuild_and_validate(&mut self) -> EvoResult<()> {
        self.rebuild_row_plans();
        self.validate()
    }
}
