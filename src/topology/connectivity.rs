//! Forward/backward reachability and the safe-deletion predicate.

use super::{Edge, TopologySpec};
use std::collections::{HashSet, VecDeque};

pub struct ConnectivityAnalyzer;

impl ConnectivityAnalyzer {
    /// BFS along edges starting from `seeds`. O(V + E).
    pub fn reachable_forward(edges: &[Edge], total_nodes: usize, seeds: &[usize]) -> HashSet<usize> {
        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); total_nodes];
        for e in edges {
            adjacency[e.source].push(e.destination);
        }
        Self::bfs(&adjacency, seeds)
    }

    /// BFS along reversed edges starting from `sinks`. O(V + E).
    pub fn reachable_backward(edges: &[Edge], total_nodes: usize, sinks: &[usize]) -> HashSet<usize> {
        let mut reverse_adjacency: Vec<Vec<usize>> = vec![Vec::new(); total_nodes];
        for e in edges {
            reverse_adjacency[e.destination].push(e.source);
        }
        Self::bfs(&reverse_adjacency, sinks)
    }

    fn bfs(adjacency: &[Vec<usize>], seeds: &[usize]) -> HashSet<usize> {
        let mut visited: HashSet<usize> = seeds.iter().copied().collect();
        let mut queue: VecDeque<usize> = seeds.iter().copied().collect();
        while let Some(node) = queue.pop_front() {
            for &next in &adjacency[node] {
                if visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        visited
    }

    fn input_nodes(spec: &TopologySpec) -> Vec<usize> {
        let (start, count) = spec.row_span(super::INPUT_ROW);
        (start..start + count).collect()
    }

    fn output_nodes(spec: &TopologySpec) -> Vec<usize> {
        let (start, count) = spec.row_span(spec.output_row());
        (start..start + count).collect()
    }

    /// A node is active iff it lies on at least one input -> output path.
    pub fn active_nodes(spec: &TopologySpec) -> HashSet<usize> {
        let inputs = Self::input_nodes(spec);
        let outputs = Self::output_nodes(spec);
        let forward = Self::reachable_forward(spec.edges(), spec.total_nodes(), &inputs);
        let backward = Self::reachable_backward(spec.edges(), spec.total_nodes(), &outputs);
        forward.intersection(&backward).copied().collect()
    }

    /// True iff removing `edge` leaves every output node still
    /// forward-reachable from the input row.
    pub fn can_delete_edge(spec: &TopologySpec, edge: Edge) -> bool {
        let remaining: Vec<Edge> = spec
            .edges()
            .iter()
            .copied()
            .filter(|&e| e != edge)
            .collect();
        let inputs = Self::input_nodes(spec);
        let outputs = Self::output_nodes(spec);
        let forward = Self::reachable_forward(&remaining, spec.total_nodes(), &inputs);
        outputs.iter().all(|o| forward.contains(o))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activations::{mask_from, Activation, BIAS_ROW_MASK};
    use crate::topology::TopologySpec;

    fn chain_spec() -> TopologySpec {
        // bias(0) - input(1,2) - hidden(3,4) - output(5)
        TopologySpec::new(
            vec![1, 2, 2, 1],
            vec![
                BIAS_ROW_MASK,
                Activation::Linear.bit(),
                mask_from(&[Activation::Tanh]),
                mask_from(&[Activation::Tanh]),
            ],
            4,
            vec![
                Edge::new(1, 3),
                Edge::new(3, 5),
                Edge::new(4, 5),
            ],
        )
        .unwrap()
    }

    /// Same as `chain_spec` but with a redundant skip edge 1 -> 5 so that
    /// `3 -> 5` becomes safe to delete.
    fn chain_spec_with_skip() -> TopologySpec {
        TopologySpec::new(
            vec![1, 2, 2, 1],
            vec![
                BIAS_ROW_MASK,
                Activation::Linear.bit(),
                mask_from(&[Activation::Tanh]),
                mask_from(&[Activation::Tanh]),
            ],
            4,
            vec![
                Edge::new(1, 3),
                Edge::new(3, 5),
                Edge::new(4, 5),
                Edge::new(1, 5),
            ],
        )
        .unwrap()
    }

    #[test]
    fn inactive_node_is_excluded() {
        let spec = chain_spec();
        let active = ConnectivityAnalyzer::active_nodes(&spec);
        // node 2 (second input) and node 4 (second hidden) have no path to output / from input
        assert!(!active.contains(&2));
        assert!(!active.contains(&4));
        assert!(active.contains(&1));
        assert!(active.contains(&3));
        assert!(active.contains(&5));
    }

    #[test]
    fn cannot_delete_sole_route_to_output() {
        let spec = chain_spec();
        assert!(!ConnectivityAnalyzer::can_delete_edge(&spec, Edge::new(3, 5)));
        assert!(!ConnectivityAnalyzer::can_delete_edge(&spec, Edge::new(1, 3)));
    }

    #[test]
    fn can_delete_edge_with_redundant_route() {
        let spec = chain_spec_with_skip();
        assert!(ConnectivityAnalyzer::can_delete_edge(&spec, Edge::new(3, 5)));
        assert!(ConnectivityAnalyzer::can_delete_edge(&spec, Edge::new(1, 3)));
        assert!(ConnectivityAnalyzer::can_delete_edge(&spec, Edge::new(1, 5)));
    }
}
