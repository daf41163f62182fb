//! Weight-level and edge-topology mutation operators (spec §4.5, §4.6).

pub mod edge;
pub mod weight;

use crate::config::EdgeMutationRates;
use crate::errors::EvoResult;
use crate::individual::Individual;
use crate::topology::TopologySpec;
use rand::Rng;

/// Applies every weight/activation mutation gate to one child individual.
pub fn mutate_individual(
    individual: &mut Individual,
    topology: &TopologySpec,
    rates: &crate::config::MutationRates,
    rng: &mut impl Rng,
) {
    weight::apply_weight_mutations(individual, topology, rates, rng);
}

/// Rolls every edge-topology mutation gate once for the species (these
/// mutate the shared topology, so they fire per-species, not per-child).
/// A species-level weak-edge-prune pass runs at its own configured rate.
pub fn mutate_species_topology(
    topology: &mut TopologySpec,
    individuals: &mut [Individual],
    rates: &EdgeMutationRates,
    rng: &mut impl Rng,
) -> EvoResult<()> {
    if rng.gen_bool(rates.edge_add) {
        edge::edge_add(topology, individuals, rng)?;
    }
    if rng.gen_bool(rates.edge_delete_random) {
        edge::edge_delete_random(topology, individuals, rng)?;
    }
    if rng.gen_bool(rates.edge_split) {
        // The configuration surface carries one rate for both split
        // variants; split-smart is attempted half the time and falls back
        // to a plain split when no safe inactive intermediate exists.
        if rng.gen_bool(0.5) {
            if !edge::edge_split_smart(topology, individuals, rng)? {
                edge::edge_split(topology, individuals, rng)?;
            }
        } else {
            edge::edge_split(topology, individuals, rng)?;
        }
    }
    if rng.gen_bool(rates.edge_redirect) {
        edge::edge_redirect(topology, individuals, rng)?;
    }
    if rng.gen_bool(rates.edge_swap) {
        edge::edge_swap(topology, individuals, rng)?;
    }
    if rates.weak_edge_pruning.apply_during_evolution {
        edge::weak_edge_prune(topology, individuals, &rates.weak_edge_pruning, rng)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activations::{mask_from, Activation, BIAS_ROW_MASK};
    use crate::config::WeakEdgePruningConfig;
    use crate::individual::Individual;
    use crate::topology::{Edge, TopologySpec};

    #[test]
    fn cloned_topology_is_unchanged_by_an_all_zero_mutation_pass() {
        let topology = TopologySpec::new(
            vec![1, 2, 3, 1],
            vec![
                BIAS_ROW_MASK,
                Activation::Linear.bit(),
                mask_from(&[Activation::Tanh]),
                mask_from(&[Activation::Tanh]),
            ],
            8,
            vec![
                Edge::new(1, 3),
                Edge::new(2, 4),
                Edge::new(0, 3),
                Edge::new(3, 6),
                Edge::new(4, 6),
                Edge::new(5, 6),
            ],
        )
        .unwrap();
        let mut rng = rand::thread_rng();
        let mut individuals: Vec<Individual> = (0..4).map(|_| Individual::new_random(&topology, &mut rng)).collect();

        let before = topology.clone();
        let mut after = topology;
        let rates = EdgeMutationRates {
            edge_add: 0.0,
            edge_delete_random: 0.0,
            edge_split: 0.0,
            edge_redirect: 0.0,
            edge_swap: 0.0,
            weak_edge_pruning: WeakEdgePruningConfig {
                enabled: false,
                threshold: 0.0,
                base_prune_rate: 0.0,
                apply_during_evolution: false,
            },
        };
        mutate_species_topology(&mut after, &mut individuals, &rates, &mut rng).unwrap();

        assert_eq!(before.row_counts(), after.row_counts());
        assert_eq!(before.allowed_activations_per_row(), after.allowed_activations_per_row());
        assert_eq!(before.max_in_degree(), after.max_in_degree());
        assert_eq!(before.edges(), after.edges());
    }
}
