//! Adaptive NEAT-style species culling (spec §4.9).

use crate::config::EvolutionConfig;
use crate::species::Species;

pub struct SpeciesCuller;

impl SpeciesCuller {
    /// Returns the index of the species to remove, or `None` if no species
    /// should be culled this generation. At most one removal per call.
    pub fn select_victim(species: &[Species], config: &EvolutionConfig) -> Option<usize> {
        if species.len() <= config.min_species_count {
            return None;
        }

        let exempt = exempt_species_index(species)?;
        let population_best_ever = species
            .iter()
            .map(|s| s.stats.best_fitness_ever)
            .fold(f32::NEG_INFINITY, f32::max);

        let eligible: Vec<usize> = species
            .iter()
            .enumerate()
            .filter(|&(i, s)| i != exempt && s.eligible_for_culling(config, population_best_ever))
            .map(|(i, _)| i)
            .collect();

        if eligible.is_empty() || species.len() - 1 < config.min_species_count {
            return None;
        }

        eligible
            .into_iter()
            .min_by(|&a, &b| {
                species[a]
                    .stats
                    .best_fitness_ever
                    .partial_cmp(&species[b].stats.best_fitness_ever)
                    .unwrap()
            })
    }
}

impl SpeciesCuller {
    /// Removes and returns the victim species chosen by
    /// [`SpeciesCuller::select_victim`], shrinking `species` by one. The
    /// caller (the orchestrator) is responsible for pushing
    /// `Diversification`'s replacement back on to restore the population's
    /// species count.
    pub fn cull(species: &mut Vec<Species>, config: &EvolutionConfig) -> Option<Species> {
        let victim = Self::select_victim(species, config)?;
        Some(species.remove(victim))
    }
}

fn exempt_species_index(species: &[Species]) -> Option<usize> {
    species
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| {
            let a_best = a.best_individual().map(|i| i.fitness).unwrap_or(f32::NEG_INFINITY);
            let b_best = b.best_individual().map(|i| i.fitness).unwrap_or(f32::NEG_INFINITY);
            a_best.partial_cmp(&b_best).unwrap()
        })
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activations::{mask_from, Activation, BIAS_ROW_MASK};
    use crate::individual::Individual;
    use crate::topology::{Edge, TopologySpec};

    fn small_topology() -> TopologySpec {
        TopologySpec::new(
            vec![1, 1, 1],
            vec![BIAS_ROW_MASK, Activation::Linear.bit(), mask_from(&[Activation::Tanh])],
            4,
            vec![Edge::new(1, 2)],
        )
        .unwrap()
    }

    fn species_with_fitness(fitness: f32, age: u32) -> Species {
        let topology = small_topology();
        let mut rng = rand::thread_rng();
        let mut ind = Individual::new_random(&topology, &mut rng);
        ind.fitness = fitness;
        let mut species = Species::new(topology, vec![ind]);
        species.age = age;
        species.stats.best_fitness_ever = fitness;
        species.stats.generations_since_improvement = 100;
        species.stats.fitness_variance = 0.0;
        species
    }

    #[test]
    fn exempts_species_containing_global_best() {
        let config = EvolutionConfig {
            min_species_count: 1,
            grace_generations: 0,
            stagnation_threshold: 1,
            ..EvolutionConfig::default()
        };
        let species = vec![
            species_with_fitness(1.0, 10),
            species_with_fitness(2.0, 10),
            species_with_fitness(100.0, 10),
        ];
        let victim = SpeciesCuller::select_victim(&species, &config);
        assert_ne!(victim, Some(2));
        assert_eq!(victim, Some(0));
    }

    #[test]
    fn respects_min_species_count() {
        let config = EvolutionConfig {
            min_species_count: 3,
            grace_generations: 0,
            stagnation_threshold: 1,
            ..EvolutionConfig::default()
        };
        let species = vec![
            species_with_fitness(1.0, 10),
            species_with_fitness(2.0, 10),
            species_with_fitness(100.0, 10),
        ];
        assert_eq!(SpeciesCuller::select_victim(&species, &config), None);
    }
}
