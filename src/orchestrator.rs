//! The deterministic one-generation-step orchestrator (spec §4.11) and the
//! `Evolver` contract (spec §6).

use crate::config::EvolutionConfig;
use crate::culler::SpeciesCuller;
use crate::diversification;
use crate::individual::Individual;
use crate::mutation;
use crate::population::{Population, PopulationStatistics};
use crate::selection;
use crate::species::Species;
use crate::topology::TopologySpec;
use rand::Rng;

pub struct Evolver;

impl Evolver {
    /// Seeds a population with `config.species_count` species, each a
    /// fresh copy of `default_topology` with `config.individuals_per_species`
    /// randomly-initialized individuals.
    pub fn initialize_population(config: EvolutionConfig, default_topology: TopologySpec, rng: &mut impl Rng) -> Population {
        let species = (0..config.species_count)
            .map(|_| {
                let topology = default_topology.clone();
                let individuals: Vec<Individual> = (0..config.individuals_per_species)
                    .map(|_| Individual::new_random(&topology, rng))
                    .collect();
                Species::new(topology, individuals)
            })
            .collect();

        Population {
            species,
            generation: 0,
            total_species_created: config.species_count as u64,
            config,
        }
    }

    /// Advances `population` by exactly one generation in place. Every
    /// individual's `fitness` must already be assigned by the
    /// `FitnessDriver` before this is called. All randomness is drawn from
    /// `rng`: the same seed plus the same fitness assignments produce
    /// bit-identical next populations.
    #[tracing::instrument(skip(population, rng))]
    pub fn step_generation(population: &mut Population, rng: &mut impl Rng) -> crate::errors::EvoResult<()> {
        for species in population.species.iter_mut() {
            species.refresh_stats();
        }

        if let Some(removed) = SpeciesCuller::cull(&mut population.species, &population.config) {
            tracing::debug!(removed_best_ever = removed.stats.best_fitness_ever, "culled species");
            let replacement = diversification::diversify(&population.species, &population.config, rng);
            population.species.push(replacement);
            population.total_species_created += 1;
        }

        for species in population.species.iter_mut() {
            let next_individuals =
                selection::produce_next_generation(&species.individuals, &species.topology, &population.config, rng);
            species.individuals = next_individuals;

            mutation::mutate_species_topology(
                &mut species.topology,
                &mut species.individuals,
                &population.config.edge_mutations,
                rng,
            )?;
        }

        population.generation += 1;
        for species in population.species.iter_mut() {
            species.age += 1;
        }

        Ok(())
    }

    pub fn best_individual(population: &Population) -> Option<(&Individual, &Species)> {
        population.best_individual()
    }

    pub fn population_statistics(population: &Population) -> PopulationStatistics {
        population.statistics()
    }
}
