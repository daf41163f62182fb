//! The top-level population: species, generation counter, and the run's
//! immutable configuration (spec §3).

use crate::config::EvolutionConfig;
use crate::species::Species;

pub struct Population {
    pub species: Vec<Species>,
    pub generation: u64,
    pub total_species_created: u64,
    pub config: EvolutionConfig,
}

#[derive(Debug, Clone, Copy)]
pub struct PopulationStatistics {
    pub best: f32,
    pub mean: f32,
    pub median: f32,
    pub worst: f32,
}

impl Population {
    pub fn all_fitnesses(&self) -> Vec<f32> {
        self.species.iter().flat_map(|s| s.fitnesses()).collect()
    }

    pub fn statistics(&self) -> PopulationStatistics {
        let mut fitnesses = self.all_fitnesses();
        if fitnesses.is_empty() {
            return PopulationStatistics {
                best: f32::NEG_INFINITY,
                mean: 0.0,
                median: 0.0,
                worst: f32::NEG_INFINITY,
            };
        }
        fitnesses.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let best = *fitnesses.last().unwrap();
        let worst = fitnesses[0];
        let mean = fitnesses.iter().sum::<f32>() / fitnesses.len() as f32;
        let mid = fitnesses.len() / 2;
        let median = if fitnesses.len() % 2 == 0 {
            (fitnesses[mid - 1] + fitnesses[mid]) / 2.0
        } else {
            fitnesses[mid]
        };
        PopulationStatistics { best, mean, median, worst }
    }

    pub fn best_individual(&self) -> Option<(&crate::individual::Individual, &Species)> {
        self.species
            .iter()
            .filter_map(|s| s.best_individual().map(|i| (i, s)))
            .max_by(|(a, _), (b, _)| a.fitness.partial_cmp(&b.fitness).unwrap())
    }
}
