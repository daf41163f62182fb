//! A species: a shared topology, its individuals, and its rolling fitness
//! statistics (spec §3, §4.8).

use crate::config::EvolutionConfig;
use crate::individual::Individual;
use crate::topology::TopologySpec;

const FITNESS_HISTORY_LEN: usize = 10;

#[derive(Debug, Clone)]
pub struct SpeciesStats {
    pub best_fitness_ever: f32,
    pub generations_since_improvement: u32,
    pub fitness_history: Vec<f32>,
    pub median_fitness: f32,
    pub fitness_variance: f32,
}

impl Default for SpeciesStats {
    fn default() -> Self {
        Self {
            best_fitness_ever: f32::NEG_INFINITY,
            generations_since_improvement: 0,
            fitness_history: Vec::with_capacity(FITNESS_HISTORY_LEN),
            median_fitness: 0.0,
            fitness_variance: 0.0,
        }
    }
}

impl SpeciesStats {
    /// Recomputes `median_fitness`/`fitness_variance` from `fitnesses`,
    /// updates `best_fitness_ever`/`generations_since_improvement`, and
    /// pushes the new median onto the ring buffer.
    pub fn update(&mut self, fitnesses: &[f32]) {
        self.median_fitness = median(fitnesses);
        self.fitness_variance = variance(fitnesses);

        let best_this_gen = fitnesses.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        if best_this_gen > self.best_fitness_ever {
            self.best_fitness_ever = best_this_gen;
            self.generations_since_improvement = 0;
        } else {
            self.generations_since_improvement += 1;
        }

        if self.fitness_history.len() == FITNESS_HISTORY_LEN {
            self.fitness_history.remove(0);
        }
        self.fitness_history.push(self.median_fitness);
    }

    pub fn is_past_grace(&self, age: u32, grace_generations: u32) -> bool {
        age > grace_generations
    }

    pub fn is_stagnant(&self, stagnation_threshold: u32) -> bool {
        self.generations_since_improvement >= stagnation_threshold
    }

    pub fn is_low_diversity(&self, diversity_threshold: f32) -> bool {
        self.fitness_variance < diversity_threshold
    }

    /// True iff the normalized performance gap to `population_best_ever`
    /// exceeds `1 - relative_performance_threshold`. Ratio-based for
    /// non-negative `population_best_ever`, gap-based (symmetric for
    /// loss-like objectives) when it is negative.
    pub fn is_below_relative_performance(&self, population_best_ever: f32, relative_performance_threshold: f64) -> bool {
        if !population_best_ever.is_finite() {
            return false;
        }
        let cutoff = 1.0 - relative_performance_threshold;
        if population_best_ever >= 0.0 {
            if population_best_ever == 0.0 {
                return self.best_fitness_ever < 0.0;
            }
            let ratio = (self.best_fitness_ever / population_best_ever) as f64;
            ratio < cutoff
        } else {
            let gap = (population_best_ever - self.best_fitness_ever).abs() as f64;
            let scale = population_best_ever.abs() as f64;
            (gap / scale) > cutoff
        }
    }
}

fn median(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn variance(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f32>() / values.len() as f32;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / values.len() as f32
}

#[derive(Debug, Clone)]
pub struct Species {
    pub topology: TopologySpec,
    pub individuals: Vec<Individual>,
    pub age: u32,
    pub stats: SpeciesStats,
}

impl Species {
    pub fn new(topology: TopologySpec, individuals: Vec<Individual>) -> Self {
        Self {
            topology,
            individuals,
            age: 0,
            stats: SpeciesStats::default(),
        }
    }

    pub fn best_individual(&self) -> Option<&Individual> {
        self.individuals
            .iter()
            .max_by(|a, b| a.fitness.partial_cmp(&b.fitness).unwrap())
    }

    pub fn fitnesses(&self) -> Vec<f32> {
        self.individuals.iter().map(|i| i.fitness).collect()
    }

    pub fn refresh_stats(&mut self) {
        let fitnesses = self.fitnesses();
        self.stats.update(&fitnesses);
    }

    pub fn eligible_for_culling(&self, config: &EvolutionConfig, population_best_ever: f32) -> bool {
        self.stats.is_past_grace(self.age, config.grace_generations)
            && (self.stats.is_stagnant(config.stagnation_threshold)
                || self
                    .stats
                    .is_below_relative_performance(population_best_ever, config.relative_performance_threshold)
                || self.stats.is_low_diversity(config.species_diversity_threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_update_tracks_best_ever_and_resets_stagnation() {
        let mut stats = SpeciesStats::default();
        stats.update(&[1.0, 2.0, 3.0]);
        assert_eq!(stats.best_fitness_ever, 3.0);
        assert_eq!(stats.generations_since_improvement, 0);
        stats.update(&[0.0, 1.0, 2.0]);
        assert_eq!(stats.best_fitness_ever, 3.0);
        assert_eq!(stats.generations_since_improvement, 1);
    }

    #[test]
    fn fitness_history_caps_at_ten() {
        let mut stats = SpeciesStats::default();
        for i in 0..15 {
            stats.update(&[i as f32]);
        }
        assert_eq!(stats.fitness_history.len(), 10);
    }

    #[test]
    fn relative_performance_ratio_based_for_nonnegative_best() {
        let mut stats = SpeciesStats::default();
        stats.best_fitness_ever = 5.0;
        assert!(stats.is_below_relative_performance(100.0, 0.8));
        assert!(!stats.is_below_relative_performance(5.5, 0.8));
    }
}
