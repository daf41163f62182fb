//! The single explicit configuration object. Replaces the source's
//! module-level default-config pattern per the Design Notes: every run
//! passes its own `EvolutionConfig` into `initialize_population` and
//! `step_generation`, with no hidden global state.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionConfig {
    pub species_count: usize,
    pub min_species_count: usize,
    pub individuals_per_species: usize,
    pub elites: usize,
    pub tournament_size: usize,
    pub parent_pool_percentage: f64,

    pub grace_generations: u32,
    pub stagnation_threshold: u32,
    pub species_diversity_threshold: f32,
    pub relative_performance_threshold: f64,

    pub mutation_rates: MutationRates,
    pub edge_mutations: EdgeMutationRates,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationRates {
    pub weight_jitter: f64,
    pub weight_jitter_stddev: f32,
    pub weight_reset: f64,
    pub weight_l1_shrink: f64,
    pub l1_shrink_factor: f32,
    pub activation_swap: f64,
    pub node_param_mutate: f64,
    pub node_param_stddev: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeMutationRates {
    pub edge_add: f64,
    pub edge_delete_random: f64,
    pub edge_split: f64,
    pub edge_redirect: f64,
    pub edge_swap: f64,
    pub weak_edge_pruning: WeakEdgePruningConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeakEdgePruningConfig {
    pub enabled: bool,
    pub threshold: f32,
    pub base_prune_rate: f64,
    pub apply_during_evolution: bool,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            species_count: 5,
            min_species_count: 2,
            individuals_per_species: 20,
            elites: 2,
            tournament_size: 3,
            parent_pool_percentage: 0.5,
            grace_generations: 5,
            stagnation_threshold: 15,
            species_diversity_threshold: 1e-4,
            relative_performance_threshold: 0.8,
            mutation_rates: MutationRates {
                weight_jitter: 0.8,
                weight_jitter_stddev: 0.1,
                weight_reset: 0.05,
                weight_l1_shrink: 0.02,
                l1_shrink_factor: 0.05,
                activation_swap: 0.03,
                node_param_mutate: 0.1,
                node_param_stddev: 0.1,
            },
            edge_mutations: EdgeMutationRates {
                edge_add: 0.1,
                edge_delete_random: 0.05,
                edge_split: 0.03,
                edge_redirect: 0.05,
                edge_swap: 0.02,
                weak_edge_pruning: WeakEdgePruningConfig {
                    enabled: true,
                    threshold: 0.05,
                    base_prune_rate: 0.3,
                    apply_during_evolution: true,
                },
            },
        }
    }
}
