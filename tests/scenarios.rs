//! Cross-module end-to-end scenarios from the testable-properties section:
//! culling exemption, orchestrator determinism, and the topology-builder
//! contract driving a full generation step.

use rand::SeedableRng;
use speciate::activations::Activation;
use speciate::culler::SpeciesCuller;
use speciate::orchestrator::Evolver;
use speciate::topology::TopologyBuilder;
use speciate::EvolutionConfig;

fn five_species_config() -> EvolutionConfig {
    EvolutionConfig {
        species_count: 5,
        min_species_count: 2,
        individuals_per_species: 6,
        elites: 1,
        tournament_size: 2,
        grace_generations: 0,
        stagnation_threshold: 0,
        species_diversity_threshold: 1e9,
        relative_performance_threshold: 0.0,
        ..EvolutionConfig::default()
    }
}

#[test]
fn scenario_five_culling_exempts_the_species_with_the_global_best() {
    let topology = TopologyBuilder::new()
        .input_row(2)
        .hidden_row(3, &[Activation::Tanh])
        .output_row(1, &[Activation::Tanh])
        .max_in_degree(8)
        .dense_edges()
        .build()
        .unwrap();

    let config = five_species_config();
    let mut rng = rand::rngs::StdRng::seed_from_u64(11);
    let mut population = Evolver::initialize_population(config, topology, &mut rng);

    for (species_index, species) in population.species.iter_mut().enumerate() {
        species.age = 1; // past the zero-generation grace period
        for ind in species.individuals.iter_mut() {
            ind.fitness = 1.0;
        }
        species.refresh_stats();
        species.stats.generations_since_improvement = 100;
        species.stats.fitness_variance = 0.0;
        species.stats.best_fitness_ever = 1.0;
        if species_index == 2 {
            species.individuals[0].fitness = 1000.0;
            species.stats.best_fitness_ever = 1000.0;
        }
    }

    let removed = SpeciesCuller::cull(&mut population.species, &population.config);
    assert!(removed.is_some());
    assert_eq!(population.species.len(), 4);
    assert!(population
        .species
        .iter()
        .any(|s| s.best_individual().map(|i| i.fitness) == Some(1000.0)));
}

#[test]
fn builder_driven_population_survives_many_generations() {
    let topology = TopologyBuilder::new()
        .input_row(3)
        .hidden_row(4, &[Activation::Tanh, Activation::ReLU])
        .hidden_row(3, &[Activation::Sigmoid])
        .output_row(2, &[Activation::Linear])
        .max_in_degree(6)
        .dense_edges()
        .build()
        .unwrap();

    let config = EvolutionConfig {
        species_count: 3,
        min_species_count: 1,
        individuals_per_species: 8,
        elites: 2,
        tournament_size: 3,
        ..EvolutionConfig::default()
    };

    let mut rng = rand::rngs::StdRng::seed_from_u64(99);
    let mut population = Evolver::initialize_population(config, topology, &mut rng);

    for generation in 0..20usize {
        for species in population.species.iter_mut() {
            for (i, ind) in species.individuals.iter_mut().enumerate() {
                ind.fitness = (generation * 7 + i) as f32;
            }
        }
        Evolver::step_generation(&mut population, &mut rng).unwrap();

        for species in &population.species {
            for individual in &species.individuals {
                assert_eq!(individual.weights.len(), species.topology.edges().len());
                assert_eq!(individual.activations.len(), species.topology.total_nodes());
                for edge in species.topology.edges() {
                    assert!(species.topology.row_of(edge.source) < species.topology.row_of(edge.destination));
                    assert!(species.topology.in_degree(edge.destination) <= species.topology.max_in_degree());
                }
            }
        }
    }

    assert_eq!(population.generation, 20);
}

#[test]
fn instrumented_step_runs_under_a_tracing_subscriber() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("speciate=debug")
        .try_init();

    let topology = TopologyBuilder::new()
        .input_row(2)
        .hidden_row(3, &[Activation::Tanh])
        .output_row(1, &[Activation::Tanh])
        .max_in_degree(8)
        .dense_edges()
        .build()
        .unwrap();

    let config = EvolutionConfig {
        species_count: 2,
        min_species_count: 1,
        individuals_per_species: 4,
        elites: 1,
        tournament_size: 2,
        ..EvolutionConfig::default()
    };
    let mut rng = rand::rngs::StdRng::seed_from_u64(3);
    let mut population = Evolver::initialize_population(config, topology, &mut rng);
    for species in population.species.iter_mut() {
        for (i, ind) in species.individuals.iter_mut().enumerate() {
            ind.fitness = i as f32;
        }
    }
    Evolver::step_generation(&mut population, &mut rng).unwrap();
    assert_eq!(population.generation, 1);
}
