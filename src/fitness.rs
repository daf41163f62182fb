//! Runs each individual's episode against an [`Environment`] and writes its
//! fitness back (spec §4.12). The only concurrency the core permits: with
//! the `rayon` feature, individuals in a species evaluate in parallel, each
//! worker owning its own environment and forward-pass scratch buffer.

use crate::environment::Environment;
use crate::errors::{EvoResult, EvolutionError};
use crate::forward::ForwardEvaluator;
use crate::individual::Individual;
use crate::topology::TopologySpec;

/// Fitness assigned to an individual whose forward pass produced a NaN or
/// infinite output. Strong enough that selection never favors it.
pub const DEGENERATE_FITNESS: f32 = -1000.0;

pub struct FitnessDriver;

impl FitnessDriver {
    /// Evaluates every individual in `individuals` against a fresh
    /// environment instance per individual, writing `fitness` back in
    /// place. `make_environment` must return an independently-seedable
    /// environment so parallel workers never share mutable state.
    #[tracing::instrument(skip(individuals, topology, make_environment))]
    pub fn evaluate_species<E: Environment + Send>(
        individuals: &mut [Individual],
        topology: &TopologySpec,
        generation: u64,
        make_environment: impl Fn() -> E + Sync,
    ) -> EvoResult<()> {
        #[cfg(feature = "rayon")]
        {
            use rayon::prelude::*;
            let results: Vec<EvoResult<f32>> = individuals
                .par_iter()
                .map(|individual| {
                    let mut evaluator = ForwardEvaluator::new(topology);
                    let mut env = make_environment();
                    run_episode_with(&mut evaluator, individual, topology, generation, &mut env)
                })
                .collect();
            for (individual, result) in individuals.iter_mut().zip(results) {
                individual.fitness = result?;
            }
            Ok(())
        }
        #[cfg(not(feature = "rayon"))]
        {
            let mut evaluator = ForwardEvaluator::new(topology);
            for individual in individuals.iter_mut() {
                let mut env = make_environment();
                individual.fitness = run_episode_with(&mut evaluator, individual, topology, generation, &mut env)?;
            }
            Ok(())
        }
    }
}

fn run_episode_with<E: Environment>(
    evaluator: &mut ForwardEvaluator,
    individual: &Individual,
    topology: &TopologySpec,
    generation: u64,
    environment: &mut E,
) -> EvoResult<f32> {
    environment
        .reset(generation)
        .map_err(EvolutionError::Other)?;

    let input_count = environment.input_count();
    let (_, topology_input_count) = topology.row_span(crate::topology::INPUT_ROW);
    if input_count != topology_input_count {
        return Err(EvolutionError::EnvironmentContract(format!(
            "environment input_count {} does not match topology input row size {}",
            input_count, topology_input_count
        )));
    }

    let mut observation = vec![0.0f32; input_count];
    let mut cumulative_reward = 0.0f32;
    let mut steps = 0;

    while !environment.is_terminal() && steps < environment.max_steps() {
        environment
            .observations(&mut observation)
            .map_err(EvolutionError::Other)?;
        let output = evaluator.forward(topology, individual, &observation)?;
        if output.len() != environment.output_count() {
            return Err(EvolutionError::EnvironmentContract(format!(
                "topology output row size {} does not match environment output_count {}",
                output.len(),
                environment.output_count()
            )));
        }
        if output.iter().any(|v| !v.is_finite()) {
            return Ok(DEGENERATE_FITNESS);
        }
        let actions = output.to_vec();
        let reward = environment.step(&actions).map_err(EvolutionError::Other)?;
        if !reward.is_finite() {
            return Ok(DEGENERATE_FITNESS);
        }
        cumulative_reward += reward;
        steps += 1;
    }

    let fitness = environment.final_fitness().unwrap_or(cumulative_reward);
    if fitness.is_finite() {
        Ok(fitness)
    } else {
        Ok(DEGENERATE_FITNESS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activations::{mask_from, Activation, BIAS_ROW_MASK};
    use crate::topology::{Edge, TopologySpec};

    struct CountdownEnv {
        ticks_left: u32,
    }

    impl Environment for CountdownEnv {
        fn input_count(&self) -> usize {
            1
        }
        fn output_count(&self) -> usize {
            1
        }
        fn max_steps(&self) -> usize {
            100
        }
        fn reset(&mut self, _seed: u64) -> anyhow::Result<()> {
            self.ticks_left = 3;
            Ok(())
        }
        fn observations(&self, buffer: &mut [f32]) -> anyhow::Result<()> {
            buffer[0] = self.ticks_left as f32;
            Ok(())
        }
        fn step(&mut self, _actions: &[f32]) -> anyhow::Result<f32> {
            self.ticks_left -= 1;
            Ok(1.0)
        }
        fn is_terminal(&self) -> bool {
            self.ticks_left == 0
        }
    }

    fn topology() -> TopologySpec {
        TopologySpec::new(
            vec![1, 1, 1],
            vec![BIAS_ROW_MASK, Activation::Linear.bit(), mask_from(&[Activation::Linear])],
            4,
            vec![Edge::new(1, 2)],
        )
        .unwrap()
    }

    #[test]
    fn cumulative_reward_matches_step_count() {
        let topology = topology();
        let mut evaluator = ForwardEvaluator::new(&topology);
        let individual = Individual::new_random(&topology, &mut rand::thread_rng());
        let mut env = CountdownEnv { ticks_left: 0 };
        let fitness = run_episode_with(&mut evaluator, &individual, &topology, 0, &mut env).unwrap();
        assert_eq!(fitness, 3.0);
    }

    #[test]
    fn nan_forward_output_collapses_to_degenerate_fitness_even_with_finite_reward() {
        let topology = topology();
        let mut evaluator = ForwardEvaluator::new(&topology);
        let mut individual = Individual::new_random(&topology, &mut rand::thread_rng());
        individual.weights[0] = f32::NAN;
        let mut env = CountdownEnv { ticks_left: 0 };
        let fitness = run_episode_with(&mut evaluator, &individual, &topology, 0, &mut env).unwrap();
        assert_eq!(fitness, DEGENERATE_FITNESS);
    }
}
