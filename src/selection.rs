//! Tournament selection, elitism, and offspring production (spec §4.7).

use crate::config::EvolutionConfig;
use crate::individual::Individual;
use crate::mutation;
use crate::topology::TopologySpec;
use rand::Rng;

/// Ranks individuals by fitness descending, stable on ties (original
/// insertion order is preserved by a stable sort).
pub fn rank(individuals: &[Individual]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..individuals.len()).collect();
    order.sort_by(|&a, &b| {
        individuals[b]
            .fitness
            .partial_cmp(&individuals[a].fitness)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    order
}

/// The top `parent_pool_percentage * n` ranked individuals (rounded down,
/// at least one).
pub fn parent_pool(ranked: &[usize], parent_pool_percentage: f64) -> &[usize] {
    let size = ((ranked.len() as f64 * parent_pool_percentage).floor() as usize).max(1);
    &ranked[..size.min(ranked.len())]
}

/// Samples `tournament_size` indices with replacement from `pool` and
/// returns the fittest; ties favor the earlier-ranked (smaller-index-into-
/// `pool`) competitor.
pub fn tournament(
    pool: &[usize],
    individuals: &[Individual],
    tournament_size: usize,
    rng: &mut impl Rng,
) -> usize {
    let mut best_pool_index = rng.gen_range(0..pool.len());
    for _ in 1..tournament_size {
        let candidate_pool_index = rng.gen_range(0..pool.len());
        if individuals[pool[candidate_pool_index]].fitness > individuals[pool[best_pool_index]].fitness {
            best_pool_index = candidate_pool_index;
        }
    }
    pool[best_pool_index]
}

/// Produces the next generation's individual list for one species: the top
/// `elites` individuals copied verbatim, followed by
/// `individuals_per_species - elites` tournament-selected, mutated
/// children.
pub fn produce_next_generation(
    individuals: &[Individual],
    topology: &TopologySpec,
    config: &EvolutionConfig,
    rng: &mut impl Rng,
) -> Vec<Individual> {
    let ranked = rank(individuals);
    let pool = parent_pool(&ranked, config.parent_pool_percentage);

    let elite_count = config.elites.min(ranked.len());
    let mut next = Vec::with_capacity(config.individuals_per_species);
    for &idx in &ranked[..elite_count] {
        let mut elite = individuals[idx].clone();
        elite.age += 1;
        next.push(elite);
    }

    let offspring_count = config.individuals_per_species.saturating_sub(elite_count);
    for _ in 0..offspring_count {
        let winner = tournament(pool, individuals, config.tournament_size.max(1), rng);
        let mut child = individuals[winner].clone();
        child.age = 0;
        mutation::mutate_individual(&mut child, topology, &config.mutation_rates, rng);
        next.push(child);
    }

    next
}
