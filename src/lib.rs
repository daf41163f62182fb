//! An evolutionary search engine for fixed-structure, layered, acyclic
//! neural networks: topology representation and row-plan compilation,
//! per-individual parameters, a deterministic forward-pass evaluator,
//! weight/edge mutation operators, tournament/elitism selection, species
//! statistics and adaptive culling, species diversification, and the
//! one-generation-step orchestrator.

pub mod activations;
pub mod config;
pub mod culler;
pub mod diversification;
pub mod environment;
pub mod errors;
pub mod fitness;
pub mod forward;
pub mod individual;
pub mod mutation;
pub mod orchestrator;
pub mod population;
pub mod selection;
pub mod species;
pub mod topology;

pub use config::EvolutionConfig;
pub use environment::Environment;
pub use errors::{EvoResult, EvolutionError};
pub use forward::ForwardEvaluator;
pub use individual::Individual;
pub use orchestrator::Evolver;
pub use population::Population;
pub use species::Species;
pub use topology::{TopologyBuilder, TopologySpec};
