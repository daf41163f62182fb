use thiserror::Error;

/// Errors surfaced by the core. Invariant violations and contract misuse are
/// hard errors that abort the current operation; mutation impossibility and
/// numerical degeneracy are never represented here because they are absorbed
/// silently by their respective callers (`EdgeMutations` return `bool`,
/// `FitnessDriver` clamps to a sentinel fitness instead of erroring).
#[derive(Error, Debug)]
pub enum EvolutionError {
    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    #[error("length mismatch: expected {expected}, found {found}")]
    LengthMismatch { expected: usize, found: usize },

    #[error("node {node} exceeds in-degree cap {cap}")]
    InDegreeExceeded { node: usize, cap: usize },

    #[error("more than two parallel edges between {src_node} and {destination}")]
    ParallelEdgeOverflow { src_node: usize, destination: usize },

    #[error("edge endpoint out of range: {0}")]
    EdgeOutOfRange(String),

    #[error("edges must satisfy row(source) < row(destination): {src_node} -> {destination}")]
    NotLayered { src_node: usize, destination: usize },

    #[error("node {node} in row {row} uses an activation not permitted by that row's mask")]
    ActivationNotAllowed { node: usize, row: usize },

    #[error("environment contract violated: {0}")]
    EnvironmentContract(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type EvoResult<T> = Result<T, EvolutionError>;
