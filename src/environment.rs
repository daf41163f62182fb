//! The external collaborator contract consumed by [`crate::fitness`] (spec §6).
//!
//! Concrete environments (corridor, rocket, cart-pole, landscape, spiral,
//! ...) are explicitly out of scope; this is the abstract stepping protocol
//! the core evaluates individuals against.

/// One episode's worth of interaction with a simulated or physical system.
/// Implementors decide what "one tick" means; the core only requires that
/// `observations`/`step` agree on `input_count`/`output_count`.
pub trait Environment {
    fn input_count(&self) -> usize;
    fn output_count(&self) -> usize;
    fn max_steps(&self) -> usize;

    /// Returns the environment to its initial state, deterministically
    /// parameterized by `seed`.
    fn reset(&mut self, seed: u64) -> anyhow::Result<()>;

    /// Writes the current observation into `buffer`, which is sized to
    /// `input_count()`.
    fn observations(&self, buffer: &mut [f32]) -> anyhow::Result<()>;

    /// Applies an action vector of length `output_count()`, advances one
    /// tick, and returns the tick's scalar reward.
    fn step(&mut self, actions: &[f32]) -> anyhow::Result<f32>;

    fn is_terminal(&self) -> bool;

    /// Optional terminal fitness. A `None` (or the default's `None`) means
    /// the driver should use cumulative reward instead.
    fn final_fitness(&self) -> Option<f32> {
        None
    }
}
