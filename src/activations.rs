//! The eleven scalar activation functions and the row-eligibility rules that
//! govern which ones a node may be assigned.

use rand::Rng;

pub const ACTIVATION_COUNT: usize = 11;
pub const MAX_ACTIVATION_PARAMS: usize = 4;

/// A bitmask over [`Activation`] tags, one bit per variant.
pub type ActivationMask = u16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Linear,
    Tanh,
    Sigmoid,
    ReLU,
    LeakyReLU,
    ELU,
    Softsign,
    Softplus,
    Sin,
    Gaussian,
    Gelu,
}

impl Activation {
    pub const ALL: [Activation; ACTIVATION_COUNT] = [
        Activation::Linear,
        Activation::Tanh,
        Activation::Sigmoid,
        Activation::ReLU,
        Activation::LeakyReLU,
        Activation::ELU,
        Activation::Softsign,
        Activation::Softplus,
        Activation::Sin,
        Activation::Gaussian,
        Activation::Gelu,
    ];

    pub fn index(self) -> u16 {
        self as u16
    }

    pub fn bit(self) -> ActivationMask {
        1 << self.index()
    }

    pub fn from_index(idx: u16) -> Option<Activation> {
        Self::ALL.get(idx as usize).copied()
    }

    /// Number of leading slots of the node's parameter block this activation
    /// actually reads. Everything past this index is inert storage.
    pub fn required_param_count(self) -> usize {
        match self {
            Activation::LeakyReLU | Activation::ELU => 1,
            _ => 0,
        }
    }

    pub fn default_params(self) -> [f32; MAX_ACTIVATION_PARAMS] {
        match self {
            Activation::LeakyReLU => [0.01, 0.0, 0.0, 0.0],
            Activation::ELU => [1.0, 0.0, 0.0, 0.0],
            _ => [0.0; MAX_ACTIVATION_PARAMS],
        }
    }

    /// Applies the activation to a pre-activation scalar using the node's
    /// parameter block. `params` must have at least `MAX_ACTIVATION_PARAMS`
    /// entries; only the first `required_param_count()` are read.
    pub fn apply(self, x: f32, params: &[f32]) -> f32 {
        match self {
            Activation::Linear => x,
            Activation::Tanh => x.tanh(),
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activation::ReLU => x.max(0.0),
            Activation::LeakyReLU => {
                let alpha = params[0];
                if x >= 0.0 {
                    x
                } else {
                    alpha * x
                }
            }
            Activation::ELU => {
                let alpha = params[0];
                if x >= 0.0 {
                    x
                } else {
                    alpha * (x.exp() - 1.0)
                }
            }
            Activation::Softsign => x / (1.0 + x.abs()),
            Activation::Softplus => (1.0 + x.exp()).ln(),
            Activation::Sin => x.sin(),
            Activation::Gaussian => (-x * x).exp(),
            Activation::Gelu => {
                const SQRT_2_OVER_PI: f32 = 0.7978845608028654;
                0.5 * x * (1.0 + (SQRT_2_OVER_PI * (x + 0.044715 * x * x * x)).tanh())
            }
        }
    }
}

/// The output row is restricted to {Linear, Tanh}.
pub const OUTPUT_ROW_MASK: ActivationMask = 0b11; // Linear | Tanh, given their declaration order
/// The bias row (row 0) is restricted to {Linear}.
pub const BIAS_ROW_MASK: ActivationMask = 0b1;

pub fn mask_contains(mask: ActivationMask, activation: Activation) -> bool {
    mask & activation.bit() != 0
}

pub fn mask_from(activations: &[Activation]) -> ActivationMask {
    activations.iter().fold(0, |m, &a| m | a.bit())
}

pub fn full_mask() -> ActivationMask {
    Activation::ALL.iter().fold(0, |m, &a| m | a.bit())
}

/// Picks a uniformly random activation among those set in `mask`. Panics if
/// the mask is empty -- an empty row mask is an invariant violation the
/// caller must never construct.
pub fn random_activation_from_mask(mask: ActivationMask, rng: &mut impl Rng) -> Activation {
    let candidates: Vec<Activation> = Activation::ALL
        .iter()
        .copied()
        .filter(|a| mask_contains(mask, *a))
        .collect();
    debug_assert!(!candidates.is_empty(), "row mask must not be empty");
    candidates[rng.gen_range(0..candidates.len())]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_mask_is_linear_and_tanh_only() {
        assert!(mask_contains(OUTPUT_ROW_MASK, Activation::Linear));
        assert!(mask_contains(OUTPUT_ROW_MASK, Activation::Tanh));
        assert!(!mask_contains(OUTPUT_ROW_MASK, Activation::Sigmoid));
    }

    #[test]
    fn bias_mask_is_linear_only() {
        assert_eq!(BIAS_ROW_MASK, Activation::Linear.bit());
    }

    #[test]
    fn leaky_relu_applies_alpha_below_zero() {
        let params = [0.1, 0.0, 0.0, 0.0];
        assert_eq!(Activation::LeakyReLU.apply(-2.0, &params), -0.2);
        assert_eq!(Activation::LeakyReLU.apply(3.0, &params), 3.0);
    }

    #[test]
    fn required_param_count_matches_arity() {
        assert_eq!(Activation::Linear.required_param_count(), 0);
        assert_eq!(Activation::LeakyReLU.required_param_count(), 1);
        assert_eq!(Activation::ELU.required_param_count(), 1);
    }
}
