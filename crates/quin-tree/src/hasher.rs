//! Node hash capability.
//!
//! The tree never hashes by itself: every node value comes from a
//! [`NodeHasher`] whose width must equal the tree arity. [`PoseidonHasher`]
//! is the default capability; [`FnHasher`] wraps any caller supplied
//! function (e.g. one matched bit-for-bit to an on-chain hasher).

use std::fmt;

use ark_crypto_primitives::sponge::{
    poseidon::{PoseidonConfig, PoseidonSponge},
    Absorb, CryptographicSponge,
};
use ark_ff::PrimeField;

/// A pure function from exactly `width()` field elements to one.
pub trait NodeHasher<F: PrimeField> {
    /// Number of inputs accepted by [`NodeHasher::hash`].
    fn width(&self) -> usize;

    /// Hash `width()` inputs into a single node value.
    fn hash(&self, inputs: &[F]) -> F;
}

/// Poseidon parameters for a sponge absorbing `rate` elements per permutation.
///
/// Rate equals the node arity and capacity is 1, so the state width is
/// `arity + 1` (3 for binary trees, 6 for quinary trees).
pub fn poseidon_config<F: PrimeField>(rate: usize) -> PoseidonConfig<F> {
    let full_rounds = 8;
    let partial_rounds = partial_rounds_for_width(rate + 1);
    let alpha = 5;

    let (ark, mds) = generate_poseidon_parameters::<F>(rate, full_rounds, partial_rounds);

    PoseidonConfig::new(full_rounds, partial_rounds, alpha, mds, ark, rate, 1)
}

/// Partial round counts for the BN254 instances (t = 2..=6).
fn partial_rounds_for_width(width: usize) -> usize {
    match width {
        2 => 56,
        3 => 57,
        4 => 56,
        5 => 60,
        _ => 60,
    }
}

/// Deterministic round constants and MDS matrix.
///
/// Not taken from a trusted parameter ceremony: trees that must agree with
/// an external verifier should be built with that verifier's hash via
/// [`FnHasher`].
fn generate_poseidon_parameters<F: PrimeField>(
    rate: usize,
    full_rounds: usize,
    partial_rounds: usize,
) -> (Vec<Vec<F>>, Vec<Vec<F>>) {
    let width = rate + 1;
    let total_rounds = full_rounds + partial_rounds;

    let ark = (0..total_rounds)
        .map(|round| {
            (0..width)
                .map(|i| {
                    let seed = ((round * width + i + 1) as u64).wrapping_mul(0x9e3779b97f4a7c15);
                    F::from(seed)
                })
                .collect()
        })
        .collect();

    let mds = (0..width)
        .map(|i| {
            (0..width)
                .map(|j| if i == j { F::from(2u64) } else { F::from(1u64) })
                .collect()
        })
        .collect();

    (ark, mds)
}

/// Poseidon sponge hasher absorbing one node's children and squeezing one
/// element.
#[derive(Clone)]
pub struct PoseidonHasher<F: PrimeField> {
    config: PoseidonConfig<F>,
    width: usize,
}

impl<F: PrimeField + Absorb> PoseidonHasher<F> {
    /// Hasher for nodes with `width` children.
    pub fn new(width: usize) -> Self {
        Self {
            config: poseidon_config(width),
            width,
        }
    }

    /// The sponge parameters, shared with the in-circuit gadget.
    pub fn config(&self) -> &PoseidonConfig<F> {
        &self.config
    }
}

impl<F: PrimeField + Absorb> NodeHasher<F> for PoseidonHasher<F> {
    fn width(&self) -> usize {
        self.width
    }

    fn hash(&self, inputs: &[F]) -> F {
        let mut sponge = PoseidonSponge::new(&self.config);
        sponge.absorb(&inputs);
        sponge.squeeze_field_elements(1)[0]
    }
}

impl<F: PrimeField> fmt::Debug for PoseidonHasher<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoseidonHasher")
            .field("width", &self.width)
            .finish()
    }
}

/// Adapter turning a plain function into a [`NodeHasher`].
pub struct FnHasher<Func> {
    width: usize,
    func: Func,
}

impl<Func> FnHasher<Func> {
    pub fn new(width: usize, func: Func) -> Self {
        Self { width, func }
    }
}

impl<F, Func> NodeHasher<F> for FnHasher<Func>
where
    F: PrimeField,
    Func: Fn(&[F]) -> F,
{
    fn width(&self) -> usize {
        self.width
    }

    fn hash(&self, inputs: &[F]) -> F {
        (self.func)(inputs)
    }
}

impl<Func> fmt::Debug for FnHasher<Func> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHasher").field("width", &self.width).finish()
    }
}
