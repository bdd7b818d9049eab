//! R1CS gadgets for checking quin tree paths inside a circuit.
//!
//! The leaf index is decomposed into base-`arity` digits (one per level,
//! least significant first), and each level places the running hash among
//! that level's siblings at the digit's position before hashing with the
//! same Poseidon sponge as [`crate::PoseidonHasher`].

use std::sync::Arc;

use ark_crypto_primitives::sponge::{
    constraints::CryptographicSpongeVar,
    poseidon::{constraints::PoseidonSpongeVar, PoseidonConfig},
};
use ark_ff::PrimeField;
use ark_r1cs_std::{
    alloc::AllocVar,
    boolean::Boolean,
    fields::{fp::FpVar, FieldVar},
    prelude::*,
};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};
use num_bigint::BigUint;

use crate::field;
use crate::proof::MerkleProof;

/// Siblings of a path allocated as witnesses.
#[derive(Clone)]
pub struct MerklePathVar<F: PrimeField> {
    siblings: Vec<Vec<FpVar<F>>>,
}

impl<F: PrimeField> MerklePathVar<F> {
    /// Allocate `depth` levels of `arity - 1` siblings. `values` may be
    /// `None` during setup.
    pub fn new_witness(
        cs: ConstraintSystemRef<F>,
        values: Option<&[Vec<F>]>,
        depth: usize,
        arity: usize,
    ) -> Result<Self, SynthesisError> {
        let siblings = (0..depth)
            .map(|level| {
                (0..arity - 1)
                    .map(|j| {
                        FpVar::new_witness(cs.clone(), || {
                            values
                                .and_then(|v| v.get(level))
                                .and_then(|l| l.get(j))
                                .copied()
                                .ok_or(SynthesisError::AssignmentMissing)
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { siblings })
    }

    /// Allocate the siblings of a native proof.
    pub fn from_proof(
        cs: ConstraintSystemRef<F>,
        proof: &MerkleProof<F>,
    ) -> Result<Self, SynthesisError> {
        let arity = proof.path_elements.first().map_or(1, |l| l.len() + 1);
        Self::new_witness(cs, Some(&proof.path_elements), proof.depth, arity)
    }

    pub fn siblings(&self) -> &[Vec<FpVar<F>>] {
        &self.siblings
    }

    pub fn depth(&self) -> usize {
        self.siblings.len()
    }
}

/// Hash one node's children with the Poseidon sponge in-circuit.
pub fn hash_node_var<F: PrimeField>(
    cs: ConstraintSystemRef<F>,
    config: &PoseidonConfig<F>,
    inputs: &[FpVar<F>],
) -> Result<FpVar<F>, SynthesisError> {
    let mut sponge = PoseidonSpongeVar::new(cs, config);
    sponge.absorb(&inputs)?;
    let mut output = sponge.squeeze_field_elements(1)?;
    Ok(output.remove(0))
}

/// Decompose `index` into `depth` base-`arity` digits, least significant
/// first. Unsatisfiable when `index >= arity^depth`.
pub fn generate_path_indices<F: PrimeField>(
    cs: ConstraintSystemRef<F>,
    index: &FpVar<F>,
    arity: usize,
    depth: usize,
) -> Result<Vec<FpVar<F>>, SynthesisError> {
    let native_digits: Option<Vec<F>> = index.value().ok().map(|value| {
        let base = BigUint::from(arity);
        let mut remaining = field::to_biguint(&value);
        (0..depth)
            .map(|_| {
                let digit = &remaining % &base;
                remaining /= &base;
                field::normalize(&digit)
            })
            .collect()
    });

    let mut digits = Vec::with_capacity(depth);
    let mut recomposed = FpVar::<F>::zero();
    let mut weight = F::one();

    for level in 0..depth {
        let digit = FpVar::new_witness(cs.clone(), || {
            native_digits
                .as_ref()
                .map(|d| d[level])
                .ok_or(SynthesisError::AssignmentMissing)
        })?;
        enforce_below(&digit, arity)?;

        recomposed += digit.clone() * weight;
        weight *= F::from(arity as u64);
        digits.push(digit);
    }

    recomposed.enforce_equal(index)?;
    Ok(digits)
}

/// Enforce `value ∈ {0, .., bound - 1}` via a vanishing product.
fn enforce_below<F: PrimeField>(value: &FpVar<F>, bound: usize) -> Result<(), SynthesisError> {
    let mut product = FpVar::<F>::one();
    for k in 0..bound {
        product *= value.clone() - FpVar::constant(F::from(k as u64));
    }
    product.enforce_equal(&FpVar::zero())
}

/// Place `value` at `position` among `siblings`, shifting later siblings up.
///
/// `position` must already be range checked below `siblings.len() + 1`.
pub fn insert_at_position<F: PrimeField>(
    siblings: &[FpVar<F>],
    position: &FpVar<F>,
    value: &FpVar<F>,
) -> Result<Vec<FpVar<F>>, SynthesisError> {
    let arity = siblings.len() + 1;
    let is_here = (0..arity)
        .map(|j| position.is_eq(&FpVar::constant(F::from(j as u64))))
        .collect::<Result<Vec<_>, _>>()?;

    let mut children = Vec::with_capacity(arity);
    for j in 0..arity {
        let other = if j == 0 {
            siblings[0].clone()
        } else if j == arity - 1 {
            siblings[arity - 2].clone()
        } else {
            // proven node sits further right: slot j keeps sibling j
            let after = Boolean::kary_or(&is_here[j + 1..])?;
            after.select(&siblings[j], &siblings[j - 1])?
        };
        children.push(is_here[j].select(value, &other)?);
    }
    Ok(children)
}

/// Recompute the root from `leaf`, the siblings and per-level positions.
pub fn compute_root_from_path<F: PrimeField>(
    cs: ConstraintSystemRef<F>,
    config: &PoseidonConfig<F>,
    leaf: &FpVar<F>,
    path: &MerklePathVar<F>,
    indices: &[FpVar<F>],
) -> Result<FpVar<F>, SynthesisError> {
    let mut current = leaf.clone();
    for (siblings, position) in path.siblings.iter().zip(indices) {
        let children = insert_at_position(siblings, position, &current)?;
        current = hash_node_var(cs.clone(), config, &children)?;
    }
    Ok(current)
}

/// Enforce that the leaf at `index` is included under `expected_root`.
pub fn verify_inclusion<F: PrimeField>(
    cs: ConstraintSystemRef<F>,
    config: &PoseidonConfig<F>,
    expected_root: &FpVar<F>,
    leaf: &FpVar<F>,
    index: &FpVar<F>,
    path: &MerklePathVar<F>,
) -> Result<(), SynthesisError> {
    let arity = path.siblings.first().map_or(2, |l| l.len() + 1);
    let indices = generate_path_indices(cs.clone(), index, arity, path.depth())?;
    let computed_root = compute_root_from_path(cs, config, leaf, path, &indices)?;
    computed_root.enforce_equal(expected_root)
}

/// Circuit proving: "a leaf at a hidden index is included under `root`".
///
/// Public inputs:
/// - root: The tree root
///
/// Private witnesses:
/// - leaf, index: The proven leaf and its position
/// - path_elements: Siblings per level
#[derive(Clone)]
pub struct InclusionCircuit<F: PrimeField> {
    /// Public: The root to verify against
    pub root: Option<F>,
    /// Private: The leaf value
    pub leaf: Option<F>,
    /// Private: The leaf index
    pub index: Option<F>,
    /// Private: Siblings per level
    pub path_elements: Option<Vec<Vec<F>>>,

    pub depth: usize,
    pub arity: usize,

    /// Poseidon configuration
    pub poseidon_config: Arc<PoseidonConfig<F>>,
}

impl<F: PrimeField> InclusionCircuit<F> {
    /// Circuit instance for proving the given native proof.
    pub fn new(proof: &MerkleProof<F>, arity: usize, poseidon_config: Arc<PoseidonConfig<F>>) -> Self {
        Self {
            root: Some(proof.root),
            leaf: Some(proof.leaf),
            index: Some(F::from(proof.position(arity) as u64)),
            path_elements: Some(proof.path_elements.clone()),
            depth: proof.depth,
            arity,
            poseidon_config,
        }
    }

    /// Empty circuit for setup (constraint generation only).
    pub fn empty(depth: usize, arity: usize, poseidon_config: Arc<PoseidonConfig<F>>) -> Self {
        Self {
            root: None,
            leaf: None,
            index: None,
            path_elements: None,
            depth,
            arity,
            poseidon_config,
        }
    }
}

impl<F: PrimeField> ConstraintSynthesizer<F> for InclusionCircuit<F> {
    fn generate_constraints(self, cs: ConstraintSystemRef<F>) -> Result<(), SynthesisError> {
        let root_var =
            FpVar::new_input(cs.clone(), || self.root.ok_or(SynthesisError::AssignmentMissing))?;

        let leaf_var =
            FpVar::new_witness(cs.clone(), || self.leaf.ok_or(SynthesisError::AssignmentMissing))?;
        let index_var = FpVar::new_witness(cs.clone(), || {
            self.index.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let path = MerklePathVar::new_witness(
            cs.clone(),
            self.path_elements.as_deref(),
            self.depth,
            self.arity,
        )?;

        verify_inclusion(
            cs,
            &self.poseidon_config,
            &root_var,
            &leaf_var,
            &index_var,
            &path,
        )
    }
}
