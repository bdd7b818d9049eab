//! Merkle proofs and their stateless verification.
//!
//! A proof carries, per level, the `arity - 1` siblings of the proven node in
//! ascending position order (the node's own branch excluded) and the node's
//! position within its parent. Verification needs nothing but the proof and
//! the hash capability.

use ark_ff::PrimeField;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use serde::{Deserialize, Serialize};

use crate::config::Arity;
use crate::error::TreeError;
use crate::hasher::NodeHasher;

/// Inclusion proof from a leaf (or subroot) to a root.
///
/// Text form:
/// `{ "pathElements": [[..]], "indices": [..], "depth": n, "root": "..", "leaf": ".." }`
/// with field elements as decimal strings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound = "")]
pub struct MerkleProof<F: PrimeField> {
    /// Siblings per level, each `arity - 1` wide.
    #[serde(with = "crate::field::decimal_nested")]
    pub path_elements: Vec<Vec<F>>,
    /// Position of the proven node within its parent, per level.
    pub indices: Vec<usize>,
    /// Number of levels in the proof.
    pub depth: usize,
    /// Root the proof commits to.
    #[serde(with = "crate::field::decimal")]
    pub root: F,
    /// Proven leaf, or subroot for subroot proofs.
    #[serde(with = "crate::field::decimal")]
    pub leaf: F,
}

impl<F: PrimeField> MerkleProof<F> {
    /// Check that the proof is well formed for nodes of `arity` children.
    pub fn check_shape(&self, arity: usize) -> Result<(), TreeError> {
        if self.depth == 0 {
            return Err(TreeError::MalformedProof("depth must be at least 1".into()));
        }
        if self.path_elements.len() != self.depth {
            return Err(TreeError::MalformedProof(format!(
                "{} sibling levels for depth {}",
                self.path_elements.len(),
                self.depth
            )));
        }
        if self.indices.len() != self.depth {
            return Err(TreeError::MalformedProof(format!(
                "{} indices for depth {}",
                self.indices.len(),
                self.depth
            )));
        }
        for (level, (siblings, &position)) in
            self.path_elements.iter().zip(&self.indices).enumerate()
        {
            if siblings.len() + 1 != arity {
                return Err(TreeError::MalformedProof(format!(
                    "level {level} has {} siblings, expected {}",
                    siblings.len(),
                    arity - 1
                )));
            }
            if position >= arity {
                return Err(TreeError::MalformedProof(format!(
                    "level {level} index {position} is not below arity {arity}"
                )));
            }
        }
        Ok(())
    }

    /// Shape check for a decoded proof, taking the arity from its first
    /// level.
    fn check_decoded_shape(&self) -> Result<(), TreeError> {
        let arity = self.path_elements.first().map_or(0, |level| level.len() + 1);
        if arity != 0 && Arity::try_from(arity).is_err() {
            return Err(TreeError::MalformedProof(format!(
                "{} siblings per level matches no supported arity",
                arity - 1
            )));
        }
        self.check_shape(arity)
    }

    /// Position of the proven node in its bottom level, recovered from the
    /// per-level indices.
    pub fn position(&self, arity: usize) -> usize {
        self.indices
            .iter()
            .rev()
            .fold(0, |acc, &index| acc * arity + index)
    }

    /// JSON text encoding.
    pub fn to_json(&self) -> Result<String, TreeError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse the JSON text encoding.
    pub fn from_json(text: &str) -> Result<Self, TreeError> {
        let proof: Self = serde_json::from_str(text)?;
        proof.check_decoded_shape()?;
        Ok(proof)
    }

    /// Canonical compressed binary encoding.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TreeError> {
        let indices: Vec<u64> = self.indices.iter().map(|&i| i as u64).collect();

        let mut bytes = Vec::new();
        self.path_elements.serialize_compressed(&mut bytes)?;
        indices.serialize_compressed(&mut bytes)?;
        (self.depth as u64).serialize_compressed(&mut bytes)?;
        self.root.serialize_compressed(&mut bytes)?;
        self.leaf.serialize_compressed(&mut bytes)?;
        Ok(bytes)
    }

    /// Parse the canonical binary encoding.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TreeError> {
        let mut reader = bytes;
        let path_elements = Vec::<Vec<F>>::deserialize_compressed(&mut reader)?;
        let indices = Vec::<u64>::deserialize_compressed(&mut reader)?;
        let depth = u64::deserialize_compressed(&mut reader)?;
        let root = F::deserialize_compressed(&mut reader)?;
        let leaf = F::deserialize_compressed(&mut reader)?;

        if !reader.is_empty() {
            return Err(TreeError::Encoding(format!(
                "{} trailing bytes after proof",
                reader.len()
            )));
        }

        let proof = Self {
            path_elements,
            indices: indices.into_iter().map(to_usize).collect::<Result<_, _>>()?,
            depth: to_usize(depth)?,
            root,
            leaf,
        };
        proof.check_decoded_shape()?;
        Ok(proof)
    }

    /// Hex of [`MerkleProof::to_bytes`].
    pub fn to_hex(&self) -> Result<String, TreeError> {
        Ok(hex::encode(self.to_bytes()?))
    }

    /// Parse the hex of the binary encoding.
    pub fn from_hex(text: &str) -> Result<Self, TreeError> {
        let bytes = hex::decode(text.trim_start_matches("0x"))?;
        Self::from_bytes(&bytes)
    }
}

fn to_usize(value: u64) -> Result<usize, TreeError> {
    usize::try_from(value).map_err(|_| TreeError::Encoding(format!("{value} overflows usize")))
}

/// Recompute the root from a proof, failing on malformed input.
pub fn compute_root<F, H>(proof: &MerkleProof<F>, hasher: &H) -> Result<F, TreeError>
where
    F: PrimeField,
    H: NodeHasher<F> + ?Sized,
{
    proof.check_shape(hasher.width())?;

    let mut current = proof.leaf;
    for (siblings, &position) in proof.path_elements.iter().zip(&proof.indices) {
        let mut level = siblings.clone();
        level.insert(position, current);
        current = hasher.hash(&level);
    }
    Ok(current)
}

/// Verify a proof, reporting malformed input as an error.
pub fn try_verify_merkle_path<F, H>(proof: &MerkleProof<F>, hasher: &H) -> Result<bool, TreeError>
where
    F: PrimeField,
    H: NodeHasher<F> + ?Sized,
{
    Ok(compute_root(proof, hasher)? == proof.root)
}

/// Verify a proof. Malformed proofs are rejected rather than raising.
pub fn verify_merkle_path<F, H>(proof: &MerkleProof<F>, hasher: &H) -> bool
where
    F: PrimeField,
    H: NodeHasher<F> + ?Sized,
{
    match try_verify_merkle_path(proof, hasher) {
        Ok(valid) => valid,
        Err(e) => {
            tracing::debug!(error = %e, "rejecting malformed proof");
            false
        }
    }
}

/// Verify many proofs against the same hasher.
#[cfg(feature = "parallel")]
pub fn verify_merkle_paths<F, H>(proofs: &[MerkleProof<F>], hasher: &H) -> Vec<bool>
where
    F: PrimeField,
    H: NodeHasher<F> + Sync + ?Sized,
{
    use rayon::prelude::*;

    proofs
        .par_iter()
        .map(|proof| verify_merkle_path(proof, hasher))
        .collect()
}

/// Verify many proofs against the same hasher.
#[cfg(not(feature = "parallel"))]
pub fn verify_merkle_paths<F, H>(proofs: &[MerkleProof<F>], hasher: &H) -> Vec<bool>
where
    F: PrimeField,
    H: NodeHasher<F> + ?Sized,
{
    proofs
        .iter()
        .map(|proof| verify_merkle_path(proof, hasher))
        .collect()
}
