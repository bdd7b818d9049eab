//! Incremental quinary/binary Merkle accumulator.
//!
//! This crate provides:
//! - `IncrementalQuinTree`: Fixed-depth append-only tree with 2 or 5 children per node
//! - `MultiIncrementalQuinTree`: Sequence of such trees, rolling over when one fills up
//! - `MerkleProof`: Leaf and subroot inclusion proofs with stateless verification
//! - `InclusionCircuit`: R1CS check of the same proofs for Groth16

pub mod config;
pub mod engine;
pub mod error;
pub mod field;
pub mod gadgets;
pub mod hasher;
pub mod multi;
pub mod oracle;
pub mod proof;
pub mod tree;

#[cfg(test)]
mod tests;

pub use config::{Arity, TreeConfig};
pub use error::TreeError;
pub use gadgets::{InclusionCircuit, MerklePathVar};
pub use hasher::{poseidon_config, FnHasher, NodeHasher, PoseidonHasher};
pub use multi::MultiIncrementalQuinTree;
pub use oracle::{cross_check, CrossCheckError, RootOracle};
pub use proof::{compute_root, try_verify_merkle_path, verify_merkle_path, verify_merkle_paths, MerkleProof};
pub use tree::IncrementalQuinTree;

use ark_bn254::Fr;

/// Common type aliases
pub type ConstraintF = Fr;
pub type QuinTree = IncrementalQuinTree<Fr, PoseidonHasher<Fr>>;
pub type MultiQuinTree = MultiIncrementalQuinTree<Fr, PoseidonHasher<Fr>>;
