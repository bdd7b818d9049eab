//! Single fixed-depth incremental tree.

use std::fmt;
use std::sync::Arc;

use ark_ff::PrimeField;

use crate::config::{Arity, TreeConfig};
use crate::engine::{LevelCaches, TreeShape};
use crate::error::TreeError;
use crate::hasher::NodeHasher;
use crate::proof::{self, MerkleProof};

/// Append-only Merkle tree of fixed depth with 2 or 5 children per node.
///
/// The root is maintained incrementally on every insert; historical proofs
/// are served from the per-level path cache without rehashing.
pub struct IncrementalQuinTree<F: PrimeField, H> {
    shape: TreeShape<F, H>,
    leaves: Vec<F>,
    next_index: usize,
    caches: LevelCaches<F>,
}

impl<F: PrimeField, H: NodeHasher<F>> IncrementalQuinTree<F, H> {
    /// Build an empty tree.
    pub fn new(config: TreeConfig<F>, hasher: Arc<H>) -> Result<Self, TreeError> {
        let shape = TreeShape::new(config, hasher)?;
        Ok(Self::empty(shape))
    }

    /// Build an empty tree from raw shape parameters.
    pub fn with_params(
        depth: usize,
        zero_value: F,
        arity: usize,
        hasher: Arc<H>,
    ) -> Result<Self, TreeError> {
        let config = TreeConfig::new(depth, Arity::try_from(arity)?, zero_value);
        Self::new(config, hasher)
    }

    fn empty(shape: TreeShape<F, H>) -> Self {
        let caches = shape.empty_caches();
        Self {
            shape,
            leaves: Vec::new(),
            next_index: 0,
            caches,
        }
    }

    /// Append a leaf and return the new root.
    pub fn insert(&mut self, value: F) -> F {
        if self.next_index == self.shape.capacity() {
            tracing::warn!(
                capacity = self.shape.capacity(),
                "inserting past tree capacity, root no longer commits to every leaf"
            );
        }

        let root = self.shape.insert(&mut self.caches, self.next_index, value);
        self.next_index += 1;
        self.leaves.push(value);
        root
    }

    /// Replace the leaf at `index` and rebuild every cache from the leaves.
    pub fn update(&mut self, index: usize, value: F) -> Result<F, TreeError> {
        if index >= self.next_index || index >= self.leaves.len() {
            return Err(TreeError::IndexOutOfRange {
                index,
                len: self.next_index,
            });
        }

        let mut leaves = self.leaves.clone();
        leaves[index] = value;
        let caches = self.shape.rebuild(&leaves);

        tracing::debug!(index, leaves = leaves.len(), "rebuilt tree after update");

        self.next_index = leaves.len();
        self.leaves = leaves;
        self.caches = caches;
        Ok(self.caches.root)
    }

    /// Leaf at `index`, if inserted.
    pub fn get_leaf(&self, index: usize) -> Option<F> {
        self.leaves.get(index).copied()
    }

    /// Proof from the leaf at `index` to the current root.
    pub fn gen_merkle_path(&self, index: usize) -> Result<MerkleProof<F>, TreeError> {
        self.shape.merkle_path(&self.leaves, &self.caches, index)
    }

    /// Proof from the root of the sub-tree over `[start, end)` to the
    /// current root.
    pub fn gen_merkle_subroot_path(
        &self,
        start: usize,
        end: usize,
    ) -> Result<MerkleProof<F>, TreeError> {
        self.shape
            .merkle_subroot_path(&self.leaves, &self.caches, start, end)
    }

    /// Verify a proof with this tree's hasher.
    pub fn verify_merkle_path(&self, proof: &MerkleProof<F>) -> bool {
        proof::verify_merkle_path(proof, self.shape.hasher().as_ref())
    }

    pub fn root(&self) -> F {
        self.caches.root
    }

    pub fn next_index(&self) -> usize {
        self.next_index
    }

    pub fn leaves(&self) -> &[F] {
        &self.leaves
    }

    pub fn zeros(&self) -> &[F] {
        self.shape.zeros()
    }

    pub fn filled_subtrees(&self) -> &[Vec<F>] {
        &self.caches.filled_subtrees
    }

    pub fn filled_paths(&self) -> &[Vec<F>] {
        &self.caches.filled_paths
    }

    pub fn depth(&self) -> usize {
        self.shape.depth()
    }

    pub fn arity(&self) -> usize {
        self.shape.arity()
    }

    pub fn zero_value(&self) -> F {
        self.shape.zero_value()
    }

    pub fn capacity(&self) -> usize {
        self.shape.capacity()
    }

    pub fn config(&self) -> &TreeConfig<F> {
        self.shape.config()
    }

    pub fn hasher(&self) -> &Arc<H> {
        self.shape.hasher()
    }
}

/// Deep copy: leaves and caches are owned, only the stateless hasher is
/// shared.
impl<F: PrimeField, H> Clone for IncrementalQuinTree<F, H> {
    fn clone(&self) -> Self {
        Self {
            shape: self.shape.clone(),
            leaves: self.leaves.clone(),
            next_index: self.next_index,
            caches: self.caches.clone(),
        }
    }
}

impl<F: PrimeField, H: NodeHasher<F>> PartialEq for IncrementalQuinTree<F, H> {
    fn eq(&self, other: &Self) -> bool {
        self.shape.config() == other.shape.config()
            && self.next_index == other.next_index
            && self.caches == other.caches
            && self.leaves == other.leaves
    }
}

impl<F: PrimeField, H> fmt::Debug for IncrementalQuinTree<F, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IncrementalQuinTree")
            .field("config", self.shape.config())
            .field("next_index", &self.next_index)
            .field("root", &self.caches.root)
            .finish_non_exhaustive()
    }
}
