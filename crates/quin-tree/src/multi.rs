//! Chain of fixed-capacity trees sharing one leaf sequence.
//!
//! Constituent `k` holds the absolute leaf indices
//! `[k * capacity, (k + 1) * capacity)`. A new constituent is opened by the
//! first insert that finds the current one full.

use std::fmt;
use std::sync::Arc;

use ark_ff::PrimeField;

use crate::config::{Arity, TreeConfig};
use crate::engine::{LevelCaches, TreeShape};
use crate::error::TreeError;
use crate::hasher::NodeHasher;
use crate::proof::{self, MerkleProof};

/// Incremental tree that rolls over into a fresh tree when full.
pub struct MultiIncrementalQuinTree<F: PrimeField, H> {
    shape: TreeShape<F, H>,
    leaves: Vec<F>,
    current_tree_num: usize,
    /// Next free slot within the current constituent.
    next_index: usize,
    trees: Vec<LevelCaches<F>>,
}

impl<F: PrimeField, H: NodeHasher<F>> MultiIncrementalQuinTree<F, H> {
    /// Build a chain holding one empty constituent.
    pub fn new(config: TreeConfig<F>, hasher: Arc<H>) -> Result<Self, TreeError> {
        let shape = TreeShape::new(config, hasher)?;
        let first = shape.empty_caches();
        Ok(Self {
            shape,
            leaves: Vec::new(),
            current_tree_num: 0,
            next_index: 0,
            trees: vec![first],
        })
    }

    /// Build from raw shape parameters.
    pub fn with_params(
        depth: usize,
        zero_value: F,
        arity: usize,
        hasher: Arc<H>,
    ) -> Result<Self, TreeError> {
        let config = TreeConfig::new(depth, Arity::try_from(arity)?, zero_value);
        Self::new(config, hasher)
    }

    /// Append a leaf, opening a new constituent first when the current one
    /// is full. Returns the root of the constituent that took the leaf.
    pub fn insert(&mut self, value: F) -> F {
        if self.next_index >= self.shape.capacity() {
            self.next_index = 0;
            self.current_tree_num += 1;
            self.trees.push(self.shape.empty_caches());
            tracing::debug!(
                tree_num = self.current_tree_num,
                leaves = self.leaves.len(),
                "opened new constituent tree"
            );
        }

        let caches = &mut self.trees[self.current_tree_num];
        let root = self.shape.insert(caches, self.next_index, value);
        self.next_index += 1;
        self.leaves.push(value);
        root
    }

    /// Replace the leaf at an absolute index and rebuild its constituent.
    ///
    /// Returns the rebuilt constituent's root.
    pub fn update(&mut self, absolute_index: usize, value: F) -> Result<F, TreeError> {
        self.check_index(absolute_index)?;
        let (tree_num, relative) = self.locate(absolute_index)?;

        let mut leaves = self.constituent_leaves(tree_num).to_vec();
        leaves[relative] = value;
        let caches = self.shape.rebuild(&leaves);

        tracing::debug!(
            absolute_index,
            tree_num,
            leaves = leaves.len(),
            "rebuilt constituent after update"
        );

        self.leaves[absolute_index] = value;
        self.trees[tree_num] = caches;
        Ok(self.trees[tree_num].root)
    }

    /// Leaf at an absolute index, if inserted.
    pub fn get_leaf(&self, absolute_index: usize) -> Option<F> {
        self.leaves.get(absolute_index).copied()
    }

    /// Proof from the leaf at an absolute index to its constituent's root.
    pub fn gen_merkle_path(&self, absolute_index: usize) -> Result<MerkleProof<F>, TreeError> {
        let (tree_num, relative) = self.locate(absolute_index)?;
        self.check_index(absolute_index)?;

        self.shape.merkle_path(
            self.constituent_leaves(tree_num),
            &self.trees[tree_num],
            relative,
        )
    }

    /// Proof from the root of the sub-tree over the absolute range
    /// `[start, end)` to its constituent's root. The range must lie within a
    /// single constituent.
    pub fn gen_merkle_subroot_path(
        &self,
        start: usize,
        end: usize,
    ) -> Result<MerkleProof<F>, TreeError> {
        if end <= start {
            return Err(TreeError::InvalidSubrootRange {
                start,
                end,
                reason: "end must exceed start",
            });
        }
        let (tree_num, relative_start) = self.locate(start)?;
        self.check_index(start)?;

        let capacity = self.shape.capacity();
        if end > (tree_num + 1) * capacity {
            return Err(TreeError::InvalidSubrootRange {
                start,
                end,
                reason: "range spans more than one constituent tree",
            });
        }

        self.shape.merkle_subroot_path(
            self.constituent_leaves(tree_num),
            &self.trees[tree_num],
            relative_start,
            relative_start + (end - start),
        )
    }

    /// Verify a proof with this tree's hasher.
    pub fn verify_merkle_path(&self, proof: &MerkleProof<F>) -> bool {
        proof::verify_merkle_path(proof, self.shape.hasher().as_ref())
    }

    /// Constituent number and relative index of an absolute leaf index.
    fn locate(&self, absolute_index: usize) -> Result<(usize, usize), TreeError> {
        let capacity = self.shape.capacity();
        let tree_num = absolute_index / capacity;
        if tree_num >= self.trees.len() {
            return Err(TreeError::TreeNumberOutOfRange {
                tree_num,
                num_trees: self.trees.len(),
            });
        }
        Ok((tree_num, absolute_index % capacity))
    }

    fn check_index(&self, absolute_index: usize) -> Result<(), TreeError> {
        if absolute_index >= self.leaves.len() {
            return Err(TreeError::IndexOutOfRange {
                index: absolute_index,
                len: self.leaves.len(),
            });
        }
        Ok(())
    }

    /// Leaves held by constituent `tree_num`.
    fn constituent_leaves(&self, tree_num: usize) -> &[F] {
        let capacity = self.shape.capacity();
        let start = (tree_num * capacity).min(self.leaves.len());
        let end = (start + capacity).min(self.leaves.len());
        &self.leaves[start..end]
    }

    /// Root of constituent `tree_num`.
    pub fn root(&self, tree_num: usize) -> Option<F> {
        self.trees.get(tree_num).map(|caches| caches.root)
    }

    /// Root of the constituent currently accepting leaves.
    pub fn current_root(&self) -> F {
        self.trees[self.current_tree_num].root
    }

    /// Roots of every constituent, oldest first.
    pub fn roots(&self) -> Vec<F> {
        self.trees.iter().map(|caches| caches.root).collect()
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn current_tree_num(&self) -> usize {
        self.current_tree_num
    }

    /// Next free slot within the current constituent.
    pub fn next_index(&self) -> usize {
        self.next_index
    }

    pub fn leaves(&self) -> &[F] {
        &self.leaves
    }

    pub fn zeros(&self) -> &[F] {
        self.shape.zeros()
    }

    pub fn filled_subtrees(&self, tree_num: usize) -> Option<&[Vec<F>]> {
        self.trees
            .get(tree_num)
            .map(|caches| caches.filled_subtrees.as_slice())
    }

    pub fn filled_paths(&self, tree_num: usize) -> Option<&[Vec<F>]> {
        self.trees
            .get(tree_num)
            .map(|caches| caches.filled_paths.as_slice())
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

    /// Leaves per constituent, `arity^depth`.
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

impl<F: PrimeField, H> Clone for MultiIncrementalQuinTree<F, H> {
    fn clone(&self) -> Self {
        Self {
            shape: self.shape.clone(),
            leaves: self.leaves.clone(),
            current_tree_num: self.current_tree_num,
            next_index: self.next_index,
            trees: self.trees.clone(),
        }
    }
}

impl<F: PrimeField, H: NodeHasher<F>> PartialEq for MultiIncrementalQuinTree<F, H> {
    fn eq(&self, other: &Self) -> bool {
        self.shape.config() == other.shape.config()
            && self.current_tree_num == other.current_tree_num
            && self.next_index == other.next_index
            && self.trees == other.trees
            && self.leaves == other.leaves
    }
}

impl<F: PrimeField, H> fmt::Debug for MultiIncrementalQuinTree<F, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiIncrementalQuinTree")
            .field("config", self.shape.config())
            .field("current_tree_num", &self.current_tree_num)
            .field("next_index", &self.next_index)
            .field("leaves", &self.leaves.len())
            .finish_non_exhaustive()
    }
}
