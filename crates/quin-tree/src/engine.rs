//! Shared insertion and path algorithms.
//!
//! [`TreeShape`] holds everything fixed at construction (depth, arity, zero
//! value, per-level zeros and the hasher). [`LevelCaches`] holds the mutable
//! per-tree state. A single tree owns one set of caches; a multi tree owns
//! one set per constituent and runs the same algorithms against each.

use std::sync::Arc;

use ark_ff::PrimeField;

use crate::config::{Arity, TreeConfig};
use crate::error::TreeError;
use crate::hasher::NodeHasher;
use crate::proof::MerkleProof;

/// Width the on-chain quinary gate always hashes.
const PADDED_WIDTH: usize = 5;

/// Mutable per-tree caches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LevelCaches<F> {
    /// Per level, the `arity` children of the currently open node.
    pub filled_subtrees: Vec<Vec<F>>,
    /// Per level `i`, every level-`i + 1` node hash computed so far,
    /// indexed by absolute node position.
    pub filled_paths: Vec<Vec<F>>,
    /// Hash of the top level of `filled_subtrees`.
    pub root: F,
}

/// Immutable tree shape plus hash capability.
pub struct TreeShape<F: PrimeField, H> {
    config: TreeConfig<F>,
    capacity: usize,
    zeros: Vec<F>,
    hasher: Arc<H>,
}

impl<F: PrimeField, H> Clone for TreeShape<F, H> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            capacity: self.capacity,
            zeros: self.zeros.clone(),
            hasher: Arc::clone(&self.hasher),
        }
    }
}

impl<F: PrimeField, H: NodeHasher<F>> TreeShape<F, H> {
    /// Validate the configuration and derive the per-level zeros.
    pub fn new(config: TreeConfig<F>, hasher: Arc<H>) -> Result<Self, TreeError> {
        let capacity = config.validate()?;
        if hasher.width() != config.arity.get() {
            return Err(TreeError::InvalidConfiguration(format!(
                "hasher takes {} inputs but arity is {}",
                hasher.width(),
                config.arity.get()
            )));
        }

        let mut shape = Self {
            config,
            capacity,
            zeros: Vec::new(),
            hasher,
        };

        let arity = shape.arity();
        let mut current = shape.config.zero_value;
        let mut zeros = Vec::with_capacity(shape.config.depth);
        for _ in 0..shape.config.depth {
            zeros.push(current);
            current = shape.hash_node(&vec![current; arity]);
        }
        shape.zeros = zeros;

        Ok(shape)
    }

    /// Fresh caches for an empty tree.
    pub fn empty_caches(&self) -> LevelCaches<F> {
        let arity = self.arity();
        let filled_subtrees: Vec<Vec<F>> = self.zeros.iter().map(|z| vec![*z; arity]).collect();
        let root = self.hash_node(&filled_subtrees[self.depth() - 1]);

        LevelCaches {
            filled_subtrees,
            filled_paths: vec![Vec::new(); self.depth() - 1],
            root,
        }
    }

    /// Hash one node's children, padding quinary nodes to the full gate width.
    pub fn hash_node(&self, children: &[F]) -> F {
        if self.arity() > 2 && children.len() < PADDED_WIDTH {
            let mut padded = children.to_vec();
            padded.resize(PADDED_WIDTH, self.config.zero_value);
            return self.hasher.hash(&padded);
        }
        self.hasher.hash(children)
    }

    /// Place `value` at leaf position `next_index` and return the new root.
    ///
    /// The caller appends the leaf and advances its own index.
    pub fn insert(&self, caches: &mut LevelCaches<F>, next_index: usize, value: F) -> F {
        let arity = self.arity();

        // m is the position of the leaf within its level-1 node
        let mut m = next_index % arity;
        if m == 0 {
            reset_open_node(&mut caches.filled_subtrees[0], self.zeros[0]);
        }
        caches.filled_subtrees[0][m] = value;

        let mut current = next_index;
        for level in 1..self.depth() {
            current /= arity;
            m = current % arity;

            if m == 0 {
                reset_open_node(&mut caches.filled_subtrees[level], self.zeros[level]);
            }

            let hashed = self.hash_node(&caches.filled_subtrees[level - 1]);
            caches.filled_subtrees[level][m] = hashed;
            record_path(
                &mut caches.filled_paths[level - 1],
                current,
                hashed,
                self.zeros[level],
            );
        }

        caches.root = self.hash_node(&caches.filled_subtrees[self.depth() - 1]);
        caches.root
    }

    /// Replay `leaves` into fresh caches.
    pub fn rebuild(&self, leaves: &[F]) -> LevelCaches<F> {
        let mut caches = self.empty_caches();
        for (index, leaf) in leaves.iter().enumerate() {
            self.insert(&mut caches, index, *leaf);
        }
        caches
    }

    /// Proof from the leaf at `index` to `caches.root`.
    ///
    /// `leaves` must be the leaves of the tree the caches belong to, indexed
    /// from that tree's first slot.
    pub fn merkle_path(
        &self,
        leaves: &[F],
        caches: &LevelCaches<F>,
        index: usize,
    ) -> Result<MerkleProof<F>, TreeError> {
        if index >= leaves.len() {
            return Err(TreeError::IndexOutOfRange {
                index,
                len: leaves.len(),
            });
        }

        let arity = self.arity();
        let depth = self.depth();
        let mut levels = Vec::with_capacity(depth);
        let mut indices = Vec::with_capacity(depth);

        let first = index - index % arity;
        levels.push(
            (first..first + arity)
                .map(|j| leaves.get(j).copied().unwrap_or(self.zeros[0]))
                .collect::<Vec<_>>(),
        );
        indices.push(index % arity);

        // absolute index of the ancestor at the current level
        let mut node = index / arity;
        for level in 1..depth {
            let parent = node / arity;
            let recorded = &caches.filled_paths[level - 1];
            levels.push(
                (0..arity)
                    .map(|j| {
                        recorded
                            .get(parent * arity + j)
                            .copied()
                            .unwrap_or(self.zeros[level])
                    })
                    .collect::<Vec<_>>(),
            );
            indices.push(node % arity);
            node = parent;
        }

        let path_elements = levels
            .into_iter()
            .zip(&indices)
            .map(|(mut level, &position)| {
                level.remove(position);
                level
            })
            .collect();

        Ok(MerkleProof {
            path_elements,
            indices,
            depth,
            root: caches.root,
            leaf: leaves[index],
        })
    }

    /// Proof from the root of the sub-tree over `[start, end)` to
    /// `caches.root`.
    pub fn merkle_subroot_path(
        &self,
        leaves: &[F],
        caches: &LevelCaches<F>,
        start: usize,
        end: usize,
    ) -> Result<MerkleProof<F>, TreeError> {
        let sub_depth = self.subroot_depth(start, end)?;
        let mut proof = self.merkle_path(leaves, caches, start)?;

        let sub_config = TreeConfig::new(sub_depth, self.config.arity, self.config.zero_value);
        let sub_shape = TreeShape::new(sub_config, Arc::clone(&self.hasher))?;
        let available = &leaves[start..end.min(leaves.len())];
        let subroot = sub_shape.rebuild(available).root;

        proof.path_elements.drain(..sub_depth);
        proof.indices.drain(..sub_depth);
        proof.depth = self.depth() - sub_depth;
        proof.leaf = subroot;

        tracing::trace!(start, end, sub_depth, "generated subroot path");
        Ok(proof)
    }

    /// Depth `k` of the sub-tree spanning `[start, end)`, where
    /// `end - start == arity^k`.
    fn subroot_depth(&self, start: usize, end: usize) -> Result<usize, TreeError> {
        if end <= start {
            return Err(TreeError::subroot(start, end, "end must exceed start"));
        }
        let arity = self.arity();
        let num_leaves = end - start;

        if num_leaves % arity != 0 {
            return Err(TreeError::subroot(
                start,
                end,
                "length is not a multiple of the arity",
            ));
        }
        if num_leaves >= self.capacity {
            return Err(TreeError::subroot(
                start,
                end,
                "length must be below the tree capacity",
            ));
        }

        let mut span = 1usize;
        for sub_depth in 0..self.depth() {
            if span == num_leaves {
                if start % num_leaves != 0 {
                    return Err(TreeError::subroot(
                        start,
                        end,
                        "start is not aligned to a sub-tree boundary",
                    ));
                }
                return Ok(sub_depth);
            }
            span *= arity;
        }

        Err(TreeError::subroot(
            start,
            end,
            "length is not a power of the arity",
        ))
    }
}

impl<F: PrimeField, H> TreeShape<F, H> {
    pub fn config(&self) -> &TreeConfig<F> {
        &self.config
    }

    pub fn depth(&self) -> usize {
        self.config.depth
    }

    pub fn arity(&self) -> usize {
        self.config.arity.get()
    }

    pub fn arity_kind(&self) -> Arity {
        self.config.arity
    }

    pub fn zero_value(&self) -> F {
        self.config.zero_value
    }

    /// Leaves per tree, `arity^depth`.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn zeros(&self) -> &[F] {
        &self.zeros
    }

    pub fn hasher(&self) -> &Arc<H> {
        &self.hasher
    }
}

/// Open a new node: every position except the first goes back to zero.
fn reset_open_node<F: Copy>(node: &mut [F], zero: F) {
    for slot in node.iter_mut().skip(1) {
        *slot = zero;
    }
}

/// Append a completed hash, or overwrite it when the node is revisited.
fn record_path<F: Copy>(level: &mut Vec<F>, position: usize, hashed: F, zero: F) {
    if position < level.len() {
        level[position] = hashed;
    } else {
        level.resize(position, zero);
        level.push(hashed);
    }
}
