//! Cross-checking roots against an external accumulator.
//!
//! The on-chain contract (or any other implementation of the same hashing
//! contract) is only consumed as "accept a leaf, return the resulting root".

use std::convert::Infallible;

use ark_ff::PrimeField;
use thiserror::Error;

use crate::hasher::NodeHasher;
use crate::multi::MultiIncrementalQuinTree;

/// An external accumulator that mirrors insertions.
pub trait RootOracle<F> {
    type Error: std::error::Error;

    /// Append `leaf` and return the root of the tree that took it.
    fn insert_leaf(&mut self, leaf: F) -> Result<F, Self::Error>;
}

/// Failure of [`cross_check`].
#[derive(Error, Debug)]
pub enum CrossCheckError<F: std::fmt::Debug, E> {
    #[error("Root mismatch at leaf {index}: local {local:?}, remote {remote:?}")]
    RootMismatch { index: usize, local: F, remote: F },
    #[error("Oracle failed at leaf {index}: {source}")]
    Oracle { index: usize, source: E },
}

/// Insert every leaf locally and into `oracle`, comparing roots after each
/// insertion.
pub fn cross_check<F, H, O>(
    tree: &mut MultiIncrementalQuinTree<F, H>,
    oracle: &mut O,
    leaves: impl IntoIterator<Item = F>,
) -> Result<usize, CrossCheckError<F, O::Error>>
where
    F: PrimeField,
    H: NodeHasher<F>,
    O: RootOracle<F>,
{
    let mut checked = 0;
    for leaf in leaves {
        let index = tree.leaves().len();
        let local = tree.insert(leaf);
        let remote = oracle
            .insert_leaf(leaf)
            .map_err(|source| CrossCheckError::Oracle { index, source })?;

        if local != remote {
            tracing::warn!(index, "root diverged from external accumulator");
            return Err(CrossCheckError::RootMismatch {
                index,
                local,
                remote,
            });
        }
        checked += 1;
    }
    Ok(checked)
}

impl<F: PrimeField, H: NodeHasher<F>> RootOracle<F> for MultiIncrementalQuinTree<F, H> {
    type Error = Infallible;

    fn insert_leaf(&mut self, leaf: F) -> Result<F, Self::Error> {
        Ok(self.insert(leaf))
    }
}
