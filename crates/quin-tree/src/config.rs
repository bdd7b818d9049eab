//! Tree shape configuration.

use ark_ff::PrimeField;
use serde::{Deserialize, Serialize};

use crate::error::TreeError;

/// Branching factor of the tree.
///
/// Only the two widths the on-chain verifier implements are supported:
/// binary, and quinary (the widest Poseidon gate the contract links).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum Arity {
    Binary,
    Quinary,
}

impl Arity {
    /// Number of children per node.
    pub const fn get(self) -> usize {
        match self {
            Arity::Binary => 2,
            Arity::Quinary => 5,
        }
    }
}

impl TryFrom<usize> for Arity {
    type Error = TreeError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(Arity::Binary),
            5 => Ok(Arity::Quinary),
            other => Err(TreeError::InvalidConfiguration(format!(
                "unsupported arity {other}, expected 2 or 5"
            ))),
        }
    }
}

impl From<Arity> for usize {
    fn from(arity: Arity) -> Self {
        arity.get()
    }
}

/// Shape parameters shared by every tree built from it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct TreeConfig<F: PrimeField> {
    /// Levels between the leaf row and the root.
    pub depth: usize,
    /// Children per node.
    pub arity: Arity,
    /// Value of an empty leaf.
    #[serde(with = "crate::field::decimal")]
    pub zero_value: F,
}

impl<F: PrimeField> TreeConfig<F> {
    pub fn new(depth: usize, arity: Arity, zero_value: F) -> Self {
        Self {
            depth,
            arity,
            zero_value,
        }
    }

    /// Check the shape and return the per-tree leaf capacity `arity^depth`.
    pub fn validate(&self) -> Result<usize, TreeError> {
        if self.depth == 0 {
            return Err(TreeError::InvalidConfiguration(
                "depth must be greater than 0".into(),
            ));
        }
        let depth = u32::try_from(self.depth).map_err(|_| {
            TreeError::InvalidConfiguration(format!("depth {} is too large", self.depth))
        })?;
        self.arity.get().checked_pow(depth).ok_or_else(|| {
            TreeError::InvalidConfiguration(format!(
                "capacity {}^{} does not fit in usize",
                self.arity.get(),
                self.depth
            ))
        })
    }
}
