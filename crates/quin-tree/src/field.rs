//! Field element normalisation and text encoding.
//!
//! Leaves arrive as arbitrary non-negative integers and are reduced modulo
//! the scalar field order. The text form is the base-10 representation used
//! by the on-chain verifier's tooling; `0x`-prefixed hex is accepted on input.

use ark_ff::{BigInteger, PrimeField};
use num_bigint::BigUint;
use num_traits::Num;

use crate::error::TreeError;

/// Reduce an arbitrary integer into the field.
pub fn normalize<F: PrimeField>(value: &BigUint) -> F {
    F::from_le_bytes_mod_order(&value.to_bytes_le())
}

/// Canonical integer representative of a field element.
pub fn to_biguint<F: PrimeField>(value: &F) -> BigUint {
    BigUint::from_bytes_le(&value.into_bigint().to_bytes_le())
}

/// Base-10 text form of a field element.
pub fn to_decimal<F: PrimeField>(value: &F) -> String {
    to_biguint(value).to_str_radix(10)
}

/// Parse a decimal (or `0x` hex) integer and reduce it into the field.
pub fn from_decimal<F: PrimeField>(text: &str) -> Result<F, TreeError> {
    let text = text.trim();
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex_digits) => BigUint::from_str_radix(hex_digits, 16),
        None => BigUint::from_str_radix(text, 10),
    };
    parsed
        .map(|n| normalize(&n))
        .map_err(|e| TreeError::Encoding(format!("invalid field element {text:?}: {e}")))
}

/// Serde adapter encoding one field element as a decimal string.
pub mod decimal {
    use ark_ff::PrimeField;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<F: PrimeField, S: Serializer>(value: &F, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::to_decimal(value))
    }

    pub fn deserialize<'de, F: PrimeField, D: Deserializer<'de>>(d: D) -> Result<F, D::Error> {
        let text = String::deserialize(d)?;
        super::from_decimal(&text).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for a list of field elements.
pub mod decimal_vec {
    use ark_ff::PrimeField;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<F: PrimeField, S: Serializer>(values: &[F], s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(values.iter().map(super::to_decimal))
    }

    pub fn deserialize<'de, F: PrimeField, D: Deserializer<'de>>(d: D) -> Result<Vec<F>, D::Error> {
        Vec::<String>::deserialize(d)?
            .iter()
            .map(|text| super::from_decimal(text).map_err(serde::de::Error::custom))
            .collect()
    }
}

/// Serde adapter for per-level lists of field elements.
pub mod decimal_nested {
    use ark_ff::PrimeField;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<F: PrimeField, S: Serializer>(
        levels: &[Vec<F>],
        s: S,
    ) -> Result<S::Ok, S::Error> {
        let text: Vec<Vec<String>> = levels
            .iter()
            .map(|level| level.iter().map(super::to_decimal).collect())
            .collect();
        s.collect_seq(text)
    }

    pub fn deserialize<'de, F: PrimeField, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Vec<Vec<F>>, D::Error> {
        Vec::<Vec<String>>::deserialize(d)?
            .iter()
            .map(|level| {
                level
                    .iter()
                    .map(|text| super::from_decimal(text).map_err(serde::de::Error::custom))
                    .collect()
            })
            .collect()
    }
}
