//! Server configuration from the environment.

use std::net::SocketAddr;
use std::str::FromStr;

use ark_bn254::Fr;
use quin_tree::{field, Arity, TreeConfig, TreeError};
use thiserror::Error;

const DEFAULT_DEPTH: usize = 10;
const DEFAULT_ARITY: usize = 5;
const DEFAULT_ADDR: &str = "0.0.0.0:3000";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?}")]
    InvalidVar { name: &'static str, value: String },

    #[error(transparent)]
    Tree(#[from] TreeError),
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub tree: TreeConfig<Fr>,
    pub addr: SocketAddr,
}

impl ServerConfig {
    /// Read `QUIN_TREE_DEPTH`, `QUIN_TREE_ARITY`, `QUIN_TREE_ZERO` and
    /// `QUIN_TREE_ADDR`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let depth = parse_var(&lookup, "QUIN_TREE_DEPTH", DEFAULT_DEPTH)?;
        let arity = Arity::try_from(parse_var(&lookup, "QUIN_TREE_ARITY", DEFAULT_ARITY)?)?;
        let zero_value = match lookup("QUIN_TREE_ZERO") {
            Some(text) => field::from_decimal(&text)?,
            None => Fr::from(0u64),
        };
        let addr = match lookup("QUIN_TREE_ADDR") {
            Some(text) => parse(&text, "QUIN_TREE_ADDR")?,
            None => parse(DEFAULT_ADDR, "QUIN_TREE_ADDR")?,
        };

        let tree = TreeConfig::new(depth, arity, zero_value);
        tree.validate()?;

        Ok(Self { tree, addr })
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(text) => parse(&text, name),
        None => Ok(default),
    }
}

fn parse<T: FromStr>(text: &str, name: &'static str) -> Result<T, ConfigError> {
    text.trim().parse().map_err(|_| ConfigError::InvalidVar {
        name,
        value: text.to_string(),
    })
}
