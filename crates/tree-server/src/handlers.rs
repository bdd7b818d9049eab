//! Request handlers for the tree API.

use ark_bn254::Fr;
use axum::{
    extract::{Path, State},
    Json,
};
use quin_tree::{field, MerkleProof};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;
use crate::SharedState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Deserialize)]
pub struct LeafRequest {
    /// Decimal (or `0x` hex) field element.
    pub leaf: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertLeafResponse {
    pub index: usize,
    pub tree_num: usize,
    pub root: String,
}

pub async fn insert_leaf(
    State(state): State<SharedState>,
    Json(req): Json<LeafRequest>,
) -> Result<Json<InsertLeafResponse>, ApiError> {
    let leaf: Fr = field::from_decimal(&req.leaf)?;

    let mut state = state.write().await;
    let index = state.tree.leaves().len();
    let root = state.tree.insert(leaf);
    let tree_num = state.tree.current_tree_num();

    tracing::info!(index, tree_num, "inserted leaf");

    Ok(Json(InsertLeafResponse {
        index,
        tree_num,
        root: field::to_decimal(&root),
    }))
}

#[derive(Serialize)]
pub struct LeafResponse {
    pub index: usize,
    pub leaf: String,
}

pub async fn get_leaf(
    State(state): State<SharedState>,
    Path(index): Path<usize>,
) -> Result<Json<LeafResponse>, ApiError> {
    let state = state.read().await;
    let leaf = state
        .tree
        .get_leaf(index)
        .ok_or(ApiError::LeafNotFound(index))?;

    Ok(Json(LeafResponse {
        index,
        leaf: field::to_decimal(&leaf),
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLeafResponse {
    pub tree_num: usize,
    pub root: String,
}

pub async fn update_leaf(
    State(state): State<SharedState>,
    Path(index): Path<usize>,
    Json(req): Json<LeafRequest>,
) -> Result<Json<UpdateLeafResponse>, ApiError> {
    let leaf: Fr = field::from_decimal(&req.leaf)?;

    // O(n) replay of the constituent
    let mut state = state.write_owned().await;
    let (root, tree_num) = tokio::task::spawn_blocking(move || {
        let root = state.tree.update(index, leaf)?;
        Ok::<_, ApiError>((root, index / state.tree.capacity()))
    })
    .await??;

    tracing::info!(index, tree_num, "updated leaf");

    Ok(Json(UpdateLeafResponse {
        tree_num,
        root: field::to_decimal(&root),
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RootsResponse {
    pub current_tree_num: usize,
    pub roots: Vec<String>,
}

pub async fn roots(State(state): State<SharedState>) -> Json<RootsResponse> {
    let state = state.read().await;
    Json(RootsResponse {
        current_tree_num: state.tree.current_tree_num(),
        roots: state.tree.roots().iter().map(field::to_decimal).collect(),
    })
}

/// A proof plus the hex of its binary encoding.
#[derive(Serialize)]
pub struct PathResponse {
    #[serde(flatten)]
    pub proof: MerkleProof<Fr>,
    pub hex: String,
}

impl PathResponse {
    fn new(proof: MerkleProof<Fr>) -> Result<Self, ApiError> {
        let hex = proof.to_hex()?;
        Ok(Self { proof, hex })
    }
}

pub async fn merkle_path(
    State(state): State<SharedState>,
    Path(index): Path<usize>,
) -> Result<Json<PathResponse>, ApiError> {
    let state = state.read().await;
    let proof = state.tree.gen_merkle_path(index)?;
    Ok(Json(PathResponse::new(proof)?))
}

#[derive(Deserialize)]
pub struct SubrootPathRequest {
    pub start: usize,
    pub end: usize,
}

pub async fn subroot_path(
    State(state): State<SharedState>,
    Json(req): Json<SubrootPathRequest>,
) -> Result<Json<PathResponse>, ApiError> {
    let state = state.read().await;
    let proof = state.tree.gen_merkle_subroot_path(req.start, req.end)?;
    Ok(Json(PathResponse::new(proof)?))
}

#[derive(Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
}

/// Any JSON body is accepted; one that does not decode as a proof is
/// reported as invalid.
pub async fn verify(
    State(state): State<SharedState>,
    Json(body): Json<Value>,
) -> Json<VerifyResponse> {
    let proof = match serde_json::from_value::<MerkleProof<Fr>>(body) {
        Ok(proof) => proof,
        Err(e) => {
            tracing::debug!(error = %e, "rejecting undecodable proof");
            return Json(VerifyResponse { valid: false });
        }
    };

    let state = state.read().await;
    Json(VerifyResponse {
        valid: state.tree.verify_merkle_path(&proof),
    })
}
