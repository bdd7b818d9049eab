//! End-to-end tests across trees, proofs and the inclusion circuit.

use std::sync::Arc;

use ark_bn254::{Bn254, Fr};
use ark_groth16::Groth16;
use ark_snark::SNARK;
use ark_std::rand::thread_rng;

use crate::gadgets::InclusionCircuit;
use crate::hasher::{NodeHasher, PoseidonHasher};
use crate::multi::MultiIncrementalQuinTree;
use crate::proof::{verify_merkle_path, MerkleProof};
use crate::tree::IncrementalQuinTree;
use crate::{MultiQuinTree, QuinTree};

fn quin_tree(depth: usize) -> QuinTree {
    IncrementalQuinTree::with_params(depth, Fr::from(0u64), 5, Arc::new(PoseidonHasher::new(5)))
        .unwrap()
}

fn multi_quin_tree(depth: usize) -> MultiQuinTree {
    MultiIncrementalQuinTree::with_params(
        depth,
        Fr::from(0u64),
        5,
        Arc::new(PoseidonHasher::new(5)),
    )
    .unwrap()
}

/// Test full Groth16 proof generation and verification for InclusionCircuit
#[test]
fn test_inclusion_full_proof() {
    let mut rng = thread_rng();

    let mut tree = quin_tree(3);
    for i in 0..30u64 {
        tree.insert(Fr::from(i * 11 + 1));
    }
    let config = Arc::new(tree.hasher().config().clone());

    // Setup
    let empty_circuit = InclusionCircuit::empty(3, 5, config.clone());
    let (pk, vk) = Groth16::<Bn254>::circuit_specific_setup(empty_circuit, &mut rng).unwrap();

    // Prove leaf 17
    let merkle_proof = tree.gen_merkle_path(17).unwrap();
    let circuit = InclusionCircuit::new(&merkle_proof, 5, config);
    let proof = Groth16::<Bn254>::prove(&pk, circuit, &mut rng).unwrap();

    // Public inputs: [root]
    let valid = Groth16::<Bn254>::verify(&vk, &[tree.root()], &proof).unwrap();
    assert!(valid, "Proof verification failed");

    // Same proof against a stale root
    let empty_root = quin_tree(3).root();
    let stale = Groth16::<Bn254>::verify(&vk, &[empty_root], &proof).unwrap();
    assert!(!stale, "Proof should fail against the empty root");
}

/// Depth 2, arity 5: the 26th insert opens a second constituent
#[test]
fn test_multi_tree_rollover_scenario() {
    let mut multi = multi_quin_tree(2);
    let mut single = quin_tree(2);

    for i in 0..25u64 {
        let leaf = Fr::from(i + 100);
        assert_eq!(multi.insert(leaf), single.insert(leaf));
    }
    assert_eq!(multi.current_tree_num(), 0);
    assert_eq!(multi.next_index(), 25);
    let full_root = multi.current_root();

    let root = multi.insert(Fr::from(125u64));
    assert_eq!(multi.current_tree_num(), 1);
    assert_eq!(multi.next_index(), 1);
    assert_eq!(multi.root(0), Some(full_root));

    let mut fresh = quin_tree(2);
    assert_eq!(root, fresh.insert(Fr::from(125u64)));
    assert_eq!(multi.root(1), Some(fresh.root()));

    let proof = multi.gen_merkle_path(25).unwrap();
    assert_eq!(proof.indices, vec![0, 0]);
    assert_eq!(proof.root, fresh.root());
    assert!(multi.verify_merkle_path(&proof));
}

/// Positions decompose into base-5 digits, least significant first
#[test]
fn test_path_indices_depth_four() {
    let mut tree = quin_tree(4);
    for i in 0..601u64 {
        tree.insert(Fr::from(i));
    }

    for (index, expected) in [
        (0usize, vec![0usize, 0, 0, 0]),
        (350, vec![0, 0, 4, 2]),
        (600, vec![0, 0, 4, 4]),
    ] {
        let proof = tree.gen_merkle_path(index).unwrap();
        assert_eq!(proof.indices, expected, "index {index}");
        assert_eq!(proof.position(5), index);
        assert!(tree.verify_merkle_path(&proof));
    }
}

/// Subroot path of the second 25-leaf block in a depth-3 tree
#[test]
fn test_subroot_path_scenario() {
    let mut tree = quin_tree(3);
    for i in 0..60u64 {
        tree.insert(Fr::from(i + 1));
    }

    let proof = tree.gen_merkle_subroot_path(25, 50).unwrap();
    assert_eq!(proof.depth, 1);
    assert_eq!(proof.indices, vec![1]);

    let mut block = quin_tree(2);
    for leaf in &tree.leaves()[25..50] {
        block.insert(*leaf);
    }
    assert_eq!(proof.leaf, block.root());
    assert!(tree.verify_merkle_path(&proof));
}

/// Proofs survive the JSON round trip and verify stateless
#[test]
fn test_proof_text_transport() {
    let mut tree = quin_tree(3);
    for i in 0..7u64 {
        tree.insert(Fr::from(i * 1_000_003));
    }
    let proof = tree.gen_merkle_path(6).unwrap();

    let json = proof.to_json().unwrap();
    let parsed = MerkleProof::<Fr>::from_json(&json).unwrap();
    let hasher = PoseidonHasher::<Fr>::new(5);
    assert!(verify_merkle_path(&parsed, &hasher));

    let hex = proof.to_hex().unwrap();
    assert_eq!(MerkleProof::<Fr>::from_hex(&hex).unwrap(), proof);
}

/// Binary trees hash pairs without padding
#[test]
fn test_binary_root_by_hand() {
    let hasher = PoseidonHasher::<Fr>::new(2);
    let mut tree =
        IncrementalQuinTree::with_params(2, Fr::from(0u64), 2, Arc::new(PoseidonHasher::new(2)))
            .unwrap();
    let leaves: Vec<Fr> = (1..=3u64).map(Fr::from).collect();
    for leaf in &leaves {
        tree.insert(*leaf);
    }

    let left = hasher.hash(&[leaves[0], leaves[1]]);
    let right = hasher.hash(&[leaves[2], Fr::from(0u64)]);
    assert_eq!(tree.root(), hasher.hash(&[left, right]));
}
