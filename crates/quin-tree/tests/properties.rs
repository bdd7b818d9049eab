//! Integration tests for tree invariants across many insertion patterns.

use std::sync::Arc;

use ark_bn254::Fr;
use quin_tree::{
    verify_merkle_paths, IncrementalQuinTree, MultiIncrementalQuinTree, PoseidonHasher,
    TreeError,
};

type Tree = IncrementalQuinTree<Fr, PoseidonHasher<Fr>>;
type Multi = MultiIncrementalQuinTree<Fr, PoseidonHasher<Fr>>;

fn tree(depth: usize, arity: usize) -> Tree {
    IncrementalQuinTree::with_params(depth, Fr::from(0u64), arity, Arc::new(PoseidonHasher::new(arity)))
        .unwrap()
}

fn multi(depth: usize, arity: usize) -> Multi {
    MultiIncrementalQuinTree::with_params(
        depth,
        Fr::from(0u64),
        arity,
        Arc::new(PoseidonHasher::new(arity)),
    )
    .unwrap()
}

fn leaf(i: usize) -> Fr {
    Fr::from((i as u64) * 7919 + 3)
}

fn filled(depth: usize, arity: usize, n: usize) -> Tree {
    let mut t = tree(depth, arity);
    for i in 0..n {
        t.insert(leaf(i));
    }
    t
}

#[test]
fn test_every_leaf_path_verifies() {
    for (depth, arity, n) in [(3, 5, 37), (4, 2, 16), (2, 5, 25), (5, 2, 9)] {
        let t = filled(depth, arity, n);
        for index in 0..n {
            let proof = t.gen_merkle_path(index).unwrap();
            assert_eq!(proof.leaf, leaf(index));
            assert_eq!(proof.root, t.root());
            assert_eq!(proof.depth, depth);
            assert_eq!(proof.position(arity), index);
            assert!(
                t.verify_merkle_path(&proof),
                "depth {depth} arity {arity} index {index}"
            );
        }
    }
}

#[test]
fn test_paths_stay_valid_as_tree_grows() {
    let mut t = tree(3, 5);
    for n in 1..=30 {
        t.insert(leaf(n - 1));
        // first and most recent leaf against the current root
        assert!(t.verify_merkle_path(&t.gen_merkle_path(0).unwrap()));
        assert!(t.verify_merkle_path(&t.gen_merkle_path(n - 1).unwrap()));
    }
}

#[test]
fn test_stale_proof_fails_after_insert() {
    let mut t = filled(3, 5, 4);
    let proof = t.gen_merkle_path(2).unwrap();
    t.insert(leaf(4));

    let mut stale = proof;
    stale.root = t.root();
    assert!(!t.verify_merkle_path(&stale));
}

#[test]
fn test_same_inserts_same_root() {
    let a = filled(3, 5, 21);
    let b = filled(3, 5, 21);
    assert_eq!(a.root(), b.root());
    assert_eq!(a, b);

    // proof generation does not mutate
    let before = a.clone();
    for index in 0..21 {
        a.gen_merkle_path(index).unwrap();
    }
    a.gen_merkle_subroot_path(0, 5).unwrap();
    assert_eq!(a, before);
}

#[test]
fn test_repeated_proofs_are_identical() {
    let t = filled(3, 5, 47);
    for index in 0..47 {
        assert_eq!(t.gen_merkle_path(index), t.gen_merkle_path(index));
    }
    for start in (0..47).step_by(5) {
        assert_eq!(
            t.gen_merkle_subroot_path(start, start + 5),
            t.gen_merkle_subroot_path(start, start + 5)
        );
    }

    let mut m = multi(2, 5);
    for i in 0..60 {
        m.insert(leaf(i));
    }
    for index in 0..60 {
        assert_eq!(m.gen_merkle_path(index), m.gen_merkle_path(index));
    }
    for start in (0..60).step_by(5) {
        let first = m.gen_merkle_subroot_path(start, start + 5).unwrap();
        assert_eq!(first, m.gen_merkle_subroot_path(start, start + 5).unwrap());
    }
}

#[test]
fn test_clone_is_independent() {
    let original = filled(2, 5, 6);
    let mut copy = original.clone();
    copy.insert(leaf(6));
    copy.update(0, Fr::from(1u64)).unwrap();

    assert_eq!(original.next_index(), 6);
    assert_eq!(original.get_leaf(0), Some(leaf(0)));
    assert_ne!(original.root(), copy.root());
    assert_eq!(original, filled(2, 5, 6));
}

#[test]
fn test_update_equals_rebuild() {
    for (depth, arity, n) in [(3, 5, 33), (4, 2, 13)] {
        for index in [0, n / 2, n - 1] {
            let mut updated = filled(depth, arity, n);
            let root = updated.update(index, Fr::from(424242u64)).unwrap();

            let mut rebuilt = tree(depth, arity);
            for i in 0..n {
                rebuilt.insert(if i == index { Fr::from(424242u64) } else { leaf(i) });
            }

            assert_eq!(root, rebuilt.root());
            assert_eq!(updated, rebuilt);
            assert_eq!(updated.filled_paths(), rebuilt.filled_paths());

            let proof = updated.gen_merkle_path(index).unwrap();
            assert_eq!(proof.leaf, Fr::from(424242u64));
            assert!(updated.verify_merkle_path(&proof));
        }
    }
}

#[test]
fn test_update_then_insert_continues() {
    let mut t = filled(3, 5, 8);
    t.update(3, Fr::from(5u64)).unwrap();
    t.insert(leaf(8));

    let mut expected = tree(3, 5);
    for i in 0..9 {
        expected.insert(if i == 3 { Fr::from(5u64) } else { leaf(i) });
    }
    assert_eq!(t.root(), expected.root());
}

#[test]
fn test_subroot_matches_independent_tree() {
    let t = filled(3, 5, 73);

    // every aligned block of 5 and of 25
    for (sub_depth, span) in [(1usize, 5usize), (2, 25)] {
        for start in (0..73).step_by(span) {
            let proof = t.gen_merkle_subroot_path(start, start + span).unwrap();

            let mut block = tree(sub_depth, 5);
            for i in start..(start + span).min(73) {
                block.insert(leaf(i));
            }

            assert_eq!(proof.leaf, block.root(), "block at {start}");
            assert_eq!(proof.depth, 3 - sub_depth);
            assert_eq!(proof.root, t.root());
            assert!(t.verify_merkle_path(&proof));
        }
    }
}

#[test]
fn test_binary_subroot() {
    let t = filled(4, 2, 11);
    let proof = t.gen_merkle_subroot_path(8, 12).unwrap();

    let mut block = tree(2, 2);
    for i in 8..11 {
        block.insert(leaf(i));
    }
    assert_eq!(proof.leaf, block.root());
    assert_eq!(proof.indices, vec![0, 1]);
    assert!(t.verify_merkle_path(&proof));
}

#[test]
fn test_subroot_range_errors() {
    let t = filled(3, 5, 60);

    let invalid = |start, end| {
        matches!(
            t.gen_merkle_subroot_path(start, end),
            Err(TreeError::InvalidSubrootRange { .. })
        )
    };
    assert!(invalid(5, 5));
    assert!(invalid(10, 5));
    // not a multiple of the arity
    assert!(invalid(0, 4));
    // multiple but not a power
    assert!(invalid(0, 10));
    // whole tree
    assert!(invalid(0, 125));
    // misaligned
    assert!(invalid(5, 30));

    assert!(matches!(
        t.gen_merkle_subroot_path(60, 65),
        Err(TreeError::IndexOutOfRange { index: 60, len: 60 })
    ));
}

#[test]
fn test_index_boundaries() {
    let mut t = filled(2, 5, 3);
    assert!(t.gen_merkle_path(2).is_ok());
    assert!(matches!(
        t.gen_merkle_path(3),
        Err(TreeError::IndexOutOfRange { index: 3, len: 3 })
    ));
    assert!(matches!(
        t.update(3, Fr::from(1u64)),
        Err(TreeError::IndexOutOfRange { .. })
    ));
    assert_eq!(t.get_leaf(3), None);
}

#[test]
fn test_full_tree() {
    let t = filled(2, 5, 25);
    assert_eq!(t.next_index(), t.capacity());
    for index in [0, 12, 24] {
        assert!(t.verify_merkle_path(&t.gen_merkle_path(index).unwrap()));
    }
}

#[test]
fn test_batch_verification() {
    let t = filled(3, 5, 20);
    let mut proofs: Vec<_> = (0..20).map(|i| t.gen_merkle_path(i).unwrap()).collect();
    proofs[7].leaf = Fr::from(0u64);

    let results = verify_merkle_paths(&proofs, t.hasher().as_ref());
    for (i, valid) in results.iter().enumerate() {
        assert_eq!(*valid, i != 7);
    }
}

#[test]
fn test_multi_tree_second_constituent() {
    let mut m = multi(2, 5);
    for i in 0..40 {
        m.insert(leaf(i));
    }
    assert_eq!(m.num_trees(), 2);
    assert_eq!(m.current_tree_num(), 1);
    assert_eq!(m.next_index(), 15);

    let mut second = tree(2, 5);
    for i in 25..40 {
        second.insert(leaf(i));
    }
    assert_eq!(m.root(1), Some(second.root()));

    // paths in both constituents
    let first_proof = m.gen_merkle_path(24).unwrap();
    assert_eq!(first_proof.root, m.root(0).unwrap());
    assert!(m.verify_merkle_path(&first_proof));

    let proof = m.gen_merkle_path(33).unwrap();
    assert_eq!(proof, second.gen_merkle_path(8).unwrap());

    // updating the second constituent leaves the first untouched
    let first_root = m.root(0);
    let root = m.update(30, Fr::from(9u64)).unwrap();
    second.update(5, Fr::from(9u64)).unwrap();
    assert_eq!(root, second.root());
    assert_eq!(m.root(0), first_root);
    assert_eq!(m.get_leaf(30), Some(Fr::from(9u64)));

    // subroot of the second constituent
    let sub = m.gen_merkle_subroot_path(30, 35).unwrap();
    assert_eq!(sub, second.gen_merkle_subroot_path(5, 10).unwrap());
    assert!(m.verify_merkle_path(&sub));
}

#[test]
fn test_multi_tree_boundaries() {
    let mut m = multi(2, 2);
    for i in 0..6 {
        m.insert(leaf(i));
    }
    assert_eq!(m.num_trees(), 2);

    assert!(matches!(
        m.gen_merkle_path(8),
        Err(TreeError::TreeNumberOutOfRange { tree_num: 2, num_trees: 2 })
    ));
    assert!(matches!(
        m.gen_merkle_path(6),
        Err(TreeError::IndexOutOfRange { index: 6, len: 6 })
    ));
    assert!(matches!(
        m.update(7, Fr::from(1u64)),
        Err(TreeError::IndexOutOfRange { .. })
    ));
    // spans constituents 0 and 1
    assert!(matches!(
        m.gen_merkle_subroot_path(2, 6),
        Err(TreeError::InvalidSubrootRange { .. })
    ));
}

#[test]
fn test_multi_tree_clone_and_equality() {
    let mut a = multi(2, 5);
    for i in 0..27 {
        a.insert(leaf(i));
    }
    let mut b = a.clone();
    assert_eq!(a, b);

    b.insert(leaf(27));
    assert_ne!(a, b);
    assert_eq!(a.leaves().len(), 27);
    assert_eq!(a.filled_subtrees(1).map(|s| s.len()), Some(2));
    assert!(a.filled_subtrees(2).is_none());
}
