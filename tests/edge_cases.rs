//! Boundary conditions and error paths for bitforest.

use bitforest::{BitForestIndex, ForestError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// =============================================================================
// Lifecycle errors
// =============================================================================

#[test]
fn add_after_build_is_rejected() {
    let mut index = BitForestIndex::new(1);
    index.add_item(0, &[1]).expect("add");
    index.build(1).expect("build");
    assert!(matches!(
        index.add_item(1, &[2]),
        Err(ForestError::AlreadyBuilt)
    ));
}

#[test]
fn double_build_is_rejected() {
    let mut index = BitForestIndex::new(1);
    index.add_item(0, &[1]).expect("add");
    index.build(1).expect("build");
    assert!(matches!(index.build(1), Err(ForestError::AlreadyBuilt)));
}

#[test]
fn build_without_items_is_rejected() {
    let mut index = BitForestIndex::new(1);
    assert!(matches!(index.build(3), Err(ForestError::NoItems)));
}

#[test]
fn unbuild_before_build_is_rejected() {
    let mut index = BitForestIndex::new(1);
    assert!(matches!(index.unbuild(), Err(ForestError::NotBuilt)));
}

#[test]
fn save_before_build_is_rejected() {
    let mut index = BitForestIndex::new(1);
    index.add_item(0, &[1]).expect("add");
    let dir = tempfile::tempdir().expect("tempdir");
    assert!(matches!(
        index.save(dir.path().join("x.idx")),
        Err(ForestError::NotBuilt)
    ));
}

#[test]
fn wrong_width_vectors_are_rejected() {
    let mut index = BitForestIndex::new(2);
    assert!(matches!(
        index.add_item(0, &[1]),
        Err(ForestError::BadDim { expected: 2, got: 1 })
    ));
    index.add_item(0, &[1, 2]).expect("add");
    index.build(1).expect("build");
    assert!(matches!(
        index.get_nns_by_vector(&[1, 2, 3], 1, None),
        Err(ForestError::BadDim { expected: 2, got: 3 })
    ));
}

// =============================================================================
// Growth and sparse ids
// =============================================================================

#[test]
fn far_id_triggers_growth_and_keeps_existing_items() {
    let mut index = BitForestIndex::new(1);
    index.add_item(0, &[0xaaaa_aaaa]).expect("add 0");
    index.add_item(1000, &[0x5555_5555]).expect("add far");

    assert_eq!(index.n_items(), 1001);
    assert_eq!(index.get_item(0), vec![0xaaaa_aaaa]);
    assert_eq!(index.get_item(1000), vec![0x5555_5555]);
}

#[test]
fn gaps_in_the_id_space_never_surface_in_results() {
    let mut index = BitForestIndex::new(1);
    index.add_item(0, &[0b001]).expect("add");
    index.add_item(5, &[0b011]).expect("add");
    index.add_item(9, &[0b111]).expect("add");
    index.build(4).expect("build");

    assert_eq!(index.n_items(), 10);
    let (ids, _) = index
        .get_nns_by_vector(&[0b001], 10, Some(1000))
        .expect("query");
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, vec![0, 5, 9]);
}

#[test]
fn re_adding_an_id_overwrites_the_vector() {
    let mut index = BitForestIndex::new(1);
    index.add_item(0, &[0xffff_0000]).expect("add");
    index.add_item(0, &[0x0000_ffff]).expect("re-add");
    assert_eq!(index.get_item(0), vec![0x0000_ffff]);
    assert_eq!(index.n_items(), 1);
}

// =============================================================================
// Forest shape
// =============================================================================

#[test]
fn tree_count_matches_the_request() {
    for q in [1usize, 2, 7] {
        let mut index = BitForestIndex::new(1);
        for i in 0..20 {
            index.add_item(i, &[1u32 << (i % 20)]).expect("add");
        }
        index.build(q).expect("build");
        assert_eq!(index.n_trees(), q);
    }
}

#[test]
fn unbuild_then_rebuild_works() {
    let mut index = BitForestIndex::new(1);
    for i in 0..30 {
        index.add_item(i, &[(i as u32) * 0x0101_0101]).expect("add");
    }
    index.build(2).expect("build");
    assert_eq!(index.n_trees(), 2);

    index.unbuild().expect("unbuild");
    assert_eq!(index.n_trees(), 0);

    index.add_item(30, &[0x1234_5678]).expect("add after unbuild");
    index.build(3).expect("rebuild");
    assert_eq!(index.n_trees(), 3);
    assert_eq!(index.n_items(), 31);

    let (ids, distances) = index.get_nns_by_item(30, 1, None).expect("query");
    assert_eq!(ids, vec![30]);
    assert_eq!(distances, vec![0]);
}

#[test]
fn reseeding_reproduces_a_rebuild() {
    let mut index = BitForestIndex::new(1);
    for i in 0..40 {
        index.add_item(i, &[(i as u32).wrapping_mul(0x9e37_79b9)]).expect("add");
    }
    index.set_seed(99);
    index.build(3).expect("build");
    let first = index.get_nns_by_vector(&[0], 10, None).expect("query");

    index.unbuild().expect("unbuild");
    index.set_seed(99);
    index.build(3).expect("rebuild");
    let second = index.get_nns_by_vector(&[0], 10, None).expect("query");
    assert_eq!(first, second);
}

#[test]
fn verbose_output_does_not_change_results() {
    let build = |verbose: bool| {
        let mut index = BitForestIndex::new(1);
        for i in 0..20 {
            // Identical vectors force the coin-flip fallback, which is
            // where the diagnostic note fires.
            index.add_item(i, &[0x5555_5555]).expect("add");
        }
        index.verbose(verbose);
        index.set_seed(11);
        index.build(2).expect("build");
        index.get_nns_by_vector(&[0x5555_5555], 20, None).expect("query")
    };
    assert_eq!(build(true), build(false));
}

// =============================================================================
// Teardown
// =============================================================================

#[test]
fn unload_is_idempotent() {
    let mut index = BitForestIndex::new(1);
    index.add_item(0, &[1]).expect("add");
    index.build(1).expect("build");

    index.unload();
    assert_eq!(index.n_items(), 0);
    assert_eq!(index.n_trees(), 0);
    index.unload();

    // The index is reusable after teardown.
    index.add_item(0, &[2]).expect("add");
    index.build(1).expect("build");
    assert_eq!(index.n_items(), 1);
}

// =============================================================================
// Recall against brute force
// =============================================================================

fn hamming(a: &[u32], b: &[u32]) -> u32 {
    bitforest::hamming::distance(a, b)
}

#[test]
fn exhaustive_search_k_matches_brute_force() {
    let f = 2;
    let n_items = 200;
    let mut rng = StdRng::seed_from_u64(1234);
    let vectors: Vec<[u32; 2]> = (0..n_items).map(|_| [rng.random(), rng.random()]).collect();

    let mut index = BitForestIndex::new(f);
    for (i, v) in vectors.iter().enumerate() {
        index.add_item(i as i32, v).expect("add");
    }
    index.build(6).expect("build");

    for _ in 0..20 {
        let query = [rng.random::<u32>(), rng.random::<u32>()];
        // A search_k covering every leaf reference makes the traversal
        // exhaustive, so the answer must equal brute force exactly.
        let (ids, distances) = index
            .get_nns_by_vector(&query, 10, Some(n_items * 6))
            .expect("query");

        let mut expected: Vec<(u32, i32)> = vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (hamming(&query, v), i as i32))
            .collect();
        expected.sort_unstable();
        expected.truncate(10);

        let got: Vec<(u32, i32)> = distances.into_iter().zip(ids).collect();
        assert_eq!(got, expected);
    }
}

#[test]
fn larger_search_k_never_shrinks_the_result() {
    let mut rng = StdRng::seed_from_u64(77);
    let mut index = BitForestIndex::new(1);
    for i in 0..100 {
        index.add_item(i, &[rng.random()]).expect("add");
    }
    index.build(4).expect("build");

    let query = [rng.random::<u32>()];
    let small = index.get_nns_by_vector(&query, 20, Some(20)).expect("query");
    let large = index.get_nns_by_vector(&query, 20, Some(4000)).expect("query");
    assert!(small.0.len() <= large.0.len());
    assert_eq!(large.0.len(), 20);
}
