//! Shared instance builders for the integration tests.

#![allow(dead_code)]

use mssc_core::Instance;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Two well-separated triples in the plane.
pub fn two_triples() -> Instance {
    Instance::from_coordinates(
        vec![
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![10.0, 10.0],
            vec![10.0, 11.0],
            vec![11.0, 10.0],
        ],
        2,
    )
    .unwrap()
}

/// Three well-separated triples in the plane, points interleaved.
pub fn three_triples() -> Instance {
    Instance::from_coordinates(
        vec![
            vec![0.0, 0.0],
            vec![20.0, 0.0],
            vec![0.0, 20.0],
            vec![1.0, 0.0],
            vec![21.0, 1.0],
            vec![1.0, 21.0],
            vec![0.0, 1.0],
            vec![20.0, 2.0],
            vec![2.0, 20.0],
        ],
        3,
    )
    .unwrap()
}

/// Random points in `[0, 10)^dim`.
pub fn random_instance(rng: &mut ChaCha8Rng, n: usize, k: usize, dim: usize) -> Instance {
    let coords = (0..n)
        .map(|_| (0..dim).map(|_| rng.gen_range(0.0..10.0)).collect())
        .collect();
    Instance::from_coordinates(coords, k).unwrap()
}

/// Random positive cluster sizes summing to `n`.
pub fn random_targets(rng: &mut ChaCha8Rng, n: usize, k: usize) -> Vec<usize> {
    let mut targets = vec![1; k];
    for _ in k..n {
        targets[rng.gen_range(0..k)] += 1;
    }
    targets
}

/// True when `a` and `b` describe the same partition up to relabeling.
pub fn same_partition(a: &[usize], b: &[usize]) -> bool {
    a.len() == b.len()
        && (0..a.len()).all(|i| (0..a.len()).all(|j| (a[i] == a[j]) == (b[i] == b[j])))
}
