//! Per-cluster counting constraint.

use crate::engine::{Conflict, PropResult, Propagator, Store, Subscriptions};

/// Keeps the number of points in each cluster within `[lower[c], upper[c]]`.
///
/// With lower bound 1 no cluster can stay empty. With `lower == upper ==
/// target` it enforces fixed cardinalities on its own, independently of the
/// bound constraint in use.
pub struct ClusterCardinality {
    lower: Vec<usize>,
    upper: Vec<usize>,
}

impl ClusterCardinality {
    /// Arbitrary per-cluster limits.
    pub fn new(lower: Vec<usize>, upper: Vec<usize>) -> Self {
        debug_assert_eq!(lower.len(), upper.len());
        Self { lower, upper }
    }

    /// Every cluster gets between 1 and `num_points` points.
    pub fn non_empty(num_clusters: usize, num_points: usize) -> Self {
        Self::new(vec![1; num_clusters], vec![num_points; num_clusters])
    }

    /// Cluster `c` gets exactly `targets[c]` points.
    pub fn exact(targets: &[usize]) -> Self {
        Self::new(targets.to_vec(), targets.to_vec())
    }
}

impl Propagator for ClusterCardinality {
    fn name(&self) -> &'static str {
        "cardinality"
    }

    fn subscriptions(&self) -> Subscriptions {
        Subscriptions {
            propagate_on_domain: true,
            ..Default::default()
        }
    }

    fn propagate(&mut self, store: &mut Store) -> PropResult {
        let k = store.num_values();
        let n = store.num_vars();
        if self.lower.iter().sum::<usize>() > n || self.upper.iter().sum::<usize>() < n {
            return Err(Conflict);
        }

        let mut fixed = vec![0usize; k];
        let mut possible = vec![0usize; k];
        for i in 0..n {
            if let Some(c) = store.value(i) {
                fixed[c] += 1;
            }
            for c in store.values(i) {
                possible[c] += 1;
            }
        }

        for c in 0..k {
            if fixed[c] > self.upper[c] || possible[c] < self.lower[c] {
                return Err(Conflict);
            }
        }

        for c in 0..k {
            if fixed[c] == self.upper[c] && possible[c] > fixed[c] {
                for i in 0..n {
                    if !store.is_fixed(i) && store.contains(i, c) {
                        store.remove(i, c)?;
                    }
                }
            } else if possible[c] == self.lower[c] && possible[c] > fixed[c] {
                for i in 0..n {
                    if !store.is_fixed(i) && store.contains(i, c) {
                        store.fix(i, c)?;
                    }
                }
            }
        }

        Ok(())
    }
}
