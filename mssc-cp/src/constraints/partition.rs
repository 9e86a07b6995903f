//! Snapshot of the partial assignment.
//!
//! Bound constraints rebuild this picture from the live domains on every call
//! and never carry it across nodes.

use mssc_core::Instance;

use crate::engine::{Conflict, Store};

/// Points grouped by fixed label, plus the free points.
#[derive(Debug, Clone)]
pub(crate) struct PartitionView {
    members: Vec<Vec<usize>>,
    unassigned: Vec<usize>,
}

impl PartitionView {
    /// Read the current assignment out of `store`.
    pub fn capture(store: &Store) -> Self {
        let mut members = vec![Vec::new(); store.num_values()];
        let mut unassigned = Vec::new();
        for i in 0..store.num_vars() {
            match store.value(i) {
                Some(c) => members[c].push(i),
                None => unassigned.push(i),
            }
        }
        Self {
            members,
            unassigned,
        }
    }

    /// Points fixed to cluster `c`, in index order.
    pub fn members(&self, c: usize) -> &[usize] {
        &self.members[c]
    }

    /// Number of points fixed to cluster `c`.
    #[inline]
    pub fn size(&self, c: usize) -> usize {
        self.members[c].len()
    }

    /// Free points, in index order.
    pub fn unassigned(&self) -> &[usize] {
        &self.unassigned
    }

    /// Number of free points (q).
    #[inline]
    pub fn num_unassigned(&self) -> usize {
        self.unassigned.len()
    }

    /// Sum of pairwise dissimilarities among the members of each cluster (S1).
    pub fn within_sums(&self, instance: &Instance) -> Vec<f64> {
        self.members
            .iter()
            .map(|pts| {
                let mut sum = 0.0;
                for (a, &i) in pts.iter().enumerate() {
                    let row = instance.dissimilarity_row(i);
                    for &j in &pts[a + 1..] {
                        sum += row[j];
                    }
                }
                sum
            })
            .collect()
    }

    /// Sum of dissimilarities between `point` and the members of `c` (s2).
    pub fn affinity(&self, instance: &Instance, point: usize, c: usize) -> f64 {
        let row = instance.dissimilarity_row(point);
        self.members[c].iter().map(|&j| row[j]).sum()
    }

    /// Completion costs of every free point (s3).
    ///
    /// Entry `[u][m]` is the smallest possible half-dissimilarity total between
    /// the `u`-th free point and `m` other free points. Entry `[u][0]` is the
    /// point's distance to itself, so always 0.
    pub fn completion_costs(&self, instance: &Instance) -> Vec<Vec<f64>> {
        self.unassigned
            .iter()
            .map(|&i| {
                let row = instance.dissimilarity_row(i);
                let mut halves: Vec<f64> = self.unassigned.iter().map(|&j| row[j] / 2.0).collect();
                halves.sort_by(|a, b| a.total_cmp(b));
                for m in 1..halves.len() {
                    halves[m] += halves[m - 1];
                }
                halves
            })
            .collect()
    }
}

/// Remove full clusters from the domain of every free point.
///
/// Removals can fix points and fill further clusters, so the filter repeats
/// until no point gets fixed. Returns the final snapshot together with how
/// many points each cluster still needs. Fails when a cluster holds more
/// points than its target.
pub(crate) fn settle_full_clusters(
    store: &mut Store,
    targets: &[usize],
) -> Result<(PartitionView, Vec<usize>), Conflict> {
    loop {
        let view = PartitionView::capture(store);
        let mut to_add = Vec::with_capacity(targets.len());
        for (c, &target) in targets.iter().enumerate() {
            if view.size(c) > target {
                return Err(Conflict);
            }
            to_add.push(target - view.size(c));
        }

        let mut fixed_any = false;
        for (c, &missing) in to_add.iter().enumerate() {
            if missing > 0 {
                continue;
            }
            for &i in view.unassigned() {
                if store.contains(i, c) {
                    store.remove(i, c)?;
                    fixed_any |= store.is_fixed(i);
                }
            }
        }

        if !fixed_any {
            return Ok((view, to_add));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line() -> Instance {
        Instance::from_coordinates(
            vec![vec![0.0], vec![1.0], vec![3.0], vec![7.0]],
            2,
        )
        .unwrap()
    }

    #[test]
    fn test_capture_and_sums() {
        let inst = line();
        let mut store = Store::new(4, 2);
        store.fix(0, 0).unwrap();
        store.fix(1, 0).unwrap();

        let view = PartitionView::capture(&store);
        assert_eq!(view.members(0), &[0, 1]);
        assert_eq!(view.size(1), 0);
        assert_eq!(view.unassigned(), &[2, 3]);

        let s1 = view.within_sums(&inst);
        assert_eq!(s1, vec![1.0, 0.0]);

        // d(2,0) + d(2,1) = 9 + 4
        assert_eq!(view.affinity(&inst, 2, 0), 13.0);
        assert_eq!(view.affinity(&inst, 2, 1), 0.0);
    }

    #[test]
    fn test_completion_costs() {
        let inst = line();
        let store = Store::new(4, 2);
        let view = PartitionView::capture(&store);
        let s3 = view.completion_costs(&inst);

        // Point 0: halves of [0, 1, 9, 49] prefix-summed.
        assert_eq!(s3[0], vec![0.0, 0.5, 5.0, 29.5]);
        assert!(s3.iter().all(|row| row[0] == 0.0));
    }

    #[test]
    fn test_settle_full_clusters() {
        let mut store = Store::new(4, 2);
        store.fix(0, 0).unwrap();
        store.fix(1, 0).unwrap();

        // Cluster 0 is full: everybody else goes to 1.
        let (view, to_add) = settle_full_clusters(&mut store, &[2, 2]).unwrap();
        assert_eq!(to_add, vec![0, 0]);
        assert_eq!(view.num_unassigned(), 0);
        assert_eq!(store.value(2), Some(1));
        assert_eq!(store.value(3), Some(1));

        // Overfilled cluster fails.
        let mut store = Store::new(3, 2);
        store.fix(0, 1).unwrap();
        store.fix(1, 1).unwrap();
        assert!(settle_full_clusters(&mut store, &[2, 1]).is_err());
    }
}
