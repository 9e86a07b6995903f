//! WCSS lower bound under fixed cluster cardinalities.
//!
//! Every cluster's final size is known, so only two completions matter per
//! cluster: filled up to its target, or filled to one short of it (the slot
//! left for the point being tested during filtering). The global bound is a
//! plain sum over clusters.

use mssc_core::Instance;

use super::partition::settle_full_clusters;
use crate::engine::{PropResult, Propagator, Store, Subscriptions};

/// Subtracted from the computed bound to absorb rounding.
const BOUND_EPS: f64 = 5e-5;

/// Cardinality-aware WCSS bound using direct completion estimates.
pub struct StandardCardControl<'a> {
    instance: &'a Instance,
    targets: Vec<usize>,
    anchor_first_point: bool,
}

impl<'a> StandardCardControl<'a> {
    /// Create the constraint for `instance` with per-cluster `targets`.
    ///
    /// With `anchor_first_point`, point 0 is sent to cluster 0 while nothing is
    /// assigned yet; only valid when that placement loses no solution.
    pub fn new(instance: &'a Instance, targets: Vec<usize>, anchor_first_point: bool) -> Self {
        debug_assert_eq!(targets.len(), instance.num_clusters());
        debug_assert_eq!(targets.iter().sum::<usize>(), instance.num_points());
        Self {
            instance,
            targets,
            anchor_first_point,
        }
    }
}

impl<'a> Propagator for StandardCardControl<'a> {
    fn name(&self) -> &'static str {
        "wcss-standard-card"
    }

    fn subscriptions(&self) -> Subscriptions {
        Subscriptions {
            propagate_on_domain: true,
            propagate_on_objective: true,
            ..Default::default()
        }
    }

    fn propagate(&mut self, store: &mut Store) -> PropResult {
        let (view, to_add) = settle_full_clusters(store, &self.targets)?;
        let k = store.num_values();
        let q = view.num_unassigned();

        if q == store.num_vars() {
            if self.anchor_first_point {
                store.fix(0, 0)?;
            }
            return Ok(());
        }

        let s1 = view.within_sums(self.instance);
        let s3 = view.completion_costs(self.instance);
        let s2: Vec<Vec<f64>> = view
            .unassigned()
            .iter()
            .map(|&i| {
                (0..k)
                    .map(|c| {
                        if to_add[c] > 0 && store.contains(i, c) {
                            view.affinity(self.instance, i, c)
                        } else {
                            f64::INFINITY
                        }
                    })
                    .collect()
            })
            .collect();

        // schedule[c][m]: bound on cluster c completed to (target - m).
        let mut schedule = vec![[0.0f64; 2]; k];
        let mut costs = Vec::with_capacity(q);
        for c in 0..k {
            let missing = to_add[c];
            if missing > 0 {
                costs.clear();
                costs.extend((0..q).map(|u| s2[u][c] + s3[u][missing - 1]));
                costs.sort_by(|a: &f64, b| a.total_cmp(b));
            }
            for (m, slot) in schedule[c].iter_mut().enumerate() {
                let take = missing.saturating_sub(m);
                let selected: f64 = costs[..take].iter().sum();
                let denom = (view.size(c) + missing).saturating_sub(m);
                *slot = if denom > 0 {
                    (s1[c] + selected) / denom as f64
                } else {
                    0.0
                };
            }
        }

        let total: f64 = schedule.iter().map(|s| s[0]).sum();
        store.set_objective_min(total - BOUND_EPS)?;

        let upper = store.objective_max();
        for c in 0..k {
            let missing = to_add[c];
            if missing == 0 {
                continue;
            }
            let except = total - schedule[c][0];
            let full = view.size(c) + missing;
            for (u, &i) in view.unassigned().iter().enumerate() {
                if !store.contains(i, c) {
                    continue;
                }
                let prime = ((full - 1) as f64 * schedule[c][1] + s2[u][c] + s3[u][missing - 1])
                    / full as f64;
                if except + prime >= upper {
                    store.remove(i, c)?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Conflict;

    fn three_triples() -> Instance {
        let mut coords = Vec::new();
        for &(x, y) in &[(0.0, 0.0), (20.0, 0.0), (0.0, 20.0)] {
            coords.push(vec![x, y]);
            coords.push(vec![x + 1.0, y]);
            coords.push(vec![x, y + 1.0]);
        }
        Instance::from_coordinates(coords, 3)
            .unwrap()
            .with_target_cardinalities(vec![3, 3, 3])
            .unwrap()
    }

    #[test]
    fn test_anchor_on_empty_assignment() {
        let inst = three_triples();
        let mut store = Store::new(9, 3);
        let mut cons = StandardCardControl::new(&inst, vec![3, 3, 3], true);
        cons.propagate(&mut store).unwrap();
        assert_eq!(store.value(0), Some(0));

        let mut store = Store::new(9, 3);
        let mut cons = StandardCardControl::new(&inst, vec![3, 3, 3], false);
        cons.propagate(&mut store).unwrap();
        assert_eq!(store.value(0), None);
    }

    #[test]
    fn test_overfilled_cluster_fails() {
        let inst = three_triples();
        let mut store = Store::new(9, 3);
        for i in 0..4 {
            store.fix(i, 0).unwrap();
        }
        let mut cons = StandardCardControl::new(&inst, vec![3, 3, 3], false);
        assert_eq!(cons.propagate(&mut store), Err(Conflict));
    }

    #[test]
    fn test_full_cluster_removed_from_domains() {
        let inst = three_triples();
        let mut store = Store::new(9, 3);
        for i in 0..3 {
            store.fix(i, 0).unwrap();
        }
        let mut cons = StandardCardControl::new(&inst, vec![3, 3, 3], false);
        cons.propagate(&mut store).unwrap();
        for i in 3..9 {
            assert!(!store.contains(i, 0));
        }
    }

    #[test]
    fn test_bound_exact_when_complete() {
        let inst = three_triples();
        let memberships = [0, 0, 0, 1, 1, 1, 2, 2, 2];
        let mut store = Store::new(9, 3);
        for (i, &c) in memberships[..8].iter().enumerate() {
            store.fix(i, c).unwrap();
        }
        let mut cons = StandardCardControl::new(&inst, vec![3, 3, 3], false);
        cons.propagate(&mut store).unwrap();

        // The last point is forced into the only open cluster.
        assert_eq!(store.value(8), Some(2));
        let exact = inst.wcss(&memberships);
        assert!(store.objective_min() <= exact);
    }
}
