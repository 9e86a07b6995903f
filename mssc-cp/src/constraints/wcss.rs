//! WCSS lower bound for unconstrained MSSC.
//!
//! For every cluster `c` and every completion size `m` the constraint bounds
//! the contribution of `c` if exactly `m` free points end up in it, by taking
//! the `m` free points of cheapest marginal cost. A knapsack-style DP then
//! splits the `q` free points among clusters to get the global bound.
//! Candidate `(point, cluster)` pairs whose best completion cannot beat the
//! incumbent are removed.

use mssc_core::Instance;

use super::partition::PartitionView;
use crate::engine::{PropResult, Propagator, Store, Subscriptions};

/// Subtracted from the computed bound to absorb rounding.
const BOUND_EPS: f64 = 5e-5;

/// Unconstrained WCSS bound and cost-based filtering.
pub struct WcssBound<'a> {
    instance: &'a Instance,
}

/// Per-call bound tables, kept for inspection in tests.
#[derive(Debug, Clone)]
pub(crate) struct WcssTables {
    /// `schedule[c][m]`: bound on cluster `c` if `m` free points join it.
    pub schedule: Vec<Vec<f64>>,
    /// `global[c][m]`: bound on clusters `0..=c` if `m` free points join them.
    pub global: Vec<Vec<f64>>,
}

impl<'a> WcssBound<'a> {
    /// Create the constraint for `instance`.
    pub fn new(instance: &'a Instance) -> Self {
        Self { instance }
    }

    /// Lower bound on the total WCSS of any completion of the current
    /// assignment, without the rounding margin.
    pub fn lower_bound(&self, store: &Store) -> f64 {
        let view = PartitionView::capture(store);
        let q = view.num_unassigned();
        let tables = self.tables(store, &view);
        tables.global[store.num_values() - 1][q]
    }

    pub(crate) fn tables(&self, store: &Store, view: &PartitionView) -> WcssTables {
        let k = store.num_values();
        let q = view.num_unassigned();
        let s1 = view.within_sums(self.instance);
        let s2 = affinities(self.instance, store, view);
        let s3 = view.completion_costs(self.instance);

        let mut schedule = vec![vec![0.0; q + 1]; k];
        let mut costs = Vec::with_capacity(q);
        for c in 0..k {
            let size = view.size(c);
            for m in 0..=q {
                let total = size + m;
                if total == 0 {
                    continue;
                }
                let selected = if m == 0 {
                    0.0
                } else {
                    costs.clear();
                    costs.extend((0..q).map(|u| s2[u][c] + s3[u][m - 1]));
                    costs.sort_by(|a: &f64, b| a.total_cmp(b));
                    costs[..m].iter().sum()
                };
                schedule[c][m] = (s1[c] + selected) / total as f64;
            }
        }

        let mut global = vec![vec![f64::INFINITY; q + 1]; k];
        global[0].clone_from(&schedule[0]);
        for c in 1..k {
            for m in 0..=q {
                let mut best = f64::INFINITY;
                for i in 0..=m {
                    let v = global[c - 1][i] + schedule[c][m - i];
                    if v < best {
                        best = v;
                    }
                }
                global[c][m] = best;
            }
        }

        WcssTables { schedule, global }
    }
}

/// s2 for every free point and cluster; infinite where the cluster is not a candidate.
fn affinities(instance: &Instance, store: &Store, view: &PartitionView) -> Vec<Vec<f64>> {
    let k = store.num_values();
    view.unassigned()
        .iter()
        .map(|&i| {
            (0..k)
                .map(|c| {
                    if store.contains(i, c) {
                        view.affinity(instance, i, c)
                    } else {
                        f64::INFINITY
                    }
                })
                .collect()
        })
        .collect()
}

impl<'a> Propagator for WcssBound<'a> {
    fn name(&self) -> &'static str {
        "wcss"
    }

    fn subscriptions(&self) -> Subscriptions {
        Subscriptions {
            propagate_on_domain: true,
            propagate_on_objective: true,
            ..Default::default()
        }
    }

    fn propagate(&mut self, store: &mut Store) -> PropResult {
        let k = store.num_values();
        let view = PartitionView::capture(store);
        let q = view.num_unassigned();
        let WcssTables { schedule, global } = self.tables(store, &view);
        let total = global[k - 1][q];

        store.set_objective_min(total - BOUND_EPS)?;

        if q == 0 {
            return Ok(());
        }

        let s2 = affinities(self.instance, store, &view);
        let s3 = view.completion_costs(self.instance);
        let upper = store.objective_max();

        let mut except = vec![0.0; q];
        for c in 0..k {
            // Bound on every cluster but c when m free points go to them.
            for (m, slot) in except.iter_mut().enumerate() {
                let mut best: f64 = 0.0;
                for j in m..=q {
                    let schedule_c = schedule[c][j - m];
                    if !schedule_c.is_finite() {
                        continue;
                    }
                    let v = global[k - 1][j] - schedule_c;
                    if v > best {
                        best = v;
                    }
                }
                *slot = best;
            }

            let size = view.size(c);
            for (u, &i) in view.unassigned().iter().enumerate() {
                if !store.contains(i, c) {
                    continue;
                }
                // Cluster c with point i plus m other free points.
                let mut best = f64::INFINITY;
                for m in 0..q {
                    let prime = ((size + m) as f64 * schedule[c][m] + s2[u][c] + s3[u][m])
                        / (size + m + 1) as f64;
                    let v = except[q - 1 - m] + prime;
                    if v < best {
                        best = v;
                    }
                }
                if best >= upper {
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

    fn two_triples() -> Instance {
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

    #[test]
    fn test_full_assignment_bound_is_exact() {
        let inst = two_triples();
        let mut store = Store::new(6, 2);
        for (i, &c) in [0, 0, 0, 1, 1, 1].iter().enumerate() {
            store.fix(i, c).unwrap();
        }
        let bound = WcssBound::new(&inst);
        let exact = inst.wcss(&[0, 0, 0, 1, 1, 1]);
        assert!((bound.lower_bound(&store) - exact).abs() < 1e-9);
    }

    #[test]
    fn test_bound_below_optimum() {
        let inst = two_triples();
        let mut store = Store::new(6, 2);
        store.fix(0, 0).unwrap();
        store.fix(3, 1).unwrap();
        let bound = WcssBound::new(&inst);

        let opt = inst.wcss(&[0, 0, 0, 1, 1, 1]);
        assert!(bound.lower_bound(&store) <= opt + 1e-9);
    }

    #[test]
    fn test_schedule_empty_cluster() {
        let inst = two_triples();
        let store = Store::new(6, 2);
        let bound = WcssBound::new(&inst);
        let view = PartitionView::capture(&store);
        let tables = bound.tables(&store, &view);

        // Nothing assigned: cluster of 0 or 1 point costs nothing.
        assert_eq!(tables.schedule[0][0], 0.0);
        assert_eq!(tables.schedule[0][1], 0.0);
        assert!(tables.schedule[0][2] > 0.0);
        assert_eq!(tables.global[1].len(), 7);
    }

    #[test]
    fn test_filtering_against_incumbent() {
        let inst = two_triples();
        let mut store = Store::new(6, 2);
        store.fix(0, 0).unwrap();
        store.fix(1, 0).unwrap();
        store.fix(3, 1).unwrap();
        store.fix(4, 1).unwrap();

        let opt = inst.wcss(&[0, 0, 0, 1, 1, 1]);
        store.set_objective_max(opt + 1e-3).unwrap();

        let mut bound = WcssBound::new(&inst);
        bound.propagate(&mut store).unwrap();

        // Sending point 2 to the far triple, or point 5 to the near one, is hopeless.
        assert_eq!(store.value(2), Some(0));
        assert_eq!(store.value(5), Some(1));
    }
}
