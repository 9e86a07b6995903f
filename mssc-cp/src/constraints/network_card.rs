//! WCSS lower bound under fixed cluster cardinalities, via minimum-cost flow.
//!
//! Free points send one unit each to the clusters still in their domain; a
//! cluster absorbs exactly as many units as it still needs. The arc cost of
//! `(point, cluster)` is the point's marginal completion cost for that cluster
//! divided by the cluster's target size, so the optimal flow cost plus the
//! fixed part `S1[c] / target[c]` is a lower bound on the total WCSS.
//!
//! The flow is cached across calls in reversible cells and re-solved only when
//! it stops matching the domains. Filtering prices a forced assignment by a
//! shortest rerouting path in the residual graph of the cached flow instead of
//! solving a new flow per candidate.

use mssc_core::flow::{FlowNetwork, FlowSolver, SuccessiveShortestPaths};
use mssc_core::Instance;

use super::partition::settle_full_clusters;
use crate::engine::{Conflict, PropResult, Propagator, RevBool, RevFloat, RevInt, Store, Subscriptions};

/// Subtracted from the flow bound to absorb rounding.
const BOUND_EPS: f64 = 5e-3;

/// Reroute costs below this are numerical garbage.
const IMPLAUSIBLE_DELTA: f64 = -0.1;

/// Reversible flow cache, allocated when the constraint is posted.
struct FlowCache {
    /// Cluster that receives the flow of each point; -1 before the first solve.
    destination: Vec<RevInt>,
    /// Whether each point was already fixed at the last check.
    was_fixed: Vec<RevBool>,
    /// Bound from the last solve, rounding margin included.
    bound: RevFloat,
}

/// Cardinality-aware WCSS bound backed by a minimum-cost flow.
pub struct NetworkCardControl<'a, F: FlowSolver = SuccessiveShortestPaths> {
    instance: &'a Instance,
    targets: Vec<usize>,
    anchor_first_point: bool,
    solver: F,
    cache: Option<FlowCache>,
    solves: u64,
    reuses: u64,
}

impl<'a> NetworkCardControl<'a> {
    /// Create the constraint with the default flow backend.
    ///
    /// See [`StandardCardControl::new`](super::StandardCardControl::new) for
    /// `anchor_first_point`.
    pub fn new(instance: &'a Instance, targets: Vec<usize>, anchor_first_point: bool) -> Self {
        Self::with_solver(instance, targets, anchor_first_point, SuccessiveShortestPaths::new())
    }
}

impl<'a, F: FlowSolver> NetworkCardControl<'a, F> {
    /// Create the constraint with a custom flow backend.
    pub fn with_solver(
        instance: &'a Instance,
        targets: Vec<usize>,
        anchor_first_point: bool,
        solver: F,
    ) -> Self {
        debug_assert_eq!(targets.len(), instance.num_clusters());
        debug_assert_eq!(targets.iter().sum::<usize>(), instance.num_points());
        Self {
            instance,
            targets,
            anchor_first_point,
            solver,
            cache: None,
            solves: 0,
            reuses: 0,
        }
    }

    /// Number of flow problems solved so far.
    pub fn flow_solves(&self) -> u64 {
        self.solves
    }

    /// Number of propagation calls that reused the cached flow.
    pub fn flow_reuses(&self) -> u64 {
        self.reuses
    }

    fn cache(&mut self, store: &mut Store) -> &FlowCache {
        let n = store.num_vars();
        self.cache.get_or_insert_with(|| FlowCache {
            destination: (0..n).map(|_| store.new_rev_int(-1)).collect(),
            was_fixed: (0..n).map(|_| store.new_rev_bool(false)).collect(),
            bound: store.new_rev_float(0.0),
        })
    }
}

/// Residual-graph view of the cached flow, restricted to free points.
struct Residual<'v> {
    /// `cost[u][c]`, `None` when `(u, c)` is not an arc.
    cost: &'v [Vec<Option<f64>>],
    /// Cluster receiving the flow of free point `u`.
    flow_to: &'v [Option<usize>],
    num_clusters: usize,
}

impl<'v> Residual<'v> {
    /// Bound increase caused by forcing free point `origin` into `target`.
    ///
    /// The unit leaving `flow_to[origin]` must be replaced by rerouting one unit
    /// from `target` back to it along residual arcs. `None` when no such path
    /// exists.
    fn reroute_delta(&self, origin: usize, target: usize) -> Option<f64> {
        let q = self.cost.len();
        let k = self.num_clusters;
        let source_cluster = self.flow_to[origin]?;
        let leave = self.cost[origin][source_cluster]?;
        let enter = self.cost[origin][target]?;

        // Points are nodes 0..q, clusters q..q+k.
        let mut dist = vec![f64::INFINITY; q + k];
        dist[q + target] = 0.0;

        let passes = (q + k).saturating_sub(2).max(1);
        for _ in 0..passes {
            let mut changed = false;
            for u in 0..q {
                if u == origin {
                    continue;
                }
                for c in 0..k {
                    let Some(w) = self.cost[u][c] else {
                        continue;
                    };
                    if self.flow_to[u] == Some(c) {
                        // Cluster to point along a used arc.
                        if c != source_cluster && dist[q + c] - w < dist[u] {
                            dist[u] = dist[q + c] - w;
                            changed = true;
                        }
                    } else if c != target && dist[u] + w < dist[q + c] {
                        dist[q + c] = dist[u] + w;
                        changed = true;
                    }
                }
            }
            if !changed {
                break;
            }
        }

        let path = dist[q + source_cluster];
        if !path.is_finite() {
            return None;
        }
        Some(enter - leave + path)
    }
}

impl<'a, F: FlowSolver> Propagator for NetworkCardControl<'a, F> {
    fn name(&self) -> &'static str {
        "wcss-network-card"
    }

    fn subscriptions(&self) -> Subscriptions {
        Subscriptions {
            propagate_on_domain: true,
            propagate_on_objective: true,
            ..Default::default()
        }
    }

    fn post(&mut self, store: &mut Store) -> PropResult {
        self.cache(store);
        Ok(())
    }

    fn propagate(&mut self, store: &mut Store) -> PropResult {
        self.cache(store);
        let Some(cache) = self.cache.as_ref() else {
            return Ok(());
        };

        let (view, to_add) = settle_full_clusters(store, &self.targets)?;
        let n = store.num_vars();
        let k = store.num_values();
        let q = view.num_unassigned();

        if q == n {
            if self.anchor_first_point {
                store.fix(0, 0)?;
            }
            return Ok(());
        }

        let s1 = view.within_sums(self.instance);
        let s3 = view.completion_costs(self.instance);
        let cost: Vec<Vec<Option<f64>>> = view
            .unassigned()
            .iter()
            .enumerate()
            .map(|(u, &i)| {
                (0..k)
                    .map(|c| {
                        if to_add[c] > 0 && store.contains(i, c) {
                            let marginal = view.affinity(self.instance, i, c) + s3[u][to_add[c] - 1];
                            Some(marginal / self.targets[c] as f64)
                        } else {
                            None
                        }
                    })
                    .collect()
            })
            .collect();

        // Does the cached flow still describe the current domains?
        let mut stale = (0..n).any(|i| {
            let dest = store.int(cache.destination[i]);
            dest < 0
                || store.value(i).is_some_and(|v| v as i64 != dest)
                || !store.contains(i, dest as usize)
        });
        for i in 0..n {
            if store.is_fixed(i) && !store.bool(cache.was_fixed[i]) {
                stale = true;
                store.set_bool(cache.was_fixed[i], true);
            }
        }
        if !stale {
            stale = view.unassigned().iter().enumerate().any(|(u, &i)| {
                let dest = store.int(cache.destination[i]);
                dest < 0 || cost[u][dest as usize].is_none()
            });
        }

        if stale {
            let mut network = FlowNetwork::with_nodes(q + k);
            for u in 0..q {
                network.set_supply(u, 1);
            }
            for c in 0..k {
                network.set_supply(q + c, -(to_add[c] as i64));
            }
            let mut arcs = Vec::new();
            for (u, row) in cost.iter().enumerate() {
                for (c, w) in row.iter().enumerate() {
                    if let Some(w) = *w {
                        let id = network.add_arc(u, q + c, 1, w).map_err(|_| Conflict)?;
                        arcs.push((id, u, c));
                    }
                }
            }
            // A cluster that still needs points but has no candidate.
            if (0..k).any(|c| to_add[c] > 0 && cost.iter().all(|row| row[c].is_none())) {
                return Err(Conflict);
            }

            let solution = match self.solver.solve(&network) {
                Ok(solution) => solution,
                Err(err) => {
                    log::trace!("Flow infeasible: {}", err);
                    return Err(Conflict);
                }
            };
            self.solves += 1;

            let fixed_part: f64 = (0..k).map(|c| s1[c] / self.targets[c] as f64).sum();
            let bound = solution.cost + fixed_part - BOUND_EPS;
            store.set_float(cache.bound, bound);
            log::debug!(
                "Flow re-solved: q={}, cost={:.6}, bound={:.6}, augmentations={}",
                q,
                solution.cost,
                bound,
                solution.augmentations
            );

            for &(id, u, c) in &arcs {
                if solution.flow(id) > 0 {
                    store.set_int(cache.destination[view.unassigned()[u]], c as i64);
                }
            }
            for i in 0..n {
                if let Some(v) = store.value(i) {
                    store.set_int(cache.destination[i], v as i64);
                }
            }
        } else {
            self.reuses += 1;
            log::debug!("Flow cache reused: q={}", q);
        }

        let bound = store.float(cache.bound);
        store.set_objective_min(bound)?;

        let flow_to: Vec<Option<usize>> = view
            .unassigned()
            .iter()
            .map(|&i| usize::try_from(store.int(cache.destination[i])).ok())
            .collect();
        let residual = Residual {
            cost: &cost,
            flow_to: &flow_to,
            num_clusters: k,
        };

        let upper = store.objective_max();
        for c in 0..k {
            for (u, &i) in view.unassigned().iter().enumerate() {
                if cost[u][c].is_none() || flow_to[u] == Some(c) || flow_to[u].is_none() {
                    continue;
                }
                let remove = match residual.reroute_delta(u, c) {
                    None => true,
                    Some(delta) if delta < IMPLAUSIBLE_DELTA => {
                        log::warn!(
                            "Implausible reroute delta {:.6} for point {} -> cluster {}",
                            delta,
                            i,
                            c
                        );
                        true
                    }
                    Some(delta) => bound + delta > upper,
                };
                if remove {
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
    fn test_reroute_delta() {
        // Two free points, two clusters needing one point each.
        // Point 0 flows to cluster 0, point 1 to cluster 1.
        let cost = vec![vec![Some(1.0), Some(5.0)], vec![Some(2.0), Some(3.0)]];
        let flow_to = vec![Some(0), Some(1)];
        let residual = Residual {
            cost: &cost,
            flow_to: &flow_to,
            num_clusters: 2,
        };

        // Forcing point 0 into cluster 1 pushes point 1 into cluster 0:
        // (5 - 1) + (2 - 3) = 3.
        let delta = residual.reroute_delta(0, 1).unwrap();
        assert!((delta - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_reroute_unreachable() {
        // Point 1 cannot move to cluster 0, so nobody can fill the gap.
        let cost = vec![vec![Some(1.0), Some(5.0)], vec![None, Some(3.0)]];
        let flow_to = vec![Some(0), Some(1)];
        let residual = Residual {
            cost: &cost,
            flow_to: &flow_to,
            num_clusters: 2,
        };
        assert_eq!(residual.reroute_delta(0, 1), None);
    }

    #[test]
    fn test_cache_reuse() {
        let inst = three_triples();
        let mut store = Store::new(9, 3);
        let mut cons = NetworkCardControl::new(&inst, vec![3, 3, 3], false);
        cons.post(&mut store).unwrap();

        store.fix(0, 0).unwrap();
        cons.propagate(&mut store).unwrap();
        assert_eq!(cons.flow_solves(), 1);

        // Nothing changed: the cached flow is reused.
        let rev = store.revision();
        cons.propagate(&mut store).unwrap();
        assert_eq!(cons.flow_solves(), 1);
        assert_eq!(cons.flow_reuses(), 1);
        assert_eq!(store.revision(), rev);
    }

    #[test]
    fn test_bound_below_optimum() {
        let inst = three_triples();
        let optimum = inst.wcss(&[0, 0, 0, 1, 1, 1, 2, 2, 2]);

        let mut store = Store::new(9, 3);
        let mut cons = NetworkCardControl::new(&inst, vec![3, 3, 3], false);
        cons.post(&mut store).unwrap();
        store.fix(0, 0).unwrap();
        store.fix(3, 1).unwrap();
        store.fix(6, 2).unwrap();
        cons.propagate(&mut store).unwrap();

        assert!(store.objective_min() <= optimum);
        assert!(store.objective_min() > 0.0);
    }

    #[test]
    fn test_filtering_against_incumbent() {
        let inst = three_triples();
        let optimum = inst.wcss(&[0, 0, 0, 1, 1, 1, 2, 2, 2]);

        let mut store = Store::new(9, 3);
        store.set_objective_max(optimum + 1e-3).unwrap();
        let mut cons = NetworkCardControl::new(&inst, vec![3, 3, 3], false);
        cons.post(&mut store).unwrap();
        store.fix(0, 0).unwrap();
        store.fix(3, 1).unwrap();
        store.fix(6, 2).unwrap();
        cons.propagate(&mut store).unwrap();

        // Every point is pinned to its own triple.
        for i in 0..9 {
            assert_eq!(store.value(i), Some(i / 3), "point {}", i);
        }
    }
}
