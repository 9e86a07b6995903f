//! Branching decisions for MSSC.
//!
//! Decisions are binary: the search first tries `x[var] == value`, then
//! `x[var] != value` on backtrack. The heuristic has three phases:
//!
//! 1. **Initial solution**, until a first solution exists: greedy cheapest
//!    assignment or the instance's target memberships. The indicated
//!    memberships are followed only while every indicated cluster is still
//!    in its point's domain; after the first mismatch the phase is dropped.
//! 2. **Main search**: the free point whose cheapest cluster is the most
//!    expensive, sent to that cluster (max-min).
//! 3. **Tie breaking**: when the max-min cost is zero and a cluster is still
//!    empty, pick the point that should open it.

use mssc_core::{squared_distance, Instance};

use crate::engine::Store;
use crate::settings::{InitialSolution, MainSearch, SearchParameters, TieHandling};

/// Max-min costs below this are treated as zero.
const TIE_TOLERANCE: f64 = 1e-3;

/// A branching decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    /// Point to branch on.
    pub var: usize,

    /// Cluster tried first.
    pub value: usize,

    /// Score of this decision (for logging).
    pub score: f64,
}

/// Source of branching decisions for [`BranchAndBound`](super::BranchAndBound).
pub trait Brancher {
    /// Pick the next decision, or `None` when every point is fixed.
    fn select(&mut self, store: &Store, has_incumbent: bool) -> Option<Decision>;
}

/// Fixed points grouped by cluster, with their pairwise dissimilarity sums.
struct ClusterSnapshot {
    members: Vec<Vec<usize>>,
    within: Vec<f64>,
}

impl ClusterSnapshot {
    fn capture(store: &Store, instance: &Instance) -> Self {
        let mut members = vec![Vec::new(); store.num_values()];
        for i in 0..store.num_vars() {
            if let Some(c) = store.value(i) {
                members[c].push(i);
            }
        }
        let within = members
            .iter()
            .map(|pts| {
                let mut sum = 0.0;
                for (a, &i) in pts.iter().enumerate() {
                    for &j in &pts[a + 1..] {
                        sum += instance.dissimilarity(i, j);
                    }
                }
                sum
            })
            .collect();
        Self { members, within }
    }

    /// WCSS increase of cluster `c` if `point` joins it. Opening an empty
    /// cluster costs nothing.
    fn delta(&self, instance: &Instance, point: usize, c: usize) -> f64 {
        let size = self.members[c].len();
        if size == 0 {
            return 0.0;
        }
        let row = instance.dissimilarity_row(point);
        let to_point: f64 = self.members[c].iter().map(|&j| row[j]).sum();
        let s1 = self.within[c];
        (s1 + to_point) / (size + 1) as f64 - s1 / size as f64
    }

    /// Cheapest candidate cluster of `point`, first one on ties.
    fn cheapest(&self, instance: &Instance, store: &Store, point: usize) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for c in store.values(point) {
            let d = self.delta(instance, point, c);
            if best.map_or(true, |(_, b)| d < b) {
                best = Some((c, d));
            }
        }
        best
    }

    fn is_empty(&self, c: usize) -> bool {
        self.members[c].is_empty()
    }

    fn occupied(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.members.len()).filter(move |&c| !self.members[c].is_empty())
    }

    fn centroid(&self, instance: &Instance, c: usize) -> Vec<f64> {
        let mut center = vec![0.0; instance.num_features()];
        for &i in &self.members[c] {
            for (acc, x) in center.iter_mut().zip(instance.point(i)) {
                *acc += x;
            }
        }
        let size = self.members[c].len().max(1) as f64;
        center.iter_mut().for_each(|x| *x /= size);
        center
    }
}

/// The MSSC branching heuristic.
pub struct MsscSearchStrategy<'a> {
    instance: &'a Instance,
    params: SearchParameters,
    /// Cleared once an indicated cluster has been filtered out.
    follow_indicated: bool,
}

impl<'a> MsscSearchStrategy<'a> {
    /// Create the heuristic for `instance`.
    pub fn new(instance: &'a Instance, params: SearchParameters) -> Self {
        Self {
            instance,
            params,
            follow_indicated: true,
        }
    }

    fn initial(&mut self, store: &Store, snap: &ClusterSnapshot) -> Option<Decision> {
        match self.params.initial_solution {
            InitialSolution::None => None,
            InitialSolution::Greedy => {
                let free = (0..store.num_vars()).filter(|&i| !store.is_fixed(i));
                let min_size = free.clone().map(|i| store.size(i)).min()?;
                let mut best: Option<Decision> = None;
                for i in free.filter(|&i| store.size(i) == min_size) {
                    for c in store.values(i) {
                        let score = snap.delta(self.instance, i, c);
                        if best.map_or(true, |b| score < b.score) {
                            best = Some(Decision {
                                var: i,
                                value: c,
                                score,
                            });
                        }
                    }
                }
                best
            }
            InitialSolution::MembershipsAsIndicated => {
                if !self.follow_indicated {
                    return None;
                }
                let memberships = self.instance.target_memberships()?;
                let var = (0..store.num_vars()).find(|&i| !store.is_fixed(i))?;
                let value = memberships[var];
                if !store.contains(var, value) {
                    log::debug!(
                        "Indicated cluster {} of point {} was filtered out, switching to max-min",
                        value,
                        var
                    );
                    self.follow_indicated = false;
                    return None;
                }
                Some(Decision {
                    var,
                    value,
                    score: 0.0,
                })
            }
        }
    }

    fn max_min(&self, store: &Store, snap: &ClusterSnapshot) -> Option<Decision> {
        let mut best: Option<Decision> = None;
        for i in (0..store.num_vars()).filter(|&i| !store.is_fixed(i)) {
            let Some((c, score)) = snap.cheapest(self.instance, store, i) else {
                continue;
            };
            // Later points win ties.
            if best.map_or(true, |b| score >= b.score) {
                best = Some(Decision {
                    var: i,
                    value: c,
                    score,
                });
            }
        }
        best
    }

    /// Point that should open `target`, if the configured rule finds one.
    fn break_tie(&self, store: &Store, snap: &ClusterSnapshot, target: usize) -> Option<usize> {
        let inst = self.instance;
        let n = store.num_vars();
        let candidates: Vec<usize> = (0..n)
            .filter(|&i| !store.is_fixed(i) && store.contains(i, target))
            .collect();
        let fixed: Vec<usize> = (0..n).filter(|&i| store.is_fixed(i)).collect();

        let farthest = |score: &dyn Fn(usize) -> f64| -> Option<usize> {
            let mut best: Option<(usize, f64)> = None;
            for &i in &candidates {
                let s = score(i);
                if s > best.map_or(0.0, |(_, b)| b) {
                    best = Some((i, s));
                }
            }
            best.map(|(i, _)| i)
        };

        match self.params.tie_handling {
            TieHandling::None => None,
            TieHandling::UnboundFarthestTotalSs => farthest(&|i| {
                let row = inst.dissimilarity_row(i);
                (0..n).filter(|&j| !store.is_fixed(j)).map(|j| row[j]).sum()
            }),
            TieHandling::FixedFarthestDist => farthest(&|i| {
                let row = inst.dissimilarity_row(i);
                fixed.iter().map(|&j| row[j]).fold(0.0, f64::max)
            }),
            TieHandling::FixedMaxMin => {
                if snap.occupied().next().is_none() {
                    return None;
                }
                farthest(&|i| {
                    let row = inst.dissimilarity_row(i);
                    snap.occupied()
                        .flat_map(|c| snap.members[c].iter().map(move |&j| row[j]))
                        .fold(f64::INFINITY, f64::min)
                })
            }
            TieHandling::FarthestPointFromBiggestCenter => {
                let mut biggest: Option<usize> = None;
                for c in snap.occupied() {
                    if biggest.map_or(true, |b| snap.members[c].len() > snap.members[b].len()) {
                        biggest = Some(c);
                    }
                }
                let center = snap.centroid(inst, biggest?);
                farthest(&|i| squared_distance(&center, inst.point(i)))
            }
            TieHandling::MaxMinPointFromAllCenter => {
                let centers: Vec<Vec<f64>> = snap.occupied().map(|c| snap.centroid(inst, c)).collect();
                if centers.is_empty() {
                    return None;
                }
                farthest(&|i| {
                    centers
                        .iter()
                        .map(|center| squared_distance(center, inst.point(i)))
                        .fold(f64::INFINITY, f64::min)
                })
            }
        }
    }
}

impl<'a> Brancher for MsscSearchStrategy<'a> {
    fn select(&mut self, store: &Store, has_incumbent: bool) -> Option<Decision> {
        if store.all_fixed() {
            return None;
        }
        let snap = ClusterSnapshot::capture(store, self.instance);

        if !has_incumbent {
            if let Some(decision) = self.initial(store, &snap) {
                return Some(decision);
            }
        }

        let choice = match self.params.main_search {
            MainSearch::MaxMinVar => self.max_min(store, &snap)?,
        };

        if choice.score.abs() < TIE_TOLERANCE && self.params.tie_handling != TieHandling::None {
            if let Some(target) = (0..store.num_values()).find(|&c| snap.is_empty(c)) {
                if let Some(var) = self.break_tie(store, &snap, target) {
                    log::trace!("Tie broken: point {} opens cluster {}", var, target);
                    return Some(Decision {
                        var,
                        value: target,
                        score: choice.score,
                    });
                }
            }
        }

        Some(choice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line() -> Instance {
        Instance::from_coordinates(
            vec![vec![0.0], vec![1.0], vec![2.0], vec![10.0], vec![11.0]],
            2,
        )
        .unwrap()
        .with_target_memberships(vec![0, 0, 0, 1, 1])
        .unwrap()
    }

    fn params(init: InitialSolution, tie: TieHandling) -> SearchParameters {
        SearchParameters {
            initial_solution: init,
            main_search: MainSearch::MaxMinVar,
            tie_handling: tie,
        }
    }

    #[test]
    fn test_delta() {
        let inst = line();
        let mut store = Store::new(5, 2);
        store.fix(0, 0).unwrap();
        store.fix(1, 0).unwrap();
        let snap = ClusterSnapshot::capture(&store, &inst);

        // {0, 1} has S1 = 1; adding point 2 gives (1 + 4 + 1) / 3 - 1 / 2.
        assert!((snap.delta(&inst, 2, 0) - 1.5).abs() < 1e-12);
        assert_eq!(snap.delta(&inst, 2, 1), 0.0);
    }

    #[test]
    fn test_memberships_as_indicated() {
        let inst = line();
        let mut store = Store::new(5, 2);
        store.fix(0, 0).unwrap();
        let mut strat = MsscSearchStrategy::new(
            &inst,
            params(InitialSolution::MembershipsAsIndicated, TieHandling::None),
        );
        let d = strat.select(&store, false).unwrap();
        assert_eq!((d.var, d.value), (1, 0));
    }

    #[test]
    fn test_indicated_cluster_filtered_out() {
        let inst = line();
        let mut store = Store::new(5, 2);
        store.fix(0, 0).unwrap();
        store.remove(1, 0).unwrap();
        let mut strat = MsscSearchStrategy::new(
            &inst,
            params(InitialSolution::MembershipsAsIndicated, TieHandling::None),
        );

        // Point 1 can no longer join cluster 0, so max-min takes over.
        let d = strat.select(&store, false).unwrap();
        assert!(store.contains(d.var, d.value));
        assert_eq!((d.var, d.value), (4, 1));

        // The phase stays off even once the indicated cluster is back.
        let mut fresh = Store::new(5, 2);
        fresh.fix(0, 0).unwrap();
        let d = strat.select(&fresh, false).unwrap();
        assert_ne!((d.var, d.value), (1, 0));
    }

    #[test]
    fn test_greedy_prefers_small_domains() {
        let inst = line();
        let mut store = Store::new(5, 2);
        store.fix(0, 0).unwrap();
        store.remove(3, 0).unwrap();
        store.remove(4, 1).unwrap();
        let mut strat = MsscSearchStrategy::new(&inst, params(InitialSolution::Greedy, TieHandling::None));
        let d = strat.select(&store, false).unwrap();

        // Points 3 and 4 have singleton domains; opening cluster 1 is free.
        assert_eq!((d.var, d.value), (3, 1));
        assert_eq!(d.score, 0.0);
    }

    #[test]
    fn test_max_min_picks_far_point() {
        let inst = line();
        let mut store = Store::new(5, 2);
        store.fix(0, 0).unwrap();
        store.fix(3, 1).unwrap();
        let mut strat = MsscSearchStrategy::new(&inst, params(InitialSolution::None, TieHandling::None));
        let d = strat.select(&store, true).unwrap();

        // Cheapest moves: point 1 costs 0.5, point 2 costs 2, point 4 costs 0.5.
        assert_eq!((d.var, d.value), (2, 0));
        assert!((d.score - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_tie_opens_empty_cluster() {
        let inst = line();
        let mut store = Store::new(5, 2);
        store.fix(0, 0).unwrap();
        let d = MsscSearchStrategy::new(&inst, params(InitialSolution::None, TieHandling::None))
            .select(&store, true)
            .unwrap();
        assert_eq!((d.var, d.value), (4, 1));

        // Points 1 and 4 share the largest total dissimilarity to the free points.
        let d = MsscSearchStrategy::new(
            &inst,
            params(InitialSolution::None, TieHandling::UnboundFarthestTotalSs),
        )
        .select(&store, true)
        .unwrap();
        assert_eq!((d.var, d.value), (1, 1));
    }

    #[test]
    fn test_all_fixed() {
        let inst = line();
        let mut store = Store::new(5, 2);
        for (i, c) in [0, 0, 0, 1, 1].into_iter().enumerate() {
            store.fix(i, c).unwrap();
        }
        let mut strat = MsscSearchStrategy::new(&inst, SearchParameters::default());
        assert_eq!(strat.select(&store, false), None);
    }
}
