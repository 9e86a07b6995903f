//! Solve outcome and the best clustering tracked during search.

/// How the search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsscStatus {
    /// Tree exhausted with a clustering; it is optimal.
    Optimal,

    /// Tree exhausted without any clustering.
    Infeasible,

    /// Stopped by `max_nodes`.
    NodeLimit,

    /// Stopped by `time_limit_ms`.
    TimeLimit,
}

impl MsscStatus {
    /// True when the whole tree was explored, so the result is proven.
    pub fn is_complete(self) -> bool {
        matches!(self, MsscStatus::Optimal | MsscStatus::Infeasible)
    }

    /// True when a node or time limit cut the search short.
    pub fn is_limit(self) -> bool {
        !self.is_complete()
    }
}

/// Result of an MSSC solve.
#[derive(Debug, Clone)]
pub struct MsscSolution {
    /// How the search ended.
    pub status: MsscStatus,

    /// Cluster of every point, empty when nothing was found.
    pub memberships: Vec<usize>,

    /// WCSS of `memberships`, +inf when nothing was found.
    pub wcss: f64,

    /// Lower bound on the optimal WCSS: `wcss` when optimal, the root bound
    /// after a limit, +inf when infeasible.
    pub bound: f64,

    /// Search nodes visited.
    pub nodes_explored: u64,

    /// Branches closed by a conflict.
    pub fails: u64,

    /// Improving clusterings reported to the solution callback.
    pub solutions_found: u64,

    /// Wall time of the search in milliseconds.
    pub solve_time_ms: u64,
}

impl MsscSolution {
    /// True when `memberships` holds a clustering.
    pub fn has_solution(&self) -> bool {
        !self.memberships.is_empty()
    }

    /// Distance from `wcss` down to `bound`, +inf without a clustering.
    pub fn gap(&self) -> f64 {
        if !self.has_solution() || self.bound.is_infinite() {
            return f64::INFINITY;
        }
        (self.wcss - self.bound).max(0.0)
    }
}

/// Lowest-WCSS clustering reached at a leaf so far.
#[derive(Debug, Clone)]
pub struct BestClustering {
    memberships: Vec<usize>,
    wcss: f64,
    reports: u64,
}

impl BestClustering {
    /// Nothing found yet: no memberships and an infinite WCSS.
    pub fn empty() -> Self {
        Self {
            memberships: Vec::new(),
            wcss: f64::INFINITY,
            reports: 0,
        }
    }

    /// Whether some leaf has been accepted.
    pub fn is_found(&self) -> bool {
        !self.memberships.is_empty()
    }

    /// WCSS of the kept clustering.
    pub fn wcss(&self) -> f64 {
        self.wcss
    }

    /// Memberships of the kept clustering.
    pub fn memberships(&self) -> &[usize] {
        &self.memberships
    }

    /// Number of clusterings accepted by [`offer`](Self::offer), one per
    /// callback report.
    pub fn reports(&self) -> u64 {
        self.reports
    }

    /// Keep `memberships` if its WCSS is strictly lower than the kept one.
    pub fn offer(&mut self, memberships: &[usize], wcss: f64) -> bool {
        if wcss >= self.wcss {
            return false;
        }
        self.memberships.clear();
        self.memberships.extend_from_slice(memberships);
        self.wcss = wcss;
        self.reports += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mssc_core::Instance;

    fn pairs() -> Instance {
        Instance::from_coordinates(vec![vec![0.0], vec![1.0], vec![5.0], vec![6.0]], 2).unwrap()
    }

    #[test]
    fn test_offer_keeps_lower_wcss() {
        let inst = pairs();
        let mut best = BestClustering::empty();
        assert!(!best.is_found());

        let split = [0, 1, 0, 1];
        let paired = [0, 0, 1, 1];
        assert!(best.offer(&split, inst.wcss(&split)));
        assert!(best.offer(&paired, inst.wcss(&paired)));

        // The split partition costs more than the paired one.
        assert!(!best.offer(&split, inst.wcss(&split)));
        assert_eq!(best.memberships(), &paired);
        assert!((best.wcss() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_relabeled_optimum_is_not_reported_twice() {
        let inst = pairs();
        let mut best = BestClustering::empty();
        assert!(best.offer(&[0, 0, 1, 1], inst.wcss(&[0, 0, 1, 1])));
        assert!(!best.offer(&[1, 1, 0, 0], inst.wcss(&[1, 1, 0, 0])));
        assert_eq!(best.reports(), 1);
        assert_eq!(best.memberships(), &[0, 0, 1, 1]);
    }

    #[test]
    fn test_limits_are_not_complete() {
        assert!(MsscStatus::Infeasible.is_complete());
        assert!(MsscStatus::NodeLimit.is_limit());
        assert!(!MsscStatus::Optimal.is_limit());
    }

    #[test]
    fn test_gap_without_clustering() {
        let mut sol = MsscSolution {
            status: MsscStatus::TimeLimit,
            memberships: Vec::new(),
            wcss: f64::INFINITY,
            bound: 3.5,
            nodes_explored: 10,
            fails: 4,
            solutions_found: 0,
            solve_time_ms: 1,
        };
        assert!(sol.gap().is_infinite());

        sol.memberships = vec![0, 0, 1, 1];
        sol.wcss = 4.0;
        assert!((sol.gap() - 0.5).abs() < 1e-12);
    }
}
