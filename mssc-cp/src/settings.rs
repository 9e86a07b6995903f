//! Configuration settings for the MSSC solver.

/// Which WCSS bound constraint the model posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundVariant {
    /// No bound constraint; plain enumeration with incumbent checks at leaves.
    None,

    /// Unconstrained WCSS bound.
    #[default]
    Wcss,

    /// Unconstrained WCSS bound, with target cardinalities enforced by the
    /// counting constraint alone.
    WcssWithCardinality,

    /// Cardinality-aware bound with direct completion estimates.
    StandardCardControl,

    /// Cardinality-aware bound from a minimum-cost flow.
    NetworkCardControl,
}

impl BoundVariant {
    /// True when the variant needs target cardinalities.
    pub fn uses_cardinalities(&self) -> bool {
        matches!(
            self,
            BoundVariant::WcssWithCardinality
                | BoundVariant::StandardCardControl
                | BoundVariant::NetworkCardControl
        )
    }
}

/// How the first solution is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitialSolution {
    /// Let the main search find it.
    None,

    /// Smallest domain first, cheapest cluster first.
    #[default]
    Greedy,

    /// Follow the instance's target memberships.
    MembershipsAsIndicated,
}

/// Main branching rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MainSearch {
    /// Branch on the point whose cheapest cluster is the most expensive.
    #[default]
    MaxMinVar,
}

/// How to seed an empty cluster when the main rule sees only zero-cost moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TieHandling {
    /// Keep the main rule's choice.
    #[default]
    None,

    /// Free point with the largest total dissimilarity to all free points.
    UnboundFarthestTotalSs,

    /// Free point farthest from any fixed point.
    FixedFarthestDist,

    /// Free point whose nearest occupied cluster member is farthest away.
    FixedMaxMin,

    /// Free point farthest from the centroid of the largest cluster.
    FarthestPointFromBiggestCenter,

    /// Free point whose nearest occupied cluster centroid is farthest away.
    MaxMinPointFromAllCenter,
}

/// Branching configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SearchParameters {
    /// First-solution mode.
    pub initial_solution: InitialSolution,

    /// Main branching rule.
    pub main_search: MainSearch,

    /// Empty-cluster tie breaking.
    pub tie_handling: TieHandling,
}

/// MSSC solver settings.
#[derive(Debug, Clone)]
pub struct SolverSettings {
    // === Model ===
    /// Bound constraint to post.
    pub bound: BoundVariant,

    /// Post value precedence between consecutive interchangeable labels.
    pub symmetry_breaking: bool,

    // === Search ===
    /// Branching configuration.
    pub search: SearchParameters,

    // === Termination criteria ===
    /// Maximum number of search nodes.
    pub max_nodes: u64,

    /// Time limit in milliseconds (None = unlimited).
    pub time_limit_ms: Option<u64>,

    /// A new solution must beat the incumbent by at least this much.
    pub improvement_tol: f64,

    // === Output ===
    /// Log incumbents and progress.
    pub verbose: bool,

    /// Log frequency (every N nodes).
    pub log_freq: u64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            bound: BoundVariant::default(),
            symmetry_breaking: true,
            search: SearchParameters::default(),
            max_nodes: 10_000_000,
            time_limit_ms: None,
            improvement_tol: 1e-6,
            verbose: false,
            log_freq: 10_000,
        }
    }
}

impl SolverSettings {
    /// Create settings with verbose output enabled.
    pub fn verbose() -> Self {
        let mut s = Self::default();
        s.verbose = true;
        s.log_freq = 1_000;
        s
    }

    /// Set the bound constraint.
    pub fn with_bound(mut self, bound: BoundVariant) -> Self {
        self.bound = bound;
        self
    }

    /// Set the branching configuration.
    pub fn with_search(mut self, search: SearchParameters) -> Self {
        self.search = search;
        self
    }

    /// Enable or disable symmetry breaking.
    pub fn with_symmetry_breaking(mut self, on: bool) -> Self {
        self.symmetry_breaking = on;
        self
    }

    /// Set time limit in seconds.
    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.time_limit_ms = Some((seconds * 1000.0) as u64);
        self
    }

    /// Set maximum nodes.
    pub fn with_max_nodes(mut self, nodes: u64) -> Self {
        self.max_nodes = nodes;
        self
    }

    /// Set the improvement tolerance.
    pub fn with_improvement_tol(mut self, tol: f64) -> Self {
        self.improvement_tol = tol;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let s = SolverSettings::default()
            .with_bound(BoundVariant::NetworkCardControl)
            .with_time_limit(1.5)
            .with_max_nodes(42);
        assert_eq!(s.bound, BoundVariant::NetworkCardControl);
        assert_eq!(s.time_limit_ms, Some(1500));
        assert_eq!(s.max_nodes, 42);
        assert!(s.symmetry_breaking);
    }

    #[test]
    fn test_variant_cardinalities() {
        assert!(!BoundVariant::None.uses_cardinalities());
        assert!(!BoundVariant::Wcss.uses_cardinalities());
        assert!(BoundVariant::WcssWithCardinality.uses_cardinalities());
        assert!(BoundVariant::StandardCardControl.uses_cardinalities());
        assert!(BoundVariant::NetworkCardControl.uses_cardinalities());
    }
}
