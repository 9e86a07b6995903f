//! MSSC model: assignment variables, posted constraints and the solve entry points.

use mssc_core::Instance;

use super::{MsscSolution, MsscStatus};
use crate::constraints::{
    ClusterCardinality, NetworkCardControl, StandardCardControl, ValuePrecedence, WcssBound,
};
use crate::engine::{Propagation, Store};
use crate::error::{MsscError, MsscResult};
use crate::search::{BranchAndBound, MsscSearchStrategy};
use crate::settings::{BoundVariant, InitialSolution, SolverSettings, TieHandling};

/// A ready-to-solve MSSC model.
///
/// One variable per point with the cluster labels `0..K` as domain, plus the
/// objective range. Construction posts the cardinality counting constraint,
/// the configured bound, and value precedence between interchangeable labels.
pub struct MsscModel<'a> {
    instance: &'a Instance,
    settings: SolverSettings,
    store: Store,
    propagation: Propagation<'a>,
}

impl<'a> MsscModel<'a> {
    /// Validate `settings` against `instance` and post the constraints.
    pub fn new(instance: &'a Instance, settings: SolverSettings) -> MsscResult<Self> {
        instance.validate()?;
        validate_settings(instance, &settings)?;

        let n = instance.num_points();
        let k = instance.num_clusters();
        let store = Store::new(n, k);
        let mut propagation = Propagation::new();

        let targets = if settings.bound.uses_cardinalities() {
            instance.target_cardinalities().map(<[usize]>::to_vec)
        } else {
            None
        };

        match &targets {
            Some(t) => propagation.add(Box::new(ClusterCardinality::exact(t))),
            None => propagation.add(Box::new(ClusterCardinality::non_empty(k, n))),
        };

        // Point 0 may open cluster 0 only when every label is interchangeable.
        let anchor = settings.symmetry_breaking
            && targets
                .as_deref()
                .map_or(false, |t| t.iter().all(|&x| x == t[0]));

        match (settings.bound, targets.clone()) {
            (BoundVariant::None, _) => {}
            (BoundVariant::Wcss, _) | (BoundVariant::WcssWithCardinality, _) => {
                propagation.add(Box::new(WcssBound::new(instance)));
            }
            (BoundVariant::StandardCardControl, Some(t)) => {
                propagation.add(Box::new(StandardCardControl::new(instance, t, anchor)));
            }
            (BoundVariant::NetworkCardControl, Some(t)) => {
                propagation.add(Box::new(NetworkCardControl::new(instance, t, anchor)));
            }
            (variant, None) => {
                return Err(MsscError::InvalidConfig(format!(
                    "{:?} requires target cardinalities",
                    variant
                )));
            }
        }

        if settings.symmetry_breaking {
            for c in 1..k {
                let interchangeable = targets.as_deref().map_or(true, |t| t[c - 1] == t[c]);
                if interchangeable {
                    propagation.add(Box::new(ValuePrecedence::new(c - 1, c)));
                }
            }
        }

        log::debug!(
            "MSSC model: {} points, {} clusters, constraints {:?}",
            n,
            k,
            propagation.names()
        );

        Ok(Self {
            instance,
            settings,
            store,
            propagation,
        })
    }

    /// Names of the posted constraints, in posting order.
    pub fn constraint_names(&self) -> Vec<&'static str> {
        self.propagation.names()
    }

    /// Solve to optimality or until a limit is hit.
    pub fn solve(self) -> MsscSolution {
        self.solve_with_callback(|_, _| {})
    }

    /// Solve, calling `on_solution(memberships, wcss)` for every improving solution.
    pub fn solve_with_callback<F>(mut self, mut on_solution: F) -> MsscSolution
    where
        F: FnMut(&[usize], f64),
    {
        let mut brancher = MsscSearchStrategy::new(self.instance, self.settings.search);
        let mut tree = BranchAndBound::new(self.instance, self.settings.clone());

        let status = tree.run(
            &mut self.store,
            &mut self.propagation,
            &mut brancher,
            &mut on_solution,
        );
        let solution = tree.finalize(status);

        if self.settings.verbose {
            let stats = self.propagation.stats();
            let search = tree.stats();
            log::info!(
                "{:?}: wcss={:.6e} bound={:.6e} root={:.6e} nodes={} fails={} incumbents={} propagate={} demons={} time={}ms",
                solution.status,
                solution.wcss,
                solution.bound,
                search.root_bound,
                search.nodes_explored,
                search.fails,
                search.incumbent_updates,
                stats.propagate_calls,
                stats.demon_calls,
                search.elapsed_ms,
            );
        }
        if solution.status == MsscStatus::Infeasible {
            log::warn!("No assignment satisfies the model");
        }

        solution
    }
}

fn validate_settings(instance: &Instance, settings: &SolverSettings) -> MsscResult<()> {
    if settings.bound.uses_cardinalities() && instance.target_cardinalities().is_none() {
        return Err(MsscError::InvalidConfig(format!(
            "{:?} requires target cardinalities",
            settings.bound
        )));
    }
    if settings.search.initial_solution == InitialSolution::MembershipsAsIndicated
        && instance.target_memberships().is_none()
    {
        return Err(MsscError::InvalidConfig(
            "initial solution as indicated requires target memberships".into(),
        ));
    }
    if settings.search.tie_handling != TieHandling::None && !settings.symmetry_breaking {
        return Err(MsscError::InvalidConfig(
            "tie handling requires symmetry breaking".into(),
        ));
    }
    if settings.improvement_tol.is_nan() || settings.improvement_tol < 0.0 {
        return Err(MsscError::InvalidConfig(format!(
            "improvement tolerance must be non-negative, got {}",
            settings.improvement_tol
        )));
    }
    Ok(())
}

/// Build the model for `instance` and solve it.
pub fn solve_mssc(instance: &Instance, settings: SolverSettings) -> MsscResult<MsscSolution> {
    Ok(MsscModel::new(instance, settings)?.solve())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SearchParameters;

    fn blobs() -> Instance {
        Instance::from_coordinates(
            vec![
                vec![0.0, 0.0],
                vec![1.0, 0.0],
                vec![0.0, 1.0],
                vec![8.0, 8.0],
                vec![9.0, 8.0],
                vec![8.0, 9.0],
            ],
            2,
        )
        .unwrap()
    }

    #[test]
    fn test_missing_cardinalities_rejected() {
        let inst = blobs();
        let settings = SolverSettings::default().with_bound(BoundVariant::NetworkCardControl);
        assert!(matches!(
            MsscModel::new(&inst, settings),
            Err(MsscError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_tie_handling_needs_symmetry_breaking() {
        let inst = blobs();
        let settings = SolverSettings::default()
            .with_symmetry_breaking(false)
            .with_search(SearchParameters {
                tie_handling: TieHandling::FixedMaxMin,
                ..Default::default()
            });
        assert!(matches!(
            MsscModel::new(&inst, settings),
            Err(MsscError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_as_indicated_needs_memberships() {
        let inst = blobs();
        let settings = SolverSettings::default().with_search(SearchParameters {
            initial_solution: InitialSolution::MembershipsAsIndicated,
            ..Default::default()
        });
        assert!(MsscModel::new(&inst, settings).is_err());
    }

    #[test]
    fn test_posted_constraints() {
        let inst = blobs().with_target_cardinalities(vec![3, 3]).unwrap();
        let model = MsscModel::new(
            &inst,
            SolverSettings::default().with_bound(BoundVariant::StandardCardControl),
        )
        .unwrap();
        assert_eq!(
            model.constraint_names(),
            vec!["cardinality", "wcss-standard-card", "precedence"]
        );

        let model = MsscModel::new(&inst, SolverSettings::default().with_symmetry_breaking(false)).unwrap();
        assert_eq!(model.constraint_names(), vec!["cardinality", "wcss"]);
    }

    #[test]
    fn test_unequal_targets_skip_precedence() {
        let inst = blobs().with_target_cardinalities(vec![2, 4]).unwrap();
        let model = MsscModel::new(
            &inst,
            SolverSettings::default().with_bound(BoundVariant::NetworkCardControl),
        )
        .unwrap();
        assert_eq!(model.constraint_names(), vec!["cardinality", "wcss-network-card"]);
    }

    #[test]
    fn test_solve_mssc() {
        let inst = blobs();
        let sol = solve_mssc(&inst, SolverSettings::default()).unwrap();
        assert_eq!(sol.status, MsscStatus::Optimal);
        assert!((sol.wcss - inst.wcss(&[0, 0, 0, 1, 1, 1])).abs() < 1e-9);
        assert_eq!(sol.memberships, vec![0, 0, 0, 1, 1, 1]);
    }
}
