//! Depth-first branch-and-bound tree controller.

use std::time::Instant;

use mssc_core::Instance;

use super::{Brancher, Decision};
use crate::engine::{Propagation, Store};
use crate::model::{BestClustering, MsscSolution, MsscStatus};
use crate::settings::SolverSettings;

/// Branch-and-bound tree controller.
///
/// Explores binary decisions `x = v` / `x != v` depth first. The store is
/// trailed, so the open tree is just the stack of decisions taken; each
/// positive branch opens a decision level and its refutation is applied at
/// the parent level.
pub struct BranchAndBound<'a> {
    instance: &'a Instance,

    /// Best clustering reached so far.
    pub incumbent: BestClustering,

    /// Positive branches currently on the path from the root.
    stack: Vec<Decision>,

    /// Total nodes explored.
    nodes_explored: u64,

    /// Branches closed by a conflict.
    fails: u64,

    /// Objective lower bound after root propagation.
    root_bound: f64,

    /// Start time.
    start_time: Option<Instant>,

    /// Settings.
    settings: SolverSettings,
}

impl<'a> BranchAndBound<'a> {
    /// Create a new B&B controller.
    pub fn new(instance: &'a Instance, settings: SolverSettings) -> Self {
        Self {
            instance,
            incumbent: BestClustering::empty(),
            stack: Vec::new(),
            nodes_explored: 0,
            fails: 0,
            root_bound: f64::NEG_INFINITY,
            start_time: None,
            settings,
        }
    }

    /// Run the search to completion or until a limit is hit.
    ///
    /// `on_solution` is called with every improving solution.
    pub fn run<B: Brancher + ?Sized>(
        &mut self,
        store: &mut Store,
        propagation: &mut Propagation<'_>,
        brancher: &mut B,
        on_solution: &mut dyn FnMut(&[usize], f64),
    ) -> MsscStatus {
        self.start_time = Some(Instant::now());

        if propagation.post_all(store).is_err() {
            log::debug!("Root propagation failed");
            self.fails += 1;
            return MsscStatus::Infeasible;
        }
        self.root_bound = store.objective_min();
        if self.settings.verbose {
            log::info!(
                "Root: {} constraints, bound {:.6e}",
                propagation.len(),
                self.root_bound
            );
        }

        loop {
            if let Some(status) = self.check_termination() {
                return status;
            }
            self.nodes_explored += 1;
            self.log_progress();

            let Some(decision) = brancher.select(store, self.incumbent.is_found()) else {
                if store.all_fixed() {
                    self.leaf(store, on_solution);
                } else {
                    log::warn!("Brancher returned no decision with free points left");
                }
                if !self.backtrack(store, propagation) {
                    break;
                }
                continue;
            };

            debug_assert!(
                store.contains(decision.var, decision.value),
                "decision x[{}] = {} outside the domain",
                decision.var,
                decision.value
            );
            log::trace!(
                "Depth {}: x[{}] = {} (score {:.4})",
                self.stack.len(),
                decision.var,
                decision.value,
                decision.score
            );
            store.push_level();
            self.stack.push(decision);

            let result = store
                .fix(decision.var, decision.value)
                .and_then(|()| propagation.fixpoint(store));
            if result.is_err() {
                self.fails += 1;
                propagation.clear();
                if !self.backtrack(store, propagation) {
                    break;
                }
            }
        }

        if self.incumbent.is_found() {
            MsscStatus::Optimal
        } else {
            MsscStatus::Infeasible
        }
    }

    /// Record the complete assignment in `store` if it improves the incumbent.
    fn leaf(&mut self, store: &mut Store, on_solution: &mut dyn FnMut(&[usize], f64)) {
        let memberships: Vec<usize> = store.assignment().into_iter().flatten().collect();
        let wcss = self.instance.wcss(&memberships);

        if wcss > store.objective_max() || !self.incumbent.offer(&memberships, wcss) {
            return;
        }
        if self.settings.verbose {
            log::info!(
                "New incumbent: wcss={:.6e} at node {} ({} fails)",
                wcss,
                self.nodes_explored,
                self.fails
            );
        }
        on_solution(&memberships, wcss);

        if store.set_objective_max(wcss - self.settings.improvement_tol).is_err() {
            log::trace!("Leaf closed by the new incumbent");
        }
    }

    /// Undo the deepest positive branch and apply its refutation.
    ///
    /// Returns false once the whole tree is exhausted.
    fn backtrack(&mut self, store: &mut Store, propagation: &mut Propagation<'_>) -> bool {
        while let Some(decision) = self.stack.pop() {
            store.pop_level();
            // The objective maximum may have dropped below what the parent saw.
            propagation.schedule_objective_watchers();

            let result = store
                .remove(decision.var, decision.value)
                .and_then(|()| propagation.fixpoint(store));
            if result.is_ok() {
                return true;
            }
            self.fails += 1;
            propagation.clear();
        }
        false
    }

    /// Get elapsed time in milliseconds.
    pub fn elapsed_ms(&self) -> u64 {
        self.start_time
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0)
    }

    /// Check if time limit is exceeded.
    pub fn time_limit_exceeded(&self) -> bool {
        if let Some(limit) = self.settings.time_limit_ms {
            self.elapsed_ms() >= limit
        } else {
            false
        }
    }

    /// Check the node and time limits.
    pub fn check_termination(&self) -> Option<MsscStatus> {
        if self.time_limit_exceeded() {
            return Some(MsscStatus::TimeLimit);
        }
        if self.nodes_explored >= self.settings.max_nodes {
            return Some(MsscStatus::NodeLimit);
        }
        None
    }

    /// Finalize the solve and return the solution.
    pub fn finalize(&self, status: MsscStatus) -> MsscSolution {
        let bound = match status {
            MsscStatus::Optimal => self.incumbent.wcss(),
            MsscStatus::Infeasible => f64::INFINITY,
            MsscStatus::NodeLimit | MsscStatus::TimeLimit => self.root_bound,
        };
        MsscSolution {
            status,
            memberships: self.incumbent.memberships().to_vec(),
            wcss: self.incumbent.wcss(),
            bound,
            nodes_explored: self.nodes_explored,
            fails: self.fails,
            solutions_found: self.incumbent.reports(),
            solve_time_ms: self.elapsed_ms(),
        }
    }

    /// Log progress (if verbose).
    pub fn log_progress(&self) {
        if !self.settings.verbose {
            return;
        }

        if self.nodes_explored % self.settings.log_freq.max(1) != 0 {
            return;
        }

        log::info!(
            "Nodes: {} | Depth: {} | Fails: {} | Incumbent: {:.6e} | Time: {:.1}s",
            self.nodes_explored,
            self.stack.len(),
            self.fails,
            self.incumbent.wcss(),
            self.elapsed_ms() as f64 / 1000.0,
        );
    }

    /// Get statistics for display.
    pub fn stats(&self) -> TreeStats {
        TreeStats {
            nodes_explored: self.nodes_explored,
            fails: self.fails,
            depth: self.stack.len() as u64,
            incumbent_updates: self.incumbent.reports(),
            root_bound: self.root_bound,
            incumbent_wcss: self.incumbent.wcss(),
            elapsed_ms: self.elapsed_ms(),
        }
    }
}

/// Statistics from the B&B tree.
#[derive(Debug, Clone)]
pub struct TreeStats {
    /// Nodes visited so far.
    pub nodes_explored: u64,

    /// Branches closed by a conflict.
    pub fails: u64,

    /// Positive branches on the current path.
    pub depth: u64,

    /// Improving clusterings accepted.
    pub incumbent_updates: u64,

    /// Objective lower bound after root propagation.
    pub root_bound: f64,

    /// WCSS of the best clustering, +inf before the first one.
    pub incumbent_wcss: f64,

    /// Time since `run` started.
    pub elapsed_ms: u64,
}
