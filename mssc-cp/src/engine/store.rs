//! Trailed assignment store.
//!
//! Holds the label domain of every point, the objective range and the
//! reversible cells propagators keep across calls. Every change is recorded on
//! a trail so that backtracking to a shallower decision level restores the
//! exact prior state.

use super::domain::{Domain, DomainIter};
use super::{Conflict, Event, PropResult};

/// Handle to a reversible integer cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevInt(usize);

/// Handle to a reversible float cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevFloat(usize);

/// Handle to a reversible boolean cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevBool(usize);

#[derive(Debug, Clone, Copy)]
enum TrailEntry {
    Domain { var: usize, prev: Domain },
    Int { cell: usize, prev: i64 },
    Float { cell: usize, prev: f64 },
    Bool { cell: usize, prev: bool },
    ObjectiveMin(f64),
}

/// Assignment variables, objective range and reversible state.
#[derive(Debug, Clone)]
pub struct Store {
    domains: Vec<Domain>,
    num_values: usize,

    ints: Vec<i64>,
    floats: Vec<f64>,
    bools: Vec<bool>,

    /// Trailed; raised by bound constraints.
    objective_min: f64,
    /// Not trailed; only lowered when an incumbent improves.
    objective_max: f64,

    trail: Vec<TrailEntry>,
    levels: Vec<usize>,

    events: Vec<Event>,
    revision: u64,
}

impl Store {
    /// Create `num_vars` variables over labels `0..num_values` and an
    /// objective range of `[0, +inf)`.
    pub fn new(num_vars: usize, num_values: usize) -> Self {
        Self {
            domains: vec![Domain::full(num_values); num_vars],
            num_values,
            ints: Vec::new(),
            floats: Vec::new(),
            bools: Vec::new(),
            objective_min: 0.0,
            objective_max: f64::INFINITY,
            trail: Vec::new(),
            levels: Vec::new(),
            events: Vec::new(),
            revision: 0,
        }
    }

    // === Domain queries ===

    /// Number of assignment variables.
    pub fn num_vars(&self) -> usize {
        self.domains.len()
    }

    /// Number of labels.
    pub fn num_values(&self) -> usize {
        self.num_values
    }

    /// Current domain of variable `var`.
    #[inline]
    pub fn domain(&self, var: usize) -> Domain {
        self.domains[var]
    }

    /// Check whether `value` is still a candidate for `var`.
    #[inline]
    pub fn contains(&self, var: usize, value: usize) -> bool {
        self.domains[var].contains(value)
    }

    /// True when `var` has a single candidate.
    #[inline]
    pub fn is_fixed(&self, var: usize) -> bool {
        self.domains[var].is_fixed()
    }

    /// Value of `var` if fixed.
    #[inline]
    pub fn value(&self, var: usize) -> Option<usize> {
        self.domains[var].value()
    }

    /// Number of candidates of `var`.
    #[inline]
    pub fn size(&self, var: usize) -> usize {
        self.domains[var].size()
    }

    /// Candidates of `var` in increasing order.
    pub fn values(&self, var: usize) -> DomainIter {
        self.domains[var].iter()
    }

    /// True when every variable is fixed.
    pub fn all_fixed(&self) -> bool {
        self.domains.iter().all(Domain::is_fixed)
    }

    /// Labels of all variables, `None` for free ones.
    pub fn assignment(&self) -> Vec<Option<usize>> {
        self.domains.iter().map(Domain::value).collect()
    }

    // === Domain mutation ===

    /// Remove `value` from the domain of `var`.
    ///
    /// No-op if absent. Fails instead of emptying the domain.
    pub fn remove(&mut self, var: usize, value: usize) -> PropResult {
        let dom = self.domains[var];
        if !dom.contains(value) {
            return Ok(());
        }
        let next = dom.without(value);
        if next.is_empty() {
            return Err(Conflict);
        }
        self.set_domain(var, next);
        Ok(())
    }

    /// Reduce the domain of `var` to `value`.
    pub fn fix(&mut self, var: usize, value: usize) -> PropResult {
        let dom = self.domains[var];
        if !dom.contains(value) {
            return Err(Conflict);
        }
        if dom.is_fixed() {
            return Ok(());
        }
        self.set_domain(var, Domain::singleton(value));
        Ok(())
    }

    fn set_domain(&mut self, var: usize, next: Domain) {
        self.trail.push(TrailEntry::Domain {
            var,
            prev: self.domains[var],
        });
        self.domains[var] = next;
        self.revision += 1;
        self.events.push(Event::Domain(var));
        if next.is_fixed() {
            self.events.push(Event::Fixed(var));
        }
    }

    // === Objective ===

    /// Current lower bound of the objective.
    pub fn objective_min(&self) -> f64 {
        self.objective_min
    }

    /// Current upper bound of the objective (best incumbent so far).
    pub fn objective_max(&self) -> f64 {
        self.objective_max
    }

    /// Raise the objective lower bound. Fails if it would exceed the upper bound.
    pub fn set_objective_min(&mut self, value: f64) -> PropResult {
        if value.is_nan() {
            log::warn!("Ignoring NaN objective lower bound");
            return Ok(());
        }
        if value <= self.objective_min {
            return Ok(());
        }
        if value > self.objective_max {
            return Err(Conflict);
        }
        self.trail.push(TrailEntry::ObjectiveMin(self.objective_min));
        self.objective_min = value;
        self.revision += 1;
        self.events.push(Event::Objective);
        Ok(())
    }

    /// Lower the objective upper bound for the rest of the search.
    ///
    /// This change survives backtracking.
    pub fn set_objective_max(&mut self, value: f64) -> PropResult {
        if value < self.objective_max {
            self.objective_max = value;
            self.revision += 1;
            self.events.push(Event::Objective);
        }
        if self.objective_min > self.objective_max {
            return Err(Conflict);
        }
        Ok(())
    }

    // === Reversible cells ===

    /// Allocate a reversible integer cell.
    pub fn new_rev_int(&mut self, init: i64) -> RevInt {
        self.ints.push(init);
        RevInt(self.ints.len() - 1)
    }

    /// Allocate a reversible float cell.
    pub fn new_rev_float(&mut self, init: f64) -> RevFloat {
        self.floats.push(init);
        RevFloat(self.floats.len() - 1)
    }

    /// Allocate a reversible boolean cell.
    pub fn new_rev_bool(&mut self, init: bool) -> RevBool {
        self.bools.push(init);
        RevBool(self.bools.len() - 1)
    }

    /// Read an integer cell.
    #[inline]
    pub fn int(&self, cell: RevInt) -> i64 {
        self.ints[cell.0]
    }

    /// Write an integer cell.
    pub fn set_int(&mut self, cell: RevInt, value: i64) {
        let prev = self.ints[cell.0];
        if prev != value {
            self.trail.push(TrailEntry::Int { cell: cell.0, prev });
            self.ints[cell.0] = value;
        }
    }

    /// Read a float cell.
    #[inline]
    pub fn float(&self, cell: RevFloat) -> f64 {
        self.floats[cell.0]
    }

    /// Write a float cell.
    pub fn set_float(&mut self, cell: RevFloat, value: f64) {
        let prev = self.floats[cell.0];
        if prev.to_bits() != value.to_bits() {
            self.trail.push(TrailEntry::Float { cell: cell.0, prev });
            self.floats[cell.0] = value;
        }
    }

    /// Read a boolean cell.
    #[inline]
    pub fn bool(&self, cell: RevBool) -> bool {
        self.bools[cell.0]
    }

    /// Write a boolean cell.
    pub fn set_bool(&mut self, cell: RevBool, value: bool) {
        let prev = self.bools[cell.0];
        if prev != value {
            self.trail.push(TrailEntry::Bool { cell: cell.0, prev });
            self.bools[cell.0] = value;
        }
    }

    // === Trail ===

    /// Open a new decision level.
    pub fn push_level(&mut self) {
        self.levels.push(self.trail.len());
    }

    /// Undo every change made since the matching [`push_level`](Self::push_level).
    pub fn pop_level(&mut self) {
        let Some(mark) = self.levels.pop() else {
            return;
        };
        while self.trail.len() > mark {
            let Some(entry) = self.trail.pop() else {
                break;
            };
            match entry {
                TrailEntry::Domain { var, prev } => self.domains[var] = prev,
                TrailEntry::Int { cell, prev } => self.ints[cell] = prev,
                TrailEntry::Float { cell, prev } => self.floats[cell] = prev,
                TrailEntry::Bool { cell, prev } => self.bools[cell] = prev,
                TrailEntry::ObjectiveMin(prev) => self.objective_min = prev,
            }
        }
        self.revision += 1;
        self.events.clear();
    }

    /// Current decision level (0 at the root).
    pub fn level(&self) -> usize {
        self.levels.len()
    }

    // === Events ===

    /// Drain pending modification events.
    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// True when modification events are waiting to be dispatched.
    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    /// Monotone counter bumped by every domain or objective change.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_and_fix() {
        let mut store = Store::new(2, 3);
        assert!(store.remove(0, 1).is_ok());
        assert!(!store.contains(0, 1));
        assert_eq!(store.size(0), 2);

        // Idempotent on absent values.
        let rev = store.revision();
        assert!(store.remove(0, 1).is_ok());
        assert_eq!(store.revision(), rev);

        assert!(store.fix(1, 2).is_ok());
        assert_eq!(store.value(1), Some(2));
        assert_eq!(store.fix(1, 0), Err(Conflict));
    }

    #[test]
    fn test_no_wipeout() {
        let mut store = Store::new(1, 2);
        store.remove(0, 0).unwrap();
        assert_eq!(store.remove(0, 1), Err(Conflict));
        assert_eq!(store.value(0), Some(1));
    }

    #[test]
    fn test_events() {
        let mut store = Store::new(2, 2);
        store.remove(0, 0).unwrap();
        let events = store.take_events();
        assert_eq!(events, vec![Event::Domain(0), Event::Fixed(0)]);
        assert!(!store.has_events());
    }

    #[test]
    fn test_backtrack_restores_state() {
        let mut store = Store::new(3, 3);
        let cell = store.new_rev_int(-1);
        let flag = store.new_rev_bool(false);
        let bound = store.new_rev_float(0.0);

        store.push_level();
        store.fix(0, 2).unwrap();
        store.remove(1, 0).unwrap();
        store.set_int(cell, 7);
        store.set_bool(flag, true);
        store.set_float(bound, 3.5);
        store.set_objective_min(4.0).unwrap();

        store.push_level();
        store.fix(1, 1).unwrap();
        store.set_int(cell, 9);

        store.pop_level();
        assert_eq!(store.value(1), None);
        assert!(!store.contains(1, 0));
        assert_eq!(store.int(cell), 7);

        store.pop_level();
        assert_eq!(store.value(0), None);
        assert_eq!(store.size(1), 3);
        assert_eq!(store.int(cell), -1);
        assert!(!store.bool(flag));
        assert_eq!(store.float(bound), 0.0);
        assert_eq!(store.objective_min(), 0.0);
        assert_eq!(store.level(), 0);
    }

    #[test]
    fn test_objective_bounds() {
        let mut store = Store::new(1, 2);
        store.set_objective_max(10.0).unwrap();

        store.push_level();
        store.set_objective_min(5.0).unwrap();
        assert_eq!(store.set_objective_min(11.0), Err(Conflict));
        assert_eq!(store.objective_min(), 5.0);

        // Lowering the max below the min fails but the max sticks.
        assert_eq!(store.set_objective_max(4.0), Err(Conflict));
        store.pop_level();
        assert_eq!(store.objective_min(), 0.0);
        assert_eq!(store.objective_max(), 4.0);
    }
}
