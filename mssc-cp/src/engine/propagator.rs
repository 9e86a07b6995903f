//! Propagator interface and fixed-point scheduling.

use std::collections::VecDeque;

use super::{Event, PropResult, Store};

/// Events a propagator wants to hear about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Subscriptions {
    /// Call [`Propagator::on_domain_change`] for every shrunk variable.
    pub domain_demon: bool,

    /// Call [`Propagator::on_fixed`] for every newly fixed variable.
    pub fixed_demon: bool,

    /// Schedule [`Propagator::propagate`] when any domain shrinks.
    pub propagate_on_domain: bool,

    /// Schedule [`Propagator::propagate`] when the objective range changes.
    pub propagate_on_objective: bool,
}

/// A filtering algorithm attached to the assignment store.
///
/// Every method may shrink domains or raise the objective lower bound through
/// the store, and returns `Err(Conflict)` when the current branch cannot lead
/// to a solution.
pub trait Propagator {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Events this propagator reacts to.
    fn subscriptions(&self) -> Subscriptions;

    /// Called once when the model is built, before the first propagation.
    fn post(&mut self, _store: &mut Store) -> PropResult {
        Ok(())
    }

    /// Whole-constraint propagation.
    fn propagate(&mut self, _store: &mut Store) -> PropResult {
        Ok(())
    }

    /// Demon for a shrunk domain.
    fn on_domain_change(&mut self, _store: &mut Store, _var: usize) -> PropResult {
        Ok(())
    }

    /// Demon for a newly fixed variable.
    fn on_fixed(&mut self, _store: &mut Store, _var: usize) -> PropResult {
        Ok(())
    }
}

/// Counters kept by the scheduler.
#[derive(Debug, Clone, Copy, Default)]
pub struct PropagationStats {
    /// Whole-constraint propagation calls.
    pub propagate_calls: u64,

    /// Demon calls.
    pub demon_calls: u64,

    /// Conflicts raised.
    pub conflicts: u64,
}

/// Runs propagators to a fixed point.
///
/// Demons run first, in event order. Whole-constraint propagation runs once
/// the demon queue is empty, one propagator at a time. Events produced by a
/// propagator re-schedule every subscriber, the producer included.
pub struct Propagation<'a> {
    propagators: Vec<Box<dyn Propagator + 'a>>,
    subscriptions: Vec<Subscriptions>,

    demons: VecDeque<(usize, Event)>,
    pending: VecDeque<usize>,
    scheduled: Vec<bool>,

    stats: PropagationStats,
}

impl<'a> Default for Propagation<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Propagation<'a> {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self {
            propagators: Vec::new(),
            subscriptions: Vec::new(),
            demons: VecDeque::new(),
            pending: VecDeque::new(),
            scheduled: Vec::new(),
            stats: PropagationStats::default(),
        }
    }

    /// Register a propagator. Returns its index.
    pub fn add(&mut self, propagator: Box<dyn Propagator + 'a>) -> usize {
        self.subscriptions.push(propagator.subscriptions());
        self.propagators.push(propagator);
        self.scheduled.push(false);
        self.propagators.len() - 1
    }

    /// Number of registered propagators.
    pub fn len(&self) -> usize {
        self.propagators.len()
    }

    /// True when no propagator is registered.
    pub fn is_empty(&self) -> bool {
        self.propagators.is_empty()
    }

    /// Names of the registered propagators, in posting order.
    pub fn names(&self) -> Vec<&'static str> {
        self.propagators.iter().map(|p| p.name()).collect()
    }

    /// Scheduler counters.
    pub fn stats(&self) -> PropagationStats {
        self.stats
    }

    /// Post every propagator, then propagate all of them to a fixed point.
    pub fn post_all(&mut self, store: &mut Store) -> PropResult {
        for idx in 0..self.propagators.len() {
            let result = self.propagators[idx].post(store);
            if result.is_err() {
                return self.fail();
            }
            // Changes made while posting must reach propagators posted earlier.
            self.dispatch(store);
            let result = self.drain_demons(store);
            if result.is_err() {
                return self.fail();
            }
        }
        self.schedule_all();
        self.fixpoint(store)
    }

    /// Schedule every propagator for a whole-constraint call.
    pub fn schedule_all(&mut self) {
        for idx in 0..self.propagators.len() {
            self.schedule(idx);
        }
    }

    /// Schedule propagators that watch the objective range.
    pub fn schedule_objective_watchers(&mut self) {
        for idx in 0..self.propagators.len() {
            if self.subscriptions[idx].propagate_on_objective {
                self.schedule(idx);
            }
        }
    }

    /// Run demons and scheduled propagators until nothing changes.
    ///
    /// On conflict the queues are cleared; the caller backtracks the store.
    pub fn fixpoint(&mut self, store: &mut Store) -> PropResult {
        loop {
            self.dispatch(store);

            if let Some((idx, event)) = self.demons.pop_front() {
                if self.run_demon(store, idx, event).is_err() {
                    return self.fail();
                }
                continue;
            }

            if let Some(idx) = self.pending.pop_front() {
                self.scheduled[idx] = false;
                self.stats.propagate_calls += 1;
                if self.propagators[idx].propagate(store).is_err() {
                    log::trace!("{} failed", self.propagators[idx].name());
                    return self.fail();
                }
                continue;
            }

            return Ok(());
        }
    }

    /// Drop every queued demon and scheduled call.
    pub fn clear(&mut self) {
        self.demons.clear();
        self.pending.clear();
        self.scheduled.iter_mut().for_each(|s| *s = false);
    }

    fn fail(&mut self) -> PropResult {
        self.stats.conflicts += 1;
        self.clear();
        Err(super::Conflict)
    }

    fn schedule(&mut self, idx: usize) {
        if !self.scheduled[idx] {
            self.scheduled[idx] = true;
            self.pending.push_back(idx);
        }
    }

    fn dispatch(&mut self, store: &mut Store) {
        for event in store.take_events() {
            for idx in 0..self.propagators.len() {
                let subs = self.subscriptions[idx];
                match event {
                    Event::Domain(_) => {
                        if subs.domain_demon {
                            self.demons.push_back((idx, event));
                        }
                        if subs.propagate_on_domain {
                            self.schedule(idx);
                        }
                    }
                    Event::Fixed(_) => {
                        if subs.fixed_demon {
                            self.demons.push_back((idx, event));
                        }
                    }
                    Event::Objective => {
                        if subs.propagate_on_objective {
                            self.schedule(idx);
                        }
                    }
                }
            }
        }
    }

    fn drain_demons(&mut self, store: &mut Store) -> PropResult {
        loop {
            self.dispatch(store);
            let Some((idx, event)) = self.demons.pop_front() else {
                return Ok(());
            };
            self.run_demon(store, idx, event)?;
        }
    }

    fn run_demon(&mut self, store: &mut Store, idx: usize, event: Event) -> PropResult {
        self.stats.demon_calls += 1;
        match event {
            Event::Domain(var) => self.propagators[idx].on_domain_change(store, var),
            Event::Fixed(var) => self.propagators[idx].on_fixed(store, var),
            Event::Objective => Ok(()),
        }
    }
}
