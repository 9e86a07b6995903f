//! Value precedence between two cluster labels.
//!
//! Enforces that label `s` occurs in the assignment array before label `t`
//! does. Three reversible pointers track the state (Law & Lee, CP 2004):
//!
//! - `alpha`: first position where `s` is still possible; `t` has been removed
//!   from every position up to and including it
//! - `beta`: next position after `alpha` where `s` is still possible
//! - `gamma`: first position fixed to `t`
//!
//! When `beta` passes `gamma`, only position `alpha` can still host the first
//! `s`, so it is fixed to `s`. The filter maintains generalized arc
//! consistency and does its work in demons after the initial pass.

use crate::engine::{PropResult, Propagator, RevInt, Store, Subscriptions};

/// `s` precedes `t` over all assignment variables.
pub struct ValuePrecedence {
    s: usize,
    t: usize,
    pointers: Option<Pointers>,
}

#[derive(Debug, Clone, Copy)]
struct Pointers {
    alpha: RevInt,
    beta: RevInt,
    gamma: RevInt,
}

impl ValuePrecedence {
    /// Label `s` must appear before label `t`.
    pub fn new(s: usize, t: usize) -> Self {
        debug_assert_ne!(s, t);
        Self {
            s,
            t,
            pointers: None,
        }
    }

    fn update_beta(&self, store: &mut Store, p: Pointers) -> PropResult {
        let n = store.num_vars() as i64;
        let mut beta = store.int(p.beta);
        loop {
            beta += 1;
            if beta >= n || store.contains(beta as usize, self.s) {
                break;
            }
        }
        store.set_int(p.beta, beta.min(n));
        if beta > store.int(p.gamma) {
            store.fix(store.int(p.alpha) as usize, self.s)?;
        }
        Ok(())
    }

    /// Move `alpha` past every position where `s` is impossible, removing `t`
    /// along the way, then re-anchor `beta`.
    fn advance_alpha(&self, store: &mut Store, p: Pointers, mut alpha: i64) -> PropResult {
        let n = store.num_vars() as i64;
        let beta = store.int(p.beta);
        while alpha < beta.min(n) {
            store.remove(alpha as usize, self.t)?;
            alpha += 1;
        }
        while alpha < n && !store.contains(alpha as usize, self.s) {
            store.remove(alpha as usize, self.t)?;
            alpha += 1;
        }
        store.set_int(p.alpha, alpha);
        if alpha < n {
            store.remove(alpha as usize, self.t)?;
        }
        store.set_int(p.beta, alpha);
        if alpha < n {
            self.update_beta(store, p)?;
        }
        Ok(())
    }
}

impl Propagator for ValuePrecedence {
    fn name(&self) -> &'static str {
        "precedence"
    }

    fn subscriptions(&self) -> Subscriptions {
        Subscriptions {
            domain_demon: true,
            fixed_demon: true,
            ..Default::default()
        }
    }

    fn post(&mut self, store: &mut Store) -> PropResult {
        let n = store.num_vars() as i64;
        let p = Pointers {
            alpha: store.new_rev_int(0),
            beta: store.new_rev_int(0),
            gamma: store.new_rev_int(0),
        };
        self.pointers = Some(p);

        let mut alpha = 0;
        while alpha < n && !store.contains(alpha as usize, self.s) {
            store.remove(alpha as usize, self.t)?;
            alpha += 1;
        }
        store.set_int(p.alpha, alpha);
        store.set_int(p.beta, alpha);
        store.set_int(p.gamma, alpha);

        if alpha < n {
            store.remove(alpha as usize, self.t)?;
            let mut gamma = alpha;
            loop {
                gamma += 1;
                if gamma >= n || store.value(gamma as usize) == Some(self.t) {
                    break;
                }
            }
            store.set_int(p.gamma, gamma.min(n));
            self.update_beta(store, p)?;
        }
        Ok(())
    }

    fn on_domain_change(&mut self, store: &mut Store, var: usize) -> PropResult {
        let Some(p) = self.pointers else {
            return Ok(());
        };
        let beta = store.int(p.beta);
        if beta > store.int(p.gamma) {
            return Ok(());
        }
        let var = var as i64;
        if var == store.int(p.alpha) && !store.contains(var as usize, self.s) {
            self.advance_alpha(store, p, var + 1)
        } else if var == beta && !store.contains(var as usize, self.s) {
            self.update_beta(store, p)
        } else {
            Ok(())
        }
    }

    fn on_fixed(&mut self, store: &mut Store, var: usize) -> PropResult {
        let Some(p) = self.pointers else {
            return Ok(());
        };
        let beta = store.int(p.beta);
        let pos = var as i64;
        if beta <= store.int(p.gamma) && pos < store.int(p.gamma) && store.value(var) == Some(self.t) {
            store.set_int(p.gamma, pos);
            if beta > pos {
                store.fix(store.int(p.alpha) as usize, self.s)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Conflict, Propagation};

    #[test]
    fn test_post_removes_subsequent_from_first() {
        let mut store = Store::new(4, 2);
        let mut prop = Propagation::new();
        prop.add(Box::new(ValuePrecedence::new(0, 1)));
        prop.post_all(&mut store).unwrap();

        // Point 0 cannot open with label 1.
        assert_eq!(store.value(0), Some(0));
        assert_eq!(store.size(1), 2);
    }

    #[test]
    fn test_forces_antecedent() {
        // Labels 1 before 2 on three clusters.
        let mut store = Store::new(4, 3);
        let mut prop = Propagation::new();
        prop.add(Box::new(ValuePrecedence::new(1, 2)));
        prop.post_all(&mut store).unwrap();
        assert!(!store.contains(0, 2));

        // Fixing x1 = 2 leaves x0 as the only place for an earlier 1.
        store.push_level();
        store.fix(1, 2).unwrap();
        prop.fixpoint(&mut store).unwrap();
        assert_eq!(store.value(0), Some(1));

        store.pop_level();
        assert_eq!(store.value(0), None);
    }

    #[test]
    fn test_advance_alpha() {
        let mut store = Store::new(4, 3);
        let mut prop = Propagation::new();
        prop.add(Box::new(ValuePrecedence::new(1, 2)));
        prop.post_all(&mut store).unwrap();

        // x0 can no longer be 1: it becomes 0 and x1 loses 2.
        store.remove(0, 1).unwrap();
        prop.fixpoint(&mut store).unwrap();
        assert_eq!(store.value(0), Some(0));
        assert!(!store.contains(1, 2));
    }

    #[test]
    fn test_last_antecedent_forced() {
        let mut store = Store::new(4, 3);
        let mut prop = Propagation::new();
        prop.add(Box::new(ValuePrecedence::new(1, 2)));
        prop.post_all(&mut store).unwrap();

        // Only x0 and x2 may still take label 1.
        store.remove(1, 1).unwrap();
        store.remove(3, 1).unwrap();
        prop.fixpoint(&mut store).unwrap();
        assert_eq!(store.value(0), None);

        store.fix(2, 2).unwrap();
        prop.fixpoint(&mut store).unwrap();
        assert_eq!(store.value(0), Some(1));
    }

    #[test]
    fn test_violation_detected() {
        let mut store = Store::new(3, 2);
        let mut prop = Propagation::new();
        prop.add(Box::new(ValuePrecedence::new(0, 1)));
        prop.post_all(&mut store).unwrap();

        store.fix(1, 1).unwrap();
        store.fix(2, 1).unwrap();
        prop.fixpoint(&mut store).unwrap();
        // x0 was fixed to 0 at post; the assignment 0,1,1 is fine.
        assert_eq!(store.assignment(), vec![Some(0), Some(1), Some(1)]);

        // Labels 1 before 0 is rejected outright.
        let mut store = Store::new(2, 2);
        store.fix(0, 1).unwrap();
        let mut prop = Propagation::new();
        prop.add(Box::new(ValuePrecedence::new(0, 1)));
        assert_eq!(prop.post_all(&mut store), Err(Conflict));
    }
}
