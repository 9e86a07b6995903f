//! Exhaustive reference solver for tiny instances.
//!
//! Enumerates every assignment and keeps the one of smallest WCSS. Only
//! practical for N up to about a dozen points; it serves as the ground-truth
//! oracle when checking bound soundness.

use crate::instance::Instance;

/// Best assignment found by enumeration.
#[derive(Debug, Clone, PartialEq)]
pub struct ExhaustiveSolution {
    /// Cluster label of every point.
    pub memberships: Vec<usize>,

    /// WCSS of `memberships`.
    pub wcss: f64,

    /// Number of complete assignments evaluated.
    pub evaluated: u64,
}

/// Enumerate all assignments of `instance` and return an optimal one.
///
/// - Every cluster must be non-empty.
/// - With `cardinalities`, cluster `c` must receive exactly `cardinalities[c]` points.
/// - With `canonical`, only assignments whose labels first occur in increasing
///   order (value precedence over `0, 1, ..., K-1`) are considered.
///
/// Returns `None` when no assignment satisfies the restrictions.
pub fn solve_exhaustive(
    instance: &Instance,
    cardinalities: Option<&[usize]>,
    canonical: bool,
) -> Option<ExhaustiveSolution> {
    let n = instance.num_points();
    let k = instance.num_clusters();

    let mut enumerator = Enumerator {
        instance,
        cardinalities,
        canonical,
        k,
        labels: vec![0; n],
        counts: vec![0; k],
        best: None,
        evaluated: 0,
    };
    enumerator.recurse(0, 0);

    let evaluated = enumerator.evaluated;
    enumerator.best.map(|(memberships, wcss)| ExhaustiveSolution {
        memberships,
        wcss,
        evaluated,
    })
}

struct Enumerator<'a> {
    instance: &'a Instance,
    cardinalities: Option<&'a [usize]>,
    canonical: bool,
    k: usize,
    labels: Vec<usize>,
    counts: Vec<usize>,
    best: Option<(Vec<usize>, f64)>,
    evaluated: u64,
}

impl Enumerator<'_> {
    /// `used` is the number of distinct labels seen so far (canonical mode).
    fn recurse(&mut self, pos: usize, used: usize) {
        let n = self.labels.len();
        let remaining = n - pos;

        // Not enough points left to open the remaining clusters.
        let empty = self.counts.iter().filter(|&&c| c == 0).count();
        if empty > remaining {
            return;
        }

        if pos == n {
            self.evaluated += 1;
            let wcss = self.instance.wcss(&self.labels);
            let better = match self.best {
                Some((_, best)) => wcss < best,
                None => true,
            };
            if better {
                self.best = Some((self.labels.clone(), wcss));
            }
            return;
        }

        let max_label = if self.canonical {
            (used + 1).min(self.k)
        } else {
            self.k
        };

        for c in 0..max_label {
            if let Some(cards) = self.cardinalities {
                if self.counts[c] >= cards[c] {
                    continue;
                }
            }
            self.labels[pos] = c;
            self.counts[c] += 1;
            let next_used = if c == used { used + 1 } else { used };
            self.recurse(pos + 1, next_used);
            self.counts[c] -= 1;
        }
    }
}
