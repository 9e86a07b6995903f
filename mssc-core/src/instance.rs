//! Problem data for (balanced) minimum sum-of-squares clustering.
//!
//! An [`Instance`] is built once before solving and never mutated afterwards;
//! every bound constraint and the branching heuristic share it read-only.

use crate::error::{CoreResult, InstanceError};

/// Largest supported number of clusters.
///
/// Assignment domains are 64-bit label sets.
pub const MAX_CLUSTERS: usize = 64;

/// Static facts about an MSSC instance.
///
/// # Dimensions
///
/// - `n`: number of points
/// - `s`: number of features per point
/// - `k`: number of clusters
/// - coordinates: n × s
/// - dissimilarities: n × n, symmetric, zero diagonal (squared distances)
#[derive(Debug, Clone)]
pub struct Instance {
    n: usize,
    s: usize,
    k: usize,
    coordinates: Vec<Vec<f64>>,
    /// Row-major n × n.
    dissimilarities: Vec<f64>,
    target_memberships: Option<Vec<usize>>,
    target_cardinalities: Option<Vec<usize>>,
}

impl Instance {
    /// Build an instance from point coordinates, using squared Euclidean
    /// distances as dissimilarities.
    pub fn from_coordinates(coordinates: Vec<Vec<f64>>, k: usize) -> CoreResult<Self> {
        let n = coordinates.len();
        if n == 0 {
            return Err(InstanceError::Empty);
        }
        let s = coordinates[0].len();
        for (i, row) in coordinates.iter().enumerate() {
            if row.len() != s {
                return Err(InstanceError::DimensionMismatch(format!(
                    "point {} has {} features, expected {}",
                    i,
                    row.len(),
                    s
                )));
            }
            if let Some(col) = row.iter().position(|v| !v.is_finite()) {
                return Err(InstanceError::NonFinite { row: i, col });
            }
        }

        let mut dissimilarities = vec![0.0; n * n];
        for i in 0..n {
            for j in (i + 1)..n {
                let d = squared_distance(&coordinates[i], &coordinates[j]);
                dissimilarities[i * n + j] = d;
                dissimilarities[j * n + i] = d;
            }
        }

        let instance = Self {
            n,
            s,
            k,
            coordinates,
            dissimilarities,
            target_memberships: None,
            target_cardinalities: None,
        };
        instance.validate()?;
        Ok(instance)
    }

    /// Build an instance from an explicit dissimilarity matrix.
    ///
    /// Coordinates are optional; the centroid-based tie-handling rules need them.
    pub fn from_dissimilarities(
        dissimilarities: Vec<Vec<f64>>,
        coordinates: Option<Vec<Vec<f64>>>,
        k: usize,
    ) -> CoreResult<Self> {
        let n = dissimilarities.len();
        if n == 0 {
            return Err(InstanceError::Empty);
        }
        let mut flat = Vec::with_capacity(n * n);
        for (i, row) in dissimilarities.iter().enumerate() {
            if row.len() != n {
                return Err(InstanceError::DimensionMismatch(format!(
                    "dissimilarity row {} has length {}, expected {}",
                    i,
                    row.len(),
                    n
                )));
            }
            flat.extend_from_slice(row);
        }

        let coordinates = coordinates.unwrap_or_else(|| vec![Vec::new(); n]);
        if coordinates.len() != n {
            return Err(InstanceError::DimensionMismatch(format!(
                "{} coordinate rows for {} points",
                coordinates.len(),
                n
            )));
        }
        let s = coordinates[0].len();
        if let Some(i) = coordinates.iter().position(|row| row.len() != s) {
            return Err(InstanceError::DimensionMismatch(format!(
                "point {} has {} features, expected {}",
                i,
                coordinates[i].len(),
                s
            )));
        }

        let instance = Self {
            n,
            s,
            k,
            coordinates,
            dissimilarities: flat,
            target_memberships: None,
            target_cardinalities: None,
        };
        instance.validate()?;
        Ok(instance)
    }

    /// Attach target memberships (used by the "as indicated" initial solution).
    pub fn with_target_memberships(mut self, memberships: Vec<usize>) -> CoreResult<Self> {
        self.target_memberships = Some(memberships);
        self.validate()?;
        Ok(self)
    }

    /// Attach target cardinalities (balanced MSSC).
    pub fn with_target_cardinalities(mut self, cardinalities: Vec<usize>) -> CoreResult<Self> {
        self.target_cardinalities = Some(cardinalities);
        self.validate()?;
        Ok(self)
    }

    /// Check every structural invariant of the instance.
    pub fn validate(&self) -> CoreResult<()> {
        let n = self.n;
        if n == 0 {
            return Err(InstanceError::Empty);
        }
        if self.k == 0 || self.k > n || self.k > MAX_CLUSTERS {
            return Err(InstanceError::InvalidClusterCount {
                k: self.k,
                n,
                max: MAX_CLUSTERS,
            });
        }
        if self.dissimilarities.len() != n * n {
            return Err(InstanceError::DimensionMismatch(format!(
                "dissimilarity matrix has {} entries, expected {}",
                self.dissimilarities.len(),
                n * n
            )));
        }

        for i in 0..n {
            if self.dissimilarity(i, i) != 0.0 {
                return Err(InstanceError::InvalidDissimilarities(format!(
                    "diagonal entry {} is {}",
                    i,
                    self.dissimilarity(i, i)
                )));
            }
            for j in (i + 1)..n {
                let d = self.dissimilarity(i, j);
                if !d.is_finite() {
                    return Err(InstanceError::NonFinite { row: i, col: j });
                }
                if d < 0.0 {
                    return Err(InstanceError::InvalidDissimilarities(format!(
                        "negative entry ({}, {})",
                        i, j
                    )));
                }
                if (d - self.dissimilarity(j, i)).abs() > 1e-9 * d.max(1.0) {
                    return Err(InstanceError::InvalidDissimilarities(format!(
                        "asymmetric entries ({}, {}) and ({}, {})",
                        i, j, j, i
                    )));
                }
            }
        }

        if let Some(ref memberships) = self.target_memberships {
            if memberships.len() != n {
                return Err(InstanceError::InvalidMemberships(format!(
                    "{} memberships for {} points",
                    memberships.len(),
                    n
                )));
            }
            if let Some(i) = memberships.iter().position(|&c| c >= self.k) {
                return Err(InstanceError::InvalidMemberships(format!(
                    "point {} assigned to cluster {} (K = {})",
                    i, memberships[i], self.k
                )));
            }
        }

        if let Some(ref cards) = self.target_cardinalities {
            if cards.len() != self.k {
                return Err(InstanceError::InvalidCardinalities(format!(
                    "{} cardinalities for {} clusters",
                    cards.len(),
                    self.k
                )));
            }
            if let Some(c) = cards.iter().position(|&card| card == 0) {
                return Err(InstanceError::InvalidCardinalities(format!(
                    "cluster {} has zero target cardinality",
                    c
                )));
            }
            let total: usize = cards.iter().sum();
            if total != n {
                return Err(InstanceError::InvalidCardinalities(format!(
                    "cardinalities sum to {}, expected {}",
                    total, n
                )));
            }
        }

        Ok(())
    }

    /// Number of points (N).
    pub fn num_points(&self) -> usize {
        self.n
    }

    /// Number of features (S).
    pub fn num_features(&self) -> usize {
        self.s
    }

    /// Number of clusters (K).
    pub fn num_clusters(&self) -> usize {
        self.k
    }

    /// Coordinates of point `i`.
    pub fn point(&self, i: usize) -> &[f64] {
        &self.coordinates[i]
    }

    /// Squared dissimilarity between points `i` and `j`.
    #[inline]
    pub fn dissimilarity(&self, i: usize, j: usize) -> f64 {
        self.dissimilarities[i * self.n + j]
    }

    /// Row `i` of the dissimilarity matrix.
    #[inline]
    pub fn dissimilarity_row(&self, i: usize) -> &[f64] {
        &self.dissimilarities[i * self.n..(i + 1) * self.n]
    }

    /// Optional target memberships.
    pub fn target_memberships(&self) -> Option<&[usize]> {
        self.target_memberships.as_deref()
    }

    /// Optional target cardinalities.
    pub fn target_cardinalities(&self) -> Option<&[usize]> {
        self.target_cardinalities.as_deref()
    }

    /// Cluster sizes of a full assignment.
    pub fn cardinalities(&self, memberships: &[usize]) -> Vec<usize> {
        let mut cards = vec![0; self.k];
        for &c in memberships {
            cards[c] += 1;
        }
        cards
    }

    /// Total within-cluster sum of squares of a full assignment.
    ///
    /// Each cluster contributes the sum of its pairwise dissimilarities divided
    /// by its size; empty clusters contribute nothing.
    pub fn wcss(&self, memberships: &[usize]) -> f64 {
        debug_assert_eq!(memberships.len(), self.n);
        let mut sums = vec![0.0; self.k];
        for i in 0..self.n {
            let row = self.dissimilarity_row(i);
            for j in (i + 1)..self.n {
                if memberships[i] == memberships[j] {
                    sums[memberships[i]] += row[j];
                }
            }
        }
        let cards = self.cardinalities(memberships);
        sums.iter()
            .zip(cards.iter())
            .filter(|(_, &card)| card > 0)
            .map(|(sum, &card)| sum / card as f64)
            .sum()
    }
}

/// Squared Euclidean distance.
pub fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}
