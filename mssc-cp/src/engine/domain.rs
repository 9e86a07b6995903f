//! Finite label domains.

/// Set of candidate cluster labels for one assignment variable.
///
/// Labels live in `0..64`; bit `c` is set when label `c` is still possible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Domain(u64);

impl Domain {
    /// Domain holding every label in `0..num_values`.
    pub fn full(num_values: usize) -> Self {
        debug_assert!(num_values <= 64);
        if num_values == 64 {
            Self(u64::MAX)
        } else {
            Self((1u64 << num_values) - 1)
        }
    }

    /// Domain holding a single label.
    pub fn singleton(value: usize) -> Self {
        Self(1u64 << value)
    }

    /// Raw bit representation.
    pub fn bits(&self) -> u64 {
        self.0
    }

    /// Check whether `value` is a candidate.
    #[inline]
    pub fn contains(&self, value: usize) -> bool {
        value < 64 && (self.0 >> value) & 1 == 1
    }

    /// Number of candidates.
    #[inline]
    pub fn size(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// True when no candidate is left.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// True when exactly one candidate is left.
    #[inline]
    pub fn is_fixed(&self) -> bool {
        self.0 != 0 && self.0 & (self.0 - 1) == 0
    }

    /// The single remaining candidate, if fixed.
    #[inline]
    pub fn value(&self) -> Option<usize> {
        if self.is_fixed() {
            Some(self.0.trailing_zeros() as usize)
        } else {
            None
        }
    }

    /// Smallest candidate.
    pub fn min(&self) -> Option<usize> {
        if self.0 == 0 {
            None
        } else {
            Some(self.0.trailing_zeros() as usize)
        }
    }

    /// Domain without `value`.
    #[must_use]
    pub fn without(&self, value: usize) -> Self {
        Self(self.0 & !(1u64 << value))
    }

    /// Iterate candidates in increasing order.
    pub fn iter(&self) -> DomainIter {
        DomainIter { bits: self.0 }
    }
}

/// Iterator over the labels of a [`Domain`].
#[derive(Debug, Clone)]
pub struct DomainIter {
    bits: u64,
}

impl Iterator for DomainIter {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.bits == 0 {
            return None;
        }
        let value = self.bits.trailing_zeros() as usize;
        self.bits &= self.bits - 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.bits.count_ones() as usize;
        (n, Some(n))
    }
}

impl IntoIterator for Domain {
    type Item = usize;
    type IntoIter = DomainIter;

    fn into_iter(self) -> DomainIter {
        self.iter()
    }
}
