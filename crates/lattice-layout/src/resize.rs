//! Proportional resizing shared by panes, peepholes and the span resolver.
//!
//! # Running-remainder apportionment
//!
//! Element `i` receives
//!
//! ```text
//! floor(W_i * T / W) - floor(W_{i-1} * T / W)
//! ```
//!
//! where `W_i` is the running sum of the first `i + 1` weights, `W` the total
//! weight and `T` the extent being shared. Rounding error carries forward
//! instead of piling up on the first or last element, and the shares sum to
//! `T` exactly because the last running sum is `W`.

/// Split `amount` by `weights` with running-remainder rounding.
///
/// Zero weights receive nothing; if every weight is zero, nothing is handed
/// out and the result is all zeros.
pub(crate) fn apportion(weights: &[u64], amount: u32) -> Vec<u32> {
    let total: u128 = weights.iter().map(|&w| u128::from(w)).sum();
    if total == 0 {
        return vec![0; weights.len()];
    }

    let mut running: u128 = 0;
    let mut handed_out: u128 = 0;
    weights
        .iter()
        .map(|&weight| {
            running += u128::from(weight);
            let cumulative = running * u128::from(amount) / total;
            let share = cumulative - handed_out;
            handed_out = cumulative;
            u32::try_from(share).unwrap_or(u32::MAX)
        })
        .collect()
}

/// Distribute `target` among elements in proportion to their reference sizes.
///
/// Reference sizes of 0 weigh as 1. The result always sums to `target`; when
/// `target` is at least the element count, every element gets at least 1.
///
/// ```
/// use lattice_layout::resize::distribute;
///
/// assert_eq!(distribute(&[100, 200, 300], 60), vec![10, 20, 30]);
/// assert_eq!(distribute(&[1, 1, 1], 10).iter().sum::<u32>(), 10);
/// ```
pub fn distribute(reference_sizes: &[u32], target: u32) -> Vec<u32> {
    let weights: Vec<u64> = reference_sizes
        .iter()
        .map(|&size| u64::from(size.max(1)))
        .collect();
    let mut sizes = apportion(&weights, target);

    if usize::try_from(target).is_ok_and(|t| t >= sizes.len()) {
        for i in 0..sizes.len() {
            if sizes[i] > 0 {
                continue;
            }
            // Largest donor first, lowest index on ties.
            let donor = sizes
                .iter()
                .enumerate()
                .filter(|&(_, &size)| size > 1)
                .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))
                .map(|(j, _)| j);
            if let Some(j) = donor {
                sizes[j] -= 1;
                sizes[i] = 1;
            }
        }
    }
    sizes
}

/// Raise every element to its minimum by taking from elements above theirs.
///
/// The sum is preserved. If the sum cannot cover every minimum, elements are
/// raised anyway and the sum grows; callers treat that as an overflow.
pub fn enforce_minimums(sizes: &mut [u32], minimums: &[u32]) {
    for i in 0..sizes.len() {
        let minimum = minimums.get(i).copied().unwrap_or(0);
        while sizes[i] < minimum {
            let donor = sizes
                .iter()
                .enumerate()
                .filter(|&(j, &size)| j != i && size > minimums.get(j).copied().unwrap_or(0))
                .max_by(|a, b| {
                    let slack_a = a.1 - minimums.get(a.0).copied().unwrap_or(0);
                    let slack_b = b.1 - minimums.get(b.0).copied().unwrap_or(0);
                    slack_a.cmp(&slack_b).then(b.0.cmp(&a.0))
                })
                .map(|(j, _)| j);
            let Some(j) = donor else {
                sizes[i] = minimum;
                break;
            };
            let slack = sizes[j] - minimums.get(j).copied().unwrap_or(0);
            let moved = slack.min(minimum - sizes[i]);
            sizes[j] -= moved;
            sizes[i] += moved;
        }
    }
}

/// Reference sizes plus the fixed overhead they are measured against.
///
/// Reference sizes are the weights for [`distribute`]. They are taken from
/// the elements' natural sizes the first time they are needed, and thrown
/// away whenever the fixed overhead changes, because natural sizes measured
/// under a different overhead no longer describe the same proportions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProportionalResize {
    reference_sizes: Option<Vec<u32>>,
    fixed_overhead: u32,
}

impl ProportionalResize {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with previously saved reference sizes.
    #[must_use]
    pub fn with_reference_sizes(sizes: Vec<u32>) -> Self {
        Self {
            reference_sizes: Some(sizes),
            fixed_overhead: 0,
        }
    }

    pub fn reference_sizes(&self) -> Option<&[u32]> {
        self.reference_sizes.as_deref()
    }

    pub fn set_reference_sizes(&mut self, sizes: Vec<u32>) {
        self.reference_sizes = Some(sizes);
    }

    pub fn fixed_overhead(&self) -> u32 {
        self.fixed_overhead
    }

    /// Update the fixed overhead. Returns `true` if reference sizes were
    /// invalidated.
    pub fn set_fixed_overhead(&mut self, overhead: u32) -> bool {
        if overhead == self.fixed_overhead {
            return false;
        }
        self.fixed_overhead = overhead;
        self.invalidate();
        true
    }

    pub fn invalidate(&mut self) {
        self.reference_sizes = None;
    }

    /// Share `target - fixed_overhead` among `natural_sizes.len()` elements.
    ///
    /// Missing or stale (wrong length) reference sizes are recomputed from
    /// `natural_sizes` first.
    pub fn resize(&mut self, target: u32, natural_sizes: &[u32]) -> Vec<u32> {
        let stale = self
            .reference_sizes
            .as_ref()
            .is_none_or(|sizes| sizes.len() != natural_sizes.len());
        if stale {
            self.reference_sizes = Some(natural_sizes.to_vec());
        }
        let available = target.saturating_sub(self.fixed_overhead);
        distribute(self.reference_sizes.as_deref().unwrap_or_default(), available)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn panes_scale_exactly() {
        assert_eq!(distribute(&[100, 200, 300], 60), vec![10, 20, 30]);
    }

    #[test]
    fn remainder_is_spread_not_dumped() {
        // 10 / 3: running sums 3.33, 6.67, 10 -> 3, 3, 4
        assert_eq!(distribute(&[1, 1, 1], 10), vec![3, 3, 4]);
        // 11 / 4: 2.75, 5.5, 8.25, 11 -> 2, 3, 3, 3
        assert_eq!(distribute(&[1, 1, 1, 1], 11), vec![2, 3, 3, 3]);
    }

    #[test]
    fn zero_reference_sizes_weigh_as_one() {
        assert_eq!(distribute(&[0, 0], 10), vec![5, 5]);
    }

    #[test]
    fn every_element_gets_one_when_possible() {
        let sizes = distribute(&[1000, 1, 1], 3);
        assert_eq!(sizes, vec![1, 1, 1]);
        let sizes = distribute(&[1000, 1, 1], 2);
        assert_eq!(sizes.iter().sum::<u32>(), 2);
    }

    #[test]
    fn empty_input() {
        assert!(distribute(&[], 10).is_empty());
        assert!(apportion(&[], 10).is_empty());
    }

    #[test]
    fn apportion_honors_zero_weights() {
        assert_eq!(apportion(&[0, 2, 0, 2], 5), vec![0, 2, 0, 3]);
        assert_eq!(apportion(&[0, 0], 5), vec![0, 0]);
    }

    #[test]
    fn enforce_minimums_moves_from_largest_slack() {
        let mut sizes = vec![1, 50, 9];
        enforce_minimums(&mut sizes, &[10, 10, 5]);
        assert_eq!(sizes, vec![10, 41, 9]);
        assert_eq!(sizes.iter().sum::<u32>(), 60);
    }

    #[test]
    fn enforce_minimums_overflows_when_impossible() {
        let mut sizes = vec![2, 2];
        enforce_minimums(&mut sizes, &[5, 5]);
        assert_eq!(sizes, vec![5, 5]);
    }

    #[test]
    fn overhead_change_invalidates_reference_sizes() {
        let mut resize = ProportionalResize::new();
        assert_eq!(resize.resize(60, &[100, 200, 300]), vec![10, 20, 30]);
        assert_eq!(resize.reference_sizes(), Some(&[100, 200, 300][..]));

        // Natural sizes drift, but the stored references still rule.
        assert_eq!(resize.resize(60, &[1, 1, 1]), vec![10, 20, 30]);

        assert!(resize.set_fixed_overhead(6));
        assert!(!resize.set_fixed_overhead(6));
        assert_eq!(resize.reference_sizes(), None);
        assert_eq!(resize.resize(60, &[1, 1, 1]), vec![18, 18, 18]);
    }

    #[test]
    fn restored_reference_sizes_seed_the_resize() {
        let mut resize = ProportionalResize::with_reference_sizes(vec![1, 3]);
        assert_eq!(resize.resize(40, &[50, 50]), vec![10, 30]);
    }

    #[test]
    fn length_mismatch_recomputes() {
        let mut resize = ProportionalResize::with_reference_sizes(vec![1, 3]);
        assert_eq!(resize.resize(30, &[10, 10, 10]), vec![10, 10, 10]);
    }

    proptest! {
        #[test]
        fn distribute_sums_to_target(
            refs in proptest::collection::vec(0u32..10_000, 1..12),
            target in 0u32..100_000,
        ) {
            let sizes = distribute(&refs, target);
            prop_assert_eq!(sizes.len(), refs.len());
            prop_assert_eq!(sizes.iter().map(|&s| u64::from(s)).sum::<u64>(), u64::from(target));
            if target as usize >= refs.len() {
                prop_assert!(sizes.iter().all(|&s| s >= 1));
            }
        }

        #[test]
        fn resize_sums_to_target_minus_overhead(
            refs in proptest::collection::vec(1u32..5_000, 1..8),
            overhead in 0u32..50,
            target in 0u32..20_000,
        ) {
            let mut resize = ProportionalResize::with_reference_sizes(refs.clone());
            resize.set_fixed_overhead(overhead);
            let sizes = resize.resize(target, &refs);
            prop_assert_eq!(sizes.iter().sum::<u32>(), target.saturating_sub(overhead));
        }
    }
}
