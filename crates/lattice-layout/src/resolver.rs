//! Row and column metrics.
//!
//! One axis is resolved at a time. Cells are reduced to [`CellExtent`]s
//! (first track, span, padded metrics) and folded into per-track triples:
//!
//! 1. span-1 cells max-combine into their track;
//! 2. spanning cells, narrowest first, top up the tracks they cover whenever
//!    the tracks plus the boundaries between them fall short of the cell;
//! 3. boundary footprints are kept alongside so the aggregate includes them.
//!
//! [`ResolvedAxis::sizes_for`] then turns a concrete extent into track sizes.

use crate::metrics::{AxisMetrics, saturating_total};
use crate::resize::apportion;

/// A cell reduced to one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellExtent {
    /// First track covered.
    pub start: usize,
    /// Tracks covered, at least 1.
    pub span: usize,
    /// Element metrics plus padding.
    pub metrics: AxisMetrics,
}

impl CellExtent {
    pub fn new(start: usize, span: usize, metrics: AxisMetrics) -> Self {
        Self {
            start,
            span: span.max(1),
            metrics,
        }
    }
}

/// Resolved tracks of one axis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedAxis {
    tracks: Vec<AxisMetrics>,
    /// Footprint of each boundary; `track_count + 1` entries, outer edges included.
    boundaries: Vec<u32>,
    percentages: Vec<Option<u8>>,
}

impl ResolvedAxis {
    /// Resolve `track_count` tracks from `cells`.
    ///
    /// `boundaries` and `percentages` are padded with zeros / `None` (or
    /// truncated) to `track_count + 1` and `track_count` entries.
    pub fn resolve(
        track_count: usize,
        cells: &[CellExtent],
        mut boundaries: Vec<u32>,
        mut percentages: Vec<Option<u8>>,
    ) -> Self {
        boundaries.resize(track_count + 1, 0);
        percentages.resize(track_count, None);
        for percentage in percentages.iter_mut().flatten() {
            *percentage = (*percentage).min(100);
        }

        let clip = |cell: &CellExtent| {
            let start = cell.start.min(track_count);
            let end = cell.start.saturating_add(cell.span).min(track_count);
            start..end
        };

        // Tracks with no span-1 contributor start bounded at zero; spanning
        // cells that are themselves unbounded release them below.
        let mut tracks: Vec<Option<AxisMetrics>> = vec![None; track_count];
        for cell in cells {
            let range = clip(cell);
            if range.len() != 1 {
                continue;
            }
            let track = &mut tracks[range.start];
            *track = Some(match *track {
                Some(current) => current.combine(cell.metrics),
                None => cell.metrics.normalized(),
            });
        }
        let mut uncovered: Vec<bool> = tracks.iter().map(Option::is_none).collect();
        let mut tracks: Vec<AxisMetrics> = tracks
            .into_iter()
            .map(|track| track.unwrap_or(AxisMetrics::exact(0)))
            .collect();

        let mut spanning: Vec<&CellExtent> =
            cells.iter().filter(|cell| clip(*cell).len() > 1).collect();
        spanning.sort_by_key(|cell| clip(*cell).len());

        for cell in spanning {
            let range = clip(cell);
            let interior =
                saturating_total(boundaries[range.start + 1..range.end].iter().copied());
            let covered = &mut tracks[range.clone()];

            if cell.metrics.is_unbounded() {
                for (track, free) in covered.iter_mut().zip(&mut uncovered[range.clone()]) {
                    if *free {
                        track.maximum = None;
                        *free = false;
                    }
                }
            }

            let have_min =
                saturating_total(covered.iter().map(|t| t.minimum)).saturating_add(interior);
            if cell.metrics.minimum > have_min {
                let shares = apportion(&preferred_weights(covered), cell.metrics.minimum - have_min);
                for (track, share) in covered.iter_mut().zip(shares) {
                    track.minimum = track.minimum.saturating_add(share);
                }
            }

            let have_pref = saturating_total(covered.iter().map(|t| t.preferred.max(t.minimum)))
                .saturating_add(interior);
            if cell.metrics.preferred > have_pref {
                let shares =
                    apportion(&preferred_weights(covered), cell.metrics.preferred - have_pref);
                for (track, share) in covered.iter_mut().zip(shares) {
                    track.preferred = track.preferred.max(track.minimum).saturating_add(share);
                }
            }

            for track in covered.iter_mut() {
                *track = track.normalized();
            }
        }

        Self {
            tracks,
            boundaries,
            percentages,
        }
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn tracks(&self) -> &[AxisMetrics] {
        &self.tracks
    }

    pub fn boundaries(&self) -> &[u32] {
        &self.boundaries
    }

    pub fn percentages(&self) -> &[Option<u8>] {
        &self.percentages
    }

    /// Sum of every boundary footprint.
    pub fn boundary_total(&self) -> u32 {
        saturating_total(self.boundaries.iter().copied())
    }

    /// Aggregate requirement: all tracks plus all boundaries.
    ///
    /// An empty axis is `0 / 0 / unbounded`.
    pub fn total(&self) -> AxisMetrics {
        if self.tracks.is_empty() {
            return AxisMetrics::ZERO.grow(self.boundary_total());
        }
        self.tracks
            .iter()
            .fold(AxisMetrics::exact(self.boundary_total()), |acc, track| {
                acc.sum(*track)
            })
    }

    /// Track sizes for a total extent (boundaries included).
    ///
    /// Below the minimum total every track gets its minimum. Between minimum
    /// and preferred, tracks give up `preferred - minimum` in proportion to
    /// that slack. Above preferred, the surplus goes to tracks with a
    /// percentage hint, in proportion to it, without passing any track's
    /// maximum; whatever is left stays unused.
    pub fn sizes_for(&self, extent: u32) -> Vec<u32> {
        let available = extent.saturating_sub(self.boundary_total());
        let minimums: Vec<u32> = self.tracks.iter().map(|t| t.minimum).collect();
        let min_total = saturating_total(minimums.iter().copied());
        if available <= min_total {
            return minimums;
        }

        let mut sizes: Vec<u32> = self.tracks.iter().map(|t| t.preferred).collect();
        let pref_total = saturating_total(sizes.iter().copied());
        if available <= pref_total {
            let slack: Vec<u64> = self
                .tracks
                .iter()
                .map(|t| u64::from(t.preferred - t.minimum))
                .collect();
            let cuts = apportion(&slack, pref_total - available);
            for (size, cut) in sizes.iter_mut().zip(cuts) {
                *size -= cut;
            }
            return sizes;
        }

        let mut remaining = available - pref_total;
        let mut growing: Vec<usize> = (0..self.tracks.len())
            .filter(|&i| self.percentages[i].is_some_and(|p| p > 0))
            .filter(|&i| self.tracks[i].maximum.is_none_or(|max| max > sizes[i]))
            .collect();

        while remaining > 0 && !growing.is_empty() {
            let weights: Vec<u64> = growing
                .iter()
                .map(|&i| u64::from(self.percentages[i].unwrap_or(0)))
                .collect();
            let shares = apportion(&weights, remaining);

            let capped: Vec<usize> = growing
                .iter()
                .zip(&shares)
                .filter(|&(&i, &share)| {
                    self.tracks[i]
                        .maximum
                        .is_some_and(|max| sizes[i].saturating_add(share) > max)
                })
                .map(|(&i, _)| i)
                .collect();

            if capped.is_empty() {
                for (&i, share) in growing.iter().zip(shares) {
                    sizes[i] += share;
                }
                break;
            }

            for i in capped {
                let max = self.tracks[i].maximum.unwrap_or(sizes[i]);
                remaining -= max - sizes[i];
                sizes[i] = max;
                growing.retain(|&g| g != i);
            }
        }
        sizes
    }
}

/// Weights for topping up spanned tracks: their preferred sizes, or equal
/// weights if none has a preference.
fn preferred_weights(tracks: &[AxisMetrics]) -> Vec<u64> {
    if tracks.iter().all(|t| t.preferred == 0) {
        vec![1; tracks.len()]
    } else {
        tracks.iter().map(|t| u64::from(t.preferred)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exact(start: usize, span: usize, size: u32) -> CellExtent {
        CellExtent::new(start, span, AxisMetrics::exact(size))
    }

    #[test]
    fn column_minimum_is_largest_cell_minimum() {
        // Column 0 holds widths 10 and 20, column 1 holds 15 and 5.
        let cells = [
            CellExtent::new(0, 1, AxisMetrics::at_least(10, 10)),
            CellExtent::new(1, 1, AxisMetrics::at_least(15, 15)),
            CellExtent::new(0, 1, AxisMetrics::at_least(20, 20)),
            CellExtent::new(1, 1, AxisMetrics::at_least(5, 5)),
        ];
        let axis = ResolvedAxis::resolve(2, &cells, Vec::new(), Vec::new());
        let minimums: Vec<u32> = axis.tracks().iter().map(|t| t.minimum).collect();
        assert_eq!(minimums, vec![20, 15]);
        assert!(axis.total().is_unbounded());
    }

    #[test]
    fn spanning_shortfall_follows_preferred_sizes() {
        let cells = [exact(0, 1, 10), exact(1, 1, 30), exact(0, 2, 80)];
        let axis = ResolvedAxis::resolve(2, &cells, Vec::new(), Vec::new());
        // Shortfall 40 split 1:3.
        assert_eq!(axis.tracks()[0].minimum, 20);
        assert_eq!(axis.tracks()[1].minimum, 60);
        assert_eq!(axis.total().minimum, 80);
    }

    #[test]
    fn spanning_shortfall_counts_interior_borders() {
        let cells = [exact(0, 1, 10), exact(1, 1, 10), exact(0, 2, 22)];
        let axis = ResolvedAxis::resolve(2, &cells, vec![0, 2, 0], Vec::new());
        assert_eq!(axis.tracks()[0].minimum, 10);
        assert_eq!(axis.tracks()[1].minimum, 10);
    }

    #[test]
    fn spanning_over_empty_tracks_splits_evenly() {
        let cells = [exact(0, 3, 30)];
        let axis = ResolvedAxis::resolve(3, &cells, Vec::new(), Vec::new());
        let prefs: Vec<u32> = axis.tracks().iter().map(|t| t.preferred).collect();
        assert_eq!(prefs, vec![10, 10, 10]);
        assert_eq!(axis.total(), AxisMetrics::exact(30));
    }

    #[test]
    fn unbounded_spanning_cell_frees_uncovered_tracks() {
        let cells = [exact(0, 1, 5), CellExtent::new(0, 2, AxisMetrics::at_least(4, 20))];
        let axis = ResolvedAxis::resolve(2, &cells, Vec::new(), Vec::new());
        // Track 1 has no preference, so the preferred shortfall lands on track 0.
        assert_eq!(axis.tracks()[0].preferred, 20);
        assert_eq!(axis.tracks()[1].preferred, 0);
        assert_eq!(axis.tracks()[1].maximum, None);
    }

    #[test]
    fn narrowest_span_is_applied_first() {
        // The 2-span raises tracks 0 and 1 first; the 3-span then tops up
        // in proportion to those, leaving track 2 empty.
        let cells = [exact(0, 3, 30), exact(0, 2, 20)];
        let axis = ResolvedAxis::resolve(3, &cells, Vec::new(), Vec::new());
        let prefs: Vec<u32> = axis.tracks().iter().map(|t| t.preferred).collect();
        assert_eq!(prefs, vec![15, 15, 0]);
    }

    #[test]
    fn spans_past_the_grid_are_clipped() {
        let cells = [exact(1, 5, 8)];
        let axis = ResolvedAxis::resolve(2, &cells, Vec::new(), Vec::new());
        assert_eq!(axis.tracks()[1], AxisMetrics::exact(8));
    }

    #[test]
    fn empty_axis_is_unbounded_zero() {
        let axis = ResolvedAxis::resolve(0, &[], Vec::new(), Vec::new());
        assert_eq!(axis.total(), AxisMetrics::ZERO);
        assert!(axis.sizes_for(100).is_empty());
    }

    #[test]
    fn total_includes_boundaries() {
        let axis = ResolvedAxis::resolve(2, &[exact(0, 1, 4), exact(1, 1, 6)], vec![1, 2, 1], Vec::new());
        assert_eq!(axis.total(), AxisMetrics::exact(14));
    }

    #[test]
    fn below_minimum_clamps() {
        let cells = [
            CellExtent::new(0, 1, AxisMetrics::new(10, 20, None)),
            CellExtent::new(1, 1, AxisMetrics::new(5, 5, None)),
        ];
        let axis = ResolvedAxis::resolve(2, &cells, Vec::new(), Vec::new());
        assert_eq!(axis.sizes_for(3), vec![10, 5]);
    }

    #[test]
    fn between_minimum_and_preferred_shrinks_by_slack() {
        let cells = [
            CellExtent::new(0, 1, AxisMetrics::new(10, 30, None)),
            CellExtent::new(1, 1, AxisMetrics::new(10, 20, None)),
            CellExtent::new(2, 1, AxisMetrics::new(5, 5, None)),
        ];
        let axis = ResolvedAxis::resolve(3, &cells, Vec::new(), Vec::new());
        // Preferred total 55, target 40: give up 15 in a 20:10:0 ratio.
        assert_eq!(axis.sizes_for(40), vec![20, 15, 5]);
    }

    #[test]
    fn surplus_follows_percentages() {
        let cells = [exact(0, 1, 0), exact(1, 1, 0), exact(2, 1, 10)];
        let mut cells = cells.to_vec();
        for cell in &mut cells {
            cell.metrics.maximum = None;
        }
        let axis = ResolvedAxis::resolve(3, &cells, Vec::new(), vec![Some(25), Some(75), None]);
        assert_eq!(axis.sizes_for(110), vec![25, 75, 10]);
    }

    #[test]
    fn surplus_respects_maximum_and_redistributes() {
        let cells = [
            CellExtent::new(0, 1, AxisMetrics::new(0, 0, Some(10))),
            CellExtent::new(1, 1, AxisMetrics::at_least(0, 0)),
        ];
        let axis = ResolvedAxis::resolve(2, &cells, Vec::new(), vec![Some(50), Some(50)]);
        assert_eq!(axis.sizes_for(100), vec![10, 90]);
    }

    #[test]
    fn surplus_without_hints_is_unused() {
        let cells = [CellExtent::new(0, 1, AxisMetrics::at_least(5, 10))];
        let axis = ResolvedAxis::resolve(1, &cells, Vec::new(), Vec::new());
        assert_eq!(axis.sizes_for(100), vec![10]);
    }

    #[test]
    fn huge_requirements_saturate() {
        let big = u32::MAX / 2 + 10;
        let cells = [exact(0, 1, big), exact(1, 1, big), exact(0, 2, u32::MAX)];
        let axis = ResolvedAxis::resolve(2, &cells, vec![1, 1, 1], Vec::new());
        assert_eq!(axis.boundary_total(), 3);
        assert_eq!(axis.total().minimum, u32::MAX);
        assert_eq!(axis.sizes_for(u32::MAX), vec![big, big]);
    }

    #[test]
    fn percentages_are_clamped_to_100() {
        let axis = ResolvedAxis::resolve(1, &[], Vec::new(), vec![Some(250)]);
        assert_eq!(axis.percentages(), &[Some(100)]);
    }
}
