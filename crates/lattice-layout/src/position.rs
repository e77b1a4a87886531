//! Final geometry: where tracks, cells, elements and border strokes land.

use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::sync::Arc;

use lattice_core::geometry::{Axis, Rect, Sides, extent_to_coord};

use crate::cell::{Aligned, CellRecord, HAlign, Padded, VAlign};
use crate::element::{ElementId, ElementRef};
use crate::grid_map::{GridMap, Placement};
use crate::metrics::AxisMetrics;
use crate::synthesis::{Corner, CornerDrawInfo, StraightBorder};

/// Offsets of tracks and boundaries along one axis.
///
/// Boundary 0 starts at the origin; each track follows its leading boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackLayout {
    track_starts: Vec<i32>,
    track_sizes: Vec<u32>,
    boundary_starts: Vec<i32>,
    boundary_sizes: Vec<u32>,
}

impl TrackLayout {
    /// `boundaries` is padded with zeros to `sizes.len() + 1` entries.
    pub fn new(origin: i32, sizes: Vec<u32>, boundaries: &[u32]) -> Self {
        let mut boundary_sizes = boundaries.to_vec();
        boundary_sizes.resize(sizes.len() + 1, 0);

        let mut cursor = origin;
        let mut track_starts = Vec::with_capacity(sizes.len());
        let mut boundary_starts = Vec::with_capacity(sizes.len() + 1);
        for (i, &size) in sizes.iter().enumerate() {
            boundary_starts.push(cursor);
            cursor = cursor.saturating_add(extent_to_coord(boundary_sizes[i]));
            track_starts.push(cursor);
            cursor = cursor.saturating_add(extent_to_coord(size));
        }
        boundary_starts.push(cursor);

        Self {
            track_starts,
            track_sizes: sizes,
            boundary_starts,
            boundary_sizes,
        }
    }

    pub fn track_count(&self) -> usize {
        self.track_sizes.len()
    }

    pub fn track_sizes(&self) -> &[u32] {
        &self.track_sizes
    }

    pub fn track_start(&self, track: usize) -> i32 {
        self.track_starts
            .get(track)
            .copied()
            .unwrap_or_else(|| self.end())
    }

    pub fn boundary_start(&self, boundary: usize) -> i32 {
        self.boundary_starts
            .get(boundary)
            .copied()
            .unwrap_or_else(|| self.end())
    }

    pub fn boundary_size(&self, boundary: usize) -> u32 {
        self.boundary_sizes.get(boundary).copied().unwrap_or(0)
    }

    /// Start and extent of `tracks`, interior boundaries included.
    pub fn span(&self, tracks: Range<usize>) -> (i32, u32) {
        if tracks.is_empty() || tracks.start >= self.track_count() {
            return (self.track_start(tracks.start), 0);
        }
        let last = tracks.end.min(self.track_count()) - 1;
        let start = self.track_starts[tracks.start];
        let end = self.track_starts[last].saturating_add(extent_to_coord(self.track_sizes[last]));
        (start, end.abs_diff(start))
    }

    /// Coordinate just past the trailing boundary.
    pub fn end(&self) -> i32 {
        let last = self.boundary_starts.last().copied().unwrap_or(0);
        last.saturating_add(extent_to_coord(
            self.boundary_sizes.last().copied().unwrap_or(0),
        ))
    }
}

/// Rectangle covering a placement's spanned tracks.
pub fn cell_rect(columns: &TrackLayout, rows: &TrackLayout, placement: &Placement) -> Rect {
    let (x, width) = columns.span(placement.col..placement.end_col());
    let (y, height) = rows.span(placement.row..placement.end_row());
    Rect::new(x, y, width, height)
}

/// Padding of a placed cell, falling back to column (left/right) and row
/// (top/bottom) defaults.
pub fn resolve_padding(map: &GridMap, placement: &Placement, cell: &CellRecord) -> Sides {
    let explicit = cell.padding();
    let first_col = map.col_defaults(placement.col);
    let last_col = map.col_defaults(placement.end_col() - 1);
    let first_row = map.row_defaults(placement.row);
    let last_row = map.row_defaults(placement.end_row() - 1);
    Sides {
        left: explicit
            .left
            .or_else(|| first_col.and_then(|d| d.padding_before))
            .unwrap_or(0),
        right: explicit
            .right
            .or_else(|| last_col.and_then(|d| d.padding_after))
            .unwrap_or(0),
        top: explicit
            .top
            .or_else(|| first_row.and_then(|d| d.padding_before))
            .unwrap_or(0),
        bottom: explicit
            .bottom
            .or_else(|| last_row.and_then(|d| d.padding_after))
            .unwrap_or(0),
    }
}

/// Alignment of a placed cell: its own, then the column (horizontal) or
/// row (vertical) default, then `Left` / `Top`.
pub fn resolve_alignment(map: &GridMap, placement: &Placement, cell: &CellRecord) -> (HAlign, VAlign) {
    let own = cell.alignment();
    let halign = own
        .halign
        .or_else(|| map.col_defaults(placement.col).and_then(|d| d.halign))
        .unwrap_or_default();
    let valign = own
        .valign
        .or_else(|| map.row_defaults(placement.row).and_then(|d| d.valign))
        .unwrap_or_default();
    (halign, valign)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anchor {
    Start,
    Center,
    End,
    Fill,
}

impl From<HAlign> for Anchor {
    fn from(align: HAlign) -> Self {
        match align {
            HAlign::Left => Self::Start,
            HAlign::Center => Self::Center,
            HAlign::Right => Self::End,
            HAlign::Fill => Self::Fill,
        }
    }
}

impl From<VAlign> for Anchor {
    fn from(align: VAlign) -> Self {
        match align {
            VAlign::Top => Self::Start,
            VAlign::Middle => Self::Center,
            VAlign::Bottom => Self::End,
            VAlign::Fill => Self::Fill,
        }
    }
}

/// Place an extent of `metrics` inside `space` starting at `start`.
fn align(start: i32, space: u32, metrics: AxisMetrics, anchor: Anchor) -> (i32, u32) {
    if anchor == Anchor::Fill {
        return (start, space);
    }
    let size = metrics.clamp(metrics.preferred).min(space);
    let slack = space - size;
    let offset = match anchor {
        Anchor::Start | Anchor::Fill => 0,
        Anchor::Center => slack / 2,
        Anchor::End => slack,
    };
    (start.saturating_add(extent_to_coord(offset)), size)
}

/// Rectangle of an element inside its (unpadded) cell rectangle.
pub fn element_rect(
    cell: Rect,
    padding: Sides,
    element: &ElementRef,
    alignment: (HAlign, VAlign),
) -> Rect {
    let inner = cell.inner(padding);
    let (x, width) = align(
        inner.x,
        inner.width,
        element.metrics(Axis::Horizontal),
        alignment.0.into(),
    );
    let (y, height) = align(
        inner.y,
        inner.height,
        element.metrics(Axis::Vertical),
        alignment.1.into(),
    );
    Rect::new(x, y, width, height)
}

/// What a border element draws.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BorderShape {
    Straight(StraightBorder),
    Corner(Arc<CornerDrawInfo>),
}

/// A border stroke or corner with its final rectangle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BorderElement {
    pub shape: BorderShape,
    pub rect: Rect,
}

/// Straight strokes straddle their boundary and cover the tracks they run
/// along; corners fill the boundary intersection.
pub fn border_elements(
    columns: &TrackLayout,
    rows: &TrackLayout,
    straight: &[StraightBorder],
    corners: &[Corner],
) -> Vec<BorderElement> {
    let mut elements = Vec::with_capacity(straight.len() + corners.len());
    for run in straight {
        let rect = match run.orientation {
            Axis::Vertical => {
                let (y, height) = rows.span(run.tracks.clone());
                Rect::new(
                    columns.boundary_start(run.boundary),
                    y,
                    columns.boundary_size(run.boundary),
                    height,
                )
            }
            Axis::Horizontal => {
                let (x, width) = columns.span(run.tracks.clone());
                Rect::new(
                    x,
                    rows.boundary_start(run.boundary),
                    width,
                    rows.boundary_size(run.boundary),
                )
            }
        };
        elements.push(BorderElement {
            shape: BorderShape::Straight(run.clone()),
            rect,
        });
    }
    for corner in corners {
        elements.push(BorderElement {
            shape: BorderShape::Corner(Arc::clone(&corner.info)),
            rect: Rect::new(
                columns.boundary_start(corner.col_boundary),
                rows.boundary_start(corner.row_boundary),
                columns.boundary_size(corner.col_boundary),
                rows.boundary_size(corner.row_boundary),
            ),
        });
    }
    elements
}

/// Remembers where each element was last put and notifies only on change.
#[derive(Debug, Default)]
pub struct PositionPropagator {
    last: HashMap<ElementId, Rect>,
}

impl PositionPropagator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Notify every element whose rectangle differs from the previous pass.
    ///
    /// Elements absent from `placed` are forgotten, so they are notified
    /// again when they come back. Returns the moved elements in order.
    pub fn propagate(&mut self, placed: &[(ElementRef, Rect)]) -> Vec<ElementId> {
        let mut seen = HashSet::with_capacity(placed.len());
        let mut moved = Vec::new();
        for (element, rect) in placed {
            let id = element.id();
            if !seen.insert(id) {
                continue;
            }
            if self.last.get(&id) != Some(rect) {
                self.last.insert(id, *rect);
                element.positioned(*rect);
                moved.push(id);
            }
        }
        self.last.retain(|id, _| seen.contains(id));
        moved
    }

    pub fn last_position(&self, id: ElementId) -> Option<Rect> {
        self.last.get(&id).copied()
    }

    pub fn clear(&mut self) {
        self.last.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{CellAlignment, CellAttrs, CellPadding, Span};
    use crate::element::{Canvas, Element};

    #[test]
    fn tracks_advance_past_boundaries() {
        let layout = TrackLayout::new(10, vec![20, 30], &[1, 2, 3]);
        assert_eq!(layout.boundary_start(0), 10);
        assert_eq!(layout.track_start(0), 11);
        assert_eq!(layout.boundary_start(1), 31);
        assert_eq!(layout.track_start(1), 33);
        assert_eq!(layout.boundary_start(2), 63);
        assert_eq!(layout.end(), 66);
        assert_eq!(layout.span(0..2), (11, 52));
        assert_eq!(layout.span(1..2), (33, 30));
    }

    #[test]
    fn span_past_end_is_clipped() {
        let layout = TrackLayout::new(0, vec![5, 5], &[]);
        assert_eq!(layout.span(1..9), (5, 5));
        assert_eq!(layout.span(4..5), (10, 0));
    }

    #[test]
    fn alignment_places_preferred_size() {
        let metrics = AxisMetrics::new(2, 4, Some(6));
        assert_eq!(align(0, 10, metrics, Anchor::Start), (0, 4));
        assert_eq!(align(0, 10, metrics, Anchor::Center), (3, 4));
        assert_eq!(align(0, 10, metrics, Anchor::End), (6, 4));
        assert_eq!(align(0, 10, metrics, Anchor::Fill), (0, 10));
        assert_eq!(align(0, 3, metrics, Anchor::Center), (0, 3));
    }

    #[test]
    fn element_rect_removes_padding_then_aligns() {
        let element: ElementRef = Arc::new(Canvas::fixed(4, 2));
        let rect = element_rect(
            Rect::new(0, 0, 20, 10),
            Sides::all(2),
            &element,
            (HAlign::Right, VAlign::Middle),
        );
        assert_eq!(rect, Rect::new(14, 4, 4, 2));
    }

    #[test]
    fn defaults_fill_in_padding_and_alignment() {
        let mut map = GridMap::new();
        map.append_row();
        let attrs = CellAttrs {
            span: Span::new(1, 2),
            padding: CellPadding {
                top: Some(7),
                ..CellPadding::default()
            },
            alignment: CellAlignment {
                halign: None,
                valign: Some(VAlign::Bottom),
            },
            ..CellAttrs::default()
        };
        map.insert(0, 0, CellRecord::new(Arc::new(Canvas::fixed(1, 1)), attrs), false)
            .expect("insert");
        map.col_defaults_mut(0).padding_before = Some(3);
        map.col_defaults_mut(0).halign = Some(HAlign::Center);
        map.col_defaults_mut(1).padding_after = Some(4);
        map.row_defaults_mut(0).padding_after = Some(5);

        let occupancy = map.occupancy();
        let placement = occupancy.placements()[0];
        let cell = map.cell(0, 0).expect("cell");
        assert_eq!(
            resolve_padding(&map, &placement, cell),
            Sides::new(7, 4, 5, 3)
        );
        assert_eq!(
            resolve_alignment(&map, &placement, cell),
            (HAlign::Center, VAlign::Bottom)
        );
    }

    #[test]
    fn propagator_notifies_only_moved_elements() {
        let a = Arc::new(Canvas::fixed(1, 1));
        let b = Arc::new(Canvas::fixed(1, 1));
        let mut propagator = PositionPropagator::new();

        let first = propagator.propagate(&[
            (a.clone() as ElementRef, Rect::new(0, 0, 1, 1)),
            (b.clone() as ElementRef, Rect::new(1, 0, 1, 1)),
        ]);
        assert_eq!(first.len(), 2);

        let second = propagator.propagate(&[
            (a.clone() as ElementRef, Rect::new(0, 0, 1, 1)),
            (b.clone() as ElementRef, Rect::new(2, 0, 1, 1)),
        ]);
        assert_eq!(second, vec![b.id()]);
        assert_eq!(a.notifications(), 1);
        assert_eq!(b.notifications(), 2);
        assert_eq!(b.position(), Some(Rect::new(2, 0, 1, 1)));
    }

    #[test]
    fn propagator_notifies_once_per_pass() {
        let a = Arc::new(Canvas::fixed(1, 1));
        let mut propagator = PositionPropagator::new();
        let moved = propagator.propagate(&[
            (a.clone() as ElementRef, Rect::new(0, 0, 1, 1)),
            (a.clone() as ElementRef, Rect::new(5, 5, 1, 1)),
        ]);
        assert_eq!(moved.len(), 1);
        assert_eq!(a.notifications(), 1);
    }

    #[test]
    fn forgotten_elements_are_renotified() {
        let a = Arc::new(Canvas::fixed(1, 1));
        let mut propagator = PositionPropagator::new();
        let rect = Rect::new(0, 0, 1, 1);
        propagator.propagate(&[(a.clone() as ElementRef, rect)]);
        propagator.propagate(&[]);
        assert_eq!(propagator.last_position(a.id()), None);
        propagator.propagate(&[(a.clone() as ElementRef, rect)]);
        assert_eq!(a.notifications(), 2);
    }
}
