//! Border synthesis.
//!
//! Runs on adjacency alone, before any sizing. For every boundary slot the
//! borders requested by the cells on either side are merged into one stroke;
//! for every grid intersection the four strokes entering it decide what
//! corner to draw.
//!
//! Slots are addressed by boundary and track: vertical boundary `b` (left of
//! column `b`, `0..=cols`) crossed with row `r`, and horizontal boundary `i`
//! (above row `i`, `0..=rows`) crossed with column `c`.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::ops::Range;
use std::sync::Arc;

use bitflags::bitflags;
use lattice_core::geometry::Axis;

use crate::border::BorderHandle;
use crate::cell::{Bordered, CellBorder, Side};
use crate::grid_map::{GridMap, Occupancy, Placement};

/// Merge the strokes requested on the two sides of one boundary slot.
///
/// Equal borders become one; a border on one side only is used as is; when
/// both sides disagree the right/bottom side wins.
pub fn merge_straight(
    before: Option<&BorderHandle>,
    after: Option<&BorderHandle>,
) -> Option<BorderHandle> {
    match (before, after) {
        (Some(before), Some(after)) if before == after => Some(before.clone()),
        (_, Some(after)) => Some(after.clone()),
        (Some(before), None) => Some(before.clone()),
        (None, None) => None,
    }
}

/// Border a placed cell draws on one side.
///
/// The cell's own setting wins; otherwise the default of the row or column
/// boundary on that side, and for the grid's outside edges the outer border.
pub fn effective_border(
    map: &GridMap,
    occupancy: &Occupancy,
    placement: &Placement,
    side: Side,
) -> Option<BorderHandle> {
    let cell = map.cell(placement.logical_row, placement.logical_col)?;
    match cell.cell_border(side) {
        CellBorder::Border(border) => return Some(border.clone()),
        CellBorder::NoBorder => return None,
        CellBorder::Inherit => {}
    }

    let (defaults, boundary, last) = match side {
        Side::Left => (map.col_defaults(placement.col), placement.col, occupancy.cols()),
        Side::Right => (
            map.col_defaults(placement.end_col()),
            placement.end_col(),
            occupancy.cols(),
        ),
        Side::Top => (map.row_defaults(placement.row), placement.row, occupancy.rows()),
        Side::Bottom => (
            map.row_defaults(placement.end_row()),
            placement.end_row(),
            occupancy.rows(),
        ),
    };
    defaults
        .and_then(|defaults| defaults.border.clone())
        .or_else(|| {
            (boundary == 0 || boundary == last)
                .then(|| map.outer_border().cloned())
                .flatten()
        })
}

bitflags! {
    /// Quadrants of a corner an arc is drawn in.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Quadrants: u8 {
        /// Joins the top and left strokes.
        const TOP_LEFT     = 0b0001;
        /// Joins the top and right strokes.
        const TOP_RIGHT    = 0b0010;
        /// Joins the bottom and left strokes.
        const BOTTOM_LEFT  = 0b0100;
        /// Joins the bottom and right strokes.
        const BOTTOM_RIGHT = 0b1000;
    }
}

/// The four strokes entering an intersection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CornerKey {
    pub top: Option<BorderHandle>,
    pub bottom: Option<BorderHandle>,
    pub left: Option<BorderHandle>,
    pub right: Option<BorderHandle>,
}

impl CornerKey {
    pub fn is_empty(&self) -> bool {
        self.top.is_none() && self.bottom.is_none() && self.left.is_none() && self.right.is_none()
    }

    /// A vertical stroke runs straight through with nothing joining it, or
    /// the same for a horizontal stroke.
    pub fn is_pass_through(&self) -> bool {
        let vertical = self.left.is_none()
            && self.right.is_none()
            && self.top.is_some()
            && self.top == self.bottom;
        let horizontal = self.top.is_none()
            && self.bottom.is_none()
            && self.left.is_some()
            && self.left == self.right;
        vertical || horizontal
    }

    fn side(&self, side: Side) -> Option<&BorderHandle> {
        match side {
            Side::Top => self.top.as_ref(),
            Side::Bottom => self.bottom.as_ref(),
            Side::Left => self.left.as_ref(),
            Side::Right => self.right.as_ref(),
        }
    }

    /// FNV-1a over the structural hash of the four strokes.
    pub fn structural_hash(&self) -> u64 {
        let mut hasher = FnvHasher::default();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

/// One arc, possibly covering several quadrants, in one border.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CornerArc {
    pub border: BorderHandle,
    pub quadrants: Quadrants,
}

/// A stroke that meets nothing equal to it; drawn from its side to the
/// corner's centerline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CornerStub {
    pub border: BorderHandle,
    pub side: Side,
}

/// How to draw one intersection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CornerDrawInfo {
    pub arcs: Vec<CornerArc>,
    pub stubs: Vec<CornerStub>,
    /// All four strokes are present and equal.
    pub same_border_everywhere: bool,
}

impl CornerDrawInfo {
    /// Pair equal strokes into arcs and leave the rest as stubs.
    pub fn compute(key: &CornerKey) -> Self {
        const PAIRS: [(Side, Side, Quadrants); 4] = [
            (Side::Top, Side::Left, Quadrants::TOP_LEFT),
            (Side::Top, Side::Right, Quadrants::TOP_RIGHT),
            (Side::Bottom, Side::Left, Quadrants::BOTTOM_LEFT),
            (Side::Bottom, Side::Right, Quadrants::BOTTOM_RIGHT),
        ];

        let mut info = Self::default();
        let mut joined: Vec<Side> = Vec::new();
        for (a, b, quadrant) in PAIRS {
            let (Some(first), Some(second)) = (key.side(a), key.side(b)) else {
                continue;
            };
            if first != second {
                continue;
            }
            match info.arcs.iter_mut().find(|arc| &arc.border == first) {
                Some(arc) => arc.quadrants |= quadrant,
                None => info.arcs.push(CornerArc {
                    border: first.clone(),
                    quadrants: quadrant,
                }),
            }
            for side in [a, b] {
                if !joined.contains(&side) {
                    joined.push(side);
                }
            }
        }

        for side in [Side::Top, Side::Bottom, Side::Left, Side::Right] {
            if joined.contains(&side) {
                continue;
            }
            if let Some(border) = key.side(side) {
                info.stubs.push(CornerStub {
                    border: border.clone(),
                    side,
                });
            }
        }

        info.same_border_everywhere = matches!(
            (&key.top, &key.bottom, &key.left, &key.right),
            (Some(t), Some(b), Some(l), Some(r)) if t == b && t == l && t == r
        );
        info
    }
}

/// 64-bit FNV-1a.
#[derive(Debug, Clone, Copy)]
struct FnvHasher(u64);

impl Default for FnvHasher {
    fn default() -> Self {
        Self(0xcbf2_9ce4_8422_2325)
    }
}

impl Hasher for FnvHasher {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.0 ^= u64::from(byte);
            self.0 = self.0.wrapping_mul(0x0000_0100_0000_01b3);
        }
    }
}

#[derive(Debug)]
struct CornerEntry {
    hash: u64,
    key: CornerKey,
    info: Arc<CornerDrawInfo>,
    pass: u64,
}

/// Per-intersection memo of corner descriptors.
///
/// An entry is reused while the structural hash and the key itself are
/// unchanged. Entries not touched during a pass are dropped when it ends.
#[derive(Debug, Default)]
pub struct CornerCache {
    entries: HashMap<(usize, usize), CornerEntry>,
    pass: u64,
    hits: u64,
    misses: u64,
}

impl CornerCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_pass(&mut self) {
        self.pass += 1;
    }

    /// Drop entries for intersections not seen since [`Self::begin_pass`].
    pub fn end_pass(&mut self) {
        let pass = self.pass;
        self.entries.retain(|_, entry| entry.pass == pass);
    }

    /// Descriptor for the intersection of horizontal boundary `row_boundary`
    /// and vertical boundary `col_boundary`.
    pub fn get(&mut self, row_boundary: usize, col_boundary: usize, key: &CornerKey) -> Arc<CornerDrawInfo> {
        let hash = key.structural_hash();
        let pass = self.pass;
        if let Some(entry) = self.entries.get_mut(&(row_boundary, col_boundary))
            && entry.hash == hash
            && entry.key == *key
        {
            entry.pass = pass;
            self.hits += 1;
            return Arc::clone(&entry.info);
        }

        self.misses += 1;
        lattice_core::trace!(row_boundary, col_boundary, "corner recomputed");
        let info = Arc::new(CornerDrawInfo::compute(key));
        self.entries.insert(
            (row_boundary, col_boundary),
            CornerEntry {
                hash,
                key: key.clone(),
                info: Arc::clone(&info),
                pass,
            },
        );
        info
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// A coalesced straight stroke along one boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StraightBorder {
    /// `Vertical` strokes sit on a column boundary and run along rows.
    pub orientation: Axis,
    pub boundary: usize,
    /// Tracks crossed (rows for vertical strokes, columns for horizontal).
    pub tracks: Range<usize>,
    pub border: BorderHandle,
}

/// A drawn intersection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Corner {
    pub row_boundary: usize,
    pub col_boundary: usize,
    pub info: Arc<CornerDrawInfo>,
}

/// Every stroke and corner of a grid, plus boundary footprints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BorderPlan {
    rows: usize,
    cols: usize,
    vertical: Vec<Option<BorderHandle>>,
    horizontal: Vec<Option<BorderHandle>>,
    col_boundaries: Vec<u32>,
    row_boundaries: Vec<u32>,
    straight: Vec<StraightBorder>,
    corners: Vec<Corner>,
}

impl BorderPlan {
    pub fn synthesize(map: &GridMap, occupancy: &Occupancy, cache: &mut CornerCache) -> Self {
        let rows = occupancy.rows();
        let cols = occupancy.cols();
        let placements = occupancy.placements();
        let side_of = |index: Option<usize>, side: Side| {
            index.and_then(|i| effective_border(map, occupancy, &placements[i], side))
        };

        let mut vertical = Vec::with_capacity((cols + 1) * rows);
        for b in 0..=cols {
            for r in 0..rows {
                let left = b.checked_sub(1).and_then(|c| occupancy.occupant(r, c));
                let right = occupancy.occupant(r, b);
                let stroke = if left.is_some() && left == right {
                    None
                } else {
                    merge_straight(
                        side_of(left, Side::Right).as_ref(),
                        side_of(right, Side::Left).as_ref(),
                    )
                };
                vertical.push(stroke);
            }
        }

        let mut horizontal = Vec::with_capacity((rows + 1) * cols);
        for i in 0..=rows {
            for c in 0..cols {
                let above = i.checked_sub(1).and_then(|r| occupancy.occupant(r, c));
                let below = occupancy.occupant(i, c);
                let stroke = if above.is_some() && above == below {
                    None
                } else {
                    merge_straight(
                        side_of(above, Side::Bottom).as_ref(),
                        side_of(below, Side::Top).as_ref(),
                    )
                };
                horizontal.push(stroke);
            }
        }

        let col_boundaries = (0..=cols)
            .map(|b| {
                vertical[b * rows..(b + 1) * rows]
                    .iter()
                    .flatten()
                    .map(|border| border.calc_width())
                    .max()
                    .unwrap_or(0)
            })
            .collect();
        let row_boundaries = (0..=rows)
            .map(|i| {
                horizontal[i * cols..(i + 1) * cols]
                    .iter()
                    .flatten()
                    .map(|border| border.calc_height())
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut plan = Self {
            rows,
            cols,
            vertical,
            horizontal,
            col_boundaries,
            row_boundaries,
            straight: Vec::new(),
            corners: Vec::new(),
        };

        cache.begin_pass();
        for i in 0..=rows {
            for b in 0..=cols {
                let key = plan.corner_key(i, b);
                if key.is_empty() || key.is_pass_through() {
                    continue;
                }
                plan.corners.push(Corner {
                    row_boundary: i,
                    col_boundary: b,
                    info: cache.get(i, b, &key),
                });
            }
        }
        cache.end_pass();

        plan.straight = plan.coalesce();
        lattice_core::debug!(
            rows,
            cols,
            straight = plan.straight.len(),
            corners = plan.corners.len(),
            "borders synthesized"
        );
        plan
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Stroke on vertical boundary `b` beside row `r`.
    pub fn vertical_segment(&self, b: usize, r: usize) -> Option<&BorderHandle> {
        if b > self.cols || r >= self.rows {
            return None;
        }
        self.vertical[b * self.rows + r].as_ref()
    }

    /// Stroke on horizontal boundary `i` above column `c`.
    pub fn horizontal_segment(&self, i: usize, c: usize) -> Option<&BorderHandle> {
        if i > self.rows || c >= self.cols {
            return None;
        }
        self.horizontal[i * self.cols + c].as_ref()
    }

    /// Strokes entering intersection `(i, b)`.
    pub fn corner_key(&self, i: usize, b: usize) -> CornerKey {
        CornerKey {
            top: i
                .checked_sub(1)
                .and_then(|r| self.vertical_segment(b, r))
                .cloned(),
            bottom: self.vertical_segment(b, i).cloned(),
            left: b
                .checked_sub(1)
                .and_then(|c| self.horizontal_segment(i, c))
                .cloned(),
            right: self.horizontal_segment(i, b).cloned(),
        }
    }

    /// Width of each vertical boundary: its widest stroke.
    pub fn col_boundaries(&self) -> &[u32] {
        &self.col_boundaries
    }

    /// Height of each horizontal boundary: its tallest stroke.
    pub fn row_boundaries(&self) -> &[u32] {
        &self.row_boundaries
    }

    pub fn straight_borders(&self) -> &[StraightBorder] {
        &self.straight
    }

    pub fn corners(&self) -> &[Corner] {
        &self.corners
    }

    /// Join consecutive equal segments whose shared intersection is a
    /// pass-through.
    fn coalesce(&self) -> Vec<StraightBorder> {
        let mut runs = Vec::new();

        for b in 0..=self.cols {
            let mut run: Option<StraightBorder> = None;
            for r in 0..self.rows {
                let segment = self.vertical_segment(b, r);
                if let Some(current) = run.as_mut()
                    && segment == Some(&current.border)
                    && self.corner_key(r, b).is_pass_through()
                {
                    current.tracks.end = r + 1;
                    continue;
                }
                runs.extend(run.take());
                run = segment.map(|border| StraightBorder {
                    orientation: Axis::Vertical,
                    boundary: b,
                    tracks: r..r + 1,
                    border: border.clone(),
                });
            }
            runs.extend(run);
        }

        for i in 0..=self.rows {
            let mut run: Option<StraightBorder> = None;
            for c in 0..self.cols {
                let segment = self.horizontal_segment(i, c);
                if let Some(current) = run.as_mut()
                    && segment == Some(&current.border)
                    && self.corner_key(i, c).is_pass_through()
                {
                    current.tracks.end = c + 1;
                    continue;
                }
                runs.extend(run.take());
                run = segment.map(|border| StraightBorder {
                    orientation: Axis::Horizontal,
                    boundary: i,
                    tracks: c..c + 1,
                    border: border.clone(),
                });
            }
            runs.extend(run);
        }
        runs
    }
}
