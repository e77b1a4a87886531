//! The authoritative cell store.
//!
//! Rows hold cells in logical order; the position of a cell within its row is
//! its *logical* column. Only a cell's top-left corner is stored. The
//! *geometric* column is found the way an HTML table does it: walk the row
//! and skip slots already covered by spans from earlier cells. That placement
//! pass lives in [`GridMap::occupancy`].
//!
//! Every mutator marks the map modified and drops the element lookup table;
//! the table is rebuilt on the next [`GridMap::lookup`].

use std::cell::OnceCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::border::{BorderError, BorderHandle};
use crate::cell::{CellRecord, HAlign, Span, Spannable, VAlign};
use crate::element::{ElementId, ElementRef};

/// Defaults shared by every cell in one row or one column.
///
/// For a column, `border` is drawn on its left edge and the padding is
/// left/right; for a row, `border` is drawn on its top edge and the padding
/// is top/bottom. Index `n` (one past the last track) carries the far edge.
/// Row defaults move with their row when rows are inserted, removed or
/// resorted; the far-edge entry stays at the end.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AxisDefaults {
    pub border: Option<BorderHandle>,
    /// Advisory share (0–100) of any surplus space.
    pub percentage: Option<u8>,
    pub halign: Option<HAlign>,
    pub valign: Option<VAlign>,
    pub padding_before: Option<u32>,
    pub padding_after: Option<u32>,
}

/// Where a stored cell landed in the geometric grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub logical_row: usize,
    pub logical_col: usize,
    pub row: usize,
    pub col: usize,
    /// Span after clamping to the grid and to earlier cells.
    pub span: Span,
}

impl Placement {
    pub const fn end_row(&self) -> usize {
        self.row + self.span.rows()
    }

    pub const fn end_col(&self) -> usize {
        self.col + self.span.cols()
    }
}

/// Geometric view of the map: which placement covers each slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Occupancy {
    rows: usize,
    cols: usize,
    placements: Vec<Placement>,
    slots: Vec<Option<usize>>,
}

impl Occupancy {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    /// Index into [`Occupancy::placements`] of the cell covering a slot.
    pub fn occupant(&self, row: usize, col: usize) -> Option<usize> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.slots[row * self.cols + col]
    }
}

/// Row-major cell storage with per-row and per-column defaults.
#[derive(Debug, Default)]
pub struct GridMap {
    rows: Vec<Vec<CellRecord>>,
    row_defaults: BTreeMap<usize, AxisDefaults>,
    col_defaults: BTreeMap<usize, AxisDefaults>,
    outer_border: Option<BorderHandle>,
    lookup: OnceCell<HashMap<ElementId, (usize, usize)>>,
    modified: bool,
}

impl GridMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // --- Queries -------------------------------------------------------------

    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    /// Cells whose top-left corner is in `row`; 0 for a row that does not exist.
    pub fn cols(&self, row: usize) -> usize {
        self.rows.get(row).map_or(0, Vec::len)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&ElementRef> {
        self.cell(row, col).map(CellRecord::element)
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&CellRecord> {
        self.rows.get(row).and_then(|cells| cells.get(col))
    }

    /// Logical position of an element.
    pub fn lookup(&self, id: ElementId) -> Option<(usize, usize)> {
        self.lookup
            .get_or_init(|| {
                self.cells()
                    .map(|(pos, cell)| (cell.element_id(), pos))
                    .collect()
            })
            .get(&id)
            .copied()
    }

    /// All cells with their logical positions, row by row.
    pub fn cells(&self) -> impl Iterator<Item = ((usize, usize), &CellRecord)> + '_ {
        self.rows.iter().enumerate().flat_map(|(r, cells)| {
            cells
                .iter()
                .enumerate()
                .map(move |(c, cell)| ((r, c), cell))
        })
    }

    pub fn row_defaults(&self, row: usize) -> Option<&AxisDefaults> {
        self.row_defaults.get(&row)
    }

    pub fn col_defaults(&self, col: usize) -> Option<&AxisDefaults> {
        self.col_defaults.get(&col)
    }

    /// Border used on the grid's outside edges when no row/column default
    /// covers them.
    pub fn outer_border(&self) -> Option<&BorderHandle> {
        self.outer_border.as_ref()
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    // --- Mutators ------------------------------------------------------------

    pub fn mark_modified(&mut self) {
        self.modified = true;
        self.lookup.take();
    }

    pub(crate) fn clear_modified(&mut self) {
        self.modified = false;
    }

    /// Append an empty row and return its index.
    pub fn append_row(&mut self) -> usize {
        self.mark_modified();
        self.rows.push(Vec::new());
        self.rows.len() - 1
    }

    /// Insert an empty row before `row` (`row == rows()` appends).
    pub fn insert_row(&mut self, row: usize) -> Result<(), GridError> {
        if row > self.rows.len() {
            return Err(GridError::RowDoesNotExist { row });
        }
        self.mark_modified();
        self.rows.insert(row, Vec::new());
        shift_keys(&mut self.row_defaults, row, 1);
        Ok(())
    }

    /// Remove every cell from `row`, keeping the row itself.
    pub fn clear_row(&mut self, row: usize) -> Result<Vec<CellRecord>, GridError> {
        let cells = self
            .rows
            .get_mut(row)
            .ok_or(GridError::RowDoesNotExist { row })?;
        let removed = std::mem::take(cells);
        self.mark_modified();
        Ok(removed)
    }

    pub fn remove_row(&mut self, row: usize) -> Result<Vec<CellRecord>, GridError> {
        if row >= self.rows.len() {
            return Err(GridError::RowDoesNotExist { row });
        }
        self.mark_modified();
        drop_keys(&mut self.row_defaults, row, 1);
        Ok(self.rows.remove(row))
    }

    /// Remove `count` rows starting at `row`; higher rows shift down.
    pub fn remove_rows(&mut self, row: usize, count: usize) -> Result<(), GridError> {
        let end = row.saturating_add(count);
        if end > self.rows.len() {
            return Err(GridError::RowDoesNotExist {
                row: end.saturating_sub(1).max(row),
            });
        }
        if count > 0 {
            self.mark_modified();
            self.rows.drain(row..end);
            drop_keys(&mut self.row_defaults, row, count);
        }
        Ok(())
    }

    pub fn remove_all_rows(&mut self) {
        self.mark_modified();
        self.rows.clear();
    }

    /// Place a cell at `(row, col)`.
    ///
    /// `col == cols(row)` appends. An occupied position is an error unless
    /// `replace_existing` is set, in which case the previous cell is returned.
    pub fn insert(
        &mut self,
        row: usize,
        col: usize,
        cell: CellRecord,
        replace_existing: bool,
    ) -> Result<Option<CellRecord>, GridError> {
        let cells = self
            .rows
            .get_mut(row)
            .ok_or(GridError::RowDoesNotExist { row })?;
        let previous = match col.cmp(&cells.len()) {
            std::cmp::Ordering::Less if replace_existing => {
                Some(std::mem::replace(&mut cells[col], cell))
            }
            std::cmp::Ordering::Less => return Err(GridError::CellOccupied { row, col }),
            std::cmp::Ordering::Equal => {
                cells.push(cell);
                None
            }
            std::cmp::Ordering::Greater => return Err(GridError::ColumnDoesNotExist { row, col }),
        };
        self.mark_modified();
        Ok(previous)
    }

    /// Insert a cell before logical column `col`, shifting later cells right.
    pub fn insert_shifting(
        &mut self,
        row: usize,
        col: usize,
        cell: CellRecord,
    ) -> Result<(), GridError> {
        let cells = self
            .rows
            .get_mut(row)
            .ok_or(GridError::RowDoesNotExist { row })?;
        if col > cells.len() {
            return Err(GridError::ColumnDoesNotExist { row, col });
        }
        cells.insert(col, cell);
        self.mark_modified();
        Ok(())
    }

    /// Remove `count` consecutive cells from `row` starting at `col`.
    pub fn remove(
        &mut self,
        row: usize,
        col: usize,
        count: usize,
    ) -> Result<Vec<CellRecord>, GridError> {
        let cells = self
            .rows
            .get_mut(row)
            .ok_or(GridError::RowDoesNotExist { row })?;
        let end = col.saturating_add(count);
        if end > cells.len() {
            return Err(GridError::ColumnDoesNotExist {
                row,
                col: end.saturating_sub(1).max(col),
            });
        }
        let removed: Vec<CellRecord> = cells.drain(col..end).collect();
        self.mark_modified();
        Ok(removed)
    }

    /// Mutable access to a cell's attributes; marks the map modified.
    pub fn cell_mut(&mut self, row: usize, col: usize) -> Result<&mut CellRecord, GridError> {
        if row >= self.rows.len() {
            return Err(GridError::RowDoesNotExist { row });
        }
        if col >= self.rows[row].len() {
            return Err(GridError::ColumnDoesNotExist { row, col });
        }
        self.mark_modified();
        Ok(&mut self.rows[row][col])
    }

    /// Reorder rows: new row `i` is old row `permutation[i]`.
    ///
    /// The permutation must be a bijection on `0..rows()`.
    pub fn resort_rows(&mut self, permutation: &[usize]) -> Result<(), GridError> {
        let rows = self.rows.len();
        if permutation.len() != rows {
            return Err(GridError::PermutationLength {
                len: permutation.len(),
                rows,
            });
        }
        let mut seen = vec![false; rows];
        for &index in permutation {
            if index >= rows {
                return Err(GridError::PermutationIndex { index, rows });
            }
            if std::mem::replace(&mut seen[index], true) {
                return Err(GridError::PermutationDuplicate { index });
            }
        }

        let mut old: Vec<Option<Vec<CellRecord>>> =
            std::mem::take(&mut self.rows).into_iter().map(Some).collect();
        self.rows = permutation
            .iter()
            .map(|&index| old[index].take().unwrap_or_default())
            .collect();
        let mut defaults = std::mem::take(&mut self.row_defaults);
        for (new, &index) in permutation.iter().enumerate() {
            if let Some(record) = defaults.remove(&index) {
                self.row_defaults.insert(new, record);
            }
        }
        // The far edge stays put.
        self.row_defaults.append(&mut defaults);
        self.mark_modified();
        Ok(())
    }

    pub fn row_defaults_mut(&mut self, row: usize) -> &mut AxisDefaults {
        self.mark_modified();
        self.row_defaults.entry(row).or_default()
    }

    pub fn col_defaults_mut(&mut self, col: usize) -> &mut AxisDefaults {
        self.mark_modified();
        self.col_defaults.entry(col).or_default()
    }

    pub fn set_outer_border(&mut self, border: Option<BorderHandle>) {
        self.mark_modified();
        self.outer_border = border;
    }

    /// Drop every row and column default, including the outer border.
    pub fn remove_all_defaults(&mut self) {
        self.mark_modified();
        self.row_defaults.clear();
        self.col_defaults.clear();
        self.outer_border = None;
    }

    // --- Placement -----------------------------------------------------------

    /// Compute geometric placements.
    ///
    /// Cells excluded while hidden take no slots. A row span running past the
    /// last row, or a span that would overlap an earlier cell, is truncated.
    pub fn occupancy(&self) -> Occupancy {
        let nrows = self.rows.len();
        let mut grid: Vec<Vec<Option<usize>>> = vec![Vec::new(); nrows];
        let mut placements = Vec::new();

        let taken = |grid: &Vec<Vec<Option<usize>>>, r: usize, c: usize| {
            grid[r].get(c).is_some_and(Option::is_some)
        };

        for (r, cells) in self.rows.iter().enumerate() {
            let mut c = 0;
            for (logical_col, cell) in cells.iter().enumerate() {
                if cell.is_excluded() {
                    continue;
                }
                while taken(&grid, r, c) {
                    c += 1;
                }

                let wanted = cell.span();
                let mut cols = 1;
                while cols < wanted.cols() && !taken(&grid, r, c + cols) {
                    cols += 1;
                }
                let mut rows = 1;
                while rows < wanted.rows()
                    && r + rows < nrows
                    && (c..c + cols).all(|cc| !taken(&grid, r + rows, cc))
                {
                    rows += 1;
                }

                let index = placements.len();
                for row_slots in grid.iter_mut().skip(r).take(rows) {
                    if row_slots.len() < c + cols {
                        row_slots.resize(c + cols, None);
                    }
                    for slot in &mut row_slots[c..c + cols] {
                        *slot = Some(index);
                    }
                }
                placements.push(Placement {
                    logical_row: r,
                    logical_col,
                    row: r,
                    col: c,
                    span: Span::new(rows, cols),
                });
                c += cols;
            }
        }

        let ncols = grid.iter().map(Vec::len).max().unwrap_or(0);
        let mut slots = Vec::with_capacity(nrows * ncols);
        for row_slots in &grid {
            slots.extend(row_slots.iter().copied());
            slots.extend(std::iter::repeat_n(None, ncols - row_slots.len()));
        }

        Occupancy {
            rows: nrows,
            cols: ncols,
            placements,
            slots,
        }
    }
}

/// Grid structure errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    RowDoesNotExist { row: usize },
    ColumnDoesNotExist { row: usize, col: usize },
    CellOccupied { row: usize, col: usize },
    PermutationLength { len: usize, rows: usize },
    PermutationIndex { index: usize, rows: usize },
    PermutationDuplicate { index: usize },
    Border(BorderError),
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RowDoesNotExist { row } => write!(f, "row #{row} does not exist"),
            Self::ColumnDoesNotExist { row, col } => {
                write!(f, "column #{col} in row #{row} does not exist")
            }
            Self::CellOccupied { row, col } => {
                write!(f, "cell #{col} in row #{row} is already occupied")
            }
            Self::PermutationLength { len, rows } => write!(
                f,
                "row permutation has {len} entries, grid has {rows} rows"
            ),
            Self::PermutationIndex { index, rows } => write!(
                f,
                "row permutation references row #{index}, grid has {rows} rows"
            ),
            Self::PermutationDuplicate { index } => {
                write!(f, "row permutation references row #{index} twice")
            }
            Self::Border(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for GridError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Border(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BorderError> for GridError {
    fn from(err: BorderError) -> Self {
        Self::Border(err)
    }
}

/// Move every key at or after `from` up by `by`.
fn shift_keys(map: &mut BTreeMap<usize, AxisDefaults>, from: usize, by: usize) {
    let moved = map.split_off(&from);
    map.extend(moved.into_iter().map(|(key, value)| (key + by, value)));
}

/// Drop keys `from..from + count` and close the gap.
fn drop_keys(map: &mut BTreeMap<usize, AxisDefaults>, from: usize, count: usize) {
    let mut tail = map.split_off(&from);
    let after = tail.split_off(&from.saturating_add(count));
    map.extend(after.into_iter().map(|(key, value)| (key - count, value)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellAttrs;
    use crate::element::Canvas;
    use std::sync::Arc;

    fn cell() -> CellRecord {
        CellRecord::new(Arc::new(Canvas::fixed(1, 1)), CellAttrs::default())
    }

    fn spanning(rows: usize, cols: usize) -> CellRecord {
        CellRecord::new(
            Arc::new(Canvas::fixed(1, 1)),
            CellAttrs {
                span: Span::new(rows, cols),
                ..CellAttrs::default()
            },
        )
    }

    fn map_with(shape: &[usize]) -> GridMap {
        let mut map = GridMap::new();
        for &cols in shape {
            let row = map.append_row();
            for col in 0..cols {
                map.insert(row, col, cell(), false).expect("append");
            }
        }
        map
    }

    #[test]
    fn rows_and_cols_track_structure() {
        let map = map_with(&[2, 3, 0]);
        assert_eq!(map.rows(), 3);
        assert_eq!(map.cols(0), 2);
        assert_eq!(map.cols(1), 3);
        assert_eq!(map.cols(2), 0);
        assert_eq!(map.cols(7), 0);
    }

    #[test]
    fn insert_into_occupied_slot_requires_replace() {
        let mut map = map_with(&[1]);
        let err = map.insert(0, 0, cell(), false).expect_err("occupied");
        assert_eq!(err, GridError::CellOccupied { row: 0, col: 0 });

        let replacement = cell();
        let id = replacement.element_id();
        let previous = map.insert(0, 0, replacement, true).expect("replace");
        assert!(previous.is_some());
        assert_eq!(map.get(0, 0).map(|e| e.id()), Some(id));
    }

    #[test]
    fn insert_past_end_is_an_error() {
        let mut map = map_with(&[1]);
        assert_eq!(
            map.insert(0, 2, cell(), false).map(|prev| prev.is_some()),
            Err(GridError::ColumnDoesNotExist { row: 0, col: 2 })
        );
        assert_eq!(
            map.insert(4, 0, cell(), false).map(|prev| prev.is_some()),
            Err(GridError::RowDoesNotExist { row: 4 })
        );
    }

    #[test]
    fn remove_shifts_cells_left() {
        let mut map = map_with(&[4]);
        let last = map.get(0, 3).map(|e| e.id());
        let removed = map.remove(0, 1, 2).expect("remove");
        assert_eq!(removed.len(), 2);
        assert_eq!(map.cols(0), 2);
        assert_eq!(map.get(0, 1).map(|e| e.id()), last);
        assert!(map.remove(0, 1, 5).is_err());
    }

    #[test]
    fn remove_row_shifts_rows_up() {
        let mut map = map_with(&[1, 1, 2]);
        let moved = map.get(2, 1).map(|e| e.id());
        map.remove_row(1).expect("remove");
        assert_eq!(map.rows(), 2);
        assert_eq!(map.get(1, 1).map(|e| e.id()), moved);
        assert_eq!(
            map.remove_row(5).map(|_| ()),
            Err(GridError::RowDoesNotExist { row: 5 })
        );
    }

    #[test]
    fn remove_rows_range() {
        let mut map = map_with(&[1, 2, 3, 4]);
        map.remove_rows(1, 2).expect("remove");
        assert_eq!(map.rows(), 2);
        assert_eq!(map.cols(1), 4);
        assert!(map.remove_rows(1, 3).is_err());
        map.remove_all_rows();
        assert_eq!(map.rows(), 0);
    }

    fn percentages(map: &GridMap, rows: usize) -> Vec<Option<u8>> {
        (0..=rows)
            .map(|row| map.row_defaults(row).and_then(|d| d.percentage))
            .collect()
    }

    #[test]
    fn row_defaults_follow_inserted_and_removed_rows() {
        let mut map = map_with(&[1, 1, 1]);
        map.row_defaults_mut(1).percentage = Some(10);
        map.row_defaults_mut(2).percentage = Some(20);
        map.row_defaults_mut(3).percentage = Some(30);

        map.insert_row(1).expect("insert");
        assert_eq!(percentages(&map, 4), vec![None, None, Some(10), Some(20), Some(30)]);

        map.remove_row(2).expect("remove");
        assert_eq!(percentages(&map, 3), vec![None, None, Some(20), Some(30)]);

        map.remove_rows(0, 2).expect("remove");
        assert_eq!(percentages(&map, 1), vec![Some(20), Some(30)]);
    }

    #[test]
    fn row_defaults_follow_resort() {
        let mut map = map_with(&[1, 1, 1]);
        map.row_defaults_mut(0).percentage = Some(10);
        map.row_defaults_mut(2).percentage = Some(20);
        map.row_defaults_mut(3).percentage = Some(99);

        map.resort_rows(&[2, 0, 1]).expect("valid permutation");
        assert_eq!(percentages(&map, 3), vec![Some(20), Some(10), None, Some(99)]);

        assert!(map.resort_rows(&[0, 0, 1]).is_err());
        assert_eq!(percentages(&map, 3), vec![Some(20), Some(10), None, Some(99)]);
    }

    #[test]
    fn lookup_is_rebuilt_after_mutation() {
        let mut map = map_with(&[2]);
        let id = map.get(0, 1).map(|e| e.id()).expect("cell");
        assert_eq!(map.lookup(id), Some((0, 1)));
        map.insert_row(0).expect("insert row");
        assert_eq!(map.lookup(id), Some((1, 1)));
        map.remove(1, 0, 1).expect("remove");
        assert_eq!(map.lookup(id), Some((1, 0)));
    }

    #[test]
    fn mutators_mark_modified() {
        let mut map = GridMap::new();
        assert!(!map.is_modified());
        map.append_row();
        assert!(map.is_modified());
        map.clear_modified();
        map.col_defaults_mut(0).percentage = Some(50);
        assert!(map.is_modified());
    }

    #[test]
    fn resort_rows_applies_permutation() {
        let mut map = map_with(&[1, 2, 3]);
        map.resort_rows(&[2, 0, 1]).expect("valid permutation");
        assert_eq!(map.cols(0), 3);
        assert_eq!(map.cols(1), 1);
        assert_eq!(map.cols(2), 2);
    }

    #[test]
    fn resort_rows_rejects_non_bijections() {
        let mut map = map_with(&[1, 2, 3]);
        assert_eq!(
            map.resort_rows(&[0, 1]),
            Err(GridError::PermutationLength { len: 2, rows: 3 })
        );
        assert_eq!(
            map.resort_rows(&[0, 1, 3]),
            Err(GridError::PermutationIndex { index: 3, rows: 3 })
        );
        assert_eq!(
            map.resort_rows(&[0, 1, 1]),
            Err(GridError::PermutationDuplicate { index: 1 })
        );
        assert_eq!(map.cols(2), 3);
    }

    #[test]
    fn occupancy_skips_slots_covered_by_row_spans() {
        // Row 0: A spans two rows, then B. Row 1: C lands in column 1.
        let mut map = GridMap::new();
        map.append_row();
        map.append_row();
        map.insert(0, 0, spanning(2, 1), false).expect("A");
        map.insert(0, 1, cell(), false).expect("B");
        map.insert(1, 0, cell(), false).expect("C");

        let occ = map.occupancy();
        assert_eq!(occ.rows(), 2);
        assert_eq!(occ.cols(), 2);
        let c = occ.placements()[2];
        assert_eq!((c.row, c.col), (1, 1));
        assert_eq!(occ.occupant(1, 0), Some(0));
    }

    #[test]
    fn occupancy_truncates_spans() {
        let mut map = GridMap::new();
        map.append_row();
        map.insert(0, 0, spanning(3, 2), false).expect("A");
        let occ = map.occupancy();
        assert_eq!(occ.placements()[0].span, Span::new(1, 2));
        assert_eq!(occ.cols(), 2);
    }

    #[test]
    fn occupancy_excludes_hidden_cells() {
        let hidden = Arc::new(Canvas::fixed(1, 1));
        let mut map = GridMap::new();
        map.append_row();
        map.insert(
            0,
            0,
            CellRecord::new(
                hidden.clone(),
                CellAttrs {
                    remove_when_hidden: true,
                    ..CellAttrs::default()
                },
            ),
            false,
        )
        .expect("hidden");
        map.insert(0, 1, cell(), false).expect("visible");

        hidden.set_visible(false);
        let occ = map.occupancy();
        assert_eq!(occ.placements().len(), 1);
        assert_eq!(occ.placements()[0].logical_col, 1);
        assert_eq!(occ.placements()[0].col, 0);
        assert_eq!(map.cols(0), 2);
    }

    #[test]
    fn errors_name_the_index() {
        assert_eq!(
            GridError::RowDoesNotExist { row: 3 }.to_string(),
            "row #3 does not exist"
        );
        assert_eq!(
            GridError::ColumnDoesNotExist { row: 1, col: 4 }.to_string(),
            "column #4 in row #1 does not exist"
        );
    }
}
