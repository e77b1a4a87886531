//! The grid layout manager: one lock around the cell store, factories for
//! adding cells, and the recalculation pass.
//!
//! All access goes through [`GridLayoutManager::lock`]. The returned
//! [`GridLock`] is the lock token: every operation on the grid is a method on
//! it, so nothing re-acquires the mutex while it is held. When the token is
//! dropped after a mutation, the grid is recalculated (unless disabled with
//! [`GridConfig::recalculate_on_unlock`]).
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use lattice_core::geometry::Rect;
//! use lattice_layout::{Canvas, GridLayoutManager};
//!
//! let grid = GridLayoutManager::new();
//! let label = Arc::new(Canvas::fixed(40, 10));
//! let input = Arc::new(Canvas::fixed(60, 10));
//! {
//!     let mut lock = grid.lock();
//!     lock.append_row()
//!         .create(label.clone())?
//!         .create(input.clone())?;
//! }
//! let report = grid.set_container(Rect::new(5, 5, 100, 10));
//! assert_eq!(input.position(), Some(Rect::new(45, 5, 60, 10)));
//! assert!(report.moved_any());
//! # Ok::<(), lattice_layout::GridError>(())
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lattice_core::geometry::{Axis, Rect};

use crate::border::{BorderCatalog, BorderSource};
use crate::cell::{CellAttrs, CellBorder, CellPadding, CellRecord, HAlign, Side, Span, VAlign};
use crate::element::{ElementId, ElementRef, IntoElementRef};
use crate::grid_map::{GridError, GridMap, Occupancy};
use crate::metrics::AxisMetrics;
use crate::position::{
    BorderElement, PositionPropagator, TrackLayout, border_elements, cell_rect, element_rect,
    resolve_alignment, resolve_padding,
};
use crate::resolver::{CellExtent, ResolvedAxis};
use crate::synthesis::{BorderPlan, CornerCache};

/// Grid behavior switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridConfig {
    /// Recalculate when a [`GridLock`] that modified the grid is dropped.
    pub recalculate_on_unlock: bool,
    /// Border for the grid's outside edges.
    pub outer_border: BorderSource,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            recalculate_on_unlock: true,
            outer_border: BorderSource::None,
        }
    }
}

impl GridConfig {
    #[must_use]
    pub fn recalculate_on_unlock(mut self, enabled: bool) -> Self {
        self.recalculate_on_unlock = enabled;
        self
    }

    #[must_use]
    pub fn outer_border(mut self, border: impl Into<BorderSource>) -> Self {
        self.outer_border = border.into();
        self
    }
}

/// Result of one recalculation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutReport {
    pub container: Rect,
    pub columns: ResolvedAxis,
    pub rows: ResolvedAxis,
    pub column_sizes: Vec<u32>,
    pub row_sizes: Vec<u32>,
    /// Every positioned element, in placement order.
    pub elements: Vec<(ElementId, Rect)>,
    pub borders: Vec<BorderElement>,
    /// Elements notified during this pass.
    pub moved: Vec<ElementId>,
    /// Aggregate (horizontal, vertical) requirements.
    pub metrics: (AxisMetrics, AxisMetrics),
    /// Whether the aggregate requirements differ from the previous pass.
    pub metrics_changed: bool,
}

impl LayoutReport {
    pub fn moved_any(&self) -> bool {
        !self.moved.is_empty()
    }

    pub fn rect_of(&self, id: ElementId) -> Option<Rect> {
        self.elements
            .iter()
            .find(|(element, _)| *element == id)
            .map(|(_, rect)| *rect)
    }
}

/// Track requirements of both axes, before any positioning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedGrid {
    pub columns: ResolvedAxis,
    pub rows: ResolvedAxis,
}

#[derive(Debug, Default)]
struct GridState {
    map: GridMap,
    corners: CornerCache,
    propagator: PositionPropagator,
    container: Rect,
    forced_columns: Option<Vec<u32>>,
    forced_rows: Option<Vec<u32>>,
    last_metrics: Option<(AxisMetrics, AxisMetrics)>,
    last_report: Option<LayoutReport>,
}

struct Resolution {
    occupancy: Occupancy,
    plan: BorderPlan,
    grid: ResolvedGrid,
}

impl GridState {
    fn resolve(&mut self) -> Resolution {
        let occupancy = self.map.occupancy();
        let plan = BorderPlan::synthesize(&self.map, &occupancy, &mut self.corners);

        let mut column_cells = Vec::with_capacity(occupancy.placements().len());
        let mut row_cells = Vec::with_capacity(occupancy.placements().len());
        for placement in occupancy.placements() {
            let Some(cell) = self.map.cell(placement.logical_row, placement.logical_col) else {
                continue;
            };
            let padding = resolve_padding(&self.map, placement, cell);
            let element = cell.element();
            column_cells.push(CellExtent::new(
                placement.col,
                placement.span.cols(),
                element
                    .metrics(Axis::Horizontal)
                    .grow(padding.horizontal_sum()),
            ));
            row_cells.push(CellExtent::new(
                placement.row,
                placement.span.rows(),
                element.metrics(Axis::Vertical).grow(padding.vertical_sum()),
            ));
        }

        let column_percentages = (0..occupancy.cols())
            .map(|c| self.map.col_defaults(c).and_then(|d| d.percentage))
            .collect();
        let row_percentages = (0..occupancy.rows())
            .map(|r| self.map.row_defaults(r).and_then(|d| d.percentage))
            .collect();

        let grid = ResolvedGrid {
            columns: ResolvedAxis::resolve(
                occupancy.cols(),
                &column_cells,
                plan.col_boundaries().to_vec(),
                column_percentages,
            ),
            rows: ResolvedAxis::resolve(
                occupancy.rows(),
                &row_cells,
                plan.row_boundaries().to_vec(),
                row_percentages,
            ),
        };
        Resolution {
            occupancy,
            plan,
            grid,
        }
    }

    fn recalculate(&mut self) -> LayoutReport {
        let _span = lattice_core::debug_span!(
            "grid_recalculate",
            rows = self.map.rows(),
            width = self.container.width,
            height = self.container.height
        )
        .entered();

        let Resolution {
            occupancy,
            plan,
            grid,
        } = self.resolve();

        let matching = |forced: &Option<Vec<u32>>, count: usize| {
            forced.as_ref().filter(|sizes| sizes.len() == count).cloned()
        };
        let column_sizes = matching(&self.forced_columns, grid.columns.track_count())
            .unwrap_or_else(|| grid.columns.sizes_for(self.container.width));
        let row_sizes = matching(&self.forced_rows, grid.rows.track_count())
            .unwrap_or_else(|| grid.rows.sizes_for(self.container.height));

        let columns = TrackLayout::new(self.container.x, column_sizes.clone(), grid.columns.boundaries());
        let rows = TrackLayout::new(self.container.y, row_sizes.clone(), grid.rows.boundaries());

        let mut placed: Vec<(ElementRef, Rect)> = Vec::with_capacity(occupancy.placements().len());
        for placement in occupancy.placements() {
            let Some(cell) = self.map.cell(placement.logical_row, placement.logical_col) else {
                continue;
            };
            let rect = element_rect(
                cell_rect(&columns, &rows, placement),
                resolve_padding(&self.map, placement, cell),
                cell.element(),
                resolve_alignment(&self.map, placement, cell),
            );
            placed.push((Arc::clone(cell.element()), rect));
        }

        let borders = border_elements(&columns, &rows, plan.straight_borders(), plan.corners());
        let moved = self.propagator.propagate(&placed);

        let metrics = (grid.columns.total(), grid.rows.total());
        let metrics_changed = self.last_metrics != Some(metrics);
        self.last_metrics = Some(metrics);
        self.map.clear_modified();

        lattice_core::debug!(
            cells = placed.len(),
            borders = borders.len(),
            moved = moved.len(),
            metrics_changed,
            "grid recalculated"
        );

        let report = LayoutReport {
            container: self.container,
            columns: grid.columns,
            rows: grid.rows,
            column_sizes,
            row_sizes,
            elements: placed
                .iter()
                .map(|(element, rect)| (element.id(), *rect))
                .collect(),
            borders,
            moved,
            metrics,
            metrics_changed,
        };
        self.last_report = Some(report.clone());
        report
    }
}

/// Grid layout with a single lock around its cell store.
#[derive(Debug)]
pub struct GridLayoutManager {
    state: Mutex<GridState>,
    catalog: Arc<BorderCatalog>,
    config: GridConfig,
}

impl Default for GridLayoutManager {
    fn default() -> Self {
        Self::new()
    }
}

impl GridLayoutManager {
    /// Empty grid with its own border catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::with_catalog(Arc::new(BorderCatalog::new()))
    }

    /// Empty grid sharing `catalog`.
    #[must_use]
    pub fn with_catalog(catalog: Arc<BorderCatalog>) -> Self {
        Self {
            state: Mutex::new(GridState::default()),
            catalog,
            config: GridConfig::default(),
        }
    }

    /// Empty grid with explicit configuration.
    pub fn with_config(config: GridConfig, catalog: Arc<BorderCatalog>) -> Result<Self, GridError> {
        let outer = catalog.resolve(config.outer_border.clone())?;
        let mut state = GridState::default();
        state.map.set_outer_border(outer);
        Ok(Self {
            state: Mutex::new(state),
            catalog,
            config,
        })
    }

    pub fn catalog(&self) -> &Arc<BorderCatalog> {
        &self.catalog
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Acquire the grid lock.
    pub fn lock(&self) -> GridLock<'_> {
        GridLock {
            state: self.state.lock().unwrap_or_else(PoisonError::into_inner),
            manager: self,
        }
    }

    /// Move the grid into `container` and recalculate.
    pub fn set_container(&self, container: Rect) -> LayoutReport {
        let mut lock = self.lock();
        lock.set_container(container);
        lock.recalculate()
    }

    /// Report from the most recent pass.
    pub fn last_report(&self) -> Option<LayoutReport> {
        self.lock().state.last_report.clone()
    }

    /// Aggregate (horizontal, vertical) requirements.
    pub fn metrics(&self) -> (AxisMetrics, AxisMetrics) {
        self.lock().metrics()
    }
}

/// Lock token for a [`GridLayoutManager`].
pub struct GridLock<'a> {
    state: MutexGuard<'a, GridState>,
    manager: &'a GridLayoutManager,
}

impl std::fmt::Debug for GridLock<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridLock")
            .field("rows", &self.state.map.rows())
            .field("modified", &self.state.map.is_modified())
            .finish()
    }
}

impl Drop for GridLock<'_> {
    fn drop(&mut self) {
        if self.manager.config.recalculate_on_unlock && self.state.map.is_modified() {
            self.state.recalculate();
        }
    }
}

impl<'a> GridLock<'a> {
    // --- Queries -------------------------------------------------------------

    pub fn map(&self) -> &GridMap {
        &self.state.map
    }

    pub fn rows(&self) -> usize {
        self.state.map.rows()
    }

    pub fn cols(&self, row: usize) -> usize {
        self.state.map.cols(row)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<ElementRef> {
        self.state.map.get(row, col).cloned()
    }

    pub fn lookup(&self, id: ElementId) -> Option<(usize, usize)> {
        self.state.map.lookup(id)
    }

    pub fn container(&self) -> Rect {
        self.state.container
    }

    pub fn is_modified(&self) -> bool {
        self.state.map.is_modified()
    }

    // --- Cell factories ------------------------------------------------------

    /// Append a row and return a factory that fills it left to right.
    pub fn append_row(&mut self) -> GridFactory<'_, 'a> {
        let row = self.state.map.append_row();
        GridFactory::new(self, row, 0, Insertion::Append)
    }

    /// Insert a row before `row` and return a factory that fills it.
    pub fn insert_row(&mut self, row: usize) -> Result<GridFactory<'_, 'a>, GridError> {
        self.state.map.insert_row(row)?;
        Ok(GridFactory::new(self, row, 0, Insertion::Append))
    }

    /// Empty `row` and return a factory that refills it.
    pub fn replace_row(&mut self, row: usize) -> Result<GridFactory<'_, 'a>, GridError> {
        self.state.map.clear_row(row)?;
        Ok(GridFactory::new(self, row, 0, Insertion::Append))
    }

    /// Factory appending cells to the end of `row`.
    pub fn append_columns(&mut self, row: usize) -> Result<GridFactory<'_, 'a>, GridError> {
        if row >= self.rows() {
            return Err(GridError::RowDoesNotExist { row });
        }
        let col = self.cols(row);
        Ok(GridFactory::new(self, row, col, Insertion::Append))
    }

    /// Factory inserting cells before logical column `col` of `row`.
    pub fn insert_columns(
        &mut self,
        row: usize,
        col: usize,
    ) -> Result<GridFactory<'_, 'a>, GridError> {
        if row >= self.rows() {
            return Err(GridError::RowDoesNotExist { row });
        }
        if col > self.cols(row) {
            return Err(GridError::ColumnDoesNotExist { row, col });
        }
        Ok(GridFactory::new(self, row, col, Insertion::Shift))
    }

    /// One-shot factory replacing the cell at `(row, col)`.
    pub fn replace_cell(
        &mut self,
        row: usize,
        col: usize,
    ) -> Result<ReplaceCellFactory<'_, 'a>, GridError> {
        if row >= self.rows() {
            return Err(GridError::RowDoesNotExist { row });
        }
        if col >= self.cols(row) {
            return Err(GridError::ColumnDoesNotExist { row, col });
        }
        Ok(ReplaceCellFactory {
            lock: self,
            row,
            col,
            attrs: CellAttrs::default(),
        })
    }

    // --- Removal -------------------------------------------------------------

    /// Remove `count` cells from `row` starting at `col`.
    pub fn remove_cells(
        &mut self,
        row: usize,
        col: usize,
        count: usize,
    ) -> Result<Vec<ElementRef>, GridError> {
        let removed = self.state.map.remove(row, col, count)?;
        Ok(removed.into_iter().map(|cell| Arc::clone(cell.element())).collect())
    }

    pub fn remove_row(&mut self, row: usize) -> Result<Vec<ElementRef>, GridError> {
        let removed = self.state.map.remove_row(row)?;
        Ok(removed.into_iter().map(|cell| Arc::clone(cell.element())).collect())
    }

    pub fn remove_rows(&mut self, row: usize, count: usize) -> Result<(), GridError> {
        self.state.map.remove_rows(row, count)
    }

    pub fn remove_all_rows(&mut self) {
        self.state.map.remove_all_rows();
    }

    /// Reorder rows: new row `i` is old row `permutation[i]`.
    pub fn resort_rows(&mut self, permutation: &[usize]) -> Result<(), GridError> {
        self.state.map.resort_rows(permutation)
    }

    // --- Defaults ------------------------------------------------------------

    /// Border drawn above `row` (`row == rows()` is the bottom edge).
    pub fn default_row_border(
        &mut self,
        row: usize,
        border: impl Into<BorderSource>,
    ) -> Result<(), GridError> {
        let border = self.manager.catalog.resolve(border)?;
        self.state.map.row_defaults_mut(row).border = border;
        Ok(())
    }

    /// Border drawn left of `col` (`col == cols` is the right edge).
    pub fn default_col_border(
        &mut self,
        col: usize,
        border: impl Into<BorderSource>,
    ) -> Result<(), GridError> {
        let border = self.manager.catalog.resolve(border)?;
        self.state.map.col_defaults_mut(col).border = border;
        Ok(())
    }

    /// Border for the grid's outside edges.
    pub fn outer_border(&mut self, border: impl Into<BorderSource>) -> Result<(), GridError> {
        let border = self.manager.catalog.resolve(border)?;
        self.state.map.set_outer_border(border);
        Ok(())
    }

    /// Share of surplus height for `row`, clamped to 100.
    pub fn requested_row_height(&mut self, row: usize, percentage: u8) {
        self.state.map.row_defaults_mut(row).percentage = Some(percentage.min(100));
    }

    /// Share of surplus width for `col`, clamped to 100.
    pub fn requested_col_width(&mut self, col: usize, percentage: u8) {
        self.state.map.col_defaults_mut(col).percentage = Some(percentage.min(100));
    }

    pub fn row_alignment(&mut self, row: usize, align: VAlign) {
        self.state.map.row_defaults_mut(row).valign = Some(align);
    }

    pub fn col_alignment(&mut self, col: usize, align: HAlign) {
        self.state.map.col_defaults_mut(col).halign = Some(align);
    }

    /// Default top/bottom padding for cells in `row`.
    pub fn row_padding(&mut self, row: usize, before: u32, after: u32) {
        let defaults = self.state.map.row_defaults_mut(row);
        defaults.padding_before = Some(before);
        defaults.padding_after = Some(after);
    }

    /// Default left/right padding for cells in `col`.
    pub fn col_padding(&mut self, col: usize, before: u32, after: u32) {
        let defaults = self.state.map.col_defaults_mut(col);
        defaults.padding_before = Some(before);
        defaults.padding_after = Some(after);
    }

    pub fn remove_all_defaults(&mut self) {
        self.state.map.remove_all_defaults();
    }

    // --- Recalculation -------------------------------------------------------

    /// An element's visibility changed; cells flagged `remove_when_hidden`
    /// must be re-placed.
    pub fn visibility_changed(&mut self) {
        self.state.map.mark_modified();
    }

    /// Theme borders may resolve differently; recompute every corner.
    pub fn theme_changed(&mut self) {
        self.state.corners.clear();
        self.state.map.mark_modified();
    }

    pub fn set_container(&mut self, container: Rect) {
        if self.state.container != container {
            self.state.container = container;
            self.state.map.mark_modified();
        }
    }

    /// Override the computed track sizes along `axis`; `None` restores them.
    ///
    /// Ignored during a pass if the length does not match the track count.
    pub fn set_track_sizes(&mut self, axis: Axis, sizes: Option<Vec<u32>>) {
        match axis {
            Axis::Horizontal => self.state.forced_columns = sizes,
            Axis::Vertical => self.state.forced_rows = sizes,
        }
        self.state.map.mark_modified();
    }

    /// Track requirements without positioning anything.
    pub fn resolve(&mut self) -> ResolvedGrid {
        self.state.resolve().grid
    }

    /// Aggregate (horizontal, vertical) requirements.
    pub fn metrics(&mut self) -> (AxisMetrics, AxisMetrics) {
        let grid = self.resolve();
        (grid.columns.total(), grid.rows.total())
    }

    /// Run the full pass now.
    pub fn recalculate(&mut self) -> LayoutReport {
        self.state.recalculate()
    }

    /// Position everything inside `container`; `true` if any element moved.
    pub fn reposition_child_elements(&mut self, container: Rect) -> bool {
        self.set_container(container);
        self.recalculate().moved_any()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Insertion {
    /// Replace nothing; the position must be the end of the row.
    Append,
    /// Shift later cells right.
    Shift,
}

fn resolve_cell_border(
    catalog: &BorderCatalog,
    border: impl Into<BorderSource>,
) -> Result<CellBorder, GridError> {
    Ok(catalog.resolve(border)?.into())
}

/// Adds cells to one row, left to right.
///
/// Attributes set on the factory apply to the next [`GridFactory::create`]
/// and are reset afterwards.
pub struct GridFactory<'l, 'a> {
    lock: &'l mut GridLock<'a>,
    row: usize,
    col: usize,
    insertion: Insertion,
    attrs: CellAttrs,
}

impl std::fmt::Debug for GridFactory<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridFactory")
            .field("row", &self.row)
            .field("col", &self.col)
            .field("attrs", &self.attrs)
            .finish()
    }
}

impl<'l, 'a> GridFactory<'l, 'a> {
    fn new(lock: &'l mut GridLock<'a>, row: usize, col: usize, insertion: Insertion) -> Self {
        Self {
            lock,
            row,
            col,
            insertion,
            attrs: CellAttrs::default(),
        }
    }

    /// Logical position the next cell goes to.
    pub fn position(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    pub fn colspan(&mut self, cols: usize) -> &mut Self {
        self.attrs.span = Span::new(self.attrs.span.rows(), cols);
        self
    }

    pub fn rowspan(&mut self, rows: usize) -> &mut Self {
        self.attrs.span = Span::new(rows, self.attrs.span.cols());
        self
    }

    pub fn halign(&mut self, align: HAlign) -> &mut Self {
        self.attrs.alignment.halign = Some(align);
        self
    }

    pub fn valign(&mut self, align: VAlign) -> &mut Self {
        self.attrs.alignment.valign = Some(align);
        self
    }

    /// Same padding on all four sides.
    pub fn padding(&mut self, padding: u32) -> &mut Self {
        self.attrs.padding = CellPadding::all(padding);
        self
    }

    pub fn left_padding(&mut self, padding: u32) -> &mut Self {
        self.attrs.padding.left = Some(padding);
        self
    }

    pub fn right_padding(&mut self, padding: u32) -> &mut Self {
        self.attrs.padding.right = Some(padding);
        self
    }

    pub fn top_padding(&mut self, padding: u32) -> &mut Self {
        self.attrs.padding.top = Some(padding);
        self
    }

    pub fn bottom_padding(&mut self, padding: u32) -> &mut Self {
        self.attrs.padding.bottom = Some(padding);
        self
    }

    /// Same border on all four sides.
    pub fn border(&mut self, border: impl Into<BorderSource>) -> Result<&mut Self, GridError> {
        let border = resolve_cell_border(&self.lock.manager.catalog, border)?;
        for side in [Side::Left, Side::Right, Side::Top, Side::Bottom] {
            *self.attrs.borders.side_mut(side) = border.clone();
        }
        Ok(self)
    }

    pub fn side_border(
        &mut self,
        side: Side,
        border: impl Into<BorderSource>,
    ) -> Result<&mut Self, GridError> {
        *self.attrs.borders.side_mut(side) =
            resolve_cell_border(&self.lock.manager.catalog, border)?;
        Ok(self)
    }

    pub fn left_border(&mut self, border: impl Into<BorderSource>) -> Result<&mut Self, GridError> {
        self.side_border(Side::Left, border)
    }

    pub fn right_border(&mut self, border: impl Into<BorderSource>) -> Result<&mut Self, GridError> {
        self.side_border(Side::Right, border)
    }

    pub fn top_border(&mut self, border: impl Into<BorderSource>) -> Result<&mut Self, GridError> {
        self.side_border(Side::Top, border)
    }

    pub fn bottom_border(&mut self, border: impl Into<BorderSource>) -> Result<&mut Self, GridError> {
        self.side_border(Side::Bottom, border)
    }

    pub fn remove_when_hidden(&mut self, remove: bool) -> &mut Self {
        self.attrs.remove_when_hidden = remove;
        self
    }

    /// Add `element` with the pending attributes and advance one column.
    pub fn create(&mut self, element: impl IntoElementRef) -> Result<&mut Self, GridError> {
        let cell = CellRecord::new(element.into_element_ref(), std::mem::take(&mut self.attrs));
        let map = &mut self.lock.state.map;
        match self.insertion {
            Insertion::Append => {
                map.insert(self.row, self.col, cell, false)?;
            }
            Insertion::Shift => map.insert_shifting(self.row, self.col, cell)?,
        }
        self.col += 1;
        Ok(self)
    }
}

/// Replaces one existing cell. Consumed by [`ReplaceCellFactory::create`].
pub struct ReplaceCellFactory<'l, 'a> {
    lock: &'l mut GridLock<'a>,
    row: usize,
    col: usize,
    attrs: CellAttrs,
}

impl std::fmt::Debug for ReplaceCellFactory<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplaceCellFactory")
            .field("row", &self.row)
            .field("col", &self.col)
            .field("attrs", &self.attrs)
            .finish()
    }
}

impl ReplaceCellFactory<'_, '_> {
    #[must_use]
    pub fn colspan(mut self, cols: usize) -> Self {
        self.attrs.span = Span::new(self.attrs.span.rows(), cols);
        self
    }

    #[must_use]
    pub fn rowspan(mut self, rows: usize) -> Self {
        self.attrs.span = Span::new(rows, self.attrs.span.cols());
        self
    }

    #[must_use]
    pub fn halign(mut self, align: HAlign) -> Self {
        self.attrs.alignment.halign = Some(align);
        self
    }

    #[must_use]
    pub fn valign(mut self, align: VAlign) -> Self {
        self.attrs.alignment.valign = Some(align);
        self
    }

    #[must_use]
    pub fn padding(mut self, padding: u32) -> Self {
        self.attrs.padding = CellPadding::all(padding);
        self
    }

    pub fn border(mut self, border: impl Into<BorderSource>) -> Result<Self, GridError> {
        let border = resolve_cell_border(&self.lock.manager.catalog, border)?;
        for side in [Side::Left, Side::Right, Side::Top, Side::Bottom] {
            *self.attrs.borders.side_mut(side) = border.clone();
        }
        Ok(self)
    }

    pub fn side_border(
        mut self,
        side: Side,
        border: impl Into<BorderSource>,
    ) -> Result<Self, GridError> {
        *self.attrs.borders.side_mut(side) =
            resolve_cell_border(&self.lock.manager.catalog, border)?;
        Ok(self)
    }

    #[must_use]
    pub fn remove_when_hidden(mut self, remove: bool) -> Self {
        self.attrs.remove_when_hidden = remove;
        self
    }

    /// Put `element` in place of the existing cell; returns the old element.
    pub fn create(self, element: impl IntoElementRef) -> Result<ElementRef, GridError> {
        let cell = CellRecord::new(element.into_element_ref(), self.attrs);
        let previous = self
            .lock
            .state
            .map
            .insert(self.row, self.col, cell, true)?
            .ok_or(GridError::ColumnDoesNotExist {
                row: self.row,
                col: self.col,
            })?;
        Ok(Arc::clone(previous.element()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Canvas, Element};

    fn canvas(width: u32, height: u32) -> Arc<Canvas> {
        Arc::new(Canvas::fixed(width, height))
    }

    #[test]
    fn append_rows_and_query() {
        let grid = GridLayoutManager::new();
        let a = canvas(10, 10);
        let b = canvas(10, 10);
        let c = canvas(10, 10);
        {
            let mut lock = grid.lock();
            lock.append_row()
                .create(a.clone())
                .expect("a")
                .create(b.clone())
                .expect("b");
            lock.append_row().create(c.clone()).expect("c");
            assert_eq!(lock.rows(), 2);
            assert_eq!(lock.cols(0), 2);
            assert_eq!(lock.cols(1), 1);
            assert_eq!(lock.cols(7), 0);
            assert_eq!(lock.lookup(b.id()), Some((0, 1)));
            assert_eq!(lock.get(1, 0).map(|e| e.id()), Some(c.id()));
            assert!(lock.get(1, 1).is_none());
        }
        // Dropping the lock recalculated the grid.
        assert!(a.position().is_some());
        assert!(!grid.lock().is_modified());
    }

    #[test]
    fn factory_attributes_reset_after_create() {
        let grid = GridLayoutManager::new();
        let mut lock = grid.lock();
        let mut factory = lock.append_row();
        factory
            .colspan(2)
            .padding(3)
            .create(canvas(1, 1))
            .expect("first")
            .create(canvas(1, 1))
            .expect("second");
        assert_eq!(factory.position(), (0, 2));
        drop(factory);
        let map = lock.map();
        assert_eq!(map.cell(0, 0).expect("cell").attrs().span.cols(), 2);
        assert_eq!(map.cell(0, 1).expect("cell").attrs(), &CellAttrs::default());
    }

    #[test]
    fn insert_columns_shifts_existing_cells() {
        let grid = GridLayoutManager::new();
        let a = canvas(1, 1);
        let b = canvas(1, 1);
        let mut lock = grid.lock();
        lock.append_row().create(a.clone()).expect("a");
        lock.insert_columns(0, 0)
            .expect("row exists")
            .create(b.clone())
            .expect("b");
        assert_eq!(lock.lookup(b.id()), Some((0, 0)));
        assert_eq!(lock.lookup(a.id()), Some((0, 1)));
        assert!(matches!(
            lock.insert_columns(0, 5),
            Err(GridError::ColumnDoesNotExist { row: 0, col: 5 })
        ));
    }

    #[test]
    fn replace_cell_is_one_shot_and_returns_previous() {
        let grid = GridLayoutManager::new();
        let a = canvas(1, 1);
        let b = canvas(1, 1);
        let mut lock = grid.lock();
        lock.append_row().create(a.clone()).expect("a");
        let previous = lock
            .replace_cell(0, 0)
            .expect("cell exists")
            .halign(HAlign::Right)
            .create(b.clone())
            .expect("replace");
        assert_eq!(previous.id(), a.id());
        assert_eq!(lock.lookup(b.id()), Some((0, 0)));
        assert_eq!(lock.lookup(a.id()), None);
        assert!(matches!(
            lock.replace_cell(0, 1),
            Err(GridError::ColumnDoesNotExist { row: 0, col: 1 })
        ));
    }

    #[test]
    fn replace_row_refills() {
        let grid = GridLayoutManager::new();
        let mut lock = grid.lock();
        lock.append_row()
            .create(canvas(1, 1))
            .expect("a")
            .create(canvas(1, 1))
            .expect("b");
        lock.replace_row(0).expect("row").create(canvas(1, 1)).expect("c");
        assert_eq!(lock.cols(0), 1);
        assert!(matches!(
            lock.replace_row(3),
            Err(GridError::RowDoesNotExist { row: 3 })
        ));
    }

    #[test]
    fn unknown_theme_border_is_an_error() {
        let grid = GridLayoutManager::new();
        let mut lock = grid.lock();
        let mut factory = lock.append_row();
        let err = factory.border("wobbly_5%").expect_err("unknown");
        assert_eq!(err.to_string(), "theme border \"wobbly_5%\" does not exist");
    }

    #[test]
    fn layout_places_cells_and_borders() {
        let grid = GridLayoutManager::with_config(
            GridConfig::default().outer_border("thin_0%"),
            Arc::new(BorderCatalog::new()),
        )
        .expect("valid config");
        let a = canvas(10, 5);
        let b = canvas(20, 5);
        {
            let mut lock = grid.lock();
            lock.default_col_border(1, "thick_0%").expect("border");
            lock.append_row()
                .create(a.clone())
                .expect("a")
                .create(b.clone())
                .expect("b");
        }
        let report = grid.set_container(Rect::new(0, 0, 100, 100));
        // Outer borders are 1 wide, the divider 2.
        assert_eq!(report.columns.boundaries(), &[1, 2, 1]);
        assert_eq!(a.position(), Some(Rect::new(1, 1, 10, 5)));
        assert_eq!(b.position(), Some(Rect::new(13, 1, 20, 5)));
        assert_eq!(report.metrics.0, AxisMetrics::exact(34));
        assert_eq!(report.metrics.1, AxisMetrics::exact(7));
        assert!(!report.borders.is_empty());
    }

    #[test]
    fn only_moved_elements_are_reported() {
        let grid = GridLayoutManager::new();
        let a = canvas(10, 10);
        let b = canvas(10, 10);
        {
            let mut lock = grid.lock();
            lock.append_row().create(a.clone()).expect("a");
            lock.append_row().create(b.clone()).expect("b");
        }
        let first = grid.set_container(Rect::new(0, 0, 10, 20));
        assert_eq!(first.moved.len(), 0, "positions unchanged since unlock");
        let moved = grid.set_container(Rect::new(0, 5, 10, 20));
        assert_eq!(moved.moved.len(), 2);
        assert_eq!(a.notifications(), 2);

        {
            let mut lock = grid.lock();
            lock.resort_rows(&[1, 0]).expect("valid permutation");
        }
        assert_eq!(b.position(), Some(Rect::new(0, 5, 10, 10)));
        assert_eq!(a.position(), Some(Rect::new(0, 15, 10, 10)));
    }

    #[test]
    fn hidden_cells_are_excluded_after_visibility_change() {
        let grid = GridLayoutManager::new();
        let a = canvas(10, 10);
        let b = canvas(10, 10);
        {
            let mut lock = grid.lock();
            lock.append_row()
                .remove_when_hidden(true)
                .create(a.clone())
                .expect("a")
                .create(b.clone())
                .expect("b");
        }
        assert_eq!(b.position(), Some(Rect::new(10, 0, 10, 10)));
        a.set_visible(false);
        grid.lock().visibility_changed();
        assert_eq!(b.position(), Some(Rect::new(0, 0, 10, 10)));
        assert_eq!(grid.metrics().0, AxisMetrics::exact(10));
    }

    #[test]
    fn theme_change_rebuilds_the_same_borders() {
        let grid = GridLayoutManager::new();
        {
            let mut lock = grid.lock();
            lock.outer_border("thin_0%").expect("theme border");
            lock.append_row()
                .border("thick_50%")
                .expect("theme border")
                .create(canvas(4, 4))
                .expect("a")
                .create(canvas(4, 4))
                .expect("b");
        }
        let before = grid.set_container(Rect::new(0, 0, 30, 10));
        let after = {
            let mut lock = grid.lock();
            lock.theme_changed();
            lock.recalculate()
        };
        assert_eq!(after.borders, before.borders);
        assert!(after.moved.is_empty());
    }

    #[test]
    fn requested_width_takes_surplus() {
        let grid = GridLayoutManager::new();
        let a = Arc::new(Canvas::new(AxisMetrics::at_least(10, 10), AxisMetrics::exact(5)));
        let b = canvas(10, 5);
        {
            let mut lock = grid.lock();
            lock.requested_col_width(0, 250);
            assert_eq!(lock.map().col_defaults(0).and_then(|d| d.percentage), Some(100));
            lock.col_alignment(1, HAlign::Right);
            lock.append_row()
                .create(a.clone())
                .expect("a")
                .create(b.clone())
                .expect("b");
        }
        let report = grid.set_container(Rect::new(0, 0, 50, 5));
        assert_eq!(report.column_sizes, vec![40, 10]);
        assert_eq!(a.position(), Some(Rect::new(0, 0, 10, 5)));
        assert_eq!(b.position(), Some(Rect::new(40, 0, 10, 5)));
    }

    #[test]
    fn forced_track_sizes_override_resolution() {
        let grid = GridLayoutManager::new();
        let a = Arc::new(Canvas::new(AxisMetrics::at_least(1, 10), AxisMetrics::exact(5)));
        let mut lock = grid.lock();
        lock.append_row().halign(HAlign::Fill).create(a.clone()).expect("a");
        lock.set_track_sizes(Axis::Horizontal, Some(vec![33]));
        assert!(lock.reposition_child_elements(Rect::new(0, 0, 100, 5)));
        assert_eq!(a.position(), Some(Rect::new(0, 0, 33, 5)));
        lock.set_track_sizes(Axis::Horizontal, Some(vec![1, 2]));
        lock.recalculate();
        assert_eq!(a.position(), Some(Rect::new(0, 0, 10, 5)));
    }

    #[test]
    fn no_recalculation_when_disabled() {
        let grid = GridLayoutManager::with_config(
            GridConfig::default().recalculate_on_unlock(false),
            Arc::new(BorderCatalog::new()),
        )
        .expect("valid config");
        let a = canvas(1, 1);
        grid.lock().append_row().create(a.clone()).expect("a");
        assert_eq!(a.position(), None);
        assert!(grid.lock().is_modified());
        grid.set_container(Rect::new(0, 0, 1, 1));
        assert_eq!(a.position(), Some(Rect::new(0, 0, 1, 1)));
    }
}
