//! Splitter panes on top of the grid engine.
//!
//! N panes sit side by side along one axis, separated by divider borders.
//! Their sizes come from the proportional resize layer: every pane keeps a
//! reference size and the available extent is shared in proportion. The
//! fixed overhead (dividers plus whatever each pane reserves for itself,
//! such as a peephole's scrollbar) is set aside first; when it changes, the
//! reference sizes are re-derived from the panes' natural sizes.
//!
//! Reference sizes are what a user changes by dragging a divider, and what
//! gets saved and restored across sessions as [`PaneSizes`].

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use lattice_core::geometry::{Axis, Rect};
use serde::{Deserialize, Serialize};

use crate::border::{BorderCatalog, BorderSource};
use crate::cell::{HAlign, VAlign};
use crate::element::{ElementRef, IntoElementRef};
use crate::grid_map::GridError;
use crate::manager::{GridConfig, GridLayoutManager, GridLock, LayoutReport};
use crate::metrics::saturating_total;
use crate::resize::{ProportionalResize, enforce_minimums};

/// Current [`PaneSizes`] schema version.
pub const PANE_SIZES_SCHEMA_VERSION: u16 = 1;

/// Pane layout settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaneConfig {
    /// `Horizontal` puts panes side by side; `Vertical` stacks them.
    pub axis: Axis,
    /// Border between adjacent panes.
    pub divider: BorderSource,
    /// No drag or resize makes a pane smaller than this.
    pub min_pane_size: u32,
}

impl Default for PaneConfig {
    fn default() -> Self {
        Self {
            axis: Axis::Horizontal,
            divider: BorderSource::from("thin_0%"),
            min_pane_size: 1,
        }
    }
}

impl PaneConfig {
    #[must_use]
    pub fn axis(mut self, axis: Axis) -> Self {
        self.axis = axis;
        self
    }

    #[must_use]
    pub fn divider(mut self, divider: impl Into<BorderSource>) -> Self {
        self.divider = divider.into();
        self
    }

    #[must_use]
    pub fn min_pane_size(mut self, size: u32) -> Self {
        self.min_pane_size = size;
        self
    }
}

/// Saved pane reference sizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaneSizes {
    pub schema_version: u16,
    pub sizes: Vec<u32>,
}

impl PaneSizes {
    #[must_use]
    pub fn new(sizes: Vec<u32>) -> Self {
        Self {
            schema_version: PANE_SIZES_SCHEMA_VERSION,
            sizes,
        }
    }
}

#[derive(Debug, Default)]
struct PaneState {
    panes: Vec<ElementRef>,
    resize: ProportionalResize,
    /// Content sizes (overhead excluded) from the last layout.
    content_sizes: Vec<u32>,
    container: Option<Rect>,
}

/// Panes separated by dividers.
#[derive(Debug)]
pub struct PaneLayout {
    grid: GridLayoutManager,
    config: PaneConfig,
    state: Mutex<PaneState>,
}

impl PaneLayout {
    /// Empty pane layout with its own border catalog.
    pub fn new(config: PaneConfig) -> Result<Self, PaneError> {
        Self::with_catalog(config, Arc::new(BorderCatalog::new()))
    }

    pub fn with_catalog(config: PaneConfig, catalog: Arc<BorderCatalog>) -> Result<Self, PaneError> {
        catalog.resolve(config.divider.clone()).map_err(GridError::from)?;
        let grid = GridLayoutManager::with_config(
            GridConfig::default().recalculate_on_unlock(false),
            catalog,
        )?;
        if config.axis == Axis::Horizontal {
            let mut lock = grid.lock();
            lock.append_row();
            lock.requested_row_height(0, 100);
        } else {
            grid.lock().requested_col_width(0, 100);
        }
        Ok(Self {
            grid,
            config,
            state: Mutex::new(PaneState::default()),
        })
    }

    pub fn config(&self) -> &PaneConfig {
        &self.config
    }

    /// The grid the panes live in.
    pub fn grid(&self) -> &GridLayoutManager {
        &self.grid
    }

    pub fn panes(&self) -> Vec<ElementRef> {
        self.state().panes.clone()
    }

    pub fn pane_count(&self) -> usize {
        self.state().panes.len()
    }

    /// Add a pane after the last one. Returns its index.
    pub fn append_pane(&self, pane: impl IntoElementRef) -> Result<usize, PaneError> {
        let index = self.pane_count();
        self.insert_pane(index, pane)?;
        Ok(index)
    }

    /// Add a pane before `index`. Reference sizes are re-derived on the
    /// next layout.
    pub fn insert_pane(&self, index: usize, pane: impl IntoElementRef) -> Result<(), PaneError> {
        let mut state = self.state();
        let panes = state.panes.len();
        if index > panes {
            return Err(PaneError::PaneDoesNotExist { index, panes });
        }
        let pane = pane.into_element_ref();
        {
            let mut lock = self.grid.lock();
            match self.config.axis {
                Axis::Horizontal => {
                    lock.insert_columns(0, index)?
                        .halign(HAlign::Fill)
                        .valign(VAlign::Fill)
                        .create(Arc::clone(&pane))?;
                }
                Axis::Vertical => {
                    lock.insert_row(index)?
                        .halign(HAlign::Fill)
                        .valign(VAlign::Fill)
                        .create(Arc::clone(&pane))?;
                }
            }
            self.place_dividers(&mut lock, panes + 1)?;
        }
        state.panes.insert(index, pane);
        state.resize.invalidate();
        Ok(())
    }

    /// Remove the pane at `index`. The remaining panes keep their
    /// reference sizes.
    pub fn remove_pane(&self, index: usize) -> Result<ElementRef, PaneError> {
        let mut state = self.state();
        let panes = state.panes.len();
        if index >= panes {
            return Err(PaneError::PaneDoesNotExist { index, panes });
        }
        {
            let mut lock = self.grid.lock();
            match self.config.axis {
                Axis::Horizontal => {
                    lock.remove_cells(0, index, 1)?;
                }
                Axis::Vertical => {
                    lock.remove_row(index)?;
                }
            }
            self.place_dividers(&mut lock, panes - 1)?;
        }
        let kept = state.resize.reference_sizes().map(|sizes| {
            let mut sizes = sizes.to_vec();
            if index < sizes.len() {
                sizes.remove(index);
            }
            sizes
        });
        if let Some(sizes) = kept {
            state.resize.set_reference_sizes(sizes);
        }
        Ok(state.panes.remove(index))
    }

    /// Size the panes to fill `container`.
    pub fn layout(&self, container: Rect) -> LayoutReport {
        let mut state = self.state();
        let mut lock = self.grid.lock();
        let axis = self.config.axis;
        let resolved = lock.resolve();
        let tracks = match axis {
            Axis::Horizontal => resolved.columns,
            Axis::Vertical => resolved.rows,
        };

        let overheads: Vec<u32> = state
            .panes
            .iter()
            .map(|pane| pane.fixed_overhead(axis))
            .collect();
        let overhead = tracks
            .boundary_total()
            .saturating_add(saturating_total(overheads.iter().copied()));
        if state.resize.set_fixed_overhead(overhead) {
            lattice_core::debug!(overhead, "pane overhead changed; reference sizes reset");
        }

        let natural: Vec<u32> = tracks
            .tracks()
            .iter()
            .zip(&overheads)
            .map(|(track, &own)| track.preferred.saturating_sub(own))
            .collect();
        let minimums: Vec<u32> = tracks
            .tracks()
            .iter()
            .zip(&overheads)
            .map(|(track, &own)| track.minimum.saturating_sub(own).max(self.config.min_pane_size))
            .collect();

        let mut content = state.resize.resize(container.extent(axis), &natural);
        enforce_minimums(&mut content, &minimums);

        let track_sizes: Vec<u32> = content
            .iter()
            .zip(&overheads)
            .map(|(&size, &own)| size.saturating_add(own))
            .collect();
        lock.set_track_sizes(axis, Some(track_sizes));
        lock.set_container(container);
        let report = lock.recalculate();

        state.content_sizes = content;
        state.container = Some(container);
        report
    }

    /// Content sizes from the last layout, overhead excluded.
    pub fn pane_sizes(&self) -> Vec<u32> {
        self.state().content_sizes.clone()
    }

    /// Move divider `index` (between panes `index` and `index + 1`) by
    /// `delta`; positive grows the leading pane. The total is unchanged and
    /// neither pane shrinks below the minimum. Returns the applied delta.
    pub fn drag_divider(&self, index: usize, delta: i32) -> Result<i32, PaneError> {
        let applied = {
            let mut state = self.state();
            let dividers = state.panes.len().saturating_sub(1);
            if index >= dividers {
                return Err(PaneError::DividerDoesNotExist { index, dividers });
            }
            if state.container.is_none() || state.content_sizes.len() != state.panes.len() {
                return Err(PaneError::NotLaidOut);
            }

            let min = self.config.min_pane_size;
            let sizes = &mut state.content_sizes;
            let applied = if delta >= 0 {
                let room = sizes[index + 1].saturating_sub(min);
                let moved = delta.unsigned_abs().min(room);
                sizes[index] += moved;
                sizes[index + 1] -= moved;
                i32::try_from(moved).unwrap_or(i32::MAX)
            } else {
                let room = sizes[index].saturating_sub(min);
                let moved = delta.unsigned_abs().min(room);
                sizes[index] -= moved;
                sizes[index + 1] += moved;
                -i32::try_from(moved).unwrap_or(i32::MAX)
            };
            let sizes = sizes.clone();
            state.resize.set_reference_sizes(sizes);
            applied
        };

        // The state guard must be released before `layout` takes it again.
        let container = self.state().container;
        if let Some(container) = container {
            self.layout(container);
        }
        Ok(applied)
    }

    /// Reference sizes for saving. Empty until the first layout.
    pub fn reference_sizes(&self) -> PaneSizes {
        PaneSizes::new(
            self.state()
                .resize
                .reference_sizes()
                .map(<[u32]>::to_vec)
                .unwrap_or_default(),
        )
    }

    /// Restore saved reference sizes; applied on the next layout.
    pub fn restore(&self, saved: &PaneSizes) -> Result<(), PaneError> {
        if saved.schema_version != PANE_SIZES_SCHEMA_VERSION {
            return Err(PaneError::UnsupportedSchemaVersion {
                version: saved.schema_version,
            });
        }
        let mut state = self.state();
        if saved.sizes.len() != state.panes.len() {
            return Err(PaneError::SnapshotMismatch {
                expected: state.panes.len(),
                found: saved.sizes.len(),
            });
        }

        // Align the overhead first so the next layout keeps these sizes.
        let axis = self.config.axis;
        let resolved = self.grid.lock().resolve();
        let dividers = match axis {
            Axis::Horizontal => resolved.columns.boundary_total(),
            Axis::Vertical => resolved.rows.boundary_total(),
        };
        let own = saturating_total(state.panes.iter().map(|pane| pane.fixed_overhead(axis)));
        state.resize.set_fixed_overhead(dividers.saturating_add(own));
        state.resize.set_reference_sizes(saved.sizes.clone());
        Ok(())
    }

    fn place_dividers(&self, lock: &mut GridLock<'_>, panes: usize) -> Result<(), GridError> {
        lock.remove_all_defaults();
        match self.config.axis {
            Axis::Horizontal => {
                lock.requested_row_height(0, 100);
                for boundary in 1..panes {
                    lock.default_col_border(boundary, self.config.divider.clone())?;
                }
            }
            Axis::Vertical => {
                lock.requested_col_width(0, 100);
                for boundary in 1..panes {
                    lock.default_row_border(boundary, self.config.divider.clone())?;
                }
            }
        }
        Ok(())
    }

    fn state(&self) -> std::sync::MutexGuard<'_, PaneState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Pane layout failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaneError {
    Grid(GridError),
    PaneDoesNotExist { index: usize, panes: usize },
    DividerDoesNotExist { index: usize, dividers: usize },
    SnapshotMismatch { expected: usize, found: usize },
    UnsupportedSchemaVersion { version: u16 },
    NotLaidOut,
}

impl fmt::Display for PaneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grid(err) => write!(f, "{err}"),
            Self::PaneDoesNotExist { index, panes } => {
                write!(f, "pane #{index} does not exist ({panes} panes)")
            }
            Self::DividerDoesNotExist { index, dividers } => {
                write!(f, "divider #{index} does not exist ({dividers} dividers)")
            }
            Self::SnapshotMismatch { expected, found } => write!(
                f,
                "saved pane sizes list {found} panes, layout has {expected}"
            ),
            Self::UnsupportedSchemaVersion { version } => write!(
                f,
                "unsupported pane sizes schema version {version} (expected {PANE_SIZES_SCHEMA_VERSION})"
            ),
            Self::NotLaidOut => write!(f, "panes have not been laid out yet"),
        }
    }
}

impl std::error::Error for PaneError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Grid(err) => Some(err),
            _ => None,
        }
    }
}

impl From<GridError> for PaneError {
    fn from(err: GridError) -> Self {
        Self::Grid(err)
    }
}
