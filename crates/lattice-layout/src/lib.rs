#![forbid(unsafe_code)]

//! Grid layout engine.
//!
//! Elements are placed in a grid of rows and cells; cells may span several
//! columns and rows, carry their own borders, padding and alignment, and
//! inherit per-row and per-column defaults. A recalculation pass runs:
//!
//! - [`resolver`] - per-track minimum/preferred/maximum sizes from the cells
//! - [`synthesis`] - merged straight borders and corner draw information
//! - [`position`] - track offsets, cell rectangles and change notification
//!
//! [`GridLayoutManager`] owns the grid behind a lock; all mutation goes
//! through a [`GridLock`] and its factories. [`pane`] and [`peephole`] build
//! on the same engine, sharing space through the [`resize`] layer.
//!
//! ```
//! use lattice_layout::{AxisMetrics, Canvas, Element, GridLayoutManager, Rect};
//!
//! let grid = GridLayoutManager::new();
//! let label = Canvas::fixed(20, 1).shared();
//! let field = Canvas::new(AxisMetrics::at_least(10, 30), AxisMetrics::exact(1)).shared();
//! {
//!     let mut lock = grid.lock();
//!     let mut row = lock.append_row();
//!     row.create(label.clone())?;
//!     row.create(field.clone())?;
//! }
//! let report = grid.set_container(Rect::new(0, 0, 50, 1));
//! assert_eq!(report.rect_of(field.id()), Some(Rect::new(20, 0, 30, 1)));
//! # Ok::<(), lattice_layout::GridError>(())
//! ```

pub mod border;
pub mod cell;
pub mod element;
pub mod grid_map;
pub mod manager;
pub mod metrics;
pub mod pane;
pub mod peephole;
pub mod position;
pub mod queue;
pub mod resize;
pub mod resolver;
pub mod synthesis;

pub use border::{BorderCatalog, BorderError, BorderHandle, BorderSource, BorderSpec, NO_BORDER, Rgba};
pub use cell::{CellBorder, HAlign, Side, VAlign};
pub use element::{Canvas, Element, ElementId, ElementRef, IntoElementRef};
pub use grid_map::{GridError, GridMap};
pub use lattice_core::geometry::{Axis, Point, Rect, Sides, Size};
pub use manager::{
    GridConfig, GridFactory, GridLayoutManager, GridLock, LayoutReport, ReplaceCellFactory,
    ResolvedGrid,
};
pub use metrics::AxisMetrics;
pub use pane::{PaneConfig, PaneError, PaneLayout, PaneSizes};
pub use peephole::{Peephole, PeepholeConfig, PeepholeLayout, ScrollbarGeometry, ScrollbarPolicy};
pub use position::{BorderElement, BorderShape};
pub use queue::{QueueClosed, UiQueue, UiQueueHandle};
pub use resize::ProportionalResize;
pub use synthesis::{CornerDrawInfo, Quadrants};
