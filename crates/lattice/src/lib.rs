#![forbid(unsafe_code)]

//! Lattice public facade crate.
//!
//! Re-exports the layout engine and geometry types, adds a single error type
//! covering every fallible operation, and a prelude for day-to-day use.

use std::fmt;

// --- Core re-exports -------------------------------------------------------

pub use lattice_core::geometry::{Axis, Point, Rect, Sides, Size};

// --- Layout re-exports -----------------------------------------------------

pub use lattice_layout::{
    AxisMetrics, BorderCatalog, BorderError, BorderSource, BorderSpec, Canvas, Element, ElementId,
    ElementRef, GridConfig, GridError, GridLayoutManager, GridLock, HAlign, IntoElementRef,
    LayoutReport, PaneConfig, PaneError, PaneLayout, PaneSizes, Peephole, PeepholeConfig,
    QueueClosed, ScrollbarPolicy, UiQueue, UiQueueHandle, VAlign,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for lattice APIs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Grid structure or border resolution failure.
    Grid(GridError),
    /// Pane index, divider or saved-size failure.
    Pane(PaneError),
    /// The UI queue was dropped.
    QueueClosed,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grid(err) => write!(f, "{err}"),
            Self::Pane(err) => write!(f, "{err}"),
            Self::QueueClosed => write!(f, "{QueueClosed}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Grid(err) => Some(err),
            Self::Pane(err) => Some(err),
            Self::QueueClosed => None,
        }
    }
}

impl From<GridError> for Error {
    fn from(err: GridError) -> Self {
        Self::Grid(err)
    }
}

impl From<BorderError> for Error {
    fn from(err: BorderError) -> Self {
        Self::Grid(GridError::Border(err))
    }
}

impl From<PaneError> for Error {
    fn from(err: PaneError) -> Self {
        match err {
            PaneError::Grid(err) => Self::Grid(err),
            other => Self::Pane(other),
        }
    }
}

impl From<QueueClosed> for Error {
    fn from(_: QueueClosed) -> Self {
        Self::QueueClosed
    }
}

/// Standard result type for lattice APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        Axis, AxisMetrics, Canvas, Element, ElementRef, Error, GridLayoutManager, HAlign,
        PaneLayout, Peephole, Rect, Result, UiQueue, VAlign,
    };

    pub use crate::{core, layout};
}

pub use lattice_core as core;
pub use lattice_layout as layout;
