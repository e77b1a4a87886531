//! Cell records, assembled from small capabilities.
//!
//! A [`CellRecord`] owns one element plus independent components for
//! spanning, borders, alignment and padding. The resolver, synthesizer and
//! propagator each consume only the capability trait they need.

use lattice_core::geometry::Axis;

use crate::border::BorderHandle;
use crate::element::{ElementId, ElementRef};

/// Horizontal placement of an element inside its cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HAlign {
    #[default]
    Left,
    Center,
    Right,
    /// Stretch to the full cell width, ignoring the element's maximum.
    Fill,
}

/// Vertical placement of an element inside its cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VAlign {
    #[default]
    Top,
    Middle,
    Bottom,
    /// Stretch to the full cell height, ignoring the element's maximum.
    Fill,
}

/// Side of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
    Top,
    Bottom,
}

/// Rows and columns occupied by a cell, both at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    rows: usize,
    cols: usize,
}

impl Span {
    pub const ONE: Self = Self { rows: 1, cols: 1 };

    #[must_use]
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows: rows.max(1),
            cols: cols.max(1),
        }
    }

    pub const fn rows(self) -> usize {
        self.rows
    }

    pub const fn cols(self) -> usize {
        self.cols
    }

    pub const fn along(self, axis: Axis) -> usize {
        match axis {
            Axis::Horizontal => self.cols,
            Axis::Vertical => self.rows,
        }
    }
}

impl Default for Span {
    fn default() -> Self {
        Self::ONE
    }
}

/// A cell's own border on one side.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CellBorder {
    /// Use the row/column default for this edge.
    #[default]
    Inherit,
    /// Explicitly no border, even if a default exists.
    NoBorder,
    Border(BorderHandle),
}

impl From<Option<BorderHandle>> for CellBorder {
    fn from(border: Option<BorderHandle>) -> Self {
        match border {
            Some(border) => Self::Border(border),
            None => Self::NoBorder,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CellBorders {
    pub left: CellBorder,
    pub right: CellBorder,
    pub top: CellBorder,
    pub bottom: CellBorder,
}

impl CellBorders {
    pub fn side(&self, side: Side) -> &CellBorder {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
            Side::Top => &self.top,
            Side::Bottom => &self.bottom,
        }
    }

    pub fn side_mut(&mut self, side: Side) -> &mut CellBorder {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
            Side::Top => &mut self.top,
            Side::Bottom => &mut self.bottom,
        }
    }
}

/// Explicit per-side padding; `None` defers to the row/column default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CellPadding {
    pub left: Option<u32>,
    pub right: Option<u32>,
    pub top: Option<u32>,
    pub bottom: Option<u32>,
}

impl CellPadding {
    /// Same explicit padding on all four sides.
    #[must_use]
    pub fn all(value: u32) -> Self {
        Self {
            left: Some(value),
            right: Some(value),
            top: Some(value),
            bottom: Some(value),
        }
    }

    /// Leading/trailing explicit padding along an axis.
    pub fn along(&self, axis: Axis) -> (Option<u32>, Option<u32>) {
        match axis {
            Axis::Horizontal => (self.left, self.right),
            Axis::Vertical => (self.top, self.bottom),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CellAlignment {
    pub halign: Option<HAlign>,
    pub valign: Option<VAlign>,
}

/// Everything about a cell except its element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CellAttrs {
    pub span: Span,
    pub borders: CellBorders,
    pub alignment: CellAlignment,
    pub padding: CellPadding,
    /// Exclude the cell from sizing and positioning while its element is hidden.
    pub remove_when_hidden: bool,
}

pub trait Spannable {
    fn span(&self) -> Span;
}

pub trait Bordered {
    fn cell_border(&self, side: Side) -> &CellBorder;
}

pub trait Aligned {
    fn alignment(&self) -> CellAlignment;
}

pub trait Padded {
    fn padding(&self) -> CellPadding;
}

/// One grid cell: its element and its attributes.
#[derive(Debug, Clone)]
pub struct CellRecord {
    element: ElementRef,
    attrs: CellAttrs,
}

impl CellRecord {
    pub fn new(element: ElementRef, attrs: CellAttrs) -> Self {
        Self { element, attrs }
    }

    pub fn element(&self) -> &ElementRef {
        &self.element
    }

    pub fn element_id(&self) -> ElementId {
        self.element.id()
    }

    pub fn attrs(&self) -> &CellAttrs {
        &self.attrs
    }

    pub fn attrs_mut(&mut self) -> &mut CellAttrs {
        &mut self.attrs
    }

    /// Hidden and flagged `remove_when_hidden`.
    pub fn is_excluded(&self) -> bool {
        self.attrs.remove_when_hidden && !self.element.is_visible()
    }
}

impl Spannable for CellRecord {
    fn span(&self) -> Span {
        self.attrs.span
    }
}

impl Bordered for CellRecord {
    fn cell_border(&self, side: Side) -> &CellBorder {
        self.attrs.borders.side(side)
    }
}

impl Aligned for CellRecord {
    fn alignment(&self) -> CellAlignment {
        self.attrs.alignment
    }
}

impl Padded for CellRecord {
    fn padding(&self) -> CellPadding {
        self.attrs.padding
    }
}
