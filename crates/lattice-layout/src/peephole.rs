//! A viewport onto a single child that may be larger than the viewport.
//!
//! The child is laid out at its preferred size (at least the viewport's),
//! then shifted by the scroll offset. Scrollbars take space from the
//! viewport, and that space is reported as the peephole's fixed overhead so
//! that an enclosing pane layout can account for it.

use std::sync::{Mutex, MutexGuard, PoisonError};

use lattice_core::geometry::{Axis, Point, Rect};

use crate::element::{Element, ElementId, ElementRef, IntoElementRef};
use crate::metrics::AxisMetrics;

/// When to show a scrollbar along one axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ScrollbarPolicy {
    /// Never show one; the child is squeezed into the viewport.
    Never,
    /// Show one only when the child does not fit.
    #[default]
    Automatic,
    Always,
}

/// Peephole settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeepholeConfig {
    /// Policy for the scrollbar along the bottom edge.
    pub horizontal: ScrollbarPolicy,
    /// Policy for the scrollbar along the right edge.
    pub vertical: ScrollbarPolicy,
    pub scrollbar_thickness: u32,
}

impl Default for PeepholeConfig {
    fn default() -> Self {
        Self {
            horizontal: ScrollbarPolicy::Automatic,
            vertical: ScrollbarPolicy::Automatic,
            scrollbar_thickness: 10,
        }
    }
}

impl PeepholeConfig {
    #[must_use]
    pub fn horizontal(mut self, policy: ScrollbarPolicy) -> Self {
        self.horizontal = policy;
        self
    }

    #[must_use]
    pub fn vertical(mut self, policy: ScrollbarPolicy) -> Self {
        self.vertical = policy;
        self
    }

    #[must_use]
    pub fn scrollbar_thickness(mut self, thickness: u32) -> Self {
        self.scrollbar_thickness = thickness;
        self
    }

    fn policy(&self, axis: Axis) -> ScrollbarPolicy {
        match axis {
            Axis::Horizontal => self.horizontal,
            Axis::Vertical => self.vertical,
        }
    }
}

/// Track and thumb rectangles of one scrollbar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollbarGeometry {
    pub track: Rect,
    pub thumb: Rect,
}

/// Result of laying out a peephole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeepholeLayout {
    /// Visible part of the peephole, scrollbars excluded.
    pub viewport: Rect,
    /// Child rectangle, offset by the scroll position.
    pub child: Rect,
    /// Clamped scroll offset.
    pub offset: Point,
    pub horizontal: Option<ScrollbarGeometry>,
    pub vertical: Option<ScrollbarGeometry>,
    /// Scrollbars appeared or disappeared since the previous layout, so the
    /// fixed overhead changed.
    pub overhead_changed: bool,
}

#[derive(Debug, Default)]
struct PeepholeState {
    /// Requested offset; clamped when laid out.
    offset: Point,
    container: Option<Rect>,
    /// (horizontal bar, vertical bar) shown by the last layout.
    scrollbars: (bool, bool),
    last: Option<PeepholeLayout>,
}

/// Scrollable viewport around one child element.
#[derive(Debug)]
pub struct Peephole {
    id: ElementId,
    child: ElementRef,
    config: PeepholeConfig,
    state: Mutex<PeepholeState>,
}

impl Peephole {
    pub fn new(child: impl IntoElementRef, config: PeepholeConfig) -> Self {
        let scrollbars = (
            config.horizontal == ScrollbarPolicy::Always,
            config.vertical == ScrollbarPolicy::Always,
        );
        Self {
            id: ElementId::next(),
            child: child.into_element_ref(),
            config,
            state: Mutex::new(PeepholeState {
                scrollbars,
                ..PeepholeState::default()
            }),
        }
    }

    pub fn child(&self) -> &ElementRef {
        &self.child
    }

    pub fn config(&self) -> &PeepholeConfig {
        &self.config
    }

    pub fn scroll_offset(&self) -> Point {
        self.state().offset
    }

    pub fn last_layout(&self) -> Option<PeepholeLayout> {
        self.state().last
    }

    /// Lay out the viewport and child inside `container`.
    ///
    /// The child is notified only when its rectangle changes.
    pub fn layout(&self, container: Rect) -> PeepholeLayout {
        let (layout, child_moved) = {
            let mut state = self.state();
            let previous_child = state.last.map(|last| last.child);
            let layout = self.compute(container, state.offset, state.scrollbars);
            state.offset = layout.offset;
            state.container = Some(container);
            state.scrollbars = (layout.horizontal.is_some(), layout.vertical.is_some());
            state.last = Some(layout);
            (layout, previous_child != Some(layout.child))
        };
        if layout.overhead_changed {
            lattice_core::debug!(
                peephole = %self.id,
                horizontal = layout.horizontal.is_some(),
                vertical = layout.vertical.is_some(),
                "peephole scrollbars changed"
            );
        }
        if child_moved {
            self.child.positioned(layout.child);
        }
        layout
    }

    /// Scroll so that `offset` is the child coordinate at the viewport's
    /// top-left corner. Returns the clamped offset in effect.
    pub fn scroll_to(&self, offset: Point) -> Point {
        let container = {
            let mut state = self.state();
            state.offset = Point::new(offset.x.max(0), offset.y.max(0));
            state.container
        };
        match container {
            Some(container) => self.layout(container).offset,
            None => self.scroll_offset(),
        }
    }

    pub fn scroll_by(&self, dx: i32, dy: i32) -> Point {
        let current = self.scroll_offset();
        self.scroll_to(Point::new(
            current.x.saturating_add(dx),
            current.y.saturating_add(dy),
        ))
    }

    /// Scroll the least amount that brings `area` (in child coordinates)
    /// into view. An area larger than the viewport is aligned to its start.
    pub fn ensure_visible(&self, area: Rect) -> Point {
        let (offset, viewport) = {
            let state = self.state();
            (state.offset, state.last.map(|last| last.viewport))
        };
        let Some(viewport) = viewport else {
            return self.scroll_to(area.origin());
        };
        let x = reveal(offset.x, viewport.width, area.x, area.width);
        let y = reveal(offset.y, viewport.height, area.y, area.height);
        self.scroll_to(Point::new(x, y))
    }

    fn compute(&self, container: Rect, offset: Point, previous: (bool, bool)) -> PeepholeLayout {
        let thickness = self.config.scrollbar_thickness;
        let horizontal = self.child.metrics(Axis::Horizontal);
        let vertical = self.child.metrics(Axis::Vertical);

        // Showing one bar shrinks the viewport and may require the other;
        // the set of shown bars only grows, so this settles within two rounds.
        let mut bars = (
            self.config.horizontal == ScrollbarPolicy::Always,
            self.config.vertical == ScrollbarPolicy::Always,
        );
        loop {
            let width = container.width.saturating_sub(if bars.1 { thickness } else { 0 });
            let height = container.height.saturating_sub(if bars.0 { thickness } else { 0 });
            let next = (
                bars.0
                    || (self.config.horizontal == ScrollbarPolicy::Automatic
                        && horizontal.preferred > width),
                bars.1
                    || (self.config.vertical == ScrollbarPolicy::Automatic
                        && vertical.preferred > height),
            );
            if next == bars {
                break;
            }
            bars = next;
        }

        let viewport = Rect::new(
            container.x,
            container.y,
            container.width.saturating_sub(if bars.1 { thickness } else { 0 }),
            container.height.saturating_sub(if bars.0 { thickness } else { 0 }),
        );
        let child_width = self.child_extent(Axis::Horizontal, horizontal, viewport.width);
        let child_height = self.child_extent(Axis::Vertical, vertical, viewport.height);
        let offset = Point::new(
            clamp_offset(offset.x, child_width, viewport.width),
            clamp_offset(offset.y, child_height, viewport.height),
        );
        let child = Rect::new(
            viewport.x.saturating_sub(offset.x),
            viewport.y.saturating_sub(offset.y),
            child_width,
            child_height,
        );

        let horizontal_bar = bars.0.then(|| {
            let track = Rect::new(viewport.x, viewport.bottom(), viewport.width, thickness);
            let (start, len) = thumb(track.width, child_width, viewport.width, offset.x);
            ScrollbarGeometry {
                track,
                thumb: Rect::new(track.x.saturating_add(start), track.y, len, thickness),
            }
        });
        let vertical_bar = bars.1.then(|| {
            let track = Rect::new(viewport.right(), viewport.y, thickness, viewport.height);
            let (start, len) = thumb(track.height, child_height, viewport.height, offset.y);
            ScrollbarGeometry {
                track,
                thumb: Rect::new(track.x, track.y.saturating_add(start), thickness, len),
            }
        });

        PeepholeLayout {
            viewport,
            child,
            offset,
            horizontal: horizontal_bar,
            vertical: vertical_bar,
            overhead_changed: bars != previous,
        }
    }

    fn child_extent(&self, axis: Axis, metrics: AxisMetrics, viewport: u32) -> u32 {
        match self.config.policy(axis) {
            ScrollbarPolicy::Never => metrics.clamp(viewport),
            _ => metrics.clamp(metrics.preferred.max(viewport)),
        }
    }

    fn state(&self) -> MutexGuard<'_, PeepholeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Element for Peephole {
    fn id(&self) -> ElementId {
        self.id
    }

    /// Scrollable axes can shrink down to the scrollbar; the others need
    /// the child's minimum.
    fn metrics(&self, axis: Axis) -> AxisMetrics {
        let child = self.child.metrics(axis);
        let overhead = self.fixed_overhead(axis);
        let minimum = match self.config.policy(axis) {
            ScrollbarPolicy::Never => child.minimum,
            _ => 0,
        };
        AxisMetrics::new(minimum, child.preferred, None).grow(overhead)
    }

    fn is_visible(&self) -> bool {
        self.child.is_visible()
    }

    /// Width taken by the vertical scrollbar, height taken by the
    /// horizontal one.
    fn fixed_overhead(&self, axis: Axis) -> u32 {
        let (horizontal, vertical) = self.state().scrollbars;
        let shown = match axis {
            Axis::Horizontal => vertical,
            Axis::Vertical => horizontal,
        };
        if shown { self.config.scrollbar_thickness } else { 0 }
    }

    fn positioned(&self, rect: Rect) {
        self.layout(rect);
    }
}

fn to_coord(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn clamp_offset(offset: i32, content: u32, viewport: u32) -> i32 {
    offset.clamp(0, to_coord(content.saturating_sub(viewport)))
}

/// Offset that shows `[start, start + len)` with minimal movement.
fn reveal(offset: i32, viewport: u32, start: i32, len: u32) -> i32 {
    let end = start.saturating_add(to_coord(len));
    let visible_end = offset.saturating_add(to_coord(viewport));
    if start < offset || len > viewport {
        start
    } else if end > visible_end {
        end.saturating_sub(to_coord(viewport))
    } else {
        offset
    }
}

/// Thumb (start, length) inside a track, rounded to the nearest unit.
fn thumb(track: u32, content: u32, viewport: u32, offset: i32) -> (i32, u32) {
    if track == 0 {
        return (0, 0);
    }
    if content <= viewport || content == 0 {
        return (0, track);
    }
    let track64 = u64::from(track);
    let len = ((track64 * u64::from(viewport) + u64::from(content) / 2) / u64::from(content))
        .clamp(1, track64);
    let max_offset = u64::from(content - viewport);
    let position = u64::try_from(offset.max(0)).unwrap_or(0).min(max_offset);
    let available = track64 - len;
    let start = (available * position + max_offset / 2) / max_offset;
    (
        i32::try_from(start).unwrap_or(i32::MAX),
        u32::try_from(len).unwrap_or(track),
    )
}
