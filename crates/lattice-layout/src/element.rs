//! The boundary between the layout engine and the widgets it arranges.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use lattice_core::geometry::{Axis, Rect};

use crate::AxisMetrics;

/// Process-unique identity of a laid-out element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId(u64);

static NEXT_ELEMENT_ID: AtomicU64 = AtomicU64::new(1);

impl ElementId {
    /// Allocate a fresh identifier.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_ELEMENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A widget as seen by the layout engine.
///
/// Implementations use interior mutability for [`Element::positioned`]; the
/// engine calls it at most once per recalculation pass, and only when the
/// element's rectangle changed.
pub trait Element: Send + Sync + fmt::Debug {
    fn id(&self) -> ElementId;

    /// Size requirements along `axis`.
    fn metrics(&self, axis: Axis) -> AxisMetrics;

    fn is_visible(&self) -> bool {
        true
    }

    /// Space along `axis` the element reserves for its own decorations
    /// (a viewport's scrollbar, for instance).
    fn fixed_overhead(&self, _axis: Axis) -> u32 {
        0
    }

    /// Called with the element's new rectangle.
    fn positioned(&self, _rect: Rect) {}
}

/// Shared handle to an element stored in a layout.
pub type ElementRef = Arc<dyn Element>;

/// Anything that can be stored as an [`ElementRef`]: a concrete `Arc<T>` or
/// an already type-erased handle.
pub trait IntoElementRef {
    fn into_element_ref(self) -> ElementRef;
}

impl<T: Element + 'static> IntoElementRef for Arc<T> {
    fn into_element_ref(self) -> ElementRef {
        self
    }
}

impl IntoElementRef for ElementRef {
    fn into_element_ref(self) -> ElementRef {
        self
    }
}

#[derive(Debug)]
struct CanvasState {
    horizontal: AxisMetrics,
    vertical: AxisMetrics,
    position: Option<Rect>,
}

/// A plain element with caller-supplied metrics.
///
/// Records where it was last positioned and how many times it was notified.
#[derive(Debug)]
pub struct Canvas {
    id: ElementId,
    state: Mutex<CanvasState>,
    visible: AtomicBool,
    notifications: AtomicUsize,
}

impl Canvas {
    #[must_use]
    pub fn new(horizontal: AxisMetrics, vertical: AxisMetrics) -> Self {
        Self {
            id: ElementId::next(),
            state: Mutex::new(CanvasState {
                horizontal,
                vertical,
                position: None,
            }),
            visible: AtomicBool::new(true),
            notifications: AtomicUsize::new(0),
        }
    }

    /// A canvas that is exactly `width` × `height`.
    #[must_use]
    pub fn fixed(width: u32, height: u32) -> Self {
        Self::new(AxisMetrics::exact(width), AxisMetrics::exact(height))
    }

    /// Wrap into a shareable [`ElementRef`].
    #[must_use]
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn set_metrics(&self, axis: Axis, metrics: AxisMetrics) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match axis {
            Axis::Horizontal => state.horizontal = metrics,
            Axis::Vertical => state.vertical = metrics,
        }
    }

    pub fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::Relaxed);
    }

    /// Rectangle from the most recent notification.
    pub fn position(&self) -> Option<Rect> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .position
    }

    /// Number of times the engine has repositioned this canvas.
    pub fn notifications(&self) -> usize {
        self.notifications.load(Ordering::Relaxed)
    }
}

impl Element for Canvas {
    fn id(&self) -> ElementId {
        self.id
    }

    fn metrics(&self, axis: Axis) -> AxisMetrics {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match axis {
            Axis::Horizontal => state.horizontal,
            Axis::Vertical => state.vertical,
        }
    }

    fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Relaxed)
    }

    fn positioned(&self, rect: Rect) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .position = Some(rect);
        self.notifications.fetch_add(1, Ordering::Relaxed);
    }
}
