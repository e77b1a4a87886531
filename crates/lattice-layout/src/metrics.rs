//! One-axis size requirements.

/// Minimum / preferred / maximum extent along one axis.
///
/// `maximum == None` means unbounded. Constructors normalize so that
/// `minimum <= preferred <= maximum`.
///
/// ```
/// use lattice_layout::AxisMetrics;
///
/// let label = AxisMetrics::new(5, 15, Some(20));
/// assert_eq!(label.clamp(10), 10);
/// assert_eq!(label.clamp(3), 5);
/// assert_eq!(label.clamp(30), 20);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AxisMetrics {
    pub minimum: u32,
    pub preferred: u32,
    pub maximum: Option<u32>,
}

impl AxisMetrics {
    /// No minimum, no preference, unbounded.
    pub const ZERO: Self = Self {
        minimum: 0,
        preferred: 0,
        maximum: None,
    };

    /// Create a normalized triple.
    #[must_use]
    pub fn new(minimum: u32, preferred: u32, maximum: Option<u32>) -> Self {
        Self {
            minimum,
            preferred,
            maximum,
        }
        .normalized()
    }

    /// `minimum == preferred == maximum == size`.
    #[inline]
    #[must_use]
    pub const fn exact(size: u32) -> Self {
        Self {
            minimum: size,
            preferred: size,
            maximum: Some(size),
        }
    }

    /// Bounded below, unbounded above.
    #[must_use]
    pub fn at_least(minimum: u32, preferred: u32) -> Self {
        Self::new(minimum, preferred, None)
    }

    /// Restore `minimum <= preferred <= maximum`.
    #[must_use]
    pub fn normalized(self) -> Self {
        let preferred = self.preferred.max(self.minimum);
        Self {
            minimum: self.minimum,
            preferred,
            maximum: self.maximum.map(|max| max.max(preferred)),
        }
    }

    /// Clamp a value into `[minimum, maximum]`.
    #[inline]
    pub fn clamp(&self, value: u32) -> u32 {
        value.max(self.minimum).min(self.maximum.unwrap_or(u32::MAX))
    }

    /// Whether the maximum is unbounded.
    #[inline]
    pub const fn is_unbounded(&self) -> bool {
        self.maximum.is_none()
    }

    /// Requirement satisfying both `self` and `other` when they share a track.
    #[must_use]
    pub fn combine(self, other: Self) -> Self {
        let maximum = match (self.maximum, other.maximum) {
            (Some(a), Some(b)) => Some(a.max(b)),
            _ => None,
        };
        Self {
            minimum: self.minimum.max(other.minimum),
            preferred: self.preferred.max(other.preferred),
            maximum,
        }
        .normalized()
    }

    /// Requirement of `self` and `other` laid end to end.
    #[must_use]
    pub fn sum(self, other: Self) -> Self {
        let maximum = match (self.maximum, other.maximum) {
            (Some(a), Some(b)) => Some(a.saturating_add(b)),
            _ => None,
        };
        Self {
            minimum: self.minimum.saturating_add(other.minimum),
            preferred: self.preferred.saturating_add(other.preferred),
            maximum,
        }
    }

    /// Add a fixed amount (padding, border thickness) to every bound.
    #[must_use]
    pub fn grow(self, amount: u32) -> Self {
        Self {
            minimum: self.minimum.saturating_add(amount),
            preferred: self.preferred.saturating_add(amount),
            maximum: self.maximum.map(|m| m.saturating_add(amount)),
        }
    }
}

/// Sum of extents, stopping at `u32::MAX`.
pub(crate) fn saturating_total(extents: impl IntoIterator<Item = u32>) -> u32 {
    extents.into_iter().fold(0u32, u32::saturating_add)
}
