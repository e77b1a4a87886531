//! Border descriptors and the catalog that interns them.
//!
//! A border is specified either by theme name (`"thin_0%"`) or by explicit
//! geometry ([`BorderSpec`]). The [`BorderCatalog`] turns either form into a
//! [`BorderHandle`]: a shared, immutable [`Border`] whose derived footprint was
//! computed once at construction. Handles compare by value, so two cells that
//! independently ask for `"thin_0%"` are recognized as sharing a border.

use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Mutex, PoisonError};

/// Name that resolves to "no border".
pub const NO_BORDER: &str = "none";

/// Straight-alpha RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Self = Self::new(0, 0, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque gray at `percent` brightness (0 = black, 100 = white).
    #[must_use]
    pub fn gray(percent: u8) -> Self {
        let level = (u32::from(percent.min(100)) * 255 + 50) / 100;
        let level = u8::try_from(level).unwrap_or(u8::MAX);
        Self::new(level, level, level, 255)
    }
}

/// Explicit border geometry.
///
/// `width` is the thickness of vertical strokes, `height` of horizontal ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BorderSpec {
    pub width: u32,
    pub height: u32,
    pub hradius: u32,
    pub vradius: u32,
    /// Alternating on/off lengths; empty means solid.
    pub dashes: Vec<u32>,
    pub color: Rgba,
}

impl BorderSpec {
    /// Solid border of equal thickness in both directions.
    #[must_use]
    pub fn solid(thickness: u32, color: Rgba) -> Self {
        Self {
            width: thickness,
            height: thickness,
            color,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn radius(mut self, hradius: u32, vradius: u32) -> Self {
        self.hradius = hradius;
        self.vradius = vradius;
        self
    }

    #[must_use]
    pub fn dashes(mut self, dashes: impl IntoIterator<Item = u32>) -> Self {
        self.dashes = dashes.into_iter().collect();
        self
    }

    /// Parse a theme border name of the form `thin_N%`, `thick_N%`,
    /// `thin_dashed_N%` or `thick_dashed_N%`, where `N` is a gray level.
    pub fn from_theme_name(name: &str) -> Result<Self, BorderError> {
        let unknown = || BorderError::UnknownThemeBorder {
            name: name.to_string(),
        };
        let body = name.strip_suffix('%').ok_or_else(unknown)?;
        let (style, level) = body.rsplit_once('_').ok_or_else(unknown)?;
        let level: u8 = level.parse().map_err(|_| unknown())?;
        if level > 100 {
            return Err(unknown());
        }
        let color = Rgba::gray(level);
        let spec = match style {
            "thin" => Self::solid(1, color),
            "thick" => Self::solid(2, color),
            "thin_dashed" => Self::solid(1, color).dashes([3, 3]),
            "thick_dashed" => Self::solid(2, color).dashes([6, 6]),
            _ => return Err(unknown()),
        };
        Ok(spec)
    }
}

/// Immutable border descriptor with its derived footprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Border {
    spec: BorderSpec,
    calc_width: u32,
    calc_height: u32,
}

impl Border {
    /// Validate a spec and compute its footprint.
    ///
    /// A rounded corner needs room for its radius, so the horizontal
    /// footprint is `max(width, hradius)` and the vertical one
    /// `max(height, vradius)`.
    pub fn calculate(spec: BorderSpec) -> Result<Self, BorderError> {
        if spec.width == 0 && spec.height == 0 {
            return Err(BorderError::ZeroThickness);
        }
        if !spec.dashes.is_empty() && spec.dashes.iter().all(|&d| d == 0) {
            return Err(BorderError::InvalidDashPattern {
                dashes: spec.dashes.clone(),
            });
        }
        Ok(Self {
            calc_width: spec.width.max(spec.hradius),
            calc_height: spec.height.max(spec.vradius),
            spec,
        })
    }

    pub fn spec(&self) -> &BorderSpec {
        &self.spec
    }

    pub fn width(&self) -> u32 {
        self.spec.width
    }

    pub fn height(&self) -> u32 {
        self.spec.height
    }

    pub fn color(&self) -> Rgba {
        self.spec.color
    }

    pub fn dashes(&self) -> &[u32] {
        &self.spec.dashes
    }

    pub fn is_dashed(&self) -> bool {
        !self.spec.dashes.is_empty()
    }

    /// Horizontal space a vertical stroke of this border occupies.
    pub fn calc_width(&self) -> u32 {
        self.calc_width
    }

    /// Vertical space a horizontal stroke of this border occupies.
    pub fn calc_height(&self) -> u32 {
        self.calc_height
    }
}

/// Shared reference to an interned [`Border`]. Equality is by value.
#[derive(Debug, Clone)]
pub struct BorderHandle(Arc<Border>);

impl BorderHandle {
    pub fn new(border: Border) -> Self {
        Self(Arc::new(border))
    }
}

impl PartialEq for BorderHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || *self.0 == *other.0
    }
}

impl Eq for BorderHandle {}

impl std::hash::Hash for BorderHandle {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl Deref for BorderHandle {
    type Target = Border;

    fn deref(&self) -> &Border {
        &self.0
    }
}

/// How a caller names a border.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BorderSource {
    /// Theme border name, e.g. `"thin_0%"`; `"none"` means no border.
    Theme(String),
    Spec(BorderSpec),
    None,
}

impl From<&str> for BorderSource {
    fn from(name: &str) -> Self {
        Self::Theme(name.to_string())
    }
}

impl From<String> for BorderSource {
    fn from(name: String) -> Self {
        Self::Theme(name)
    }
}

impl From<BorderSpec> for BorderSource {
    fn from(spec: BorderSpec) -> Self {
        Self::Spec(spec)
    }
}

#[derive(Debug, Default)]
struct CatalogState {
    named: HashMap<String, BorderSpec>,
    interned: HashMap<BorderSpec, BorderHandle>,
}

/// Resolves border sources to interned descriptors.
///
/// Shared between layouts with an `Arc`; lookups take a short internal lock.
#[derive(Debug, Default)]
pub struct BorderCatalog {
    state: Mutex<CatalogState>,
}

impl BorderCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a custom theme border name.
    pub fn register(&self, name: impl Into<String>, spec: BorderSpec) -> Result<(), BorderError> {
        Border::calculate(spec.clone())?;
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.named.insert(name.into(), spec);
        Ok(())
    }

    /// Resolve a source; `Ok(None)` means "no border".
    pub fn resolve(
        &self,
        source: impl Into<BorderSource>,
    ) -> Result<Option<BorderHandle>, BorderError> {
        let spec = match source.into() {
            BorderSource::None => return Ok(None),
            BorderSource::Theme(name) if name == NO_BORDER => return Ok(None),
            BorderSource::Theme(name) => self.theme_spec(&name)?,
            BorderSource::Spec(spec) => spec,
        };
        self.intern(spec).map(Some)
    }

    /// Geometry behind a theme name.
    pub fn theme_spec(&self, name: &str) -> Result<BorderSpec, BorderError> {
        let registered = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .named
            .get(name)
            .cloned();
        match registered {
            Some(spec) => Ok(spec),
            None => BorderSpec::from_theme_name(name),
        }
    }

    /// Number of distinct descriptors created so far.
    pub fn interned_count(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .interned
            .len()
    }

    fn intern(&self, spec: BorderSpec) -> Result<BorderHandle, BorderError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = state.interned.get(&spec) {
            return Ok(handle.clone());
        }
        let handle = BorderHandle::new(Border::calculate(spec.clone())?);
        state.interned.insert(spec, handle.clone());
        Ok(handle)
    }
}

/// Border resolution failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BorderError {
    UnknownThemeBorder { name: String },
    ZeroThickness,
    InvalidDashPattern { dashes: Vec<u32> },
}

impl fmt::Display for BorderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownThemeBorder { name } => write!(f, "theme border \"{name}\" does not exist"),
            Self::ZeroThickness => write!(f, "border width and height are both zero"),
            Self::InvalidDashPattern { dashes } => {
                write!(f, "dash pattern {dashes:?} has no visible segments")
            }
        }
    }
}

impl std::error::Error for BorderError {}
