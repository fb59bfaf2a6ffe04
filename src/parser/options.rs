//! Ordering options and configuration.

/// Default vertical tolerance for grouping blocks into one visual row.
///
/// Coordinates are page-relative, so this is half a percent of the page height.
pub const DEFAULT_Y_TOLERANCE: f32 = 0.005;

/// Options for the geometric orderer.
#[derive(Debug, Clone)]
pub struct OrderOptions {
    /// Blocks whose top edges differ by at most this much share a row band
    pub y_tolerance: f32,

    /// What to do with blocks that carry no geometry
    pub missing_geometry: MissingGeometry,
}

impl OrderOptions {
    /// Create new order options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the row tolerance. Negative values are treated as zero.
    pub fn with_y_tolerance(mut self, tolerance: f32) -> Self {
        self.y_tolerance = tolerance.max(0.0);
        self
    }

    /// Require exactly equal top edges for two blocks to share a row.
    pub fn exact(mut self) -> Self {
        self.y_tolerance = 0.0;
        self
    }

    /// Set the missing-geometry policy.
    pub fn with_missing_geometry(mut self, policy: MissingGeometry) -> Self {
        self.missing_geometry = policy;
        self
    }
}

impl Default for OrderOptions {
    fn default() -> Self {
        Self {
            y_tolerance: DEFAULT_Y_TOLERANCE,
            missing_geometry: MissingGeometry::Trailing,
        }
    }
}

/// Placement of blocks without a bounding box or polygon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingGeometry {
    /// Keep their original relative order, after every positioned sibling
    #[default]
    Trailing,
    /// Treat them as sitting at the top-left corner `(0, 0)`
    Origin,
}
