//! Continuous and grid geometry shared by the world and systems.

use serde::{Deserialize, Serialize};

/// Location in continuous world space measured in world units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldPoint {
    /// Horizontal coordinate.
    pub x: f32,
    /// Vertical coordinate.
    pub y: f32,
}

impl WorldPoint {
    /// Creates a new point from its coordinates.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to `other`.
    #[must_use]
    pub fn distance_sq(self, other: WorldPoint) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx * dx + dy * dy
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: WorldPoint) -> f32 {
        self.distance_sq(other).sqrt()
    }

    /// Linear interpolation toward `other`; `t` is clamped to `[0, 1]`.
    #[must_use]
    pub fn lerp(self, other: WorldPoint, t: f32) -> WorldPoint {
        let t = t.clamp(0.0, 1.0);
        WorldPoint::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }

    /// Moves toward `other` by at most `max_step` units without overshooting.
    #[must_use]
    pub fn step_toward(self, other: WorldPoint, max_step: f32) -> WorldPoint {
        let distance = self.distance(other);
        if distance <= max_step || distance <= f32::EPSILON {
            return other;
        }
        self.lerp(other, max_step / distance)
    }

    /// Reports whether both coordinates are finite.
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }
}

/// Describes the build grid laid over the map.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Number of cell columns.
    pub columns: u32,
    /// Number of cell rows.
    pub rows: u32,
    /// Side length of a square cell in world units.
    pub cell_size: f32,
}

impl GridSpec {
    /// Total width of the grid measured in world units.
    #[must_use]
    pub fn width(&self) -> f32 {
        self.columns as f32 * self.cell_size
    }

    /// Total height of the grid measured in world units.
    #[must_use]
    pub fn height(&self) -> f32 {
        self.rows as f32 * self.cell_size
    }

    /// Reports whether the cell lies within the grid.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.columns && cell.row() < self.rows
    }

    /// Reports whether the point lies within the grid bounds (inclusive).
    #[must_use]
    pub fn contains_point(&self, point: WorldPoint) -> bool {
        point.x >= 0.0 && point.y >= 0.0 && point.x <= self.width() && point.y <= self.height()
    }

    /// Centre of the provided cell in world units.
    #[must_use]
    pub fn cell_center(&self, cell: CellCoord) -> WorldPoint {
        WorldPoint::new(
            (cell.column() as f32 + 0.5) * self.cell_size,
            (cell.row() as f32 + 0.5) * self.cell_size,
        )
    }

    /// Cell containing the point, if the point lies within the grid.
    #[must_use]
    pub fn cell_at(&self, point: WorldPoint) -> Option<CellCoord> {
        if !self.contains_point(point) || self.cell_size <= 0.0 {
            return None;
        }
        let column = ((point.x / self.cell_size) as u32).min(self.columns.saturating_sub(1));
        let row = ((point.y / self.cell_size) as u32).min(self.rows.saturating_sub(1));
        Some(CellCoord::new(column, row))
    }
}

/// Static polyline that enemies follow, parameterised by arc length.
#[derive(Clone, Debug, PartialEq)]
pub struct WaypointPath {
    points: Vec<WorldPoint>,
    cumulative: Vec<f32>,
}

impl WaypointPath {
    /// Builds a path from ordered waypoints.
    ///
    /// Returns `None` when fewer than two waypoints are provided, when any
    /// coordinate is not finite, or when the total length is zero.
    #[must_use]
    pub fn new(points: Vec<WorldPoint>) -> Option<Self> {
        if points.len() < 2 || points.iter().any(|point| !point.is_finite()) {
            return None;
        }

        let mut cumulative = Vec::with_capacity(points.len());
        let mut total = 0.0_f32;
        cumulative.push(0.0);
        for pair in points.windows(2) {
            total += pair[0].distance(pair[1]);
            cumulative.push(total);
        }

        if total <= f32::EPSILON {
            return None;
        }

        Some(Self { points, cumulative })
    }

    /// Total arc length of the path.
    #[must_use]
    pub fn length(&self) -> f32 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    /// First waypoint, where enemies spawn.
    #[must_use]
    pub fn start(&self) -> WorldPoint {
        self.points[0]
    }

    /// Ordered waypoints.
    #[must_use]
    pub fn points(&self) -> &[WorldPoint] {
        &self.points
    }

    /// Position at the provided arc-length progress.
    ///
    /// Progress is clamped to `[0, length]` and interpolated linearly between
    /// the two waypoints that bracket it, so the mapping is continuous.
    #[must_use]
    pub fn position_at(&self, progress: f32) -> WorldPoint {
        let progress = progress.clamp(0.0, self.length());
        let segment = match self
            .cumulative
            .partition_point(|&distance| distance <= progress)
        {
            0 => 0,
            index => (index - 1).min(self.points.len() - 2),
        };

        let start = self.cumulative[segment];
        let span = self.cumulative[segment + 1] - start;
        if span <= f32::EPSILON {
            return self.points[segment + 1];
        }
        self.points[segment].lerp(self.points[segment + 1], (progress - start) / span)
    }

    /// Samples the path every `spacing` units, including both endpoints.
    pub fn sample(&self, spacing: f32) -> impl Iterator<Item = WorldPoint> + '_ {
        let length = self.length();
        let spacing = if spacing > 0.0 { spacing } else { length };
        let steps = (length / spacing).ceil() as u32;
        (0..=steps).map(move |step| self.position_at(step as f32 * spacing))
    }
}
