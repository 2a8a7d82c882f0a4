//! Walkability grid
//!
//! A static boolean occupancy grid built once from level geometry. All agents
//! share one grid read-only; runtime searches only do O(1) lookups.

use std::fmt;

use glam::Vec2;
use log::info;
use serde::{Deserialize, Serialize};

use crate::physics::LevelGeometry;

/// Largest number of cells a grid may hold
const MAX_CELLS: u64 = 1 << 26;

/// Largest radius [`Cell::ring`] walks
pub const MAX_RING_RADIUS: u32 = (i32::MAX / 4) as u32;

/// Integer grid coordinate. `+y` points north.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    /// Create a cell
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Cell displaced by `(dx, dy)`, wrapping at the `i32` limits
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x.wrapping_add(dx), self.y.wrapping_add(dy))
    }

    /// Manhattan distance
    #[must_use]
    pub fn manhattan(self, other: Cell) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Chebyshev distance
    #[must_use]
    pub fn chebyshev(self, other: Cell) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// Whether `other` is one of the 8 neighbours
    #[must_use]
    pub fn is_adjacent(self, other: Cell) -> bool {
        self.chebyshev(other) == 1
    }

    /// Cells at exactly Manhattan distance `radius`, as a diamond ring.
    ///
    /// Order is deterministic: starts due north and walks clockwise
    /// (north, east, south, west for radius 1). Radius 0 yields the cell itself.
    /// Radii beyond [`MAX_RING_RADIUS`] are clamped to it.
    pub fn ring(self, radius: u32) -> impl Iterator<Item = Cell> {
        let r = radius.min(MAX_RING_RADIUS) as i32;
        let count = if r == 0 { 1 } else { 4 * r };

        (0..count).map(move |k| {
            if r == 0 {
                return self;
            }
            let (side, i) = (k / r, k % r);
            let (dx, dy) = match side {
                0 => (i, r - i),
                1 => (r - i, -i),
                2 => (-i, -(r - i)),
                _ => (-(r - i), i),
            };
            self.offset(dx, dy)
        })
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Rectangular block of cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellBounds {
    /// South-west cell
    pub min: Cell,
    /// Width in cells
    pub width: u32,
    /// Height in cells
    pub height: u32,
}

impl CellBounds {
    /// Create bounds
    #[must_use]
    pub const fn new(min: Cell, width: u32, height: u32) -> Self {
        Self { min, width, height }
    }

    /// Number of cells covered
    #[must_use]
    pub fn len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Whether the bounds cover no cells
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Check if a cell lies within the bounds
    #[must_use]
    pub fn contains(&self, cell: Cell) -> bool {
        self.index_of(cell).is_some()
    }

    /// Dense row-major index of a cell, if in bounds
    #[must_use]
    pub fn index_of(&self, cell: Cell) -> Option<usize> {
        let ix = i64::from(cell.x) - i64::from(self.min.x);
        let iy = i64::from(cell.y) - i64::from(self.min.y);

        if ix < 0 || iy < 0 || ix >= i64::from(self.width) || iy >= i64::from(self.height) {
            return None;
        }

        Some(iy as usize * self.width as usize + ix as usize)
    }

    /// All cells, row by row from the south-west corner
    pub fn iter(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.height as i32).flat_map(move |iy| {
            (0..self.width as i32).map(move |ix| self.min.offset(ix, iy))
        })
    }
}

impl Default for CellBounds {
    fn default() -> Self {
        Self::new(Cell::new(0, 0), 64, 64)
    }
}

/// Settings the grid is built from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    /// World position of the south-west corner of cell (0, 0)
    pub origin: Vec2,
    /// Cell edge length in world units
    pub cell_size: f32,
    /// Region of cells to build
    pub bounds: CellBounds,
    /// Probe box size relative to the cell when sampling obstacles
    pub probe_scale: f32,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            origin: Vec2::ZERO,
            cell_size: 1.0,
            bounds: CellBounds::default(),
            probe_scale: 0.98,
        }
    }
}

impl GridSettings {
    /// Check the settings describe a buildable grid
    ///
    /// # Errors
    ///
    /// Returns the first problem found
    pub fn validate(&self) -> Result<(), GridError> {
        if !self.cell_size.is_finite() || self.cell_size <= 0.0 {
            return Err(GridError::InvalidCellSize(self.cell_size));
        }
        if !self.origin.is_finite() {
            return Err(GridError::NonFiniteOrigin);
        }
        if !(self.probe_scale > 0.0 && self.probe_scale <= 1.0) {
            return Err(GridError::InvalidProbeScale(self.probe_scale));
        }
        validate_dimensions(self.bounds.width, self.bounds.height)
    }
}

fn validate_dimensions(width: u32, height: u32) -> Result<(), GridError> {
    if width == 0 || height == 0 {
        return Err(GridError::EmptyBounds { width, height });
    }
    if u64::from(width) * u64::from(height) > MAX_CELLS {
        return Err(GridError::TooLarge { width, height });
    }
    Ok(())
}

/// Setup errors for grid construction
#[derive(Debug, Clone, PartialEq)]
pub enum GridError {
    /// Cell size is zero, negative or not finite
    InvalidCellSize(f32),
    /// Bounds cover no cells
    EmptyBounds { width: u32, height: u32 },
    /// Bounds exceed the supported cell count
    TooLarge { width: u32, height: u32 },
    /// Probe scale outside (0, 1]
    InvalidProbeScale(f32),
    /// Origin has a NaN or infinite component
    NonFiniteOrigin,
    /// Text map rows are ragged
    MalformedMap(String),
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCellSize(size) => write!(f, "Invalid cell size: {size}"),
            Self::EmptyBounds { width, height } => {
                write!(f, "Grid bounds are empty: {width}x{height}")
            }
            Self::TooLarge { width, height } => {
                write!(f, "Grid bounds too large: {width}x{height}")
            }
            Self::InvalidProbeScale(scale) => write!(f, "Probe scale must be in (0, 1]: {scale}"),
            Self::NonFiniteOrigin => write!(f, "Grid origin is not finite"),
            Self::MalformedMap(e) => write!(f, "Malformed map: {e}"),
        }
    }
}

impl std::error::Error for GridError {}

/// Static walkability grid
#[derive(Debug, Clone)]
pub struct WalkabilityGrid {
    bounds: CellBounds,
    origin: Vec2,
    cell_size: f32,
    /// Walkable cells (true = walkable), row-major relative to `bounds.min`
    cells: Vec<bool>,
}

impl WalkabilityGrid {
    /// Sample the level geometry once per cell.
    ///
    /// A cell is walkable when its center has floor and a box of
    /// `cell_size * probe_scale` around the center touches no obstacle.
    ///
    /// # Errors
    ///
    /// Returns an error for degenerate settings
    pub fn build(settings: &GridSettings, geometry: &dyn LevelGeometry) -> Result<Self, GridError> {
        settings.validate()?;

        let mut grid = Self {
            bounds: settings.bounds,
            origin: settings.origin,
            cell_size: settings.cell_size,
            cells: vec![false; settings.bounds.len()],
        };

        let half_extents = Vec2::splat(settings.cell_size * settings.probe_scale * 0.5);

        for (index, cell) in settings.bounds.iter().enumerate() {
            let center = grid.cell_to_world_center(cell);
            grid.cells[index] =
                geometry.has_floor(center) && !geometry.overlaps_box(center, half_extents);
        }

        info!(
            "Built walkability grid {}x{} at {}: {} walkable cells",
            grid.bounds.width,
            grid.bounds.height,
            grid.bounds.min,
            grid.walkable_count()
        );

        Ok(grid)
    }

    /// Build a grid from a text map.
    ///
    /// `#` and space are blocked, anything else is walkable. The first row is
    /// the northernmost; cell (0, 0) is the first character of the last row.
    ///
    /// # Errors
    ///
    /// Returns an error if rows differ in length or the settings are degenerate
    pub fn from_ascii(rows: &[&str], origin: Vec2, cell_size: f32) -> Result<Self, GridError> {
        let width = rows.first().map_or(0, |row| row.chars().count());
        if let Some((index, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.chars().count() != width)
        {
            return Err(GridError::MalformedMap(format!(
                "row {index} has {} columns, expected {width}",
                row.chars().count()
            )));
        }

        let settings = GridSettings {
            origin,
            cell_size,
            bounds: CellBounds::new(Cell::new(0, 0), width as u32, rows.len() as u32),
            ..GridSettings::default()
        };
        settings.validate()?;

        let mut cells = Vec::with_capacity(settings.bounds.len());
        for row in rows.iter().rev() {
            cells.extend(row.chars().map(|c| c != '#' && c != ' '));
        }

        Ok(Self {
            bounds: settings.bounds,
            origin,
            cell_size,
            cells,
        })
    }

    /// Check if a cell is walkable; anything outside the bounds is not
    #[inline]
    #[must_use]
    pub fn is_walkable(&self, cell: Cell) -> bool {
        self.bounds
            .index_of(cell)
            .is_some_and(|index| self.cells[index])
    }

    /// Convert a world position to the cell containing it
    #[must_use]
    pub fn world_to_cell(&self, pos: Vec2) -> Cell {
        let local = (pos - self.origin) / self.cell_size;
        Cell::new(local.x.floor() as i32, local.y.floor() as i32)
    }

    /// World position of a cell's center
    #[must_use]
    pub fn cell_to_world_center(&self, cell: Cell) -> Vec2 {
        self.origin + (Vec2::new(cell.x as f32, cell.y as f32) + 0.5) * self.cell_size
    }

    /// Grid bounds
    #[must_use]
    pub fn bounds(&self) -> CellBounds {
        self.bounds
    }

    /// Cell size in world units
    #[must_use]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// World origin
    #[must_use]
    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    /// Number of walkable cells
    #[must_use]
    pub fn walkable_count(&self) -> usize {
        self.cells.iter().filter(|&&walkable| walkable).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{Aabb, StaticGeometry};

    const MAP: [&str; 4] = [
        "#.....", //
        "..##..", //
        ".. #..", //
        "......", //
    ];

    #[test]
    fn test_out_of_bounds_is_blocked() {
        let grid = WalkabilityGrid::from_ascii(&["...", "...", "..."], Vec2::ZERO, 1.0).unwrap();

        for radius in 2..6 {
            for cell in Cell::new(1, 1).ring(radius) {
                if !grid.bounds().contains(cell) {
                    assert!(!grid.is_walkable(cell), "{cell} should be blocked");
                }
            }
        }
        assert!(!grid.is_walkable(Cell::new(-1, 0)));
        assert!(!grid.is_walkable(Cell::new(3, 0)));
        assert!(!grid.is_walkable(Cell::new(i32::MAX, i32::MIN)));
        assert!(grid.is_walkable(Cell::new(2, 2)));
    }

    #[test]
    fn test_from_ascii_orientation() {
        let grid = WalkabilityGrid::from_ascii(&MAP, Vec2::ZERO, 1.0).unwrap();

        assert_eq!(grid.bounds(), CellBounds::new(Cell::new(0, 0), 6, 4));
        // First row is north
        assert!(!grid.is_walkable(Cell::new(0, 3)));
        assert!(grid.is_walkable(Cell::new(0, 0)));
        assert!(!grid.is_walkable(Cell::new(2, 2)));
        assert!(!grid.is_walkable(Cell::new(2, 1)));
        assert_eq!(grid.walkable_count(), 24 - 5);
    }

    #[test]
    fn test_build_matches_ascii_map() {
        let geometry = StaticGeometry::from_ascii(&MAP, Vec2::ZERO, 1.0);
        let settings = GridSettings {
            bounds: CellBounds::new(Cell::new(0, 0), 6, 4),
            ..GridSettings::default()
        };

        let built = WalkabilityGrid::build(&settings, &geometry).unwrap();
        let ascii = WalkabilityGrid::from_ascii(&MAP, Vec2::ZERO, 1.0).unwrap();

        for cell in settings.bounds.iter() {
            assert_eq!(built.is_walkable(cell), ascii.is_walkable(cell), "{cell}");
        }
    }

    #[test]
    fn test_build_with_offset_origin_and_cell_size() {
        let geometry = StaticGeometry::new().with_wall(Aabb::new(
            Vec2::new(-8.0, -8.0),
            Vec2::new(-6.0, -6.0),
        ));
        let settings = GridSettings {
            origin: Vec2::new(-10.0, -10.0),
            cell_size: 2.0,
            bounds: CellBounds::new(Cell::new(0, 0), 4, 4),
            probe_scale: 0.98,
        };

        let grid = WalkabilityGrid::build(&settings, &geometry).unwrap();

        assert!(!grid.is_walkable(Cell::new(1, 1)));
        assert!(grid.is_walkable(Cell::new(0, 1)));
        assert!(grid.is_walkable(Cell::new(2, 1)));
        assert_eq!(grid.walkable_count(), 15);
    }

    #[test]
    fn test_world_cell_round_trip() {
        let grid = WalkabilityGrid::from_ascii(&["...."], Vec2::new(-3.0, 5.0), 0.5).unwrap();

        for x in -4..8 {
            for y in -4..8 {
                let cell = Cell::new(x, y);
                assert_eq!(grid.world_to_cell(grid.cell_to_world_center(cell)), cell);
            }
        }
        assert_eq!(grid.world_to_cell(Vec2::new(-3.01, 5.0)), Cell::new(-1, 0));
        assert_eq!(grid.cell_to_world_center(Cell::new(0, 0)), Vec2::new(-2.75, 5.25));
    }

    #[test]
    fn test_degenerate_settings_fail() {
        let open = StaticGeometry::new();

        let zero_size = GridSettings {
            cell_size: 0.0,
            ..GridSettings::default()
        };
        assert_eq!(
            WalkabilityGrid::build(&zero_size, &open).unwrap_err(),
            GridError::InvalidCellSize(0.0)
        );

        let empty = GridSettings {
            bounds: CellBounds::new(Cell::new(0, 0), 0, 10),
            ..GridSettings::default()
        };
        assert!(matches!(
            WalkabilityGrid::build(&empty, &open),
            Err(GridError::EmptyBounds { .. })
        ));

        let bad_probe = GridSettings {
            probe_scale: 1.5,
            ..GridSettings::default()
        };
        assert!(matches!(
            bad_probe.validate(),
            Err(GridError::InvalidProbeScale(_))
        ));

        assert!(matches!(
            WalkabilityGrid::from_ascii(&["...", ".."], Vec2::ZERO, 1.0),
            Err(GridError::MalformedMap(_))
        ));
        assert!(matches!(
            WalkabilityGrid::from_ascii(&[], Vec2::ZERO, 1.0),
            Err(GridError::EmptyBounds { .. })
        ));
    }

    #[test]
    fn test_ring_order_and_size() {
        let center = Cell::new(5, 5);

        let first: Vec<Cell> = center.ring(1).collect();
        assert_eq!(
            first,
            vec![
                Cell::new(5, 6),
                Cell::new(6, 5),
                Cell::new(5, 4),
                Cell::new(4, 5)
            ]
        );

        for radius in 1..6 {
            let cells: Vec<Cell> = center.ring(radius).collect();
            assert_eq!(cells.len(), 4 * radius as usize);
            assert!(cells.iter().all(|c| c.manhattan(center) == radius));

            let mut unique = cells.clone();
            unique.sort();
            unique.dedup();
            assert_eq!(unique.len(), cells.len());
        }

        assert_eq!(center.ring(0).collect::<Vec<_>>(), vec![center]);
    }

    #[test]
    fn test_ring_at_coordinate_limits() {
        let grid = WalkabilityGrid::from_ascii(&["..."], Vec2::ZERO, 1.0).unwrap();

        // Far-away targets saturate to the i32 limits
        let far = grid.world_to_cell(Vec2::splat(1e12));
        assert_eq!(far, Cell::new(i32::MAX, i32::MAX));

        let cells: Vec<Cell> = far.ring(2).collect();
        assert_eq!(cells.len(), 8);
        assert!(cells.iter().all(|&cell| !grid.is_walkable(cell)));

        assert_eq!(
            Cell::new(0, 0).ring(u32::MAX).next(),
            Some(Cell::new(0, MAX_RING_RADIUS as i32))
        );
    }
}
