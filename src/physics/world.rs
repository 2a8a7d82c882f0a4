//! Static level geometry queries
//!
//! The navigation core never simulates bodies. It only asks two questions of
//! the level: "is this box blocked" (grid build) and "what does a circle hit
//! when swept along this direction" (local steering).

use glam::Vec2;

/// Axis-aligned box in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec2,
    /// Maximum corner
    pub max: Vec2,
}

impl Aabb {
    /// Create a box from two corners (order does not matter)
    #[must_use]
    pub fn new(a: Vec2, b: Vec2) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Create a box from its center and half extents
    #[must_use]
    pub fn from_center(center: Vec2, half_extents: Vec2) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    /// Strict overlap test; boxes that only touch along an edge do not overlap
    #[must_use]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    /// Check whether a point lies inside the box (edges inclusive)
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Closest point of the box to `point`
    #[must_use]
    pub fn closest_point(&self, point: Vec2) -> Vec2 {
        point.clamp(self.min, self.max)
    }
}

/// Result of a swept circle query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CastHit {
    /// Distance travelled along the cast direction before contact
    pub distance: f32,
    /// Contact point on the obstacle surface
    pub point: Vec2,
    /// Obstacle surface normal at the contact, pointing away from the obstacle
    pub normal: Vec2,
}

/// Read-only view of the static level used by navigation.
///
/// Implemented by whatever owns the level collision data. The grid builder
/// and the fallback steering only ever go through this trait.
pub trait LevelGeometry: Send + Sync {
    /// Whether there is walkable floor under `point`
    fn has_floor(&self, _point: Vec2) -> bool {
        true
    }

    /// Whether any blocking obstacle overlaps the given box
    fn overlaps_box(&self, center: Vec2, half_extents: Vec2) -> bool;

    /// Sweep a circle from `origin` along unit `direction` for at most
    /// `max_distance` and report the first obstacle it touches
    fn cast_circle(
        &self,
        origin: Vec2,
        radius: f32,
        direction: Vec2,
        max_distance: f32,
    ) -> Option<CastHit>;
}

/// Level geometry made of axis-aligned wall boxes and optional floor regions.
///
/// When no floor region is registered the whole plane counts as floor.
#[derive(Debug, Clone, Default)]
pub struct StaticGeometry {
    walls: Vec<Aabb>,
    floor: Vec<Aabb>,
}

impl StaticGeometry {
    /// Create empty geometry (open floor everywhere)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a blocking wall box
    pub fn add_wall(&mut self, wall: Aabb) {
        self.walls.push(wall);
    }

    /// Add a floor region
    pub fn add_floor(&mut self, floor: Aabb) {
        self.floor.push(floor);
    }

    /// Builder-style [`Self::add_wall`]
    #[must_use]
    pub fn with_wall(mut self, wall: Aabb) -> Self {
        self.add_wall(wall);
        self
    }

    /// Builder-style [`Self::add_floor`]
    #[must_use]
    pub fn with_floor(mut self, floor: Aabb) -> Self {
        self.add_floor(floor);
        self
    }

    /// Build geometry from a text map.
    ///
    /// `#` is a wall tile, a space is a hole without floor, anything else is
    /// open floor. The first row is the northernmost (highest y). Consecutive
    /// tiles of the same kind on a row are merged into one box.
    #[must_use]
    pub fn from_ascii(rows: &[&str], origin: Vec2, cell_size: f32) -> Self {
        let mut geometry = Self::new();
        let height = rows.len();

        for (row_index, row) in rows.iter().enumerate() {
            let y = (height - 1 - row_index) as f32;
            let tiles: Vec<char> = row.chars().collect();

            let mut x = 0;
            while x < tiles.len() {
                let kind = tiles[x];
                let run_start = x;
                while x < tiles.len() && tiles[x] == kind {
                    x += 1;
                }

                let min = origin + Vec2::new(run_start as f32, y) * cell_size;
                let max = origin + Vec2::new(x as f32, y + 1.0) * cell_size;
                let tile_box = Aabb::new(min, max);

                match kind {
                    ' ' => {}
                    '#' => {
                        geometry.add_wall(tile_box);
                        geometry.add_floor(tile_box);
                    }
                    _ => geometry.add_floor(tile_box),
                }
            }
        }

        geometry
    }

    /// Wall boxes
    #[must_use]
    pub fn walls(&self) -> &[Aabb] {
        &self.walls
    }
}

impl LevelGeometry for StaticGeometry {
    fn has_floor(&self, point: Vec2) -> bool {
        self.floor.is_empty() || self.floor.iter().any(|region| region.contains(point))
    }

    fn overlaps_box(&self, center: Vec2, half_extents: Vec2) -> bool {
        let probe = Aabb::from_center(center, half_extents);
        self.walls.iter().any(|wall| wall.overlaps(&probe))
    }

    fn cast_circle(
        &self,
        origin: Vec2,
        radius: f32,
        direction: Vec2,
        max_distance: f32,
    ) -> Option<CastHit> {
        let direction = direction.normalize_or_zero();
        if direction == Vec2::ZERO {
            return None;
        }

        self.walls
            .iter()
            .filter_map(|wall| sweep_circle_aabb(origin, radius, direction, max_distance, wall))
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

/// Swept circle against a single box.
///
/// The circle hits the box exactly when its center ray hits the box grown by
/// `radius` with rounded corners: two slabs plus four corner discs.
fn sweep_circle_aabb(
    origin: Vec2,
    radius: f32,
    direction: Vec2,
    max_distance: f32,
    wall: &Aabb,
) -> Option<CastHit> {
    let closest = wall.closest_point(origin);
    let offset = origin - closest;
    if offset.length_squared() < radius * radius {
        // Already touching at the start of the sweep
        let normal = offset.try_normalize().unwrap_or(-direction);
        return Some(CastHit {
            distance: 0.0,
            point: closest,
            normal,
        });
    }

    let grow_x = Aabb::new(
        wall.min - Vec2::new(radius, 0.0),
        wall.max + Vec2::new(radius, 0.0),
    );
    let grow_y = Aabb::new(
        wall.min - Vec2::new(0.0, radius),
        wall.max + Vec2::new(0.0, radius),
    );

    let corners = [
        wall.min,
        Vec2::new(wall.max.x, wall.min.y),
        wall.max,
        Vec2::new(wall.min.x, wall.max.y),
    ];

    let mut best: Option<(f32, Vec2)> = None;
    let mut consider = |t: f32, normal: Vec2| {
        if t <= max_distance && best.is_none_or(|(best_t, _)| t < best_t) {
            best = Some((t, normal));
        }
    };

    for slab in [grow_x, grow_y] {
        if let Some((t, normal)) = ray_aabb(origin, direction, &slab) {
            consider(t, normal);
        }
    }
    for corner in corners {
        if let Some(t) = ray_circle(origin, direction, corner, radius) {
            let normal = (origin + direction * t - corner).normalize_or_zero();
            consider(t, normal);
        }
    }

    best.map(|(distance, normal)| {
        let center = origin + direction * distance;
        CastHit {
            distance,
            point: wall.closest_point(center),
            normal,
        }
    })
}

/// Slab test. Returns entry distance and the normal of the entered face.
fn ray_aabb(origin: Vec2, direction: Vec2, aabb: &Aabb) -> Option<(f32, Vec2)> {
    let mut t_enter = f32::NEG_INFINITY;
    let mut t_exit = f32::INFINITY;
    let mut normal = Vec2::ZERO;

    for axis in 0..2 {
        let (o, d, lo, hi) = (origin[axis], direction[axis], aabb.min[axis], aabb.max[axis]);

        if d.abs() < f32::EPSILON {
            if o < lo || o > hi {
                return None;
            }
            continue;
        }

        let t1 = (lo - o) / d;
        let t2 = (hi - o) / d;
        let (near, far) = if t1 < t2 { (t1, t2) } else { (t2, t1) };

        if near > t_enter {
            t_enter = near;
            normal = Vec2::ZERO;
            normal[axis] = -d.signum();
        }
        t_exit = t_exit.min(far);
    }

    if t_enter > t_exit || t_exit < 0.0 {
        return None;
    }

    Some((t_enter.max(0.0), normal))
}

/// Entry distance of a unit ray into a circle
fn ray_circle(origin: Vec2, direction: Vec2, center: Vec2, radius: f32) -> Option<f32> {
    let m = origin - center;
    let b = m.dot(direction);
    let c = m.length_squared() - radius * radius;

    if c > 0.0 && b > 0.0 {
        return None;
    }

    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }

    Some((-b - discriminant.sqrt()).max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_wall_at(x: f32, y: f32) -> Aabb {
        Aabb::new(Vec2::new(x, y), Vec2::new(x + 1.0, y + 1.0))
    }

    #[test]
    fn test_touching_boxes_do_not_overlap() {
        let a = unit_wall_at(0.0, 0.0);
        let b = unit_wall_at(1.0, 0.0);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&Aabb::from_center(Vec2::new(1.0, 0.5), Vec2::splat(0.1))));
    }

    #[test]
    fn test_overlaps_box_with_shrunk_probe() {
        let geometry = StaticGeometry::new().with_wall(unit_wall_at(2.0, 0.0));

        // Neighbouring cell probed at 98% does not see the wall
        assert!(!geometry.overlaps_box(Vec2::new(1.5, 0.5), Vec2::splat(0.49)));
        assert!(geometry.overlaps_box(Vec2::new(2.5, 0.5), Vec2::splat(0.49)));
    }

    #[test]
    fn test_floor_defaults_to_everywhere() {
        let open = StaticGeometry::new();
        assert!(open.has_floor(Vec2::new(-100.0, 42.0)));

        let floored = StaticGeometry::new().with_floor(unit_wall_at(0.0, 0.0));
        assert!(floored.has_floor(Vec2::new(0.5, 0.5)));
        assert!(!floored.has_floor(Vec2::new(3.5, 0.5)));
    }

    #[test]
    fn test_cast_circle_hits_face() {
        let geometry = StaticGeometry::new().with_wall(unit_wall_at(3.0, 0.0));

        let hit = geometry
            .cast_circle(Vec2::new(0.5, 0.5), 0.5, Vec2::X, 5.0)
            .unwrap();

        assert!((hit.distance - 2.0).abs() < 1e-4);
        assert!((hit.normal - Vec2::NEG_X).length() < 1e-4);
    }

    #[test]
    fn test_cast_circle_out_of_range() {
        let geometry = StaticGeometry::new().with_wall(unit_wall_at(3.0, 0.0));
        assert!(
            geometry
                .cast_circle(Vec2::new(0.5, 0.5), 0.5, Vec2::X, 1.0)
                .is_none()
        );
        // Moving away from the wall
        assert!(
            geometry
                .cast_circle(Vec2::new(0.5, 0.5), 0.5, Vec2::NEG_X, 10.0)
                .is_none()
        );
    }

    #[test]
    fn test_cast_circle_rounded_corner() {
        let geometry = StaticGeometry::new().with_wall(unit_wall_at(0.0, 0.0));

        // Travel diagonally toward the (1, 1) corner
        let direction = Vec2::new(-1.0, -1.0).normalize();
        let hit = geometry
            .cast_circle(Vec2::new(3.0, 3.0), 0.5, direction, 10.0)
            .unwrap();

        let expected = Vec2::new(3.0, 3.0).distance(Vec2::ONE) - 0.5;
        assert!((hit.distance - expected).abs() < 1e-3);
        assert!((hit.normal - Vec2::ONE.normalize()).length() < 1e-3);
    }

    #[test]
    fn test_cast_circle_starting_in_contact() {
        let geometry = StaticGeometry::new().with_wall(unit_wall_at(1.0, 0.0));
        let hit = geometry
            .cast_circle(Vec2::new(0.8, 0.5), 0.45, Vec2::X, 1.0)
            .unwrap();

        assert_eq!(hit.distance, 0.0);
        assert!((hit.normal - Vec2::NEG_X).length() < 1e-4);
    }

    #[test]
    fn test_from_ascii_layout() {
        let geometry = StaticGeometry::from_ascii(&["##.", ". ."], Vec2::ZERO, 1.0);

        // One merged wall run on the north row
        assert_eq!(geometry.walls().len(), 1);
        assert!(geometry.overlaps_box(Vec2::new(0.5, 1.5), Vec2::splat(0.49)));
        assert!(geometry.overlaps_box(Vec2::new(1.5, 1.5), Vec2::splat(0.49)));
        assert!(!geometry.overlaps_box(Vec2::new(2.5, 1.5), Vec2::splat(0.49)));

        // The hole on the south row has no floor
        assert!(!geometry.has_floor(Vec2::new(1.5, 0.5)));
        assert!(geometry.has_floor(Vec2::new(0.5, 0.5)));
    }
}
