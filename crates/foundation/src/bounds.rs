use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in projected (unit square) space.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb2 {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl Aabb2 {
    pub fn new(min: [f64; 2], max: [f64; 2]) -> Self {
        Aabb2 { min, max }
    }

    pub fn from_point(p: [f64; 2]) -> Self {
        Aabb2 { min: p, max: p }
    }

    /// Square box of half-size `r` centered on `p`.
    pub fn around(p: [f64; 2], r: f64) -> Self {
        Aabb2::new([p[0] - r, p[1] - r], [p[0] + r, p[1] + r])
    }

    pub fn union(&self, other: &Aabb2) -> Aabb2 {
        Aabb2::new(
            [self.min[0].min(other.min[0]), self.min[1].min(other.min[1])],
            [self.max[0].max(other.max[0]), self.max[1].max(other.max[1])],
        )
    }

    /// Inclusive on every edge.
    pub fn contains(&self, p: [f64; 2]) -> bool {
        p[0] >= self.min[0] && p[0] <= self.max[0] && p[1] >= self.min[1] && p[1] <= self.max[1]
    }

    pub fn intersects(&self, other: &Aabb2) -> bool {
        self.min[0] <= other.max[0]
            && self.max[0] >= other.min[0]
            && self.min[1] <= other.max[1]
            && self.max[1] >= other.min[1]
    }
}

/// A geographic position in degrees (no projection correction).
#[derive(Copy, Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    pub fn is_valid(&self) -> bool {
        self.lng.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lng)
            && (-90.0..=90.0).contains(&self.lat)
    }
}

/// Geographic bounding box `[west, south, east, north]` in degrees.
///
/// `west > east` denotes a box crossing the antimeridian.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LngLatBounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl LngLatBounds {
    pub const WORLD: LngLatBounds = LngLatBounds {
        west: -180.0,
        south: -90.0,
        east: 180.0,
        north: 90.0,
    };

    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Normalize into one or two non-wrapping boxes.
    ///
    /// Longitudes are wrapped into `[-180, 180)` (an east edge of exactly 180 is
    /// kept), latitudes clamped to `[-90, 90]`. Boxes spanning 360 degrees or more
    /// become the full longitude range.
    pub fn split_antimeridian(&self) -> Vec<LngLatBounds> {
        let south = self.south.clamp(-90.0, 90.0);
        let north = self.north.clamp(-90.0, 90.0);

        if self.east - self.west >= 360.0 {
            return vec![LngLatBounds::new(-180.0, south, 180.0, north)];
        }

        let west = wrap_lng(self.west);
        let east = if self.east == 180.0 {
            180.0
        } else {
            wrap_lng(self.east)
        };

        if west > east {
            vec![
                LngLatBounds::new(west, south, 180.0, north),
                LngLatBounds::new(-180.0, south, east, north),
            ]
        } else {
            vec![LngLatBounds::new(west, south, east, north)]
        }
    }
}

impl Default for LngLatBounds {
    fn default() -> Self {
        LngLatBounds::WORLD
    }
}

/// Wrap a longitude into `[-180, 180)`.
pub fn wrap_lng(lng: f64) -> f64 {
    ((lng + 180.0) % 360.0 + 360.0) % 360.0 - 180.0
}
