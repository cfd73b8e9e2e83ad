//! Unit Web-Mercator projection.
//!
//! Longitude/latitude in degrees map onto the unit square `[0, 1] x [0, 1]`,
//! with `x` growing eastward from the antimeridian and `y` growing southward
//! from the north edge. Latitudes beyond the Mercator limit clamp to the edge.

use std::f64::consts::PI;

use super::Vec2;
use crate::bounds::LngLat;

/// Projected x for a longitude in degrees.
pub fn lng_to_x(lng_deg: f64) -> f64 {
    lng_deg / 360.0 + 0.5
}

/// Projected y for a latitude in degrees, clamped to `[0, 1]`.
pub fn lat_to_y(lat_deg: f64) -> f64 {
    let sin = (lat_deg * PI / 180.0).sin();
    let y = 0.5 - 0.25 * ((1.0 + sin) / (1.0 - sin)).ln() / PI;
    // Poles produce +/-inf before the clamp; NaN never escapes because sin is finite.
    y.clamp(0.0, 1.0)
}

pub fn x_to_lng(x: f64) -> f64 {
    (x - 0.5) * 360.0
}

pub fn y_to_lat(y: f64) -> f64 {
    let y2 = (180.0 - y * 360.0) * PI / 180.0;
    360.0 * y2.exp().atan() / PI - 90.0
}

pub fn project(p: LngLat) -> Vec2 {
    Vec2::new(lng_to_x(p.lng), lat_to_y(p.lat))
}

pub fn unproject(v: Vec2) -> LngLat {
    LngLat::new(x_to_lng(v.x), y_to_lat(v.y))
}

#[cfg(test)]
mod tests {
    use super::{lat_to_y, lng_to_x, project, unproject, x_to_lng, y_to_lat};
    use crate::bounds::LngLat;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn origin_projects_to_center() {
        assert_close(lng_to_x(0.0), 0.5, 1e-12);
        assert_close(lat_to_y(0.0), 0.5, 1e-12);
    }

    #[test]
    fn extremes_clamp_to_unit_square() {
        assert_close(lng_to_x(-180.0), 0.0, 1e-12);
        assert_close(lng_to_x(180.0), 1.0, 1e-12);
        assert_eq!(lat_to_y(90.0), 0.0);
        assert_eq!(lat_to_y(-90.0), 1.0);
        assert_eq!(lat_to_y(89.9), 0.0);
    }

    #[test]
    fn north_is_up() {
        assert!(lat_to_y(45.0) < lat_to_y(0.0));
        assert!(lat_to_y(-45.0) > lat_to_y(0.0));
    }

    #[test]
    fn round_trip_within_mercator_range() {
        let p = LngLat::new(139.6503, 35.6762);
        let back = unproject(project(p));
        assert_close(back.lng, p.lng, 1e-9);
        assert_close(back.lat, p.lat, 1e-9);
        assert_close(x_to_lng(lng_to_x(-74.006)), -74.006, 1e-9);
        assert_close(y_to_lat(lat_to_y(-33.8688)), -33.8688, 1e-9);
    }
}
