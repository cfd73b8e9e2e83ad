//! Camera altitude <-> index zoom level.
//!
//! Altitude is in globe-radius units as the renderer reports it (smaller is
//! closer). The mapping is a lossy heuristic: `altitude_from_zoom` and
//! `zoom_from_altitude` round-trip only to within one zoom band.

use serde::{Deserialize, Serialize};

/// Altitude at which zoom level 0 applies.
pub const REFERENCE_ALTITUDE: f64 = 5.0;
/// At or below this altitude every pin renders individually.
pub const CLUSTER_DISABLE_ALTITUDE: f64 = 0.5;
pub const MAX_ZOOM_LEVEL: u8 = 20;
/// Non-positive altitudes are clamped to this before taking the logarithm.
pub const MIN_ALTITUDE: f64 = 1e-6;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LevelOfDetail {
    Clustered { zoom: u8 },
    Individual,
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomMapper {
    pub reference_altitude: f64,
    pub cluster_disable_altitude: f64,
    pub max_zoom_level: u8,
    pub min_altitude: f64,
}

impl Default for ZoomMapper {
    fn default() -> Self {
        Self {
            reference_altitude: REFERENCE_ALTITUDE,
            cluster_disable_altitude: CLUSTER_DISABLE_ALTITUDE,
            max_zoom_level: MAX_ZOOM_LEVEL,
            min_altitude: MIN_ALTITUDE,
        }
    }
}

impl ZoomMapper {
    /// `round(log2(reference / altitude))`, clamped to `[0, max_zoom_level]`.
    pub fn zoom_from_altitude(&self, altitude: f64) -> u8 {
        // f64::max drops NaN, so NaN clamps like zero.
        let altitude = altitude.max(self.min_altitude);
        let zoom = (self.reference_altitude / altitude).log2().round();
        zoom.clamp(0.0, f64::from(self.max_zoom_level)) as u8
    }

    pub fn altitude_from_zoom(&self, zoom: u8) -> f64 {
        self.reference_altitude / 2f64.powi(i32::from(zoom))
    }

    pub fn clustering_enabled(&self, altitude: f64) -> bool {
        altitude > self.cluster_disable_altitude
    }

    /// The close-range override wins over whatever zoom the altitude maps to.
    pub fn level_of_detail(&self, altitude: f64) -> LevelOfDetail {
        if !self.clustering_enabled(altitude) {
            return LevelOfDetail::Individual;
        }
        LevelOfDetail::Clustered {
            zoom: self.zoom_from_altitude(altitude),
        }
    }
}

pub fn zoom_from_altitude(altitude: f64) -> u8 {
    ZoomMapper::default().zoom_from_altitude(altitude)
}

pub fn altitude_from_zoom(zoom: u8) -> f64 {
    ZoomMapper::default().altitude_from_zoom(zoom)
}

#[cfg(test)]
mod tests {
    use super::{
        CLUSTER_DISABLE_ALTITUDE, LevelOfDetail, MAX_ZOOM_LEVEL, REFERENCE_ALTITUDE, ZoomMapper,
        altitude_from_zoom, zoom_from_altitude,
    };

    #[test]
    fn reference_altitude_is_zoom_zero() {
        assert_eq!(zoom_from_altitude(REFERENCE_ALTITUDE), 0);
        assert_eq!(zoom_from_altitude(2.5), 1);
        assert_eq!(zoom_from_altitude(1.25), 2);
        assert_eq!(altitude_from_zoom(0), REFERENCE_ALTITUDE);
        assert_eq!(altitude_from_zoom(3), 0.625);
    }

    #[test]
    fn far_away_clamps_to_zero() {
        assert_eq!(zoom_from_altitude(50.0), 0);
        assert_eq!(zoom_from_altitude(f64::INFINITY), 0);
    }

    #[test]
    fn degenerate_altitudes_clamp_to_max_zoom() {
        assert_eq!(zoom_from_altitude(0.0), MAX_ZOOM_LEVEL);
        assert_eq!(zoom_from_altitude(-3.0), MAX_ZOOM_LEVEL);
        assert_eq!(zoom_from_altitude(f64::NAN), MAX_ZOOM_LEVEL);
        assert_eq!(zoom_from_altitude(1e-300), MAX_ZOOM_LEVEL);
    }

    #[test]
    fn zoom_never_increases_with_altitude_above_threshold() {
        let mut last = u8::MAX;
        let mut altitude = CLUSTER_DISABLE_ALTITUDE + 1e-3;
        while altitude < 100.0 {
            let zoom = zoom_from_altitude(altitude);
            assert!(zoom <= last, "altitude {altitude}: {zoom} > {last}");
            last = zoom;
            altitude *= 1.05;
        }
    }

    #[test]
    fn round_trip_stays_within_one_zoom_band() {
        let mapper = ZoomMapper::default();
        let lowest = mapper.altitude_from_zoom(MAX_ZOOM_LEVEL);
        let mut altitude = lowest;
        while altitude <= REFERENCE_ALTITUDE {
            let back = mapper.altitude_from_zoom(mapper.zoom_from_altitude(altitude));
            let ratio = back / altitude;
            assert!(
                (0.5..=2.0).contains(&ratio),
                "altitude {altitude} came back as {back}"
            );
            altitude *= 1.1;
        }
    }

    #[test]
    fn close_range_disables_clustering_regardless_of_zoom() {
        let mapper = ZoomMapper::default();
        // 0.5 maps to zoom 3, which would still cluster.
        assert_eq!(mapper.zoom_from_altitude(0.5), 3);
        assert_eq!(mapper.level_of_detail(0.5), LevelOfDetail::Individual);
        assert_eq!(mapper.level_of_detail(0.2), LevelOfDetail::Individual);
        assert_eq!(mapper.level_of_detail(0.0), LevelOfDetail::Individual);
        assert_eq!(
            mapper.level_of_detail(2.5),
            LevelOfDetail::Clustered { zoom: 1 }
        );
    }
}
