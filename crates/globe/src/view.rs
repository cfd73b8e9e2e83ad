use std::fmt;

use foundation::bounds::LngLatBounds;
use layers::{MarkerDescriptor, MarkerLayer, Pin, PointFeature, to_features};
use runtime::{Event, Frame};
use spatial::ClusterIndex;

use crate::camera::{CameraController, CameraDirective, PointOfView};
use crate::config::GlobeConfig;
use crate::zoom::LevelOfDetail;

/// Where pins come from: the REST endpoint, a fixture file, a test double.
pub trait PinSource {
    fn fetch_pins(&self) -> Result<Vec<Pin>, PinSourceError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinSourceError {
    Unavailable(String),
    Malformed(String),
}

impl fmt::Display for PinSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinSourceError::Unavailable(msg) => write!(f, "pin source unavailable: {msg}"),
            PinSourceError::Malformed(msg) => write!(f, "malformed pin payload: {msg}"),
        }
    }
}

impl std::error::Error for PinSourceError {}

/// A fixed pin set, for fixtures and offline rendering.
impl PinSource for [Pin] {
    fn fetch_pins(&self) -> Result<Vec<Pin>, PinSourceError> {
        Ok(self.to_vec())
    }
}

impl PinSource for Vec<Pin> {
    fn fetch_pins(&self) -> Result<Vec<Pin>, PinSourceError> {
        Ok(self.clone())
    }
}

/// Pins -> index -> (altitude-driven query) -> markers, with clicks routed
/// back into the camera.
///
/// The whole world is queried on every pass. Pin counts are small enough
/// that viewport culling is left to the renderer.
#[derive(Debug)]
pub struct GlobeView {
    config: GlobeConfig,
    index: ClusterIndex<PointFeature>,
    layer: MarkerLayer,
    camera: CameraController,
}

impl Default for GlobeView {
    fn default() -> Self {
        Self::new(GlobeConfig::default())
    }
}

impl GlobeView {
    pub fn new(config: GlobeConfig) -> Self {
        Self {
            index: ClusterIndex::new(config.index),
            layer: MarkerLayer::new(config.markers.clone()),
            camera: CameraController::new(config.camera, &config.zoom),
            config,
        }
    }

    pub fn config(&self) -> &GlobeConfig {
        &self.config
    }

    pub fn camera(&self) -> &CameraController {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut CameraController {
        &mut self.camera
    }

    pub fn index(&self) -> &ClusterIndex<PointFeature> {
        &self.index
    }

    pub fn pin_count(&self) -> usize {
        self.index.len()
    }

    /// Rebuilds the index from scratch. An empty slice clears the view.
    pub fn replace_pins(&mut self, pins: &[Pin]) {
        self.index.load(to_features(pins));
        tracing::debug!(pins = pins.len(), "pin set replaced");
    }

    /// Loads pins from `source`. A failed fetch leaves the view empty rather
    /// than showing a stale set.
    pub fn refresh<S: PinSource + ?Sized>(&mut self, source: &S) {
        match source.fetch_pins() {
            Ok(pins) => self.replace_pins(&pins),
            Err(err) => {
                tracing::warn!(error = %err, "pin fetch failed; clearing pins");
                self.replace_pins(&[]);
            }
        }
    }

    pub fn level_of_detail(&self) -> LevelOfDetail {
        self.config
            .zoom
            .level_of_detail(self.camera.state().altitude)
    }

    /// Markers for the camera's current altitude.
    pub fn markers(&self) -> Vec<MarkerDescriptor> {
        self.markers_at(self.camera.state().altitude)
    }

    /// Markers as they would render at `altitude`, without moving the camera.
    pub fn markers_at(&self, altitude: f64) -> Vec<MarkerDescriptor> {
        let zoom = match self.config.zoom.level_of_detail(altitude) {
            LevelOfDetail::Clustered { zoom } => zoom,
            LevelOfDetail::Individual => self.index.options().leaf_zoom(),
        };
        let nodes = self.index.query(&LngLatBounds::WORLD, zoom);
        self.layer.project(&nodes, self.index.len())
    }

    pub fn mount(&mut self) {
        self.camera.mount();
    }

    pub fn unmount(&mut self) {
        self.camera.unmount();
    }

    pub fn click(&mut self, marker: &MarkerDescriptor) {
        self.camera.on_marker_click(marker);
    }

    pub fn on_camera_change(&mut self, pov: PointOfView) {
        self.camera.sync_point_of_view(pov);
    }

    pub fn toggle_rotation(&mut self) {
        self.camera.toggle_rotation();
    }

    pub fn reset_zoom(&mut self) {
        self.camera.reset_zoom();
    }

    pub fn update(&mut self, frame: Frame) {
        self.camera.update(frame);
    }

    pub fn drain_directives(&mut self) -> Vec<Event<CameraDirective>> {
        self.camera.drain_directives()
    }
}
