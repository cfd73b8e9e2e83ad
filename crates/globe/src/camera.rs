//! Camera controller for the globe view.
//!
//! The controller never moves a camera itself. It tracks what the renderer
//! reports, decides how clicks and UI commands should move the camera, and
//! queues [`CameraDirective`]s for the renderer to drain once per frame.
//!
//! Lifecycle:
//! - starts unmounted; commands issued before `mount` are dropped
//! - idle, either auto-rotating or paused
//! - animating toward a fly-to target; auto-rotate is suspended and the
//!   prior rotation setting is restored when the animation completes

use foundation::bounds::LngLat;
use foundation::time::Time;
use layers::MarkerDescriptor;
use runtime::{Event, EventBus, Frame};
use serde::{Deserialize, Serialize};

use crate::zoom::ZoomMapper;

/// Altitude the reset command returns to.
pub const OVERVIEW_ALTITUDE: f64 = 2.5;
/// Cluster clicks fly to this fraction of the clustering-disable altitude.
pub const CLUSTER_FOCUS_FACTOR: f64 = 0.4;
pub const FLY_DURATION_MS: u64 = 1000;
pub const AUTO_ROTATE_SPEED: f64 = 0.5;

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub overview_altitude: f64,
    pub cluster_focus_factor: f64,
    pub fly_duration_ms: u64,
    pub auto_rotate_speed: f64,
    /// Whether the globe starts spinning once mounted.
    pub auto_rotate: bool,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            overview_altitude: OVERVIEW_ALTITUDE,
            cluster_focus_factor: CLUSTER_FOCUS_FACTOR,
            fly_duration_ms: FLY_DURATION_MS,
            auto_rotate_speed: AUTO_ROTATE_SPEED,
            auto_rotate: true,
        }
    }
}

/// Point of view as reported by the renderer.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointOfView {
    pub lat: f64,
    pub lng: f64,
    pub altitude: f64,
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct CameraState {
    pub altitude: f64,
    pub lat: f64,
    pub lng: f64,
    pub auto_rotate: bool,
}

/// Where a fly-to should end. `None` coordinates keep the current ones.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlyTarget {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub altitude: f64,
}

impl FlyTarget {
    pub fn centered_on(position: LngLat, altitude: f64) -> Self {
        Self {
            lat: Some(position.lat),
            lng: Some(position.lng),
            altitude,
        }
    }

    pub fn altitude_only(altitude: f64) -> Self {
        Self {
            lat: None,
            lng: None,
            altitude,
        }
    }
}

/// Instruction for the renderer.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CameraDirective {
    FlyTo {
        lat: Option<f64>,
        lng: Option<f64>,
        altitude: f64,
        duration_ms: u64,
    },
    SetAutoRotate {
        enabled: bool,
        speed: f64,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraPhase {
    IdleRotating,
    IdlePaused,
    Animating,
}

#[derive(Debug, Copy, Clone, PartialEq)]
enum Phase {
    Idle { rotating: bool },
    Animating(Animation),
}

#[derive(Debug, Copy, Clone, PartialEq)]
struct Animation {
    target: FlyTarget,
    ends_at: Time,
    /// Rotation setting to restore on completion.
    resume_rotating: bool,
}

#[derive(Debug)]
pub struct CameraController {
    settings: CameraSettings,
    focus_altitude: f64,
    state: CameraState,
    phase: Phase,
    mounted: bool,
    frame: Frame,
    directives: EventBus<CameraDirective>,
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new(CameraSettings::default(), &ZoomMapper::default())
    }
}

impl CameraController {
    /// The cluster focus altitude derives from the mapper's clustering-disable
    /// threshold, so a cluster click always lands at individual-pin range.
    pub fn new(settings: CameraSettings, zoom: &ZoomMapper) -> Self {
        Self {
            settings,
            focus_altitude: zoom.cluster_disable_altitude * settings.cluster_focus_factor,
            state: CameraState {
                altitude: settings.overview_altitude,
                lat: 0.0,
                lng: 0.0,
                auto_rotate: settings.auto_rotate,
            },
            phase: Phase::Idle {
                rotating: settings.auto_rotate,
            },
            mounted: false,
            frame: Frame::new(0, 0.0),
            directives: EventBus::new(),
        }
    }

    pub fn settings(&self) -> &CameraSettings {
        &self.settings
    }

    pub fn state(&self) -> CameraState {
        self.state
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn phase(&self) -> CameraPhase {
        match self.phase {
            Phase::Idle { rotating: true } => CameraPhase::IdleRotating,
            Phase::Idle { rotating: false } => CameraPhase::IdlePaused,
            Phase::Animating(_) => CameraPhase::Animating,
        }
    }

    /// The renderer is ready; pushes the initial rotation setting.
    pub fn mount(&mut self) {
        if self.mounted {
            return;
        }
        self.mounted = true;
        tracing::debug!(auto_rotate = self.state.auto_rotate, "camera mounted");
        self.emit_rotation(self.state.auto_rotate);
    }

    /// The renderer went away. Pending directives are discarded and later
    /// commands are dropped until the next `mount`.
    pub fn unmount(&mut self) {
        self.mounted = false;
        self.directives.drain();
    }

    /// Flips auto-rotate. During an animation the new setting applies once
    /// the animation completes.
    pub fn toggle_rotation(&mut self) {
        if !self.accepts_commands("toggle_rotation") {
            return;
        }
        match &mut self.phase {
            Phase::Idle { rotating } => {
                *rotating = !*rotating;
                let enabled = *rotating;
                self.state.auto_rotate = enabled;
                self.emit_rotation(enabled);
            }
            Phase::Animating(animation) => {
                animation.resume_rotating = !animation.resume_rotating;
            }
        }
    }

    pub fn fly_to(&mut self, target: FlyTarget) {
        if !self.accepts_commands("fly_to") {
            return;
        }
        let resume_rotating = match self.phase {
            Phase::Idle { rotating } => {
                if rotating {
                    self.emit_rotation(false);
                }
                rotating
            }
            // A new flight replaces the old one but keeps what to restore.
            Phase::Animating(animation) => animation.resume_rotating,
        };

        let duration_ms = self.settings.fly_duration_ms;
        self.state.auto_rotate = false;
        self.phase = Phase::Animating(Animation {
            target,
            ends_at: self.clock() + Time::from_millis(duration_ms),
            resume_rotating,
        });
        self.directives.emit(
            self.frame,
            CameraDirective::FlyTo {
                lat: target.lat,
                lng: target.lng,
                altitude: target.altitude,
                duration_ms,
            },
        );
    }

    /// Back to the overview altitude; latitude and longitude stay put.
    pub fn reset_zoom(&mut self) {
        self.fly_to(FlyTarget::altitude_only(self.settings.overview_altitude));
    }

    pub fn focus_cluster(&mut self, centroid: LngLat) {
        self.fly_to(FlyTarget::centered_on(centroid, self.focus_altitude));
    }

    /// Cluster clicks zoom into the centroid; pin clicks are informational.
    pub fn on_marker_click(&mut self, marker: &MarkerDescriptor) {
        match marker {
            MarkerDescriptor::Cluster(cluster) => {
                tracing::debug!(
                    cluster = %cluster.cluster_id,
                    count = cluster.count,
                    "cluster clicked"
                );
                self.focus_cluster(cluster.position);
            }
            MarkerDescriptor::Pin(pin) => {
                tracing::info!(pin = %pin.pin_id, location = %pin.location, "pin clicked");
            }
        }
    }

    /// Records the renderer's current point of view.
    pub fn sync_point_of_view(&mut self, pov: PointOfView) {
        if pov.altitude.is_finite() {
            self.state.altitude = pov.altitude;
        }
        if pov.lat.is_finite() {
            self.state.lat = pov.lat;
        }
        if pov.lng.is_finite() {
            self.state.lng = pov.lng;
        }
    }

    /// Advances the clock to the end of `frame` and completes a finished
    /// animation.
    pub fn update(&mut self, frame: Frame) {
        self.frame = frame;
        let Phase::Animating(animation) = self.phase else {
            return;
        };
        if self.clock() < animation.ends_at {
            return;
        }

        let target = animation.target;
        self.state.altitude = target.altitude;
        if let Some(lat) = target.lat {
            self.state.lat = lat;
        }
        if let Some(lng) = target.lng {
            self.state.lng = lng;
        }
        self.phase = Phase::Idle {
            rotating: animation.resume_rotating,
        };
        self.state.auto_rotate = animation.resume_rotating;
        if animation.resume_rotating {
            self.emit_rotation(true);
        }
        tracing::trace!(altitude = target.altitude, "fly-to complete");
    }

    pub fn directives(&self) -> &[Event<CameraDirective>] {
        self.directives.events()
    }

    pub fn drain_directives(&mut self) -> Vec<Event<CameraDirective>> {
        self.directives.drain()
    }

    fn clock(&self) -> Time {
        self.frame.end_time()
    }

    fn accepts_commands(&self, command: &str) -> bool {
        if !self.mounted {
            tracing::debug!(command, "camera not mounted; command dropped");
        }
        self.mounted
    }

    fn emit_rotation(&mut self, enabled: bool) {
        self.directives.emit(
            self.frame,
            CameraDirective::SetAutoRotate {
                enabled,
                speed: self.settings.auto_rotate_speed,
            },
        );
    }
}
