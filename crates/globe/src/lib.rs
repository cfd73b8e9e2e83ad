//! Level-of-detail control for pins on a 3D globe.
//!
//! The pipeline: a pin set is loaded into a clustering index; the camera
//! altitude picks a zoom level (or switches clustering off when close);
//! the index is queried over the whole world and the results are projected
//! into marker descriptors. Marker clicks flow back into the camera
//! controller as fly-to directives.

pub mod camera;
pub mod config;
pub mod view;
pub mod zoom;

pub use camera::*;
pub use config::*;
pub use view::*;
pub use zoom::*;
