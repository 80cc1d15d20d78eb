//! Camera Geometry
//!
//! Static per-camera facts and the zoom decision intervals derived from them:
//! - Field of view from active array width, pixel pitch and focal length
//! - FOV ratio of every camera relative to the primary camera
//! - Transition zones (overlap and fusion bands) between FOV-adjacent cameras
//! - Rectangle and coordinate types shared by the translation layers

pub mod camera;
pub mod error;
pub mod rect;
pub mod transition;

pub use camera::{CameraInfo, CameraTable, FovBasis, PhysicalCamera};
pub use error::GeometryError;
pub use rect::{Dimension, PixelShift, Point, Rect, RectEdges, WeightedRegion};
pub use transition::{TransitionParams, TransitionZone, TransitionZoneCalculator};
