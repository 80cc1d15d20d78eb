//! Geometry error types

use thiserror::Error;

/// Errors raised while building the camera table and its transition zones
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    /// Focal length must be strictly positive
    #[error("Camera {camera_id} has invalid focal length {focal_length}")]
    InvalidFocalLength { camera_id: u32, focal_length: f32 },

    /// Active array or sensor output width is zero
    #[error("Camera {camera_id} has an empty pixel array")]
    EmptyPixelArray { camera_id: u32 },

    /// Lookup of a camera id failed
    #[error("Camera {camera_id} not found")]
    CameraNotFound { camera_id: u32 },

    /// Same camera id configured twice
    #[error("Camera {0} configured more than once")]
    DuplicateCamera(u32),

    /// No cameras supplied
    #[error("No cameras configured")]
    NoCameras,

    /// Computed zone boundaries are not strictly increasing
    #[error("Camera {camera_id} transition zones out of order: left {left} >= right {right}")]
    ZoneOrdering { camera_id: u32, left: f32, right: f32 },
}
