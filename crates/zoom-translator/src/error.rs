//! Translation error types

use thiserror::Error;

/// Errors returned by [`ZoomTranslator`](crate::ZoomTranslator)
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TranslateError {
    /// Crop rectangle with a non-positive side
    #[error("Invalid crop {width}x{height}")]
    InvalidCrop { width: i32, height: i32 },

    /// Camera id unknown to this translator
    #[error("Camera {camera_id} not linked")]
    CameraNotFound { camera_id: u32 },

    /// Camera with an empty active array or a non-positive ratio
    #[error("Camera {camera_id} has degenerate geometry")]
    DegenerateGeometry { camera_id: u32 },

    /// User zoom must be positive
    #[error("Invalid user zoom {0}")]
    InvalidZoom(f32),

    /// No linked cameras
    #[error("No linked cameras")]
    NoCameras,
}
