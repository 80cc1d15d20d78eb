//! Controller error types

use camera_geometry::GeometryError;
use thiserror::Error;
use zoom_translator::TranslateError;

use crate::create::Topology;

/// Errors from controller creation, reconfiguration and translation
#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    #[error("Translation error: {0}")]
    Translate(#[from] TranslateError),

    #[error("Camera {camera_id} not found")]
    CameraNotFound { camera_id: u32 },

    #[error("No settings for primary camera {camera_id}")]
    MissingPrimarySettings { camera_id: u32 },

    #[error("Topology {0:?} is not supported")]
    UnsupportedTopology(Topology),

    #[error("{topology:?} supports {min}..={max} cameras, got {count}")]
    CameraCount {
        topology: Topology,
        count: usize,
        min: usize,
        max: usize,
    },

    #[error("Controller is {expected:?}, reconfigure asked for {actual:?}")]
    TopologyMismatch { expected: Topology, actual: Topology },

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}
