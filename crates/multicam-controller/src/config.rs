//! Controller configuration

use std::path::Path;

use camera_geometry::TransitionParams;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ControllerError;

/// Controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MccConfig {
    /// Zone margins and zoom bounds
    pub transition: TransitionParams,

    /// Put cameras outside the current zone into low power
    pub low_power_mode: bool,

    /// Allow snapshot fusion at all
    pub snapshot_fusion: bool,

    /// Minimum lux index for fusion
    pub fusion_lux_threshold: f32,

    /// Minimum focus distance for fusion (cm)
    pub fusion_focus_distance_cm_min: u32,

    /// Request kernel frame sync while two adjacent cameras stream
    pub kernel_frame_sync: bool,

    /// Tolerance for the inclusive right edge of the last zone
    pub extreme_edge_epsilon: f32,
}

impl Default for MccConfig {
    fn default() -> Self {
        Self {
            transition: TransitionParams::default(),
            low_power_mode: true,
            snapshot_fusion: true,
            fusion_lux_threshold: 1.0,
            fusion_focus_distance_cm_min: 15,
            kernel_frame_sync: false,
            extreme_edge_epsilon: 0.001,
        }
    }
}

impl MccConfig {
    /// Every camera streams; no low-power hand-off
    pub fn always_streaming() -> Self {
        Self {
            low_power_mode: false,
            kernel_frame_sync: true,
            ..Default::default()
        }
    }

    /// Single-camera output only
    pub fn no_fusion() -> Self {
        Self {
            snapshot_fusion: false,
            ..Default::default()
        }
    }

    /// Defaults, then an optional file, then `MCC__*` environment variables
    pub fn load(path: Option<&Path>) -> Result<Self, ControllerError> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&MccConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let cfg: MccConfig = builder
            .add_source(config::Environment::with_prefix("MCC").separator("__"))
            .build()?
            .try_deserialize()?;

        info!("Loaded controller config: {:?}", cfg);
        Ok(cfg)
    }
}
