//! Controller creation data

use camera_geometry::{Dimension, PhysicalCamera};
use serde::{Deserialize, Serialize};

use crate::error::ControllerError;

/// Most physical cameras one logical camera may bundle
pub const MAX_LINKED_CAMERAS: usize = 4;

/// Camera arrangement of a logical camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    /// Spatial alignment transition: multi-FOV smooth zoom
    Sat,
    /// Real-time bokeh: depth from two or three cameras
    Rtb,
    /// Bayer plus mono sensor pair
    BayerMono,
    /// Stereo pair for VR capture
    Vr,
}

/// Direction of a configured stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    #[default]
    Output,
    Input,
    Bidirectional,
}

/// One framework stream of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamInfo {
    #[serde(default)]
    pub kind: StreamKind,

    /// Consumed by a video encoder
    #[serde(default)]
    pub video_encoder: bool,

    /// Consumed by the display composer (preview)
    #[serde(default)]
    pub hw_composer: bool,

    pub dimension: Dimension,
}

/// Stream facts the controller cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreamFlags {
    pub video_selected: bool,
    pub preview: Option<Dimension>,
}

impl StreamFlags {
    pub fn from_streams(streams: &[StreamInfo]) -> Self {
        let mut flags = StreamFlags::default();
        for stream in streams.iter().filter(|s| s.kind != StreamKind::Input) {
            if stream.video_encoder {
                flags.video_selected = true;
            }
            if stream.hw_composer {
                flags.preview = Some(stream.dimension);
            }
        }
        flags
    }
}

/// Everything needed to create or reconfigure a controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MccCreateData {
    pub logical_camera_id: u32,
    pub topology: Topology,
    pub primary_camera_id: u32,
    pub cameras: Vec<PhysicalCamera>,
    #[serde(default)]
    pub streams: Vec<StreamInfo>,
    #[serde(default)]
    pub fusion_enabled: bool,
}

impl MccCreateData {
    /// Reject a bundle outside `min..=max` cameras
    pub fn check_camera_count(&self, min: usize, max: usize) -> Result<(), ControllerError> {
        let count = self.cameras.len();
        if count < min || count > max {
            return Err(ControllerError::CameraCount {
                topology: self.topology,
                count,
                min,
                max,
            });
        }
        Ok(())
    }
}
