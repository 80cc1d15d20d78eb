//! Logical camera capability consolidation

use camera_geometry::Dimension;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ControllerError;

/// One available stream configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    pub format: u32,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub is_input: bool,
}

/// Minimum frame or stall duration of a format/size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameDuration {
    pub format: u32,
    pub width: u32,
    pub height: u32,
    pub duration_ns: u64,
}

impl FrameDuration {
    fn same_stream(&self, other: &FrameDuration) -> bool {
        self.format == other.format && self.width == other.width && self.height == other.height
    }
}

/// Static capabilities of one physical camera
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraCapabilities {
    pub camera_id: u32,
    pub active_array_size: Dimension,
    pub stream_configs: Vec<StreamConfig>,
    #[serde(default)]
    pub min_frame_durations: Vec<FrameDuration>,
    #[serde(default)]
    pub stall_durations: Vec<FrameDuration>,
    #[serde(default)]
    pub jpeg_max_size: u32,
}

/// Capabilities advertised for the logical camera
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalCameraCaps {
    pub logical_camera_id: u32,
    pub physical_camera_ids: Vec<u32>,
    pub active_array_size: Dimension,
    pub stream_configs: Vec<StreamConfig>,
    pub min_frame_durations: Vec<FrameDuration>,
    pub stall_durations: Vec<FrameDuration>,
    pub jpeg_max_size: u32,
    pub max_digital_zoom: f32,
}

/// Merge physical capabilities into the logical camera's
///
/// The primary's active array is advertised. Stream configurations are the
/// union over all cameras; a size offered by several cameras keeps the
/// slowest duration.
pub fn consolidate_camera_info(
    logical_camera_id: u32,
    primary_camera_id: u32,
    max_digital_zoom: f32,
    caps: &[CameraCapabilities],
) -> Result<LogicalCameraCaps, ControllerError> {
    let primary = caps
        .iter()
        .find(|c| c.camera_id == primary_camera_id)
        .ok_or(ControllerError::CameraNotFound {
            camera_id: primary_camera_id,
        })?;

    let mut stream_configs = primary.stream_configs.clone();
    let mut min_frame_durations = primary.min_frame_durations.clone();
    let mut stall_durations = primary.stall_durations.clone();
    let mut jpeg_max_size = primary.jpeg_max_size;

    for aux in caps.iter().filter(|c| c.camera_id != primary_camera_id) {
        for config in &aux.stream_configs {
            if !stream_configs.contains(config) {
                debug!(
                    "Adding {}x{} format {:#x} from camera {}",
                    config.width, config.height, config.format, aux.camera_id
                );
                stream_configs.push(*config);
            }
        }
        merge_slowest(&mut min_frame_durations, &aux.min_frame_durations);
        merge_slowest(&mut stall_durations, &aux.stall_durations);
        jpeg_max_size = jpeg_max_size.max(aux.jpeg_max_size);
    }

    info!(
        "Logical camera {}: {} stream configs from {} cameras, jpeg max {}",
        logical_camera_id,
        stream_configs.len(),
        caps.len(),
        jpeg_max_size
    );

    Ok(LogicalCameraCaps {
        logical_camera_id,
        physical_camera_ids: caps.iter().map(|c| c.camera_id).collect(),
        active_array_size: primary.active_array_size,
        stream_configs,
        min_frame_durations,
        stall_durations,
        jpeg_max_size,
        max_digital_zoom,
    })
}

fn merge_slowest(merged: &mut Vec<FrameDuration>, extra: &[FrameDuration]) {
    for entry in extra {
        match merged.iter_mut().find(|m| m.same_stream(entry)) {
            Some(existing) => existing.duration_ns = existing.duration_ns.max(entry.duration_ns),
            None => merged.push(*entry),
        }
    }
}
