//! Result metadata: algorithm feedback in, app-facing results out

use camera_geometry::{PixelShift, Point, Rect, RectEdges, WeightedRegion};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ControllerError;
use crate::session::Session;

/// Focus distance assumed when the algorithm reports none
pub const DEFAULT_FOCUS_DISTANCE_CM: u32 = 100;

/// Low-power flag reported for one camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowPowerMode {
    pub camera_id: u32,
    pub is_enabled: bool,
}

/// Spatial-alignment output of the zoom algorithm
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpticalZoomResult {
    /// Camera that produced this result
    pub master_camera_id: u32,
    pub recommended_master_camera_id: u32,

    #[serde(default)]
    pub low_power: Vec<LowPowerMode>,

    #[serde(default)]
    pub shift_preview: PixelShift,

    #[serde(default)]
    pub shift_snapshot: PixelShift,
}

/// Per-frame 3A facts of one camera
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RealtimeResult {
    pub camera_id: u32,

    #[serde(default)]
    pub lux_index: Option<f32>,

    #[serde(default)]
    pub focus_distance_cm: Option<u32>,
}

/// Depth algorithm output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BokehResult {
    pub master_camera_id: u32,
    pub recommended_master_camera_id: u32,
    pub active_map: u32,
}

/// Algorithm feedback consumed by `process_result_metadata`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultMetadata {
    OpticalZoom(OpticalZoomResult),
    Realtime(RealtimeResult),
    Bokeh(BokehResult),
}

/// Detected face in the producing camera's coordinates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceRegion {
    pub rect: RectEdges,

    #[serde(default)]
    pub score: u8,

    #[serde(default)]
    pub landmarks: Vec<Point>,
}

/// Frame result as produced by the master camera
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameResult {
    pub master_camera_id: u32,

    /// Crop the app requested for this frame, in primary coordinates
    pub user_crop: Rect,

    /// Scaler crop reported by the master
    #[serde(default)]
    pub crop_region: Option<RectEdges>,

    #[serde(default)]
    pub af_regions: Vec<WeightedRegion>,

    #[serde(default)]
    pub ae_regions: Vec<WeightedRegion>,

    #[serde(default)]
    pub faces: Vec<FaceRegion>,
}

/// Map a master-camera frame result into app space
pub(crate) fn translate_frame_result(
    session: &Session,
    frame: &FrameResult,
) -> Result<FrameResult, ControllerError> {
    let translator = &session.translator;
    let master = frame.master_camera_id;
    if translator.index_of(master).is_none() {
        return Err(ControllerError::CameraNotFound { camera_id: master });
    }

    let crop = &frame.user_crop;
    let shift = session.shift_preview;
    let map_regions = |regions: &[WeightedRegion]| -> Result<Vec<WeightedRegion>, ControllerError> {
        regions
            .iter()
            .map(|r| {
                if r.is_unset() {
                    return Ok(*r);
                }
                let edges = translator.translated_rect(master, crop, &r.edges(), shift)?;
                Ok(r.with_edges(edges))
            })
            .collect()
    };

    let crop_region = frame
        .crop_region
        .map(|c| translator.translated_rect(master, crop, &c, shift))
        .transpose()?;

    let visible = match session.streams.preview.and_then(|d| d.aspect_ratio()) {
        Some(aspect) => crop.aligned_to_aspect(aspect),
        None => *crop,
    };

    let mut faces = Vec::with_capacity(frame.faces.len());
    for face in &frame.faces {
        let rect = translator.translated_rect(master, crop, &face.rect, shift)?;
        if !rect.is_inside(&visible) {
            debug!("Dropping face {:?} outside {:?}", rect, visible);
            continue;
        }
        faces.push(FaceRegion {
            rect,
            score: face.score,
            landmarks: translator.translated_points(master, crop, &face.landmarks, shift)?,
        });
    }

    Ok(FrameResult {
        master_camera_id: master,
        user_crop: frame.user_crop,
        crop_region,
        af_regions: map_regions(&frame.af_regions)?,
        ae_regions: map_regions(&frame.ae_regions)?,
        faces,
    })
}
