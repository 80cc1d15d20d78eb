//! Controller capability interface

use camera_geometry::Rect;

use crate::consolidate::{CameraCapabilities, LogicalCameraCaps};
use crate::create::{MccCreateData, Topology};
use crate::error::ControllerError;
use crate::metadata::{FrameResult, ResultMetadata};
use crate::request::{CameraRequestSettings, TranslatedRequest};
use crate::result::ControllerResult;

/// One logical camera's coordination engine
///
/// Implementations hold their state behind a single lock, so every method
/// takes `&self` and may be called from any pipeline.
pub trait MultiCamController: Send + Sync {
    fn topology(&self) -> Topology;

    fn logical_camera_id(&self) -> u32;

    fn primary_camera_id(&self) -> u32;

    /// Recompute geometry after a stream or sensor mode change
    fn reconfigure(&self, data: &MccCreateData) -> Result<(), ControllerError>;

    /// Largest user zoom the logical camera advertises
    fn max_digital_zoom(&self) -> f32;

    fn consolidate_camera_info(
        &self,
        caps: &[CameraCapabilities],
    ) -> Result<LogicalCameraCaps, ControllerError> {
        crate::consolidate::consolidate_camera_info(
            self.logical_camera_id(),
            self.primary_camera_id(),
            self.max_digital_zoom(),
            caps,
        )
    }

    /// Translate the app's settings onto every linked camera
    fn translate_request_settings(
        &self,
        settings: &[CameraRequestSettings],
    ) -> Result<Vec<TranslatedRequest>, ControllerError>;

    /// Merge algorithm feedback into the result
    fn process_result_metadata(&self, metadata: &ResultMetadata);

    /// Re-derive the result from the app's current crop
    fn update_results(&self, user_crop: Option<&Rect>);

    /// Latest result; cameras in `snapshot_active_mask` are forced active
    fn result(&self, user_crop: Option<&Rect>, snapshot_active_mask: u32) -> ControllerResult;

    /// Map a master-camera frame result into app coordinates
    fn translate_result_metadata(&self, frame: &FrameResult)
        -> Result<FrameResult, ControllerError>;

    fn is_fusion_enabled(&self) -> bool;

    /// Unknown cameras report `true`
    fn is_smooth_zoom_enabled(&self, camera_id: u32) -> bool;
}
