//! Stereo VR capture: the primary is always master and every camera streams

use camera_geometry::{Rect, TransitionZoneCalculator};
use parking_lot::Mutex;
use tracing::debug;

use crate::config::MccConfig;
use crate::controller::MultiCamController;
use crate::create::{MccCreateData, Topology, MAX_LINKED_CAMERAS};
use crate::error::ControllerError;
use crate::metadata::{translate_frame_result, FrameResult, ResultMetadata};
use crate::request::{translate_request_settings, CameraRequestSettings, TranslatedRequest};
use crate::result::ControllerResult;
use crate::session::{Session, ZoneMode};

pub struct VrController {
    logical_camera_id: u32,
    config: MccConfig,
    calculator: TransitionZoneCalculator,
    session: Mutex<Session>,
}

impl VrController {
    pub fn new(data: &MccCreateData, config: MccConfig) -> Result<Self, ControllerError> {
        data.check_camera_count(2, MAX_LINKED_CAMERAS)?;

        let calculator = TransitionZoneCalculator::new(config.transition);
        let mut session = Session::build(data, &calculator, ZoneMode::RatiosOnly)?;
        Self::set_initial_result_state(&mut session);

        Ok(Self {
            logical_camera_id: data.logical_camera_id,
            config,
            calculator,
            session: Mutex::new(session),
        })
    }

    fn set_initial_result_state(s: &mut Session) {
        let primary = s.table.primary_index();
        s.set_master_index(primary);
        s.result.set_all_active(|_| true);
        s.result.snapshot_fusion = false;
        s.result.is_valid = true;
    }
}

impl MultiCamController for VrController {
    fn topology(&self) -> Topology {
        Topology::Vr
    }

    fn logical_camera_id(&self) -> u32 {
        self.logical_camera_id
    }

    fn primary_camera_id(&self) -> u32 {
        self.session.lock().table.primary_camera_id()
    }

    fn reconfigure(&self, data: &MccCreateData) -> Result<(), ControllerError> {
        if data.topology != Topology::Vr {
            return Err(ControllerError::TopologyMismatch {
                expected: Topology::Vr,
                actual: data.topology,
            });
        }
        data.check_camera_count(2, MAX_LINKED_CAMERAS)?;

        let mut s = self.session.lock();
        s.rebuild(data, &self.calculator, ZoneMode::RatiosOnly)?;
        Self::set_initial_result_state(&mut s);
        Ok(())
    }

    fn max_digital_zoom(&self) -> f32 {
        self.config.transition.max_user_zoom
    }

    fn translate_request_settings(
        &self,
        settings: &[CameraRequestSettings],
    ) -> Result<Vec<TranslatedRequest>, ControllerError> {
        let mut s = self.session.lock();
        translate_request_settings(&mut s, &self.config, settings)
    }

    fn process_result_metadata(&self, _metadata: &ResultMetadata) {
        debug!("VR controller takes no algorithm feedback");
    }

    fn update_results(&self, user_crop: Option<&Rect>) {
        let mut s = self.session.lock();
        if let Some(zoom) = user_crop.and_then(|c| s.user_zoom_for(c)) {
            s.zoom_user = zoom;
        }
    }

    fn result(&self, _user_crop: Option<&Rect>, _snapshot_active_mask: u32) -> ControllerResult {
        self.session.lock().result.clone()
    }

    fn translate_result_metadata(
        &self,
        frame: &FrameResult,
    ) -> Result<FrameResult, ControllerError> {
        let s = self.session.lock();
        translate_frame_result(&s, frame)
    }

    fn is_fusion_enabled(&self) -> bool {
        false
    }

    fn is_smooth_zoom_enabled(&self, _camera_id: u32) -> bool {
        false
    }
}
