//! Spatial alignment transition (multi-FOV smooth zoom)
//!
//! Geometry picks the master from the live user zoom; the zoom algorithm
//! may then recommend another master while it blends through an overlap
//! band. Hard-cut cameras cannot blend, so a zoom crossing into or out of
//! one forces the switch and holds it (override) until the algorithm's
//! recommendation agrees again.

use camera_geometry::{PixelShift, Rect, TransitionZoneCalculator};
use metrics::counter;
use parking_lot::Mutex;
use tracing::{debug, error, info, trace, warn};

use crate::config::MccConfig;
use crate::controller::MultiCamController;
use crate::create::{MccCreateData, Topology, MAX_LINKED_CAMERAS};
use crate::error::ControllerError;
use crate::metadata::{
    translate_frame_result, FrameResult, OpticalZoomResult, RealtimeResult, ResultMetadata,
    DEFAULT_FOCUS_DISTANCE_CM,
};
use crate::override_state::OverrideState;
use crate::request::{translate_request_settings, CameraRequestSettings, TranslatedRequest};
use crate::result::ControllerResult;
use crate::session::{note_master_switch, Session, ZoneMode};

/// Multi-FOV zoom controller
pub struct SatController {
    logical_camera_id: u32,
    config: MccConfig,
    calculator: TransitionZoneCalculator,
    session: Mutex<Session>,
}

impl SatController {
    pub fn new(data: &MccCreateData, config: MccConfig) -> Result<Self, ControllerError> {
        data.check_camera_count(1, MAX_LINKED_CAMERAS)?;

        let calculator = TransitionZoneCalculator::new(config.transition);
        let mut session = Session::build(data, &calculator, ZoneMode::Zones)?;
        Self::set_initial_result_state(&mut session, &config, data.logical_camera_id);

        Ok(Self {
            logical_camera_id: data.logical_camera_id,
            config,
            calculator,
            session: Mutex::new(session),
        })
    }

    pub fn override_state(&self) -> OverrideState {
        self.session.lock().override_state
    }

    /// Current user zoom as last derived from a crop
    pub fn user_zoom(&self) -> f32 {
        self.session.lock().zoom_user
    }

    /// Master and active set purely from geometry
    fn set_initial_result_state(s: &mut Session, config: &MccConfig, logical_camera_id: u32) {
        let zoom = s.zoom_user;
        let eps = config.extreme_edge_epsilon;
        let master_index = s
            .table
            .camera_for_zoom_clamped(zoom, eps)
            .unwrap_or_else(|| s.table.primary_index());

        let previous = s.result.master_camera_id;
        let was_valid = s.result.is_valid;

        let mut active = vec![false; s.table.len()];
        active[master_index] = true;

        // dual zone: the neighbour across a smooth overlap band streams too
        let master = &s.table.cameras()[master_index];
        let (wider, narrower) = s.table.fov_neighbours(master_index);
        if let Some(w) = wider.filter(|_| master.transition_left.overlap_contains(zoom)) {
            active[w] = true;
        }
        if let Some(n) = narrower.filter(|_| master.transition_right.overlap_contains(zoom)) {
            active[n] = true;
        }

        for (i, cam) in s.table.iter().enumerate() {
            if cam.physical.always_on || !config.low_power_mode {
                active[i] = true;
            }
        }

        s.set_master_index(master_index);
        s.result.set_all_active(|i| active[i]);
        s.result.snapshot_fusion =
            s.fusion_allowed(config.snapshot_fusion) && s.adjacent_pair_active();
        s.result.is_valid = true;

        debug!(
            "Zoom {:.3}: master {} active map {:#b} fusion {}",
            zoom, s.result.master_camera_id, s.result.active_map, s.result.snapshot_fusion
        );
        if was_valid {
            note_master_switch(logical_camera_id, previous, s.result.master_camera_id);
        }
    }

    /// Force a switch when the live zoom crosses a hard-cut boundary
    fn check_override(&self, s: &mut Session, zoom: f32) {
        let current_id = s.result.master_camera_id;
        let Some(master_index) = s.table.index_of(current_id) else {
            error!("Master camera {} not in table", current_id);
            return;
        };
        let Some(zone_index) = s
            .table
            .camera_for_zoom_clamped(zoom, self.config.extreme_edge_epsilon)
        else {
            return;
        };

        if zone_index == master_index {
            if s.override_state.exit() {
                info!("Zoom {:.3} back in camera {} zone, leaving override", zoom, current_id);
            }
            return;
        }

        let zone_cam = &s.table.cameras()[zone_index];
        let master_cam = &s.table.cameras()[master_index];
        if !zone_cam.is_hard_cut() && !master_cam.is_hard_cut() {
            trace!("Zone mismatch on a smooth boundary, master kept");
            s.override_state.exit();
            return;
        }

        let new_id = zone_cam.camera_id();
        s.set_master_index(zone_index);

        // alignment shifts do not carry across a hard cut
        s.shift_preview = PixelShift::ZERO;
        s.shift_snapshot = PixelShift::ZERO;

        let always_on: Vec<bool> = s.table.iter().map(|c| c.physical.always_on).collect();
        let low_power = self.config.low_power_mode;
        s.result
            .set_all_active(|i| i == zone_index || always_on[i] || !low_power);

        if s.override_state.enter(new_id) {
            counter!("mcc_override_enter_total").increment(1);
        }
        info!(
            "Zoom {:.3} crossed a hard cut, override camera {} -> {}",
            zoom, current_id, new_id
        );
        note_master_switch(self.logical_camera_id, current_id, new_id);
    }

    fn apply_optical_zoom(&self, s: &mut Session, oz: &OpticalZoomResult) {
        let recommended = oz.recommended_master_camera_id;

        if let OverrideState::Overridden { master_camera_id } = s.override_state {
            if recommended != master_camera_id {
                debug!(
                    "Override on camera {}, ignoring recommendation {}",
                    master_camera_id, recommended
                );
                return;
            }
            s.override_state.exit();
            info!("Recommendation agrees with camera {}, leaving override", recommended);
        }

        let Some(recommended_cam) = s.table.get(recommended) else {
            warn!("Recommended master {} not in table", recommended);
            return;
        };
        if recommended_cam.is_hard_cut() {
            debug!("Recommended master {} is hard-cut, ignored", recommended);
            return;
        }

        let previous = s.result.master_camera_id;
        s.result.master_camera_id = recommended;
        s.result.recommended_master_camera_id = recommended;

        let reported: Vec<Option<bool>> = s
            .table
            .iter()
            .map(|cam| {
                oz.low_power
                    .iter()
                    .find(|l| l.camera_id == cam.camera_id())
                    .map(|l| !l.is_enabled)
            })
            .collect();
        let current: Vec<bool> = (0..reported.len())
            .map(|i| s.result.is_index_active(i))
            .collect();
        let low_power = self.config.low_power_mode;
        s.result
            .set_all_active(|i| !low_power || reported[i].unwrap_or(current[i]));

        // never leave the master in low power
        s.keep_required_active();

        if s.fusion_enabled {
            s.result.snapshot_fusion = !s.streams.video_selected && s.adjacent_pair_active();
        }

        s.shift_preview = oz.shift_preview;
        s.shift_snapshot = oz.shift_snapshot;
        s.result.is_valid = true;

        debug!(
            "Optical zoom from camera {}: master {} active map {:#b} fusion {}",
            oz.master_camera_id, recommended, s.result.active_map, s.result.snapshot_fusion
        );
        note_master_switch(self.logical_camera_id, previous, recommended);
    }

    fn apply_realtime(&self, s: &mut Session, rt: &RealtimeResult) {
        if rt.camera_id != s.result.recommended_master_camera_id {
            return;
        }

        match rt.lux_index {
            Some(lux) => s.lux_index = lux,
            None => warn!("No lux index from camera {}", rt.camera_id),
        }
        let focus_cm = rt.focus_distance_cm.unwrap_or(DEFAULT_FOCUS_DISTANCE_CM);

        let params = &self.config.transition;
        let zoom = s.zoom_user;
        s.result.snapshot_fusion = s.fusion_allowed(self.config.snapshot_fusion)
            && zoom >= params.fusion_zoom_min
            && zoom <= params.fusion_zoom_max
            && s.lux_index >= self.config.fusion_lux_threshold
            && focus_cm >= self.config.fusion_focus_distance_cm_min;

        trace!(
            "Lux {:.1} focus {}cm zoom {:.3}: fusion {}",
            s.lux_index,
            focus_cm,
            zoom,
            s.result.snapshot_fusion
        );
    }
}

impl MultiCamController for SatController {
    fn topology(&self) -> Topology {
        Topology::Sat
    }

    fn logical_camera_id(&self) -> u32 {
        self.logical_camera_id
    }

    fn primary_camera_id(&self) -> u32 {
        self.session.lock().table.primary_camera_id()
    }

    fn reconfigure(&self, data: &MccCreateData) -> Result<(), ControllerError> {
        if data.topology != Topology::Sat {
            return Err(ControllerError::TopologyMismatch {
                expected: Topology::Sat,
                actual: data.topology,
            });
        }
        data.check_camera_count(1, MAX_LINKED_CAMERAS)?;

        let mut s = self.session.lock();
        s.rebuild(data, &self.calculator, ZoneMode::Zones)?;
        Self::set_initial_result_state(&mut s, &self.config, self.logical_camera_id);
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

    fn process_result_metadata(&self, metadata: &ResultMetadata) {
        let mut s = self.session.lock();
        match metadata {
            ResultMetadata::OpticalZoom(oz) => self.apply_optical_zoom(&mut s, oz),
            ResultMetadata::Realtime(rt) => self.apply_realtime(&mut s, rt),
            ResultMetadata::Bokeh(_) => debug!("Bokeh metadata ignored"),
        }
    }

    fn update_results(&self, user_crop: Option<&Rect>) {
        let mut s = self.session.lock();
        if let Some(zoom) = user_crop.and_then(|c| s.user_zoom_for(c)) {
            s.zoom_user = zoom;
        }
        Self::set_initial_result_state(&mut s, &self.config, self.logical_camera_id);
    }

    fn result(&self, user_crop: Option<&Rect>, snapshot_active_mask: u32) -> ControllerResult {
        let mut s = self.session.lock();

        if s.smooth_transition_disabled() {
            if let Some(zoom) = user_crop.and_then(|c| s.user_zoom_for(c)) {
                self.check_override(&mut s, zoom);
            }
        }

        if snapshot_active_mask != 0 {
            s.result.apply_active_mask(snapshot_active_mask);
        }
        if s.result.num_active() <= 1 {
            s.result.snapshot_fusion = false;
        }
        s.result.clone()
    }

    fn translate_result_metadata(
        &self,
        frame: &FrameResult,
    ) -> Result<FrameResult, ControllerError> {
        let s = self.session.lock();
        translate_frame_result(&s, frame)
    }

    fn is_fusion_enabled(&self) -> bool {
        self.session.lock().result.snapshot_fusion
    }

    fn is_smooth_zoom_enabled(&self, camera_id: u32) -> bool {
        self.session
            .lock()
            .table
            .get(camera_id)
            .map(|c| c.physical.smooth_transition)
            .unwrap_or(true)
    }
}
