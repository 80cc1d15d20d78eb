//! Real-time bokeh
//!
//! Depth needs two cameras streaming at all times. The master is fixed by
//! declared zoom ratios rather than zones; the depth algorithm reports the
//! master and active set back through bokeh metadata.

use camera_geometry::{FovBasis, Rect, TransitionZoneCalculator};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::MccConfig;
use crate::controller::MultiCamController;
use crate::create::{MccCreateData, Topology};
use crate::error::ControllerError;
use crate::metadata::{translate_frame_result, FrameResult, ResultMetadata};
use crate::request::{translate_request_settings, CameraRequestSettings, TranslatedRequest};
use crate::result::ControllerResult;
use crate::session::{note_master_switch, Session, ZoneMode};

/// User zoom at which a triple bundle moves to its tele pair
pub const TELE_PAIR_ZOOM: f32 = 2.0;

const MIN_CAMERAS: usize = 2;
const MAX_CAMERAS: usize = 3;

pub struct RtbController {
    logical_camera_id: u32,
    config: MccConfig,
    calculator: TransitionZoneCalculator,
    session: Mutex<Session>,
}

impl RtbController {
    pub fn new(data: &MccCreateData, config: MccConfig) -> Result<Self, ControllerError> {
        data.check_camera_count(MIN_CAMERAS, MAX_CAMERAS)?;

        let calculator =
            TransitionZoneCalculator::new(config.transition).with_basis(FovBasis::SensorOutput);
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
        let cams = s.table.cameras();
        let (master, pair) = if cams.len() == MIN_CAMERAS {
            let master = if cams[0].physical.transition_zoom_ratio_min
                < cams[1].physical.transition_zoom_ratio_min
            {
                1
            } else {
                0
            };
            (master, [0, 1])
        } else {
            let mut order: Vec<usize> = (0..cams.len()).collect();
            order.sort_by(|&a, &b| {
                cams[a]
                    .physical
                    .transition_zoom_ratio_min
                    .total_cmp(&cams[b].physical.transition_zoom_ratio_min)
            });
            if s.zoom_user < TELE_PAIR_ZOOM {
                (order[1], [order[0], order[1]])
            } else {
                (order[2], [order[1], order[2]])
            }
        };

        s.set_master_index(master);
        s.result.set_all_active(|i| pair.contains(&i));
        s.result.snapshot_fusion = true;
        s.result.is_valid = true;

        debug!(
            "Bokeh zoom {:.3}: master {} active map {:#b}",
            s.zoom_user, s.result.master_camera_id, s.result.active_map
        );
    }
}

impl MultiCamController for RtbController {
    fn topology(&self) -> Topology {
        Topology::Rtb
    }

    fn logical_camera_id(&self) -> u32 {
        self.logical_camera_id
    }

    fn primary_camera_id(&self) -> u32 {
        self.session.lock().table.primary_camera_id()
    }

    fn reconfigure(&self, data: &MccCreateData) -> Result<(), ControllerError> {
        if data.topology != Topology::Rtb {
            return Err(ControllerError::TopologyMismatch {
                expected: Topology::Rtb,
                actual: data.topology,
            });
        }
        data.check_camera_count(MIN_CAMERAS, MAX_CAMERAS)?;

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

    fn process_result_metadata(&self, metadata: &ResultMetadata) {
        let ResultMetadata::Bokeh(bokeh) = metadata else {
            debug!("Non-bokeh metadata ignored");
            return;
        };

        let mut s = self.session.lock();
        let master = s.result.index_of(bokeh.master_camera_id);
        let recommended = s.result.index_of(bokeh.recommended_master_camera_id);
        let (Some(master_idx), Some(_)) = (master, recommended) else {
            warn!(
                "Bokeh result names unknown camera (master {}, recommended {}), ignored",
                bokeh.master_camera_id, bokeh.recommended_master_camera_id
            );
            return;
        };

        info!(
            "Bokeh master {} recommended {} map {:#b}",
            bokeh.master_camera_id, bokeh.recommended_master_camera_id, bokeh.active_map
        );
        s.result.master_camera_id = bokeh.master_camera_id;
        s.result.recommended_master_camera_id = bokeh.recommended_master_camera_id;
        s.result.set_all_active(|i| i < 32 && bokeh.active_map & (1 << i) != 0);
        s.result.set_active(master_idx, true);
    }

    fn update_results(&self, user_crop: Option<&Rect>) {
        let mut s = self.session.lock();
        if let Some(zoom) = user_crop.and_then(|c| s.user_zoom_for(c)) {
            s.zoom_user = zoom;
        }
        Self::set_initial_result_state(&mut s);
    }

    fn result(&self, _user_crop: Option<&Rect>, snapshot_active_mask: u32) -> ControllerResult {
        let mut s = self.session.lock();

        let current = s.result.master_camera_id;
        let recommended = s.result.recommended_master_camera_id;
        if current != recommended {
            s.result.master_camera_id = recommended;
            note_master_switch(self.logical_camera_id, current, recommended);
        }
        if let Some(master_idx) = s.result.index_of(s.result.master_camera_id) {
            s.result.set_active(master_idx, true);
        }
        if snapshot_active_mask != 0 {
            s.result.apply_active_mask(snapshot_active_mask);
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

#[cfg(test)]
mod tests {
    use super::*;
    use camera_geometry::{Dimension, PhysicalCamera};

    use crate::metadata::BokehResult;

    fn camera(id: u32, focal: f32, ratio_min: f32) -> PhysicalCamera {
        PhysicalCamera {
            camera_id: id,
            focal_length: focal,
            pixel_pitch: 1.0,
            active_array_size: Dimension::new(4000, 3000),
            sensor_output: Dimension::new(2000, 1500),
            ife_fov: None,
            always_on: false,
            smooth_transition: true,
            transition_zoom_ratio_min: ratio_min,
            transition_zoom_ratio_max: 8.0,
        }
    }

    fn create_data(cameras: Vec<PhysicalCamera>) -> MccCreateData {
        MccCreateData {
            logical_camera_id: 30,
            topology: Topology::Rtb,
            primary_camera_id: 0,
            cameras,
            streams: Vec::new(),
            fusion_enabled: true,
        }
    }

    fn crop_for_zoom(zoom: f32) -> Rect {
        let width = (4000.0 / zoom).round() as i32;
        let height = (3000.0 / zoom).round() as i32;
        Rect::new((4000 - width) / 2, (3000 - height) / 2, width, height)
    }

    #[test]
    fn test_dual_master_is_longer_lens() {
        let rtb = RtbController::new(
            &create_data(vec![camera(0, 4.0, 1.0), camera(1, 8.0, 2.0)]),
            MccConfig::default(),
        )
        .unwrap();
        let result = rtb.result(None, 0);
        assert_eq!(result.master_camera_id, 1);
        assert_eq!(result.active_map, 0b11);
        assert!(result.snapshot_fusion);
    }

    #[test]
    fn test_triple_pairs_by_zoom() {
        let rtb = RtbController::new(
            &create_data(vec![
                camera(0, 4.0, 1.0),
                camera(1, 12.0, 3.0),
                camera(2, 2.0, 0.5),
            ]),
            MccConfig::default(),
        )
        .unwrap();

        // sorted by declared ratio: 2, 0, 1
        let result = rtb.result(None, 0);
        assert_eq!(result.master_camera_id, 0);
        assert_eq!(result.active_map, 0b101);

        rtb.update_results(Some(&crop_for_zoom(3.0)));
        let result = rtb.result(None, 0);
        assert_eq!(result.master_camera_id, 1);
        assert_eq!(result.active_map, 0b011);
    }

    #[test]
    fn test_camera_count_limits() {
        let single = create_data(vec![camera(0, 4.0, 1.0)]);
        assert!(matches!(
            RtbController::new(&single, MccConfig::default()),
            Err(ControllerError::CameraCount { count: 1, .. })
        ));

        let quad = create_data(vec![
            camera(0, 4.0, 1.0),
            camera(1, 8.0, 2.0),
            camera(2, 2.0, 0.5),
            camera(3, 16.0, 4.0),
        ]);
        assert!(matches!(
            RtbController::new(&quad, MccConfig::default()),
            Err(ControllerError::CameraCount { count: 4, .. })
        ));
    }

    #[test]
    fn test_bokeh_recommendation_applied_on_read() {
        let rtb = RtbController::new(
            &create_data(vec![camera(0, 4.0, 1.0), camera(1, 8.0, 2.0)]),
            MccConfig::default(),
        )
        .unwrap();

        rtb.process_result_metadata(&ResultMetadata::Bokeh(BokehResult {
            master_camera_id: 1,
            recommended_master_camera_id: 0,
            active_map: 0b01,
        }));

        // camera 1 stays on as the reported master; camera 0 is promoted
        let result = rtb.result(None, 0);
        assert_eq!(result.master_camera_id, 0);
        assert_eq!(result.active_map, 0b11);
    }

    #[test]
    fn test_bokeh_unknown_camera_ignored() {
        let rtb = RtbController::new(
            &create_data(vec![camera(0, 4.0, 1.0), camera(1, 8.0, 2.0)]),
            MccConfig::default(),
        )
        .unwrap();
        let before = rtb.result(None, 0);

        rtb.process_result_metadata(&ResultMetadata::Bokeh(BokehResult {
            master_camera_id: 99,
            recommended_master_camera_id: 99,
            active_map: 0b01,
        }));
        rtb.process_result_metadata(&ResultMetadata::Bokeh(BokehResult {
            master_camera_id: 1,
            recommended_master_camera_id: 7,
            active_map: 0b01,
        }));

        assert_eq!(rtb.result(None, 0), before);
    }

    #[test]
    fn test_bokeh_master_kept_active() {
        let rtb = RtbController::new(
            &create_data(vec![camera(0, 4.0, 1.0), camera(1, 8.0, 2.0)]),
            MccConfig::default(),
        )
        .unwrap();

        rtb.process_result_metadata(&ResultMetadata::Bokeh(BokehResult {
            master_camera_id: 1,
            recommended_master_camera_id: 1,
            active_map: 0b01,
        }));

        let result = rtb.result(None, 0);
        assert_eq!(result.master_camera_id, 1);
        assert_eq!(result.is_active(1), Some(true));
        assert_eq!(result.active_map, 0b11);
    }

    #[test]
    fn test_fov_from_sensor_output() {
        let mut tele = camera(1, 8.0, 2.0);
        tele.sensor_output = Dimension::new(1000, 750);
        let rtb = RtbController::new(
            &create_data(vec![camera(0, 4.0, 1.0), tele]),
            MccConfig::default(),
        )
        .unwrap();
        // (2000 / 4) / (1000 / 8) = 4
        let s = rtb.session.lock();
        assert!((s.table.get(1).unwrap().adjusted_fov_ratio - 4.0).abs() < 0.001);
    }
}
