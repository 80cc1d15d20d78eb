//! Per-logical-camera session state shared by the topology variants
//!
//! A session bundles the static geometry built at configuration time with
//! the live decision state. Controllers keep one session behind a single
//! mutex; every read and update goes through that lock.

use camera_geometry::{CameraTable, PixelShift, Rect, TransitionZoneCalculator};
use metrics::counter;
use tracing::{debug, info};
use zoom_translator::ZoomTranslator;

use crate::create::{MccCreateData, StreamFlags};
use crate::error::ControllerError;
use crate::override_state::OverrideState;
use crate::result::ControllerResult;

/// How much geometry a topology needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ZoneMode {
    /// Ratios and transition zones
    Zones,
    /// Ratios only
    RatiosOnly,
}

#[derive(Debug)]
pub(crate) struct Session {
    pub table: CameraTable,
    pub translator: ZoomTranslator,
    pub streams: StreamFlags,
    pub fusion_enabled: bool,

    pub result: ControllerResult,
    pub override_state: OverrideState,
    pub zoom_user: f32,
    pub shift_preview: PixelShift,
    pub shift_snapshot: PixelShift,
    pub lux_index: f32,
}

impl Session {
    pub fn build(
        data: &MccCreateData,
        calculator: &TransitionZoneCalculator,
        mode: ZoneMode,
    ) -> Result<Self, ControllerError> {
        let table = match mode {
            ZoneMode::Zones => calculator.build(data.cameras.clone(), data.primary_camera_id)?,
            ZoneMode::RatiosOnly => {
                calculator.build_ratios(data.cameras.clone(), data.primary_camera_id)?
            }
        };
        let translator = ZoomTranslator::from_table(&table)?;
        let streams = StreamFlags::from_streams(&data.streams);
        let result = ControllerResult::new(
            table.iter().map(|c| c.camera_id()),
            table.primary_camera_id(),
        );

        info!(
            "Logical camera {}: {} cameras, primary {}, video {}, fusion {}",
            data.logical_camera_id,
            table.len(),
            table.primary_camera_id(),
            streams.video_selected,
            data.fusion_enabled
        );

        Ok(Self {
            table,
            translator,
            streams,
            fusion_enabled: data.fusion_enabled,
            result,
            override_state: OverrideState::Tracking,
            zoom_user: 1.0,
            shift_preview: PixelShift::ZERO,
            shift_snapshot: PixelShift::ZERO,
            lux_index: 0.0,
        })
    }

    /// Rebuild geometry; the live zoom survives, everything else resets
    pub fn rebuild(
        &mut self,
        data: &MccCreateData,
        calculator: &TransitionZoneCalculator,
        mode: ZoneMode,
    ) -> Result<(), ControllerError> {
        let zoom_user = self.zoom_user;
        *self = Session::build(data, calculator, mode)?;
        self.zoom_user = zoom_user;
        debug!("Session rebuilt at user zoom {:.3}", zoom_user);
        Ok(())
    }

    pub fn is_dual(&self) -> bool {
        self.table.len() == 2
    }

    /// Any configured camera hands off with a hard cut
    pub fn smooth_transition_disabled(&self) -> bool {
        self.table.iter().any(|c| c.is_hard_cut())
    }

    /// Horizontal zoom of `crop` on the primary active array
    pub fn user_zoom_for(&self, crop: &Rect) -> Option<f32> {
        if crop.width <= 0 {
            return None;
        }
        Some(self.table.primary().active_array_size().width as f32 / crop.width as f32)
    }

    /// Two FOV-adjacent cameras both streaming
    pub fn adjacent_pair_active(&self) -> bool {
        self.table
            .fov_order()
            .windows(2)
            .any(|pair| {
                self.result.is_index_active(pair[0]) && self.result.is_index_active(pair[1])
            })
    }

    /// Fusion allowed by configuration and streams, given current activity
    pub fn fusion_allowed(&self, snapshot_fusion: bool) -> bool {
        snapshot_fusion && self.fusion_enabled && !self.streams.video_selected
    }

    /// Force on the master and every always-on camera
    pub fn keep_required_active(&mut self) {
        let master = self.result.index_of(self.result.master_camera_id);
        let always_on: Vec<bool> = self.table.iter().map(|c| c.physical.always_on).collect();
        let current: Vec<bool> = (0..always_on.len())
            .map(|i| self.result.is_index_active(i))
            .collect();
        self.result
            .set_all_active(|i| current[i] || always_on[i] || Some(i) == master);
    }

    /// Switch master to the camera at `index`
    pub fn set_master_index(&mut self, index: usize) {
        if let Some(cam) = self.table.by_index(index) {
            let id = cam.camera_id();
            self.result.master_camera_id = id;
            self.result.recommended_master_camera_id = id;
        }
    }
}

/// Log and count a master hand-off
pub(crate) fn note_master_switch(logical_camera_id: u32, from: u32, to: u32) {
    if from == to {
        return;
    }
    info!(
        "Logical camera {}: master camera {} -> {}",
        logical_camera_id, from, to
    );
    counter!("mcc_master_switch_total").increment(1);
}
