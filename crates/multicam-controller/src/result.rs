//! Controller result

use role_sync::RequestBatch;
use serde::{Deserialize, Serialize};

/// Streaming state of one physical camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveCamera {
    pub camera_id: u32,
    pub is_active: bool,
}

/// Authoritative per-logical-camera decision
///
/// `active_map` bit `i` mirrors `active_cameras[i].is_active`; callers that
/// touch the flags go through the setters so both stay in sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerResult {
    pub is_valid: bool,
    pub snapshot_fusion: bool,
    pub master_camera_id: u32,
    pub recommended_master_camera_id: u32,
    pub active_cameras: Vec<ActiveCamera>,
    pub active_map: u32,
}

impl ControllerResult {
    /// Not-yet-valid result with every camera inactive
    pub fn new(camera_ids: impl IntoIterator<Item = u32>, master_camera_id: u32) -> Self {
        Self {
            is_valid: false,
            snapshot_fusion: false,
            master_camera_id,
            recommended_master_camera_id: master_camera_id,
            active_cameras: camera_ids
                .into_iter()
                .map(|camera_id| ActiveCamera {
                    camera_id,
                    is_active: false,
                })
                .collect(),
            active_map: 0,
        }
    }

    pub fn index_of(&self, camera_id: u32) -> Option<usize> {
        self.active_cameras
            .iter()
            .position(|c| c.camera_id == camera_id)
    }

    pub fn is_active(&self, camera_id: u32) -> Option<bool> {
        self.active_cameras
            .iter()
            .find(|c| c.camera_id == camera_id)
            .map(|c| c.is_active)
    }

    pub fn is_index_active(&self, index: usize) -> bool {
        self.active_cameras
            .get(index)
            .map(|c| c.is_active)
            .unwrap_or(false)
    }

    pub fn num_active(&self) -> usize {
        self.active_cameras.iter().filter(|c| c.is_active).count()
    }

    pub fn set_active(&mut self, index: usize, active: bool) {
        if let Some(cam) = self.active_cameras.get_mut(index) {
            cam.is_active = active;
        }
        self.refresh_active_map();
    }

    /// Replace every flag with `active(index)`
    pub fn set_all_active(&mut self, mut active: impl FnMut(usize) -> bool) {
        for (i, cam) in self.active_cameras.iter_mut().enumerate() {
            cam.is_active = active(i);
        }
        self.refresh_active_map();
    }

    /// Force on every camera whose bit is set in `mask`
    pub fn apply_active_mask(&mut self, mask: u32) {
        for (i, cam) in self.active_cameras.iter_mut().enumerate().take(32) {
            if mask & (1 << i) != 0 {
                cam.is_active = true;
            }
        }
        self.refresh_active_map();
    }

    /// Rebuild `active_map` from the flags
    pub fn refresh_active_map(&mut self) {
        self.active_map = self
            .active_cameras
            .iter()
            .enumerate()
            .take(32)
            .filter(|(_, c)| c.is_active)
            .fold(0, |map, (i, _)| map | (1 << i));
    }

    /// Sync batch for this result, pipeline `i` being camera index `i`
    pub fn request_batch(&self, request_ids: Vec<u64>) -> RequestBatch {
        let master_mask = self
            .index_of(self.master_camera_id)
            .filter(|&i| i < 32)
            .map(|i| 1 << i)
            .unwrap_or(0);

        RequestBatch {
            active_mask: self.active_map,
            master_mask,
            request_ids,
            multi_request: self.num_active() > 1,
        }
    }
}
