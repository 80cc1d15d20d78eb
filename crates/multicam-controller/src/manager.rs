//! Controller factory and per-logical-camera registry

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::config::MccConfig;
use crate::controller::MultiCamController;
use crate::create::{MccCreateData, Topology};
use crate::error::ControllerError;
use crate::rtb::RtbController;
use crate::sat::SatController;
use crate::vr::VrController;

/// Build the controller variant for `data.topology`
pub fn create_controller(
    data: &MccCreateData,
    config: MccConfig,
) -> Result<Arc<dyn MultiCamController>, ControllerError> {
    let controller: Arc<dyn MultiCamController> = match data.topology {
        Topology::Sat => Arc::new(SatController::new(data, config)?),
        Topology::Rtb => Arc::new(RtbController::new(data, config)?),
        Topology::Vr => Arc::new(VrController::new(data, config)?),
        Topology::BayerMono => return Err(ControllerError::UnsupportedTopology(data.topology)),
    };

    info!(
        "Created {:?} controller for logical camera {} ({} cameras)",
        data.topology,
        data.logical_camera_id,
        data.cameras.len()
    );
    Ok(controller)
}

/// Owns one controller per logical camera
pub struct ControllerManager {
    config: MccConfig,
    controllers: Mutex<HashMap<u32, Arc<dyn MultiCamController>>>,
}

impl ControllerManager {
    pub fn new(config: MccConfig) -> Self {
        Self {
            config,
            controllers: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &MccConfig {
        &self.config
    }

    /// Controller for `data.logical_camera_id`, reconfigured in place when
    /// the topology is unchanged, otherwise created afresh
    pub fn get_controller(
        &self,
        data: &MccCreateData,
    ) -> Result<Arc<dyn MultiCamController>, ControllerError> {
        let mut controllers = self.controllers.lock();

        if let Some(existing) = controllers.get(&data.logical_camera_id) {
            if existing.topology() == data.topology {
                existing.reconfigure(data)?;
                info!("Reconfigured logical camera {}", data.logical_camera_id);
                return Ok(Arc::clone(existing));
            }
            warn!(
                "Logical camera {} changes topology {:?} -> {:?}, replacing controller",
                data.logical_camera_id,
                existing.topology(),
                data.topology
            );
        }

        let controller = create_controller(data, self.config.clone())?;
        controllers.insert(data.logical_camera_id, Arc::clone(&controller));
        Ok(controller)
    }

    pub fn controller(&self, logical_camera_id: u32) -> Option<Arc<dyn MultiCamController>> {
        self.controllers.lock().get(&logical_camera_id).cloned()
    }

    /// Drop the controller; true when one existed
    pub fn destroy_controller(&self, logical_camera_id: u32) -> bool {
        let removed = self.controllers.lock().remove(&logical_camera_id).is_some();
        if removed {
            info!("Destroyed controller for logical camera {}", logical_camera_id);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.controllers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.lock().is_empty()
    }
}

impl Default for ControllerManager {
    fn default() -> Self {
        Self::new(MccConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camera_geometry::{Dimension, PhysicalCamera};

    fn camera(id: u32, focal: f32) -> PhysicalCamera {
        PhysicalCamera {
            camera_id: id,
            focal_length: focal,
            pixel_pitch: 1.0,
            active_array_size: Dimension::new(4000, 3000),
            sensor_output: Dimension::new(4000, 3000),
            ife_fov: None,
            always_on: false,
            smooth_transition: true,
            transition_zoom_ratio_min: 1.0,
            transition_zoom_ratio_max: 2.0,
        }
    }

    fn create_data(topology: Topology) -> MccCreateData {
        MccCreateData {
            logical_camera_id: 7,
            topology,
            primary_camera_id: 0,
            cameras: vec![camera(0, 4.0), camera(1, 8.0)],
            streams: Vec::new(),
            fusion_enabled: true,
        }
    }

    #[test]
    fn test_factory_selects_variant() {
        for topology in [Topology::Sat, Topology::Rtb, Topology::Vr] {
            let controller = create_controller(&create_data(topology), MccConfig::default()).unwrap();
            assert_eq!(controller.topology(), topology);
            assert_eq!(controller.primary_camera_id(), 0);
        }
    }

    #[test]
    fn test_bayer_mono_unsupported() {
        let err = create_controller(&create_data(Topology::BayerMono), MccConfig::default());
        assert!(matches!(
            err,
            Err(ControllerError::UnsupportedTopology(Topology::BayerMono))
        ));
    }

    #[test]
    fn test_reconfigure_reuses_controller() {
        let manager = ControllerManager::default();
        let first = manager.get_controller(&create_data(Topology::Sat)).unwrap();
        let second = manager.get_controller(&create_data(Topology::Sat)).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_topology_change_replaces_controller() {
        let manager = ControllerManager::default();
        let first = manager.get_controller(&create_data(Topology::Sat)).unwrap();
        let second = manager.get_controller(&create_data(Topology::Vr)).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(manager.controller(7).unwrap().topology(), Topology::Vr);
    }

    #[test]
    fn test_destroy() {
        let manager = ControllerManager::default();
        manager.get_controller(&create_data(Topology::Sat)).unwrap();
        assert!(manager.destroy_controller(7));
        assert!(!manager.destroy_controller(7));
        assert!(manager.controller(7).is_none());
        assert!(manager.is_empty());
    }
}
