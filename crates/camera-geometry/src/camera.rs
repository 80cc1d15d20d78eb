//! Per-camera static facts and the configured camera table

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;
use crate::rect::{Dimension, Rect};
use crate::transition::TransitionZone;

fn default_true() -> bool {
    true
}

fn default_ratio_min() -> f32 {
    1.0
}

fn default_ratio_max() -> f32 {
    2.0
}

/// Static facts about one physical camera, as supplied at configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalCamera {
    /// Physical camera id
    pub camera_id: u32,

    /// Lens focal length (mm)
    pub focal_length: f32,

    /// Pixel pitch (um)
    pub pixel_pitch: f32,

    /// Active pixel array size
    pub active_array_size: Dimension,

    /// Sensor output size for the selected mode
    pub sensor_output: Dimension,

    /// Sensor readout window in active-array coordinates
    #[serde(default)]
    pub ife_fov: Option<Rect>,

    /// Keep streaming regardless of zoom
    #[serde(default)]
    pub always_on: bool,

    /// Blend into neighbours through an overlap band instead of a hard cut
    #[serde(default = "default_true")]
    pub smooth_transition: bool,

    /// Manufacturer-declared zoom ratio at which this camera may take over
    #[serde(default = "default_ratio_min")]
    pub transition_zoom_ratio_min: f32,

    /// Manufacturer-declared zoom ratio at which this camera hands off
    #[serde(default = "default_ratio_max")]
    pub transition_zoom_ratio_max: f32,
}

/// Which pixel width feeds the field-of-view computation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FovBasis {
    /// Active pixel array width (zoom topologies)
    #[default]
    ActiveArray,
    /// Sensor output width (depth/bokeh topologies)
    SensorOutput,
}

impl PhysicalCamera {
    /// Field of view as `width * pixel_pitch / focal_length`
    pub fn field_of_view(&self, basis: FovBasis) -> Result<f32, GeometryError> {
        if self.focal_length <= 0.0 || !self.focal_length.is_finite() {
            return Err(GeometryError::InvalidFocalLength {
                camera_id: self.camera_id,
                focal_length: self.focal_length,
            });
        }

        let width = match basis {
            FovBasis::ActiveArray => self.active_array_size.width,
            FovBasis::SensorOutput => self.sensor_output.width,
        };
        if width == 0 {
            return Err(GeometryError::EmptyPixelArray {
                camera_id: self.camera_id,
            });
        }

        Ok(width as f32 * self.pixel_pitch / self.focal_length)
    }
}

/// Camera plus everything derived from it at configuration time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraInfo {
    pub physical: PhysicalCamera,

    /// This camera's FOV relative to the primary; 1.0 for the primary
    pub adjusted_fov_ratio: f32,

    /// Boundary with the next wider camera
    pub transition_left: TransitionZone,

    /// Boundary with the next narrower camera
    pub transition_right: TransitionZone,

    /// Current digital zoom applied on this camera
    pub zoom: f32,

    /// False when the FOV could not be computed
    pub fov_valid: bool,
}

impl CameraInfo {
    pub fn new(physical: PhysicalCamera) -> Self {
        Self {
            physical,
            adjusted_fov_ratio: 1.0,
            transition_left: TransitionZone::default(),
            transition_right: TransitionZone::default(),
            zoom: 1.0,
            fov_valid: false,
        }
    }

    pub fn camera_id(&self) -> u32 {
        self.physical.camera_id
    }

    pub fn active_array_size(&self) -> Dimension {
        self.physical.active_array_size
    }

    pub fn is_hard_cut(&self) -> bool {
        !self.physical.smooth_transition
    }

    /// Whether `zoom` falls in `[left, right)`, or onto the right edge of
    /// the last camera within `epsilon`
    pub fn zone_contains(&self, zoom: f32, is_last: bool, epsilon: f32) -> bool {
        let left = self.transition_left.transition_ratio;
        let right = self.transition_right.transition_ratio;
        (zoom >= left && zoom < right) || (is_last && (zoom - right).abs() < epsilon)
    }
}

/// Linked cameras of one logical camera, in configured order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraTable {
    pub(crate) cameras: Vec<CameraInfo>,
    pub(crate) primary_index: usize,
    /// Indices of FOV-valid cameras from widest to narrowest
    pub(crate) fov_order: Vec<usize>,
}

impl CameraTable {
    /// Build a table without any derived data
    pub fn new(cameras: Vec<PhysicalCamera>, primary_camera_id: u32) -> Result<Self, GeometryError> {
        if cameras.is_empty() {
            return Err(GeometryError::NoCameras);
        }

        for (i, cam) in cameras.iter().enumerate() {
            if cameras[..i].iter().any(|c| c.camera_id == cam.camera_id) {
                return Err(GeometryError::DuplicateCamera(cam.camera_id));
            }
        }

        let primary_index = cameras
            .iter()
            .position(|c| c.camera_id == primary_camera_id)
            .ok_or(GeometryError::CameraNotFound {
                camera_id: primary_camera_id,
            })?;

        Ok(Self {
            cameras: cameras.into_iter().map(CameraInfo::new).collect(),
            primary_index,
            fov_order: Vec::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }

    /// Configured index of a camera id
    pub fn index_of(&self, camera_id: u32) -> Option<usize> {
        self.cameras.iter().position(|c| c.camera_id() == camera_id)
    }

    pub fn get(&self, camera_id: u32) -> Option<&CameraInfo> {
        self.cameras.iter().find(|c| c.camera_id() == camera_id)
    }

    pub fn get_mut(&mut self, camera_id: u32) -> Option<&mut CameraInfo> {
        self.cameras.iter_mut().find(|c| c.camera_id() == camera_id)
    }

    pub fn by_index(&self, index: usize) -> Option<&CameraInfo> {
        self.cameras.get(index)
    }

    pub fn cameras(&self) -> &[CameraInfo] {
        &self.cameras
    }

    pub fn iter(&self) -> impl Iterator<Item = &CameraInfo> {
        self.cameras.iter()
    }

    pub fn primary(&self) -> &CameraInfo {
        &self.cameras[self.primary_index]
    }

    pub fn primary_index(&self) -> usize {
        self.primary_index
    }

    pub fn primary_camera_id(&self) -> u32 {
        self.primary().camera_id()
    }

    /// Configured indices ordered from widest to narrowest field of view
    pub fn fov_order(&self) -> &[usize] {
        &self.fov_order
    }

    /// Neighbours of a camera in FOV order: (wider, narrower)
    pub fn fov_neighbours(&self, index: usize) -> (Option<usize>, Option<usize>) {
        match self.fov_order.iter().position(|&i| i == index) {
            Some(pos) => (
                pos.checked_sub(1).map(|p| self.fov_order[p]),
                self.fov_order.get(pos + 1).copied(),
            ),
            None => (None, None),
        }
    }

    /// Camera whose transition interval contains `zoom`
    pub fn camera_for_zoom(&self, zoom: f32, epsilon: f32) -> Option<usize> {
        let last = self.fov_order.len().checked_sub(1)?;
        self.fov_order
            .iter()
            .enumerate()
            .find(|(pos, &idx)| self.cameras[idx].zone_contains(zoom, *pos == last, epsilon))
            .map(|(_, &idx)| idx)
    }

    /// Like [`camera_for_zoom`](Self::camera_for_zoom), but zoom outside every
    /// zone resolves to the widest or narrowest camera
    pub fn camera_for_zoom_clamped(&self, zoom: f32, epsilon: f32) -> Option<usize> {
        if let Some(idx) = self.camera_for_zoom(zoom, epsilon) {
            return Some(idx);
        }

        let first = *self.fov_order.first()?;
        let last = *self.fov_order.last()?;
        if zoom < self.cameras[first].transition_left.transition_ratio {
            Some(first)
        } else {
            Some(last)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera(id: u32, focal: f32) -> PhysicalCamera {
        PhysicalCamera {
            camera_id: id,
            focal_length: focal,
            pixel_pitch: 1.0,
            active_array_size: Dimension::new(4000, 3000),
            sensor_output: Dimension::new(2000, 1500),
            ife_fov: None,
            always_on: false,
            smooth_transition: true,
            transition_zoom_ratio_min: 1.0,
            transition_zoom_ratio_max: 2.0,
        }
    }

    #[test]
    fn test_field_of_view() {
        let cam = camera(0, 4.0);
        let fov = cam.field_of_view(FovBasis::ActiveArray).unwrap();
        assert!((fov - 1000.0).abs() < 0.001);

        let fov = cam.field_of_view(FovBasis::SensorOutput).unwrap();
        assert!((fov - 500.0).abs() < 0.001);
    }

    #[test]
    fn test_invalid_focal_length() {
        let cam = camera(3, 0.0);
        assert_eq!(
            cam.field_of_view(FovBasis::ActiveArray),
            Err(GeometryError::InvalidFocalLength {
                camera_id: 3,
                focal_length: 0.0
            })
        );
    }

    #[test]
    fn test_table_rejects_duplicates_and_missing_primary() {
        let dup = CameraTable::new(vec![camera(1, 4.0), camera(1, 8.0)], 1);
        assert_eq!(dup.unwrap_err(), GeometryError::DuplicateCamera(1));

        let missing = CameraTable::new(vec![camera(1, 4.0)], 7);
        assert_eq!(
            missing.unwrap_err(),
            GeometryError::CameraNotFound { camera_id: 7 }
        );

        assert_eq!(
            CameraTable::new(Vec::new(), 0).unwrap_err(),
            GeometryError::NoCameras
        );
    }

    #[test]
    fn test_index_lookup() {
        let table = CameraTable::new(vec![camera(4, 4.0), camera(9, 8.0)], 9).unwrap();
        assert_eq!(table.index_of(9), Some(1));
        assert_eq!(table.index_of(5), None);
        assert_eq!(table.primary_camera_id(), 9);
    }

    #[test]
    fn test_deserialize_defaults() {
        let json = r#"{
            "camera_id": 2,
            "focal_length": 6.0,
            "pixel_pitch": 0.8,
            "active_array_size": { "width": 4000, "height": 3000 },
            "sensor_output": { "width": 4000, "height": 3000 }
        }"#;
        let cam: PhysicalCamera = serde_json::from_str(json).unwrap();
        assert!(cam.smooth_transition);
        assert!(!cam.always_on);
        assert_eq!(cam.ife_fov, None);
        assert!((cam.transition_zoom_ratio_min - 1.0).abs() < 0.001);
        assert!((cam.transition_zoom_ratio_max - 2.0).abs() < 0.001);
    }
}
