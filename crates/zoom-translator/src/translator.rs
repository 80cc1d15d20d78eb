//! Zoom translator implementation

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use camera_geometry::{
    CameraInfo, CameraTable, Dimension, PixelShift, Point, Rect, RectEdges, WeightedRegion,
};

use crate::error::TranslateError;

/// Ratios closer than this are treated as the same optics
const RATIO_EPSILON: f32 = 1e-4;

/// Per-camera facts the translator needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedCamera {
    pub camera_id: u32,
    pub active_array_size: Dimension,
    pub ife_fov: Option<Rect>,
    pub adjusted_fov_ratio: f32,
    /// Ratio at the wide edge of this camera's zone
    pub zone_fov_ratio: f32,
}

impl LinkedCamera {
    pub fn from_info(info: &CameraInfo) -> Self {
        let zone_ratio = info.transition_left.transition_ratio;
        Self {
            camera_id: info.camera_id(),
            active_array_size: info.active_array_size(),
            ife_fov: info.physical.ife_fov,
            adjusted_fov_ratio: info.adjusted_fov_ratio,
            zone_fov_ratio: if zone_ratio > 0.0 {
                zone_ratio
            } else {
                info.adjusted_fov_ratio
            },
        }
    }
}

/// Crop output for one camera
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomRegion {
    pub camera_id: u32,

    /// Crop applied by the pipeline on this camera
    pub total_zoom: Rect,

    /// Part of the crop the front-end ISP can deliver
    pub isp_limit: Rect,

    /// Digital zoom on this camera's active array
    pub zoom: f32,
}

/// Result of [`ZoomTranslator::translated_zoom`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslatedZoom {
    /// Horizontal user zoom relative to the primary active array
    pub user_zoom: f32,
    pub regions: Vec<ZoomRegion>,
}

impl TranslatedZoom {
    pub fn get(&self, camera_id: u32) -> Option<&ZoomRegion> {
        self.regions.iter().find(|r| r.camera_id == camera_id)
    }
}

/// `((v - pre) * scale + post)` on one axis
#[derive(Debug, Clone, Copy)]
struct AxisMap {
    pre: f32,
    scale: f32,
    post: f32,
}

impl AxisMap {
    fn apply(&self, v: i32) -> i32 {
        ((v as f32 - self.pre) * self.scale + self.post).round() as i32
    }

    fn centering_offset(ratio: f32, primary_len: u32) -> f32 {
        (ratio - 1.0) * primary_len as f32 / ratio / 2.0
    }

    /// Camera coordinates to primary coordinates
    fn camera_to_primary(ratio: f32, camera_len: u32, primary_len: u32, shift: f32) -> Self {
        Self {
            pre: shift,
            scale: primary_len as f32 / (camera_len as f32 * ratio),
            post: Self::centering_offset(ratio, primary_len),
        }
    }

    /// Primary coordinates to camera coordinates
    fn primary_to_camera(ratio: f32, camera_len: u32, primary_len: u32, shift: f32) -> Self {
        Self {
            pre: Self::centering_offset(ratio, primary_len),
            scale: camera_len as f32 / primary_len as f32 * ratio,
            post: shift,
        }
    }

    fn shift_only(shift: f32, forward: bool) -> Self {
        Self {
            pre: if forward { 0.0 } else { shift },
            scale: 1.0,
            post: if forward { shift } else { 0.0 },
        }
    }
}

/// Geometry engine for one logical camera session
#[derive(Debug, Clone, PartialEq)]
pub struct ZoomTranslator {
    cameras: Vec<LinkedCamera>,
    primary_index: usize,
}

impl ZoomTranslator {
    /// Create a translator over `cameras` with `primary_camera_id` as app space
    pub fn new(cameras: Vec<LinkedCamera>, primary_camera_id: u32) -> Result<Self, TranslateError> {
        if cameras.is_empty() {
            return Err(TranslateError::NoCameras);
        }

        for cam in &cameras {
            if cam.active_array_size.is_empty()
                || cam.adjusted_fov_ratio <= 0.0
                || !cam.adjusted_fov_ratio.is_finite()
                || cam.zone_fov_ratio <= 0.0
            {
                return Err(TranslateError::DegenerateGeometry {
                    camera_id: cam.camera_id,
                });
            }
        }

        let primary_index = cameras
            .iter()
            .position(|c| c.camera_id == primary_camera_id)
            .ok_or(TranslateError::CameraNotFound {
                camera_id: primary_camera_id,
            })?;

        debug!(
            "Zoom translator ready: {} cameras, primary {}",
            cameras.len(),
            primary_camera_id
        );

        Ok(Self {
            cameras,
            primary_index,
        })
    }

    /// Create a translator from a configured camera table
    pub fn from_table(table: &CameraTable) -> Result<Self, TranslateError> {
        let cameras = table.iter().map(LinkedCamera::from_info).collect();
        Self::new(cameras, table.primary_camera_id())
    }

    pub fn primary(&self) -> &LinkedCamera {
        &self.cameras[self.primary_index]
    }

    pub fn cameras(&self) -> &[LinkedCamera] {
        &self.cameras
    }

    pub fn index_of(&self, camera_id: u32) -> Option<usize> {
        self.cameras.iter().position(|c| c.camera_id == camera_id)
    }

    pub fn camera(&self, camera_id: u32) -> Option<&LinkedCamera> {
        self.cameras.iter().find(|c| c.camera_id == camera_id)
    }

    fn lookup(&self, camera_id: u32) -> Result<usize, TranslateError> {
        self.index_of(camera_id)
            .ok_or(TranslateError::CameraNotFound { camera_id })
    }

    /// Per-axis user zoom of a crop on the primary active array
    pub fn user_zoom(&self, user_crop: &Rect) -> Result<(f32, f32), TranslateError> {
        if !user_crop.has_area() {
            return Err(TranslateError::InvalidCrop {
                width: user_crop.width,
                height: user_crop.height,
            });
        }
        let aa = self.primary().active_array_size;
        Ok((
            aa.width as f32 / user_crop.width as f32,
            aa.height as f32 / user_crop.height as f32,
        ))
    }

    /// Equivalent crop of `user_crop` on every linked camera
    pub fn translated_zoom(&self, user_crop: &Rect) -> Result<TranslatedZoom, TranslateError> {
        let (zoom_x, zoom_y) = self.user_zoom(user_crop)?;
        let primary_ratio = self.primary().adjusted_fov_ratio;

        let regions = self
            .cameras
            .iter()
            .enumerate()
            .map(|(i, cam)| {
                let same_optics = (cam.adjusted_fov_ratio - primary_ratio).abs() < RATIO_EPSILON;
                let total_zoom = if i == self.primary_index || same_optics {
                    *user_crop
                } else {
                    Self::scaled_crop(cam, zoom_x, zoom_y)
                };

                let full = cam.active_array_size.full_rect();
                let ife = cam.ife_fov.unwrap_or(full);
                let isp_limit = ife.intersect(&total_zoom).unwrap_or(ife);

                ZoomRegion {
                    camera_id: cam.camera_id,
                    total_zoom,
                    isp_limit,
                    zoom: cam.active_array_size.width as f32 / total_zoom.width.max(1) as f32,
                }
            })
            .collect::<Vec<_>>();

        for r in &regions {
            trace!(
                "Camera {} crop {:?} isp {:?} zoom {:.3}",
                r.camera_id,
                r.total_zoom,
                r.isp_limit,
                r.zoom
            );
        }

        Ok(TranslatedZoom {
            user_zoom: zoom_x,
            regions,
        })
    }

    /// Centered crop on a non-primary camera; zoom below the zone ratio
    /// falls back to the full array on that axis
    fn scaled_crop(cam: &LinkedCamera, zoom_x: f32, zoom_y: f32) -> Rect {
        fn axis(len: u32, zoom: f32) -> i32 {
            if zoom <= 1.0 {
                len as i32
            } else {
                ((len as f32 / zoom).round() as i32).clamp(1, len as i32)
            }
        }

        let aa = cam.active_array_size;
        let width = axis(aa.width, zoom_x / cam.zone_fov_ratio);
        let height = axis(aa.height, zoom_y / cam.zone_fov_ratio);
        Rect::new(
            (aa.width as i32 - width) / 2,
            (aa.height as i32 - height) / 2,
            width,
            height,
        )
    }

    fn maps_to_primary(
        &self,
        master_camera_id: u32,
        user_crop: &Rect,
        shift: PixelShift,
    ) -> Result<(AxisMap, AxisMap), TranslateError> {
        let (zoom_x, zoom_y) = self.user_zoom(user_crop)?;
        let index = self.lookup(master_camera_id)?;

        if index == self.primary_index {
            return Ok((
                AxisMap::shift_only(shift.x as f32, false),
                AxisMap::shift_only(shift.y as f32, false),
            ));
        }

        let cam = &self.cameras[index];
        let primary = self.primary().active_array_size;
        let r = cam.adjusted_fov_ratio;
        Ok((
            AxisMap::camera_to_primary(
                r,
                cam.active_array_size.width,
                primary.width,
                shift.x as f32 * r / zoom_x,
            ),
            AxisMap::camera_to_primary(
                r,
                cam.active_array_size.height,
                primary.height,
                shift.y as f32 * r / zoom_y,
            ),
        ))
    }

    /// Map a rectangle in the master camera's space into app space
    pub fn translated_rect(
        &self,
        master_camera_id: u32,
        user_crop: &Rect,
        src: &RectEdges,
        shift: PixelShift,
    ) -> Result<RectEdges, TranslateError> {
        let (mx, my) = self.maps_to_primary(master_camera_id, user_crop, shift)?;
        let dst = RectEdges::new(
            mx.apply(src.left),
            my.apply(src.top),
            mx.apply(src.right),
            my.apply(src.bottom),
        );
        Ok(dst.clamp_to(self.primary().active_array_size))
    }

    /// Map points in the master camera's space into app space
    pub fn translated_points(
        &self,
        master_camera_id: u32,
        user_crop: &Rect,
        points: &[Point],
        shift: PixelShift,
    ) -> Result<Vec<Point>, TranslateError> {
        let (mx, my) = self.maps_to_primary(master_camera_id, user_crop, shift)?;
        let bounds = self.primary().active_array_size;
        Ok(points
            .iter()
            .map(|p| {
                Point::new(
                    mx.apply(p.x).clamp(0, bounds.width as i32),
                    my.apply(p.y).clamp(0, bounds.height as i32),
                )
            })
            .collect())
    }

    /// Map an app metering region into `camera_id`'s space
    ///
    /// Unset regions pass through. The result is clamped to the last valid
    /// pixel of the camera's active array.
    pub fn translate_metering_region(
        &self,
        camera_id: u32,
        region: &WeightedRegion,
        user_zoom: f32,
        shift: PixelShift,
    ) -> Result<WeightedRegion, TranslateError> {
        if region.is_unset() {
            return Ok(*region);
        }
        if user_zoom <= 0.0 || !user_zoom.is_finite() {
            return Err(TranslateError::InvalidZoom(user_zoom));
        }

        let index = self.lookup(camera_id)?;
        let cam = &self.cameras[index];
        let (mx, my) = if index == self.primary_index {
            (
                AxisMap::shift_only(shift.x as f32, true),
                AxisMap::shift_only(shift.y as f32, true),
            )
        } else {
            let primary = self.primary().active_array_size;
            let r = cam.adjusted_fov_ratio;
            let factor = r / user_zoom;
            (
                AxisMap::primary_to_camera(
                    r,
                    cam.active_array_size.width,
                    primary.width,
                    shift.x as f32 * factor,
                ),
                AxisMap::primary_to_camera(
                    r,
                    cam.active_array_size.height,
                    primary.height,
                    shift.y as f32 * factor,
                ),
            )
        };

        let max_x = cam.active_array_size.width as i32 - 1;
        let max_y = cam.active_array_size.height as i32 - 1;
        Ok(WeightedRegion {
            x_min: mx.apply(region.x_min).clamp(0, max_x),
            y_min: my.apply(region.y_min).clamp(0, max_y),
            x_max: mx.apply(region.x_max).clamp(0, max_x),
            y_max: my.apply(region.y_max).clamp(0, max_y),
            weight: region.weight,
        })
    }

    /// Scale a reference crop window by the active array size ratio
    pub fn translate_reference_crop(
        &self,
        camera_id: u32,
        reference: Dimension,
    ) -> Result<Dimension, TranslateError> {
        let cam = &self.cameras[self.lookup(camera_id)?];
        let primary = self.primary().active_array_size;
        let scale = |v: u32, cam_len: u32, prim_len: u32| {
            (u64::from(v) * u64::from(cam_len) / u64::from(prim_len)) as u32
        };
        Ok(Dimension::new(
            scale(reference.width, cam.active_array_size.width, primary.width),
            scale(reference.height, cam.active_array_size.height, primary.height),
        ))
    }
}
