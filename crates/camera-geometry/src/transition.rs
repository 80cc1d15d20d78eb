//! Transition zone calculation
//!
//! Every camera owns the zoom interval `[left, right)` in which it is the
//! preferred source. Neighbouring cameras in FOV order share one boundary
//! zone; smooth boundaries carry an overlap band and a fusion band around
//! the boundary ratio, hard-cut boundaries carry neither.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::camera::{CameraTable, FovBasis, PhysicalCamera};
use crate::error::GeometryError;

/// Zone tunables
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionParams {
    /// Overlap band half-width around a smooth boundary, as a fraction of the ratio
    pub overlap_margin: f32,

    /// Hysteresis added above the boundary before the fusion band starts
    pub hysteresis_margin: f32,

    /// Fusion band margin around the boundary
    pub transition_margin: f32,

    /// Lowest zoom at which fusion may run
    pub fusion_zoom_min: f32,

    /// Highest zoom at which fusion may run
    pub fusion_zoom_max: f32,

    /// Maximum user zoom; right edge of the narrowest smooth camera
    pub max_user_zoom: f32,
}

impl Default for TransitionParams {
    fn default() -> Self {
        Self {
            overlap_margin: 0.20,
            hysteresis_margin: 0.05,
            transition_margin: 0.20,
            fusion_zoom_min: 1.5,
            fusion_zoom_max: 1.9,
            max_user_zoom: 8.0,
        }
    }
}

impl TransitionParams {
    /// Tight overlap: fewer dual-camera frames, quicker hand-off
    pub fn narrow_overlap() -> Self {
        Self {
            overlap_margin: 0.10,
            ..Default::default()
        }
    }

    /// Generous overlap for slow zoom gestures
    pub fn wide_overlap() -> Self {
        Self {
            overlap_margin: 0.30,
            transition_margin: 0.30,
            ..Default::default()
        }
    }
}

/// Boundary between two FOV-adjacent cameras
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TransitionZone {
    /// Zoom ratio at which the hand-off happens
    pub transition_ratio: f32,

    /// Lower edge of the overlap band
    pub low: f32,

    /// Upper edge of the overlap band
    pub high: f32,

    pub fusion_low: f32,
    pub fusion_high: f32,
    pub smooth_transition_enabled: bool,

    /// False for the outer edges that have no neighbour
    pub is_valid: bool,
}

impl TransitionZone {
    /// Smooth boundary with an overlap band and a fusion band
    pub fn smooth(ratio: f32, params: &TransitionParams) -> Self {
        let right_transition = ratio + ratio * params.hysteresis_margin;
        // the band always spans at least [fusion_zoom_min, fusion_zoom_max]
        let fusion_low =
            (right_transition - ratio * params.transition_margin).min(params.fusion_zoom_min);
        let fusion_high =
            (ratio + ratio * params.transition_margin).max(params.fusion_zoom_max);

        Self {
            transition_ratio: ratio,
            low: ratio - ratio * params.overlap_margin,
            high: ratio + ratio * params.overlap_margin,
            fusion_low,
            fusion_high,
            smooth_transition_enabled: true,
            is_valid: true,
        }
    }

    /// Instant hand-off at a declared ratio
    pub fn hard_cut(ratio: f32) -> Self {
        Self {
            transition_ratio: ratio,
            low: ratio,
            high: ratio,
            fusion_low: ratio,
            fusion_high: ratio,
            smooth_transition_enabled: false,
            is_valid: true,
        }
    }

    /// Outer edge with no neighbour
    pub fn edge(ratio: f32) -> Self {
        Self {
            is_valid: false,
            ..Self::hard_cut(ratio)
        }
    }

    /// Whether both neighbours should stream at this zoom
    pub fn overlap_contains(&self, zoom: f32) -> bool {
        self.is_valid && self.smooth_transition_enabled && zoom >= self.low && zoom <= self.high
    }

    /// Fusion interval, `None` on hard-cut and outer edges
    pub fn fusion_band(&self) -> Option<(f32, f32)> {
        if self.is_valid && self.smooth_transition_enabled {
            Some((self.fusion_low, self.fusion_high))
        } else {
            None
        }
    }
}

/// Computes FOV ratios and transition zones for a camera table
#[derive(Debug, Clone)]
pub struct TransitionZoneCalculator {
    params: TransitionParams,
    basis: FovBasis,
}

impl TransitionZoneCalculator {
    pub fn new(params: TransitionParams) -> Self {
        Self {
            params,
            basis: FovBasis::ActiveArray,
        }
    }

    pub fn with_basis(mut self, basis: FovBasis) -> Self {
        self.basis = basis;
        self
    }

    pub fn params(&self) -> &TransitionParams {
        &self.params
    }

    /// Build a camera table with ratios and zones
    pub fn build(
        &self,
        cameras: Vec<PhysicalCamera>,
        primary_camera_id: u32,
    ) -> Result<CameraTable, GeometryError> {
        let mut table = CameraTable::new(cameras, primary_camera_id)?;
        self.compute(&mut table)?;
        Ok(table)
    }

    /// Build a camera table with FOV ratios only
    pub fn build_ratios(
        &self,
        cameras: Vec<PhysicalCamera>,
        primary_camera_id: u32,
    ) -> Result<CameraTable, GeometryError> {
        let mut table = CameraTable::new(cameras, primary_camera_id)?;
        self.compute_fov_ratios(&mut table)?;
        Ok(table)
    }

    /// Recompute ratios and zones in place
    pub fn compute(&self, table: &mut CameraTable) -> Result<(), GeometryError> {
        self.compute_fov_ratios(table)?;
        self.compute_zones(table)?;

        for cam in table.cameras.iter().filter(|c| c.fov_valid) {
            info!(
                "Camera {} ratio {:.3} zone [{:.3}, {:.3}) smooth {}",
                cam.camera_id(),
                cam.adjusted_fov_ratio,
                cam.transition_left.transition_ratio,
                cam.transition_right.transition_ratio,
                cam.physical.smooth_transition
            );
        }
        Ok(())
    }

    /// Fill `adjusted_fov_ratio` and the FOV order
    ///
    /// A camera whose FOV cannot be computed keeps ratio 1.0, is left out of
    /// the FOV order and gets no zones. The primary must be valid.
    pub fn compute_fov_ratios(&self, table: &mut CameraTable) -> Result<(), GeometryError> {
        let primary_fov = table.primary().physical.field_of_view(self.basis)?;

        for cam in table.cameras.iter_mut() {
            match cam.physical.field_of_view(self.basis) {
                Ok(fov) => {
                    cam.adjusted_fov_ratio = primary_fov / fov;
                    cam.fov_valid = true;
                }
                Err(e) => {
                    error!("Skipping camera {}: {}", cam.camera_id(), e);
                    cam.adjusted_fov_ratio = 1.0;
                    cam.fov_valid = false;
                }
            }
        }

        let mut order: Vec<usize> = (0..table.cameras.len())
            .filter(|&i| table.cameras[i].fov_valid)
            .collect();
        order.sort_by(|&a, &b| {
            table.cameras[a]
                .adjusted_fov_ratio
                .total_cmp(&table.cameras[b].adjusted_fov_ratio)
        });
        table.fov_order = order;

        Ok(())
    }

    fn compute_zones(&self, table: &mut CameraTable) -> Result<(), GeometryError> {
        for cam in table.cameras.iter_mut() {
            cam.transition_left = TransitionZone::default();
            cam.transition_right = TransitionZone::default();
        }

        let order = table.fov_order.clone();
        let last = order.len().saturating_sub(1);

        for (pos, &idx) in order.iter().enumerate() {
            if pos == 0 {
                let cam = &table.cameras[idx];
                let ratio = if cam.physical.smooth_transition {
                    cam.adjusted_fov_ratio
                } else {
                    cam.physical.transition_zoom_ratio_min
                };
                table.cameras[idx].transition_left = TransitionZone::edge(ratio);
            } else {
                let prev = order[pos - 1];
                let zone = self.boundary(table, prev, idx);
                debug!(
                    "Boundary {} -> {} at {:.3} (band {:.3}..{:.3})",
                    table.cameras[prev].camera_id(),
                    table.cameras[idx].camera_id(),
                    zone.transition_ratio,
                    zone.low,
                    zone.high
                );
                table.cameras[idx].transition_left = zone;
                table.cameras[prev].transition_right = zone;
            }

            if pos == last {
                let cam = &table.cameras[idx];
                let ratio = if cam.physical.smooth_transition {
                    self.params.max_user_zoom
                } else {
                    cam.physical.transition_zoom_ratio_max
                };
                table.cameras[idx].transition_right = TransitionZone::edge(ratio);
            }
        }

        for &idx in &order {
            let cam = &table.cameras[idx];
            let left = cam.transition_left.transition_ratio;
            let right = cam.transition_right.transition_ratio;
            if left >= right {
                return Err(GeometryError::ZoneOrdering {
                    camera_id: cam.camera_id(),
                    left,
                    right,
                });
            }
        }

        Ok(())
    }

    /// Shared zone between `wider` and `narrower`
    fn boundary(&self, table: &CameraTable, wider: usize, narrower: usize) -> TransitionZone {
        let prev = &table.cameras[wider];
        let cur = &table.cameras[narrower];

        if prev.physical.smooth_transition && cur.physical.smooth_transition {
            TransitionZone::smooth(cur.adjusted_fov_ratio, &self.params)
        } else if cur.physical.smooth_transition {
            TransitionZone::hard_cut(prev.physical.transition_zoom_ratio_max)
        } else {
            TransitionZone::hard_cut(cur.physical.transition_zoom_ratio_min)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rect::Dimension;

    fn camera(id: u32, focal: f32, smooth: bool) -> PhysicalCamera {
        PhysicalCamera {
            camera_id: id,
            focal_length: focal,
            pixel_pitch: 1.0,
            active_array_size: Dimension::new(4000, 3000),
            sensor_output: Dimension::new(4000, 3000),
            ife_fov: None,
            always_on: false,
            smooth_transition: smooth,
            transition_zoom_ratio_min: 1.0,
            transition_zoom_ratio_max: 2.0,
        }
    }

    #[test]
    fn test_smooth_dual_zones() {
        let calc = TransitionZoneCalculator::new(TransitionParams::narrow_overlap());
        let table = calc
            .build(vec![camera(0, 4.0, true), camera(1, 8.0, true)], 0)
            .unwrap();

        let wide = table.get(0).unwrap();
        let tele = table.get(1).unwrap();
        assert!((wide.adjusted_fov_ratio - 1.0).abs() < 0.001);
        assert!((tele.adjusted_fov_ratio - 2.0).abs() < 0.001);

        assert!((tele.transition_left.transition_ratio - 2.0).abs() < 0.001);
        assert!((tele.transition_left.low - 1.8).abs() < 0.001);
        assert!((tele.transition_left.high - 2.2).abs() < 0.001);
        assert_eq!(wide.transition_right, tele.transition_left);

        assert!(!wide.transition_left.is_valid);
        assert!(!tele.transition_right.is_valid);
        assert!((tele.transition_right.transition_ratio - 8.0).abs() < 0.001);
    }

    #[test]
    fn test_fusion_band_covers_global_bounds() {
        let zone = TransitionZone::smooth(2.0, &TransitionParams::default());
        // 2.1 - 0.4 = 1.7 widens down to 1.5; 2.4 already clears 1.9
        assert!((zone.fusion_low - 1.5).abs() < 0.001);
        assert!((zone.fusion_high - 2.4).abs() < 0.001);
        assert_eq!(zone.fusion_band(), Some((zone.fusion_low, zone.fusion_high)));

        let far = TransitionZone::smooth(5.0, &TransitionParams::default());
        let (low, high) = far.fusion_band().unwrap();
        assert!((low - 1.5).abs() < 0.001);
        assert!((high - 6.0).abs() < 0.001);

        assert_eq!(TransitionZone::hard_cut(2.0).fusion_band(), None);
    }

    #[test]
    fn test_narrow_overlap_fusion_band() {
        let params = TransitionParams::narrow_overlap();
        let zone = TransitionZone::smooth(1.2, &params);
        // overlap is +-10%, fusion keeps its own 20% margin
        assert!((zone.low - 1.08).abs() < 0.001);
        assert!((zone.high - 1.32).abs() < 0.001);
        // 1.26 - 0.24 = 1.02 is already below 1.5; 1.44 widens up to 1.9
        assert!((zone.fusion_low - 1.02).abs() < 0.001);
        assert!((zone.fusion_high - 1.9).abs() < 0.001);
    }

    #[test]
    fn test_hard_cut_uses_declared_ratio() {
        let mut tele = camera(1, 12.0, false);
        tele.transition_zoom_ratio_min = 2.5;
        tele.transition_zoom_ratio_max = 6.0;

        let calc = TransitionZoneCalculator::new(TransitionParams::default());
        let table = calc.build(vec![camera(0, 4.0, true), tele], 0).unwrap();

        let tele = table.get(1).unwrap();
        assert!((tele.transition_left.transition_ratio - 2.5).abs() < 0.001);
        assert!(!tele.transition_left.smooth_transition_enabled);
        assert!((tele.transition_right.transition_ratio - 6.0).abs() < 0.001);
        assert_eq!(table.get(0).unwrap().transition_right, tele.transition_left);
    }

    #[test]
    fn test_fov_order_independent_of_config_order() {
        let calc = TransitionZoneCalculator::new(TransitionParams::default());
        let table = calc
            .build(
                vec![camera(2, 12.0, true), camera(0, 4.0, true), camera(1, 2.0, true)],
                0,
            )
            .unwrap();

        // ultra-wide (ratio 0.5), wide (1.0), tele (3.0)
        assert_eq!(table.fov_order(), &[2, 1, 0]);
        let uw = table.get(1).unwrap();
        assert!((uw.transition_left.transition_ratio - 0.5).abs() < 0.001);
        assert!((uw.transition_right.transition_ratio - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_invalid_camera_skipped() {
        let calc = TransitionZoneCalculator::new(TransitionParams::default());
        let table = calc
            .build(vec![camera(0, 4.0, true), camera(1, -1.0, true)], 0)
            .unwrap();

        assert_eq!(table.fov_order(), &[0]);
        assert!(!table.get(1).unwrap().fov_valid);
    }

    #[test]
    fn test_invalid_primary_fails() {
        let calc = TransitionZoneCalculator::new(TransitionParams::default());
        let result = calc.build(vec![camera(0, 0.0, true), camera(1, 8.0, true)], 0);
        assert!(matches!(
            result,
            Err(GeometryError::InvalidFocalLength { camera_id: 0, .. })
        ));
    }

    #[test]
    fn test_camera_for_zoom() {
        let calc = TransitionZoneCalculator::new(TransitionParams::narrow_overlap());
        let table = calc
            .build(vec![camera(0, 4.0, true), camera(1, 8.0, true)], 0)
            .unwrap();

        assert_eq!(table.camera_for_zoom(1.5, 0.001), Some(0));
        assert_eq!(table.camera_for_zoom(2.0, 0.001), Some(1));
        assert_eq!(table.camera_for_zoom(2.5, 0.001), Some(1));
        // right edge of the last camera is inclusive
        assert_eq!(table.camera_for_zoom(8.0, 0.001), Some(1));
        assert_eq!(table.camera_for_zoom(9.0, 0.001), None);
        assert_eq!(table.camera_for_zoom_clamped(9.0, 0.001), Some(1));
        assert_eq!(table.camera_for_zoom_clamped(0.5, 0.001), Some(0));
    }
}
