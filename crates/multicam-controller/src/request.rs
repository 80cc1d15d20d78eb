//! Per-request settings translation
//!
//! The app addresses the logical camera in primary-camera coordinates. Each
//! request carries one settings record per linked camera; only the primary's
//! crop, reference crop and metering regions are authoritative and get
//! remapped onto every other camera.

use camera_geometry::{Dimension, Rect, WeightedRegion};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::MccConfig;
use crate::error::ControllerError;
use crate::session::Session;

/// Crop hand-off to the hardware stage of one camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRegions {
    /// Crop the app asked for, in primary coordinates
    pub user_crop: Rect,

    /// Equivalent crop on this camera's active array
    pub pipeline_crop: Rect,

    /// Pipeline crop limited to the sensor readout window
    pub ife_limit_crop: Rect,
}

/// Incoming settings for one linked camera
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CameraRequestSettings {
    pub camera_id: u32,

    #[serde(default)]
    pub crop_region: Option<Rect>,

    #[serde(default)]
    pub reference_crop: Option<Dimension>,

    #[serde(default)]
    pub af_regions: Vec<WeightedRegion>,

    #[serde(default)]
    pub ae_regions: Vec<WeightedRegion>,
}

impl CameraRequestSettings {
    pub fn new(camera_id: u32) -> Self {
        Self {
            camera_id,
            ..Default::default()
        }
    }

    pub fn with_crop(mut self, crop: Rect) -> Self {
        self.crop_region = Some(crop);
        self
    }
}

/// Settings for one camera after translation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslatedRequest {
    pub camera_id: u32,
    pub crop_regions: Option<CropRegions>,
    pub reference_crop: Option<Dimension>,
    pub af_regions: Vec<WeightedRegion>,
    pub ae_regions: Vec<WeightedRegion>,
    pub is_master: bool,

    /// Camera may drop into low-power mode
    pub low_power: bool,

    /// Hardware frame sync requested for this camera
    pub frame_sync: bool,
}

/// Translate the primary's settings onto every camera in `settings`
pub(crate) fn translate_request_settings(
    session: &mut Session,
    config: &MccConfig,
    settings: &[CameraRequestSettings],
) -> Result<Vec<TranslatedRequest>, ControllerError> {
    let primary_id = session.table.primary_camera_id();
    let primary = settings
        .iter()
        .find(|s| s.camera_id == primary_id)
        .ok_or(ControllerError::MissingPrimarySettings {
            camera_id: primary_id,
        })?;

    if let Some(unknown) = settings
        .iter()
        .find(|s| session.table.index_of(s.camera_id).is_none())
    {
        return Err(ControllerError::CameraNotFound {
            camera_id: unknown.camera_id,
        });
    }

    let zoom = match primary.crop_region {
        Some(crop) => Some(session.translator.translated_zoom(&crop)?),
        None => None,
    };

    if let Some(zoom) = &zoom {
        session.zoom_user = zoom.user_zoom;
        for region in &zoom.regions {
            if let Some(cam) = session.table.get_mut(region.camera_id) {
                cam.zoom = region.zoom;
            }
        }
    }

    let session = &*session;
    let frame_sync = config.kernel_frame_sync && session.adjacent_pair_active();

    settings
        .iter()
        .map(|s| {
            let camera_id = s.camera_id;
            let crop_regions = match (&zoom, primary.crop_region) {
                (Some(zoom), Some(user_crop)) => zoom.get(camera_id).map(|r| CropRegions {
                    user_crop,
                    pipeline_crop: r.total_zoom,
                    ife_limit_crop: r.isp_limit,
                }),
                _ => None,
            };

            let reference_crop = primary
                .reference_crop
                .map(|d| session.translator.translate_reference_crop(camera_id, d))
                .transpose()?;

            let af_regions = metering_regions(session, camera_id, &primary.af_regions)?;
            let ae_regions = metering_regions(session, camera_id, &primary.ae_regions)?;

            let translated = TranslatedRequest {
                camera_id,
                crop_regions,
                reference_crop,
                af_regions,
                ae_regions,
                is_master: camera_id == session.result.master_camera_id,
                low_power: !session.result.is_active(camera_id).unwrap_or(false),
                frame_sync,
            };
            debug!(
                "Camera {}: crop {:?} master {} lpm {} sync {}",
                camera_id,
                translated.crop_regions.map(|c| c.pipeline_crop),
                translated.is_master,
                translated.low_power,
                translated.frame_sync
            );
            Ok(translated)
        })
        .collect()
}

fn metering_regions(
    session: &Session,
    camera_id: u32,
    regions: &[WeightedRegion],
) -> Result<Vec<WeightedRegion>, ControllerError> {
    regions
        .iter()
        .map(|r| {
            session
                .translator
                .translate_metering_region(camera_id, r, session.zoom_user, session.shift_preview)
                .map_err(ControllerError::from)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use camera_geometry::{PhysicalCamera, TransitionParams, TransitionZoneCalculator};

    use crate::create::{MccCreateData, Topology};
    use crate::session::ZoneMode;

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

    fn session() -> Session {
        let data = MccCreateData {
            logical_camera_id: 10,
            topology: Topology::Sat,
            primary_camera_id: 0,
            cameras: vec![camera(0, 4.0), camera(1, 8.0)],
            streams: Vec::new(),
            fusion_enabled: true,
        };
        let calc = TransitionZoneCalculator::new(TransitionParams::narrow_overlap());
        Session::build(&data, &calc, ZoneMode::Zones).unwrap()
    }

    #[test]
    fn test_missing_primary_settings() {
        let mut s = session();
        let err = translate_request_settings(
            &mut s,
            &MccConfig::default(),
            &[CameraRequestSettings::new(1)],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ControllerError::MissingPrimarySettings { camera_id: 0 }
        ));
    }

    #[test]
    fn test_unknown_camera_rejected() {
        let mut s = session();
        let err = translate_request_settings(
            &mut s,
            &MccConfig::default(),
            &[CameraRequestSettings::new(0), CameraRequestSettings::new(5)],
        )
        .unwrap_err();
        assert!(matches!(err, ControllerError::CameraNotFound { camera_id: 5 }));
    }

    #[test]
    fn test_crop_translated_per_camera() {
        let mut s = session();
        s.result.set_active(0, true);
        s.result.master_camera_id = 0;

        let crop = Rect::new(1500, 1125, 1000, 750);
        let settings = [
            CameraRequestSettings::new(0).with_crop(crop),
            CameraRequestSettings::new(1),
        ];
        let out = translate_request_settings(&mut s, &MccConfig::default(), &settings).unwrap();

        assert!((s.zoom_user - 4.0).abs() < 0.001);
        assert_eq!(out[0].crop_regions.unwrap().pipeline_crop, crop);
        assert_eq!(
            out[1].crop_regions.unwrap().pipeline_crop,
            Rect::new(1000, 750, 2000, 1500)
        );
        assert!(out[0].is_master);
        assert!(!out[0].low_power);
        assert!(out[1].low_power);
        assert!(!out[1].frame_sync);
        assert!((s.table.get(1).unwrap().zoom - 2.0).abs() < 0.001);
    }

    #[test]
    fn test_frame_sync_needs_adjacent_pair() {
        let mut s = session();
        s.result.set_all_active(|_| true);

        let config = MccConfig {
            kernel_frame_sync: true,
            ..Default::default()
        };
        let settings = [CameraRequestSettings::new(0), CameraRequestSettings::new(1)];
        let out = translate_request_settings(&mut s, &config, &settings).unwrap();
        assert!(out.iter().all(|r| r.frame_sync));
        assert!(out.iter().all(|r| r.crop_regions.is_none()));
    }

    #[test]
    fn test_metering_regions_follow_primary() {
        let mut s = session();
        let mut primary = CameraRequestSettings::new(0).with_crop(Rect::new(0, 0, 4000, 3000));
        primary.af_regions = vec![WeightedRegion::new(1500, 1000, 2500, 2000, 1)];
        primary.ae_regions = vec![WeightedRegion::default()];

        let out = translate_request_settings(
            &mut s,
            &MccConfig::default(),
            &[primary.clone(), CameraRequestSettings::new(1)],
        )
        .unwrap();

        assert_eq!(out[0].af_regions, primary.af_regions);
        assert_eq!(out[1].ae_regions, vec![WeightedRegion::default()]);
        assert_eq!(out[1].af_regions.len(), 1);
    }
}
