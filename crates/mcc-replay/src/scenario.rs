//! Scenario files: one logical camera plus a sequence of requests

use std::path::{Path, PathBuf};

use anyhow::Context;
use camera_geometry::{Dimension, Rect, WeightedRegion};
use config::{Config, File, FileFormat};
use multicam_controller::{CameraRequestSettings, FrameResult, MccCreateData, ResultMetadata};
use role_sync::SyncMode;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub camera: MccCreateData,

    #[serde(default)]
    pub sync_mode: SyncMode,

    /// Replacement dependency tables, built-in tables when absent
    #[serde(default)]
    pub dependency_tables: Option<PathBuf>,

    pub requests: Vec<ScenarioRequest>,
}

/// One capture request as the app would send it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRequest {
    /// Crop in primary-camera coordinates
    pub crop: Rect,

    #[serde(default)]
    pub reference_crop: Option<Dimension>,

    #[serde(default)]
    pub af_regions: Vec<WeightedRegion>,

    #[serde(default)]
    pub ae_regions: Vec<WeightedRegion>,

    /// Extra cameras a snapshot needs
    #[serde(default)]
    pub snapshot_active_mask: u32,

    /// Flush before this request; request ids restart at 1
    #[serde(default)]
    pub flush: bool,

    /// Algorithm feedback arriving after the request completes
    #[serde(default)]
    pub metadata: Vec<ResultMetadata>,

    /// Master-camera frame result to map back into app space
    #[serde(default)]
    pub frame: Option<FrameResult>,
}

impl ScenarioRequest {
    /// Settings for every camera; only the primary's carry content
    pub fn camera_settings(&self, camera_ids: &[u32], primary: u32) -> Vec<CameraRequestSettings> {
        camera_ids
            .iter()
            .map(|&camera_id| {
                if camera_id != primary {
                    return CameraRequestSettings::new(camera_id);
                }
                CameraRequestSettings {
                    camera_id,
                    crop_region: Some(self.crop),
                    reference_crop: self.reference_crop,
                    af_regions: self.af_regions.clone(),
                    ae_regions: self.ae_regions.clone(),
                }
            })
            .collect()
    }
}

impl Scenario {
    pub fn camera_ids(&self) -> Vec<u32> {
        self.camera.cameras.iter().map(|c| c.camera_id).collect()
    }
}

/// Load a scenario, format chosen by file extension
pub fn load_scenario(path: &Path) -> anyhow::Result<Scenario> {
    let scenario: Scenario = Config::builder()
        .add_source(File::from(path))
        .build()
        .and_then(|c| c.try_deserialize())
        .with_context(|| format!("loading scenario {}", path.display()))?;

    info!(
        "Loaded scenario {}: {:?} with {} cameras, {} requests",
        path.display(),
        scenario.camera.topology,
        scenario.camera.cameras.len(),
        scenario.requests.len()
    );
    Ok(scenario)
}

/// Parse a scenario from text
pub fn parse_scenario(text: &str, format: FileFormat) -> anyhow::Result<Scenario> {
    let scenario = Config::builder()
        .add_source(File::from_str(text, format))
        .build()
        .and_then(|c| c.try_deserialize())
        .context("parsing scenario")?;
    Ok(scenario)
}
