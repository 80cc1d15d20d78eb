//! Multi-Camera Controller
//!
//! Runs one logical camera built from several physical cameras:
//! - Master and active-camera selection from the live user zoom
//! - Hard-cut override with hysteresis against algorithm recommendations
//! - Request crop/metering translation and result metadata back-translation
//! - Topology variants (SAT, RTB, VR) behind one trait, built by a factory
//!
//! Every controller keeps its state behind a single lock held only for the
//! duration of one read or update.

pub mod config;
pub mod consolidate;
pub mod controller;
pub mod create;
pub mod error;
pub mod manager;
pub mod metadata;
pub mod override_state;
pub mod request;
pub mod result;
pub mod rtb;
pub mod sat;
mod session;
pub mod vr;

pub use config::MccConfig;
pub use consolidate::{
    consolidate_camera_info, CameraCapabilities, FrameDuration, LogicalCameraCaps, StreamConfig,
};
pub use controller::MultiCamController;
pub use create::{MccCreateData, StreamFlags, StreamInfo, StreamKind, Topology, MAX_LINKED_CAMERAS};
pub use error::ControllerError;
pub use manager::{create_controller, ControllerManager};
pub use metadata::{
    BokehResult, FaceRegion, FrameResult, LowPowerMode, OpticalZoomResult, RealtimeResult,
    ResultMetadata, DEFAULT_FOCUS_DISTANCE_CM,
};
pub use override_state::OverrideState;
pub use request::{CameraRequestSettings, CropRegions, TranslatedRequest};
pub use result::{ActiveCamera, ControllerResult};
pub use rtb::RtbController;
pub use sat::SatController;
pub use vr::VrController;
