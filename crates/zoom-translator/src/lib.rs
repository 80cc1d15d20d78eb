//! Zoom Translator
//!
//! Geometry translation between the cameras of one logical camera:
//! - User crop on the primary camera to per-camera crop and ISP limit
//! - Master-camera rectangles and points back into app coordinates
//! - App metering regions forward into each camera's coordinates
//!
//! The translator holds only the immutable per-camera table it was built
//! with. Live inputs such as the pixel shift are passed on every call.

mod error;
mod translator;

pub use error::TranslateError;
pub use translator::{LinkedCamera, TranslatedZoom, ZoomRegion, ZoomTranslator};
