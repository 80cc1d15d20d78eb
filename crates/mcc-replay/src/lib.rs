//! Multi-camera scenario replay
//!
//! Drives a logical camera through a scripted zoom sequence: controller
//! selection and translation per request, role sync on every active
//! pipeline, then algorithm feedback. Each request yields one report.

pub mod replay;
pub mod scenario;

pub use replay::{run_scenario, PipelineReport, RequestReport, SyncReport};
pub use scenario::{load_scenario, parse_scenario, Scenario, ScenarioRequest};

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Install the global subscriber; logs go to stderr so reports own stdout
pub fn init_logging(json: bool) {
    let builder = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .with_writer(std::io::stderr);

    let result = if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    result.expect("Failed to set tracing subscriber");
}
