//! Role Synchronization
//!
//! Decides, per capture request, whether a statistics algorithm runs as
//! master or follower and which peer-published data it must wait for:
//! - Rule tables keyed by (sync type, role)
//! - Multi-request sync data parsing (active pipelines, previous roles)
//! - Dependency declaration with request offsets
//!
//! Nothing here waits. Dependencies are declared for an external scheduler.

pub mod coordinator;
pub mod error;
pub mod sync_data;
pub mod table;

pub use coordinator::{
    DependencySet, PropertyDependency, RoleSyncCoordinator, SyncMode, SyncOutcome, SyncPhase,
};
pub use error::SyncError;
pub use sync_data::{
    parse_multi_request_info, MultiRequestSyncData, PeerSyncInfo, RequestBatch,
    FIRST_VALID_REQUEST_ID, MAX_ACTIVE_PIPELINES,
};
pub use table::{
    AlgoAction, AlgoRole, DependencyRule, DependencyTable, DependencyTables, PropertyId,
    PropertyPair, SyncType, TableKind, MAX_PROPERTY_PAIRS,
};
