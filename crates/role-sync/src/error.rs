//! Sync error types

use thiserror::Error;

use crate::table::{AlgoRole, SyncType, TableKind};

/// Errors from sync data parsing and dependency resolution
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    /// Active pipeline count outside `1..=max`
    #[error("{count} active pipelines in current request, expected 1..={max}")]
    ActivePipelineCount { count: usize, max: usize },

    /// Active pipeline count of the previous batch outside `1..=max`
    #[error("{count} active pipelines in previous request, expected 1..={max}")]
    PreviousPipelineCount { count: usize, max: usize },

    /// This pipeline is not part of the current batch
    #[error("Pipeline {pipeline_id} is not active in the current request")]
    OwnPipelineInactive { pipeline_id: u32 },

    /// A follower found no active peer
    #[error("Follower pipeline {pipeline_id} has no active peer")]
    MissingPeer { pipeline_id: u32 },

    /// A follower's batch is not flagged multi-pipeline
    #[error("Follower pipeline {pipeline_id} request is not a multi-pipeline request")]
    NotMultiRequest { pipeline_id: u32 },

    /// Request id missing from the batch
    #[error("No request id for pipeline {pipeline_id}")]
    MissingRequestId { pipeline_id: u32 },

    /// Table lookup miss; a configuration error
    #[error("No matching rule for {sync_type:?}/{role:?} in {table:?} table")]
    NoMatchingRule {
        sync_type: SyncType,
        role: AlgoRole,
        table: TableKind,
    },

    /// Table failed validation
    #[error("Invalid dependency table: {0}")]
    InvalidTable(String),

    /// Table file could not be loaded
    #[error("Failed to load dependency tables: {0}")]
    Load(String),
}
