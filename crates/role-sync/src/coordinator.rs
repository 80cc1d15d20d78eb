//! Per-pipeline role sync coordinator

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::sync_data::{parse_multi_request_info, MultiRequestSyncData, PeerSyncInfo};
use crate::table::{AlgoAction, AlgoRole, DependencyTables, PropertyId, PropertyPair, SyncType, TableKind};

/// How the statistics algorithm is shared across pipelines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// One algorithm instance per pipeline; roles matter
    #[default]
    Independent,
    /// One algorithm instance fed by every pipeline
    Singleton,
    /// No cross-pipeline waits
    Disabled,
}

/// Progress of the current request through the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SyncPhase {
    #[default]
    NoSync,
    SyncPending,
    DependencyAdded,
    ResolvedAction,
}

/// Wait on a property published by some pipeline's request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDependency {
    pub property: PropertyId,

    /// Pipeline that publishes the property
    pub pipeline_id: u32,

    /// Distance in requests, always non-negative
    pub offset: u64,

    /// Offset points forward, at a request the peer has not produced yet
    pub negate: bool,
}

/// Dependencies declared for one request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencySet {
    entries: Vec<PropertyDependency>,
}

impl DependencySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a dependency for `pair` relative to `peer`
    pub fn add(&mut self, pair: &PropertyPair, own_pipeline_id: u32, peer: &PeerSyncInfo) {
        let pipeline_id = if pair.cross_pipeline {
            peer.peer_pipeline_id
        } else {
            own_pipeline_id
        };
        self.entries.push(PropertyDependency {
            property: pair.property,
            pipeline_id,
            offset: peer.request_delta.unsigned_abs(),
            negate: peer.request_delta < 0,
        });
    }

    pub fn has_property_dependency(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PropertyDependency> {
        self.entries.iter()
    }

    /// Log every entry at debug level
    pub fn print(&self, pipeline_id: u32, request_id: u64) {
        for (i, dep) in self.entries.iter().enumerate() {
            debug!(
                "Pipeline {} request {} dependency[{}]: property {} pipeline {} offset {} negate {}",
                pipeline_id, request_id, i, dep.property, dep.pipeline_id, dep.offset, dep.negate
            );
        }
    }
}

/// Everything resolved for one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub peer: PeerSyncInfo,
    pub role: AlgoRole,
    pub action: AlgoAction,
    pub role_switched: bool,
    /// Table the rule came from, `None` when no sync was needed
    pub table: Option<TableKind>,
    pub dependencies: DependencySet,
}

/// Resolves role, action and dependencies of one algorithm on one pipeline
#[derive(Debug, Clone)]
pub struct RoleSyncCoordinator {
    sync_type: SyncType,
    pipeline_id: u32,
    mode: SyncMode,
    tables: Arc<DependencyTables>,
    role: AlgoRole,
    action: AlgoAction,
    phase: SyncPhase,
    /// Whether any request has resolved since the last reset
    resolved_once: bool,
}

impl RoleSyncCoordinator {
    pub fn new(
        sync_type: SyncType,
        pipeline_id: u32,
        mode: SyncMode,
        tables: Arc<DependencyTables>,
    ) -> Self {
        info!(
            "Role sync for {:?} on pipeline {} in {:?} mode",
            sync_type, pipeline_id, mode
        );
        Self {
            sync_type,
            pipeline_id,
            mode,
            tables,
            role: AlgoRole::Master,
            action: AlgoAction::ProcessRequest,
            phase: SyncPhase::NoSync,
            resolved_once: false,
        }
    }

    pub fn sync_type(&self) -> SyncType {
        self.sync_type
    }

    pub fn pipeline_id(&self) -> u32 {
        self.pipeline_id
    }

    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    pub fn role(&self) -> AlgoRole {
        self.role
    }

    /// Force a role, e.g. after a flush
    pub fn set_role(&mut self, role: AlgoRole) {
        self.role = role;
    }

    pub fn action(&self) -> AlgoAction {
        self.action
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    /// Forget role history; the next request cannot count as a role switch
    pub fn reset(&mut self) {
        self.resolved_once = false;
        self.action = AlgoAction::ProcessRequest;
        self.phase = SyncPhase::NoSync;
    }

    /// Parse the sync data from this pipeline's point of view
    pub fn parse_multi_request_info(
        &self,
        request_id_from_last_flush: u64,
        data: &MultiRequestSyncData,
    ) -> Result<PeerSyncInfo, SyncError> {
        parse_multi_request_info(self.pipeline_id, request_id_from_last_flush, data)
    }

    /// Resolve role, dependencies and action for one request
    ///
    /// State changes only on success; a failed request leaves role and
    /// action as they were.
    pub fn update_dependencies(
        &mut self,
        request_id_from_last_flush: u64,
        data: &MultiRequestSyncData,
    ) -> Result<SyncOutcome, SyncError> {
        if self.mode == SyncMode::Disabled {
            self.action = AlgoAction::ProcessRequest;
            self.phase = SyncPhase::NoSync;
            return Ok(SyncOutcome {
                peer: PeerSyncInfo::default(),
                role: self.role,
                action: self.action,
                role_switched: false,
                table: None,
                dependencies: DependencySet::new(),
            });
        }

        let mut phase = SyncPhase::SyncPending;
        let peer = self
            .parse_multi_request_info(request_id_from_last_flush, data)
            .map_err(|e| {
                metrics::counter!("role_sync_failures_total").increment(1);
                warn!(
                    "{:?} sync on pipeline {} failed: {}",
                    self.sync_type, self.pipeline_id, e
                );
                e
            })?;

        let role = AlgoRole::from_master_flag(peer.is_master);
        let role_switched = self.resolved_once && role != self.role;
        if role_switched {
            info!(
                "{:?} on pipeline {} switched role {:?} -> {:?}",
                self.sync_type, self.pipeline_id, self.role, role
            );
        }

        let mut dependencies = DependencySet::new();
        let (action, table) = if peer.need_sync {
            let kind = match (self.mode, role_switched) {
                (SyncMode::Singleton, _) => TableKind::Singleton,
                (_, true) => TableKind::RoleSwitch,
                (_, false) => TableKind::Independent,
            };
            let rule = self.tables.get(kind).lookup(self.sync_type, role)?;

            for pair in rule.active_properties() {
                dependencies.add(pair, self.pipeline_id, &peer);
                phase = SyncPhase::DependencyAdded;
            }
            (rule.action, Some(kind))
        } else {
            (AlgoAction::ProcessRequest, None)
        };

        self.role = role;
        self.action = action;
        self.resolved_once = true;
        self.phase = if peer.need_sync {
            SyncPhase::ResolvedAction
        } else {
            SyncPhase::NoSync
        };

        debug!(
            "{:?} pipeline {}: {:?} action {:?} via {:?} ({} dependencies, last phase {:?})",
            self.sync_type,
            self.pipeline_id,
            role,
            action,
            table,
            dependencies.len(),
            phase
        );
        dependencies.print(self.pipeline_id, request_id_from_last_flush);

        Ok(SyncOutcome {
            peer,
            role,
            action,
            role_switched,
            table,
            dependencies,
        })
    }
}
