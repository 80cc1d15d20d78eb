//! Multi-request sync data and its parser

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::SyncError;

/// Upper bound on pipelines streaming in the same request
pub const MAX_ACTIVE_PIPELINES: usize = 2;

/// Offset of the first request after a flush
pub const FIRST_VALID_REQUEST_ID: u64 = 1;

/// Per-pipeline state of one request batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestBatch {
    /// Bit `i` set when pipeline `i` takes part in the request
    pub active_mask: u32,

    /// Bit `i` set when pipeline `i` is the master
    pub master_mask: u32,

    /// Request id per pipeline, indexed by pipeline id
    pub request_ids: Vec<u64>,

    /// The batch spans more than one pipeline
    pub multi_request: bool,
}

impl RequestBatch {
    pub fn is_active(&self, pipeline_id: u32) -> bool {
        pipeline_id < 32 && self.active_mask & (1 << pipeline_id) != 0
    }

    pub fn is_master(&self, pipeline_id: u32) -> bool {
        pipeline_id < 32 && self.master_mask & (1 << pipeline_id) != 0
    }

    pub fn request_id(&self, pipeline_id: u32) -> Option<u64> {
        self.request_ids.get(pipeline_id as usize).copied()
    }

    fn active_pipelines(&self, num_pipelines: u32) -> Vec<u32> {
        (0..num_pipelines.min(32))
            .filter(|&p| self.is_active(p))
            .collect()
    }
}

/// Current and previous batch as seen by every pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiRequestSyncData {
    pub num_pipelines: u32,
    pub current: RequestBatch,
    pub previous: RequestBatch,
}

/// What this pipeline must synchronize against for one request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerSyncInfo {
    pub need_sync: bool,
    pub is_master: bool,
    pub peer_pipeline_id: u32,

    /// Own request id minus the peer's request id
    pub request_delta: i64,
}

/// Signed difference of two request ids
pub fn request_delta(request_id: u64, peer_request_id: u64) -> i64 {
    (request_id as i64).wrapping_sub(peer_request_id as i64)
}

/// Work out the peer and request offset for `pipeline_id`
///
/// A master depends on the previous batch (preferring a pipeline that was
/// follower there) except on the first request after a flush. A follower
/// depends on the current batch's master.
pub fn parse_multi_request_info(
    pipeline_id: u32,
    request_id_from_last_flush: u64,
    data: &MultiRequestSyncData,
) -> Result<PeerSyncInfo, SyncError> {
    let current = &data.current;
    let active = current.active_pipelines(data.num_pipelines);

    if active.is_empty() || active.len() > MAX_ACTIVE_PIPELINES {
        warn!(
            "Pipeline {}: {} active pipelines in request",
            pipeline_id,
            active.len()
        );
        return Err(SyncError::ActivePipelineCount {
            count: active.len(),
            max: MAX_ACTIVE_PIPELINES,
        });
    }
    if !active.contains(&pipeline_id) {
        return Err(SyncError::OwnPipelineInactive { pipeline_id });
    }

    let is_master = current.is_master(pipeline_id);
    let own_request = current
        .request_id(pipeline_id)
        .ok_or(SyncError::MissingRequestId { pipeline_id })?;

    let peer = if is_master {
        if request_id_from_last_flush == FIRST_VALID_REQUEST_ID {
            None
        } else {
            let previous = &data.previous;
            let prev_active = previous.active_pipelines(data.num_pipelines);
            if prev_active.is_empty() || prev_active.len() > MAX_ACTIVE_PIPELINES {
                return Err(SyncError::PreviousPipelineCount {
                    count: prev_active.len(),
                    max: MAX_ACTIVE_PIPELINES,
                });
            }

            let prev_follower = prev_active
                .iter()
                .copied()
                .find(|&p| p != pipeline_id && !previous.is_master(p));
            let prev_master = prev_active
                .iter()
                .copied()
                .find(|&p| p != pipeline_id && previous.is_master(p));

            match prev_follower.or(prev_master) {
                Some(p) => Some((
                    p,
                    previous
                        .request_id(p)
                        .ok_or(SyncError::MissingRequestId { pipeline_id: p })?,
                )),
                None => None,
            }
        }
    } else {
        let peer = active
            .iter()
            .copied()
            .find(|&p| p != pipeline_id)
            .ok_or(SyncError::MissingPeer { pipeline_id })?;
        if !current.multi_request {
            return Err(SyncError::NotMultiRequest { pipeline_id });
        }
        Some((
            peer,
            current
                .request_id(peer)
                .ok_or(SyncError::MissingRequestId { pipeline_id: peer })?,
        ))
    };

    let info = match peer {
        Some((peer_pipeline_id, peer_request)) => PeerSyncInfo {
            need_sync: true,
            is_master,
            peer_pipeline_id,
            request_delta: request_delta(own_request, peer_request),
        },
        None => PeerSyncInfo {
            need_sync: false,
            is_master,
            peer_pipeline_id: pipeline_id,
            request_delta: 0,
        },
    };

    debug!(
        "Pipeline {} request {}: master {} need_sync {} peer {} delta {}",
        pipeline_id,
        own_request,
        info.is_master,
        info.need_sync,
        info.peer_pipeline_id,
        info.request_delta
    );
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(active: u32, master: u32, ids: &[u64], multi: bool) -> RequestBatch {
        RequestBatch {
            active_mask: active,
            master_mask: master,
            request_ids: ids.to_vec(),
            multi_request: multi,
        }
    }

    #[test]
    fn test_master_syncs_with_previous_follower() {
        let data = MultiRequestSyncData {
            num_pipelines: 2,
            current: batch(0b01, 0b01, &[12, 11], false),
            previous: batch(0b11, 0b01, &[11, 10], true),
        };
        let info = parse_multi_request_info(0, 5, &data).unwrap();
        assert!(info.need_sync);
        assert!(info.is_master);
        assert_eq!(info.peer_pipeline_id, 1);
        assert_eq!(info.request_delta, 12 - 10);
    }

    #[test]
    fn test_master_prefers_previous_follower() {
        let data = MultiRequestSyncData {
            num_pipelines: 3,
            current: batch(0b001, 0b001, &[30, 0, 0], false),
            previous: batch(0b110, 0b100, &[0, 28, 29], true),
        };
        let info = parse_multi_request_info(0, 9, &data).unwrap();
        assert_eq!(info.peer_pipeline_id, 1);
        assert_eq!(info.request_delta, 2);
    }

    #[test]
    fn test_master_falls_back_to_previous_master() {
        let data = MultiRequestSyncData {
            num_pipelines: 2,
            current: batch(0b01, 0b01, &[7, 6], false),
            previous: batch(0b10, 0b10, &[5, 6], false),
        };
        let info = parse_multi_request_info(0, 4, &data).unwrap();
        assert!(info.need_sync);
        assert_eq!(info.peer_pipeline_id, 1);
        assert_eq!(info.request_delta, 1);
    }

    #[test]
    fn test_master_alone_previously_needs_no_sync() {
        let data = MultiRequestSyncData {
            num_pipelines: 2,
            current: batch(0b01, 0b01, &[7, 0], false),
            previous: batch(0b01, 0b01, &[6, 0], false),
        };
        let info = parse_multi_request_info(0, 4, &data).unwrap();
        assert!(!info.need_sync);
        assert!(info.is_master);
    }

    #[test]
    fn test_first_request_needs_no_sync() {
        let data = MultiRequestSyncData {
            num_pipelines: 2,
            current: batch(0b11, 0b01, &[1, 1], true),
            previous: RequestBatch::default(),
        };
        let info = parse_multi_request_info(0, FIRST_VALID_REQUEST_ID, &data).unwrap();
        assert!(!info.need_sync);
    }

    #[test]
    fn test_follower_syncs_with_current_master() {
        let data = MultiRequestSyncData {
            num_pipelines: 2,
            current: batch(0b11, 0b01, &[20, 19], true),
            previous: batch(0b11, 0b01, &[19, 18], true),
        };
        let info = parse_multi_request_info(1, 20, &data).unwrap();
        assert!(info.need_sync);
        assert!(!info.is_master);
        assert_eq!(info.peer_pipeline_id, 0);
        assert_eq!(info.request_delta, -1);
    }

    #[test]
    fn test_follower_requires_multi_request() {
        let data = MultiRequestSyncData {
            num_pipelines: 2,
            current: batch(0b11, 0b01, &[20, 19], false),
            previous: RequestBatch::default(),
        };
        assert_eq!(
            parse_multi_request_info(1, 20, &data),
            Err(SyncError::NotMultiRequest { pipeline_id: 1 })
        );
    }

    #[test]
    fn test_follower_without_peer() {
        let data = MultiRequestSyncData {
            num_pipelines: 2,
            current: batch(0b10, 0b00, &[0, 19], true),
            previous: RequestBatch::default(),
        };
        assert_eq!(
            parse_multi_request_info(1, 20, &data),
            Err(SyncError::MissingPeer { pipeline_id: 1 })
        );
    }

    #[test]
    fn test_sanity_checks() {
        let too_many = MultiRequestSyncData {
            num_pipelines: 3,
            current: batch(0b111, 0b001, &[1, 1, 1], true),
            previous: RequestBatch::default(),
        };
        assert_eq!(
            parse_multi_request_info(0, 3, &too_many),
            Err(SyncError::ActivePipelineCount { count: 3, max: 2 })
        );

        let not_own = MultiRequestSyncData {
            num_pipelines: 2,
            current: batch(0b10, 0b10, &[1, 1], false),
            previous: RequestBatch::default(),
        };
        assert_eq!(
            parse_multi_request_info(0, 3, &not_own),
            Err(SyncError::OwnPipelineInactive { pipeline_id: 0 })
        );

        let empty = MultiRequestSyncData {
            num_pipelines: 2,
            ..Default::default()
        };
        assert_eq!(
            parse_multi_request_info(0, 3, &empty),
            Err(SyncError::ActivePipelineCount { count: 0, max: 2 })
        );
    }

    #[test]
    fn test_previous_batch_sanity() {
        let data = MultiRequestSyncData {
            num_pipelines: 2,
            current: batch(0b01, 0b01, &[4, 0], false),
            previous: RequestBatch::default(),
        };
        assert_eq!(
            parse_multi_request_info(0, 4, &data),
            Err(SyncError::PreviousPipelineCount { count: 0, max: 2 })
        );
    }
}
