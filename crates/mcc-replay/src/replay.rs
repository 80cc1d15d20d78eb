//! Scenario replay
//!
//! The controller runs on the caller's task. Each pipeline (one per linked
//! camera, in declaration order) owns the role-sync coordinators of its
//! statistics algorithms and runs on its own task, fed over a channel.

use std::sync::Arc;

use anyhow::{anyhow, Context};
use camera_geometry::Rect;
use multicam_controller::{
    ControllerManager, ControllerResult, FrameResult, MccConfig, TranslatedRequest,
};
use role_sync::{
    DependencyTables, MultiRequestSyncData, RequestBatch, RoleSyncCoordinator, SyncMode,
    SyncOutcome, SyncType,
};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::scenario::Scenario;

const PIPELINE_QUEUE_DEPTH: usize = 16;

/// One algorithm's sync decision on one pipeline
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub sync_type: SyncType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<SyncOutcome>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub pipeline_id: u32,
    pub camera_id: u32,
    pub syncs: Vec<SyncReport>,
}

/// Everything the replay decided for one request
#[derive(Debug, Clone, Serialize)]
pub struct RequestReport {
    pub index: usize,
    pub request_id: u64,
    pub crop: Rect,
    pub result: ControllerResult,
    pub requests: Vec<TranslatedRequest>,
    pub pipelines: Vec<PipelineReport>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame: Option<FrameResult>,
}

enum PipelineMessage {
    Request {
        request_id: u64,
        data: Arc<MultiRequestSyncData>,
        reply: oneshot::Sender<PipelineReport>,
    },
    Flush,
}

async fn pipeline_task(
    pipeline_id: u32,
    camera_id: u32,
    mode: SyncMode,
    tables: Arc<DependencyTables>,
    mut rx: mpsc::Receiver<PipelineMessage>,
) {
    let mut coordinators: Vec<RoleSyncCoordinator> = SyncType::ALL
        .iter()
        .map(|&sync_type| {
            RoleSyncCoordinator::new(sync_type, pipeline_id, mode, Arc::clone(&tables))
        })
        .collect();

    while let Some(message) = rx.recv().await {
        match message {
            PipelineMessage::Flush => {
                debug!("Pipeline {} flushed", pipeline_id);
                coordinators.iter_mut().for_each(RoleSyncCoordinator::reset);
            }
            PipelineMessage::Request {
                request_id,
                data,
                reply,
            } => {
                let syncs = coordinators
                    .iter_mut()
                    .map(|coordinator| {
                        let sync_type = coordinator.sync_type();
                        match coordinator.update_dependencies(request_id, &data) {
                            Ok(outcome) => SyncReport {
                                sync_type,
                                outcome: Some(outcome),
                                error: None,
                            },
                            Err(e) => {
                                debug!(
                                    "Pipeline {} {:?} request {} unresolved",
                                    pipeline_id, sync_type, request_id
                                );
                                SyncReport {
                                    sync_type,
                                    outcome: None,
                                    error: Some(e.to_string()),
                                }
                            }
                        }
                    })
                    .collect();

                let report = PipelineReport {
                    pipeline_id,
                    camera_id,
                    syncs,
                };
                if reply.send(report).is_err() {
                    warn!("Pipeline {} report for request {} dropped", pipeline_id, request_id);
                }
            }
        }
    }

    debug!("Pipeline {} stopped", pipeline_id);
}

/// Run every request of `scenario` and report what each one resolved to
pub async fn run_scenario(
    scenario: &Scenario,
    config: MccConfig,
) -> anyhow::Result<Vec<RequestReport>> {
    let manager = ControllerManager::new(config);
    let mcc = manager
        .get_controller(&scenario.camera)
        .context("creating controller")?;

    let tables = match &scenario.dependency_tables {
        Some(path) => DependencyTables::from_file(path)?,
        None => DependencyTables::default(),
    };
    let tables = Arc::new(tables);

    let camera_ids = scenario.camera_ids();
    let primary = mcc.primary_camera_id();

    let mut senders = Vec::with_capacity(camera_ids.len());
    let mut handles = Vec::with_capacity(camera_ids.len());
    for (pipeline_id, &camera_id) in camera_ids.iter().enumerate() {
        let (tx, rx) = mpsc::channel::<PipelineMessage>(PIPELINE_QUEUE_DEPTH);
        handles.push(tokio::spawn(pipeline_task(
            pipeline_id as u32,
            camera_id,
            scenario.sync_mode,
            Arc::clone(&tables),
            rx,
        )));
        senders.push(tx);
    }

    info!(
        "Replaying {} requests on logical camera {} ({} pipelines, {:?} sync)",
        scenario.requests.len(),
        mcc.logical_camera_id(),
        senders.len(),
        scenario.sync_mode
    );

    let mut previous = RequestBatch::default();
    let mut request_id = 0u64;
    let mut reports = Vec::with_capacity(scenario.requests.len());

    for (index, request) in scenario.requests.iter().enumerate() {
        if request.flush {
            request_id = 0;
            previous = RequestBatch::default();
            for tx in &senders {
                tx.send(PipelineMessage::Flush)
                    .await
                    .map_err(|_| anyhow!("pipeline task stopped"))?;
            }
        }
        request_id += 1;

        mcc.update_results(Some(&request.crop));
        let result = mcc.result(Some(&request.crop), request.snapshot_active_mask);
        let requests = mcc
            .translate_request_settings(&request.camera_settings(&camera_ids, primary))
            .with_context(|| format!("translating request {}", index))?;

        let current = result.request_batch(vec![request_id; camera_ids.len()]);
        let data = Arc::new(MultiRequestSyncData {
            num_pipelines: camera_ids.len() as u32,
            current: current.clone(),
            previous: previous.clone(),
        });

        let mut replies = Vec::new();
        for (pipeline_id, tx) in senders.iter().enumerate() {
            if !current.is_active(pipeline_id as u32) {
                continue;
            }
            let (reply, rx) = oneshot::channel();
            tx.send(PipelineMessage::Request {
                request_id,
                data: Arc::clone(&data),
                reply,
            })
            .await
            .map_err(|_| anyhow!("pipeline {} task stopped", pipeline_id))?;
            replies.push(rx);
        }

        let mut pipelines = Vec::with_capacity(replies.len());
        for rx in replies {
            pipelines.push(rx.await.context("pipeline dropped a request")?);
        }

        for metadata in &request.metadata {
            mcc.process_result_metadata(metadata);
        }

        let frame = request
            .frame
            .as_ref()
            .map(|f| mcc.translate_result_metadata(f))
            .transpose()
            .with_context(|| format!("translating frame result {}", index))?;

        reports.push(RequestReport {
            index,
            request_id,
            crop: request.crop,
            result,
            requests,
            pipelines,
            frame,
        });
        previous = current;
    }

    drop(senders);
    for handle in handles {
        handle.await?;
    }

    manager.destroy_controller(mcc.logical_camera_id());
    Ok(reports)
}
