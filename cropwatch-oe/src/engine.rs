//! Reactive aggregation task
//!
//! Subscribes to the event bus, rebuilds the cluster snapshot after every
//! store change that can move it, and announces each rebuild with a
//! `ViewChanged` event. The rebuild is a full pass over active reports;
//! lagged subscribers simply converge on the next rebuild.

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

use cropwatch_common::events::EngineEvent;

use crate::cluster;
use crate::error::Result;
use crate::state::AppState;
use crate::store;

/// Rebuild the snapshot from the stores and publish the new generation.
pub async fn recompute(state: &AppState) -> Result<u64> {
    let reports = store::reports::list_active(&state.db).await?;
    let votes = store::votes::list(&state.db).await?;
    let clusters = cluster::build_clusters(&reports, &votes);

    let active_reports = reports.len();
    let cluster_count = clusters.len();
    let generation = state.replace_clusters(clusters).await;
    debug!(generation, active_reports, clusters = cluster_count, "cluster snapshot rebuilt");

    state.emit(EngineEvent::ViewChanged {
        generation,
        active_reports,
        clusters: cluster_count,
        timestamp: Utc::now(),
    });

    Ok(generation)
}

/// True when an event can change the derived cluster set. Counter and
/// prone events never do; reacting to `ViewChanged` would loop.
fn moves_clusters(event: &EngineEvent) -> bool {
    matches!(
        event,
        EngineEvent::ReportAppended { .. }
            | EngineEvent::ReportResolved { .. }
            | EngineEvent::OkVoteRecorded { .. }
    )
}

/// Run the aggregation loop until the bus closes. The receiver is taken
/// as an argument so callers can subscribe before spawning and never miss
/// a mutation emitted in between.
pub async fn run(state: AppState, mut rx: broadcast::Receiver<EngineEvent>) {
    info!("aggregation task started");
    loop {
        match rx.recv().await {
            Ok(event) if moves_clusters(&event) => {
                if let Err(e) = recompute(&state).await {
                    error!("cluster recompute failed: {}", e);
                }
            }
            Ok(_) => {}
            Err(RecvError::Lagged(missed)) => {
                // skipped notifications collapse into one rebuild
                warn!("aggregation task lagged by {} events", missed);
                if let Err(e) = recompute(&state).await {
                    error!("cluster recompute failed: {}", e);
                }
            }
            Err(RecvError::Closed) => {
                info!("event bus closed, aggregation task stopping");
                break;
            }
        }
    }
}
