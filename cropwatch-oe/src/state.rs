//! Shared engine state
//!
//! One [`AppState`] is cloned into every handler, the aggregation task,
//! and each SSE session. The cluster snapshot is replaced wholesale on
//! each recompute; readers hold an `Arc` to whichever snapshot was current
//! when they looked.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tokio::sync::{broadcast, RwLock};

use cropwatch_common::events::{EngineEvent, EventBus};
use cropwatch_common::model::OutbreakCluster;
use cropwatch_common::params::AlertingParams;

/// Shared state accessible by all components
#[derive(Clone)]
pub struct AppState {
    /// Engine database pool
    pub db: SqlitePool,
    /// Event bus announcing store changes
    pub bus: EventBus,
    /// Alerting thresholds loaded at startup
    pub params: AlertingParams,
    /// Service start time, reported by the health endpoint
    pub started_at: DateTime<Utc>,
    /// Latest derived cluster snapshot
    clusters: Arc<RwLock<Arc<Vec<OutbreakCluster>>>>,
    /// Snapshot generation, bumped on every recompute
    generation: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(db: SqlitePool, params: AlertingParams) -> Self {
        let bus = EventBus::new(params.event_bus_capacity);
        Self {
            db,
            bus,
            params,
            started_at: Utc::now(),
            clusters: Arc::new(RwLock::new(Arc::new(Vec::new()))),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Current cluster snapshot (cheap Arc clone, no copying).
    pub async fn clusters(&self) -> Arc<Vec<OutbreakCluster>> {
        self.clusters.read().await.clone()
    }

    /// Replace the snapshot, returning the new generation number.
    pub async fn replace_clusters(&self, clusters: Vec<OutbreakCluster>) -> u64 {
        *self.clusters.write().await = Arc::new(clusters);
        self.generation.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Relaxed)
    }

    /// Subscribe to events emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.bus.subscribe()
    }

    /// Announce a store change without caring who is listening.
    pub fn emit(&self, event: EngineEvent) {
        self.bus.emit_lossy(event);
    }
}
