//! Engine events and the broadcast bus
//!
//! Every store mutation is announced as an [`EngineEvent`] on the
//! [`EventBus`]. The aggregation task rebuilds the cluster snapshot from
//! these announcements, and each SSE session forwards them to its viewer.
//! Emission is fire-and-forget: a mutation never fails because nobody is
//! listening.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::model::{ProneAlert, Report};

/// Events flowing through the outbreak engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum EngineEvent {
    /// A validated report reached the store
    ReportAppended {
        report: Report,
        timestamp: DateTime<Utc>,
    },

    /// A report was marked resolved by its submitter
    ReportResolved {
        report_id: Uuid,
        disease_key: String,
        timestamp: DateTime<Utc>,
    },

    /// A regional combo counter advanced
    ComboIncremented {
        combo_key: String,
        count: i64,
        timestamp: DateTime<Utc>,
    },

    /// A counter landed on a prone-threshold multiple, or the legacy feed
    /// delivered a record
    ProneAlertRaised {
        alert: ProneAlert,
        timestamp: DateTime<Utc>,
    },

    /// A recovery vote was recorded against a disease key
    OkVoteRecorded {
        disease_key: String,
        votes: i64,
        timestamp: DateTime<Utc>,
    },

    /// The derived cluster snapshot was rebuilt
    ViewChanged {
        generation: u64,
        active_reports: usize,
        clusters: usize,
        timestamp: DateTime<Utc>,
    },
}

impl EngineEvent {
    /// Event name used as the SSE event type
    pub fn event_type(&self) -> &str {
        match self {
            EngineEvent::ReportAppended { .. } => "ReportAppended",
            EngineEvent::ReportResolved { .. } => "ReportResolved",
            EngineEvent::ComboIncremented { .. } => "ComboIncremented",
            EngineEvent::ProneAlertRaised { .. } => "ProneAlertRaised",
            EngineEvent::OkVoteRecorded { .. } => "OkVoteRecorded",
            EngineEvent::ViewChanged { .. } => "ViewChanged",
        }
    }
}

/// Broadcast channel shared by mutation paths, the aggregation task, and
/// SSE sessions.
///
/// Slow subscribers lag rather than block emitters; a lagged subscriber
/// resynchronizes from current state instead of replaying the gap.
///
/// # Example
///
/// ```
/// use cropwatch_common::events::{EngineEvent, EventBus};
///
/// let bus = EventBus::new(256);
/// let mut rx = bus.subscribe();
/// bus.emit_lossy(EngineEvent::OkVoteRecorded {
///     disease_key: "blast".to_string(),
///     votes: 1,
///     timestamp: chrono::Utc::now(),
/// });
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EngineEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a new event bus holding up to `capacity` undelivered events
    /// per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all events emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, reporting how many subscribers received it.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: EngineEvent,
    ) -> Result<usize, broadcast::error::SendError<EngineEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring whether anyone is listening.
    pub fn emit_lossy(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
