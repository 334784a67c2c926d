//! Write-path orchestration
//!
//! One submission drives several mutations: the report lands in the store,
//! the regional combo counter advances, and a counter landing on a prone
//! multiple raises a broadcast alert. Validation failures surface to the
//! caller; storage failures after validation are logged and swallowed so a
//! submitter in the field is never blocked on engine internals.

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info};
use uuid::Uuid;

use cropwatch_common::events::EngineEvent;
use cropwatch_common::keys;
use cropwatch_common::model::{ProneAlert, ProneSource, Report, ReportSubmission};

use crate::alerts;
use crate::error::{Error, Result};
use crate::state::AppState;
use crate::store;

/// Receipt returned to the submitter. The owner token appears here and
/// nowhere else; losing it means the report can never be resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReceipt {
    pub id: Uuid,
    pub owner_token: Uuid,
}

/// Validate and ingest one submission.
pub async fn ingest_report(state: &AppState, submission: ReportSubmission) -> Result<IngestReceipt> {
    let report = submission.validate()?;
    let owner_token = Uuid::new_v4();
    let receipt = IngestReceipt {
        id: report.id,
        owner_token,
    };

    if let Err(e) = store::reports::insert(&state.db, &report, owner_token).await {
        error!("report append failed, dropping submission {}: {}", report.id, e);
        return Ok(receipt);
    }
    debug!(report = %report.id, disease_key = %report.disease_key, "report appended");
    state.emit(EngineEvent::ReportAppended {
        report: report.clone(),
        timestamp: Utc::now(),
    });

    bump_combo(state, &report).await;

    Ok(receipt)
}

/// Resolve a report on behalf of its submitter. Missing reports and token
/// mismatches surface to the caller; a storage failure after the ownership
/// check only reaches the log.
pub async fn resolve_report(state: &AppState, report_id: Uuid, owner_token: Uuid) -> Result<()> {
    match store::reports::resolve(&state.db, report_id, owner_token).await {
        Ok((report, store::reports::ResolveOutcome::Resolved)) => {
            info!(report = %report.id, disease_key = %report.disease_key, "report resolved");
            state.emit(EngineEvent::ReportResolved {
                report_id: report.id,
                disease_key: report.disease_key,
                timestamp: Utc::now(),
            });
            Ok(())
        }
        Ok((_, store::reports::ResolveOutcome::AlreadyResolved)) => Ok(()),
        Err(e @ Error::NotFound(_)) | Err(e @ Error::Forbidden(_)) => Err(e),
        Err(e) => {
            error!("report resolve failed for {}: {}", report_id, e);
            Ok(())
        }
    }
}

/// Record one recovery vote. Returns the new total, or `None` when the
/// write was dropped on a storage failure.
pub async fn record_ok_vote(state: &AppState, disease_key: &str) -> Option<i64> {
    match store::votes::record(&state.db, disease_key).await {
        Ok(votes) => {
            debug!(disease_key, votes, "recovery vote recorded");
            state.emit(EngineEvent::OkVoteRecorded {
                disease_key: disease_key.to_string(),
                votes,
                timestamp: Utc::now(),
            });
            Some(votes)
        }
        Err(e) => {
            error!("recovery vote failed for {}: {}", disease_key, e);
            None
        }
    }
}

/// Persist and broadcast a prone alert, whether raised by a counter
/// crossing or delivered through the legacy feed.
pub async fn raise_prone_alert(state: &AppState, alert: ProneAlert) {
    if let Err(e) = store::prone::insert(&state.db, &alert).await {
        error!("prone alert append failed for {}: {}", alert.combo_key, e);
        return;
    }
    info!(combo_key = %alert.combo_key, count = alert.count, source = alert.source.as_str(), "prone area alert raised");
    state.emit(EngineEvent::ProneAlertRaised {
        alert,
        timestamp: Utc::now(),
    });
}

async fn bump_combo(state: &AppState, report: &Report) {
    let combo_key = keys::combo_key(&report.region, &report.crop, &report.disease);
    let count = match store::combos::increment(&state.db, &combo_key).await {
        Ok(count) => count,
        Err(e) => {
            error!("combo increment failed for {}: {}", combo_key, e);
            return;
        }
    };
    state.emit(EngineEvent::ComboIncremented {
        combo_key: combo_key.clone(),
        count,
        timestamp: Utc::now(),
    });

    if alerts::is_prone_crossing(count, state.params.prone_threshold) {
        let alert = ProneAlert {
            id: Uuid::new_v4(),
            combo_key,
            region: report.region.clone(),
            crop: report.crop.clone(),
            disease: report.disease.clone(),
            count,
            created_at: Utc::now(),
            source: ProneSource::Counter,
        };
        raise_prone_alert(state, alert).await;
    }
}
