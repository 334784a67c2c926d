//! HTTP request handlers

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use cropwatch_common::geo::GeoPoint;
use cropwatch_common::keys;
use cropwatch_common::model::{
    OutbreakCluster, ProneAlert, ProneSource, Report, ReportSubmission, ValidationError,
};

use crate::cluster;
use crate::error::{Error, Result};
use crate::ingest::{self, IngestReceipt};
use crate::state::AppState;
use crate::store;

/// GET /health - service liveness and snapshot generation
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "cropwatch-oe",
        "version": env!("CARGO_PKG_VERSION"),
        "generation": state.generation(),
        "startedAt": state.started_at,
    }))
}

/// POST /api/v1/reports - submit one diagnosed observation
pub async fn submit_report(
    State(state): State<AppState>,
    Json(submission): Json<ReportSubmission>,
) -> Result<(StatusCode, Json<IngestReceipt>)> {
    let receipt = ingest::ingest_report(&state, submission).await?;
    Ok((StatusCode::ACCEPTED, Json(receipt)))
}

#[derive(Debug, Deserialize)]
pub struct ListReportsQuery {
    #[serde(default)]
    include_resolved: bool,
}

/// GET /api/v1/reports - active reports, or full history on request
pub async fn list_reports(
    State(state): State<AppState>,
    Query(query): Query<ListReportsQuery>,
) -> Result<Json<Vec<Report>>> {
    let reports = if query.include_resolved {
        store::reports::list_all(&state.db).await?
    } else {
        store::reports::list_active(&state.db).await?
    };
    Ok(Json(reports))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    owner_token: Uuid,
}

/// POST /api/v1/reports/:report_id/resolve - submitter marks recovery
pub async fn resolve_report(
    State(state): State<AppState>,
    Path(report_id): Path<Uuid>,
    Json(request): Json<ResolveRequest>,
) -> Result<Json<serde_json::Value>> {
    ingest::resolve_report(&state, report_id, request.owner_token).await?;
    Ok(Json(json!({ "status": "ok", "id": report_id })))
}

#[derive(Debug, Deserialize)]
pub struct ViewerQuery {
    lat: Option<f64>,
    lon: Option<f64>,
    radius_km: Option<f64>,
}

impl ViewerQuery {
    fn location(&self) -> Result<Option<GeoPoint>> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => {
                let point = GeoPoint::new(lat, lon);
                if !point.is_valid() {
                    return Err(Error::BadRequest("viewer coordinates out of range".to_string()));
                }
                Ok(Some(point))
            }
            (None, None) => Ok(None),
            _ => Err(Error::BadRequest(
                "lat and lon must be given together".to_string(),
            )),
        }
    }

    fn radius_km(&self, default: f64) -> Result<f64> {
        match self.radius_km {
            Some(r) if r.is_finite() && r > 0.0 => Ok(r),
            Some(_) => Err(Error::BadRequest("radius_km must be positive".to_string())),
            None => Ok(default),
        }
    }
}

/// One cluster in a query response, with viewer distance when known
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterEntry {
    pub cluster: OutbreakCluster,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClustersResponse {
    pub clusters: Vec<ClusterEntry>,
    pub generation: u64,
}

/// GET /api/v1/clusters - snapshot query, optionally filtered by viewer
/// position and radius
pub async fn nearby_clusters(
    State(state): State<AppState>,
    Query(query): Query<ViewerQuery>,
) -> Result<Json<ClustersResponse>> {
    let viewer = query.location()?;
    let radius_km = query.radius_km(state.params.default_radius_km)?;

    let snapshot = state.clusters().await;
    let clusters = match viewer {
        Some(point) => cluster::nearby(&snapshot, point, radius_km)
            .into_iter()
            .map(|(cluster, distance)| ClusterEntry {
                cluster,
                distance_km: Some(distance),
            })
            .collect(),
        None => snapshot
            .iter()
            .cloned()
            .map(|cluster| ClusterEntry {
                cluster,
                distance_km: None,
            })
            .collect(),
    };

    Ok(Json(ClustersResponse {
        clusters,
        generation: state.generation(),
    }))
}

/// GET /api/v1/combos - the regional counter map
pub async fn list_combos(
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<String, i64>>> {
    Ok(Json(store::combos::list(&state.db).await?))
}

/// GET /api/v1/votes - the recovery vote map
pub async fn list_votes(
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<String, i64>>> {
    Ok(Json(store::votes::list(&state.db).await?))
}

/// POST /api/v1/votes/:disease_key - record one recovery vote
pub async fn vote_ok(
    State(state): State<AppState>,
    Path(disease_key): Path<String>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    let key = keys::normalize(&disease_key);
    if key.is_empty() {
        return Err(Error::BadRequest("disease key must not be blank".to_string()));
    }

    let votes = ingest::record_ok_vote(&state, &key).await;
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "status": "accepted", "diseaseKey": key, "votes": votes })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ProneListQuery {
    #[serde(default)]
    all: bool,
}

/// GET /api/v1/prone-alerts - fresh records, or the full audit trail
pub async fn list_prone_alerts(
    State(state): State<AppState>,
    Query(query): Query<ProneListQuery>,
) -> Result<Json<Vec<ProneAlert>>> {
    let alerts = if query.all {
        store::prone::list_all(&state.db).await?
    } else {
        store::prone::list_fresh(&state.db, state.params.prone_window()).await?
    };
    Ok(Json(alerts))
}

/// Legacy feed payload for POST /api/v1/prone-alerts
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProneFeedSubmission {
    region: Option<String>,
    crop: Option<String>,
    disease: Option<String>,
    count: Option<i64>,
    /// Origination time for queued records; defaults to now
    created_at: Option<DateTime<Utc>>,
}

/// POST /api/v1/prone-alerts - accept a record from the legacy alert feed
pub async fn submit_prone_alert(
    State(state): State<AppState>,
    Json(submission): Json<ProneFeedSubmission>,
) -> Result<(StatusCode, Json<ProneAlert>)> {
    let region = required_text(submission.region, "region")?;
    let crop = required_text(submission.crop, "crop")?;
    let disease = required_text(submission.disease, "disease")?;

    let alert = ProneAlert {
        id: Uuid::new_v4(),
        combo_key: keys::combo_key(&region, &crop, &disease),
        region,
        crop,
        disease,
        count: submission.count.unwrap_or(0).max(0),
        created_at: submission.created_at.unwrap_or_else(Utc::now),
        source: ProneSource::Feed,
    };
    ingest::raise_prone_alert(&state, alert.clone()).await;

    Ok((StatusCode::ACCEPTED, Json(alert)))
}

fn required_text(value: Option<String>, field: &'static str) -> Result<String> {
    match value {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(ValidationError::MissingField(field).into()),
    }
}
