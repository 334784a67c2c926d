//! Server-Sent Events stream
//!
//! One connection is one viewing session. On connect the stream sends the
//! current personalized view and replays fresh prone alerts; afterwards it
//! forwards store events as they happen and pushes a fresh `AlertView`
//! after every snapshot rebuild. Prone alerts are deduplicated against the
//! session's seen-set, so a reconnect (a new session) starts blank.

use std::convert::Infallible;
use std::time::Duration;

use async_stream::stream;
use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use cropwatch_common::events::EngineEvent;
use cropwatch_common::geo::GeoPoint;
use cropwatch_common::model::ProneSource;

use crate::alerts::{self, SessionSeen};
use crate::state::AppState;
use crate::store;

/// Viewer context supplied on the query string. Bad coordinates are
/// treated as no location rather than refusing the stream.
#[derive(Debug, Deserialize)]
pub struct ViewerParams {
    lat: Option<f64>,
    lon: Option<f64>,
    radius_km: Option<f64>,
}

impl ViewerParams {
    fn location(&self) -> Option<GeoPoint> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => {
                let point = GeoPoint::new(lat, lon);
                point.is_valid().then_some(point)
            }
            _ => None,
        }
    }
}

/// GET /api/v1/events - the live alert stream
pub async fn event_stream(
    State(state): State<AppState>,
    Query(params): Query<ViewerParams>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let viewer = params.location();
    let radius_km = params
        .radius_km
        .filter(|r| r.is_finite() && *r > 0.0)
        .unwrap_or(state.params.default_radius_km);
    debug!(?viewer, radius_km, "SSE session opened");

    // subscribe before the opening snapshot so nothing falls in the gap
    let mut rx = state.subscribe();

    let stream = stream! {
        let mut seen = SessionSeen::new();

        let snapshot = state.clusters().await;
        let view = alerts::build_view(
            state.generation(),
            &snapshot,
            viewer,
            radius_km,
            state.params.alert_threshold,
        );
        if let Some(event) = json_event("AlertView", &view) {
            yield Ok(event);
        }

        match store::prone::list_fresh(&state.db, state.params.prone_window()).await {
            Ok(fresh) => {
                for alert in fresh {
                    if seen.first_sighting(SessionSeen::record_key(alert.id)) {
                        if let Some(event) = json_event("ProneAlert", &alert) {
                            yield Ok(event);
                        }
                    }
                }
            }
            Err(e) => warn!("prone alert replay failed: {}", e),
        }

        loop {
            match rx.recv().await {
                Ok(EngineEvent::ViewChanged { generation, .. }) => {
                    let snapshot = state.clusters().await;
                    let view = alerts::build_view(
                        generation,
                        &snapshot,
                        viewer,
                        radius_km,
                        state.params.alert_threshold,
                    );
                    if let Some(event) = json_event("AlertView", &view) {
                        yield Ok(event);
                    }
                }
                Ok(EngineEvent::ProneAlertRaised { alert, .. }) => {
                    let key = match alert.source {
                        ProneSource::Counter => SessionSeen::crossing_key(&alert.combo_key),
                        ProneSource::Feed => SessionSeen::record_key(alert.id),
                    };
                    if seen.first_sighting(key) {
                        if let Some(event) = json_event("ProneAlert", &alert) {
                            yield Ok(event);
                        }
                    }
                }
                Ok(other) => {
                    if let Some(event) = json_event(other.event_type(), &other) {
                        yield Ok(event);
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    // the next AlertView resynchronizes the session
                    warn!("SSE session lagged by {} events", missed);
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn json_event<T: serde::Serialize>(event_type: &str, payload: &T) -> Option<Event> {
    match serde_json::to_string(payload) {
        Ok(json) => Some(Event::default().event(event_type).data(json)),
        Err(e) => {
            warn!("failed to serialize {} event: {}", event_type, e);
            None
        }
    }
}
