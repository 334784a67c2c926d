//! Threshold alerting
//!
//! Turns the neutral cluster snapshot into what one viewer should see:
//! local alerts for clusters near their position, prone-area alerts when a
//! regional counter saturates, and the per-session bookkeeping that keeps
//! any prone alert from being shown twice in the same session.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use cropwatch_common::geo::{haversine_km, GeoPoint};
use cropwatch_common::model::{OutbreakCluster, ProneAlert, Severity};

/// Displayed alert tier, derived per cluster and never stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertTier {
    Moderate,
    Alert,
    Severe,
    /// Calming override: recovery votes mute the cluster
    Recovering,
}

impl AlertTier {
    /// Precedence: calming override first, then any severe member, then
    /// the count threshold, then the moderate floor.
    pub fn for_cluster(cluster: &OutbreakCluster, alert_threshold: i64) -> Self {
        if cluster.recovering {
            AlertTier::Recovering
        } else if cluster.severity == Severity::Severe {
            AlertTier::Severe
        } else if cluster.count as i64 >= alert_threshold {
            AlertTier::Alert
        } else {
            AlertTier::Moderate
        }
    }
}

/// One cluster inside the viewer's radius
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalAlert {
    pub cluster: OutbreakCluster,
    pub distance_km: f64,
    pub tier: AlertTier,
}

/// Full personalized view pushed to one SSE session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertView {
    pub generation: u64,
    /// Alerts near the viewer; empty when the viewer shared no location
    pub local: Vec<LocalAlert>,
    /// Clusters tracked globally, located viewer or not
    pub cluster_count: usize,
    pub timestamp: DateTime<Utc>,
}

/// Clusters at or above the count threshold within the radius, nearest
/// first. Sub-threshold clusters stay on the map but never alert.
pub fn local_alerts(
    clusters: &[OutbreakCluster],
    viewer: GeoPoint,
    radius_km: f64,
    alert_threshold: i64,
) -> Vec<LocalAlert> {
    let mut hits: Vec<LocalAlert> = clusters
        .iter()
        .filter(|c| c.count as i64 >= alert_threshold)
        .filter_map(|c| {
            let distance_km = haversine_km(viewer, c.centroid);
            (distance_km <= radius_km).then(|| LocalAlert {
                cluster: c.clone(),
                distance_km,
                tier: AlertTier::for_cluster(c, alert_threshold),
            })
        })
        .collect();
    hits.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    hits
}

/// Build the personalized view for one session.
pub fn build_view(
    generation: u64,
    clusters: &[OutbreakCluster],
    viewer: Option<GeoPoint>,
    radius_km: f64,
    alert_threshold: i64,
) -> AlertView {
    let local = match viewer {
        Some(point) => local_alerts(clusters, point, radius_km, alert_threshold),
        None => Vec::new(),
    };
    AlertView {
        generation,
        local,
        cluster_count: clusters.len(),
        timestamp: Utc::now(),
    }
}

/// A counter raises a prone alert exactly when it lands on a threshold
/// multiple: the third report alerts, the fourth does not, the sixth does.
pub fn is_prone_crossing(count: i64, prone_threshold: i64) -> bool {
    prone_threshold > 0 && count >= prone_threshold && count % prone_threshold == 0
}

/// Replay eligibility for a persisted record.
pub fn is_fresh(alert: &ProneAlert, now: DateTime<Utc>, window: Duration) -> bool {
    now.signed_duration_since(alert.created_at) <= window
}

/// Per-session seen-set. Keys are stable identifiers: live crossings key
/// on the combo, replayed records on their row id, so a session shows each
/// at most once while a fresh session starts blank.
#[derive(Debug, Default)]
pub struct SessionSeen {
    keys: HashSet<String>,
}

impl SessionSeen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dedup key for a live counter crossing.
    pub fn crossing_key(combo_key: &str) -> String {
        format!("prone:{combo_key}")
    }

    /// Dedup key for a persisted record (replays and feed rows).
    pub fn record_key(id: Uuid) -> String {
        format!("pa:{id}")
    }

    /// Mark the key seen. True exactly once per key and session.
    pub fn first_sighting(&mut self, key: String) -> bool {
        self.keys.insert(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster(count: usize, severity: Severity, recovering: bool) -> OutbreakCluster {
        OutbreakCluster {
            cell_key: "blast|200|750".to_string(),
            disease_key: "blast".to_string(),
            disease: "Blast".to_string(),
            crops: vec!["Rice".to_string()],
            region: "Maharashtra".to_string(),
            centroid: GeoPoint::new(20.01, 75.005),
            count,
            severity,
            ok_votes: 0,
            recovering,
        }
    }

    #[test]
    fn test_prone_crossing_fires_on_exact_multiples() {
        assert!(!is_prone_crossing(1, 3));
        assert!(!is_prone_crossing(2, 3));
        assert!(is_prone_crossing(3, 3));
        assert!(!is_prone_crossing(4, 3));
        assert!(!is_prone_crossing(5, 3));
        assert!(is_prone_crossing(6, 3));
        assert!(is_prone_crossing(9, 3));
        // guard against degenerate thresholds
        assert!(!is_prone_crossing(5, 0));
        assert!(!is_prone_crossing(5, -3));
    }

    #[test]
    fn test_tier_precedence() {
        assert_eq!(
            AlertTier::for_cluster(&cluster(1, Severity::Mild, false), 2),
            AlertTier::Moderate
        );
        assert_eq!(
            AlertTier::for_cluster(&cluster(2, Severity::Mild, false), 2),
            AlertTier::Alert
        );
        // a single severe member outranks the count tier
        assert_eq!(
            AlertTier::for_cluster(&cluster(1, Severity::Severe, false), 2),
            AlertTier::Severe
        );
        // calming mutes even a severe cluster
        assert_eq!(
            AlertTier::for_cluster(&cluster(5, Severity::Severe, true), 2),
            AlertTier::Recovering
        );
    }

    #[test]
    fn test_local_alerts_respect_radius_and_threshold() {
        let near_big = cluster(2, Severity::Moderate, false);
        let mut near_small = cluster(1, Severity::Moderate, false);
        near_small.cell_key = "wilt|200|750".to_string();
        near_small.disease_key = "wilt".to_string();
        let mut far_big = cluster(4, Severity::Moderate, false);
        far_big.cell_key = "rust|210|760".to_string();
        far_big.disease_key = "rust".to_string();
        far_big.centroid = GeoPoint::new(21.0, 76.0);

        let viewer = GeoPoint::new(20.00, 75.00);
        let alerts = local_alerts(&[near_big, near_small, far_big], viewer, 5.0, 2);

        // only the near, at-threshold cluster alerts
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].cluster.disease_key, "blast");
        assert_eq!(alerts[0].tier, AlertTier::Alert);
        assert!(alerts[0].distance_km < 5.0);
    }

    #[test]
    fn test_view_without_location_has_no_local_alerts() {
        let clusters = vec![cluster(3, Severity::Moderate, false)];
        let view = build_view(7, &clusters, None, 5.0, 2);
        assert_eq!(view.generation, 7);
        assert!(view.local.is_empty());
        assert_eq!(view.cluster_count, 1);
    }

    #[test]
    fn test_session_seen_shows_each_key_once() {
        let mut seen = SessionSeen::new();
        let key = SessionSeen::crossing_key("maharashtra|cotton|wilt");

        assert!(seen.first_sighting(key.clone()));
        assert!(!seen.first_sighting(key));

        // record keys are independent of crossing keys
        let id = Uuid::new_v4();
        assert!(seen.first_sighting(SessionSeen::record_key(id)));
        assert!(!seen.first_sighting(SessionSeen::record_key(id)));

        // a fresh session starts blank
        let mut fresh = SessionSeen::new();
        assert!(fresh.first_sighting(SessionSeen::crossing_key("maharashtra|cotton|wilt")));
    }

    #[test]
    fn test_freshness_boundary() {
        let now = Utc::now();
        let mut alert = ProneAlert {
            id: Uuid::new_v4(),
            combo_key: "maharashtra|cotton|wilt".to_string(),
            region: "Maharashtra".to_string(),
            crop: "Cotton".to_string(),
            disease: "Wilt".to_string(),
            count: 3,
            created_at: now - Duration::hours(23),
            source: cropwatch_common::model::ProneSource::Feed,
        };
        assert!(is_fresh(&alert, now, Duration::hours(24)));

        alert.created_at = now - Duration::hours(25);
        assert!(!is_fresh(&alert, now, Duration::hours(24)));
    }
}
