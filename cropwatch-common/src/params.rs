//! Alerting parameters
//!
//! Runtime-tunable thresholds live in the settings table, seeded by
//! database init and loaded once at service start.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::db::settings::get_setting;
use crate::Result;

pub const DEFAULT_ALERT_THRESHOLD: i64 = 2;
pub const DEFAULT_PRONE_THRESHOLD: i64 = 3;
pub const DEFAULT_RADIUS_KM: f64 = 5.0;
pub const DEFAULT_PRONE_WINDOW_HOURS: i64 = 24;
pub const DEFAULT_EVENT_BUS_CAPACITY: usize = 256;

/// Thresholds and windows driving the alerting rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertingParams {
    /// Minimum cluster size before a local alert fires
    pub alert_threshold: i64,
    /// Counter cadence for prone-area alerts (every Nth report)
    pub prone_threshold: i64,
    /// Default viewer radius for local alerts, in kilometers
    pub default_radius_km: f64,
    /// Freshness window for replayed prone alerts, in hours
    pub prone_window_hours: i64,
    /// Broadcast channel capacity per subscriber
    pub event_bus_capacity: usize,
}

impl Default for AlertingParams {
    fn default() -> Self {
        Self {
            alert_threshold: DEFAULT_ALERT_THRESHOLD,
            prone_threshold: DEFAULT_PRONE_THRESHOLD,
            default_radius_km: DEFAULT_RADIUS_KM,
            prone_window_hours: DEFAULT_PRONE_WINDOW_HOURS,
            event_bus_capacity: DEFAULT_EVENT_BUS_CAPACITY,
        }
    }
}

impl AlertingParams {
    /// Load parameters from the settings table, falling back to defaults
    /// for missing keys. Thresholds are clamped to at least 1 so a
    /// mis-edited settings row cannot divide by zero or alert on nothing.
    pub async fn load(pool: &SqlitePool) -> Result<Self> {
        let alert_threshold: i64 = get_setting(pool, "alert_threshold")
            .await?
            .unwrap_or(DEFAULT_ALERT_THRESHOLD);
        let prone_threshold: i64 = get_setting(pool, "prone_threshold")
            .await?
            .unwrap_or(DEFAULT_PRONE_THRESHOLD);
        let default_radius_km: f64 = get_setting(pool, "default_radius_km")
            .await?
            .unwrap_or(DEFAULT_RADIUS_KM);
        let prone_window_hours: i64 = get_setting(pool, "prone_window_hours")
            .await?
            .unwrap_or(DEFAULT_PRONE_WINDOW_HOURS);
        let event_bus_capacity: usize = get_setting(pool, "event_bus_capacity")
            .await?
            .unwrap_or(DEFAULT_EVENT_BUS_CAPACITY);

        Ok(Self {
            alert_threshold: alert_threshold.max(1),
            prone_threshold: prone_threshold.max(1),
            default_radius_km: if default_radius_km > 0.0 {
                default_radius_km
            } else {
                DEFAULT_RADIUS_KM
            },
            prone_window_hours: prone_window_hours.max(1),
            event_bus_capacity: event_bus_capacity.max(1),
        })
    }

    /// Freshness window as a chrono duration.
    pub fn prone_window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.prone_window_hours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use crate::db::settings::set_setting;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let params = AlertingParams::default();
        assert_eq!(params.alert_threshold, 2);
        assert_eq!(params.prone_threshold, 3);
        assert_eq!(params.default_radius_km, 5.0);
        assert_eq!(params.prone_window_hours, 24);
        assert_eq!(params.prone_window(), chrono::Duration::hours(24));
    }

    #[tokio::test]
    async fn test_load_from_seeded_database() {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("cropwatch.db")).await.unwrap();

        let params = AlertingParams::load(&pool).await.unwrap();
        assert_eq!(params.alert_threshold, DEFAULT_ALERT_THRESHOLD);
        assert_eq!(params.prone_threshold, DEFAULT_PRONE_THRESHOLD);
        assert_eq!(params.event_bus_capacity, DEFAULT_EVENT_BUS_CAPACITY);
    }

    #[tokio::test]
    async fn test_load_respects_overrides_and_clamps() {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("cropwatch.db")).await.unwrap();

        set_setting(&pool, "prone_threshold", 5).await.unwrap();
        set_setting(&pool, "alert_threshold", 0).await.unwrap();
        set_setting(&pool, "default_radius_km", -2.0).await.unwrap();

        let params = AlertingParams::load(&pool).await.unwrap();
        assert_eq!(params.prone_threshold, 5);
        // nonsense values clamp back to sane floors
        assert_eq!(params.alert_threshold, 1);
        assert_eq!(params.default_radius_km, DEFAULT_RADIUS_KM);
    }
}
