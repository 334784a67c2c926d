//! Database initialization
//!
//! Creates the SQLite schema on first run and re-seeds any missing settings
//! on every start. Every statement here is idempotent, so init is safe to
//! run against an existing database.

use std::path::Path;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::params;
use crate::Result;

/// Open the engine database, creating file and schema as needed.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;
    // WAL keeps readers unblocked while a report append is in flight
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_reports_table(&pool).await?;
    create_combo_counters_table(&pool).await?;
    create_ok_votes_table(&pool).await?;
    create_prone_alerts_table(&pool).await?;
    create_settings_table(&pool).await?;

    init_default_settings(&pool).await?;

    Ok(pool)
}

async fn create_reports_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reports (
            id TEXT PRIMARY KEY,
            disease TEXT NOT NULL,
            disease_key TEXT NOT NULL,
            crop TEXT NOT NULL,
            severity TEXT NOT NULL CHECK (severity IN ('Mild', 'Moderate', 'Severe')),
            region TEXT NOT NULL,
            lat REAL,
            lon REAL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            resolved INTEGER NOT NULL DEFAULT 0,
            owner_token TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_reports_disease_key ON reports(disease_key)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_reports_resolved ON reports(resolved)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_combo_counters_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS combo_counters (
            combo_key TEXT PRIMARY KEY,
            count INTEGER NOT NULL DEFAULT 0 CHECK (count >= 0),
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_ok_votes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ok_votes (
            disease_key TEXT PRIMARY KEY,
            votes INTEGER NOT NULL DEFAULT 0 CHECK (votes >= 0),
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_prone_alerts_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS prone_alerts (
            id TEXT PRIMARY KEY,
            combo_key TEXT NOT NULL,
            region TEXT NOT NULL,
            crop TEXT NOT NULL,
            disease TEXT NOT NULL,
            count INTEGER NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            source TEXT NOT NULL DEFAULT 'counter' CHECK (source IN ('counter', 'feed'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_prone_alerts_created_at ON prone_alerts(created_at)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Seed the alerting parameters that are missing from the settings table.
/// Existing values always win; a NULL value is repaired to the default.
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    let defaults: [(&str, String); 5] = [
        ("alert_threshold", params::DEFAULT_ALERT_THRESHOLD.to_string()),
        ("prone_threshold", params::DEFAULT_PRONE_THRESHOLD.to_string()),
        ("default_radius_km", params::DEFAULT_RADIUS_KM.to_string()),
        ("prone_window_hours", params::DEFAULT_PRONE_WINDOW_HOURS.to_string()),
        ("event_bus_capacity", params::DEFAULT_EVENT_BUS_CAPACITY.to_string()),
    ];

    for (key, default_value) in defaults {
        ensure_setting(pool, key, &default_value).await?;
    }

    Ok(())
}

async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    let existing: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;

    match existing {
        None => {
            sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
                .bind(key)
                .bind(default_value)
                .execute(pool)
                .await?;
        }
        Some(None) => {
            warn!("setting '{}' was NULL, restoring default '{}'", key, default_value);
            sqlx::query("UPDATE settings SET value = ? WHERE key = ?")
                .bind(default_value)
                .bind(key)
                .execute(pool)
                .await?;
        }
        Some(Some(_)) => {}
    }

    Ok(())
}
