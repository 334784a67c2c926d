//! Prone-alert record queries
//!
//! Counter crossings and legacy feed rows land in the same table, tagged
//! by source. Fresh rows are replayed to newly connected sessions; stale
//! rows stay queryable for audit but never replay.

use chrono::{DateTime, Duration, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use cropwatch_common::model::ProneAlert;

use crate::error::{Error, Result};

/// Insert one prone-alert record.
pub async fn insert(db: &SqlitePool, alert: &ProneAlert) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO prone_alerts (id, combo_key, region, crop, disease, count, created_at, source)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(alert.id.to_string())
    .bind(&alert.combo_key)
    .bind(&alert.region)
    .bind(&alert.crop)
    .bind(&alert.disease)
    .bind(alert.count)
    .bind(alert.created_at)
    .bind(alert.source.as_str())
    .execute(db)
    .await?;

    Ok(())
}

/// Records younger than `window`, newest first.
pub async fn list_fresh(db: &SqlitePool, window: Duration) -> Result<Vec<ProneAlert>> {
    let cutoff = Utc::now() - window;
    let rows = sqlx::query(
        r#"
        SELECT id, combo_key, region, crop, disease, count, created_at, source
        FROM prone_alerts WHERE created_at > ? ORDER BY created_at DESC
        "#,
    )
    .bind(cutoff)
    .fetch_all(db)
    .await?;

    rows.iter().map(row_to_alert).collect()
}

/// Every record ever raised, newest first.
pub async fn list_all(db: &SqlitePool) -> Result<Vec<ProneAlert>> {
    let rows = sqlx::query(
        r#"
        SELECT id, combo_key, region, crop, disease, count, created_at, source
        FROM prone_alerts ORDER BY created_at DESC
        "#,
    )
    .fetch_all(db)
    .await?;

    rows.iter().map(row_to_alert).collect()
}

fn row_to_alert(row: &sqlx::sqlite::SqliteRow) -> Result<ProneAlert> {
    let id: String = row.get("id");
    let source: String = row.get("source");
    Ok(ProneAlert {
        id: Uuid::parse_str(&id)
            .map_err(|e| Error::Internal(format!("malformed prone alert id '{}': {}", id, e)))?,
        combo_key: row.get("combo_key"),
        region: row.get("region"),
        crop: row.get("crop"),
        disease: row.get("disease"),
        count: row.get("count"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
        source: source.parse().map_err(Error::Common)?,
    })
}
