//! Combo counter queries
//!
//! One row per region/crop/disease key. The increment is a single upsert,
//! so concurrent submitters serialize inside SQLite and every intermediate
//! counter value is returned to exactly one caller. Threshold checks made
//! on the returned value can therefore never double-fire.

use std::collections::BTreeMap;

use sqlx::{Row, SqlitePool};

use crate::error::Result;

/// Atomically bump the counter for `combo_key`, returning the new value.
pub async fn increment(db: &SqlitePool, combo_key: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO combo_counters (combo_key, count) VALUES (?, 1)
        ON CONFLICT(combo_key) DO UPDATE
            SET count = count + 1, updated_at = CURRENT_TIMESTAMP
        RETURNING count
        "#,
    )
    .bind(combo_key)
    .fetch_one(db)
    .await?;

    Ok(count)
}

/// Current counter value; zero when the key was never incremented.
pub async fn get(db: &SqlitePool, combo_key: &str) -> Result<i64> {
    let count: Option<i64> =
        sqlx::query_scalar("SELECT count FROM combo_counters WHERE combo_key = ?")
            .bind(combo_key)
            .fetch_optional(db)
            .await?;

    Ok(count.unwrap_or(0))
}

/// The full counter map, keyed by combo key.
pub async fn list(db: &SqlitePool) -> Result<BTreeMap<String, i64>> {
    let rows = sqlx::query("SELECT combo_key, count FROM combo_counters ORDER BY combo_key")
        .fetch_all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| (row.get("combo_key"), row.get("count")))
        .collect())
}
