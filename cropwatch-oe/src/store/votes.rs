//! Recovery vote queries
//!
//! One row per disease key. Vote uniqueness is enforced on the client (one
//! local flag per device and disease); the engine just counts what arrives.

use std::collections::BTreeMap;

use sqlx::{Row, SqlitePool};

use crate::error::Result;

/// Record one recovery vote, returning the new total for the key.
pub async fn record(db: &SqlitePool, disease_key: &str) -> Result<i64> {
    let votes: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO ok_votes (disease_key, votes) VALUES (?, 1)
        ON CONFLICT(disease_key) DO UPDATE
            SET votes = votes + 1, updated_at = CURRENT_TIMESTAMP
        RETURNING votes
        "#,
    )
    .bind(disease_key)
    .fetch_one(db)
    .await?;

    Ok(votes)
}

/// Current vote total for one key; zero when nobody has voted.
pub async fn get(db: &SqlitePool, disease_key: &str) -> Result<i64> {
    let votes: Option<i64> =
        sqlx::query_scalar("SELECT votes FROM ok_votes WHERE disease_key = ?")
            .bind(disease_key)
            .fetch_optional(db)
            .await?;

    Ok(votes.unwrap_or(0))
}

/// The full vote map, keyed by disease key.
pub async fn list(db: &SqlitePool) -> Result<BTreeMap<String, i64>> {
    let rows = sqlx::query("SELECT disease_key, votes FROM ok_votes ORDER BY disease_key")
        .fetch_all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| (row.get("disease_key"), row.get("votes")))
        .collect())
}
