//! Settings table access
//!
//! Generic typed accessors over the key/value settings table. Values are
//! stored as TEXT and parsed through `FromStr` on read.

use std::str::FromStr;

use sqlx::SqlitePool;

use crate::{Error, Result};

/// Read a setting, parsing it into the requested type. Returns `Ok(None)`
/// when the key is absent or NULL.
pub async fn get_setting<T: FromStr>(pool: &SqlitePool, key: &str) -> Result<Option<T>> {
    let value: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;

    match value.flatten() {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::Config(format!("setting '{}' has unparseable value '{}'", key, raw))),
        None => Ok(None),
    }
}

/// Write a setting, inserting or replacing as needed.
pub async fn set_setting<T: ToString>(pool: &SqlitePool, key: &str, value: T) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value, updated_at)
        VALUES (?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(key)
    .bind(value.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use tempfile::TempDir;

    async fn setup() -> (SqlitePool, TempDir) {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("cropwatch.db")).await.unwrap();
        (pool, dir)
    }

    #[tokio::test]
    async fn test_set_and_get_setting() {
        let (pool, _dir) = setup().await;

        set_setting(&pool, "alert_threshold", 4).await.unwrap();
        let value: Option<i64> = get_setting(&pool, "alert_threshold").await.unwrap();
        assert_eq!(value, Some(4));

        set_setting(&pool, "default_radius_km", 7.5).await.unwrap();
        let value: Option<f64> = get_setting(&pool, "default_radius_km").await.unwrap();
        assert_eq!(value, Some(7.5));
    }

    #[tokio::test]
    async fn test_get_missing_setting_is_none() {
        let (pool, _dir) = setup().await;
        let value: Option<i64> = get_setting(&pool, "no_such_key").await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_get_setting_with_wrong_type_fails() {
        let (pool, _dir) = setup().await;
        set_setting(&pool, "alert_threshold", "not a number").await.unwrap();
        let result: Result<Option<i64>> = get_setting(&pool, "alert_threshold").await;
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
