//! Report store queries
//!
//! Reports are append-mostly. The only mutation after insert is the
//! one-way resolved flag, and only the owner token issued at submission
//! may flip it.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use cropwatch_common::model::Report;

use crate::error::{Error, Result};

/// What a resolve call actually did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// The flag was flipped by this call
    Resolved,
    /// The report was already resolved; resolving twice is a no-op
    AlreadyResolved,
}

/// Insert a validated report along with its owner token.
pub async fn insert(db: &SqlitePool, report: &Report, owner_token: Uuid) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO reports
            (id, disease, disease_key, crop, severity, region, lat, lon, created_at, resolved, owner_token)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?)
        "#,
    )
    .bind(report.id.to_string())
    .bind(&report.disease)
    .bind(&report.disease_key)
    .bind(&report.crop)
    .bind(report.severity.as_str())
    .bind(&report.region)
    .bind(report.lat)
    .bind(report.lon)
    .bind(report.created_at)
    .bind(owner_token.to_string())
    .execute(db)
    .await?;

    Ok(())
}

/// Fetch one report by id.
pub async fn fetch(db: &SqlitePool, id: Uuid) -> Result<Report> {
    let row = sqlx::query(
        r#"
        SELECT id, disease, disease_key, crop, severity, region, lat, lon, created_at, resolved
        FROM reports WHERE id = ?
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(db)
    .await?
    .ok_or_else(|| Error::NotFound(format!("report {}", id)))?;

    row_to_report(&row)
}

/// Mark a report resolved. The stored owner token must match; resolving an
/// already-resolved report succeeds without touching the row.
pub async fn resolve(
    db: &SqlitePool,
    id: Uuid,
    owner_token: Uuid,
) -> Result<(Report, ResolveOutcome)> {
    let row = sqlx::query("SELECT owner_token, resolved FROM reports WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(db)
        .await?
        .ok_or_else(|| Error::NotFound(format!("report {}", id)))?;

    let stored_token: String = row.get("owner_token");
    if stored_token != owner_token.to_string() {
        return Err(Error::Forbidden(format!(
            "report {} belongs to another submitter",
            id
        )));
    }

    let already_resolved: i64 = row.get("resolved");
    if already_resolved == 0 {
        sqlx::query("UPDATE reports SET resolved = 1 WHERE id = ?")
            .bind(id.to_string())
            .execute(db)
            .await?;
    }

    let report = fetch(db, id).await?;
    let outcome = if already_resolved == 0 {
        ResolveOutcome::Resolved
    } else {
        ResolveOutcome::AlreadyResolved
    };
    Ok((report, outcome))
}

/// All active (unresolved) reports, oldest first.
pub async fn list_active(db: &SqlitePool) -> Result<Vec<Report>> {
    let rows = sqlx::query(
        r#"
        SELECT id, disease, disease_key, crop, severity, region, lat, lon, created_at, resolved
        FROM reports WHERE resolved = 0 ORDER BY created_at, id
        "#,
    )
    .fetch_all(db)
    .await?;

    rows.iter().map(row_to_report).collect()
}

/// Full report history including resolved entries, oldest first.
pub async fn list_all(db: &SqlitePool) -> Result<Vec<Report>> {
    let rows = sqlx::query(
        r#"
        SELECT id, disease, disease_key, crop, severity, region, lat, lon, created_at, resolved
        FROM reports ORDER BY created_at, id
        "#,
    )
    .fetch_all(db)
    .await?;

    rows.iter().map(row_to_report).collect()
}

fn row_to_report(row: &sqlx::sqlite::SqliteRow) -> Result<Report> {
    let id: String = row.get("id");
    let severity: String = row.get("severity");
    Ok(Report {
        id: Uuid::parse_str(&id)
            .map_err(|e| Error::Internal(format!("malformed report id '{}': {}", id, e)))?,
        disease: row.get("disease"),
        disease_key: row.get("disease_key"),
        crop: row.get("crop"),
        severity: severity
            .parse()
            .map_err(|_| Error::Internal(format!("malformed severity '{}'", severity)))?,
        region: row.get("region"),
        lat: row.get("lat"),
        lon: row.get("lon"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
        resolved: row.get::<i64, _>("resolved") != 0,
    })
}
