//! Domain model for the outbreak engine
//!
//! A [`Report`] is one diagnosed field observation. Reports feed three
//! derived structures: per-combo counters, per-disease recovery votes, and
//! spatial [`OutbreakCluster`]s. [`ProneAlert`]s are the persisted record of
//! a regional counter crossing a threshold (or of a legacy feed row).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::geo::GeoPoint;
use crate::keys;

/// Why a submission was rejected at the door
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("unknown severity: {0}")]
    UnknownSeverity(String),

    #[error("coordinate out of range: {0}")]
    CoordinateOutOfRange(&'static str),
}

/// Diagnosed severity of one report.
///
/// Ordering follows escalation, so `max` over a cluster's members yields
/// the cluster severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Mild => "Mild",
            Severity::Moderate => "Moderate",
            Severity::Severe => "Severe",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mild" => Ok(Severity::Mild),
            "moderate" => Ok(Severity::Moderate),
            "severe" => Ok(Severity::Severe),
            _ => Err(ValidationError::UnknownSeverity(s.trim().to_string())),
        }
    }
}

/// One validated field observation.
///
/// The owner token issued at submission is deliberately not part of this
/// struct; it lives only in the database and in the submission receipt, so
/// listings can never leak it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: Uuid,
    /// Display name as submitted (trimmed, original casing)
    pub disease: String,
    /// Normalized grouping key derived from `disease`
    pub disease_key: String,
    pub crop: String,
    pub severity: Severity,
    pub region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub resolved: bool,
}

impl Report {
    /// Coordinates when both are present and plausible. Reports without a
    /// usable location still count toward combo counters but never cluster.
    pub fn location(&self) -> Option<GeoPoint> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => {
                let p = GeoPoint::new(lat, lon);
                p.is_valid().then_some(p)
            }
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.resolved
    }
}

/// Untrusted submission payload. Every field is optional so that missing
/// values produce a field-level [`ValidationError`] instead of a generic
/// deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSubmission {
    pub disease: Option<String>,
    pub crop: Option<String>,
    pub severity: Option<String>,
    pub region: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl ReportSubmission {
    /// Validate into a strict [`Report`]. Assigns the id and creation time;
    /// the report starts active.
    pub fn validate(self) -> Result<Report, ValidationError> {
        let disease = required(self.disease, "disease")?;
        let crop = required(self.crop, "crop")?;
        let region = required(self.region, "region")?;
        let severity: Severity = required(self.severity, "severity")?.parse()?;

        if let Some(lat) = self.lat {
            if !lat.is_finite() || lat.abs() > 90.0 {
                return Err(ValidationError::CoordinateOutOfRange("lat"));
            }
        }
        if let Some(lon) = self.lon {
            if !lon.is_finite() || lon.abs() > 180.0 {
                return Err(ValidationError::CoordinateOutOfRange("lon"));
            }
        }

        let disease_key = keys::normalize(&disease);
        Ok(Report {
            id: Uuid::new_v4(),
            disease,
            disease_key,
            crop,
            severity,
            region,
            lat: self.lat,
            lon: self.lon,
            created_at: Utc::now(),
            resolved: false,
        })
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ValidationError> {
    match value {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(ValidationError::MissingField(field)),
    }
}

/// Where a prone-alert record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProneSource {
    /// A combo counter landed on a threshold multiple
    Counter,
    /// Delivered through the legacy alert feed
    Feed,
}

impl ProneSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProneSource::Counter => "counter",
            ProneSource::Feed => "feed",
        }
    }
}

impl FromStr for ProneSource {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "counter" => Ok(ProneSource::Counter),
            "feed" => Ok(ProneSource::Feed),
            other => Err(crate::Error::InvalidInput(format!(
                "unknown prone alert source: {other}"
            ))),
        }
    }
}

/// Persisted record of a region going disease-prone
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProneAlert {
    pub id: Uuid,
    pub combo_key: String,
    pub region: String,
    pub crop: String,
    pub disease: String,
    /// Counter value at crossing time, or the count carried by the feed row
    pub count: i64,
    pub created_at: DateTime<Utc>,
    pub source: ProneSource,
}

/// One occupied cell of the coarse spatial grid, derived from active
/// geotagged reports. Never persisted; rebuilt after every relevant store
/// change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutbreakCluster {
    pub cell_key: String,
    pub disease_key: String,
    /// Display name taken from the first member report
    pub disease: String,
    /// Distinct crops reported in this cell, in first-seen order
    pub crops: Vec<String>,
    /// Region of the first member report
    pub region: String,
    /// Mean of member coordinates
    pub centroid: GeoPoint,
    pub count: usize,
    /// Highest severity among members
    pub severity: Severity,
    /// Recovery votes recorded against this disease key
    pub ok_votes: i64,
    /// Calming override: enough recovery votes to mute the cluster
    pub recovering: bool,
}
