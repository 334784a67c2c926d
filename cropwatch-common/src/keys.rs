//! Grouping-key normalization
//!
//! Disease, crop, and region names arrive as free text from the diagnosis
//! collaborator. Every grouping key is built from the trimmed, lowercased
//! form so that "Blast" and " blast " land in the same bucket. Display
//! names keep their original casing; only keys are normalized.

/// Canonical form of a free-text name: trimmed and lowercased.
pub fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Counter key for one region/crop/disease combination.
pub fn combo_key(region: &str, crop: &str, disease: &str) -> String {
    format!(
        "{}|{}|{}",
        normalize(region),
        normalize(crop),
        normalize(disease)
    )
}

/// A coordinate rounded to the nearest tenth of a degree, kept as integer
/// tenths so cell keys never contain float formatting artifacts.
pub fn deci_degrees(coord: f64) -> i32 {
    (coord * 10.0).round() as i32
}

/// Cell key grouping one disease inside a ~11 km coarse grid cell.
pub fn cell_key(disease_key: &str, lat: f64, lon: f64) -> String {
    format!("{}|{}|{}", disease_key, deci_degrees(lat), deci_degrees(lon))
}
