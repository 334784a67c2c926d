//! Proximity aggregation
//!
//! Active geotagged reports are grouped into coarse cells keyed by disease
//! and 0.1-degree rounded coordinates, one derived cluster per occupied
//! cell. The whole set is rebuilt on every relevant store change; report
//! volume stays small enough that a single pass beats maintaining an
//! incremental index.

use std::collections::BTreeMap;

use cropwatch_common::geo::{haversine_km, GeoPoint};
use cropwatch_common::keys;
use cropwatch_common::model::{OutbreakCluster, Report, Severity};

/// Calming rule: at least one vote, and votes covering half the cluster.
pub fn calming_applies(count: usize, ok_votes: i64) -> bool {
    ok_votes > 0 && ok_votes as f64 >= count as f64 / 2.0
}

/// Build the cluster set from active reports and the recovery vote map.
/// Reports without usable coordinates are skipped, as are any resolved
/// reports still present in the input list.
pub fn build_clusters(
    reports: &[Report],
    ok_votes: &BTreeMap<String, i64>,
) -> Vec<OutbreakCluster> {
    let mut cells: BTreeMap<String, CellAccumulator> = BTreeMap::new();

    for report in reports {
        if report.resolved {
            continue;
        }
        let Some(point) = report.location() else {
            continue;
        };
        let key = keys::cell_key(&report.disease_key, point.lat, point.lon);
        cells
            .entry(key)
            .or_insert_with(|| CellAccumulator::seed(report))
            .add(report, point);
    }

    cells
        .into_iter()
        .map(|(cell_key, acc)| acc.finish(cell_key, ok_votes))
        .collect()
}

/// Clusters within `radius_km` of the viewer, nearest first, each paired
/// with its distance.
pub fn nearby(
    clusters: &[OutbreakCluster],
    viewer: GeoPoint,
    radius_km: f64,
) -> Vec<(OutbreakCluster, f64)> {
    let mut hits: Vec<(OutbreakCluster, f64)> = clusters
        .iter()
        .map(|c| (c.clone(), haversine_km(viewer, c.centroid)))
        .filter(|(_, distance)| *distance <= radius_km)
        .collect();
    hits.sort_by(|a, b| a.1.total_cmp(&b.1));
    hits
}

/// Running totals for one occupied cell. Identity fields come from the
/// first member report.
struct CellAccumulator {
    disease_key: String,
    disease: String,
    region: String,
    crops: Vec<String>,
    lat_sum: f64,
    lon_sum: f64,
    count: usize,
    severity: Severity,
}

impl CellAccumulator {
    fn seed(report: &Report) -> Self {
        Self {
            disease_key: report.disease_key.clone(),
            disease: report.disease.clone(),
            region: report.region.clone(),
            crops: Vec::new(),
            lat_sum: 0.0,
            lon_sum: 0.0,
            count: 0,
            severity: Severity::Mild,
        }
    }

    fn add(&mut self, report: &Report, point: GeoPoint) {
        if !self.crops.contains(&report.crop) {
            self.crops.push(report.crop.clone());
        }
        self.lat_sum += point.lat;
        self.lon_sum += point.lon;
        self.count += 1;
        self.severity = self.severity.max(report.severity);
    }

    fn finish(self, cell_key: String, ok_votes: &BTreeMap<String, i64>) -> OutbreakCluster {
        let votes = ok_votes.get(&self.disease_key).copied().unwrap_or(0);
        let n = self.count.max(1) as f64;
        OutbreakCluster {
            cell_key,
            disease_key: self.disease_key,
            disease: self.disease,
            crops: self.crops,
            region: self.region,
            centroid: GeoPoint::new(self.lat_sum / n, self.lon_sum / n),
            count: self.count,
            severity: self.severity,
            ok_votes: votes,
            recovering: calming_applies(self.count, votes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cropwatch_common::model::ReportSubmission;

    fn report(
        disease: &str,
        crop: &str,
        severity: &str,
        lat: Option<f64>,
        lon: Option<f64>,
    ) -> Report {
        ReportSubmission {
            disease: Some(disease.to_string()),
            crop: Some(crop.to_string()),
            severity: Some(severity.to_string()),
            region: Some("Maharashtra".to_string()),
            lat,
            lon,
        }
        .validate()
        .unwrap()
    }

    fn no_votes() -> BTreeMap<String, i64> {
        BTreeMap::new()
    }

    #[test]
    fn test_nearby_reports_share_a_cluster() {
        let reports = vec![
            report("Blast", "Rice", "mild", Some(20.00), Some(75.00)),
            report("blast", "Rice", "mild", Some(20.02), Some(75.01)),
        ];

        let clusters = build_clusters(&reports, &no_votes());
        assert_eq!(clusters.len(), 1);

        let c = &clusters[0];
        assert_eq!(c.count, 2);
        assert_eq!(c.disease_key, "blast");
        assert!((c.centroid.lat - 20.01).abs() < 1e-9);
        assert!((c.centroid.lon - 75.005).abs() < 1e-9);
    }

    #[test]
    fn test_distant_reports_split_into_cells() {
        let reports = vec![
            report("Blast", "Rice", "mild", Some(20.00), Some(75.00)),
            report("Blast", "Rice", "mild", Some(20.30), Some(75.00)),
        ];

        let clusters = build_clusters(&reports, &no_votes());
        assert_eq!(clusters.len(), 2);
        assert!(clusters.iter().all(|c| c.count == 1));
    }

    #[test]
    fn test_same_cell_different_disease_stays_separate() {
        let reports = vec![
            report("Blast", "Rice", "mild", Some(20.00), Some(75.00)),
            report("Wilt", "Cotton", "mild", Some(20.00), Some(75.00)),
        ];

        let clusters = build_clusters(&reports, &no_votes());
        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn test_resolved_and_unlocated_reports_are_excluded() {
        let mut resolved = report("Blast", "Rice", "mild", Some(20.00), Some(75.00));
        resolved.resolved = true;

        let reports = vec![
            resolved,
            report("Blast", "Rice", "mild", None, None),
            report("Blast", "Rice", "mild", Some(20.01), None),
        ];

        assert!(build_clusters(&reports, &no_votes()).is_empty());
    }

    #[test]
    fn test_cluster_severity_is_member_maximum() {
        let reports = vec![
            report("Blast", "Rice", "mild", Some(20.00), Some(75.00)),
            report("Blast", "Rice", "severe", Some(20.01), Some(75.01)),
            report("Blast", "Rice", "moderate", Some(20.02), Some(75.02)),
        ];

        let clusters = build_clusters(&reports, &no_votes());
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].severity, Severity::Severe);
    }

    #[test]
    fn test_crops_deduplicate_in_first_seen_order() {
        let reports = vec![
            report("Blast", "Rice", "mild", Some(20.00), Some(75.00)),
            report("Blast", "Wheat", "mild", Some(20.01), Some(75.01)),
            report("Blast", "Rice", "mild", Some(20.02), Some(75.02)),
        ];

        let clusters = build_clusters(&reports, &no_votes());
        assert_eq!(clusters[0].crops, vec!["Rice", "Wheat"]);
    }

    #[test]
    fn test_calming_rule_boundaries() {
        // 2 votes against 4 reports: votes cover half, calming applies
        assert!(calming_applies(4, 2));
        // 2 votes against 5 reports: under half, no calming
        assert!(!calming_applies(5, 2));
        // zero votes never calm, whatever the count
        assert!(!calming_applies(0, 0));
        assert!(!calming_applies(1, 0));
        // a single vote calms a single report
        assert!(calming_applies(1, 1));
    }

    #[test]
    fn test_votes_mark_cluster_recovering() {
        let reports = vec![
            report("Blast", "Rice", "mild", Some(20.00), Some(75.00)),
            report("Blast", "Rice", "mild", Some(20.01), Some(75.01)),
            report("Blast", "Rice", "mild", Some(20.02), Some(75.00)),
            report("Blast", "Rice", "mild", Some(20.00), Some(75.02)),
        ];

        let mut votes = BTreeMap::new();
        votes.insert("blast".to_string(), 2_i64);

        let clusters = build_clusters(&reports, &votes);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].ok_votes, 2);
        assert!(clusters[0].recovering);

        // votes for another disease leave this cluster untouched
        let mut other = BTreeMap::new();
        other.insert("wilt".to_string(), 10_i64);
        let clusters = build_clusters(&reports, &other);
        assert!(!clusters[0].recovering);
        assert_eq!(clusters[0].ok_votes, 0);
    }

    #[test]
    fn test_nearby_filters_and_sorts_by_distance() {
        let reports = vec![
            report("Blast", "Rice", "mild", Some(20.00), Some(75.00)),
            report("Blast", "Rice", "mild", Some(20.02), Some(75.01)),
            report("Wilt", "Cotton", "mild", Some(21.00), Some(76.00)),
        ];
        let clusters = build_clusters(&reports, &no_votes());
        assert_eq!(clusters.len(), 2);

        let viewer = GeoPoint::new(20.00, 75.00);
        let hits = nearby(&clusters, viewer, 5.0);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0.disease_key, "blast");
        assert!(hits[0].1 < 5.0);

        // a wide enough radius reaches the wilt cluster too, farthest last
        let hits = nearby(&clusters, viewer, 500.0);
        assert_eq!(hits.len(), 2);
        assert!(hits[0].1 <= hits[1].1);
        assert_eq!(hits[1].0.disease_key, "wilt");
    }
}
