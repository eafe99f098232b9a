use crate::config::ClusterConfig;
use crate::core::units::{approximate_distance_metres, Orientation360};
use serde::{Deserialize, Serialize};

/// This module estimates how many separate properties appear in one aerial roof capture.
///
/// Clustering is a single greedy pass: each unassigned segment seeds a cluster and pulls in every
/// later unassigned segment that sits close to the seed and faces a similar way. Membership is
/// compared against the seed only, so the result depends on iteration order. Use
/// [`PropertyClusterDetector::detect_in_order`] to fix that order explicitly.

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoofSegment {
    pub id: String,
    /// Compass bearing of the segment, in degrees
    pub orientation: f64,
    #[serde(default)]
    pub boundary_points: Vec<LatLng>,
}

impl RoofSegment {
    /// Mean of the boundary points, or `None` for a segment with no boundary.
    pub fn centroid(&self) -> Option<(f64, f64)> {
        if self.boundary_points.is_empty() {
            return None;
        }
        let count = self.boundary_points.len() as f64;
        let (lat_sum, lng_sum) = self
            .boundary_points
            .iter()
            .fold((0., 0.), |(lat, lng), point| (lat + point.lat, lng + point.lng));
        Some((lat_sum / count, lng_sum / count))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiPropertyDetection {
    pub property_count: usize,
    /// Each inner list is one cluster; together they partition the input segments
    pub clustered_segments: Vec<Vec<RoofSegment>>,
    pub confidence: f64,
}

impl MultiPropertyDetection {
    fn empty() -> Self {
        Self {
            property_count: 0,
            clustered_segments: vec![],
            confidence: 0.,
        }
    }

    pub fn spans_multiple_properties(&self) -> bool {
        self.property_count > 1
    }
}

#[derive(Clone, Debug, Default)]
pub struct PropertyClusterDetector {
    config: ClusterConfig,
}

impl PropertyClusterDetector {
    pub fn new(config: ClusterConfig) -> Self {
        Self { config }
    }

    /// Cluster segments in the order supplied.
    pub fn detect_multiple_properties(&self, segments: &[RoofSegment]) -> MultiPropertyDetection {
        let order: Vec<usize> = (0..segments.len()).collect();
        self.detect_in_order(segments, &order)
    }

    /// Cluster segments visiting them in `order` (indices into `segments`). Indices that are out
    /// of range or repeated are ignored, and any segment the order leaves out is visited
    /// afterwards in input order, so every segment still lands in exactly one cluster.
    pub fn detect_in_order(
        &self,
        segments: &[RoofSegment],
        order: &[usize],
    ) -> MultiPropertyDetection {
        if segments.is_empty() {
            return MultiPropertyDetection::empty();
        }

        let visit_order = complete_visit_order(segments.len(), order);
        let centroids: Vec<Option<(f64, f64)>> =
            segments.iter().map(RoofSegment::centroid).collect();
        let mut processed = vec![false; segments.len()];
        let mut clusters: Vec<Vec<usize>> = vec![];

        for (position, &seed) in visit_order.iter().enumerate() {
            if processed[seed] {
                continue;
            }
            processed[seed] = true;
            let mut cluster = vec![seed];

            if let Some(seed_centroid) = centroids[seed] {
                for &candidate in &visit_order[position + 1..] {
                    if processed[candidate] {
                        continue;
                    }
                    let Some(candidate_centroid) = centroids[candidate] else {
                        continue;
                    };
                    if self.belong_together(
                        seed_centroid,
                        &segments[seed],
                        candidate_centroid,
                        &segments[candidate],
                    ) {
                        processed[candidate] = true;
                        cluster.push(candidate);
                    }
                }
            }

            clusters.push(cluster);
        }

        MultiPropertyDetection {
            property_count: clusters.len(),
            confidence: multi_property_confidence(clusters.len()),
            clustered_segments: clusters
                .into_iter()
                .map(|cluster| cluster.into_iter().map(|i| segments[i].clone()).collect())
                .collect(),
        }
    }

    fn belong_together(
        &self,
        seed_centroid: (f64, f64),
        seed: &RoofSegment,
        candidate_centroid: (f64, f64),
        candidate: &RoofSegment,
    ) -> bool {
        let distance = approximate_distance_metres(
            seed_centroid,
            candidate_centroid,
            self.config.metres_per_degree,
        );
        let orientation_difference = Orientation360::orientation_difference(
            seed.orientation.into(),
            candidate.orientation.into(),
        );

        distance < self.config.max_centroid_distance_m
            && orientation_difference < self.config.max_orientation_difference_deg
    }
}

fn complete_visit_order(segment_count: usize, order: &[usize]) -> Vec<usize> {
    let mut seen = vec![false; segment_count];
    let mut visit_order = Vec::with_capacity(segment_count);
    for index in order.iter().copied().chain(0..segment_count) {
        if index < segment_count && !seen[index] {
            seen[index] = true;
            visit_order.push(index);
        }
    }
    visit_order
}

/// How confident we are that the capture genuinely covers several properties.
fn multi_property_confidence(cluster_count: usize) -> f64 {
    match cluster_count {
        0 => 0.,
        1 => 0.3,
        n => (n as f64 * 0.2 + (n - 1) as f64 * 0.1).min(0.9),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    /// A small square segment centred on the given point.
    fn segment(id: &str, orientation: f64, lat: f64, lng: f64) -> RoofSegment {
        let half = 0.00002;
        RoofSegment {
            id: id.to_string(),
            orientation,
            boundary_points: vec![
                LatLng { lat: lat - half, lng: lng - half },
                LatLng { lat: lat - half, lng: lng + half },
                LatLng { lat: lat + half, lng: lng + half },
                LatLng { lat: lat + half, lng: lng - half },
            ],
        }
    }

    #[fixture]
    fn detector() -> PropertyClusterDetector {
        PropertyClusterDetector::default()
    }

    fn cluster_ids(detection: &MultiPropertyDetection) -> Vec<Vec<&str>> {
        detection
            .clustered_segments
            .iter()
            .map(|cluster| cluster.iter().map(|s| s.id.as_str()).collect())
            .collect()
    }

    #[rstest]
    fn should_return_empty_detection_for_no_segments(detector: PropertyClusterDetector) {
        assert_eq!(
            detector.detect_multiple_properties(&[]),
            MultiPropertyDetection {
                property_count: 0,
                clustered_segments: vec![],
                confidence: 0.,
            }
        );
    }

    #[rstest]
    fn should_compute_centroid_as_mean_of_boundary() {
        let (lat, lng) = segment("a", 180., 51.5, -0.12).centroid().unwrap();
        assert_relative_eq!(lat, 51.5, epsilon = 1e-12);
        assert_relative_eq!(lng, -0.12, epsilon = 1e-12);
        assert_eq!(
            RoofSegment {
                id: "empty".into(),
                orientation: 0.,
                boundary_points: vec![]
            }
            .centroid(),
            None
        );
    }

    #[rstest]
    fn should_group_nearby_segments_with_similar_orientation(detector: PropertyClusterDetector) {
        // about 11 m apart, facing 20 degrees apart
        let segments = [
            segment("front", 170., 51.5, -0.12),
            segment("rear", 190., 51.5001, -0.12),
        ];

        let detection = detector.detect_multiple_properties(&segments);

        assert_eq!(detection.property_count, 1);
        assert_eq!(cluster_ids(&detection), vec![vec!["front", "rear"]]);
        assert_eq!(detection.confidence, 0.3);
        assert!(!detection.spans_multiple_properties());
    }

    #[rstest]
    #[case(0.)]
    #[case(10.)]
    #[case(180.)]
    fn should_separate_distant_segments_whatever_their_orientation(
        detector: PropertyClusterDetector,
        #[case] orientation: f64,
    ) {
        // about 55 m apart
        let segments = [
            segment("a", 180., 51.5, -0.12),
            segment("b", orientation, 51.5005, -0.12),
        ];

        let detection = detector.detect_multiple_properties(&segments);

        assert_eq!(detection.property_count, 2);
        assert_relative_eq!(detection.confidence, 0.5);
    }

    #[rstest]
    fn should_separate_nearby_segments_facing_different_ways(detector: PropertyClusterDetector) {
        let segments = [
            segment("south", 180., 51.5, -0.12),
            segment("east", 90., 51.50001, -0.12),
        ];

        assert_eq!(detector.detect_multiple_properties(&segments).property_count, 2);
    }

    #[rstest]
    fn should_treat_orientations_across_north_as_similar(detector: PropertyClusterDetector) {
        let segments = [
            segment("a", 350., 51.5, -0.12),
            segment("b", 10., 51.50001, -0.12),
        ];

        assert_eq!(detector.detect_multiple_properties(&segments).property_count, 1);
    }

    #[rstest]
    fn should_keep_segment_without_boundary_on_its_own(detector: PropertyClusterDetector) {
        let segments = [
            segment("a", 180., 51.5, -0.12),
            RoofSegment {
                id: "no-boundary".into(),
                orientation: 180.,
                boundary_points: vec![],
            },
        ];

        let detection = detector.detect_multiple_properties(&segments);

        assert_eq!(cluster_ids(&detection), vec![vec!["a"], vec!["no-boundary"]]);
    }

    #[rstest]
    fn should_depend_on_visit_order(detector: PropertyClusterDetector) {
        // b sits between a and c: within reach of both, while a and c are too far apart
        let segments = [
            segment("a", 180., 51.5, -0.12),
            segment("b", 180., 51.5003, -0.12),
            segment("c", 180., 51.5006, -0.12),
        ];

        let in_input_order = detector.detect_multiple_properties(&segments);
        let b_first = detector.detect_in_order(&segments, &[1, 0, 2]);

        assert_eq!(cluster_ids(&in_input_order), vec![vec!["a", "b"], vec!["c"]]);
        assert_eq!(cluster_ids(&b_first), vec![vec!["b", "a", "c"]]);
    }

    #[rstest]
    fn should_partition_input_even_with_incomplete_order(detector: PropertyClusterDetector) {
        let segments = [
            segment("a", 180., 51.5, -0.12),
            segment("b", 0., 51.6, -0.12),
            segment("c", 90., 51.7, -0.12),
        ];

        let detection = detector.detect_in_order(&segments, &[2, 2, 7]);

        assert_eq!(cluster_ids(&detection), vec![vec!["c"], vec!["a"], vec!["b"]]);
        let total: usize = detection.clustered_segments.iter().map(Vec::len).sum();
        assert_eq!(total, segments.len());
    }

    #[rstest]
    #[case(0, 0.)]
    #[case(1, 0.3)]
    #[case(2, 0.5)]
    #[case(3, 0.8)]
    #[case(4, 0.9)]
    #[case(10, 0.9)]
    fn test_multi_property_confidence(#[case] clusters: usize, #[case] expected: f64) {
        assert_relative_eq!(multi_property_confidence(clusters), expected);
    }

    #[rstest]
    fn should_use_configured_thresholds() {
        let detector = PropertyClusterDetector::new(ClusterConfig {
            max_centroid_distance_m: 5.,
            ..Default::default()
        });
        let segments = [
            segment("a", 180., 51.5, -0.12),
            segment("b", 180., 51.5001, -0.12),
        ];

        assert_eq!(detector.detect_multiple_properties(&segments).property_count, 2);
    }
}
