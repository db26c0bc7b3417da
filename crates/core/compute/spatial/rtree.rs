//! R*-tree backed geo sets for the in-memory backend.
//!
//! Each named set holds members at longitude/latitude positions. Radius
//! queries prune with an envelope in degrees, then filter and order by
//! haversine distance, so results match what a Redis `GEOSEARCH ... ASC
//! WITHDIST` would return up to the Earth radius each one assumes.
//!
//! # Example
//!
//! ```rust
//! use murmur::compute::spatial::SpatialIndexManager;
//! use murmur::Point;
//!
//! let mut index = SpatialIndexManager::new();
//! index.insert_point("opinions", 10.0, 20.0, "opinion_1".to_string());
//!
//! let hits = index.query_within_radius("opinions", &Point::new(10.0, 20.0), 1.0);
//! assert_eq!(hits[0].0, "opinion_1");
//! ```

use geo::HaversineMeasure;
use murmur_types::geo::Point as GeoPoint;
use rstar::{AABB, Point as RstarPoint, RTree};
use rustc_hash::FxHashMap;

/// 2D point for R*-tree indexing, tagged with its set member name.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedPoint {
    pub x: f64,
    pub y: f64,
    pub member: String,
}

impl IndexedPoint {
    pub fn new(x: f64, y: f64, member: String) -> Self {
        Self { x, y, member }
    }

    fn corner(x: f64, y: f64) -> Self {
        Self::new(x, y, String::new())
    }
}

impl RstarPoint for IndexedPoint {
    type Scalar = f64;
    const DIMENSIONS: usize = 2;

    fn generate(mut generator: impl FnMut(usize) -> Self::Scalar) -> Self {
        Self::corner(generator(0), generator(1))
    }

    fn nth(&self, index: usize) -> Self::Scalar {
        match index {
            0 => self.x,
            1 => self.y,
            _ => unreachable!(),
        }
    }

    fn nth_mut(&mut self, index: usize) -> &mut Self::Scalar {
        match index {
            0 => &mut self.x,
            1 => &mut self.y,
            _ => unreachable!(),
        }
    }
}

#[derive(Default)]
struct GeoSet {
    tree: RTree<IndexedPoint>,
    // Member -> indexed point, for idempotent inserts and removal by name
    members: FxHashMap<String, IndexedPoint>,
}

/// Named geo sets, one R*-tree each.
#[derive(Default)]
pub struct SpatialIndexManager {
    sets: FxHashMap<String, GeoSet>,
}

impl SpatialIndexManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or move a member. Returns `true` when the member is new.
    ///
    /// Re-inserting a member at its current position leaves the set as is.
    pub fn insert_point(&mut self, set: &str, x: f64, y: f64, member: String) -> bool {
        let geo_set = self.sets.entry(set.to_string()).or_default();

        if let Some(existing) = geo_set.members.get(&member) {
            if existing.x == x && existing.y == y {
                return false;
            }
            let stale = existing.clone();
            geo_set.tree.remove(&stale);
            let point = IndexedPoint::new(x, y, member.clone());
            geo_set.tree.insert(point.clone());
            geo_set.members.insert(member, point);
            return false;
        }

        let point = IndexedPoint::new(x, y, member.clone());
        geo_set.tree.insert(point.clone());
        geo_set.members.insert(member, point);
        true
    }

    /// Remove a member. Returns `true` when it was present.
    pub fn remove_entry(&mut self, set: &str, member: &str) -> bool {
        let Some(geo_set) = self.sets.get_mut(set) else {
            return false;
        };

        let Some(point) = geo_set.members.remove(member) else {
            return false;
        };

        geo_set.tree.remove(&point).is_some()
    }

    /// Members within `radius_km` of `center` with their distance in km,
    /// ascending by distance. Ties are broken by member name.
    ///
    /// # Assumptions
    ///
    /// The caller has validated that `center` is a geographic coordinate and
    /// that `radius_km` is positive and finite.
    pub fn query_within_radius(
        &self,
        set: &str,
        center: &GeoPoint,
        radius_km: f64,
    ) -> Vec<(String, f64)> {
        let Some(geo_set) = self.sets.get(set) else {
            return Vec::new();
        };

        let mut results = Vec::new();
        for envelope in compute_2d_envelopes(center, radius_km * 1000.0) {
            for point in geo_set.tree.locate_in_envelope_intersecting(&envelope) {
                let distance = center.haversine_km(&GeoPoint::new(point.x, point.y));
                if distance.is_finite() && distance <= radius_km {
                    results.push((point.member.clone(), distance));
                }
            }
        }

        results.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        // Envelopes split at the antimeridian never overlap, but a member
        // sitting exactly on ±180 could be reported by both.
        results.dedup_by(|a, b| a.0 == b.0);
        results
    }

    pub fn contains(&self, set: &str, member: &str) -> bool {
        self.sets
            .get(set)
            .is_some_and(|geo_set| geo_set.members.contains_key(member))
    }

    pub fn len(&self, set: &str) -> usize {
        self.sets.get(set).map_or(0, |geo_set| geo_set.members.len())
    }

    pub fn is_empty(&self, set: &str) -> bool {
        self.len(set) == 0
    }

    pub fn clear(&mut self) {
        self.sets.clear();
    }
}

/// Convert a radius in meters to latitude/longitude spans in degrees.
#[inline]
fn compute_lat_lon_degrees(lat: f64, radius: f64) -> (f64, f64) {
    let lat_degrees = (radius / HaversineMeasure::GRS80_MEAN_RADIUS.radius()).to_degrees();

    // Clamp latitude to avoid extreme expansion near poles
    let safe_lat = lat.abs().min(89.9);

    let lon_degrees = (radius
        / (HaversineMeasure::GRS80_MEAN_RADIUS.radius() * safe_lat.to_radians().cos()))
    .to_degrees();

    (lat_degrees, lon_degrees)
}

/// Compute the AABB envelopes covering a circle, split at the antimeridian.
///
/// A circle that reaches a pole covers every longitude.
fn compute_2d_envelopes(center: &GeoPoint, radius: f64) -> Vec<AABB<IndexedPoint>> {
    let (lat_degrees, lon_degrees) = compute_lat_lon_degrees(center.y(), radius);

    let min_y = (center.y() - lat_degrees).max(-90.0);
    let max_y = (center.y() + lat_degrees).min(90.0);

    let envelope = |min_x: f64, max_x: f64| {
        AABB::from_corners(
            IndexedPoint::corner(min_x, min_y),
            IndexedPoint::corner(max_x, max_y),
        )
    };

    if min_y <= -90.0 || max_y >= 90.0 || lon_degrees >= 180.0 {
        return vec![envelope(-180.0, 180.0)];
    }

    let min_x = center.x() - lon_degrees;
    let max_x = center.x() + lon_degrees;

    if min_x < -180.0 {
        vec![envelope(-180.0, max_x), envelope(min_x + 360.0, 180.0)]
    } else if max_x > 180.0 {
        vec![envelope(min_x, 180.0), envelope(-180.0, max_x - 360.0)]
    } else {
        vec![envelope(min_x, max_x)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_query() {
        let mut index = SpatialIndexManager::new();

        assert!(index.insert_point("opinions", 10.0, 20.0, "a".to_string()));
        assert!(index.insert_point("opinions", 10.001, 20.001, "b".to_string()));
        assert!(index.insert_point("opinions", 11.0, 21.0, "far".to_string()));

        let results = index.query_within_radius("opinions", &GeoPoint::new(10.0, 20.0), 1.0);
        let members: Vec<_> = results.iter().map(|(m, _)| m.as_str()).collect();
        assert_eq!(members, vec!["a", "b"]);
        assert_eq!(results[0].1, 0.0);
        assert!(results[1].1 > 0.0 && results[1].1 < 1.0);
    }

    #[test]
    fn test_results_ascend_by_distance() {
        let mut index = SpatialIndexManager::new();
        for i in (0..20).rev() {
            let offset = i as f64 * 0.001;
            index.insert_point("s", 10.0 + offset, 20.0, format!("m{i}"));
        }

        let results = index.query_within_radius("s", &GeoPoint::new(10.0, 20.0), 5.0);
        assert_eq!(results.len(), 20);
        assert!(results.windows(2).all(|w| w[0].1 <= w[1].1));
        assert_eq!(results[0].0, "m0");
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut index = SpatialIndexManager::new();

        assert!(index.insert_point("s", 1.0, 2.0, "x".to_string()));
        assert!(!index.insert_point("s", 1.0, 2.0, "x".to_string()));
        assert_eq!(index.len("s"), 1);

        let results = index.query_within_radius("s", &GeoPoint::new(1.0, 2.0), 1.0);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_reinsert_moves_member() {
        let mut index = SpatialIndexManager::new();
        index.insert_point("s", 1.0, 2.0, "x".to_string());
        index.insert_point("s", 50.0, 50.0, "x".to_string());

        assert_eq!(index.len("s"), 1);
        assert!(index.query_within_radius("s", &GeoPoint::new(1.0, 2.0), 10.0).is_empty());
        assert_eq!(
            index.query_within_radius("s", &GeoPoint::new(50.0, 50.0), 10.0).len(),
            1
        );
    }

    #[test]
    fn test_remove_entry() {
        let mut index = SpatialIndexManager::new();
        index.insert_point("s", 1.0, 2.0, "x".to_string());

        assert!(index.remove_entry("s", "x"));
        assert!(!index.remove_entry("s", "x"));
        assert!(!index.remove_entry("missing", "x"));
        assert!(index.is_empty("s"));
        assert!(!index.contains("s", "x"));
    }

    #[test]
    fn test_query_across_antimeridian() {
        let mut index = SpatialIndexManager::new();
        index.insert_point("s", -179.999, 0.5, "west".to_string());
        index.insert_point("s", 179.999, 0.5, "east".to_string());

        let results = index.query_within_radius("s", &GeoPoint::new(179.9995, 0.5), 1.0);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_query_near_pole() {
        let mut index = SpatialIndexManager::new();
        index.insert_point("s", 0.0, 89.99, "a".to_string());
        index.insert_point("s", 180.0, 89.99, "b".to_string());

        let results = index.query_within_radius("s", &GeoPoint::new(90.0, 89.995), 5.0);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_unknown_set_is_empty() {
        let index = SpatialIndexManager::new();
        assert!(index
            .query_within_radius("nothing", &GeoPoint::new(0.0, 0.0), 100.0)
            .is_empty());
        assert_eq!(index.len("nothing"), 0);
    }
}
