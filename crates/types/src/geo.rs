//! Geographic point type wrapping the `geo` crate.
//!
//! Coordinates are WGS84 degrees, x = longitude and y = latitude. Distances
//! are reported in kilometers since that is the unit radius queries use.

use serde::{Deserialize, Serialize};

/// Mean Earth circumference in kilometers.
pub const EARTH_CIRCUMFERENCE_KM: f64 = 40_075.0;

/// Highest absolute latitude a geo index accepts (the Web Mercator limit
/// Redis geo sets enforce).
pub const MAX_INDEXABLE_LATITUDE: f64 = 85.051_128_78;

/// A geographic point with longitude/latitude coordinates.
///
/// # Examples
///
/// ```
/// use murmur_types::geo::Point;
///
/// let nyc = Point::new(-74.0060, 40.7128);
/// assert_eq!(nyc.lon(), -74.0060);
/// assert_eq!(nyc.lat(), 40.7128);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    inner: geo::Point<f64>,
}

impl Point {
    /// Create a new point from longitude and latitude in degrees.
    #[inline]
    pub fn new(lon: f64, lat: f64) -> Self {
        Self {
            inner: geo::Point::new(lon, lat),
        }
    }

    #[inline]
    pub fn x(&self) -> f64 {
        self.inner.x()
    }

    #[inline]
    pub fn y(&self) -> f64 {
        self.inner.y()
    }

    /// Get the longitude (alias for x).
    #[inline]
    pub fn lon(&self) -> f64 {
        self.x()
    }

    /// Get the latitude (alias for y).
    #[inline]
    pub fn lat(&self) -> f64 {
        self.y()
    }

    /// Access the inner `geo::Point`.
    #[inline]
    pub fn inner(&self) -> &geo::Point<f64> {
        &self.inner
    }

    /// Convert into the inner `geo::Point`.
    #[inline]
    pub fn into_inner(self) -> geo::Point<f64> {
        self.inner
    }

    /// Both coordinates are finite numbers.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x().is_finite() && self.y().is_finite()
    }

    /// Haversine distance to another point in meters.
    ///
    /// ```
    /// use murmur_types::geo::Point;
    ///
    /// let nyc = Point::new(-74.0060, 40.7128);
    /// let la = Point::new(-118.2437, 34.0522);
    /// assert!(nyc.haversine_distance(&la) > 3_900_000.0);
    /// ```
    #[inline]
    pub fn haversine_distance(&self, other: &Point) -> f64 {
        use geo::Distance;
        geo::Haversine.distance(self.inner, other.inner)
    }

    /// Haversine distance to another point in kilometers.
    #[inline]
    pub fn haversine_km(&self, other: &Point) -> f64 {
        self.haversine_distance(other) / 1000.0
    }
}

impl From<geo::Point<f64>> for Point {
    fn from(point: geo::Point<f64>) -> Self {
        Self { inner: point }
    }
}

impl From<Point> for geo::Point<f64> {
    fn from(point: Point) -> Self {
        point.inner
    }
}

impl From<(f64, f64)> for Point {
    fn from((lon, lat): (f64, f64)) -> Self {
        Self::new(lon, lat)
    }
}

impl From<Point> for (f64, f64) {
    fn from(point: Point) -> Self {
        (point.x(), point.y())
    }
}
