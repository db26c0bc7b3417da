//! Boundary validation for submitted opinions and radius queries.
//!
//! A coordinate of exactly `0` counts as missing, which is how the wire
//! format has always told an omitted field apart from a supplied one. The
//! equator and the prime meridian are therefore not addressable.
//!
//! Latitudes are limited to what a geo index can hold,
//! [`MAX_INDEXABLE_LATITUDE`], so every backend accepts the same points.

use crate::config::Config;
use crate::error::{MurmurError, Result};
use murmur_types::geo::{EARTH_CIRCUMFERENCE_KM, MAX_INDEXABLE_LATITUDE, Point};
use murmur_types::opinion::{NearQuery, NewOpinion};

/// Validates a 2D point has valid longitude and latitude.
///
/// Longitude: [-180.0, 180.0], Latitude: [-90.0, 90.0]
///
/// # Examples
///
/// ```
/// use murmur::compute::validation::validate_geographic_point;
/// use murmur::Point;
///
/// let nyc = Point::new(-74.0060, 40.7128);
/// assert!(validate_geographic_point(&nyc).is_ok());
///
/// assert!(validate_geographic_point(&Point::new(200.0, 40.0)).is_err());
/// assert!(validate_geographic_point(&Point::new(-74.0, 95.0)).is_err());
/// ```
pub fn validate_geographic_point(point: &Point) -> Result<()> {
    let (x, y) = (point.x(), point.y());

    if !x.is_finite() {
        return Err(MurmurError::InvalidInput(format!(
            "Longitude must be finite, got: {}",
            x
        )));
    }

    if !y.is_finite() {
        return Err(MurmurError::InvalidInput(format!(
            "Latitude must be finite, got: {}",
            y
        )));
    }

    if !(-180.0..=180.0).contains(&x) {
        return Err(MurmurError::InvalidInput(format!(
            "Longitude out of range [-180.0, 180.0]: {}",
            x
        )));
    }

    if !(-90.0..=90.0).contains(&y) {
        return Err(MurmurError::InvalidInput(format!(
            "Latitude out of range [-90.0, 90.0]: {}",
            y
        )));
    }

    Ok(())
}

fn validate_present(point: &Point) -> Result<()> {
    if point.lon() == 0.0 {
        return Err(MurmurError::InvalidInput("longitude is required".into()));
    }
    if point.lat() == 0.0 {
        return Err(MurmurError::InvalidInput("latitude is required".into()));
    }
    validate_geographic_point(point)?;

    if point.lat().abs() > MAX_INDEXABLE_LATITUDE {
        return Err(MurmurError::InvalidInput(format!(
            "Latitude {} is beyond the indexable range of ±{}",
            point.lat(),
            MAX_INDEXABLE_LATITUDE
        )));
    }
    Ok(())
}

/// Validates a radius in kilometers and returns it as a float.
///
/// ```
/// use murmur::compute::validation::validate_radius_km;
///
/// assert_eq!(validate_radius_km(5).unwrap(), 5.0);
/// assert!(validate_radius_km(0).is_err());
/// assert!(validate_radius_km(-3).is_err());
/// assert!(validate_radius_km(50_000).is_err());
/// ```
pub fn validate_radius_km(radius: i64) -> Result<f64> {
    if radius == 0 {
        return Err(MurmurError::InvalidInput("radius is required".into()));
    }
    if radius < 0 {
        return Err(MurmurError::InvalidInput(format!(
            "Radius must be positive, got: {}",
            radius
        )));
    }

    let radius_km = radius as f64;
    if radius_km > EARTH_CIRCUMFERENCE_KM {
        return Err(MurmurError::InvalidInput(format!(
            "Radius {} exceeds Earth's circumference ({} km)",
            radius, EARTH_CIRCUMFERENCE_KM
        )));
    }
    Ok(radius_km)
}

/// Check a submission before anything touches the backing store.
pub fn validate_new_opinion(opinion: &NewOpinion, config: &Config) -> Result<()> {
    validate_present(&opinion.location())?;

    if opinion.body.is_empty() {
        return Err(MurmurError::InvalidInput("body is required".into()));
    }

    if opinion.body.len() > config.max_body_len {
        return Err(MurmurError::InvalidInput(format!(
            "Body is {} bytes, limit is {}",
            opinion.body.len(),
            config.max_body_len
        )));
    }

    if let Some(ttl) = opinion.ttl {
        if ttl > 0 && ttl as u64 > config.max_ttl_secs {
            return Err(MurmurError::InvalidInput(format!(
                "TTL of {} seconds exceeds the limit of {}",
                ttl, config.max_ttl_secs
            )));
        }
    }

    Ok(())
}

/// Check a radius query and return its radius in kilometers.
pub fn validate_near_query(query: &NearQuery) -> Result<f64> {
    validate_present(&query.center())?;
    validate_radius_km(query.radius)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_submission() {
        let config = Config::default();
        let opinion = NewOpinion::new(10.0, 20.0, "nice park").with_ttl(3600);
        assert!(validate_new_opinion(&opinion, &config).is_ok());

        // Negative coordinates are real places.
        let opinion = NewOpinion::new(-74.0060, -40.7128, "south");
        assert!(validate_new_opinion(&opinion, &config).is_ok());
    }

    #[test]
    fn test_zero_coordinates_are_missing() {
        let config = Config::default();

        let err = validate_new_opinion(&NewOpinion::new(0.0, 20.0, "x"), &config).unwrap_err();
        assert_eq!(err, MurmurError::InvalidInput("longitude is required".into()));

        let err = validate_new_opinion(&NewOpinion::new(10.0, 0.0, "x"), &config).unwrap_err();
        assert_eq!(err, MurmurError::InvalidInput("latitude is required".into()));

        assert!(validate_near_query(&NearQuery::new(0.0, 20.0, 1)).is_err());
    }

    #[test]
    fn test_body_rules() {
        let config = Config::default().with_max_body_len(8);

        assert!(validate_new_opinion(&NewOpinion::new(1.0, 1.0, ""), &config).is_err());
        assert!(validate_new_opinion(&NewOpinion::new(1.0, 1.0, "   "), &config).is_ok());
        assert!(validate_new_opinion(&NewOpinion::new(1.0, 1.0, "12345678"), &config).is_ok());
        assert!(validate_new_opinion(&NewOpinion::new(1.0, 1.0, "123456789"), &config).is_err());
    }

    #[test]
    fn test_out_of_range_and_non_finite() {
        let config = Config::default();

        assert!(validate_new_opinion(&NewOpinion::new(180.5, 1.0, "x"), &config).is_err());
        assert!(validate_new_opinion(&NewOpinion::new(1.0, -90.5, "x"), &config).is_err());
        assert!(validate_new_opinion(&NewOpinion::new(f64::NAN, 1.0, "x"), &config).is_err());
        assert!(validate_near_query(&NearQuery::new(1.0, f64::INFINITY, 5)).is_err());
    }

    #[test]
    fn test_latitude_limited_to_indexable_range() {
        let config = Config::default();

        assert!(validate_new_opinion(&NewOpinion::new(10.0, 85.05, "x"), &config).is_ok());
        assert!(validate_new_opinion(&NewOpinion::new(10.0, 87.0, "x"), &config).is_err());
        assert!(validate_new_opinion(&NewOpinion::new(10.0, -85.06, "x"), &config).is_err());
        assert!(validate_near_query(&NearQuery::new(10.0, 89.0, 5)).is_err());
    }

    #[test]
    fn test_ttl_limit() {
        let config = Config::default().with_max_ttl(std::time::Duration::from_secs(3600));

        let at_limit = NewOpinion::new(1.0, 1.0, "x").with_ttl(3600);
        assert!(validate_new_opinion(&at_limit, &config).is_ok());

        let over = NewOpinion::new(1.0, 1.0, "x").with_ttl(3601);
        assert!(validate_new_opinion(&over, &config).is_err());

        let huge = NewOpinion::new(1.0, 1.0, "x").with_ttl(i64::MAX);
        assert!(validate_new_opinion(&huge, &Config::default()).is_err());

        // No expiry and immediate expiry are not bounded.
        assert!(validate_new_opinion(&NewOpinion::new(1.0, 1.0, "x").forever(), &config).is_ok());
        assert!(validate_new_opinion(&NewOpinion::new(1.0, 1.0, "x").with_ttl(0), &config).is_ok());
    }

    #[test]
    fn test_near_query_radius() {
        assert_eq!(validate_near_query(&NearQuery::new(10.0, 20.0, 3)).unwrap(), 3.0);
        assert!(validate_near_query(&NearQuery::new(10.0, 20.0, 0)).is_err());
        assert!(validate_near_query(&NearQuery::new(10.0, 20.0, -1)).is_err());
        assert!(validate_near_query(&NearQuery::new(10.0, 20.0, 40_075)).is_ok());
        assert!(validate_near_query(&NearQuery::new(10.0, 20.0, 40_076)).is_err());
    }
}
