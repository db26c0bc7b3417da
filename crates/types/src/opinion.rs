//! Request and response shapes for submitting and querying opinions.
//!
//! Field names on the wire are `longitude`, `latitude`, `body`, `ttl`,
//! `radius` for requests and `created`, `longitude`, `latitude`, `body`,
//! `dist`, `ttl` for results. Missing request fields decode to their zero
//! value so that validation, not decoding, decides what counts as missing.

use crate::geo::Point;
use serde::{Deserialize, Serialize};

/// A new opinion to store.
///
/// `ttl` is in seconds. Absent or `0` expires the opinion immediately, a
/// negative value keeps it until the backing store evicts it some other way.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewOpinion {
    #[serde(default)]
    pub longitude: f64,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,
}

impl NewOpinion {
    pub fn new(longitude: f64, latitude: f64, body: impl Into<String>) -> Self {
        Self {
            longitude,
            latitude,
            body: body.into(),
            ttl: None,
        }
    }

    pub fn with_ttl(mut self, ttl_seconds: i64) -> Self {
        self.ttl = Some(ttl_seconds);
        self
    }

    /// Keep the opinion with no expiry.
    pub fn forever(mut self) -> Self {
        self.ttl = Some(-1);
        self
    }

    pub fn location(&self) -> Point {
        Point::new(self.longitude, self.latitude)
    }
}

/// Radius query around a point. `radius` is in kilometers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NearQuery {
    #[serde(default)]
    pub longitude: f64,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub radius: i64,
}

impl NearQuery {
    pub fn new(longitude: f64, latitude: f64, radius: i64) -> Self {
        Self {
            longitude,
            latitude,
            radius,
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.longitude, self.latitude)
    }
}

/// An opinion as returned by a radius query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opinion {
    /// Creation time, unix seconds
    pub created: i64,
    pub longitude: f64,
    pub latitude: f64,
    pub body: String,
    /// Distance from the query center in kilometers
    pub dist: f64,
    /// Remaining lifetime in seconds, absent when the opinion never expires
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u64>,
}
