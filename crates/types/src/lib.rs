//! # murmur-types
//!
//! Types shared between the murmur core, its server and its clients.
//!
//! - **Geographic**: [`geo::Point`], a WGS84 longitude/latitude pair with
//!   haversine distance in kilometers
//! - **Opinions**: the request and response shapes of the two public
//!   operations, submit and query-near
//! - **Stats**: counters reported by a running service
//!
//! ## Examples
//!
//! ```rust
//! use murmur_types::geo::Point;
//! use murmur_types::opinion::{NearQuery, NewOpinion};
//!
//! let here = Point::new(10.0, 20.0);
//! let submit = NewOpinion::new(here.lon(), here.lat(), "the bakery is open late today")
//!     .with_ttl(3600);
//! let query = NearQuery::new(here.lon(), here.lat(), 1);
//!
//! assert_eq!(submit.ttl, Some(3600));
//! assert_eq!(query.center(), here);
//! ```

pub mod geo;
pub mod opinion;
pub mod stats;
