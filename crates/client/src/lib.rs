//! murmur client
//!
//! Native Rust client for the murmur opinion service.
//!
//! # Transports
//!
//! - **RPC** (default): tarpc over TCP
//! - **HTTP** (optional): the service's HTTP routes, enable with `http` feature
//!
//! # Example
//!
//! ```ignore
//! use murmur_client::MurmurClient;
//! use murmur_types::opinion::{NearQuery, NewOpinion};
//!
//! let client = MurmurClient::connect(addr).await?;
//! client.submit(NewOpinion::new(10.0, 20.0, "hello").with_ttl(3600)).await?;
//! let nearby = client.near(NearQuery::new(10.0, 20.0, 1)).await?;
//! ```

pub mod transport;

// Re-export the default (RPC) client for convenience
pub use transport::rpc::{ClientError, MurmurClient, Result};

#[cfg(feature = "http")]
pub use transport::http::{HttpClientError, MurmurHttpClient};
