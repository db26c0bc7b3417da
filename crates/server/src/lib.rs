//! murmur server
//!
//! Network front end for the murmur opinion service.
//!
//! # Transports
//!
//! - **RPC** (default): tarpc over TCP with JSON framing
//! - **HTTP** (`http` feature): `POST /add/opinion`, `POST /opinions/near`, `GET /stats`
//!
//! # Example
//!
//! ```ignore
//! use murmur_server::run_server;
//!
//! run_server(listener, db, shutdown).await?;
//! ```

#[cfg(feature = "http")]
pub mod error;
pub mod handler;
pub mod protocol;
pub mod transport;

// Re-export protocol types for client usage
pub use protocol::{MurmurService, MurmurServiceClient, RemoteError};

// Re-export default transport for convenience
pub use transport::rpc::{RpcOptions, run_server, run_server_with};
