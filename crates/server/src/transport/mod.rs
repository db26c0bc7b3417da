//! Transport layer for murmur server
//!
//! Available transports:
//! - `rpc` - tarpc-based RPC (default)
//! - `http` - HTTP API, `/add/opinion`, `/opinions/near` and `/stats` (requires `http` feature)

pub mod rpc;

#[cfg(feature = "http")]
pub mod http;
