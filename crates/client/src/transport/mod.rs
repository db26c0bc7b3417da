//! Transport layer for murmur client
//!
//! Available transports:
//! - `rpc` - tarpc-based RPC (default)
//! - `http` - HTTP routes (requires `http` feature)

pub mod rpc;

#[cfg(feature = "http")]
pub mod http;
