//! tarpc transport for murmur client
//!
//! This is the default RPC client.

use murmur_server::{MurmurServiceClient, RemoteError};
use murmur_types::opinion::{NearQuery, NewOpinion, Opinion};
use murmur_types::stats::ServiceStats;
use std::net::SocketAddr;
use tarpc::client;
use tarpc::context;
use tarpc::tokio_serde::formats::Json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),
    #[error("RPC error: {0}")]
    Rpc(#[from] tarpc::client::RpcError),
    #[error("Server error: {0}")]
    Server(#[from] RemoteError),
}

impl ClientError {
    /// Whether sending the same request again may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Server(e) => e.is_retryable(),
            ClientError::Connection(_) | ClientError::Rpc(_) => true,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Clone)]
pub struct MurmurClient {
    client: MurmurServiceClient,
}

impl MurmurClient {
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        let transport = tarpc::serde_transport::tcp::connect(addr, Json::default).await?;
        let client = MurmurServiceClient::new(client::Config::default(), transport).spawn();
        Ok(Self { client })
    }

    /// Store an opinion and return the id the service assigned.
    pub async fn submit(&self, opinion: NewOpinion) -> Result<u64> {
        Ok(self.client.submit(context::current(), opinion).await??)
    }

    pub async fn near(&self, query: NearQuery) -> Result<Vec<Opinion>> {
        Ok(self.client.near(context::current(), query).await??)
    }

    pub async fn stats(&self) -> Result<ServiceStats> {
        Ok(self.client.stats(context::current()).await??)
    }
}
