//! tarpc transport for murmur server
//!
//! Each accepted connection runs as a task in a [`JoinSet`] owned by the
//! accept loop. Requests on one connection run concurrently up to
//! [`RpcOptions::max_concurrent_requests`]. On shutdown the listener stops
//! accepting and open connections get [`RpcOptions::drain_timeout`] to
//! finish before they are aborted.

use std::future::Future;
use std::time::Duration;

use futures::prelude::*;
use murmur::Murmur;
use tarpc::server::{BaseChannel, Channel};
use tarpc::tokio_serde::formats::Json;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tracing::{debug, error, info, warn};

use crate::handler::Handler;
use crate::protocol::MurmurService;

/// Tuning for [`run_server_with`].
#[derive(Debug, Clone)]
pub struct RpcOptions {
    /// In-flight requests allowed per connection
    pub max_concurrent_requests: usize,
    /// How long open connections may keep running after shutdown
    pub drain_timeout: Duration,
}

impl Default for RpcOptions {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 64,
            drain_timeout: Duration::from_secs(5),
        }
    }
}

impl RpcOptions {
    pub fn with_max_concurrent_requests(mut self, limit: usize) -> Self {
        assert!(limit > 0, "max_concurrent_requests must be positive");
        self.max_concurrent_requests = limit;
        self
    }

    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }
}

/// Run the tarpc RPC server with default [`RpcOptions`] until `shutdown`
/// resolves.
pub async fn run_server(
    listener: TcpListener,
    db: Murmur,
    shutdown: impl Future<Output = ()> + Unpin + Send + 'static,
) -> anyhow::Result<()> {
    run_server_with(listener, db, shutdown, RpcOptions::default()).await
}

/// Run the tarpc RPC server until `shutdown` resolves, then drain open
/// connections.
pub async fn run_server_with(
    listener: TcpListener,
    db: Murmur,
    mut shutdown: impl Future<Output = ()> + Unpin + Send + 'static,
    options: RpcOptions,
) -> anyhow::Result<()> {
    let handler = Handler::new(db);
    let mut connections = JoinSet::new();

    info!("murmur RPC server listening on {}", listener.local_addr()?);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((socket, peer)) => {
                        debug!("RPC connection from {}", peer);
                        connections.spawn(serve_connection(
                            socket,
                            handler.clone(),
                            options.max_concurrent_requests,
                        ));
                    }
                    Err(e) => {
                        error!("Accept error: {}", e);
                    }
                }
            }
            Some(finished) = connections.join_next(), if !connections.is_empty() => {
                if let Err(e) = finished {
                    if e.is_panic() {
                        error!("RPC connection task panicked: {}", e);
                    }
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received, stopping RPC server...");
                break;
            }
        }
    }

    drop(listener);
    drain(&mut connections, options.drain_timeout).await;
    Ok(())
}

async fn serve_connection(socket: TcpStream, handler: Handler, max_concurrent_requests: usize) {
    let framed = Framed::new(socket, LengthDelimitedCodec::new());
    let transport = tarpc::serde_transport::new(framed, Json::default());

    BaseChannel::with_defaults(transport)
        .execute(handler.serve())
        .for_each_concurrent(max_concurrent_requests, |response| response)
        .await;
}

async fn drain(connections: &mut JoinSet<()>, timeout: Duration) {
    if connections.is_empty() {
        return;
    }
    info!("Waiting for {} open RPC connections", connections.len());

    let finished = tokio::time::timeout(timeout, async {
        while connections.join_next().await.is_some() {}
    })
    .await;

    if finished.is_err() {
        warn!(
            "Aborting {} RPC connections still open after {:?}",
            connections.len(),
            timeout
        );
        connections.shutdown().await;
    }
}
