use anyhow::Context;
use clap::Parser;
use murmur::{Config, Murmur};
use murmur_server::{RpcOptions, run_server_with};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Also serve the HTTP routes on this port (`http` feature)
    #[arg(long)]
    http_port: Option<u16>,

    /// Use Redis at this URL instead of process memory (`redis` feature)
    #[arg(long)]
    redis_url: Option<String>,

    /// In-flight requests allowed per RPC connection
    #[arg(long, default_value_t = 64)]
    max_concurrent_requests: usize,

    /// Seconds open RPC connections may run after shutdown is requested
    #[arg(long, default_value_t = 5)]
    drain_secs: u64,

    /// Service configuration, TOML or JSON by extension
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn load_config(path: &Path) -> anyhow::Result<Config> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;

    let config = if path.extension().is_some_and(|ext| ext == "json") {
        Config::from_json(&raw)?
    } else {
        Config::from_toml(&raw)?
    };
    Ok(config)
}

async fn open(args: &Args, config: Config) -> anyhow::Result<Murmur> {
    #[cfg(feature = "redis")]
    if let Some(url) = &args.redis_url {
        info!("Using Redis at {}", url);
        let config = config.clone().with_redis(config.redis.clone().with_url(url));
        return Ok(Murmur::builder().config(config).build_redis().await?);
    }

    if args.redis_url.is_some() {
        anyhow::bail!("--redis-url needs a build with the `redis` feature");
    }
    info!("Using in-memory store");
    Ok(Murmur::builder().in_memory().config(config).build()?)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl_c signal: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "murmur_server=info,murmur=info,info".into()),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    let db = open(&args, config).await?;

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            shutdown.cancel();
        }
    });

    #[cfg(not(feature = "http"))]
    if args.http_port.is_some() {
        anyhow::bail!("--http-port needs a build with the `http` feature");
    }

    #[cfg(feature = "http")]
    let http = match args.http_port {
        Some(port) => {
            let addr: SocketAddr = format!("{}:{}", args.host, port).parse()?;
            let listener = tokio::net::TcpListener::bind(addr).await?;
            let stop = shutdown.clone().cancelled_owned();
            Some(tokio::spawn(murmur_server::transport::http::run_server(
                listener,
                db.clone(),
                stop,
            )))
        }
        None => None,
    };

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    if args.max_concurrent_requests == 0 {
        anyhow::bail!("--max-concurrent-requests must be positive");
    }
    let options = RpcOptions::default()
        .with_max_concurrent_requests(args.max_concurrent_requests)
        .with_drain_timeout(Duration::from_secs(args.drain_secs));
    run_server_with(
        listener,
        db,
        Box::pin(shutdown.clone().cancelled_owned()),
        options,
    )
    .await?;

    #[cfg(feature = "http")]
    if let Some(http) = http {
        http.await??;
    }

    info!("Server stopped");
    Ok(())
}
