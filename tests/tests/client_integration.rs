use murmur::{MemoryBackend, Murmur, StorageBackend};
use murmur_client::{MurmurClient, MurmurHttpClient};
use murmur_server::run_server;
use murmur_server::transport::http;
use murmur_types::opinion::{NearQuery, NewOpinion};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

struct TestServer {
    rpc: SocketAddr,
    http: SocketAddr,
}

/// Serve one store over both transports.
async fn spawn_test_server() -> anyhow::Result<TestServer> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "murmur_server=info,murmur=info,info".into()),
        )
        .try_init()
        .ok();

    let backend: Arc<dyn StorageBackend> = Arc::new(MemoryBackend::new());
    let db = Murmur::builder().backend(backend).build()?;

    let rpc_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let http_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let server = TestServer {
        rpc: rpc_listener.local_addr()?,
        http: http_listener.local_addr()?,
    };

    let rpc_db = db.clone();
    tokio::spawn(async move {
        let _ = run_server(rpc_listener, rpc_db, futures::future::pending()).await;
    });
    tokio::spawn(async move {
        let _ = http::run_server(http_listener, db, futures::future::pending()).await;
    });

    // Give it a moment to start
    tokio::time::sleep(Duration::from_millis(50)).await;

    Ok(server)
}

#[tokio::test]
async fn test_transports_share_one_store() -> anyhow::Result<()> {
    let server = spawn_test_server().await?;
    let rpc = MurmurClient::connect(server.rpc).await?;
    let web = MurmurHttpClient::new(&format!("http://{}", server.http))?;

    rpc.submit(NewOpinion::new(-0.1278, 51.5074, "via rpc").with_ttl(600))
        .await?;
    web.submit(&NewOpinion::new(-0.1279, 51.5075, "via http").with_ttl(600))
        .await?;

    let from_http = web.near(&NearQuery::new(-0.1278, 51.5074, 2)).await?;
    let from_rpc = rpc.near(NearQuery::new(-0.1278, 51.5074, 2)).await?;
    let bodies = |found: &[murmur_types::opinion::Opinion]| -> Vec<String> {
        found.iter().map(|o| o.body.clone()).collect()
    };
    assert_eq!(bodies(&from_http), bodies(&from_rpc));
    assert_eq!(from_rpc.len(), 2);
    assert_eq!(from_rpc[0].body, "via rpc");

    let stats = web.stats().await?;
    assert_eq!(stats.submitted_count, 2);
    assert_eq!(stats.query_count, 2);
    Ok(())
}

#[tokio::test]
async fn test_http_errors_map_to_status() -> anyhow::Result<()> {
    let server = spawn_test_server().await?;
    let web = MurmurHttpClient::new(&format!("http://{}", server.http))?;

    let err = web
        .near(&NearQuery::new(10.0, 20.0, 0))
        .await
        .unwrap_err();
    assert!(!err.is_retryable());
    assert!(err.to_string().contains("400"));
    Ok(())
}

#[tokio::test]
async fn test_concurrent_clients_get_unique_ids() -> anyhow::Result<()> {
    let server = spawn_test_server().await?;

    let mut handles = Vec::new();
    for worker in 0..8 {
        let addr = server.rpc;
        handles.push(tokio::spawn(async move {
            let client = MurmurClient::connect(addr).await?;
            let mut ids = Vec::new();
            for i in 0..25 {
                let lon = 10.0 + (worker * 25 + i) as f64 * 0.0001;
                ids.push(
                    client
                        .submit(NewOpinion::new(lon, 20.0, "crowd").with_ttl(600))
                        .await?,
                );
            }
            Ok::<_, anyhow::Error>(ids)
        }));
    }

    let mut ids = HashSet::new();
    for handle in handles {
        for id in handle.await?? {
            assert!(ids.insert(id), "id {id} handed out twice");
        }
    }
    assert_eq!(ids.len(), 200);

    let client = MurmurClient::connect(server.rpc).await?;
    assert_eq!(client.stats().await?.indexed_entries, 200);
    Ok(())
}

#[tokio::test]
async fn test_expired_opinions_disappear() -> anyhow::Result<()> {
    let server = spawn_test_server().await?;
    let client = MurmurClient::connect(server.rpc).await?;

    client
        .submit(NewOpinion::new(10.0, 20.0, "brief").with_ttl(1))
        .await?;
    client
        .submit(NewOpinion::new(10.0, 20.0, "lasting").forever())
        .await?;

    tokio::time::sleep(Duration::from_millis(1500)).await;

    let nearby = client.near(NearQuery::new(10.0, 20.0, 1)).await?;
    let bodies: Vec<_> = nearby.iter().map(|o| o.body.as_str()).collect();
    assert_eq!(bodies, vec!["lasting"]);
    assert_eq!(nearby[0].ttl, None);

    let stats = client.stats().await?;
    assert_eq!(stats.evicted_count, 1);
    assert_eq!(stats.indexed_entries, 1);
    Ok(())
}
