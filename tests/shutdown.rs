//! Lifecycle tests: graceful drain, forced cutoff and bind failure.

use std::time::{Duration, Instant};

use download_server::lifecycle::{LifecycleManager, LifecycleState, Shutdown, StopReason};
use download_server::store::MemoryStore;
use download_server::HttpServer;

mod common;

use common::{payload, start_server, test_config, CountingHooks};

/// Read the rest of a streaming body, stopping at the first error.
async fn drain_body(mut response: reqwest::Response, mut received: usize) -> (usize, bool) {
    loop {
        match response.chunk().await {
            Ok(Some(chunk)) => received += chunk.len(),
            Ok(None) => return (received, false),
            Err(_) => return (received, true),
        }
    }
}

#[tokio::test]
async fn forced_cutoff_at_deadline() {
    let mut config = test_config();
    config.throttle.interval_ms = 200;
    config.throttle.cancel_on_shutdown = false;
    let store = MemoryStore::new().with_file("slow.bin", payload(40));
    let mut server = start_server(config, store).await;

    let mut response = reqwest::get(server.url("/download/limited/slow.bin"))
        .await
        .unwrap();
    assert_eq!(response.content_length(), Some(40));
    let first = response.chunk().await.unwrap().unwrap().len();
    let reader = tokio::spawn(drain_body(response, first));

    server.stop.trigger();
    assert_eq!(server.manager.await_stop().await, StopReason::Requested);
    let started = Instant::now();
    let report = server.manager.shutdown(Duration::from_millis(300)).await;

    assert!(report.forced);
    assert_eq!(report.aborted_connections, 1);
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(server.hooks.complete(), 1);
    assert_eq!(server.hooks.abnormal(), 0);

    let (received, _) = reader.await.unwrap();
    assert!(received < 40, "received {received} bytes");
}

#[tokio::test]
async fn throttled_transfer_ends_on_shutdown() {
    let mut config = test_config();
    config.throttle.interval_ms = 200;
    let store = MemoryStore::new().with_file("slow.bin", payload(40));
    let mut server = start_server(config, store).await;

    let mut response = reqwest::get(server.url("/download/limited/slow.bin"))
        .await
        .unwrap();
    let first = response.chunk().await.unwrap().unwrap().len();
    let reader = tokio::spawn(drain_body(response, first));

    server.stop.trigger();
    server.manager.await_stop().await;
    let report = server.manager.shutdown(Duration::from_secs(5)).await;

    assert!(!report.forced);
    assert_eq!(report.aborted_connections, 0);
    assert!(report.elapsed < Duration::from_secs(1));
    assert_eq!(server.hooks.complete(), 1);

    let (received, _) = reader.await.unwrap();
    assert!(received < 40, "received {received} bytes");
}

#[tokio::test]
async fn idle_server_shuts_down_cleanly() {
    let server = start_server(test_config(), MemoryStore::new()).await;
    let mut manager = server.manager;
    let mut states = manager.watch_state();
    assert_eq!(*states.borrow_and_update(), LifecycleState::Running);

    server.stop.trigger();
    manager.await_stop().await;
    let report = manager.shutdown(Duration::from_secs(1)).await;

    assert!(!report.forced);
    assert_eq!(*states.borrow(), LifecycleState::Stopped);
    assert_eq!(server.hooks.complete(), 1);
}

#[tokio::test]
async fn no_connections_accepted_after_stop() {
    let store = MemoryStore::new().with_file("a.bin", payload(8));
    let mut server = start_server(test_config(), store).await;
    let url = server.url("/download/a.bin");

    assert!(reqwest::get(&url).await.unwrap().status().is_success());

    server.stop.trigger();
    server.manager.await_stop().await;
    server.manager.shutdown(Duration::from_secs(1)).await;

    let client = reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .build()
        .unwrap();
    assert!(client.get(&url).send().await.is_err());
}

#[tokio::test]
async fn bind_failure_is_abnormal() {
    let occupied = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = occupied.local_addr().unwrap().port();

    let mut config = test_config();
    config.server.port = port;
    let hooks = CountingHooks::default();
    let stop = Shutdown::new();
    let mut manager =
        LifecycleManager::new(config.server.clone(), stop.subscribe()).with_hooks(hooks.clone());
    let app = HttpServer::new(
        &config,
        std::sync::Arc::new(MemoryStore::new()),
        manager.drain_signal(),
    )
    .into_router();

    assert!(manager.start(app).await.is_err());
    assert_eq!(hooks.abnormal(), 1);
    assert_eq!(manager.state(), LifecycleState::ShuttingDown);
    assert_eq!(manager.await_stop().await, StopReason::Abnormal);

    let report = manager.shutdown(Duration::from_secs(1)).await;
    assert!(!report.forced);
    assert_eq!(hooks.complete(), 1);
}

#[tokio::test]
async fn run_returns_bind_error() {
    let occupied = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let mut config = test_config();
    config.server.port = occupied.local_addr().unwrap().port();
    let hooks = CountingHooks::default();
    let manager = LifecycleManager::new(config.server.clone(), Shutdown::new().subscribe())
        .with_hooks(hooks.clone());
    let app = HttpServer::new(
        &config,
        std::sync::Arc::new(MemoryStore::new()),
        manager.drain_signal(),
    )
    .into_router();

    assert!(manager.run(app).await.is_err());
    assert_eq!(hooks.abnormal(), 1);
    assert_eq!(hooks.complete(), 1);
}
