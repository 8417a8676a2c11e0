//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use download_server::config::AppConfig;
use download_server::lifecycle::{LifecycleHooks, LifecycleManager, Shutdown, ShutdownReport};
use download_server::net::ServeError;
use download_server::store::MemoryStore;
use download_server::HttpServer;

/// Hooks that count how often each callback fired.
#[derive(Clone, Default)]
pub struct CountingHooks {
    pub abnormal: Arc<AtomicUsize>,
    pub complete: Arc<AtomicUsize>,
}

impl CountingHooks {
    pub fn abnormal(&self) -> usize {
        self.abnormal.load(Ordering::SeqCst)
    }

    pub fn complete(&self) -> usize {
        self.complete.load(Ordering::SeqCst)
    }
}

impl LifecycleHooks for CountingHooks {
    fn on_abnormal_stop(&self, _error: &ServeError) {
        self.abnormal.fetch_add(1, Ordering::SeqCst);
    }

    fn on_shutdown_complete(&self, _report: &ShutdownReport) {
        self.complete.fetch_add(1, Ordering::SeqCst);
    }
}

/// A running server bound to an ephemeral loopback port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub stop: Shutdown,
    pub hooks: CountingHooks,
    pub manager: LifecycleManager,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Loopback config with a tiny throttle so tests stay fast.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.server.host = "127.0.0.1".into();
    config.server.port = 0;
    config.throttle.chunk_size = 4;
    config.throttle.interval_ms = 50;
    config
}

/// Deterministic payload of `len` bytes.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

pub async fn start_server(config: AppConfig, store: MemoryStore) -> TestServer {
    let stop = Shutdown::new();
    let hooks = CountingHooks::default();
    let mut manager = LifecycleManager::new(config.server.clone(), stop.subscribe())
        .with_hooks(hooks.clone());
    let app = HttpServer::new(&config, Arc::new(store), manager.drain_signal()).into_router();
    let addr = manager.start(app).await.unwrap();
    TestServer {
        addr,
        stop,
        hooks,
        manager,
    }
}
