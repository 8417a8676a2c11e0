//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, timeout)
//! - Register the throttled route only when enabled
//! - Carry the resource store and drain signal into handlers

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::http::{download, landing, request};
use crate::lifecycle::ShutdownSignal;
use crate::store::ResourceStore;
use crate::transfer::{ProgressObserver, ThrottleSettings};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ResourceStore>,
    /// Pre-rendered landing page.
    pub landing: Arc<str>,
    pub throttle: ThrottleSettings,
    /// End throttled transfers when `drain` fires.
    pub cancel_on_shutdown: bool,
    pub drain: ShutdownSignal,
    pub observer: Option<ProgressObserver>,
}

/// Router factory for the download server.
pub struct HttpServer {
    state: AppState,
    throttle_enabled: bool,
    write_timeout: Duration,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// `drain` should come from the lifecycle manager that will serve the
    /// router.
    pub fn new(config: &AppConfig, store: Arc<dyn ResourceStore>, drain: ShutdownSignal) -> Self {
        let landing = landing::render_index(
            &config.server.host,
            config.server.port,
            &config.content.sample_file,
            config.throttle.enabled,
        );
        let state = AppState {
            store,
            landing: landing.into(),
            throttle: config.throttle.settings(),
            cancel_on_shutdown: config.throttle.cancel_on_shutdown,
            drain,
            observer: None,
        };
        Self {
            state,
            throttle_enabled: config.throttle.enabled,
            write_timeout: config.server.write_timeout(),
        }
    }

    /// Receive a callback for every throttled chunk.
    pub fn with_progress_observer(mut self, observer: ProgressObserver) -> Self {
        self.state.observer = Some(observer);
        self
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn into_router(self) -> Router {
        let mut router = Router::new()
            .route("/", get(landing::index))
            .route("/download/{filename}", get(download::full));
        if self.throttle_enabled {
            router = router.route("/download/limited/{filename}", get(download::limited));
        }

        router.with_state(self.state).layer(
            ServiceBuilder::new()
                .layer(request::set_request_id_layer())
                .layer(TraceLayer::new_for_http().make_span_with(request::make_span))
                .layer(request::propagate_request_id_layer())
                .layer(TimeoutLayer::new(self.write_timeout)),
        )
    }
}
