//! Download handlers.

use axum::extract::{Path, State};
use axum::response::Response;

use crate::http::response::{store_error_response, transfer_response};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::transfer::{self, TransferMode, TransferOptions, TransferRequest};

/// `GET /download/{filename}`
pub async fn full(State(state): State<AppState>, Path(filename): Path<String>) -> Response {
    let request = TransferRequest::new(filename, TransferMode::Full);
    handle(&state, request, "download").await
}

/// `GET /download/limited/{filename}`
pub async fn limited(State(state): State<AppState>, Path(filename): Path<String>) -> Response {
    let request = TransferRequest::new(filename, TransferMode::Throttled(state.throttle));
    handle(&state, request, "download_limited").await
}

async fn handle(state: &AppState, request: TransferRequest, route: &'static str) -> Response {
    let response = match transfer::resolve(state.store.as_ref(), &request.name).await {
        Ok(resource) => {
            let options = TransferOptions {
                shutdown: state.cancel_on_shutdown.then(|| state.drain.clone()),
                observer: state.observer.clone(),
            };
            transfer_response(transfer::serve(resource, request.mode, options))
        }
        Err(e) => store_error_response(&e, request.mode),
    };
    metrics::record_request(route, response.status().as_u16());
    response
}
