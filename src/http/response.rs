//! Response construction.
//!
//! # Responsibilities
//! - Turn a transfer into a streamed 200 response
//! - Map store errors to status codes before any body is produced
//!
//! # Design Decisions
//! - Streaming responses avoid buffering the resource
//! - Not-found bodies differ per route: the full route names the path, the
//!   throttled route answers `404: File not found`

use axum::body::Body;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::store::StoreError;
use crate::transfer::{Transfer, TransferMode};

pub const THROTTLED_NOT_FOUND_BODY: &str = "404: File not found";
pub const INTERNAL_ERROR_BODY: &str = "Internal server error";

/// 200 with download headers and the streamed body.
pub fn transfer_response(transfer: Transfer) -> Response {
    let Transfer { headers, body } = transfer;
    (StatusCode::OK, headers, Body::from_stream(body)).into_response()
}

/// Error response for a failed lookup.
pub fn store_error_response(error: &StoreError, mode: TransferMode) -> Response {
    match (error, mode) {
        (StoreError::NotFound { .. }, TransferMode::Throttled(_)) => {
            (StatusCode::NOT_FOUND, THROTTLED_NOT_FOUND_BODY).into_response()
        }
        (StoreError::NotFound { path }, TransferMode::Full) => {
            (StatusCode::NOT_FOUND, format!("File not found: {path}")).into_response()
        }
        (StoreError::Stat { .. }, _) => {
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_BODY).into_response()
        }
    }
}
