//! Refresh coordinator API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use vlibrary_core::{RefreshKind, RefreshStatus};

use super::error::{error_response, library_disabled, ApiError};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RefreshRequestResponse {
    pub kind: RefreshKind,
    pub message: String,
}

/// GET /api/v1/refresh
///
/// Phase of every refresh kind and whether startup initialization finished.
pub async fn get_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RefreshStatus>, ApiError> {
    match state.coordinator() {
        Some(coordinator) => Ok(Json(coordinator.status())),
        None => Err(error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Refresh coordinator is not running",
        )),
    }
}

/// POST /api/v1/refresh/{kind}
///
/// Mark a refresh kind Pending. It starts on a later scheduler tick.
pub async fn request_refresh(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
) -> Result<(StatusCode, Json<RefreshRequestResponse>), ApiError> {
    let library = state.library().ok_or_else(library_disabled)?;
    let kind: RefreshKind = kind
        .parse()
        .map_err(|e: String| error_response(StatusCode::BAD_REQUEST, e))?;

    library.request_refresh(kind);

    Ok((
        StatusCode::ACCEPTED,
        Json(RefreshRequestResponse {
            kind,
            message: format!("Requested {} refresh", kind),
        }),
    ))
}
