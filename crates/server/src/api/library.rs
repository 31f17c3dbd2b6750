//! Library API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use vlibrary_core::metadata::{Movie, Show};
use vlibrary_core::{
    ItemState, LedgerFilter, Library, LibraryItem, ListId, ListKind, MediaKind, SyncOptions,
    SyncReport,
};

use super::error::{error_response, library_disabled, library_error, ApiError};
use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct AddParams {
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Deserialize)]
pub struct EpisodeParams {
    pub season: u32,
    pub episode: u32,
}

#[derive(Debug, Deserialize)]
pub struct SyncParams {
    #[serde(default)]
    pub force: bool,
    #[serde(default = "default_rescan")]
    pub rescan: bool,
}

fn default_rescan() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
pub struct ItemsQuery {
    #[serde(default)]
    pub kind: Option<MediaKind>,
    #[serde(default)]
    pub state: Option<ItemState>,
    #[serde(default)]
    pub show_id: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ItemsResponse {
    pub items: Vec<LibraryItem>,
    pub total: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct CacheParams {
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClearCacheResponse {
    pub removed: usize,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub message: String,
}

fn library(state: &AppState) -> Result<&Arc<Library>, ApiError> {
    state.library().ok_or_else(library_disabled)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/movies/{id}
///
/// Render a movie into the library.
pub async fn add_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
    Query(params): Query<AddParams>,
) -> Result<Json<Movie>, ApiError> {
    let library = library(&state)?;
    library
        .request_add_movie(id, params.force)
        .await
        .map(Json)
        .map_err(library_error)
}

/// DELETE /api/v1/movies/{id}
pub async fn remove_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let library = library(&state)?;
    library
        .request_remove_movie(id)
        .await
        .map_err(library_error)?;
    Ok(Json(SuccessResponse {
        message: format!("Removed movie {}", id),
    }))
}

/// POST /api/v1/shows/{id}
///
/// Render a show and its eligible episodes into the library.
pub async fn add_show(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
    Query(params): Query<AddParams>,
) -> Result<Json<Show>, ApiError> {
    let library = library(&state)?;
    library
        .request_add_show(id, params.force)
        .await
        .map(Json)
        .map_err(library_error)
}

/// DELETE /api/v1/shows/{id}
pub async fn remove_show(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let library = library(&state)?;
    library
        .request_remove_show(id)
        .await
        .map_err(library_error)?;
    Ok(Json(SuccessResponse {
        message: format!("Removed show {}", id),
    }))
}

/// POST /api/v1/shows/{id}/update
///
/// Queue the show for the next episode refresh.
pub async fn update_show(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
) -> Result<(StatusCode, Json<SuccessResponse>), ApiError> {
    let library = library(&state)?;
    library.request_show_update(id);
    Ok((
        StatusCode::ACCEPTED,
        Json(SuccessResponse {
            message: format!("Queued update of show {}", id),
        }),
    ))
}

/// DELETE /api/v1/shows/{id}/episodes/{episode_id}?season=&episode=
///
/// Queue an episode removal. The removal worker deletes the file and
/// batches bursts into a single confirmation.
pub async fn remove_episode(
    State(state): State<Arc<AppState>>,
    Path((show_id, episode_id)): Path<(u32, u32)>,
    Query(params): Query<EpisodeParams>,
) -> Result<(StatusCode, Json<SuccessResponse>), ApiError> {
    let library = library(&state)?;
    library
        .request_remove_episode(episode_id, show_id, params.season, params.episode)
        .await
        .map_err(library_error)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(SuccessResponse {
            message: format!(
                "Queued removal of S{:02}E{:02} of show {}",
                params.season, params.episode, show_id
            ),
        }),
    ))
}

/// POST /api/v1/sync/{kind}/{list}
///
/// Sync one remote list now and report what happened to each entry.
pub async fn sync_list(
    State(state): State<Arc<AppState>>,
    Path((kind, list)): Path<(String, String)>,
    Query(params): Query<SyncParams>,
) -> Result<Json<SyncReport>, ApiError> {
    let library = library(&state)?;
    let kind: ListKind = kind
        .parse()
        .map_err(|e: String| error_response(StatusCode::BAD_REQUEST, e))?;
    let list = ListId::from(list);
    let options = SyncOptions {
        force: params.force,
        request_rescan: params.rescan,
    };

    library
        .request_sync(kind, &list, options)
        .await
        .map(Json)
        .map_err(library_error)
}

/// GET /api/v1/items
///
/// List ledger records, optionally filtered by kind, state and show.
pub async fn list_items(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ItemsQuery>,
) -> Result<Json<ItemsResponse>, ApiError> {
    let library = library(&state)?;

    let mut filter = LedgerFilter::new();
    if let Some(kind) = query.kind {
        filter = filter.with_kind(kind);
    }
    if let Some(item_state) = query.state {
        filter = filter.with_state(item_state);
    }
    if let Some(show_id) = query.show_id {
        filter = filter.with_show(show_id);
    }

    let items = library.list_items(&filter).map_err(library_error)?;
    let total = items.len();
    Ok(Json(ItemsResponse { items, total }))
}

/// DELETE /api/v1/cache?prefix= or ?key=
pub async fn clear_cache(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CacheParams>,
) -> Result<Json<ClearCacheResponse>, ApiError> {
    let library = library(&state)?;

    let removed = match (params.key, params.prefix) {
        (Some(key), _) => usize::from(library.clear_cache_key(&key).map_err(library_error)?),
        (None, Some(prefix)) if !prefix.is_empty() => {
            library.clear_cache(&prefix).map_err(library_error)?
        }
        _ => {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                "Either a key or a non-empty prefix is required",
            ))
        }
    };

    Ok(Json(ClearCacheResponse { removed }))
}
