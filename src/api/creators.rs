use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use std::collections::HashMap;

use super::AppState;
use crate::{
    constants::CREATORS_PAGE_DEFAULT_LIMIT,
    error::{AppError, Result},
    models::{ApiResponse, CachedProfile, CreatorListing, PaginatedResponse},
    utils::{ensure_page_limit, validate_handle},
};

#[derive(Debug, Deserialize)]
pub struct CreatorsQuery {
    pub page: Option<i32>,
    pub limit: Option<i32>,
}

/// GET /api/v1/creators
pub async fn list_creators(
    State(state): State<AppState>,
    Query(query): Query<CreatorsQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<CreatorListing>>>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(CREATORS_PAGE_DEFAULT_LIMIT);
    ensure_page_limit(limit)?;
    let offset = (page as i64 - 1) * limit as i64;

    let total = state.store.count_entries().await?;
    let entries = state.store.list_entries(offset, limit as i64).await?;

    let handles: Vec<String> = entries.iter().map(|e| e.handle.clone()).collect();
    let mut profiles: HashMap<String, CachedProfile> = state
        .store
        .get_profiles(&handles)
        .await?
        .into_iter()
        .map(|p| (p.handle.clone(), p))
        .collect();

    let items = entries
        .into_iter()
        .map(|entry| CreatorListing {
            profile: profiles.remove(&entry.handle),
            entry,
        })
        .collect();

    Ok(Json(ApiResponse::success(PaginatedResponse {
        items,
        page,
        limit,
        total,
    })))
}

/// GET /api/v1/creators/{handle}
pub async fn get_creator_profile(
    State(state): State<AppState>,
    Path(handle): Path<String>,
) -> Result<Json<ApiResponse<CachedProfile>>> {
    let handle = validate_handle(&handle)?;
    let profile = state
        .store
        .get_profile(&handle)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No cached profile for @{}", handle)))?;
    Ok(Json(ApiResponse::success(profile)))
}
