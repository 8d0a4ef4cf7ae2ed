use super::{optional_user, require_admin, AppState};
use crate::{
    error::{AppError, Result},
    models::{ApiResponse, CreatorCategory, NewWhitelistEntry, Profile, WhitelistEntry},
    services::{BatchResult, BatchStatus, FetchOutcome, PublicBatchStatus},
    utils::validate_handle,
};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RefreshStatusResponse {
    Full(BatchStatus),
    Public(PublicBatchStatus),
}

#[derive(Debug, Deserialize)]
pub struct AddCreatorRequest {
    pub handle: String,
    pub category: Option<CreatorCategory>,
    pub points: Option<i32>,
    pub onboarded: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct SetOnboardingRequest {
    pub onboarded: bool,
}

#[derive(Debug, Serialize)]
pub struct RemoveCreatorResponse {
    pub handle: String,
    pub removed: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    Cached,
    Fetched,
    RateLimited,
    Unavailable,
}

#[derive(Debug, Serialize)]
pub struct FetchCreatorResponse {
    pub handle: String,
    pub status: FetchStatus,
    pub profile: Option<Profile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,
}

/// POST /api/v1/admin/creators/refresh
pub async fn run_refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<BatchResult>>> {
    let admin = require_admin(&headers, &state)?;
    tracing::info!("Creator refresh triggered by {}", admin);

    let result = state.refresher.run_batch().await;
    Ok(Json(ApiResponse::success(result)))
}

/// GET /api/v1/admin/creators/refresh
pub async fn refresh_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<RefreshStatusResponse>>> {
    let status = state.refresher.status();
    let is_admin = optional_user(&headers, &state)
        .map(|address| state.config.is_admin(&address))
        .unwrap_or(false);

    let response = if is_admin {
        RefreshStatusResponse::Full(status)
    } else {
        RefreshStatusResponse::Public(status.into())
    };
    Ok(Json(ApiResponse::success(response)))
}

/// POST /api/v1/admin/creators
pub async fn add_creator(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AddCreatorRequest>,
) -> Result<(StatusCode, Json<ApiResponse<WhitelistEntry>>)> {
    let admin = require_admin(&headers, &state)?;
    let handle = validate_handle(&req.handle)?;

    let points = req.points.unwrap_or(0);
    if points < 0 {
        return Err(AppError::BadRequest("points cannot be negative".to_string()));
    }

    let entry = state
        .store
        .insert_entry(&NewWhitelistEntry {
            handle,
            category: req.category.unwrap_or_default(),
            points,
            onboarded: req.onboarded.unwrap_or(false),
            added_by: Some(admin.clone()),
        })
        .await?;

    tracing::info!("Creator @{} whitelisted by {}", entry.handle, admin);
    Ok((StatusCode::CREATED, Json(ApiResponse::success(entry))))
}

/// DELETE /api/v1/admin/creators/{handle}
pub async fn remove_creator(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(handle): Path<String>,
) -> Result<Json<ApiResponse<RemoveCreatorResponse>>> {
    let admin = require_admin(&headers, &state)?;
    let handle = validate_handle(&handle)?;

    if !state.store.remove_entry(&handle).await? {
        return Err(AppError::NotFound(format!("@{} is not whitelisted", handle)));
    }

    tracing::info!("Creator @{} removed by {}", handle, admin);
    Ok(Json(ApiResponse::success(RemoveCreatorResponse {
        handle,
        removed: true,
    })))
}

/// PUT /api/v1/admin/creators/{handle}/onboarding
pub async fn set_onboarding(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(handle): Path<String>,
    Json(req): Json<SetOnboardingRequest>,
) -> Result<Json<ApiResponse<WhitelistEntry>>> {
    require_admin(&headers, &state)?;
    let handle = validate_handle(&handle)?;

    let entry = state
        .store
        .set_onboarded(&handle, req.onboarded)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("@{} is not whitelisted", handle)))?;
    Ok(Json(ApiResponse::success(entry)))
}

/// POST /api/v1/admin/creators/{handle}/fetch
pub async fn fetch_creator(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(handle): Path<String>,
) -> Result<Json<ApiResponse<FetchCreatorResponse>>> {
    require_admin(&headers, &state)?;
    let handle = validate_handle(&handle)?;

    let fetcher = state.refresher.fetcher();
    let outcome = fetcher.fetch_and_cache(&handle).await?;
    let (status, retry_after_ms) = match &outcome {
        FetchOutcome::Cached(_) => (FetchStatus::Cached, None),
        FetchOutcome::Fetched(_) => (FetchStatus::Fetched, None),
        FetchOutcome::RateLimited => (
            FetchStatus::RateLimited,
            Some(fetcher.limiter().time_until_next_call().as_millis() as u64),
        ),
        FetchOutcome::Unavailable => (FetchStatus::Unavailable, None),
    };

    Ok(Json(ApiResponse::success(FetchCreatorResponse {
        handle,
        status,
        profile: outcome.into_profile(),
        retry_after_ms,
    })))
}
