use axum::{extract::State, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};

use super::{require_user, AppState};
use crate::{
    error::Result,
    models::{ApiResponse, EngagementAction},
    services::engagement::EngagementReceipt,
};

#[derive(Debug, Deserialize)]
pub struct EngageRequest {
    pub creator_handle: String,
    pub action: EngagementAction,
}

#[derive(Debug, Serialize)]
pub struct PointsResponse {
    pub address: String,
    pub total_points: i64,
}

/// POST /api/v1/engage
pub async fn engage(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<EngageRequest>,
) -> Result<Json<ApiResponse<EngagementReceipt>>> {
    let user_address = require_user(&headers, &state)?;
    let receipt = state
        .engagement
        .record(&user_address, &req.creator_handle, req.action)
        .await?;
    Ok(Json(ApiResponse::success(receipt)))
}

/// GET /api/v1/engage/points
pub async fn get_points(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<PointsResponse>>> {
    let user_address = require_user(&headers, &state)?;
    let total_points = state.engagement.total_points(&user_address).await?;
    Ok(Json(ApiResponse::success(PointsResponse {
        address: user_address,
        total_points,
    })))
}
