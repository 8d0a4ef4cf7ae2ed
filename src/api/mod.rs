// src/api/mod.rs

pub mod admin;
pub mod auth;
pub mod creators;
pub mod engage;
pub mod health;

use axum::http::{header::AUTHORIZATION, HeaderMap};
use std::sync::Arc;

use crate::config::Config;
use crate::db::Store;
use crate::error::{AppError, Result};
use crate::services::{CreatorRefresher, EngagementService};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub refresher: Arc<CreatorRefresher>,
    pub engagement: Arc<EngagementService>,
    pub config: Config,
}

fn bearer_token(headers: &HeaderMap) -> Result<&str> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::AuthError("Missing Authorization header".to_string()))?;
    let auth_str = auth_header
        .to_str()
        .map_err(|_| AppError::AuthError("Invalid Authorization header".to_string()))?;
    auth_str
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::AuthError("Invalid Authorization scheme".to_string()))
}

/// Wallet address from the bearer JWT.
pub fn require_user(headers: &HeaderMap, state: &AppState) -> Result<String> {
    let token = bearer_token(headers)?;
    auth::extract_user_from_token(token, &state.config.jwt_secret)
}

/// Like `require_user`, but a missing or invalid token yields `None`.
pub fn optional_user(headers: &HeaderMap, state: &AppState) -> Option<String> {
    require_user(headers, state).ok()
}

/// Wallet address of an allow-listed admin.
pub fn require_admin(headers: &HeaderMap, state: &AppState) -> Result<String> {
    let address = require_user(headers, state)?;
    if !state.config.is_admin(&address) {
        tracing::warn!("Rejected admin request from {}", address);
        return Err(AppError::Forbidden("Wallet is not an admin".to_string()));
    }
    Ok(address)
}
