use axum::{extract::State, Json};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    constants::AUTH_MESSAGE_MAX_CLOCK_SKEW_SECS,
    crypto::signature::SignatureVerifier,
    error::{AppError, Result},
    models::ApiResponse,
};

use super::AppState;

// ==================== REQUEST/RESPONSE TYPES ====================

#[derive(Debug, Deserialize)]
pub struct ConnectWalletRequest {
    pub address: String,
    pub signature: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ConnectWalletResponse {
    pub token: String,
    pub expires_in: i64,
    pub address: String,
    pub is_admin: bool,
}

#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // wallet address, lowercased
    pub exp: usize,
    pub iat: usize,
    // time of the signed wallet login this session started from
    #[serde(default)]
    pub auth_time: usize,
}

// ==================== HANDLERS ====================

/// POST /api/v1/auth/connect
///
/// The signed message must follow the sign-in-with-Ethereum layout: first line
/// `<domain> wants you to sign in with your Ethereum account:`, a line holding
/// the signing address, and an `Issued At: <RFC 3339>` line.
pub async fn connect_wallet(
    State(state): State<AppState>,
    Json(req): Json<ConnectWalletRequest>,
) -> Result<Json<ApiResponse<ConnectWalletResponse>>> {
    let address = req.address.trim().to_ascii_lowercase();
    check_sign_in_message(&req.message, &address, &state.config, Utc::now())?;

    if !SignatureVerifier::verify_signature(&req.address, &req.message, &req.signature)? {
        return Err(AppError::InvalidSignature);
    }

    tracing::info!("Wallet connected: {}", address);
    let auth_time = Utc::now().timestamp() as usize;
    issue_token(&state, address, auth_time)
}

/// POST /api/v1/auth/refresh
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(req): Json<RefreshTokenRequest>,
) -> Result<Json<ApiResponse<ConnectWalletResponse>>> {
    let claims = decode_claims(&req.refresh_token, &state.config.jwt_secret)?;
    let ends_at = session_end(claims.auth_time, state.config.jwt_max_session_hours);
    if Utc::now().timestamp() >= ends_at {
        return Err(AppError::AuthError(
            "Session expired, sign in again".to_string(),
        ));
    }
    issue_token(&state, claims.sub, claims.auth_time)
}

// ==================== HELPER FUNCTIONS ====================

fn session_end(auth_time: usize, max_session_hours: u64) -> i64 {
    auth_time as i64 + (max_session_hours as i64) * 3600
}

/// Rejects sign-in messages meant for another service, another wallet, or
/// signed outside the accepted window around `now`.
pub fn check_sign_in_message(
    message: &str,
    address: &str,
    config: &Config,
    now: DateTime<Utc>,
) -> Result<()> {
    let rejected = |reason: &str| AppError::AuthError(format!("Invalid sign-in message: {}", reason));

    let mut lines = message.lines().map(str::trim);
    let expected_header = format!(
        "{} wants you to sign in with your Ethereum account:",
        config.auth_domain
    );
    if lines.next() != Some(expected_header.as_str()) {
        return Err(rejected("wrong domain"));
    }

    let mut names_address = false;
    let mut issued_at = None;
    for line in lines {
        if line.eq_ignore_ascii_case(address) {
            names_address = true;
        } else if let Some(raw) = line.strip_prefix("Issued At:") {
            let parsed = DateTime::parse_from_rfc3339(raw.trim())
                .map_err(|_| rejected("bad Issued At"))?;
            issued_at = Some(parsed.with_timezone(&Utc));
        }
    }

    if !names_address {
        return Err(rejected("address mismatch"));
    }
    let issued_at = issued_at.ok_or_else(|| rejected("missing Issued At"))?;

    if issued_at > now + Duration::seconds(AUTH_MESSAGE_MAX_CLOCK_SKEW_SECS) {
        return Err(rejected("issued in the future"));
    }
    if now - issued_at > Duration::seconds(config.auth_message_max_age_secs as i64) {
        return Err(rejected("expired"));
    }
    Ok(())
}

fn issue_token(
    state: &AppState,
    address: String,
    auth_time: usize,
) -> Result<Json<ApiResponse<ConnectWalletResponse>>> {
    let config = &state.config;
    let token = generate_session_token(
        &address,
        &config.jwt_secret,
        config.jwt_expiry_hours,
        auth_time,
        config.jwt_max_session_hours,
    )?;
    let remaining = session_end(auth_time, config.jwt_max_session_hours) - Utc::now().timestamp();
    let expires_in = ((config.jwt_expiry_hours * 3600) as i64).min(remaining.max(0));

    Ok(Json(ApiResponse::success(ConnectWalletResponse {
        token,
        expires_in,
        is_admin: config.is_admin(&address),
        address,
    })))
}

/// Token for a session started now.
pub fn generate_jwt_token(address: &str, secret: &str, expiry_hours: u64) -> Result<String> {
    let now = Utc::now().timestamp() as usize;
    generate_session_token(address, secret, expiry_hours, now, expiry_hours)
}

/// Token expiring after `expiry_hours`, but never past the session cap.
fn generate_session_token(
    address: &str,
    secret: &str,
    expiry_hours: u64,
    auth_time: usize,
    max_session_hours: u64,
) -> Result<String> {
    let now = Utc::now();
    let expiration = now
        .checked_add_signed(Duration::hours(expiry_hours as i64))
        .ok_or_else(|| AppError::Internal("Token expiry overflow".to_string()))?
        .timestamp()
        .min(session_end(auth_time, max_session_hours));

    let claims = Claims {
        sub: address.to_ascii_lowercase(),
        exp: expiration as usize,
        iat: now.timestamp() as usize,
        auth_time,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to generate token: {}", e)))
}

fn decode_claims(token: &str, secret: &str) -> Result<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::AuthError("Invalid or expired token".to_string()))
}

pub fn extract_user_from_token(token: &str, secret: &str) -> Result<String> {
    decode_claims(token, secret).map(|claims| claims.sub)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{body_json, send, test_app, ADMIN};
    use crate::db::memory::MemoryStore;
    use axum::http::StatusCode;
    use ethers::signers::{LocalWallet, Signer};

    const DEV_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn sign_in_message(domain: &str, address: &str, issued_at: DateTime<Utc>) -> String {
        format!(
            "{domain} wants you to sign in with your Ethereum account:\n{address}\n\nSign in to the creator hub.\n\nIssued At: {}",
            issued_at.to_rfc3339()
        )
    }

    async fn signed_connect(message_for: impl Fn(&str) -> String) -> (String, serde_json::Value) {
        let wallet: LocalWallet = DEV_KEY.parse().unwrap();
        let address = format!("{:?}", wallet.address());
        let message = message_for(&address);
        let signature = wallet.sign_message(&message).await.unwrap();
        let body = serde_json::json!({
            "address": address,
            "message": message,
            "signature": signature.to_string(),
        });
        (address, body)
    }

    #[test]
    fn token_round_trips_lowercased_address() {
        let token = generate_jwt_token("0xABCDEF", "secret", 1).unwrap();
        assert_eq!(extract_user_from_token(&token, "secret").unwrap(), "0xabcdef");
        assert!(extract_user_from_token(&token, "other").is_err());
    }

    #[test]
    fn sign_in_message_must_name_domain_address_and_recent_time() {
        let config = Config::for_tests();
        let now = Utc::now();
        let address = "0xabc";

        let good = sign_in_message(&config.auth_domain, address, now - Duration::seconds(30));
        assert!(check_sign_in_message(&good, address, &config, now).is_ok());

        let other_site = sign_in_message("evil.example", address, now);
        assert!(check_sign_in_message(&other_site, address, &config, now).is_err());

        let other_wallet = sign_in_message(&config.auth_domain, "0xdef", now);
        assert!(check_sign_in_message(&other_wallet, address, &config, now).is_err());

        let stale = sign_in_message(
            &config.auth_domain,
            address,
            now - Duration::seconds(config.auth_message_max_age_secs as i64 + 1),
        );
        assert!(check_sign_in_message(&stale, address, &config, now).is_err());

        let future = sign_in_message(&config.auth_domain, address, now + Duration::minutes(10));
        assert!(check_sign_in_message(&future, address, &config, now).is_err());

        let undated = format!(
            "{} wants you to sign in with your Ethereum account:\n{}",
            config.auth_domain, address
        );
        assert!(check_sign_in_message(&undated, address, &config, now).is_err());
    }

    #[tokio::test]
    async fn connect_with_valid_signature_issues_token() {
        let app = test_app(MemoryStore::new());
        let domain = app.config.auth_domain.clone();
        let (address, body) =
            signed_connect(|address| sign_in_message(&domain, address, Utc::now())).await;

        let response = send(&app, "POST", "/api/v1/auth/connect", None, Some(body)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["data"]["address"], address.to_ascii_lowercase());
        assert_eq!(json["data"]["is_admin"], false);
        let token = json["data"]["token"].as_str().unwrap();
        assert_eq!(
            extract_user_from_token(token, &app.config.jwt_secret).unwrap(),
            address.to_ascii_lowercase()
        );
    }

    #[tokio::test]
    async fn signature_made_for_another_site_is_rejected() {
        let app = test_app(MemoryStore::new());
        let (_, body) =
            signed_connect(|address| sign_in_message("other.example", address, Utc::now())).await;

        let response = send(&app, "POST", "/api/v1/auth/connect", None, Some(body)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn replayed_old_signature_is_rejected() {
        let app = test_app(MemoryStore::new());
        let domain = app.config.auth_domain.clone();
        let (_, body) = signed_connect(|address| {
            sign_in_message(&domain, address, Utc::now() - Duration::hours(2))
        })
        .await;

        let response = send(&app, "POST", "/api/v1/auth/connect", None, Some(body)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn refresh_keeps_admin_flag() {
        let app = test_app(MemoryStore::new());
        let token = generate_jwt_token(ADMIN, &app.config.jwt_secret, 1).unwrap();

        let response = send(
            &app,
            "POST",
            "/api/v1/auth/refresh",
            None,
            Some(serde_json::json!({ "refresh_token": token })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["is_admin"], true);
    }

    #[tokio::test]
    async fn refresh_cannot_outlive_session_cap() {
        let app = test_app(MemoryStore::new());
        let config = &app.config;

        // Session started just past the cap, token itself still unexpired.
        let auth_time =
            (Utc::now().timestamp() - session_end(0, config.jwt_max_session_hours) - 60) as usize;
        let stale_session = encode(
            &Header::default(),
            &Claims {
                sub: ADMIN.to_string(),
                exp: (Utc::now().timestamp() + 3600) as usize,
                iat: Utc::now().timestamp() as usize,
                auth_time,
            },
            &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
        )
        .unwrap();

        let response = send(
            &app,
            "POST",
            "/api/v1/auth/refresh",
            None,
            Some(serde_json::json!({ "refresh_token": stale_session })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn refreshed_token_expiry_is_capped_by_session() {
        let now = Utc::now().timestamp();
        // One hour of session left, 24 hour token lifetime requested.
        let auth_time = (now - session_end(0, 2) + 3600) as usize;
        let token = generate_session_token(ADMIN, "secret", 24, auth_time, 2).unwrap();
        let claims = decode_claims(&token, "secret").unwrap();

        assert!(claims.exp as i64 <= now + 3600 + 1);
        assert_eq!(claims.auth_time, auth_time);
    }
}
