use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use rand_core::OsRng;
use tracing::{error, info};
use uuid::Uuid;

use pantry_types::api::{
    Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, VerifyCodeQuery,
    VerifyCodeResponse,
};
use pantry_types::events::AccountCreated;

use crate::error::{ApiError, AppJson};
use crate::state::{AppState, run_db};

/// Create an account, then hand it to the verification dispatcher.
///
/// The account is committed before dispatch; a dispatch failure is logged
/// and reported as `verification_sent: false`, never as a failed request.
pub async fn register(
    State(state): State<AppState>,
    AppJson(req): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.trim().to_string();
    let email = req.email.trim().to_lowercase();

    // Validate input
    let username_len = username.chars().count();
    if !(3..=32).contains(&username_len) {
        return Err(ApiError::Validation("username must be 3-32 characters".into()));
    }
    if !looks_like_email(&email) {
        return Err(ApiError::Validation("email is not valid".into()));
    }
    if req.password.len() < 8 {
        return Err(ApiError::Validation("password must be at least 8 characters".into()));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .to_string();

    let user_id = Uuid::new_v4();

    {
        let (id, username, email) = (user_id.to_string(), username.clone(), email.clone());
        run_db(&state, move |db| db.create_user(&id, &username, &email, &password_hash)).await?;
    }
    info!(%user_id, username = %username, "Account created");

    let account = AccountCreated {
        user_id,
        username: username.clone(),
        email,
    };
    let verification_sent = match state.verifier.dispatch(&account).await {
        Ok(()) => true,
        Err(e) => {
            error!(%user_id, "Verification dispatch failed: {}", e);
            false
        }
    };

    let token = create_token(&state.jwt_secret, user_id, &username)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id,
            token,
            verification_sent,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.trim().to_string();
    let user = run_db(&state, move |db| db.get_user_by_username(&username))
        .await?
        .ok_or(ApiError::AuthenticationRequired)?;

    // Verify password
    let parsed_hash =
        PasswordHash::new(&user.password).map_err(|e| ApiError::Internal(e.to_string()))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::AuthenticationRequired)?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e: uuid::Error| ApiError::Internal(e.to_string()))?;

    let token = create_token(&state.jwt_secret, user_id, &user.username)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(LoginResponse {
        user_id,
        username: user.username,
        token,
    }))
}

/// `GET /auth/verify-code?code=..&user_id=..`: consume the emailed code.
pub async fn verify_code(
    State(state): State<AppState>,
    Query(query): Query<VerifyCodeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.verifier.verify(query.user_id, &query.code).await? {
        return Err(ApiError::InvalidOrExpiredCode);
    }

    let id = query.user_id.to_string();
    if let Err(e) = run_db(&state, move |db| db.mark_user_verified(&id)).await {
        // The code is spent but the user is not verified; hand it back
        if let Err(restore_err) = state.verifier.restore(query.user_id, &query.code).await {
            error!(user_id = %query.user_id, "Failed to restore verification code: {}", restore_err);
        }
        return Err(e);
    }
    info!(user_id = %query.user_id, "Email verified");

    Ok(Json(VerifyCodeResponse {
        user_id: query.user_id,
        verified: true,
    }))
}

pub(crate) fn create_token(secret: &str, user_id: Uuid, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape() {
        assert!(looks_like_email("cook@example.com"));
        assert!(!looks_like_email("cook@example"));
        assert!(!looks_like_email("@example.com"));
        assert!(!looks_like_email("cook.example.com"));
        assert!(!looks_like_email("cook@example."));
    }
}
