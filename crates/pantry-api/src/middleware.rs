use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
    typed_header::TypedHeaderRejection,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::debug;

use pantry_types::api::Claims;

use crate::error::ApiError;
use crate::state::{AppState, run_db};

/// Auth gate: validate the bearer JWT, confirm the user still exists, and
/// attach the [`Claims`] to the request.
pub async fn require_auth(
    State(state): State<AppState>,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) = bearer.map_err(|_| ApiError::AuthenticationRequired)?;

    let claims = decode::<Claims>(
        bearer.token(),
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        debug!("Rejected token: {}", e);
        ApiError::AuthenticationRequired
    })?
    .claims;

    let user_id = claims.sub.to_string();
    let known = run_db(&state, move |db| db.get_user_by_id(&user_id))
        .await?
        .is_some();
    if !known {
        return Err(ApiError::AuthenticationRequired);
    }

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
