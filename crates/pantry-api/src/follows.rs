use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use pantry_types::api::{Claims, FollowResponse};

use crate::error::ApiError;
use crate::state::{AppState, run_db};

/// `POST /users/{user_id}/follow`. A new follow notifies the followed user
/// (201); following again is a no-op (200).
pub async fn follow(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let id = Uuid::new_v4().to_string();
    let (follower, following) = (claims.sub.to_string(), user_id.to_string());
    let created = run_db(&state, move |db| db.create_follow(&id, &follower, &following)).await?;

    let status = if created {
        info!(follower_id = %claims.sub, following_id = %user_id, "Follow created");
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(FollowResponse {
            following_id: user_id,
            following: true,
        }),
    ))
}

pub async fn unfollow(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let (follower, following) = (claims.sub.to_string(), user_id.to_string());
    let removed = run_db(&state, move |db| db.delete_follow(&follower, &following)).await?;
    if !removed {
        return Err(ApiError::NotFound("follow".into()));
    }

    Ok(Json(FollowResponse {
        following_id: user_id,
        following: false,
    }))
}
