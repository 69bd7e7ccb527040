use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use pantry_types::api::{Claims, ReactRequest};
use pantry_types::reaction::ReactionAction;

use crate::convert;
use crate::error::{ApiError, AppJson};
use crate::state::{AppState, run_db};

/// `POST /comments/{comment_id}/reaction` with `{"liked": 1}` (like) or
/// `{"liked": 0}` (dislike). Returns the persisted reaction.
pub async fn react(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    AppJson(req): AppJson<ReactRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let value = req
        .liked
        .ok_or_else(|| ApiError::Validation("liked is required".into()))?;
    let action = ReactionAction::from_wire(value)
        .ok_or_else(|| ApiError::Validation("liked must be 0 or 1".into()))?;

    let reaction_id = Uuid::new_v4().to_string();
    let cid = comment_id.to_string();
    let uid = claims.sub.to_string();
    let row = run_db(&state, move |db| db.react_to_comment(&reaction_id, &cid, &uid, action)).await?;

    Ok(Json(convert::reaction(row)))
}
