use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use uuid::Uuid;

use pantry_types::api::{Claims, CreateCommentRequest};
use pantry_types::models::Comment;

use crate::convert;
use crate::error::{ApiError, AppJson};
use crate::state::{AppState, run_db};

const MAX_COMMENT_LEN: usize = 2000;

pub async fn create_comment(
    State(state): State<AppState>,
    Path(recipe_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    AppJson(req): AppJson<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let body = req.body.trim().to_string();
    if body.is_empty() || body.len() > MAX_COMMENT_LEN {
        return Err(ApiError::Validation(format!(
            "comment must be 1-{} characters",
            MAX_COMMENT_LEN
        )));
    }

    let id = Uuid::new_v4();
    let (cid, rid, uid) = (id.to_string(), recipe_id.to_string(), claims.sub.to_string());
    run_db(&state, move |db| db.create_comment(&cid, &rid, &uid, &body)).await?;

    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

/// Comments on a recipe, oldest first.
pub async fn list_comments(
    State(state): State<AppState>,
    Path(recipe_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let rid = recipe_id.to_string();
    let rows = run_db(&state, move |db| db.list_comments(&rid)).await?;

    Ok(Json(rows.into_iter().map(convert::comment).collect::<Vec<Comment>>()))
}

/// Owner-only.
pub async fn delete_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let (cid, uid) = (comment_id.to_string(), claims.sub.to_string());
    run_db(&state, move |db| db.delete_comment(&cid, &uid)).await?;

    Ok(Json(json!({ "message": "Comment deleted successfully." })))
}
