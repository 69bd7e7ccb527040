use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use pantry_types::api::Claims;
use pantry_types::models::Notification;

use crate::convert;
use crate::error::ApiError;
use crate::state::{AppState, run_db};

/// The caller's notifications, newest first. Read state is untouched.
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let rows = run_db(&state, move |db| db.list_notifications(&uid)).await?;

    Ok(Json(rows.into_iter().map(convert::notification).collect::<Vec<Notification>>()))
}

/// `GET /notifications/{id}`: opening a notification marks it read. The
/// first call flips `read` to true; later calls return it unchanged.
pub async fn open_notification(
    State(state): State<AppState>,
    Path(notification_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let (nid, uid) = (notification_id.to_string(), claims.sub.to_string());
    let row = run_db(&state, move |db| db.open_notification(&nid, &uid)).await?;

    Ok(Json(convert::notification(row)))
}
