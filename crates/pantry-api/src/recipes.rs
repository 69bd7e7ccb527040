use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use pantry_types::api::{
    Claims, CreateRecipeRequest, RateRecipeRequest, RecipeOrder, RecipeQuery, SaveResponse,
    UpdateRecipeRequest,
};
use pantry_types::models::{Category, Recipe, SaveOutcome};

use crate::convert;
use crate::error::{ApiError, AppJson};
use crate::state::{AppState, run_db};

const MAX_TITLE_LEN: usize = 200;

pub async fn create_recipe(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppJson(req): AppJson<CreateRecipeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let title = validate_title(&req.title)?;
    let category = req.category.as_deref().and_then(normalize_category);

    let id = Uuid::new_v4().to_string();
    let author = claims.sub.to_string();
    let row = run_db(&state, move |db| {
        db.create_recipe(&id, &author, &title, &req.description, category.as_deref())?;
        db.get_recipe(&id)
    })
    .await?
    .ok_or_else(|| ApiError::Internal("recipe vanished after insert".into()))?;

    info!(recipe_id = %row.id, author_id = %claims.sub, "Recipe created");
    Ok((StatusCode::CREATED, Json(convert::recipe(row))))
}

/// Public listing, filterable by category.
pub async fn list_recipes(
    State(state): State<AppState>,
    Query(query): Query<RecipeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let category = query.category.as_deref().and_then(normalize_category);
    let newest_first = query.order == RecipeOrder::Newest;
    let rows = run_db(&state, move |db| db.list_recipes(category.as_deref(), None, newest_first)).await?;

    Ok(Json(rows.into_iter().map(convert::recipe).collect::<Vec<Recipe>>()))
}

pub async fn my_recipes(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let author = claims.sub.to_string();
    let rows = run_db(&state, move |db| db.list_recipes(None, Some(&author), true)).await?;

    Ok(Json(rows.into_iter().map(convert::recipe).collect::<Vec<Recipe>>()))
}

pub async fn saved_recipes(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user = claims.sub.to_string();
    let rows = run_db(&state, move |db| db.list_saved_recipes(&user)).await?;

    Ok(Json(rows.into_iter().map(convert::recipe).collect::<Vec<Recipe>>()))
}

/// `PATCH`/`PUT /recipes/{recipe_id}`: owner-only partial update.
pub async fn update_recipe(
    State(state): State<AppState>,
    Path(recipe_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    AppJson(req): AppJson<UpdateRecipeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let title = req.title.as_deref().map(validate_title).transpose()?;
    let category = req.category.as_deref().map(normalize_category);

    let (rid, uid) = (recipe_id.to_string(), claims.sub.to_string());
    let row = run_db(&state, move |db| {
        db.update_recipe(
            &rid,
            &uid,
            title.as_deref(),
            req.description.as_deref(),
            category.as_ref().map(|c| c.as_deref()),
        )?;
        db.get_recipe(&rid)
    })
    .await?
    .ok_or_else(|| ApiError::NotFound("recipe".into()))?;

    info!(%recipe_id, "Recipe updated");
    Ok(Json(convert::recipe(row)))
}

/// Categories in use, with how many recipes each has.
pub async fn list_categories(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rows = run_db(&state, |db| db.list_categories()).await?;

    Ok(Json(
        rows.into_iter()
            .map(|row| Category {
                name: row.name,
                recipes: row.recipes,
            })
            .collect::<Vec<Category>>(),
    ))
}

/// Owner-only.
pub async fn delete_recipe(
    State(state): State<AppState>,
    Path(recipe_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let (rid, uid) = (recipe_id.to_string(), claims.sub.to_string());
    run_db(&state, move |db| db.delete_recipe(&rid, &uid)).await?;

    info!(%recipe_id, "Recipe deleted");
    Ok(Json(json!({ "message": "Recipe deleted successfully." })))
}

/// `POST /recipes/{recipe_id}/save`: first call saves (201), the next
/// unsaves (200).
pub async fn toggle_save(
    State(state): State<AppState>,
    Path(recipe_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let id = Uuid::new_v4().to_string();
    let (rid, uid) = (recipe_id.to_string(), claims.sub.to_string());
    let outcome = run_db(&state, move |db| db.toggle_saved_recipe(&id, &rid, &uid)).await?;

    let (status, message) = match outcome {
        SaveOutcome::Saved => (StatusCode::CREATED, "Saved"),
        SaveOutcome::Unsaved => (StatusCode::OK, "Unsaved"),
    };
    Ok((
        status,
        Json(SaveResponse {
            message: message.to_string(),
        }),
    ))
}

pub async fn rate_recipe(
    State(state): State<AppState>,
    Path(recipe_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    AppJson(req): AppJson<RateRecipeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let rate = req
        .rate
        .ok_or_else(|| ApiError::Validation("rate is required".into()))?;

    let id = Uuid::new_v4().to_string();
    let (rid, uid) = (recipe_id.to_string(), claims.sub.to_string());
    run_db(&state, move |db| db.rate_recipe(&id, &rid, &uid, rate)).await?;

    Ok(Json(json!({ "success": "Rated Recipe successfully." })))
}

fn validate_title(title: &str) -> Result<String, ApiError> {
    let title = title.trim();
    let len = title.chars().count();
    if len == 0 || len > MAX_TITLE_LEN {
        return Err(ApiError::Validation(format!(
            "title must be 1-{} characters",
            MAX_TITLE_LEN
        )));
    }
    Ok(title.to_string())
}

/// Categories are stored lowercase; blank means none.
fn normalize_category(raw: &str) -> Option<String> {
    let category = raw.trim().to_lowercase();
    (!category.is_empty()).then_some(category)
}
