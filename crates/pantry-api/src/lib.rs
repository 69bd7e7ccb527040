pub mod auth;
pub mod comments;
mod convert;
pub mod error;
pub mod follows;
pub mod middleware;
pub mod notifications;
pub mod reactions;
pub mod recipes;
pub mod state;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, patch, post},
};

use crate::middleware::require_auth;
use crate::state::AppState;

/// All API routes. Routes under the auth gate see the caller's `Claims` as
/// a request extension.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/verify-code", get(auth::verify_code))
        .route("/recipes", get(recipes::list_recipes))
        .route("/categories", get(recipes::list_categories))
        .route("/recipes/{recipe_id}/comments", get(comments::list_comments));

    let protected_routes = Router::new()
        .route("/recipes", post(recipes::create_recipe))
        .route("/recipes/mine", get(recipes::my_recipes))
        .route("/recipes/saved", get(recipes::saved_recipes))
        .route(
            "/recipes/{recipe_id}",
            patch(recipes::update_recipe)
                .put(recipes::update_recipe)
                .delete(recipes::delete_recipe),
        )
        .route("/recipes/{recipe_id}/save", post(recipes::toggle_save))
        .route("/recipes/{recipe_id}/rate", post(recipes::rate_recipe))
        .route("/recipes/{recipe_id}/comments", post(comments::create_comment))
        .route("/comments/{comment_id}", delete(comments::delete_comment))
        .route("/comments/{comment_id}/reaction", post(reactions::react))
        .route("/users/{user_id}/follow", post(follows::follow).delete(follows::unfollow))
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/{notification_id}", get(notifications::open_notification))
        .route_layer(axum_middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
