use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::reaction::ReactionState;

// -- JWT Claims --

/// JWT claims issued at login/registration and checked by the auth gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
    /// False when the verification email could not be queued. The account
    /// exists either way.
    pub verification_sent: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyCodeQuery {
    pub code: String,
    pub user_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyCodeResponse {
    pub user_id: Uuid,
    pub verified: bool,
}

// -- Recipes --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateRecipeRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: Option<String>,
}

/// Partial recipe update. Absent fields are left alone; an empty
/// `category` clears it.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateRecipeRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecipeOrder {
    #[default]
    Newest,
    Oldest,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecipeQuery {
    pub category: Option<String>,
    #[serde(default)]
    pub order: RecipeOrder,
}

#[derive(Debug, Deserialize)]
pub struct RateRecipeRequest {
    pub rate: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SaveResponse {
    pub message: String,
}

// -- Comments --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCommentRequest {
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct ReactRequest {
    /// `1` to like, `0` to dislike.
    pub liked: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReactionResponse {
    pub comment_id: Uuid,
    pub user_id: Uuid,
    pub liked: bool,
    pub disliked: bool,
    pub state: ReactionState,
}

// -- Follows --

#[derive(Debug, Serialize, Deserialize)]
pub struct FollowResponse {
    pub following_id: Uuid,
    pub following: bool,
}
