//! Rows as stored. Ids and timestamps stay as text here; the API layer
//! parses them into `pantry-types` models.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub verified: bool,
    pub created_at: String,
}

pub struct RecipeRow {
    pub id: String,
    pub author_id: String,
    pub author_username: String,
    pub title: String,
    pub description: String,
    pub category: Option<String>,
    pub average_rate: Option<f64>,
    pub created_at: String,
}

pub struct CategoryRow {
    pub name: String,
    pub recipes: u64,
}

pub struct CommentRow {
    pub id: String,
    pub recipe_id: String,
    pub author_id: String,
    pub author_username: String,
    pub body: String,
    pub likes: u64,
    pub dislikes: u64,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionRow {
    pub comment_id: String,
    pub user_id: String,
    pub liked: bool,
    pub disliked: bool,
}

#[derive(Debug, Clone)]
pub struct NotificationRow {
    pub id: String,
    pub user_id: String,
    pub source_kind: String,
    pub source_id: String,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub created_at: String,
}
