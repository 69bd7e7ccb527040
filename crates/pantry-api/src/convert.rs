//! Row -> API model conversions. Corrupt stored values are logged and
//! replaced with defaults rather than failing the whole listing.

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use pantry_db::models::{CommentRow, NotificationRow, ReactionRow, RecipeRow};
use pantry_types::api::ReactionResponse;
use pantry_types::models::{Comment, Notification, Recipe};
use pantry_types::reaction::ReactionState;

pub(crate) fn uuid(value: &str, what: &str) -> Uuid {
    value.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, value, e);
        Uuid::default()
    })
}

pub(crate) fn timestamp(value: &str) -> DateTime<Utc> {
    value
        .parse::<DateTime<Utc>>()
        .or_else(|_| {
            // Rows written by older builds used SQLite's "YYYY-MM-DD HH:MM:SS".
            chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}': {}", value, e);
            DateTime::default()
        })
}

pub(crate) fn recipe(row: RecipeRow) -> Recipe {
    Recipe {
        id: uuid(&row.id, "recipe id"),
        author_id: uuid(&row.author_id, "author_id"),
        author_username: row.author_username,
        title: row.title,
        description: row.description,
        category: row.category,
        average_rate: row.average_rate,
        created_at: timestamp(&row.created_at),
    }
}

pub(crate) fn comment(row: CommentRow) -> Comment {
    Comment {
        id: uuid(&row.id, "comment id"),
        recipe_id: uuid(&row.recipe_id, "recipe_id"),
        author_id: uuid(&row.author_id, "author_id"),
        author_username: row.author_username,
        body: row.body,
        likes: row.likes,
        dislikes: row.dislikes,
        created_at: timestamp(&row.created_at),
    }
}

pub(crate) fn notification(row: NotificationRow) -> Notification {
    Notification {
        id: uuid(&row.id, "notification id"),
        recipient_id: uuid(&row.user_id, "user_id"),
        source_kind: row.source_kind,
        source_id: uuid(&row.source_id, "source_id"),
        title: row.title,
        message: row.message,
        read: row.read,
        created_at: timestamp(&row.created_at),
    }
}

pub(crate) fn reaction(row: ReactionRow) -> ReactionResponse {
    ReactionResponse {
        comment_id: uuid(&row.comment_id, "comment_id"),
        user_id: uuid(&row.user_id, "user_id"),
        liked: row.liked,
        disliked: row.disliked,
        state: ReactionState::from_flags(row.liked, row.disliked),
    }
}
