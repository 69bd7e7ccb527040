use rusqlite::Connection;
use tracing::info;

use crate::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            email       TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            verified    INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE TABLE IF NOT EXISTS follows (
            id            TEXT PRIMARY KEY,
            follower_id   TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            following_id  TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            UNIQUE(follower_id, following_id)
        );

        CREATE TABLE IF NOT EXISTS recipes (
            id           TEXT PRIMARY KEY,
            author_id    TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            title        TEXT NOT NULL,
            description  TEXT NOT NULL DEFAULT '',
            category     TEXT,
            created_at   TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_recipes_category
            ON recipes(category, created_at);

        CREATE TABLE IF NOT EXISTS ratings (
            id          TEXT PRIMARY KEY,
            recipe_id   TEXT NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
            user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            rate        INTEGER NOT NULL CHECK (rate BETWEEN 1 AND 5),
            created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            UNIQUE(recipe_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS saved_recipes (
            id          TEXT PRIMARY KEY,
            recipe_id   TEXT NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
            user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            UNIQUE(recipe_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS comments (
            id          TEXT PRIMARY KEY,
            recipe_id   TEXT NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
            author_id   TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            body        TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_comments_recipe
            ON comments(recipe_id, created_at);

        CREATE TABLE IF NOT EXISTS comment_reactions (
            id          TEXT PRIMARY KEY,
            comment_id  TEXT NOT NULL REFERENCES comments(id) ON DELETE CASCADE,
            user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            liked       INTEGER NOT NULL DEFAULT 0,
            disliked    INTEGER NOT NULL DEFAULT 0,
            UNIQUE(comment_id, user_id),
            CHECK (NOT (liked AND disliked))
        );

        CREATE TABLE IF NOT EXISTS notifications (
            id           TEXT PRIMARY KEY,
            user_id      TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            source_kind  TEXT NOT NULL,
            source_id    TEXT NOT NULL,
            title        TEXT NOT NULL,
            message      TEXT NOT NULL,
            read         INTEGER NOT NULL DEFAULT 0,
            created_at   TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_notifications_user
            ON notifications(user_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
