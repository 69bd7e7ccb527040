use pantry_types::events::FollowCreated;
use pantry_types::models::SaveOutcome;
use pantry_types::reaction::{ReactionAction, ReactionState};
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior};
use tracing::debug;
use uuid::Uuid;

use crate::models::{CategoryRow, CommentRow, NotificationRow, ReactionRow, RecipeRow, UserRow};
use crate::{Database, DbError, Result};

impl Database {
    // -- Users --

    /// Insert a user. Duplicate username or email is a `Conflict`.
    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, email, password) VALUES (?1, ?2, ?3, ?4)",
                (id, username, email, password_hash),
            )
            .map_err(|e| {
                if let Some(column) = unique_violation(&e) {
                    return DbError::Conflict(format!("{} is already taken", column));
                }
                DbError::from(e)
            })?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn mark_user_verified(&self, id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("UPDATE users SET verified = 1 WHERE id = ?1", [id])?;
            if changed == 0 {
                return Err(DbError::NotFound("user"));
            }
            Ok(())
        })
    }

    // -- Follows --

    /// Create a follow and, only when the row is new, the follower
    /// notification for the followed user. Both writes share one transaction.
    /// Returns `false` if the follow already existed.
    pub fn create_follow(&self, id: &str, follower_id: &str, following_id: &str) -> Result<bool> {
        if follower_id == following_id {
            return Err(DbError::Invalid("users cannot follow themselves".into()));
        }

        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            if !exists(&tx, "users", following_id)? {
                return Err(DbError::NotFound("user"));
            }
            let follower_username: String = tx
                .query_row("SELECT username FROM users WHERE id = ?1", [follower_id], |row| {
                    row.get(0)
                })
                .optional()?
                .ok_or(DbError::NotFound("user"))?;

            let inserted = tx.execute(
                "INSERT INTO follows (id, follower_id, following_id) VALUES (?1, ?2, ?3)
                 ON CONFLICT(follower_id, following_id) DO NOTHING",
                (id, follower_id, following_id),
            )?;
            if inserted == 0 {
                return Ok(false);
            }

            let event = FollowCreated {
                follow_id: parse_uuid(id)?,
                follower_username,
                following_id: parse_uuid(following_id)?,
            };
            let draft = event.notification();
            let notification_id = Uuid::new_v4().to_string();
            tx.execute(
                "INSERT INTO notifications (id, user_id, source_kind, source_id, title, message)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    notification_id,
                    draft.recipient_id.to_string(),
                    draft.source_kind,
                    draft.source_id.to_string(),
                    draft.title,
                    draft.message,
                ],
            )?;

            tx.commit()?;
            debug!(follower_id, following_id, notification_id = %notification_id, "Follow created");
            Ok(true)
        })
    }

    /// Returns `false` if there was nothing to delete.
    pub fn delete_follow(&self, follower_id: &str, following_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let removed = conn.execute(
                "DELETE FROM follows WHERE follower_id = ?1 AND following_id = ?2",
                (follower_id, following_id),
            )?;
            Ok(removed > 0)
        })
    }

    // -- Recipes --

    pub fn create_recipe(
        &self,
        id: &str,
        author_id: &str,
        title: &str,
        description: &str,
        category: Option<&str>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO recipes (id, author_id, title, description, category)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, author_id, title, description, category],
            )?;
            Ok(())
        })
    }

    pub fn get_recipe(&self, id: &str) -> Result<Option<RecipeRow>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE r.id = ?1", RECIPE_SELECT);
            let row = conn.query_row(&sql, [id], recipe_from_row).optional()?;
            Ok(row)
        })
    }

    /// List recipes, optionally filtered by category and/or author.
    pub fn list_recipes(
        &self,
        category: Option<&str>,
        author_id: Option<&str>,
        newest_first: bool,
    ) -> Result<Vec<RecipeRow>> {
        self.with_conn(|conn| {
            let direction = if newest_first { "DESC" } else { "ASC" };
            let sql = format!(
                "{} WHERE (?1 IS NULL OR r.category = ?1) AND (?2 IS NULL OR r.author_id = ?2)
                 ORDER BY r.created_at {dir}, r.rowid {dir}",
                RECIPE_SELECT,
                dir = direction
            );

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![category, author_id], recipe_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn delete_recipe(&self, id: &str, requester_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            require_owner(&tx, "recipes", "author_id", id, requester_id, "recipe")?;
            tx.execute("DELETE FROM recipes WHERE id = ?1", [id])?;
            tx.commit()?;
            Ok(())
        })
    }

    /// Owner-only partial update. `None` leaves a field as is; for
    /// `category`, `Some(None)` clears it.
    pub fn update_recipe(
        &self,
        id: &str,
        requester_id: &str,
        title: Option<&str>,
        description: Option<&str>,
        category: Option<Option<&str>>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            require_owner(&tx, "recipes", "author_id", id, requester_id, "recipe")?;
            tx.execute(
                "UPDATE recipes SET
                    title = COALESCE(?2, title),
                    description = COALESCE(?3, description),
                    category = CASE WHEN ?4 THEN ?5 ELSE category END
                 WHERE id = ?1",
                rusqlite::params![id, title, description, category.is_some(), category.flatten()],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    /// Categories used by at least one recipe, alphabetically.
    pub fn list_categories(&self) -> Result<Vec<CategoryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT category, COUNT(*) FROM recipes
                 WHERE category IS NOT NULL
                 GROUP BY category
                 ORDER BY category ASC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(CategoryRow {
                        name: row.get(0)?,
                        recipes: row.get::<_, i64>(1)? as u64,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Record a 1..=5 rating. A second rating by the same user replaces the first.
    pub fn rate_recipe(&self, id: &str, recipe_id: &str, user_id: &str, rate: i64) -> Result<()> {
        if !(1..=5).contains(&rate) {
            return Err(DbError::Invalid(format!("rate must be between 1 and 5, got {}", rate)));
        }

        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            if !exists(&tx, "recipes", recipe_id)? {
                return Err(DbError::NotFound("recipe"));
            }
            tx.execute(
                "INSERT INTO ratings (id, recipe_id, user_id, rate) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(recipe_id, user_id) DO UPDATE SET rate = excluded.rate",
                rusqlite::params![id, recipe_id, user_id, rate],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    // -- Saved recipes --

    /// Flip saved-membership of `(user, recipe)`: a new row means saved, an
    /// existing row is removed.
    pub fn toggle_saved_recipe(&self, id: &str, recipe_id: &str, user_id: &str) -> Result<SaveOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            if !exists(&tx, "recipes", recipe_id)? {
                return Err(DbError::NotFound("recipe"));
            }

            let inserted = tx.execute(
                "INSERT INTO saved_recipes (id, recipe_id, user_id) VALUES (?1, ?2, ?3)
                 ON CONFLICT(recipe_id, user_id) DO NOTHING",
                (id, recipe_id, user_id),
            )?;

            let outcome = if inserted == 1 {
                SaveOutcome::Saved
            } else {
                tx.execute(
                    "DELETE FROM saved_recipes WHERE recipe_id = ?1 AND user_id = ?2",
                    (recipe_id, user_id),
                )?;
                SaveOutcome::Unsaved
            };

            tx.commit()?;
            Ok(outcome)
        })
    }

    pub fn list_saved_recipes(&self, user_id: &str) -> Result<Vec<RecipeRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} JOIN saved_recipes s ON s.recipe_id = r.id
                 WHERE s.user_id = ?1
                 ORDER BY s.created_at DESC, s.rowid DESC",
                RECIPE_SELECT
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], recipe_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Comments --

    pub fn create_comment(&self, id: &str, recipe_id: &str, author_id: &str, body: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            if !exists(&tx, "recipes", recipe_id)? {
                return Err(DbError::NotFound("recipe"));
            }
            tx.execute(
                "INSERT INTO comments (id, recipe_id, author_id, body) VALUES (?1, ?2, ?3, ?4)",
                (id, recipe_id, author_id, body),
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    /// Comments on a recipe, oldest first, with reaction tallies.
    pub fn list_comments(&self, recipe_id: &str) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            if !exists(conn, "recipes", recipe_id)? {
                return Err(DbError::NotFound("recipe"));
            }

            let mut stmt = conn.prepare(
                "SELECT c.id, c.recipe_id, c.author_id, u.username, c.body,
                        (SELECT COUNT(*) FROM comment_reactions WHERE comment_id = c.id AND liked = 1),
                        (SELECT COUNT(*) FROM comment_reactions WHERE comment_id = c.id AND disliked = 1),
                        c.created_at
                 FROM comments c
                 JOIN users u ON c.author_id = u.id
                 WHERE c.recipe_id = ?1
                 ORDER BY c.created_at ASC, c.rowid ASC",
            )?;

            let rows = stmt
                .query_map([recipe_id], |row| {
                    Ok(CommentRow {
                        id: row.get(0)?,
                        recipe_id: row.get(1)?,
                        author_id: row.get(2)?,
                        author_username: row.get(3)?,
                        body: row.get(4)?,
                        likes: row.get::<_, i64>(5)? as u64,
                        dislikes: row.get::<_, i64>(6)? as u64,
                        created_at: row.get(7)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn delete_comment(&self, id: &str, requester_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            require_owner(&tx, "comments", "author_id", id, requester_id, "comment")?;
            tx.execute("DELETE FROM comments WHERE id = ?1", [id])?;
            tx.commit()?;
            Ok(())
        })
    }

    // -- Reactions --

    /// Get-or-create the `(user, comment)` reaction, apply `action` and
    /// persist the result. `id` is only used if the row is created.
    pub fn react_to_comment(
        &self,
        id: &str,
        comment_id: &str,
        user_id: &str,
        action: ReactionAction,
    ) -> Result<ReactionRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            if !exists(&tx, "comments", comment_id)? {
                return Err(DbError::NotFound("comment"));
            }

            tx.execute(
                "INSERT INTO comment_reactions (id, comment_id, user_id) VALUES (?1, ?2, ?3)
                 ON CONFLICT(comment_id, user_id) DO NOTHING",
                (id, comment_id, user_id),
            )?;

            let (liked, disliked): (bool, bool) = tx.query_row(
                "SELECT liked, disliked FROM comment_reactions WHERE comment_id = ?1 AND user_id = ?2",
                (comment_id, user_id),
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            let next = ReactionState::from_flags(liked, disliked).transition(action);
            tx.execute(
                "UPDATE comment_reactions SET liked = ?1, disliked = ?2
                 WHERE comment_id = ?3 AND user_id = ?4",
                rusqlite::params![next.liked(), next.disliked(), comment_id, user_id],
            )?;
            tx.commit()?;

            Ok(ReactionRow {
                comment_id: comment_id.to_string(),
                user_id: user_id.to_string(),
                liked: next.liked(),
                disliked: next.disliked(),
            })
        })
    }

    pub fn count_reactions(&self, comment_id: &str) -> Result<u64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM comment_reactions WHERE comment_id = ?1",
                [comment_id],
                |row| row.get(0),
            )?;
            Ok(n as u64)
        })
    }

    // -- Notifications --

    /// The user's notifications, newest first. Does not touch `read`.
    pub fn list_notifications(&self, user_id: &str) -> Result<Vec<NotificationRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC",
                NOTIFICATION_SELECT
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], notification_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Fetch one of the owner's notifications and mark it read.
    ///
    /// This read writes: `read` goes false -> true on the first call and is
    /// left alone afterwards. Notifications owned by someone else are
    /// reported as `NotFound`.
    pub fn open_notification(&self, id: &str, owner_id: &str) -> Result<NotificationRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let sql = format!("{} WHERE id = ?1 AND user_id = ?2", NOTIFICATION_SELECT);
            let mut row = tx
                .query_row(&sql, (id, owner_id), notification_from_row)
                .optional()?
                .ok_or(DbError::NotFound("notification"))?;

            if !row.read {
                tx.execute("UPDATE notifications SET read = 1 WHERE id = ?1", [id])?;
                row.read = true;
                debug!(notification_id = id, "Notification marked read");
            }

            tx.commit()?;
            Ok(row)
        })
    }
}

const RECIPE_SELECT: &str = "SELECT r.id, r.author_id, u.username, r.title, r.description, r.category,
        (SELECT AVG(rate) FROM ratings WHERE recipe_id = r.id),
        r.created_at
 FROM recipes r
 JOIN users u ON r.author_id = u.id";

const NOTIFICATION_SELECT: &str =
    "SELECT id, user_id, source_kind, source_id, title, message, read, created_at FROM notifications";

fn recipe_from_row(row: &Row<'_>) -> rusqlite::Result<RecipeRow> {
    Ok(RecipeRow {
        id: row.get(0)?,
        author_id: row.get(1)?,
        author_username: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        category: row.get(5)?,
        average_rate: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn notification_from_row(row: &Row<'_>) -> rusqlite::Result<NotificationRow> {
    Ok(NotificationRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        source_kind: row.get(2)?,
        source_id: row.get(3)?,
        title: row.get(4)?,
        message: row.get(5)?,
        read: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!(
        "SELECT id, username, email, password, verified, created_at FROM users WHERE {} = ?1",
        column
    );
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                verified: row.get(4)?,
                created_at: row.get(5)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn exists(conn: &Connection, table: &str, id: &str) -> Result<bool> {
    let sql = format!("SELECT 1 FROM {} WHERE id = ?1", table);
    let found = conn
        .query_row(&sql, [id], |_| Ok(()))
        .optional()?
        .is_some();
    Ok(found)
}

fn require_owner(
    conn: &Connection,
    table: &str,
    owner_column: &str,
    id: &str,
    requester_id: &str,
    what: &'static str,
) -> Result<()> {
    let sql = format!("SELECT {} FROM {} WHERE id = ?1", owner_column, table);
    let owner: String = conn
        .query_row(&sql, [id], |row| row.get(0))
        .optional()?
        .ok_or(DbError::NotFound(what))?;

    if owner != requester_id {
        return Err(DbError::Forbidden(what));
    }
    Ok(())
}

fn parse_uuid(value: &str) -> Result<Uuid> {
    value
        .parse()
        .map_err(|_| DbError::Invalid(format!("not a uuid: {}", value)))
}

/// Column named by a UNIQUE constraint failure, e.g. `users.email` -> `email`.
fn unique_violation(err: &rusqlite::Error) -> Option<&str> {
    match err {
        rusqlite::Error::SqliteFailure(e, Some(msg))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            let column = msg.strip_prefix("UNIQUE constraint failed: ")?;
            Some(column.rsplit('.').next().unwrap_or(column))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn new_id() -> String {
        Uuid::new_v4().to_string()
    }

    fn user(db: &Database, name: &str) -> String {
        let id = new_id();
        db.create_user(&id, name, &format!("{}@example.com", name), "hash")
            .unwrap();
        id
    }

    fn recipe(db: &Database, author: &str) -> String {
        let id = new_id();
        db.create_recipe(&id, author, "Soup", "Boil water", Some("dinner"))
            .unwrap();
        id
    }

    fn comment(db: &Database, recipe: &str, author: &str) -> String {
        let id = new_id();
        db.create_comment(&id, recipe, author, "Tasty").unwrap();
        id
    }

    #[test]
    fn duplicate_email_is_conflict() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&new_id(), "ana", "ana@example.com", "h").unwrap();

        let err = db
            .create_user(&new_id(), "ana2", "ana@example.com", "h")
            .unwrap_err();
        match err {
            DbError::Conflict(msg) => assert_eq!(msg, "email is already taken"),
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[test]
    fn mark_verified() {
        let db = Database::open_in_memory().unwrap();
        let ana = user(&db, "ana");
        assert!(!db.get_user_by_id(&ana).unwrap().unwrap().verified);

        db.mark_user_verified(&ana).unwrap();
        assert!(db.get_user_by_id(&ana).unwrap().unwrap().verified);
        assert!(matches!(
            db.mark_user_verified(&new_id()),
            Err(DbError::NotFound("user"))
        ));
    }

    #[test]
    fn reaction_like_twice_returns_to_neutral() {
        let db = Database::open_in_memory().unwrap();
        let ana = user(&db, "ana");
        let r = recipe(&db, &ana);
        let c = comment(&db, &r, &ana);

        let first = db.react_to_comment(&new_id(), &c, &ana, ReactionAction::Like).unwrap();
        assert!(first.liked && !first.disliked);

        let second = db.react_to_comment(&new_id(), &c, &ana, ReactionAction::Like).unwrap();
        assert!(!second.liked && !second.disliked);
        assert_eq!(db.count_reactions(&c).unwrap(), 1);
    }

    #[test]
    fn reaction_dislike_twice_lands_on_liked() {
        let db = Database::open_in_memory().unwrap();
        let ana = user(&db, "ana");
        let r = recipe(&db, &ana);
        let c = comment(&db, &r, &ana);

        let first = db.react_to_comment(&new_id(), &c, &ana, ReactionAction::Dislike).unwrap();
        assert!(first.disliked && !first.liked);

        let second = db.react_to_comment(&new_id(), &c, &ana, ReactionAction::Dislike).unwrap();
        assert!(second.liked && !second.disliked);
    }

    #[test]
    fn reaction_on_missing_comment() {
        let db = Database::open_in_memory().unwrap();
        let ana = user(&db, "ana");
        let err = db
            .react_to_comment(&new_id(), &new_id(), &ana, ReactionAction::Like)
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound("comment")));
    }

    #[test]
    fn concurrent_reactions_leave_one_row() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let ana = user(&db, "ana");
        let r = recipe(&db, &ana);
        let c = comment(&db, &r, &ana);

        std::thread::scope(|s| {
            for i in 0..100 {
                let db = &db;
                let (c, ana) = (&c, &ana);
                s.spawn(move || {
                    let action = if i % 3 == 0 {
                        ReactionAction::Dislike
                    } else {
                        ReactionAction::Like
                    };
                    let row = db.react_to_comment(&new_id(), c, ana, action).unwrap();
                    assert!(!(row.liked && row.disliked));
                });
            }
        });

        assert_eq!(db.count_reactions(&c).unwrap(), 1);
    }

    #[test]
    fn save_toggles() {
        let db = Database::open_in_memory().unwrap();
        let ana = user(&db, "ana");
        let r = recipe(&db, &ana);

        assert_eq!(db.toggle_saved_recipe(&new_id(), &r, &ana).unwrap(), SaveOutcome::Saved);
        assert_eq!(db.list_saved_recipes(&ana).unwrap().len(), 1);
        assert_eq!(db.toggle_saved_recipe(&new_id(), &r, &ana).unwrap(), SaveOutcome::Unsaved);
        assert!(db.list_saved_recipes(&ana).unwrap().is_empty());
        assert_eq!(db.toggle_saved_recipe(&new_id(), &r, &ana).unwrap(), SaveOutcome::Saved);
    }

    #[test]
    fn save_missing_recipe() {
        let db = Database::open_in_memory().unwrap();
        let ana = user(&db, "ana");
        assert!(matches!(
            db.toggle_saved_recipe(&new_id(), &new_id(), &ana),
            Err(DbError::NotFound("recipe"))
        ));
    }

    #[test]
    fn follow_emits_one_notification_per_creation() {
        let db = Database::open_in_memory().unwrap();
        let ana = user(&db, "ana");
        let bob = user(&db, "bob");

        assert!(db.create_follow(&new_id(), &ana, &bob).unwrap());
        assert!(!db.create_follow(&new_id(), &ana, &bob).unwrap());

        let notes = db.list_notifications(&bob).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "New Follower");
        assert_eq!(notes[0].message, "You have been followed by ana");
        assert_eq!(notes[0].source_kind, "follow");
        assert!(!notes[0].read);
        assert!(db.list_notifications(&ana).unwrap().is_empty());

        assert!(db.delete_follow(&ana, &bob).unwrap());
        assert!(db.create_follow(&new_id(), &ana, &bob).unwrap());
        assert_eq!(db.list_notifications(&bob).unwrap().len(), 2);
    }

    #[test]
    fn follow_self_or_missing() {
        let db = Database::open_in_memory().unwrap();
        let ana = user(&db, "ana");
        assert!(matches!(db.create_follow(&new_id(), &ana, &ana), Err(DbError::Invalid(_))));
        assert!(matches!(
            db.create_follow(&new_id(), &ana, &new_id()),
            Err(DbError::NotFound("user"))
        ));
    }

    #[test]
    fn opening_notification_marks_read_once() {
        let db = Database::open_in_memory().unwrap();
        let ana = user(&db, "ana");
        let bob = user(&db, "bob");
        db.create_follow(&new_id(), &ana, &bob).unwrap();
        let id = db.list_notifications(&bob).unwrap()[0].id.clone();

        let first = db.open_notification(&id, &bob).unwrap();
        assert!(first.read);
        let second = db.open_notification(&id, &bob).unwrap();
        assert!(second.read);
        assert!(db.list_notifications(&bob).unwrap()[0].read);
    }

    #[test]
    fn notification_hidden_from_other_users() {
        let db = Database::open_in_memory().unwrap();
        let ana = user(&db, "ana");
        let bob = user(&db, "bob");
        db.create_follow(&new_id(), &ana, &bob).unwrap();
        let id = db.list_notifications(&bob).unwrap()[0].id.clone();

        assert!(matches!(
            db.open_notification(&id, &ana),
            Err(DbError::NotFound("notification"))
        ));
        assert!(!db.list_notifications(&bob).unwrap()[0].read);
    }

    #[test]
    fn only_owner_deletes_comment() {
        let db = Database::open_in_memory().unwrap();
        let ana = user(&db, "ana");
        let bob = user(&db, "bob");
        let r = recipe(&db, &ana);
        let c = comment(&db, &r, &ana);

        assert!(matches!(db.delete_comment(&c, &bob), Err(DbError::Forbidden("comment"))));
        db.delete_comment(&c, &ana).unwrap();
        assert!(db.list_comments(&r).unwrap().is_empty());
        assert!(matches!(db.delete_comment(&c, &ana), Err(DbError::NotFound("comment"))));
    }

    #[test]
    fn only_owner_deletes_recipe() {
        let db = Database::open_in_memory().unwrap();
        let ana = user(&db, "ana");
        let bob = user(&db, "bob");
        let r = recipe(&db, &ana);

        assert!(matches!(db.delete_recipe(&r, &bob), Err(DbError::Forbidden("recipe"))));
        db.delete_recipe(&r, &ana).unwrap();
        assert!(db.get_recipe(&r).unwrap().is_none());
    }

    #[test]
    fn comment_tallies_reactions() {
        let db = Database::open_in_memory().unwrap();
        let ana = user(&db, "ana");
        let bob = user(&db, "bob");
        let r = recipe(&db, &ana);
        let c = comment(&db, &r, &ana);

        db.react_to_comment(&new_id(), &c, &ana, ReactionAction::Like).unwrap();
        db.react_to_comment(&new_id(), &c, &bob, ReactionAction::Dislike).unwrap();

        let rows = db.list_comments(&r).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!((rows[0].likes, rows[0].dislikes), (1, 1));
    }

    #[test]
    fn rating_is_validated_and_averaged() {
        let db = Database::open_in_memory().unwrap();
        let ana = user(&db, "ana");
        let bob = user(&db, "bob");
        let r = recipe(&db, &ana);

        assert!(matches!(db.rate_recipe(&new_id(), &r, &ana, 6), Err(DbError::Invalid(_))));
        db.rate_recipe(&new_id(), &r, &ana, 4).unwrap();
        db.rate_recipe(&new_id(), &r, &bob, 1).unwrap();
        db.rate_recipe(&new_id(), &r, &bob, 2).unwrap();

        let row = db.get_recipe(&r).unwrap().unwrap();
        assert_eq!(row.average_rate, Some(3.0));
    }

    #[test]
    fn owner_updates_recipe_fields() {
        let db = Database::open_in_memory().unwrap();
        let ana = user(&db, "ana");
        let bob = user(&db, "bob");
        let r = recipe(&db, &ana);

        assert!(matches!(
            db.update_recipe(&r, &bob, Some("Stolen"), None, None),
            Err(DbError::Forbidden("recipe"))
        ));
        assert!(matches!(
            db.update_recipe(&new_id(), &ana, Some("Ghost"), None, None),
            Err(DbError::NotFound("recipe"))
        ));

        db.update_recipe(&r, &ana, Some("Stew"), None, None).unwrap();
        let row = db.get_recipe(&r).unwrap().unwrap();
        assert_eq!(row.title, "Stew");
        assert_eq!(row.description, "Boil water");
        assert_eq!(row.category.as_deref(), Some("dinner"));

        db.update_recipe(&r, &ana, None, Some("Simmer"), Some(None)).unwrap();
        let row = db.get_recipe(&r).unwrap().unwrap();
        assert_eq!(row.title, "Stew");
        assert_eq!(row.description, "Simmer");
        assert!(row.category.is_none());
    }

    #[test]
    fn categories_are_distinct_and_counted() {
        let db = Database::open_in_memory().unwrap();
        let ana = user(&db, "ana");
        recipe(&db, &ana);
        recipe(&db, &ana);
        db.create_recipe(&new_id(), &ana, "Cake", "", Some("dessert")).unwrap();
        db.create_recipe(&new_id(), &ana, "Toast", "", None).unwrap();

        let cats = db.list_categories().unwrap();
        let cats: Vec<_> = cats.iter().map(|c| (c.name.as_str(), c.recipes)).collect();
        assert_eq!(cats, vec![("dessert", 1), ("dinner", 2)]);
    }

    #[test]
    fn list_recipes_filters() {
        let db = Database::open_in_memory().unwrap();
        let ana = user(&db, "ana");
        let bob = user(&db, "bob");
        let soup = recipe(&db, &ana);
        let cake = new_id();
        db.create_recipe(&cake, &bob, "Cake", "", Some("dessert")).unwrap();

        let all = db.list_recipes(None, None, true).unwrap();
        assert_eq!(all.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec![cake.as_str(), soup.as_str()]);

        let desserts = db.list_recipes(Some("dessert"), None, true).unwrap();
        assert_eq!(desserts.len(), 1);
        assert_eq!(desserts[0].title, "Cake");

        let mine = db.list_recipes(None, Some(&ana), false).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].author_username, "ana");
    }
}
