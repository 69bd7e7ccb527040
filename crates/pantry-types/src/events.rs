use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A new account was committed to the store. Consumed by the verification
/// dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountCreated {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
}

/// A follow relationship was created (not updated).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowCreated {
    pub follow_id: Uuid,
    pub follower_username: String,
    pub following_id: Uuid,
}

/// Content of a notification before it is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationDraft {
    pub recipient_id: Uuid,
    pub source_kind: &'static str,
    pub source_id: Uuid,
    pub title: String,
    pub message: String,
}

impl FollowCreated {
    pub const SOURCE_KIND: &'static str = "follow";

    /// The notification owed to the followed user.
    pub fn notification(&self) -> NotificationDraft {
        NotificationDraft {
            recipient_id: self.following_id,
            source_kind: Self::SOURCE_KIND,
            source_id: self.follow_id,
            title: "New Follower".to_string(),
            message: format!("You have been followed by {}", self.follower_username),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follow_notification_goes_to_followed_user() {
        let event = FollowCreated {
            follow_id: Uuid::new_v4(),
            follower_username: "julia".into(),
            following_id: Uuid::new_v4(),
        };

        let draft = event.notification();
        assert_eq!(draft.recipient_id, event.following_id);
        assert_eq!(draft.source_id, event.follow_id);
        assert_eq!(draft.source_kind, "follow");
        assert_eq!(draft.title, "New Follower");
        assert_eq!(draft.message, "You have been followed by julia");
    }
}
