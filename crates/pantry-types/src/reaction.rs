use serde::{Deserialize, Serialize};

/// A user's reaction to a comment.
///
/// Stored as two flags (`liked`, `disliked`) to match the persisted row, but
/// modelled as an enum so that "both set" cannot be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionState {
    #[default]
    Neutral,
    Liked,
    Disliked,
}

/// What the caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionAction {
    Like,
    Dislike,
}

impl ReactionAction {
    /// Wire encoding used by clients: `1` likes, `0` dislikes.
    pub fn from_wire(value: i64) -> Option<Self> {
        match value {
            1 => Some(Self::Like),
            0 => Some(Self::Dislike),
            _ => None,
        }
    }
}

impl ReactionState {
    /// Compute the next state.
    ///
    /// LIKE toggles `Liked` off and otherwise overwrites. DISLIKE on an
    /// already-disliked comment lands on `Liked`, not `Neutral`; existing
    /// clients rely on that asymmetry.
    pub fn transition(self, action: ReactionAction) -> Self {
        match (self, action) {
            (Self::Liked, ReactionAction::Like) => Self::Neutral,
            (_, ReactionAction::Like) => Self::Liked,
            (Self::Disliked, ReactionAction::Dislike) => Self::Liked,
            (_, ReactionAction::Dislike) => Self::Disliked,
        }
    }

    /// Rebuild from stored flags. A corrupt row with both flags set reads as
    /// `Neutral` so the next write repairs it.
    pub fn from_flags(liked: bool, disliked: bool) -> Self {
        match (liked, disliked) {
            (true, false) => Self::Liked,
            (false, true) => Self::Disliked,
            _ => Self::Neutral,
        }
    }

    pub fn liked(self) -> bool {
        matches!(self, Self::Liked)
    }

    pub fn disliked(self) -> bool {
        matches!(self, Self::Disliked)
    }
}
