use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use uuid::Uuid;

pub const MIN_SCORE: i16 = 1;
pub const MAX_SCORE: i16 = 5;

/// Who performed an interaction. Weak reference: the actor is never owned.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Actor {
    User(Uuid),
    Address(IpAddr),
}

impl Actor {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Actor::User(id) => Some(*id),
            Actor::Address(_) => None,
        }
    }

    pub fn address(&self) -> Option<IpAddr> {
        match self {
            Actor::User(_) => None,
            Actor::Address(ip) => Some(*ip),
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::User(id) => write!(f, "user:{id}"),
            Actor::Address(ip) => write!(f, "ip:{ip}"),
        }
    }
}

/// Discriminator stored next to every interaction row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Vote,
    Click,
    Review,
}

impl InteractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionKind::Vote => "vote",
            InteractionKind::Click => "click",
            InteractionKind::Review => "review",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "vote" => Some(InteractionKind::Vote),
            "click" => Some(InteractionKind::Click),
            "review" => Some(InteractionKind::Review),
            _ => None,
        }
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InteractionError {
    #[error("duplicate {kind} for listing {listing_id} by {actor}")]
    Duplicate {
        kind: InteractionKind,
        listing_id: i64,
        actor: Actor,
    },

    #[error("review score must be between 1 and 5, got {0}")]
    InvalidScore(i64),

    #[error("review message must not be empty")]
    EmptyMessage,
}

/// Review payload: free text plus a 1..=5 score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewBody {
    pub message: String,
    pub score: i16,
}

impl ReviewBody {
    pub fn new(message: impl Into<String>, score: i64) -> Result<Self, InteractionError> {
        let message = message.into();
        if message.trim().is_empty() {
            return Err(InteractionError::EmptyMessage);
        }
        if !(MIN_SCORE as i64..=MAX_SCORE as i64).contains(&score) {
            return Err(InteractionError::InvalidScore(score));
        }
        Ok(Self { message, score: score as i16 })
    }

    /// Applies an edit, validating the resulting body as a whole.
    pub fn patched(&self, patch: &ReviewPatch) -> Result<Self, InteractionError> {
        let message = patch.message.clone().unwrap_or_else(|| self.message.clone());
        let score = patch.score.unwrap_or(self.score as i64);
        Self::new(message, score)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewPatch {
    pub message: Option<String>,
    pub score: Option<i64>,
}

/// Variant-specific fields. Votes and clicks carry none.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InteractionDetail {
    Vote,
    Click,
    Review(ReviewBody),
}

/// A recorded action on exactly one listing. Immutable apart from a review's body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Interaction {
    pub id: Uuid,
    pub listing_id: i64,
    pub actor: Actor,
    #[serde(flatten)]
    pub detail: InteractionDetail,
    pub created_at: DateTime<Utc>,
}

impl Interaction {
    fn new(listing_id: i64, actor: Actor, detail: InteractionDetail, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            listing_id,
            actor,
            detail,
            created_at,
        }
    }

    pub fn vote(listing_id: i64, actor: Actor, created_at: DateTime<Utc>) -> Self {
        Self::new(listing_id, actor, InteractionDetail::Vote, created_at)
    }

    pub fn click(listing_id: i64, actor: Actor, created_at: DateTime<Utc>) -> Self {
        Self::new(listing_id, actor, InteractionDetail::Click, created_at)
    }

    /// Reviews are always attributed to an authenticated user.
    pub fn review(listing_id: i64, user_id: Uuid, body: ReviewBody, created_at: DateTime<Utc>) -> Self {
        Self::new(listing_id, Actor::User(user_id), InteractionDetail::Review(body), created_at)
    }

    pub fn kind(&self) -> InteractionKind {
        match self.detail {
            InteractionDetail::Vote => InteractionKind::Vote,
            InteractionDetail::Click => InteractionKind::Click,
            InteractionDetail::Review(_) => InteractionKind::Review,
        }
    }

    pub fn review_body(&self) -> Option<&ReviewBody> {
        match &self.detail {
            InteractionDetail::Review(body) => Some(body),
            _ => None,
        }
    }

    pub fn is_by(&self, actor: &Actor) -> bool {
        self.actor == *actor
    }
}
