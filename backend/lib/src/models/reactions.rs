use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::users::UserSummary;
use crate::{
    data::postgres::schema::reactions,
    pagination::{Timestamped, TimestampedKey},
};

/// Kind of reaction, stored as a small integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionType {
    Like,
    Love,
    Haha,
    Wow,
    Sad,
    Angry,
    Care,
}

impl ReactionType {
    pub const ALL: [ReactionType; 7] = [
        Self::Like,
        Self::Love,
        Self::Haha,
        Self::Wow,
        Self::Sad,
        Self::Angry,
        Self::Care,
    ];

    /// Value stored in `reactions.reaction_type`
    pub fn code(self) -> i16 {
        match self {
            Self::Like => 1,
            Self::Love => 2,
            Self::Haha => 3,
            Self::Wow => 4,
            Self::Sad => 5,
            Self::Angry => 6,
            Self::Care => 7,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Love => "love",
            Self::Haha => "haha",
            Self::Wow => "wow",
            Self::Sad => "sad",
            Self::Angry => "angry",
            Self::Care => "care",
        }
    }
}

impl FromStr for ReactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == lowered)
            .ok_or_else(|| format!("unknown reaction type: {s}"))
    }
}

impl fmt::Display for ReactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a reaction is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReactionTarget {
    Post,
    Comment,
}

impl ReactionTarget {
    /// Value stored in `reactions.target_type`
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Comment => "comment",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Insertable)]
#[diesel(table_name = reactions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Reaction {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Either `post` or `comment`
    pub target_type: String,
    pub target_id: Uuid,
    pub reaction_type: i16,
    pub created_at: DateTime<Utc>,
}

impl Reaction {
    pub fn new(user_id: Uuid, target: ReactionTarget, target_id: Uuid, kind: ReactionType) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            target_type: target.as_str().to_string(),
            target_id,
            reaction_type: kind.code(),
            created_at: Utc::now(),
        }
    }

    /// `None` for codes outside the known set
    pub fn kind(&self) -> Option<ReactionType> {
        ReactionType::from_code(self.reaction_type)
    }
}

impl Timestamped for Reaction {
    fn timestamped_key(&self) -> TimestampedKey {
        TimestampedKey::new(self.created_at, self.id)
    }
}

/// Number of reactions of each kind on one post or comment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionCounts {
    pub like: i64,
    pub love: i64,
    pub haha: i64,
    pub wow: i64,
    pub sad: i64,
    pub angry: i64,
    pub care: i64,
}

impl ReactionCounts {
    pub fn add(&mut self, kind: ReactionType, count: i64) {
        let slot = match kind {
            ReactionType::Like => &mut self.like,
            ReactionType::Love => &mut self.love,
            ReactionType::Haha => &mut self.haha,
            ReactionType::Wow => &mut self.wow,
            ReactionType::Sad => &mut self.sad,
            ReactionType::Angry => &mut self.angry,
            ReactionType::Care => &mut self.care,
        };
        *slot += count;
    }

    pub fn total(&self) -> i64 {
        self.like + self.love + self.haha + self.wow + self.sad + self.angry + self.care
    }
}

/// Reaction totals of a post or comment as seen by one viewer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionSummary {
    pub counts: ReactionCounts,
    pub total: i64,
    /// The viewer's own reaction, if any
    pub user_reaction: Option<ReactionType>,
}

impl ReactionSummary {
    pub fn new(counts: ReactionCounts, user_reaction: Option<ReactionType>) -> Self {
        Self {
            total: counts.total(),
            counts,
            user_reaction,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionDto {
    pub reaction_id: Uuid,
    pub reaction_type: ReactionType,
    pub created_at: DateTime<Utc>,
    pub user: UserSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactRequest {
    pub reaction_type: String,
}
