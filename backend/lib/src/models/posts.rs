use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{reactions::ReactionSummary, users::UserSummary};
use crate::{
    data::postgres::schema::posts,
    pagination::{Timestamped, TimestampedKey},
};

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Insertable)]
#[diesel(table_name = posts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// Set on every edit
    pub updated_at: Option<DateTime<Utc>>,
}

impl Timestamped for Post {
    fn timestamped_key(&self) -> TimestampedKey {
        TimestampedKey::new(self.created_at, self.id)
    }
}

/// Which posts a feed query covers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostFilter {
    /// Only posts written by this user
    pub author: Option<Uuid>,
}

impl PostFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_author(author: Uuid) -> Self {
        Self {
            author: Some(author),
        }
    }

    pub fn matches(&self, post: &Post) -> bool {
        self.author.map_or(true, |author| post.user_id == author)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDto {
    pub post_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub author: UserSummary,
    pub comment_count: i64,
    pub reactions: ReactionSummary,
}

impl PostDto {
    pub fn from_post(
        post: Post,
        author: UserSummary,
        comment_count: i64,
        reactions: ReactionSummary,
    ) -> Self {
        Self {
            post_id: post.id,
            content: post.content,
            created_at: post.created_at,
            updated_at: post.updated_at,
            author,
            comment_count,
            reactions,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostRequest {
    pub content: String,
}
